//! Shader resource（descriptor set）定义
//!
//! 每个 shader resource 在每个 frame in flight 上持有一份 `RgShaderResourceBindingSet`
//! 和一个物理 descriptor set。绑定按资源名字引用 buffer/image/sampler，
//! 真正的 descriptor 写入在 compile 阶段物理资源就绪之后进行。

use ash::vk;

use crate::render_graph::resource_handle::RgResourceKind;

/// 单个 binding 的布局声明
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RgBindingLayout {
    pub binding: u32,
    /// Buffer / Image / Sampler / BufferView
    pub kind: RgResourceKind,
    pub descriptor_type: vk::DescriptorType,
    /// 数组长度
    pub count: usize,
    pub stages: vk::ShaderStageFlags,
}

impl RgBindingLayout {
    #[inline]
    pub fn new(
        binding: u32,
        kind: RgResourceKind,
        descriptor_type: vk::DescriptorType,
        count: usize,
        stages: vk::ShaderStageFlags,
    ) -> Self {
        Self {
            binding,
            kind,
            descriptor_type,
            count,
            stages,
        }
    }

    pub fn uniform_buffer(binding: u32, stages: vk::ShaderStageFlags) -> Self {
        Self::new(binding, RgResourceKind::Buffer, vk::DescriptorType::UNIFORM_BUFFER, 1, stages)
    }

    pub fn storage_buffer(binding: u32, stages: vk::ShaderStageFlags) -> Self {
        Self::new(binding, RgResourceKind::Buffer, vk::DescriptorType::STORAGE_BUFFER, 1, stages)
    }

    pub fn sampled_images(binding: u32, count: usize, stages: vk::ShaderStageFlags) -> Self {
        Self::new(binding, RgResourceKind::Image, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, count, stages)
    }

    pub fn storage_image(binding: u32, stages: vk::ShaderStageFlags) -> Self {
        Self::new(binding, RgResourceKind::Image, vk::DescriptorType::STORAGE_IMAGE, 1, stages)
    }

    pub fn sampler(binding: u32, stages: vk::ShaderStageFlags) -> Self {
        Self::new(binding, RgResourceKind::Sampler, vk::DescriptorType::SAMPLER, 1, stages)
    }
}

/// buffer 绑定：按名字引用 graph 中的 buffer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgBufferBinding {
    pub buffer: String,
    pub offset: vk::DeviceSize,
    pub range: vk::DeviceSize,
}

impl RgBufferBinding {
    pub fn whole(buffer: impl Into<String>) -> Self {
        Self {
            buffer: buffer.into(),
            offset: 0,
            range: vk::WHOLE_SIZE,
        }
    }
}

/// image 绑定：按名字引用 image，以及可选的 sampler
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgImageBinding {
    pub image: String,
    pub sampler: Option<String>,
}

impl RgImageBinding {
    pub fn new(image: impl Into<String>, sampler: Option<&str>) -> Self {
        Self {
            image: image.into(),
            sampler: sampler.map(str::to_string),
        }
    }
}

/// 一个 binding 上的完整数组内容
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RgBindingPayload {
    Buffers(Vec<RgBufferBinding>),
    Images(Vec<RgImageBinding>),
    Samplers(Vec<String>),
    BufferViews(Vec<vk::BufferView>),
}

impl RgBindingPayload {
    #[inline]
    pub fn kind(&self) -> RgResourceKind {
        match self {
            Self::Buffers(_) => RgResourceKind::Buffer,
            Self::Images(_) => RgResourceKind::Image,
            Self::Samplers(_) => RgResourceKind::Sampler,
            Self::BufferViews(_) => RgResourceKind::BufferView,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Self::Buffers(v) => v.len(),
            Self::Images(v) => v.len(),
            Self::Samplers(v) => v.len(),
            Self::BufferViews(v) => v.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `update_shader_resource` 的输入
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgShaderResourceBinding {
    pub binding: u32,
    pub payload: RgBindingPayload,
}

impl RgShaderResourceBinding {
    #[inline]
    pub fn new(binding: u32, payload: RgBindingPayload) -> Self {
        Self { binding, payload }
    }
}

/// binding 槽位：种类由声明决定，长度等于数组长度，未写入的元素为 `None`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RgBindingSlots {
    Buffers(Vec<Option<RgBufferBinding>>),
    Images(Vec<Option<RgImageBinding>>),
    Samplers(Vec<Option<String>>),
    BufferViews(Vec<Option<vk::BufferView>>),
}

impl RgBindingSlots {
    /// 按声明的种类和数组长度创建空槽位；`kind` 不能是 `ShaderResource`
    fn empty(kind: RgResourceKind, count: usize) -> Option<Self> {
        match kind {
            RgResourceKind::Buffer => Some(Self::Buffers(vec![None; count])),
            RgResourceKind::Image => Some(Self::Images(vec![None; count])),
            RgResourceKind::Sampler => Some(Self::Samplers(vec![None; count])),
            RgResourceKind::BufferView => Some(Self::BufferViews(vec![None; count])),
            RgResourceKind::ShaderResource => None,
        }
    }

    #[inline]
    pub fn kind(&self) -> RgResourceKind {
        match self {
            Self::Buffers(_) => RgResourceKind::Buffer,
            Self::Images(_) => RgResourceKind::Image,
            Self::Samplers(_) => RgResourceKind::Sampler,
            Self::BufferViews(_) => RgResourceKind::BufferView,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Self::Buffers(v) => v.len(),
            Self::Images(v) => v.len(),
            Self::Samplers(v) => v.len(),
            Self::BufferViews(v) => v.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 从未被 update 过
    pub fn is_unset(&self) -> bool {
        match self {
            Self::Buffers(v) => v.iter().all(Option::is_none),
            Self::Images(v) => v.iter().all(Option::is_none),
            Self::Samplers(v) => v.iter().all(Option::is_none),
            Self::BufferViews(v) => v.iter().all(Option::is_none),
        }
    }

    /// 复制 payload；调用前已经检查过种类和长度
    fn assign(&mut self, payload: &RgBindingPayload) {
        match (self, payload) {
            (Self::Buffers(slots), RgBindingPayload::Buffers(src)) => {
                slots.iter_mut().zip(src).for_each(|(dst, src)| *dst = Some(src.clone()))
            }
            (Self::Images(slots), RgBindingPayload::Images(src)) => {
                slots.iter_mut().zip(src).for_each(|(dst, src)| *dst = Some(src.clone()))
            }
            (Self::Samplers(slots), RgBindingPayload::Samplers(src)) => {
                slots.iter_mut().zip(src).for_each(|(dst, src)| *dst = Some(src.clone()))
            }
            (Self::BufferViews(slots), RgBindingPayload::BufferViews(src)) => {
                slots.iter_mut().zip(src).for_each(|(dst, src)| *dst = Some(*src))
            }
            _ => {}
        }
    }
}

/// 一个 binding：布局 + 槽位
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgBindingSlot {
    pub layout: RgBindingLayout,
    pub slots: RgBindingSlots,
}

/// 某一帧的完整绑定集合，按声明顺序排列
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RgShaderResourceBindingSet {
    pub bindings: Vec<RgBindingSlot>,
}

impl RgShaderResourceBindingSet {
    pub fn from_layout(layout: &[RgBindingLayout]) -> Self {
        Self {
            bindings: layout
                .iter()
                .filter_map(|l| RgBindingSlots::empty(l.kind, l.count).map(|slots| RgBindingSlot { layout: *l, slots }))
                .collect(),
        }
    }

    #[inline]
    pub fn find(&self, binding: u32) -> Option<&RgBindingSlot> {
        self.bindings.iter().find(|b| b.layout.binding == binding)
    }

    pub(crate) fn assign(&mut self, binding: &RgShaderResourceBinding) {
        if let Some(slot) = self.bindings.iter_mut().find(|b| b.layout.binding == binding.binding) {
            slot.slots.assign(&binding.payload);
        }
    }
}

/// 一帧的 shader resource：绑定内容 + 物理 descriptor set
#[derive(Clone, Debug)]
pub struct RgShaderResourceFrame {
    pub bindings: RgShaderResourceBindingSet,
    pub descriptor_set: vk::DescriptorSet,
}

/// Shader resource 条目
#[derive(Clone, Debug)]
pub struct RgShaderResource {
    pub name: String,
    pub layout: Vec<RgBindingLayout>,
    pub frames: Vec<RgShaderResourceFrame>,
}

impl RgShaderResource {
    #[inline]
    pub fn frames_in_flight(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn frame(&self, frame_index: usize) -> Option<&RgShaderResourceFrame> {
        if self.frames.is_empty() {
            return None;
        }
        self.frames.get(frame_index % self.frames.len())
    }

    #[inline]
    pub fn descriptor_set(&self, frame_index: usize) -> Option<vk::DescriptorSet> {
        self.frame(frame_index).map(|f| f.descriptor_set)
    }
}

/// 提交给 device 的 descriptor 写入内容
#[derive(Clone, Debug)]
pub enum RgDescriptorWritePayload {
    Buffers(Vec<vk::DescriptorBufferInfo>),
    Images(Vec<vk::DescriptorImageInfo>),
    BufferViews(Vec<vk::BufferView>),
}

/// 一条 write descriptor set 记录，对应一个 binding
#[derive(Clone, Debug)]
pub struct RgDescriptorWrite {
    pub dst_set: vk::DescriptorSet,
    pub binding: u32,
    pub descriptor_type: vk::DescriptorType,
    pub payload: RgDescriptorWritePayload,
}

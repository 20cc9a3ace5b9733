use ash::vk;

use crate::render_graph::resource_state::{RgResourceSource, RgResourceUsageState};

/// 图像资源描述
///
/// `extent` / `format` 为 `None` 时，在物化阶段使用 swapchain 的尺寸和格式。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgImageDesc {
    /// 图像尺寸，`None` 表示跟随 swapchain
    pub extent: Option<vk::Extent2D>,
    /// 图像格式，`None` 表示 swapchain 的颜色格式（深度附件则为深度格式）
    pub format: Option<vk::Format>,
    /// 图像用途
    pub usage: vk::ImageUsageFlags,
    /// Mip 级别数
    pub mip_levels: u32,
    /// 数组层数
    pub array_layers: u32,
    /// 采样数
    pub samples: vk::SampleCountFlags,
}

impl Default for RgImageDesc {
    fn default() -> Self {
        Self {
            extent: None,
            format: None,
            usage: vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::COLOR_ATTACHMENT,
            mip_levels: 1,
            array_layers: 1,
            samples: vk::SampleCountFlags::TYPE_1,
        }
    }
}

// new & init & builder
impl RgImageDesc {
    /// 创建 2D 图像描述
    #[inline]
    pub fn new_2d(width: u32, height: u32, format: vk::Format, usage: vk::ImageUsageFlags) -> Self {
        Self {
            extent: Some(vk::Extent2D { width, height }),
            format: Some(format),
            usage,
            ..Default::default()
        }
    }

    /// 与 swapchain 同尺寸的颜色附件
    #[inline]
    pub fn swapchain_color() -> Self {
        Self::default()
    }

    /// 与 swapchain 同尺寸的深度附件
    #[inline]
    pub fn swapchain_depth() -> Self {
        Self {
            usage: vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            ..Default::default()
        }
    }

    /// 设置格式（链式调用）
    #[inline]
    pub fn with_format(mut self, format: vk::Format) -> Self {
        self.format = Some(format);
        self
    }

    /// 设置用途（链式调用）
    #[inline]
    pub fn with_usage(mut self, usage: vk::ImageUsageFlags) -> Self {
        self.usage = usage;
        self
    }

    #[inline]
    pub fn is_depth(&self) -> bool {
        self.usage.contains(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
    }

    /// 从格式推断 aspect
    pub fn infer_aspect(format: vk::Format) -> vk::ImageAspectFlags {
        match format {
            vk::Format::D16_UNORM | vk::Format::D32_SFLOAT | vk::Format::X8_D24_UNORM_PACK32 => {
                vk::ImageAspectFlags::DEPTH
            }
            vk::Format::S8_UINT => vk::ImageAspectFlags::STENCIL,
            vk::Format::D16_UNORM_S8_UINT | vk::Format::D24_UNORM_S8_UINT | vk::Format::D32_SFLOAT_S8_UINT => {
                vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
            }
            _ => vk::ImageAspectFlags::COLOR,
        }
    }
}

/// 交给 device 创建图像时的完整信息（尺寸和格式已确定）
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgImageCreateInfo {
    pub extent: vk::Extent2D,
    pub format: vk::Format,
    pub usage: vk::ImageUsageFlags,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub samples: vk::SampleCountFlags,
    pub aspect: vk::ImageAspectFlags,
}

/// 一份物理图像：image 以及它的默认 view
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RgImagePhysical {
    pub image: vk::Image,
    pub view: vk::ImageView,
}

/// 图像资源条目
#[derive(Clone, Debug)]
pub struct RgImageResource {
    /// 调试名称
    pub name: String,
    pub desc: RgImageDesc,
    pub source: RgResourceSource,
    frames_in_flight: usize,
    /// 每个 frame in flight 一份；物化之前为空
    physical: Vec<RgImagePhysical>,
    /// 物化后确定的尺寸与格式
    extent: vk::Extent2D,
    format: vk::Format,
}

// new & init
impl RgImageResource {
    /// 由 RenderGraph 创建的图像，物理资源延迟到 compile 时创建
    pub fn owned(name: impl Into<String>, desc: RgImageDesc, frames_in_flight: usize) -> Self {
        Self {
            name: name.into(),
            extent: desc.extent.unwrap_or_default(),
            format: desc.format.unwrap_or(vk::Format::UNDEFINED),
            desc,
            source: RgResourceSource::Owned,
            frames_in_flight,
            physical: Vec::new(),
        }
    }

    /// 从外部导入的图像，每个元素对应一个 frame in flight（只有一个时所有帧共用）
    pub fn imported(
        name: impl Into<String>,
        physical: Vec<RgImagePhysical>,
        extent: vk::Extent2D,
        format: vk::Format,
        initial_state: RgResourceUsageState,
    ) -> Self {
        Self {
            name: name.into(),
            desc: RgImageDesc {
                extent: Some(extent),
                format: Some(format),
                ..Default::default()
            },
            source: RgResourceSource::Imported { initial_state },
            frames_in_flight: physical.len(),
            physical,
            extent,
            format,
        }
    }
}

// update
impl RgImageResource {
    pub(crate) fn set_physical(&mut self, physical: Vec<RgImagePhysical>, extent: vk::Extent2D, format: vk::Format) {
        self.physical = physical;
        self.extent = extent;
        self.format = format;
    }

    pub(crate) fn take_physical(&mut self) -> Vec<RgImagePhysical> {
        std::mem::take(&mut self.physical)
    }
}

// getters
impl RgImageResource {
    #[inline]
    pub fn is_materialized(&self) -> bool {
        !self.physical.is_empty()
    }

    #[inline]
    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    /// 当前帧的物理图像：`frame_index % 份数`
    #[inline]
    pub fn physical(&self, frame_index: usize) -> Option<RgImagePhysical> {
        if self.physical.is_empty() {
            return None;
        }
        self.physical.get(frame_index % self.physical.len()).copied()
    }

    #[inline]
    pub fn physical_all(&self) -> &[RgImagePhysical] {
        &self.physical
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }

    /// 根据格式推断 aspect flags
    #[inline]
    pub fn infer_aspect(&self) -> vk::ImageAspectFlags {
        RgImageDesc::infer_aspect(self.format)
    }
}

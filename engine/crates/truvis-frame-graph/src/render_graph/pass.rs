//! Pass 定义和构建器
//!
//! 提供 `RgPass` trait 用于声明式定义渲染 Pass，
//! 以及 `RgPassBuilder` 用于在 setup 阶段按名字声明资源依赖。

use ash::vk;

use crate::device::RgDevice;
use crate::error::{RgError, RgResult};
use crate::render_graph::barrier::{RgBarrierBatch, RgResourceBarrierInfo};
use crate::render_graph::buffer_resource::RgBufferDesc;
use crate::render_graph::graph::RgGraphState;
use crate::render_graph::image_resource::RgImageDesc;
use crate::render_graph::pass_context::{RgCommandEncoder, RgPassContext, RgPassContextData};
use crate::render_graph::resource_handle::{
    RgBufferHandle, RgImageHandle, RgResourceHandle, RgResourceKind, RgSamplerHandle,
};
use crate::render_graph::resource_registry::RgResourceRegistry;
use crate::render_graph::resource_state::RgResourceUsageState;
use crate::render_graph::sampler_resource::RgSamplerDesc;

/// Pass 提交到哪个队列
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgQueueType {
    Graphics,
    Compute,
}

/// Pass 在 graph 中的下标（按添加顺序）
pub type RgPassId = usize;

/// attachment 的清除值
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RgClearValue {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u32 },
}

impl RgClearValue {
    pub fn to_vk(self) -> vk::ClearValue {
        match self {
            Self::Color(float32) => vk::ClearValue {
                color: vk::ClearColorValue { float32 },
            },
            Self::DepthStencil { depth, stencil } => vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue { depth, stencil },
            },
        }
    }
}

/// 读取声明
#[derive(Clone, Debug, PartialEq)]
pub struct RgReadDesc {
    pub name: String,
    pub kind: RgResourceKind,
    pub access: vk::AccessFlags2,
    pub stage: vk::PipelineStageFlags2,
    /// compile 时解析
    pub handle: Option<RgResourceHandle>,
}

/// 写入声明
#[derive(Clone, Debug, PartialEq)]
pub struct RgWriteDesc {
    pub name: String,
    pub kind: RgResourceKind,
    pub access: vk::AccessFlags2,
    pub stage: vk::PipelineStageFlags2,
    /// 有值时 attachment 使用 `LOAD_OP_CLEAR`
    pub clear_value: Option<RgClearValue>,
    /// compile 时解析
    pub handle: Option<RgResourceHandle>,
}

/// 读写声明的统一视图，依赖分析和 barrier 分析使用
#[derive(Clone, Copy, Debug)]
pub struct RgResourceAccess<'a> {
    pub name: &'a str,
    pub kind: RgResourceKind,
    pub access: vk::AccessFlags2,
    pub stage: vk::PipelineStageFlags2,
    pub handle: Option<RgResourceHandle>,
    pub is_write: bool,
}

impl RgResourceAccess<'_> {
    /// 这次使用所请求的状态
    #[inline]
    pub fn requested_state(&self) -> RgResourceUsageState {
        RgResourceUsageState::requested(self.access, self.stage, self.kind == RgResourceKind::Image)
    }
}

/// Pass 构建器
///
/// 在 setup 闭包或 `RgPass::setup()` 中使用，按名字声明 Pass 的资源依赖。
/// 名字在 compile 时才解析，因此可以引用之后才定义的资源。
pub struct RgPassBuilder<'a> {
    /// Pass 名称
    pub(crate) name: String,
    pub(crate) queue: RgQueueType,

    pub(crate) reads: Vec<RgReadDesc>,
    pub(crate) writes: Vec<RgWriteDesc>,

    /// 资源注册表引用（用于在 setup 中顺带定义资源）
    pub(crate) resources: &'a mut RgResourceRegistry,
    pub(crate) frames_in_flight: usize,
}

// new & init
impl<'a> RgPassBuilder<'a> {
    pub(crate) fn new(
        name: impl Into<String>,
        queue: RgQueueType,
        resources: &'a mut RgResourceRegistry,
        frames_in_flight: usize,
    ) -> Self {
        Self {
            name: name.into(),
            queue,
            reads: Vec::new(),
            writes: Vec::new(),
            resources,
            frames_in_flight,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn queue(&self) -> RgQueueType {
        self.queue
    }

    /// 当前队列上 shader 读取所在的 stage
    fn shader_stage(&self) -> vk::PipelineStageFlags2 {
        match self.queue {
            RgQueueType::Graphics => vk::PipelineStageFlags2::FRAGMENT_SHADER,
            RgQueueType::Compute => vk::PipelineStageFlags2::COMPUTE_SHADER,
        }
    }
}

// 通用声明
impl RgPassBuilder<'_> {
    /// 声明读取
    pub fn read(
        &mut self,
        name: impl Into<String>,
        kind: RgResourceKind,
        access: vk::AccessFlags2,
        stage: vk::PipelineStageFlags2,
    ) -> &mut Self {
        self.reads.push(RgReadDesc {
            name: name.into(),
            kind,
            access,
            stage,
            handle: None,
        });
        self
    }

    /// 声明写入
    pub fn write(
        &mut self,
        name: impl Into<String>,
        kind: RgResourceKind,
        access: vk::AccessFlags2,
        stage: vk::PipelineStageFlags2,
        clear_value: Option<RgClearValue>,
    ) -> &mut Self {
        self.writes.push(RgWriteDesc {
            name: name.into(),
            kind,
            access,
            stage,
            clear_value,
            handle: None,
        });
        self
    }
}

// image
impl RgPassBuilder<'_> {
    #[inline]
    pub fn read_image(
        &mut self,
        name: impl Into<String>,
        access: vk::AccessFlags2,
        stage: vk::PipelineStageFlags2,
    ) -> &mut Self {
        self.read(name, RgResourceKind::Image, access, stage)
    }

    #[inline]
    pub fn write_image(
        &mut self,
        name: impl Into<String>,
        access: vk::AccessFlags2,
        stage: vk::PipelineStageFlags2,
    ) -> &mut Self {
        self.write(name, RgResourceKind::Image, access, stage, None)
    }

    /// 在 shader 中采样（graphics 为 fragment stage，compute 为 compute stage）
    pub fn sample_image(&mut self, name: impl Into<String>) -> &mut Self {
        let stage = self.shader_stage();
        self.read_image(name, vk::AccessFlags2::SHADER_READ, stage)
    }

    /// 颜色附件输出
    pub fn color_attachment(&mut self, name: impl Into<String>, clear: Option<[f32; 4]>) -> &mut Self {
        let state = RgResourceUsageState::COLOR_ATTACHMENT_WRITE;
        self.write(name, RgResourceKind::Image, state.access, state.stage, clear.map(RgClearValue::Color))
    }

    /// 深度附件输出，`clear` 为 `(depth, stencil)`
    pub fn depth_attachment(&mut self, name: impl Into<String>, clear: Option<(f32, u32)>) -> &mut Self {
        let state = RgResourceUsageState::DEPTH_ATTACHMENT_WRITE;
        let clear = clear.map(|(depth, stencil)| RgClearValue::DepthStencil { depth, stencil });
        self.write(name, RgResourceKind::Image, state.access, state.stage, clear)
    }

    /// compute shader 写 storage image
    pub fn write_storage_image(&mut self, name: impl Into<String>) -> &mut Self {
        let state = RgResourceUsageState::STORAGE_WRITE_COMPUTE;
        self.write_image(name, state.access, state.stage)
    }
}

// buffer / sampler / shader resource
impl RgPassBuilder<'_> {
    #[inline]
    pub fn read_buffer(
        &mut self,
        name: impl Into<String>,
        access: vk::AccessFlags2,
        stage: vk::PipelineStageFlags2,
    ) -> &mut Self {
        self.read(name, RgResourceKind::Buffer, access, stage)
    }

    #[inline]
    pub fn write_buffer(
        &mut self,
        name: impl Into<String>,
        access: vk::AccessFlags2,
        stage: vk::PipelineStageFlags2,
    ) -> &mut Self {
        self.write(name, RgResourceKind::Buffer, access, stage, None)
    }

    /// 作为 uniform buffer 读取
    pub fn read_uniform_buffer(&mut self, name: impl Into<String>) -> &mut Self {
        let stage = self.shader_stage();
        self.read_buffer(name, vk::AccessFlags2::UNIFORM_READ, stage)
    }

    /// sampler 不参与 barrier，只做名字解析
    pub fn use_sampler(&mut self, name: impl Into<String>) -> &mut Self {
        self.read(name, RgResourceKind::Sampler, vk::AccessFlags2::NONE, vk::PipelineStageFlags2::NONE)
    }

    /// 绑定 shader resource（descriptor set），不参与 barrier
    pub fn use_shader_resource(&mut self, name: impl Into<String>) -> &mut Self {
        let stage = self.shader_stage();
        self.read(name, RgResourceKind::ShaderResource, vk::AccessFlags2::SHADER_READ, stage)
    }
}

// 在 setup 中定义资源
impl RgPassBuilder<'_> {
    /// 定义图像（同名已存在时返回已有句柄）
    pub fn define_image(&mut self, name: &str, desc: RgImageDesc) -> RgImageHandle {
        self.resources.define_image(name, desc, self.frames_in_flight)
    }

    /// 定义缓冲区（同名已存在时返回已有句柄）
    pub fn define_buffer(&mut self, name: &str, desc: RgBufferDesc) -> RgBufferHandle {
        self.resources.define_buffer(name, desc, self.frames_in_flight)
    }

    pub fn define_sampler(&mut self, name: &str, desc: RgSamplerDesc) -> RgSamplerHandle {
        self.resources.define_sampler(name, desc)
    }
}

/// RgPass trait
///
/// 定义渲染图中的一个 Pass。用户需要实现此 trait 来创建自定义 Pass，
/// 或者直接用 `add_graphics_pass` / `add_compute_pass` 传入两个闭包。
///
/// # 示例
///
/// ```ignore
/// struct BlurPass;
///
/// impl RgPass for BlurPass {
///     fn setup(&mut self, builder: &mut RgPassBuilder) {
///         builder.sample_image("hdr").write_storage_image("blurred");
///     }
///
///     fn execute(&mut self, ctx: &mut RgPassContext<'_>) {
///         let output = ctx.get_image("blurred");
///         // 绑定 pipeline, dispatch...
///     }
/// }
/// ```
///
/// Pass 不需要是 Send + Sync，RenderGraph 只在单线程中使用。
pub trait RgPass {
    /// 声明 Pass 的资源依赖
    fn setup(&mut self, builder: &mut RgPassBuilder);

    /// 录制 Pass 的命令
    ///
    /// 命令缓冲区已经开始录制，barrier 和 begin rendering 都已完成。
    fn execute(&mut self, ctx: &mut RgPassContext<'_>);
}

/// 闭包形式的执行回调
pub type RgExecuteFn = Box<dyn FnMut(&mut RgPassContext<'_>)>;

/// 类型擦除的 Pass 执行器
pub(crate) trait RgPassExecutor {
    fn execute(&mut self, ctx: &mut RgPassContext<'_>);
}

/// 包装用户 Pass 实现的执行器
pub(crate) struct RgPassExecutorWrapper<P: RgPass> {
    pub pass: P,
}

impl<P: RgPass> RgPassExecutor for RgPassExecutorWrapper<P> {
    fn execute(&mut self, ctx: &mut RgPassContext<'_>) {
        self.pass.execute(ctx);
    }
}

/// 包装闭包的执行器
pub(crate) struct RgClosureExecutor {
    pub callback: RgExecuteFn,
}

impl RgPassExecutor for RgClosureExecutor {
    fn execute(&mut self, ctx: &mut RgPassContext<'_>) {
        (self.callback)(ctx);
    }
}

/// dynamic rendering 的一个 attachment
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RgRenderingAttachment {
    pub image_view: vk::ImageView,
    pub image_layout: vk::ImageLayout,
    pub load_op: vk::AttachmentLoadOp,
    pub store_op: vk::AttachmentStoreOp,
    pub clear_value: Option<RgClearValue>,
}

/// 由 pass 的写入声明推导出的 rendering info
#[derive(Clone, Debug, PartialEq)]
pub struct RgRenderingInfo {
    pub render_area: vk::Rect2D,
    pub layer_count: u32,
    pub color_attachments: Vec<RgRenderingAttachment>,
    pub depth_attachment: Option<RgRenderingAttachment>,
}

impl RgRenderingInfo {
    /// 颜色附件来自 `COLOR_ATTACHMENT_WRITE`，深度附件来自 `DEPTH_STENCIL_ATTACHMENT_WRITE`（只取第一个）；
    /// render area 和 layer count 取第一个写入的图像。没有任何 attachment 时返回 `None`。
    pub fn from_writes(writes: &[RgWriteDesc], registry: &RgResourceRegistry, frame_index: usize) -> Option<Self> {
        let mut render_area = None;
        let mut layer_count = 1;
        let mut color_attachments = Vec::new();
        let mut depth_attachment = None;

        for write in writes {
            let Some(image) = write.handle.and_then(|h| h.as_image()) else {
                continue;
            };
            let (Some(resource), Some(physical)) =
                (registry.get_image(image), registry.physical_image(image, frame_index))
            else {
                continue;
            };

            if render_area.is_none() {
                render_area = Some(vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent: resource.extent(),
                });
                layer_count = resource.desc.array_layers;
            }

            let attachment = RgRenderingAttachment {
                image_view: physical.view,
                image_layout: RgResourceUsageState::layout_for_access(write.access),
                load_op: match write.clear_value {
                    Some(_) => vk::AttachmentLoadOp::CLEAR,
                    None => vk::AttachmentLoadOp::LOAD,
                },
                store_op: vk::AttachmentStoreOp::STORE,
                clear_value: write.clear_value,
            };

            if write.access.contains(vk::AccessFlags2::COLOR_ATTACHMENT_WRITE) {
                color_attachments.push(attachment);
            } else if write.access.contains(vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE) {
                depth_attachment.get_or_insert(attachment);
            }
        }

        if color_attachments.is_empty() && depth_attachment.is_none() {
            return None;
        }

        Some(Self {
            render_area: render_area.unwrap_or_default(),
            layer_count,
            color_attachments,
            depth_attachment,
        })
    }
}

/// Pass 节点
pub struct RgPassNode {
    pub id: RgPassId,
    /// Pass 名称
    pub name: String,
    pub queue: RgQueueType,

    /// 按声明顺序的读取
    pub reads: Vec<RgReadDesc>,
    /// 按声明顺序的写入
    pub writes: Vec<RgWriteDesc>,

    /// 执行回调（类型擦除）
    pub(crate) executor: Box<dyn RgPassExecutor>,

    /// 每个 frame in flight 一个
    pub(crate) command_buffers: Vec<vk::CommandBuffer>,
    /// compile 时计算的前置 barrier
    pub(crate) barriers: Vec<RgResourceBarrierInfo>,
    /// 名字 -> 句柄
    pub(crate) context_data: RgPassContextData,
}

// new & init
impl RgPassNode {
    pub(crate) fn new(id: RgPassId, builder: RgPassBuilder<'_>, executor: Box<dyn RgPassExecutor>) -> Self {
        Self {
            id,
            name: builder.name,
            queue: builder.queue,
            reads: builder.reads,
            writes: builder.writes,
            executor,
            command_buffers: Vec::new(),
            barriers: Vec::new(),
            context_data: RgPassContextData::default(),
        }
    }
}

// getters
impl RgPassNode {
    /// 先所有读取、再所有写入
    pub fn accesses(&self) -> impl Iterator<Item = RgResourceAccess<'_>> {
        let reads = self.reads.iter().map(|r| RgResourceAccess {
            name: &r.name,
            kind: r.kind,
            access: r.access,
            stage: r.stage,
            handle: r.handle,
            is_write: false,
        });
        let writes = self.writes.iter().map(|w| RgResourceAccess {
            name: &w.name,
            kind: w.kind,
            access: w.access,
            stage: w.stage,
            handle: w.handle,
            is_write: true,
        });
        reads.chain(writes)
    }

    /// compile 计算出的 barrier 列表
    #[inline]
    pub fn barriers(&self) -> &[RgResourceBarrierInfo] {
        &self.barriers
    }

    #[inline]
    pub fn command_buffers(&self) -> &[vk::CommandBuffer] {
        &self.command_buffers
    }

    #[inline]
    pub fn command_buffer(&self, frame_index: usize) -> Option<vk::CommandBuffer> {
        if self.command_buffers.is_empty() {
            return None;
        }
        self.command_buffers.get(frame_index % self.command_buffers.len()).copied()
    }

    #[inline]
    pub fn context_data(&self) -> &RgPassContextData {
        &self.context_data
    }
}

// record
impl RgPassNode {
    /// 录制当前帧的命令：barrier -> begin rendering -> 用户回调 -> end rendering
    pub(crate) fn record(
        &mut self,
        device: &dyn RgDevice,
        registry: &RgResourceRegistry,
        frame_index: usize,
    ) -> RgResult<vk::CommandBuffer> {
        let Some(command_buffer) = self.command_buffer(frame_index) else {
            log::error!("Pass \"{}\" has no command buffer, compile first", self.name);
            return Err(RgError::NotCompiled(RgGraphState::PassesDeclared));
        };

        // 先解析 barrier，失败时 command buffer 不会处于 begin 状态
        let batch = if self.barriers.is_empty() {
            None
        } else {
            Some(RgBarrierBatch::build(&self.barriers, registry, frame_index)?)
        };

        device.cmd_begin(command_buffer);

        if let Some(batch) = &batch {
            log::trace!(
                "Pass \"{}\": {} image barriers, {} buffer barriers",
                self.name,
                batch.image_barriers.len(),
                batch.buffer_barriers.len()
            );
            device.cmd_pipeline_barrier(command_buffer, batch);
        }

        let rendering = match self.queue {
            RgQueueType::Graphics => RgRenderingInfo::from_writes(&self.writes, registry, frame_index),
            RgQueueType::Compute => None,
        };
        if let Some(info) = &rendering {
            device.cmd_begin_rendering(command_buffer, info);
        }

        let mut ctx = RgPassContext {
            pass_name: &self.name,
            frame_index,
            registry,
            data: &self.context_data,
            encoder: RgCommandEncoder {
                device,
                command_buffer,
                queue: self.queue,
                frame_index,
            },
        };
        self.executor.execute(&mut ctx);

        if rendering.is_some() {
            device.cmd_end_rendering(command_buffer);
        }
        device.cmd_end(command_buffer);

        Ok(command_buffer)
    }
}

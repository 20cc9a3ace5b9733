//! RenderGraph - 声明式 frame graph
//!
//! 提供按名字声明资源和 Pass、自动依赖推导、延迟物化和自动 barrier 的渲染图抽象。
//!
//! # 核心概念
//!
//! - **RgImageHandle / RgBufferHandle / ...**: 注册表中的逻辑资源句柄（index + generation）
//! - **RgResourceUsageState**: 资源状态，包含 access、stage、layout
//! - **RgPass / 闭包**: Pass 的 setup（声明读写）和 execute（录制命令）
//! - **RenderGraph**: 持有注册表和 Pass，负责 compile 和 execute
//!
//! # 使用示例
//!
//! ```ignore
//! let mut graph = RenderGraph::new(device, RgConfig::default())?;
//!
//! graph.define_image("albedo", RgImageDesc::swapchain_color());
//! graph.define_image("lighting_output", RgImageDesc::swapchain_color());
//!
//! graph.add_graphics_pass(
//!     "gbuffer",
//!     |b| {
//!         b.color_attachment("albedo", Some([0.0; 4]));
//!     },
//!     |ctx| {
//!         // 绑定 pipeline, draw...
//!     },
//! );
//! graph.add_graphics_pass(
//!     "lighting",
//!     |b| {
//!         b.sample_image("albedo").color_attachment("lighting_output", None);
//!     },
//!     |ctx| {
//!         let albedo = ctx.get_image_view("albedo");
//!         // 绑定 descriptor sets, draw...
//!     },
//! );
//!
//! graph.compile()?;
//! graph.execute()?;
//! ```
//!
//! # 模块结构
//!
//! - `resource_handle`: 资源句柄定义
//! - `resource_state`: 资源状态（stage/access/layout）封装
//! - `*_resource`: 各类资源的描述与物理句柄
//! - `resource_registry`: 资源注册表
//! - `pass` / `pass_context`: Pass 定义、builder 和执行上下文
//! - `dependency`: 依赖图和拓扑排序
//! - `barrier`: 自动 barrier 计算
//! - `graph`: 编排 compile / execute / clear

mod barrier;
mod buffer_resource;
mod dependency;
mod graph;
mod image_resource;
mod pass;
mod pass_context;
mod resource_handle;
mod resource_registry;
mod resource_state;
mod sampler_resource;
mod shader_resource;

// Re-exports
pub use barrier::{BarrierAnalyzer, RgBarrierBatch, RgBufferBarrier, RgImageBarrier, RgResourceBarrierInfo};
pub use buffer_resource::{RgBufferDesc, RgBufferResource};
pub use dependency::{DependencyAnalyzer, DependencyEdge, DependencyGraph};
pub use graph::{RenderGraph, RgGraphState, RgSetup, RgSetupContext, RgSetupFn};
pub use image_resource::{RgImageCreateInfo, RgImageDesc, RgImagePhysical, RgImageResource};
pub use pass::{
    RgClearValue, RgExecuteFn, RgPass, RgPassBuilder, RgPassId, RgPassNode, RgQueueType, RgReadDesc,
    RgRenderingAttachment, RgRenderingInfo, RgResourceAccess, RgWriteDesc,
};
pub use pass_context::{RgCommandEncoder, RgPassContext, RgPassContextData};
pub use resource_handle::{
    RgBufferHandle, RgImageHandle, RgResourceHandle, RgResourceKind, RgSamplerHandle, RgShaderResourceHandle,
};
pub use resource_registry::{RgPhysicalResource, RgResourceRegistry};
pub use resource_state::{RgResourceSource, RgResourceUsageState};
pub use sampler_resource::{RgSamplerDesc, RgSamplerResource};
pub use shader_resource::{
    RgBindingLayout, RgBindingPayload, RgBindingSlot, RgBindingSlots, RgBufferBinding, RgDescriptorWrite,
    RgDescriptorWritePayload, RgImageBinding, RgShaderResource, RgShaderResourceBinding, RgShaderResourceBindingSet,
    RgShaderResourceFrame,
};

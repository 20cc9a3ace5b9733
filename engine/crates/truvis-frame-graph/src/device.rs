//! 图形设备抽象
//!
//! RenderGraph 只通过这两个 trait 与 GPU 打交道：创建/销毁物理资源、
//! 分配 descriptor set、录制命令和提交。失败用 null 句柄表示，由 graph 转换为错误。

use ash::vk;

use crate::render_graph::{
    RgBarrierBatch, RgBindingLayout, RgBufferDesc, RgDescriptorWrite, RgImageCreateInfo, RgImagePhysical,
    RgQueueType, RgRenderingInfo, RgSamplerDesc,
};

/// 命令录制接口
pub trait RgCommandRecorder {
    fn cmd_begin(&self, command_buffer: vk::CommandBuffer);

    fn cmd_end(&self, command_buffer: vk::CommandBuffer);

    /// 一次 pipeline barrier，包含一个 pass 的全部 image/buffer barrier
    fn cmd_pipeline_barrier(&self, command_buffer: vk::CommandBuffer, batch: &RgBarrierBatch);

    /// dynamic rendering 开始
    fn cmd_begin_rendering(&self, command_buffer: vk::CommandBuffer, info: &RgRenderingInfo);

    fn cmd_end_rendering(&self, command_buffer: vk::CommandBuffer);
}

/// RenderGraph 使用的设备
///
/// 所有创建函数返回 null 句柄表示失败。
pub trait RgDevice: RgCommandRecorder {
    // ============ 资源 ============

    fn create_buffer(&self, name: &str, desc: &RgBufferDesc) -> vk::Buffer;

    fn destroy_buffer(&self, buffer: vk::Buffer);

    /// 创建图像以及覆盖全部 mip/layer 的默认 view
    fn create_image(&self, name: &str, info: &RgImageCreateInfo) -> RgImagePhysical;

    fn destroy_image(&self, image: RgImagePhysical);

    fn create_sampler(&self, name: &str, desc: &RgSamplerDesc) -> vk::Sampler;

    fn destroy_sampler(&self, sampler: vk::Sampler);

    // ============ descriptor ============

    fn allocate_descriptor_set(&self, name: &str, layout: &[RgBindingLayout]) -> vk::DescriptorSet;

    fn update_descriptor_sets(&self, writes: &[RgDescriptorWrite]);

    fn free_descriptor_set(&self, descriptor_set: vk::DescriptorSet);

    // ============ 命令 ============

    fn create_command_buffer(&self, name: &str, queue: RgQueueType) -> vk::CommandBuffer;

    fn destroy_command_buffer(&self, command_buffer: vk::CommandBuffer);

    /// 按顺序提交到指定队列
    fn submit_commands(&self, queue: RgQueueType, command_buffers: &[vk::CommandBuffer]);

    // ============ swapchain ============

    fn swapchain_image_count(&self) -> usize;

    fn swapchain_extent(&self) -> vk::Extent2D;

    fn swapchain_color_format(&self) -> vk::Format;

    fn swapchain_depth_format(&self) -> vk::Format;

    /// 当前 frame in flight 的下标
    fn current_frame_index(&self) -> usize;
}

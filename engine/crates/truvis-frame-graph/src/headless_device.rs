//! 无 GPU 的设备实现
//!
//! 分配递增的假句柄并记录所有调用，供测试和 demo 使用。

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use ash::vk;
use ash::vk::Handle;

use crate::device::{RgCommandRecorder, RgDevice};
use crate::render_graph::{
    RgBarrierBatch, RgBindingLayout, RgBufferDesc, RgDescriptorWrite, RgImageCreateInfo, RgImagePhysical,
    RgQueueType, RgRenderingInfo, RgSamplerDesc,
};

/// 录制到 command buffer 里的一条命令
#[derive(Clone, Debug, PartialEq)]
pub enum HeadlessCommand {
    Begin,
    PipelineBarrier(RgBarrierBatch),
    BeginRendering(RgRenderingInfo),
    EndRendering,
    End,
}

#[derive(Default)]
struct HeadlessState {
    next_handle: u64,
    frame_index: usize,
    fail_names: HashSet<String>,

    created_buffers: usize,
    created_images: usize,
    created_samplers: usize,
    created_command_buffers: usize,
    allocated_descriptor_sets: usize,

    destroyed_buffers: usize,
    destroyed_images: usize,

    live_buffers: HashSet<vk::Buffer>,
    live_images: HashSet<vk::Image>,
    live_samplers: HashSet<vk::Sampler>,
    live_command_buffers: HashSet<vk::CommandBuffer>,
    live_descriptor_sets: HashSet<vk::DescriptorSet>,

    descriptor_writes: Vec<RgDescriptorWrite>,
    submissions: Vec<(RgQueueType, Vec<vk::CommandBuffer>)>,
    recorded: HashMap<vk::CommandBuffer, Vec<HeadlessCommand>>,
}

impl HeadlessState {
    fn next_raw(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

/// 不依赖 GPU 的 [`RgDevice`]
///
/// 所有方法都是 `&self`，内部状态放在 `RefCell` 里，可以直接包进 `Rc` 与 graph 共享。
pub struct HeadlessDevice {
    extent: vk::Extent2D,
    color_format: vk::Format,
    depth_format: vk::Format,
    image_count: usize,

    state: RefCell<HeadlessState>,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

// new & init
impl HeadlessDevice {
    pub fn new() -> Self {
        Self {
            extent: vk::Extent2D {
                width: 1280,
                height: 720,
            },
            color_format: vk::Format::B8G8R8A8_UNORM,
            depth_format: vk::Format::D32_SFLOAT,
            image_count: 3,
            state: RefCell::new(HeadlessState::default()),
        }
    }

    pub fn with_swapchain_extent(mut self, extent: vk::Extent2D) -> Self {
        self.extent = extent;
        self
    }

    pub fn with_swapchain_image_count(mut self, image_count: usize) -> Self {
        self.image_count = image_count;
        self
    }

    /// 设置当前 frame in flight 下标，模拟 swapchain 前进
    pub fn set_frame_index(&self, frame_index: usize) {
        self.state.borrow_mut().frame_index = frame_index;
    }

    /// 之后以此名字创建的资源都返回 null 句柄
    pub fn fail_creation_of(&self, name: &str) {
        self.state.borrow_mut().fail_names.insert(name.to_string());
    }

    fn should_fail(&self, name: &str) -> bool {
        let failed = self.state.borrow().fail_names.contains(name);
        if failed {
            log::trace!("headless: creation of {} fails on request", name);
        }
        failed
    }
}

// getters
impl HeadlessDevice {
    pub fn created_buffer_count(&self) -> usize {
        self.state.borrow().created_buffers
    }

    pub fn created_image_count(&self) -> usize {
        self.state.borrow().created_images
    }

    pub fn created_sampler_count(&self) -> usize {
        self.state.borrow().created_samplers
    }

    pub fn created_command_buffer_count(&self) -> usize {
        self.state.borrow().created_command_buffers
    }

    pub fn allocated_descriptor_set_count(&self) -> usize {
        self.state.borrow().allocated_descriptor_sets
    }

    pub fn destroyed_buffer_count(&self) -> usize {
        self.state.borrow().destroyed_buffers
    }

    pub fn destroyed_image_count(&self) -> usize {
        self.state.borrow().destroyed_images
    }

    pub fn live_buffer_count(&self) -> usize {
        self.state.borrow().live_buffers.len()
    }

    pub fn live_image_count(&self) -> usize {
        self.state.borrow().live_images.len()
    }

    pub fn live_sampler_count(&self) -> usize {
        self.state.borrow().live_samplers.len()
    }

    pub fn live_command_buffer_count(&self) -> usize {
        self.state.borrow().live_command_buffers.len()
    }

    pub fn live_descriptor_set_count(&self) -> usize {
        self.state.borrow().live_descriptor_sets.len()
    }

    /// 所有 `update_descriptor_sets` 收到的 write，按调用顺序
    pub fn descriptor_writes(&self) -> Vec<RgDescriptorWrite> {
        self.state.borrow().descriptor_writes.clone()
    }

    /// 所有提交，按调用顺序
    pub fn submissions(&self) -> Vec<(RgQueueType, Vec<vk::CommandBuffer>)> {
        self.state.borrow().submissions.clone()
    }

    /// command buffer 最近一次录制的命令
    pub fn recorded_commands(&self, command_buffer: vk::CommandBuffer) -> Vec<HeadlessCommand> {
        self.state.borrow().recorded.get(&command_buffer).cloned().unwrap_or_default()
    }

    /// command buffer 最近一次录制中的全部 barrier batch
    pub fn barrier_batches(&self, command_buffer: vk::CommandBuffer) -> Vec<RgBarrierBatch> {
        self.recorded_commands(command_buffer)
            .into_iter()
            .filter_map(|cmd| match cmd {
                HeadlessCommand::PipelineBarrier(batch) => Some(batch),
                _ => None,
            })
            .collect()
    }

    /// command buffer 最近一次录制中的全部 rendering info
    pub fn rendering_infos(&self, command_buffer: vk::CommandBuffer) -> Vec<RgRenderingInfo> {
        self.recorded_commands(command_buffer)
            .into_iter()
            .filter_map(|cmd| match cmd {
                HeadlessCommand::BeginRendering(info) => Some(info),
                _ => None,
            })
            .collect()
    }

    fn push_command(&self, command_buffer: vk::CommandBuffer, command: HeadlessCommand) {
        let mut state = self.state.borrow_mut();
        if !state.live_command_buffers.contains(&command_buffer) {
            log::warn!("headless: recording into unknown command buffer {:#x}", command_buffer.as_raw());
        }
        state.recorded.entry(command_buffer).or_default().push(command);
    }
}

impl RgCommandRecorder for HeadlessDevice {
    fn cmd_begin(&self, command_buffer: vk::CommandBuffer) {
        // 重新录制时清空上一次的内容
        self.state.borrow_mut().recorded.remove(&command_buffer);
        self.push_command(command_buffer, HeadlessCommand::Begin);
    }

    fn cmd_end(&self, command_buffer: vk::CommandBuffer) {
        self.push_command(command_buffer, HeadlessCommand::End);
    }

    fn cmd_pipeline_barrier(&self, command_buffer: vk::CommandBuffer, batch: &RgBarrierBatch) {
        log::trace!(
            "headless: barrier with {} image(s), {} buffer(s)",
            batch.image_barriers.len(),
            batch.buffer_barriers.len()
        );
        self.push_command(command_buffer, HeadlessCommand::PipelineBarrier(batch.clone()));
    }

    fn cmd_begin_rendering(&self, command_buffer: vk::CommandBuffer, info: &RgRenderingInfo) {
        self.push_command(command_buffer, HeadlessCommand::BeginRendering(info.clone()));
    }

    fn cmd_end_rendering(&self, command_buffer: vk::CommandBuffer) {
        self.push_command(command_buffer, HeadlessCommand::EndRendering);
    }
}

impl RgDevice for HeadlessDevice {
    fn create_buffer(&self, name: &str, desc: &RgBufferDesc) -> vk::Buffer {
        if self.should_fail(name) {
            return vk::Buffer::null();
        }
        let mut state = self.state.borrow_mut();
        let buffer = vk::Buffer::from_raw(state.next_raw());
        state.created_buffers += 1;
        state.live_buffers.insert(buffer);
        log::trace!("headless: create buffer {} ({} bytes)", name, desc.size);
        buffer
    }

    fn destroy_buffer(&self, buffer: vk::Buffer) {
        let mut state = self.state.borrow_mut();
        if state.live_buffers.remove(&buffer) {
            state.destroyed_buffers += 1;
        } else {
            log::warn!("headless: destroy unknown buffer {:#x}", buffer.as_raw());
        }
    }

    fn create_image(&self, name: &str, info: &RgImageCreateInfo) -> RgImagePhysical {
        if self.should_fail(name) {
            return RgImagePhysical::default();
        }
        let mut state = self.state.borrow_mut();
        let image = vk::Image::from_raw(state.next_raw());
        let view = vk::ImageView::from_raw(state.next_raw());
        state.created_images += 1;
        state.live_images.insert(image);
        log::trace!(
            "headless: create image {} {}x{} {:?}",
            name,
            info.extent.width,
            info.extent.height,
            info.format
        );
        RgImagePhysical { image, view }
    }

    fn destroy_image(&self, image: RgImagePhysical) {
        let mut state = self.state.borrow_mut();
        if state.live_images.remove(&image.image) {
            state.destroyed_images += 1;
        } else {
            log::warn!("headless: destroy unknown image {:#x}", image.image.as_raw());
        }
    }

    fn create_sampler(&self, name: &str, _desc: &RgSamplerDesc) -> vk::Sampler {
        if self.should_fail(name) {
            return vk::Sampler::null();
        }
        let mut state = self.state.borrow_mut();
        let sampler = vk::Sampler::from_raw(state.next_raw());
        state.created_samplers += 1;
        state.live_samplers.insert(sampler);
        log::trace!("headless: create sampler {}", name);
        sampler
    }

    fn destroy_sampler(&self, sampler: vk::Sampler) {
        self.state.borrow_mut().live_samplers.remove(&sampler);
    }

    fn allocate_descriptor_set(&self, name: &str, layout: &[RgBindingLayout]) -> vk::DescriptorSet {
        if self.should_fail(name) {
            return vk::DescriptorSet::null();
        }
        let mut state = self.state.borrow_mut();
        let set = vk::DescriptorSet::from_raw(state.next_raw());
        state.allocated_descriptor_sets += 1;
        state.live_descriptor_sets.insert(set);
        log::trace!("headless: allocate descriptor set {} with {} binding(s)", name, layout.len());
        set
    }

    fn update_descriptor_sets(&self, writes: &[RgDescriptorWrite]) {
        self.state.borrow_mut().descriptor_writes.extend_from_slice(writes);
    }

    fn free_descriptor_set(&self, descriptor_set: vk::DescriptorSet) {
        self.state.borrow_mut().live_descriptor_sets.remove(&descriptor_set);
    }

    fn create_command_buffer(&self, name: &str, queue: RgQueueType) -> vk::CommandBuffer {
        if self.should_fail(name) {
            return vk::CommandBuffer::null();
        }
        let mut state = self.state.borrow_mut();
        let command_buffer = vk::CommandBuffer::from_raw(state.next_raw());
        state.created_command_buffers += 1;
        state.live_command_buffers.insert(command_buffer);
        log::trace!("headless: create command buffer {} on {:?}", name, queue);
        command_buffer
    }

    fn destroy_command_buffer(&self, command_buffer: vk::CommandBuffer) {
        let mut state = self.state.borrow_mut();
        state.live_command_buffers.remove(&command_buffer);
        state.recorded.remove(&command_buffer);
    }

    fn submit_commands(&self, queue: RgQueueType, command_buffers: &[vk::CommandBuffer]) {
        log::trace!("headless: submit {} command buffer(s) to {:?}", command_buffers.len(), queue);
        self.state.borrow_mut().submissions.push((queue, command_buffers.to_vec()));
    }

    fn swapchain_image_count(&self) -> usize {
        self.image_count
    }

    fn swapchain_extent(&self) -> vk::Extent2D {
        self.extent
    }

    fn swapchain_color_format(&self) -> vk::Format {
        self.color_format
    }

    fn swapchain_depth_format(&self) -> vk::Format {
        self.depth_format
    }

    fn current_frame_index(&self) -> usize {
        self.state.borrow().frame_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_unique_and_tracked() {
        let device = HeadlessDevice::new();
        let a = device.create_buffer("a", &RgBufferDesc::default());
        let b = device.create_buffer("b", &RgBufferDesc::default());

        assert_ne!(a, b);
        assert!(!a.is_null());
        assert_eq!(device.live_buffer_count(), 2);

        device.destroy_buffer(a);
        assert_eq!(device.live_buffer_count(), 1);
        assert_eq!(device.destroyed_buffer_count(), 1);
    }

    #[test]
    fn test_requested_failure_returns_null() {
        let device = HeadlessDevice::new();
        device.fail_creation_of("bad");

        assert!(device.create_sampler("bad", &RgSamplerDesc::default()).is_null());
        assert!(device.create_command_buffer("bad", RgQueueType::Compute).is_null());
        assert!(!device.create_sampler("good", &RgSamplerDesc::default()).is_null());
        assert_eq!(device.created_sampler_count(), 1);
    }

    #[test]
    fn test_recording_restarts_on_begin() {
        let device = HeadlessDevice::new();
        let cmd = device.create_command_buffer("cmd", RgQueueType::Graphics);

        device.cmd_begin(cmd);
        device.cmd_end(cmd);
        device.cmd_begin(cmd);
        device.cmd_end_rendering(cmd);
        device.cmd_end(cmd);

        assert_eq!(
            device.recorded_commands(cmd),
            vec![HeadlessCommand::Begin, HeadlessCommand::EndRendering, HeadlessCommand::End]
        );
    }
}

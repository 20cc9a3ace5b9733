//! Barrier 自动计算
//!
//! 按执行顺序模拟每个物理资源的 `{access, stage, layout}`，
//! 在需要时为 pass 生成前置 barrier。录制时把同一个 pass 的 barrier 合并为一次 pipeline barrier。

use std::collections::HashMap;

use ash::vk;

use crate::error::{RgError, RgResult};
use crate::render_graph::pass::RgPassNode;
use crate::render_graph::resource_handle::RgResourceHandle;
use crate::render_graph::resource_registry::{RgPhysicalResource, RgResourceRegistry};
use crate::render_graph::resource_state::RgResourceUsageState;

/// 一条资源 barrier
///
/// 记录逻辑句柄而不是物理句柄，录制时再解析为当前帧的物理对象。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgResourceBarrierInfo {
    pub handle: RgResourceHandle,
    /// 资源名称（调试用）
    pub name: String,
    pub src_stage: vk::PipelineStageFlags2,
    pub dst_stage: vk::PipelineStageFlags2,
    pub src_access: vk::AccessFlags2,
    pub dst_access: vk::AccessFlags2,
    pub old_layout: vk::ImageLayout,
    pub new_layout: vk::ImageLayout,
    /// 图像 aspect（buffer 为空）
    pub aspect: vk::ImageAspectFlags,
}

impl RgResourceBarrierInfo {
    #[inline]
    pub fn is_image(&self) -> bool {
        matches!(self.handle, RgResourceHandle::Image(_))
    }
}

/// 录制用的图像 barrier
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RgImageBarrier {
    pub image: vk::Image,
    pub src_access: vk::AccessFlags2,
    pub dst_access: vk::AccessFlags2,
    pub old_layout: vk::ImageLayout,
    pub new_layout: vk::ImageLayout,
    pub aspect: vk::ImageAspectFlags,
}

/// 录制用的缓冲区 barrier
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RgBufferBarrier {
    pub buffer: vk::Buffer,
    pub src_access: vk::AccessFlags2,
    pub dst_access: vk::AccessFlags2,
    pub offset: vk::DeviceSize,
    /// WHOLE_SIZE 表示整个缓冲区
    pub size: vk::DeviceSize,
}

/// 一个 pass 的全部前置 barrier，对应一次 `cmd_pipeline_barrier`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgBarrierBatch {
    pub src_stage: vk::PipelineStageFlags2,
    pub dst_stage: vk::PipelineStageFlags2,
    pub image_barriers: Vec<RgImageBarrier>,
    pub buffer_barriers: Vec<RgBufferBarrier>,
}

impl RgBarrierBatch {
    /// 合并 stage mask（按位或），解析出当前帧的物理句柄，并拆分为 image / buffer 两组
    ///
    /// 某一侧的 stage 为空时，src 默认 `TOP_OF_PIPE`，dst 默认 `BOTTOM_OF_PIPE`。
    pub fn build(
        barriers: &[RgResourceBarrierInfo],
        registry: &RgResourceRegistry,
        frame_index: usize,
    ) -> RgResult<Self> {
        let mut src_stage = vk::PipelineStageFlags2::NONE;
        let mut dst_stage = vk::PipelineStageFlags2::NONE;
        let mut image_barriers = Vec::new();
        let mut buffer_barriers = Vec::new();

        for barrier in barriers {
            src_stage |= barrier.src_stage;
            dst_stage |= barrier.dst_stage;

            match registry.physical_resource(barrier.handle, frame_index) {
                Some(RgPhysicalResource::Image(image)) => image_barriers.push(RgImageBarrier {
                    image,
                    src_access: barrier.src_access,
                    dst_access: barrier.dst_access,
                    old_layout: barrier.old_layout,
                    new_layout: barrier.new_layout,
                    aspect: barrier.aspect,
                }),
                Some(RgPhysicalResource::Buffer(buffer)) => buffer_barriers.push(RgBufferBarrier {
                    buffer,
                    src_access: barrier.src_access,
                    dst_access: barrier.dst_access,
                    offset: 0,
                    size: vk::WHOLE_SIZE,
                }),
                None => {
                    log::error!("Barrier on \"{}\" has no physical resource for frame {}", barrier.name, frame_index);
                    return Err(RgError::InvalidHandle(barrier.handle.kind()));
                }
            }
        }

        if src_stage.is_empty() {
            src_stage = vk::PipelineStageFlags2::TOP_OF_PIPE;
        }
        if dst_stage.is_empty() {
            dst_stage = vk::PipelineStageFlags2::BOTTOM_OF_PIPE;
        }

        Ok(Self {
            src_stage,
            dst_stage,
            image_barriers,
            buffer_barriers,
        })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.image_barriers.is_empty() && self.buffer_barriers.is_empty()
    }
}

/// Barrier 分析器
///
/// 按拓扑顺序遍历 pass，对每个 pass 先处理所有读取、再处理所有写入。
/// 状态按物理句柄跟踪（只看 `frame_index` 对应的那一份），
/// 自有资源从 `UNDEFINED` 开始，导入资源从导入时给定的状态开始。
pub struct BarrierAnalyzer;

impl BarrierAnalyzer {
    /// 返回按 pass 下标排列的 barrier 列表
    pub fn analyze(
        passes: &[RgPassNode],
        execution_order: &[usize],
        registry: &RgResourceRegistry,
        frame_index: usize,
    ) -> Vec<Vec<RgResourceBarrierInfo>> {
        let mut barriers = vec![Vec::new(); passes.len()];
        let mut states: HashMap<RgPhysicalResource, RgResourceUsageState> = HashMap::new();

        for &pass_idx in execution_order {
            let pass = &passes[pass_idx];
            let pass_barriers = &mut barriers[pass_idx];

            for access in pass.accesses() {
                let Some(handle) = access.handle else {
                    continue;
                };
                // sampler / shader resource 不参与
                let Some(physical) = registry.physical_resource(handle, frame_index) else {
                    continue;
                };

                let current = states.entry(physical).or_insert_with(|| registry.initial_state(handle));
                let mut requested = access.requested_state();
                // 推导不出 layout 的图像访问保持原 layout
                if matches!(physical, RgPhysicalResource::Image(_)) && requested.layout == vk::ImageLayout::UNDEFINED {
                    requested.layout = current.layout;
                }

                if current.needs_barrier(&requested) {
                    let aspect = match handle {
                        RgResourceHandle::Image(h) => {
                            registry.get_image(h).map(|r| r.infer_aspect()).unwrap_or(vk::ImageAspectFlags::COLOR)
                        }
                        _ => vk::ImageAspectFlags::empty(),
                    };
                    let barrier = RgResourceBarrierInfo {
                        handle,
                        name: access.name.to_string(),
                        src_stage: current.stage,
                        dst_stage: requested.stage,
                        src_access: current.src_access(),
                        dst_access: requested.access,
                        old_layout: current.layout,
                        new_layout: requested.layout,
                        aspect,
                    };
                    log::trace!(
                        "Pass \"{}\": barrier on \"{}\" {:?} -> {:?} ({} -> {})",
                        pass.name,
                        barrier.name,
                        barrier.old_layout,
                        barrier.new_layout,
                        format_access_flags(barrier.src_access),
                        format_access_flags(barrier.dst_access)
                    );
                    pass_barriers.push(barrier);
                    *current = requested;
                } else {
                    // 不需要 barrier 时只刷新 access/stage，layout 不变
                    current.access = requested.access;
                    current.stage = requested.stage;
                }
            }
        }

        barriers
    }
}

/// 格式化 PipelineStageFlags2 为可读字符串
pub(crate) fn format_pipeline_stage(stage: vk::PipelineStageFlags2) -> String {
    const NAMES: &[(vk::PipelineStageFlags2, &str)] = &[
        (vk::PipelineStageFlags2::TOP_OF_PIPE, "TOP_OF_PIPE"),
        (vk::PipelineStageFlags2::BOTTOM_OF_PIPE, "BOTTOM_OF_PIPE"),
        (vk::PipelineStageFlags2::VERTEX_INPUT, "VERTEX_INPUT"),
        (vk::PipelineStageFlags2::VERTEX_SHADER, "VERTEX_SHADER"),
        (vk::PipelineStageFlags2::FRAGMENT_SHADER, "FRAGMENT_SHADER"),
        (vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT, "COLOR_ATTACHMENT_OUTPUT"),
        (vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS, "EARLY_FRAGMENT_TESTS"),
        (vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS, "LATE_FRAGMENT_TESTS"),
        (vk::PipelineStageFlags2::COMPUTE_SHADER, "COMPUTE_SHADER"),
        (vk::PipelineStageFlags2::TRANSFER, "TRANSFER"),
        (vk::PipelineStageFlags2::ALL_GRAPHICS, "ALL_GRAPHICS"),
        (vk::PipelineStageFlags2::ALL_COMMANDS, "ALL_COMMANDS"),
    ];

    if stage == vk::PipelineStageFlags2::NONE {
        return "NONE".to_string();
    }
    let stages: Vec<&str> = NAMES.iter().filter(|(flag, _)| stage.contains(*flag)).map(|(_, name)| *name).collect();
    if stages.is_empty() { format!("{:?}", stage) } else { stages.join(" | ") }
}

/// 格式化 AccessFlags2 为可读字符串
pub(crate) fn format_access_flags(access: vk::AccessFlags2) -> String {
    const NAMES: &[(vk::AccessFlags2, &str)] = &[
        (vk::AccessFlags2::INDIRECT_COMMAND_READ, "INDIRECT_CMD_READ"),
        (vk::AccessFlags2::INDEX_READ, "INDEX_READ"),
        (vk::AccessFlags2::VERTEX_ATTRIBUTE_READ, "VERTEX_ATTR_READ"),
        (vk::AccessFlags2::UNIFORM_READ, "UNIFORM_READ"),
        (vk::AccessFlags2::SHADER_READ, "SHADER_READ"),
        (vk::AccessFlags2::SHADER_WRITE, "SHADER_WRITE"),
        (vk::AccessFlags2::SHADER_SAMPLED_READ, "SHADER_SAMPLED_READ"),
        (vk::AccessFlags2::SHADER_STORAGE_READ, "STORAGE_READ"),
        (vk::AccessFlags2::SHADER_STORAGE_WRITE, "STORAGE_WRITE"),
        (vk::AccessFlags2::COLOR_ATTACHMENT_READ, "COLOR_ATTACH_READ"),
        (vk::AccessFlags2::COLOR_ATTACHMENT_WRITE, "COLOR_ATTACH_WRITE"),
        (vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ, "DEPTH_ATTACH_READ"),
        (vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE, "DEPTH_ATTACH_WRITE"),
        (vk::AccessFlags2::TRANSFER_READ, "TRANSFER_READ"),
        (vk::AccessFlags2::TRANSFER_WRITE, "TRANSFER_WRITE"),
        (vk::AccessFlags2::MEMORY_READ, "MEMORY_READ"),
        (vk::AccessFlags2::MEMORY_WRITE, "MEMORY_WRITE"),
    ];

    if access == vk::AccessFlags2::NONE {
        return "NONE".to_string();
    }
    let flags: Vec<&str> = NAMES.iter().filter(|(flag, _)| access.contains(*flag)).map(|(_, name)| *name).collect();
    if flags.is_empty() { format!("{:?}", access) } else { flags.join(" | ") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless_device::HeadlessDevice;
    use crate::render_graph::buffer_resource::RgBufferDesc;
    use crate::render_graph::image_resource::RgImageDesc;
    use crate::render_graph::pass::{RgClosureExecutor, RgPassBuilder, RgQueueType};
    use crate::render_graph::resource_handle::RgResourceKind;

    /// 构造一个 pass 并直接解析名字（跳过 graph 的 compile 流程）
    fn make_pass(
        id: usize,
        registry: &mut RgResourceRegistry,
        setup: impl FnOnce(&mut RgPassBuilder),
    ) -> RgPassNode {
        let mut builder = RgPassBuilder::new(format!("pass-{id}"), RgQueueType::Graphics, registry, 1);
        setup(&mut builder);
        let mut node = RgPassNode::new(id, builder, Box::new(RgClosureExecutor { callback: Box::new(|_| {}) }));
        for read in &mut node.reads {
            read.handle = registry.lookup(read.kind, &read.name);
        }
        for write in &mut node.writes {
            write.handle = registry.lookup(write.kind, &write.name);
        }
        node
    }

    #[test]
    fn test_write_then_read_single_barrier() {
        let device = HeadlessDevice::new();
        let mut registry = RgResourceRegistry::new();
        let image = registry.define_image("albedo", RgImageDesc::swapchain_color(), 1);
        registry.materialize_image(&device, image).unwrap();

        let passes = vec![
            make_pass(0, &mut registry, |b| {
                b.color_attachment("albedo", None);
            }),
            make_pass(1, &mut registry, |b| {
                b.sample_image("albedo");
            }),
        ];

        let barriers = BarrierAnalyzer::analyze(&passes, &[0, 1], &registry, 0);

        assert_eq!(barriers[1].len(), 1);
        assert_eq!(barriers[1][0].old_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(barriers[1][0].new_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        assert_eq!(barriers[1][0].src_access, vk::AccessFlags2::COLOR_ATTACHMENT_WRITE);
        assert_eq!(barriers[1][0].dst_access, vk::AccessFlags2::SHADER_READ);
        assert_eq!(barriers[1][0].aspect, vk::ImageAspectFlags::COLOR);
    }

    #[test]
    fn test_read_after_read_no_barrier() {
        let device = HeadlessDevice::new();
        let mut registry = RgResourceRegistry::new();
        let image = registry.define_image("shadow", RgImageDesc::swapchain_depth(), 1);
        registry.materialize_image(&device, image).unwrap();

        let passes = vec![
            make_pass(0, &mut registry, |b| {
                b.depth_attachment("shadow", Some((1.0, 0)));
            }),
            make_pass(1, &mut registry, |b| {
                b.sample_image("shadow");
            }),
            make_pass(2, &mut registry, |b| {
                b.sample_image("shadow");
            }),
        ];

        let barriers = BarrierAnalyzer::analyze(&passes, &[0, 1, 2], &registry, 0);

        assert_eq!(barriers[1].len(), 1);
        assert_eq!(barriers[1][0].aspect, vk::ImageAspectFlags::DEPTH);
        assert!(barriers[2].is_empty());
    }

    #[test]
    fn test_buffer_read_after_read_refreshes_stage() {
        let device = HeadlessDevice::new();
        let mut registry = RgResourceRegistry::new();
        let buffer = registry.define_buffer("camera", RgBufferDesc::new(64, vk::BufferUsageFlags::UNIFORM_BUFFER), 1);
        registry.materialize_buffer(&device, buffer).unwrap();

        let passes = vec![
            make_pass(0, &mut registry, |b| {
                b.read_uniform_buffer("camera");
            }),
            make_pass(1, &mut registry, |b| {
                b.write_buffer(
                    "camera",
                    vk::AccessFlags2::TRANSFER_WRITE,
                    vk::PipelineStageFlags2::TRANSFER,
                );
            }),
        ];

        let barriers = BarrierAnalyzer::analyze(&passes, &[0, 1], &registry, 0);

        // 第一次读取：UNDEFINED -> 读，没有 layout、没有写
        assert!(barriers[0].is_empty());
        // 写入时 src 为上一次读取的 stage，src access 去掉了读
        assert_eq!(barriers[1].len(), 1);
        assert_eq!(barriers[1][0].src_stage, vk::PipelineStageFlags2::FRAGMENT_SHADER);
        assert_eq!(barriers[1][0].src_access, vk::AccessFlags2::NONE);
        assert_eq!(barriers[1][0].aspect, vk::ImageAspectFlags::empty());
    }

    #[test]
    fn test_imported_initial_state() {
        let device = HeadlessDevice::new();
        let mut registry = RgResourceRegistry::new();
        let history = registry.define_image("history", RgImageDesc::swapchain_color(), 1);
        registry.materialize_image(&device, history).unwrap();
        let physical = registry.physical_image(history, 0).unwrap();
        registry.import_image(
            "present",
            vec![physical],
            vk::Extent2D { width: 1, height: 1 },
            vk::Format::B8G8R8A8_UNORM,
            RgResourceUsageState::SHADER_READ_FRAGMENT,
        )
        .unwrap();

        let passes = vec![make_pass(0, &mut registry, |b| {
            b.sample_image("present");
        })];
        let barriers = BarrierAnalyzer::analyze(&passes, &[0], &registry, 0);

        assert!(barriers[0].is_empty());
    }

    #[test]
    fn test_batch_merges_stages() {
        let device = HeadlessDevice::new();
        let mut registry = RgResourceRegistry::new();
        let color = registry.define_image("color", RgImageDesc::swapchain_color(), 2);
        let buffer = registry.define_buffer("indirect", RgBufferDesc::default(), 2);
        registry.materialize_image(&device, color).unwrap();
        registry.materialize_buffer(&device, buffer).unwrap();

        let barriers = vec![
            RgResourceBarrierInfo {
                handle: color.into(),
                name: "color".into(),
                src_stage: vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
                dst_stage: vk::PipelineStageFlags2::FRAGMENT_SHADER,
                src_access: vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
                dst_access: vk::AccessFlags2::SHADER_READ,
                old_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                new_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                aspect: vk::ImageAspectFlags::COLOR,
            },
            RgResourceBarrierInfo {
                handle: buffer.into(),
                name: "indirect".into(),
                src_stage: vk::PipelineStageFlags2::COMPUTE_SHADER,
                dst_stage: vk::PipelineStageFlags2::NONE,
                src_access: vk::AccessFlags2::SHADER_STORAGE_WRITE,
                dst_access: vk::AccessFlags2::INDIRECT_COMMAND_READ,
                old_layout: vk::ImageLayout::UNDEFINED,
                new_layout: vk::ImageLayout::UNDEFINED,
                aspect: vk::ImageAspectFlags::empty(),
            },
        ];

        let batch = RgBarrierBatch::build(&barriers, &registry, 1).unwrap();

        assert_eq!(
            batch.src_stage,
            vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT | vk::PipelineStageFlags2::COMPUTE_SHADER
        );
        assert_eq!(batch.dst_stage, vk::PipelineStageFlags2::FRAGMENT_SHADER);
        assert_eq!(batch.image_barriers.len(), 1);
        assert_eq!(batch.buffer_barriers.len(), 1);
        // 解析为第 1 帧的物理对象
        assert_eq!(batch.image_barriers[0].image, registry.physical_image(color, 1).unwrap().image);
        assert_eq!(batch.buffer_barriers[0].buffer, registry.physical_buffer(buffer, 1).unwrap());
    }

    #[test]
    fn test_batch_default_stages() {
        let registry = RgResourceRegistry::new();
        let batch = RgBarrierBatch::build(&[], &registry, 0).unwrap();
        assert_eq!(batch.src_stage, vk::PipelineStageFlags2::TOP_OF_PIPE);
        assert_eq!(batch.dst_stage, vk::PipelineStageFlags2::BOTTOM_OF_PIPE);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_batch_stale_handle() {
        let device = HeadlessDevice::new();
        let mut registry = RgResourceRegistry::new();
        let color = registry.define_image("color", RgImageDesc::swapchain_color(), 1);
        registry.materialize_image(&device, color).unwrap();
        let barrier = RgResourceBarrierInfo {
            handle: color.into(),
            name: "color".into(),
            src_stage: vk::PipelineStageFlags2::TOP_OF_PIPE,
            dst_stage: vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
            src_access: vk::AccessFlags2::NONE,
            dst_access: vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
            old_layout: vk::ImageLayout::UNDEFINED,
            new_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            aspect: vk::ImageAspectFlags::COLOR,
        };
        registry.clear(&device);

        let err = RgBarrierBatch::build(&[barrier], &registry, 0).unwrap_err();
        assert!(matches!(err, RgError::InvalidHandle(RgResourceKind::Image)));
    }

    #[test]
    fn test_format_flags() {
        assert_eq!(format_access_flags(vk::AccessFlags2::NONE), "NONE");
        assert_eq!(
            format_pipeline_stage(vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS),
            "EARLY_FRAGMENT_TESTS | LATE_FRAGMENT_TESTS"
        );
    }
}

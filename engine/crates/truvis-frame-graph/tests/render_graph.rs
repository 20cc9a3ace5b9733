use std::rc::Rc;

use ash::vk;
use ash::vk::Handle;
use rstest::rstest;
use truvis_frame_graph::logging::init_test_log;
use truvis_frame_graph::{
    HeadlessCommand, HeadlessDevice, RenderGraph, RgBindingLayout, RgBindingPayload, RgBufferBinding, RgBufferDesc,
    RgConfig, RgError, RgErrorKind, RgGraphState, RgImageBinding, RgImageDesc, RgImagePhysical, RgPass,
    RgPassBuilder, RgPassContext, RgQueueType, RgResourceKind, RgResourceUsageState, RgSamplerDesc,
    RgShaderResourceBinding, RgWriterPolicy,
};

fn new_graph(config: RgConfig) -> (Rc<HeadlessDevice>, RenderGraph) {
    init_test_log();
    let device = Rc::new(HeadlessDevice::new());
    let graph = RenderGraph::new(device.clone(), config).unwrap();
    (device, graph)
}

fn policy_config(writer_policy: RgWriterPolicy) -> RgConfig {
    RgConfig {
        writer_policy,
        ..Default::default()
    }
}

#[test]
fn test_define_is_idempotent() {
    let (_device, mut graph) = new_graph(RgConfig::default());

    let a = graph.define_image("albedo", RgImageDesc::swapchain_color());
    let b = graph.define_image("albedo", RgImageDesc::swapchain_depth());
    assert_eq!(a, b);
    assert_eq!(graph.registry().image_count(), 1);

    let camera = graph.define_buffer("camera", RgBufferDesc::new(64, vk::BufferUsageFlags::UNIFORM_BUFFER));
    assert_eq!(graph.define_buffer("camera", RgBufferDesc::default()), camera);
    assert_eq!(graph.registry().buffer_count(), 1);

    let linear = graph.define_sampler("linear", RgSamplerDesc::default());
    assert_eq!(graph.define_sampler("linear", RgSamplerDesc::nearest_clamp()), linear);
}

#[rstest]
#[case::nearest_prior(RgWriterPolicy::NearestPriorWriter)]
#[case::global_last(RgWriterPolicy::GlobalLastWriter)]
fn test_reader_runs_after_writer(#[case] policy: RgWriterPolicy) {
    let (_device, mut graph) = new_graph(policy_config(policy));
    graph.define_image("shadow", RgImageDesc::swapchain_depth());
    graph.define_image("color", RgImageDesc::swapchain_color());
    graph.define_buffer("lights", RgBufferDesc::new(1024, vk::BufferUsageFlags::STORAGE_BUFFER));

    graph.add_compute_pass(
        "cull_lights",
        |b| {
            b.write_buffer("lights", vk::AccessFlags2::SHADER_STORAGE_WRITE, vk::PipelineStageFlags2::COMPUTE_SHADER);
        },
        |_| {},
    );
    graph.add_graphics_pass(
        "shadow",
        |b| {
            b.depth_attachment("shadow", Some((1.0, 0)));
        },
        |_| {},
    );
    graph.add_graphics_pass(
        "forward",
        |b| {
            b.sample_image("shadow")
                .read_buffer("lights", vk::AccessFlags2::SHADER_STORAGE_READ, vk::PipelineStageFlags2::FRAGMENT_SHADER)
                .color_attachment("color", Some([0.0; 4]));
        },
        |_| {},
    );
    graph.compile().unwrap();

    let order = graph.execution_order_names();
    let position = |name: &str| order.iter().position(|n| *n == name).unwrap();
    assert_eq!(order.len(), 3);
    assert!(position("shadow") < position("forward"));
    assert!(position("cull_lights") < position("forward"));
}

#[test]
fn test_undefined_resource_fails_without_side_effects() {
    let (device, mut graph) = new_graph(RgConfig::default());
    graph.add_graphics_pass(
        "lighting",
        |b| {
            b.sample_image("albedo").color_attachment("lighting_output", None);
        },
        |_| {},
    );

    let err = graph.compile().unwrap_err();
    assert!(matches!(
        &err,
        RgError::UndefinedResource { pass, kind: RgResourceKind::Image, name } if pass == "lighting" && name == "albedo"
    ));
    assert_eq!(err.kind(), RgErrorKind::Configuration);
    assert_ne!(graph.state(), RgGraphState::Compiled);

    assert!(matches!(graph.execute(), Err(RgError::NotCompiled(_))));
    assert!(device.submissions().is_empty());
    assert_eq!(device.created_command_buffer_count(), 0);
}

#[test]
fn test_cycle_fails_compile() {
    // a 读 b 的输出，b 读 a 的输出
    let (device, mut graph) = new_graph(RgConfig::default());
    graph.define_image("x", RgImageDesc::swapchain_color());
    graph.define_image("y", RgImageDesc::swapchain_color());
    graph.add_graphics_pass(
        "a",
        |b| {
            b.sample_image("x").color_attachment("y", None);
        },
        |_| {},
    );
    graph.add_graphics_pass(
        "b",
        |b| {
            b.sample_image("y").color_attachment("x", None);
        },
        |_| {},
    );

    let err = graph.compile().unwrap_err();
    assert_eq!(err.kind(), RgErrorKind::Structural);
    match err {
        RgError::CyclicDependency {
            sorted,
            total,
            remaining,
        } => {
            assert!(sorted < total);
            assert_eq!(total, 2);
            assert_eq!(remaining, vec!["a".to_string(), "b".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(graph.execute().is_err());
    assert!(device.submissions().is_empty());
    assert_eq!(device.created_image_count(), 0);
}

#[test]
fn test_nearest_prior_writer_has_no_cycle() {
    // 同样的两个 pass，nearest prior 只让 b 依赖 a
    let (_device, mut graph) = new_graph(policy_config(RgWriterPolicy::NearestPriorWriter));
    graph.define_image("x", RgImageDesc::swapchain_color());
    graph.define_image("y", RgImageDesc::swapchain_color());
    graph.add_graphics_pass(
        "a",
        |b| {
            b.sample_image("x").color_attachment("y", None);
        },
        |_| {},
    );
    graph.add_graphics_pass(
        "b",
        |b| {
            b.sample_image("y").color_attachment("x", None);
        },
        |_| {},
    );

    graph.compile().unwrap();
    assert_eq!(graph.execution_order_names(), vec!["a", "b"]);
}

#[test]
fn test_materialize_once_across_compiles() {
    let (device, mut graph) = new_graph(RgConfig::default());
    let color = graph.define_image("color", RgImageDesc::swapchain_color());
    graph.define_buffer("camera", RgBufferDesc::new(256, vk::BufferUsageFlags::UNIFORM_BUFFER));
    graph.add_graphics_pass(
        "draw",
        |b| {
            b.read_uniform_buffer("camera").color_attachment("color", None);
        },
        |_| {},
    );

    graph.compile().unwrap();
    let images = graph.registry().get_image(color).unwrap().physical_all().to_vec();
    let camera = graph.get_physical_buffer_by_name("camera").unwrap();

    graph.compile().unwrap();
    assert_eq!(graph.registry().get_image(color).unwrap().physical_all(), images.as_slice());
    assert_eq!(graph.get_physical_buffer_by_name("camera"), Some(camera));
    assert_eq!(device.created_image_count(), 3);
    assert_eq!(device.created_buffer_count(), 3);
}

#[test]
fn test_unreferenced_resource_not_materialized() {
    let (device, mut graph) = new_graph(RgConfig::default());
    graph.define_image("color", RgImageDesc::swapchain_color());
    graph.define_image("unused", RgImageDesc::swapchain_color());
    graph.add_graphics_pass(
        "draw",
        |b| {
            b.color_attachment("color", None);
        },
        |_| {},
    );
    graph.compile().unwrap();

    assert_eq!(device.created_image_count(), 3);
    assert!(graph.get_physical_image_by_name("unused").is_none());
}

#[test]
fn test_barriers_between_write_and_reads() {
    let (_device, mut graph) = new_graph(RgConfig::default());
    graph.define_image("color", RgImageDesc::swapchain_color());
    graph.define_image("blur", RgImageDesc::swapchain_color());
    graph.define_image("bloom", RgImageDesc::swapchain_color());
    graph.add_graphics_pass(
        "draw",
        |b| {
            b.color_attachment("color", Some([0.0; 4]));
        },
        |_| {},
    );
    graph.add_graphics_pass(
        "blur",
        |b| {
            b.sample_image("color").color_attachment("blur", None);
        },
        |_| {},
    );
    graph.add_graphics_pass(
        "bloom",
        |b| {
            b.sample_image("color").color_attachment("bloom", None);
        },
        |_| {},
    );
    graph.compile().unwrap();

    // 写后读：一条 COLOR_ATTACHMENT -> SHADER_READ_ONLY
    let color_barriers =
        |pass: &str| graph.pass(pass).unwrap().barriers().iter().filter(|b| b.name == "color").cloned().collect::<Vec<_>>();
    let blur = color_barriers("blur");
    assert_eq!(blur.len(), 1);
    assert_eq!(blur[0].old_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
    assert_eq!(blur[0].new_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    assert_eq!(blur[0].src_access, vk::AccessFlags2::COLOR_ATTACHMENT_WRITE);
    assert_eq!(blur[0].dst_stage, vk::PipelineStageFlags2::FRAGMENT_SHADER);

    // 读后读：不需要 barrier
    assert!(color_barriers("bloom").is_empty());
}

#[test]
fn test_deferred_scenario() {
    const TARGETS: [&str; 4] = ["albedo", "normal", "position", "material"];

    let (device, mut graph) = new_graph(RgConfig::default());
    for target in TARGETS {
        graph.define_image(target, RgImageDesc::swapchain_color());
    }
    graph.define_image("depth", RgImageDesc::swapchain_depth());
    graph.define_image("lighting_output", RgImageDesc::swapchain_color());

    graph.add_graphics_pass(
        "gbuffer",
        |b| {
            for target in TARGETS {
                b.color_attachment(target, Some([0.0; 4]));
            }
            b.depth_attachment("depth", Some((1.0, 0)));
        },
        |_| {},
    );
    graph.add_graphics_pass(
        "lighting",
        |b| {
            for target in TARGETS {
                b.sample_image(target);
            }
            b.sample_image("depth").color_attachment("lighting_output", None);
        },
        |ctx| {
            assert!(ctx.get_image_view("albedo").is_some());
            assert!(ctx.get_image_view("depth").is_some());
            assert!(ctx.get_image_view("nonexistent").is_none());
        },
    );
    graph.compile().unwrap();

    assert_eq!(graph.execution_order_names(), vec!["gbuffer", "lighting"]);

    let lighting = graph.pass("lighting").unwrap();
    let read_barriers: Vec<_> = lighting.barriers().iter().filter(|b| b.name != "lighting_output").collect();
    assert_eq!(read_barriers.len(), 5);
    for barrier in &read_barriers {
        assert_eq!(barrier.new_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        let expected_old = if barrier.name == "depth" {
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
        } else {
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
        };
        assert_eq!(barrier.old_layout, expected_old, "{}", barrier.name);
    }
    let depth = read_barriers.iter().find(|b| b.name == "depth").unwrap();
    assert_eq!(depth.aspect, vk::ImageAspectFlags::DEPTH);

    // 输出只有首次使用的 layout 转换
    let output: Vec<_> = lighting.barriers().iter().filter(|b| b.name == "lighting_output").collect();
    assert_eq!(output.len(), 1);
    assert_eq!(output[0].old_layout, vk::ImageLayout::UNDEFINED);

    graph.execute().unwrap();
    let submissions = device.submissions();
    assert_eq!(submissions.len(), 1);
    let (queue, command_buffers) = &submissions[0];
    assert_eq!(*queue, RgQueueType::Graphics);
    assert_eq!(command_buffers.len(), 2);

    let lighting_cmd = command_buffers[1];
    let batches = device.barrier_batches(lighting_cmd);
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].image_barriers.len(), 6);
    assert!(batches[0].src_stage.contains(vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT));

    let rendering = device.rendering_infos(command_buffers[0]);
    assert_eq!(rendering.len(), 1);
    assert_eq!(rendering[0].color_attachments.len(), 4);
    assert!(rendering[0].depth_attachment.is_some());
    assert_eq!(rendering[0].color_attachments[0].load_op, vk::AttachmentLoadOp::CLEAR);
    assert_eq!(rendering[0].render_area.extent, vk::Extent2D { width: 1280, height: 720 });
}

#[test]
fn test_record_order_and_compute_has_no_rendering() {
    let (device, mut graph) = new_graph(RgConfig::default());
    graph.define_image("hdr", RgImageDesc::swapchain_color().with_usage(vk::ImageUsageFlags::STORAGE));
    graph.add_compute_pass(
        "tonemap",
        |b| {
            b.write_storage_image("hdr");
        },
        |_| {},
    );
    graph.compile().unwrap();
    graph.execute().unwrap();

    let cmd = graph.pass("tonemap").unwrap().command_buffer(0).unwrap();
    assert_eq!(
        device.recorded_commands(cmd),
        vec![
            HeadlessCommand::Begin,
            HeadlessCommand::PipelineBarrier(device.barrier_batches(cmd)[0].clone()),
            HeadlessCommand::End,
        ]
    );
    assert_eq!(device.barrier_batches(cmd)[0].image_barriers[0].new_layout, vk::ImageLayout::GENERAL);
}

#[test]
fn test_frame_index_selects_physical_copy() {
    let (device, mut graph) = new_graph(RgConfig::default());
    let color = graph.define_image("color", RgImageDesc::swapchain_color());
    graph.add_graphics_pass(
        "draw",
        |b| {
            b.color_attachment("color", None);
        },
        |_| {},
    );
    graph.compile().unwrap();

    for frame in [0usize, 1, 2, 4] {
        device.set_frame_index(frame);
        graph.execute().unwrap();

        let expected_image = graph.registry().physical_image(color, frame).unwrap();
        assert_eq!(graph.get_physical_image(color), Some(expected_image));

        let (_, command_buffers) = device.submissions().last().cloned().unwrap();
        let cmd = graph.pass("draw").unwrap().command_buffer(frame).unwrap();
        assert_eq!(command_buffers, vec![cmd]);
        assert_eq!(device.barrier_batches(cmd)[0].image_barriers[0].image, expected_image.image);
    }
}

#[test]
fn test_clear_then_compile_recreates_resources() {
    let (device, mut graph) = new_graph(RgConfig::default());
    let color = graph.define_image("color", RgImageDesc::swapchain_color());
    graph.add_graphics_pass(
        "draw",
        |b| {
            b.color_attachment("color", None);
        },
        |_| {},
    );
    graph.compile().unwrap();
    let before = graph.get_physical_image(color).unwrap();

    graph.clear();
    assert_eq!(graph.state(), RgGraphState::Unconfigured);
    assert_eq!(device.live_image_count(), 0);
    assert_eq!(device.live_command_buffer_count(), 0);
    // 旧句柄在 clear 之后失效
    assert!(graph.get_physical_image(color).is_none());

    let color = graph.define_image("color", RgImageDesc::swapchain_color());
    graph.add_graphics_pass(
        "draw",
        |b| {
            b.color_attachment("color", None);
        },
        |_| {},
    );
    graph.compile().unwrap();
    let after = graph.get_physical_image(color).unwrap();

    assert_ne!(before, after);
    assert_eq!(device.created_image_count(), 6);
}

#[rstest]
#[case::nearest_prior(RgWriterPolicy::NearestPriorWriter, vec!["a", "b", "c"])]
#[case::global_last(RgWriterPolicy::GlobalLastWriter, vec!["a", "c", "b"])]
fn test_writer_policy(#[case] policy: RgWriterPolicy, #[case] expected: Vec<&str>) {
    // A 写 x，B 读 x，C 写 x
    let (_device, mut graph) = new_graph(policy_config(policy));
    graph.define_image("x", RgImageDesc::swapchain_color());
    graph.add_graphics_pass(
        "a",
        |b| {
            b.color_attachment("x", Some([0.0; 4]));
        },
        |_| {},
    );
    graph.add_graphics_pass(
        "b",
        |b| {
            b.sample_image("x");
        },
        |_| {},
    );
    graph.add_graphics_pass(
        "c",
        |b| {
            b.color_attachment("x", None);
        },
        |_| {},
    );
    graph.compile().unwrap();

    assert_eq!(graph.execution_order_names(), expected);
}

#[rstest]
#[case::wrong_kind(
    RgBindingPayload::Samplers(vec!["linear".into()]),
    RgErrorKind::Configuration
)]
#[case::wrong_count(
    RgBindingPayload::Images(vec![RgImageBinding::new("albedo", Some("linear"))]),
    RgErrorKind::Configuration
)]
fn test_shader_resource_update_rejected(#[case] payload: RgBindingPayload, #[case] kind: RgErrorKind) {
    let (device, mut graph) = new_graph(RgConfig::default());
    let set = graph
        .define_shader_resource("gbuffer_inputs", &[RgBindingLayout::sampled_images(0, 2, vk::ShaderStageFlags::FRAGMENT)])
        .unwrap();

    let err = graph.update_shader_resource(set, &[RgShaderResourceBinding::new(0, payload)]).unwrap_err();
    assert_eq!(err.kind(), kind);
    assert!(matches!(err, RgError::KindMismatch { .. } | RgError::ArraySizeMismatch { .. }));

    // 没有部分写入：compile 时不会产生 descriptor write
    graph.compile().unwrap();
    assert!(device.descriptor_writes().is_empty());
}

#[test]
fn test_shader_resource_written_on_compile() {
    let (device, mut graph) = new_graph(RgConfig::default());
    graph.define_image("albedo", RgImageDesc::swapchain_color());
    graph.define_buffer("camera", RgBufferDesc::new(256, vk::BufferUsageFlags::UNIFORM_BUFFER));
    graph.define_sampler("linear", RgSamplerDesc::default());
    let set = graph
        .define_shader_resource(
            "material",
            &[
                RgBindingLayout::uniform_buffer(0, vk::ShaderStageFlags::FRAGMENT),
                RgBindingLayout::sampled_images(1, 1, vk::ShaderStageFlags::FRAGMENT),
            ],
        )
        .unwrap();
    graph
        .update_shader_resource(
            set,
            &[
                RgShaderResourceBinding::new(0, RgBindingPayload::Buffers(vec![RgBufferBinding::whole("camera")])),
                RgShaderResourceBinding::new(
                    1,
                    RgBindingPayload::Images(vec![RgImageBinding::new("albedo", Some("linear"))]),
                ),
            ],
        )
        .unwrap();
    graph.add_graphics_pass(
        "draw",
        |b| {
            b.use_shader_resource("material");
        },
        |ctx| {
            assert!(ctx.get_descriptor_set("material").is_some());
        },
    );
    graph.compile().unwrap();
    graph.execute().unwrap();

    // 每个 frame in flight 每个 binding 一条
    let writes = device.descriptor_writes();
    assert_eq!(writes.len(), 3 * 2);
    assert!(writes.iter().all(|w| !w.dst_set.is_null()));
    assert_eq!(graph.get_descriptor_set(set), graph.get_descriptor_set_by_name("material"));
    // 被绑定引用的资源按需物化
    assert!(graph.get_physical_image_by_name("albedo").is_some());
    assert!(graph.get_physical_sampler_by_name("linear").is_some());
}

#[test]
fn test_imported_resources_survive_clear() {
    let (device, mut graph) = new_graph(RgConfig::default());
    let backbuffer = RgImagePhysical {
        image: vk::Image::from_raw(0xdead_0001),
        view: vk::ImageView::from_raw(0xdead_0002),
    };
    let present_state = RgResourceUsageState::new(
        vk::AccessFlags2::NONE,
        vk::PipelineStageFlags2::BOTTOM_OF_PIPE,
        vk::ImageLayout::PRESENT_SRC_KHR,
    );
    let handle = graph.import_image(
        "backbuffer",
        vec![backbuffer],
        vk::Extent2D { width: 800, height: 600 },
        vk::Format::B8G8R8A8_SRGB,
        present_state,
    )
    .unwrap();
    graph.add_graphics_pass(
        "present_blit",
        |b| {
            b.color_attachment("backbuffer", None);
        },
        |_| {},
    );
    graph.compile().unwrap();

    assert_eq!(graph.get_physical_image(handle), Some(backbuffer));
    assert_eq!(device.created_image_count(), 0);
    let barriers = graph.pass("present_blit").unwrap().barriers();
    assert_eq!(barriers.len(), 1);
    assert_eq!(barriers[0].old_layout, vk::ImageLayout::PRESENT_SRC_KHR);

    graph.clear();
    assert_eq!(device.destroyed_image_count(), 0);
}

#[rstest]
#[case::empty(vec![])]
#[case::null_image(vec![RgImagePhysical { image: vk::Image::null(), view: vk::ImageView::from_raw(0xdead_0002) }])]
#[case::null_view(vec![RgImagePhysical { image: vk::Image::from_raw(0xdead_0001), view: vk::ImageView::null() }])]
fn test_invalid_import_rejected(#[case] physical: Vec<RgImagePhysical>) {
    let (device, mut graph) = new_graph(RgConfig::default());

    let err = graph
        .import_image(
            "external",
            physical,
            vk::Extent2D { width: 800, height: 600 },
            vk::Format::B8G8R8A8_SRGB,
            RgResourceUsageState::UNDEFINED,
        )
        .unwrap_err();
    assert!(matches!(&err, RgError::InvalidImport { kind: RgResourceKind::Image, name, .. } if name == "external"));
    assert_eq!(err.kind(), RgErrorKind::Configuration);
    assert!(graph.registry().image_handle("external").is_none());

    // 导入失败的名字不会被当作已定义的资源
    graph.add_graphics_pass(
        "draw",
        |b| {
            b.color_attachment("external", None);
        },
        |_| {},
    );
    let err = graph.compile().unwrap_err();
    assert!(matches!(&err, RgError::UndefinedResource { name, .. } if name == "external"));
    graph.execute().unwrap_err();
    assert!(device.submissions().is_empty());
}

#[test]
fn test_null_buffer_and_sampler_import_rejected() {
    let (_device, mut graph) = new_graph(RgConfig::default());

    let err = graph
        .import_buffer(
            "external",
            vec![vk::Buffer::from_raw(0xbeef), vk::Buffer::null()],
            RgBufferDesc::default(),
            RgResourceUsageState::UNDEFINED,
        )
        .unwrap_err();
    assert!(matches!(err, RgError::InvalidImport { kind: RgResourceKind::Buffer, .. }));

    let err = graph.import_sampler("external", vk::Sampler::null()).unwrap_err();
    assert!(matches!(err, RgError::InvalidImport { kind: RgResourceKind::Sampler, .. }));
    assert_eq!(graph.registry().buffer_count(), 0);
}

#[test]
fn test_execute_before_compile() {
    let (device, mut graph) = new_graph(RgConfig::default());
    graph.define_image("color", RgImageDesc::swapchain_color());

    let err = graph.execute().unwrap_err();
    assert!(matches!(err, RgError::NotCompiled(RgGraphState::ResourcesDeclared)));
    assert!(device.submissions().is_empty());
}

struct ClearPass {
    target: &'static str,
    executed: Rc<std::cell::Cell<usize>>,
}

impl RgPass for ClearPass {
    fn setup(&mut self, builder: &mut RgPassBuilder) {
        builder.define_image(self.target, RgImageDesc::swapchain_color());
        builder.color_attachment(self.target, Some([1.0, 0.0, 1.0, 1.0]));
    }

    fn execute(&mut self, ctx: &mut RgPassContext<'_>) {
        assert!(ctx.get_image(self.target).is_some());
        self.executed.set(self.executed.get() + 1);
    }
}

#[test]
fn test_trait_pass_executes_every_frame() {
    let (_device, mut graph) = new_graph(RgConfig::default());
    let executed = Rc::new(std::cell::Cell::new(0));
    graph.add_pass(
        "clear",
        RgQueueType::Graphics,
        ClearPass {
            target: "canvas",
            executed: executed.clone(),
        },
    );
    graph.compile().unwrap();
    graph.execute().unwrap();
    graph.execute().unwrap();

    assert_eq!(executed.get(), 2);
}

//! 无 GPU 的延迟渲染 demo
//!
//! GBuffer pass 写 4 个颜色附件和深度，Lighting pass 通过 shader resource 采样它们，
//! 编译后执行若干帧并打印每帧的提交情况。

use std::rc::Rc;

use ash::vk;
use truvis_frame_graph::logging::init_log;
use truvis_frame_graph::{
    HeadlessDevice, RenderGraph, RgBindingLayout, RgBindingPayload, RgBufferBinding, RgBufferDesc, RgConfig,
    RgImageBinding, RgImageDesc, RgSamplerDesc, RgShaderResourceBinding,
};

const GBUFFER_TARGETS: [&str; 4] = ["albedo", "normal", "position", "material"];
const FRAME_COUNT: usize = 6;

const CONFIG: &str = r#"
frames_in_flight = 3
writer_policy = "nearest_prior_writer"
print_plan_on_compile = true
"#;

fn main() -> anyhow::Result<()> {
    init_log();

    #[cfg(feature = "profiling")]
    {
        tracy_client::Client::start();
        tracy_client::set_thread_name!("MainThread");
    }

    let device = Rc::new(HeadlessDevice::new());
    let config = RgConfig::from_toml_str(CONFIG)?;
    let frames_in_flight = config.frames_in_flight;
    let mut graph = RenderGraph::new(device.clone(), config)?;

    // 资源
    for target in GBUFFER_TARGETS {
        graph.define_image(target, RgImageDesc::swapchain_color());
    }
    graph.define_image("depth", RgImageDesc::swapchain_depth());
    graph.define_image("lighting_output", RgImageDesc::swapchain_color());
    graph.define_buffer("camera", RgBufferDesc::new(256, vk::BufferUsageFlags::UNIFORM_BUFFER));
    graph.define_sampler("linear", RgSamplerDesc::default());

    let lighting_set = graph.define_shader_resource(
        "lighting_inputs",
        &[
            RgBindingLayout::uniform_buffer(0, vk::ShaderStageFlags::FRAGMENT),
            RgBindingLayout::sampled_images(1, GBUFFER_TARGETS.len() + 1, vk::ShaderStageFlags::FRAGMENT),
        ],
    )?;
    let mut gbuffer_bindings: Vec<RgImageBinding> =
        GBUFFER_TARGETS.iter().map(|target| RgImageBinding::new(*target, Some("linear"))).collect();
    gbuffer_bindings.push(RgImageBinding::new("depth", Some("linear")));
    graph.update_shader_resource(
        lighting_set,
        &[
            RgShaderResourceBinding::new(0, RgBindingPayload::Buffers(vec![RgBufferBinding::whole("camera")])),
            RgShaderResourceBinding::new(1, RgBindingPayload::Images(gbuffer_bindings)),
        ],
    )?;

    // pass
    graph.add_graphics_pass(
        "gbuffer",
        |b| {
            for target in GBUFFER_TARGETS {
                b.color_attachment(target, Some([0.0, 0.0, 0.0, 1.0]));
            }
            b.depth_attachment("depth", Some((1.0, 0))).read_uniform_buffer("camera");
        },
        |ctx| {
            let extent = ctx.get_image_extent("albedo");
            log::debug!("[{}] frame {}: draw scene at {:?}", ctx.pass_name(), ctx.frame_index(), extent);
        },
    );
    graph.add_graphics_pass(
        "lighting",
        |b| {
            for target in GBUFFER_TARGETS {
                b.sample_image(target);
            }
            b.sample_image("depth")
                .read_uniform_buffer("camera")
                .use_shader_resource("lighting_inputs")
                .color_attachment("lighting_output", None);
        },
        |ctx| {
            let set = ctx.get_descriptor_set("lighting_inputs");
            log::debug!("[{}] frame {}: bind {:?}, draw fullscreen", ctx.pass_name(), ctx.frame_index(), set);
        },
    );

    graph.compile()?;
    log::info!("execution order: {:?}", graph.execution_order_names());

    for frame in 0..FRAME_COUNT {
        device.set_frame_index(frame % frames_in_flight);
        graph.execute()?;
        #[cfg(feature = "profiling")]
        tracy_client::frame_mark();

        let submissions = device.submissions();
        if let Some((queue, command_buffers)) = submissions.last() {
            let barriers: usize = command_buffers
                .iter()
                .map(|&cmd| device.barrier_batches(cmd).iter().map(|b| b.image_barriers.len()).sum::<usize>())
                .sum();
            log::info!(
                "frame {}: submitted {} command buffer(s) to {:?}, {} image barrier(s)",
                frame,
                command_buffers.len(),
                queue,
                barriers
            );
        }
    }

    graph.clear();
    log::info!(
        "cleared: {} image(s), {} buffer(s), {} command buffer(s) still alive",
        device.live_image_count(),
        device.live_buffer_count(),
        device.live_command_buffer_count()
    );

    Ok(())
}

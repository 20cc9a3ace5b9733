//! RenderGraph 编排
//!
//! 持有资源注册表和所有 pass，负责 compile 流水线和每帧的 execute。
//!
//! # 使用流程
//!
//! 1. 创建: `RenderGraph::new(device, config)`
//! 2. 定义/导入资源: `graph.define_image(...)` / `graph.import_image(...)`
//! 3. 添加 Pass: `graph.add_graphics_pass("name", setup, execute)`，或者用 `graph.add(setup)` 注册延迟执行的 setup
//! 4. 编译: `graph.compile()?`
//! 5. 每帧执行: `graph.execute()?`
//! 6. 重建（例如 swapchain 尺寸变化）: `graph.clear()` 后再次 `compile()`

use std::rc::Rc;

use ash::vk;
use ash::vk::Handle;
use indexmap::IndexMap;
use itertools::Itertools;

use crate::config::RgConfig;
use crate::device::RgDevice;
use crate::error::{RgError, RgResult};
use crate::render_graph::barrier::{BarrierAnalyzer, format_access_flags, format_pipeline_stage};
use crate::render_graph::buffer_resource::RgBufferDesc;
use crate::render_graph::dependency::{DependencyAnalyzer, DependencyGraph};
use crate::render_graph::image_resource::{RgImageDesc, RgImagePhysical};
use crate::render_graph::pass::{
    RgClosureExecutor, RgPass, RgPassBuilder, RgPassExecutor, RgPassExecutorWrapper, RgPassId, RgPassNode,
    RgQueueType,
};
use crate::render_graph::pass_context::RgPassContext;
use crate::render_graph::resource_handle::{
    RgBufferHandle, RgImageHandle, RgResourceHandle, RgResourceKind, RgSamplerHandle, RgShaderResourceHandle,
};
use crate::render_graph::resource_registry::RgResourceRegistry;
use crate::render_graph::resource_state::RgResourceUsageState;
use crate::render_graph::sampler_resource::RgSamplerDesc;
use crate::render_graph::shader_resource::{RgBindingLayout, RgShaderResourceBinding};

macro_rules! rg_span {
    ($name:expr) => {
        #[cfg(feature = "profiling")]
        let _span = tracy_client::span!($name);
    };
}

/// compile 状态机
///
/// 严格按顺序推进；任何一步失败都会退回 `PassesDeclared`。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RgGraphState {
    Unconfigured,
    ResourcesDeclared,
    PassesDeclared,
    /// 依赖排序完成
    Resolved,
    BarriersComputed,
    Compiled,
}

/// 延迟执行的 setup：compile 时先调用所有 `add_resources`，再调用所有 `add_passes`
///
/// `clear()` 之后会再次执行。
pub trait RgSetup {
    fn add_resources(&mut self, _graph: &mut RenderGraph) -> RgResult<()> {
        Ok(())
    }

    fn add_passes(&mut self, _graph: &mut RenderGraph) -> RgResult<()> {
        Ok(())
    }
}

pub type RgSetupFn = Box<dyn FnMut(&mut RenderGraph) -> RgResult<()>>;

/// 闭包形式的 setup
#[derive(Default)]
pub struct RgSetupContext {
    resources: Option<RgSetupFn>,
    passes: Option<RgSetupFn>,
}

impl RgSetupContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resources(mut self, f: impl FnMut(&mut RenderGraph) -> RgResult<()> + 'static) -> Self {
        self.resources = Some(Box::new(f));
        self
    }

    pub fn with_passes(mut self, f: impl FnMut(&mut RenderGraph) -> RgResult<()> + 'static) -> Self {
        self.passes = Some(Box::new(f));
        self
    }
}

impl RgSetup for RgSetupContext {
    fn add_resources(&mut self, graph: &mut RenderGraph) -> RgResult<()> {
        match &mut self.resources {
            Some(f) => f(graph),
            None => Ok(()),
        }
    }

    fn add_passes(&mut self, graph: &mut RenderGraph) -> RgResult<()> {
        match &mut self.passes {
            Some(f) => f(graph),
            None => Ok(()),
        }
    }
}

/// 声明式 frame graph
pub struct RenderGraph {
    device: Rc<dyn RgDevice>,
    config: RgConfig,

    /// 资源注册表
    registry: RgResourceRegistry,

    /// Pass 节点列表（按添加顺序）
    passes: Vec<RgPassNode>,
    pass_names: IndexMap<String, RgPassId>,

    setups: Vec<Box<dyn RgSetup>>,
    /// 已经执行过的 setup 数量
    applied_setups: usize,

    /// 执行顺序（拓扑排序后）
    execution_order: Vec<usize>,
    /// 依赖图（用于调试）
    dependency_graph: Option<DependencyGraph>,

    state: RgGraphState,
}

// new & init
impl RenderGraph {
    pub fn new(device: Rc<dyn RgDevice>, config: RgConfig) -> RgResult<Self> {
        config.validate()?;
        Ok(Self {
            device,
            config,
            registry: RgResourceRegistry::new(),
            passes: Vec::new(),
            pass_names: IndexMap::new(),
            setups: Vec::new(),
            applied_setups: 0,
            execution_order: Vec::new(),
            dependency_graph: None,
            state: RgGraphState::Unconfigured,
        })
    }

    /// 声明发生变化：推进到 `level`，或者让已有的 compile 结果失效
    fn mark_declared(&mut self, level: RgGraphState) {
        if self.state < level {
            self.state = level;
        } else if self.state > RgGraphState::PassesDeclared {
            self.state = RgGraphState::PassesDeclared;
        }
    }
}

// 资源定义
impl RenderGraph {
    /// 定义缓冲区，frames in flight 使用配置值；同名已存在时返回已有句柄
    pub fn define_buffer(&mut self, name: &str, desc: RgBufferDesc) -> RgBufferHandle {
        self.define_buffer_with_frames(name, desc, self.config.frames_in_flight)
    }

    pub fn define_buffer_with_frames(
        &mut self,
        name: &str,
        desc: RgBufferDesc,
        frames_in_flight: usize,
    ) -> RgBufferHandle {
        self.mark_declared(RgGraphState::ResourcesDeclared);
        self.registry.define_buffer(name, desc, frames_in_flight.max(1))
    }

    /// 定义图像，frames in flight 使用配置值；同名已存在时返回已有句柄
    pub fn define_image(&mut self, name: &str, desc: RgImageDesc) -> RgImageHandle {
        self.define_image_with_frames(name, desc, self.config.frames_in_flight)
    }

    pub fn define_image_with_frames(&mut self, name: &str, desc: RgImageDesc, frames_in_flight: usize) -> RgImageHandle {
        self.mark_declared(RgGraphState::ResourcesDeclared);
        self.registry.define_image(name, desc, frames_in_flight.max(1))
    }

    pub fn define_sampler(&mut self, name: &str, desc: RgSamplerDesc) -> RgSamplerHandle {
        self.mark_declared(RgGraphState::ResourcesDeclared);
        self.registry.define_sampler(name, desc)
    }

    /// 定义 shader resource，立即为每个 frame in flight 分配 descriptor set
    pub fn define_shader_resource(
        &mut self,
        name: &str,
        layout: &[RgBindingLayout],
    ) -> RgResult<RgShaderResourceHandle> {
        self.mark_declared(RgGraphState::ResourcesDeclared);
        self.registry.define_shader_resource(&*self.device, name, layout, self.config.frames_in_flight)
    }

    /// 写入绑定内容；descriptor set 在下一次 compile 时更新
    pub fn update_shader_resource(
        &mut self,
        handle: RgShaderResourceHandle,
        bindings: &[RgShaderResourceBinding],
    ) -> RgResult<()> {
        self.registry.update_shader_resource(handle, bindings)?;
        self.mark_declared(RgGraphState::ResourcesDeclared);
        Ok(())
    }

    /// 导入外部图像：每个元素对应一个 frame in flight
    ///
    /// 空数组或包含 null handle 时返回 `RgError::InvalidImport`
    pub fn import_image(
        &mut self,
        name: &str,
        physical: Vec<RgImagePhysical>,
        extent: vk::Extent2D,
        format: vk::Format,
        initial_state: RgResourceUsageState,
    ) -> RgResult<RgImageHandle> {
        let handle = self.registry.import_image(name, physical, extent, format, initial_state)?;
        self.mark_declared(RgGraphState::ResourcesDeclared);
        Ok(handle)
    }

    /// 导入外部缓冲区：每个元素对应一个 frame in flight
    pub fn import_buffer(
        &mut self,
        name: &str,
        physical: Vec<vk::Buffer>,
        desc: RgBufferDesc,
        initial_state: RgResourceUsageState,
    ) -> RgResult<RgBufferHandle> {
        let handle = self.registry.import_buffer(name, physical, desc, initial_state)?;
        self.mark_declared(RgGraphState::ResourcesDeclared);
        Ok(handle)
    }

    pub fn import_sampler(&mut self, name: &str, sampler: vk::Sampler) -> RgResult<RgSamplerHandle> {
        let handle = self.registry.import_sampler(name, sampler)?;
        self.mark_declared(RgGraphState::ResourcesDeclared);
        Ok(handle)
    }
}

// pass
impl RenderGraph {
    /// 添加 graphics pass：`setup` 立即执行，用于声明读写；`execute` 每帧调用
    pub fn add_graphics_pass(
        &mut self,
        name: &str,
        setup: impl FnOnce(&mut RgPassBuilder<'_>),
        execute: impl FnMut(&mut RgPassContext<'_>) + 'static,
    ) -> RgPassId {
        self.add_closure_pass(name, RgQueueType::Graphics, setup, execute)
    }

    /// 添加 compute pass：不会 begin rendering
    pub fn add_compute_pass(
        &mut self,
        name: &str,
        setup: impl FnOnce(&mut RgPassBuilder<'_>),
        execute: impl FnMut(&mut RgPassContext<'_>) + 'static,
    ) -> RgPassId {
        self.add_closure_pass(name, RgQueueType::Compute, setup, execute)
    }

    /// 添加实现了 `RgPass` 的 pass
    pub fn add_pass<P: RgPass + 'static>(&mut self, name: &str, queue: RgQueueType, mut pass: P) -> RgPassId {
        if let Some(id) = self.existing_pass(name) {
            return id;
        }

        let id = self.passes.len();
        let mut builder = RgPassBuilder::new(name, queue, &mut self.registry, self.config.frames_in_flight);
        pass.setup(&mut builder);
        let node = RgPassNode::new(id, builder, Box::new(RgPassExecutorWrapper { pass }));
        self.push_pass(node)
    }

    /// 注册 setup，在下一次 compile 时执行
    pub fn add(&mut self, setup: impl RgSetup + 'static) {
        self.setups.push(Box::new(setup));
        if self.state > RgGraphState::PassesDeclared {
            self.state = RgGraphState::PassesDeclared;
        }
    }

    fn add_closure_pass(
        &mut self,
        name: &str,
        queue: RgQueueType,
        setup: impl FnOnce(&mut RgPassBuilder<'_>),
        execute: impl FnMut(&mut RgPassContext<'_>) + 'static,
    ) -> RgPassId {
        if let Some(id) = self.existing_pass(name) {
            return id;
        }

        let id = self.passes.len();
        let mut builder = RgPassBuilder::new(name, queue, &mut self.registry, self.config.frames_in_flight);
        setup(&mut builder);
        let executor: Box<dyn RgPassExecutor> = Box::new(RgClosureExecutor {
            callback: Box::new(execute),
        });
        let node = RgPassNode::new(id, builder, executor);
        self.push_pass(node)
    }

    fn existing_pass(&self, name: &str) -> Option<RgPassId> {
        let id = self.pass_names.get(name).copied()?;
        log::warn!("Pass \"{}\" already exists, returning existing pass", name);
        Some(id)
    }

    fn push_pass(&mut self, node: RgPassNode) -> RgPassId {
        let id = node.id;
        self.pass_names.insert(node.name.clone(), id);
        self.passes.push(node);
        self.mark_declared(RgGraphState::PassesDeclared);
        id
    }
}

// compile
impl RenderGraph {
    /// 编译渲染图
    ///
    /// 依次执行：setup -> 依赖排序 -> 资源链接与物化 -> descriptor 更新 -> barrier 计算 -> 构建 pass 上下文。
    /// 失败时不会留下可执行的计划，`execute()` 会返回 `NotCompiled`。
    pub fn compile(&mut self) -> RgResult<()> {
        rg_span!("RenderGraph::compile");

        let result = self.compile_inner();
        if let Err(err) = &result {
            log::error!("RenderGraph compile failed: {}", err);
            if self.state > RgGraphState::PassesDeclared {
                self.state = RgGraphState::PassesDeclared;
            }
        }
        result
    }

    fn compile_inner(&mut self) -> RgResult<()> {
        self.execution_order.clear();
        self.dependency_graph = None;

        self.run_setups()?;
        self.mark_declared(RgGraphState::PassesDeclared);

        // 1. 依赖排序
        let dependency_graph = DependencyAnalyzer::analyze(&self.passes, self.config.writer_policy);
        let execution_order = match dependency_graph.topological_sort() {
            Ok(order) => order,
            Err((sorted, remaining)) => {
                let remaining = remaining.iter().map(|&i| self.passes[i].name.clone()).collect_vec();
                log::error!(
                    "RenderGraph: cycle detected, sorted {} of {} passes, remaining: {:?}",
                    sorted.len(),
                    self.passes.len(),
                    remaining
                );
                return Err(RgError::CyclicDependency {
                    sorted: sorted.len(),
                    total: self.passes.len(),
                    remaining,
                });
            }
        };
        self.execution_order = execution_order;
        self.dependency_graph = Some(dependency_graph);
        self.state = RgGraphState::Resolved;

        // 2. 资源链接与物化
        self.link_resources()?;

        // 3. descriptor set 写入
        self.registry.update_shader_resources(&*self.device)?;

        // 4. barrier
        let frame_index = self.device.current_frame_index();
        let barriers = BarrierAnalyzer::analyze(&self.passes, &self.execution_order, &self.registry, frame_index);
        for (pass, pass_barriers) in self.passes.iter_mut().zip(barriers) {
            pass.barriers = pass_barriers;
        }
        self.state = RgGraphState::BarriersComputed;

        // 5. pass 上下文在资源链接时已经填充，这里只推进状态
        self.state = RgGraphState::Compiled;

        log::info!(
            "RenderGraph compiled: {} passes, order [{}]",
            self.passes.len(),
            self.execution_order_names().join(" -> ")
        );
        if self.config.print_plan_on_compile {
            self.print_execution_plan();
        }
        Ok(())
    }

    /// 执行尚未执行过的 setup
    fn run_setups(&mut self) -> RgResult<()> {
        if self.applied_setups >= self.setups.len() {
            return Ok(());
        }

        let mut setups = std::mem::take(&mut self.setups);
        let pending = self.applied_setups..setups.len();
        let result = self.apply_setups(&mut setups[pending.clone()]);

        // setup 回调里注册的新 setup 排在后面
        let added = std::mem::replace(&mut self.setups, setups);
        self.setups.extend(added);

        if result.is_ok() {
            self.applied_setups = pending.end;
        }
        result
    }

    fn apply_setups(&mut self, setups: &mut [Box<dyn RgSetup>]) -> RgResult<()> {
        for setup in setups.iter_mut() {
            setup.add_resources(self)?;
        }
        self.mark_declared(RgGraphState::ResourcesDeclared);
        for setup in setups.iter_mut() {
            setup.add_passes(self)?;
        }
        self.mark_declared(RgGraphState::PassesDeclared);
        Ok(())
    }

    /// 解析所有读写声明的名字，物化物理资源，填充 pass 上下文，分配 command buffer
    fn link_resources(&mut self) -> RgResult<()> {
        let device = &*self.device;
        let registry = &mut self.registry;

        for pass in &mut self.passes {
            pass.context_data.clear();

            let pass_name = pass.name.as_str();
            for read in &mut pass.reads {
                let handle = Self::resolve(device, registry, pass_name, &read.name, read.kind, read.handle)?;
                read.handle = Some(handle);
                pass.context_data.insert(&read.name, handle);
            }
            for write in &mut pass.writes {
                let handle = Self::resolve(device, registry, pass_name, &write.name, write.kind, write.handle)?;
                write.handle = Some(handle);
                pass.context_data.insert(&write.name, handle);
            }

            if pass.command_buffers.is_empty() {
                let mut command_buffers = Vec::with_capacity(self.config.frames_in_flight);
                for frame in 0..self.config.frames_in_flight {
                    let cmd = device.create_command_buffer(&format!("{}-{}", pass.name, frame), pass.queue);
                    if cmd.is_null() {
                        log::error!("Device failed to create command buffer for pass \"{}\"", pass.name);
                        command_buffers.into_iter().for_each(|c| device.destroy_command_buffer(c));
                        return Err(RgError::CommandBufferCreation {
                            pass: pass.name.clone(),
                            frame,
                        });
                    }
                    command_buffers.push(cmd);
                }
                pass.command_buffers = command_buffers;
            }
        }
        Ok(())
    }

    /// 已解析且仍有效的句柄直接复用，否则按名字查找；找到后确保已物化
    fn resolve(
        device: &dyn RgDevice,
        registry: &mut RgResourceRegistry,
        pass_name: &str,
        name: &str,
        kind: RgResourceKind,
        current: Option<RgResourceHandle>,
    ) -> RgResult<RgResourceHandle> {
        let handle = match current.filter(|h| registry.contains(*h)) {
            Some(handle) => handle,
            None => match registry.lookup(kind, name) {
                Some(handle) => handle,
                None => {
                    let err = RgError::UndefinedResource {
                        pass: pass_name.to_string(),
                        kind,
                        name: name.to_string(),
                    };
                    log::error!("{}", err);
                    return Err(err);
                }
            },
        };
        registry.materialize(device, handle)?;
        Ok(handle)
    }
}

// execute & clear
impl RenderGraph {
    /// 按编译顺序录制所有 pass，并作为一批提交到 graphics 队列
    ///
    /// 未编译（或编译失败）时不会有任何 device 调用。
    pub fn execute(&mut self) -> RgResult<()> {
        rg_span!("RenderGraph::execute");

        if self.state != RgGraphState::Compiled {
            log::error!("RenderGraph::execute called in state {:?}, compile first", self.state);
            return Err(RgError::NotCompiled(self.state));
        }

        let device = Rc::clone(&self.device);
        let frame_index = device.current_frame_index();

        let mut command_buffers = Vec::with_capacity(self.execution_order.len());
        for &pass_idx in &self.execution_order {
            let command_buffer = self.passes[pass_idx].record(&*device, &self.registry, frame_index)?;
            command_buffers.push(command_buffer);
        }

        if !command_buffers.is_empty() {
            device.submit_commands(RgQueueType::Graphics, &command_buffers);
        }
        Ok(())
    }

    /// 销毁所有物理资源、descriptor set 和 command buffer，清空注册表和 pass
    ///
    /// 注册过的 setup 会保留，下一次 compile 时重新执行。
    pub fn clear(&mut self) {
        for pass in self.passes.drain(..) {
            pass.command_buffers.into_iter().for_each(|c| self.device.destroy_command_buffer(c));
        }
        self.pass_names.clear();
        self.registry.clear(&*self.device);
        self.execution_order.clear();
        self.dependency_graph = None;
        self.applied_setups = 0;
        self.state = RgGraphState::Unconfigured;
    }
}

impl Drop for RenderGraph {
    fn drop(&mut self) {
        self.clear();
    }
}

// getters
impl RenderGraph {
    #[inline]
    pub fn state(&self) -> RgGraphState {
        self.state
    }

    #[inline]
    pub fn config(&self) -> &RgConfig {
        &self.config
    }

    #[inline]
    pub fn device(&self) -> &Rc<dyn RgDevice> {
        &self.device
    }

    #[inline]
    pub fn registry(&self) -> &RgResourceRegistry {
        &self.registry
    }

    /// 当前帧下标（来自 device）
    #[inline]
    pub fn frame_index(&self) -> usize {
        self.device.current_frame_index()
    }

    /// 获取执行顺序（pass 下标）
    #[inline]
    pub fn execution_order(&self) -> &[usize] {
        &self.execution_order
    }

    pub fn execution_order_names(&self) -> Vec<&str> {
        self.execution_order.iter().map(|&i| self.passes[i].name.as_str()).collect()
    }

    #[inline]
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    pub fn pass(&self, name: &str) -> Option<&RgPassNode> {
        self.pass_names.get(name).and_then(|&id| self.passes.get(id))
    }

    #[inline]
    pub fn passes(&self) -> &[RgPassNode] {
        &self.passes
    }

    #[inline]
    pub fn dependency_graph(&self) -> Option<&DependencyGraph> {
        self.dependency_graph.as_ref()
    }
}

// 物理资源访问（当前帧）
impl RenderGraph {
    pub fn get_physical_buffer(&self, handle: RgBufferHandle) -> Option<vk::Buffer> {
        self.registry.physical_buffer(handle, self.frame_index())
    }

    pub fn get_physical_buffer_by_name(&self, name: &str) -> Option<vk::Buffer> {
        self.get_physical_buffer(self.registry.buffer_handle(name)?)
    }

    pub fn get_physical_image(&self, handle: RgImageHandle) -> Option<RgImagePhysical> {
        self.registry.physical_image(handle, self.frame_index())
    }

    pub fn get_physical_image_by_name(&self, name: &str) -> Option<RgImagePhysical> {
        self.get_physical_image(self.registry.image_handle(name)?)
    }

    /// sampler 不随帧变化
    pub fn get_physical_sampler(&self, handle: RgSamplerHandle) -> Option<vk::Sampler> {
        self.registry.physical_sampler(handle)
    }

    pub fn get_physical_sampler_by_name(&self, name: &str) -> Option<vk::Sampler> {
        self.get_physical_sampler(self.registry.sampler_handle(name)?)
    }

    pub fn get_descriptor_set(&self, handle: RgShaderResourceHandle) -> Option<vk::DescriptorSet> {
        self.registry.descriptor_set(handle, self.frame_index())
    }

    pub fn get_descriptor_set_by_name(&self, name: &str) -> Option<vk::DescriptorSet> {
        self.get_descriptor_set(self.registry.shader_resource_handle(name)?)
    }
}

// 调试方法
impl RenderGraph {
    /// 打印执行计划（用于调试）
    ///
    /// 输出每个 Pass 的执行顺序、读写声明以及 barrier 详细信息。
    pub fn print_execution_plan(&self) {
        log::info!("╔══════════════════════════════════════════════════════════════════╗");
        log::info!("║              RenderGraph Execution Plan                          ║");
        log::info!("╠══════════════════════════════════════════════════════════════════╣");
        log::info!(
            "║ State: {:?}  |  Total Passes: {}  |  Execution Order: [{}]",
            self.state,
            self.passes.len(),
            self.execution_order_names().join(" → ")
        );
        log::info!("╚══════════════════════════════════════════════════════════════════╝");

        for (order, &pass_idx) in self.execution_order.iter().enumerate() {
            let pass = &self.passes[pass_idx];

            log::info!("");
            log::info!("┌─────────────────────────────────────────────────────────────────┐");
            log::info!("│ [{}/{}] Pass: \"{}\" ({:?})", order + 1, self.execution_order.len(), pass.name, pass.queue);
            log::info!("├─────────────────────────────────────────────────────────────────┤");

            if !pass.reads.is_empty() {
                log::info!("│ Reads:");
                for read in &pass.reads {
                    log::info!(
                        "│   📖 {:?} \"{}\" (stage: {}, access: {})",
                        read.kind,
                        read.name,
                        format_pipeline_stage(read.stage),
                        format_access_flags(read.access)
                    );
                }
            }

            if !pass.writes.is_empty() {
                log::info!("│ Writes:");
                for write in &pass.writes {
                    log::info!(
                        "│   ✏️  {:?} \"{}\" (stage: {}, access: {}{})",
                        write.kind,
                        write.name,
                        format_pipeline_stage(write.stage),
                        format_access_flags(write.access),
                        if write.clear_value.is_some() { ", clear" } else { "" }
                    );
                }
            }

            if pass.barriers.is_empty() {
                log::info!("│ No barriers required");
            } else {
                log::info!("├─────────────────────────────────────────────────────────────────┤");
                log::info!("│ Barriers: {}", pass.barriers.len());
                for barrier in &pass.barriers {
                    log::info!("│   🔒 {:?} \"{}\":", barrier.handle.kind(), barrier.name);
                    if barrier.is_image() {
                        let layout_change = if barrier.old_layout != barrier.new_layout {
                            format!("{:?} → {:?}", barrier.old_layout, barrier.new_layout)
                        } else {
                            format!("{:?} (no layout change)", barrier.old_layout)
                        };
                        log::info!("│       Layout: {}", layout_change);
                    }
                    log::info!(
                        "│       Stage:  {} → {}",
                        format_pipeline_stage(barrier.src_stage),
                        format_pipeline_stage(barrier.dst_stage)
                    );
                    log::info!(
                        "│       Access: {} → {}",
                        format_access_flags(barrier.src_access),
                        format_access_flags(barrier.dst_access)
                    );
                    if barrier.is_image() {
                        log::info!("│       Aspect: {:?}", barrier.aspect);
                    }
                }
            }

            log::info!("└─────────────────────────────────────────────────────────────────┘");
        }

        log::info!("");
        log::info!("═══════════════════════ End of Execution Plan ═══════════════════════");
    }
}

use ash::vk;
use ash::vk::Handle;
use indexmap::IndexMap;
use itertools::Itertools;
use slotmap::SlotMap;

use crate::device::RgDevice;
use crate::error::{RgError, RgResult};
use crate::render_graph::buffer_resource::{RgBufferDesc, RgBufferResource};
use crate::render_graph::image_resource::{RgImageCreateInfo, RgImageDesc, RgImagePhysical, RgImageResource};
use crate::render_graph::resource_handle::{
    RgBufferHandle, RgImageHandle, RgResourceHandle, RgResourceKind, RgSamplerHandle, RgShaderResourceHandle,
};
use crate::render_graph::resource_state::RgResourceUsageState;
use crate::render_graph::sampler_resource::{RgSamplerDesc, RgSamplerResource};
use crate::render_graph::shader_resource::{
    RgBindingLayout, RgBindingSlots, RgDescriptorWrite, RgDescriptorWritePayload, RgShaderResource,
    RgShaderResourceBinding, RgShaderResourceBindingSet, RgShaderResourceFrame,
};

/// barrier 跟踪的 key：当前帧的物理对象
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgPhysicalResource {
    Buffer(vk::Buffer),
    Image(vk::Image),
}

/// 资源注册表
///
/// 四张独立的 `name -> handle` 表（buffer / image / sampler / shader resource），
/// 资源本体存放在 SlotMap 中，句柄带有 generation，`clear()` 之后旧句柄全部失效。
/// 同名资源重复定义时直接返回已有句柄。
#[derive(Default)]
pub struct RgResourceRegistry {
    /// 图像资源表
    images: SlotMap<RgImageHandle, RgImageResource>,
    /// 缓冲区资源表
    buffers: SlotMap<RgBufferHandle, RgBufferResource>,
    samplers: SlotMap<RgSamplerHandle, RgSamplerResource>,
    shader_resources: SlotMap<RgShaderResourceHandle, RgShaderResource>,

    image_names: IndexMap<String, RgImageHandle>,
    buffer_names: IndexMap<String, RgBufferHandle>,
    sampler_names: IndexMap<String, RgSamplerHandle>,
    shader_resource_names: IndexMap<String, RgShaderResourceHandle>,
}

// new & init
impl RgResourceRegistry {
    /// 创建新的资源注册表
    pub fn new() -> Self {
        Self::default()
    }
}

// define & import
impl RgResourceRegistry {
    pub fn define_buffer(&mut self, name: &str, desc: RgBufferDesc, frames_in_flight: usize) -> RgBufferHandle {
        if let Some(&handle) = self.buffer_names.get(name) {
            return handle;
        }
        let handle = self.buffers.insert(RgBufferResource::owned(name, desc, frames_in_flight));
        self.buffer_names.insert(name.to_string(), handle);
        handle
    }

    pub fn define_image(&mut self, name: &str, desc: RgImageDesc, frames_in_flight: usize) -> RgImageHandle {
        if let Some(&handle) = self.image_names.get(name) {
            return handle;
        }
        let handle = self.images.insert(RgImageResource::owned(name, desc, frames_in_flight));
        self.image_names.insert(name.to_string(), handle);
        handle
    }

    pub fn define_sampler(&mut self, name: &str, desc: RgSamplerDesc) -> RgSamplerHandle {
        if let Some(&handle) = self.sampler_names.get(name) {
            return handle;
        }
        let handle = self.samplers.insert(RgSamplerResource::owned(name, desc));
        self.sampler_names.insert(name.to_string(), handle);
        handle
    }

    /// 定义 shader resource，并为每个 frame in flight 分配 descriptor set
    ///
    /// 任一 descriptor set 分配失败时，已分配的会被释放，不留下半成品。
    pub fn define_shader_resource(
        &mut self,
        device: &dyn RgDevice,
        name: &str,
        layout: &[RgBindingLayout],
        frames_in_flight: usize,
    ) -> RgResult<RgShaderResourceHandle> {
        if let Some(&handle) = self.shader_resource_names.get(name) {
            return Ok(handle);
        }
        // shader resource 不能嵌套
        if let Some(l) = layout.iter().find(|l| l.kind == RgResourceKind::ShaderResource) {
            log::error!("Shader resource \"{}\" binding {} has unsupported kind {:?}", name, l.binding, l.kind);
            return Err(RgError::UnsupportedBindingKind {
                shader_resource: name.to_string(),
                binding: l.binding,
                kind: l.kind,
            });
        }

        let mut frames: Vec<RgShaderResourceFrame> = Vec::with_capacity(frames_in_flight);
        for frame in 0..frames_in_flight {
            let descriptor_set = device.allocate_descriptor_set(&format!("{name}-{frame}"), layout);
            if descriptor_set.is_null() {
                log::error!("Failed to allocate descriptor set for shader resource \"{}\" (frame {})", name, frame);
                frames.into_iter().for_each(|f| device.free_descriptor_set(f.descriptor_set));
                return Err(RgError::ResourceCreation {
                    kind: RgResourceKind::ShaderResource,
                    name: name.to_string(),
                    frame,
                });
            }
            frames.push(RgShaderResourceFrame {
                bindings: RgShaderResourceBindingSet::from_layout(layout),
                descriptor_set,
            });
        }

        let handle = self.shader_resources.insert(RgShaderResource {
            name: name.to_string(),
            layout: layout.to_vec(),
            frames,
        });
        self.shader_resource_names.insert(name.to_string(), handle);
        Ok(handle)
    }

    /// 导入外部缓冲区，`physical` 不能为空，也不能包含 null handle
    pub fn import_buffer(
        &mut self,
        name: &str,
        physical: Vec<vk::Buffer>,
        desc: RgBufferDesc,
        initial_state: RgResourceUsageState,
    ) -> RgResult<RgBufferHandle> {
        let null_frame = physical.iter().position(|b| b.is_null());
        Self::check_import(RgResourceKind::Buffer, name, physical.len(), null_frame)?;
        if let Some(&handle) = self.buffer_names.get(name) {
            return Ok(handle);
        }
        let handle = self.buffers.insert(RgBufferResource::imported(name, physical, desc, initial_state));
        self.buffer_names.insert(name.to_string(), handle);
        Ok(handle)
    }

    /// 导入外部图像，`physical` 不能为空，image 和 view 都不能是 null
    pub fn import_image(
        &mut self,
        name: &str,
        physical: Vec<RgImagePhysical>,
        extent: vk::Extent2D,
        format: vk::Format,
        initial_state: RgResourceUsageState,
    ) -> RgResult<RgImageHandle> {
        let null_frame = physical.iter().position(|p| p.image.is_null() || p.view.is_null());
        Self::check_import(RgResourceKind::Image, name, physical.len(), null_frame)?;
        if let Some(&handle) = self.image_names.get(name) {
            return Ok(handle);
        }
        let handle = self.images.insert(RgImageResource::imported(name, physical, extent, format, initial_state));
        self.image_names.insert(name.to_string(), handle);
        Ok(handle)
    }

    pub fn import_sampler(&mut self, name: &str, sampler: vk::Sampler) -> RgResult<RgSamplerHandle> {
        let null_frame = sampler.is_null().then_some(0);
        Self::check_import(RgResourceKind::Sampler, name, 1, null_frame)?;
        if let Some(&handle) = self.sampler_names.get(name) {
            return Ok(handle);
        }
        let handle = self.samplers.insert(RgSamplerResource::imported(name, sampler));
        self.sampler_names.insert(name.to_string(), handle);
        Ok(handle)
    }

    fn check_import(kind: RgResourceKind, name: &str, count: usize, null_frame: Option<usize>) -> RgResult<()> {
        let reason = match (count, null_frame) {
            (0, _) => "no physical resource".to_string(),
            (_, Some(frame)) => format!("null handle at frame slot {frame}"),
            _ => return Ok(()),
        };
        log::error!("Failed to import {:?} \"{}\": {}", kind, name, reason);
        Err(RgError::InvalidImport {
            kind,
            name: name.to_string(),
            reason,
        })
    }
}

// shader resource update
impl RgResourceRegistry {
    /// 写入 shader resource 的绑定内容（所有 frame in flight）
    ///
    /// 先校验全部 binding 的种类与数组长度，任何不匹配都不会写入任何内容。
    /// 真正的 descriptor set 写入推迟到 `update_shader_resources()`。
    pub fn update_shader_resource(
        &mut self,
        handle: RgShaderResourceHandle,
        bindings: &[RgShaderResourceBinding],
    ) -> RgResult<()> {
        let Some(resource) = self.shader_resources.get_mut(handle) else {
            log::error!("update_shader_resource: stale shader resource handle {:?}", handle);
            return Err(RgError::InvalidHandle(RgResourceKind::ShaderResource));
        };

        for frame in &resource.frames {
            for binding in bindings {
                let Some(slot) = frame.bindings.find(binding.binding) else {
                    let err = RgError::UnknownBinding {
                        shader_resource: resource.name.clone(),
                        binding: binding.binding,
                    };
                    log::error!("{}", err);
                    return Err(err);
                };
                if slot.slots.kind() != binding.payload.kind() {
                    let err = RgError::KindMismatch {
                        shader_resource: resource.name.clone(),
                        binding: binding.binding,
                        expected: slot.slots.kind(),
                        actual: binding.payload.kind(),
                    };
                    log::error!("{}", err);
                    return Err(err);
                }
                if slot.slots.len() != binding.payload.len() {
                    let err = RgError::ArraySizeMismatch {
                        shader_resource: resource.name.clone(),
                        binding: binding.binding,
                        expected: slot.slots.len(),
                        actual: binding.payload.len(),
                    };
                    log::error!("{}", err);
                    return Err(err);
                }
            }
        }

        for frame in &mut resource.frames {
            for binding in bindings {
                frame.bindings.assign(binding);
            }
        }
        Ok(())
    }

    /// 把所有 shader resource 的绑定写入物理 descriptor set
    ///
    /// 引用到的 buffer/image/sampler 若尚未物化，会在这里物化。
    pub fn update_shader_resources(&mut self, device: &dyn RgDevice) -> RgResult<()> {
        let handles = self.shader_resource_names.values().copied().collect_vec();
        for handle in handles {
            let writes = self.build_descriptor_writes(device, handle)?;
            if !writes.is_empty() {
                device.update_descriptor_sets(&writes);
            }
        }
        Ok(())
    }

    fn build_descriptor_writes(
        &mut self,
        device: &dyn RgDevice,
        handle: RgShaderResourceHandle,
    ) -> RgResult<Vec<RgDescriptorWrite>> {
        let Some(resource) = self.shader_resources.get(handle) else {
            return Err(RgError::InvalidHandle(RgResourceKind::ShaderResource));
        };
        // 先拷贝出来，物化时需要可变借用 registry
        let shader_resource_name = resource.name.clone();
        let frames = resource.frames.iter().map(|f| (f.descriptor_set, f.bindings.clone())).collect_vec();

        let unresolved = |binding: u32, element: usize, reason: String| {
            let err = RgError::UnresolvedBinding {
                shader_resource: shader_resource_name.clone(),
                binding,
                element,
                reason,
            };
            log::error!("{}", err);
            err
        };

        let mut writes = Vec::new();
        for (frame_index, (dst_set, binding_set)) in frames.iter().enumerate() {
            for slot in &binding_set.bindings {
                // 没有 update 过的 binding 不写
                if slot.slots.is_unset() {
                    continue;
                }
                let binding = slot.layout.binding;
                let payload = match &slot.slots {
                    RgBindingSlots::Buffers(elements) => {
                        let mut infos = Vec::with_capacity(elements.len());
                        for (i, element) in elements.iter().enumerate() {
                            let element = element.as_ref().ok_or_else(|| unresolved(binding, i, "not set".into()))?;
                            let buffer = self.buffer_handle(&element.buffer).ok_or_else(|| {
                                unresolved(binding, i, format!("undefined buffer \"{}\"", element.buffer))
                            })?;
                            self.materialize_buffer(device, buffer)?;
                            let physical = self
                                .physical_buffer(buffer, frame_index)
                                .ok_or_else(|| unresolved(binding, i, "buffer has no physical handle".into()))?;
                            infos.push(
                                vk::DescriptorBufferInfo::default()
                                    .buffer(physical)
                                    .offset(element.offset)
                                    .range(element.range),
                            );
                        }
                        RgDescriptorWritePayload::Buffers(infos)
                    }
                    RgBindingSlots::Images(elements) => {
                        let image_layout = if slot.layout.descriptor_type == vk::DescriptorType::STORAGE_IMAGE {
                            vk::ImageLayout::GENERAL
                        } else {
                            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
                        };
                        let mut infos = Vec::with_capacity(elements.len());
                        for (i, element) in elements.iter().enumerate() {
                            let element = element.as_ref().ok_or_else(|| unresolved(binding, i, "not set".into()))?;
                            let image = self.image_handle(&element.image).ok_or_else(|| {
                                unresolved(binding, i, format!("undefined image \"{}\"", element.image))
                            })?;
                            self.materialize_image(device, image)?;
                            let physical = self
                                .physical_image(image, frame_index)
                                .ok_or_else(|| unresolved(binding, i, "image has no physical handle".into()))?;
                            let sampler = match &element.sampler {
                                Some(sampler_name) => {
                                    let sampler = self.sampler_handle(sampler_name).ok_or_else(|| {
                                        unresolved(binding, i, format!("undefined sampler \"{}\"", sampler_name))
                                    })?;
                                    self.materialize_sampler(device, sampler)?;
                                    self.physical_sampler(sampler).unwrap_or_default()
                                }
                                None => vk::Sampler::null(),
                            };
                            infos.push(
                                vk::DescriptorImageInfo::default()
                                    .image_view(physical.view)
                                    .sampler(sampler)
                                    .image_layout(image_layout),
                            );
                        }
                        RgDescriptorWritePayload::Images(infos)
                    }
                    RgBindingSlots::Samplers(elements) => {
                        let mut infos = Vec::with_capacity(elements.len());
                        for (i, element) in elements.iter().enumerate() {
                            let element = element.as_ref().ok_or_else(|| unresolved(binding, i, "not set".into()))?;
                            let sampler = self
                                .sampler_handle(element)
                                .ok_or_else(|| unresolved(binding, i, format!("undefined sampler \"{}\"", element)))?;
                            self.materialize_sampler(device, sampler)?;
                            let physical = self
                                .physical_sampler(sampler)
                                .ok_or_else(|| unresolved(binding, i, "sampler has no physical handle".into()))?;
                            infos.push(vk::DescriptorImageInfo::default().sampler(physical));
                        }
                        RgDescriptorWritePayload::Images(infos)
                    }
                    RgBindingSlots::BufferViews(elements) => {
                        let mut views = Vec::with_capacity(elements.len());
                        for (i, element) in elements.iter().enumerate() {
                            let view = element.ok_or_else(|| unresolved(binding, i, "not set".into()))?;
                            views.push(view);
                        }
                        RgDescriptorWritePayload::BufferViews(views)
                    }
                };

                writes.push(RgDescriptorWrite {
                    dst_set: *dst_set,
                    binding,
                    descriptor_type: slot.layout.descriptor_type,
                    payload,
                });
            }
        }
        Ok(writes)
    }
}

// materialize
impl RgResourceRegistry {
    /// 物化一个逻辑资源；已经物化过的直接返回
    pub fn materialize(&mut self, device: &dyn RgDevice, handle: RgResourceHandle) -> RgResult<()> {
        match handle {
            RgResourceHandle::Buffer(h) => self.materialize_buffer(device, h),
            RgResourceHandle::Image(h) => self.materialize_image(device, h),
            RgResourceHandle::Sampler(h) => self.materialize_sampler(device, h),
            // descriptor set 在 define 时已经分配
            RgResourceHandle::ShaderResource(h) => match self.shader_resources.contains_key(h) {
                true => Ok(()),
                false => Err(RgError::InvalidHandle(RgResourceKind::ShaderResource)),
            },
        }
    }

    pub fn materialize_buffer(&mut self, device: &dyn RgDevice, handle: RgBufferHandle) -> RgResult<()> {
        let Some(buffer) = self.buffers.get_mut(handle) else {
            return Err(RgError::InvalidHandle(RgResourceKind::Buffer));
        };
        if buffer.is_materialized() {
            return Ok(());
        }
        if buffer.source.is_imported() {
            log::error!("Imported buffer \"{}\" has no physical resource", buffer.name);
            return Err(RgError::InvalidImport {
                kind: RgResourceKind::Buffer,
                name: buffer.name.clone(),
                reason: "no physical resource".to_string(),
            });
        }

        let mut physical = Vec::with_capacity(buffer.frames_in_flight());
        for frame in 0..buffer.frames_in_flight() {
            let vk_buffer = device.create_buffer(&format!("{}-{}", buffer.name, frame), &buffer.desc);
            if vk_buffer.is_null() {
                log::error!("Device failed to create buffer \"{}\" (frame {})", buffer.name, frame);
                physical.into_iter().for_each(|b| device.destroy_buffer(b));
                return Err(RgError::ResourceCreation {
                    kind: RgResourceKind::Buffer,
                    name: buffer.name.clone(),
                    frame,
                });
            }
            physical.push(vk_buffer);
        }

        log::debug!("Materialized buffer \"{}\" x{} ({} bytes)", buffer.name, physical.len(), buffer.desc.size);
        buffer.set_physical(physical);
        Ok(())
    }

    pub fn materialize_image(&mut self, device: &dyn RgDevice, handle: RgImageHandle) -> RgResult<()> {
        let Some(image) = self.images.get_mut(handle) else {
            return Err(RgError::InvalidHandle(RgResourceKind::Image));
        };
        if image.is_materialized() {
            return Ok(());
        }
        if image.source.is_imported() {
            log::error!("Imported image \"{}\" has no physical resource", image.name);
            return Err(RgError::InvalidImport {
                kind: RgResourceKind::Image,
                name: image.name.clone(),
                reason: "no physical resource".to_string(),
            });
        }

        let extent = image.desc.extent.unwrap_or_else(|| device.swapchain_extent());
        let format = image.desc.format.unwrap_or_else(|| match image.desc.is_depth() {
            true => device.swapchain_depth_format(),
            false => device.swapchain_color_format(),
        });
        let create_info = RgImageCreateInfo {
            extent,
            format,
            usage: image.desc.usage,
            mip_levels: image.desc.mip_levels,
            array_layers: image.desc.array_layers,
            samples: image.desc.samples,
            aspect: RgImageDesc::infer_aspect(format),
        };

        let mut physical = Vec::with_capacity(image.frames_in_flight());
        for frame in 0..image.frames_in_flight() {
            let created = device.create_image(&format!("{}-{}", image.name, frame), &create_info);
            if created.image.is_null() {
                log::error!("Device failed to create image \"{}\" (frame {})", image.name, frame);
                physical.into_iter().for_each(|p| device.destroy_image(p));
                return Err(RgError::ResourceCreation {
                    kind: RgResourceKind::Image,
                    name: image.name.clone(),
                    frame,
                });
            }
            physical.push(created);
        }

        log::debug!(
            "Materialized image \"{}\" x{} ({}x{} {:?})",
            image.name,
            physical.len(),
            extent.width,
            extent.height,
            format
        );
        image.set_physical(physical, extent, format);
        Ok(())
    }

    pub fn materialize_sampler(&mut self, device: &dyn RgDevice, handle: RgSamplerHandle) -> RgResult<()> {
        let Some(sampler) = self.samplers.get_mut(handle) else {
            return Err(RgError::InvalidHandle(RgResourceKind::Sampler));
        };
        if sampler.is_materialized() {
            return Ok(());
        }

        let vk_sampler = device.create_sampler(&sampler.name, &sampler.desc);
        if vk_sampler.is_null() {
            log::error!("Device failed to create sampler \"{}\"", sampler.name);
            return Err(RgError::ResourceCreation {
                kind: RgResourceKind::Sampler,
                name: sampler.name.clone(),
                frame: 0,
            });
        }
        log::debug!("Materialized sampler \"{}\"", sampler.name);
        sampler.set_physical(vk_sampler);
        Ok(())
    }
}

// destroy
impl RgResourceRegistry {
    /// 销毁所有自有物理资源和 descriptor set，并清空逻辑注册表
    ///
    /// 导入的资源只从表中移除，不销毁。
    pub fn clear(&mut self, device: &dyn RgDevice) {
        for (_, mut buffer) in self.buffers.drain() {
            let physical = buffer.take_physical();
            if !buffer.source.is_imported() {
                physical.into_iter().for_each(|b| device.destroy_buffer(b));
            }
        }
        for (_, mut image) in self.images.drain() {
            let physical = image.take_physical();
            if !image.source.is_imported() {
                physical.into_iter().for_each(|p| device.destroy_image(p));
            }
        }
        for (_, mut sampler) in self.samplers.drain() {
            let physical = sampler.take_physical();
            if let (false, Some(s)) = (sampler.source.is_imported(), physical) {
                device.destroy_sampler(s);
            }
        }
        for (_, shader_resource) in self.shader_resources.drain() {
            shader_resource.frames.into_iter().for_each(|f| device.free_descriptor_set(f.descriptor_set));
        }

        self.buffer_names.clear();
        self.image_names.clear();
        self.sampler_names.clear();
        self.shader_resource_names.clear();
    }
}

// lookup
impl RgResourceRegistry {
    #[inline]
    pub fn buffer_handle(&self, name: &str) -> Option<RgBufferHandle> {
        self.buffer_names.get(name).copied()
    }

    #[inline]
    pub fn image_handle(&self, name: &str) -> Option<RgImageHandle> {
        self.image_names.get(name).copied()
    }

    #[inline]
    pub fn sampler_handle(&self, name: &str) -> Option<RgSamplerHandle> {
        self.sampler_names.get(name).copied()
    }

    #[inline]
    pub fn shader_resource_handle(&self, name: &str) -> Option<RgShaderResourceHandle> {
        self.shader_resource_names.get(name).copied()
    }

    /// 按种类和名字查找
    pub fn lookup(&self, kind: RgResourceKind, name: &str) -> Option<RgResourceHandle> {
        match kind {
            RgResourceKind::Buffer => self.buffer_handle(name).map(RgResourceHandle::Buffer),
            RgResourceKind::Image => self.image_handle(name).map(RgResourceHandle::Image),
            RgResourceKind::Sampler => self.sampler_handle(name).map(RgResourceHandle::Sampler),
            RgResourceKind::ShaderResource => self.shader_resource_handle(name).map(RgResourceHandle::ShaderResource),
            RgResourceKind::BufferView => None,
        }
    }

    /// 句柄是否仍然有效
    pub fn contains(&self, handle: RgResourceHandle) -> bool {
        match handle {
            RgResourceHandle::Buffer(h) => self.buffers.contains_key(h),
            RgResourceHandle::Image(h) => self.images.contains_key(h),
            RgResourceHandle::Sampler(h) => self.samplers.contains_key(h),
            RgResourceHandle::ShaderResource(h) => self.shader_resources.contains_key(h),
        }
    }

    /// 资源的调试名称
    pub fn name_of(&self, handle: RgResourceHandle) -> Option<&str> {
        match handle {
            RgResourceHandle::Buffer(h) => self.buffers.get(h).map(|r| r.name.as_str()),
            RgResourceHandle::Image(h) => self.images.get(h).map(|r| r.name.as_str()),
            RgResourceHandle::Sampler(h) => self.samplers.get(h).map(|r| r.name.as_str()),
            RgResourceHandle::ShaderResource(h) => self.shader_resources.get(h).map(|r| r.name.as_str()),
        }
    }
}

// physical getters
impl RgResourceRegistry {
    #[inline]
    pub fn physical_buffer(&self, handle: RgBufferHandle, frame_index: usize) -> Option<vk::Buffer> {
        self.buffers.get(handle)?.physical(frame_index)
    }

    #[inline]
    pub fn physical_image(&self, handle: RgImageHandle, frame_index: usize) -> Option<RgImagePhysical> {
        self.images.get(handle)?.physical(frame_index)
    }

    #[inline]
    pub fn physical_sampler(&self, handle: RgSamplerHandle) -> Option<vk::Sampler> {
        self.samplers.get(handle)?.physical()
    }

    #[inline]
    pub fn descriptor_set(&self, handle: RgShaderResourceHandle, frame_index: usize) -> Option<vk::DescriptorSet> {
        self.shader_resources.get(handle)?.descriptor_set(frame_index)
    }

    /// 参与 barrier 跟踪的物理对象；sampler 和 shader resource 不参与
    pub fn physical_resource(&self, handle: RgResourceHandle, frame_index: usize) -> Option<RgPhysicalResource> {
        match handle {
            RgResourceHandle::Buffer(h) => self.physical_buffer(h, frame_index).map(RgPhysicalResource::Buffer),
            RgResourceHandle::Image(h) => self.physical_image(h, frame_index).map(|p| RgPhysicalResource::Image(p.image)),
            RgResourceHandle::Sampler(_) | RgResourceHandle::ShaderResource(_) => None,
        }
    }

    /// barrier 跟踪的起始状态
    pub fn initial_state(&self, handle: RgResourceHandle) -> RgResourceUsageState {
        match handle {
            RgResourceHandle::Buffer(h) => self.buffers.get(h).map(|r| r.source.initial_state()),
            RgResourceHandle::Image(h) => self.images.get(h).map(|r| r.source.initial_state()),
            _ => None,
        }
        .unwrap_or_default()
    }
}

// getter & iter
impl RgResourceRegistry {
    /// 获取图像资源
    #[inline]
    pub fn get_image(&self, handle: RgImageHandle) -> Option<&RgImageResource> {
        self.images.get(handle)
    }

    /// 获取缓冲区资源
    #[inline]
    pub fn get_buffer(&self, handle: RgBufferHandle) -> Option<&RgBufferResource> {
        self.buffers.get(handle)
    }

    #[inline]
    pub fn get_sampler(&self, handle: RgSamplerHandle) -> Option<&RgSamplerResource> {
        self.samplers.get(handle)
    }

    #[inline]
    pub fn get_shader_resource(&self, handle: RgShaderResourceHandle) -> Option<&RgShaderResource> {
        self.shader_resources.get(handle)
    }

    /// 获取图像数量
    #[inline]
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// 获取缓冲区数量
    #[inline]
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    #[inline]
    pub fn sampler_count(&self) -> usize {
        self.samplers.len()
    }

    #[inline]
    pub fn shader_resource_count(&self) -> usize {
        self.shader_resources.len()
    }

    /// 按定义顺序迭代所有图像资源
    #[inline]
    pub fn iter_images(&self) -> impl Iterator<Item = (RgImageHandle, &RgImageResource)> {
        self.image_names.values().filter_map(|&h| self.images.get(h).map(|r| (h, r)))
    }

    /// 按定义顺序迭代所有缓冲区资源
    #[inline]
    pub fn iter_buffers(&self) -> impl Iterator<Item = (RgBufferHandle, &RgBufferResource)> {
        self.buffer_names.values().filter_map(|&h| self.buffers.get(h).map(|r| (h, r)))
    }
}

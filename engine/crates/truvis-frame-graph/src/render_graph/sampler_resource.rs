use ash::vk;

use crate::render_graph::resource_state::{RgResourceSource, RgResourceUsageState};

// Sampler descriptor
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct RgSamplerDesc {
    pub mag_filter: vk::Filter,
    pub min_filter: vk::Filter,
    pub address_mode_u: vk::SamplerAddressMode,
    pub address_mode_v: vk::SamplerAddressMode,
    pub address_mode_w: vk::SamplerAddressMode,
    pub max_anisotropy: u32,
    pub compare_op: Option<vk::CompareOp>,
    pub mipmap_mode: vk::SamplerMipmapMode,
}

impl Default for RgSamplerDesc {
    fn default() -> Self {
        Self {
            mag_filter: vk::Filter::LINEAR,
            min_filter: vk::Filter::LINEAR,
            address_mode_u: vk::SamplerAddressMode::REPEAT,
            address_mode_v: vk::SamplerAddressMode::REPEAT,
            address_mode_w: vk::SamplerAddressMode::REPEAT,
            max_anisotropy: 0,
            compare_op: None,
            mipmap_mode: vk::SamplerMipmapMode::LINEAR,
        }
    }
}

impl RgSamplerDesc {
    /// 最近邻 + clamp，常用于读取 G-Buffer
    pub fn nearest_clamp() -> Self {
        Self {
            mag_filter: vk::Filter::NEAREST,
            min_filter: vk::Filter::NEAREST,
            address_mode_u: vk::SamplerAddressMode::CLAMP_TO_EDGE,
            address_mode_v: vk::SamplerAddressMode::CLAMP_TO_EDGE,
            address_mode_w: vk::SamplerAddressMode::CLAMP_TO_EDGE,
            mipmap_mode: vk::SamplerMipmapMode::NEAREST,
            ..Default::default()
        }
    }
}

/// Sampler 资源条目
///
/// sampler 不随帧变化，只有一份物理对象。
#[derive(Clone, Debug)]
pub struct RgSamplerResource {
    pub name: String,
    pub desc: RgSamplerDesc,
    pub source: RgResourceSource,
    physical: Option<vk::Sampler>,
}

// new & init
impl RgSamplerResource {
    pub fn owned(name: impl Into<String>, desc: RgSamplerDesc) -> Self {
        Self {
            name: name.into(),
            desc,
            source: RgResourceSource::Owned,
            physical: None,
        }
    }

    pub fn imported(name: impl Into<String>, sampler: vk::Sampler) -> Self {
        Self {
            name: name.into(),
            desc: RgSamplerDesc::default(),
            source: RgResourceSource::Imported {
                initial_state: RgResourceUsageState::UNDEFINED,
            },
            physical: Some(sampler),
        }
    }
}

// update & getters
impl RgSamplerResource {
    pub(crate) fn set_physical(&mut self, sampler: vk::Sampler) {
        self.physical = Some(sampler);
    }

    pub(crate) fn take_physical(&mut self) -> Option<vk::Sampler> {
        self.physical.take()
    }

    #[inline]
    pub fn is_materialized(&self) -> bool {
        self.physical.is_some()
    }

    #[inline]
    pub fn physical(&self) -> Option<vk::Sampler> {
        self.physical
    }
}

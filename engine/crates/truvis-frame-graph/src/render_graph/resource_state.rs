//! 资源状态定义
//!
//! 封装 Vulkan 的 pipeline stage、access mask 和 image layout，
//! 提供预定义的常用状态组合，以及从 access 推导 layout 的规则。

use ash::vk;

/// 资源使用状态
///
/// 按物理句柄跟踪，用于判断两次使用之间是否需要 barrier。
/// buffer 的 layout 恒为 `UNDEFINED`。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RgResourceUsageState {
    /// Access mask
    pub access: vk::AccessFlags2,
    /// Pipeline stage
    pub stage: vk::PipelineStageFlags2,
    /// Image layout
    pub layout: vk::ImageLayout,
}

impl Default for RgResourceUsageState {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

// new & 常量定义
impl RgResourceUsageState {
    /// 创建自定义状态
    #[inline]
    pub const fn new(access: vk::AccessFlags2, stage: vk::PipelineStageFlags2, layout: vk::ImageLayout) -> Self {
        Self { access, stage, layout }
    }

    /// 根据 access 推导 layout，得到一次使用所请求的状态
    ///
    /// `is_image` 为 false 时 layout 固定为 `UNDEFINED`。
    #[inline]
    pub fn requested(access: vk::AccessFlags2, stage: vk::PipelineStageFlags2, is_image: bool) -> Self {
        let layout = if is_image { Self::layout_for_access(access) } else { vk::ImageLayout::UNDEFINED };
        Self::new(access, stage, layout)
    }

    // ============ 预定义状态常量 ============

    /// 未定义状态（graph 自己创建的资源的初始状态）
    pub const UNDEFINED: Self =
        Self::new(vk::AccessFlags2::NONE, vk::PipelineStageFlags2::TOP_OF_PIPE, vk::ImageLayout::UNDEFINED);

    /// 颜色附件输出
    pub const COLOR_ATTACHMENT_WRITE: Self = Self::new(
        vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
        vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    );

    /// 深度附件写入
    pub const DEPTH_ATTACHMENT_WRITE: Self = Self::new(
        vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE,
        vk::PipelineStageFlags2::from_raw(
            vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS.as_raw()
                | vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS.as_raw(),
        ),
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
    );

    /// 着色器只读采样（片段着色器）
    pub const SHADER_READ_FRAGMENT: Self = Self::new(
        vk::AccessFlags2::SHADER_READ,
        vk::PipelineStageFlags2::FRAGMENT_SHADER,
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    );

    /// 着色器只读采样（计算着色器）
    pub const SHADER_READ_COMPUTE: Self = Self::new(
        vk::AccessFlags2::SHADER_READ,
        vk::PipelineStageFlags2::COMPUTE_SHADER,
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    );

    /// 存储图像/缓冲区写入（计算着色器）
    pub const STORAGE_WRITE_COMPUTE: Self = Self::new(
        vk::AccessFlags2::SHADER_STORAGE_WRITE,
        vk::PipelineStageFlags2::COMPUTE_SHADER,
        vk::ImageLayout::GENERAL,
    );

    /// 传输目标
    pub const TRANSFER_DST: Self = Self::new(
        vk::AccessFlags2::TRANSFER_WRITE,
        vk::PipelineStageFlags2::TRANSFER,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
    );

    /// 呈现（swapchain image）
    pub const PRESENT: Self =
        Self::new(vk::AccessFlags2::NONE, vk::PipelineStageFlags2::BOTTOM_OF_PIPE, vk::ImageLayout::PRESENT_SRC_KHR);

    // ============ 辅助方法 ============

    /// 写操作的 access flags
    const WRITE_ACCESS: vk::AccessFlags2 = vk::AccessFlags2::from_raw(
        vk::AccessFlags2::SHADER_WRITE.as_raw()
            | vk::AccessFlags2::SHADER_STORAGE_WRITE.as_raw()
            | vk::AccessFlags2::COLOR_ATTACHMENT_WRITE.as_raw()
            | vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE.as_raw()
            | vk::AccessFlags2::TRANSFER_WRITE.as_raw()
            | vk::AccessFlags2::HOST_WRITE.as_raw()
            | vk::AccessFlags2::MEMORY_WRITE.as_raw()
            | vk::AccessFlags2::ACCELERATION_STRUCTURE_WRITE_KHR.as_raw(),
    );

    /// 读操作的 access flags，作为 barrier 的 src access 没有意义
    const READ_ACCESS: vk::AccessFlags2 = vk::AccessFlags2::from_raw(
        vk::AccessFlags2::SHADER_READ.as_raw()
            | vk::AccessFlags2::SHADER_SAMPLED_READ.as_raw()
            | vk::AccessFlags2::SHADER_STORAGE_READ.as_raw()
            | vk::AccessFlags2::UNIFORM_READ.as_raw()
            | vk::AccessFlags2::COLOR_ATTACHMENT_READ.as_raw()
            | vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ.as_raw()
            | vk::AccessFlags2::TRANSFER_READ.as_raw()
            | vk::AccessFlags2::HOST_READ.as_raw()
            | vk::AccessFlags2::MEMORY_READ.as_raw()
            | vk::AccessFlags2::VERTEX_ATTRIBUTE_READ.as_raw()
            | vk::AccessFlags2::INDEX_READ.as_raw()
            | vk::AccessFlags2::INDIRECT_COMMAND_READ.as_raw(),
    );

    /// access -> layout 映射
    ///
    /// 按优先级匹配：颜色附件写 > 深度附件写 > 着色器只读 > storage > transfer，其余为 `UNDEFINED`。
    pub fn layout_for_access(access: vk::AccessFlags2) -> vk::ImageLayout {
        if access.contains(vk::AccessFlags2::COLOR_ATTACHMENT_WRITE) {
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
        } else if access.contains(vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE) {
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
        } else if access.intersects(vk::AccessFlags2::SHADER_READ | vk::AccessFlags2::SHADER_SAMPLED_READ) {
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
        } else if access.intersects(vk::AccessFlags2::SHADER_STORAGE_READ | vk::AccessFlags2::SHADER_STORAGE_WRITE) {
            vk::ImageLayout::GENERAL
        } else if access.contains(vk::AccessFlags2::TRANSFER_WRITE) {
            vk::ImageLayout::TRANSFER_DST_OPTIMAL
        } else if access.contains(vk::AccessFlags2::TRANSFER_READ) {
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL
        } else {
            vk::ImageLayout::UNDEFINED
        }
    }

    /// 检查是否为写操作
    #[inline]
    pub fn is_write(&self) -> bool {
        self.access.intersects(Self::WRITE_ACCESS)
    }

    /// 检查是否为只读操作
    #[inline]
    pub fn is_read_only(&self) -> bool {
        !self.is_write()
    }

    /// 获取用于 barrier src 的 access（去掉读操作）
    #[inline]
    pub fn src_access(&self) -> vk::AccessFlags2 {
        self.access & !Self::READ_ACCESS
    }

    /// 从 `self` 迁移到 `requested` 是否需要 barrier
    ///
    /// layout 不同，或者任一方有写操作时需要；读后读不需要。
    #[inline]
    pub fn needs_barrier(&self, requested: &Self) -> bool {
        self.layout != requested.layout || self.is_write() || requested.is_write()
    }
}

/// 资源的来源
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RgResourceSource {
    /// 由 RenderGraph 创建，`clear()` 时销毁，初始状态为 `UNDEFINED`
    Owned,
    /// 从外部导入，RenderGraph 不负责销毁
    Imported { initial_state: RgResourceUsageState },
}

impl RgResourceSource {
    /// barrier 跟踪的起始状态
    #[inline]
    pub fn initial_state(&self) -> RgResourceUsageState {
        match self {
            Self::Owned => RgResourceUsageState::UNDEFINED,
            Self::Imported { initial_state } => *initial_state,
        }
    }

    #[inline]
    pub fn is_imported(&self) -> bool {
        matches!(self, Self::Imported { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_mapping() {
        assert_eq!(
            RgResourceUsageState::layout_for_access(vk::AccessFlags2::COLOR_ATTACHMENT_WRITE),
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
        );
        assert_eq!(
            RgResourceUsageState::layout_for_access(vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE),
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
        );
        assert_eq!(
            RgResourceUsageState::layout_for_access(vk::AccessFlags2::SHADER_READ),
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
        );
        assert_eq!(
            RgResourceUsageState::layout_for_access(vk::AccessFlags2::UNIFORM_READ),
            vk::ImageLayout::UNDEFINED
        );
    }

    #[test]
    fn test_buffer_has_no_layout() {
        let state = RgResourceUsageState::requested(
            vk::AccessFlags2::SHADER_READ,
            vk::PipelineStageFlags2::FRAGMENT_SHADER,
            false,
        );
        assert_eq!(state.layout, vk::ImageLayout::UNDEFINED);
    }

    #[test]
    fn test_barrier_layout_change() {
        let from = RgResourceUsageState::UNDEFINED;
        assert!(from.needs_barrier(&RgResourceUsageState::COLOR_ATTACHMENT_WRITE));
    }

    #[test]
    fn test_barrier_read_to_read() {
        let from = RgResourceUsageState::SHADER_READ_FRAGMENT;
        assert!(!from.needs_barrier(&RgResourceUsageState::SHADER_READ_COMPUTE));
    }

    #[test]
    fn test_barrier_write_to_read() {
        let from = RgResourceUsageState::STORAGE_WRITE_COMPUTE;
        let to = RgResourceUsageState::new(
            vk::AccessFlags2::SHADER_STORAGE_READ,
            vk::PipelineStageFlags2::COMPUTE_SHADER,
            vk::ImageLayout::GENERAL,
        );
        assert!(from.needs_barrier(&to));
    }

    #[test]
    fn test_src_access_strips_reads() {
        let state = RgResourceUsageState::new(
            vk::AccessFlags2::SHADER_STORAGE_READ | vk::AccessFlags2::SHADER_STORAGE_WRITE,
            vk::PipelineStageFlags2::COMPUTE_SHADER,
            vk::ImageLayout::GENERAL,
        );
        assert_eq!(state.src_access(), vk::AccessFlags2::SHADER_STORAGE_WRITE);
    }
}

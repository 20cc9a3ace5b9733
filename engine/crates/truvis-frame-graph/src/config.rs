use serde::{Deserialize, Serialize};

use crate::error::{RgError, RgResult};

/// 依赖推导时，reader 应当依赖哪一个 writer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RgWriterPolicy {
    /// 先扫描所有 pass 建立 `name -> writer` 表（后写覆盖先写），再为每个 read 连边。
    ///
    /// 互相读取对方输出的 pass 会形成环，compile 失败。
    /// 一个资源被多个 pass 写入时，reader 总是依赖最后一个 writer。
    #[default]
    GlobalLastWriter,

    /// 按声明顺序，依赖在 reader 之前最近的那个 writer。
    ///
    /// 同时加入 WAW（writer 依赖上一个 writer）和 WAR（writer 依赖上一次写入之后的所有 reader）边。
    /// 边总是指向后声明的 pass，因此不会出现环。
    NearestPriorWriter,
}

/// RenderGraph 的配置
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RgConfig {
    /// 定义资源时默认的 frames in flight 数量
    pub frames_in_flight: usize,
    pub writer_policy: RgWriterPolicy,
    /// compile 成功后打印执行计划
    pub print_plan_on_compile: bool,
}

impl Default for RgConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 3,
            writer_policy: RgWriterPolicy::default(),
            print_plan_on_compile: false,
        }
    }
}

// new & init
impl RgConfig {
    /// 从 TOML 文本读取配置，缺省字段使用默认值
    pub fn from_toml_str(text: &str) -> RgResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| RgError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RgResult<()> {
        if self.frames_in_flight == 0 {
            return Err(RgError::Config("frames_in_flight must be at least 1".to_string()));
        }
        Ok(())
    }
}

//! 客户端配置
//!
//! 一个 TOML 文件覆盖全部可调参数：
//!
//! ```toml
//! [device]
//! host = "192.168.99.1"
//! request_timeout_ms = 1000
//!
//! [device.retry]
//! max_attempts = 5
//! delay_ms = 500
//!
//! [controller]
//! max_loops = 15
//!
//! [controller.gains.arm]
//! multiplier = 6.0
//! divisor = 3.0
//!
//! [safety]
//! claw_min = 0
//! max_drive = 100
//! inverted = [true, false, false, false]
//!
//! [motion]
//! default_speed = 25
//! ```
//!
//! 缺失的字段使用默认值。

use serde::{Deserialize, Serialize};
use std::path::Path;

use mebo_driver::DeviceConfig;

use crate::control::ControllerConfig;
use crate::error::RobotError;
use crate::safety::SafetyConfig;

/// 开环动作参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// 未指定功率时使用的驱动值
    pub default_speed: i32,
    /// 轮子每步持续时间（毫秒）
    pub drive_step_ms: u64,
    /// 关节点动每步持续时间（毫秒）
    pub joint_step_ms: u64,
    /// 夹爪开合默认步长
    pub claw_step: i32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            default_speed: 25,
            drive_step_ms: 500,
            joint_step_ms: 100,
            claw_step: 10,
        }
    }
}

/// 完整配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeboConfig {
    pub device: DeviceConfig,
    pub controller: ControllerConfig,
    pub safety: SafetyConfig,
    pub motion: MotionConfig,
}

impl MeboConfig {
    /// 解析 TOML 文本
    pub fn from_toml_str(text: &str) -> Result<Self, RobotError> {
        let config: MeboConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, RobotError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// 序列化为 TOML 文本
    pub fn to_toml_string(&self) -> Result<String, RobotError> {
        toml::to_string_pretty(self).map_err(|e| RobotError::ConfigError(e.to_string()))
    }

    /// 保存到文件（自动创建父目录）
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), RobotError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// 校验全部配置
    pub fn validate(&self) -> Result<(), RobotError> {
        self.device.validate()?;
        self.controller.validate()?;
        self.safety.validate().map_err(RobotError::ConfigError)?;
        if self.motion.default_speed <= 0 || self.motion.default_speed > self.safety.max_drive {
            return Err(RobotError::ConfigError(format!(
                "Invalid default_speed: {} (must be within [1, {}])",
                self.motion.default_speed, self.safety.max_drive
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        let config = MeboConfig::from_toml_str("").unwrap();
        assert_eq!(config, MeboConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let text = r#"
            [device]
            host = "10.0.0.7"

            [device.retry]
            max_attempts = 3

            [controller.gains.arm]
            multiplier = 6.0
            divisor = 4.0

            [safety]
            claw_min = 1
        "#;
        let config = MeboConfig::from_toml_str(text).unwrap();

        assert_eq!(config.device.host, "10.0.0.7");
        assert_eq!(config.device.retry.max_attempts, 3);
        assert_eq!(config.device.retry.delay_ms, 500);
        assert_eq!(config.controller.gains.arm.divisor, 4.0);
        assert_eq!(config.controller.gains.wrist_ud.divisor, 1.0);
        assert_eq!(config.safety.claw_min, 1);
        assert_eq!(config.safety.upper_bound, 90);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            MeboConfig::from_toml_str("[safety]\nlower_bound = 95"),
            Err(RobotError::ConfigError(_))
        ));
        assert!(matches!(
            MeboConfig::from_toml_str("[device]\nhost = 7"),
            Err(RobotError::Toml(_))
        ));
        assert!(MeboConfig::from_toml_str("[device.retry]\nmax_attempts = 0").is_err());
    }

    #[test]
    fn test_default_speed_bounded_by_max_drive() {
        let config = MeboConfig::from_toml_str("[motion]\ndefault_speed = 150");
        assert!(matches!(config, Err(RobotError::ConfigError(_))));

        let config =
            MeboConfig::from_toml_str("[motion]\ndefault_speed = 150\n\n[safety]\nmax_drive = 200").unwrap();
        assert_eq!(config.safety.max_drive, 200);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mebo").join("config.toml");

        let mut config = MeboConfig::default();
        config.device.host = "mebo.local".to_string();
        config.motion.default_speed = 40;
        config.save_to_file(&path).unwrap();

        let loaded = MeboConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = MeboConfig::load_from_file(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(RobotError::Io(_))));
    }
}

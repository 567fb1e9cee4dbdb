//! 配置管理命令
//!
//! 配置文件为 `MeboConfig` 的 TOML 形式，默认位于
//! `<config_dir>/mebo/config.toml`。

use anyhow::{Context, Result};
use clap::Subcommand;
use mebo_sdk::MeboConfig;
use std::path::{Path, PathBuf};

/// 默认配置文件路径
pub fn default_config_file() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;
    path.push("mebo");
    path.push("config.toml");
    Ok(path)
}

/// 加载配置（文件不存在时使用默认值）
pub fn load_config(path: &Path) -> Result<MeboConfig> {
    if !path.exists() {
        return Ok(MeboConfig::default());
    }
    MeboConfig::load_from_file(path)
        .with_context(|| format!("读取配置文件失败: {}", path.display()))
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 设置配置项
    Set {
        /// 设备地址
        #[arg(long)]
        host: Option<String>,

        /// 默认驱动值
        #[arg(long)]
        speed: Option<i32>,

        /// 每个请求的最大尝试次数
        #[arg(long)]
        max_attempts: Option<u32>,

        /// 重试间隔（毫秒）
        #[arg(long)]
        retry_delay_ms: Option<u64>,
    },

    /// 获取配置项
    Get {
        /// 配置项名称（host / speed / all）
        #[arg(default_value = "all")]
        key: String,
    },

    /// 检查配置
    Check,
}

impl ConfigCommand {
    pub fn execute(self, path: &Path) -> Result<()> {
        match self {
            ConfigCommand::Set {
                host,
                speed,
                max_attempts,
                retry_delay_ms,
            } => Self::set_(path, host, speed, max_attempts, retry_delay_ms),

            ConfigCommand::Get { key } => Self::get_(path, &key),

            ConfigCommand::Check => Self::check_(path),
        }
    }

    fn set_(
        path: &Path,
        host: Option<String>,
        speed: Option<i32>,
        max_attempts: Option<u32>,
        retry_delay_ms: Option<u64>,
    ) -> Result<()> {
        let mut config = load_config(path)?;

        if let Some(host) = host {
            println!("✅ 设置设备地址: {}", host);
            config.device.host = host;
        }
        if let Some(speed) = speed {
            println!("✅ 设置默认驱动值: {}", speed);
            config.motion.default_speed = speed;
        }
        if let Some(n) = max_attempts {
            println!("✅ 设置最大尝试次数: {}", n);
            config.device.retry.max_attempts = n;
        }
        if let Some(ms) = retry_delay_ms {
            println!("✅ 设置重试间隔: {} ms", ms);
            config.device.retry.delay_ms = ms;
        }

        config.validate()?;
        config.save_to_file(path)?;
        println!("💾 已保存到 {}", path.display());
        Ok(())
    }

    fn get_(path: &Path, key: &str) -> Result<()> {
        let config = load_config(path)?;

        match key {
            "host" => println!("{}", config.device.host),
            "speed" => println!("{}", config.motion.default_speed),
            _ => print!("{}", config.to_toml_string()?),
        }
        Ok(())
    }

    fn check_(path: &Path) -> Result<()> {
        println!("配置文件: {}", path.display());
        if !path.exists() {
            println!("  (不存在，使用默认配置)");
        }
        let config = load_config(path)?;
        config.validate()?;

        println!("  设备: {}", config.device.host);
        println!(
            "  重试: {} 次，间隔 {} ms",
            config.device.retry.max_attempts, config.device.retry.delay_ms
        );
        println!(
            "  限位: [{}, {}]，夹爪 [{}, {}]",
            config.safety.lower_bound,
            config.safety.upper_bound,
            config.safety.claw_min,
            config.safety.claw_max
        );
        println!("✅ 配置有效");
        Ok(())
    }
}

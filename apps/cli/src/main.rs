//! # Mebo CLI
//!
//! Command-line interface for Mebo robot control.
//!
//! 每条命令独立执行：加载配置 -> 连接（发送初始化序列）-> 执行 -> 断开。
//!
//! ```bash
//! # 配置设备地址
//! mebo-cli config set --host 192.168.99.1
//!
//! # 执行操作
//! mebo-cli goto --arm 60 --claw 100
//! mebo-cli drive forward --power 30 --steps 2
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use mebo_sdk::{Mebo, MeboBuilder};
use std::path::PathBuf;

mod commands;

use commands::config::{default_config_file, load_config};
use commands::{CalibrateTarget, ClawCommand, ConfigCommand, DriveCommand, GotoCommand, JogCommand};

/// Mebo CLI - 机器人命令行工具
#[derive(Parser, Debug)]
#[command(name = "mebo-cli")]
#[command(about = "Command-line interface for Mebo robot control", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件（默认 <config_dir>/mebo/config.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 设备地址（覆盖配置，写在子命令之前）
    #[arg(long)]
    host: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 查询电量
    Battery,

    /// 查询当前关节位置
    Position,

    /// 闭环移动关节到目标位置
    Goto {
        #[command(flatten)]
        args: GotoCommand,
    },

    /// 底盘行驶
    Drive {
        #[command(flatten)]
        args: DriveCommand,
    },

    /// 关节点动
    Jog {
        #[command(flatten)]
        args: JogCommand,
    },

    /// 夹爪
    #[command(subcommand)]
    Claw(ClawCommand),

    /// 切换夹爪灯
    Led,

    /// 停止所有驱动轴
    Stop {
        /// 停止前等待（毫秒）
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,
    },

    /// 校准
    #[command(subcommand)]
    Calibrate(CalibrateTarget),

    /// 重启设备
    Reboot,

    /// 查询固件版本
    Version,

    /// 按命令名发送原始命令
    Raw {
        /// 命令名，例如 CAL_CLAW
        name: String,
        /// 命令参数
        #[arg(allow_negative_numbers = true)]
        value: Option<i32>,
    },

    /// 抓取宏
    Pick,

    /// 放置宏
    Place,
}

fn main() -> Result<()> {
    mebo_sdk::init_logging("info");

    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_file()?,
    };

    let command = match cli.command {
        // 配置管理不连接设备
        Commands::Config(cmd) => return cmd.execute(&config_path),
        command => command,
    };

    let robot = connect(&config_path, cli.host)?;

    match command {
        Commands::Config(_) => Ok(()),
        Commands::Battery => {
            println!("🔋 {}", robot.battery()?);
            Ok(())
        },
        Commands::Position => commands::device::print_position(&robot),
        Commands::Goto { args } => args.execute(&robot),
        Commands::Drive { args } => args.execute(&robot),
        Commands::Jog { args } => args.execute(&robot),
        Commands::Claw(cmd) => cmd.execute(&robot),
        Commands::Led => commands::device::toggle_led(&robot),
        Commands::Stop { delay_ms } => commands::device::stop(&robot, delay_ms),
        Commands::Calibrate(target) => target.execute(&robot),
        Commands::Reboot => {
            robot.reboot()?;
            println!("🔄 重启命令已发送");
            Ok(())
        },
        Commands::Version => {
            println!("{}", robot.version()?);
            Ok(())
        },
        Commands::Raw { name, value } => commands::device::raw(&robot, &name, value),
        Commands::Pick => {
            robot.pick()?;
            println!("✅ 抓取完成");
            Ok(())
        },
        Commands::Place => {
            robot.place()?;
            println!("✅ 放置完成");
            Ok(())
        },
    }
}

/// 加载配置并连接，Ctrl+C 取消闭环定位
fn connect(config_path: &std::path::Path, host: Option<String>) -> Result<Mebo> {
    let mut config = load_config(config_path)?;
    if let Some(host) = host {
        config.device.host = host;
    }

    tracing::debug!(host = %config.device.host, "connecting");
    let robot = MeboBuilder::new().config(config).build()?;

    let token = robot.cancellation_token();
    ctrlc::set_handler(move || {
        eprintln!("\n🛑 收到 Ctrl+C，取消当前动作");
        token.cancel();
    })?;

    Ok(robot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_drive() {
        let cli = Cli::try_parse_from([
            "mebo-cli", "--host", "10.0.0.7", "drive", "left", "--power", "30", "--steps", "2",
        ])
        .unwrap();
        assert_eq!(cli.host.as_deref(), Some("10.0.0.7"));
        match cli.command {
            Commands::Drive { args } => {
                assert_eq!(args.power, Some(30));
                assert_eq!(args.steps, 2);
            },
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_raw_negative_value() {
        let cli = Cli::try_parse_from(["mebo-cli", "raw", "ARM_UP", "-20"]).unwrap();
        match cli.command {
            Commands::Raw { name, value } => {
                assert_eq!(name, "ARM_UP");
                assert_eq!(value, Some(-20));
            },
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_calibrate_joint() {
        let cli = Cli::try_parse_from(["mebo-cli", "calibrate", "joint", "wrist-ud"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Calibrate(CalibrateTarget::Joint {
                joint: mebo_sdk::Joint::WristUd
            })
        ));
    }
}

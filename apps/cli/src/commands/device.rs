//! 设备命令：查询、校准、重启、原始命令

use anyhow::Result;
use clap::Subcommand;
use mebo_sdk::prelude::*;
use std::time::Duration;

/// 打印当前关节位置
pub fn print_position(robot: &Mebo) -> Result<()> {
    let snapshot = robot.joint_state();
    let pose = match snapshot {
        JointSnapshot::Fresh(pose) => pose,
        JointSnapshot::Stale(pose) => {
            println!("⚠️ 读取失败，显示上一次的位置");
            pose
        },
        JointSnapshot::Unavailable => anyhow::bail!("无法读取关节位置"),
    };

    println!("📊 关节位置:");
    for (joint, value) in pose.enumerate() {
        println!("  {:<13} {:>3}", joint, value);
    }
    Ok(())
}

/// 校准目标
#[derive(Subcommand, Debug)]
pub enum CalibrateTarget {
    /// 全部关节
    All,
    /// 单个关节（arm / wrist-ud / wrist-rotate / claw）
    Joint { joint: Joint },
}

impl CalibrateTarget {
    pub fn execute(&self, robot: &Mebo) -> Result<()> {
        let sent = match self {
            CalibrateTarget::All => robot.calibrate_all()?,
            CalibrateTarget::Joint { joint } => robot.calibrate(*joint)?,
        };
        report(sent, "校准命令已发送");
        Ok(())
    }
}

/// 停止所有驱动轴
pub fn stop(robot: &Mebo, delay_ms: u64) -> Result<()> {
    let sent = robot.stop(Duration::from_millis(delay_ms))?;
    report(sent, "已停止");
    Ok(())
}

/// 切换夹爪灯
pub fn toggle_led(robot: &Mebo) -> Result<()> {
    let on = robot.toggle_claw_led()?;
    println!("💡 夹爪灯: {}", if on { "开" } else { "关" });
    Ok(())
}

/// 发送原始命令
pub fn raw(robot: &Mebo, name: &str, value: Option<i32>) -> Result<()> {
    let response = robot.raw(name, value)?;
    println!("{}", response.text());
    Ok(())
}

fn report(sent: bool, message: &str) {
    if sent {
        println!("✅ {}", message);
    } else {
        println!("⚠️ 设备无响应");
    }
}

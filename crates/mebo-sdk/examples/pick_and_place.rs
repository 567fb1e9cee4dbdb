//! 抓取/放置示例
//!
//! ```bash
//! cargo run --example pick_and_place -- --host 192.168.99.1
//! ```
//!
//! Ctrl+C 会中断正在进行的闭环定位。

use clap::Parser;
use mebo_sdk::prelude::*;

#[derive(Parser, Debug)]
#[command(about = "Mebo pick and place demo")]
struct Args {
    /// 设备地址
    #[arg(long, default_value = "192.168.99.1")]
    host: String,

    /// 只抓取，不放置
    #[arg(long)]
    pick_only: bool,
}

fn main() -> anyhow::Result<()> {
    mebo_sdk::init_logging("info");
    let args = Args::parse();

    println!("⏳ 连接到 {} ...", args.host);
    let robot = MeboBuilder::new().host(&args.host).build()?;
    println!("✅ 已连接，电量: {}", robot.battery()?);

    let token = robot.cancellation_token();
    ctrlc::set_handler(move || {
        println!("\n🛑 收到 Ctrl+C，停止定位");
        token.cancel();
    })?;

    println!("🤖 抓取...");
    robot.pick()?;

    if !args.pick_only {
        println!("🤖 放置...");
        robot.place()?;
    }

    match robot.joint_state() {
        JointSnapshot::Fresh(pose) => println!("📍 当前姿态: {:?}", pose.as_array()),
        other => println!("⚠️ 姿态不可用: {:?}", other),
    }
    Ok(())
}

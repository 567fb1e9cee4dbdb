//! 模拟设备上的端到端测试
//!
//! `MockLink` 开启运动学后，驱动命令会真实移动模拟关节，
//! 因此闭环定位、宏动作和取消都可以在没有硬件的情况下验证。

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use mebo_sdk::driver::mock::{MockLink, MockProbe, RecordingSleeper};
use mebo_sdk::prelude::*;
use serial_test::serial;

fn build(host: &str, link: Arc<MockLink>) -> Mebo {
    MeboBuilder::new()
        .host(host)
        .link(link)
        .probe(Arc::new(MockProbe::new()))
        .sleeper(Arc::new(RecordingSleeper::new()))
        .build()
        .expect("mock robot should build")
}

#[test]
#[serial]
fn test_positioning_converges_and_holds_other_joints() {
    let link = Arc::new(
        MockLink::with_pose(JointPosition::new([50, 40, 30, 20])).with_kinematics(0.25),
    );
    let robot = build("it-converge", link.clone());

    let goal = Goal::new([Some(80), Some(60), None, None]);
    let outcome = robot.set_joint_positions(&goal).unwrap();

    assert!(outcome.converged(), "{:?}", outcome);
    let pose = link.pose();
    assert!((pose[Joint::Arm] - 80).abs() <= 2, "{:?}", pose);
    assert!((pose[Joint::WristUd] - 60).abs() <= 2, "{:?}", pose);
    assert_eq!(pose[Joint::WristRotate], 30);
    // 未指定的夹爪保持起始开度
    assert_eq!(pose[Joint::Claw], 20);
}

#[test]
#[serial]
fn test_positioning_stops_at_safety_bound() {
    let link = Arc::new(
        MockLink::with_pose(JointPosition::new([50, 50, 50, 50])).with_kinematics(0.25),
    );
    let robot = build("it-bound", link.clone());

    let outcome = robot
        .set_joint_positions(&Goal::new([Some(100), None, None, None]))
        .unwrap();

    assert_eq!(outcome.state, ControllerState::IterationLimitReached);
    assert!(link.pose()[Joint::Arm] <= 90 + 5, "{:?}", link.pose());
}

#[test]
#[serial]
fn test_pick_closes_claw() {
    let link = Arc::new(
        MockLink::with_pose(JointPosition::new([60, 67, 48, 40])).with_kinematics(0.25),
    );
    let robot = build("it-pick", link.clone());

    robot.pick().unwrap();

    assert_eq!(link.pose()[Joint::Claw], 100);
}

#[test]
#[serial]
fn test_cancel_from_another_thread() {
    let link = Arc::new(MockLink::with_pose(JointPosition::new([50, 50, 50, 50])));
    let mut config = MeboConfig::default();
    config.device.host = "it-cancel".to_string();
    config.controller.tick_ms = 20;

    // 真实时钟；模拟关节不会移动，控制器只能被取消或耗尽迭代
    let robot = MeboBuilder::new()
        .config(config)
        .link(link)
        .probe(Arc::new(MockProbe::new()))
        .build()
        .unwrap();

    let token = robot.cancellation_token();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(60));
        token.cancel();
    });

    let outcome = robot
        .set_joint_positions(&Goal::new([Some(80), None, None, None]))
        .unwrap();
    canceller.join().unwrap();

    assert_eq!(outcome.state, ControllerState::Cancelled);
}

#[test]
#[serial]
fn test_transport_failure_is_retryable() {
    let link = Arc::new(MockLink::new());
    let robot = build("it-failing", link.clone());
    link.set_failing(true);

    let err = robot.battery().unwrap_err();
    assert!(err.is_retryable(), "{}", err);
    assert!(matches!(
        err,
        RobotError::Driver(DriverError::Transport { attempts: 5, .. })
    ));

    link.set_failing(false);
    assert_eq!(robot.battery().unwrap(), mebo_sdk::driver::mock::MOCK_BATTERY);
}

#[test]
#[serial]
fn test_drop_releases_session() {
    let link = Arc::new(MockLink::new());
    let robot = build("it-session", link.clone());
    drop(robot);
    let _again = build("it-session", link);
}

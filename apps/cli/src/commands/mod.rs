//! 命令定义和实现

pub mod config;
pub mod device;
pub mod motion;

pub use config::ConfigCommand;
pub use device::CalibrateTarget;
pub use motion::{ClawCommand, DriveCommand, GotoCommand, JogCommand};

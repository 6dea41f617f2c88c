//! Cooling control module.
//!
//! Provides fan speed validation, command planning and the fan controller.

mod controller;

pub use controller::{FanCommand, FanController, FanSpeedPair, MAX_FAN_PERCENT, plan_fan_commands};

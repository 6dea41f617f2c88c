//! Dual-channel fan speed controller.
//!
//! Speeds are requested as CPU/GPU percentages. Both 0 selects automatic
//! control, both 100 selects max mode, anything else drives one or both fans
//! in custom mode. A 0 on one side leaves that fan on automatic control.

use std::fmt;
use std::str::FromStr;

use log::info;

use crate::device::SenseDevice;
use crate::error::{Result, SenseError};
use crate::firmware::FirmwareChannel;
use crate::protocol::{
    Command, FAN_INDEX_CPU, FAN_INDEX_GPU, FanMode, encode_fan_behavior, encode_fan_percentage,
    encode_legacy_fan_mode,
};
use crate::utils::parsing::parse_fan_pair;

/// Maximum fan speed percentage.
pub const MAX_FAN_PERCENT: u8 = 100;

/// Requested CPU and GPU fan speeds in percent, 0 meaning automatic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FanSpeedPair {
    pub cpu: u8,
    pub gpu: u8,
}

impl FanSpeedPair {
    pub const AUTO: FanSpeedPair = FanSpeedPair { cpu: 0, gpu: 0 };
    pub const MAX: FanSpeedPair = FanSpeedPair {
        cpu: MAX_FAN_PERCENT,
        gpu: MAX_FAN_PERCENT,
    };

    /// Build a validated pair.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if either value exceeds 100.
    pub fn new(cpu: u8, gpu: u8) -> Result<Self> {
        for (name, value) in [("CPU", cpu), ("GPU", gpu)] {
            if value > MAX_FAN_PERCENT {
                return Err(SenseError::invalid(format!(
                    "{} fan speed must be 0-100, got {}",
                    name, value
                )));
            }
        }
        Ok(Self { cpu, gpu })
    }

    pub fn is_auto(&self) -> bool {
        *self == Self::AUTO
    }

    pub fn is_max(&self) -> bool {
        *self == Self::MAX
    }
}

impl fmt::Display for FanSpeedPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.cpu, self.gpu)
    }
}

impl FromStr for FanSpeedPair {
    type Err = SenseError;

    fn from_str(s: &str) -> Result<Self> {
        let (cpu, gpu) = parse_fan_pair(s)?;
        Self::new(cpu, gpu)
    }
}

/// One firmware write in a fan speed sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanCommand {
    /// Fan behavior word.
    Behavior(u64),
    /// Raw speed word for one fan.
    Speed(u64),
}

impl FanCommand {
    fn route(self) -> (Command, u64) {
        match self {
            FanCommand::Behavior(word) => (Command::SetFanBehavior, word),
            FanCommand::Speed(word) => (Command::SetFanSpeed, word),
        }
    }
}

/// Firmware writes needed to apply `speeds`, in order.
pub fn plan_fan_commands(speeds: FanSpeedPair) -> Vec<FanCommand> {
    let FanSpeedPair { cpu, gpu } = speeds;

    if speeds.is_max() {
        return vec![FanCommand::Behavior(encode_fan_behavior(
            FanMode::Max,
            FanMode::Max,
        ))];
    }
    if speeds.is_auto() {
        return vec![FanCommand::Behavior(encode_fan_behavior(
            FanMode::Auto,
            FanMode::Auto,
        ))];
    }

    let cpu_speed = FanCommand::Speed(encode_fan_percentage(cpu, FAN_INDEX_CPU));
    let gpu_speed = FanCommand::Speed(encode_fan_percentage(gpu, FAN_INDEX_GPU));

    if cpu == 0 {
        vec![
            FanCommand::Behavior(encode_fan_behavior(FanMode::Auto, FanMode::Custom)),
            gpu_speed,
        ]
    } else if gpu == 0 {
        vec![
            FanCommand::Behavior(encode_fan_behavior(FanMode::Custom, FanMode::Auto)),
            cpu_speed,
        ]
    } else {
        vec![
            FanCommand::Behavior(encode_fan_behavior(FanMode::Custom, FanMode::Custom)),
            cpu_speed,
            gpu_speed,
        ]
    }
}

/// Fan speed operations on a device.
pub struct FanController<'a, C: FirmwareChannel> {
    device: &'a SenseDevice<C>,
}

impl<'a, C: FirmwareChannel> FanController<'a, C> {
    pub(crate) fn new(device: &'a SenseDevice<C>) -> Self {
        Self { device }
    }

    /// Last fully applied fan speeds.
    pub fn speeds(&self) -> FanSpeedPair {
        self.device.state.lock().fans
    }

    /// Apply CPU and GPU fan speeds.
    ///
    /// The cached pair changes only after every write succeeded. A failure
    /// part way through leaves firmware in an intermediate state.
    ///
    /// # Arguments
    /// * `cpu` - CPU fan percentage (0 = automatic)
    /// * `gpu` - GPU fan percentage (0 = automatic)
    pub fn set_speeds(&self, cpu: u8, gpu: u8) -> Result<()> {
        let speeds = FanSpeedPair::new(cpu, gpu)?;
        self.apply(speeds)
    }

    /// Apply a validated pair.
    pub fn apply(&self, speeds: FanSpeedPair) -> Result<()> {
        let speeds = FanSpeedPair::new(speeds.cpu, speeds.gpu)?;

        for command in plan_fan_commands(speeds) {
            let (command, word) = command.route();
            self.device.firmware.send_u64(command, word)?;
        }

        self.device.state.lock().fans = speeds;
        info!("Fan speeds updated: CPU={}, GPU={}", speeds.cpu, speeds.gpu);
        Ok(())
    }

    /// Legacy whole-system fan mode used by the turbo button.
    pub(crate) fn set_legacy_mode(&self, mode: FanMode) -> Result<()> {
        let turbo = self
            .device
            .profile
            .turbo
            .ok_or_else(|| SenseError::unsupported("Turbo fan control is not fitted"))?;
        let word = encode_legacy_fan_mode(mode, turbo.cpu_fans, turbo.gpu_fans);
        self.device.firmware.send_u64(Command::SetFanBehavior, word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceProfile;
    use crate::firmware::{Reply, ScriptedFirmware};

    fn device() -> SenseDevice<ScriptedFirmware> {
        SenseDevice::new(ScriptedFirmware::new(), DeviceProfile::phn16_72())
    }

    fn sent(device: &SenseDevice<ScriptedFirmware>) -> Vec<(Command, u64)> {
        device
            .channel()
            .calls()
            .iter()
            .map(|c| (c.command().unwrap(), c.input_word().unwrap()))
            .collect()
    }

    #[test]
    fn test_max_is_single_behavior() {
        let device = device();
        device.fans().set_speeds(100, 100).unwrap();
        assert_eq!(sent(&device), vec![(Command::SetFanBehavior, 0x82_0009)]);
    }

    #[test]
    fn test_auto_is_single_behavior() {
        let device = device();
        device.fans().set_speeds(0, 0).unwrap();
        assert_eq!(sent(&device), vec![(Command::SetFanBehavior, 0x41_0009)]);
    }

    #[test]
    fn test_cpu_only() {
        let device = device();
        device.fans().set_speeds(30, 0).unwrap();
        assert_eq!(
            sent(&device),
            vec![
                (Command::SetFanBehavior, 0x43_0009),
                (Command::SetFanSpeed, encode_fan_percentage(30, 1)),
            ]
        );
    }

    #[test]
    fn test_gpu_only() {
        let device = device();
        device.fans().set_speeds(0, 40).unwrap();
        assert_eq!(
            sent(&device),
            vec![
                (Command::SetFanBehavior, 0xC1_0009),
                (Command::SetFanSpeed, encode_fan_percentage(40, 4)),
            ]
        );
    }

    #[test]
    fn test_mixed() {
        let device = device();
        device.fans().set_speeds(20, 60).unwrap();
        assert_eq!(
            sent(&device),
            vec![
                (Command::SetFanBehavior, 0xC3_0009),
                (Command::SetFanSpeed, 0x1401),
                (Command::SetFanSpeed, 0x3C04),
            ]
        );
        assert_eq!(device.fans().speeds(), FanSpeedPair { cpu: 20, gpu: 60 });
    }

    #[test]
    fn test_out_of_range_rejected_before_any_write() {
        let device = device();
        assert!(matches!(
            device.fans().set_speeds(101, 0),
            Err(SenseError::InvalidArgument(_))
        ));
        assert!(device.channel().calls().is_empty());
    }

    #[test]
    fn test_partial_failure_keeps_cached_speeds() {
        let device = device();
        device.fans().set_speeds(50, 50).unwrap();
        device
            .channel()
            .respond(Command::SetFanSpeed, Reply::fail("timeout"));

        assert!(matches!(
            device.fans().set_speeds(70, 80),
            Err(SenseError::Transport { .. })
        ));
        assert_eq!(device.fans().speeds(), FanSpeedPair { cpu: 50, gpu: 50 });
    }

    #[test]
    fn test_pair_text() {
        let pair: FanSpeedPair = "25,75".parse().unwrap();
        assert_eq!(pair.to_string(), "25,75");
        assert!("25".parse::<FanSpeedPair>().is_err());
    }
}

//! Firmware command routing table and wire constants for Acer gaming laptops.
//!
//! Every firmware operation is addressed by a (channel, method id) pair. The
//! pairs live in [`Command::route`] so the whole protocol surface can be
//! audited in one place. Values come from reverse-engineering of the vendor
//! WMI interface and are provisional for untested models.

// =============================================================================
// Channels
// =============================================================================

/// "ApgeAction" channel (USB charging, backlight timeout).
pub const ACTION_GUID: &str = "61EF69EA-865C-4BC3-A502-A0DEBA0CB531";

/// Gaming channel (profiles, fans, lighting, misc settings, sensors).
pub const GAMING_GUID: &str = "7A4DDFE7-5B5D-40B4-8595-4408E0CC7F56";

/// Battery health channel (charge limiter, calibration).
pub const BATTERY_HEALTH_GUID: &str = "79772EC5-04B1-4bfd-843C-61E7F77B6CC9";

/// Notification source. Not callable; delivers 8-byte event frames.
pub const EVENT_GUID: &str = "676AA15E-6A47-4D9F-A2CC-1E6D18D14026";

/// Callable firmware channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChannelId {
    Action,
    Gaming,
    BatteryHealth,
}

impl ChannelId {
    pub const ALL: [ChannelId; 3] = [ChannelId::Action, ChannelId::Gaming, ChannelId::BatteryHealth];

    /// GUID identifying the channel to the firmware.
    pub const fn guid(&self) -> &'static str {
        match self {
            ChannelId::Action => ACTION_GUID,
            ChannelId::Gaming => GAMING_GUID,
            ChannelId::BatteryHealth => BATTERY_HEALTH_GUID,
        }
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelId::Action => write!(f, "action"),
            ChannelId::Gaming => write!(f, "gaming"),
            ChannelId::BatteryHealth => write!(f, "battery-health"),
        }
    }
}

// =============================================================================
// Routing Table
// =============================================================================

/// Every firmware operation this crate issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    SetFunction,
    GetFunction,
    SetGamingProfile,
    SetGamingLed,
    GetGamingProfile,
    GetGamingLed,
    GetSysInfo,
    SetRgbZone,
    GetRgbZone,
    SetLogoColor,
    GetLogoColor,
    SetFanBehavior,
    SetFanSpeed,
    SetKbBacklight,
    GetKbBacklight,
    SetMiscSetting,
    GetMiscSetting,
    GetBatteryHealth,
    SetBatteryHealth,
}

impl Command {
    pub const ALL: [Command; 19] = [
        Command::SetFunction,
        Command::GetFunction,
        Command::SetGamingProfile,
        Command::SetGamingLed,
        Command::GetGamingProfile,
        Command::GetGamingLed,
        Command::GetSysInfo,
        Command::SetRgbZone,
        Command::GetRgbZone,
        Command::SetLogoColor,
        Command::GetLogoColor,
        Command::SetFanBehavior,
        Command::SetFanSpeed,
        Command::SetKbBacklight,
        Command::GetKbBacklight,
        Command::SetMiscSetting,
        Command::GetMiscSetting,
        Command::GetBatteryHealth,
        Command::SetBatteryHealth,
    ];

    /// Look up the command sent on a (channel, method id) pair.
    pub fn from_route(channel: ChannelId, method: u32) -> Option<Command> {
        Self::ALL
            .into_iter()
            .find(|c| c.route() == (channel, method))
    }

    /// Whether the command changes firmware state.
    pub const fn is_write(self) -> bool {
        matches!(
            self,
            Command::SetFunction
                | Command::SetGamingProfile
                | Command::SetGamingLed
                | Command::SetRgbZone
                | Command::SetLogoColor
                | Command::SetFanBehavior
                | Command::SetFanSpeed
                | Command::SetKbBacklight
                | Command::SetMiscSetting
                | Command::SetBatteryHealth
        )
    }

    /// The (channel, method id) pair this command is sent on.
    pub const fn route(self) -> (ChannelId, u32) {
        match self {
            Command::SetFunction => (ChannelId::Action, 1),
            Command::GetFunction => (ChannelId::Action, 2),
            Command::SetGamingProfile => (ChannelId::Gaming, 1),
            Command::SetGamingLed => (ChannelId::Gaming, 2),
            Command::GetGamingProfile => (ChannelId::Gaming, 3),
            Command::GetGamingLed => (ChannelId::Gaming, 4),
            Command::GetSysInfo => (ChannelId::Gaming, 5),
            Command::SetRgbZone => (ChannelId::Gaming, 6),
            Command::GetRgbZone => (ChannelId::Gaming, 7),
            Command::SetLogoColor => (ChannelId::Gaming, 12),
            Command::GetLogoColor => (ChannelId::Gaming, 13),
            Command::SetFanBehavior => (ChannelId::Gaming, 14),
            Command::SetFanSpeed => (ChannelId::Gaming, 16),
            Command::SetKbBacklight => (ChannelId::Gaming, 20),
            Command::GetKbBacklight => (ChannelId::Gaming, 21),
            Command::SetMiscSetting => (ChannelId::Gaming, 22),
            Command::GetMiscSetting => (ChannelId::Gaming, 23),
            Command::GetBatteryHealth => (ChannelId::BatteryHealth, 20),
            Command::SetBatteryHealth => (ChannelId::BatteryHealth, 21),
        }
    }

    pub const fn channel(self) -> ChannelId {
        self.route().0
    }

    pub const fn method(self) -> u32 {
        self.route().1
    }

    /// Human-readable name used in logs and errors.
    pub const fn name(self) -> &'static str {
        match self {
            Command::SetFunction => "set function",
            Command::GetFunction => "get function",
            Command::SetGamingProfile => "set gaming profile",
            Command::SetGamingLed => "set gaming LED",
            Command::GetGamingProfile => "get gaming profile",
            Command::GetGamingLed => "get gaming LED",
            Command::GetSysInfo => "get system info",
            Command::SetRgbZone => "set RGB zone",
            Command::GetRgbZone => "get RGB zone",
            Command::SetLogoColor => "set logo color",
            Command::GetLogoColor => "get logo color",
            Command::SetFanBehavior => "set fan behavior",
            Command::SetFanSpeed => "set fan speed",
            Command::SetKbBacklight => "set keyboard backlight",
            Command::GetKbBacklight => "get keyboard backlight",
            Command::SetMiscSetting => "set misc setting",
            Command::GetMiscSetting => "get misc setting",
            Command::GetBatteryHealth => "get battery health",
            Command::SetBatteryHealth => "set battery health",
        }
    }
}

// =============================================================================
// Misc Settings
// =============================================================================

/// Firmware configuration slots reachable through the misc get/set pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiscSetting {
    Overclock1,
    BootAnimationSound,
    Overclock2,
    SupportedProfiles,
    PlatformProfile,
}

impl MiscSetting {
    pub const fn index(self) -> u8 {
        match self {
            MiscSetting::Overclock1 => 0x05,
            MiscSetting::BootAnimationSound => 0x06,
            MiscSetting::Overclock2 => 0x07,
            MiscSetting::SupportedProfiles => 0x0A,
            MiscSetting::PlatformProfile => 0x0B,
        }
    }
}

/// Overclock misc setting value: stock clocks.
pub const OC_NORMAL: u8 = 0x00;
/// Overclock misc setting value: turbo clocks.
pub const OC_TURBO: u8 = 0x02;

// =============================================================================
// System Info Commands (GetSysInfo input word)
// =============================================================================

pub const SYS_INFO_SUPPORTED_SENSORS: u64 = 0x0000;
pub const SYS_INFO_SENSOR_READING: u64 = 0x0001;
pub const SYS_INFO_BATTERY_STATUS: u64 = 0x0002;

// =============================================================================
// Thermal Profile Wire Values
// =============================================================================

pub const PROFILE_WIRE_QUIET: u8 = 0x00;
pub const PROFILE_WIRE_BALANCED: u8 = 0x01;
pub const PROFILE_WIRE_PERFORMANCE: u8 = 0x04;
pub const PROFILE_WIRE_TURBO: u8 = 0x05;
pub const PROFILE_WIRE_ECO: u8 = 0x06;

// =============================================================================
// Fans
// =============================================================================

/// Channel index ORed into a raw fan speed word to route it to the CPU fan.
pub const FAN_INDEX_CPU: u64 = 1;
/// Channel index ORed into a raw fan speed word to route it to the GPU fan.
pub const FAN_INDEX_GPU: u64 = 4;

/// Fan bitmap bit selecting the CPU fan in a behavior word.
pub const FAN_BEHAVIOR_CPU_BIT: u64 = 1 << 0;
/// Fan bitmap bit selecting the GPU fan in a behavior word.
pub const FAN_BEHAVIOR_GPU_BIT: u64 = 1 << 3;
/// Shift of the 2-bit CPU fan mode field in a behavior word.
pub const FAN_BEHAVIOR_CPU_MODE_SHIFT: u32 = 16;
/// Shift of the 2-bit GPU fan mode field in a behavior word.
pub const FAN_BEHAVIOR_GPU_MODE_SHIFT: u32 = 22;

// =============================================================================
// Turbo LED (legacy turbo button)
// =============================================================================

pub const TURBO_LED_QUERY: u64 = 0x1;
pub const TURBO_LED_OFF: u64 = 0x1;
pub const TURBO_LED_ON: u64 = 0x10001;

// =============================================================================
// Keyboard / Lightbar
// =============================================================================

/// Length of the unified keyboard backlight command and readout frames.
pub const KB_FRAME_LENGTH: usize = 16;

/// Trailing bytes of every animated keyboard frame (offsets 8 and 9).
pub const KB_FRAME_TAIL: [u8; 2] = [3, 1];

/// Unified readout selector: keyboard.
pub const KB_READ_KEYBOARD: u64 = 1;
/// Unified readout selector: lightbar.
pub const KB_READ_LIGHTBAR: u64 = 2;

/// Zone bitmasks for the four keyboard zones, left to right.
pub const ZONE_MASKS: [u8; 4] = [0x1, 0x2, 0x4, 0x8];

/// Selector byte for the lightbar color setter / getter.
pub const LOGO_SELECT: u8 = 1;
/// Selector byte (offset 9) routing a unified frame to the lightbar gate.
pub const LIGHTBAR_GATE_SELECT: u8 = 2;
/// Minimum length of the dedicated lightbar color readout.
pub const LOGO_READOUT_MIN_LENGTH: usize = 6;

/// Payload of the RGB keyboard wake command.
pub const RGB_KB_WAKE: u64 = 1;

// =============================================================================
// Action Channel Functions
// =============================================================================

/// GetFunction selector for the USB charging rate.
pub const USB_CHARGING_QUERY: u64 = 0x4;

/// (rate, readback word, set word) for each supported USB charging rate.
pub const USB_CHARGING_TABLE: [(u8, u64, u64); 4] = [
    (0, 663_296, 663_300),
    (10, 659_200, 659_204),
    (20, 1_314_560, 1_314_564),
    (30, 1_969_920, 1_969_924),
];

pub const BACKLIGHT_TIMEOUT_QUERY: u64 = 0x88401;
pub const BACKLIGHT_TIMEOUT_ON: u64 = 0x1E00_0008_0000;
pub const BACKLIGHT_TIMEOUT_OFF: u64 = 0x80000;
pub const BACKLIGHT_TIMEOUT_SET_ON: u64 = 0x1E00_0008_8402;
pub const BACKLIGHT_TIMEOUT_SET_OFF: u64 = 0x88402;

// =============================================================================
// Gaming Profile (LCD override)
// =============================================================================

pub const LCD_OVERRIDE_QUERY: u64 = 0x0;
pub const LCD_OVERRIDE_ON: u64 = 0x1_0000_0100_0000;
pub const LCD_OVERRIDE_OFF: u64 = 0x100_0000;
pub const LCD_OVERRIDE_SET_ON: u64 = 0x1_0000_0000_0010;
pub const LCD_OVERRIDE_SET_OFF: u64 = 0x10;

// =============================================================================
// Battery Health
// =============================================================================

pub const BATTERY_NUMBER: u8 = 1;
pub const BATTERY_QUERY_FUNCTION: u8 = 1;
pub const BATTERY_FUNCTION_HEALTH: u8 = 1;
pub const BATTERY_FUNCTION_CALIBRATION: u8 = 2;
pub const BATTERY_STATUS_LENGTH: usize = 8;
pub const BATTERY_ACK_LENGTH: usize = 4;

// =============================================================================
// Notifications
// =============================================================================

pub const NOTIFICATION_LENGTH: usize = 8;

pub const EVENT_HOTKEY: u8 = 0x01;
pub const EVENT_TURBO_KEY: u8 = 0x07;
pub const EVENT_AC: u8 = 0x08;
pub const EVENT_BATTERY_BOOST: u8 = 0x09;
pub const EVENT_CALIBRATION: u8 = 0x0B;

/// Turbo key number on devices with the legacy turbo LED.
pub const KEY_TURBO: u8 = 0x4;
/// Mode key number on devices with unified profile support.
pub const KEY_MODE: u8 = 0x5;

// =============================================================================
// Sensors
// =============================================================================

pub const SENSOR_CPU_TEMPERATURE: u8 = 0x01;
pub const SENSOR_CPU_FAN: u8 = 0x02;
pub const SENSOR_EXTERNAL_TEMPERATURE_2: u8 = 0x03;
pub const SENSOR_GPU_FAN: u8 = 0x06;
pub const SENSOR_GPU_TEMPERATURE: u8 = 0x0A;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_are_unique() {
        let mut routes: Vec<_> = Command::ALL.iter().map(|c| c.route()).collect();
        routes.sort();
        routes.dedup();
        assert_eq!(routes.len(), Command::ALL.len());
    }

    #[test]
    fn test_from_route() {
        assert_eq!(
            Command::from_route(ChannelId::Gaming, 14),
            Some(Command::SetFanBehavior)
        );
        assert_eq!(
            Command::from_route(ChannelId::BatteryHealth, 20),
            Some(Command::GetBatteryHealth)
        );
        assert_eq!(Command::from_route(ChannelId::Action, 99), None);
    }

    #[test]
    fn test_battery_methods_share_ids_with_gaming_but_not_channel() {
        assert_eq!(Command::GetBatteryHealth.method(), Command::SetKbBacklight.method());
        assert_ne!(
            Command::GetBatteryHealth.channel(),
            Command::SetKbBacklight.channel()
        );
    }

    #[test]
    fn test_misc_setting_indexes() {
        assert_eq!(MiscSetting::PlatformProfile.index(), 0x0B);
        assert_eq!(MiscSetting::SupportedProfiles.index(), 0x0A);
        assert_eq!(MiscSetting::BootAnimationSound.index(), 0x06);
    }
}

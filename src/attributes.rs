//! Text attribute surface.
//!
//! Each attribute is a show/store pair over short human-readable strings,
//! the way a sysfs layer would expose them. Input is validated here before
//! anything reaches firmware.

use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::cooling::FanSpeedPair;
use crate::device::{DeviceProfile, SenseDevice};
use crate::error::{Result, SenseError};
use crate::firmware::FirmwareChannel;
use crate::lighting::{AnimatedSettings, LightbarState, PerZoneSettings};
use crate::settings::BatteryFunction;
use crate::thermal::ThermalProfile;
use crate::utils::parsing::{parse_bounded, parse_flag};

/// Named attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    FanSpeed,
    FourZoneMode,
    PerZoneMode,
    BackLogo,
    BatteryLimiter,
    BatteryCalibration,
    UsbCharging,
    LcdOverride,
    BacklightTimeout,
    BootAnimationSound,
    LightingReset,
    PlatformProfile,
    PlatformProfileChoices,
}

impl Attribute {
    pub const ALL: [Attribute; 13] = [
        Attribute::FanSpeed,
        Attribute::FourZoneMode,
        Attribute::PerZoneMode,
        Attribute::BackLogo,
        Attribute::BatteryLimiter,
        Attribute::BatteryCalibration,
        Attribute::UsbCharging,
        Attribute::LcdOverride,
        Attribute::BacklightTimeout,
        Attribute::BootAnimationSound,
        Attribute::LightingReset,
        Attribute::PlatformProfile,
        Attribute::PlatformProfileChoices,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Attribute::FanSpeed => "fan_speed",
            Attribute::FourZoneMode => "four_zone_mode",
            Attribute::PerZoneMode => "per_zone_mode",
            Attribute::BackLogo => "back_logo",
            Attribute::BatteryLimiter => "battery_limiter",
            Attribute::BatteryCalibration => "battery_calibration",
            Attribute::UsbCharging => "usb_charging",
            Attribute::LcdOverride => "lcd_override",
            Attribute::BacklightTimeout => "backlight_timeout",
            Attribute::BootAnimationSound => "boot_animation_sound",
            Attribute::LightingReset => "lighting_reset",
            Attribute::PlatformProfile => "platform_profile",
            Attribute::PlatformProfileChoices => "platform_profile_choices",
        }
    }

    /// Expected store format, for help output.
    pub const fn format(self) -> &'static str {
        match self {
            Attribute::FanSpeed => "cpu,gpu (0-100, 0 = auto)",
            Attribute::FourZoneMode => "mode,speed,brightness,direction,r,g,b",
            Attribute::PerZoneMode => "RRGGBB[,RRGGBB,RRGGBB,RRGGBB],brightness",
            Attribute::BackLogo => "RRGGBB,brightness[,enable]",
            Attribute::UsbCharging => "0, 10, 20 or 30",
            Attribute::LightingReset => "integer",
            Attribute::PlatformProfile => "profile name",
            Attribute::PlatformProfileChoices => "read-only",
            _ => "0 or 1",
        }
    }

    pub const fn is_readable(self) -> bool {
        !matches!(self, Attribute::LightingReset)
    }

    pub const fn is_writable(self) -> bool {
        !matches!(self, Attribute::PlatformProfileChoices)
    }

    /// Whether the attribute exists on `profile`.
    pub fn is_available(self, profile: &DeviceProfile) -> bool {
        match self {
            Attribute::FourZoneMode | Attribute::PerZoneMode => profile.four_zone_kb,
            Attribute::BackLogo => profile.back_logo,
            Attribute::PlatformProfile | Attribute::PlatformProfileChoices => {
                profile.platform_profile
            }
            Attribute::FanSpeed
            | Attribute::BatteryLimiter
            | Attribute::BatteryCalibration
            | Attribute::UsbCharging
            | Attribute::LcdOverride
            | Attribute::BacklightTimeout
            | Attribute::BootAnimationSound
            | Attribute::LightingReset => profile.has_sense_controls(),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attribute {
    type Err = SenseError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| SenseError::invalid(format!("Unknown attribute '{}'", s)))
    }
}

/// Attribute show/store on a device.
pub struct Attributes<'a, C: FirmwareChannel> {
    device: &'a SenseDevice<C>,
}

impl<'a, C: FirmwareChannel> Attributes<'a, C> {
    pub fn new(device: &'a SenseDevice<C>) -> Self {
        Self { device }
    }

    /// Attributes present on this model.
    pub fn list(&self) -> Vec<Attribute> {
        Attribute::ALL
            .into_iter()
            .filter(|a| a.is_available(&self.device.profile))
            .collect()
    }

    fn check(&self, attribute: Attribute) -> Result<()> {
        self.device
            .require(attribute.is_available(&self.device.profile), attribute.name())
    }

    /// Render an attribute's current value.
    pub fn show(&self, attribute: Attribute) -> Result<String> {
        self.check(attribute)?;
        let device = self.device;
        let text = match attribute {
            Attribute::FanSpeed => device.fans().speeds().to_string(),
            Attribute::FourZoneMode => device.lighting().animated_readout()?.to_string(),
            Attribute::PerZoneMode => device.lighting().zone_colors()?.to_string(),
            Attribute::BackLogo => device.lighting().lightbar()?.to_string(),
            Attribute::BatteryLimiter => {
                flag(device.settings().battery_health()?.charge_limit)
            }
            Attribute::BatteryCalibration => {
                flag(device.settings().battery_health()?.calibration)
            }
            Attribute::UsbCharging => device.settings().usb_charging()?.to_string(),
            Attribute::LcdOverride => flag(device.settings().lcd_override()?),
            Attribute::BacklightTimeout => flag(device.settings().backlight_timeout()?),
            Attribute::BootAnimationSound => flag(device.settings().boot_animation()?),
            Attribute::LightingReset => {
                return Err(SenseError::unsupported("lighting_reset is write-only"));
            }
            Attribute::PlatformProfile => device.thermal().get_profile()?.platform_name().to_string(),
            Attribute::PlatformProfileChoices => device.thermal().memory().supported.to_string(),
        };
        debug!("show {} -> {}", attribute, text);
        Ok(text)
    }

    /// Parse `text` and apply it.
    pub fn store(&self, attribute: Attribute, text: &str) -> Result<()> {
        self.check(attribute)?;
        debug!("store {} <- {}", attribute, text.trim());
        let device = self.device;
        match attribute {
            Attribute::FanSpeed => device.fans().apply(text.parse::<FanSpeedPair>()?),
            Attribute::FourZoneMode => device
                .lighting()
                .set_animated(text.parse::<AnimatedSettings>()?)
                .map(|_| ()),
            Attribute::PerZoneMode => device
                .lighting()
                .set_per_zone(text.parse::<PerZoneSettings>()?),
            Attribute::BackLogo => device
                .lighting()
                .set_lightbar(text.parse::<LightbarState>()?)
                .map(|_| ()),
            Attribute::BatteryLimiter => device
                .settings()
                .set_battery_function(BatteryFunction::ChargeLimit, parse_flag(text)?),
            Attribute::BatteryCalibration => device
                .settings()
                .set_battery_function(BatteryFunction::Calibration, parse_flag(text)?),
            Attribute::UsbCharging => device
                .settings()
                .set_usb_charging(parse_bounded(text, "USB charging rate", u8::MAX)?),
            Attribute::LcdOverride => device.settings().set_lcd_override(parse_flag(text)?),
            Attribute::BacklightTimeout => {
                device.settings().set_backlight_timeout(parse_flag(text)?)
            }
            Attribute::BootAnimationSound => {
                device.settings().set_boot_animation(parse_flag(text)?)
            }
            Attribute::LightingReset => {
                let value = text.trim().parse::<u64>().map_err(|_| {
                    SenseError::invalid(format!("Invalid reset value '{}'", text.trim()))
                })?;
                device.settings().reset_lighting(value)
            }
            Attribute::PlatformProfile => device
                .thermal()
                .set_profile(text.parse::<ThermalProfile>()?),
            Attribute::PlatformProfileChoices => Err(SenseError::unsupported(
                "platform_profile_choices is read-only",
            )),
        }
    }
}

fn flag(value: bool) -> String {
    u8::from(value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firmware::{Reply, ScriptedFirmware};
    use crate::protocol::Command;

    fn device() -> SenseDevice<ScriptedFirmware> {
        SenseDevice::new(ScriptedFirmware::new(), DeviceProfile::phn16_72())
    }

    #[test]
    fn test_names_round_trip() {
        for attribute in Attribute::ALL {
            assert_eq!(attribute.name().parse::<Attribute>().unwrap(), attribute);
        }
        assert!("fan_speeds".parse::<Attribute>().is_err());
    }

    #[test]
    fn test_list_follows_capabilities() {
        let device = device();
        assert_eq!(Attributes::new(&device).list().len(), Attribute::ALL.len());

        let nitro = SenseDevice::new(ScriptedFirmware::new(), DeviceProfile::nitro_v4());
        let list = Attributes::new(&nitro).list();
        assert!(!list.contains(&Attribute::BackLogo));
        assert!(list.contains(&Attribute::PerZoneMode));

        let turbo = SenseDevice::new(ScriptedFirmware::new(), DeviceProfile::predator_turbo());
        assert!(Attributes::new(&turbo).list().is_empty());
    }

    #[test]
    fn test_fan_speed() {
        let device = device();
        let attrs = Attributes::new(&device);
        attrs.store(Attribute::FanSpeed, "30,0\n").unwrap();
        assert_eq!(attrs.show(Attribute::FanSpeed).unwrap(), "30,0");

        assert!(matches!(
            attrs.store(Attribute::FanSpeed, "101,0"),
            Err(SenseError::InvalidArgument(_))
        ));
        assert!(attrs.store(Attribute::FanSpeed, "30").is_err());
        assert_eq!(device.channel().writes().len(), 2);
    }

    #[test]
    fn test_per_zone_single_color() {
        let device = device();
        Attributes::new(&device)
            .store(Attribute::PerZoneMode, "00ff00,50")
            .unwrap();
        assert_eq!(device.channel().calls_to(Command::SetRgbZone).len(), 4);
    }

    #[test]
    fn test_four_zone_mode_rejects_bad_direction() {
        let device = device();
        let result = Attributes::new(&device).store(Attribute::FourZoneMode, "3,4,50,0,0,0,0");
        assert!(matches!(result, Err(SenseError::InvalidArgument(_))));
        assert!(device.channel().calls().is_empty());
    }

    #[test]
    fn test_boolean_toggles() {
        let device = device();
        let attrs = Attributes::new(&device);
        assert!(attrs.store(Attribute::LcdOverride, "2").is_err());
        assert!(attrs.store(Attribute::LcdOverride, "yes").is_err());
        attrs.store(Attribute::BootAnimationSound, "0").unwrap();
        assert_eq!(attrs.show(Attribute::BootAnimationSound).unwrap(), "0");
    }

    #[test]
    fn test_usb_charging_values() {
        let device = device();
        let attrs = Attributes::new(&device);
        attrs.store(Attribute::UsbCharging, "10").unwrap();
        assert!(matches!(
            attrs.store(Attribute::UsbCharging, "25"),
            Err(SenseError::InvalidArgument(_))
        ));
        assert!(attrs.store(Attribute::UsbCharging, "300").is_err());
    }

    #[test]
    fn test_lighting_reset_is_write_only() {
        let device = device();
        let attrs = Attributes::new(&device);
        assert!(attrs.show(Attribute::LightingReset).is_err());
        attrs.store(Attribute::LightingReset, "1").unwrap();
        assert!(device.channel().calls()[0].is(Command::SetGamingLed));
    }

    #[test]
    fn test_platform_profile() {
        let device = device();
        device
            .channel()
            .respond(Command::GetMiscSetting, Reply::word(0x0400));
        let attrs = Attributes::new(&device);
        assert_eq!(
            attrs.show(Attribute::PlatformProfile).unwrap(),
            "balanced-performance"
        );
        // battery power
        assert!(matches!(
            attrs.store(Attribute::PlatformProfile, "performance"),
            Err(SenseError::Unsupported(_))
        ));
        attrs.store(Attribute::PlatformProfile, "low-power").unwrap();
    }

    #[test]
    fn test_unavailable_attribute() {
        let device = SenseDevice::new(ScriptedFirmware::new(), DeviceProfile::nitro_v4());
        assert!(matches!(
            Attributes::new(&device).show(Attribute::BackLogo),
            Err(SenseError::Unsupported(_))
        ));
    }
}

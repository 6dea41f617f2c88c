//! Per-model capability sets.
//!
//! A [`DeviceProfile`] is chosen once at startup and gates which operations
//! are legal on the machine. It never changes afterwards.

use crate::error::{Result, SenseError};

/// Legacy turbo button hardware (turbo LED, overclock slots, fan layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurboButton {
    /// Whether the two overclock misc settings are present.
    pub overclock: bool,
    pub cpu_fans: u8,
    pub gpu_fans: u8,
}

/// Capability set for one laptop model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Preset name, e.g. `phn16-72`.
    pub name: &'static str,
    /// Thermal profiles are driven through the platform profile misc setting.
    pub platform_profile: bool,
    /// Temperature and fan RPM sensors are readable through sys-info.
    pub fan_speed_read: bool,
    /// PredatorSense firmware: power-state memory, lighting wake quirk.
    pub predator_sense: bool,
    /// NitroSense firmware.
    pub nitro_sense: bool,
    /// NitroSense v4 firmware: the turbo key cycles profiles.
    pub nitro_v4: bool,
    /// Four-zone RGB keyboard.
    pub four_zone_kb: bool,
    /// Back lid lightbar.
    pub back_logo: bool,
    /// Legacy turbo button, if fitted.
    pub turbo: Option<TurboButton>,
}

impl DeviceProfile {
    /// Names accepted by [`DeviceProfile::from_model`].
    pub const MODELS: [&'static str; 4] = ["phn16-72", "predator-v4", "nitro-v4", "predator-turbo"];

    /// Predator Helios Neo 16 (PHN16-72).
    pub fn phn16_72() -> Self {
        Self {
            name: "phn16-72",
            four_zone_kb: true,
            back_logo: true,
            ..Self::predator_v4()
        }
    }

    /// Generic PredatorSense v4 machine without RGB extras.
    pub fn predator_v4() -> Self {
        Self {
            name: "predator-v4",
            platform_profile: true,
            fan_speed_read: true,
            predator_sense: true,
            nitro_sense: false,
            nitro_v4: false,
            four_zone_kb: false,
            back_logo: false,
            turbo: None,
        }
    }

    /// NitroSense v4 machine with a four-zone keyboard.
    pub fn nitro_v4() -> Self {
        Self {
            name: "nitro-v4",
            platform_profile: true,
            fan_speed_read: true,
            predator_sense: false,
            nitro_sense: true,
            nitro_v4: true,
            four_zone_kb: true,
            back_logo: false,
            turbo: None,
        }
    }

    /// Older Predator machine with a dedicated turbo button.
    pub fn predator_turbo() -> Self {
        Self {
            name: "predator-turbo",
            platform_profile: false,
            fan_speed_read: false,
            predator_sense: false,
            nitro_sense: false,
            nitro_v4: false,
            four_zone_kb: false,
            back_logo: false,
            turbo: Some(TurboButton {
                overclock: true,
                cpu_fans: 1,
                gpu_fans: 1,
            }),
        }
    }

    /// Look up a preset by name.
    pub fn from_model(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "phn16-72" => Ok(Self::phn16_72()),
            "predator-v4" => Ok(Self::predator_v4()),
            "nitro-v4" => Ok(Self::nitro_v4()),
            "predator-turbo" => Ok(Self::predator_turbo()),
            other => Err(SenseError::invalid(format!(
                "Unknown model '{}'. Known models: {}",
                other,
                Self::MODELS.join(", ")
            ))),
        }
    }

    /// Lighting engine needs the wake sequence at init, resume and per-zone writes.
    pub fn needs_lighting_wake(&self) -> bool {
        self.predator_sense
    }

    /// AC plug events switch power-state snapshots.
    pub fn handles_ac_events(&self) -> bool {
        self.predator_sense || self.nitro_v4
    }

    /// Battery health, USB charging and the other firmware toggles are exposed.
    pub fn has_sense_controls(&self) -> bool {
        self.predator_sense || self.nitro_sense || self.nitro_v4
    }

    /// Calibration requests from firmware are forwarded to battery health.
    pub fn handles_calibration_events(&self) -> bool {
        self.has_sense_controls()
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self::phn16_72()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phn16_72_capabilities() {
        let profile = DeviceProfile::phn16_72();
        assert!(profile.platform_profile);
        assert!(profile.fan_speed_read);
        assert!(profile.predator_sense);
        assert!(profile.four_zone_kb);
        assert!(profile.back_logo);
        assert!(profile.turbo.is_none());
        assert!(profile.needs_lighting_wake());
    }

    #[test]
    fn test_from_model() {
        for name in DeviceProfile::MODELS {
            assert_eq!(DeviceProfile::from_model(name).unwrap().name, name);
        }
        assert_eq!(DeviceProfile::from_model(" PHN16-72 ").unwrap().name, "phn16-72");
        assert!(DeviceProfile::from_model("aspire").is_err());
    }

    #[test]
    fn test_nitro_v4_handles_ac_without_wake() {
        let profile = DeviceProfile::nitro_v4();
        assert!(profile.handles_ac_events());
        assert!(!profile.needs_lighting_wake());
    }
}

//! Back lid lightbar.
//!
//! Firmware splits lightbar control across two commands: a color write
//! carrying color, brightness and enable, and a gate bit on the unified
//! keyboard backlight command.

use std::fmt;
use std::str::FromStr;

use log::{debug, info};

use crate::error::{Result, SenseError};
use crate::firmware::FirmwareChannel;
use crate::lighting::{LightingEngine, MAX_BRIGHTNESS, Rgb};
use crate::protocol::{
    Command, KB_READ_LIGHTBAR, LOGO_SELECT, LogoReadout, UnifiedReadout, build_lightbar_gate_frame,
    build_logo_payload,
};
use crate::utils::parsing::{parse_flag, parse_percent};

/// Lightbar effects. Only a static color is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightbarEffect {
    #[default]
    Static,
}

/// Lightbar settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LightbarState {
    pub enabled: bool,
    pub brightness: u8,
    pub color: Rgb,
    pub effect: LightbarEffect,
}

impl LightbarState {
    /// Lit at `brightness`, enabled whenever brightness is above zero.
    pub fn lit(color: Rgb, brightness: u8) -> Self {
        Self {
            enabled: brightness > 0,
            brightness,
            color,
            effect: LightbarEffect::Static,
        }
    }

    /// Settings as they reach firmware: disabled forces brightness to 0.
    pub fn effective(self) -> Self {
        if self.enabled {
            self
        } else {
            Self {
                brightness: 0,
                ..self
            }
        }
    }
}

impl fmt::Display for LightbarState {
    /// `rrggbb,brightness,enable`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{}",
            self.color,
            self.brightness,
            u8::from(self.enabled)
        )
    }
}

impl FromStr for LightbarState {
    type Err = SenseError;

    /// Parse `RRGGBB,brightness[,enable]`.
    fn from_str(s: &str) -> Result<Self> {
        let fields: Vec<&str> = s.trim().split(',').map(str::trim).collect();
        if !(2..=3).contains(&fields.len()) {
            return Err(SenseError::invalid(format!(
                "Expected RRGGBB,brightness[,enable], got '{}'",
                s.trim()
            )));
        }

        let color: Rgb = fields[0].parse()?;
        let brightness = parse_percent(fields[1], "brightness")?;
        let enabled = match fields.get(2) {
            Some(flag) => parse_flag(flag)?,
            None => brightness > 0,
        };

        Ok(Self {
            enabled,
            brightness,
            color,
            effect: LightbarEffect::Static,
        }
        .effective())
    }
}

impl<C: FirmwareChannel> LightingEngine<'_, C> {
    /// Program the lightbar.
    ///
    /// # Returns
    /// The settings actually written.
    pub fn set_lightbar(&self, state: LightbarState) -> Result<LightbarState> {
        self.device
            .require(self.device.profile.back_logo, "Lightbar")?;
        if state.brightness > MAX_BRIGHTNESS {
            return Err(SenseError::invalid(format!(
                "Brightness must be 0-{}, got {}",
                MAX_BRIGHTNESS, state.brightness
            )));
        }

        let state = state.effective();
        let firmware = &self.device.firmware;
        firmware.send(
            Command::SetLogoColor,
            &build_logo_payload(state.color.to_bytes(), state.brightness, state.enabled),
        )?;
        firmware.send(
            Command::SetKbBacklight,
            &build_lightbar_gate_frame(state.enabled),
        )?;

        info!("Lightbar set to {}", state);
        Ok(state)
    }

    /// Read the lightbar.
    ///
    /// Prefers the dedicated color readout and falls back to the unified
    /// readout when that fails or comes back short.
    pub fn lightbar(&self) -> Result<LightbarState> {
        self.device
            .require(self.device.profile.back_logo, "Lightbar")?;

        let dedicated = self
            .device
            .firmware
            .invoke(Command::GetLogoColor, &[LOGO_SELECT])
            .and_then(|reply| LogoReadout::parse(&reply));
        match dedicated {
            Ok(logo) => {
                return Ok(LightbarState {
                    enabled: logo.enabled,
                    brightness: logo.brightness,
                    color: Rgb::from_bytes(logo.rgb),
                    effect: LightbarEffect::Static,
                });
            }
            Err(e) => debug!("Dedicated lightbar readout unavailable: {}", e),
        }

        let reply = self
            .device
            .firmware
            .invoke(Command::GetKbBacklight, &KB_READ_LIGHTBAR.to_le_bytes())?;
        let readout = UnifiedReadout::parse(&reply)?;
        Ok(LightbarState {
            enabled: readout.effect() != 0,
            brightness: readout.brightness(),
            color: Rgb::from_bytes(readout.rgb()),
            effect: LightbarEffect::Static,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceProfile, SenseDevice};
    use crate::firmware::{Reply, ScriptedFirmware};

    fn device() -> SenseDevice<ScriptedFirmware> {
        SenseDevice::new(ScriptedFirmware::new(), DeviceProfile::phn16_72())
    }

    #[test]
    fn test_parse_lightbar_text() {
        let on: LightbarState = "ff0000,80".parse().unwrap();
        assert!(on.enabled);
        assert_eq!(on.brightness, 80);

        let off: LightbarState = "ff0000,80,0".parse().unwrap();
        assert!(!off.enabled);
        assert_eq!(off.brightness, 0);

        let dark: LightbarState = "00ff00,0".parse().unwrap();
        assert!(!dark.enabled);

        assert!("ff0000".parse::<LightbarState>().is_err());
        assert!("ff0000,101".parse::<LightbarState>().is_err());
        assert!("ff0000,50,2".parse::<LightbarState>().is_err());
    }

    #[test]
    fn test_disabled_forces_zero_brightness() {
        let device = device();
        let written = device
            .lighting()
            .set_lightbar(LightbarState {
                enabled: false,
                brightness: 90,
                color: Rgb::new(1, 2, 3),
                effect: LightbarEffect::Static,
            })
            .unwrap();
        assert_eq!(written.brightness, 0);

        let calls = device.channel().calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].is(Command::SetLogoColor));
        assert_eq!(calls[0].input, vec![1, 1, 2, 3, 0, 0]);
        assert!(calls[1].is(Command::SetKbBacklight));
        assert_eq!(calls[1].input[0], 0);
        assert_eq!(calls[1].input[9], 2);
    }

    #[test]
    fn test_enabled_write() {
        let device = device();
        device
            .lighting()
            .set_lightbar(LightbarState::lit(Rgb::new(9, 8, 7), 50))
            .unwrap();
        let calls = device.channel().calls();
        assert_eq!(calls[0].input, vec![1, 9, 8, 7, 50, 1]);
        assert_eq!(calls[1].input[0], 1);
    }

    #[test]
    fn test_read_prefers_dedicated_channel() {
        let device = device();
        device.channel().respond(
            Command::GetLogoColor,
            Reply::bytes(vec![0, 0x10, 0x20, 0x30, 75, 1]),
        );
        let state = device.lighting().lightbar().unwrap();
        assert_eq!(state.to_string(), "102030,75,1");
        assert!(device.channel().calls_to(Command::GetKbBacklight).is_empty());
    }

    #[test]
    fn test_read_falls_back_on_short_reply() {
        let device = device();
        let firmware = device.channel();
        firmware.respond(Command::GetLogoColor, Reply::bytes(vec![0, 1, 2]));
        let mut unified = vec![0u8; 16];
        unified[1] = 1;
        unified[3] = 40;
        unified[6..9].copy_from_slice(&[0xA0, 0xB0, 0xC0]);
        firmware.respond(Command::GetKbBacklight, Reply::bytes(unified));

        let state = device.lighting().lightbar().unwrap();
        assert_eq!(state.to_string(), "a0b0c0,40,1");
        let fallback = firmware.calls_to(Command::GetKbBacklight);
        assert_eq!(fallback[0].input_word(), Some(2));
    }

    #[test]
    fn test_read_falls_back_on_failure() {
        let device = device();
        let firmware = device.channel();
        firmware.respond(Command::GetLogoColor, Reply::fail("no such method"));
        firmware.respond(Command::GetKbBacklight, Reply::bytes(vec![0u8; 16]));

        let state = device.lighting().lightbar().unwrap();
        assert!(!state.enabled);
    }

    #[test]
    fn test_lightbar_requires_capability() {
        let device = SenseDevice::new(ScriptedFirmware::new(), DeviceProfile::nitro_v4());
        assert!(matches!(
            device.lighting().lightbar(),
            Err(SenseError::Unsupported(_))
        ));
    }
}

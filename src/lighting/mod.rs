//! Keyboard and lightbar lighting.
//!
//! The keyboard runs either one animated effect across the whole board or a
//! static color per zone. Firmware keeps whichever mode was written last, so
//! switching variants always reprograms the controller. The lightbar on the
//! back of the lid is driven separately.

mod keyboard;
mod lightbar;

use std::fmt;
use std::str::FromStr;

use log::{debug, warn};

use crate::device::SenseDevice;
use crate::error::{Result, SenseError};
use crate::firmware::FirmwareChannel;
use crate::protocol::{Command, RGB_KB_WAKE, build_keyboard_frame, build_wake_frame};
use crate::utils::parsing::{parse_bounded, parse_hex_color, parse_percent, split_fields};

pub use keyboard::{AnimatedReadout, KeyboardView};
pub use lightbar::{LightbarEffect, LightbarState};

/// Highest animation speed.
pub const MAX_SPEED: u8 = 9;
/// Highest animation direction value.
pub const MAX_DIRECTION: u8 = 2;
/// Highest brightness percentage.
pub const MAX_BRIGHTNESS: u8 = 100;
/// Number of keyboard zones.
pub const ZONE_COUNT: usize = 4;

// =============================================================================
// Colors
// =============================================================================

/// 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn from_bytes(bytes: [u8; 3]) -> Self {
        Self::new(bytes[0], bytes[1], bytes[2])
    }

    pub const fn to_bytes(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Build from a `0xRRGGBB` value; higher bits are ignored.
    pub const fn from_u32(value: u32) -> Self {
        Self::new((value >> 16) as u8, (value >> 8) as u8, value as u8)
    }

    pub const fn to_u32(self) -> u32 {
        (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = SenseError;

    fn from_str(s: &str) -> Result<Self> {
        let (r, g, b) = parse_hex_color(s)?;
        Ok(Self::new(r, g, b))
    }
}

// =============================================================================
// Keyboard Effects
// =============================================================================

/// Animated keyboard effects and their firmware ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyboardEffect {
    Static = 0,
    Breathing = 1,
    Neon = 2,
    Wave = 3,
    Shifting = 4,
    Zoom = 5,
    Meteor = 6,
    Twinkling = 7,
}

impl KeyboardEffect {
    pub const ALL: [KeyboardEffect; 8] = [
        KeyboardEffect::Static,
        KeyboardEffect::Breathing,
        KeyboardEffect::Neon,
        KeyboardEffect::Wave,
        KeyboardEffect::Shifting,
        KeyboardEffect::Zoom,
        KeyboardEffect::Meteor,
        KeyboardEffect::Twinkling,
    ];

    pub const fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(usize::from(id)).copied()
    }

    pub const fn name(self) -> &'static str {
        match self {
            KeyboardEffect::Static => "static",
            KeyboardEffect::Breathing => "breathing",
            KeyboardEffect::Neon => "neon",
            KeyboardEffect::Wave => "wave",
            KeyboardEffect::Shifting => "shifting",
            KeyboardEffect::Zoom => "zoom",
            KeyboardEffect::Meteor => "meteor",
            KeyboardEffect::Twinkling => "twinkling",
        }
    }

    /// Effects that move across the board and need a direction.
    pub const fn needs_direction(self) -> bool {
        matches!(self, KeyboardEffect::Wave | KeyboardEffect::Shifting)
    }
}

impl fmt::Display for KeyboardEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KeyboardEffect {
    type Err = SenseError;

    /// Accepts an effect name or its numeric id.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(id) = s.parse::<u8>() {
            return Self::from_id(id)
                .ok_or_else(|| SenseError::invalid(format!("Unknown keyboard effect id {}", id)));
        }
        Self::ALL
            .into_iter()
            .find(|e| e.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| SenseError::invalid(format!("Unknown keyboard effect '{}'", s)))
    }
}

// =============================================================================
// Keyboard Settings
// =============================================================================

/// Parameters of an animated keyboard effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimatedSettings {
    pub effect: KeyboardEffect,
    pub speed: u8,
    pub brightness: u8,
    pub direction: u8,
    pub color: Rgb,
}

impl AnimatedSettings {
    /// Check ranges and effect-specific requirements.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for speed > 9, brightness > 100,
    /// direction > 2, or a zero direction on wave and shifting.
    pub fn validate(&self) -> Result<()> {
        if self.speed > MAX_SPEED {
            return Err(SenseError::invalid(format!(
                "Speed must be 0-{}, got {}",
                MAX_SPEED, self.speed
            )));
        }
        if self.brightness > MAX_BRIGHTNESS {
            return Err(SenseError::invalid(format!(
                "Brightness must be 0-{}, got {}",
                MAX_BRIGHTNESS, self.brightness
            )));
        }
        if self.direction > MAX_DIRECTION {
            return Err(SenseError::invalid(format!(
                "Direction must be 0-{}, got {}",
                MAX_DIRECTION, self.direction
            )));
        }
        if self.effect.needs_direction() && self.direction == 0 {
            return Err(SenseError::invalid(format!(
                "The {} effect needs a direction of 1 or 2",
                self.effect
            )));
        }
        Ok(())
    }

    /// Zero the fields the effect ignores.
    pub fn normalized(self) -> Self {
        let mut out = self;
        match self.effect {
            KeyboardEffect::Static | KeyboardEffect::Breathing => {
                out.speed = 0;
                out.direction = 0;
            }
            KeyboardEffect::Neon => {
                out.color = Rgb::BLACK;
                out.direction = 0;
            }
            KeyboardEffect::Wave => out.color = Rgb::BLACK,
            KeyboardEffect::Shifting => {}
            KeyboardEffect::Zoom | KeyboardEffect::Meteor | KeyboardEffect::Twinkling => {
                out.direction = 0;
            }
        }
        out
    }

    /// Firmware frame for these settings, written as given.
    pub fn frame(&self) -> [u8; 16] {
        build_keyboard_frame(
            self.effect.id(),
            self.speed,
            self.brightness,
            self.direction,
            self.color.to_bytes(),
        )
    }
}

impl fmt::Display for AnimatedSettings {
    /// `mode,speed,brightness,direction,r,g,b`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{},{}",
            self.effect.id(),
            self.speed,
            self.brightness,
            self.direction,
            self.color.r,
            self.color.g,
            self.color.b
        )
    }
}

impl FromStr for AnimatedSettings {
    type Err = SenseError;

    /// Parse `mode,speed,brightness,direction,r,g,b`. Ranges are checked by
    /// [`AnimatedSettings::validate`], not here.
    fn from_str(s: &str) -> Result<Self> {
        let fields = split_fields(s, 7)?;
        let byte = |text: &str, what: &str| parse_bounded(text, what, u8::MAX);
        Ok(Self {
            effect: fields[0].parse()?,
            speed: byte(fields[1], "speed")?,
            brightness: byte(fields[2], "brightness")?,
            direction: byte(fields[3], "direction")?,
            color: Rgb::new(
                byte(fields[4], "red")?,
                byte(fields[5], "green")?,
                byte(fields[6], "blue")?,
            ),
        })
    }
}

/// Static per-zone colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PerZoneSettings {
    pub colors: [Rgb; ZONE_COUNT],
    pub brightness: u8,
}

impl PerZoneSettings {
    /// The same color on every zone.
    pub fn uniform(color: Rgb, brightness: u8) -> Self {
        Self {
            colors: [color; ZONE_COUNT],
            brightness,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.brightness > MAX_BRIGHTNESS {
            return Err(SenseError::invalid(format!(
                "Brightness must be 0-{}, got {}",
                MAX_BRIGHTNESS, self.brightness
            )));
        }
        Ok(())
    }
}

impl fmt::Display for PerZoneSettings {
    /// `RRGGBB,RRGGBB,RRGGBB,RRGGBB,brightness`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for color in &self.colors {
            write!(f, "{},", color)?;
        }
        write!(f, "{}", self.brightness)
    }
}

impl FromStr for PerZoneSettings {
    type Err = SenseError;

    /// Parse four zone colors and a brightness, or a single color for every
    /// zone: `RRGGBB[,RRGGBB,RRGGBB,RRGGBB],brightness`.
    fn from_str(s: &str) -> Result<Self> {
        let fields: Vec<&str> = s.trim().split(',').map(str::trim).collect();
        let (colors, brightness) = match fields.as_slice() {
            [color, brightness] => ([color.parse::<Rgb>()?; ZONE_COUNT], brightness),
            [a, b, c, d, brightness] => ([a.parse()?, b.parse()?, c.parse()?, d.parse()?], brightness),
            _ => {
                return Err(SenseError::invalid(format!(
                    "Expected 1 or {} colors followed by a brightness, got '{}'",
                    ZONE_COUNT,
                    s.trim()
                )));
            }
        };
        Ok(Self {
            colors,
            brightness: parse_percent(brightness, "brightness")?,
        })
    }
}

/// Keyboard lighting last written by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyboardLightingState {
    Animated(AnimatedSettings),
    PerZone(PerZoneSettings),
}

impl KeyboardLightingState {
    pub fn is_per_zone(&self) -> bool {
        matches!(self, KeyboardLightingState::PerZone(_))
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Outcome of the best-effort lighting wake sequence.
///
/// Both commands are always issued; failures are logged and kept here.
#[derive(Debug)]
pub struct WakeReport {
    /// Gaming LED engine enable frame.
    pub engine: Result<()>,
    /// Legacy RGB keyboard init word.
    pub keyboard: Result<()>,
}

impl WakeReport {
    pub fn is_clean(&self) -> bool {
        self.engine.is_ok() && self.keyboard.is_ok()
    }
}

/// Keyboard and lightbar operations on a device.
pub struct LightingEngine<'a, C: FirmwareChannel> {
    device: &'a SenseDevice<C>,
}

impl<'a, C: FirmwareChannel> LightingEngine<'a, C> {
    pub(crate) fn new(device: &'a SenseDevice<C>) -> Self {
        Self { device }
    }

    /// Wake the RGB controller.
    ///
    /// Some units leave the lighting engine disabled after plugging AC in
    /// during boot. Returns `None` on models without the quirk.
    pub fn wake(&self) -> Option<WakeReport> {
        if !self.device.profile.needs_lighting_wake() {
            return None;
        }

        let firmware = &self.device.firmware;
        let engine = firmware.send(Command::SetGamingLed, &build_wake_frame());
        if let Err(e) = &engine {
            warn!("Failed to enable gaming LED engine: {}", e);
        }
        let keyboard = firmware.send_u64(Command::SetRgbZone, RGB_KB_WAKE);
        if let Err(e) = &keyboard {
            warn!("Failed to initialise RGB keyboard: {}", e);
        }

        let report = WakeReport { engine, keyboard };
        if report.is_clean() {
            debug!("Lighting engine woken");
        }
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceProfile;
    use crate::firmware::{Reply, ScriptedFirmware};

    fn settings(effect: KeyboardEffect, speed: u8, direction: u8) -> AnimatedSettings {
        AnimatedSettings {
            effect,
            speed,
            brightness: 80,
            direction,
            color: Rgb::new(0x12, 0x34, 0x56),
        }
    }

    #[test]
    fn test_rgb_text() {
        let color: Rgb = "#FF8000".parse().unwrap();
        assert_eq!(color, Rgb::new(255, 128, 0));
        assert_eq!(color.to_string(), "ff8000");
        assert_eq!(Rgb::from_u32(color.to_u32()), color);
    }

    #[test]
    fn test_settings_text() {
        let parsed: AnimatedSettings = "3,4,50,1,0,255,0".parse().unwrap();
        assert_eq!(parsed.effect, KeyboardEffect::Wave);
        assert_eq!(parsed.color, Rgb::new(0, 255, 0));
        assert_eq!(parsed.to_string(), "3,4,50,1,0,255,0");
        assert!("3,4,50,1,0,255".parse::<AnimatedSettings>().is_err());

        let one: PerZoneSettings = "ff0000,40".parse().unwrap();
        assert_eq!(one, PerZoneSettings::uniform(Rgb::new(255, 0, 0), 40));
        let four: PerZoneSettings = "ff0000,00ff00,0000ff,ffffff,100".parse().unwrap();
        assert_eq!(four.colors[2], Rgb::new(0, 0, 255));
        assert_eq!(four.to_string(), "ff0000,00ff00,0000ff,ffffff,100");
        assert!("ff0000,00ff00,50".parse::<PerZoneSettings>().is_err());
        assert!("ff0000,101".parse::<PerZoneSettings>().is_err());
    }

    #[test]
    fn test_effect_parse() {
        assert_eq!("wave".parse::<KeyboardEffect>().unwrap(), KeyboardEffect::Wave);
        assert_eq!("6".parse::<KeyboardEffect>().unwrap(), KeyboardEffect::Meteor);
        assert!("8".parse::<KeyboardEffect>().is_err());
        assert!("rainbow".parse::<KeyboardEffect>().is_err());
    }

    #[test]
    fn test_validate_ranges() {
        assert!(settings(KeyboardEffect::Static, 10, 0).validate().is_err());
        assert!(settings(KeyboardEffect::Zoom, 9, 3).validate().is_err());
        assert!(settings(KeyboardEffect::Wave, 5, 0).validate().is_err());
        assert!(settings(KeyboardEffect::Shifting, 5, 0).validate().is_err());
        assert!(settings(KeyboardEffect::Wave, 5, 1).validate().is_ok());

        let mut bright = settings(KeyboardEffect::Static, 0, 0);
        bright.brightness = 101;
        assert!(bright.validate().is_err());
    }

    #[test]
    fn test_normalization() {
        let s = settings(KeyboardEffect::Static, 7, 2).normalized();
        assert_eq!((s.speed, s.direction), (0, 0));

        let n = settings(KeyboardEffect::Neon, 3, 1).normalized();
        assert_eq!((n.speed, n.direction, n.color), (3, 0, Rgb::BLACK));

        let w = settings(KeyboardEffect::Wave, 3, 1).normalized();
        assert_eq!((w.direction, w.color), (1, Rgb::BLACK));

        let shifting = settings(KeyboardEffect::Shifting, 3, 2);
        assert_eq!(shifting.normalized(), shifting);

        let m = settings(KeyboardEffect::Meteor, 3, 2).normalized();
        assert_eq!((m.speed, m.direction), (3, 0));
    }

    #[test]
    fn test_per_zone_text() {
        let zones = PerZoneSettings {
            colors: [
                Rgb::new(0xff, 0, 0),
                Rgb::new(0, 0xff, 0),
                Rgb::new(0, 0, 0xff),
                Rgb::BLACK,
            ],
            brightness: 40,
        };
        assert_eq!(zones.to_string(), "ff0000,00ff00,0000ff,000000,40");
    }

    #[test]
    fn test_wake_tolerates_failures() {
        let firmware = ScriptedFirmware::new();
        firmware.respond(Command::SetGamingLed, Reply::fail("invalid parameter"));
        let device = SenseDevice::new(firmware, DeviceProfile::phn16_72());

        let report = device.lighting().wake().unwrap();
        assert!(report.engine.is_err());
        assert!(report.keyboard.is_ok());
        assert_eq!(device.channel().calls().len(), 2);
    }

    #[test]
    fn test_wake_skipped_without_quirk() {
        let device = SenseDevice::new(ScriptedFirmware::new(), DeviceProfile::nitro_v4());
        assert!(device.lighting().wake().is_none());
        assert!(device.channel().calls().is_empty());
    }
}

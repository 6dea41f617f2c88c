//! Four-zone keyboard: animated effects, per-zone colors, readback and
//! persistence of the keyboard state across restarts.

use log::{error, info, warn};

use crate::error::{Result, SenseError};
use crate::firmware::FirmwareChannel;
use crate::lighting::{
    AnimatedSettings, KeyboardEffect, KeyboardLightingState, LightingEngine, PerZoneSettings, Rgb,
    ZONE_COUNT,
};
use crate::protocol::{
    Command, KB_FRAME_LENGTH, KB_READ_KEYBOARD, UnifiedReadout, ZONE_MASKS, build_keyboard_frame,
    build_wake_frame, build_zone_payload, parse_word, parse_zone_color,
};
use crate::storage::{KEYBOARD_STATE_KEY, decode_keyboard_record, encode_keyboard_record};

/// Animated fields as reported by firmware.
///
/// Kept raw: firmware may report an effect id this crate does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnimatedReadout {
    pub effect: u8,
    pub speed: u8,
    pub brightness: u8,
    pub direction: u8,
    pub color: Rgb,
}

impl AnimatedReadout {
    /// Typed settings, if the effect id is known.
    pub fn settings(&self) -> Option<AnimatedSettings> {
        KeyboardEffect::from_id(self.effect).map(|effect| AnimatedSettings {
            effect,
            speed: self.speed,
            brightness: self.brightness,
            direction: self.direction,
            color: self.color,
        })
    }

    fn frame(&self) -> [u8; KB_FRAME_LENGTH] {
        build_keyboard_frame(
            self.effect,
            self.speed,
            self.brightness,
            self.direction,
            self.color.to_bytes(),
        )
    }
}

impl From<&UnifiedReadout> for AnimatedReadout {
    fn from(readout: &UnifiedReadout) -> Self {
        Self {
            effect: readout.effect(),
            speed: readout.speed(),
            brightness: readout.brightness(),
            direction: readout.direction(),
            color: Rgb::from_bytes(readout.rgb()),
        }
    }
}

impl From<AnimatedSettings> for AnimatedReadout {
    fn from(settings: AnimatedSettings) -> Self {
        Self {
            effect: settings.effect.id(),
            speed: settings.speed,
            brightness: settings.brightness,
            direction: settings.direction,
            color: settings.color,
        }
    }
}

impl std::fmt::Display for AnimatedReadout {
    /// `mode,speed,brightness,direction,r,g,b`
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{},{}",
            self.effect,
            self.speed,
            self.brightness,
            self.direction,
            self.color.r,
            self.color.g,
            self.color.b
        )
    }
}

/// Everything the keyboard reports, plus which variant was written last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyboardView {
    /// Per-zone colors are the active variant.
    pub per_zone: bool,
    pub animated: AnimatedReadout,
    pub zones: PerZoneSettings,
}

impl<C: FirmwareChannel> LightingEngine<'_, C> {
    /// Last keyboard state written through this device.
    pub fn keyboard_state(&self) -> Option<KeyboardLightingState> {
        self.device.state.lock().keyboard
    }

    /// Run an animated effect.
    ///
    /// Fields the effect ignores are zeroed before the frame is built.
    ///
    /// # Returns
    /// The settings actually written.
    pub fn set_animated(&self, settings: AnimatedSettings) -> Result<AnimatedSettings> {
        self.device
            .require(self.device.profile.four_zone_kb, "Four-zone keyboard")?;
        settings.validate()?;

        let settings = settings.normalized();
        self.write_keyboard_frame(&settings.frame())?;

        self.device.state.lock().keyboard = Some(KeyboardLightingState::Animated(settings));
        info!("Keyboard set to {} ({})", settings.effect, settings);
        Ok(settings)
    }

    /// Give each zone a static color.
    ///
    /// The board is switched to static mode at the requested brightness
    /// first, since firmware only takes zone writes from a clean state.
    pub fn set_per_zone(&self, settings: PerZoneSettings) -> Result<()> {
        self.device
            .require(self.device.profile.four_zone_kb, "Four-zone keyboard")?;
        settings.validate()?;

        let clean = build_keyboard_frame(
            KeyboardEffect::Static.id(),
            0,
            settings.brightness,
            0,
            [0; 3],
        );
        self.write_keyboard_frame(&clean)?;

        if self.device.profile.needs_lighting_wake() {
            let woken = self
                .device
                .firmware
                .send(Command::SetGamingLed, &build_wake_frame());
            if let Err(e) = woken {
                warn!("Failed to wake gaming LED engine: {}", e);
            }
        }

        for (zone, (mask, color)) in ZONE_MASKS.iter().zip(settings.colors).enumerate() {
            self.device
                .firmware
                .send(Command::SetRgbZone, &build_zone_payload(*mask, color.to_bytes()))
                .inspect_err(|e| error!("Failed to set keyboard zone {}: {}", zone + 1, e))?;
        }

        self.device.state.lock().keyboard = Some(KeyboardLightingState::PerZone(settings));
        info!("Keyboard zones set to {}", settings);
        Ok(())
    }

    /// Read the animated fields through the unified 16-byte readout.
    pub fn animated_readout(&self) -> Result<AnimatedReadout> {
        self.device
            .require(self.device.profile.four_zone_kb, "Four-zone keyboard")?;
        let reply = self
            .device
            .firmware
            .invoke(Command::GetKbBacklight, &KB_READ_KEYBOARD.to_le_bytes())?;
        let readout = UnifiedReadout::parse(&reply).inspect_err(|e| error!("{}", e))?;
        Ok(AnimatedReadout::from(&readout))
    }

    /// Read the four zone colors and the keyboard brightness.
    pub fn zone_colors(&self) -> Result<PerZoneSettings> {
        self.device
            .require(self.device.profile.four_zone_kb, "Four-zone keyboard")?;

        let mut colors = [Rgb::BLACK; ZONE_COUNT];
        for (slot, mask) in colors.iter_mut().zip(ZONE_MASKS) {
            let word = self
                .device
                .firmware
                .query_u64(Command::GetRgbZone, u64::from(mask))?;
            let (_, rgb) = parse_zone_color(word);
            *slot = Rgb::from_bytes(rgb);
        }

        let brightness = self.animated_readout()?.brightness;
        Ok(PerZoneSettings { colors, brightness })
    }

    /// Read back the whole keyboard.
    pub fn get_state(&self) -> Result<KeyboardView> {
        let animated = self.animated_readout()?;
        let zones = self.zone_colors()?;
        let per_zone = self
            .keyboard_state()
            .is_some_and(|state| state.is_per_zone());
        Ok(KeyboardView {
            per_zone,
            animated,
            zones,
        })
    }

    /// Refresh the keyboard view from firmware and persist it.
    pub fn save_keyboard(&self) -> Result<()> {
        let view = self.get_state()?;
        let record = encode_keyboard_record(&view);
        self.device
            .store
            .store(KEYBOARD_STATE_KEY, &record)
            .map_err(|source| SenseError::Storage {
                key: KEYBOARD_STATE_KEY.to_string(),
                source,
            })?;
        info!("Keyboard state saved");
        Ok(())
    }

    /// Re-apply the persisted keyboard state.
    ///
    /// # Returns
    /// `false` if nothing usable was stored.
    pub fn restore_keyboard(&self) -> Result<bool> {
        self.device
            .require(self.device.profile.four_zone_kb, "Four-zone keyboard")?;

        let blob = match self.device.store.load(KEYBOARD_STATE_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                info!("No saved keyboard state");
                return Ok(false);
            }
            Err(e) => {
                info!("Keyboard state unreadable: {}", e);
                return Ok(false);
            }
        };
        let view = match decode_keyboard_record(&blob) {
            Ok(view) => view,
            Err(e) => {
                info!("Ignoring saved keyboard state: {}", e);
                return Ok(false);
            }
        };

        if view.per_zone {
            self.set_per_zone(view.zones)?;
        } else {
            // Saved fields came from firmware and are written back unchecked.
            self.write_keyboard_frame(&view.animated.frame())?;
            self.device.state.lock().keyboard = view
                .animated
                .settings()
                .map(KeyboardLightingState::Animated);
        }

        info!("Keyboard state restored");
        Ok(true)
    }

    /// Send a keyboard frame; a non-zero integer reply is a rejection.
    pub(crate) fn write_keyboard_frame(&self, frame: &[u8; KB_FRAME_LENGTH]) -> Result<()> {
        let reply = self.device.firmware.invoke(Command::SetKbBacklight, frame)?;
        match parse_word(&reply) {
            Ok(status) if status != 0 => {
                error!("Keyboard backlight write rejected: {}", status);
                Err(SenseError::CommandRejected {
                    operation: Command::SetKbBacklight.name(),
                    status,
                })
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceProfile, SenseDevice};
    use crate::firmware::{Reply, ScriptedFirmware};
    use crate::storage::MemoryBlobStore;

    fn device() -> SenseDevice<ScriptedFirmware> {
        SenseDevice::new(ScriptedFirmware::new(), DeviceProfile::phn16_72())
    }

    fn readout(effect: u8, brightness: u8) -> Vec<u8> {
        let mut buf = vec![0u8; 16];
        buf[1] = effect;
        buf[2] = 4;
        buf[3] = brightness;
        buf[5] = 1;
        buf[6..9].copy_from_slice(&[0xAA, 0xBB, 0xCC]);
        buf
    }

    fn zone_word(rgb: [u8; 3]) -> u64 {
        u64::from_le_bytes([0, rgb[0], rgb[1], rgb[2], 0, 0, 0, 0])
    }

    #[test]
    fn test_static_speed_is_normalized_in_frame() {
        let device = device();
        let written = device
            .lighting()
            .set_animated(AnimatedSettings {
                effect: KeyboardEffect::Static,
                speed: 7,
                brightness: 60,
                direction: 1,
                color: Rgb::new(1, 2, 3),
            })
            .unwrap();
        assert_eq!(written.speed, 0);

        let calls = device.channel().calls_to(Command::SetKbBacklight);
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].input,
            vec![0, 0, 60, 0, 0, 1, 2, 3, 3, 1, 0, 0, 0, 0, 0, 0]
        );
        assert!(matches!(
            device.lighting().keyboard_state(),
            Some(KeyboardLightingState::Animated(_))
        ));
    }

    #[test]
    fn test_invalid_animated_sends_nothing() {
        let device = device();
        let result = device.lighting().set_animated(AnimatedSettings {
            effect: KeyboardEffect::Wave,
            speed: 3,
            brightness: 50,
            direction: 0,
            color: Rgb::BLACK,
        });
        assert!(matches!(result, Err(SenseError::InvalidArgument(_))));
        assert!(device.channel().calls().is_empty());
    }

    #[test]
    fn test_animated_rejected_by_firmware() {
        let device = device();
        device
            .channel()
            .respond(Command::SetKbBacklight, Reply::word(3));
        let result = device.lighting().set_animated(AnimatedSettings {
            effect: KeyboardEffect::Breathing,
            speed: 0,
            brightness: 50,
            direction: 0,
            color: Rgb::BLACK,
        });
        assert!(matches!(
            result,
            Err(SenseError::CommandRejected { status: 3, .. })
        ));
        assert_eq!(device.lighting().keyboard_state(), None);
    }

    #[test]
    fn test_per_zone_sequence() {
        let device = device();
        let settings = PerZoneSettings {
            colors: [
                Rgb::new(0x11, 0x22, 0x33),
                Rgb::new(0x44, 0x55, 0x66),
                Rgb::new(0x77, 0x88, 0x99),
                Rgb::new(0xAA, 0xBB, 0xCC),
            ],
            brightness: 70,
        };
        device.lighting().set_per_zone(settings).unwrap();

        let calls = device.channel().calls();
        let commands: Vec<Command> = calls.iter().map(|c| c.command().unwrap()).collect();
        assert_eq!(
            commands,
            vec![
                Command::SetKbBacklight,
                Command::SetGamingLed,
                Command::SetRgbZone,
                Command::SetRgbZone,
                Command::SetRgbZone,
                Command::SetRgbZone,
            ]
        );
        assert_eq!(calls[0].input[2], 70);
        assert_eq!(calls[5].input, vec![8, 0xAA, 0xBB, 0xCC, 0, 0, 0, 0]);
        assert_eq!(
            device.lighting().keyboard_state(),
            Some(KeyboardLightingState::PerZone(settings))
        );
    }

    #[test]
    fn test_per_zone_wake_failure_tolerated() {
        let device = device();
        device
            .channel()
            .respond(Command::SetGamingLed, Reply::fail("unsupported"));
        device
            .lighting()
            .set_per_zone(PerZoneSettings::uniform(Rgb::new(1, 1, 1), 10))
            .unwrap();
        assert_eq!(device.channel().calls_to(Command::SetRgbZone).len(), 4);
    }

    #[test]
    fn test_per_zone_without_wake_quirk() {
        let device = SenseDevice::new(ScriptedFirmware::new(), DeviceProfile::nitro_v4());
        device
            .lighting()
            .set_per_zone(PerZoneSettings::uniform(Rgb::new(1, 1, 1), 10))
            .unwrap();
        assert!(device.channel().calls_to(Command::SetGamingLed).is_empty());
    }

    #[test]
    fn test_get_state_reads_both_channels() {
        let device = device();
        let firmware = device.channel();
        firmware.respond(Command::GetKbBacklight, Reply::bytes(readout(3, 55)));
        for (i, mask) in ZONE_MASKS.iter().enumerate() {
            let shade = (i as u8 + 1) * 0x10;
            firmware.respond_to_word(
                Command::GetRgbZone,
                u64::from(*mask),
                Reply::word(zone_word([shade, shade, shade])),
            );
        }

        let view = device.lighting().get_state().unwrap();
        assert!(!view.per_zone);
        assert_eq!(view.animated.effect, 3);
        assert_eq!(view.animated.direction, 1);
        assert_eq!(view.animated.color, Rgb::new(0xAA, 0xBB, 0xCC));
        assert_eq!(view.zones.brightness, 55);
        assert_eq!(view.zones.colors[3], Rgb::new(0x40, 0x40, 0x40));
        assert_eq!(view.animated.to_string(), "3,4,55,1,170,187,204");
    }

    #[test]
    fn test_short_readout_is_protocol_error() {
        let device = device();
        device
            .channel()
            .respond(Command::GetKbBacklight, Reply::bytes(vec![0u8; 8]));
        assert!(matches!(
            device.lighting().animated_readout(),
            Err(SenseError::Protocol { .. })
        ));
    }

    #[test]
    fn test_keyboard_save_and_restore_per_zone() {
        let store = MemoryBlobStore::new();
        let device = device().with_store(store.clone());
        let firmware = device.channel();
        firmware.respond(Command::GetKbBacklight, Reply::bytes(readout(0, 30)));
        firmware.respond_to_word(
            Command::GetRgbZone,
            1,
            Reply::word(zone_word([0xFF, 0, 0])),
        );
        device
            .lighting()
            .set_per_zone(PerZoneSettings::uniform(Rgb::new(0xFF, 0, 0), 30))
            .unwrap();
        device.lighting().save_keyboard().unwrap();

        let restored = SenseDevice::new(ScriptedFirmware::new(), DeviceProfile::phn16_72())
            .with_store(store);
        assert!(restored.lighting().restore_keyboard().unwrap());

        let zones = restored.channel().calls_to(Command::SetRgbZone);
        assert_eq!(zones.len(), 4);
        assert_eq!(zones[0].input, vec![1, 0xFF, 0, 0, 0, 0, 0, 0]);
        assert_eq!(zones[1].input, vec![2, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_keyboard_restore_animated_writes_raw_frame() {
        let store = MemoryBlobStore::new();
        let view = KeyboardView {
            per_zone: false,
            animated: AnimatedReadout {
                effect: 3,
                speed: 5,
                brightness: 90,
                direction: 2,
                color: Rgb::BLACK,
            },
            zones: PerZoneSettings::default(),
        };
        crate::storage::BlobStore::store(&store, KEYBOARD_STATE_KEY, &encode_keyboard_record(&view))
            .unwrap();

        let device = device().with_store(store);
        assert!(device.lighting().restore_keyboard().unwrap());

        let calls = device.channel().calls_to(Command::SetKbBacklight);
        assert_eq!(calls.len(), 1);
        assert_eq!(&calls[0].input[..5], &[3, 5, 90, 0, 2]);
    }

    #[test]
    fn test_keyboard_restore_missing_or_short() {
        let store = MemoryBlobStore::new();
        let device = device().with_store(store.clone());
        assert!(!device.lighting().restore_keyboard().unwrap());

        crate::storage::BlobStore::store(&store, KEYBOARD_STATE_KEY, &[1, 2, 3]).unwrap();
        assert!(!device.lighting().restore_keyboard().unwrap());
        assert!(device.channel().calls().is_empty());
    }

    #[test]
    fn test_keyboard_requires_capability() {
        let device = SenseDevice::new(ScriptedFirmware::new(), DeviceProfile::predator_v4());
        assert!(matches!(
            device.lighting().animated_readout(),
            Err(SenseError::Unsupported(_))
        ));
    }
}

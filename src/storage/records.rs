//! Fixed-size binary records persisted between runs.
//!
//! Power record (24 bytes): battery then AC, each
//! `{cpu_fan: i32, gpu_fan: i32, thermal_profile: i32}` little-endian, the
//! profile as its firmware wire value.
//!
//! Keyboard record (44 bytes):
//! `{per_zone, mode, speed, brightness, direction, r, g, b}` as bytes, four
//! zone colors as `u64` `0xRRGGBB`, then the zone brightness as `i32`.

use byteorder::{ByteOrder, LittleEndian};

use crate::cooling::{FanSpeedPair, MAX_FAN_PERCENT};
use crate::error::{Result, SenseError};
use crate::lighting::{AnimatedReadout, KeyboardView, MAX_BRIGHTNESS, PerZoneSettings, Rgb};
use crate::power::{PowerStateSnapshot, PowerStates};
use crate::thermal::ThermalProfile;

/// Blob key of the power-state record.
pub const POWER_STATES_KEY: &str = "power_states.bin";
/// Blob key of the keyboard record.
pub const KEYBOARD_STATE_KEY: &str = "kb_state.bin";

pub const POWER_RECORD_LENGTH: usize = 24;
pub const KEYBOARD_RECORD_LENGTH: usize = 44;

const SNAPSHOT_LENGTH: usize = 12;
const ZONES_OFFSET: usize = 8;
const ZONE_BRIGHTNESS_OFFSET: usize = 40;

fn check_length(buf: &[u8], expected: usize, what: &str) -> Result<()> {
    if buf.len() != expected {
        return Err(SenseError::protocol(format!(
            "{} record has {} bytes, expected {}",
            what,
            buf.len(),
            expected
        )));
    }
    Ok(())
}

// =============================================================================
// Power States
// =============================================================================

pub fn encode_power_record(states: &PowerStates) -> [u8; POWER_RECORD_LENGTH] {
    let mut buf = [0u8; POWER_RECORD_LENGTH];
    for (chunk, snapshot) in buf
        .chunks_exact_mut(SNAPSHOT_LENGTH)
        .zip([&states.battery, &states.ac])
    {
        LittleEndian::write_i32(&mut chunk[0..4], i32::from(snapshot.fans.cpu));
        LittleEndian::write_i32(&mut chunk[4..8], i32::from(snapshot.fans.gpu));
        LittleEndian::write_i32(&mut chunk[8..12], i32::from(snapshot.profile.wire()));
    }
    buf
}

fn decode_snapshot(chunk: &[u8]) -> Result<PowerStateSnapshot> {
    let fan = |raw: i32| {
        u8::try_from(raw)
            .ok()
            .filter(|v| *v <= MAX_FAN_PERCENT)
            .ok_or_else(|| SenseError::protocol(format!("Stored fan speed {} out of range", raw)))
    };
    let cpu = fan(LittleEndian::read_i32(&chunk[0..4]))?;
    let gpu = fan(LittleEndian::read_i32(&chunk[4..8]))?;

    let raw_profile = LittleEndian::read_i32(&chunk[8..12]);
    let profile = u8::try_from(raw_profile)
        .ok()
        .and_then(ThermalProfile::from_wire)
        .ok_or_else(|| {
            SenseError::protocol(format!("Stored thermal profile {} is unknown", raw_profile))
        })?;

    Ok(PowerStateSnapshot {
        fans: FanSpeedPair { cpu, gpu },
        profile,
    })
}

pub fn decode_power_record(buf: &[u8]) -> Result<PowerStates> {
    check_length(buf, POWER_RECORD_LENGTH, "Power state")?;
    Ok(PowerStates {
        battery: decode_snapshot(&buf[..SNAPSHOT_LENGTH])?,
        ac: decode_snapshot(&buf[SNAPSHOT_LENGTH..])?,
    })
}

// =============================================================================
// Keyboard
// =============================================================================

pub fn encode_keyboard_record(view: &KeyboardView) -> [u8; KEYBOARD_RECORD_LENGTH] {
    let mut buf = [0u8; KEYBOARD_RECORD_LENGTH];
    let animated = &view.animated;
    buf[..ZONES_OFFSET].copy_from_slice(&[
        u8::from(view.per_zone),
        animated.effect,
        animated.speed,
        animated.brightness,
        animated.direction,
        animated.color.r,
        animated.color.g,
        animated.color.b,
    ]);
    for (chunk, color) in buf[ZONES_OFFSET..ZONE_BRIGHTNESS_OFFSET]
        .chunks_exact_mut(8)
        .zip(view.zones.colors)
    {
        LittleEndian::write_u64(chunk, u64::from(color.to_u32()));
    }
    LittleEndian::write_i32(
        &mut buf[ZONE_BRIGHTNESS_OFFSET..],
        i32::from(view.zones.brightness),
    );
    buf
}

pub fn decode_keyboard_record(buf: &[u8]) -> Result<KeyboardView> {
    check_length(buf, KEYBOARD_RECORD_LENGTH, "Keyboard state")?;

    let animated = AnimatedReadout {
        effect: buf[1],
        speed: buf[2],
        brightness: buf[3],
        direction: buf[4],
        color: Rgb::new(buf[5], buf[6], buf[7]),
    };

    let mut zones = PerZoneSettings::default();
    for (slot, chunk) in zones
        .colors
        .iter_mut()
        .zip(buf[ZONES_OFFSET..ZONE_BRIGHTNESS_OFFSET].chunks_exact(8))
    {
        *slot = Rgb::from_u32(LittleEndian::read_u64(chunk) as u32);
    }

    let brightness = LittleEndian::read_i32(&buf[ZONE_BRIGHTNESS_OFFSET..]);
    zones.brightness = u8::try_from(brightness)
        .ok()
        .filter(|b| *b <= MAX_BRIGHTNESS)
        .ok_or_else(|| {
            SenseError::protocol(format!("Stored zone brightness {} out of range", brightness))
        })?;

    Ok(KeyboardView {
        per_zone: buf[0] != 0,
        animated,
        zones,
    })
}

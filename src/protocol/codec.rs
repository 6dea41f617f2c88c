//! Stateless packing and unpacking of firmware wire formats.
//!
//! Bit layouts are expressed as [`BitField`] accessors so every shift and mask
//! used by the protocol is declared once here. Decoders never fail: they are
//! pure bit extraction, and callers decide what a status byte means.

use crate::protocol::commands::{
    FAN_BEHAVIOR_CPU_BIT, FAN_BEHAVIOR_CPU_MODE_SHIFT, FAN_BEHAVIOR_GPU_BIT,
    FAN_BEHAVIOR_GPU_MODE_SHIFT, KB_FRAME_LENGTH, KB_FRAME_TAIL, LIGHTBAR_GATE_SELECT,
    LOGO_SELECT, SYS_INFO_SENSOR_READING,
};

// =============================================================================
// Bit Fields
// =============================================================================

/// A contiguous bit range inside a 64-bit firmware word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    pub shift: u32,
    pub width: u32,
}

impl BitField {
    pub const fn new(shift: u32, width: u32) -> Self {
        Self { shift, width }
    }

    /// Unshifted mask covering `width` bits.
    pub const fn mask(&self) -> u64 {
        if self.width >= 64 {
            u64::MAX
        } else {
            (1u64 << self.width) - 1
        }
    }

    /// Extract the field from `word`.
    pub const fn get(&self, word: u64) -> u64 {
        (word >> self.shift) & self.mask()
    }

    /// Place `value` into the field position, truncating to the field width.
    pub const fn prep(&self, value: u64) -> u64 {
        (value & self.mask()) << self.shift
    }
}

/// Misc setting request: setting index.
pub const MISC_SETTING_INDEX: BitField = BitField::new(0, 8);
/// Misc setting request and response: setting value.
pub const MISC_SETTING_VALUE: BitField = BitField::new(8, 8);
/// Misc setting response: status byte.
pub const MISC_SETTING_STATUS: BitField = BitField::new(0, 8);

/// Sys-info response: status byte.
pub const SENSOR_STATUS: BitField = BitField::new(0, 8);
/// Sys-info request: sensor id.
pub const SENSOR_INDEX: BitField = BitField::new(8, 8);
/// Sys-info response: reading. Overlaps the index field.
pub const SENSOR_READING: BitField = BitField::new(8, 16);
/// Sys-info response to the supported-sensors query.
pub const SENSOR_SUPPORTED: BitField = BitField::new(24, 16);

/// Raw fan speed byte inside a fan speed word.
pub const FAN_RAW_SPEED: BitField = BitField::new(8, 8);

const FAN_CPU_MODE: BitField = BitField::new(FAN_BEHAVIOR_CPU_MODE_SHIFT, 2);
const FAN_GPU_MODE: BitField = BitField::new(FAN_BEHAVIOR_GPU_MODE_SHIFT, 2);

// =============================================================================
// Misc Settings
// =============================================================================

/// Pack a misc setting index and value into a request word.
pub const fn encode_misc_setting(index: u8, value: u8) -> u64 {
    MISC_SETTING_INDEX.prep(index as u64) | MISC_SETTING_VALUE.prep(value as u64)
}

/// Unpack a misc setting response word into `(status, value)`.
pub const fn decode_misc_setting(word: u64) -> (u8, u8) {
    (
        MISC_SETTING_STATUS.get(word) as u8,
        MISC_SETTING_VALUE.get(word) as u8,
    )
}

// =============================================================================
// Sensors
// =============================================================================

/// All fields a sys-info response word can carry.
///
/// `supported_mask` is only meaningful for the supported-sensors query and
/// `sensor_index` overlaps the low byte of `reading`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorWord {
    pub status: u8,
    pub sensor_index: u8,
    pub reading: u16,
    pub supported_mask: u16,
}

/// Split a sys-info response word into its bit fields.
pub const fn decode_sensor_reading(word: u64) -> SensorWord {
    SensorWord {
        status: SENSOR_STATUS.get(word) as u8,
        sensor_index: SENSOR_INDEX.get(word) as u8,
        reading: SENSOR_READING.get(word) as u16,
        supported_mask: SENSOR_SUPPORTED.get(word) as u16,
    }
}

/// Build the sys-info request word reading sensor `sensor_id`.
pub const fn encode_sensor_query(sensor_id: u8) -> u64 {
    SYS_INFO_SENSOR_READING | SENSOR_INDEX.prep(sensor_id as u64)
}

// =============================================================================
// Fans
// =============================================================================

/// Scale a percentage to the raw high-byte field and route it with `channel_index`.
///
/// # Arguments
/// * `percent` - Fan speed, 0-100 (not validated here)
/// * `channel_index` - Low-byte routing index (CPU 1, GPU 4)
pub const fn encode_fan_percentage(percent: u8, channel_index: u64) -> u64 {
    ((percent as u64 * 25600 / 100) & 0xFF00) | channel_index
}

/// Recover the percentage from a fan speed word.
pub const fn decode_fan_percentage(word: u64) -> u8 {
    FAN_RAW_SPEED.get(word) as u8
}

/// Per-fan behavior mode as understood by the fan behavior command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanMode {
    Auto,
    Max,
    Custom,
}

impl FanMode {
    pub const fn wire(self) -> u64 {
        match self {
            FanMode::Auto => 1,
            FanMode::Max => 2,
            FanMode::Custom => 3,
        }
    }
}

/// Build a fan behavior word addressing both fans.
pub const fn encode_fan_behavior(cpu: FanMode, gpu: FanMode) -> u64 {
    FAN_BEHAVIOR_CPU_BIT
        | FAN_BEHAVIOR_GPU_BIT
        | FAN_CPU_MODE.prep(cpu.wire())
        | FAN_GPU_MODE.prep(gpu.wire())
}

/// Build the legacy whole-system fan behavior word used by the turbo button.
///
/// Layout depends on how many CPU and GPU fans the model has.
pub fn encode_legacy_fan_mode(mode: FanMode, cpu_fans: u8, gpu_fans: u8) -> u64 {
    let mode = mode.wire();
    let total = u32::from(cpu_fans) + u32::from(gpu_fans);
    let mut bitmap: u64 = 0;
    let mut modes: u64 = 0;

    if cpu_fans > 0 {
        bitmap |= 1;
        modes |= mode;
    }
    for i in 0..total {
        bitmap |= 1 << (i + 1);
        modes |= mode << (2 * i + 2);
    }
    for i in 0..u32::from(gpu_fans) {
        bitmap |= 1 << (i + 3);
        modes |= mode << (2 * i + 6);
    }

    bitmap | (modes << 16)
}

// =============================================================================
// Keyboard and Lightbar Frames
// =============================================================================

/// Build the 16-byte animated keyboard frame.
///
/// Fields are written as given; per-effect normalization happens in the
/// lighting engine before this is called.
pub fn build_keyboard_frame(
    effect: u8,
    speed: u8,
    brightness: u8,
    direction: u8,
    rgb: [u8; 3],
) -> [u8; KB_FRAME_LENGTH] {
    let mut frame = [0u8; KB_FRAME_LENGTH];
    frame[0] = effect;
    frame[1] = speed;
    frame[2] = brightness;
    frame[4] = direction;
    frame[5..8].copy_from_slice(&rgb);
    frame[8..10].copy_from_slice(&KB_FRAME_TAIL);
    frame
}

/// Frame that wakes the keyboard lighting engine.
pub fn build_wake_frame() -> [u8; KB_FRAME_LENGTH] {
    let mut frame = [0u8; KB_FRAME_LENGTH];
    frame[0] = 1;
    frame
}

/// Build the 8-byte per-zone color write.
pub const fn build_zone_payload(zone_mask: u8, rgb: [u8; 3]) -> [u8; 8] {
    [zone_mask, rgb[0], rgb[1], rgb[2], 0, 0, 0, 0]
}

/// Build the lightbar color write: `[select, r, g, b, brightness, enable]`.
pub const fn build_logo_payload(rgb: [u8; 3], brightness: u8, enabled: bool) -> [u8; 6] {
    [LOGO_SELECT, rgb[0], rgb[1], rgb[2], brightness, enabled as u8]
}

/// Build the unified frame that gates the lightbar on or off.
pub fn build_lightbar_gate_frame(enabled: bool) -> [u8; KB_FRAME_LENGTH] {
    let mut frame = [0u8; KB_FRAME_LENGTH];
    frame[0] = enabled as u8;
    frame[9] = LIGHTBAR_GATE_SELECT;
    frame
}

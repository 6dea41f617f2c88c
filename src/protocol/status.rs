//! Response parsing for structured firmware replies.
//!
//! Parses fixed-size response buffers into typed readouts. Every parser
//! checks the exact expected length before reinterpreting bytes.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Result, SenseError};
use crate::protocol::commands::{
    BATTERY_ACK_LENGTH, BATTERY_STATUS_LENGTH, KB_FRAME_LENGTH, LOGO_READOUT_MIN_LENGTH,
};

// =============================================================================
// Integer Replies
// =============================================================================

/// Interpret a reply as a little-endian integer.
///
/// # Arguments
/// * `buf` - Reply buffer, exactly 4 or 8 bytes
///
/// # Errors
/// Returns `Protocol` for any other length.
pub fn parse_word(buf: &[u8]) -> Result<u64> {
    match buf.len() {
        4 => Ok(u64::from(LittleEndian::read_u32(buf))),
        8 => Ok(LittleEndian::read_u64(buf)),
        n => Err(SenseError::protocol(format!(
            "Integer reply has {} bytes, expected 4 or 8",
            n
        ))),
    }
}

// =============================================================================
// Keyboard Readouts
// =============================================================================

/// Offsets into the 15 payload bytes of a unified readout.
const OUT_EFFECT: usize = 0;
const OUT_SPEED: usize = 1;
const OUT_BRIGHTNESS: usize = 2;
const OUT_DIRECTION: usize = 4;
const OUT_RGB: usize = 5;

/// Unified 16-byte keyboard/lightbar readout: `[status, output[15]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnifiedReadout {
    pub status: u8,
    pub output: [u8; KB_FRAME_LENGTH - 1],
}

impl UnifiedReadout {
    /// Parse a unified readout.
    ///
    /// # Arguments
    /// * `buf` - Reply buffer, exactly 16 bytes
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() != KB_FRAME_LENGTH {
            return Err(SenseError::protocol(format!(
                "Keyboard readout has {} bytes, expected {}",
                buf.len(),
                KB_FRAME_LENGTH
            )));
        }
        let mut output = [0u8; KB_FRAME_LENGTH - 1];
        output.copy_from_slice(&buf[1..]);
        Ok(Self {
            status: buf[0],
            output,
        })
    }

    /// Effect id for the keyboard, enable flag for the lightbar.
    pub fn effect(&self) -> u8 {
        self.output[OUT_EFFECT]
    }

    pub fn speed(&self) -> u8 {
        self.output[OUT_SPEED]
    }

    pub fn brightness(&self) -> u8 {
        self.output[OUT_BRIGHTNESS]
    }

    pub fn direction(&self) -> u8 {
        self.output[OUT_DIRECTION]
    }

    pub fn rgb(&self) -> [u8; 3] {
        [
            self.output[OUT_RGB],
            self.output[OUT_RGB + 1],
            self.output[OUT_RGB + 2],
        ]
    }
}

/// Dedicated lightbar color readout: `[status, r, g, b, brightness, enable]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoReadout {
    pub status: u8,
    pub rgb: [u8; 3],
    pub brightness: u8,
    pub enabled: bool,
}

impl LogoReadout {
    /// Parse a dedicated lightbar readout. Trailing bytes are ignored.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < LOGO_READOUT_MIN_LENGTH {
            return Err(SenseError::protocol(format!(
                "Lightbar readout has {} bytes, expected at least {}",
                buf.len(),
                LOGO_READOUT_MIN_LENGTH
            )));
        }
        Ok(Self {
            status: buf[0],
            rgb: [buf[1], buf[2], buf[3]],
            brightness: buf[4],
            enabled: buf[5] != 0,
        })
    }
}

/// Split a single-zone color reply word into `(status, rgb)`.
///
/// The reply is `[status, r, g, b, ...]` in memory order.
pub fn parse_zone_color(word: u64) -> (u8, [u8; 3]) {
    let bytes = word.to_le_bytes();
    (bytes[0], [bytes[1], bytes[2], bytes[3]])
}

// =============================================================================
// Battery Health
// =============================================================================

/// Battery health query reply: `[function_list, return[2], status[5]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryHealthStatus {
    pub function_list: u8,
    pub return_code: [u8; 2],
    pub function_status: [u8; 5],
}

impl BatteryHealthStatus {
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() != BATTERY_STATUS_LENGTH {
            return Err(SenseError::protocol(format!(
                "Battery health status has {} bytes, expected {}",
                buf.len(),
                BATTERY_STATUS_LENGTH
            )));
        }
        let mut function_status = [0u8; 5];
        function_status.copy_from_slice(&buf[3..8]);
        Ok(Self {
            function_list: buf[0],
            return_code: [buf[1], buf[2]],
            function_status,
        })
    }

    /// 80% charge limiter state.
    pub fn charge_limit(&self) -> bool {
        self.function_status[0] != 0
    }

    /// Calibration mode state.
    pub fn calibration(&self) -> bool {
        self.function_status[1] != 0
    }
}

/// Battery health set reply: `[return, reserved, ...]`, exactly 4 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryHealthAck {
    pub return_code: u8,
    pub reserved: u8,
}

impl BatteryHealthAck {
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() != BATTERY_ACK_LENGTH {
            return Err(SenseError::protocol(format!(
                "Battery health acknowledgement has {} bytes, expected {}",
                buf.len(),
                BATTERY_ACK_LENGTH
            )));
        }
        Ok(Self {
            return_code: buf[0],
            reserved: buf[1],
        })
    }

    pub fn is_success(&self) -> bool {
        self.return_code == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_word_lengths() {
        assert_eq!(parse_word(&[0x01, 0x02, 0, 0]).unwrap(), 0x0201);
        assert_eq!(parse_word(&0x1122_3344_5566_7788u64.to_le_bytes()).unwrap(), 0x1122_3344_5566_7788);
        assert!(matches!(parse_word(&[1, 2]), Err(SenseError::Protocol { .. })));
        assert!(parse_word(&[]).is_err());
    }

    #[test]
    fn test_unified_readout() {
        let mut buf = [0u8; 16];
        buf[0] = 0;
        buf[1] = 3; // wave
        buf[2] = 5;
        buf[3] = 80;
        buf[5] = 2;
        buf[6..9].copy_from_slice(&[10, 20, 30]);

        let readout = UnifiedReadout::parse(&buf).unwrap();
        assert_eq!(readout.effect(), 3);
        assert_eq!(readout.speed(), 5);
        assert_eq!(readout.brightness(), 80);
        assert_eq!(readout.direction(), 2);
        assert_eq!(readout.rgb(), [10, 20, 30]);

        assert!(UnifiedReadout::parse(&buf[..15]).is_err());
    }

    #[test]
    fn test_logo_readout_accepts_longer_buffers() {
        let readout = LogoReadout::parse(&[0, 255, 0, 128, 40, 1, 0, 0]).unwrap();
        assert_eq!(readout.rgb, [255, 0, 128]);
        assert_eq!(readout.brightness, 40);
        assert!(readout.enabled);
        assert!(LogoReadout::parse(&[0, 1, 2, 3, 4]).is_err());
    }

    #[test]
    fn test_zone_color_word() {
        let word = u64::from_le_bytes([0, 0xAA, 0xBB, 0xCC, 0, 0, 0, 0]);
        assert_eq!(parse_zone_color(word), (0, [0xAA, 0xBB, 0xCC]));
    }

    #[test]
    fn test_battery_status() {
        let status = BatteryHealthStatus::parse(&[3, 0, 0, 1, 0, 0, 0, 0]).unwrap();
        assert!(status.charge_limit());
        assert!(!status.calibration());
        assert!(BatteryHealthStatus::parse(&[0; 4]).is_err());

        let ack = BatteryHealthAck::parse(&[0, 0, 0, 0]).unwrap();
        assert!(ack.is_success());
        assert!(!BatteryHealthAck::parse(&[1, 0, 0, 0]).unwrap().is_success());
        assert!(BatteryHealthAck::parse(&[0; 8]).is_err());
    }
}

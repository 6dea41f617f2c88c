//! Userspace firmware transport through the `acpi_call` kernel module.
//!
//! Each request is written to `/proc/acpi/call` as
//! `<method path> 0x0 <method id> b<hex input>` and the reply is read back
//! from the same file. ACPI object paths differ between models and are
//! configurable; the defaults match PHN16-72 class machines and are
//! provisional elsewhere.

use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{FirmwareChannel, TransportError};
use crate::protocol::ChannelId;

/// Default location of the `acpi_call` control file.
pub const DEFAULT_ACPI_CALL_PATH: &str = "/proc/acpi/call";

/// ACPI method paths backing each callable channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcpiPaths {
    pub action: String,
    pub gaming: String,
    pub battery_health: String,
}

impl Default for AcpiPaths {
    fn default() -> Self {
        Self {
            action: "\\_SB.PC00.WMID.WMBD".to_string(),
            gaming: "\\_SB.PC00.WMID.WMBH".to_string(),
            battery_health: "\\_SB.PC00.WMID.WMBE".to_string(),
        }
    }
}

impl AcpiPaths {
    pub fn method_path(&self, channel: ChannelId) -> &str {
        match channel {
            ChannelId::Action => &self.action,
            ChannelId::Gaming => &self.gaming,
            ChannelId::BatteryHealth => &self.battery_health,
        }
    }
}

/// [`FirmwareChannel`] backed by `/proc/acpi/call`.
pub struct AcpiCallChannel {
    call_path: PathBuf,
    paths: AcpiPaths,
    // The control file holds a single pending result.
    io: Mutex<()>,
}

impl AcpiCallChannel {
    /// Create a channel using the default control file.
    pub fn new(paths: AcpiPaths) -> Self {
        Self::with_call_path(DEFAULT_ACPI_CALL_PATH, paths)
    }

    pub fn with_call_path(call_path: impl Into<PathBuf>, paths: AcpiPaths) -> Self {
        Self {
            call_path: call_path.into(),
            paths,
            io: Mutex::new(()),
        }
    }

    /// Whether the `acpi_call` control file exists.
    pub fn is_available(&self) -> bool {
        self.call_path.exists()
    }

    pub fn call_path(&self) -> &Path {
        &self.call_path
    }

    fn exchange(&self, request: &str) -> std::io::Result<String> {
        let _guard = self.io.lock();

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.call_path)?;
        file.write_all(request.as_bytes())?;

        let mut reply = String::new();
        OpenOptions::new()
            .read(true)
            .open(&self.call_path)?
            .read_to_string(&mut reply)?;
        Ok(reply)
    }
}

impl FirmwareChannel for AcpiCallChannel {
    fn call(
        &self,
        channel: ChannelId,
        method_id: u32,
        input: &[u8],
    ) -> Result<Vec<u8>, TransportError> {
        let request = format_request(self.paths.method_path(channel), method_id, input);
        debug!("acpi_call: {}", request);

        let reply = self.exchange(&request).map_err(|e| {
            warn!("acpi_call I/O on {} failed: {}", self.call_path.display(), e);
            TransportError::new(format!("{}: {}", self.call_path.display(), e))
        })?;

        parse_reply(&reply)
    }
}

/// Format an `acpi_call` request invoking a WMI method.
pub fn format_request(method_path: &str, method_id: u32, input: &[u8]) -> String {
    let hex: String = input.iter().map(|b| format!("{:02x}", b)).collect();
    format!("{} 0x0 {:#x} b{}", method_path, method_id, hex)
}

/// Parse an `acpi_call` reply into raw bytes.
///
/// Integers become 8 little-endian bytes, buffers keep their bytes.
pub fn parse_reply(reply: &str) -> Result<Vec<u8>, TransportError> {
    let reply = reply.trim_matches(|c: char| c == '\0' || c.is_whitespace());

    if reply.is_empty() {
        return Err(TransportError::new("empty acpi_call reply"));
    }
    if reply.starts_with("Error") || reply.starts_with("not called") {
        return Err(TransportError::new(reply.to_string()));
    }

    if let Some(body) = reply.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
        return body
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| {
                parse_hex(t)
                    .and_then(|v| u8::try_from(v).ok())
                    .ok_or_else(|| TransportError::new(format!("bad buffer byte '{}'", t)))
            })
            .collect();
    }

    if let Some(body) = reply.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        return Ok(body.as_bytes().to_vec());
    }

    parse_hex(reply)
        .map(|v| v.to_le_bytes().to_vec())
        .ok_or_else(|| TransportError::new(format!("unrecognised acpi_call reply '{}'", reply)))
}

fn parse_hex(token: &str) -> Option<u64> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))?;
    u64::from_str_radix(digits, 16).ok()
}

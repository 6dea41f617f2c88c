//! Firmware channel abstraction.
//!
//! [`FirmwareChannel`] is the single primitive the rest of the crate needs:
//! send a method id and an input buffer on a channel, get a buffer back.
//! [`Firmware`] layers typed helpers on top of it (integer replies, misc
//! settings, sys-info words) and turns transport failures into
//! [`SenseError::Transport`].

mod acpi_call;
mod scripted;

pub use acpi_call::{AcpiCallChannel, AcpiPaths, DEFAULT_ACPI_CALL_PATH};
pub use scripted::{RecordedCall, Reply, ScriptedFirmware};

use std::sync::Arc;

use log::{debug, error};
use thiserror::Error;

use crate::error::{Result, SenseError};
use crate::protocol::{
    ChannelId, Command, MiscSetting, SENSOR_STATUS, decode_misc_setting, encode_misc_setting,
    parse_word,
};

/// A firmware RPC failed or the channel is unreachable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Raw firmware RPC transport.
///
/// Implementations must be callable from both the command path and the
/// notification path at the same time.
pub trait FirmwareChannel: Send + Sync {
    /// Invoke `method_id` on `channel` with `input`, returning the reply buffer.
    ///
    /// Integer replies are returned as their little-endian bytes.
    fn call(
        &self,
        channel: ChannelId,
        method_id: u32,
        input: &[u8],
    ) -> std::result::Result<Vec<u8>, TransportError>;
}

impl<T: FirmwareChannel + ?Sized> FirmwareChannel for Arc<T> {
    fn call(
        &self,
        channel: ChannelId,
        method_id: u32,
        input: &[u8],
    ) -> std::result::Result<Vec<u8>, TransportError> {
        (**self).call(channel, method_id, input)
    }
}

/// Typed view over a [`FirmwareChannel`].
pub struct Firmware<C> {
    channel: C,
}

impl<C: FirmwareChannel> Firmware<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    /// Access the underlying transport.
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Issue `command` with a raw input buffer and return the raw reply.
    pub fn invoke(&self, command: Command, input: &[u8]) -> Result<Vec<u8>> {
        let (channel, method) = command.route();
        debug!(
            "{} -> {} channel method {} input {:02x?}",
            command.name(),
            channel,
            method,
            input
        );
        let reply = self
            .channel
            .call(channel, method, input)
            .map_err(|source| SenseError::Transport {
                channel,
                method,
                source,
            })?;
        debug!("{} <- {:02x?}", command.name(), reply);
        Ok(reply)
    }

    /// Issue `command` and discard the reply.
    pub fn send(&self, command: Command, input: &[u8]) -> Result<()> {
        self.invoke(command, input).map(|_| ())
    }

    /// Issue `command` with a 64-bit input word and discard the reply.
    pub fn send_u64(&self, command: Command, value: u64) -> Result<()> {
        self.send(command, &value.to_le_bytes())
    }

    /// Issue `command` with a 64-bit input word and read an integer reply.
    pub fn query_u64(&self, command: Command, value: u64) -> Result<u64> {
        let reply = self.invoke(command, &value.to_le_bytes())?;
        parse_word(&reply).inspect_err(|e| error!("{}: {}", command.name(), e))
    }

    /// Read a misc setting value.
    ///
    /// # Errors
    /// Returns `CommandRejected` if the response status byte is non-zero.
    pub fn get_misc_setting(&self, setting: MiscSetting) -> Result<u8> {
        let input = encode_misc_setting(setting.index(), 0) as u32;
        let reply = self.invoke(Command::GetMiscSetting, &input.to_le_bytes())?;
        let word = parse_word(&reply)
            .inspect_err(|e| error!("{}: {}", Command::GetMiscSetting.name(), e))?;

        let (status, value) = decode_misc_setting(word);
        if status != 0 {
            return Err(SenseError::CommandRejected {
                operation: Command::GetMiscSetting.name(),
                status: u64::from(status),
            });
        }
        Ok(value)
    }

    /// Write a misc setting value.
    ///
    /// # Errors
    /// Returns `CommandRejected` if the response status byte is non-zero.
    pub fn set_misc_setting(&self, setting: MiscSetting, value: u8) -> Result<()> {
        let word = self.query_u64(
            Command::SetMiscSetting,
            encode_misc_setting(setting.index(), value),
        )?;

        let (status, _) = decode_misc_setting(word);
        if status != 0 {
            return Err(SenseError::CommandRejected {
                operation: Command::SetMiscSetting.name(),
                status: u64::from(status),
            });
        }
        Ok(())
    }

    /// Run a sys-info command and return the full response word.
    ///
    /// # Errors
    /// Returns `CommandRejected` if the response status byte is non-zero.
    pub fn sys_info(&self, command: u64) -> Result<u64> {
        let word = self.query_u64(Command::GetSysInfo, command)?;
        let status = SENSOR_STATUS.get(word);
        if status != 0 {
            return Err(SenseError::CommandRejected {
                operation: Command::GetSysInfo.name(),
                status,
            });
        }
        Ok(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_failure_carries_route() {
        let script = ScriptedFirmware::new();
        script.respond(Command::SetFanSpeed, Reply::fail("bus error"));
        let firmware = Firmware::new(script);

        match firmware.send_u64(Command::SetFanSpeed, 0x3201) {
            Err(SenseError::Transport {
                channel, method, ..
            }) => {
                assert_eq!(channel, ChannelId::Gaming);
                assert_eq!(method, 16);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_get_misc_setting_sends_u32_and_checks_status() {
        let script = ScriptedFirmware::new();
        script.respond(Command::GetMiscSetting, Reply::word(0x0400));
        let firmware = Firmware::new(script);

        assert_eq!(
            firmware.get_misc_setting(MiscSetting::PlatformProfile).unwrap(),
            4
        );
        let calls = firmware.channel().calls();
        assert_eq!(calls[0].input, vec![0x0B, 0, 0, 0]);

        firmware
            .channel()
            .respond(Command::GetMiscSetting, Reply::word(0x0401));
        assert!(matches!(
            firmware.get_misc_setting(MiscSetting::PlatformProfile),
            Err(SenseError::CommandRejected { status: 1, .. })
        ));
    }

    #[test]
    fn test_set_misc_setting_packs_index_and_value() {
        let firmware = Firmware::new(ScriptedFirmware::new());
        firmware
            .set_misc_setting(MiscSetting::PlatformProfile, 0x06)
            .unwrap();

        let calls = firmware.channel().calls();
        assert_eq!(calls[0].command(), Some(Command::SetMiscSetting));
        assert_eq!(calls[0].input_word(), Some(0x060B));
    }

    #[test]
    fn test_query_rejects_odd_lengths() {
        let script = ScriptedFirmware::new();
        script.respond(Command::GetGamingLed, Reply::bytes(vec![1, 2, 3]));
        let firmware = Firmware::new(script);

        assert!(matches!(
            firmware.query_u64(Command::GetGamingLed, 1),
            Err(SenseError::Protocol { .. })
        ));
    }

    #[test]
    fn test_sys_info_status() {
        let script = ScriptedFirmware::new();
        script.respond(Command::GetSysInfo, Reply::word(0x0000_2D00 | 0x03));
        let firmware = Firmware::new(script);
        assert!(matches!(
            firmware.sys_info(0x0101),
            Err(SenseError::CommandRejected { status: 3, .. })
        ));
    }
}

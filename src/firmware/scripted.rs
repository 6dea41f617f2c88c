//! Scripted in-memory firmware for tests and dry runs.
//!
//! Records every call it receives and answers from a script. Unscripted
//! calls succeed with an 8-byte zero word.

use std::collections::{HashMap, VecDeque};

use byteorder::{ByteOrder, LittleEndian};
use parking_lot::Mutex;

use super::{FirmwareChannel, TransportError};
use crate::protocol::{ChannelId, Command};

/// Scripted answer to a firmware call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Bytes(Vec<u8>),
    Fail(String),
}

impl Reply {
    /// 64-bit integer reply.
    pub fn word(value: u64) -> Self {
        Reply::Bytes(value.to_le_bytes().to_vec())
    }

    /// Raw buffer reply.
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Reply::Bytes(bytes.into())
    }

    /// Transport failure.
    pub fn fail(message: impl Into<String>) -> Self {
        Reply::Fail(message.into())
    }
}

/// One call observed by [`ScriptedFirmware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub channel: ChannelId,
    pub method: u32,
    pub input: Vec<u8>,
}

impl RecordedCall {
    pub fn command(&self) -> Option<Command> {
        Command::from_route(self.channel, self.method)
    }

    pub fn is(&self, command: Command) -> bool {
        (self.channel, self.method) == command.route()
    }

    /// Input interpreted as a 4- or 8-byte little-endian integer.
    pub fn input_word(&self) -> Option<u64> {
        match self.input.len() {
            4 => Some(u64::from(LittleEndian::read_u32(&self.input))),
            8 => Some(LittleEndian::read_u64(&self.input)),
            _ => None,
        }
    }
}

type Route = (ChannelId, u32);

#[derive(Default)]
struct Script {
    calls: Vec<RecordedCall>,
    once: VecDeque<(Route, Option<Vec<u8>>, Reply)>,
    by_input: HashMap<(Route, Vec<u8>), Reply>,
    by_route: HashMap<Route, Reply>,
}

impl Script {
    fn answer(&mut self, route: Route, input: &[u8]) -> Reply {
        let queued = self.once.iter().position(|(r, expected, _)| {
            *r == route && expected.as_deref().is_none_or(|e| e == input)
        });
        if let Some(reply) = queued.and_then(|pos| self.once.remove(pos)) {
            return reply.2;
        }
        if let Some(reply) = self.by_input.get(&(route, input.to_vec())) {
            return reply.clone();
        }
        if let Some(reply) = self.by_route.get(&route) {
            return reply.clone();
        }
        Reply::word(0)
    }
}

/// [`FirmwareChannel`] answering from a script and recording all traffic.
#[derive(Default)]
pub struct ScriptedFirmware {
    script: Mutex<Script>,
}

impl ScriptedFirmware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call to `command` with `reply`.
    pub fn respond(&self, command: Command, reply: Reply) {
        self.script.lock().by_route.insert(command.route(), reply);
    }

    /// Answer calls to `command` whose input equals `input` with `reply`.
    pub fn respond_to(&self, command: Command, input: impl Into<Vec<u8>>, reply: Reply) {
        self.script
            .lock()
            .by_input
            .insert((command.route(), input.into()), reply);
    }

    /// Answer calls to `command` with a 64-bit input `word` with `reply`.
    pub fn respond_to_word(&self, command: Command, word: u64, reply: Reply) {
        self.respond_to(command, word.to_le_bytes().to_vec(), reply);
    }

    /// Answer the next call to `command` with `reply`, then fall back.
    pub fn respond_once(&self, command: Command, reply: Reply) {
        self.script
            .lock()
            .once
            .push_back((command.route(), None, reply));
    }

    /// All calls received so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.script.lock().calls.clone()
    }

    /// Calls received for `command`, in order.
    pub fn calls_to(&self, command: Command) -> Vec<RecordedCall> {
        self.script
            .lock()
            .calls
            .iter()
            .filter(|c| c.is(command))
            .cloned()
            .collect()
    }

    /// Calls that change firmware state, in order.
    pub fn writes(&self) -> Vec<RecordedCall> {
        self.script
            .lock()
            .calls
            .iter()
            .filter(|c| c.command().is_some_and(Command::is_write))
            .cloned()
            .collect()
    }

    /// Forget recorded calls. The script is kept.
    pub fn clear_calls(&self) {
        self.script.lock().calls.clear();
    }
}

impl FirmwareChannel for ScriptedFirmware {
    fn call(
        &self,
        channel: ChannelId,
        method_id: u32,
        input: &[u8],
    ) -> std::result::Result<Vec<u8>, TransportError> {
        let mut script = self.script.lock();
        script.calls.push(RecordedCall {
            channel,
            method: method_id,
            input: input.to_vec(),
        });
        match script.answer((channel, method_id), input) {
            Reply::Bytes(bytes) => Ok(bytes),
            Reply::Fail(message) => Err(TransportError::new(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_precedence() {
        let firmware = ScriptedFirmware::new();
        firmware.respond(Command::GetGamingLed, Reply::word(1));
        firmware.respond_to_word(Command::GetGamingLed, 7, Reply::word(2));
        firmware.respond_once(Command::GetGamingLed, Reply::word(3));

        let (channel, method) = Command::GetGamingLed.route();
        let first = firmware.call(channel, method, &7u64.to_le_bytes()).unwrap();
        let second = firmware.call(channel, method, &7u64.to_le_bytes()).unwrap();
        let third = firmware.call(channel, method, &1u64.to_le_bytes()).unwrap();

        assert_eq!(first, 3u64.to_le_bytes().to_vec());
        assert_eq!(second, 2u64.to_le_bytes().to_vec());
        assert_eq!(third, 1u64.to_le_bytes().to_vec());
        assert_eq!(firmware.calls_to(Command::GetGamingLed).len(), 3);
    }

    #[test]
    fn test_unscripted_calls_return_zero_word() {
        let firmware = ScriptedFirmware::new();
        let (channel, method) = Command::SetFanBehavior.route();
        let reply = firmware.call(channel, method, &[0; 8]).unwrap();
        assert_eq!(reply, vec![0; 8]);
        assert_eq!(firmware.writes().len(), 1);
    }

    #[test]
    fn test_failures_are_recorded() {
        let firmware = ScriptedFirmware::new();
        firmware.respond(Command::SetRgbZone, Reply::fail("nope"));
        let (channel, method) = Command::SetRgbZone.route();
        assert!(firmware.call(channel, method, &[1]).is_err());
        assert_eq!(firmware.calls().len(), 1);
    }
}

//! Firmware notification handling.
//!
//! Firmware reports key presses and power changes as 8-byte frames. The
//! dispatcher decodes them and routes each event to the engine that owns it.
//! Dispatch never fails: malformed frames and handler errors are logged and
//! reported in the returned [`DispatchOutcome`].

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, error, info, warn};

use crate::device::SenseDevice;
use crate::error::{Result, SenseError};
use crate::firmware::FirmwareChannel;
use crate::power::PowerSource;
use crate::protocol::{
    EVENT_AC, EVENT_BATTERY_BOOST, EVENT_CALIBRATION, EVENT_HOTKEY, EVENT_TURBO_KEY, KEY_MODE,
    KEY_TURBO, NOTIFICATION_LENGTH,
};
use crate::settings::BatteryFunction;
use crate::thermal::ThermalProfile;

/// Raw notification frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    pub function: u8,
    pub key: u8,
    pub device_state: u16,
    pub dock_state: u8,
}

impl Notification {
    /// Parse a frame: `{function, key, device_state: u16, reserved: u16,
    /// dock_state, reserved}`.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() != NOTIFICATION_LENGTH {
            return Err(SenseError::protocol(format!(
                "Notification has {} bytes, expected {}",
                buf.len(),
                NOTIFICATION_LENGTH
            )));
        }
        Ok(Self {
            function: buf[0],
            key: buf[1],
            device_state: LittleEndian::read_u16(&buf[2..4]),
            dock_state: buf[6],
        })
    }

    pub fn event(&self) -> FirmwareEvent {
        match self.function {
            EVENT_TURBO_KEY => FirmwareEvent::TurboKey { key: self.key },
            EVENT_AC => FirmwareEvent::AcChanged { state: self.key },
            EVENT_CALIBRATION => FirmwareEvent::Calibration { flag: self.key },
            EVENT_HOTKEY => FirmwareEvent::Hotkey { key: self.key },
            EVENT_BATTERY_BOOST => FirmwareEvent::BatteryBoost,
            function => FirmwareEvent::Other {
                function,
                key: self.key,
            },
        }
    }
}

/// Decoded firmware event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareEvent {
    /// Turbo (4) or mode (5) key.
    TurboKey { key: u8 },
    /// Power source changed: 0 AC lost, 1 AC gained.
    AcChanged { state: u8 },
    /// Firmware requests a battery calibration mode change.
    Calibration { flag: u8 },
    Hotkey { key: u8 },
    BatteryBoost,
    Other { function: u8, key: u8 },
}

/// What dispatching a frame did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Frame could not be decoded.
    Malformed(String),
    /// Event not handled on this model.
    Ignored(FirmwareEvent),
    /// Legacy turbo toggled; holds the LED state before the toggle.
    TurboToggled { was_on: bool },
    ProfileChanged(ThermalProfile),
    /// Power-state snapshots switched to `to`.
    PowerSwitched { to: PowerSource },
    CalibrationForwarded { enabled: bool },
    /// The handler ran and failed.
    Failed(String),
}

/// Routes firmware notifications on a device.
pub struct EventDispatcher<'a, C: FirmwareChannel> {
    device: &'a SenseDevice<C>,
}

impl<'a, C: FirmwareChannel> EventDispatcher<'a, C> {
    pub(crate) fn new(device: &'a SenseDevice<C>) -> Self {
        Self { device }
    }

    /// Decode and handle one notification frame.
    pub fn dispatch(&self, frame: &[u8]) -> DispatchOutcome {
        let notification = match Notification::parse(frame) {
            Ok(n) => n,
            Err(e) => {
                warn!("Dropping notification {:02x?}: {}", frame, e);
                return DispatchOutcome::Malformed(e.to_string());
            }
        };

        let event = notification.event();
        debug!("Firmware event {:?}", event);
        match event {
            FirmwareEvent::TurboKey { key } => self.turbo_key(event, key),
            FirmwareEvent::AcChanged { state } => self.ac_changed(event, state),
            FirmwareEvent::Calibration { flag } => self.calibration(event, flag),
            _ => DispatchOutcome::Ignored(event),
        }
    }

    fn turbo_key(&self, event: FirmwareEvent, key: u8) -> DispatchOutcome {
        let profile = &self.device.profile;
        info!("Turbo button pressed ({})", key);

        if key == KEY_TURBO && !profile.nitro_v4 {
            if profile.turbo.is_none() {
                debug!("No turbo button fitted on {}", profile.name);
                return DispatchOutcome::Ignored(event);
            }
            return match self.device.thermal().toggle_turbo() {
                Ok(was_on) => DispatchOutcome::TurboToggled { was_on },
                Err(e) => failed("Turbo toggle", e),
            };
        }

        let cycles = key == KEY_MODE || (key == KEY_TURBO && profile.nitro_v4);
        if cycles && profile.platform_profile {
            return match self.device.thermal().cycle_or_toggle() {
                Ok(next) => DispatchOutcome::ProfileChanged(next),
                Err(e) => failed("Profile change", e),
            };
        }

        DispatchOutcome::Ignored(event)
    }

    fn ac_changed(&self, event: FirmwareEvent, state: u8) -> DispatchOutcome {
        if !self.device.profile.handles_ac_events() {
            return DispatchOutcome::Ignored(event);
        }

        let (leaving, entering) = match state {
            0 => (PowerSource::Ac, PowerSource::Battery),
            1 => (PowerSource::Battery, PowerSource::Ac),
            other => {
                info!("Unknown AC event state {}", other);
                return DispatchOutcome::Ignored(event);
            }
        };

        let cache = self.device.power_states();
        if let Err(e) = cache.update(leaving) {
            warn!("Could not save {} state: {}", leaving, e);
        }
        match cache.restore(entering) {
            Ok(()) => DispatchOutcome::PowerSwitched { to: entering },
            Err(e) => failed("Power state restore", e),
        }
    }

    fn calibration(&self, event: FirmwareEvent, flag: u8) -> DispatchOutcome {
        if !self.device.profile.handles_calibration_events() {
            return DispatchOutcome::Ignored(event);
        }

        let enabled = flag != 0;
        match self
            .device
            .settings()
            .set_battery_function(BatteryFunction::Calibration, enabled)
        {
            Ok(()) => DispatchOutcome::CalibrationForwarded { enabled },
            Err(e) => failed("Changing calibration state", e),
        }
    }
}

fn failed(what: &str, e: SenseError) -> DispatchOutcome {
    error!("{} failed: {}", what, e);
    DispatchOutcome::Failed(format!("{}: {}", what, e))
}

//! Per-device context shared by every engine.
//!
//! All mutable engine state sits behind one mutex. Engines take it for short
//! read or update sections and never while a firmware call is in flight, so
//! the notification path can always make progress.

use std::sync::OnceLock;

use log::debug;
use parking_lot::Mutex;

use crate::cooling::{FanController, FanSpeedPair};
use crate::device::DeviceProfile;
use crate::error::{Result, SenseError};
use crate::events::EventDispatcher;
use crate::firmware::{Firmware, FirmwareChannel};
use crate::lighting::{KeyboardLightingState, LightingEngine};
use crate::power::{PowerSource, PowerStateCache, PowerStates};
use crate::protocol::{Command, SYS_INFO_BATTERY_STATUS};
use crate::sensors::{Sensors, SupportedSensorMask};
use crate::settings::Settings;
use crate::storage::{BlobStore, MemoryBlobStore};
use crate::thermal::{Backoff, NullFramework, ProfileFramework, ThermalEngine, ThermalMemory};

/// Behaviour switches chosen by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceOptions {
    /// Mode key cycles through every profile instead of toggling turbo.
    pub cycle_profiles: bool,
    /// Retry schedule for platform profile registration.
    pub backoff: Backoff,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            cycle_profiles: true,
            backoff: Backoff::default(),
        }
    }
}

/// Mutable engine state guarded by [`SenseDevice`].
#[derive(Debug, Clone, Default)]
pub(crate) struct EngineState {
    pub(crate) fans: FanSpeedPair,
    pub(crate) thermal: ThermalMemory,
    pub(crate) keyboard: Option<KeyboardLightingState>,
    pub(crate) power: PowerStates,
}

/// One Acer gaming laptop: firmware channel, capabilities and engine state.
pub struct SenseDevice<C: FirmwareChannel> {
    pub(crate) firmware: Firmware<C>,
    pub(crate) profile: DeviceProfile,
    pub(crate) options: DeviceOptions,
    pub(crate) state: Mutex<EngineState>,
    pub(crate) sensors: OnceLock<SupportedSensorMask>,
    pub(crate) framework: Box<dyn ProfileFramework>,
    pub(crate) store: Box<dyn BlobStore>,
}

impl<C: FirmwareChannel> SenseDevice<C> {
    /// Create a device with default options, an in-memory blob store and no
    /// profile framework.
    ///
    /// # Arguments
    /// * `channel` - Firmware transport
    /// * `profile` - Capability set for the model
    pub fn new(channel: C, profile: DeviceProfile) -> Self {
        debug!("Creating device context for model {}", profile.name);
        Self {
            firmware: Firmware::new(channel),
            profile,
            options: DeviceOptions::default(),
            state: Mutex::new(EngineState::default()),
            sensors: OnceLock::new(),
            framework: Box::new(NullFramework),
            store: Box::new(MemoryBlobStore::new()),
        }
    }

    pub fn with_options(mut self, options: DeviceOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_framework(mut self, framework: impl ProfileFramework + 'static) -> Self {
        self.framework = Box::new(framework);
        self
    }

    pub fn with_store(mut self, store: impl BlobStore + 'static) -> Self {
        self.store = Box::new(store);
        self
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    pub fn options(&self) -> &DeviceOptions {
        &self.options
    }

    pub fn firmware(&self) -> &Firmware<C> {
        &self.firmware
    }

    /// The underlying transport.
    pub fn channel(&self) -> &C {
        self.firmware.channel()
    }

    /// Ask firmware whether the machine runs on AC or battery.
    pub fn power_source(&self) -> Result<PowerSource> {
        let word = self
            .firmware
            .query_u64(Command::GetSysInfo, SYS_INFO_BATTERY_STATUS)?;
        Ok(PowerSource::from_ac_flag(word != 0))
    }

    pub fn thermal(&self) -> ThermalEngine<'_, C> {
        ThermalEngine::new(self)
    }

    pub fn fans(&self) -> FanController<'_, C> {
        FanController::new(self)
    }

    pub fn lighting(&self) -> LightingEngine<'_, C> {
        LightingEngine::new(self)
    }

    pub fn power_states(&self) -> PowerStateCache<'_, C> {
        PowerStateCache::new(self)
    }

    pub fn events(&self) -> EventDispatcher<'_, C> {
        EventDispatcher::new(self)
    }

    pub fn settings(&self) -> Settings<'_, C> {
        Settings::new(self)
    }

    pub fn sensors(&self) -> Sensors<'_, C> {
        Sensors::new(self)
    }

    pub(crate) fn require(&self, capable: bool, what: &str) -> Result<()> {
        if capable {
            Ok(())
        } else {
            Err(SenseError::unsupported(format!(
                "{} is not available on {}",
                what, self.profile.name
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firmware::{Reply, ScriptedFirmware};

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_device_is_shareable() {
        assert_send_sync::<SenseDevice<ScriptedFirmware>>();
    }

    #[test]
    fn test_power_source_query() {
        let firmware = ScriptedFirmware::new();
        firmware.respond_to_word(Command::GetSysInfo, SYS_INFO_BATTERY_STATUS, Reply::word(1));
        let device = SenseDevice::new(firmware, DeviceProfile::phn16_72());
        assert_eq!(device.power_source().unwrap(), PowerSource::Ac);

        device
            .channel()
            .respond_to_word(Command::GetSysInfo, SYS_INFO_BATTERY_STATUS, Reply::word(0));
        assert_eq!(device.power_source().unwrap(), PowerSource::Battery);
    }

    #[test]
    fn test_require_reports_model() {
        let device = SenseDevice::new(ScriptedFirmware::new(), DeviceProfile::predator_turbo());
        let err = device.require(false, "Lightbar").unwrap_err();
        assert!(err.to_string().contains("predator-turbo"));
    }
}

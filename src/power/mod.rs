//! Power-source aware state memory.
//!
//! Two snapshots of {fan speeds, thermal profile}, one for battery and one
//! for AC. When the machine changes power source the slot being left is
//! refreshed from the live state and the other slot is applied. Only the
//! slot named in a call is ever touched.

use std::fmt;

use log::info;

use crate::cooling::FanSpeedPair;
use crate::device::SenseDevice;
use crate::error::{Result, SenseError};
use crate::firmware::FirmwareChannel;
use crate::storage::{POWER_STATES_KEY, decode_power_record, encode_power_record};
use crate::thermal::ThermalProfile;

/// Where the machine draws power from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerSource {
    Battery,
    Ac,
}

impl PowerSource {
    pub fn from_ac_flag(on_ac: bool) -> Self {
        if on_ac {
            PowerSource::Ac
        } else {
            PowerSource::Battery
        }
    }

    pub fn is_ac(self) -> bool {
        self == PowerSource::Ac
    }
}

impl fmt::Display for PowerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerSource::Battery => write!(f, "battery"),
            PowerSource::Ac => write!(f, "AC"),
        }
    }
}

/// Fan speeds and thermal profile for one power source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerStateSnapshot {
    pub fans: FanSpeedPair,
    pub profile: ThermalProfile,
}

impl fmt::Display for PowerStateSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (fans {})", self.profile, self.fans)
    }
}

/// Both snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerStates {
    pub battery: PowerStateSnapshot,
    pub ac: PowerStateSnapshot,
}

impl Default for PowerStates {
    fn default() -> Self {
        Self {
            battery: PowerStateSnapshot {
                fans: FanSpeedPair::AUTO,
                profile: ThermalProfile::Eco,
            },
            ac: PowerStateSnapshot {
                fans: FanSpeedPair::AUTO,
                profile: ThermalProfile::Balanced,
            },
        }
    }
}

impl PowerStates {
    pub fn get(&self, source: PowerSource) -> PowerStateSnapshot {
        match source {
            PowerSource::Battery => self.battery,
            PowerSource::Ac => self.ac,
        }
    }

    pub fn slot_mut(&mut self, source: PowerSource) -> &mut PowerStateSnapshot {
        match source {
            PowerSource::Battery => &mut self.battery,
            PowerSource::Ac => &mut self.ac,
        }
    }
}

/// Power-state snapshot operations on a device.
pub struct PowerStateCache<'a, C: FirmwareChannel> {
    device: &'a SenseDevice<C>,
}

impl<'a, C: FirmwareChannel> PowerStateCache<'a, C> {
    pub(crate) fn new(device: &'a SenseDevice<C>) -> Self {
        Self { device }
    }

    pub fn states(&self) -> PowerStates {
        self.device.state.lock().power
    }

    pub fn snapshot(&self, source: PowerSource) -> PowerStateSnapshot {
        self.states().get(source)
    }

    /// Store the live profile and fan speeds in the `source` slot.
    pub fn update(&self, source: PowerSource) -> Result<PowerStateSnapshot> {
        let profile = self.device.thermal().get_profile()?;
        let mut state = self.device.state.lock();
        let snapshot = PowerStateSnapshot {
            fans: state.fans,
            profile,
        };
        *state.power.slot_mut(source) = snapshot;
        drop(state);

        info!("Saved {} state: {}", source, snapshot);
        Ok(snapshot)
    }

    /// Apply the `source` slot: profile first, then fan speeds.
    pub fn restore(&self, source: PowerSource) -> Result<()> {
        let snapshot = self.snapshot(source);
        self.device.thermal().write_profile(snapshot.profile)?;
        self.device.fans().apply(snapshot.fans)?;
        info!("Restored {} state: {}", source, snapshot);
        Ok(())
    }

    /// Load both snapshots from the blob store.
    ///
    /// A missing, short or invalid record keeps the current snapshots.
    ///
    /// # Returns
    /// Whether a stored record was applied.
    pub fn load(&self) -> bool {
        let blob = match self.device.store.load(POWER_STATES_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                info!("No saved power states, using defaults");
                return false;
            }
            Err(e) => {
                info!("Power states unreadable, using defaults: {}", e);
                return false;
            }
        };

        match decode_power_record(&blob) {
            Ok(states) => {
                self.device.state.lock().power = states;
                info!("Power states loaded");
                true
            }
            Err(e) => {
                info!("Ignoring saved power states: {}", e);
                false
            }
        }
    }

    /// Write both snapshots to the blob store.
    pub fn persist(&self) -> Result<()> {
        let record = encode_power_record(&self.states());
        self.device
            .store
            .store(POWER_STATES_KEY, &record)
            .map_err(|source| SenseError::Storage {
                key: POWER_STATES_KEY.to_string(),
                source,
            })?;
        info!("Power states saved");
        Ok(())
    }

    /// Load snapshots and apply the one for the current power source.
    pub fn startup_restore(&self) -> Result<PowerSource> {
        self.load();
        let source = self.device.power_source()?;
        self.restore(source)?;
        Ok(source)
    }

    /// Refresh the slot for the current power source and persist.
    pub fn save(&self) -> Result<()> {
        let source = self.device.power_source()?;
        self.update(source)?;
        self.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceProfile;
    use crate::firmware::{Reply, ScriptedFirmware};
    use crate::protocol::{Command, MiscSetting, SYS_INFO_BATTERY_STATUS, encode_misc_setting};
    use crate::storage::{BlobStore, MemoryBlobStore};

    fn device(store: MemoryBlobStore) -> SenseDevice<ScriptedFirmware> {
        SenseDevice::new(ScriptedFirmware::new(), DeviceProfile::predator_v4()).with_store(store)
    }

    fn on_ac(device: &SenseDevice<ScriptedFirmware>) {
        device.channel().respond_to_word(
            Command::GetSysInfo,
            SYS_INFO_BATTERY_STATUS,
            Reply::word(1),
        );
    }

    fn live_profile(device: &SenseDevice<ScriptedFirmware>, profile: ThermalProfile) {
        device.channel().respond(
            Command::GetMiscSetting,
            Reply::word(u64::from(profile.wire()) << 8),
        );
    }

    #[test]
    fn test_defaults() {
        let states = PowerStates::default();
        assert_eq!(states.battery.profile, ThermalProfile::Eco);
        assert_eq!(states.ac.profile, ThermalProfile::Balanced);
        assert!(states.ac.fans.is_auto());
    }

    #[test]
    fn test_update_touches_only_named_slot() {
        let device = device(MemoryBlobStore::new());
        live_profile(&device, ThermalProfile::Turbo);
        device.state.lock().fans = FanSpeedPair { cpu: 40, gpu: 60 };

        let snapshot = device.power_states().update(PowerSource::Ac).unwrap();
        assert_eq!(snapshot.profile, ThermalProfile::Turbo);

        let states = device.power_states().states();
        assert_eq!(states.ac.fans, FanSpeedPair { cpu: 40, gpu: 60 });
        assert_eq!(states.battery, PowerStates::default().battery);
    }

    #[test]
    fn test_restore_writes_profile_then_fans() {
        let device = device(MemoryBlobStore::new());
        device.state.lock().power.ac = PowerStateSnapshot {
            fans: FanSpeedPair { cpu: 50, gpu: 0 },
            profile: ThermalProfile::Performance,
        };

        device.power_states().restore(PowerSource::Ac).unwrap();

        let writes = device.channel().writes();
        assert_eq!(writes.len(), 3);
        assert!(writes[0].is(Command::SetMiscSetting));
        assert_eq!(
            writes[0].input_word(),
            Some(encode_misc_setting(MiscSetting::PlatformProfile.index(), 4))
        );
        assert!(writes[1].is(Command::SetFanBehavior));
        assert!(writes[2].is(Command::SetFanSpeed));
        assert_eq!(device.fans().speeds(), FanSpeedPair { cpu: 50, gpu: 0 });
    }

    #[test]
    fn test_restore_fails_when_profile_write_fails() {
        let device = device(MemoryBlobStore::new());
        device
            .channel()
            .respond(Command::SetMiscSetting, Reply::fail("bus error"));
        assert!(device.power_states().restore(PowerSource::Battery).is_err());
        assert!(device.channel().calls_to(Command::SetFanBehavior).is_empty());
    }

    #[test]
    fn test_persist_then_load_round_trip() {
        let store = MemoryBlobStore::new();
        let first = device(store.clone());
        {
            let mut state = first.state.lock();
            state.power.battery = PowerStateSnapshot {
                fans: FanSpeedPair { cpu: 10, gpu: 10 },
                profile: ThermalProfile::Balanced,
            };
            state.power.ac = PowerStateSnapshot {
                fans: FanSpeedPair::MAX,
                profile: ThermalProfile::Turbo,
            };
        }
        first.power_states().persist().unwrap();

        let second = device(store);
        assert!(second.power_states().load());
        assert_eq!(second.power_states().states(), first.power_states().states());
    }

    #[test]
    fn test_short_blob_falls_back_to_defaults() {
        let store = MemoryBlobStore::new();
        store.store(POWER_STATES_KEY, &[1, 2, 3, 4, 5]).unwrap();
        let device = device(store);

        assert!(!device.power_states().load());
        assert_eq!(device.power_states().states(), PowerStates::default());
    }

    #[test]
    fn test_startup_restore_uses_current_source() {
        let device = device(MemoryBlobStore::new());
        on_ac(&device);

        let source = device.power_states().startup_restore().unwrap();
        assert_eq!(source, PowerSource::Ac);

        let profile_write = &device.channel().calls_to(Command::SetMiscSetting)[0];
        assert_eq!(
            profile_write.input_word(),
            Some(encode_misc_setting(
                MiscSetting::PlatformProfile.index(),
                ThermalProfile::Balanced.wire()
            ))
        );
    }

    #[test]
    fn test_save_updates_active_slot_and_persists() {
        let store = MemoryBlobStore::new();
        let device = device(store.clone());
        live_profile(&device, ThermalProfile::Quiet);

        device.power_states().save().unwrap();

        assert_eq!(
            device.power_states().snapshot(PowerSource::Battery).profile,
            ThermalProfile::Quiet
        );
        assert!(store.load(POWER_STATES_KEY).unwrap().is_some());
    }
}

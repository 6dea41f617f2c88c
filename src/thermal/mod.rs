//! Thermal profile state machine.
//!
//! Profiles are read and written through the platform profile misc setting.
//! Transitions depend on the power source: off AC only Eco and Balanced are
//! legal. The engine remembers the most performant supported profile and the
//! last profile below it so the mode key can toggle turbo on and off.

mod registration;

pub use registration::{Backoff, NullFramework, ProfileFramework, register_with_backoff};

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use log::{info, warn};

use crate::device::SenseDevice;
use crate::error::{Result, SenseError};
use crate::firmware::FirmwareChannel;
use crate::power::PowerSource;
use crate::protocol::{
    Command, FanMode, MiscSetting, OC_NORMAL, OC_TURBO, PROFILE_WIRE_BALANCED, PROFILE_WIRE_ECO,
    PROFILE_WIRE_PERFORMANCE, PROFILE_WIRE_QUIET, PROFILE_WIRE_TURBO, TURBO_LED_OFF,
    TURBO_LED_ON, TURBO_LED_QUERY,
};

// =============================================================================
// Profiles
// =============================================================================

/// Thermal/performance operating point, ordered by increasing performance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ThermalProfile {
    Eco,
    Quiet,
    Balanced,
    Performance,
    Turbo,
}

impl ThermalProfile {
    pub const ALL: [ThermalProfile; 5] = [
        ThermalProfile::Eco,
        ThermalProfile::Quiet,
        ThermalProfile::Balanced,
        ThermalProfile::Performance,
        ThermalProfile::Turbo,
    ];

    /// Value stored in the platform profile misc setting.
    pub const fn wire(self) -> u8 {
        match self {
            ThermalProfile::Eco => PROFILE_WIRE_ECO,
            ThermalProfile::Quiet => PROFILE_WIRE_QUIET,
            ThermalProfile::Balanced => PROFILE_WIRE_BALANCED,
            ThermalProfile::Performance => PROFILE_WIRE_PERFORMANCE,
            ThermalProfile::Turbo => PROFILE_WIRE_TURBO,
        }
    }

    pub fn from_wire(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.wire() == value)
    }

    /// Short name used on the command line and in logs.
    pub const fn name(self) -> &'static str {
        match self {
            ThermalProfile::Eco => "eco",
            ThermalProfile::Quiet => "quiet",
            ThermalProfile::Balanced => "balanced",
            ThermalProfile::Performance => "performance",
            ThermalProfile::Turbo => "turbo",
        }
    }

    /// Name used by the platform profile framework.
    pub const fn platform_name(self) -> &'static str {
        match self {
            ThermalProfile::Eco => "low-power",
            ThermalProfile::Quiet => "quiet",
            ThermalProfile::Balanced => "balanced",
            ThermalProfile::Performance => "balanced-performance",
            ThermalProfile::Turbo => "performance",
        }
    }

    pub fn from_platform_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|p| p.platform_name() == name)
    }

    /// Quiet and Eco drop the fans back to automatic control.
    pub const fn quiets_fans(self) -> bool {
        matches!(self, ThermalProfile::Quiet | ThermalProfile::Eco)
    }

    /// Firmware only accepts Eco and Balanced off AC.
    pub const fn allowed_on_battery(self) -> bool {
        matches!(self, ThermalProfile::Eco | ThermalProfile::Balanced)
    }
}

impl fmt::Display for ThermalProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ThermalProfile {
    type Err = SenseError;

    /// Accepts short names and platform profile names.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.name() == lower)
            .or_else(|| Self::from_platform_name(&lower))
            .ok_or_else(|| {
                SenseError::invalid(format!(
                    "Unknown thermal profile '{}'. Use eco, quiet, balanced, performance or turbo",
                    s.trim()
                ))
            })
    }
}

/// Set of thermal profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProfileSet(u8);

impl ProfileSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Decode the firmware supported-profiles mask (bit n = wire value n).
    pub fn from_firmware_mask(mask: u8) -> Self {
        let mut set = Self::empty();
        for profile in ThermalProfile::ALL {
            if mask & (1 << profile.wire()) != 0 {
                set.insert(profile);
            }
        }
        set
    }

    fn bit(profile: ThermalProfile) -> u8 {
        1 << (profile as u8)
    }

    pub fn insert(&mut self, profile: ThermalProfile) {
        self.0 |= Self::bit(profile);
    }

    pub fn contains(&self, profile: ThermalProfile) -> bool {
        self.0 & Self::bit(profile) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Members in ascending performance order.
    pub fn iter(&self) -> impl Iterator<Item = ThermalProfile> + '_ {
        ThermalProfile::ALL
            .into_iter()
            .filter(move |p| self.contains(*p))
    }
}

impl FromIterator<ThermalProfile> for ProfileSet {
    fn from_iter<I: IntoIterator<Item = ThermalProfile>>(iter: I) -> Self {
        let mut set = Self::empty();
        for profile in iter {
            set.insert(profile);
        }
        set
    }
}

impl fmt::Display for ProfileSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|p| p.platform_name()).collect();
        write!(f, "{}", names.join(" "))
    }
}

// =============================================================================
// Profile Memory
// =============================================================================

/// Probe results and the turbo toggle memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThermalMemory {
    pub max_perf: Option<ThermalProfile>,
    pub last_non_turbo: Option<ThermalProfile>,
    pub supported: ProfileSet,
}

impl ThermalMemory {
    /// Most performant supported profile, Turbo before probing.
    pub fn max_perf(&self) -> ThermalProfile {
        self.max_perf.unwrap_or(ThermalProfile::Turbo)
    }

    /// Profile the turbo toggle returns to, Balanced before probing.
    pub fn last_non_turbo(&self) -> ThermalProfile {
        self.last_non_turbo.unwrap_or(ThermalProfile::Balanced)
    }

    /// Remember `profile` as the toggle target unless it is the top tier.
    pub fn record(&mut self, profile: ThermalProfile) {
        if profile != self.max_perf() {
            self.last_non_turbo = Some(profile);
        }
    }

    /// Walk `supported` in ascending order and seed both memories.
    pub fn seed(&mut self, supported: ProfileSet) {
        self.supported = supported;
        self.last_non_turbo = None;
        for profile in supported.iter() {
            self.max_perf = Some(profile);
            match profile {
                ThermalProfile::Eco | ThermalProfile::Quiet | ThermalProfile::Balanced => {
                    self.last_non_turbo = Some(profile);
                }
                // Fallbacks only when nothing calmer is supported.
                ThermalProfile::Performance | ThermalProfile::Turbo => {
                    if self.last_non_turbo.is_none() {
                        self.last_non_turbo = Some(profile);
                    }
                }
            }
        }
    }
}

/// Profile the mode key moves to from `current`.
pub fn next_profile(
    current: ThermalProfile,
    source: PowerSource,
    cycle: bool,
    memory: &ThermalMemory,
) -> ThermalProfile {
    use ThermalProfile::*;

    if source == PowerSource::Battery {
        return if current == Eco { Balanced } else { Eco };
    }

    let max_perf = memory.max_perf();
    match current {
        Turbo if cycle => Quiet,
        Turbo => memory.last_non_turbo(),
        Performance if max_perf == Performance => memory.last_non_turbo(),
        Performance => max_perf,
        Balanced if cycle => Performance,
        Quiet if cycle => Balanced,
        Eco if cycle => Quiet,
        Balanced | Quiet | Eco => max_perf,
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Thermal profile operations on a device.
pub struct ThermalEngine<'a, C: FirmwareChannel> {
    device: &'a SenseDevice<C>,
}

impl<'a, C: FirmwareChannel> ThermalEngine<'a, C> {
    pub(crate) fn new(device: &'a SenseDevice<C>) -> Self {
        Self { device }
    }

    fn require_profiles(&self) -> Result<()> {
        self.device
            .require(self.device.profile.platform_profile, "Thermal profile control")
    }

    /// Snapshot of the probe results and toggle memory.
    pub fn memory(&self) -> ThermalMemory {
        self.device.state.lock().thermal
    }

    /// Read the current profile from firmware.
    pub fn get_profile(&self) -> Result<ThermalProfile> {
        self.require_profiles()?;
        let value = self
            .device
            .firmware
            .get_misc_setting(MiscSetting::PlatformProfile)?;
        ThermalProfile::from_wire(value).ok_or_else(|| {
            SenseError::protocol(format!("Unknown thermal profile value {:#04x}", value))
        })
    }

    /// Switch to `target`.
    ///
    /// # Errors
    /// Returns `Unsupported` without touching firmware when `target` is not
    /// allowed on battery power.
    pub fn set_profile(&self, target: ThermalProfile) -> Result<()> {
        self.require_profiles()?;

        let source = self.device.power_source()?;
        if source == PowerSource::Battery && !target.allowed_on_battery() {
            return Err(SenseError::unsupported(format!(
                "{} profile requires AC power",
                target
            )));
        }

        if target.quiets_fans() {
            self.device.fans().set_speeds(0, 0)?;
        }

        self.write_profile(target)?;
        self.device.state.lock().thermal.record(target);
        info!("Thermal profile set to {}", target);
        Ok(())
    }

    /// Handle the mode key: cycle through profiles or toggle turbo.
    ///
    /// # Returns
    /// The profile that was applied.
    pub fn cycle_or_toggle(&self) -> Result<ThermalProfile> {
        self.require_profiles()?;

        let current = self.get_profile()?;
        let source = self.device.power_source()?;
        let memory = self.memory();
        let next = next_profile(current, source, self.device.options.cycle_profiles, &memory);

        self.write_profile(next)?;
        if next.quiets_fans() {
            self.device.fans().set_speeds(0, 0)?;
        }
        self.device.state.lock().thermal.record(next);

        info!("Mode key: {} -> {} on {}", current, next, source);
        self.device.framework.profile_changed(next);
        Ok(next)
    }

    /// Read the supported-profiles mask and seed the toggle memory.
    pub fn probe_supported(&self) -> Result<ProfileSet> {
        self.require_profiles()?;

        let mask = self
            .device
            .firmware
            .get_misc_setting(MiscSetting::SupportedProfiles)?;
        let supported = ProfileSet::from_firmware_mask(mask);
        if supported.is_empty() {
            warn!("Firmware reports no supported thermal profiles (mask {:#04x})", mask);
            return Ok(supported);
        }

        let mut state = self.device.state.lock();
        state.thermal.seed(supported);
        info!(
            "Supported profiles: {} (max {}, fallback {})",
            supported,
            state.thermal.max_perf(),
            state.thermal.last_non_turbo()
        );
        Ok(supported)
    }

    /// Probe and register with the profile framework, sleeping between retries.
    pub fn register(&self) -> Result<ProfileSet> {
        self.register_with(std::thread::sleep)
    }

    pub(crate) fn register_with(&self, sleep: impl FnMut(Duration)) -> Result<ProfileSet> {
        let choices = self.probe_supported()?;
        register_with_backoff(
            self.device.framework.as_ref(),
            choices,
            &self.device.options.backoff,
            sleep,
        )?;
        Ok(choices)
    }

    /// Write a profile without power-source checks or fan side effects.
    pub(crate) fn write_profile(&self, profile: ThermalProfile) -> Result<()> {
        self.device
            .firmware
            .set_misc_setting(MiscSetting::PlatformProfile, profile.wire())
    }

    /// Legacy turbo button: flip the turbo LED, fan mode and overclock.
    ///
    /// # Returns
    /// The LED state before the toggle.
    pub fn toggle_turbo(&self) -> Result<bool> {
        let turbo = self
            .device
            .profile
            .turbo
            .ok_or_else(|| SenseError::unsupported("Turbo button is not fitted"))?;
        let firmware = &self.device.firmware;

        let was_on = firmware.query_u64(Command::GetGamingLed, TURBO_LED_QUERY)? != 0;
        let (led, fan_mode, overclock) = if was_on {
            (TURBO_LED_OFF, FanMode::Auto, OC_NORMAL)
        } else {
            (TURBO_LED_ON, FanMode::Max, OC_TURBO)
        };

        firmware.send_u64(Command::SetGamingLed, led)?;
        self.device.fans().set_legacy_mode(fan_mode)?;
        if turbo.overclock {
            firmware.set_misc_setting(MiscSetting::Overclock1, overclock)?;
            firmware.set_misc_setting(MiscSetting::Overclock2, overclock)?;
        }

        info!("Turbo {}", if was_on { "disabled" } else { "enabled" });
        Ok(was_on)
    }
}

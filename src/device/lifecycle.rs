//! Startup, shutdown and resume sequences.
//!
//! Startup order: lighting wake, profile probe and framework registration,
//! supported-sensor query, power-state restore, keyboard restore. Only a
//! failed registration aborts startup; the later steps are attempted and
//! reported individually.

use std::time::Duration;

use log::{error, info, warn};

use crate::device::SenseDevice;
use crate::error::Result;
use crate::firmware::FirmwareChannel;
use crate::lighting::WakeReport;
use crate::power::PowerSource;
use crate::sensors::SupportedSensorMask;
use crate::thermal::ProfileSet;

/// Result of each startup step. `None` means the step does not apply to the
/// model.
#[derive(Debug, Default)]
pub struct StartupReport {
    pub wake: Option<WakeReport>,
    pub profiles: Option<ProfileSet>,
    pub sensors: Option<Result<SupportedSensorMask>>,
    pub power: Option<Result<PowerSource>>,
    /// `Ok(false)` when no saved keyboard state was applied.
    pub keyboard: Option<Result<bool>>,
}

impl StartupReport {
    /// Every step that ran succeeded.
    pub fn is_clean(&self) -> bool {
        self.wake.as_ref().is_none_or(WakeReport::is_clean)
            && self.sensors.as_ref().is_none_or(|r| r.is_ok())
            && self.power.as_ref().is_none_or(|r| r.is_ok())
            && self.keyboard.as_ref().is_none_or(|r| r.is_ok())
    }
}

/// Result of each shutdown step.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    pub power: Option<Result<()>>,
    pub keyboard: Option<Result<()>>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.power.as_ref().is_none_or(|r| r.is_ok())
            && self.keyboard.as_ref().is_none_or(|r| r.is_ok())
    }
}

fn logged<T>(step: &str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        error!("{} failed: {}", step, e);
    }
    result
}

impl<C: FirmwareChannel> SenseDevice<C> {
    /// Bring the device up.
    ///
    /// # Errors
    /// Returns the probe or `Registration` error when the thermal profile
    /// framework cannot be set up.
    pub fn start(&self) -> Result<StartupReport> {
        self.start_with(std::thread::sleep)
    }

    pub(crate) fn start_with(&self, sleep: impl FnMut(Duration)) -> Result<StartupReport> {
        info!("Starting {}", self.profile.name);
        let mut report = StartupReport {
            wake: self.lighting().wake(),
            ..StartupReport::default()
        };

        if self.profile.platform_profile {
            report.profiles = Some(self.thermal().register_with(sleep)?);
        }

        if self.profile.fan_speed_read {
            report.sensors = Some(logged("Sensor query", self.sensors().supported()));
        }

        if self.profile.handles_ac_events() {
            report.power = Some(logged(
                "Power state restore",
                self.power_states().startup_restore(),
            ));
        }

        if self.profile.four_zone_kb {
            report.keyboard = Some(logged(
                "Keyboard restore",
                self.lighting().restore_keyboard(),
            ));
        }

        if report.is_clean() {
            info!("{} ready", self.profile.name);
        } else {
            warn!("{} started with errors", self.profile.name);
        }
        Ok(report)
    }

    /// Save power and keyboard state. Both are attempted.
    pub fn stop(&self) -> ShutdownReport {
        let mut report = ShutdownReport::default();

        if self.profile.handles_ac_events() {
            report.power = Some(logged("Power state save", self.power_states().save()));
        }

        if self.profile.four_zone_kb {
            report.keyboard = Some(logged("Keyboard save", self.lighting().save_keyboard()));
        }

        info!("{} stopped", self.profile.name);
        report
    }

    /// Re-run the lighting wake after system resume.
    pub fn resume(&self) -> Option<WakeReport> {
        info!("Resuming {}", self.profile.name);
        self.lighting().wake()
    }
}

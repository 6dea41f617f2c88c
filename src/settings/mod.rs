//! Firmware settings exposed on PredatorSense and NitroSense machines.

mod battery;
mod toggles;

pub use battery::{BatteryFunction, BatteryHealth};
pub use toggles::USB_CHARGING_RATES;

use crate::device::SenseDevice;
use crate::error::Result;
use crate::firmware::FirmwareChannel;

/// Battery health, charging and miscellaneous toggles on a device.
pub struct Settings<'a, C: FirmwareChannel> {
    device: &'a SenseDevice<C>,
}

impl<'a, C: FirmwareChannel> Settings<'a, C> {
    pub(crate) fn new(device: &'a SenseDevice<C>) -> Self {
        Self { device }
    }

    fn require(&self) -> Result<()> {
        self.device
            .require(self.device.profile.has_sense_controls(), "Sense controls")
    }
}

//! Battery health controls: 80% charge limiter and calibration mode.

use log::{error, info};

use crate::error::{Result, SenseError};
use crate::firmware::FirmwareChannel;
use crate::protocol::{
    BATTERY_FUNCTION_CALIBRATION, BATTERY_FUNCTION_HEALTH, BATTERY_NUMBER, BATTERY_QUERY_FUNCTION,
    BatteryHealthAck, BatteryHealthStatus, Command,
};
use crate::settings::Settings;

/// Battery health functions that can be switched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryFunction {
    /// Stop charging at 80%.
    ChargeLimit,
    Calibration,
}

impl BatteryFunction {
    pub const fn mask(self) -> u8 {
        match self {
            BatteryFunction::ChargeLimit => BATTERY_FUNCTION_HEALTH,
            BatteryFunction::Calibration => BATTERY_FUNCTION_CALIBRATION,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            BatteryFunction::ChargeLimit => "charge limit",
            BatteryFunction::Calibration => "calibration",
        }
    }
}

/// Battery health state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryHealth {
    pub charge_limit: bool,
    pub calibration: bool,
}

impl BatteryHealth {
    pub fn get(&self, function: BatteryFunction) -> bool {
        match function {
            BatteryFunction::ChargeLimit => self.charge_limit,
            BatteryFunction::Calibration => self.calibration,
        }
    }
}

impl<C: FirmwareChannel> Settings<'_, C> {
    /// Query both battery health functions.
    pub fn battery_health(&self) -> Result<BatteryHealth> {
        self.require()?;
        let input = [BATTERY_NUMBER, BATTERY_QUERY_FUNCTION, 0, 0];
        let reply = self
            .device
            .firmware
            .invoke(Command::GetBatteryHealth, &input)?;
        let status = BatteryHealthStatus::parse(&reply).inspect_err(|e| error!("{}", e))?;
        Ok(BatteryHealth {
            charge_limit: status.charge_limit(),
            calibration: status.calibration(),
        })
    }

    /// Switch one battery health function.
    ///
    /// # Errors
    /// Returns `CommandRejected` if firmware reports a non-zero return code.
    pub fn set_battery_function(&self, function: BatteryFunction, enabled: bool) -> Result<()> {
        self.require()?;
        let input = [
            BATTERY_NUMBER,
            function.mask(),
            u8::from(enabled),
            0,
            0,
            0,
            0,
            0,
        ];
        let reply = self
            .device
            .firmware
            .invoke(Command::SetBatteryHealth, &input)?;
        let ack = BatteryHealthAck::parse(&reply).inspect_err(|e| error!("{}", e))?;
        if !ack.is_success() {
            return Err(SenseError::CommandRejected {
                operation: "battery health set",
                status: u64::from(ack.return_code),
            });
        }

        info!(
            "Battery {} {}",
            function.name(),
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }
}

//! Simple firmware toggles: USB charging, LCD override, backlight timeout,
//! boot animation and the lighting reset.
//!
//! Each one is a fixed query word whose reply is compared against known
//! values. A reply outside the table means firmware and driver disagree.

use log::info;

use crate::error::{Result, SenseError};
use crate::firmware::FirmwareChannel;
use crate::protocol::{
    BACKLIGHT_TIMEOUT_OFF, BACKLIGHT_TIMEOUT_ON, BACKLIGHT_TIMEOUT_QUERY,
    BACKLIGHT_TIMEOUT_SET_OFF, BACKLIGHT_TIMEOUT_SET_ON, Command, LCD_OVERRIDE_OFF,
    LCD_OVERRIDE_ON, LCD_OVERRIDE_QUERY, LCD_OVERRIDE_SET_OFF, LCD_OVERRIDE_SET_ON, MiscSetting,
    USB_CHARGING_QUERY, USB_CHARGING_TABLE,
};
use crate::settings::Settings;

/// Charge rates accepted for powered-off USB charging.
pub const USB_CHARGING_RATES: [u8; 4] = [0, 10, 20, 30];

/// A boolean toggle backed by a query word and two known replies.
struct Toggle {
    name: &'static str,
    get: Command,
    query: u64,
    on: u64,
    off: u64,
    set: Command,
    set_on: u64,
    set_off: u64,
}

const LCD_OVERRIDE: Toggle = Toggle {
    name: "LCD override",
    get: Command::GetGamingProfile,
    query: LCD_OVERRIDE_QUERY,
    on: LCD_OVERRIDE_ON,
    off: LCD_OVERRIDE_OFF,
    set: Command::SetGamingProfile,
    set_on: LCD_OVERRIDE_SET_ON,
    set_off: LCD_OVERRIDE_SET_OFF,
};

const BACKLIGHT_TIMEOUT: Toggle = Toggle {
    name: "backlight timeout",
    get: Command::GetFunction,
    query: BACKLIGHT_TIMEOUT_QUERY,
    on: BACKLIGHT_TIMEOUT_ON,
    off: BACKLIGHT_TIMEOUT_OFF,
    set: Command::SetFunction,
    set_on: BACKLIGHT_TIMEOUT_SET_ON,
    set_off: BACKLIGHT_TIMEOUT_SET_OFF,
};

impl<C: FirmwareChannel> Settings<'_, C> {
    fn read_toggle(&self, toggle: &Toggle) -> Result<bool> {
        self.require()?;
        let word = self.device.firmware.query_u64(toggle.get, toggle.query)?;
        if word == toggle.on {
            Ok(true)
        } else if word == toggle.off {
            Ok(false)
        } else {
            Err(SenseError::protocol(format!(
                "Unknown {} state {:#x}",
                toggle.name, word
            )))
        }
    }

    fn write_toggle(&self, toggle: &Toggle, enabled: bool) -> Result<()> {
        self.require()?;
        let word = if enabled {
            toggle.set_on
        } else {
            toggle.set_off
        };
        self.device.firmware.send_u64(toggle.set, word)?;
        info!("{} set to {}", toggle.name, u8::from(enabled));
        Ok(())
    }

    /// Powered-off USB charging rate in percent of battery (0 = off).
    pub fn usb_charging(&self) -> Result<u8> {
        self.require()?;
        let word = self
            .device
            .firmware
            .query_u64(Command::GetFunction, USB_CHARGING_QUERY)?;
        USB_CHARGING_TABLE
            .iter()
            .find(|(_, read, _)| *read == word)
            .map(|(rate, _, _)| *rate)
            .ok_or_else(|| SenseError::protocol(format!("Unknown USB charging state {}", word)))
    }

    /// Set the powered-off USB charging rate: 0, 10, 20 or 30.
    pub fn set_usb_charging(&self, rate: u8) -> Result<()> {
        let (_, _, word) = USB_CHARGING_TABLE
            .iter()
            .find(|(r, _, _)| *r == rate)
            .copied()
            .ok_or_else(|| {
                SenseError::invalid(format!(
                    "USB charging rate must be one of {:?}, got {}",
                    USB_CHARGING_RATES, rate
                ))
            })?;
        self.require()?;
        self.device.firmware.send_u64(Command::SetFunction, word)?;
        info!("USB charging set to {}%", rate);
        Ok(())
    }

    pub fn lcd_override(&self) -> Result<bool> {
        self.read_toggle(&LCD_OVERRIDE)
    }

    pub fn set_lcd_override(&self, enabled: bool) -> Result<()> {
        self.write_toggle(&LCD_OVERRIDE, enabled)
    }

    /// Keyboard backlight turns off after 30 seconds idle.
    pub fn backlight_timeout(&self) -> Result<bool> {
        self.read_toggle(&BACKLIGHT_TIMEOUT)
    }

    pub fn set_backlight_timeout(&self, enabled: bool) -> Result<()> {
        self.write_toggle(&BACKLIGHT_TIMEOUT, enabled)
    }

    /// Boot animation and sound.
    pub fn boot_animation(&self) -> Result<bool> {
        self.require()?;
        match self
            .device
            .firmware
            .get_misc_setting(MiscSetting::BootAnimationSound)?
        {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(SenseError::protocol(format!(
                "Unknown boot animation state {}",
                other
            ))),
        }
    }

    pub fn set_boot_animation(&self, enabled: bool) -> Result<()> {
        self.require()?;
        self.device
            .firmware
            .set_misc_setting(MiscSetting::BootAnimationSound, u8::from(enabled))?;
        info!("Boot animation set to {}", u8::from(enabled));
        Ok(())
    }

    /// Send a raw value to the gaming LED command to reset the lighting
    /// controller.
    pub fn reset_lighting(&self, value: u64) -> Result<()> {
        self.require()?;
        info!("Resetting lighting controller with value {}", value);
        self.device.firmware.send_u64(Command::SetGamingLed, value)
    }
}

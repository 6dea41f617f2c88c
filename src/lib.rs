//! Acer Sense Library
//!
//! A Rust control layer for the gaming firmware interface of Acer Predator
//! and Nitro laptops.
//!
//! # Features
//!
//! - Thermal profiles with power-source rules and the mode/turbo key
//! - CPU and GPU fan speed control
//! - Four-zone keyboard and lightbar RGB lighting
//! - Per power source memory of fans and profile, persisted across restarts
//! - Battery health, USB charging and other firmware toggles
//! - Temperature and fan sensors
//!
//! # Example
//!
//! ```no_run
//! use acer_sense::device::{DeviceProfile, SenseDevice};
//! use acer_sense::firmware::{AcpiCallChannel, AcpiPaths};
//! use acer_sense::storage::FileBlobStore;
//! use acer_sense::thermal::ThermalProfile;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let channel = AcpiCallChannel::new(AcpiPaths::default());
//!     let device = SenseDevice::new(channel, DeviceProfile::phn16_72())
//!         .with_store(FileBlobStore::new("/var/lib/acer-sense"));
//!
//!     // Wake lighting, register profiles, restore saved state
//!     device.start()?;
//!
//!     device.thermal().set_profile(ThermalProfile::Balanced)?;
//!     device.fans().set_speeds(40, 0)?;
//!
//!     // Firmware notification frames go to the dispatcher
//!     let outcome = device.events().dispatch(&[0x08, 0, 0, 0, 0, 0, 0, 0]);
//!     println!("{:?}", outcome);
//!
//!     device.stop();
//!     Ok(())
//! }
//! ```

pub mod attributes;
pub mod config;
pub mod cooling;
pub mod device;
pub mod error;
pub mod events;
pub mod firmware;
pub mod lighting;
pub mod power;
pub mod protocol;
pub mod sensors;
pub mod settings;
pub mod storage;
pub mod thermal;
pub mod utils;

// Re-exports for convenience
pub use cooling::FanSpeedPair;
pub use device::{DeviceProfile, SenseDevice};
pub use error::{Result, SenseError};
pub use firmware::{FirmwareChannel, ScriptedFirmware};
pub use power::PowerSource;
pub use sensors::Sensor;
pub use thermal::ThermalProfile;

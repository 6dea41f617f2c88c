//! Firmware protocol implementation for Acer gaming laptops.
//!
//! This module contains the command routing table, the bit-level codec and
//! response parsing, based on reverse-engineering of the vendor WMI interface.

pub mod codec;
pub mod commands;
pub mod status;

pub use codec::*;
pub use commands::*;
pub use status::*;

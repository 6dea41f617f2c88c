//! Device abstraction layer for Acer gaming laptops.
//!
//! Provides the per-model capability set, the shared device context and the
//! startup / shutdown / resume sequences.

mod context;
mod lifecycle;
mod profile;

pub use context::{DeviceOptions, SenseDevice};
pub use lifecycle::{ShutdownReport, StartupReport};
pub use profile::{DeviceProfile, TurboButton};

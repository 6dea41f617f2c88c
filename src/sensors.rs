//! Firmware temperature and fan sensors.
//!
//! The supported-sensor mask is queried once and cached for the lifetime of
//! the device. Readings go through the sys-info command with the sensor id in
//! the request word.

use std::fmt;

use log::{debug, info};

use crate::device::SenseDevice;
use crate::error::Result;
use crate::firmware::FirmwareChannel;
use crate::protocol::{
    SENSOR_CPU_FAN, SENSOR_CPU_TEMPERATURE, SENSOR_EXTERNAL_TEMPERATURE_2, SENSOR_GPU_FAN,
    SENSOR_GPU_TEMPERATURE, SYS_INFO_SUPPORTED_SENSORS, decode_sensor_reading,
    encode_sensor_query,
};

// =============================================================================
// Sensor Channels
// =============================================================================

/// Sensor ids that can be reported by firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sensor {
    CpuTemperature,
    GpuTemperature,
    ExternalTemperature2,
    CpuFan,
    GpuFan,
}

/// What a sensor measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    /// Millidegrees Celsius.
    Temperature,
    /// Revolutions per minute.
    Fan,
}

impl Sensor {
    pub const ALL: [Sensor; 5] = [
        Sensor::CpuTemperature,
        Sensor::GpuTemperature,
        Sensor::ExternalTemperature2,
        Sensor::CpuFan,
        Sensor::GpuFan,
    ];

    pub const fn id(self) -> u8 {
        match self {
            Sensor::CpuTemperature => SENSOR_CPU_TEMPERATURE,
            Sensor::GpuTemperature => SENSOR_GPU_TEMPERATURE,
            Sensor::ExternalTemperature2 => SENSOR_EXTERNAL_TEMPERATURE_2,
            Sensor::CpuFan => SENSOR_CPU_FAN,
            Sensor::GpuFan => SENSOR_GPU_FAN,
        }
    }

    pub const fn kind(self) -> SensorKind {
        match self {
            Sensor::CpuFan | Sensor::GpuFan => SensorKind::Fan,
            _ => SensorKind::Temperature,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Sensor::CpuTemperature => "cpu_temp",
            Sensor::GpuTemperature => "gpu_temp",
            Sensor::ExternalTemperature2 => "external_temp_2",
            Sensor::CpuFan => "cpu_fan",
            Sensor::GpuFan => "gpu_fan",
        }
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Bitmask of sensor ids firmware reports; bit `id - 1` per sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SupportedSensorMask(pub u16);

impl SupportedSensorMask {
    pub fn is_visible(self, sensor: Sensor) -> bool {
        let id = sensor.id();
        id != 0 && self.0 & (1 << (id - 1)) != 0
    }

    pub fn visible(self) -> Vec<Sensor> {
        Sensor::ALL
            .into_iter()
            .filter(|s| self.is_visible(*s))
            .collect()
    }
}

/// One sensor value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorReading {
    pub sensor: Sensor,
    /// Millidegrees for temperatures, RPM for fans.
    pub value: i64,
}

impl fmt::Display for SensorReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sensor.kind() {
            SensorKind::Temperature => write!(
                f,
                "{}: {}.{} C",
                self.sensor,
                self.value / 1000,
                (self.value % 1000) / 100
            ),
            SensorKind::Fan => write!(f, "{}: {} RPM", self.sensor, self.value),
        }
    }
}

// =============================================================================
// Sensor Access
// =============================================================================

/// Sensor queries on a device.
pub struct Sensors<'a, C: FirmwareChannel> {
    device: &'a SenseDevice<C>,
}

impl<'a, C: FirmwareChannel> Sensors<'a, C> {
    pub(crate) fn new(device: &'a SenseDevice<C>) -> Self {
        Self { device }
    }

    fn require(&self) -> Result<()> {
        self.device
            .require(self.device.profile.fan_speed_read, "Sensor reading")
    }

    /// The supported-sensor mask, queried from firmware on first use.
    pub fn supported(&self) -> Result<SupportedSensorMask> {
        self.require()?;
        if let Some(mask) = self.device.sensors.get() {
            return Ok(*mask);
        }

        let word = self.device.firmware.sys_info(SYS_INFO_SUPPORTED_SENSORS)?;
        let mask = SupportedSensorMask(decode_sensor_reading(word).supported_mask);
        info!("Supported sensor mask: {:#06x}", mask.0);
        // A concurrent first query stored the same firmware answer.
        Ok(*self.device.sensors.get_or_init(|| mask))
    }

    /// Read one sensor.
    pub fn read(&self, sensor: Sensor) -> Result<SensorReading> {
        self.require()?;
        let word = self.device.firmware.sys_info(encode_sensor_query(sensor.id()))?;
        let raw = i64::from(decode_sensor_reading(word).reading);
        let value = match sensor.kind() {
            SensorKind::Temperature => raw * 1000,
            SensorKind::Fan => raw,
        };
        debug!("Sensor {} raw {}", sensor, raw);
        Ok(SensorReading { sensor, value })
    }

    /// Read every sensor the firmware reports.
    pub fn read_all(&self) -> Result<Vec<SensorReading>> {
        self.supported()?
            .visible()
            .into_iter()
            .map(|sensor| self.read(sensor))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceProfile;
    use crate::error::SenseError;
    use crate::firmware::{Reply, ScriptedFirmware};
    use crate::protocol::Command;

    fn device() -> SenseDevice<ScriptedFirmware> {
        SenseDevice::new(ScriptedFirmware::new(), DeviceProfile::phn16_72())
    }

    #[test]
    fn test_mask_visibility() {
        // bits 0, 1, 9: cpu temp, cpu fan, gpu temp
        let mask = SupportedSensorMask(0b10_0000_0011);
        assert!(mask.is_visible(Sensor::CpuTemperature));
        assert!(mask.is_visible(Sensor::CpuFan));
        assert!(mask.is_visible(Sensor::GpuTemperature));
        assert!(!mask.is_visible(Sensor::GpuFan));
        assert!(!mask.is_visible(Sensor::ExternalTemperature2));
        assert_eq!(mask.visible().len(), 3);
    }

    #[test]
    fn test_supported_is_queried_once() {
        let device = device();
        device.channel().respond_to_word(
            Command::GetSysInfo,
            SYS_INFO_SUPPORTED_SENSORS,
            Reply::word(0x23 << 24),
        );

        assert_eq!(device.sensors().supported().unwrap(), SupportedSensorMask(0x23));
        assert_eq!(device.sensors().supported().unwrap(), SupportedSensorMask(0x23));
        assert_eq!(device.channel().calls().len(), 1);
    }

    #[test]
    fn test_read_temperature_and_fan() {
        let device = device();
        device.channel().respond_to_word(
            Command::GetSysInfo,
            encode_sensor_query(SENSOR_CPU_TEMPERATURE),
            Reply::word(45 << 8),
        );
        device.channel().respond_to_word(
            Command::GetSysInfo,
            encode_sensor_query(SENSOR_GPU_FAN),
            Reply::word(2400 << 8),
        );

        let temp = device.sensors().read(Sensor::CpuTemperature).unwrap();
        assert_eq!(temp.value, 45_000);
        assert_eq!(temp.to_string(), "cpu_temp: 45.0 C");

        let fan = device.sensors().read(Sensor::GpuFan).unwrap();
        assert_eq!(fan.value, 2400);
    }

    #[test]
    fn test_nonzero_status_rejected() {
        let device = device();
        device
            .channel()
            .respond(Command::GetSysInfo, Reply::word(0x01));
        assert!(matches!(
            device.sensors().read(Sensor::CpuFan),
            Err(SenseError::CommandRejected { status: 1, .. })
        ));
    }

    #[test]
    fn test_read_all_uses_mask() {
        let device = device();
        device.channel().respond_to_word(
            Command::GetSysInfo,
            SYS_INFO_SUPPORTED_SENSORS,
            Reply::word(0b10 << 24),
        );

        let readings = device.sensors().read_all().unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].sensor, Sensor::CpuFan);
    }

    #[test]
    fn test_requires_fan_speed_read() {
        let device = SenseDevice::new(ScriptedFirmware::new(), DeviceProfile::predator_turbo());
        assert!(matches!(
            device.sensors().supported(),
            Err(SenseError::Unsupported(_))
        ));
    }
}

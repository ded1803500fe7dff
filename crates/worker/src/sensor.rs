use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use warden_core::SensorKind;

/// One sensor sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub value: i16,
    pub unit: char,
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.value, self.unit)
    }
}

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("sensor at 0x{address:02X} did not respond")]
    NoResponse { address: u8 },
}

/// A measurement device owned by exactly one worker.
pub trait Sensor: Send {
    fn kind(&self) -> SensorKind;

    fn address(&self) -> u8;

    fn read(&mut self) -> Result<Reading, SensorError>;
}

/// Stand-in for bus hardware: a stable baseline derived from the address
/// plus a little jitter on every read.
#[derive(Debug)]
pub struct SimulatedSensor {
    kind: SensorKind,
    address: u8,
    rng: StdRng,
}

impl SimulatedSensor {
    pub fn new(kind: SensorKind, address: u8) -> Self {
        Self {
            kind,
            address,
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn with_seed(kind: SensorKind, address: u8, seed: u64) -> Self {
        Self {
            kind,
            address,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn baseline(&self) -> i16 {
        match self.kind {
            // degrees Celsius
            SensorKind::Ntc => 18 + i16::from(self.address % 8),
            // CO2 ppm
            SensorKind::Scc => 400 + 2 * i16::from(self.address),
        }
    }

    pub fn jitter(&self) -> i16 {
        match self.kind {
            SensorKind::Ntc => 1,
            SensorKind::Scc => 15,
        }
    }

    pub fn unit(&self) -> char {
        match self.kind {
            SensorKind::Ntc => 'C',
            SensorKind::Scc => 'P',
        }
    }
}

impl Sensor for SimulatedSensor {
    fn kind(&self) -> SensorKind {
        self.kind
    }

    fn address(&self) -> u8 {
        self.address
    }

    fn read(&mut self) -> Result<Reading, SensorError> {
        let jitter = self.jitter();
        let offset = self.rng.random_range(-jitter..=jitter);
        Ok(Reading {
            value: self.baseline() + offset,
            unit: self.unit(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ntc_readings_stay_near_baseline() {
        let mut sensor = SimulatedSensor::with_seed(SensorKind::Ntc, 0x48, 7);
        let baseline = sensor.baseline();
        for _ in 0..50 {
            let reading = sensor.read().unwrap();
            assert_eq!(reading.unit, 'C');
            assert!((reading.value - baseline).abs() <= 1);
        }
    }

    #[test]
    fn test_scc_reports_ppm() {
        let mut sensor = SimulatedSensor::with_seed(SensorKind::Scc, 0x61, 1);
        let reading = sensor.read().unwrap();
        assert_eq!(reading.unit, 'P');
        assert!((reading.value - (400 + 2 * 0x61)).abs() <= 15);
        assert_eq!(sensor.kind(), SensorKind::Scc);
        assert_eq!(sensor.address(), 0x61);
    }

    #[test]
    fn test_reading_display() {
        let reading = Reading {
            value: -3,
            unit: 'C',
        };
        assert_eq!(reading.to_string(), "-3, C");
    }

    #[test]
    fn test_same_seed_same_readings() {
        let mut a = SimulatedSensor::with_seed(SensorKind::Scc, 0x10, 99);
        let mut b = SimulatedSensor::with_seed(SensorKind::Scc, 0x10, 99);
        for _ in 0..5 {
            assert_eq!(a.read().unwrap(), b.read().unwrap());
        }
    }
}

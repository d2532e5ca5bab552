// One consistent set of sensor readings per control stage
//
// Raw readings are sanitized here so the behaviours never see values
// outside the ADC range. Proximity readings outside the range are treated
// as an obstruction.

use tracing::{debug, warn};

use crate::hardware::{self, EncoderChannel, Hardware, LineSensor, ProximitySensor};

/// Full-scale reading of the 12-bit sensor ADCs
pub const READING_MAX: u16 = 4095;

/// Proximity readings; larger = closer obstruction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Proximity {
    pub front: u16,
    pub rear: u16,
    pub left: u16,
    pub right: u16,
    pub front_left: u16,
    pub front_right: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorSnapshot {
    pub proximity: Proximity,
    /// Floor reflectance under [left, right] line sensors; lower = darker
    pub line: [u16; 2],
    /// Left wheel ticks since the last encoder reset
    pub left_travel: u32,
    /// Ambient light; lower = darker
    pub light: u16,
    pub now_ms: u64,
}

impl SensorSnapshot {
    /// Read every sensor once
    pub fn sample<H: Hardware + ?Sized>(hw: &mut H) -> hardware::Result<Self> {
        let mut proximity = Proximity::default();
        for sensor in ProximitySensor::ALL {
            let value = sanitize_proximity(sensor, hw.read_proximity(sensor)?);
            match sensor {
                ProximitySensor::Front => proximity.front = value,
                ProximitySensor::Rear => proximity.rear = value,
                ProximitySensor::Left => proximity.left = value,
                ProximitySensor::Right => proximity.right = value,
                ProximitySensor::FrontLeft => proximity.front_left = value,
                ProximitySensor::FrontRight => proximity.front_right = value,
            }
        }

        let snapshot = Self {
            proximity,
            line: [
                clamp_reading(hw.read_line(LineSensor::Left)?),
                clamp_reading(hw.read_line(LineSensor::Right)?),
            ],
            left_travel: hw.read_encoder(EncoderChannel::Left)?.max(0) as u32,
            light: clamp_reading(hw.read_ambient_light()?),
            now_ms: hw.now_millis(),
        };
        debug!("Sensors: {:?}", snapshot);
        Ok(snapshot)
    }
}

fn sanitize_proximity(sensor: ProximitySensor, raw: i32) -> u16 {
    match u16::try_from(raw) {
        Ok(value) if value <= READING_MAX => value,
        _ => {
            warn!("{:?} proximity reading {} out of range, treating as obstruction", sensor, raw);
            READING_MAX
        }
    }
}

fn clamp_reading(raw: i32) -> u16 {
    raw.clamp(0, READING_MAX as i32) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proximity_in_range_passes_through() {
        assert_eq!(sanitize_proximity(ProximitySensor::Front, 0), 0);
        assert_eq!(sanitize_proximity(ProximitySensor::Front, 312), 312);
        assert_eq!(sanitize_proximity(ProximitySensor::Front, 4095), 4095);
    }

    #[test]
    fn test_proximity_out_of_range_is_obstruction() {
        assert_eq!(sanitize_proximity(ProximitySensor::Left, -1), READING_MAX);
        assert_eq!(sanitize_proximity(ProximitySensor::Left, 4096), READING_MAX);
        assert_eq!(sanitize_proximity(ProximitySensor::Left, i32::MIN), READING_MAX);
    }

    #[test]
    fn test_line_and_light_clamped() {
        assert_eq!(clamp_reading(-40), 0);
        assert_eq!(clamp_reading(70_000), READING_MAX);
        assert_eq!(clamp_reading(650), 650);
    }
}

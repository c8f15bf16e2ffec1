use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::MapError;

/// An RGB fill color, displayed as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl FromStr for Rgb {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MapError::invalid_parameter("color", format!("'{s}' is not a #rrggbb color"));
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Power-law ramp from white to a dark tint.
///
/// `intensity = norm^(1 / sensitivity)`, then
/// `r = g = 255 - trunc(rg_span * intensity)` and
/// `b = blue_base - trunc(blue_span * intensity)`.
///
/// With a dead zone, volumes below it stay white and the scale starts at
/// the dead zone: `norm = (v - dz) / (max - dz)`, or `(v - dz) / 1` when
/// `max <= dz`. A volume of exactly 0 counts as 1. Without one, any
/// volume `<= 0` is white and `norm = v / max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorRamp {
    pub dead_zone: Option<f64>,
    pub rg_span: u8,
    pub blue_base: u8,
    pub blue_span: u8,
    /// Clamp `norm` to `[0, 1]` when a volume exceeds the maximum.
    pub clamp: bool,
}

impl ColorRamp {
    /// Absolute trip volumes: 90-trip dead zone, saturates at `#000073`.
    pub const ABSOLUTE: ColorRamp = ColorRamp {
        dead_zone: Some(90.0),
        rg_span: 255,
        blue_base: 255,
        blue_span: 140,
        clamp: true,
    };

    /// Trips per capita: no dead zone, saturates at `#000000` from `#ffff8b`.
    pub const RELATIVE: ColorRamp = ColorRamp {
        dead_zone: None,
        rg_span: 255,
        blue_base: 139,
        blue_span: 139,
        clamp: true,
    };

    /// Maps a volume to its fill color relative to `max_volume`.
    ///
    /// `sensitivity` must be positive; higher values saturate more slowly.
    pub fn fill_color(&self, volume: Option<f64>, max_volume: f64, sensitivity: f64) -> Rgb {
        let Some(mut volume) = volume.filter(|v| !v.is_nan()) else {
            return Rgb::WHITE;
        };
        if max_volume == 0.0 {
            return Rgb::WHITE;
        }

        let (effective, effective_max) = match self.dead_zone {
            Some(dead_zone) => {
                if volume == 0.0 {
                    volume = 1.0;
                }
                if volume < dead_zone {
                    return Rgb::WHITE;
                }
                let effective_max = if max_volume > dead_zone {
                    max_volume - dead_zone
                } else {
                    1.0
                };
                (volume - dead_zone, effective_max)
            }
            None => {
                if volume <= 0.0 {
                    return Rgb::WHITE;
                }
                (volume, max_volume)
            }
        };

        let mut norm = effective / effective_max;
        if self.clamp {
            norm = norm.clamp(0.0, 1.0);
        }
        let intensity = norm.powf(1.0 / sensitivity);

        Rgb(
            channel(255.0, self.rg_span, intensity),
            channel(255.0, self.rg_span, intensity),
            channel(f64::from(self.blue_base), self.blue_span, intensity),
        )
    }
}

/// `base - trunc(span * intensity)`, saturated into a byte.
fn channel(base: f64, span: u8, intensity: f64) -> u8 {
    let value = base - (f64::from(span) * intensity).trunc();
    value.clamp(0.0, 255.0) as u8
}

/// Fill color for an absolute trip volume using [`ColorRamp::ABSOLUTE`].
pub fn fill_color(volume: Option<f64>, max_volume: f64, sensitivity: f64) -> Rgb {
    ColorRamp::ABSOLUTE.fill_color(volume, max_volume, sensitivity)
}

/// Fill color for a per-capita rate using [`ColorRamp::RELATIVE`].
pub fn relative_fill_color(rate: Option<f64>, max_rate: f64, sensitivity: f64) -> Rgb {
    ColorRamp::RELATIVE.fill_color(rate, max_rate, sensitivity)
}

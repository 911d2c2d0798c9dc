use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Appended to every command on the serial link.
pub const COMMAND_TERMINATOR: &str = "\r\n";

/// Piecewise-linear map through `(xs[i], ys[i])`, clamped at both ends.
/// `xs` must be ascending and as long as `ys`.
pub fn interpolate(value: f64, xs: &[f64], ys: &[f64]) -> f64 {
    let last = xs.len() - 1;
    if value <= xs[0] {
        return ys[0];
    }
    if value >= xs[last] {
        return ys[last];
    }
    let i = xs.partition_point(|&x| x <= value) - 1;
    let t = (value - xs[i]) / (xs[i + 1] - xs[i]);
    ys[i] + t * (ys[i + 1] - ys[i])
}

/// Maps raw bin magnitudes to bar heights.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HeightCurve {
    pub input: Vec<f64>,
    pub output: Vec<f64>,
}

impl Default for HeightCurve {
    fn default() -> Self {
        Self {
            input: vec![0.0, 80.0, 120.0, 200.0],
            output: vec![1.0, 60.0, 90.0, 100.0],
        }
    }
}

impl HeightCurve {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ascending = self.input.windows(2).all(|w| w[0] < w[1]);
        if self.input.len() < 2 || self.input.len() != self.output.len() || !ascending {
            return Err(ConfigError::InvalidCurve);
        }
        Ok(())
    }

    pub fn height(&self, magnitude: f64) -> f64 {
        interpolate(magnitude, &self.input, &self.output)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Renders the light command without its terminator, e.g. `RGB 150 75 2`.
impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RGB {} {} {}", self.r, self.g, self.b)
    }
}

/// Which bins drive the red, green and blue channels, and how heights scale.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ColorMapping {
    pub channels: [usize; 3],
    pub scale: f64,
    pub curve: HeightCurve,
}

impl Default for ColorMapping {
    fn default() -> Self {
        Self {
            channels: [0, 5, 9],
            scale: 2.5,
            curve: HeightCurve::default(),
        }
    }
}

impl ColorMapping {
    pub fn validate(&self, num_bins: usize) -> Result<(), ConfigError> {
        self.curve.validate()?;
        if let Some(&bin) = self.channels.iter().find(|&&bin| bin >= num_bins) {
            return Err(ConfigError::ChannelOutOfRange { bin, num_bins });
        }
        Ok(())
    }

    pub fn heights_into(&self, bins: &[f64], out: &mut [f64]) {
        for (dst, &v) in out.iter_mut().zip(bins) {
            *dst = self.curve.height(v);
        }
    }

    pub fn rgb(&self, bins: &[f64]) -> Rgb {
        let channel = |bin: usize| {
            let value = (self.curve.height(bins[bin]) * self.scale).trunc();
            value.clamp(0.0, 255.0) as u8
        };
        Rgb {
            r: channel(self.channels[0]),
            g: channel(self.channels[1]),
            b: channel(self.channels[2]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolation_clamps_and_blends() {
        let curve = HeightCurve::default();
        assert_eq!(curve.height(-5.0), 1.0);
        assert_eq!(curve.height(0.0), 1.0);
        assert_eq!(curve.height(40.0), 30.5);
        assert_eq!(curve.height(80.0), 60.0);
        assert_eq!(curve.height(100.0), 75.0);
        assert_eq!(curve.height(160.0), 95.0);
        assert_eq!(curve.height(1e6), 100.0);
    }

    #[test]
    fn rgb_from_default_channels() {
        let mapping = ColorMapping::default();
        let mut bins = vec![0.0; 10];
        bins[0] = 200.0;
        bins[5] = 80.0;
        bins[9] = 0.0;
        assert_eq!(mapping.rgb(&bins), Rgb { r: 250, g: 150, b: 2 });
        assert_eq!(mapping.rgb(&bins).to_string(), "RGB 250 150 2");
    }

    #[test]
    fn rgb_saturates_at_255() {
        let mapping = ColorMapping {
            scale: 10.0,
            ..Default::default()
        };
        let rgb = mapping.rgb(&[500.0; 10]);
        assert_eq!(rgb, Rgb { r: 255, g: 255, b: 255 });
    }

    #[test]
    fn heights_follow_curve() {
        let mapping = ColorMapping::default();
        let mut heights = [0.0; 3];
        mapping.heights_into(&[0.0, 120.0, 300.0], &mut heights);
        assert_eq!(heights, [1.0, 90.0, 100.0]);
    }

    #[test]
    fn validation() {
        let mapping = ColorMapping::default();
        assert!(mapping.validate(10).is_ok());
        assert_eq!(
            mapping.validate(8).unwrap_err(),
            ConfigError::ChannelOutOfRange { bin: 9, num_bins: 8 }
        );

        let bad_curve = ColorMapping {
            curve: HeightCurve {
                input: vec![0.0, 50.0, 20.0],
                output: vec![1.0, 2.0, 3.0],
            },
            ..Default::default()
        };
        assert_eq!(bad_curve.validate(10).unwrap_err(), ConfigError::InvalidCurve);

        let short_curve = HeightCurve {
            input: vec![0.0],
            output: vec![1.0],
        };
        assert_eq!(short_curve.validate().unwrap_err(), ConfigError::InvalidCurve);
    }
}

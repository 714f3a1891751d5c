//! Weight/reps quantization.
//!
//! Inputs arrive as loose numbers from the user and are snapped to the
//! configured weight increment and to whole reps before a set is recorded.

use crate::{config::SessionConfig, Error, Result};

/// A validated, quantized set measurement
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Measurement {
    weight: f64,
    reps: u32,
}

impl Measurement {
    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn reps(&self) -> u32 {
        self.reps
    }

    /// Quantize raw input against the session limits.
    ///
    /// Weight snaps to the nearest `weight_increment` within `[0, max_weight]`,
    /// reps to the nearest integer within `[1, max_reps]`.
    pub fn quantize(weight: Option<f64>, reps: Option<f64>, limits: &SessionConfig) -> Result<Self> {
        let weight = weight.ok_or_else(|| Error::InvalidMeasurement("weight is missing".into()))?;
        let reps = reps.ok_or_else(|| Error::InvalidMeasurement("reps are missing".into()))?;

        if !weight.is_finite() || !reps.is_finite() {
            return Err(Error::InvalidMeasurement(
                "weight and reps must be finite numbers".into(),
            ));
        }

        let step = limits.weight_increment;
        let weight = round_to_step_precision((weight / step).round() * step, step);
        if weight < 0.0 || weight > limits.max_weight {
            return Err(Error::InvalidMeasurement(format!(
                "weight {} outside 0..={}",
                weight, limits.max_weight
            )));
        }

        let reps = reps.round();
        if reps < 1.0 || reps > f64::from(limits.max_reps) {
            return Err(Error::InvalidMeasurement(format!(
                "reps {} outside 1..={}",
                reps, limits.max_reps
            )));
        }

        Ok(Self {
            // -0.0 from rounding tiny negatives
            weight: weight.abs(),
            reps: reps as u32,
        })
    }

    /// Parse `"<weight> <reps>"` as typed at the prompt.
    ///
    /// A missing or unparseable token becomes `None` so that quantization
    /// reports it uniformly.
    pub fn parse(input: &str, limits: &SessionConfig) -> Result<Self> {
        let mut parts = input.split_whitespace();
        let weight = parts.next().and_then(|w| w.parse::<f64>().ok());
        let reps = parts.next().and_then(|r| r.parse::<f64>().ok());
        if parts.next().is_some() {
            return Err(Error::InvalidMeasurement(format!(
                "expected '<weight> <reps>', got '{}'",
                input.trim()
            )));
        }
        Self::quantize(weight, reps, limits)
    }
}

/// Drop float noise from `n * step`, keeping as many decimals as `step` has
fn round_to_step_precision(value: f64, step: f64) -> f64 {
    let decimals = step
        .to_string()
        .split_once('.')
        .map_or(0, |(_, frac)| frac.len().min(6));
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> SessionConfig {
        SessionConfig::default()
    }

    #[test]
    fn test_weight_snaps_to_increment() {
        let m = Measurement::quantize(Some(21.0), Some(8.0), &limits()).unwrap();
        assert_eq!(m.weight, 20.0);
        let m = Measurement::quantize(Some(21.3), Some(8.0), &limits()).unwrap();
        assert_eq!(m.weight, 22.5);
    }

    #[test]
    fn test_fine_increment_is_exact() {
        let limits = SessionConfig {
            weight_increment: 0.1,
            ..SessionConfig::default()
        };
        let m = Measurement::quantize(Some(0.3), Some(5.0), &limits).unwrap();
        assert_eq!(m.weight, 0.3);
        let m = Measurement::quantize(Some(0.71), Some(5.0), &limits).unwrap();
        assert_eq!(m.weight, 0.7);
        let m = Measurement::quantize(Some(101.26), Some(5.0), &limits).unwrap();
        assert_eq!(m.weight, 101.3);

        let limits = SessionConfig {
            weight_increment: 1.25,
            ..SessionConfig::default()
        };
        let m = Measurement::quantize(Some(3.6), Some(5.0), &limits).unwrap();
        assert_eq!(m.weight, 3.75);
    }

    #[test]
    fn test_reps_round_to_integer() {
        let m = Measurement::quantize(Some(20.0), Some(9.6), &limits()).unwrap();
        assert_eq!(m.reps, 10);
    }

    #[test]
    fn test_zero_weight_allowed() {
        let m = Measurement::quantize(Some(0.4), Some(12.0), &limits()).unwrap();
        assert_eq!(m.weight, 0.0);
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(matches!(
            Measurement::quantize(Some(-5.0), Some(5.0), &limits()),
            Err(Error::InvalidMeasurement(_))
        ));
        assert!(matches!(
            Measurement::quantize(Some(500.0), Some(5.0), &limits()),
            Err(Error::InvalidMeasurement(_))
        ));
        assert!(matches!(
            Measurement::quantize(Some(20.0), Some(0.0), &limits()),
            Err(Error::InvalidMeasurement(_))
        ));
        assert!(matches!(
            Measurement::quantize(Some(20.0), Some(31.0), &limits()),
            Err(Error::InvalidMeasurement(_))
        ));
        assert!(matches!(
            Measurement::quantize(Some(f64::NAN), Some(5.0), &limits()),
            Err(Error::InvalidMeasurement(_))
        ));
    }

    #[test]
    fn test_rejects_missing() {
        assert!(matches!(
            Measurement::quantize(None, Some(5.0), &limits()),
            Err(Error::InvalidMeasurement(_))
        ));
        assert!(matches!(
            Measurement::quantize(Some(20.0), None, &limits()),
            Err(Error::InvalidMeasurement(_))
        ));
    }

    #[test]
    fn test_parse_prompt_input() {
        let m = Measurement::parse("22.5 8", &limits()).unwrap();
        assert_eq!(m, Measurement { weight: 22.5, reps: 8 });

        assert!(Measurement::parse("22.5", &limits()).is_err());
        assert!(Measurement::parse("abc 8", &limits()).is_err());
        assert!(Measurement::parse("20 8 1", &limits()).is_err());
    }
}

//! Seeded synthetic ground-motion records.
//!
//! Records are in units of g and normalized to unit PGA, so a study scales the
//! same record shape to each IM level with [`scale_to_pga`].
//!
//! Construction of a stochastic record:
//!
//! 1. Gaussian white noise from a seeded `StdRng`
//! 2. single-pole low-pass filter at `corner_frequency_hz`
//! 3. trapezoidal intensity envelope: quadratic rise, flat strong-motion
//!    phase, exponential decay
//! 4. division by the peak absolute value

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::prelude::*;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecordSpec {
    /// Sampling interval (s).
    pub dt: f64,
    /// Total record length (s).
    pub duration: f64,
    /// Envelope rise time (s).
    pub rise_time: f64,
    /// Strong-motion plateau length (s).
    pub strong_duration: f64,
    /// Exponential decay rate after the plateau (1/s).
    pub decay_rate: f64,
    /// Low-pass corner frequency (Hz).
    pub corner_frequency_hz: f64,
}

impl Default for RecordSpec {
    fn default() -> Self {
        Self {
            dt: 0.01,
            duration: 20.0,
            rise_time: 2.0,
            strong_duration: 8.0,
            decay_rate: 0.5,
            corner_frequency_hz: 5.0,
        }
    }
}

impl RecordSpec {
    pub fn n_samples(&self) -> usize {
        (self.duration / self.dt).round() as usize + 1
    }

    fn validate(&self) -> Result<(), AppError> {
        let positive = [
            ("dt", self.dt),
            ("duration", self.duration),
            ("corner_frequency_hz", self.corner_frequency_hz),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(AppError::config(format!(
                    "Record {name} must be finite and > 0 (got {value})."
                )));
            }
        }
        let non_negative = [
            ("rise_time", self.rise_time),
            ("strong_duration", self.strong_duration),
            ("decay_rate", self.decay_rate),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(AppError::config(format!(
                    "Record {name} must be finite and >= 0 (got {value})."
                )));
            }
        }
        if self.duration < self.dt {
            return Err(AppError::config("Record duration must cover at least one time step."));
        }
        Ok(())
    }

    /// Intensity envelope at time `t`.
    pub fn envelope(&self, t: f64) -> f64 {
        if t < self.rise_time {
            (t / self.rise_time).powi(2)
        } else if t < self.rise_time + self.strong_duration {
            1.0
        } else {
            (-self.decay_rate * (t - self.rise_time - self.strong_duration)).exp()
        }
    }
}

/// Stochastic record with unit PGA; deterministic for a given `(spec, seed)`.
pub fn synthetic_record(spec: &RecordSpec, seed: u64) -> Result<Vec<f64>, AppError> {
    spec.validate()?;

    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::numerical(format!("Noise distribution error: {e}")))?;

    let rc = 1.0 / (2.0 * PI * spec.corner_frequency_hz);
    let smoothing = spec.dt / (rc + spec.dt);

    let n = spec.n_samples();
    let mut filtered = 0.0;
    let mut record = Vec::with_capacity(n);
    for i in 0..n {
        let noise: f64 = normal.sample(&mut rng);
        filtered += smoothing * (noise - filtered);
        record.push(filtered * spec.envelope(i as f64 * spec.dt));
    }

    scale_to_pga(&record, 1.0)
}

/// Harmonic record `amplitude_g · sin(2π t / period)`.
pub fn sine_record(dt: f64, duration: f64, period: f64, amplitude_g: f64) -> Vec<f64> {
    let n = (duration / dt).round() as usize + 1;
    (0..n)
        .map(|i| amplitude_g * (2.0 * PI * i as f64 * dt / period).sin())
        .collect()
}

/// Rescale a record so its peak absolute acceleration equals `pga_g`.
pub fn scale_to_pga(record: &[f64], pga_g: f64) -> Result<Vec<f64>, AppError> {
    if !(pga_g.is_finite() && pga_g >= 0.0) {
        return Err(AppError::config(format!(
            "Target PGA must be finite and >= 0 (got {pga_g})."
        )));
    }
    let peak = pga(record);
    if peak == 0.0 {
        return Err(AppError::config("Cannot scale a record with zero peak acceleration."));
    }
    let factor = pga_g / peak;
    Ok(record.iter().map(|x| x * factor).collect())
}

/// Peak absolute value, ignoring non-finite samples.
pub fn pga(record: &[f64]) -> f64 {
    record
        .iter()
        .filter(|x| x.is_finite())
        .fold(0.0_f64, |m, x| m.max(x.abs()))
}

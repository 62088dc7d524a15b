//! Load profiles: timestamped power demand the pack must serve.

use serde::{Deserialize, Serialize};

use crate::error::{HbessError, HbessResult};
use crate::units::JOULES_PER_KWH;

/// One demand sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadSample {
    /// Seconds from the start of the profile
    pub time: f64,
    /// Demanded power in watts; negative values are regenerative
    pub power: f64,
}

/// Ordered power-demand series for one operating scenario.
///
/// Construction enforces N ≥ 2, strictly increasing timestamps and finite
/// values, so everything downstream can index freely.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadProfile {
    name: String,
    samples: Vec<LoadSample>,
}

impl LoadProfile {
    pub fn new(name: impl Into<String>, samples: Vec<LoadSample>) -> HbessResult<Self> {
        let name = name.into();
        if samples.len() < 2 {
            return Err(HbessError::validation(format!(
                "load profile '{}' needs at least 2 samples, got {}",
                name,
                samples.len()
            )));
        }
        for (i, s) in samples.iter().enumerate() {
            if !s.time.is_finite() || !s.power.is_finite() {
                return Err(HbessError::validation(format!(
                    "load profile '{}': non-finite value at sample {}",
                    name, i
                )));
            }
        }
        if let Some(i) = samples.windows(2).position(|w| w[1].time <= w[0].time) {
            return Err(HbessError::validation(format!(
                "load profile '{}': timestamps must be strictly increasing (sample {} at t={} follows t={})",
                name,
                i + 1,
                samples[i + 1].time,
                samples[i].time
            )));
        }
        Ok(Self { name, samples })
    }

    /// Build from parallel time/power columns.
    pub fn from_columns(name: impl Into<String>, times: &[f64], powers: &[f64]) -> HbessResult<Self> {
        let name = name.into();
        if times.len() != powers.len() {
            return Err(HbessError::validation(format!(
                "load profile '{}': {} timestamps but {} power values",
                name,
                times.len(),
                powers.len()
            )));
        }
        let samples = times
            .iter()
            .zip(powers)
            .map(|(&time, &power)| LoadSample { time, power })
            .collect();
        Self::new(name, samples)
    }

    /// Constant power sampled at a fixed step over `[0, duration]`.
    pub fn constant(name: impl Into<String>, power_w: f64, duration_s: f64, step_s: f64) -> HbessResult<Self> {
        if step_s.is_nan() || step_s <= 0.0 || duration_s < step_s {
            return Err(HbessError::validation(
                "constant profile needs a positive step no longer than the duration",
            ));
        }
        let n = (duration_s / step_s).round() as usize + 1;
        let samples = (0..n)
            .map(|i| LoadSample {
                time: i as f64 * step_s,
                power: power_w,
            })
            .collect();
        Self::new(name, samples)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn samples(&self) -> &[LoadSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false; a valid profile has at least two samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time).collect()
    }

    pub fn powers(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.power).collect()
    }

    /// Step lengths Δt_i for each sample. The final step repeats the last
    /// observed gap, so the result has the same length as the profile.
    pub fn intervals(&self) -> Vec<f64> {
        let n = self.samples.len();
        let mut dt: Vec<f64> = self
            .samples
            .windows(2)
            .map(|w| w[1].time - w[0].time)
            .collect();
        dt.push(self.samples[n - 1].time - self.samples[n - 2].time);
        dt
    }

    /// Timestamps of the N+1 SOC states, including the synthesized closing one.
    pub fn soc_times(&self) -> Vec<f64> {
        let mut t = self.times();
        let n = t.len();
        t.push(t[n - 1] + (t[n - 1] - t[n - 2]));
        t
    }

    /// Total simulated horizon in seconds, including the synthesized step.
    pub fn horizon(&self) -> f64 {
        self.intervals().iter().sum()
    }

    /// Largest absolute demand in watts.
    pub fn peak_power(&self) -> f64 {
        self.samples.iter().map(|s| s.power.abs()).fold(0.0, f64::max)
    }

    /// Energy drawn under the sample-and-hold discretization used by the SOC
    /// recursion, in kWh.
    pub fn held_energy_kwh(&self) -> f64 {
        self.samples
            .iter()
            .zip(self.intervals())
            .map(|(s, dt)| s.power * dt)
            .sum::<f64>()
            / JOULES_PER_KWH
    }

    /// Trapezoidal cumulative energy at each sample, starting at 0, in kWh.
    pub fn cumulative_energy_kwh(&self) -> Vec<f64> {
        let mut acc = 0.0;
        let mut out = Vec::with_capacity(self.samples.len());
        out.push(0.0);
        for w in self.samples.windows(2) {
            acc += 0.5 * (w[0].power + w[1].power) * (w[1].time - w[0].time);
            out.push(acc / JOULES_PER_KWH);
        }
        out
    }

    /// Peak of the cumulative energy curve: what a pack must hold to ride
    /// through the profile from full.
    pub fn required_energy_kwh(&self) -> f64 {
        self.cumulative_energy_kwh()
            .into_iter()
            .fold(0.0, f64::max)
    }
}

//! # Open-Circuit Voltage Lookup
//!
//! Maps state of charge to per-cell open-circuit voltage from a calibration
//! table. Two evaluators are provided:
//!
//! | Evaluator | Continuity | Used by |
//! |-----------|------------|---------|
//! | [`OcvCurve::eval_smooth`] | C¹ (monotone cubic Hermite) | the optimizer, which needs gradients |
//! | [`OcvCurve::eval_linear`] | C⁰ (piecewise linear) | reporting on already-solved SOC values |
//!
//! ## Monotone Cubic Hermite (Fritsch–Carlson)
//!
//! Tangents start as the mean of adjacent secant slopes, are zeroed where the
//! data has a local extremum, and are scaled back so that `α² + β² ≤ 9` on
//! every interval:
//!
//! ```text
//! δ_k = (v_{k+1} - v_k) / (s_{k+1} - s_k)
//! α_k = m_k / δ_k,   β_k = m_{k+1} / δ_k
//! if α_k² + β_k² > 9:  τ = 3 / √(α_k² + β_k²),  m_k ← τ α_k δ_k,  m_{k+1} ← τ β_k δ_k
//! ```
//!
//! This keeps the interpolant monotone wherever the table is monotone, so an
//! increasing OCV table never yields a voltage dip between calibration points.
//!
//! Outside the table the smooth evaluator extends linearly with the end
//! tangents (value and slope stay continuous); the linear evaluator clamps.
//! Neither panics for any finite SOC.

use serde::{Deserialize, Serialize};

use crate::error::{HbessError, HbessResult};

/// Raw calibration table as it appears in config files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcvTable {
    /// State of charge breakpoints in [0, 1], strictly increasing
    pub soc: Vec<f64>,
    /// Open-circuit voltage per cell at each breakpoint, in volts
    pub voltage: Vec<f64>,
}

/// Validated OCV interpolant for one chemistry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "OcvTable", into = "OcvTable")]
pub struct OcvCurve {
    soc: Vec<f64>,
    voltage: Vec<f64>,
    tangents: Vec<f64>,
}

impl TryFrom<OcvTable> for OcvCurve {
    type Error = HbessError;

    fn try_from(table: OcvTable) -> Result<Self, Self::Error> {
        OcvCurve::new(table.soc, table.voltage)
    }
}

impl From<OcvCurve> for OcvTable {
    fn from(curve: OcvCurve) -> Self {
        OcvTable {
            soc: curve.soc,
            voltage: curve.voltage,
        }
    }
}

impl OcvCurve {
    /// Build an interpolant from calibration points.
    ///
    /// Requires at least two points, strictly increasing SOC, and finite,
    /// positive, non-decreasing voltages.
    pub fn new(soc: Vec<f64>, voltage: Vec<f64>) -> HbessResult<Self> {
        if soc.len() != voltage.len() {
            return Err(HbessError::validation(format!(
                "OCV table has {} SOC points but {} voltages",
                soc.len(),
                voltage.len()
            )));
        }
        if soc.len() < 2 {
            return Err(HbessError::validation(
                "OCV table needs at least two calibration points",
            ));
        }
        if soc.iter().chain(voltage.iter()).any(|v| !v.is_finite()) {
            return Err(HbessError::validation("OCV table contains non-finite values"));
        }
        if soc.windows(2).any(|w| w[1] <= w[0]) {
            return Err(HbessError::validation(
                "OCV table SOC breakpoints must be strictly increasing",
            ));
        }
        if voltage.iter().any(|&v| v <= 0.0) {
            return Err(HbessError::validation("OCV table voltages must be positive"));
        }
        if voltage.windows(2).any(|w| w[1] < w[0]) {
            return Err(HbessError::validation(
                "OCV table voltages must be non-decreasing in SOC",
            ));
        }

        let tangents = fritsch_carlson_tangents(&soc, &voltage);
        Ok(Self {
            soc,
            voltage,
            tangents,
        })
    }

    /// Build from evenly spaced samples over SOC ∈ [0, 1].
    pub fn uniform(voltage: Vec<f64>) -> HbessResult<Self> {
        let n = voltage.len();
        if n < 2 {
            return Err(HbessError::validation(
                "OCV table needs at least two calibration points",
            ));
        }
        let soc = (0..n).map(|k| k as f64 / (n - 1) as f64).collect();
        Self::new(soc, voltage)
    }

    /// Reference table for the high-energy chemistry (11 points, SOC 0..1).
    pub fn default_high_energy() -> Self {
        Self::builtin(&[
            3.427, 3.508, 3.588, 3.621, 3.647, 3.684, 3.761, 3.829, 3.917, 4.019, 4.135,
        ])
    }

    /// Reference table for the high-power chemistry (11 points, SOC 0..1).
    pub fn default_high_power() -> Self {
        Self::builtin(&[
            2.067, 2.113, 2.151, 2.183, 2.217, 2.265, 2.326, 2.361, 2.427, 2.516, 2.653,
        ])
    }

    fn builtin(voltage: &[f64]) -> Self {
        let n = voltage.len();
        let soc: Vec<f64> = (0..n).map(|k| k as f64 / (n - 1) as f64).collect();
        let tangents = fritsch_carlson_tangents(&soc, voltage);
        Self {
            soc,
            voltage: voltage.to_vec(),
            tangents,
        }
    }

    pub fn soc_points(&self) -> &[f64] {
        &self.soc
    }

    pub fn voltage_points(&self) -> &[f64] {
        &self.voltage
    }

    /// Piecewise-linear OCV, clamped to the end values outside the table.
    pub fn eval_linear(&self, soc: f64) -> f64 {
        let n = self.soc.len();
        if soc <= self.soc[0] {
            return self.voltage[0];
        }
        if soc >= self.soc[n - 1] {
            return self.voltage[n - 1];
        }
        let k = self.segment(soc);
        let t = (soc - self.soc[k]) / (self.soc[k + 1] - self.soc[k]);
        self.voltage[k] + t * (self.voltage[k + 1] - self.voltage[k])
    }

    /// Smooth OCV for use inside the optimizer.
    pub fn eval_smooth(&self, soc: f64) -> f64 {
        self.eval_with_derivative(soc).0
    }

    /// dOCV/dSOC of [`eval_smooth`](Self::eval_smooth).
    pub fn derivative_smooth(&self, soc: f64) -> f64 {
        self.eval_with_derivative(soc).1
    }

    /// Value and slope of the smooth interpolant in one pass.
    pub fn eval_with_derivative(&self, soc: f64) -> (f64, f64) {
        let n = self.soc.len();
        if soc <= self.soc[0] {
            let m = self.tangents[0];
            return (self.voltage[0] + m * (soc - self.soc[0]), m);
        }
        if soc >= self.soc[n - 1] {
            let m = self.tangents[n - 1];
            return (self.voltage[n - 1] + m * (soc - self.soc[n - 1]), m);
        }

        let k = self.segment(soc);
        let h = self.soc[k + 1] - self.soc[k];
        let t = (soc - self.soc[k]) / h;
        let (y0, y1) = (self.voltage[k], self.voltage[k + 1]);
        let (m0, m1) = (self.tangents[k] * h, self.tangents[k + 1] * h);

        let t2 = t * t;
        let t3 = t2 * t;
        let value = (2.0 * t3 - 3.0 * t2 + 1.0) * y0
            + (t3 - 2.0 * t2 + t) * m0
            + (-2.0 * t3 + 3.0 * t2) * y1
            + (t3 - t2) * m1;
        let slope = ((6.0 * t2 - 6.0 * t) * y0
            + (3.0 * t2 - 4.0 * t + 1.0) * m0
            + (-6.0 * t2 + 6.0 * t) * y1
            + (3.0 * t2 - 2.0 * t) * m1)
            / h;
        (value, slope)
    }

    /// Index k such that soc[k] <= x < soc[k+1]. Caller guarantees x is interior.
    fn segment(&self, x: f64) -> usize {
        let idx = self.soc.partition_point(|&s| s <= x);
        idx.saturating_sub(1).min(self.soc.len() - 2)
    }
}

fn fritsch_carlson_tangents(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let secants: Vec<f64> = (0..n - 1)
        .map(|k| (y[k + 1] - y[k]) / (x[k + 1] - x[k]))
        .collect();

    let mut m = vec![0.0; n];
    m[0] = secants[0];
    m[n - 1] = secants[n - 2];
    for k in 1..n - 1 {
        m[k] = if secants[k - 1] * secants[k] <= 0.0 {
            0.0
        } else {
            0.5 * (secants[k - 1] + secants[k])
        };
    }

    for k in 0..n - 1 {
        let d = secants[k];
        if d == 0.0 {
            m[k] = 0.0;
            m[k + 1] = 0.0;
            continue;
        }
        let alpha = m[k] / d;
        let beta = m[k + 1] / d;
        let r = alpha * alpha + beta * beta;
        if r > 9.0 {
            let tau = 3.0 / r.sqrt();
            m[k] = tau * alpha * d;
            m[k + 1] = tau * beta * d;
        }
    }
    m
}

//! Risk scoring.
//!
//! The risk score is a convex combination of normalized pressure, normalized
//! activity, the compromise indicator and distrust (`1 - trust`), clamped to
//! `[0, 1]`. With non-negative weights the score is non-decreasing in
//! pressure, activity and the compromise indicator.

use crate::config::{DynamicsConfig, RiskWeights};

/// Metrics the risk score is computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskInputs {
    pub pressure: f64,
    pub activity: f64,
    pub trust: f64,
    pub compromised: bool,
}

/// Score an agent's metrics against the configured ceilings.
pub fn risk_score(inputs: RiskInputs, dynamics: &DynamicsConfig, weights: &RiskWeights) -> f64 {
    let pressure = (inputs.pressure / dynamics.max_pressure).clamp(0.0, 1.0);
    let activity = (inputs.activity / dynamics.max_activity).clamp(0.0, 1.0);
    let compromise = if inputs.compromised { 1.0 } else { 0.0 };
    let distrust = 1.0 - inputs.trust.clamp(0.0, 1.0);

    let score = weights.pressure * pressure
        + weights.activity * activity
        + weights.compromise * compromise
        + weights.distrust * distrust;
    score.clamp(0.0, 1.0)
}

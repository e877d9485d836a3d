// src/error.rs
// Error taxonomy for the integrator, the frame loop and the web surface.
// step() never returns these: a diverged state keeps its inf/NaN values and the frame loop reports it.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PendulumError {
    #[error("arm {index}: mass must be positive and finite, got {value}")]
    NonPositiveMass { index: usize, value: f64 },

    #[error("arm {index}: length must be positive and finite, got {value}")]
    NonPositiveLength { index: usize, value: f64 },

    #[error("a pendulum has one or two arms, got {0}")]
    ArmCount(usize),

    #[error("time step must be positive and finite, got {0}")]
    InvalidTimeStep(f64),

    #[error("simulation duration must be positive and finite, got {0}")]
    InvalidDuration(f64),

    #[error("gravity must be a positive finite magnitude, got {0}")]
    InvalidGravity(f64),

    #[error("duration {t_max} is shorter than one time step of {dt}")]
    NoFrames { dt: f64, t_max: f64 },

    /// `requested` is floor(t_max / dt); it may exceed any integer type.
    #[error("{requested} frames requested, at most {limit} allowed")]
    TooManyFrames { requested: f64, limit: usize },

    /// The state went non-finite; `det` is the last coupling determinant (NaN in single-arm mode).
    #[error("state became non-finite at frame {frame} (det = {det})")]
    NumericDegeneracy { frame: usize, det: f64 },

    #[error("could not parse {field}: {value:?}")]
    Parse { field: &'static str, value: String },
}

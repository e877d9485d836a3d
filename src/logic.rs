// src/logic.rs
// Owns the pendulum state and advances it with a fixed-step semi-implicit Euler scheme.
// One arm: velocity from the current angle, then angle from the new velocity.
// Two arms: angles from the pre-step velocities, then velocities from coefficients evaluated
// at the new angles and the old velocities. The two orders differ and are kept as they are.
// simulate() is the frame loop a renderer would drive: read the joints, then step, floor(t_max/dt) times.

use crate::error::PendulumError;
use crate::math::{self, Coefficients, DoubleParams, STANDARD_GRAVITY};
use tracing::{debug, info, warn};

/// One rigid rod with a point mass at its free end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arm {
    pub mass: f64,
    pub length: f64,
    pub angle: f64,            // Radians from the downward vertical.
    pub angular_velocity: f64, // d(angle)/dt.
}

impl Arm {
    pub fn new(mass: f64, length: f64, angle: f64, angular_velocity: f64) -> Self {
        Self {
            mass,
            length,
            angle,
            angular_velocity,
        }
    }

    fn validate(&self, index: usize) -> Result<(), PendulumError> {
        if !(self.mass > 0.0 && self.mass.is_finite()) {
            return Err(PendulumError::NonPositiveMass {
                index,
                value: self.mass,
            });
        }
        if !(self.length > 0.0 && self.length.is_finite()) {
            return Err(PendulumError::NonPositiveLength {
                index,
                value: self.length,
            });
        }
        Ok(())
    }

    fn is_finite(&self) -> bool {
        self.angle.is_finite() && self.angular_velocity.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Chain {
    Single(Arm),
    Double([Arm; 2]),
}

/// A single or double pendulum hanging from a fixed pivot at the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct PendulumSystem {
    chain: Chain,
    g: f64,                // Gravity magnitude, acting toward -y.
    last_det: Option<f64>, // det of the most recent double step.
}

impl PendulumSystem {
    fn from_chain(chain: Chain) -> Self {
        Self {
            chain,
            g: STANDARD_GRAVITY,
            last_det: None,
        }
    }

    pub fn single(arm: Arm) -> Result<Self, PendulumError> {
        arm.validate(0)?;
        Ok(Self::from_chain(Chain::Single(arm)))
    }

    pub fn double(upper: Arm, lower: Arm) -> Result<Self, PendulumError> {
        upper.validate(0)?;
        lower.validate(1)?;
        Ok(Self::from_chain(Chain::Double([upper, lower])))
    }

    /// Builds a system from an ordered list of arms, pivot side first.
    pub fn new(arms: &[Arm]) -> Result<Self, PendulumError> {
        match *arms {
            [arm] => Self::single(arm),
            [upper, lower] => Self::double(upper, lower),
            _ => Err(PendulumError::ArmCount(arms.len())),
        }
    }

    /// Replaces the gravity magnitude (default 9.81); it must be positive and finite.
    pub fn with_gravity(mut self, g: f64) -> Result<Self, PendulumError> {
        if !(g > 0.0 && g.is_finite()) {
            return Err(PendulumError::InvalidGravity(g));
        }
        self.g = g;
        Ok(self)
    }

    pub fn arms(&self) -> &[Arm] {
        match &self.chain {
            Chain::Single(arm) => std::slice::from_ref(arm),
            Chain::Double(arms) => arms,
        }
    }

    pub fn gravity(&self) -> f64 {
        self.g
    }

    /// Coupling coefficients for the current state; `None` for a single arm.
    pub fn coefficients(&self) -> Option<Coefficients> {
        match &self.chain {
            Chain::Single(_) => None,
            Chain::Double([upper, lower]) => Some(math::coefficients(
                &double_params(upper, lower, self.g),
                upper.angle,
                lower.angle,
                upper.angular_velocity,
                lower.angular_velocity,
            )),
        }
    }

    /// Advances the state by `dt` in place.
    pub fn step(&mut self, dt: f64) {
        let g = self.g;
        match &mut self.chain {
            Chain::Single(arm) => {
                arm.angular_velocity += math::single_acceleration(-g, arm.length, arm.angle) * dt;
                arm.angle += arm.angular_velocity * dt;
            }
            Chain::Double([upper, lower]) => {
                upper.angle += upper.angular_velocity * dt;
                lower.angle += lower.angular_velocity * dt;

                // New angles, old velocities.
                let coeffs = math::coefficients(
                    &double_params(upper, lower, g),
                    upper.angle,
                    lower.angle,
                    upper.angular_velocity,
                    lower.angular_velocity,
                );
                let (alpha1, alpha2) = coeffs.angular_accelerations();
                upper.angular_velocity += alpha1 * dt;
                lower.angular_velocity += alpha2 * dt;
                self.last_det = Some(coeffs.det);
            }
        }
    }

    pub fn joint_positions(&self) -> Vec<(f64, f64)> {
        math::joint_positions(self.arms())
    }

    pub fn kinetic_energy(&self) -> f64 {
        math::kinetic_energy(self.arms())
    }

    pub fn potential_energy(&self) -> f64 {
        math::potential_energy(self.arms(), self.g)
    }

    pub fn total_energy(&self) -> f64 {
        self.kinetic_energy() + self.potential_energy()
    }

    pub fn is_finite(&self) -> bool {
        self.arms().iter().all(Arm::is_finite)
    }

    /// Fails with `NumericDegeneracy` once any angle or angular velocity is inf/NaN.
    pub fn check_finite(&self, frame: usize) -> Result<(), PendulumError> {
        if self.is_finite() {
            Ok(())
        } else {
            Err(PendulumError::NumericDegeneracy {
                frame,
                det: self.last_det.unwrap_or(f64::NAN),
            })
        }
    }
}

fn double_params(upper: &Arm, lower: &Arm, g: f64) -> DoubleParams {
    DoubleParams {
        m1: upper.mass,
        m2: lower.mass,
        l1: upper.length,
        l2: lower.length,
        g,
    }
}

/// Joint coordinates and total energy sampled at the start of one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub time: f64,
    pub joints: Vec<(f64, f64)>,
    pub energy: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub dt: f64,
    pub frames: Vec<Frame>,
}

impl Trajectory {
    /// Largest distance any joint reached from the pivot.
    pub fn extent(&self) -> f64 {
        self.frames
            .iter()
            .flat_map(|frame| frame.joints.iter())
            .map(|&(x, y)| x.hypot(y))
            .fold(0.0, f64::max)
    }
}

/// Upper bound on frames per run, one hour of animation at 60 frames per second.
pub const MAX_FRAMES: usize = 216_000;

/// Number of frames the animation runs for, truncating like an integer cast.
/// At least one and at most `MAX_FRAMES` frames.
pub fn frame_count(dt: f64, t_max: f64) -> Result<usize, PendulumError> {
    if !(dt > 0.0 && dt.is_finite()) {
        return Err(PendulumError::InvalidTimeStep(dt));
    }
    if !(t_max > 0.0 && t_max.is_finite()) {
        return Err(PendulumError::InvalidDuration(t_max));
    }
    let requested = (t_max / dt).floor();
    if requested < 1.0 {
        return Err(PendulumError::NoFrames { dt, t_max });
    }
    if requested > MAX_FRAMES as f64 {
        return Err(PendulumError::TooManyFrames {
            requested,
            limit: MAX_FRAMES,
        });
    }
    Ok(requested as usize)
}

/// Runs the frame loop: record joints and energy, then step. Stops at the first non-finite state.
pub fn simulate(system: &mut PendulumSystem, dt: f64, t_max: f64) -> Result<Trajectory, PendulumError> {
    let frames = frame_count(dt, t_max)?;
    info!(arms = system.arms().len(), dt, t_max, frames, "starting simulation");

    let mut trajectory = Trajectory {
        dt,
        frames: Vec::new(),
    };
    for frame in 0..frames {
        if let Err(err) = system.check_finite(frame) {
            warn!(%err, "simulation diverged");
            return Err(err);
        }
        trajectory.frames.push(Frame {
            time: frame as f64 * dt,
            joints: system.joint_positions(),
            energy: system.total_energy(),
        });
        system.step(dt);
    }

    debug!(
        frames = trajectory.frames.len(),
        final_energy = system.total_energy(),
        "simulation finished"
    );
    Ok(trajectory)
}

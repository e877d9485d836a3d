// src/math.rs
// Pure functions behind the pendulum integrator: the double-pendulum coupling coefficients,
// the single-arm gravity acceleration, joint coordinates and energies.
// Nothing here mutates state; logic.rs decides which values (pre- or post-update) get passed in.
// Angles are measured from the downward vertical, positive toward +x; the pivot sits at the origin.

use crate::logic::Arm;

/// Gravitational acceleration magnitude used when none is given.
pub const STANDARD_GRAVITY: f64 = 9.81;

/// Fixed parameters of a two-arm chain: masses, lengths and gravity magnitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoubleParams {
    pub m1: f64,
    pub m2: f64,
    pub l1: f64,
    pub l2: f64,
    pub g: f64,
}

impl DoubleParams {
    /// m2·l2 / ((m1+m2)·l1), shared by A and C.
    fn mass_length_ratio(&self) -> f64 {
        (self.m2 * self.l2) / ((self.m1 + self.m2) * self.l1)
    }
}

/// The 2x2 linear system solved each double-pendulum step for the angular accelerations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub det: f64,
}

impl Coefficients {
    /// Returns (α1, α2) = ((C - A·D)/det, (D - B·C)/det).
    /// No guard on det: a singular system gives ±inf or NaN.
    pub fn angular_accelerations(&self) -> (f64, f64) {
        let alpha1 = (self.c - self.a * self.d) / self.det;
        let alpha2 = (self.d - self.b * self.c) / self.det;
        (alpha1, alpha2)
    }
}

pub fn coefficient_a(p: &DoubleParams, theta1: f64, theta2: f64) -> f64 {
    p.mass_length_ratio() * (theta1 - theta2).cos()
}

pub fn coefficient_b(p: &DoubleParams, theta1: f64, theta2: f64) -> f64 {
    (p.l1 / p.l2) * (theta1 - theta2).cos()
}

pub fn coefficient_c(p: &DoubleParams, theta1: f64, theta2: f64, omega2: f64) -> f64 {
    -p.mass_length_ratio() * omega2 * omega2 * (theta1 - theta2).sin() - (p.g / p.l1) * theta1.sin()
}

pub fn coefficient_d(p: &DoubleParams, theta1: f64, theta2: f64, omega1: f64) -> f64 {
    (p.l1 * omega1 * omega1 * (theta1 - theta2).sin() - p.g * theta2.sin()) / p.l2
}

/// Evaluates A, B, C, D and det = 1 - A·B for the given angles and angular velocities.
pub fn coefficients(p: &DoubleParams, theta1: f64, theta2: f64, omega1: f64, omega2: f64) -> Coefficients {
    let a = coefficient_a(p, theta1, theta2);
    let b = coefficient_b(p, theta1, theta2);
    let c = coefficient_c(p, theta1, theta2, omega2);
    let d = coefficient_d(p, theta1, theta2, omega1);
    Coefficients { a, b, c, d, det: 1.0 - a * b }
}

/// Angular acceleration of a single rigid pendulum.
/// `signed_gravity` is the vertical acceleration along +y, so -9.81 pulls the bob down.
pub fn single_acceleration(signed_gravity: f64, length: f64, angle: f64) -> f64 {
    (signed_gravity / length) * angle.sin()
}

/// Pivot followed by the end point of every arm, each arm hanging from the previous one.
pub fn joint_positions(arms: &[Arm]) -> Vec<(f64, f64)> {
    let mut joints = Vec::with_capacity(arms.len() + 1);
    let (mut x, mut y) = (0.0, 0.0);
    joints.push((x, y));
    for arm in arms {
        x += arm.length * arm.angle.sin();
        y -= arm.length * arm.angle.cos();
        joints.push((x, y));
    }
    joints
}

/// Sum of ½·m·|v|² over the bobs; each bob's velocity accumulates the arms above it.
pub fn kinetic_energy(arms: &[Arm]) -> f64 {
    let (mut vx, mut vy) = (0.0, 0.0);
    let mut energy = 0.0;
    for arm in arms {
        vx += arm.length * arm.angular_velocity * arm.angle.cos();
        vy += arm.length * arm.angular_velocity * arm.angle.sin();
        energy += 0.5 * arm.mass * (vx * vx + vy * vy);
    }
    energy
}

/// Sum of m·g·y over the bobs, zero at the pivot height (so a hanging chain is negative).
pub fn potential_energy(arms: &[Arm], g: f64) -> f64 {
    joint_positions(arms)
        .iter()
        .skip(1)
        .zip(arms)
        .map(|(&(_, y), arm)| arm.mass * g * y)
        .sum()
}

// src/lib.rs
// Single and double pendulum simulation with a fixed-step semi-implicit Euler integrator,
// plus the actix-web surface that serves trajectories to the browser.

pub mod config;
pub mod error;
pub mod logic;
pub mod math;
pub mod ui;

pub use error::PendulumError;
pub use logic::{simulate, Arm, Frame, PendulumSystem, Trajectory};

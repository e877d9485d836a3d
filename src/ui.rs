// src/ui.rs
// POST /simulate: parse the form lists, run the frame loop on the blocking pool and answer with
// per-frame positions, energies and an optional PNG of the trajectories.

use crate::error::PendulumError;
use crate::logic::{simulate, Arm, PendulumSystem, Trajectory};
use crate::math::STANDARD_GRAVITY;
use actix_web::{web, HttpResponse, Result};
use base64::{engine::general_purpose, Engine as _};
use image::ImageFormat;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::{self, Cursor};
use tracing::{debug, info, warn};

fn default_dt() -> f64 {
    0.1
}

fn default_t_max() -> f64 {
    10.0
}

fn default_gravity() -> f64 {
    STANDARD_GRAVITY
}

fn default_plot() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct SimParams {
    masses: String,         // Comma-separated masses, one or two values
    lengths: String,        // Comma-separated lengths
    initial_angles: String, // Comma-separated initial angles (degrees)
    #[serde(default)]
    initial_ang_vels: Option<String>, // Comma-separated angular velocities (degrees/s), zero if absent
    #[serde(default = "default_dt")]
    dt: f64, // Fixed time step per frame
    #[serde(default = "default_t_max")]
    t_max: f64, // Simulated duration; frame count is floor(t_max / dt)
    #[serde(default = "default_gravity")]
    gravity: f64, // Gravity magnitude
    #[serde(default = "default_plot")]
    plot: bool, // Whether to render the trajectory PNG
}

#[derive(Debug, Serialize)]
struct SimResponse {
    success: bool,                 // Whether the simulation succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,         // Why it failed, when it did
    trajectory_image: String,      // Base64-encoded PNG image of trajectories (empty if not plotted)
    animation_data: AnimationData, // Raw position data for frontend animation
    energy: Vec<f64>,              // Total energy per frame
}

#[derive(Debug, Serialize)]
struct AnimationData {
    positions: Vec<Vec<f64>>, // Positions over time: [x1, y1, x2, y2]
    n: usize,                 // Number of arms
    limit: f64,               // Plot boundary limit for consistent scaling
    dt: f64,                  // Seconds between frames
}

impl SimResponse {
    fn failure(err: &PendulumError) -> Self {
        Self {
            success: false,
            error: Some(err.to_string()),
            trajectory_image: String::new(),
            animation_data: AnimationData {
                positions: vec![],
                n: 0,
                limit: 0.0,
                dt: 0.0,
            },
            energy: vec![],
        }
    }
}

/// Splits a comma-separated list of numbers, rejecting anything that does not parse.
fn parse_list(field: &'static str, raw: &str) -> Result<Vec<f64>, PendulumError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse().map_err(|_| PendulumError::Parse {
                field,
                value: s.to_string(),
            })
        })
        .collect()
}

/// Builds the pendulum described by the request; every list must have one entry per arm.
pub fn build_system(params: &SimParams) -> Result<PendulumSystem, PendulumError> {
    let masses = parse_list("masses", &params.masses)?;
    let lengths = parse_list("lengths", &params.lengths)?;
    let angles_deg = parse_list("initial_angles", &params.initial_angles)?;
    // A blank list means the same as leaving the field out: start at rest
    let ang_vels_deg = match &params.initial_ang_vels {
        Some(raw) => parse_list("initial_ang_vels", raw)?,
        None => vec![],
    };
    let ang_vels_deg = if ang_vels_deg.is_empty() {
        vec![0.0; masses.len()]
    } else {
        ang_vels_deg
    };

    let n = masses.len();
    for (field, len) in [
        ("lengths", lengths.len()),
        ("initial_angles", angles_deg.len()),
        ("initial_ang_vels", ang_vels_deg.len()),
    ] {
        if len != n {
            return Err(PendulumError::Parse {
                field,
                value: format!("expected {n} values, got {len}"),
            });
        }
    }

    let arms: Vec<Arm> = (0..n)
        .map(|k| {
            Arm::new(
                masses[k],
                lengths[k],
                angles_deg[k].to_radians(),
                ang_vels_deg[k].to_radians(),
            )
        })
        .collect();

    PendulumSystem::new(&arms)?.with_gravity(params.gravity)
}

/// Renders every bob's path into a PNG and returns it as a data URL.
/// Draws no text, so it works without any system fonts installed.
pub fn render_trajectory(trajectory: &Trajectory, n: usize, limit: f64) -> io::Result<String> {
    const W: u32 = 500;
    const H: u32 = 500;

    // RGB, 3 bytes per pixel
    let mut pixel_buffer = vec![0u8; (W * H * 3) as usize];

    {
        let root = BitMapBackend::with_buffer(&mut pixel_buffer, (W, H)).into_drawing_area();

        root.fill(&WHITE).map_err(io::Error::other)?;

        // Square chart so the arms keep their proportions
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .build_cartesian_2d(-limit..limit, -limit..limit)
            .map_err(io::Error::other)?;

        // Axes through the pivot
        let axis = BLACK.mix(0.3).stroke_width(1);
        for line in [[(-limit, 0.0), (limit, 0.0)], [(0.0, -limit), (0.0, limit)]] {
            chart
                .draw_series(LineSeries::new(line, axis))
                .map_err(io::Error::other)?;
        }

        let colors = [BLUE.mix(0.75).stroke_width(1), RED.mix(0.75).stroke_width(1)];

        // joints[0] is the pivot, so bob k lives at joints[k + 1]
        for (k, color) in colors.iter().enumerate().take(n) {
            chart
                .draw_series(LineSeries::new(
                    trajectory.frames.iter().map(|frame| frame.joints[k + 1]),
                    *color,
                ))
                .map_err(io::Error::other)?;
        }

        // Final arm configuration drawn on top of the paths
        if let Some(last) = trajectory.frames.last() {
            chart
                .draw_series(LineSeries::new(last.joints.iter().copied(), BLACK.stroke_width(2)))
                .map_err(io::Error::other)?;
        }

        root.present().map_err(io::Error::other)?;
    }

    let img_buffer = image::ImageBuffer::from_raw(W, H, pixel_buffer)
        .ok_or_else(|| io::Error::other("Failed to create image buffer"))?;

    let dynamic_image = image::DynamicImage::ImageRgb8(img_buffer);

    let mut png_buffer = Cursor::new(Vec::new());
    dynamic_image
        .write_to(&mut png_buffer, ImageFormat::Png)
        .map_err(|e| io::Error::other(e.to_string()))?;

    Ok(format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(png_buffer.into_inner())
    ))
}

/// Runs the whole request: build, simulate, flatten positions, optionally plot.
fn run_simulation(params: &SimParams) -> io::Result<SimResponse> {
    let mut system = match build_system(params) {
        Ok(system) => system,
        Err(err) => {
            warn!(%err, "rejected simulation parameters");
            return Ok(SimResponse::failure(&err));
        }
    };
    let n = system.arms().len();

    let trajectory = match simulate(&mut system, params.dt, params.t_max) {
        Ok(trajectory) => trajectory,
        Err(err) => return Ok(SimResponse::failure(&err)),
    };

    // Total arm length bounds every joint; pad like the plot axes
    let sum_l: f64 = system.arms().iter().map(|arm| arm.length).sum();
    let limit = sum_l * 1.1;

    // [time][x1, y1, x2, y2], pivot dropped
    let positions: Vec<Vec<f64>> = trajectory
        .frames
        .iter()
        .map(|frame| frame.joints[1..].iter().flat_map(|&(x, y)| [x, y]).collect())
        .collect();
    let energy = trajectory.frames.iter().map(|frame| frame.energy).collect();

    let trajectory_image = if params.plot {
        render_trajectory(&trajectory, n, limit)?
    } else {
        String::new()
    };
    debug!(frames = positions.len(), image_bytes = trajectory_image.len(), "simulation response ready");

    Ok(SimResponse {
        success: true,
        error: None,
        trajectory_image,
        animation_data: AnimationData {
            positions,
            n,
            limit,
            dt: params.dt,
        },
        energy,
    })
}

pub async fn simulate_handler(params: web::Json<SimParams>) -> Result<HttpResponse> {
    let params = params.into_inner();
    info!(masses = %params.masses, lengths = %params.lengths, dt = params.dt, t_max = params.t_max, "simulate request");

    // Integration and PNG encoding are CPU-bound; keep them off the actix worker
    let response = tokio::task::spawn_blocking(move || run_simulation(&params))
        .await
        .map_err(io::Error::other)??;

    Ok(HttpResponse::Ok().json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test as actix_test, App};
    use base64::Engine as _;
    use serde_json::{json, Value};

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn decode_png_data_url(url: &str) -> Vec<u8> {
        let payload = url
            .strip_prefix("data:image/png;base64,")
            .unwrap_or_else(|| panic!("not a PNG data URL: {}", &url[..url.len().min(40)]));
        general_purpose::STANDARD.decode(payload).unwrap()
    }

    fn params(value: Value) -> SimParams {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parse_list_trims_and_rejects_garbage() {
        assert_eq!(parse_list("masses", " 1, 2.5 ,"), Ok(vec![1.0, 2.5]));
        assert_eq!(
            parse_list("masses", "1,x"),
            Err(PendulumError::Parse { field: "masses", value: "x".to_string() })
        );
    }

    #[test]
    fn build_system_converts_degrees() {
        let p = params(json!({
            "masses": "1,2",
            "lengths": "1,0.5",
            "initial_angles": "90,0",
            "initial_ang_vels": "180,0",
            "gravity": 1.62
        }));
        let system = build_system(&p).unwrap();
        let arms = system.arms();
        assert_eq!(arms.len(), 2);
        assert!((arms[0].angle - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!((arms[0].angular_velocity - std::f64::consts::PI).abs() < 1e-12);
        assert_eq!(arms[1].mass, 2.0);
        assert_eq!(system.gravity(), 1.62);
        assert_eq!(p.dt, 0.1);
        assert_eq!(p.t_max, 10.0);
    }

    #[test]
    fn build_system_rejects_length_mismatch() {
        let p = params(json!({ "masses": "1,2", "lengths": "1", "initial_angles": "10,20" }));
        assert!(matches!(
            build_system(&p),
            Err(PendulumError::Parse { field: "lengths", .. })
        ));
    }

    #[actix_web::test]
    async fn simulate_endpoint_returns_frames() {
        let app = actix_test::init_service(App::new().route("/simulate", web::post().to(simulate_handler))).await;
        let req = actix_test::TestRequest::post()
            .uri("/simulate")
            .set_json(json!({
                "masses": "1,1",
                "lengths": "1,1",
                "initial_angles": "60,30",
                "dt": 0.05,
                "t_max": 1.0,
                "plot": false
            }))
            .to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["success"], true);
        assert!(body.get("error").is_none());
        assert_eq!(body["trajectory_image"], "");
        let data = &body["animation_data"];
        assert_eq!(data["n"], 2);
        assert!((data["limit"].as_f64().unwrap() - 2.2).abs() < 1e-12);
        let positions = data["positions"].as_array().unwrap();
        assert_eq!(positions.len(), 20);
        assert_eq!(positions[0].as_array().unwrap().len(), 4);
        assert_eq!(body["energy"].as_array().unwrap().len(), 20);
    }

    #[actix_web::test]
    async fn simulate_endpoint_reports_bad_input() {
        let app = actix_test::init_service(App::new().route("/simulate", web::post().to(simulate_handler))).await;
        let req = actix_test::TestRequest::post()
            .uri("/simulate")
            .set_json(json!({ "masses": "0", "lengths": "1", "initial_angles": "10" }))
            .to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "arm 0: mass must be positive and finite, got 0");
        assert!(body["animation_data"]["positions"].as_array().unwrap().is_empty());
    }

    #[test]
    fn build_system_treats_blank_velocities_as_rest() {
        let p = params(json!({
            "masses": "1,1",
            "lengths": "1,1",
            "initial_angles": "30,10",
            "initial_ang_vels": " "
        }));
        let system = build_system(&p).unwrap();
        assert!(system.arms().iter().all(|arm| arm.angular_velocity == 0.0));
    }

    #[test]
    fn build_system_rejects_bad_gravity() {
        let p = params(json!({
            "masses": "1",
            "lengths": "1",
            "initial_angles": "10",
            "gravity": -9.81
        }));
        assert_eq!(build_system(&p).unwrap_err(), PendulumError::InvalidGravity(-9.81));

        let p = SimParams {
            gravity: f64::NAN,
            ..params(json!({ "masses": "1", "lengths": "1", "initial_angles": "10" }))
        };
        assert!(matches!(
            build_system(&p),
            Err(PendulumError::InvalidGravity(g)) if g.is_nan()
        ));
    }

    #[test]
    fn render_trajectory_produces_png_data_url() {
        let mut system = build_system(&params(json!({
            "masses": "1,1",
            "lengths": "1,1",
            "initial_angles": "90,45"
        })))
        .unwrap();
        let trajectory = simulate(&mut system, 0.05, 1.0).unwrap();

        let url = render_trajectory(&trajectory, 2, 2.2).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
        let png = decode_png_data_url(&url);
        assert_eq!(png[..8], PNG_SIGNATURE);
    }

    #[actix_web::test]
    async fn simulate_endpoint_plots_by_default() {
        let app = actix_test::init_service(App::new().route("/simulate", web::post().to(simulate_handler))).await;
        let req = actix_test::TestRequest::post()
            .uri("/simulate")
            .set_json(json!({
                "masses": "1",
                "lengths": "2",
                "initial_angles": "30",
                "dt": 0.1,
                "t_max": 1.0
            }))
            .to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["animation_data"]["positions"].as_array().unwrap().len(), 10);
        let png = decode_png_data_url(body["trajectory_image"].as_str().unwrap());
        assert_eq!(png[..8], PNG_SIGNATURE);
    }

    #[actix_web::test]
    async fn simulate_endpoint_rejects_runs_without_frames_or_with_too_many() {
        let app = actix_test::init_service(App::new().route("/simulate", web::post().to(simulate_handler))).await;
        for (dt, t_max) in [(1.0, 0.5), (1e-300, 10.0)] {
            let req = actix_test::TestRequest::post()
                .uri("/simulate")
                .set_json(json!({
                    "masses": "1",
                    "lengths": "1",
                    "initial_angles": "10",
                    "dt": dt,
                    "t_max": t_max,
                    "plot": false
                }))
                .to_request();
            let body: Value = actix_test::call_and_read_body_json(&app, req).await;
            assert_eq!(body["success"], false, "dt {dt}, t_max {t_max}");
            assert!(body["animation_data"]["positions"].as_array().unwrap().is_empty());
        }
    }
}

//! HTTP API handlers for brt-cam

pub mod health;
pub mod maintenance;
pub mod manual;
pub mod observations;
pub mod upload;

pub use health::{health_routes, list_lines, service_root};
pub use maintenance::run_retention;
pub use manual::register_manual;
pub use observations::{recent_observations, stop_predictions, ObservationView};
pub use upload::upload_image;

//! Pipeline orchestration: the retry controller and the runner that
//! drives a record from raw input to a looping GIF.

pub mod controller;
mod runner;

pub use controller::{next_state, route_input, ControllerState};
pub use runner::Pipeline;

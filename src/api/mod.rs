//! Outer surfaces: startup wiring, the HTTP server and the command line.

pub mod cli;
pub mod http;
pub mod startup;

pub use cli::{run, Cli, Commands};
pub use http::{router, serve};
pub use startup::{build_predictor, predictor_from_config, ServingDeps};

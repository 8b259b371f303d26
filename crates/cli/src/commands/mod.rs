//! CLI command implementations.

mod demo;
mod fingerprint;

pub use demo::run_demo;
pub use fingerprint::show_fingerprint;

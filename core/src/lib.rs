//! Office seat simulator core.
//!
//! Monte Carlo estimation of seat shortages under attendance policies:
//! preferences in, per-scenario statistics out. Everything here is pure
//! computation except `store`, which persists finished studies.

pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod history;
pub mod host;
pub mod message;
pub mod policy;
pub mod population;
pub mod result;
pub mod rng;
pub mod sampler;
pub mod store;
pub mod types;

//! Regulatory capital and stress-testing engines for a bank's risk function.
//!
//! Every engine is a synchronous calculator over in-memory records. Logging
//! goes through the `log` facade; the host binary decides where it lands.

pub mod backtesting;
pub mod config;
pub mod engine;
pub mod error;
pub mod exposure;
pub mod forward_looking;
pub mod monte_carlo;
pub mod pillar1;
pub mod pillar2;
pub mod pillar3;
pub mod reporting;
pub mod rng;
pub mod sample;
pub mod scenario;
pub mod snapshot;
pub mod stats;
pub mod types;

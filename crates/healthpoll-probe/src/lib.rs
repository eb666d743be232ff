//! healthpoll-probe — gRPC liveness polling for healthpoll.
//!
//! Checks a fixed set of endpoints with the standard gRPC health
//! protocol, one round at a time, sleeping a randomized interval between
//! rounds.
//!
//! # Architecture
//!
//! ```text
//! run_polling()
//!   ├── HealthPoller::run_round()
//!   │   └── join_all(LivenessCheck::check_liveness) per endpoint
//!   ├── JitterScheduler::next_delay()  u² × max_delay, u from the OS CSPRNG
//!   └── sleep, or exit on shutdown
//! ```
//!
//! # Failure handling
//!
//! A failing endpoint is logged and skipped; it never fails the round,
//! and it is checked again next round. There is no retry or backoff on
//! failure.

pub mod client;
pub mod driver;
pub mod endpoint;
pub mod error;
pub mod jitter;
pub mod poller;

pub use client::{GrpcLivenessClient, LivenessCheck};
pub use driver::run_polling;
pub use endpoint::Endpoint;
pub use error::{CheckError, CheckResult, ProbeError};
pub use jitter::{JitterScheduler, OsRandom, RandomSource, DEFAULT_MAX_DELAY};
pub use poller::{HealthPoller, RoundReport, DEFAULT_SERVICE};

//! Poseidon Deploy - resilient GitHub deployments to Vercel and Render
//!
//! - **Detection**: framework and monorepo root guesses from `package.json`
//! - **Orchestration**: strategy retry with backoff, env var reconciliation
//! - **Polling**: deployment status to a terminal state, with cancellation

pub mod config;
pub mod deploy;
pub mod detect;
pub mod error;
pub mod github;
pub mod handlers;
pub mod providers;
pub mod server;
pub mod shared;

//! # duel-client
//!
//! Client side of a head-to-head coding duel: join a matchmaking queue,
//! receive a problem, run solutions against a remote judge and finish the
//! duel before a ten minute countdown runs out.
//!
//! ## Modules
//!
//! - [`client`]: the [`DuelSession`] state machine and its async runtime
//! - [`protocol`]: server frames, client commands and judge payloads
//! - [`models`]: problems and submission languages
//! - [`config`]: endpoints and timeouts
//! - [`error`]: error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use duel_client::{ClientConfig, client};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     client::run(ClientConfig::from_env(), Some("alice".to_string())).await
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod protocol;

pub use client::{DuelSession, DuelState, SessionEvent};
pub use config::ClientConfig;
pub use error::{DuelError, RunnerError, TransportError};
pub use models::{Language, Problem};

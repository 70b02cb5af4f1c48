// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod agent;
pub mod config;
pub mod document;
pub mod notify;
pub mod patch;
pub mod resolver;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::agent::{Agent, RunOptions, RunOutcome, RunReport, RunState, Stage};
pub use crate::config::{AgentConfig, AgentSettings, ConfigError, Credentials};
pub use crate::patch::{patch, DocumentPatcher, PatchError};
pub use crate::resolver::{NewsRecord, NewsResolver, ResolutionError};

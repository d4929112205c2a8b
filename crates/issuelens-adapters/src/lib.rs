//! Runtime adapters for issuelens (analysis service client, config, persisted state).

pub mod client;
pub mod config;
pub mod session;
pub mod stash;

pub use client::{AnalysisClient, AnalysisError, ClientConfig};
pub use config::{Config, ConfigError};
pub use session::{AnalysisSession, SubmitOutcome};
pub use stash::{AnalysisStash, FileStore, KeyValueStore, MemoryStore, StashError, StoreError};

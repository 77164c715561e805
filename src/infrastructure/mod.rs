//! Infrastructure layer - Framework implementations
//!
//! This layer contains:
//! - Database connection and migrations (db)
//! - HTTP server setup (server)
//! - Configuration loading (config)
//! - Per-entity write locks (locks)
//! - Repository implementations (repositories)
//! - Demo data (seed)
//! - Application state (state)

pub mod config;
pub mod db;
pub mod locks;
pub mod repositories;
pub mod seed;
pub mod server;
pub mod state;

pub use repositories::*;
pub use state::AppState;

//! # Steadfast
//!
//! A habit-recovery backend: daily check-ins build streaks, streak days earn
//! XP, and XP resolves to a level and a named tier. Usable both as a
//! standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! steadfast = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use steadfast::coach::CoachClient;
//! use steadfast::progression::LevelTable;
//! use steadfast::server::{AppState, create_router};
//! use steadfast::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data/steadfast.db").unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(
//!     Arc::new(store),
//!     Arc::new(LevelTable::builtin().clone()),
//!     CoachClient::disabled(),
//!     None,
//! ));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes CLI module. Disable with `default-features = false`.

pub mod auth;
pub mod billing;
#[cfg(feature = "cli")]
pub mod cli;
pub mod coach;
pub mod config;
pub mod error;
pub mod progression;
pub mod server;
pub mod store;
pub mod types;

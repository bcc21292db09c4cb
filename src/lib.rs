//! Single-user task tracker.
//!
//! A small REST API over a JSON-file backed [`TaskRepository`], plus the
//! static front-end that talks to it. The binary wires these together with
//! `tiny_http`; everything here is usable without a socket.

pub mod assets;
pub mod config;
pub mod error;
pub mod http;
pub mod model;
pub mod repo;
pub mod server;
pub mod storage;

pub use assets::StaticAssets;
pub use config::Config;
pub use error::{Result, StoreError};
pub use http::{ApiRequest, ApiResponse};
pub use model::{Analytics, Snapshot, Task, TaskInput};
pub use repo::{Committed, TaskRepository};

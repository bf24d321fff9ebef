// sleepiq-api: Async Rust client for the SleepIQ smart bed REST API

pub mod auth;
pub mod bed;
pub mod client;
pub mod error;
pub mod foundation;
pub mod models;
pub mod transport;

pub use auth::Session;
pub use client::{DEFAULT_BASE_URL, SleepIqClient};
pub use error::Error;
pub use models::{Actuator, SideCode};
pub use transport::{TlsMode, TransportConfig};

//! # Pitwall
//!
//! Real-time telemetry broadcast hub. Field devices POST telemetry samples
//! (vehicle sensor readings, GPS fixes) and every connected dashboard receives
//! them immediately over Server-Sent Events.
//!
//! ## Features
//!
//! - **Fan-out**: Each event is encoded once and buffered to every live viewer
//! - **Isolation**: Per-viewer bounded buffers; a viewer that falls behind is dropped, never waited on
//! - **Liveness**: Keep-alive comments on idle streams so proxies don't reap them
//! - **Clean teardown**: A viewer leaves the registry exactly once, however its stream ends
//!
//! ## Modules
//!
//! - [`broadcast`]: Hub, subscriptions and wire frames
//! - [`api`]: HTTP server with Axum
//! - [`config`]: TOML and environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pitwall::broadcast::{BroadcastHub, HubConfig, TelemetryEvent};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hub = Arc::new(BroadcastHub::new(HubConfig::default()));
//!
//!     // A viewer subscribes
//!     let mut viewer = hub.subscribe()?;
//!
//!     // A producer publishes
//!     let event = TelemetryEvent::from_slice(br#"{"speed": 42, "rpm": 3100}"#)?;
//!     hub.publish(&event)?;
//!
//!     // The viewer sees "connected", then the event
//!     for _ in 0..2 {
//!         if let Some(frame) = viewer.next_frame().await {
//!             println!("{:?}", frame.into_bytes());
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod broadcast;
pub mod config;

// Re-export top-level types for convenience
pub use broadcast::{
    events_handler, BroadcastHub, Frame, HubConfig, HubError, HubStats, PayloadError,
    PublishReport, Subscription, SubscriptionId, SubscriptionState, TelemetryEvent,
};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use config::{Config, ConfigError, LogFormat, LoggingConfig};

//! Real-Time Telemetry Broadcast
//!
//! Fans ingested telemetry out to live dashboard viewers over Server-Sent Events.
//!
//! ## Architecture
//!
//! - **BroadcastHub**: Registry of live subscriptions; publishes to each one's bounded buffer
//! - **Subscription**: One viewer's buffer and send loop (connected frame, telemetry, keep-alives)
//! - **Handler**: `GET /events`, turns a subscription into a streaming response
//! - **Messages**: Telemetry events and wire frames
//!
//! ## Example
//!
//! ```javascript
//! // Browser
//! const events = new EventSource('http://localhost:5000/events');
//!
//! events.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if (msg.type === 'connected') return;
//!   console.log('Telemetry:', msg);
//! };
//! ```

mod handler;
mod hub;
mod messages;
mod subscription;

pub use handler::events_handler;
pub use hub::{BroadcastHub, HubConfig, HubError, HubStats, PublishReport, SubscriptionId};
pub use messages::{Frame, PayloadError, TelemetryEvent};
pub use subscription::{Subscription, SubscriptionState};

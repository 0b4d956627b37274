//! Gateway collaborator boundary
//!
//! The real-time gateway connection is owned by an external client. This
//! module defines the typed events that client delivers and the two seams
//! the monitor plugs into:
//!
//! - [`EventHandler`]: receives events one at a time
//! - [`EventSource`]: drives a handler with events until the source ends
//!
//! [`ReplaySource`] is a source that reads recorded events, one JSON object
//! per line, from a file or standard input.

pub mod events;
pub mod replay;

pub use events::{Attachment, Author, ChannelKind, ChannelRef, GatewayEvent, MessagePayload};
pub use replay::{ReplayInput, ReplaySource};

use crate::error::Result;
use async_trait::async_trait;

/// Handler trait for processing gateway events.
///
/// Events are delivered sequentially; the handler takes `&mut self` so that
/// any state it owns is mutated by one event at a time.
///
/// # Example
///
/// ```rust
/// use chatmon::gateway::{EventHandler, GatewayEvent};
///
/// struct Counter(usize);
///
/// #[async_trait::async_trait]
/// impl EventHandler for Counter {
///     async fn handle(&mut self, _event: GatewayEvent) -> chatmon::Result<()> {
///         self.0 += 1;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait EventHandler: Send {
    /// Process a single event.
    ///
    /// Returning `Err` is logged by the source; it never stops the stream.
    async fn handle(&mut self, event: GatewayEvent) -> Result<()>;
}

/// Source of gateway events.
#[async_trait]
pub trait EventSource: Send {
    /// Deliver every available event to `handler`, in order.
    ///
    /// Returns the number of events delivered.
    async fn run(&mut self, handler: &mut (dyn EventHandler + Send)) -> Result<usize>;
}

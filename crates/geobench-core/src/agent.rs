//! The agent seam: anything that can turn a query into an event stream.
//!
//! The recorder only ever sees an [`AgentEventStream`]. How the events are
//! produced (LLM calls, tools, simulated reasoning) is the provider's business.

use futures::stream::BoxStream;

use crate::domain::{AgentError, AgentEvent, AgentSettings};

/// Lazy, finite, ordered sequence of agent events for one query.
///
/// An `Err` item is a stream failure; the recorder stops consuming at the
/// first one.
pub type AgentEventStream = BoxStream<'static, Result<AgentEvent, AgentError>>;

/// Produces agent event streams.
///
/// Every call must open an independent session (its own client, no shared
/// conversation memory) so that concurrent runs do not observe each other.
pub trait AgentProvider: Send + Sync {
    /// Start answering `query` under `settings` and return the event stream.
    fn run_query(&self, settings: &AgentSettings, query: &str) -> AgentEventStream;
}

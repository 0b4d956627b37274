//! Event monitoring core
//!
//! - [`facts`]: reduce a gateway event to the facts rules are matched on
//! - [`target`]: compiled target identifiers and their processing options
//! - [`matcher`]: evaluation of the three configured rule sets
//! - [`output`]: event records and output sinks
//! - [`dispatcher`]: per-event pipeline from facts to output
//! - [`logging`]: diagnostic logging setup

pub mod dispatcher;
pub mod facts;
pub mod logging;
pub mod matcher;
pub mod output;
pub mod target;

pub use dispatcher::EventDispatcher;
pub use facts::{extract_facts, EventFacts, EventType, Extraction};
pub use matcher::{MatchReport, MatchingEngine};
pub use output::{BufferSink, NotificationLog, OutputSink, StdoutSink};
pub use target::{ProcessingOption, ProcessingOptions, TargetIdentifier, TargetIdentifierConfig};

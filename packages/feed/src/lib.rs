#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Live complaint feed reconciliation.
//!
//! Merges three sources of the same underlying data (the initial nearby
//! fetch, the real-time push stream, and the periodic refresh) into one
//! deduplicated, distance-annotated feed. The [`FeedController`] holds
//! the session state and runs the per-complaint pipeline; [`run_feed`]
//! wires it to the clients and drives it until shutdown. Output goes
//! through the [`sink::RenderSink`] seam so embedders decide how records
//! are drawn.

pub mod controller;
pub mod driver;
pub mod location;
pub mod queue;
pub mod registry;
pub mod scheduler;
pub mod sink;
pub mod wire;

pub use controller::FeedController;
pub use driver::run_feed;
pub use location::resolve_viewer_location;
pub use sink::{CollectingSink, LogSink, NullSink, RenderSink, SinkError, null_sink};

//! Refresh cycle for the designer canvas.
//!
//! The canvas never talks to nodes directly. A [`DesignerWorker`] owns the
//! chart, polls every started node on an interval and publishes each new
//! chart over a [`DesignerBridge`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐  DesignerCommand   ┌────────────────┐  NodeService  ┌───────┐
//! │  Canvas  │ ─────────────────► │ DesignerWorker │ ────────────► │ nodes │
//! │          │ ◄───────────────── │  (tokio task)  │ ◄──────────── │       │
//! └──────────┘  DesignerMessage   └────────────────┘  NodeSnapshot └───────┘
//! ```

pub mod bridge;
pub mod worker;

pub use bridge::{DesignerBridge, DesignerCommand, DesignerMessage};
pub use worker::{DesignerWorker, PollOutcome};

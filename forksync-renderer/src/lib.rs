//! # forksync-renderer
//!
//! Tera-based rendering of the reconciliation pull request and the Slack
//! notification text.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use forksync_renderer::{MessageContext, MessageRenderer};
//! use forksync_core::{SyncConfig, SyncOutcome, TriggerEvent};
//!
//! fn notify_text(event: &TriggerEvent, config: &SyncConfig, outcome: &SyncOutcome) {
//!     if let Ok(renderer) = MessageRenderer::new(config.template_dir.as_deref()) {
//!         let ctx = MessageContext::new(event, config, &event.upstream, &event.base_branch);
//!         if let Ok(text) = renderer.notification(&ctx, outcome) {
//!             println!("{text}");
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::{MessageContext, OutcomeCtx};
pub use engine::{MessageKind, MessageRenderer};
pub use error::RenderError;

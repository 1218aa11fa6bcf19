//! # Markup View
//!
//! Incremental mirror of a remote document tree, with selection, keyboard
//! navigation and undoable edits.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ RemoteWalker (document on the other side)    │
//! └──────────────────────────────────────────────┘
//!        ↑ fetches / edits          ↓ mutation feed
//! ┌──────────────────────────────────────────────┐
//! │ MarkupView (async driver)                    │
//! │  - runs queued children fetches              │
//! │  - absorbs mutation batches                  │
//! │  - executes EditActions, keeps undo history  │
//! └──────────────────────────────────────────────┘
//!                       ↓
//! ┌──────────────────────────────────────────────┐
//! │ TreeMirror (sans-IO)                         │
//! │  - one container per imported node           │
//! │  - paged children windows                    │
//! │  - fetch tickets, stale result detection     │
//! └──────────────────────────────────────────────┘
//!                       ↓
//! ┌──────────────────────────────────────────────┐
//! │ rows / render / SelectionController          │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use markup_common::{DocumentSpec, MemoryDocument, NodeSpec};
//! use markup_view::{MarkupConfig, MarkupView};
//! use std::sync::Arc;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let doc = Arc::new(MemoryDocument::from_spec(&DocumentSpec {
//!     doctype: None,
//!     root: NodeSpec::element("html", &[], vec![NodeSpec::element("body", &[], vec![])]),
//! }));
//!
//! let view = MarkupView::new(doc, MarkupConfig::default()).await.unwrap();
//! assert_eq!(view.render(), "▸ <html>\n");
//! # });
//! ```

pub mod config;
pub mod container;
pub mod errors;
pub mod fetch_state;
pub mod mirror;
pub mod selection;
pub mod view;

pub use config::{MarkupConfig, DEFAULT_CONFIG_NAME, DEFAULT_MAX_CHILDREN, DEFAULT_NAVIGATION_PAGE};
pub use container::{MirrorNode, PageLimit, ShowMore};
pub use errors::{ConfigError, MarkupError, MarkupResult, MirrorError};
pub use fetch_state::{FetchEffect, FetchEvent, FetchState, FetchTicket};
pub use mirror::{
    Completion, FetchRequest, MirrorId, MutationOutcome, Refresh, RefreshOptions, Row, TreeMirror,
};
pub use selection::{Selection, SelectionController};
pub use view::{MarkupEvent, MarkupView, NavKey};

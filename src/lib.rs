//! # uiulator
//!
//! Two-way binding between a marked-up UI tree and an in-memory JSON data
//! graph. Nodes carry up to four markers; every `update()` walks the roots,
//! resolves a scope at each node and renders, expands or binds as the
//! markers say. Controls write edits straight back into the data graph.
//!
//! ## Markers
//!
//! | attribute | effect |
//! |---|---|
//! | `data-scope="path"` | narrows the scope for the node and its descendants |
//! | `data-expands="path"` | one clone per key (or per count) of the target; the template hides |
//! | `data-controls="path"` | two-way field for the target; implies `data-shows` of the same path |
//! | `data-shows="path[*scale]"` | renders the target; `@key` renders the enclosing expansion key |
//!
//! ## Binding Invariants
//!
//! 1. **Marker order**: scope → expand → control → show, each only if present.
//! 2. **Undefined is not an error**: any missing path segment renders as
//!    nothing. Partially shaped data never aborts a pass.
//! 3. **Keyed reuse**: a repeater keeps the clone of every key that survives
//!    an update, with its node identity. Only new keys are cloned and only
//!    vanished keys are removed.
//! 4. **Focus protection**: a focused generic field is never overwritten.
//! 5. **Idempotence**: a second `update()` over unchanged data writes
//!    nothing.
//! 6. **Deferred effects**: write-backs mutate data immediately; the
//!    re-render and callbacks they trigger run only from `run_deferred`.
//!
//! ## Example
//!
//! ```
//! use serde_json::json;
//! use uiulator::{data_source, Binder, BinderOptions, EventKind, HostTree, RcDomHost, Roots};
//!
//! let host = RcDomHost::parse(r#"<input id="name" data-controls="name">"#).unwrap();
//! let data = data_source(json!({"name": "Ada"}));
//! let mut binder = Binder::new(host, data.clone(), Roots::Document, BinderOptions::default());
//!
//! let input = binder.host().find_by_id("name").unwrap();
//! assert_eq!(binder.host().value(&input).as_deref(), Some("Ada"));
//!
//! binder.host().set_value(&input, "Grace");
//! binder.dispatch(&input, EventKind::Input);
//! assert_eq!(data.borrow()["name"], json!("Grace"));
//! ```

mod binder;
mod control;
mod dom;
mod error;
mod expand;
mod host;
mod options;
mod path;
mod render;
mod scope;
mod state;
mod static_render;
mod value;

pub use binder::{Binder, ChangeCallback, ControlChange, Roots};
pub use dom::RcDomHost;
pub use error::{BindError, Result};
pub use host::{walk_elements, EventKind, HostTree, Marker, NodeKey, WidgetKind};
pub use options::BinderOptions;
pub use path::{VarSpec, KEY_SENTINEL};
pub use scope::{data_source, DataSource, Scope};
pub use state::Phase;
pub use static_render::render_markup;
pub use value::{display_text, is_truthy};

#[cfg(feature = "napi")]
pub use static_render::render_markup_native;

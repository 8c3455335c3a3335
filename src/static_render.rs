//! One-shot rendering: bind markup to data, run one pass, serialize.

#[cfg(feature = "napi")]
use napi_derive::napi;
use serde_json::Value;
use tracing::debug;

use crate::binder::{Binder, Roots};
use crate::dom::RcDomHost;
use crate::error::Result;
use crate::options::BinderOptions;
use crate::scope::data_source;

/// Renders `markup` against `data` and returns the resulting document.
pub fn render_markup(markup: &str, data: Value, options: BinderOptions) -> Result<String> {
    let host = RcDomHost::parse(markup)?;
    let binder = Binder::new(host, data_source(data), Roots::Document, options);
    let rendered = binder.host().serialize()?;
    debug!(bytes = rendered.len(), "rendered markup");
    Ok(rendered)
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAPI EXPORTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "napi")]
#[napi]
pub fn render_markup_native(
    markup: String,
    data: serde_json::Value,
    options: Option<serde_json::Value>,
) -> napi::Result<String> {
    let options: BinderOptions = match options {
        Some(options) => {
            serde_json::from_value(options).map_err(|e| napi::Error::from_reason(e.to_string()))?
        }
        None => BinderOptions::default(),
    };
    render_markup(&markup, data, options).map_err(|e| napi::Error::from_reason(e.to_string()))
}

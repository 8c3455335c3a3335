//! Marker Path Language
//!
//! Markers carry a tiny expression language: `ident(.ident)*`, optionally
//! followed by `*<number>` to scale the resolved value. An empty path means
//! "the scope itself". Parsing is permissive: stray characters are dropped
//! from segments and an unreadable scale is ignored, so a sloppy marker
//! degrades to a narrower lookup instead of failing the pass.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

/// Sentinel accepted by `data-shows` and `value` meaning "the expansion key".
pub const KEY_SENTINEL: &str = "@key";

lazy_static! {
    /// Anything that cannot be part of a member name.
    static ref STRAY_CHARS: Regex = Regex::new(r"[^\w$@\-]").unwrap();

    /// Leading float literal, read the way a script host's `parseFloat` does.
    static ref FLOAT_PREFIX: Regex =
        Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").unwrap();
}

/// A parsed marker value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VarSpec {
    pub segments: Vec<String>,
    pub scale: Option<f64>,
}

impl VarSpec {
    pub fn parse(spec: &str) -> Self {
        // Anything after a second `*` is ignored.
        let mut parts = spec.split('*');
        let path = parts.next().unwrap_or_default();
        let scale = parts.next().and_then(parse_scale);

        let segments = path
            .split('.')
            .map(|segment| STRAY_CHARS.replace_all(segment, "").into_owned())
            .filter(|segment| !segment.is_empty())
            .collect();

        Self { segments, scale }
    }

    /// A single literal member, taken as-is without sanitizing.
    pub fn member(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
            scale: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty() && self.scale.is_none()
    }

    /// Splits off the last segment, leaving the path to its container.
    /// The scale stays with the container.
    pub fn split_last(&self) -> Option<(VarSpec, String)> {
        let (last, rest) = self.segments.split_last()?;
        Some((
            VarSpec {
                segments: rest.to_vec(),
                scale: self.scale,
            },
            last.clone(),
        ))
    }

    pub fn display_path(&self) -> String {
        self.segments.join(".")
    }
}

pub fn is_key_sentinel(spec: &str) -> bool {
    spec.trim() == KEY_SENTINEL
}

fn parse_scale(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let parsed = FLOAT_PREFIX
        .find(trimmed)
        .and_then(|m| m.as_str().parse::<f64>().ok());
    if parsed.is_none() {
        warn!(scale = raw, "ignoring unreadable scale in marker");
    }
    parsed
}

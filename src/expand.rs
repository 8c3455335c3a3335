//! Expansion / Reconciliation
//!
//! A repeater (`data-expands`) is a hidden template. Each pass it computes
//! its key set from the target and brings its generated siblings in line:
//!
//! 1. Clones whose key is still present are kept where they are, with
//!    their node identity (and whatever the user has focused in them).
//! 2. New keys get a fresh clone, inserted right before the template.
//! 3. Clones whose key went away are removed along with their records.
//!
//! Every kept or created clone is then updated with the collection itself
//! as scope; the clone's own `data-scope` narrows it to its item.
//!
//! ## Key sets
//!
//! | target | keys |
//! |---|---|
//! | missing or falsy | none |
//! | non-empty string | `"0"`, over the string wrapped in a one-element list |
//! | number `n` | `"0"` .. `round(n) - 1`, ascending |
//! | object | member names, in insertion order |
//! | array | indices |
//! | `true` | none |

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::binder::{Binder, Step};
use crate::host::{HostTree, Marker};
use crate::path::{is_key_sentinel, VarSpec, KEY_SENTINEL};
use crate::scope::Scope;
use crate::state::Phase;
use crate::value::{expansion_count, is_truthy};

impl<H: HostTree> Binder<H> {
    pub(crate) fn expand(&mut self, template: &H::Node, scope: Scope, spec: &str) -> Step {
        let state = self.states.state_mut(&self.host, template);
        if state.phase == Phase::Expanding {
            return Step::Halt;
        }
        if state.saved_display.is_none() {
            state.saved_display = Some(self.host.style(template, "display"));
            self.host.set_style(template, "display", Some("none"));
        }
        state.phase = Phase::Expanding;
        let mut previous = std::mem::take(&mut state.generated);
        let saved_display = state.saved_display.clone().flatten();

        let target = scope.narrow(&VarSpec::parse(spec));
        let (collection, keys) = expansion_keys(&target);

        let mut generated = IndexMap::with_capacity(keys.len());
        let mut created = 0;
        for key in keys {
            let clone = match previous.shift_remove(&key) {
                Some(existing) => existing,
                None => match self.spawn_clone(template, &key, saved_display.as_deref()) {
                    Some(clone) => {
                        created += 1;
                        clone
                    }
                    None => continue,
                },
            };
            generated.insert(key, clone);
        }

        for clone in generated.values() {
            self.update_node(clone, collection.clone());
        }

        let removed = previous.len();
        for orphan in previous.values() {
            self.states.forget_subtree(&self.host, orphan);
            self.host.remove(orphan);
        }

        if created > 0 || removed > 0 {
            debug!(
                path = spec,
                kept = generated.len() - created,
                created,
                removed,
                "reconciled repeater"
            );
        } else {
            trace!(path = spec, clones = generated.len(), "repeater unchanged");
        }

        let state = self.states.state_mut(&self.host, template);
        state.generated = generated;
        state.phase = Phase::Unbound;
        Step::Halt
    }

    fn spawn_clone(&mut self, template: &H::Node, key: &str, display: Option<&str>) -> Option<H::Node> {
        let clone = self.host.deep_clone(template);
        self.host.set_marker(&clone, Marker::Expand, None);
        self.rescope(&clone, key);
        self.host.set_style(&clone, "display", display);
        self.host.set_marker(&clone, Marker::Scope, Some(key));
        self.states.state_mut(&self.host, &clone).expansion_key = Some(key.to_string());

        if !self.host.insert_before(&clone, template) {
            warn!(key, "repeater template has no parent; clone dropped");
            self.states.forget_subtree(&self.host, &clone);
            return None;
        }
        Some(clone)
    }

    /// Re-identifies a fresh clone subtree for `key`: ids get a `-key`
    /// suffix and `@key` sentinels are replaced by the key itself.
    fn rescope(&mut self, node: &H::Node, key: &str) {
        if !self.host.is_element(node) {
            return;
        }

        if let Some(id) = self.host.id(node).filter(|id| !id.is_empty()) {
            self.host.set_id(node, &format!("{}-{}", id, key));
        }

        if self.host.value(node).as_deref() == Some(KEY_SENTINEL) {
            self.host.set_value(node, key);
            self.states.state_mut(&self.host, node).no_splat_value = true;
        }

        if self
            .host
            .marker(node, Marker::Show)
            .is_some_and(|shows| is_key_sentinel(&shows))
        {
            self.host.set_text(node, key);
            self.host.set_marker(node, Marker::Show, Some(""));
            self.states.state_mut(&self.host, node).no_splat_text = true;
        }

        for child in self.host.children(node) {
            self.rescope(&child, key);
        }
    }
}

/// The scope clones are updated with, and the keys to generate.
fn expansion_keys(target: &Scope) -> (Scope, Vec<String>) {
    target.with_value(|value| match value {
        value if !is_truthy(value) => (Scope::Undefined, Vec::new()),
        Some(Value::String(s)) => (
            Scope::detached(Value::Array(vec![Value::String(s.clone())])),
            vec!["0".to_string()],
        ),
        Some(Value::Number(n)) => {
            let count = expansion_count(n.as_f64().unwrap_or(f64::NAN));
            (target.clone(), (0..count).map(|i| i.to_string()).collect())
        }
        Some(Value::Object(members)) => (target.clone(), members.keys().cloned().collect()),
        Some(Value::Array(items)) => (
            target.clone(),
            (0..items.len()).map(|i| i.to_string()).collect(),
        ),
        _ => (Scope::Undefined, Vec::new()),
    })
}

//! Per-node side table.
//!
//! Everything the binder remembers about a node lives here, keyed by
//! [`NodeKey`] and anchored by a weak handle, never on the node itself.
//! Entries whose node has died are dropped by [`SideTable::prune`].

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::trace;

use crate::host::{walk_elements, EventKind, HostTree, NodeKey, WidgetKind};
use crate::scope::Scope;

/// Where a node is in marker processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Unbound,
    /// A repeater in the middle of reconciling its clones.
    Expanding,
    /// A control with its listener installed for the given event.
    Bound(EventKind),
}

#[derive(Debug)]
pub struct NodeState<N> {
    pub phase: Phase,
    /// The template's own `display` before it was hidden. The outer option
    /// records whether it was saved at all.
    pub saved_display: Option<Option<String>>,
    /// Clones this repeater owns, in key order.
    pub generated: IndexMap<String, N>,
    /// Set on clones: the key they were generated for.
    pub expansion_key: Option<String>,
    pub now_showing: Option<Scope>,
    pub no_splat_value: bool,
    pub no_splat_text: bool,
    pub kind: Option<WidgetKind>,
    pub overlay: bool,
}

impl<N> Default for NodeState<N> {
    fn default() -> Self {
        Self {
            phase: Phase::Unbound,
            saved_display: None,
            generated: IndexMap::new(),
            expansion_key: None,
            now_showing: None,
            no_splat_value: false,
            no_splat_text: false,
            kind: None,
            overlay: false,
        }
    }
}

struct Entry<W, N> {
    anchor: W,
    state: NodeState<N>,
}

pub struct SideTable<H: HostTree> {
    entries: HashMap<NodeKey, Entry<H::WeakNode, H::Node>>,
}

impl<H: HostTree> Default for SideTable<H> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<H: HostTree> SideTable<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, host: &H, node: &H::Node) -> Option<&NodeState<H::Node>> {
        self.entries
            .get(&host.node_key(node))
            .filter(|entry| host.is_alive(&entry.anchor))
            .map(|entry| &entry.state)
    }

    /// The node's record, created on first use. A record left behind by a
    /// dead node under the same key is replaced.
    pub fn state_mut(&mut self, host: &H, node: &H::Node) -> &mut NodeState<H::Node> {
        let key = host.node_key(node);
        let entry = self.entries.entry(key).or_insert_with(|| Entry {
            anchor: host.downgrade(node),
            state: NodeState::default(),
        });
        if !host.is_alive(&entry.anchor) {
            *entry = Entry {
                anchor: host.downgrade(node),
                state: NodeState::default(),
            };
        }
        &mut entry.state
    }

    pub fn phase(&self, host: &H, node: &H::Node) -> Phase {
        self.get(host, node).map(|state| state.phase).unwrap_or_default()
    }

    /// The node's widget kind, queried from the host once and cached.
    pub fn widget_kind(&mut self, host: &H, node: &H::Node) -> WidgetKind {
        let state = self.state_mut(host, node);
        if let Some(kind) = state.kind {
            return kind;
        }
        let kind = host.widget_kind(node);
        state.kind = Some(kind);
        kind
    }

    pub fn is_generated(&self, host: &H, node: &H::Node) -> bool {
        self.get(host, node)
            .map(|state| state.expansion_key.is_some())
            .unwrap_or(false)
    }

    /// Drops the records of `node` and every element below it.
    pub fn forget_subtree(&mut self, host: &H, node: &H::Node) {
        let mut keys = Vec::new();
        walk_elements(host, node, &mut |n| keys.push(host.node_key(n)));
        for key in keys {
            self.entries.remove(&key);
        }
    }

    /// Drops records whose node no longer exists. Returns how many went.
    pub fn prune(&mut self, host: &H) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| host.is_alive(&entry.anchor));
        let pruned = before - self.entries.len();
        if pruned > 0 {
            trace!(pruned, "pruned side table");
        }
        pruned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::RcDomHost;

    #[test]
    fn test_records_are_created_once() {
        let host = RcDomHost::parse(r#"<p id="p"></p>"#).unwrap();
        let p = host.find_by_id("p").unwrap();
        let mut table = SideTable::<RcDomHost>::new();

        assert!(table.get(&host, &p).is_none());
        assert_eq!(table.phase(&host, &p), Phase::Unbound);

        table.state_mut(&host, &p).phase = Phase::Bound(EventKind::Input);
        assert_eq!(table.phase(&host, &p), Phase::Bound(EventKind::Input));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_widget_kind_is_cached() {
        let host = RcDomHost::parse(r#"<input id="i" type="checkbox">"#).unwrap();
        let input = host.find_by_id("i").unwrap();
        let mut table = SideTable::<RcDomHost>::new();

        assert_eq!(table.widget_kind(&host, &input), WidgetKind::Checkbox);
        host.set_attr(&input, "type", Some("text"));
        assert_eq!(table.widget_kind(&host, &input), WidgetKind::Checkbox);
    }

    #[test]
    fn test_prune_drops_dead_nodes() {
        let host = RcDomHost::parse(r#"<ul id="l"><li id="a"></li></ul>"#).unwrap();
        let mut table = SideTable::<RcDomHost>::new();

        let li = host.find_by_id("a").unwrap();
        let detached = host.deep_clone(&li);
        table.state_mut(&host, &li);
        table.state_mut(&host, &detached);
        drop(detached);

        assert_eq!(table.prune(&host), 1);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_forget_subtree() {
        let host = RcDomHost::parse(r#"<div id="d"><span id="s"></span></div><p id="p"></p>"#)
            .unwrap();
        let mut table = SideTable::<RcDomHost>::new();
        for id in ["d", "s", "p"] {
            table.state_mut(&host, &host.find_by_id(id).unwrap());
        }

        table.forget_subtree(&host, &host.find_by_id("d").unwrap());
        assert_eq!(table.len(), 1);
        assert!(table.get(&host, &host.find_by_id("p").unwrap()).is_some());
    }
}

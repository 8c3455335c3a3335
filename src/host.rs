//! Host Tree Abstraction
//!
//! The binder never owns the UI tree. It drives a host through this trait:
//! traversal, the four markers, the three rendering channels (value,
//! checked, text), focus, styles and the structural edits expansion needs.
//!
//! ## Contract
//!
//! 1. `Node` handles are cheap to clone and compare by identity through
//!    `node_key`.
//! 2. A `WeakNode` keeps `node_key` unique while it is held, and reports
//!    through `is_alive` whether the node still exists.
//! 3. `value` returns `None` iff the node has no value channel.
//! 4. `deep_clone` copies markers, attributes and descendants, and returns a
//!    detached node.

use serde::{Deserialize, Serialize};

/// Identity of a host node for the binder's side table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey(pub usize);

/// Node markers, in the order they are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    Scope,
    Expand,
    Control,
    Show,
}

impl Marker {
    pub const ORDER: [Marker; 4] = [Marker::Scope, Marker::Expand, Marker::Control, Marker::Show];

    pub fn attribute_name(self) -> &'static str {
        match self {
            Marker::Scope => "data-scope",
            Marker::Expand => "data-expands",
            Marker::Control => "data-controls",
            Marker::Show => "data-shows",
        }
    }
}

/// How a node takes rendered values. Queried once per node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    /// Checked iff its own fixed value equals the rendered value.
    Radio,
    /// Checked iff the rendered value is truthy.
    Checkbox,
    /// Takes both value and text.
    SelectOption,
    /// Text only; its value channel is inert.
    ListItem,
    /// Anything else with a value channel.
    Interactive,
    /// Anything else.
    Text,
}

/// Events a bound control listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Fired on every edit.
    Input,
    /// Fired when the user finalizes an entry.
    Change,
}

pub trait HostTree {
    type Node: Clone;
    type WeakNode;

    fn node_key(&self, node: &Self::Node) -> NodeKey;
    fn downgrade(&self, node: &Self::Node) -> Self::WeakNode;
    fn is_alive(&self, weak: &Self::WeakNode) -> bool;

    /// Root used when the binder is given no roots.
    fn document(&self) -> Self::Node;

    fn is_element(&self, node: &Self::Node) -> bool;
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;
    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    fn marker(&self, node: &Self::Node, marker: Marker) -> Option<String>;
    fn set_marker(&self, node: &Self::Node, marker: Marker, value: Option<&str>);

    fn widget_kind(&self, node: &Self::Node) -> WidgetKind;
    fn has_focus(&self, node: &Self::Node) -> bool;

    fn value(&self, node: &Self::Node) -> Option<String>;
    fn set_value(&self, node: &Self::Node, value: &str);
    fn checked(&self, node: &Self::Node) -> bool;
    fn set_checked(&self, node: &Self::Node, checked: bool);
    fn text(&self, node: &Self::Node) -> String;
    fn set_text(&self, node: &Self::Node, text: &str);

    fn id(&self, node: &Self::Node) -> Option<String>;
    fn set_id(&self, node: &Self::Node, id: &str);

    fn style(&self, node: &Self::Node, property: &str) -> Option<String>;
    fn set_style(&self, node: &Self::Node, property: &str, value: Option<&str>);

    fn deep_clone(&self, node: &Self::Node) -> Self::Node;
    /// Inserts `node` into `reference`'s parent, right before it. Returns
    /// false when `reference` has no parent.
    fn insert_before(&self, node: &Self::Node, reference: &Self::Node) -> bool;
    fn remove(&self, node: &Self::Node);

    /// Containers (dialogs, overlays) whose contents only accept some value
    /// writes once they are shown.
    fn is_overlay(&self, node: &Self::Node) -> bool;
    fn is_open(&self, node: &Self::Node) -> bool;
}

/// Calls `visit` on `node` and every element below it, parents first.
pub fn walk_elements<H: HostTree + ?Sized>(
    host: &H,
    node: &H::Node,
    visit: &mut dyn FnMut(&H::Node),
) {
    if host.is_element(node) {
        visit(node);
    }
    for child in host.children(node) {
        walk_elements(host, &child, visit);
    }
}

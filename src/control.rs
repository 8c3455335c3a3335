//! Control Binder
//!
//! `data-controls="path"` turns a node into a two-way field. Binding happens
//! once: the node becomes a plain `data-shows="path"` node so it keeps
//! rendering the committed value, the control marker is dropped, and the
//! node's phase records which event it listens to. The write-back itself
//! runs in [`Binder::dispatch`].

use tracing::debug;

use crate::binder::{Binder, Step};
use crate::host::{HostTree, Marker};
use crate::scope::Scope;
use crate::state::Phase;

impl<H: HostTree> Binder<H> {
    pub(crate) fn bind_control(&mut self, node: &H::Node, scope: Scope, spec: &str) -> Step {
        if let Phase::Bound(_) = self.states.phase(&self.host, node) {
            return Step::Continue(scope);
        }

        let event = self.options.commit_event();
        self.host.set_marker(node, Marker::Show, Some(spec));
        self.host.set_marker(node, Marker::Control, None);
        self.states.state_mut(&self.host, node).phase = Phase::Bound(event);
        debug!(path = spec, ?event, "bound control");

        Step::Continue(scope)
    }
}

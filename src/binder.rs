//! Update Driver
//!
//! The binder walks every root once per `update()`. At each element it runs
//! the marker steps that element declares, in the fixed order
//! scope → expand → control → show, threading the scope from one step to
//! the next, then descends into the children with the final scope.
//!
//! ## Invariants
//!
//! 1. Markers are read live at each step; a step may rewrite the markers of
//!    the node it runs on (the control step turns itself into a show).
//! 2. A step that halts ends the pass for the whole subtree. Only a repeater
//!    halts: its clones are rendered by the repeater, never by the parent.
//! 3. Write-backs happen synchronously in `dispatch`; the re-render and the
//!    change callback they trigger are queued and only run from
//!    `run_deferred` (or `tick`), in the order they were queued.
//! 4. There is no reentrancy guard. Every entry point takes `&mut self`, so
//!    overlapping passes cannot be expressed.

use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::{BindError, Result};
use crate::host::{walk_elements, EventKind, HostTree, Marker, WidgetKind};
use crate::options::BinderOptions;
use crate::path::VarSpec;
use crate::scope::{DataSource, Scope};
use crate::state::{Phase, SideTable};

/// What the binder walks.
#[derive(Debug, Clone)]
pub enum Roots<N> {
    /// The host's whole document.
    Document,
    Nodes(Vec<N>),
}

impl<N> Roots<N> {
    pub fn node(node: N) -> Self {
        Roots::Nodes(vec![node])
    }
}

impl<N> Default for Roots<N> {
    fn default() -> Self {
        Roots::Document
    }
}

impl<N> From<Vec<N>> for Roots<N> {
    fn from(nodes: Vec<N>) -> Self {
        Roots::Nodes(nodes)
    }
}

/// Result of one marker step.
pub(crate) enum Step {
    Continue(Scope),
    Halt,
}

/// One control write-back, as reported to the change callback.
#[derive(Debug, Clone)]
pub struct ControlChange<N> {
    pub event: EventKind,
    pub node: N,
    /// The container after the write, or `None` if it was undefined.
    pub container: Option<Value>,
    pub variable: String,
    pub old_value: Option<Value>,
}

pub type ChangeCallback<N> = Rc<dyn Fn(&ControlChange<N>)>;

enum Task<N> {
    Update,
    Notify(ControlChange<N>),
}

struct PollSchedule {
    interval: Duration,
    next_due: Instant,
}

pub struct Binder<H: HostTree> {
    pub(crate) host: H,
    data: DataSource,
    roots: Roots<H::Node>,
    pub(crate) options: BinderOptions,
    pub(crate) states: SideTable<H>,
    deferred: VecDeque<Task<H::Node>>,
    on_change: Option<ChangeCallback<H::Node>>,
    poll: Option<PollSchedule>,
}

impl<H: HostTree> fmt::Debug for Binder<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("options", &self.options)
            .field("tracked_nodes", &self.states.len())
            .field("deferred", &self.deferred.len())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LIFECYCLE
// ═══════════════════════════════════════════════════════════════════════════════

impl<H: HostTree> Binder<H> {
    /// Attaches to `roots`, registers overlays and runs the first update.
    pub fn new(host: H, data: DataSource, roots: Roots<H::Node>, options: BinderOptions) -> Self {
        let poll = options.poll_interval().map(|interval| PollSchedule {
            interval,
            next_due: Instant::now() + interval,
        });

        let mut binder = Self {
            host,
            data,
            roots,
            options,
            states: SideTable::new(),
            deferred: VecDeque::new(),
            on_change: None,
            poll,
        };
        binder.init_overlays();
        binder.update();
        binder
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn data_source(&self) -> &DataSource {
        &self.data
    }

    pub fn options(&self) -> &BinderOptions {
        &self.options
    }

    /// Replaces the data source. Takes effect on the next update.
    pub fn set_data_source(&mut self, data: DataSource) {
        self.data = data;
    }

    pub fn on_control_changed(&mut self, callback: impl Fn(&ControlChange<H::Node>) + 'static) {
        self.on_change = Some(Rc::new(callback));
    }

    /// Number of tasks waiting for `run_deferred`.
    pub fn pending(&self) -> usize {
        self.deferred.len()
    }

    fn root_nodes(&self) -> Vec<H::Node> {
        match &self.roots {
            Roots::Document => vec![self.host.document()],
            Roots::Nodes(nodes) => nodes.clone(),
        }
    }

    fn init_overlays(&mut self) {
        let mut overlays = Vec::new();
        for root in self.root_nodes() {
            walk_elements(&self.host, &root, &mut |node| {
                if self.host.is_overlay(node) {
                    overlays.push(node.clone());
                }
            });
        }
        for overlay in &overlays {
            self.states.state_mut(&self.host, overlay).overlay = true;
        }
        if !overlays.is_empty() {
            debug!(count = overlays.len(), "registered overlays");
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// UPDATE PASS
// ═══════════════════════════════════════════════════════════════════════════════

impl<H: HostTree> Binder<H> {
    /// One full pass over every root.
    pub fn update(&mut self) {
        self.states.prune(&self.host);
        let root_scope = Scope::root(&self.data);
        let roots = self.root_nodes();
        trace!(roots = roots.len(), "update pass");
        for root in &roots {
            self.update_node(root, root_scope.clone());
        }
    }

    pub(crate) fn update_node(&mut self, node: &H::Node, scope: Scope) {
        let mut scope = scope;
        if self.host.is_element(node) {
            for marker in Marker::ORDER {
                let Some(spec) = self.host.marker(node, marker) else {
                    continue;
                };
                let step = match marker {
                    Marker::Scope => self.narrow_scope(node, scope, &spec),
                    Marker::Expand => self.expand(node, scope, &spec),
                    Marker::Control => self.bind_control(node, scope, &spec),
                    Marker::Show => self.show(node, scope, &spec),
                };
                match step {
                    Step::Continue(next) => scope = next,
                    Step::Halt => return,
                }
            }
        }

        for child in self.host.children(node) {
            if self.states.is_generated(&self.host, &child) {
                continue;
            }
            self.update_node(&child, scope.clone());
        }
    }

    fn narrow_scope(&mut self, node: &H::Node, scope: Scope, spec: &str) -> Step {
        // Clones narrow by their key as a literal member.
        let spec = match self
            .states
            .get(&self.host, node)
            .and_then(|state| state.expansion_key.clone())
        {
            Some(key) => VarSpec::member(key),
            None => VarSpec::parse(spec),
        };
        Step::Continue(scope.narrow(&spec))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENTS AND DEFERRED WORK
// ═══════════════════════════════════════════════════════════════════════════════

impl<H: HostTree> Binder<H> {
    /// Delivers a UI event to `node`. Returns whether a bound control took
    /// it. The data graph is written before this returns; re-renders and
    /// callbacks wait for `run_deferred`.
    pub fn dispatch(&mut self, node: &H::Node, event: EventKind) -> bool {
        if self.states.phase(&self.host, node) != Phase::Bound(event) {
            return false;
        }

        let showing = self
            .states
            .get(&self.host, node)
            .and_then(|state| state.now_showing.clone())
            .unwrap_or(Scope::Undefined);
        let spec = VarSpec::parse(&self.host.marker(node, Marker::Show).unwrap_or_default());

        let (container, variable, old_value) = match write_target(&spec, &showing) {
            Ok((container, variable)) => {
                let new_value = self.control_value(node);
                let old_value = match container.assign(&variable, new_value) {
                    Ok(old) => old,
                    Err(err) => {
                        warn!(%err, "skipping control write-back");
                        None
                    }
                };
                (container, variable, old_value)
            }
            Err(err) => {
                warn!(%err, "skipping control write-back");
                (Scope::Undefined, String::new(), None)
            }
        };
        trace!(variable = %variable, ?event, "control write-back");

        if self.options.update_on_change {
            self.deferred.push_back(Task::Update);
        }
        if self.on_change.is_some() {
            self.deferred.push_back(Task::Notify(ControlChange {
                event,
                node: node.clone(),
                container: container.value(),
                variable,
                old_value,
            }));
        }
        true
    }

    fn control_value(&mut self, node: &H::Node) -> Value {
        match self.states.widget_kind(&self.host, node) {
            WidgetKind::Checkbox => Value::Bool(self.host.checked(node)),
            _ => Value::String(
                self.host
                    .value(node)
                    .unwrap_or_else(|| self.host.text(node)),
            ),
        }
    }

    /// Runs queued re-renders and change callbacks in order. Returns how
    /// many ran.
    pub fn run_deferred(&mut self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.deferred.pop_front() {
            ran += 1;
            match task {
                Task::Update => self.update(),
                Task::Notify(change) => {
                    if let Some(callback) = self.on_change.clone() {
                        callback(&change);
                    }
                }
            }
        }
        if ran > 0 {
            trace!(ran, "drained deferred tasks");
        }
        ran
    }

    /// Attribute mutation notification. An overlay that opens re-renders
    /// everything, since some of its widgets only take values once shown.
    pub fn attribute_changed(&mut self, node: &H::Node, attribute: &str) -> bool {
        if attribute != "open" {
            return false;
        }
        let registered = self
            .states
            .get(&self.host, node)
            .map(|state| state.overlay)
            .unwrap_or(false);
        if !registered || !self.host.is_open(node) {
            return false;
        }
        debug!("overlay opened, re-rendering");
        self.update();
        true
    }

    /// One event-loop turn: drains deferred work, then polls if due.
    /// Returns whether a polled update ran.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.run_deferred();
        let due = match &mut self.poll {
            Some(poll) if now >= poll.next_due => {
                poll.next_due = now + poll.interval;
                true
            }
            _ => false,
        };
        if due {
            self.update();
        }
        due
    }
}

/// Container scope and member name a control writes to. An empty path
/// writes through the control's own scope location.
fn write_target(spec: &VarSpec, showing: &Scope) -> Result<(Scope, String)> {
    match spec.split_last() {
        Some((container, variable)) => Ok((showing.narrow(&container), variable)),
        None => showing.split_location().ok_or(BindError::EmptyPath),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::data_source;
    use serde_json::json;

    #[test]
    fn test_write_target_pops_last_segment() {
        let data = data_source(json!({"form": {"name": "x"}}));
        let root = Scope::root(&data);
        let (container, variable) = write_target(&VarSpec::parse("form.name"), &root).unwrap();
        assert_eq!(container.path().unwrap(), &["form".to_string()]);
        assert_eq!(variable, "name");
    }

    #[test]
    fn test_write_target_through_scope() {
        let data = data_source(json!({"tags": ["a", "b"]}));
        let item = Scope::root(&data).narrow(&VarSpec::parse("tags.1"));
        let (container, variable) = write_target(&VarSpec::default(), &item).unwrap();
        assert_eq!(container.path().unwrap(), &["tags".to_string()]);
        assert_eq!(variable, "1");

        let root = Scope::root(&data);
        assert!(matches!(
            write_target(&VarSpec::default(), &root),
            Err(BindError::EmptyPath)
        ));
    }

    #[test]
    fn test_roots_helpers() {
        assert!(matches!(Roots::<u8>::default(), Roots::Document));
        assert!(matches!(Roots::node(1u8), Roots::Nodes(ref v) if v == &vec![1]));
        assert!(matches!(Roots::from(vec![1u8, 2]), Roots::Nodes(ref v) if v.len() == 2));
    }
}

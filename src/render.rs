//! Display Renderer
//!
//! `data-shows="path[*scale]"` renders a value into a node. How it lands
//! depends on the node's widget kind:
//!
//! - radio: checked iff its own value equals the rendered string; its value
//!   is never written
//! - checkbox: checked iff the rendered value is truthy
//! - option: value and text, each unless pinned by a `@key` sentinel
//! - list item: text only
//! - anything else: skipped while focused, otherwise the value channel if
//!   the node has one, else the text
//!
//! A channel is only written when its content actually changes.

use serde_json::Value;

use crate::binder::{Binder, Step};
use crate::host::{HostTree, WidgetKind};
use crate::path::VarSpec;
use crate::scope::Scope;
use crate::value::{display_text, is_truthy};

/// Channels pinned on a clone by the `@key` mechanism.
#[derive(Debug, Clone, Copy, Default)]
struct Pinned {
    value: bool,
    text: bool,
}

impl<H: HostTree> Binder<H> {
    pub(crate) fn show(&mut self, node: &H::Node, scope: Scope, spec: &str) -> Step {
        let kind = self.states.widget_kind(&self.host, node);
        let state = self.states.state_mut(&self.host, node);
        state.now_showing = Some(scope.clone());
        let pinned = Pinned {
            value: state.no_splat_value,
            text: state.no_splat_text,
        };

        let shown = scope.narrow(&VarSpec::parse(spec));
        shown.with_value(|value| render(&self.host, node, kind, value, pinned));

        Step::Continue(scope)
    }
}

fn render<H: HostTree>(
    host: &H,
    node: &H::Node,
    kind: WidgetKind,
    value: Option<&Value>,
    pinned: Pinned,
) {
    match kind {
        WidgetKind::Radio => {
            let own = host.value(node).unwrap_or_default();
            let selected = matches!(value, Some(Value::String(s)) if *s == own);
            write_checked(host, node, selected);
        }
        WidgetKind::Checkbox => write_checked(host, node, is_truthy(value)),
        WidgetKind::SelectOption => {
            let text = display_text(value);
            if !pinned.value {
                if let Some(current) = host.value(node) {
                    if current != text {
                        host.set_value(node, &text);
                    }
                }
            }
            if !pinned.text {
                write_text(host, node, &text);
            }
        }
        WidgetKind::ListItem => {
            if !pinned.text {
                write_text(host, node, &display_text(value));
            }
        }
        WidgetKind::Interactive | WidgetKind::Text => {
            if host.has_focus(node) {
                return;
            }
            let text = display_text(value);
            match host.value(node) {
                Some(current) if !pinned.value => {
                    if current != text {
                        host.set_value(node, &text);
                    }
                }
                _ => {
                    if !pinned.text {
                        write_text(host, node, &text);
                    }
                }
            }
        }
    }
}

fn write_checked<H: HostTree>(host: &H, node: &H::Node, checked: bool) {
    if host.checked(node) != checked {
        host.set_checked(node, checked);
    }
}

fn write_text<H: HostTree>(host: &H, node: &H::Node, text: &str) {
    if host.text(node) != text {
        host.set_text(node, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::RcDomHost;
    use serde_json::json;

    fn render_into(host: &RcDomHost, id: &str, value: Value, pinned: Pinned) {
        let node = host.find_by_id(id).unwrap();
        let kind = host.widget_kind(&node);
        render(host, &node, kind, Some(&value), pinned);
    }

    #[test]
    fn test_radio_never_writes_its_value() {
        let host = RcDomHost::parse(
            r#"<input id="r1" type="radio" value="red"><input id="r2" type="radio" value="blue">"#,
        )
        .unwrap();
        render_into(&host, "r1", json!("blue"), Pinned::default());
        render_into(&host, "r2", json!("blue"), Pinned::default());

        let r1 = host.find_by_id("r1").unwrap();
        let r2 = host.find_by_id("r2").unwrap();
        assert!(!host.checked(&r1));
        assert!(host.checked(&r2));
        assert_eq!(host.value(&r1), Some("red".to_string()));
        assert_eq!(host.value(&r2), Some("blue".to_string()));
    }

    #[test]
    fn test_radio_needs_a_string_match() {
        let host = RcDomHost::parse(r#"<input id="r" type="radio" value="1" checked>"#).unwrap();
        render_into(&host, "r", json!(1), Pinned::default());
        assert!(!host.checked(&host.find_by_id("r").unwrap()));
    }

    #[test]
    fn test_checkbox_truthiness() {
        let host = RcDomHost::parse(r#"<input id="c" type="checkbox">"#).unwrap();
        let c = host.find_by_id("c").unwrap();
        render_into(&host, "c", json!("yes"), Pinned::default());
        assert!(host.checked(&c));
        render_into(&host, "c", json!(0), Pinned::default());
        assert!(!host.checked(&c));
    }

    #[test]
    fn test_option_sets_value_and_text_unless_pinned() {
        let host = RcDomHost::parse(
            r#"<select><option id="o1">x</option><option id="o2" value="k">k</option></select>"#,
        )
        .unwrap();
        render_into(&host, "o1", json!("Apple"), Pinned::default());
        let o1 = host.find_by_id("o1").unwrap();
        assert_eq!(host.attr(&o1, "value"), Some("Apple".to_string()));
        assert_eq!(host.text(&o1), "Apple");

        render_into(&host, "o2", json!("Pear"), Pinned { value: true, text: false });
        let o2 = host.find_by_id("o2").unwrap();
        assert_eq!(host.attr(&o2, "value"), Some("k".to_string()));
        assert_eq!(host.text(&o2), "Pear");
    }

    #[test]
    fn test_list_item_text_only() {
        let host = RcDomHost::parse(r#"<ul><li id="l" value="2">old</li></ul>"#).unwrap();
        render_into(&host, "l", json!(7), Pinned::default());
        let li = host.find_by_id("l").unwrap();
        assert_eq!(host.text(&li), "7");
        assert_eq!(host.attr(&li, "value"), Some("2".to_string()));
    }

    #[test]
    fn test_focused_input_is_left_alone() {
        let host = RcDomHost::parse(r#"<input id="i" value="typing">"#).unwrap();
        let input = host.find_by_id("i").unwrap();
        host.focus(&input);
        render_into(&host, "i", json!("server"), Pinned::default());
        assert_eq!(host.value(&input), Some("typing".to_string()));

        host.blur();
        render_into(&host, "i", json!("server"), Pinned::default());
        assert_eq!(host.value(&input), Some("server".to_string()));
    }

    #[test]
    fn test_pinned_value_falls_through_to_text() {
        let host = RcDomHost::parse(r#"<button id="b" value="bob">x</button>"#).unwrap();
        render_into(&host, "b", json!("label"), Pinned { value: true, text: false });
        let button = host.find_by_id("b").unwrap();
        assert_eq!(host.value(&button), Some("bob".to_string()));
        assert_eq!(host.text(&button), "label");
    }

    #[test]
    fn test_undefined_renders_empty() {
        let host = RcDomHost::parse(r#"<span id="s">stale</span>"#).unwrap();
        let span = host.find_by_id("s").unwrap();
        render(&host, &span, WidgetKind::Text, None, Pinned::default());
        assert_eq!(host.text(&span), "");
    }
}

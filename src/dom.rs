//! html5ever Host Tree
//!
//! A [`HostTree`] over `markup5ever_rcdom` documents. Every piece of widget
//! state lives in plain attributes (`value`, `checked`, `selected`,
//! `style`, `open`), so a bound document serializes back to markup exactly
//! as it is displayed. Focus is tracked by the host itself.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use html5ever::parse_document;
use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::tendril::TendrilSink;
use html5ever::{Attribute, LocalName, Namespace, QualName};
use lazy_static::lazy_static;
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use tendril::StrTendril;

use crate::error::Result;
use crate::host::{HostTree, Marker, NodeKey, WidgetKind};

lazy_static! {
    /// Elements whose value channel is their `value` attribute.
    static ref VALUE_ATTR_TAGS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("input");
        s.insert("button");
        s.insert("data");
        s.insert("meter");
        s.insert("progress");
        s.insert("param");
        s
    };

    /// Elements whose value channel is their text content.
    static ref TEXT_VALUE_TAGS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("textarea");
        s.insert("output");
        s
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// HOST
// ═══════════════════════════════════════════════════════════════════════════════

pub struct RcDomHost {
    document: Handle,
    focused: RefCell<Option<Weak<Node>>>,
}

impl RcDomHost {
    /// Parse a full document (html5ever adds `html`/`head`/`body` as needed).
    pub fn parse(markup: &str) -> Result<Self> {
        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut markup.as_bytes())?;
        Ok(Self::from_document(dom.document))
    }

    pub fn from_document(document: Handle) -> Self {
        Self {
            document,
            focused: RefCell::new(None),
        }
    }

    pub fn find_by_id(&self, id: &str) -> Option<Handle> {
        find_first(&self.document, &|node| attr(node, "id").as_deref() == Some(id))
    }

    /// Elements with the given tag name, in document order.
    pub fn elements_by_tag(&self, tag: &str) -> Vec<Handle> {
        let mut found = Vec::new();
        collect(&self.document, &mut found, &|node| tag_name(node) == Some(tag));
        found
    }

    pub fn attr(&self, node: &Handle, name: &str) -> Option<String> {
        attr(node, name)
    }

    pub fn set_attr(&self, node: &Handle, name: &str, value: Option<&str>) {
        set_attr(node, name, value);
    }

    pub fn focus(&self, node: &Handle) {
        *self.focused.borrow_mut() = Some(Rc::downgrade(node));
    }

    pub fn blur(&self) {
        *self.focused.borrow_mut() = None;
    }

    /// The whole document as markup.
    pub fn serialize(&self) -> Result<String> {
        serialize_handle(&self.document, TraversalScope::ChildrenOnly(None))
    }

    /// One node, including its own tag, as markup.
    pub fn outer_html(&self, node: &Handle) -> Result<String> {
        serialize_handle(node, TraversalScope::IncludeNode)
    }
}

fn serialize_handle(node: &Handle, traversal_scope: TraversalScope) -> Result<String> {
    let mut bytes = Vec::new();
    let handle: SerializableHandle = node.clone().into();
    serialize(
        &mut bytes,
        &handle,
        SerializeOpts {
            traversal_scope,
            ..Default::default()
        },
    )?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

impl HostTree for RcDomHost {
    type Node = Handle;
    type WeakNode = Weak<Node>;

    fn node_key(&self, node: &Handle) -> NodeKey {
        NodeKey(Rc::as_ptr(node) as usize)
    }

    fn downgrade(&self, node: &Handle) -> Weak<Node> {
        Rc::downgrade(node)
    }

    fn is_alive(&self, weak: &Weak<Node>) -> bool {
        weak.strong_count() > 0
    }

    fn document(&self) -> Handle {
        self.document.clone()
    }

    fn is_element(&self, node: &Handle) -> bool {
        matches!(node.data, NodeData::Element { .. })
    }

    fn children(&self, node: &Handle) -> Vec<Handle> {
        node.children.borrow().clone()
    }

    fn parent(&self, node: &Handle) -> Option<Handle> {
        parent_of(node)
    }

    fn marker(&self, node: &Handle, marker: Marker) -> Option<String> {
        attr(node, marker.attribute_name())
    }

    fn set_marker(&self, node: &Handle, marker: Marker, value: Option<&str>) {
        set_attr(node, marker.attribute_name(), value);
    }

    fn widget_kind(&self, node: &Handle) -> WidgetKind {
        match tag_name(node) {
            Some("input") => match input_type(node).as_deref() {
                Some("radio") => WidgetKind::Radio,
                Some("checkbox") => WidgetKind::Checkbox,
                _ => WidgetKind::Interactive,
            },
            Some("option") => WidgetKind::SelectOption,
            Some("li") => WidgetKind::ListItem,
            Some("select") => WidgetKind::Interactive,
            Some(tag) if VALUE_ATTR_TAGS.contains(tag) || TEXT_VALUE_TAGS.contains(tag) => {
                WidgetKind::Interactive
            }
            _ => WidgetKind::Text,
        }
    }

    fn has_focus(&self, node: &Handle) -> bool {
        self.focused
            .borrow()
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|focused| Rc::ptr_eq(&focused, node))
            .unwrap_or(false)
    }

    fn value(&self, node: &Handle) -> Option<String> {
        match tag_name(node)? {
            "option" => Some(option_value(node)),
            "select" => Some(
                selected_option(node)
                    .map(|option| option_value(&option))
                    .unwrap_or_default(),
            ),
            // Toggles without a value attribute report "on".
            "input" if matches!(input_type(node).as_deref(), Some("radio" | "checkbox")) => {
                Some(attr(node, "value").unwrap_or_else(|| "on".to_string()))
            }
            tag if TEXT_VALUE_TAGS.contains(tag) => Some(text_content(node)),
            tag if VALUE_ATTR_TAGS.contains(tag) => Some(attr(node, "value").unwrap_or_default()),
            _ => None,
        }
    }

    fn set_value(&self, node: &Handle, value: &str) {
        match tag_name(node) {
            Some("select") => {
                let mut matched = false;
                for option in options_of(node) {
                    let selected = !matched && option_value(&option) == value;
                    matched |= selected;
                    set_attr(&option, "selected", selected.then_some(""));
                }
            }
            Some(tag) if TEXT_VALUE_TAGS.contains(tag) => replace_text(node, value),
            Some(_) => set_attr(node, "value", Some(value)),
            None => {}
        }
    }

    fn checked(&self, node: &Handle) -> bool {
        attr(node, "checked").is_some()
    }

    fn set_checked(&self, node: &Handle, checked: bool) {
        set_attr(node, "checked", checked.then_some(""));
    }

    fn text(&self, node: &Handle) -> String {
        text_content(node)
    }

    fn set_text(&self, node: &Handle, text: &str) {
        replace_text(node, text);
    }

    fn id(&self, node: &Handle) -> Option<String> {
        attr(node, "id")
    }

    fn set_id(&self, node: &Handle, id: &str) {
        set_attr(node, "id", Some(id));
    }

    fn style(&self, node: &Handle, property: &str) -> Option<String> {
        let style = attr(node, "style")?;
        parse_style(&style)
            .into_iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value)
    }

    fn set_style(&self, node: &Handle, property: &str, value: Option<&str>) {
        let mut declarations = attr(node, "style")
            .map(|style| parse_style(&style))
            .unwrap_or_default();
        let existing = declarations.iter().position(|(name, _)| name == property);
        match (existing, value) {
            (Some(index), Some(value)) => declarations[index].1 = value.to_string(),
            (Some(index), None) => {
                declarations.remove(index);
            }
            (None, Some(value)) => declarations.push((property.to_string(), value.to_string())),
            (None, None) => return,
        }
        let style = declarations
            .iter()
            .map(|(name, value)| format!("{}: {}", name, value))
            .collect::<Vec<_>>()
            .join("; ");
        set_attr(node, "style", (!style.is_empty()).then_some(style.as_str()));
    }

    fn deep_clone(&self, node: &Handle) -> Handle {
        clone_subtree(node)
    }

    fn insert_before(&self, node: &Handle, reference: &Handle) -> bool {
        let Some(parent) = parent_of(reference) else {
            return false;
        };
        detach(node);
        let mut children = parent.children.borrow_mut();
        let index = children
            .iter()
            .position(|child| Rc::ptr_eq(child, reference))
            .unwrap_or(children.len());
        node.parent.set(Some(Rc::downgrade(&parent)));
        children.insert(index, node.clone());
        true
    }

    fn remove(&self, node: &Handle) {
        detach(node);
    }

    fn is_overlay(&self, node: &Handle) -> bool {
        tag_name(node) == Some("dialog")
    }

    fn is_open(&self, node: &Handle) -> bool {
        attr(node, "open").is_some()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NODE HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn tag_name(node: &Handle) -> Option<&str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(&*name.local),
        _ => None,
    }
}

fn attr(node: &Handle, name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == name)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

fn set_attr(node: &Handle, name: &str, value: Option<&str>) {
    let NodeData::Element { attrs, .. } = &node.data else {
        return;
    };
    let mut attrs = attrs.borrow_mut();
    let existing = attrs.iter().position(|a| &*a.name.local == name);
    match (existing, value) {
        (Some(index), Some(value)) => attrs[index].value = StrTendril::from_slice(value),
        (Some(index), None) => {
            attrs.remove(index);
        }
        (None, Some(value)) => attrs.push(Attribute {
            name: QualName::new(None, Namespace::from(""), LocalName::from(name)),
            value: StrTendril::from_slice(value),
        }),
        (None, None) => {}
    }
}

fn text_content(node: &Handle) -> String {
    fn collect_text(node: &Handle, out: &mut String) {
        match &node.data {
            NodeData::Text { contents } => out.push_str(&contents.borrow()),
            _ => {
                for child in node.children.borrow().iter() {
                    collect_text(child, out);
                }
            }
        }
    }

    let mut out = String::new();
    collect_text(node, &mut out);
    out
}

fn replace_text(node: &Handle, text: &str) {
    let old: Vec<Handle> = node.children.borrow_mut().drain(..).collect();
    for child in old {
        child.parent.set(None);
    }
    if !text.is_empty() {
        let contents = RefCell::new(StrTendril::from_slice(text));
        append(node, Node::new(NodeData::Text { contents }));
    }
}

fn parent_of(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take();
    let parent = weak.as_ref().and_then(Weak::upgrade);
    node.parent.set(weak);
    parent
}

fn append(parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

fn detach(node: &Handle) {
    if let Some(parent) = parent_of(node) {
        parent
            .children
            .borrow_mut()
            .retain(|child| !Rc::ptr_eq(child, node));
    }
    node.parent.set(None);
}

fn clone_subtree(node: &Handle) -> Handle {
    let data = match &node.data {
        NodeData::Document => NodeData::Document,
        NodeData::Doctype {
            name,
            public_id,
            system_id,
        } => NodeData::Doctype {
            name: name.clone(),
            public_id: public_id.clone(),
            system_id: system_id.clone(),
        },
        NodeData::Text { contents } => NodeData::Text {
            contents: RefCell::new(contents.borrow().clone()),
        },
        NodeData::Comment { contents } => NodeData::Comment {
            contents: contents.clone(),
        },
        NodeData::Element {
            name,
            attrs,
            template_contents,
            mathml_annotation_xml_integration_point,
        } => NodeData::Element {
            name: name.clone(),
            attrs: RefCell::new(attrs.borrow().clone()),
            template_contents: RefCell::new(template_contents.borrow().as_ref().map(clone_subtree)),
            mathml_annotation_xml_integration_point: *mathml_annotation_xml_integration_point,
        },
        NodeData::ProcessingInstruction { target, contents } => {
            NodeData::ProcessingInstruction {
                target: target.clone(),
                contents: contents.clone(),
            }
        }
    };

    let copy = Node::new(data);
    for child in node.children.borrow().iter() {
        append(&copy, clone_subtree(child));
    }
    copy
}

fn find_first(node: &Handle, predicate: &dyn Fn(&Handle) -> bool) -> Option<Handle> {
    if predicate(node) {
        return Some(node.clone());
    }
    node.children
        .borrow()
        .iter()
        .find_map(|child| find_first(child, predicate))
}

fn collect(node: &Handle, found: &mut Vec<Handle>, predicate: &dyn Fn(&Handle) -> bool) {
    if predicate(node) {
        found.push(node.clone());
    }
    for child in node.children.borrow().iter() {
        collect(child, found, predicate);
    }
}

fn options_of(select: &Handle) -> Vec<Handle> {
    let mut options = Vec::new();
    collect(select, &mut options, &|node| tag_name(node) == Some("option"));
    options
}

fn input_type(node: &Handle) -> Option<String> {
    attr(node, "type").map(|t| t.to_ascii_lowercase())
}

fn option_value(option: &Handle) -> String {
    attr(option, "value").unwrap_or_else(|| text_content(option).trim().to_string())
}

fn selected_option(select: &Handle) -> Option<Handle> {
    let options = options_of(select);
    options
        .iter()
        .find(|option| attr(option, "selected").is_some())
        .or_else(|| options.first())
        .cloned()
}

fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|declaration| {
            let (name, value) = declaration.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            (!name.is_empty()).then(|| (name, value.trim().to_string()))
        })
        .collect()
}

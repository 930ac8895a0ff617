//! Minimal element tree standing in for the host's DOM.
//!
//! The host augments its element type with `empty`, `createEl`, `createDiv`
//! and `setAttrs`. Here those helpers are plain functions taking the element
//! as their first argument, so nothing is patched globally.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::warn;

/// 事件監聽函式。 / Listener attached to an element.
pub type DomListener = Rc<dyn Fn(&DomEvent)>;

/// 派送到元素的事件。 / Event dispatched to an element's listeners.
#[derive(Debug, Clone)]
pub struct DomEvent {
    pub kind: String,
    pub target: Element,
    pub value: Option<String>,
}

#[derive(Default)]
struct NodeData {
    classes: Vec<String>,
    text: Option<String>,
    attrs: BTreeMap<String, String>,
    children: Vec<Element>,
    listeners: Vec<(String, DomListener)>,
}

struct Node {
    tag: String,
    data: RefCell<NodeData>,
    parent: RefCell<Weak<Node>>,
}

/// 共享的元素參照；複製只會增加參考計數。 / Shared element handle; cloning shares the node.
#[derive(Clone)]
pub struct Element {
    node: Rc<Node>,
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }
}

impl Eq for Element {}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.node.data.borrow();
        f.debug_struct("Element")
            .field("tag", &self.node.tag)
            .field("classes", &data.classes)
            .field("children", &data.children.len())
            .finish()
    }
}

impl Element {
    /// 建立尚未掛載的元素。 / Creates a detached element.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            node: Rc::new(Node {
                tag: tag.into(),
                data: RefCell::new(NodeData::default()),
                parent: RefCell::new(Weak::new()),
            }),
        }
    }

    pub fn tag(&self) -> &str {
        &self.node.tag
    }

    pub fn class_name(&self) -> String {
        self.node.data.borrow().classes.join(" ")
    }

    /// 以空白分隔的類別字串取代類別清單。 / Replaces the class list from a space separated string.
    pub fn set_class_name(&self, classes: &str) {
        self.node.data.borrow_mut().classes =
            classes.split_whitespace().map(str::to_string).collect();
    }

    pub fn add_class(&self, class: &str) {
        let mut data = self.node.data.borrow_mut();
        if !data.classes.iter().any(|existing| existing == class) {
            data.classes.push(class.to_string());
        }
    }

    pub fn remove_class(&self, class: &str) {
        self.node
            .data
            .borrow_mut()
            .classes
            .retain(|existing| existing != class);
    }

    pub fn toggle_class(&self, class: &str, enabled: bool) {
        if enabled {
            self.add_class(class);
        } else {
            self.remove_class(class);
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.node
            .data
            .borrow()
            .classes
            .iter()
            .any(|existing| existing == class)
    }

    /// 自身文字加上所有子節點文字。 / Own text followed by the text of every descendant.
    pub fn text_content(&self) -> String {
        let data = self.node.data.borrow();
        let mut out = data.text.clone().unwrap_or_default();
        for child in &data.children {
            out.push_str(&child.text_content());
        }
        out
    }

    /// 設定文字並移除所有子節點。 / Sets the text, dropping every child.
    pub fn set_text(&self, text: impl Into<String>) {
        let children = {
            let mut data = self.node.data.borrow_mut();
            data.text = Some(text.into());
            std::mem::take(&mut data.children)
        };
        for child in children {
            *child.node.parent.borrow_mut() = Weak::new();
        }
    }

    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.node.data.borrow().attrs.get(name).cloned()
    }

    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) {
        self.node
            .data
            .borrow_mut()
            .attrs
            .insert(name.into(), value.into());
    }

    pub fn remove_attribute(&self, name: &str) -> bool {
        self.node.data.borrow_mut().attrs.remove(name).is_some()
    }

    /// 將子節點附加至尾端；若已有父節點會先移出。 / Appends a child, moving it out of its previous parent.
    pub fn append_child(&self, child: &Element) {
        if child.contains(self) {
            warn!(tag = %child.tag(), "refusing to append an element into its own subtree");
            return;
        }
        child.remove();
        *child.node.parent.borrow_mut() = Rc::downgrade(&self.node);
        self.node.data.borrow_mut().children.push(child.clone());
    }

    pub fn remove_child(&self, child: &Element) -> bool {
        let removed = {
            let mut data = self.node.data.borrow_mut();
            let before = data.children.len();
            data.children.retain(|existing| existing != child);
            data.children.len() != before
        };
        if removed {
            *child.node.parent.borrow_mut() = Weak::new();
        }
        removed
    }

    /// 從父節點移除自身。 / Detaches the element from its parent.
    pub fn remove(&self) {
        if let Some(parent) = self.parent() {
            parent.remove_child(self);
        }
    }

    pub fn parent(&self) -> Option<Element> {
        self.node
            .parent
            .borrow()
            .upgrade()
            .map(|node| Element { node })
    }

    pub fn children(&self) -> Vec<Element> {
        self.node.data.borrow().children.clone()
    }

    pub fn child_count(&self) -> usize {
        self.node.data.borrow().children.len()
    }

    pub fn first_child(&self) -> Option<Element> {
        self.node.data.borrow().children.first().cloned()
    }

    /// 是否為自身或其子孫節點。 / Whether `other` is this element or one of its descendants.
    pub fn contains(&self, other: &Element) -> bool {
        if self == other {
            return true;
        }
        self.node
            .data
            .borrow()
            .children
            .iter()
            .any(|child| child.contains(other))
    }

    /// 深度優先尋找第一個具有指定類別的子孫。 / First descendant carrying `class`, depth first.
    pub fn find_by_class(&self, class: &str) -> Option<Element> {
        for child in self.children() {
            if child.has_class(class) {
                return Some(child);
            }
            if let Some(found) = child.find_by_class(class) {
                return Some(found);
            }
        }
        None
    }

    pub fn find_all_by_class(&self, class: &str) -> Vec<Element> {
        let mut found = Vec::new();
        for child in self.children() {
            if child.has_class(class) {
                found.push(child.clone());
            }
            found.extend(child.find_all_by_class(class));
        }
        found
    }

    pub fn find_by_tag(&self, tag: &str) -> Option<Element> {
        for child in self.children() {
            if child.tag() == tag {
                return Some(child);
            }
            if let Some(found) = child.find_by_tag(tag) {
                return Some(found);
            }
        }
        None
    }

    pub fn add_event_listener(&self, kind: impl Into<String>, listener: impl Fn(&DomEvent) + 'static) {
        self.node
            .data
            .borrow_mut()
            .listeners
            .push((kind.into(), Rc::new(listener)));
    }

    /// 派送事件並回傳被呼叫的監聽數量。 / Dispatches an event, returning how many listeners ran.
    pub fn dispatch_event(&self, kind: &str, value: Option<String>) -> usize {
        let listeners: Vec<DomListener> = self
            .node
            .data
            .borrow()
            .listeners
            .iter()
            .filter(|(registered, _)| registered == kind)
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        let event = DomEvent {
            kind: kind.to_string(),
            target: self.clone(),
            value,
        };
        for listener in &listeners {
            listener(&event);
        }
        listeners.len()
    }

    pub fn clear_listeners(&self) {
        self.node.data.borrow_mut().listeners.clear();
    }

    /// 以 HTML 字串表示此元素。 / Serializes the subtree as HTML, mainly for diagnostics and tests.
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        let data = self.node.data.borrow();
        out.push('<');
        out.push_str(&self.node.tag);
        if !data.classes.is_empty() {
            out.push_str(&format!(" class=\"{}\"", escape(&data.classes.join(" "))));
        }
        for (name, value) in &data.attrs {
            out.push_str(&format!(" {name}=\"{}\"", escape(value)));
        }
        out.push('>');
        if let Some(text) = &data.text {
            out.push_str(&escape(text));
        }
        for child in &data.children {
            child.write_html(out);
        }
        out.push_str(&format!("</{}>", self.node.tag));
    }
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// `createEl` 的選項。 / Options accepted by [`create_el`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementInfo {
    pub cls: Option<String>,
    pub text: Option<String>,
    pub input_type: Option<String>,
}

impl ElementInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cls(mut self, cls: impl Into<String>) -> Self {
        self.cls = Some(cls.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_type(mut self, input_type: impl Into<String>) -> Self {
        self.input_type = Some(input_type.into());
        self
    }
}

impl From<&str> for ElementInfo {
    fn from(cls: &str) -> Self {
        ElementInfo::new().with_cls(cls)
    }
}

impl From<String> for ElementInfo {
    fn from(cls: String) -> Self {
        ElementInfo::new().with_cls(cls)
    }
}

/// 移除所有子節點與文字。 / Removes every child and the element's own text.
pub fn empty(el: &Element) {
    let children = {
        let mut data = el.node.data.borrow_mut();
        data.text = None;
        std::mem::take(&mut data.children)
    };
    for child in children {
        *child.node.parent.borrow_mut() = Weak::new();
    }
}

/// 建立子元素並附加到 `parent`。 / Creates a child element and appends it to `parent`.
pub fn create_el(parent: &Element, tag: &str, info: impl Into<ElementInfo>) -> Element {
    create_el_with(parent, tag, info, |_| {})
}

/// 同 [`create_el`]，附加前先呼叫 `callback`。 / Like [`create_el`], running `callback` before appending.
pub fn create_el_with(
    parent: &Element,
    tag: &str,
    info: impl Into<ElementInfo>,
    callback: impl FnOnce(&Element),
) -> Element {
    let info = info.into();
    let el = Element::new(tag);
    if let Some(cls) = info.cls.filter(|cls| !cls.is_empty()) {
        el.set_class_name(&cls);
    }
    if let Some(text) = info.text.filter(|text| !text.is_empty()) {
        el.set_text(text);
    }
    if let Some(input_type) = info.input_type.filter(|_| tag == "input") {
        el.set_attribute("type", input_type);
    }
    callback(&el);
    parent.append_child(&el);
    el
}

pub fn create_div(parent: &Element, info: impl Into<ElementInfo>) -> Element {
    create_el(parent, "div", info)
}

pub fn create_div_with(
    parent: &Element,
    info: impl Into<ElementInfo>,
    callback: impl FnOnce(&Element),
) -> Element {
    create_el_with(parent, "div", info, callback)
}

/// 批次設定屬性。 / Sets every attribute from the iterator.
pub fn set_attrs<I, K, V>(el: &Element, attrs: I)
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    for (name, value) in attrs {
        el.set_attribute(name, value);
    }
}

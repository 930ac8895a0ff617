use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use smartcomposer_core::dom::{empty, Element};
use tracing::debug;

/// 外掛提供的設定頁。 / Settings page contributed by a plugin.
///
/// The shell assigns `container_el` before calling [`SettingTab::display`].
/// `display` must be idempotent; `hide` must release whatever `display`
/// attached.
pub trait SettingTab {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn container_el(&self) -> Element;

    fn set_container_el(&mut self, container_el: Element);

    fn display(&mut self);

    fn hide(&mut self) {}
}

pub type SharedSettingTab = Rc<RefCell<dyn SettingTab>>;

type Cleanup = Box<dyn FnOnce()>;

/// 外掛設定頁的共用基底。 / State shared by plugin setting tabs: identity, container and cleanups.
pub struct PluginSettingTab {
    id: String,
    name: String,
    container_el: Element,
    cleanups: Vec<Cleanup>,
}

impl fmt::Debug for PluginSettingTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginSettingTab")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("cleanups", &self.cleanups.len())
            .finish()
    }
}

impl PluginSettingTab {
    /// `id` and `name` come from the plugin manifest.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            container_el: Element::new("div"),
            cleanups: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn container_el(&self) -> Element {
        self.container_el.clone()
    }

    pub fn set_container_el(&mut self, container_el: Element) {
        self.container_el = container_el;
    }

    /// 清空容器後回傳，供 `display` 重新繪製。 / Releases the previous render and hands back an empty container.
    pub fn begin_display(&mut self) -> Element {
        self.release();
        self.container_el.clone()
    }

    /// Registers work to run on the next release.
    pub fn on_release(&mut self, cleanup: impl FnOnce() + 'static) {
        self.cleanups.push(Box::new(cleanup));
    }

    /// 執行清理並清空容器。 / Runs the registered cleanups and empties the container.
    pub fn release(&mut self) {
        let cleanups = std::mem::take(&mut self.cleanups);
        if !cleanups.is_empty() {
            debug!(tab = %self.id, count = cleanups.len(), "setting tab cleanups");
        }
        for cleanup in cleanups {
            cleanup();
        }
        empty(&self.container_el);
    }
}

/// 設定頁註冊表，以 id 去重。 / Registered setting tabs, deduplicated by id; the modal selects tabs by id.
#[derive(Clone, Default)]
pub struct SettingTabRegistry {
    tabs: Rc<RefCell<Vec<SharedSettingTab>>>,
}

impl fmt::Debug for SettingTabRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingTabRegistry")
            .field("tabs", &self.len())
            .finish()
    }
}

impl SettingTabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以 id 去重。 / Returns `false` when a tab with the same id is already registered.
    pub fn add(&self, tab: SharedSettingTab) -> bool {
        let id = tab.borrow().id().to_string();
        let mut tabs = self.tabs.borrow_mut();
        let duplicate = tabs.iter().any(|existing| existing.borrow().id() == id);
        if duplicate {
            debug!(tab = %id, "setting tab already registered");
            return false;
        }
        tabs.push(tab);
        true
    }

    /// Removes the tab with `id`, returning how many were removed (0 or 1).
    pub fn remove(&self, id: &str) -> usize {
        let mut tabs = self.tabs.borrow_mut();
        let before = tabs.len();
        tabs.retain(|tab| tab.borrow().id() != id);
        before - tabs.len()
    }

    pub fn get(&self, id: &str) -> Option<SharedSettingTab> {
        self.tabs
            .borrow()
            .iter()
            .find(|tab| tab.borrow().id() == id)
            .cloned()
    }

    /// Snapshot, in registration order.
    pub fn tabs(&self) -> Vec<SharedSettingTab> {
        self.tabs.borrow().clone()
    }

    /// `(id, name)` pairs, in registration order.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.tabs
            .borrow()
            .iter()
            .map(|tab| {
                let tab = tab.borrow();
                (tab.id().to_string(), tab.name().to_string())
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tabs.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.borrow().is_empty()
    }
}

use smartcomposer_core::dom::{create_div, create_el, empty, Element, ElementInfo};
use tracing::{debug, warn};

use crate::tab::{SettingTabRegistry, SharedSettingTab};

struct Mounted {
    id: String,
    tab: SharedSettingTab,
    content_el: Element,
}

/// 設定視窗外殼。 / Settings shell that mounts one registered tab at a time.
///
/// The only input is the active tab id. Every change goes through a single
/// render step that first tears down the previously mounted tab (`hide`,
/// then its content element is dropped) and only then mounts the next one
/// into a fresh container.
pub struct SettingsModal {
    registry: SettingTabRegistry,
    root_el: Element,
    nav_el: Element,
    main_el: Element,
    is_open: bool,
    active_tab_id: Option<String>,
    mounted: Option<Mounted>,
}

impl SettingsModal {
    pub fn new(registry: SettingTabRegistry) -> Self {
        let root_el = Element::new("div");
        root_el.add_class("modal-content");
        let header_el = create_div(&root_el, "modal-header");
        create_el(&header_el, "h2", ElementInfo::new().with_text("Settings"));
        let body_el = create_div(&root_el, "modal-body");
        let nav_el = create_el(&body_el, "nav", "modal-nav");
        let main_el = create_div(&body_el, "modal-main");
        Self {
            registry,
            root_el,
            nav_el,
            main_el,
            is_open: false,
            active_tab_id: None,
            mounted: None,
        }
    }

    pub fn root_el(&self) -> &Element {
        &self.root_el
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn active_tab_id(&self) -> Option<&str> {
        self.active_tab_id.as_deref()
    }

    /// Container handed to the mounted tab.
    pub fn content_el(&self) -> Option<Element> {
        self.mounted.as_ref().map(|mounted| mounted.content_el.clone())
    }

    /// 開啟並選取第一個設定頁。 / Opens the shell, selecting the first tab when none is active.
    pub fn open(&mut self) {
        self.is_open = true;
        if self.active_tab_id.is_none() {
            self.active_tab_id = self
                .registry
                .entries()
                .into_iter()
                .next()
                .map(|(id, _)| id);
        }
        self.render();
    }

    /// Returns `false` when the shell is closed or no tab has this id.
    pub fn select(&mut self, id: &str) -> bool {
        if !self.is_open {
            warn!(tab = %id, "select on a closed settings modal");
            return false;
        }
        if self.registry.get(id).is_none() {
            warn!(tab = %id, "unknown setting tab");
            return false;
        }
        self.active_tab_id = Some(id.to_string());
        self.render();
        true
    }

    /// 關閉並卸載目前的設定頁。 / Closes the shell and unmounts the active tab.
    pub fn close(&mut self) {
        self.is_open = false;
        self.active_tab_id = None;
        self.render();
    }

    fn render(&mut self) {
        self.render_nav();
        let desired = if self.is_open {
            self.active_tab_id.clone()
        } else {
            None
        };
        if self.mounted.as_ref().map(|mounted| mounted.id.as_str()) == desired.as_deref() {
            return;
        }

        if let Some(previous) = self.mounted.take() {
            debug!(tab = %previous.id, "unmount setting tab");
            previous.tab.borrow_mut().hide();
            previous.content_el.remove();
        }

        let Some(id) = desired else {
            return;
        };
        let Some(tab) = self.registry.get(&id) else {
            warn!(tab = %id, "active setting tab is no longer registered");
            self.active_tab_id = None;
            return;
        };
        let content_el = create_div(&self.main_el, "setting-tab-content");
        {
            let mut tab = tab.borrow_mut();
            tab.set_container_el(content_el.clone());
            tab.display();
        }
        debug!(tab = %id, "mount setting tab");
        self.mounted = Some(Mounted {
            id,
            tab,
            content_el,
        });
    }

    fn render_nav(&self) {
        empty(&self.nav_el);
        if !self.is_open {
            return;
        }
        create_div(&self.nav_el, "settings-nav-header").set_text("Plugins");
        for (id, name) in self.registry.entries() {
            let item = create_div(&self.nav_el, ElementInfo::new().with_cls("modal-nav-item").with_text(name));
            item.set_attribute("data-tab-id", id.clone());
            item.toggle_class("is-active", self.active_tab_id.as_deref() == Some(id.as_str()));
        }
    }
}

impl Drop for SettingsModal {
    fn drop(&mut self) {
        if let Some(mounted) = self.mounted.take() {
            if let Ok(mut tab) = mounted.tab.try_borrow_mut() {
                tab.hide();
            }
        }
    }
}

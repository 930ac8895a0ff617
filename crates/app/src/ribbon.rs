use std::cell::RefCell;
use std::rc::Rc;

use smartcomposer_core::dom::{create_el, Element, ElementInfo};
use tracing::debug;

struct RibbonIcon {
    owner: Option<String>,
    el: Element,
}

/// 左側功能列。 / Ribbon strip holding plugin action icons.
#[derive(Clone)]
pub struct Ribbon {
    container_el: Element,
    icons: Rc<RefCell<Vec<RibbonIcon>>>,
}

impl Ribbon {
    pub fn new(container_el: Element) -> Self {
        container_el.add_class("side-dock-ribbon");
        Self {
            container_el,
            icons: Rc::default(),
        }
    }

    pub fn container_el(&self) -> &Element {
        &self.container_el
    }

    /// 新增圖示並回傳其元素。 / Adds a clickable `div.ribbon-icon` and returns it.
    pub fn add_ribbon_icon(
        &self,
        icon: &str,
        title: &str,
        callback: impl Fn() + 'static,
    ) -> Element {
        self.add_owned(icon, title, callback, None)
    }

    pub(crate) fn add_owned(
        &self,
        icon: &str,
        title: &str,
        callback: impl Fn() + 'static,
        owner: Option<String>,
    ) -> Element {
        let el = create_el(&self.container_el, "div", "ribbon-icon");
        el.set_attribute("aria-label", title);
        el.set_attribute("data-icon", icon);
        create_el(&el, "i", ElementInfo::new().with_text(icon));
        el.add_event_listener("click", move |_| callback());
        debug!(icon = %icon, title = %title, "ribbon icon added");
        self.icons.borrow_mut().push(RibbonIcon {
            owner,
            el: el.clone(),
        });
        el
    }

    /// Titles, in insertion order.
    pub fn titles(&self) -> Vec<String> {
        self.icons
            .borrow()
            .iter()
            .filter_map(|icon| icon.el.get_attribute("aria-label"))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.icons.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.borrow().is_empty()
    }

    pub(crate) fn remove_owned_by(&self, owner: &str) -> usize {
        let mut icons = self.icons.borrow_mut();
        let before = icons.len();
        icons.retain(|icon| {
            if icon.owner.as_deref() == Some(owner) {
                icon.el.clear_listeners();
                icon.el.remove();
                false
            } else {
                true
            }
        });
        before - icons.len()
    }
}

use std::cell::RefCell;
use std::rc::Rc;

use smartcomposer_core::dom::Element;
use smartcomposer_settings::{
    PluginSettingTab, Setting, SettingTab, SettingTabRegistry, SettingsModal, SharedSettingTab,
};

type Journal = Rc<RefCell<Vec<String>>>;

struct DemoTab {
    base: PluginSettingTab,
    journal: Journal,
    model: Rc<RefCell<String>>,
}

impl DemoTab {
    fn shared(id: &str, name: &str, journal: &Journal) -> SharedSettingTab {
        Rc::new(RefCell::new(DemoTab {
            base: PluginSettingTab::new(id, name),
            journal: Rc::clone(journal),
            model: Rc::new(RefCell::new("gpt-4o".to_string())),
        }))
    }
}

impl SettingTab for DemoTab {
    fn id(&self) -> &str {
        self.base.id()
    }

    fn name(&self) -> &str {
        self.base.name()
    }

    fn container_el(&self) -> Element {
        self.base.container_el()
    }

    fn set_container_el(&mut self, container_el: Element) {
        self.base.set_container_el(container_el);
    }

    fn display(&mut self) {
        let container = self.base.begin_display();
        self.journal
            .borrow_mut()
            .push(format!("display:{}", self.base.id()));
        let model = Rc::clone(&self.model);
        Setting::new(&container)
            .set_name("Chat model")
            .add_text(|text| {
                text.set_value(&model.borrow());
                let model = Rc::clone(&model);
                text.on_change(move |value| *model.borrow_mut() = value);
            });
        let journal = Rc::clone(&self.journal);
        let id = self.base.id().to_string();
        self.base
            .on_release(move || journal.borrow_mut().push(format!("release:{id}")));
    }

    fn hide(&mut self) {
        self.journal
            .borrow_mut()
            .push(format!("hide:{}", self.base.id()));
        self.base.release();
    }
}

fn registry_with_two_tabs(journal: &Journal) -> SettingTabRegistry {
    let registry = SettingTabRegistry::new();
    assert!(registry.add(DemoTab::shared("smart-composer", "Smart Composer", journal)));
    assert!(registry.add(DemoTab::shared("other", "Other", journal)));
    registry
}

#[test]
fn display_twice_renders_once() {
    let journal: Journal = Rc::default();
    let tab = DemoTab::shared("smart-composer", "Smart Composer", &journal);
    let container = Element::new("div");
    tab.borrow_mut().set_container_el(container.clone());

    tab.borrow_mut().display();
    tab.borrow_mut().display();
    assert_eq!(container.find_all_by_class("setting-item").len(), 1);
    assert_eq!(
        *journal.borrow(),
        vec![
            "display:smart-composer",
            "release:smart-composer",
            "display:smart-composer"
        ]
    );

    tab.borrow_mut().hide();
    assert_eq!(container.child_count(), 0);
}

#[test]
fn registry_deduplicates_by_id() {
    let journal: Journal = Rc::default();
    let registry = registry_with_two_tabs(&journal);
    assert!(!registry.add(DemoTab::shared("other", "Other", &journal)));
    assert!(!registry.add(DemoTab::shared("other", "Other (advanced)", &journal)));
    assert_eq!(registry.len(), 2);

    let mut modal = SettingsModal::new(registry.clone());
    modal.open();
    assert!(modal.select("other"));
    assert_eq!(
        registry.get("other").map(|tab| tab.borrow().name().to_string()).as_deref(),
        Some("Other")
    );
    modal.close();

    assert_eq!(registry.remove("other"), 1);
    assert_eq!(
        registry.entries(),
        vec![("smart-composer".to_string(), "Smart Composer".to_string())]
    );
}

#[test]
fn open_mounts_first_tab() {
    let journal: Journal = Rc::default();
    let registry = registry_with_two_tabs(&journal);
    let mut modal = SettingsModal::new(registry.clone());
    modal.open();

    assert!(modal.is_open());
    assert_eq!(modal.active_tab_id(), Some("smart-composer"));
    let content = modal.content_el().unwrap();
    assert!(modal.root_el().contains(&content));
    assert_eq!(content.find_all_by_class("setting-item").len(), 1);
    let active_nav = modal.root_el().find_all_by_class("is-active");
    assert_eq!(active_nav.len(), 1);
    assert_eq!(active_nav[0].text_content(), "Smart Composer");

    // Re-opening an open shell keeps the mounted tab.
    modal.open();
    assert_eq!(*journal.borrow(), vec!["display:smart-composer"]);
}

#[test]
fn switching_tabs_tears_down_before_mounting() {
    let journal: Journal = Rc::default();
    let registry = registry_with_two_tabs(&journal);
    let mut modal = SettingsModal::new(registry);
    modal.open();
    let first_content = modal.content_el().unwrap();

    assert!(modal.select("other"));
    assert!(!modal.select("missing"));
    assert_eq!(
        *journal.borrow(),
        vec![
            "display:smart-composer",
            "hide:smart-composer",
            "release:smart-composer",
            "display:other"
        ]
    );
    assert!(first_content.parent().is_none());
    assert_eq!(
        modal.root_el().find_all_by_class("setting-tab-content").len(),
        1
    );

    modal.close();
    assert!(!modal.is_open());
    assert!(modal.content_el().is_none());
    assert_eq!(journal.borrow().last().map(String::as_str), Some("release:other"));
    assert!(!modal.select("other"));
}

#[test]
fn settings_changes_reach_the_tab_model() {
    let journal: Journal = Rc::default();
    let model = Rc::new(RefCell::new(String::new()));
    let tab = Rc::new(RefCell::new(DemoTab {
        base: PluginSettingTab::new("smart-composer", "Smart Composer"),
        journal: Rc::clone(&journal),
        model: Rc::clone(&model),
    }));
    let registry = SettingTabRegistry::new();
    registry.add(tab);
    let mut modal = SettingsModal::new(registry);
    modal.open();

    let input = modal
        .content_el()
        .unwrap()
        .find_by_tag("input")
        .expect("text input rendered");
    input.set_attribute("value", "claude-3.5-sonnet");
    input.dispatch_event("input", None);
    assert_eq!(*model.borrow(), "claude-3.5-sonnet");
}

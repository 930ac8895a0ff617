//! Setting rows and their controls.
//!
//! Every control keeps its state on its element (`value`, `checked`,
//! `disabled` attributes) and routes callbacks through element events, so a
//! shell that only sees the element tree can drive them.

use smartcomposer_core::dom::{create_div, create_el, DomEvent, Element, ElementInfo};

/// Value carried by an event, falling back to the target's `value` attribute.
fn event_value(event: &DomEvent) -> String {
    event
        .value
        .clone()
        .or_else(|| event.target.get_attribute("value"))
        .unwrap_or_default()
}

/// 按鈕。 / Push button control.
#[derive(Debug, Clone)]
pub struct ButtonComponent {
    pub button_el: Element,
}

impl ButtonComponent {
    pub fn new(container_el: &Element) -> Self {
        Self {
            button_el: create_el(container_el, "button", ElementInfo::new()),
        }
    }

    pub fn set_button_text(&self, text: &str) -> &Self {
        self.button_el.set_text(text);
        self
    }

    /// Icons are not rendered; the id is kept as an attribute.
    pub fn set_icon(&self, icon: &str) -> &Self {
        self.button_el.set_attribute("data-icon", icon);
        self
    }

    pub fn set_tooltip(&self, tooltip: &str) -> &Self {
        self.button_el.set_attribute("title", tooltip);
        self
    }

    pub fn set_cta(&self) -> &Self {
        self.button_el.add_class("mod-cta");
        self
    }

    pub fn set_warning(&self) -> &Self {
        self.button_el.add_class("mod-warning");
        self
    }

    pub fn set_disabled(&self, disabled: bool) -> &Self {
        if disabled {
            self.button_el.set_attribute("disabled", "true");
        } else {
            self.button_el.remove_attribute("disabled");
        }
        self
    }

    pub fn is_disabled(&self) -> bool {
        self.button_el.get_attribute("disabled").is_some()
    }

    pub fn on_click(&self, callback: impl Fn() + 'static) -> &Self {
        self.button_el.add_event_listener("click", move |_| callback());
        self
    }

    /// 模擬使用者點擊；停用時不觸發。 / Simulates a user click; disabled buttons ignore it.
    pub fn click(&self) -> usize {
        if self.is_disabled() {
            return 0;
        }
        self.button_el.dispatch_event("click", None)
    }
}

/// 單行文字輸入。 / Single-line text input.
#[derive(Debug, Clone)]
pub struct TextComponent {
    pub input_el: Element,
}

impl TextComponent {
    pub fn new(container_el: &Element) -> Self {
        Self {
            input_el: create_el(
                container_el,
                "input",
                ElementInfo::new().with_cls("setting-input").with_type("text"),
            ),
        }
    }

    pub fn set_value(&self, value: &str) -> &Self {
        self.input_el.set_attribute("value", value);
        self
    }

    pub fn get_value(&self) -> String {
        self.input_el.get_attribute("value").unwrap_or_default()
    }

    pub fn set_placeholder(&self, placeholder: &str) -> &Self {
        self.input_el.set_attribute("placeholder", placeholder);
        self
    }

    pub fn on_change(&self, callback: impl Fn(String) + 'static) -> &Self {
        self.input_el
            .add_event_listener("input", move |event| callback(event_value(event)));
        self
    }

    /// Simulates typing: stores the value and fires `input`.
    pub fn input(&self, value: &str) {
        self.set_value(value);
        self.input_el.dispatch_event("input", Some(value.to_string()));
    }
}

/// 多行文字輸入。 / Multi-line text input.
#[derive(Debug, Clone)]
pub struct TextAreaComponent {
    pub input_el: Element,
}

impl TextAreaComponent {
    pub fn new(container_el: &Element) -> Self {
        Self {
            input_el: create_el(container_el, "textarea", "setting-textarea"),
        }
    }

    pub fn set_value(&self, value: &str) -> &Self {
        self.input_el.set_attribute("value", value);
        self
    }

    pub fn get_value(&self) -> String {
        self.input_el.get_attribute("value").unwrap_or_default()
    }

    pub fn set_placeholder(&self, placeholder: &str) -> &Self {
        self.input_el.set_attribute("placeholder", placeholder);
        self
    }

    pub fn on_change(&self, callback: impl Fn(String) + 'static) -> &Self {
        self.input_el
            .add_event_listener("input", move |event| callback(event_value(event)));
        self
    }

    pub fn input(&self, value: &str) {
        self.set_value(value);
        self.input_el.dispatch_event("input", Some(value.to_string()));
    }
}

/// 下拉選單。 / Select box with `(value, display)` options.
#[derive(Debug, Clone)]
pub struct DropdownComponent {
    pub select_el: Element,
}

impl DropdownComponent {
    pub fn new(container_el: &Element) -> Self {
        Self {
            select_el: create_el(container_el, "select", "dropdown"),
        }
    }

    pub fn add_option(&self, value: &str, display: &str) -> &Self {
        let option = create_el(&self.select_el, "option", ElementInfo::new().with_text(display));
        option.set_attribute("value", value);
        if self.select_el.get_attribute("value").is_none() {
            self.select_el.set_attribute("value", value);
        }
        self
    }

    pub fn add_options<'a, I>(&self, options: I) -> &Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (value, display) in options {
            self.add_option(value, display);
        }
        self
    }

    pub fn options(&self) -> Vec<String> {
        self.select_el
            .children()
            .iter()
            .filter_map(|option| option.get_attribute("value"))
            .collect()
    }

    pub fn get_value(&self) -> String {
        self.select_el.get_attribute("value").unwrap_or_default()
    }

    pub fn set_value(&self, value: &str) -> &Self {
        self.select_el.set_attribute("value", value);
        self
    }

    pub fn on_change(&self, callback: impl Fn(String) + 'static) -> &Self {
        self.select_el
            .add_event_listener("change", move |event| callback(event_value(event)));
        self
    }

    /// Simulates picking an option. Values that are not options are ignored.
    pub fn select(&self, value: &str) -> bool {
        if !self.options().iter().any(|option| option == value) {
            return false;
        }
        self.set_value(value);
        self.select_el.dispatch_event("change", Some(value.to_string()));
        true
    }
}

/// 開關。 / Checkbox-backed toggle.
#[derive(Debug, Clone)]
pub struct ToggleComponent {
    pub toggle_el: Element,
    input_el: Element,
}

impl ToggleComponent {
    pub fn new(container_el: &Element) -> Self {
        let toggle_el = create_div(container_el, "setting-toggle");
        let input_el = create_el(&toggle_el, "input", ElementInfo::new().with_type("checkbox"));
        Self {
            toggle_el,
            input_el,
        }
    }

    pub fn set_value(&self, value: bool) -> &Self {
        if value {
            self.input_el.set_attribute("checked", "true");
        } else {
            self.input_el.remove_attribute("checked");
        }
        self.toggle_el.toggle_class("is-enabled", value);
        self
    }

    pub fn get_value(&self) -> bool {
        self.input_el.get_attribute("checked").is_some()
    }

    pub fn on_change(&self, callback: impl Fn(bool) + 'static) -> &Self {
        self.input_el.add_event_listener("change", move |event| {
            callback(event.value.as_deref() == Some("true"))
        });
        self
    }

    /// Simulates a click on the checkbox.
    pub fn toggle(&self) -> bool {
        let next = !self.get_value();
        self.set_value(next);
        self.input_el
            .dispatch_event("change", Some(next.to_string()));
        next
    }
}

/// 設定列：名稱、說明與控制項。 / One settings row: name, description and controls.
#[derive(Debug, Clone)]
pub struct Setting {
    pub setting_el: Element,
    pub info_el: Element,
    pub name_el: Element,
    pub desc_el: Element,
    pub control_el: Element,
}

impl Setting {
    pub fn new(container_el: &Element) -> Self {
        let setting_el = create_div(container_el, "setting-item");
        let info_el = create_div(&setting_el, "setting-item-info");
        let name_el = create_div(&info_el, "setting-item-name");
        let desc_el = create_div(&info_el, "setting-item-description");
        let control_el = create_div(&setting_el, "setting-item-control");
        Self {
            setting_el,
            info_el,
            name_el,
            desc_el,
            control_el,
        }
    }

    pub fn set_name(&self, name: &str) -> &Self {
        self.name_el.set_text(name);
        self
    }

    pub fn set_desc(&self, desc: &str) -> &Self {
        self.desc_el.set_text(desc);
        self
    }

    pub fn set_heading(&self) -> &Self {
        self.setting_el.add_class("setting-item-heading");
        self
    }

    pub fn set_class(&self, class: &str) -> &Self {
        self.setting_el.add_class(class);
        self
    }

    /// Removes the row from its container.
    pub fn clear(&self) {
        self.setting_el.remove();
    }

    pub fn add_button(&self, build: impl FnOnce(&ButtonComponent)) -> &Self {
        build(&ButtonComponent::new(&self.control_el));
        self
    }

    pub fn add_text(&self, build: impl FnOnce(&TextComponent)) -> &Self {
        build(&TextComponent::new(&self.control_el));
        self
    }

    pub fn add_text_area(&self, build: impl FnOnce(&TextAreaComponent)) -> &Self {
        build(&TextAreaComponent::new(&self.control_el));
        self
    }

    pub fn add_toggle(&self, build: impl FnOnce(&ToggleComponent)) -> &Self {
        build(&ToggleComponent::new(&self.control_el));
        self
    }

    pub fn add_dropdown(&self, build: impl FnOnce(&DropdownComponent)) -> &Self {
        build(&DropdownComponent::new(&self.control_el));
        self
    }
}

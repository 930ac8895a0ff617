//! 示範用的 Smart Composer 外掛。 / Demo composer plugin exercising the host surface.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use smartcomposer_app::{Command, Hotkey, Plugin, PluginContext, PluginError, PluginManifest};
use smartcomposer_core::dom::{create_div, create_el, empty, Element, ElementInfo};
use smartcomposer_settings::{PluginSettingTab, Setting, SettingTab};
use smartcomposer_vault::TFile;
use smartcomposer_workspace::{
    Editor, ItemViewBase, View, ViewError, ViewState, ViewVariant, Workspace, WorkspaceLeaf,
};
use tracing::{debug, warn};

pub const PLUGIN_ID: &str = "smart-composer";
pub const CHAT_VIEW_TYPE: &str = "smtcmp-chat-view";
pub const APPLY_VIEW_TYPE: &str = "smtcmp-apply-view";

pub const CHAT_MODELS: &[(&str, &str)] = &[
    ("claude-3.5-sonnet", "Claude 3.5 Sonnet"),
    ("gpt-4o", "GPT-4o"),
    ("gpt-4o-mini", "GPT-4o mini"),
];

/// 持久化的外掛設定。 / Settings persisted through `save_data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComposerSettings {
    pub chat_model: String,
    pub system_prompt: String,
    pub include_current_file: bool,
}

impl Default for ComposerSettings {
    fn default() -> Self {
        Self {
            chat_model: CHAT_MODELS[0].0.to_string(),
            system_prompt: String::new(),
            include_current_file: true,
        }
    }
}

/// A block of text quoted into the chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub file: Option<String>,
    pub content: String,
}

struct ChatView {
    base: ItemViewBase,
    mentions: Vec<Mention>,
    messages_el: Option<Element>,
}

impl ChatView {
    fn new(leaf: &WorkspaceLeaf) -> Self {
        Self {
            base: ItemViewBase::new(leaf),
            mentions: Vec::new(),
            messages_el: None,
        }
    }

    fn render(&self) {
        let Some(messages_el) = &self.messages_el else {
            return;
        };
        empty(messages_el);
        for mention in &self.mentions {
            let item = create_div(messages_el, "smtcmp-mention");
            if let Some(file) = &mention.file {
                item.set_attribute("data-file", file.as_str());
            }
            item.set_text(mention.content.as_str());
        }
    }
}

impl View for ChatView {
    fn variant(&self) -> ViewVariant {
        ViewVariant::Chat
    }

    fn view_type(&self) -> &str {
        CHAT_VIEW_TYPE
    }

    fn display_text(&self) -> String {
        "Smart composer chat".to_string()
    }

    fn on_open(&mut self) -> Result<(), ViewError> {
        self.base.set_title("Chat");
        let content = self.base.content_el();
        empty(content);
        self.messages_el = Some(create_div(content, "smtcmp-chat-messages"));
        create_el(
            content,
            "textarea",
            ElementInfo::new().with_cls("smtcmp-chat-input"),
        );
        self.render();
        Ok(())
    }

    fn on_close(&mut self) -> Result<(), ViewError> {
        self.messages_el = None;
        empty(self.base.content_el());
        Ok(())
    }

    fn get_state(&self) -> Option<Value> {
        Some(json!({ "mentions": self.mentions }))
    }

    fn set_state(&mut self, state: Value) -> Result<(), ViewError> {
        let mentions = match state.get("mentions") {
            Some(raw) => serde_json::from_value(raw.clone())
                .map_err(|err| ViewError::InvalidState(err.to_string()))?,
            None => Vec::new(),
        };
        self.mentions = mentions;
        self.render();
        Ok(())
    }
}

/// State of the apply view: a pending rewrite of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyState {
    pub file: String,
    pub original_content: String,
    pub new_content: String,
}

impl ApplyState {
    /// 逐行差異。 / Line diff: unchanged lines keep a two-space prefix, removals `-`, additions `+`.
    pub fn diff(&self) -> Vec<String> {
        let old: Vec<&str> = self.original_content.lines().collect();
        let new: Vec<&str> = self.new_content.lines().collect();
        let mut lcs = vec![vec![0usize; new.len() + 1]; old.len() + 1];
        for i in (0..old.len()).rev() {
            for j in (0..new.len()).rev() {
                lcs[i][j] = if old[i] == new[j] {
                    lcs[i + 1][j + 1] + 1
                } else {
                    lcs[i + 1][j].max(lcs[i][j + 1])
                };
            }
        }
        let (mut i, mut j) = (0, 0);
        let mut out = Vec::new();
        while i < old.len() && j < new.len() {
            if old[i] == new[j] {
                out.push(format!("  {}", old[i]));
                i += 1;
                j += 1;
            } else if lcs[i + 1][j] >= lcs[i][j + 1] {
                out.push(format!("- {}", old[i]));
                i += 1;
            } else {
                out.push(format!("+ {}", new[j]));
                j += 1;
            }
        }
        out.extend(old[i..].iter().map(|line| format!("- {line}")));
        out.extend(new[j..].iter().map(|line| format!("+ {line}")));
        out
    }
}

struct ApplyView {
    base: ItemViewBase,
    state: Option<ApplyState>,
}

impl ApplyView {
    fn render(&self) {
        let content = self.base.content_el();
        empty(content);
        let Some(state) = &self.state else {
            return;
        };
        let diff_el = create_div(content, "smtcmp-apply-diff");
        for line in state.diff() {
            let cls = match line.chars().next() {
                Some('+') => "smtcmp-diff-added",
                Some('-') => "smtcmp-diff-removed",
                _ => "smtcmp-diff-unchanged",
            };
            create_div(&diff_el, ElementInfo::new().with_cls(cls).with_text(line));
        }
    }
}

impl View for ApplyView {
    fn variant(&self) -> ViewVariant {
        ViewVariant::Apply
    }

    fn view_type(&self) -> &str {
        APPLY_VIEW_TYPE
    }

    fn display_text(&self) -> String {
        let name = self
            .state
            .as_ref()
            .map(|state| state.file.rsplit('/').next().unwrap_or(&state.file).to_string())
            .unwrap_or_default();
        format!("Applying: {name}")
    }

    fn on_open(&mut self) -> Result<(), ViewError> {
        self.render();
        Ok(())
    }

    fn get_state(&self) -> Option<Value> {
        self.state
            .as_ref()
            .and_then(|state| serde_json::to_value(state).ok())
    }

    fn set_state(&mut self, state: Value) -> Result<(), ViewError> {
        let state = serde_json::from_value(state)
            .map_err(|err| ViewError::InvalidState(err.to_string()))?;
        self.state = Some(state);
        self.render();
        Ok(())
    }
}

/// Opens the chat view in the right sidebar, reusing an existing chat leaf.
pub fn activate_chat_view(workspace: &Workspace, mention: Option<Mention>) {
    let existing = workspace.get_leaves_of_type(CHAT_VIEW_TYPE).into_iter().next();
    let leaf = match existing {
        Some(leaf) => leaf,
        None => {
            let Some(leaf) = workspace.get_right_leaf(true) else {
                warn!("no right sidebar leaf for the chat view");
                return;
            };
            leaf.set_view_state(ViewState::new(CHAT_VIEW_TYPE).active(true));
            leaf
        }
    };
    if let Some(mention) = mention {
        let mut state = leaf.get_view_state().state.unwrap_or_else(|| json!({}));
        let mut mentions: Vec<Mention> = state
            .get("mentions")
            .cloned()
            .and_then(|raw| serde_json::from_value(raw).ok())
            .unwrap_or_default();
        mentions.push(mention);
        state["mentions"] = json!(mentions);
        if let Some(Err(err)) = leaf.with_view_mut(|view| view.set_state(state)) {
            warn!(error = %err, "failed to add selection to chat");
        }
    }
    workspace.set_active_leaf(&leaf);
    workspace.reveal_leaf(&leaf);
}

/// Opens `file` in an apply view showing the rewrite to `new_content`.
pub fn open_apply_view(workspace: &Workspace, file: &TFile, new_content: &str) {
    let original_content = match workspace.vault().read(file) {
        Ok(content) => content,
        Err(err) => {
            warn!(path = %file.path, error = %err, "cannot read file for apply view");
            return;
        }
    };
    let state = ApplyState {
        file: file.path.clone(),
        original_content,
        new_content: new_content.to_string(),
    };
    let Ok(state) = serde_json::to_value(state) else {
        return;
    };
    let leaf = workspace.get_leaf(true);
    leaf.set_view_state(
        ViewState::new(APPLY_VIEW_TYPE)
            .active(true)
            .with_state(state),
    );
}

fn selection_mention(editor: &Editor, file: Option<&TFile>) -> Option<Mention> {
    let content = editor.get_selection();
    if content.trim().is_empty() {
        return None;
    }
    Some(Mention {
        file: file.map(|file| file.path.clone()),
        content: content.to_string(),
    })
}

struct ComposerSettingTab {
    base: PluginSettingTab,
    ctx: PluginContext,
    settings: Rc<RefCell<ComposerSettings>>,
}

impl ComposerSettingTab {
    fn persist(ctx: &PluginContext, settings: &Rc<RefCell<ComposerSettings>>) {
        let snapshot = settings.borrow().clone();
        if let Err(err) = ctx.save_data(&snapshot) {
            warn!(error = %err, "failed to save settings");
            ctx.notice(format!("Failed to save settings: {err}"));
        }
    }
}

impl SettingTab for ComposerSettingTab {
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
        let current = self.settings.borrow().clone();

        Setting::new(&container).set_name("Chat").set_heading();

        let (ctx, settings) = (self.ctx.clone(), Rc::clone(&self.settings));
        let chat_model = current.chat_model.clone();
        Setting::new(&container)
            .set_name("Chat model")
            .set_desc("Model used for chat responses.")
            .add_dropdown(move |dropdown| {
                dropdown
                    .add_options(CHAT_MODELS.iter().copied())
                    .set_value(&chat_model)
                    .on_change(move |value| {
                        settings.borrow_mut().chat_model = value;
                        Self::persist(&ctx, &settings);
                    });
            });

        let (ctx, settings) = (self.ctx.clone(), Rc::clone(&self.settings));
        let system_prompt = current.system_prompt.clone();
        Setting::new(&container)
            .set_name("System prompt")
            .set_desc("Prepended to every conversation.")
            .add_text_area(move |text| {
                text.set_placeholder("You are a helpful writing assistant.")
                    .set_value(&system_prompt)
                    .on_change(move |value| {
                        settings.borrow_mut().system_prompt = value;
                        Self::persist(&ctx, &settings);
                    });
            });

        let (ctx, settings) = (self.ctx.clone(), Rc::clone(&self.settings));
        Setting::new(&container)
            .set_name("Include current file")
            .add_toggle(move |toggle| {
                toggle
                    .set_value(current.include_current_file)
                    .on_change(move |value| {
                        settings.borrow_mut().include_current_file = value;
                        Self::persist(&ctx, &settings);
                    });
            });

        let (ctx, settings) = (self.ctx.clone(), Rc::clone(&self.settings));
        Setting::new(&container)
            .set_name("Reset")
            .add_button(move |button| {
                button.set_button_text("Restore defaults").set_warning().on_click(move || {
                    *settings.borrow_mut() = ComposerSettings::default();
                    Self::persist(&ctx, &settings);
                });
            });
        debug!("composer settings rendered");
    }

    fn hide(&mut self) {
        self.base.release();
    }
}

/// 示範外掛本體。 / The demo plugin.
pub struct ComposerPlugin {
    manifest: PluginManifest,
    settings: Rc<RefCell<ComposerSettings>>,
}

impl ComposerPlugin {
    pub fn new() -> Self {
        let mut manifest = PluginManifest::new(PLUGIN_ID, "Smart Composer", env!("CARGO_PKG_VERSION"));
        manifest.description = Some("Chat with your notes and apply edits.".to_string());
        Self {
            manifest,
            settings: Rc::default(),
        }
    }
}

impl Default for ComposerPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for ComposerPlugin {
    fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    fn on_load(&mut self, ctx: &PluginContext) -> Result<(), PluginError> {
        let settings: ComposerSettings = ctx.load_data()?.unwrap_or_default();
        *self.settings.borrow_mut() = settings;

        ctx.register_view(CHAT_VIEW_TYPE, |leaf| Box::new(ChatView::new(leaf)) as Box<dyn View>);
        ctx.register_view(APPLY_VIEW_TYPE, |leaf| {
            Box::new(ApplyView {
                base: ItemViewBase::new(leaf),
                state: None,
            }) as Box<dyn View>
        });

        let workspace = ctx.workspace().clone();
        ctx.add_ribbon_icon("wand-sparkles", "Open smart composer", move || {
            activate_chat_view(&workspace, None)
        });

        let workspace = ctx.workspace().clone();
        ctx.add_command(
            Command::new("open-new-chat", "Open chat")
                .with_callback(move || activate_chat_view(&workspace, None)),
        );

        let (workspace, notice_ctx) = (ctx.workspace().clone(), ctx.clone());
        ctx.add_command(
            Command::new("add-selection-to-chat", "Add selection to chat")
                .with_hotkey(Hotkey::new(["Mod", "Shift"], "L"))
                .with_editor_callback(move |editor, file| match selection_mention(editor, file) {
                    Some(mention) => activate_chat_view(&workspace, Some(mention)),
                    None => notice_ctx.notice("Select some text to add it to the chat"),
                }),
        );

        ctx.add_setting_tab(Rc::new(RefCell::new(ComposerSettingTab {
            base: PluginSettingTab::new(&self.manifest.id, &self.manifest.name),
            ctx: ctx.clone(),
            settings: Rc::clone(&self.settings),
        })));
        Ok(())
    }

    fn on_unload(&mut self, ctx: &PluginContext) {
        let snapshot = self.settings.borrow().clone();
        if let Err(err) = ctx.save_data(&snapshot) {
            warn!(error = %err, "failed to save settings on unload");
        }
    }
}

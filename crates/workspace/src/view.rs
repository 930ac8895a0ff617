use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use smartcomposer_core::dom::{create_div, empty, Element};
use smartcomposer_vault::{TFile, VaultError};
use thiserror::Error;

use crate::editor::Editor;
use crate::leaf::{WeakLeaf, WorkspaceLeaf};

/// 檢視種類標籤，以值比較取代類別名稱反射。 / Tag carried by every view, compared by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewVariant {
    Markdown,
    Chat,
    Apply,
    Custom(String),
}

impl fmt::Display for ViewVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewVariant::Markdown => f.write_str("markdown"),
            ViewVariant::Chat => f.write_str("chat"),
            ViewVariant::Apply => f.write_str("apply"),
            ViewVariant::Custom(name) => write!(f, "custom:{name}"),
        }
    }
}

/// 檢視生命週期錯誤。 / Errors raised from view lifecycle hooks.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error("no view registered for type '{0}'")]
    MissingFactory(String),
    #[error("invalid view state: {0}")]
    InvalidState(String),
    #[error(transparent)]
    Vault(#[from] VaultError),
}

/// `setViewState` / `getViewState` 交換的資料。 / Payload exchanged through a leaf's view-state protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    #[serde(rename = "type")]
    pub view_type: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
}

impl ViewState {
    pub fn new(view_type: impl Into<String>) -> Self {
        Self {
            view_type: view_type.into(),
            active: false,
            state: None,
        }
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_state(mut self, state: Value) -> Self {
        self.state = Some(state);
        self
    }
}

/// 掛載於分頁中的檢視。 / A panel hosted by a leaf.
///
/// The leaf drives the lifecycle: `set_state` (when state is supplied) always
/// completes before `on_open`, and `on_close` runs before the view is
/// replaced or its leaf is detached.
pub trait View {
    fn variant(&self) -> ViewVariant;

    /// Registry key this view was created under.
    fn view_type(&self) -> &str;

    fn display_text(&self) -> String;

    fn on_open(&mut self) -> Result<(), ViewError> {
        Ok(())
    }

    fn on_close(&mut self) -> Result<(), ViewError> {
        Ok(())
    }

    /// Serializable state; `None` is reported as an empty object.
    fn get_state(&self) -> Option<Value> {
        None
    }

    fn set_state(&mut self, _state: Value) -> Result<(), ViewError> {
        Ok(())
    }

    /// Persists pending edits; views without a backing file have nothing to do.
    fn save(&mut self) -> Result<(), ViewError> {
        Ok(())
    }

    /// File shown by the view, if any.
    fn file(&self) -> Option<TFile> {
        None
    }

    /// 顯示中的檔案被改名或移動。 / The shown file was renamed or moved; `file` is the handle at its new path.
    ///
    /// Unsaved editor content must survive the move.
    fn on_rename(&mut self, _file: TFile) -> Result<(), ViewError> {
        Ok(())
    }

    fn editor(&self) -> Option<&Editor> {
        None
    }

    fn editor_mut(&mut self) -> Option<&mut Editor> {
        None
    }
}

/// 以 `view-header` / `view-content` 結構初始化分頁容器。 / Builds the header/content skeleton shared by item views.
#[derive(Debug, Clone)]
pub struct ItemViewBase {
    leaf: WeakLeaf,
    header_el: Element,
    title_el: Element,
    content_el: Element,
}

impl ItemViewBase {
    /// Empties the leaf container and creates the header and content elements.
    pub fn new(leaf: &WorkspaceLeaf) -> Self {
        let container = leaf.container_el();
        empty(&container);
        let header_el = create_div(&container, "view-header");
        let title_el = create_div(&header_el, "view-header-title");
        let content_el = create_div(&container, "view-content");
        Self {
            leaf: leaf.downgrade(),
            header_el,
            title_el,
            content_el,
        }
    }

    /// Element the view renders into.
    pub fn content_el(&self) -> &Element {
        &self.content_el
    }

    pub fn header_el(&self) -> &Element {
        &self.header_el
    }

    pub fn set_title(&self, title: &str) {
        self.title_el.set_text(title);
    }

    pub fn leaf(&self) -> Option<WorkspaceLeaf> {
        self.leaf.upgrade()
    }

    /// Detaches the owning leaf, if it is still alive.
    pub fn close(&self) {
        if let Some(leaf) = self.leaf() {
            leaf.detach();
        }
    }
}

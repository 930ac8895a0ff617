use serde_json::{json, Value};
use smartcomposer_core::dom::{create_div, Element};
use smartcomposer_vault::{TFile, Vault, VaultError};
use tracing::debug;

use crate::editor::Editor;
use crate::leaf::WorkspaceLeaf;
use crate::view::{ItemViewBase, View, ViewError, ViewVariant};

/// 內建 Markdown 檢視的型別名稱。 / Registry key of the built-in markdown view.
pub const MARKDOWN_VIEW_TYPE: &str = "markdown";

/// 內建 Markdown 編輯檢視。 / Built-in markdown view: one vault file loaded into an [`Editor`].
pub struct MarkdownView {
    base: ItemViewBase,
    source_el: Element,
    vault: Vault,
    file: Option<TFile>,
    editor: Editor,
}

impl MarkdownView {
    pub fn new(leaf: &WorkspaceLeaf, vault: Vault) -> Self {
        let base = ItemViewBase::new(leaf);
        let source_el = create_div(base.content_el(), "markdown-source-view");
        Self {
            base,
            source_el,
            vault,
            file: None,
            editor: Editor::new(""),
        }
    }

    /// 讀取檔案內容到編輯器。 / Reads `file` from the vault into the editor.
    pub fn load_file(&mut self, file: TFile) -> Result<(), ViewError> {
        let content = self.vault.read(&file)?;
        debug!(path = %file.path, "markdown view load");
        self.editor.set_value(content);
        self.base.set_title(&file.basename);
        self.file = Some(file);
        self.render();
        Ok(())
    }

    /// 將編輯器內容寫回檔案庫。 / Writes the editor's text back to the vault.
    pub fn save_file(&mut self) -> Result<TFile, ViewError> {
        let file = self
            .file
            .as_ref()
            .ok_or_else(|| ViewError::InvalidState("no file loaded".into()))?;
        let updated = self.vault.write(file, self.editor.get_value())?;
        self.file = Some(updated.clone());
        self.render();
        Ok(updated)
    }

    pub fn editor_text(&self) -> &str {
        self.editor.get_value()
    }

    fn render(&self) {
        self.source_el.set_text(self.editor.get_value());
    }
}

impl View for MarkdownView {
    fn variant(&self) -> ViewVariant {
        ViewVariant::Markdown
    }

    fn view_type(&self) -> &str {
        MARKDOWN_VIEW_TYPE
    }

    fn display_text(&self) -> String {
        self.file
            .as_ref()
            .map(|file| file.basename.clone())
            .unwrap_or_else(|| "No file".to_string())
    }

    fn get_state(&self) -> Option<Value> {
        let file = self.file.as_ref()?;
        Some(json!({ "file": file.path }))
    }

    fn set_state(&mut self, state: Value) -> Result<(), ViewError> {
        let Some(path) = state.get("file").and_then(Value::as_str) else {
            return Ok(());
        };
        let file = self
            .vault
            .get_file_by_path(path)
            .ok_or_else(|| VaultError::NotFound(path.to_string()))?;
        self.load_file(file)
    }

    fn save(&mut self) -> Result<(), ViewError> {
        self.save_file().map(|_| ())
    }

    fn file(&self) -> Option<TFile> {
        self.file.clone()
    }

    fn on_rename(&mut self, file: TFile) -> Result<(), ViewError> {
        debug!(path = %file.path, "markdown view follows rename");
        self.base.set_title(&file.basename);
        self.file = Some(file);
        Ok(())
    }

    fn editor(&self) -> Option<&Editor> {
        Some(&self.editor)
    }

    fn editor_mut(&mut self) -> Option<&mut Editor> {
        Some(&mut self.editor)
    }
}

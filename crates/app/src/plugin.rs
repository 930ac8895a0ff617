use std::cell::RefCell;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smartcomposer_core::dom::Element;
use smartcomposer_settings::SharedSettingTab;
use smartcomposer_vault::Vault;
use smartcomposer_workspace::{View, Workspace, WorkspaceLeaf};
use thiserror::Error;
use tracing::debug;

use crate::app::App;
use crate::commands::Command;
use crate::notice::Notice;
use crate::storage::StorageError;

/// Separator between a plugin id and its command ids.
pub const COMMAND_ID_SEPARATOR: char = ':';

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin '{0}' is already loaded")]
    AlreadyLoaded(String),
    #[error("plugin '{0}' is not loaded")]
    NotLoaded(String),
    #[error("plugin '{plugin}' failed to load: {reason}")]
    LoadFailed { plugin: String, reason: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// 外掛清單。 / Plugin manifest metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    pub id: String,
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl PluginManifest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            description: None,
            author: None,
        }
    }
}

/// 外掛生命週期。 / Plugin lifecycle driven by [`App::load_plugin`] / [`App::unload_plugin`].
///
/// Everything registered through the [`PluginContext`] is removed by the
/// host after `on_unload` returns.
pub trait Plugin {
    fn manifest(&self) -> &PluginManifest;

    fn on_load(&mut self, ctx: &PluginContext) -> Result<(), PluginError>;

    fn on_unload(&mut self, _ctx: &PluginContext) {}
}

#[derive(Debug, Default)]
pub(crate) struct Registrations {
    pub(crate) view_types: Vec<String>,
    pub(crate) setting_tab_ids: Vec<String>,
}

/// 外掛可用的主機 API。 / Host surface handed to a plugin, recording what it registers.
#[derive(Clone)]
pub struct PluginContext {
    app: App,
    manifest: PluginManifest,
    registrations: Rc<RefCell<Registrations>>,
}

impl PluginContext {
    pub(crate) fn new(app: App, manifest: PluginManifest) -> Self {
        Self {
            app,
            manifest,
            registrations: Rc::default(),
        }
    }

    pub(crate) fn registrations(&self) -> Rc<RefCell<Registrations>> {
        Rc::clone(&self.registrations)
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    pub fn vault(&self) -> &Vault {
        self.app.vault()
    }

    pub fn workspace(&self) -> &Workspace {
        self.app.workspace()
    }

    /// 讀取外掛資料，不存在時為 `None`。 / Loads the plugin's persisted JSON, `None` when nothing was saved.
    pub fn load_data<T: DeserializeOwned>(&self) -> Result<Option<T>, PluginError> {
        let Some(value) = self.load_data_value()? else {
            return Ok(None);
        };
        let data = serde_json::from_value(value).map_err(|source| StorageError::Parse {
            key: self.manifest.id.clone(),
            source,
        })?;
        Ok(Some(data))
    }

    pub fn load_data_value(&self) -> Result<Option<Value>, PluginError> {
        Ok(self.app.load_data(&self.manifest.id)?)
    }

    pub fn save_data<T: Serialize>(&self, data: &T) -> Result<(), PluginError> {
        let value = serde_json::to_value(data).map_err(|source| StorageError::Serialize {
            key: self.manifest.id.clone(),
            source,
        })?;
        self.app.save_data(&self.manifest.id, &value)?;
        Ok(())
    }

    /// Full id a command registered under `command_id` ends up with.
    pub fn command_id(&self, command_id: &str) -> String {
        format!("{}{COMMAND_ID_SEPARATOR}{command_id}", self.manifest.id)
    }

    /// 註冊命令，id 會加上外掛前綴。 / Registers a command with its id prefixed by the plugin id.
    pub fn add_command(&self, mut command: Command) -> bool {
        command.id = self.command_id(&command.id);
        self.app
            .commands()
            .add_owned(command, Some(self.manifest.id.clone()))
    }

    pub fn register_view<F>(&self, view_type: &str, factory: F)
    where
        F: Fn(&WorkspaceLeaf) -> Box<dyn View> + 'static,
    {
        self.app.register_view(view_type, factory);
        let mut registrations = self.registrations.borrow_mut();
        if !registrations.view_types.iter().any(|ty| ty == view_type) {
            registrations.view_types.push(view_type.to_string());
        }
    }

    pub fn add_ribbon_icon(&self, icon: &str, title: &str, callback: impl Fn() + 'static) -> Element {
        self.app
            .ribbon()
            .add_owned(icon, title, callback, Some(self.manifest.id.clone()))
    }

    pub fn add_setting_tab(&self, tab: SharedSettingTab) -> bool {
        let id = tab.borrow().id().to_string();
        let added = self.app.add_setting_tab(tab);
        if added {
            debug!(plugin = %self.manifest.id, tab = %id, "setting tab added");
            self.registrations.borrow_mut().setting_tab_ids.push(id);
        }
        added
    }

    pub fn notice(&self, message: impl Into<String>) {
        self.app.notices().push(Notice::new(message));
    }
}

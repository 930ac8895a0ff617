use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use smartcomposer_core::dom::{create_div, Element};
use smartcomposer_settings::{SettingTabRegistry, SettingsModal, SharedSettingTab};
use smartcomposer_vault::Vault;
use smartcomposer_workspace::{View, ViewRegistry, Workspace, WorkspaceLeaf, WorkspaceMounts};
use tracing::{debug, error, info};

use crate::commands::{Command, CommandError, CommandInfo, CommandRegistry};
use crate::notice::{Notice, NoticeBoard};
use crate::plugin::{Plugin, PluginContext, PluginError, Registrations};
use crate::ribbon::Ribbon;
use crate::storage::{DataStorage, MemoryStorage, StorageError};

struct LoadedPlugin {
    plugin: Box<dyn Plugin>,
    registrations: Rc<RefCell<Registrations>>,
}

struct AppInner {
    root_el: Element,
    vault: Vault,
    workspace: Workspace,
    views: ViewRegistry,
    commands: CommandRegistry,
    setting_tabs: SettingTabRegistry,
    ribbon: Ribbon,
    notices: NoticeBoard,
    storage: Rc<dyn DataStorage>,
    plugins: RefCell<Vec<LoadedPlugin>>,
}

/// 應用程式外觀：聚合工作區、保存庫與外掛介面。 / Application façade tying the vault, workspace and plugin surfaces together.
///
/// Cheap to clone; every clone shares the same state.
#[derive(Clone)]
pub struct App {
    inner: Rc<AppInner>,
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("workspace", &self.inner.workspace)
            .field("commands", &self.inner.commands.len())
            .field("plugins", &self.plugin_ids())
            .finish()
    }
}

impl App {
    pub fn new(storage: impl DataStorage + 'static) -> Self {
        let root_el = Element::new("div");
        root_el.add_class("app-container");
        let ribbon = Ribbon::new(create_div(&root_el, "ribbon"));
        let workspace_el = create_div(&root_el, "workspace");
        let vault = Vault::new();
        let views = ViewRegistry::new();
        let workspace = Workspace::new(
            vault.clone(),
            views.clone(),
            WorkspaceMounts::new(&workspace_el),
        );
        Self {
            inner: Rc::new(AppInner {
                root_el,
                vault,
                workspace,
                views,
                commands: CommandRegistry::new(),
                setting_tabs: SettingTabRegistry::new(),
                ribbon,
                notices: NoticeBoard::new(),
                storage: Rc::new(storage),
                plugins: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Application backed by process-local plugin storage.
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }

    pub fn root_el(&self) -> &Element {
        &self.inner.root_el
    }

    pub fn vault(&self) -> &Vault {
        &self.inner.vault
    }

    pub fn workspace(&self) -> &Workspace {
        &self.inner.workspace
    }

    pub fn views(&self) -> &ViewRegistry {
        &self.inner.views
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.inner.commands
    }

    pub fn setting_tabs(&self) -> &SettingTabRegistry {
        &self.inner.setting_tabs
    }

    pub fn ribbon(&self) -> &Ribbon {
        &self.inner.ribbon
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.inner.notices
    }

    pub fn register_view<F>(&self, view_type: &str, factory: F)
    where
        F: Fn(&WorkspaceLeaf) -> Box<dyn View> + 'static,
    {
        self.inner.views.register_view(view_type, factory);
    }

    /// Returns `false` when a command with the same id exists.
    pub fn add_command(&self, command: Command) -> bool {
        self.inner.commands.add(command)
    }

    pub fn list_commands(&self) -> Vec<CommandInfo> {
        self.inner.commands.list()
    }

    pub fn execute_command(&self, id: &str) -> Result<(), CommandError> {
        self.inner.commands.execute(id, &self.inner.workspace)
    }

    /// Returns `false` when a tab with the same id is registered.
    pub fn add_setting_tab(&self, tab: SharedSettingTab) -> bool {
        self.inner.setting_tabs.add(tab)
    }

    pub fn add_ribbon_icon(&self, icon: &str, title: &str, callback: impl Fn() + 'static) -> Element {
        self.inner.ribbon.add_ribbon_icon(icon, title, callback)
    }

    pub fn notice(&self, message: impl Into<String>) {
        self.inner.notices.push(Notice::new(message));
    }

    /// Settings shell over every registered setting tab.
    pub fn settings_modal(&self) -> SettingsModal {
        SettingsModal::new(self.inner.setting_tabs.clone())
    }

    /// 讀取以 `key` 保存的 JSON。 / Loads the JSON document stored under `key`.
    pub fn load_data(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let Some(raw) = self.inner.storage.get(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Parse {
                key: key.to_string(),
                source,
            })
    }

    pub fn save_data(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let raw = serde_json::to_string_pretty(value).map_err(|source| StorageError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.inner.storage.set(key, &raw)
    }

    pub fn plugin_ids(&self) -> Vec<String> {
        self.inner
            .plugins
            .borrow()
            .iter()
            .map(|loaded| loaded.plugin.manifest().id.clone())
            .collect()
    }

    pub fn is_plugin_loaded(&self, id: &str) -> bool {
        self.inner
            .plugins
            .borrow()
            .iter()
            .any(|loaded| loaded.plugin.manifest().id == id)
    }

    /// 載入外掛；失敗時撤銷其已註冊項目。 / Loads a plugin, rolling back its registrations when `on_load` fails.
    pub fn load_plugin(&self, mut plugin: Box<dyn Plugin>) -> Result<(), PluginError> {
        let manifest = plugin.manifest().clone();
        if self.is_plugin_loaded(&manifest.id) {
            return Err(PluginError::AlreadyLoaded(manifest.id));
        }
        let ctx = PluginContext::new(self.clone(), manifest.clone());
        if let Err(err) = plugin.on_load(&ctx) {
            error!(plugin = %manifest.id, error = %err, "plugin failed to load");
            self.remove_registrations(&manifest.id, &ctx.registrations());
            return Err(err);
        }
        info!(plugin = %manifest.id, version = %manifest.version, "plugin loaded");
        self.inner.plugins.borrow_mut().push(LoadedPlugin {
            plugin,
            registrations: ctx.registrations(),
        });
        Ok(())
    }

    /// 卸載外掛並移除其命令、檢視、設定頁與圖示。 / Unloads a plugin and removes everything it registered.
    pub fn unload_plugin(&self, id: &str) -> Result<(), PluginError> {
        let loaded = {
            let mut plugins = self.inner.plugins.borrow_mut();
            let index = plugins
                .iter()
                .position(|loaded| loaded.plugin.manifest().id == id)
                .ok_or_else(|| PluginError::NotLoaded(id.to_string()))?;
            plugins.remove(index)
        };
        let LoadedPlugin {
            mut plugin,
            registrations,
        } = loaded;
        let ctx = PluginContext::new(self.clone(), plugin.manifest().clone());
        plugin.on_unload(&ctx);
        self.remove_registrations(id, &registrations);
        info!(plugin = %id, "plugin unloaded");
        Ok(())
    }

    fn remove_registrations(&self, plugin_id: &str, registrations: &Rc<RefCell<Registrations>>) {
        let registrations = std::mem::take(&mut *registrations.borrow_mut());
        let commands = self.inner.commands.remove_owned_by(plugin_id);
        let icons = self.inner.ribbon.remove_owned_by(plugin_id);
        for view_type in &registrations.view_types {
            self.inner.workspace.detach_leaves_of_type(view_type);
            self.inner.views.unregister_view(view_type);
        }
        for tab_id in &registrations.setting_tab_ids {
            self.inner.setting_tabs.remove(tab_id);
        }
        debug!(
            plugin = %plugin_id,
            commands,
            icons,
            views = registrations.view_types.len(),
            tabs = registrations.setting_tab_ids.len(),
            "plugin registrations removed"
        );
    }
}

//! 應用程式外觀與外掛介面。 / Application façade and the plugin-facing host surface.
//!
//! [`App`] bundles the vault, workspace, command palette, ribbon, notices,
//! setting tabs and plugin data storage. Plugins see it through a
//! [`PluginContext`] that records what they register so unloading can undo it.

mod app;
mod commands;
mod notice;
mod plugin;
mod ribbon;
mod storage;

pub use app::App;
pub use commands::{
    Command, CommandCallback, CommandError, CommandInfo, CommandRegistry, EditorCallback, Hotkey,
};
pub use notice::{Notice, NoticeBoard, DEFAULT_NOTICE_DURATION};
pub use plugin::{Plugin, PluginContext, PluginError, PluginManifest, COMMAND_ID_SEPARATOR};
pub use ribbon::Ribbon;
pub use storage::{DataStorage, FileStorage, MemoryStorage, StorageError};

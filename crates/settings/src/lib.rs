//! 設定頁橋接層。 / Settings bridge: the tab contract, setting controls and the settings shell.

pub mod components;
pub mod modal;
pub mod tab;

pub use components::{
    ButtonComponent, DropdownComponent, Setting, TextAreaComponent, TextComponent,
    ToggleComponent,
};
pub use modal::SettingsModal;
pub use tab::{PluginSettingTab, SettingTab, SettingTabRegistry, SharedSettingTab};

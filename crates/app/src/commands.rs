use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use smartcomposer_vault::TFile;
use smartcomposer_workspace::{Editor, Workspace};
use thiserror::Error;
use tracing::debug;

pub type CommandCallback = Rc<dyn Fn()>;
pub type EditorCallback = Rc<dyn Fn(&mut Editor, Option<&TFile>)>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("command '{0}' not found")]
    UnknownCommand(String),
    #[error("command '{0}' requires an active markdown editor")]
    NoActiveEditor(String),
    #[error("command '{0}' has no callback")]
    NoCallback(String),
}

/// Hotkey declared with a command (`mod` is the platform modifier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hotkey {
    pub modifiers: Vec<String>,
    pub key: String,
}

impl Hotkey {
    pub fn new<I, S>(modifiers: I, key: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            modifiers: modifiers.into_iter().map(Into::into).collect(),
            key: key.into(),
        }
    }
}

/// 命令面板中的命令。 / Command-palette entry.
///
/// `callback` wins over `editor_callback`; the latter only runs while a
/// markdown view is active.
#[derive(Clone)]
pub struct Command {
    pub id: String,
    pub name: String,
    pub hotkeys: Vec<Hotkey>,
    callback: Option<CommandCallback>,
    editor_callback: Option<EditorCallback>,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("hotkeys", &self.hotkeys)
            .field("callback", &self.callback.is_some())
            .field("editor_callback", &self.editor_callback.is_some())
            .finish()
    }
}

impl Command {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            hotkeys: Vec::new(),
            callback: None,
            editor_callback: None,
        }
    }

    pub fn with_callback(mut self, callback: impl Fn() + 'static) -> Self {
        self.callback = Some(Rc::new(callback));
        self
    }

    pub fn with_editor_callback(
        mut self,
        callback: impl Fn(&mut Editor, Option<&TFile>) + 'static,
    ) -> Self {
        self.editor_callback = Some(Rc::new(callback));
        self
    }

    pub fn with_hotkey(mut self, hotkey: Hotkey) -> Self {
        self.hotkeys.push(hotkey);
        self
    }

    pub fn is_editor_command(&self) -> bool {
        self.callback.is_none() && self.editor_callback.is_some()
    }
}

/// Listing entry returned by [`CommandRegistry::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandInfo {
    pub id: String,
    pub name: String,
    pub editor: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

struct Entry {
    command: Command,
    owner: Option<String>,
}

/// 命令註冊表，依 id 去重，先註冊者優先。 / Commands in registration order; the first registration of an id wins.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    entries: Rc<RefCell<Vec<Entry>>>,
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.len())
            .finish()
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the id is already taken.
    pub fn add(&self, command: Command) -> bool {
        self.add_owned(command, None)
    }

    pub(crate) fn add_owned(&self, command: Command, owner: Option<String>) -> bool {
        let mut entries = self.entries.borrow_mut();
        if entries.iter().any(|entry| entry.command.id == command.id) {
            debug!(command = %command.id, "command already registered");
            return false;
        }
        debug!(command = %command.id, "register command");
        entries.push(Entry { command, owner });
        true
    }

    pub fn remove(&self, id: &str) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|entry| entry.command.id != id);
        before != entries.len()
    }

    /// Removes every command registered on behalf of `owner`.
    pub fn remove_owned_by(&self, owner: &str) -> usize {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|entry| entry.owner.as_deref() != Some(owner));
        before - entries.len()
    }

    pub fn get(&self, id: &str) -> Option<Command> {
        self.entries
            .borrow()
            .iter()
            .find(|entry| entry.command.id == id)
            .map(|entry| entry.command.clone())
    }

    pub fn list(&self) -> Vec<CommandInfo> {
        self.entries
            .borrow()
            .iter()
            .map(|entry| CommandInfo {
                id: entry.command.id.clone(),
                name: entry.command.name.clone(),
                editor: entry.command.is_editor_command(),
                owner: entry.owner.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// 執行命令。 / Runs the command's callback, or its editor callback against the active markdown editor.
    ///
    /// The registry is not borrowed while the callback runs, so callbacks
    /// may register or remove commands.
    pub fn execute(&self, id: &str, workspace: &Workspace) -> Result<(), CommandError> {
        let command = self
            .get(id)
            .ok_or_else(|| CommandError::UnknownCommand(id.to_string()))?;
        if let Some(callback) = command.callback {
            debug!(command = %id, "execute command");
            callback();
            return Ok(());
        }
        let Some(editor_callback) = command.editor_callback else {
            return Err(CommandError::NoCallback(id.to_string()));
        };
        debug!(command = %id, "execute editor command");
        workspace
            .with_active_editor(|editor, file| editor_callback(editor, file))
            .ok_or_else(|| CommandError::NoActiveEditor(id.to_string()))
    }
}

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use smartcomposer_core::events::{Event, EventBus, EventRef};
use smartcomposer_core::path::{self, PathError, ROOT_PATH};
use thiserror::Error;
use tracing::debug;

use crate::handle::{AbstractFile, TFile, TFolder, VaultPath};
use crate::store::{Node, Store};

/// 虛擬檔案系統的錯誤。 / Errors surfaced to vault callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("file or folder already exists: {0}")]
    AlreadyExists(String),
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
}

impl VaultError {
    fn invalid(path: &str, reason: impl fmt::Display) -> Self {
        VaultError::InvalidPath {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type VaultResult<T> = Result<T, VaultError>;

/// 事件名稱。 / Names vault listeners subscribe to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VaultEventKind {
    Create,
    Modify,
    Delete,
    Rename,
}

impl VaultEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VaultEventKind::Create => "create",
            VaultEventKind::Modify => "modify",
            VaultEventKind::Delete => "delete",
            VaultEventKind::Rename => "rename",
        }
    }
}

/// 變更通知；一律在後端更新完成後發出。 / Change notification, always emitted after the store is updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultEvent {
    Create(AbstractFile),
    Modify(TFile),
    Delete(AbstractFile),
    Rename { file: AbstractFile, old_path: String },
}

impl VaultEvent {
    /// The affected handle.
    pub fn file(&self) -> AbstractFile {
        match self {
            VaultEvent::Create(file) | VaultEvent::Delete(file) => file.clone(),
            VaultEvent::Modify(file) => AbstractFile::File(file.clone()),
            VaultEvent::Rename { file, .. } => file.clone(),
        }
    }
}

impl Event for VaultEvent {
    type Kind = VaultEventKind;

    fn kind(&self) -> VaultEventKind {
        match self {
            VaultEvent::Create(_) => VaultEventKind::Create,
            VaultEvent::Modify(_) => VaultEventKind::Modify,
            VaultEvent::Delete(_) => VaultEventKind::Delete,
            VaultEvent::Rename { .. } => VaultEventKind::Rename,
        }
    }
}

struct VaultInner {
    store: RefCell<Store>,
    events: EventBus<VaultEvent>,
}

/// In-memory vault. Cloning yields another handle onto the same store.
#[derive(Clone)]
pub struct Vault {
    inner: Rc<VaultInner>,
}

impl Default for Vault {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Vault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vault")
            .field("revision", &self.revision())
            .finish()
    }
}

impl Vault {
    /// 建立空的檔案庫。 / Creates an empty vault.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(VaultInner {
                store: RefCell::new(Store::default()),
                events: EventBus::new(),
            }),
        }
    }

    /// Whether both handles point at the same store.
    pub fn ptr_eq(&self, other: &Vault) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn on(&self, kind: VaultEventKind, listener: impl Fn(&VaultEvent) + 'static) -> EventRef {
        self.inner.events.on(kind, listener)
    }

    pub fn off(&self, event_ref: EventRef) -> bool {
        self.inner.events.off(event_ref)
    }

    /// Monotonic counter bumped by every mutation.
    pub fn revision(&self) -> u64 {
        self.inner.store.borrow().revision()
    }

    /// 讀取檔案內容。 / Reads the file's content.
    pub fn read(&self, file: &TFile) -> VaultResult<String> {
        let file_path = path::normalize_path(&file.path);
        match self.inner.store.borrow().get(&file_path) {
            Some(Node::File { content, .. }) => Ok(content.clone()),
            _ => Err(VaultError::NotFound(file.path.clone())),
        }
    }

    /// Same as [`Vault::read`]; every file is already in memory.
    pub fn cached_read(&self, file: &TFile) -> VaultResult<String> {
        self.read(file)
    }

    /// 覆寫檔案內容並更新修改時間。 / Replaces a file's content and refreshes its mtime.
    ///
    /// Returns the refreshed handle; the handle passed in keeps its old stat.
    pub fn write(&self, file: &TFile, content: &str) -> VaultResult<TFile> {
        let file_path = path::validate_path(&file.path)
            .map_err(|err| VaultError::invalid(&file.path, err))?;
        let updated = {
            let mut store = self.inner.store.borrow_mut();
            match store.get(&file_path) {
                Some(Node::File { .. }) => {}
                Some(Node::Folder { .. }) => {
                    return Err(VaultError::invalid(&file_path, "path is a folder"))
                }
                None => return Err(VaultError::NotFound(file_path)),
            }
            store.set_content(&file_path, content.to_string());
            store
                .file_handle(&file_path)
                .ok_or_else(|| VaultError::NotFound(file_path.clone()))?
        };
        debug!(path = %updated.path, size = updated.stat.size, "vault modify");
        self.inner.events.emit(&VaultEvent::Modify(updated.clone()));
        Ok(updated)
    }

    /// Alias of [`Vault::write`].
    pub fn modify(&self, file: &TFile, content: &str) -> VaultResult<TFile> {
        self.write(file, content)
    }

    pub fn append(&self, file: &TFile, text: &str) -> VaultResult<TFile> {
        let mut content = self.read(file)?;
        content.push_str(text);
        self.write(file, &content)
    }

    /// Read-modify-write in one step.
    pub fn process(&self, file: &TFile, update: impl FnOnce(&str) -> String) -> VaultResult<String> {
        let current = self.read(file)?;
        let next = update(&current);
        self.write(file, &next)?;
        Ok(next)
    }

    /// 建立新檔案；缺少的上層資料夾會一併建立。 / Creates a file, materializing missing ancestor folders.
    pub fn create(&self, raw_path: &str, content: &str) -> VaultResult<TFile> {
        let file_path = self.checked_path(raw_path)?;
        let (created_folders, file) = {
            let mut store = self.inner.store.borrow_mut();
            if store.get(&file_path).is_some() {
                return Err(VaultError::AlreadyExists(file_path));
            }
            let created_folders = ensure_ancestors(&mut store, &file_path)?;
            let now = store.tick();
            store.insert(
                file_path.clone(),
                Node::File {
                    content: content.to_string(),
                    ctime: now,
                    mtime: now,
                },
            );
            let file = store
                .file_handle(&file_path)
                .ok_or_else(|| VaultError::NotFound(file_path.clone()))?;
            let folders: Vec<AbstractFile> = created_folders
                .iter()
                .filter_map(|folder| store.handle(folder))
                .collect();
            (folders, file)
        };
        for folder in created_folders {
            self.inner.events.emit(&VaultEvent::Create(folder));
        }
        debug!(path = %file.path, "vault create");
        self.inner
            .events
            .emit(&VaultEvent::Create(AbstractFile::File(file.clone())));
        Ok(file)
    }

    /// 建立資料夾；該路徑或其下已有任何節點時失敗。 / Creates a folder; fails when anything lives at or under the path.
    pub fn create_folder(&self, raw_path: &str) -> VaultResult<TFolder> {
        let folder_path = self.checked_path(raw_path)?;
        let (created, folder) = {
            let mut store = self.inner.store.borrow_mut();
            if store.occupies(&folder_path) {
                return Err(VaultError::AlreadyExists(folder_path));
            }
            let mut created = ensure_ancestors(&mut store, &folder_path)?;
            let now = store.tick();
            store.insert(folder_path.clone(), Node::Folder { ctime: now });
            created.push(folder_path.clone());
            let handles: Vec<AbstractFile> = created
                .iter()
                .filter_map(|folder| store.handle(folder))
                .collect();
            let folder = store
                .folder_handle(&folder_path)
                .ok_or_else(|| VaultError::NotFound(folder_path.clone()))?;
            (handles, folder)
        };
        debug!(path = %folder.path, "vault create folder");
        for handle in created {
            self.inner.events.emit(&VaultEvent::Create(handle));
        }
        Ok(folder)
    }

    /// 刪除檔案或整個資料夾子樹。 / Deletes a file, or a folder together with everything below it.
    pub fn delete<H: VaultPath + ?Sized>(&self, target: &H) -> VaultResult<()> {
        let target_path = path::normalize_path(target.vault_path());
        if target_path == ROOT_PATH {
            return Err(VaultError::invalid(ROOT_PATH, "the vault root cannot be deleted"));
        }
        let removed = {
            let mut store = self.inner.store.borrow_mut();
            let handle = store
                .handle(&target_path)
                .ok_or_else(|| VaultError::NotFound(target_path.clone()))?;
            store.remove_subtree(&target_path);
            handle
        };
        debug!(path = %target_path, "vault delete");
        self.inner.events.emit(&VaultEvent::Delete(removed));
        Ok(())
    }

    /// 移動或重新命名節點（含子樹）。 / Moves or renames a node together with its subtree.
    pub fn rename<H: VaultPath + ?Sized>(&self, target: &H, new_path: &str) -> VaultResult<AbstractFile> {
        let old_path = path::normalize_path(target.vault_path());
        let new_path = self.checked_path(new_path)?;
        if old_path == ROOT_PATH {
            return Err(VaultError::invalid(ROOT_PATH, "the vault root cannot be renamed"));
        }
        if path::is_descendant(&new_path, &old_path) {
            return Err(VaultError::invalid(&new_path, "cannot move a folder into itself"));
        }
        let (created_folders, renamed) = {
            let mut store = self.inner.store.borrow_mut();
            if store.get(&old_path).is_none() {
                return Err(VaultError::NotFound(old_path));
            }
            if old_path == new_path {
                let current = store
                    .handle(&old_path)
                    .ok_or_else(|| VaultError::NotFound(old_path.clone()))?;
                return Ok(current);
            }
            if store.get(&new_path).is_some() {
                return Err(VaultError::AlreadyExists(new_path));
            }
            let created = ensure_ancestors(&mut store, &new_path)?;
            store.move_subtree(&old_path, &new_path);
            let folders: Vec<AbstractFile> = created
                .iter()
                .filter_map(|folder| store.handle(folder))
                .collect();
            let renamed = store
                .handle(&new_path)
                .ok_or_else(|| VaultError::NotFound(new_path.clone()))?;
            (folders, renamed)
        };
        for folder in created_folders {
            self.inner.events.emit(&VaultEvent::Create(folder));
        }
        debug!(from = %old_path, to = %new_path, "vault rename");
        self.inner.events.emit(&VaultEvent::Rename {
            file: renamed.clone(),
            old_path,
        });
        Ok(renamed)
    }

    /// Snapshot of every file, rebuilt from the store on each call.
    pub fn get_files(&self) -> Vec<TFile> {
        self.inner.store.borrow().files()
    }

    pub fn get_markdown_files(&self) -> Vec<TFile> {
        self.get_files()
            .into_iter()
            .filter(TFile::is_markdown)
            .collect()
    }

    /// Snapshot of every folder, synthetic root excluded.
    pub fn get_all_folders(&self) -> Vec<TFolder> {
        self.inner.store.borrow().folders()
    }

    pub fn get_root(&self) -> TFolder {
        self.inner.store.borrow().root()
    }

    pub fn get_file_by_path(&self, raw_path: &str) -> Option<TFile> {
        self.inner
            .store
            .borrow()
            .file_handle(&path::normalize_path(raw_path))
    }

    pub fn get_folder_by_path(&self, raw_path: &str) -> Option<TFolder> {
        self.inner
            .store
            .borrow()
            .folder_handle(&path::normalize_path(raw_path))
    }

    pub fn get_abstract_file_by_path(&self, raw_path: &str) -> Option<AbstractFile> {
        self.inner
            .store
            .borrow()
            .handle(&path::normalize_path(raw_path))
    }

    pub fn exists(&self, raw_path: &str) -> bool {
        let normalized = path::normalize_path(raw_path);
        normalized == ROOT_PATH || self.inner.store.borrow().get(&normalized).is_some()
    }

    fn checked_path(&self, raw_path: &str) -> VaultResult<String> {
        path::validate_path(raw_path).map_err(|err: PathError| VaultError::invalid(raw_path, err))
    }
}

/// Inserts missing ancestor folders of `node_path`; returns the ones created, shallowest first.
fn ensure_ancestors(store: &mut Store, node_path: &str) -> VaultResult<Vec<String>> {
    let ancestors = path::ancestors(node_path);
    for ancestor in &ancestors {
        if let Some(Node::File { .. }) = store.get(ancestor) {
            return Err(VaultError::invalid(
                node_path,
                format!("ancestor '{ancestor}' is a file"),
            ));
        }
    }
    let mut created = Vec::new();
    for ancestor in ancestors {
        if store.get(&ancestor).is_none() {
            let now = store.tick();
            store.insert(ancestor.clone(), Node::Folder { ctime: now });
            created.push(ancestor);
        }
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn kinds(log: &Rc<RefCell<Vec<String>>>) -> Vec<String> {
        log.borrow().clone()
    }

    fn record_all(vault: &Vault) -> Rc<RefCell<Vec<String>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        for kind in [
            VaultEventKind::Create,
            VaultEventKind::Modify,
            VaultEventKind::Delete,
            VaultEventKind::Rename,
        ] {
            let log = Rc::clone(&log);
            vault.on(kind, move |event| {
                log.borrow_mut()
                    .push(format!("{}:{}", event.kind().as_str(), event.file().path()));
            });
        }
        log
    }

    #[test]
    fn create_read_write_roundtrip() {
        let vault = Vault::new();
        let file = vault.create("Welcome.md", "# Hi").unwrap();
        assert_eq!(vault.read(&file).unwrap(), "# Hi");

        let updated = vault.write(&file, "# Bye").unwrap();
        assert_eq!(vault.cached_read(&file).unwrap(), "# Bye");
        assert!(updated.stat.mtime > file.stat.mtime);
        assert_eq!(updated.stat.size, 5);
    }

    #[test]
    fn create_twice_fails_without_mutation() {
        let vault = Vault::new();
        let file = vault.create("a.md", "one").unwrap();
        let revision = vault.revision();
        let log = record_all(&vault);

        let err = vault.create("a.md", "two").unwrap_err();
        assert_eq!(err, VaultError::AlreadyExists("a.md".into()));
        assert_eq!(vault.read(&file).unwrap(), "one");
        assert_eq!(vault.revision(), revision);
        assert!(kinds(&log).is_empty());
    }

    #[test]
    fn create_materializes_ancestors_with_events() {
        let vault = Vault::new();
        let log = record_all(&vault);
        vault.create("a/b/c.md", "x").unwrap();
        assert_eq!(
            kinds(&log),
            vec!["create:a", "create:a/b", "create:a/b/c.md"]
        );
        let paths: Vec<String> = vault.get_all_folders().into_iter().map(|f| f.path).collect();
        assert_eq!(paths, vec!["a", "a/b"]);
    }

    #[test]
    fn create_under_file_is_invalid() {
        let vault = Vault::new();
        vault.create("a.md", "").unwrap();
        assert!(matches!(
            vault.create("a.md/b.md", ""),
            Err(VaultError::InvalidPath { .. })
        ));
        assert!(matches!(
            vault.create("../escape.md", ""),
            Err(VaultError::InvalidPath { .. })
        ));
    }

    #[test]
    fn create_folder_rejects_occupied_paths() {
        let vault = Vault::new();
        vault.create("notes/a.md", "x").unwrap();
        assert_eq!(
            vault.create_folder("notes"),
            Err(VaultError::AlreadyExists("notes".into()))
        );
        let empty = vault.create_folder("archive").unwrap();
        assert!(empty.children.is_empty());
        assert!(vault.get_all_folders().iter().any(|f| f.path == "archive"));
    }

    #[test]
    fn missing_file_errors() {
        let vault = Vault::new();
        let ghost = vault.create("ghost.md", "").unwrap();
        vault.delete(&ghost).unwrap();
        assert_eq!(vault.read(&ghost), Err(VaultError::NotFound("ghost.md".into())));
        assert_eq!(
            vault.write(&ghost, "boo"),
            Err(VaultError::NotFound("ghost.md".into()))
        );
        assert_eq!(vault.delete(&ghost), Err(VaultError::NotFound("ghost.md".into())));
    }

    #[test]
    fn listener_observes_post_mutation_state() {
        let vault = Vault::new();
        let file = vault.create("a.md", "before").unwrap();
        let seen = Rc::new(RefCell::new(String::new()));
        let observer = vault.clone();
        let sink = Rc::clone(&seen);
        vault.on(VaultEventKind::Modify, move |event| {
            if let VaultEvent::Modify(file) = event {
                *sink.borrow_mut() = observer.read(file).unwrap();
            }
        });
        vault.write(&file, "after").unwrap();
        assert_eq!(*seen.borrow(), "after");
    }

    #[test]
    fn delete_folder_removes_subtree_with_one_event() {
        let vault = Vault::new();
        vault.create("notes/a.md", "a").unwrap();
        vault.create("notes/deep/b.md", "b").unwrap();
        vault.create("keep.md", "k").unwrap();
        let deletes = Rc::new(Cell::new(0));
        let counter = Rc::clone(&deletes);
        vault.on(VaultEventKind::Delete, move |_| counter.set(counter.get() + 1));

        let folder = vault.get_folder_by_path("notes").unwrap();
        vault.delete(&folder).unwrap();
        assert_eq!(deletes.get(), 1);
        let files: Vec<String> = vault.get_files().into_iter().map(|f| f.path).collect();
        assert_eq!(files, vec!["keep.md"]);
        assert!(vault.get_all_folders().is_empty());
        assert!(vault.delete(ROOT_PATH).is_err());
    }

    #[test]
    fn rename_moves_subtree() {
        let vault = Vault::new();
        vault.create("drafts/idea.md", "idea").unwrap();
        let log = record_all(&vault);

        let renamed = vault.rename("drafts", "archive/2024").unwrap();
        assert_eq!(renamed.path(), "archive/2024");
        assert_eq!(kinds(&log), vec!["create:archive", "rename:archive/2024"]);
        let moved = vault.get_file_by_path("archive/2024/idea.md").unwrap();
        assert_eq!(vault.read(&moved).unwrap(), "idea");
        assert!(!vault.exists("drafts"));

        vault.create("other.md", "").unwrap();
        assert_eq!(
            vault.rename("other.md", "archive/2024/idea.md"),
            Err(VaultError::AlreadyExists("archive/2024/idea.md".into()))
        );
        assert!(matches!(
            vault.rename("archive", "archive/inner"),
            Err(VaultError::InvalidPath { .. })
        ));
    }

    #[test]
    fn append_and_process() {
        let vault = Vault::new();
        let file = vault.create("log.md", "a").unwrap();
        vault.append(&file, "b").unwrap();
        let next = vault.process(&file, |text| text.to_uppercase()).unwrap();
        assert_eq!(next, "AB");
        assert_eq!(vault.read(&file).unwrap(), "AB");
    }

    #[test]
    fn lookups_normalize_paths() {
        let vault = Vault::new();
        vault.create("notes/a.md", "x").unwrap();
        assert!(vault.get_file_by_path("/notes\\a.md").is_some());
        assert!(vault.get_file_by_path("notes").is_none());
        assert!(vault.get_folder_by_path("notes/").is_some());
        assert!(vault.get_abstract_file_by_path(ROOT_PATH).is_some());
        assert!(vault.exists(ROOT_PATH));
        assert_eq!(vault.get_markdown_files().len(), 1);
    }
}

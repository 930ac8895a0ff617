use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use smartcomposer_core::path::{self, ROOT_PATH};

use crate::handle::{AbstractFile, FileStat, TFile, TFolder};

/// 後端儲存的節點；資料夾為明確節點，不使用佔位檔。 / Backing node; folders are explicit entries, never placeholder files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    File {
        content: String,
        ctime: i64,
        mtime: i64,
    },
    Folder {
        ctime: i64,
    },
}

impl Node {
    pub(crate) fn is_folder(&self) -> bool {
        matches!(self, Node::Folder { .. })
    }
}

/// Flat `path -> node` map. Every listing rebuilds handles from it.
#[derive(Debug, Default)]
pub(crate) struct Store {
    nodes: BTreeMap<String, Node>,
    revision: u64,
    clock: i64,
}

impl Store {
    pub(crate) fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn get(&self, node_path: &str) -> Option<&Node> {
        self.nodes.get(node_path)
    }

    /// Strictly increasing unix-millis clock.
    pub(crate) fn tick(&mut self) -> i64 {
        let now = current_millis();
        self.clock = now.max(self.clock + 1);
        self.clock
    }

    pub(crate) fn insert(&mut self, node_path: String, node: Node) {
        self.nodes.insert(node_path, node);
        self.revision = self.revision.wrapping_add(1);
    }

    pub(crate) fn set_content(&mut self, node_path: &str, next: String) -> bool {
        let now = self.tick();
        match self.nodes.get_mut(node_path) {
            Some(Node::File { content, mtime, .. }) => {
                *content = next;
                *mtime = now;
                self.revision = self.revision.wrapping_add(1);
                true
            }
            _ => false,
        }
    }

    /// Whether any node lives at `node_path` or below it.
    pub(crate) fn occupies(&self, node_path: &str) -> bool {
        !self.subtree_keys(node_path).is_empty()
    }

    /// Keys at and under `node_path`, parents before children.
    pub(crate) fn subtree_keys(&self, node_path: &str) -> Vec<String> {
        let prefix = format!("{node_path}/");
        self.nodes
            .range(node_path.to_string()..)
            .take_while(|(key, _)| key.starts_with(node_path))
            .filter(|(key, _)| key.as_str() == node_path || key.starts_with(&prefix))
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub(crate) fn remove_subtree(&mut self, node_path: &str) -> usize {
        let keys = self.subtree_keys(node_path);
        let mut removed = 0;
        for key in keys {
            if self.nodes.remove(&key).is_some() {
                removed += 1;
            }
        }
        if removed > 0 {
            self.revision = self.revision.wrapping_add(1);
        }
        removed
    }

    /// Re-keys the subtree rooted at `from` under `to`, keeping node metadata.
    pub(crate) fn move_subtree(&mut self, from: &str, to: &str) {
        let keys = self.subtree_keys(from);
        let mut moved = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(node) = self.nodes.remove(&key) {
                let suffix = &key[from.len()..];
                moved.push((format!("{to}{suffix}"), node));
            }
        }
        for (key, node) in moved {
            self.nodes.insert(key, node);
        }
        self.revision = self.revision.wrapping_add(1);
    }

    pub(crate) fn file_handle(&self, node_path: &str) -> Option<TFile> {
        match self.nodes.get(node_path)? {
            Node::File {
                content,
                ctime,
                mtime,
            } => Some(TFile::new(
                node_path,
                FileStat {
                    ctime: *ctime,
                    mtime: *mtime,
                    size: content.len(),
                },
            )),
            Node::Folder { .. } => None,
        }
    }

    pub(crate) fn folder_handle(&self, node_path: &str) -> Option<TFolder> {
        if node_path == ROOT_PATH {
            return Some(self.root());
        }
        match self.nodes.get(node_path)? {
            Node::Folder { .. } => Some(TFolder::new(node_path, self.children_of(node_path))),
            Node::File { .. } => None,
        }
    }

    pub(crate) fn handle(&self, node_path: &str) -> Option<AbstractFile> {
        if node_path == ROOT_PATH {
            return Some(AbstractFile::Folder(self.root()));
        }
        match self.nodes.get(node_path)? {
            Node::File { .. } => self.file_handle(node_path).map(AbstractFile::File),
            Node::Folder { .. } => self.folder_handle(node_path).map(AbstractFile::Folder),
        }
    }

    pub(crate) fn root(&self) -> TFolder {
        TFolder::new(ROOT_PATH, self.children_of(ROOT_PATH))
    }

    pub(crate) fn files(&self) -> Vec<TFile> {
        self.nodes
            .keys()
            .filter_map(|key| self.file_handle(key))
            .collect()
    }

    /// Every folder except the synthetic root, in path order.
    pub(crate) fn folders(&self) -> Vec<TFolder> {
        let mut folders = Vec::new();
        collect_folders(&self.root(), &mut folders);
        folders.sort_by(|a, b| a.path.cmp(&b.path));
        folders
    }

    fn children_of(&self, folder_path: &str) -> Vec<AbstractFile> {
        let mut children: Vec<AbstractFile> = self
            .nodes
            .iter()
            .filter(|(key, _)| path::parent_path(key) == Some(folder_path))
            .filter_map(|(key, node)| {
                if node.is_folder() {
                    self.folder_handle(key).map(AbstractFile::Folder)
                } else {
                    self.file_handle(key).map(AbstractFile::File)
                }
            })
            .collect();
        children.sort_by(|a, b| {
            a.is_file()
                .cmp(&b.is_file())
                .then_with(|| a.name().to_lowercase().cmp(&b.name().to_lowercase()))
                .then_with(|| a.name().cmp(b.name()))
        });
        children
    }
}

fn collect_folders(folder: &TFolder, out: &mut Vec<TFolder>) {
    for child in folder.folders() {
        out.push(child.clone());
        collect_folders(child, out);
    }
}

fn current_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(content: &str) -> Node {
        Node::File {
            content: content.into(),
            ctime: 1,
            mtime: 1,
        }
    }

    #[test]
    fn children_are_folders_first_then_alphabetical() {
        let mut store = Store::default();
        store.insert("b.md".into(), file("b"));
        store.insert("A.md".into(), file("a"));
        store.insert("zeta".into(), Node::Folder { ctime: 1 });
        store.insert("alpha".into(), Node::Folder { ctime: 1 });
        store.insert("alpha/inner.md".into(), file("i"));

        let root = store.root();
        let names: Vec<&str> = root.children.iter().map(AbstractFile::name).collect();
        assert_eq!(names, vec!["alpha", "zeta", "A.md", "b.md"]);
        assert_eq!(root.folders().next().unwrap().children.len(), 1);
        assert_eq!(store.revision(), 5);
    }

    #[test]
    fn subtree_keys_ignore_sibling_prefixes() {
        let mut store = Store::default();
        store.insert("notes".into(), Node::Folder { ctime: 1 });
        store.insert("notes/a.md".into(), file("a"));
        store.insert("notes-old.md".into(), file("x"));
        store.insert("notesb".into(), Node::Folder { ctime: 1 });

        assert_eq!(
            store.subtree_keys("notes"),
            vec!["notes".to_string(), "notes/a.md".to_string()]
        );
        assert_eq!(store.remove_subtree("notes"), 2);
        assert!(store.get("notes-old.md").is_some());
        assert!(store.get("notesb").is_some());
    }

    #[test]
    fn tick_is_strictly_increasing() {
        let mut store = Store::default();
        let first = store.tick();
        let second = store.tick();
        assert!(second > first);
    }

    #[test]
    fn move_subtree_rekeys_descendants() {
        let mut store = Store::default();
        store.insert("a".into(), Node::Folder { ctime: 1 });
        store.insert("a/x.md".into(), file("x"));
        store.move_subtree("a", "b");
        assert!(store.get("a").is_none());
        assert!(store.get("b").is_some());
        assert_eq!(store.file_handle("b/x.md").map(|f| f.stat.size), Some(1));
    }
}

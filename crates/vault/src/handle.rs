use serde::{Deserialize, Serialize};
use smartcomposer_core::path::{self, ROOT_PATH};

/// 檔案的時間與大小資訊。 / Timestamps (unix millis) and size of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FileStat {
    pub ctime: i64,
    pub mtime: i64,
    pub size: usize,
}

/// 檔案控制代碼：路徑與中繼資料的快照，不含內容。 / File handle: a snapshot of path and metadata, never content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TFile {
    pub path: String,
    pub name: String,
    pub basename: String,
    pub extension: String,
    #[serde(default)]
    pub parent: Option<String>,
    pub stat: FileStat,
}

impl TFile {
    pub(crate) fn new(file_path: &str, stat: FileStat) -> Self {
        let name = path::file_name(file_path).to_string();
        Self {
            path: file_path.to_string(),
            basename: path::basename(&name).to_string(),
            extension: path::extension(&name).to_string(),
            name,
            parent: path::parent_path(file_path).map(str::to_string),
            stat,
        }
    }

    pub fn is_markdown(&self) -> bool {
        self.extension.eq_ignore_ascii_case("md")
    }
}

/// 資料夾控制代碼，子節點依「資料夾優先、名稱排序」排列。 / Folder handle; children are folders first, then files, by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TFolder {
    pub path: String,
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub children: Vec<AbstractFile>,
}

impl TFolder {
    pub(crate) fn new(folder_path: &str, children: Vec<AbstractFile>) -> Self {
        Self {
            path: folder_path.to_string(),
            name: path::file_name(folder_path).to_string(),
            parent: path::parent_path(folder_path).map(str::to_string),
            children,
        }
    }

    pub fn is_root(&self) -> bool {
        self.path == ROOT_PATH
    }

    pub fn files(&self) -> impl Iterator<Item = &TFile> {
        self.children.iter().filter_map(AbstractFile::as_file)
    }

    pub fn folders(&self) -> impl Iterator<Item = &TFolder> {
        self.children.iter().filter_map(AbstractFile::as_folder)
    }

    pub fn child(&self, name: &str) -> Option<&AbstractFile> {
        self.children.iter().find(|child| child.name() == name)
    }
}

/// 檔案或資料夾。 / Either a file or a folder handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AbstractFile {
    File(TFile),
    Folder(TFolder),
}

impl AbstractFile {
    pub fn path(&self) -> &str {
        match self {
            AbstractFile::File(file) => &file.path,
            AbstractFile::Folder(folder) => &folder.path,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AbstractFile::File(file) => &file.name,
            AbstractFile::Folder(folder) => &folder.name,
        }
    }

    pub fn parent(&self) -> Option<&str> {
        match self {
            AbstractFile::File(file) => file.parent.as_deref(),
            AbstractFile::Folder(folder) => folder.parent.as_deref(),
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, AbstractFile::File(_))
    }

    pub fn as_file(&self) -> Option<&TFile> {
        match self {
            AbstractFile::File(file) => Some(file),
            AbstractFile::Folder(_) => None,
        }
    }

    pub fn as_folder(&self) -> Option<&TFolder> {
        match self {
            AbstractFile::Folder(folder) => Some(folder),
            AbstractFile::File(_) => None,
        }
    }

    pub fn into_file(self) -> Option<TFile> {
        match self {
            AbstractFile::File(file) => Some(file),
            AbstractFile::Folder(_) => None,
        }
    }

    pub fn into_folder(self) -> Option<TFolder> {
        match self {
            AbstractFile::Folder(folder) => Some(folder),
            AbstractFile::File(_) => None,
        }
    }
}

impl From<TFile> for AbstractFile {
    fn from(file: TFile) -> Self {
        AbstractFile::File(file)
    }
}

impl From<TFolder> for AbstractFile {
    fn from(folder: TFolder) -> Self {
        AbstractFile::Folder(folder)
    }
}

/// Anything that names a vault node.
pub trait VaultPath {
    fn vault_path(&self) -> &str;
}

impl VaultPath for TFile {
    fn vault_path(&self) -> &str {
        &self.path
    }
}

impl VaultPath for TFolder {
    fn vault_path(&self) -> &str {
        &self.path
    }
}

impl VaultPath for AbstractFile {
    fn vault_path(&self) -> &str {
        self.path()
    }
}

impl VaultPath for str {
    fn vault_path(&self) -> &str {
        self
    }
}

impl VaultPath for String {
    fn vault_path(&self) -> &str {
        self
    }
}

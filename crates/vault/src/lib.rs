//! 記憶體內的虛擬檔案庫。 / In-memory vault: hierarchical files and folders over a flat store.
//!
//! Every listing is rebuilt from the backing map, so handles are snapshots and
//! never go stale in place. Folders are explicit nodes; an empty folder is a
//! node like any other.

mod handle;
mod store;
mod vault;

pub use handle::{AbstractFile, FileStat, TFile, TFolder, VaultPath};
pub use vault::{Vault, VaultError, VaultEvent, VaultEventKind, VaultResult};

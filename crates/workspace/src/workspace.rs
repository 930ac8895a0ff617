use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use smartcomposer_core::dom::{create_div, empty, Element};
use smartcomposer_core::events::{Event, EventBus, EventRef};
use smartcomposer_core::path;
use smartcomposer_vault::{TFile, Vault, VaultEvent, VaultEventKind};
use tracing::{debug, error, warn};

use crate::editor::Editor;
use crate::layout::{LayoutLeaf, LayoutSnapshot};
use crate::leaf::{LeafId, MountPoint, WorkspaceLeaf};
use crate::markdown::{MarkdownView, MARKDOWN_VIEW_TYPE};
use crate::registry::ViewRegistry;
use crate::view::{View, ViewVariant};

/// 工作區事件名稱。 / Names workspace listeners subscribe to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkspaceEventKind {
    FileOpen,
    ActiveLeafChange,
    LayoutChange,
}

impl WorkspaceEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkspaceEventKind::FileOpen => "file-open",
            WorkspaceEventKind::ActiveLeafChange => "active-leaf-change",
            WorkspaceEventKind::LayoutChange => "layout-change",
        }
    }
}

#[derive(Debug, Clone)]
pub enum WorkspaceEvent {
    FileOpen(Option<TFile>),
    ActiveLeafChange(Option<WorkspaceLeaf>),
    LayoutChange,
}

impl Event for WorkspaceEvent {
    type Kind = WorkspaceEventKind;

    fn kind(&self) -> WorkspaceEventKind {
        match self {
            WorkspaceEvent::FileOpen(_) => WorkspaceEventKind::FileOpen,
            WorkspaceEvent::ActiveLeafChange(_) => WorkspaceEventKind::ActiveLeafChange,
            WorkspaceEvent::LayoutChange => WorkspaceEventKind::LayoutChange,
        }
    }
}

/// 外部 UI 提供的三個掛載容器。 / Container elements the surrounding shell provides for each mount point.
#[derive(Debug, Clone)]
pub struct WorkspaceMounts {
    pub left_sidebar: Element,
    pub editor: Element,
    pub right_sidebar: Element,
}

impl WorkspaceMounts {
    /// Creates the three containers under `root`.
    pub fn new(root: &Element) -> Self {
        Self {
            left_sidebar: create_div(root, "left-sidebar"),
            editor: create_div(root, "editor-container"),
            right_sidebar: create_div(root, "right-sidebar"),
        }
    }

    pub fn get(&self, mount: MountPoint) -> &Element {
        match mount {
            MountPoint::LeftSidebar => &self.left_sidebar,
            MountPoint::Editor => &self.editor,
            MountPoint::RightSidebar => &self.right_sidebar,
        }
    }
}

impl Default for WorkspaceMounts {
    fn default() -> Self {
        let root = Element::new("div");
        root.add_class("workspace");
        Self::new(&root)
    }
}

pub(crate) struct WorkspaceInner {
    vault: Vault,
    views: ViewRegistry,
    mounts: WorkspaceMounts,
    leaves: RefCell<Vec<WorkspaceLeaf>>,
    active: RefCell<Option<WorkspaceLeaf>>,
    next_leaf_id: Cell<u64>,
    events: EventBus<WorkspaceEvent>,
    vault_refs: RefCell<Vec<EventRef>>,
}

impl Drop for WorkspaceInner {
    fn drop(&mut self) {
        for event_ref in self.vault_refs.get_mut().drain(..) {
            self.vault.off(event_ref);
        }
    }
}

/// 分頁管理器。 / Leaf manager: owns the open leaves, tracks focus and routes open requests.
#[derive(Clone)]
pub struct Workspace {
    inner: Rc<WorkspaceInner>,
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("leaves", &self.inner.leaves.borrow().len())
            .field("active", &self.active_leaf().map(|leaf| leaf.id()))
            .finish()
    }
}

impl Workspace {
    /// 建立工作區並註冊內建的 Markdown 檢視。 / Creates a workspace with the built-in markdown view registered.
    pub fn new(vault: Vault, views: ViewRegistry, mounts: WorkspaceMounts) -> Self {
        let markdown_vault = vault.clone();
        views.register_view(MARKDOWN_VIEW_TYPE, move |leaf| {
            Box::new(MarkdownView::new(leaf, markdown_vault.clone())) as Box<dyn View>
        });
        let workspace = Self {
            inner: Rc::new(WorkspaceInner {
                vault,
                views,
                mounts,
                leaves: RefCell::new(Vec::new()),
                active: RefCell::new(None),
                next_leaf_id: Cell::new(1),
                events: EventBus::new(),
                vault_refs: RefCell::new(Vec::new()),
            }),
        };
        workspace.watch_vault();
        workspace
    }

    /// Keeps open views in step with renames and deletions in the vault.
    fn watch_vault(&self) {
        let refs = [VaultEventKind::Rename, VaultEventKind::Delete].map(|kind| {
            let weak = Rc::downgrade(&self.inner);
            self.inner.vault.on(kind, move |event| {
                if let Some(inner) = weak.upgrade() {
                    Workspace::from_inner(inner).on_vault_event(event);
                }
            })
        });
        self.inner.vault_refs.borrow_mut().extend(refs);
    }

    fn on_vault_event(&self, event: &VaultEvent) {
        match event {
            VaultEvent::Rename { file, old_path } => {
                let mut moved = 0;
                for leaf in self.leaves() {
                    let Some(shown) = leaf.file() else {
                        continue;
                    };
                    let new_path = if shown.path == *old_path {
                        file.path().to_string()
                    } else if path::is_descendant(&shown.path, old_path) {
                        format!("{}{}", file.path(), &shown.path[old_path.len()..])
                    } else {
                        continue;
                    };
                    let Some(renamed) = self.inner.vault.get_file_by_path(&new_path) else {
                        warn!(from = %shown.path, to = %new_path, "renamed file is missing from the vault");
                        continue;
                    };
                    debug!(leaf = %leaf.id(), from = %shown.path, to = %new_path, "view follows rename");
                    leaf.follow_rename(renamed);
                    moved += 1;
                }
                if moved > 0 {
                    self.notify_layout_change();
                }
            }
            VaultEvent::Delete(removed) => {
                let removed = removed.path();
                for leaf in self.leaves() {
                    let shows_removed = leaf.file().is_some_and(|shown| {
                        shown.path == removed || path::is_descendant(&shown.path, removed)
                    });
                    if shows_removed {
                        debug!(leaf = %leaf.id(), path = %removed, "closing view of deleted file");
                        self.detach_leaf(&leaf);
                    }
                }
            }
            _ => {}
        }
    }

    pub(crate) fn from_inner(inner: Rc<WorkspaceInner>) -> Self {
        Self { inner }
    }

    pub fn vault(&self) -> &Vault {
        &self.inner.vault
    }

    pub fn views(&self) -> &ViewRegistry {
        &self.inner.views
    }

    pub fn mounts(&self) -> &WorkspaceMounts {
        &self.inner.mounts
    }

    pub fn on(
        &self,
        kind: WorkspaceEventKind,
        listener: impl Fn(&WorkspaceEvent) + 'static,
    ) -> EventRef {
        self.inner.events.on(kind, listener)
    }

    pub fn off(&self, event_ref: EventRef) -> bool {
        self.inner.events.off(event_ref)
    }

    pub fn active_leaf(&self) -> Option<WorkspaceLeaf> {
        self.inner.active.borrow().clone()
    }

    /// Snapshot of the tracked leaves, in creation order.
    pub fn leaves(&self) -> Vec<WorkspaceLeaf> {
        self.inner.leaves.borrow().clone()
    }

    pub fn iterate_all_leaves(&self, mut visit: impl FnMut(&WorkspaceLeaf)) {
        for leaf in self.leaves() {
            visit(&leaf);
        }
    }

    pub fn get_leaves_of_type(&self, view_type: &str) -> Vec<WorkspaceLeaf> {
        self.leaves()
            .into_iter()
            .filter(|leaf| leaf.view_type().as_deref() == Some(view_type))
            .collect()
    }

    pub fn get_leaf_by_id(&self, id: LeafId) -> Option<WorkspaceLeaf> {
        self.leaves().into_iter().find(|leaf| leaf.id() == id)
    }

    /// 取得目前分頁，或在編輯區建立新分頁。 / The active leaf, or a new editor leaf when `new_leaf` is set or nothing is active.
    pub fn get_leaf(&self, new_leaf: bool) -> WorkspaceLeaf {
        if !new_leaf {
            if let Some(active) = self.active_leaf() {
                return active;
            }
        }
        if new_leaf {
            self.create_leaf(MountPoint::Editor)
        } else {
            self.get_editor_leaf()
        }
    }

    pub fn get_right_leaf(&self, create: bool) -> Option<WorkspaceLeaf> {
        self.mount_leaf(MountPoint::RightSidebar, create)
    }

    pub fn get_left_leaf(&self, create: bool) -> Option<WorkspaceLeaf> {
        self.mount_leaf(MountPoint::LeftSidebar, create)
    }

    /// The main editor leaf, created on first use.
    pub fn get_editor_leaf(&self) -> WorkspaceLeaf {
        match self.first_in_mount(MountPoint::Editor) {
            Some(leaf) => leaf,
            None => self.create_leaf(MountPoint::Editor),
        }
    }

    fn mount_leaf(&self, mount: MountPoint, create: bool) -> Option<WorkspaceLeaf> {
        if let Some(existing) = self.first_in_mount(mount) {
            return Some(existing);
        }
        create.then(|| self.create_leaf(mount))
    }

    fn first_in_mount(&self, mount: MountPoint) -> Option<WorkspaceLeaf> {
        self.inner
            .leaves
            .borrow()
            .iter()
            .find(|leaf| leaf.mount() == mount)
            .cloned()
    }

    fn create_leaf(&self, mount: MountPoint) -> WorkspaceLeaf {
        let id = LeafId(self.inner.next_leaf_id.get());
        self.inner.next_leaf_id.set(id.0 + 1);
        let leaf = WorkspaceLeaf::new(
            id,
            mount,
            self.inner.mounts.get(mount),
            Rc::downgrade(&self.inner),
        );
        self.inner.leaves.borrow_mut().push(leaf.clone());
        debug!(leaf = %id, mount = mount.as_str(), "leaf created");
        self.notify_layout_change();
        leaf
    }

    /// 切換焦點；同一分頁不重複通知。 / Focuses `leaf`; a no-op (no event) when it is already active.
    pub fn set_active_leaf(&self, leaf: &WorkspaceLeaf) {
        if self.active_leaf().as_ref() == Some(leaf) {
            return;
        }
        if !self.is_tracked(leaf) {
            warn!(leaf = %leaf.id(), "set_active_leaf on a leaf this workspace does not track");
            return;
        }
        *self.inner.active.borrow_mut() = Some(leaf.clone());
        debug!(leaf = %leaf.id(), "active leaf changed");
        self.inner
            .events
            .emit(&WorkspaceEvent::ActiveLeafChange(Some(leaf.clone())));
    }

    fn is_tracked(&self, leaf: &WorkspaceLeaf) -> bool {
        self.inner.leaves.borrow().iter().any(|tracked| tracked == leaf)
    }

    /// 關閉分頁；若為目前分頁則改由最後一個分頁接手。 / Closes `leaf`, promoting the most recent remaining leaf when it was active.
    pub fn detach_leaf(&self, leaf: &WorkspaceLeaf) -> bool {
        let removed = {
            let mut leaves = self.inner.leaves.borrow_mut();
            let before = leaves.len();
            leaves.retain(|tracked| tracked != leaf);
            leaves.len() != before
        };
        if !removed {
            return false;
        }
        leaf.teardown();
        debug!(leaf = %leaf.id(), "leaf detached");

        let was_active = self.active_leaf().as_ref() == Some(leaf);
        if was_active {
            let promoted = self.inner.leaves.borrow().last().cloned();
            *self.inner.active.borrow_mut() = promoted.clone();
            self.inner
                .events
                .emit(&WorkspaceEvent::ActiveLeafChange(promoted));
        }
        self.notify_layout_change();
        true
    }

    pub fn detach_leaves_of_type(&self, view_type: &str) -> usize {
        let leaves = self.get_leaves_of_type(view_type);
        leaves
            .iter()
            .filter(|leaf| self.detach_leaf(leaf))
            .count()
    }

    /// 在掛載點中顯示分頁，不搶走編輯區焦點。 / Makes the leaf visible in its mount point without moving focus.
    pub fn reveal_leaf(&self, leaf: &WorkspaceLeaf) {
        if !leaf.has_view() {
            error!(leaf = %leaf.id(), "reveal_leaf called on a leaf without a view");
            return;
        }
        let mount_el = self.inner.mounts.get(leaf.mount());
        let container = leaf.container_el();
        if leaf.mount().is_sidebar() {
            empty(mount_el);
            mount_el.append_child(&container);
            mount_el.add_class("is-visible");
        } else if container.parent().as_ref() != Some(mount_el) {
            mount_el.append_child(&container);
        }
        debug!(leaf = %leaf.id(), mount = leaf.mount().as_str(), "leaf revealed");
        self.notify_layout_change();
    }

    /// 解析連結並開啟檔案。 / Resolves `link` and shows the file, reusing the leaf that already displays it.
    ///
    /// Resolution tries the exact path, then `<link>.md`, then both relative
    /// to `source_path`'s folder. Unresolvable links are logged and ignored.
    pub fn open_link_text(
        &self,
        link: &str,
        source_path: &str,
        new_leaf: bool,
    ) -> Option<WorkspaceLeaf> {
        let Some(file) = self.resolve_link(link, source_path) else {
            warn!(link = %link, source = %source_path, "link did not resolve to a file");
            return None;
        };
        let leaf = if new_leaf {
            self.create_leaf(MountPoint::Editor)
        } else {
            self.leaf_showing(&file)
                .unwrap_or_else(|| self.get_editor_leaf())
        };
        leaf.open_file(&file);
        self.set_active_leaf(&leaf);
        debug!(path = %file.path, leaf = %leaf.id(), "file opened");
        self.inner
            .events
            .emit(&WorkspaceEvent::FileOpen(Some(file)));
        Some(leaf)
    }

    pub fn resolve_link(&self, link: &str, source_path: &str) -> Option<TFile> {
        let target = link.split(['#', '|']).next().unwrap_or(link);
        let normalized = path::normalize_path(target);
        if normalized.is_empty() || normalized == path::ROOT_PATH {
            return None;
        }
        let mut candidates = vec![normalized.clone()];
        if let Some(folder) = path::parent_path(&path::normalize_path(source_path)) {
            if folder != path::ROOT_PATH {
                candidates.push(path::join(folder, &normalized));
            }
        }
        candidates.iter().find_map(|candidate| {
            self.inner.vault.get_file_by_path(candidate).or_else(|| {
                if path::extension(path::file_name(candidate)).is_empty() {
                    self.inner.vault.get_file_by_path(&format!("{candidate}.md"))
                } else {
                    None
                }
            })
        })
    }

    fn leaf_showing(&self, file: &TFile) -> Option<WorkspaceLeaf> {
        self.leaves()
            .into_iter()
            .find(|leaf| leaf.file().is_some_and(|shown| shown.path == file.path))
    }

    /// File of the active leaf's view.
    pub fn get_active_file(&self) -> Option<TFile> {
        self.active_leaf().and_then(|leaf| leaf.file())
    }

    /// 僅檢查目前分頁的檢視種類。 / Runs `f` on the active leaf's view when it matches `variant`.
    pub fn with_active_view_of_type<R>(
        &self,
        variant: &ViewVariant,
        f: impl FnOnce(&mut dyn View) -> R,
    ) -> Option<R> {
        let leaf = self.active_leaf()?;
        if leaf.view_variant().as_ref() != Some(variant) {
            debug!(variant = %variant, "no active view of the requested variant");
            return None;
        }
        leaf.with_view_mut(f)
    }

    /// 對目前 Markdown 編輯器執行 `f`。 / Runs `f` on the active markdown view's editor and file.
    ///
    /// `f` works on a copy written back afterwards (see
    /// [`WorkspaceLeaf::with_editor`]), so it may call back into the workspace.
    pub fn with_active_editor<R>(
        &self,
        f: impl FnOnce(&mut Editor, Option<&TFile>) -> R,
    ) -> Option<R> {
        let leaf = self.active_leaf()?;
        if leaf.view_variant() != Some(ViewVariant::Markdown) {
            debug!("no active markdown editor");
            return None;
        }
        leaf.with_editor(f)
    }

    /// 目前版面快照。 / Snapshot of every leaf's mount and view state.
    pub fn get_layout(&self) -> LayoutSnapshot {
        let active = self.active_leaf();
        let leaves = self.leaves();
        let active_index = active.and_then(|active| leaves.iter().position(|leaf| *leaf == active));
        let entries = leaves
            .iter()
            .map(|leaf| LayoutLeaf {
                mount: leaf.mount(),
                view: leaf.has_view().then(|| {
                    let mut state = leaf.get_view_state();
                    state.active = false;
                    state
                }),
            })
            .collect();
        LayoutSnapshot::new(entries, active_index)
    }

    /// 關閉所有分頁並依快照重建。 / Detaches every leaf and rebuilds the layout from `snapshot`.
    pub fn restore_layout(&self, snapshot: &LayoutSnapshot) {
        for leaf in self.leaves() {
            self.detach_leaf(&leaf);
        }
        let mut restored = Vec::with_capacity(snapshot.leaves.len());
        for entry in &snapshot.leaves {
            let leaf = self.create_leaf(entry.mount);
            if let Some(view_state) = &entry.view {
                let mut view_state = view_state.clone();
                view_state.active = false;
                leaf.set_view_state(view_state);
            }
            restored.push(leaf);
        }
        if let Some(active) = snapshot.active.and_then(|index| restored.get(index)) {
            self.set_active_leaf(active);
        }
    }

    pub(crate) fn notify_layout_change(&self) {
        self.inner.events.emit(&WorkspaceEvent::LayoutChange);
    }
}

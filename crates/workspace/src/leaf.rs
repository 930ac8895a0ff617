use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use serde_json::json;
use smartcomposer_core::dom::{create_div, Element};
use smartcomposer_vault::TFile;
use tracing::{debug, error, warn};

use crate::editor::Editor;
use crate::markdown::MARKDOWN_VIEW_TYPE;
use crate::view::{View, ViewError, ViewState, ViewVariant};
use crate::workspace::{Workspace, WorkspaceInner};

/// 分頁所在的固定掛載點。 / Fixed mount point a leaf lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MountPoint {
    LeftSidebar,
    Editor,
    RightSidebar,
}

impl MountPoint {
    pub fn as_str(self) -> &'static str {
        match self {
            MountPoint::LeftSidebar => "left-sidebar",
            MountPoint::Editor => "editor",
            MountPoint::RightSidebar => "right-sidebar",
        }
    }

    pub fn is_sidebar(self) -> bool {
        !matches!(self, MountPoint::Editor)
    }
}

/// 分頁識別碼。 / Stable leaf identifier, unique within a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeafId(pub(crate) u64);

impl LeafId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for LeafId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "leaf-{}", self.0)
    }
}

pub(crate) type ViewCell = Rc<RefCell<Box<dyn View>>>;

/// Leaf-side copy of what queries need from the view, readable while the view is borrowed.
#[derive(Debug, Clone)]
struct ViewMeta {
    view_type: String,
    variant: ViewVariant,
    display_text: String,
    file: Option<TFile>,
}

impl ViewMeta {
    fn of(view: &dyn View) -> Self {
        Self {
            view_type: view.view_type().to_string(),
            variant: view.variant(),
            display_text: view.display_text(),
            file: view.file(),
        }
    }
}

pub(crate) struct LeafInner {
    id: LeafId,
    mount: MountPoint,
    container_el: Element,
    view: RefCell<Option<ViewCell>>,
    meta: RefCell<Option<ViewMeta>>,
    // Bumped whenever a new view is installed.
    generation: Cell<u64>,
    detached: Cell<bool>,
    workspace: Weak<WorkspaceInner>,
}

/// 工作區中的分頁；複製後仍指向同一分頁，以身分比較。 / Workspace slot hosting at most one view; compared by identity.
#[derive(Clone)]
pub struct WorkspaceLeaf {
    inner: Rc<LeafInner>,
}

impl PartialEq for WorkspaceLeaf {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for WorkspaceLeaf {}

impl fmt::Debug for WorkspaceLeaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkspaceLeaf")
            .field("id", &self.inner.id)
            .field("mount", &self.inner.mount)
            .field("view_type", &self.view_type())
            .field("detached", &self.inner.detached.get())
            .finish()
    }
}

/// Non-owning leaf reference for views that need to reach their leaf.
#[derive(Clone, Default)]
pub struct WeakLeaf {
    inner: Weak<LeafInner>,
}

impl WeakLeaf {
    pub fn upgrade(&self) -> Option<WorkspaceLeaf> {
        self.inner.upgrade().map(|inner| WorkspaceLeaf { inner })
    }
}

impl fmt::Debug for WeakLeaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakLeaf")
    }
}

impl WorkspaceLeaf {
    pub(crate) fn new(
        id: LeafId,
        mount: MountPoint,
        mount_el: &Element,
        workspace: Weak<WorkspaceInner>,
    ) -> Self {
        let container_el = create_div(mount_el, "workspace-leaf");
        container_el.set_attribute("data-leaf-id", id.to_string());
        Self {
            inner: Rc::new(LeafInner {
                id,
                mount,
                container_el,
                view: RefCell::new(None),
                meta: RefCell::new(None),
                generation: Cell::new(0),
                detached: Cell::new(false),
                workspace,
            }),
        }
    }

    pub fn id(&self) -> LeafId {
        self.inner.id
    }

    pub fn mount(&self) -> MountPoint {
        self.inner.mount
    }

    pub fn container_el(&self) -> Element {
        self.inner.container_el.clone()
    }

    pub fn downgrade(&self) -> WeakLeaf {
        WeakLeaf {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn is_detached(&self) -> bool {
        self.inner.detached.get()
    }

    /// Whether a view is open (or being opened) in this leaf.
    pub fn has_view(&self) -> bool {
        self.inner.meta.borrow().is_some()
    }

    pub fn view_type(&self) -> Option<String> {
        self.with_meta(|meta| meta.view_type.clone())
    }

    pub fn view_variant(&self) -> Option<ViewVariant> {
        self.with_meta(|meta| meta.variant.clone())
    }

    pub fn display_text(&self) -> Option<String> {
        self.with_meta(|meta| meta.display_text.clone())
    }

    /// File shown by the current view.
    pub fn file(&self) -> Option<TFile> {
        self.with_meta(|meta| meta.file.clone()).flatten()
    }

    fn with_meta<R>(&self, f: impl FnOnce(&ViewMeta) -> R) -> Option<R> {
        self.inner.meta.borrow().as_ref().map(f)
    }

    /// 讀取目前檢視。 / Runs `f` against the current view.
    ///
    /// Returns `None` when the leaf is empty, or when the view is already
    /// borrowed mutably further up the stack (a view re-entering its own leaf).
    pub fn with_view<R>(&self, f: impl FnOnce(&dyn View) -> R) -> Option<R> {
        let cell = self.view_cell()?;
        let Ok(view) = cell.try_borrow() else {
            warn!(leaf = %self.id(), "view is busy; read skipped");
            return None;
        };
        Some(f(&**view))
    }

    /// Mutable counterpart of [`with_view`](Self::with_view); the cached view
    /// metadata is refreshed once `f` returns.
    pub fn with_view_mut<R>(&self, f: impl FnOnce(&mut dyn View) -> R) -> Option<R> {
        let cell = self.view_cell()?;
        let result = {
            let Ok(mut view) = cell.try_borrow_mut() else {
                warn!(leaf = %self.id(), "view is busy; update skipped");
                return None;
            };
            f(&mut **view)
        };
        self.refresh_meta();
        Some(result)
    }

    /// 在編輯器副本上執行 `f`，再寫回。 / Runs `f` on a copy of the view's editor, then writes it back.
    ///
    /// No borrow of the view is held while `f` runs, so `f` may query or
    /// mutate the workspace freely. The edit is dropped (and logged) when `f`
    /// replaced the view or pointed it at another file.
    pub fn with_editor<R>(&self, f: impl FnOnce(&mut Editor, Option<&TFile>) -> R) -> Option<R> {
        let generation = self.inner.generation.get();
        let (mut editor, file) = self
            .with_view(|view| view.editor().map(|editor| (editor.clone(), view.file())))
            .flatten()?;
        let result = f(&mut editor, file.as_ref());

        if self.inner.generation.get() != generation {
            debug!(leaf = %self.id(), "view replaced during editor callback; edit dropped");
            return Some(result);
        }
        let shown = file.map(|file| file.path);
        let written = self.with_view_mut(|view| {
            if view.file().map(|file| file.path) != shown {
                return false;
            }
            match view.editor_mut() {
                Some(slot) => {
                    *slot = editor;
                    true
                }
                None => false,
            }
        });
        if written != Some(true) {
            debug!(leaf = %self.id(), "view changed during editor callback; edit dropped");
        }
        Some(result)
    }

    fn view_cell(&self) -> Option<ViewCell> {
        self.inner.view.borrow().clone()
    }

    fn refresh_meta(&self) {
        let Some(cell) = self.view_cell() else {
            return;
        };
        // A borrow further up the stack refreshes on its own way out.
        if let Ok(view) = cell.try_borrow() {
            *self.inner.meta.borrow_mut() = Some(ViewMeta::of(&**view));
        };
    }

    fn workspace(&self) -> Option<Workspace> {
        self.inner.workspace.upgrade().map(Workspace::from_inner)
    }

    /// 取得目前檢視狀態；空分頁回報 `empty`。 / Current view state; an empty leaf reports type `empty`.
    pub fn get_view_state(&self) -> ViewState {
        let active = self
            .workspace()
            .and_then(|workspace| workspace.active_leaf())
            .is_some_and(|active| active == *self);
        let snapshot = self.with_view(|view| {
            (
                view.view_type().to_string(),
                view.get_state().unwrap_or_else(|| json!({})),
            )
        });
        let view_type = match snapshot {
            Some((view_type, state)) => {
                return ViewState {
                    view_type,
                    active,
                    state: Some(state),
                }
            }
            None => self.view_type().unwrap_or_else(|| "empty".to_string()),
        };
        ViewState {
            view_type,
            active,
            state: Some(json!({})),
        }
    }

    /// 以註冊的工廠建立新檢視。 / Replaces the view with a freshly built one of `view_state.view_type`.
    ///
    /// Order: `on_close` on the previous view, instantiate, `set_state` when a
    /// state is supplied, then `on_open`. An unknown type is logged and the
    /// leaf is left untouched.
    pub fn set_view_state(&self, view_state: ViewState) {
        if self.is_detached() {
            warn!(leaf = %self.id(), "set_view_state on a detached leaf");
            return;
        }
        let Some(workspace) = self.workspace() else {
            warn!(leaf = %self.id(), "set_view_state after the workspace was dropped");
            return;
        };
        let Some(factory) = workspace.views().factory(&view_state.view_type) else {
            let err = ViewError::MissingFactory(view_state.view_type);
            error!(leaf = %self.id(), error = %err, "set_view_state ignored");
            return;
        };

        self.close_view();
        let view_type = view_state.view_type;
        let mut view = factory(self);
        *self.inner.meta.borrow_mut() = Some(ViewMeta::of(&*view));
        if let Some(state) = view_state.state {
            if let Err(err) = view.set_state(state) {
                error!(view_type = %view_type, leaf = %self.id(), error = %err, "view set_state failed");
            }
        }
        if let Err(err) = view.on_open() {
            error!(view_type = %view_type, leaf = %self.id(), error = %err, "view on_open failed");
        }
        if self.is_detached() {
            // on_open closed its own leaf.
            self.inner.meta.borrow_mut().take();
            return;
        }
        // A nested set_view_state from on_open may have installed a view already.
        self.close_view();
        self.install(view);
        debug!(view_type = %view_type, leaf = %self.id(), "view opened");

        if view_state.active {
            workspace.set_active_leaf(self);
        }
        workspace.notify_layout_change();
    }

    /// 在此分頁開啟 Markdown 檔案。 / Shows `file` in a markdown view, reusing the current one when possible.
    pub fn open_file(&self, file: &TFile) {
        let state = json!({ "file": file.path });
        let reused = self
            .with_view_mut(|view| {
                if view.variant() != ViewVariant::Markdown {
                    return false;
                }
                if let Err(err) = view.set_state(state.clone()) {
                    error!(path = %file.path, leaf = %self.id(), error = %err, "failed to load file");
                }
                true
            })
            .unwrap_or(false);
        if !reused {
            self.set_view_state(ViewState::new(MARKDOWN_VIEW_TYPE).with_state(state));
        }
    }

    /// Closes this leaf through its workspace.
    pub fn detach(&self) {
        match self.workspace() {
            Some(workspace) => {
                workspace.detach_leaf(self);
            }
            None => self.teardown(),
        }
    }

    fn install(&self, view: Box<dyn View>) {
        *self.inner.meta.borrow_mut() = Some(ViewMeta::of(&*view));
        self.inner.generation.set(self.inner.generation.get() + 1);
        *self.inner.view.borrow_mut() = Some(Rc::new(RefCell::new(view)));
    }

    pub(crate) fn close_view(&self) {
        let previous = self.inner.view.borrow_mut().take();
        self.inner.meta.borrow_mut().take();
        let Some(cell) = previous else {
            return;
        };
        let Ok(mut view) = cell.try_borrow_mut() else {
            warn!(leaf = %self.id(), "view closed while busy; on_close skipped");
            return;
        };
        if let Err(err) = view.on_close() {
            error!(view_type = %view.view_type(), leaf = %self.id(), error = %err, "view on_close failed");
        }
    }

    /// Points the view at the renamed `file`.
    pub(crate) fn follow_rename(&self, file: TFile) {
        let path = file.path.clone();
        if let Some(Err(err)) = self.with_view_mut(|view| view.on_rename(file)) {
            error!(path = %path, leaf = %self.id(), error = %err, "view on_rename failed");
        }
    }

    pub(crate) fn teardown(&self) {
        if self.inner.detached.replace(true) {
            return;
        }
        self.close_view();
        self.inner.container_el.remove();
    }
}

//! 工作區、分頁與檢視生命週期。 / Workspace, leaves and the view lifecycle.
//!
//! A [`Workspace`] owns every [`WorkspaceLeaf`]; each leaf hosts at most one
//! [`View`] built by a factory from the shared [`ViewRegistry`].

pub mod editor;
pub mod layout;
pub mod leaf;
pub mod markdown;
pub mod registry;
pub mod view;
pub mod workspace;

pub use editor::{Editor, EditorError, Selection};
pub use layout::{LayoutLeaf, LayoutSnapshot, LAYOUT_FORMAT_VERSION};
pub use leaf::{LeafId, MountPoint, WeakLeaf, WorkspaceLeaf};
pub use markdown::{MarkdownView, MARKDOWN_VIEW_TYPE};
pub use registry::{ViewFactory, ViewRegistry};
pub use view::{ItemViewBase, View, ViewError, ViewState, ViewVariant};
pub use workspace::{Workspace, WorkspaceEvent, WorkspaceEventKind, WorkspaceMounts};

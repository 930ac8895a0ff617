//! Shared primitives for the Smart Composer host emulation.
//! 主機模擬層共用的基礎元件：事件派送、路徑正規化與 DOM 元素模型。

pub mod dom;
pub mod events;
pub mod path;

pub use dom::{
    create_div, create_div_with, create_el, create_el_with, empty, set_attrs, DomEvent,
    Element, ElementInfo,
};
pub use events::{Event, EventBus, EventRef};
pub use path::{
    ancestors, basename, extension, file_name, is_descendant, join, normalize_path, parent_path,
    validate_path, PathError, ROOT_PATH,
};

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::leaf::WorkspaceLeaf;
use crate::view::View;

/// 建立檢視的工廠函式。 / Builds a view bound to the given leaf.
pub type ViewFactory = Rc<dyn Fn(&WorkspaceLeaf) -> Box<dyn View>>;

/// 檢視型別 → 工廠。最後一次註冊生效。 / View type to factory map; the last registration wins.
#[derive(Clone, Default)]
pub struct ViewRegistry {
    factories: Rc<RefCell<HashMap<String, ViewFactory>>>,
}

impl fmt::Debug for ViewRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewRegistry")
            .field("types", &self.view_types())
            .finish()
    }
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_view<F>(&self, view_type: impl Into<String>, factory: F)
    where
        F: Fn(&WorkspaceLeaf) -> Box<dyn View> + 'static,
    {
        let view_type = view_type.into();
        debug!(view_type = %view_type, "register view");
        self.factories
            .borrow_mut()
            .insert(view_type, Rc::new(factory));
    }

    pub fn unregister_view(&self, view_type: &str) -> bool {
        self.factories.borrow_mut().remove(view_type).is_some()
    }

    pub fn factory(&self, view_type: &str) -> Option<ViewFactory> {
        self.factories.borrow().get(view_type).cloned()
    }

    pub fn contains(&self, view_type: &str) -> bool {
        self.factories.borrow().contains_key(view_type)
    }

    /// Registered types, sorted.
    pub fn view_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.borrow().keys().cloned().collect();
        types.sort();
        types
    }
}

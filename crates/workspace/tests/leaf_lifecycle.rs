use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::{json, Value};
use smartcomposer_vault::Vault;
use smartcomposer_workspace::{
    ItemViewBase, MountPoint, View, ViewError, ViewRegistry, ViewState, ViewVariant, Workspace,
    WorkspaceEvent, WorkspaceEventKind, WorkspaceMounts, MARKDOWN_VIEW_TYPE,
};

type Journal = Rc<RefCell<Vec<String>>>;

/// Records every lifecycle call it receives.
struct JournalView {
    base: ItemViewBase,
    journal: Journal,
    state: Option<Value>,
}

impl View for JournalView {
    fn variant(&self) -> ViewVariant {
        ViewVariant::Custom("journal".into())
    }

    fn view_type(&self) -> &str {
        "journal"
    }

    fn display_text(&self) -> String {
        "Journal".into()
    }

    fn on_open(&mut self) -> Result<(), ViewError> {
        let seen = self
            .state
            .as_ref()
            .and_then(|state| state.get("label"))
            .and_then(Value::as_str)
            .unwrap_or("<none>")
            .to_string();
        self.base.set_title(&seen);
        self.journal.borrow_mut().push(format!("open:{seen}"));
        Ok(())
    }

    fn on_close(&mut self) -> Result<(), ViewError> {
        self.journal.borrow_mut().push("close".into());
        Ok(())
    }

    fn get_state(&self) -> Option<Value> {
        self.state.clone()
    }

    fn set_state(&mut self, state: Value) -> Result<(), ViewError> {
        self.journal.borrow_mut().push("set_state".into());
        self.state = Some(state);
        Ok(())
    }
}

fn setup() -> (Workspace, Journal) {
    let vault = Vault::new();
    vault.create("Welcome.md", "# Welcome to your new vault!").unwrap();
    vault.create("notes/todo.md", "- [ ] ship").unwrap();
    let views = ViewRegistry::new();
    let journal: Journal = Rc::new(RefCell::new(Vec::new()));
    let factory_journal = Rc::clone(&journal);
    views.register_view("journal", move |leaf| {
        factory_journal.borrow_mut().push("create".into());
        Box::new(JournalView {
            base: ItemViewBase::new(leaf),
            journal: Rc::clone(&factory_journal),
            state: None,
        }) as Box<dyn View>
    });
    let workspace = Workspace::new(vault, views, WorkspaceMounts::default());
    (workspace, journal)
}

fn count_events(workspace: &Workspace, kind: WorkspaceEventKind) -> Rc<Cell<usize>> {
    let count = Rc::new(Cell::new(0));
    let counter = Rc::clone(&count);
    workspace.on(kind, move |_| counter.set(counter.get() + 1));
    count
}

#[test]
fn open_link_text_reuses_the_leaf_showing_the_file() {
    let (workspace, _) = setup();
    let opened = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&opened);
    workspace.on(WorkspaceEventKind::FileOpen, move |event| {
        if let WorkspaceEvent::FileOpen(Some(file)) = event {
            sink.borrow_mut().push(file.path.clone());
        }
    });

    let first = workspace.open_link_text("Welcome.md", "", false).unwrap();
    let second = workspace.open_link_text("Welcome", "", false).unwrap();
    assert_eq!(first, second);
    assert_eq!(workspace.leaves().len(), 1);
    assert_eq!(workspace.active_leaf(), Some(first.clone()));
    assert_eq!(*opened.borrow(), vec!["Welcome.md", "Welcome.md"]);
    assert_eq!(first.view_type().as_deref(), Some(MARKDOWN_VIEW_TYPE));
    assert!(first
        .container_el()
        .text_content()
        .contains("# Welcome to your new vault!"));
}

#[test]
fn open_in_new_leaf_creates_another_editor_leaf() {
    let (workspace, _) = setup();
    let main = workspace.open_link_text("Welcome.md", "", false).unwrap();
    let extra = workspace.open_link_text("notes/todo.md", "", true).unwrap();
    assert_ne!(main, extra);
    assert_eq!(extra.mount(), MountPoint::Editor);
    assert_eq!(workspace.get_active_file().unwrap().path, "notes/todo.md");

    // Without a new leaf, the editor leaf switches file in place.
    let reused = workspace.open_link_text("todo", "notes/other.md", false).unwrap();
    assert_eq!(reused, extra);
    assert_eq!(workspace.leaves().len(), 2);
}

#[test]
fn detaching_active_leaf_promotes_the_other_one() {
    let (workspace, _) = setup();
    let editor = workspace.get_editor_leaf();
    let side = workspace.get_right_leaf(true).unwrap();
    workspace.set_active_leaf(&side);

    let promoted = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&promoted);
    let changes = Rc::new(Cell::new(0));
    let counter = Rc::clone(&changes);
    workspace.on(WorkspaceEventKind::ActiveLeafChange, move |event| {
        counter.set(counter.get() + 1);
        if let WorkspaceEvent::ActiveLeafChange(leaf) = event {
            *sink.borrow_mut() = leaf.clone();
        }
    });

    assert!(workspace.detach_leaf(&side));
    assert_eq!(changes.get(), 1);
    assert_eq!(*promoted.borrow(), Some(editor.clone()));
    assert_eq!(workspace.active_leaf(), Some(editor));
    assert!(side.is_detached());
    assert!(!workspace.detach_leaf(&side));
}

#[test]
fn detaching_last_leaf_clears_focus() {
    let (workspace, _) = setup();
    let leaf = workspace.get_editor_leaf();
    workspace.set_active_leaf(&leaf);
    leaf.detach();
    assert!(workspace.active_leaf().is_none());
    assert!(workspace.leaves().is_empty());
    assert_eq!(workspace.mounts().editor.child_count(), 0);
}

#[test]
fn set_state_completes_before_on_open() {
    let (workspace, journal) = setup();
    let leaf = workspace.get_right_leaf(true).unwrap();
    leaf.set_view_state(ViewState::new("journal").with_state(json!({ "label": "diff" })));

    assert_eq!(*journal.borrow(), vec!["create", "set_state", "open:diff"]);
    let state = leaf.get_view_state();
    assert_eq!(state.view_type, "journal");
    assert_eq!(state.state, Some(json!({ "label": "diff" })));
    assert!(leaf.container_el().find_by_class("view-header").is_some());
}

#[test]
fn replacing_a_view_closes_the_previous_one() {
    let (workspace, journal) = setup();
    let leaf = workspace.get_editor_leaf();
    leaf.set_view_state(ViewState::new("journal"));
    leaf.set_view_state(ViewState::new("journal").active(true));

    assert_eq!(
        *journal.borrow(),
        vec!["create", "open:<none>", "close", "create", "open:<none>"]
    );
    assert_eq!(workspace.active_leaf(), Some(leaf.clone()));
    assert_eq!(leaf.container_el().find_all_by_class("view-content").len(), 1);

    workspace.detach_leaf(&leaf);
    assert_eq!(journal.borrow().last().map(String::as_str), Some("close"));
}

#[test]
fn missing_factory_is_logged_and_ignored() {
    let (workspace, journal) = setup();
    let leaf = workspace.get_editor_leaf();
    leaf.set_view_state(ViewState::new("journal"));
    journal.borrow_mut().clear();

    leaf.set_view_state(ViewState::new("unknown").active(true));
    assert!(journal.borrow().is_empty());
    assert_eq!(leaf.view_type().as_deref(), Some("journal"));
    assert!(workspace.active_leaf().is_none());
}

#[test]
fn empty_leaf_reports_empty_state() {
    let (workspace, _) = setup();
    let leaf = workspace.get_editor_leaf();
    let state = leaf.get_view_state();
    assert_eq!(state.view_type, "empty");
    assert_eq!(state.state, Some(json!({})));
    assert!(!state.active);
}

#[test]
fn views_are_found_by_type_and_variant() {
    let (workspace, _) = setup();
    let side = workspace.get_right_leaf(true).unwrap();
    side.set_view_state(ViewState::new("journal").active(true));
    workspace.open_link_text("Welcome.md", "", false).unwrap();

    assert_eq!(workspace.get_leaves_of_type("journal"), vec![side.clone()]);
    let variant = ViewVariant::Custom("journal".into());
    assert!(workspace
        .with_active_view_of_type(&variant, |view| view.display_text())
        .is_none());
    workspace.set_active_leaf(&side);
    assert_eq!(
        workspace.with_active_view_of_type(&variant, |view| view.display_text()),
        Some("Journal".to_string())
    );

    assert_eq!(workspace.detach_leaves_of_type("journal"), 1);
    assert!(workspace.get_leaves_of_type("journal").is_empty());
}

#[test]
fn layout_round_trips() {
    let (workspace, journal) = setup();
    workspace.open_link_text("notes/todo.md", "", false).unwrap();
    let side = workspace.get_right_leaf(true).unwrap();
    side.set_view_state(ViewState::new("journal").with_state(json!({ "label": "chat" })));
    let layout = workspace.get_layout();
    assert_eq!(layout.leaves.len(), 2);
    assert_eq!(layout.active, Some(0));

    journal.borrow_mut().clear();
    workspace.restore_layout(&layout);
    assert_eq!(
        *journal.borrow(),
        vec!["close", "create", "set_state", "open:chat"]
    );
    assert_eq!(workspace.get_layout(), layout);
    assert_eq!(workspace.get_active_file().unwrap().path, "notes/todo.md");
}

#[test]
fn reveal_does_not_steal_focus() {
    let (workspace, _) = setup();
    let layout_changes = count_events(&workspace, WorkspaceEventKind::LayoutChange);
    let focus_changes = count_events(&workspace, WorkspaceEventKind::ActiveLeafChange);
    let editor = workspace.open_link_text("Welcome.md", "", false).unwrap();
    let side = workspace.get_right_leaf(true).unwrap();
    side.set_view_state(ViewState::new("journal"));

    let before = layout_changes.get();
    workspace.reveal_leaf(&side);
    assert_eq!(layout_changes.get(), before + 1);
    assert_eq!(focus_changes.get(), 1);
    assert_eq!(workspace.active_leaf(), Some(editor));
}

#[test]
fn markdown_view_saves_editor_text() {
    let (workspace, _) = setup();
    workspace.open_link_text("Welcome.md", "", false).unwrap();
    workspace
        .with_active_editor(|editor, _| {
            editor.select_all();
            editor.replace_selection("# Edited");
        })
        .unwrap();
    let leaf = workspace.active_leaf().unwrap();
    let _ = leaf.with_view(|view| assert_eq!(view.editor().unwrap().get_value(), "# Edited"));

    let vault = workspace.vault().clone();
    let file = vault.get_file_by_path("Welcome.md").unwrap();
    assert_eq!(vault.read(&file).unwrap(), "# Welcome to your new vault!");

    leaf.with_view_mut(|view| view.save()).unwrap().unwrap();
    assert_eq!(vault.read(&file).unwrap(), "# Edited");
    assert!(leaf.container_el().text_content().contains("# Edited"));
}

/// Queries its own leaf and the workspace while opening.
struct IntrospectingView {
    base: ItemViewBase,
    workspace: Workspace,
    journal: Journal,
}

impl View for IntrospectingView {
    fn variant(&self) -> ViewVariant {
        ViewVariant::Custom("introspect".into())
    }

    fn view_type(&self) -> &str {
        "introspect"
    }

    fn display_text(&self) -> String {
        "Introspect".into()
    }

    fn on_open(&mut self) -> Result<(), ViewError> {
        let leaf = self
            .base
            .leaf()
            .ok_or_else(|| ViewError::InvalidState("leaf dropped".into()))?;
        let found = self.workspace.get_leaves_of_type("introspect").len();
        let state = leaf.get_view_state();
        self.journal.borrow_mut().push(format!(
            "open:{}:{}:{}",
            leaf.view_type().unwrap_or_default(),
            found,
            state.view_type
        ));
        Ok(())
    }
}

#[test]
fn on_open_can_query_its_own_leaf_and_the_workspace() {
    let (workspace, journal) = setup();
    let (factory_workspace, factory_journal) = (workspace.clone(), Rc::clone(&journal));
    workspace.views().register_view("introspect", move |leaf| {
        Box::new(IntrospectingView {
            base: ItemViewBase::new(leaf),
            workspace: factory_workspace.clone(),
            journal: Rc::clone(&factory_journal),
        }) as Box<dyn View>
    });

    let leaf = workspace.get_right_leaf(true).unwrap();
    leaf.set_view_state(ViewState::new("introspect").active(true));
    assert_eq!(*journal.borrow(), vec!["open:introspect:1:introspect"]);
    assert_eq!(workspace.active_leaf(), Some(leaf.clone()));
    assert_eq!(leaf.display_text().as_deref(), Some("Introspect"));
}

#[test]
fn editor_callback_can_query_the_workspace() {
    let (workspace, _) = setup();
    workspace.open_link_text("Welcome.md", "", false).unwrap();

    let seen = workspace
        .with_active_editor(|editor, file| {
            editor.select_all();
            editor.replace_selection("# Rewritten");
            let leaf = workspace.active_leaf().unwrap();
            (
                file.map(|file| file.path.clone()),
                workspace.get_active_file().map(|file| file.path),
                workspace.get_leaves_of_type(MARKDOWN_VIEW_TYPE).len(),
                leaf.get_view_state().state,
            )
        })
        .unwrap();
    assert_eq!(seen.0.as_deref(), Some("Welcome.md"));
    assert_eq!(seen.1.as_deref(), Some("Welcome.md"));
    assert_eq!(seen.2, 1);
    assert_eq!(seen.3, Some(json!({ "file": "Welcome.md" })));

    let text = workspace
        .active_leaf()
        .unwrap()
        .with_view(|view| view.editor().map(|editor| editor.get_value().to_string()))
        .flatten();
    assert_eq!(text.as_deref(), Some("# Rewritten"));
}

#[test]
fn editor_callback_can_open_a_side_view() {
    let (workspace, journal) = setup();
    let editor_leaf = workspace.open_link_text("Welcome.md", "", false).unwrap();

    workspace
        .with_active_editor(|editor, _| {
            editor.select_all();
            editor.replace_selection("kept");
            let side = workspace.get_right_leaf(true).unwrap();
            side.set_view_state(ViewState::new("journal").active(true));
            side.with_view_mut(|view| view.set_state(json!({ "label": "chat" })))
                .unwrap()
                .unwrap();
        })
        .unwrap();

    assert_eq!(*journal.borrow(), vec!["create", "open:<none>", "set_state"]);
    let side = workspace.get_leaves_of_type("journal")[0].clone();
    assert_eq!(workspace.active_leaf(), Some(side));
    let text = editor_leaf
        .with_view(|view| view.editor().map(|editor| editor.get_value().to_string()))
        .flatten();
    assert_eq!(text.as_deref(), Some("kept"));
}

#[test]
fn replacing_the_view_inside_an_editor_callback_drops_the_edit() {
    let (workspace, _) = setup();
    let leaf = workspace.open_link_text("Welcome.md", "", false).unwrap();
    workspace
        .with_active_editor(|editor, _| {
            editor.set_value("lost");
            leaf.set_view_state(ViewState::new("journal"));
        })
        .unwrap();
    assert_eq!(leaf.view_type().as_deref(), Some("journal"));
    assert!(workspace.with_active_editor(|_, _| ()).is_none());
}

#[test]
fn nested_view_access_is_refused_instead_of_panicking() {
    let (workspace, _) = setup();
    let leaf = workspace.get_editor_leaf();
    leaf.set_view_state(ViewState::new("journal"));

    let nested = leaf
        .with_view_mut(|_| (leaf.view_type(), leaf.with_view(|view| view.display_text())))
        .unwrap();
    assert_eq!(nested, (Some("journal".to_string()), None));
    assert_eq!(leaf.display_text().as_deref(), Some("Journal"));
}

#[test]
fn renamed_file_stays_open_with_unsaved_edits() {
    let (workspace, _) = setup();
    let leaf = workspace.open_link_text("notes/todo.md", "", false).unwrap();
    workspace
        .with_active_editor(|editor, _| {
            editor.select_all();
            editor.replace_selection("- [x] ship");
        })
        .unwrap();
    let layout_changes = count_events(&workspace, WorkspaceEventKind::LayoutChange);

    let vault = workspace.vault().clone();
    let file = vault.get_file_by_path("notes/todo.md").unwrap();
    vault.rename(&file, "notes/done.md").unwrap();
    assert_eq!(workspace.get_active_file().unwrap().path, "notes/done.md");
    assert_eq!(leaf.display_text().as_deref(), Some("done"));
    assert_eq!(layout_changes.get(), 1);

    leaf.with_view_mut(|view| view.save()).unwrap().unwrap();
    let renamed = vault.get_file_by_path("notes/done.md").unwrap();
    assert_eq!(vault.read(&renamed).unwrap(), "- [x] ship");
    assert!(vault.get_file_by_path("notes/todo.md").is_none());
}

#[test]
fn moving_a_folder_repoints_views_below_it() {
    let (workspace, _) = setup();
    let leaf = workspace.open_link_text("notes/todo.md", "", false).unwrap();
    workspace.vault().rename("notes", "archive/notes").unwrap();

    assert_eq!(leaf.file().unwrap().path, "archive/notes/todo.md");
    assert_eq!(
        leaf.get_view_state().state,
        Some(json!({ "file": "archive/notes/todo.md" }))
    );
    assert_eq!(
        workspace.open_link_text("archive/notes/todo", "", false),
        Some(leaf)
    );
}

#[test]
fn deleting_a_file_closes_its_views() {
    let (workspace, _) = setup();
    let welcome = workspace.open_link_text("Welcome.md", "", false).unwrap();
    let todo = workspace.open_link_text("notes/todo.md", "", true).unwrap();

    workspace.vault().delete("notes").unwrap();
    assert!(todo.is_detached());
    assert_eq!(workspace.leaves(), vec![welcome.clone()]);
    assert_eq!(workspace.active_leaf(), Some(welcome));
}

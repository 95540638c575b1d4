//! Terminal application state.
//!
//! Key events are translated into [`TaskStore`] operations; the store reports
//! back through [`StoreEvent`]s and [`crate::ui::render`] draws whatever the
//! current state is.

use crate::error::Result;
use crate::store::{StoreEvent, TaskStore};
use crate::task::{NewTask, Priority, Task, TaskId};
use crate::theme::Theme;
use crate::view::{FilterMode, ViewState};
use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormField {
    #[default]
    Text,
    Priority,
    Tag,
    Due,
}

impl FormField {
    const fn next(self) -> Self {
        match self {
            Self::Text => Self::Priority,
            Self::Priority => Self::Tag,
            Self::Tag => Self::Due,
            Self::Due => Self::Text,
        }
    }

    const fn prev(self) -> Self {
        match self {
            Self::Text => Self::Due,
            Self::Priority => Self::Text,
            Self::Tag => Self::Priority,
            Self::Due => Self::Tag,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddForm {
    pub text: String,
    pub priority: Priority,
    pub tag: String,
    pub due: String,
    pub field: FormField,
}

impl AddForm {
    fn input(&mut self) -> Option<&mut String> {
        match self.field {
            FormField::Text => Some(&mut self.text),
            FormField::Tag => Some(&mut self.tag),
            FormField::Due => Some(&mut self.due),
            FormField::Priority => None,
        }
    }

    fn to_new_task(&self) -> std::result::Result<NewTask, String> {
        let due = self.due.trim();
        let due_date = if due.is_empty() {
            None
        } else {
            Some(
                NaiveDate::parse_from_str(due, "%Y-%m-%d")
                    .map_err(|_| format!("invalid due date '{due}' (use YYYY-MM-DD)"))?,
            )
        };
        Ok(NewTask::new(self.text.clone())
            .priority(self.priority)
            .tag(self.tag.clone())
            .due(due_date))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    Adding(AddForm),
    Searching,
    Editing { id: TaskId, buffer: String },
    ConfirmClear,
    Importing { path: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub message: String,
    pub is_error: bool,
}

pub struct App {
    pub store: TaskStore,
    pub view: ViewState,
    pub mode: Mode,
    pub selected: usize,
    pub theme: Theme,
    pub status: Option<StatusLine>,
    pub should_quit: bool,
    export_dir: PathBuf,
    events: Rc<RefCell<Vec<StoreEvent>>>,
}

impl App {
    pub fn new(mut store: TaskStore, filter: FilterMode, export_dir: PathBuf) -> Self {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        store.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        let theme = Theme::load(store.backend_mut());
        Self {
            store,
            view: ViewState {
                filter,
                query: String::new(),
            },
            mode: Mode::Normal,
            selected: 0,
            theme,
            status: None,
            should_quit: false,
            export_dir,
            events,
        }
    }

    /// The derived view currently on screen.
    pub fn visible(&self) -> Vec<&Task> {
        self.view.project(self.store.tasks())
    }

    pub fn selected_id(&self) -> Option<TaskId> {
        self.visible().get(self.selected).map(|t| t.id)
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match std::mem::take(&mut self.mode) {
            Mode::Normal => self.normal_key(key),
            Mode::Adding(form) => self.adding_key(form, key),
            Mode::Searching => self.searching_key(key),
            Mode::Editing { id, buffer } => self.editing_key(id, buffer, key),
            Mode::ConfirmClear => self.confirm_key(key),
            Mode::Importing { path } => self.importing_key(path, key),
        }
        self.drain_events();
    }

    fn normal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc => {
                self.view.query.clear();
                self.status = None;
            }
            KeyCode::Char('a') => self.mode = Mode::Adding(AddForm::default()),
            KeyCode::Char('/') => self.mode = Mode::Searching,
            KeyCode::Char('f') => self.set_filter(self.view.filter.next()),
            KeyCode::Char('1') => self.set_filter(FilterMode::All),
            KeyCode::Char('2') => self.set_filter(FilterMode::Active),
            KeyCode::Char('3') => self.set_filter(FilterMode::Completed),
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.visible().len() {
                    self.selected += 1;
                }
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                if let Some(id) = self.selected_id() {
                    let result = self.store.toggle(id);
                    self.report(result);
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(id) = self.selected_id() {
                    let result = self.store.delete(id);
                    self.report(result);
                }
            }
            KeyCode::Char('e') => {
                if let Some(task) = self.selected_id().and_then(|id| self.store.get(id)) {
                    self.mode = Mode::Editing {
                        id: task.id,
                        buffer: task.text.clone(),
                    };
                }
            }
            KeyCode::Char('m') => {
                let result = self.store.mark_all_completed();
                self.report(result);
            }
            KeyCode::Char('c') => self.mode = Mode::ConfirmClear,
            KeyCode::Char('x') => self.export(),
            KeyCode::Char('i') => {
                let path = self.export_dir.join(crate::store::EXPORT_FILE_NAME);
                self.mode = Mode::Importing {
                    path: path.display().to_string(),
                };
            }
            KeyCode::Char('t') => self.toggle_theme(),
            _ => {}
        }
    }

    fn adding_key(&mut self, mut form: AddForm, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => return,
            KeyCode::Tab => form.field = form.field.next(),
            KeyCode::BackTab => form.field = form.field.prev(),
            KeyCode::Enter => match form.to_new_task() {
                Ok(new_task) => match self.store.add(new_task) {
                    Ok(Some(_)) => return,
                    Ok(None) => {}
                    Err(err) => {
                        self.set_error(err.to_string());
                        return;
                    }
                },
                Err(message) => self.set_error(message),
            },
            KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')
                if form.field == FormField::Priority =>
            {
                form.priority = form.priority.next();
            }
            KeyCode::Backspace => {
                if let Some(input) = form.input() {
                    input.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(input) = form.input() {
                    input.push(c);
                }
            }
            _ => {}
        }
        self.mode = Mode::Adding(form);
    }

    fn searching_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => return,
            KeyCode::Esc => {
                self.view.query.clear();
                self.selected = 0;
                return;
            }
            KeyCode::Backspace => {
                self.view.query.pop();
                self.selected = 0;
            }
            KeyCode::Char(c) => {
                self.view.query.push(c);
                self.selected = 0;
            }
            _ => {}
        }
        self.mode = Mode::Searching;
    }

    fn editing_key(&mut self, id: TaskId, mut buffer: String, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => return,
            KeyCode::Enter => {
                let result = self.store.edit_text(id, &buffer);
                self.report(result);
                return;
            }
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Char(c) => buffer.push(c),
            _ => {}
        }
        self.mode = Mode::Editing { id, buffer };
    }

    fn confirm_key(&mut self, key: KeyEvent) {
        if matches!(key.code, KeyCode::Char('y' | 'Y')) {
            // the popup already asked
            let result = self.store.clear_all(&mut |_: &str| true);
            self.report(result);
            self.view.query.clear();
        }
    }

    fn importing_key(&mut self, mut path: String, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => return,
            KeyCode::Enter => {
                self.import_from(PathBuf::from(path.trim()));
                return;
            }
            KeyCode::Backspace => {
                path.pop();
            }
            KeyCode::Char(c) => path.push(c),
            _ => {}
        }
        self.mode = Mode::Importing { path };
    }

    fn set_filter(&mut self, filter: FilterMode) {
        self.view.filter = filter;
        self.selected = 0;
    }

    fn export(&mut self) {
        match self.store.export_to(&self.export_dir) {
            Ok(path) => self.set_info(format!("Exported to {}", path.display())),
            Err(err) => self.set_error(err.to_string()),
        }
    }

    fn import_from(&mut self, path: PathBuf) {
        let result = fs::read(&path)
            .map_err(crate::Error::from)
            .and_then(|bytes| self.store.import(&bytes));
        if let Err(err) = result {
            debug!(path = %path.display(), error = %err, "import rejected");
            self.set_error(err.to_string());
        }
    }

    fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        if let Err(err) = self.theme.save(self.store.backend_mut()) {
            self.set_error(err.to_string());
        }
    }

    fn report<T>(&mut self, result: Result<T>) {
        if let Err(err) = result {
            self.set_error(err.to_string());
        }
    }

    fn set_info(&mut self, message: String) {
        self.status = Some(StatusLine {
            message,
            is_error: false,
        });
    }

    fn set_error(&mut self, message: String) {
        self.status = Some(StatusLine {
            message,
            is_error: true,
        });
    }

    fn drain_events(&mut self) {
        let events: Vec<StoreEvent> = self.events.borrow_mut().drain(..).collect();
        for event in events {
            match event {
                StoreEvent::Imported(count) => self.set_info(format!("Imported {count} tasks")),
                StoreEvent::Cleared => self.set_info("All tasks deleted".into()),
                StoreEvent::MarkedAll => self.set_info("Everything is done".into()),
                _ => {}
            }
        }
        let len = self.visible().len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use tempfile::TempDir;

    fn app() -> App {
        let store = TaskStore::open(Box::new(MemoryStore::new()));
        App::new(store, FilterMode::All, PathBuf::from("."))
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn add(app: &mut App, text: &str) {
        press(app, KeyCode::Char('a'));
        type_str(app, text);
        press(app, KeyCode::Enter);
    }

    #[test]
    fn add_form_submits_every_field() {
        let mut app = app();
        press(&mut app, KeyCode::Char('a'));
        type_str(&mut app, "Buy milk");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Tab);
        type_str(&mut app, "home");
        press(&mut app, KeyCode::Tab);
        type_str(&mut app, "2024-06-01");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.mode, Mode::Normal);
        let task = &app.store.tasks()[0];
        assert_eq!(task.text, "Buy milk");
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.tag, "home");
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2024, 6, 1));
    }

    #[test]
    fn blank_add_keeps_form_open() {
        let mut app = app();
        add(&mut app, "   ");
        assert!(matches!(app.mode, Mode::Adding(_)));
        assert!(app.store.is_empty());
        assert_eq!(app.status, None);
    }

    #[test]
    fn bad_due_date_is_reported() {
        let mut app = app();
        press(&mut app, KeyCode::Char('a'));
        type_str(&mut app, "x");
        press(&mut app, KeyCode::BackTab);
        type_str(&mut app, "tomorrow");
        press(&mut app, KeyCode::Enter);
        assert!(app.store.is_empty());
        assert!(app.status.as_ref().is_some_and(|s| s.is_error));
    }

    #[test]
    fn toggle_and_delete_follow_the_view() {
        let mut app = app();
        add(&mut app, "low one");
        add(&mut app, "second");
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char(' '));
        assert!(app.store.tasks()[1].completed);

        press(&mut app, KeyCode::Char('2'));
        assert_eq!(app.visible().len(), 1);
        press(&mut app, KeyCode::Char('d'));
        assert_eq!(app.store.len(), 1);
        assert_eq!(app.store.tasks()[0].text, "second");
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn search_narrows_view() {
        let mut app = app();
        add(&mut app, "Buy milk");
        add(&mut app, "Walk dog");
        press(&mut app, KeyCode::Char('/'));
        type_str(&mut app, "MILK");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.view.query, "MILK");
        assert_eq!(app.visible().len(), 1);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.visible().len(), 2);
    }

    #[test]
    fn inline_edit_replaces_text() {
        let mut app = app();
        add(&mut app, "draft");
        press(&mut app, KeyCode::Char('e'));
        press(&mut app, KeyCode::Backspace);
        type_str(&mut app, "ts");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.store.tasks()[0].text, "drafts");
    }

    #[test]
    fn clear_needs_yes_and_resets_search() {
        let mut app = app();
        add(&mut app, "a");
        app.view.query = "a".into();

        press(&mut app, KeyCode::Char('c'));
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.store.len(), 1);

        press(&mut app, KeyCode::Char('c'));
        press(&mut app, KeyCode::Char('y'));
        assert!(app.store.is_empty());
        assert!(app.view.query.is_empty());
        assert_eq!(app.store.stats().total, 0);
    }

    #[test]
    fn export_then_import_through_keys() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::open(Box::new(MemoryStore::new()));
        let mut app = App::new(store, FilterMode::All, dir.path().to_path_buf());
        add(&mut app, "keep");
        press(&mut app, KeyCode::Char('x'));
        assert!(dir.path().join(crate::store::EXPORT_FILE_NAME).exists());

        press(&mut app, KeyCode::Char('m'));
        press(&mut app, KeyCode::Char('i'));
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.store.len(), 1);
        assert!(!app.store.tasks()[0].completed);
        assert_eq!(
            app.status.as_ref().map(|s| s.message.as_str()),
            Some("Imported 1 tasks")
        );
    }

    #[test]
    fn failed_import_shows_error() {
        let dir = TempDir::new().unwrap();
        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{oops").unwrap();
        let mut app = app();
        add(&mut app, "keep");
        app.mode = Mode::Importing {
            path: bad.display().to_string(),
        };
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.store.len(), 1);
        assert!(app.status.as_ref().is_some_and(|s| s.is_error));
    }

    #[test]
    fn theme_toggle_is_persisted() {
        let kv = MemoryStore::new();
        let store = TaskStore::open(Box::new(kv.clone()));
        let mut app = App::new(store, FilterMode::All, PathBuf::from("."));
        press(&mut app, KeyCode::Char('t'));
        assert_eq!(app.theme, Theme::Dark);
        assert_eq!(Theme::load(&kv), Theme::Dark);
    }

    #[test]
    fn ctrl_c_quits_from_any_mode() {
        let mut app = app();
        press(&mut app, KeyCode::Char('a'));
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }
}

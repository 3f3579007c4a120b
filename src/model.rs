use std::path::PathBuf;

use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, info, trace};

use crate::api::{ApiEvent, ApiOp, ApiRequest};
use crate::domain::{CmdMode, HELP_TEXT, Message, VdConfig, VdError};
use crate::forms::FormState;
use crate::inputter::{InputResult, Inputter};
use crate::listview::{ListViewState, PageView, SortDirection, page_of};
use crate::notify::Toast;
use crate::resources::{self, MenuSection, Resource};
use crate::session::{Action, Session};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Modus {
    Table,
    Form,
    Confirm,
    Popup,
    CmdInput,
}

/// Where requests go. The worker thread implements this; tests swap in a
/// recorder.
pub trait ApiSink {
    fn submit(&self, request: ApiRequest);
}

pub struct Model {
    config: VdConfig,
    session: Session,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    menu: Vec<MenuSection>,
    active_idx: usize,
    records: Vec<crate::listview::Record>,
    pub list: ListViewState,
    cursor_row: usize,
    cursor_column: usize,
    loading: bool,
    deleting: bool,
    /// Bumped on every screen switch; responses from an older screen are
    /// dropped instead of resolving into a view the user already left.
    generation: u64,
    form: Option<FormState>,
    confirm_ids: Vec<String>,
    toasts: Vec<Toast>,
    popup_message: String,
    sink: Box<dyn ApiSink>,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CmdMode>,
    last_input: InputResult,
}

impl Model {
    pub fn new(config: VdConfig, session: Session, sink: Box<dyn ApiSink>) -> Self {
        let page_size = config.page_size;
        let mut model = Model {
            config,
            session,
            status: Status::READY,
            modus: Modus::Table,
            previous_modus: Modus::Table,
            menu: resources::menu(),
            active_idx: 0,
            records: Vec::new(),
            list: ListViewState::new(page_size),
            cursor_row: 0,
            cursor_column: 0,
            loading: false,
            deleting: false,
            generation: 0,
            form: None,
            confirm_ids: Vec::new(),
            toasts: Vec::new(),
            popup_message: String::new(),
            sink,
            clipboard: None,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
        };
        model.fetch();
        model
    }

    fn resource_count(&self) -> usize {
        self.menu.iter().map(|s| s.resources.len()).sum()
    }

    pub fn active_resource(&self) -> &Resource {
        let mut idx = self.active_idx;
        for section in &self.menu {
            if idx < section.resources.len() {
                return &section.resources[idx];
            }
            idx -= section.resources.len();
        }
        // active_idx is always kept within resource_count
        &self.menu[0].resources[0]
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::CmdInput
    }

    pub fn modus(&self) -> Modus {
        self.modus
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn page(&self) -> PageView<'_> {
        page_of(&self.records, &self.list, &self.active_resource().columns)
    }

    fn toast(&mut self, toast: Toast) {
        self.toasts.push(toast);
    }

    fn fetch(&mut self) {
        let resource = self.active_resource();
        let (key, title, path) = (resource.key, resource.title, resource.path);
        if !self.session.can(key, Action::View) {
            self.records.clear();
            self.toast(Toast::error(format!("No permission to view {title}.")));
            return;
        }
        self.loading = true;
        self.sink.submit(ApiRequest::List {
            generation: self.generation,
            resource: path,
        });
    }

    fn switch_resource(&mut self, step: isize) {
        let count = self.resource_count() as isize;
        let next = (self.active_idx as isize + step).rem_euclid(count);
        self.active_idx = next as usize;
        // Fresh screen: list state and records do not carry over.
        self.records.clear();
        self.list = ListViewState::new(self.config.page_size);
        self.cursor_row = 0;
        self.cursor_column = 0;
        self.generation += 1;
        debug!(
            "Switched to {} (generation {})",
            self.active_resource().key,
            self.generation
        );
        self.fetch();
    }

    pub fn update(&mut self, message: Message) -> Result<(), VdError> {
        trace!("Update: {:?} in {:?}", message, self.modus);
        // Responses from the worker apply in every modus, a save can finish
        // while a popup or the command line is up.
        let message = match message {
            Message::Api(event) => {
                self.handle_api_event(event);
                return Ok(());
            }
            other => other,
        };
        match self.modus {
            Modus::Table => match message {
                Message::Quit => self.quit(),
                Message::MoveUp => self.move_cursor_row(-1),
                Message::MoveDown => self.move_cursor_row(1),
                Message::MoveLeft => self.move_cursor_column(-1),
                Message::MoveRight => self.move_cursor_column(1),
                Message::MoveBeginning => self.cursor_row = 0,
                Message::MoveEnd => {
                    self.cursor_row = self.page().page_records.len().saturating_sub(1)
                }
                Message::NextPage => self.turn_page(1),
                Message::PrevPage => self.turn_page(-1),
                Message::NextResource => self.switch_resource(1),
                Message::PrevResource => self.switch_resource(-1),
                Message::Refresh => self.fetch(),
                Message::Search => {
                    let term = self.list.search_term.clone();
                    self.enter_cmd_mode(CmdMode::SearchTable, &term);
                }
                Message::SortAscending => self.sort(SortDirection::Ascending),
                Message::SortDescending => self.sort(SortDirection::Descending),
                Message::ToggleSelect => self.toggle_select(),
                Message::ToggleSelectPage => {
                    let ids = self.page().page_ids();
                    self.list.toggle_all(&ids);
                }
                Message::DeleteSelected => self.request_delete(),
                Message::NewRecord => self.open_form(false),
                Message::EditRecord | Message::Enter => self.open_form(true),
                Message::ImportCsv => self.request_import(),
                Message::UploadImage => self.request_upload(),
                Message::CopyCell => self.copy_cell(),
                Message::CopyRow => self.copy_row(),
                Message::Help => self.show_help(),
                Message::Exit => {}
                _ => (),
            },
            Modus::Form => match message {
                Message::Quit => self.quit(),
                Message::MoveUp => {
                    if let Some(form) = &mut self.form {
                        form.move_cursor(false);
                    }
                }
                Message::MoveDown => {
                    if let Some(form) = &mut self.form {
                        form.move_cursor(true);
                    }
                }
                Message::Enter => {
                    if let Some(form) = &self.form {
                        let value = form.current_field().value.clone();
                        self.enter_cmd_mode(CmdMode::FormField, &value);
                    }
                }
                Message::SubmitForm => self.submit_form(),
                Message::Exit => {
                    self.form = None;
                    self.modus = Modus::Table;
                }
                Message::Help => self.show_help(),
                _ => (),
            },
            Modus::Confirm => match message {
                Message::Quit => self.quit(),
                Message::Enter => self.confirm_delete(),
                Message::Exit => {
                    self.confirm_ids.clear();
                    self.modus = Modus::Table;
                }
                _ => (),
            },
            Modus::Popup => match message {
                Message::Quit => self.quit(),
                Message::Enter | Message::Exit | Message::Help => {
                    self.modus = self.previous_modus;
                    self.previous_modus = Modus::Popup;
                    self.popup_message.clear();
                }
                _ => (),
            },
            Modus::CmdInput => {
                if let Message::RawKey(key) = message {
                    self.raw_input(key);
                }
            }
        }
        Ok(())
    }

    // -------------------- api events ---------------------- //

    fn handle_api_event(&mut self, event: ApiEvent) {
        if event.generation() != self.generation {
            trace!(
                "Dropping stale response (gen {} != {})",
                event.generation(),
                self.generation
            );
            return;
        }
        match event {
            ApiEvent::Listed { records, .. } => {
                info!("Loaded {} {} records", records.len(), self.active_resource().key);
                self.records = records;
                self.loading = false;
                let page_len = self.page().page_records.len();
                self.cursor_row = self.cursor_row.min(page_len.saturating_sub(1));
            }
            ApiEvent::Saved { .. } => {
                self.form = None;
                if self.modus == Modus::Form {
                    self.modus = Modus::Table;
                }
                self.toast(Toast::success("Saved."));
                self.fetch();
            }
            ApiEvent::Deleted { count, .. } => {
                self.deleting = false;
                self.list.selected.clear();
                self.toast(Toast::success(format!("Deleted {count} records.")));
                self.fetch();
            }
            ApiEvent::Imported { summary, .. } => {
                self.toast(Toast::success(format!(
                    "Imported: {} created, {} skipped.",
                    summary.created, summary.skipped
                )));
                self.fetch();
            }
            ApiEvent::Uploaded { .. } => {
                self.toast(Toast::success("Upload finished."));
                self.fetch();
            }
            ApiEvent::Failed { op, error, .. } => {
                let message = error.user_message();
                match op {
                    ApiOp::List => {
                        self.loading = false;
                        self.toast(Toast::error(message));
                    }
                    ApiOp::Save => {
                        // Keep the modal open so the user can fix and retry.
                        match &mut self.form {
                            Some(form) => form.submit_failed(message),
                            None => self.toast(Toast::error(message)),
                        }
                    }
                    ApiOp::Delete => {
                        // Selection stays as it was, nothing was deleted.
                        self.deleting = false;
                        self.toast(Toast::error(message));
                    }
                    ApiOp::Import | ApiOp::Upload => self.toast(Toast::error(message)),
                }
            }
        }
    }

    // -------------------- table actions ---------------------- //

    fn move_cursor_row(&mut self, step: isize) {
        let len = self.page().page_records.len();
        if len == 0 {
            self.cursor_row = 0;
            return;
        }
        let next = self.cursor_row as isize + step;
        self.cursor_row = next.clamp(0, len as isize - 1) as usize;
    }

    fn move_cursor_column(&mut self, step: isize) {
        let len = self.active_resource().columns.len();
        let next = self.cursor_column as isize + step;
        self.cursor_column = next.clamp(0, len as isize - 1) as usize;
    }

    fn turn_page(&mut self, step: isize) {
        let total = self.page().total_pages.max(1);
        let next = (self.list.page as isize + step).clamp(1, total as isize);
        self.list.page = next as usize;
        self.cursor_row = 0;
    }

    fn sort(&mut self, direction: SortDirection) {
        let key = self.active_resource().columns[self.cursor_column].key;
        self.list.sort_key = Some(key.to_string());
        self.list.sort_direction = direction;
    }

    fn toggle_select(&mut self) {
        let id = self
            .page()
            .page_records
            .get(self.cursor_row)
            .map(|r| r.id().to_string());
        if let Some(id) = id {
            self.list.toggle_one(&id);
        }
    }

    fn request_delete(&mut self) {
        if self.list.selected.is_empty() {
            self.toast(Toast::info("Nothing selected."));
            return;
        }
        let resource = self.active_resource();
        if !self.session.can(resource.key, Action::Delete) {
            let title = resource.title;
            self.toast(Toast::error(format!("No permission to delete {title}.")));
            return;
        }
        self.confirm_ids = self.list.selected.iter().cloned().collect();
        self.confirm_ids.sort();
        self.modus = Modus::Confirm;
    }

    fn confirm_delete(&mut self) {
        self.modus = Modus::Table;
        if self.deleting {
            return;
        }
        self.deleting = true;
        let ids = std::mem::take(&mut self.confirm_ids);
        self.sink.submit(ApiRequest::BulkDelete {
            generation: self.generation,
            resource: self.active_resource().path,
            ids,
        });
    }

    fn open_form(&mut self, edit: bool) {
        let resource = self.active_resource();
        let action = if edit { Action::Edit } else { Action::Create };
        if !self.session.can(resource.key, action) {
            let title = resource.title;
            self.toast(Toast::error(format!("No permission to change {title}.")));
            return;
        }
        let form = if edit {
            let Some(record) = self.page().page_records.get(self.cursor_row).copied() else {
                return;
            };
            FormState::edit(resource, record)
        } else {
            FormState::create(resource)
        };
        self.form = Some(form);
        self.modus = Modus::Form;
    }

    fn submit_form(&mut self) {
        let Some(form) = &mut self.form else {
            return;
        };
        if !form.validate() {
            return;
        }
        // No-op while a submission is in flight, there is no backend
        // idempotency key to fall back on.
        if !form.begin_submit() {
            return;
        }
        let body = form.body();
        let record_id = form.record_id.clone();
        let resource = self.active_resource().path;
        let generation = self.generation;
        match record_id {
            Some(id) => self.sink.submit(ApiRequest::Update {
                generation,
                resource,
                id,
                body,
            }),
            None => self.sink.submit(ApiRequest::Create {
                generation,
                resource,
                body,
            }),
        }
    }

    fn request_import(&mut self) {
        let resource = self.active_resource();
        if !resource.csv_import {
            self.toast(Toast::info("This screen has no CSV import."));
            return;
        }
        if !self.session.can(resource.key, Action::Create) {
            let title = resource.title;
            self.toast(Toast::error(format!("No permission to import {title}.")));
            return;
        }
        self.enter_cmd_mode(CmdMode::ImportFile, "");
    }

    fn request_upload(&mut self) {
        let resource = self.active_resource();
        if !resource.image_upload {
            self.toast(Toast::info("This screen has no image upload."));
            return;
        }
        if !self.session.can(resource.key, Action::Edit) {
            let title = resource.title;
            self.toast(Toast::error(format!("No permission to change {title}.")));
            return;
        }
        if self.page().page_records.get(self.cursor_row).is_none() {
            self.toast(Toast::info("Select a record first."));
            return;
        }
        self.enter_cmd_mode(CmdMode::UploadFile, "");
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::Popup;
        self.popup_message = HELP_TEXT.to_string();
    }

    // -------------------- command input ---------------------- //

    fn enter_cmd_mode(&mut self, mode: CmdMode, prefill: &str) {
        self.previous_modus = self.modus;
        self.modus = Modus::CmdInput;
        self.cmd_mode = Some(mode);
        self.input.start(prefill);
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        if self.last_input.finished {
            self.modus = self.previous_modus;
            self.previous_modus = Modus::CmdInput;
            let result = self.last_input.clone();
            let mode = self.cmd_mode.take();
            if !result.canceled {
                self.apply_cmd_input(mode, result.input);
            }
        }
    }

    fn apply_cmd_input(&mut self, mode: Option<CmdMode>, input: String) {
        match mode {
            Some(CmdMode::SearchTable) => {
                // Selection deliberately survives the filter change.
                self.list.search_term = input;
                self.list.page = 1;
                self.cursor_row = 0;
            }
            Some(CmdMode::FormField) => {
                if let Some(form) = &mut self.form {
                    form.set_current_value(input);
                }
            }
            Some(CmdMode::ImportFile) => {
                self.sink.submit(ApiRequest::ImportCsv {
                    generation: self.generation,
                    resource: self.active_resource().path,
                    file: PathBuf::from(input),
                });
                self.toast(Toast::info("Import started."));
            }
            Some(CmdMode::UploadFile) => {
                let id = self
                    .page()
                    .page_records
                    .get(self.cursor_row)
                    .map(|r| r.id().to_string());
                if let Some(id) = id {
                    self.sink.submit(ApiRequest::UploadImage {
                        generation: self.generation,
                        resource: self.active_resource().path,
                        id,
                        file: PathBuf::from(input),
                    });
                    self.toast(Toast::info("Upload started."));
                }
            }
            None => {}
        }
    }

    // -------------------- clipboard ---------------------- //

    fn clipboard_set(&mut self, content: String) {
        if self.clipboard.is_none() {
            self.clipboard = Clipboard::new().ok();
        }
        match &mut self.clipboard {
            Some(clipboard) => match clipboard.set_text(content) {
                Ok(_) => self.toast(Toast::info("Copied.")),
                Err(e) => self.toast(Toast::error(format!("Clipboard error: {e}"))),
            },
            None => self.toast(Toast::error("No clipboard available.")),
        }
    }

    fn copy_cell(&mut self) {
        let key = self.active_resource().columns[self.cursor_column].key;
        let cell = self
            .page()
            .page_records
            .get(self.cursor_row)
            .map(|r| r.display(key));
        if let Some(cell) = cell {
            self.clipboard_set(cell);
        }
    }

    fn copy_row(&mut self) {
        let columns = &self.active_resource().columns;
        let row = self.page().page_records.get(self.cursor_row).map(|r| {
            columns
                .iter()
                .map(|c| wrap_cell_content(&r.display(c.key)))
                .collect::<Vec<String>>()
                .join(",")
        });
        if let Some(row) = row {
            self.clipboard_set(row);
        }
    }

    // -------------------- ui snapshot ---------------------- //

    pub fn ui(&mut self) -> UiData {
        let now = chrono::Utc::now();
        self.toasts.retain(|t| !t.expired(now));

        let resource = self.active_resource();
        let view = page_of(&self.records, &self.list, &resource.columns);
        let rows = view
            .page_records
            .iter()
            .map(|r| RowView {
                selected: self.list.selected.contains(r.id()),
                cells: resource.columns.iter().map(|c| r.display(c.key)).collect(),
            })
            .collect();

        let mut sidebar = Vec::new();
        let mut flat = 0;
        for section in &self.menu {
            let mut entries = Vec::new();
            for r in &section.resources {
                entries.push((r.title, flat == self.active_idx));
                flat += 1;
            }
            sidebar.push((section.title, entries));
        }

        UiData {
            user: self.session.user.clone(),
            role: self.session.role.clone(),
            api_target: self.config.api_base_url.clone(),
            sidebar,
            title: resource.title,
            columns: resource
                .columns
                .iter()
                .map(|c| {
                    let marker = match (&self.list.sort_key, self.list.sort_direction) {
                        (Some(k), SortDirection::Ascending) if k == c.key => " ▲",
                        (Some(k), SortDirection::Descending) if k == c.key => " ▼",
                        _ => "",
                    };
                    format!("{}{}", c.label, marker)
                })
                .collect(),
            rows,
            cursor_row: self.cursor_row,
            cursor_column: self.cursor_column,
            page: view.page,
            total_pages: view.total_pages,
            filtered_len: view.filtered_len,
            selected_count: self.list.selected.len(),
            search_term: self.list.search_term.clone(),
            loading: self.loading,
            modus: self.modus,
            form: self.form.as_ref().map(FormView::from),
            confirm_count: self.confirm_ids.len(),
            popup_message: self.popup_message.clone(),
            toast: self.toasts.last().cloned(),
            cmd_mode: self.cmd_mode,
            cmdinput: self.last_input.clone(),
        }
    }
}

/// CSV style quoting for row copies.
fn wrap_cell_content(c: &str) -> String {
    let needs_escaping = c.contains('"');
    let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
    let mut out = String::from(c);
    if needs_escaping {
        out = out.replace('"', "\"\"");
    }
    if needs_wrapping {
        out = format!("\"{out}\"");
    }
    out
}

#[derive(Debug)]
pub struct RowView {
    pub selected: bool,
    pub cells: Vec<String>,
}

#[derive(Debug)]
pub struct FormFieldView {
    pub label: &'static str,
    pub value: String,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct FormView {
    pub editing: bool,
    pub fields: Vec<FormFieldView>,
    pub cursor: usize,
    pub submitting: bool,
    pub server_error: Option<String>,
}

impl From<&FormState> for FormView {
    fn from(form: &FormState) -> Self {
        FormView {
            editing: form.record_id.is_some(),
            fields: form
                .fields
                .iter()
                .map(|f| FormFieldView {
                    label: f.label,
                    value: f.value.clone(),
                    error: f.error.clone(),
                })
                .collect(),
            cursor: form.cursor,
            submitting: form.submitting,
            server_error: form.server_error.clone(),
        }
    }
}

/// Everything the renderer needs for one frame, cloned out of the model.
#[derive(Debug)]
pub struct UiData {
    pub user: String,
    pub role: String,
    pub api_target: String,
    pub sidebar: Vec<(&'static str, Vec<(&'static str, bool)>)>,
    pub title: &'static str,
    pub columns: Vec<String>,
    pub rows: Vec<RowView>,
    pub cursor_row: usize,
    pub cursor_column: usize,
    pub page: usize,
    pub total_pages: usize,
    pub filtered_len: usize,
    pub selected_count: usize,
    pub search_term: String,
    pub loading: bool,
    pub modus: Modus,
    pub form: Option<FormView>,
    pub confirm_count: usize,
    pub popup_message: String,
    pub toast: Option<Toast>,
    pub cmd_mode: Option<CmdMode>,
    pub cmdinput: InputResult,
}

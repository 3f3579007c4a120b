use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

use crate::api::{ApiError, ApiEvent};
use crate::session::SessionError;

#[derive(Debug, Clone)]
pub struct VdConfig {
    pub api_base_url: String,
    pub event_poll_time: u64,
    pub page_size: usize,
}

#[derive(Debug, Error)]
pub enum VdError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("api error: {0}")]
    Api(#[from] ApiError),
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    #[error("{0}")]
    Startup(String),
}

/// What the command line input at the bottom of the screen is collecting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CmdMode {
    SearchTable,
    FormField,
    ImportFile,
    UploadFile,
}

#[derive(Debug)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MoveBeginning,
    MoveEnd,
    NextPage,
    PrevPage,
    NextResource,
    PrevResource,
    Refresh,
    Search,
    SortAscending,
    SortDescending,
    ToggleSelect,
    ToggleSelectPage,
    DeleteSelected,
    NewRecord,
    EditRecord,
    SubmitForm,
    ImportCsv,
    UploadImage,
    CopyCell,
    CopyRow,
    Help,
    Enter,
    Exit,
    RawKey(KeyEvent),
    Api(ApiEvent),
}

pub const HELP_TEXT: &str = "\
vetdesk key bindings

  Tab / Shift-Tab   next / previous screen
  j,k / arrows      move row cursor
  h,l / arrows      move column cursor
  n / p             next / previous page
  g / G             first / last row on page
  /                 search (Enter applies, Esc cancels)
  s / S             sort by column ascending / descending
  Space             select row
  a                 select / deselect visible page
  d                 delete selected records
  c / e             create / edit record (Ctrl-s submits)
  i / u             import csv / upload image
  y / Y             copy cell / row to clipboard
  r                 refresh from server
  ?                 this help
  q                 quit
";

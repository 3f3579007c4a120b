use std::time::Duration;

use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};
use tracing::trace;

use crate::api::ApiEvents;
use crate::domain::{Message, VdConfig, VdError};
use crate::model::{Model, Modus};

pub struct Controller {
    event_poll_time: u64,
    api_events: ApiEvents,
}

impl Controller {
    pub fn new(cfg: &VdConfig, api_events: ApiEvents) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
            api_events,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, VdError> {
        // Worker responses first so the screen refreshes without keyboard
        // activity.
        if let Some(api_event) = self.api_events.try_recv() {
            return Ok(Some(Message::Api(api_event)));
        }
        if event::poll(Duration::from_millis(self.event_poll_time))?
            && let Event::Key(key) = event::read()?
            && key.kind == event::KeyEventKind::Press
        {
            if model.raw_keyevents() {
                return Ok(Some(Message::RawKey(key)));
            }
            let message = map_key(key, model.modus());
            trace!("Mapped: {key:?} => {message:?}");
            return Ok(message);
        }
        Ok(None)
    }
}

fn map_key(key: event::KeyEvent, modus: Modus) -> Option<Message> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Message::Quit),
            KeyCode::Char('s') => Some(Message::SubmitForm),
            _ => None,
        };
    }
    // The confirm dialog is a plain yes/no prompt.
    if modus == Modus::Confirm {
        return match key.code {
            KeyCode::Char('y') | KeyCode::Enter => Some(Message::Enter),
            KeyCode::Char('n') | KeyCode::Esc | KeyCode::Char('q') => Some(Message::Exit),
            _ => None,
        };
    }
    match key.code {
        KeyCode::Char('q') => Some(Message::Quit),
        KeyCode::Up | KeyCode::Char('k') => Some(Message::MoveUp),
        KeyCode::Down | KeyCode::Char('j') => Some(Message::MoveDown),
        KeyCode::Left | KeyCode::Char('h') => Some(Message::MoveLeft),
        KeyCode::Right | KeyCode::Char('l') => Some(Message::MoveRight),
        KeyCode::Char('g') => Some(Message::MoveBeginning),
        KeyCode::Char('G') => Some(Message::MoveEnd),
        KeyCode::Char('n') => Some(Message::NextPage),
        KeyCode::Char('p') => Some(Message::PrevPage),
        KeyCode::Tab => Some(Message::NextResource),
        KeyCode::BackTab => Some(Message::PrevResource),
        KeyCode::Char('r') => Some(Message::Refresh),
        KeyCode::Char('/') => Some(Message::Search),
        KeyCode::Char('s') => Some(Message::SortAscending),
        KeyCode::Char('S') => Some(Message::SortDescending),
        KeyCode::Char(' ') => Some(Message::ToggleSelect),
        KeyCode::Char('a') => Some(Message::ToggleSelectPage),
        KeyCode::Char('d') => Some(Message::DeleteSelected),
        KeyCode::Char('c') => Some(Message::NewRecord),
        KeyCode::Char('e') => Some(Message::EditRecord),
        KeyCode::Char('i') => Some(Message::ImportCsv),
        KeyCode::Char('u') => Some(Message::UploadImage),
        KeyCode::Char('y') => Some(Message::CopyCell),
        KeyCode::Char('Y') => Some(Message::CopyRow),
        KeyCode::Char('?') => Some(Message::Help),
        KeyCode::Enter => Some(Message::Enter),
        KeyCode::Esc => Some(Message::Exit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn table_keys() {
        assert!(matches!(
            map_key(key(KeyCode::Char('/')), Modus::Table),
            Some(Message::Search)
        ));
        assert!(matches!(
            map_key(key(KeyCode::Char(' ')), Modus::Table),
            Some(Message::ToggleSelect)
        ));
        assert!(matches!(
            map_key(key(KeyCode::Char('d')), Modus::Table),
            Some(Message::DeleteSelected)
        ));
    }

    #[test]
    fn confirm_is_yes_no_only() {
        assert!(matches!(
            map_key(key(KeyCode::Char('y')), Modus::Confirm),
            Some(Message::Enter)
        ));
        assert!(matches!(
            map_key(key(KeyCode::Char('n')), Modus::Confirm),
            Some(Message::Exit)
        ));
        assert!(map_key(key(KeyCode::Char('d')), Modus::Confirm).is_none());
    }

    #[test]
    fn ctrl_s_submits() {
        let key = KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL);
        assert!(matches!(map_key(key, Modus::Form), Some(Message::SubmitForm)));
    }
}

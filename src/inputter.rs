//! Single line text editor used by the search box and by form fields.
//! Collects raw key events until Enter (finished) or Esc (canceled).

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Default)]
pub struct Inputter {
    buffer: String,
    cursor: usize, // position in chars, not bytes
    finished: bool,
    canceled: bool,
}

#[derive(Default, Clone, Debug)]
pub struct InputResult {
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    pub cursor: usize,
}

impl Inputter {
    /// Start a fresh edit, optionally prefilled (edit-form fields).
    pub fn start(&mut self, prefill: &str) {
        self.buffer = prefill.to_string();
        self.cursor = self.buffer.chars().count();
        self.finished = false;
        self.canceled = false;
    }

    pub fn read(&mut self, key: KeyEvent) -> InputResult {
        match (key.code, key.modifiers) {
            (KeyCode::Enter, KeyModifiers::NONE) => self.finished = true,
            (KeyCode::Esc, KeyModifiers::NONE) => {
                self.buffer.clear();
                self.cursor = 0;
                self.canceled = true;
                self.finished = true;
            }
            (KeyCode::Backspace, KeyModifiers::NONE) => self.backspace(),
            (KeyCode::Left, KeyModifiers::NONE) => self.cursor = self.cursor.saturating_sub(1),
            (KeyCode::Right, KeyModifiers::NONE) => {
                if self.cursor < self.buffer.chars().count() {
                    self.cursor += 1;
                }
            }
            (KeyCode::Home, KeyModifiers::NONE) => self.cursor = 0,
            (KeyCode::End, KeyModifiers::NONE) => self.cursor = self.buffer.chars().count(),
            (code, _) => {
                if let Some(chr) = code.as_char() {
                    let at = self.byte_pos();
                    self.buffer.insert(at, chr);
                    self.cursor += 1;
                }
            }
        }
        self.get()
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            input: self.buffer.clone(),
            finished: self.finished,
            canceled: self.canceled,
            cursor: self.cursor,
        }
    }

    fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_pos();
            self.buffer.remove(at);
        }
    }

    fn byte_pos(&self) -> usize {
        self.buffer
            .char_indices()
            .nth(self.cursor)
            .map(|(idx, _)| idx)
            .unwrap_or(self.buffer.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(inp: &mut Inputter, s: &str) {
        for c in s.chars() {
            inp.read(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn typing_and_enter() {
        let mut inp = Inputter::default();
        inp.start("");
        type_str(&mut inp, "flea");
        let r = inp.read(key(KeyCode::Enter));
        assert_eq!(r.input, "flea");
        assert!(r.finished);
        assert!(!r.canceled);
    }

    #[test]
    fn escape_cancels_and_clears() {
        let mut inp = Inputter::default();
        inp.start("old value");
        let r = inp.read(key(KeyCode::Esc));
        assert!(r.canceled);
        assert_eq!(r.input, "");
    }

    #[test]
    fn backspace_in_the_middle() {
        let mut inp = Inputter::default();
        inp.start("abc");
        inp.read(key(KeyCode::Left));
        let r = inp.read(key(KeyCode::Backspace));
        assert_eq!(r.input, "ac");
    }

    #[test]
    fn multibyte_input_keeps_cursor_in_chars() {
        let mut inp = Inputter::default();
        inp.start("");
        type_str(&mut inp, "héllo");
        inp.read(key(KeyCode::Home));
        inp.read(key(KeyCode::Right));
        let r = inp.read(key(KeyCode::Backspace));
        assert_eq!(r.input, "éllo");
    }
}

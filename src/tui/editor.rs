//! Multi-line text buffer behind the editor pane.
//!
//! Cursor positions are character indices, never byte offsets.

use crate::utils::unicode::{char_len, char_to_byte_index};

const PAIRS: [(char, char); 5] = [('(', ')'), ('[', ']'), ('{', '}'), ('"', '"'), ('\'', '\'')];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorBuffer {
    lines: Vec<String>,
    pub row: usize,
    pub col: usize,
    /// First visible line.
    pub scroll: usize,
    tab_size: usize,
}

impl Default for EditorBuffer {
    fn default() -> Self {
        Self::new(4)
    }
}

impl EditorBuffer {
    pub fn new(tab_size: usize) -> Self {
        Self { lines: vec![String::new()], row: 0, col: 0, scroll: 0, tab_size }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn set_text(&mut self, text: &str) {
        self.lines = text.split('\n').map(|l| l.trim_end_matches('\r').to_string()).collect();
        if self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.row = 0;
        self.col = 0;
        self.scroll = 0;
    }

    pub fn is_blank(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }

    fn current(&self) -> &String {
        &self.lines[self.row]
    }

    fn current_mut(&mut self) -> &mut String {
        &mut self.lines[self.row]
    }

    fn char_at(&self, col: usize) -> Option<char> {
        self.current().chars().nth(col)
    }

    fn insert_raw(&mut self, c: char) {
        let idx = char_to_byte_index(self.current(), self.col);
        self.current_mut().insert(idx, c);
        self.col += 1;
    }

    /// Types a character, auto-closing brackets and quotes.
    pub fn insert_char(&mut self, c: char) {
        if PAIRS.iter().any(|(_, close)| *close == c) && self.char_at(self.col) == Some(c) {
            self.col += 1;
            return;
        }
        if let Some((_, close)) = PAIRS.iter().find(|(open, _)| *open == c) {
            let next = self.char_at(self.col);
            if next.map_or(true, |n| n.is_whitespace() || ")]}".contains(n)) {
                self.insert_raw(c);
                let idx = char_to_byte_index(self.current(), self.col);
                let close = *close;
                self.current_mut().insert(idx, close);
                return;
            }
        }
        self.insert_raw(c);
    }

    /// Inserts text verbatim, as from a paste.
    pub fn insert_str(&mut self, text: &str) {
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        for (i, part) in normalized.split('\n').enumerate() {
            if i > 0 {
                self.split_line(String::new());
            }
            for c in part.chars() {
                self.insert_raw(c);
            }
        }
    }

    fn split_line(&mut self, indent: String) {
        let idx = char_to_byte_index(self.current(), self.col);
        let rest = self.current_mut().split_off(idx);
        self.row += 1;
        self.col = char_len(&indent);
        self.lines.insert(self.row, indent + &rest);
    }

    /// Breaks the line, keeping the current line's indentation.
    pub fn insert_newline(&mut self) {
        let indent: String = self.current().chars().take_while(|c| *c == ' ' || *c == '\t').collect();
        let indent_len = char_len(&indent);
        let indent = if self.col < indent_len { String::new() } else { indent };
        self.split_line(indent);
    }

    pub fn insert_tab(&mut self) {
        let spaces = self.tab_size - (self.col % self.tab_size);
        for _ in 0..spaces {
            self.insert_raw(' ');
        }
    }

    pub fn backspace(&mut self) {
        if self.col > 0 {
            let prev = self.char_at(self.col - 1);
            let next = self.char_at(self.col);
            let start = char_to_byte_index(self.current(), self.col - 1);
            self.current_mut().remove(start);
            self.col -= 1;
            // Typing "(" then backspace removes the auto-inserted ")".
            if let (Some(p), Some(n)) = (prev, next) {
                if PAIRS.contains(&(p, n)) {
                    let idx = char_to_byte_index(self.current(), self.col);
                    self.current_mut().remove(idx);
                }
            }
        } else if self.row > 0 {
            let line = self.lines.remove(self.row);
            self.row -= 1;
            self.col = char_len(self.current());
            self.current_mut().push_str(&line);
        }
    }

    pub fn delete(&mut self) {
        if self.col < char_len(self.current()) {
            let idx = char_to_byte_index(self.current(), self.col);
            self.current_mut().remove(idx);
        } else if self.row + 1 < self.lines.len() {
            let next = self.lines.remove(self.row + 1);
            self.current_mut().push_str(&next);
        }
    }

    pub fn move_left(&mut self) {
        if self.col > 0 {
            self.col -= 1;
        } else if self.row > 0 {
            self.row -= 1;
            self.col = char_len(self.current());
        }
    }

    pub fn move_right(&mut self) {
        if self.col < char_len(self.current()) {
            self.col += 1;
        } else if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = 0;
        }
    }

    pub fn move_up(&mut self) {
        if self.row > 0 {
            self.row -= 1;
            self.col = self.col.min(char_len(self.current()));
        }
    }

    pub fn move_down(&mut self) {
        if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = self.col.min(char_len(self.current()));
        }
    }

    pub fn move_home(&mut self) {
        self.col = 0;
    }

    pub fn move_end(&mut self) {
        self.col = char_len(self.current());
    }

    pub fn page_up(&mut self, height: usize) {
        self.row = self.row.saturating_sub(height.max(1));
        self.col = self.col.min(char_len(self.current()));
    }

    pub fn page_down(&mut self, height: usize) {
        self.row = (self.row + height.max(1)).min(self.lines.len() - 1);
        self.col = self.col.min(char_len(self.current()));
    }

    /// Adds or removes `prefix` at the start of the current line's content.
    pub fn toggle_comment(&mut self, prefix: &str) {
        let line = self.current().clone();
        let indent = line.len() - line.trim_start().len();
        let body = &line[indent..];
        let (new_line, delta): (String, isize) = if let Some(rest) = body.strip_prefix(prefix) {
            let rest_trimmed = rest.strip_prefix(' ').unwrap_or(rest);
            let removed = body.len() - rest_trimmed.len();
            (format!("{}{}", &line[..indent], rest_trimmed), -(removed as isize))
        } else {
            (format!("{}{} {}", &line[..indent], prefix, body), (prefix.len() + 1) as isize)
        };
        *self.current_mut() = new_line;
        let col = (self.col as isize + delta).max(0) as usize;
        self.col = col.min(char_len(self.current()));
    }

    /// Keeps the cursor row inside a viewport of `height` lines.
    pub fn scroll_into_view(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.row < self.scroll {
            self.scroll = self.row;
        } else if self.row >= self.scroll + height {
            self.scroll = self.row + 1 - height;
        }
    }
}

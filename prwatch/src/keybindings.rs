//! Keybinding dispatcher for prwatch.
//!
//! Translates raw crossterm `KeyEvent`s into a `KeyAction` for the event
//! loop. Keys never run a poll directly; `Refresh` asks the scheduler for one.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// What the event loop should do in response to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Nothing bound to this key.
    Continue,
    /// Request an out-of-cycle poll.
    Refresh,
    /// Print the active issues with their indices.
    ListIssues,
    /// Print details of the active issue at this zero-based index.
    ShowIssue(usize),
    Help,
    Quit,
}

/// One-line key reference printed by the help action.
pub const HELP: &str = "keys: r refresh  l list issues  1-9 issue details  ? help  q quit";

pub fn handle_key(key: KeyEvent) -> KeyAction {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('d') => KeyAction::Quit,
            KeyCode::Char('r') => KeyAction::Refresh,
            _ => KeyAction::Continue,
        };
    }

    match key.code {
        KeyCode::Char('r') | KeyCode::Char('R') | KeyCode::F(5) => KeyAction::Refresh,
        KeyCode::Char('l') | KeyCode::Char('L') => KeyAction::ListIssues,
        KeyCode::Char(c @ '1'..='9') => KeyAction::ShowIssue(c as usize - '1' as usize),
        KeyCode::Char('?') | KeyCode::Char('h') => KeyAction::Help,
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => KeyAction::Quit,
        _ => KeyAction::Continue,
    }
}

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;

use crate::app::Mode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Down,
    Up,
    NextPage,
    PrevPage,
    ToggleFull,
    Refresh,
    New,
    Edit,
    Delete,
    Confirm,
    Cancel,
    StartSearch,
    EndSearch,
    SearchChar(char),
    SearchBackspace,
    ClearSearch,
    FormChar(char),
    FormBackspace,
    FormNext,
    FormPrev,
    Submit,
    None,
}

pub fn poll_action(mode: &Mode) -> anyhow::Result<Action> {
    if !event::poll(Duration::from_millis(50))? {
        return Ok(Action::None);
    }

    match event::read()? {
        Event::Key(key) if key.kind != KeyEventKind::Release => Ok(map_key(mode, key)),
        _ => Ok(Action::None),
    }
}

pub fn map_key(mode: &Mode, KeyEvent { code, modifiers, .. }: KeyEvent) -> Action {
    match mode {
        Mode::Search => match (code, modifiers) {
            (KeyCode::Esc, _) => Action::ClearSearch,
            (KeyCode::Enter, _) => Action::EndSearch,
            (KeyCode::Backspace, _) => Action::SearchBackspace,
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => Action::ClearSearch,
            (KeyCode::Char(c), _) => Action::SearchChar(c),
            _ => Action::None,
        },

        Mode::Form(_) => match (code, modifiers) {
            (KeyCode::Esc, _) => Action::Cancel,
            (KeyCode::Enter, _) | (KeyCode::Char('s'), KeyModifiers::CONTROL) => Action::Submit,
            (KeyCode::Tab, _) | (KeyCode::Down, _) => Action::FormNext,
            (KeyCode::BackTab, _) | (KeyCode::Up, _) => Action::FormPrev,
            (KeyCode::Backspace, _) => Action::FormBackspace,
            (KeyCode::Char(c), _) => Action::FormChar(c),
            _ => Action::None,
        },

        Mode::ConfirmDelete(_) => match code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Action::Confirm,
            _ => Action::Cancel,
        },

        Mode::Browse => match (code, modifiers) {
            (KeyCode::Char('q'), _) => Action::Quit,
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Action::Quit,
            (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Action::Down,
            (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Action::Up,
            (KeyCode::Char('l'), _) | (KeyCode::Right, _) => Action::NextPage,
            (KeyCode::Char('h'), _) | (KeyCode::Left, _) => Action::PrevPage,
            (KeyCode::Enter, _) => Action::ToggleFull,
            (KeyCode::Char('r'), _) => Action::Refresh,
            (KeyCode::Char('n'), _) => Action::New,
            (KeyCode::Char('e'), _) => Action::Edit,
            (KeyCode::Char('d'), _) => Action::Delete,
            (KeyCode::Char('/'), _) => Action::StartSearch,
            _ => Action::None,
        },
    }
}

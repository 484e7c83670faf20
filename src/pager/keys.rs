//! Key routing for the pager.

#![allow(missing_docs)]

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::viewport::{Direction, ScrollIntent, Step};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    RefreshNow,
    Scroll(ScrollIntent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelpBinding {
    pub keys: &'static str,
    pub description: &'static str,
}

const BINDINGS: [HelpBinding; 13] = [
    HelpBinding { keys: "q, Ctrl-C", description: "quit" },
    HelpBinding { keys: "r, R", description: "refresh now" },
    HelpBinding { keys: "Left/Right", description: "scroll one column" },
    HelpBinding { keys: "Up, k, y", description: "scroll up one line" },
    HelpBinding { keys: "K, Y", description: "scroll up, past the start" },
    HelpBinding { keys: "Down, j, e", description: "scroll down one line" },
    HelpBinding { keys: "J, E", description: "scroll down, past the end" },
    HelpBinding { keys: "Space, f, PageDown", description: "page down" },
    HelpBinding { keys: "b, PageUp", description: "page up" },
    HelpBinding { keys: "d / u", description: "half page down / up" },
    HelpBinding { keys: "g, Home", description: "jump to start" },
    HelpBinding { keys: "G, End", description: "jump to end" },
    HelpBinding { keys: "F", description: "follow the end of the output" },
];

/// Key reference shown by `follow --help`.
#[must_use]
pub const fn bindings() -> &'static [HelpBinding] {
    &BINDINGS
}

/// Resolve one key event. Releases and unbound keys map to `None`.
#[must_use]
pub fn resolve_key_event(key: &KeyEvent) -> Option<KeyAction> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let action = match key.code {
        KeyCode::Char('c') if ctrl => KeyAction::Quit,
        _ if ctrl => return None,
        KeyCode::Char('q') => KeyAction::Quit,
        KeyCode::Char('r' | 'R') => KeyAction::RefreshNow,
        KeyCode::Left => horizontal(Direction::Backward),
        KeyCode::Right => horizontal(Direction::Forward),
        KeyCode::Up | KeyCode::Char('k' | 'y') => vertical(Step::Line, Direction::Backward, false),
        KeyCode::Char('K' | 'Y') => vertical(Step::Line, Direction::Backward, true),
        KeyCode::Down | KeyCode::Char('j' | 'e') => vertical(Step::Line, Direction::Forward, false),
        KeyCode::Char('J' | 'E') => vertical(Step::Line, Direction::Forward, true),
        KeyCode::PageDown | KeyCode::Char(' ' | 'f') => {
            vertical(Step::Page, Direction::Forward, false)
        }
        KeyCode::PageUp | KeyCode::Char('b') => vertical(Step::Page, Direction::Backward, false),
        KeyCode::Char('d') => vertical(Step::HalfPage, Direction::Forward, false),
        KeyCode::Char('u') => vertical(Step::HalfPage, Direction::Backward, false),
        KeyCode::Home | KeyCode::Char('g') => KeyAction::Scroll(ScrollIntent::Start),
        KeyCode::End | KeyCode::Char('G') => KeyAction::Scroll(ScrollIntent::End),
        KeyCode::Char('F') => KeyAction::Scroll(ScrollIntent::PinToEnd),
        _ => return None,
    };
    Some(action)
}

const fn vertical(step: Step, direction: Direction, past_end: bool) -> KeyAction {
    KeyAction::Scroll(ScrollIntent::Vertical {
        step,
        direction,
        past_end,
    })
}

const fn horizontal(direction: Direction) -> KeyAction {
    KeyAction::Scroll(ScrollIntent::Horizontal {
        step: Step::Line,
        direction,
        past_end: false,
    })
}

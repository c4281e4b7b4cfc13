//! Key routing: maps a key press and the current session context to exactly
//! one navigation [`Command`]. Routing is pure and never suspends.

use crate::mode::ModeKind;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ignore,
    Quit,
    MoveUp,
    MoveDown,
    Activate,
    Ascend,
    ToggleMark,
    EnterMarkedView,
    ExitToNormal,
    BeginSearch,
    SearchInput(char),
    SearchBackspace,
    CommitSearch,
    CancelSearch,
    ClearFilter,
    Refresh,
    OpenPathPrompt,
    OpenCopyPrompt,
    PromptInput(char),
    PromptBackspace,
    PromptSubmit,
    PromptCancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteContext {
    pub mode: ModeKind,
    pub prompt_open: bool,
    pub locked: bool,
}

pub fn route_key(key: KeyEvent, ctx: RouteContext) -> Command {
    if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
        return Command::Quit;
    }
    // Dropped, not queued: replaying stale intents after a long copy would be confusing.
    if ctx.locked {
        return Command::Ignore;
    }
    if ctx.prompt_open {
        return route_prompt_key(key);
    }

    match ctx.mode {
        ModeKind::Normal => route_normal_key(key),
        ModeKind::MarkedView => route_marked_key(key),
        ModeKind::Search => route_search_key(key),
    }
}

fn is_printable(key: &KeyEvent) -> Option<char> {
    match key.code {
        KeyCode::Char(c)
            if !key.modifiers.contains(KeyModifiers::CONTROL)
                && !key.modifiers.contains(KeyModifiers::ALT)
                && !key.modifiers.contains(KeyModifiers::SUPER) =>
        {
            Some(c)
        }
        _ => None,
    }
}

fn route_prompt_key(key: KeyEvent) -> Command {
    if let Some(c) = is_printable(&key) {
        return Command::PromptInput(c);
    }
    match key.code {
        KeyCode::Backspace => Command::PromptBackspace,
        KeyCode::Enter => Command::PromptSubmit,
        KeyCode::Esc => Command::PromptCancel,
        _ => Command::Ignore,
    }
}

fn route_search_key(key: KeyEvent) -> Command {
    if let Some(c) = is_printable(&key) {
        return Command::SearchInput(c);
    }
    match key.code {
        KeyCode::Backspace => Command::SearchBackspace,
        KeyCode::Enter => Command::CommitSearch,
        KeyCode::Esc => Command::CancelSearch,
        KeyCode::Down => Command::MoveDown,
        KeyCode::Up => Command::MoveUp,
        KeyCode::Left => Command::Ascend,
        _ => Command::Ignore,
    }
}

fn route_normal_key(key: KeyEvent) -> Command {
    match key.code {
        KeyCode::Char('q') => Command::Quit,
        KeyCode::Char('j') | KeyCode::Down => Command::MoveDown,
        KeyCode::Char('k') | KeyCode::Up => Command::MoveUp,
        KeyCode::Char('l') | KeyCode::Right | KeyCode::Enter => Command::Activate,
        KeyCode::Char('h') | KeyCode::Left | KeyCode::Backspace => Command::Ascend,
        KeyCode::Char(' ') | KeyCode::Char('m') => Command::ToggleMark,
        KeyCode::Char('v') => Command::EnterMarkedView,
        KeyCode::Char('/') => Command::BeginSearch,
        KeyCode::Esc => Command::ClearFilter,
        KeyCode::Char('r') => Command::Refresh,
        KeyCode::Char('g') => Command::OpenPathPrompt,
        KeyCode::Char('c') => Command::OpenCopyPrompt,
        _ => Command::Ignore,
    }
}

fn route_marked_key(key: KeyEvent) -> Command {
    match key.code {
        KeyCode::Char('q') => Command::Quit,
        KeyCode::Char('j') | KeyCode::Down => Command::MoveDown,
        KeyCode::Char('k') | KeyCode::Up => Command::MoveUp,
        KeyCode::Char('l') | KeyCode::Right | KeyCode::Enter => Command::Activate,
        KeyCode::Char('h') | KeyCode::Left | KeyCode::Backspace => Command::Ascend,
        KeyCode::Char('v') | KeyCode::Esc => Command::ExitToNormal,
        KeyCode::Char('/') => Command::BeginSearch,
        KeyCode::Char('r') => Command::Refresh,
        KeyCode::Char('c') => Command::OpenCopyPrompt,
        _ => Command::Ignore,
    }
}

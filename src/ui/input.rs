//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use crate::app::{App, AppState, Focus, Tab, PAGE_SCROLL_SIZE};

/// Maximum length for the search query.
const MAX_SEARCH_LENGTH: usize = 50;

/// Handle keyboard input. Returns true if the app should quit.
pub fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // Handle help overlay
    if matches!(app.state, AppState::ShowingHelp) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.state = AppState::Normal;
        }
        return Ok(false);
    }

    // Handle search mode
    if matches!(app.state, AppState::Searching) {
        return handle_search_input(app, key);
    }

    match key.code {
        KeyCode::Char('q') => {
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Char('?') => app.state = AppState::ShowingHelp,
        KeyCode::Char('/') => {
            app.state = AppState::Searching;
        }

        // Tabs
        KeyCode::Char('1') => app.current_tab = Tab::Dashboard,
        KeyCode::Char('2') => app.current_tab = Tab::Contributors,
        KeyCode::Char('3') => app.current_tab = Tab::Members,
        KeyCode::Tab => app.current_tab = app.current_tab.next(),
        KeyCode::BackTab => app.current_tab = app.current_tab.prev(),

        // Fund switching
        KeyCode::Char('f') => app.cycle_fund(),

        // Refresh
        KeyCode::Char('u') => app.refresh_current(),
        KeyCode::Char('R') => app.hard_reload(),

        // Focus switching
        KeyCode::Left | KeyCode::Char('h') => app.focus = Focus::List,
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Enter => app.focus = Focus::Detail,

        // List navigation
        KeyCode::Up | KeyCode::Char('k') => move_selection(app, -1),
        KeyCode::Down | KeyCode::Char('j') => move_selection(app, 1),
        KeyCode::PageUp => move_selection(app, -(PAGE_SCROLL_SIZE as isize)),
        KeyCode::PageDown => move_selection(app, PAGE_SCROLL_SIZE as isize),

        KeyCode::Esc => {
            if !app.search_query.is_empty() {
                app.search_query.clear();
                reset_selections(app);
            }
        }
        _ => {}
    }

    Ok(false)
}

fn handle_search_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            app.search_query.clear();
            app.state = AppState::Normal;
            reset_selections(app);
        }
        KeyCode::Enter => {
            app.state = AppState::Normal;
        }
        KeyCode::Backspace => {
            app.search_query.pop();
            reset_selections(app);
        }
        KeyCode::Char(c) => {
            if app.search_query.len() < MAX_SEARCH_LENGTH {
                app.search_query.push(c);
                reset_selections(app);
            }
        }
        _ => {}
    }
    Ok(false)
}

/// Reset selections when the filter changes so they stay in range.
fn reset_selections(app: &mut App) {
    app.timeline_selection = 0;
    app.member_selection = 0;
}

/// Length of the list the current tab and focus navigate.
fn active_list_len(app: &App) -> usize {
    match (app.current_tab, app.focus) {
        (Tab::Dashboard, _) => 0,
        (Tab::Contributors, Focus::List) => app.leaderboard().len(),
        (Tab::Contributors, Focus::Detail) => app.filtered_contributions().len(),
        (Tab::Members, _) => app.members().len(),
    }
}

fn move_selection(app: &mut App, delta: isize) {
    let len = active_list_len(app);
    if len == 0 {
        return;
    }

    let selection = match (app.current_tab, app.focus) {
        (Tab::Dashboard, _) => return,
        (Tab::Contributors, Focus::List) => &mut app.contributor_selection,
        (Tab::Contributors, Focus::Detail) => &mut app.timeline_selection,
        (Tab::Members, _) => &mut app.member_selection,
    };

    let current = *selection as isize;
    *selection = (current + delta).clamp(0, len as isize - 1) as usize;
}

use crate::artifacts::DownloadOutcome;
use crate::catalog::CategoryFilter;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Screen {
    Home,
    Tool,
}

/// Shell state: which tool is open, the home filters, and the last
/// alert or download the host should surface.
#[derive(Debug, Default)]
pub struct AppState {
    pub nav_stack: Vec<Screen>,
    pub current_tool_id: Option<String>,
    pub search_query: String,
    pub active_category: CategoryFilter,
    pub last_alert: Option<String>,
    pub last_download: Option<DownloadOutcome>,
}

impl AppState {
    pub fn new() -> Self {
        let mut state = Self::default();
        state.ensure_navigation();
        state
    }

    pub fn ensure_navigation(&mut self) {
        if self.nav_stack.is_empty() {
            self.nav_stack.push(Screen::Home);
        }
    }

    pub fn current_screen(&self) -> Screen {
        self.nav_stack.last().cloned().unwrap_or(Screen::Home)
    }

    pub fn nav_depth(&self) -> usize {
        self.nav_stack.len().max(1)
    }

    pub fn push_screen(&mut self, screen: Screen) {
        self.ensure_navigation();
        self.nav_stack.push(screen);
    }

    pub fn pop_screen(&mut self) {
        self.ensure_navigation();
        if self.nav_stack.len() > 1 {
            self.nav_stack.pop();
        }
    }

    pub fn reset_navigation(&mut self) {
        self.nav_stack.clear();
        self.nav_stack.push(Screen::Home);
    }

    /// Opening a tool from another tool replaces it rather than stacking.
    pub fn open_tool(&mut self, tool_id: &str) {
        if self.current_screen() != Screen::Tool {
            self.push_screen(Screen::Tool);
        }
        self.current_tool_id = Some(tool_id.to_string());
    }

    pub fn close_tool(&mut self) {
        self.current_tool_id = None;
        self.reset_navigation();
    }

    /// Searching always brings the user back to the home grid.
    pub fn set_search(&mut self, query: &str) {
        self.search_query = query.to_string();
        self.close_tool();
    }

    pub fn set_category(&mut self, filter: CategoryFilter) {
        self.active_category = filter;
        self.close_tool();
    }

    pub fn clear_notices(&mut self) {
        self.last_alert = None;
        self.last_download = None;
    }

    /// Logo click: everything back to the initial home screen.
    pub fn reset(&mut self) {
        self.close_tool();
        self.search_query.clear();
        self.active_category = CategoryFilter::All;
        self.clear_notices();
    }
}

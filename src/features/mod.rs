pub mod chat;
pub mod misc_panels;
pub mod pdf;
pub mod pdf_engine;
pub mod progress;
pub mod video;

use crate::catalog::{Catalog, CategoryFilter, ToolCategory};
use crate::state::AppState;
use crate::ui::{node, Button as UiButton, Column as UiColumn, Grid as UiGrid, Section as UiSection, Text as UiText, TextInput};
use serde_json::Value;

/// Render the home screen: search box, category chips, then the tools that
/// pass the current filter grouped by category.
pub fn render_menu(state: &AppState, catalog: &Catalog) -> Value {
    let mut children = vec![
        node(UiText::new("MultiTool Box").size(22.0)),
        node(UiText::new("Every everyday utility in one place.").size(14.0)),
        node(
            TextInput::new("search")
                .text(&state.search_query)
                .hint("Search tools...")
                .single_line(true)
                .debounce_ms(150)
                .action_on_submit("search"),
        ),
    ];

    let mut chips = vec![node(
        UiButton::new("All", "select_category")
            .id("All")
            .selected(state.active_category == CategoryFilter::All),
    )];
    for category in ToolCategory::ALL {
        chips.push(node(
            UiButton::new(category.label(), "select_category")
                .id(category.label())
                .selected(state.active_category == CategoryFilter::Only(category)),
        ));
    }
    children.push(node(UiGrid::new(chips).columns(4).content_description("categories")));

    let visible = catalog.filter(&state.search_query, state.active_category);
    if visible.is_empty() {
        children.push(node(UiText::new("No tools match your search.").content_description("empty_results")));
    }

    for (category, tools) in Catalog::group_by_category(&visible) {
        let cards: Vec<Value> = tools
            .iter()
            .map(|tool| {
                let label = format!("{} {}", tool.icon, tool.name);
                node(
                    UiButton::new(&label, "open_tool")
                        .id(&tool.id)
                        .content_description(&tool.description),
                )
            })
            .collect();
        let subtitle = format!("{} tools", tools.len());
        children.push(node(
            UiSection::new(vec![node(UiGrid::new(cards).columns(2).padding(4))])
                .title(category.label())
                .subtitle(&subtitle),
        ));
    }

    node(UiColumn::new(children).padding(20))
}

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::app::{App, Focus};
use crate::stats;
use crate::ui::styles;
use crate::utils::{format_inr, truncate_string};

/// Render the Members tab: directory on the left, the selected member's
/// giving summary on the right.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    render_directory(frame, app, chunks[0]);
    render_member_detail(frame, app, chunks[1]);
}

fn render_directory(frame: &mut Frame, app: &App, area: Rect) {
    let members = app.members();
    let focused = matches!(app.focus, Focus::List);

    let title = if app.search_query.is_empty() {
        format!(" Members ({}) ", members.len())
    } else {
        format!(" Members ({}) - \"{}\" ", members.len(), app.search_query)
    };

    let block = Block::default()
        .title(title)
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));

    if members.is_empty() {
        let paragraph = Paragraph::new(Line::from(Span::styled(
            "No members yet",
            styles::muted_style(),
        )))
        .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = members
        .iter()
        .map(|name| ListItem::new(Line::from(Span::raw(name.clone()))))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(styles::selected_style())
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(Some(app.member_selection));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_member_detail(frame: &mut Frame, app: &App, area: Rect) {
    let focused = matches!(app.focus, Focus::Detail);
    let block = Block::default()
        .title(" Member Detail ")
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));

    let Some(name) = app.selected_member() else {
        let paragraph = Paragraph::new(Line::from(Span::styled(
            "Select a member to see their contributions",
            styles::muted_style(),
        )))
        .block(block);
        frame.render_widget(paragraph, area);
        return;
    };

    let records = stats::contributions_for_member(&app.contributions, &name);
    let total: f64 = records.iter().map(|c| c.amount).sum();
    let categories = stats::category_totals(records.iter().copied());

    let mut lines = vec![
        Line::from(Span::styled(name.clone(), styles::title_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("Total given:   ", styles::muted_style()),
            Span::styled(format_inr(total), styles::highlight_style()),
        ]),
        Line::from(vec![
            Span::styled("Entries:       ", styles::muted_style()),
            Span::raw(format!("{}", records.len())),
        ]),
        Line::from(vec![
            Span::styled("Categories:    ", styles::muted_style()),
            Span::raw(format!("{}", categories.len())),
        ]),
        Line::from(""),
        Line::from(Span::styled("By category", styles::highlight_style())),
    ];

    for (category, amount) in &categories {
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<16}", category), styles::list_item_style()),
            Span::styled(format_inr(*amount), styles::highlight_style()),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Contributions",
        styles::highlight_style(),
    )));

    for record in &records {
        let mut spans = vec![
            Span::styled(format!("  {:<13}", record.formatted_date()), styles::muted_style()),
            Span::styled(format!("{:>10}", format_inr(record.amount)), styles::highlight_style()),
            Span::styled(
                format!("  {}", record.category_display()),
                styles::muted_style(),
            ),
        ];
        if !record.notes.is_empty() {
            spans.push(Span::styled(
                format!("  {}", truncate_string(&record.notes, 28)),
                styles::muted_style(),
            ));
        }
        lines.push(Line::from(spans));
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

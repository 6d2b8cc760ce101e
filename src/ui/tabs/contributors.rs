use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::{App, Focus};
use crate::ui::styles;
use crate::utils::{format_inr, truncate_string};

/// Render the Contributors tab: leaderboard on the left, contribution
/// timeline on the right.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    render_leaderboard(frame, app, chunks[0]);
    render_timeline(frame, app, chunks[1]);
}

fn rank_label(rank: usize) -> Span<'static> {
    // Top three get the accent treatment the page gives its medals
    let text = format!("{:>3}", format!("#{}", rank));
    if rank <= 3 {
        Span::styled(text, styles::highlight_style())
    } else {
        Span::styled(text, styles::muted_style())
    }
}

fn render_leaderboard(frame: &mut Frame, app: &App, area: Rect) {
    let leaderboard = app.leaderboard();
    let focused = matches!(app.focus, Focus::List);

    let header = Row::new([
        Cell::from("Rank"),
        Cell::from("Member"),
        Cell::from("Total"),
        Cell::from("Entries"),
    ])
    .style(styles::title_style())
    .height(1);

    let rows: Vec<Row> = leaderboard
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let style = if i == app.contributor_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            Row::new([
                Cell::from(Line::from(rank_label(i + 1))),
                Cell::from(row.member.clone()),
                Cell::from(format_inr(row.total)),
                Cell::from(format!("{:>3}", row.entries)),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(5),
        Constraint::Fill(3),
        Constraint::Length(12),
        Constraint::Length(8),
    ];

    let title = format!(" All Contributors ({}) ", leaderboard.len());
    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(focused)),
        )
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    state.select(Some(app.contributor_selection));
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_timeline(frame: &mut Frame, app: &App, area: Rect) {
    let records = app.filtered_contributions();
    let focused = matches!(app.focus, Focus::Detail);

    let title = if app.search_query.is_empty() {
        format!(" Timeline ({}) ", records.len())
    } else {
        format!(" Timeline ({}) - \"{}\" ", records.len(), app.search_query)
    };

    let items: Vec<ListItem> = records
        .iter()
        .map(|record| {
            let mut spans = vec![
                Span::styled(format!("{:<13}", record.formatted_date()), styles::muted_style()),
                Span::styled(format!("{:>10}", format_inr(record.amount)), styles::highlight_style()),
                Span::raw("  "),
                Span::styled(record.member_display().to_string(), styles::list_item_style()),
                Span::styled(
                    format!("  {}", record.category_display()),
                    styles::muted_style(),
                ),
            ];
            if !record.notes.is_empty() {
                spans.push(Span::styled(
                    format!("  {}", truncate_string(&record.notes, 24)),
                    styles::muted_style(),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    if items.is_empty() {
        let message = if app.search_query.is_empty() {
            "No contributions yet"
        } else {
            "No contributions match the search"
        };
        let paragraph = Paragraph::new(Line::from(Span::styled(message, styles::muted_style())))
            .block(
                Block::default()
                    .title(title)
                    .title_style(styles::muted_style())
                    .borders(Borders::ALL)
                    .border_style(styles::border_style(focused)),
            );
        frame.render_widget(paragraph, area);
        return;
    }

    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(focused)),
        )
        .highlight_style(styles::selected_style());

    let mut state = ListState::default();
    state.select(Some(app.timeline_selection));
    frame.render_stateful_widget(list, area, &mut state);
}

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Sparkline},
    Frame,
};

use crate::app::App;
use crate::stats::{self, GivingPace};
use crate::ui::styles;
use crate::utils::{format_inr, format_month};

/// Render the Dashboard tab: stat cards, goal progress, pace, insights,
/// and the monthly trend.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    if app.contributions.is_empty() {
        render_empty_state(frame, app, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Stat cards
            Constraint::Length(4), // Progress gauge + milestones
            Constraint::Length(5), // Insight cards
            Constraint::Min(4),    // Monthly trend
        ])
        .split(area);

    render_stat_cards(frame, app, chunks[0]);
    render_progress(frame, app, chunks[1]);
    render_insights(frame, app, chunks[2]);
    render_trend(frame, app, chunks[3]);
}

fn render_empty_state(frame: &mut Frame, app: &App, area: Rect) {
    let label = &app.current_fund_spec().label;
    let lines = vec![
        Line::from(""),
        Line::from(""),
        Line::from(Span::styled(
            "No contributions yet",
            styles::title_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!("Be the first to contribute to our {}!", label),
            styles::muted_style(),
        )),
    ];
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).border_style(styles::muted_style()));
    frame.render_widget(paragraph, area);
}

fn stat_card(frame: &mut Frame, area: Rect, title: &str, value: String, sub: String) {
    let lines = vec![
        Line::from(Span::styled(value, styles::title_style())),
        Line::from(Span::styled(sub, styles::muted_style())),
    ];
    let block = Block::default()
        .title(format!(" {} ", title))
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_stat_cards(frame: &mut Frame, app: &App, area: Rect) {
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ])
        .split(area);

    let stats = &app.stats;

    stat_card(
        frame,
        cards[0],
        "Goal",
        format_inr(app.goal_amount),
        app.current_fund_spec().label.clone(),
    );
    stat_card(
        frame,
        cards[1],
        "Collected",
        format_inr(stats.total_collected),
        format!("{}% of goal achieved", stats.progress_percent.round()),
    );
    if stats.goal_reached() {
        stat_card(
            frame,
            cards[2],
            "Remaining",
            "Goal achieved!".to_string(),
            "Thank you for your faithful giving".to_string(),
        );
    } else {
        stat_card(
            frame,
            cards[2],
            "Remaining",
            format_inr(stats.remaining),
            "Keep giving, we're getting closer!".to_string(),
        );
    }
    stat_card(
        frame,
        cards[3],
        "Entries",
        format!("{}", stats.entry_count),
        format!(
            "Avg {} · {} givers",
            format_inr(stats.average_contribution),
            stats.unique_contributors
        ),
    );
}

fn render_progress(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(1)])
        .split(area);

    let percent = app.stats.progress_percent;
    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(" Progress ")
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(false)),
        )
        .gauge_style(styles::progress_style(percent))
        .ratio((percent / 100.0).clamp(0.0, 1.0))
        .label(format!("{}%", percent.round()));
    frame.render_widget(gauge, chunks[0]);

    // Milestone badges under the gauge
    let mut spans = vec![Span::raw(" ")];
    for milestone in [25.0, 50.0, 75.0, 100.0] {
        let achieved = percent >= milestone;
        let text = if achieved {
            format!("✓ {}%  ", milestone as u32)
        } else {
            format!("{}%  ", milestone as u32)
        };
        let style = if achieved {
            styles::success_style()
        } else {
            styles::muted_style()
        };
        spans.push(Span::styled(text, style));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), chunks[1]);
}

fn render_insights(frame: &mut Frame, app: &App, area: Rect) {
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ])
        .split(area);

    let stats = &app.stats;
    let series = stats::monthly_series(&app.contributions);

    stat_card(
        frame,
        cards[0],
        "Contributors",
        format!("{}", stats.unique_contributors),
        format!("{} avg per person", format_inr(stats.average_per_person)),
    );
    stat_card(
        frame,
        cards[1],
        "Largest Gift",
        format_inr(stats.largest_contribution),
        format!("of {} entries", stats.entry_count),
    );

    match stats::best_month(&series) {
        Some(best) => stat_card(
            frame,
            cards[2],
            "Best Month",
            format_month(&best.month),
            format!("{} collected", format_inr(best.total)),
        ),
        None => stat_card(
            frame,
            cards[2],
            "Best Month",
            "N/A".to_string(),
            String::new(),
        ),
    }

    match stats::giving_pace(&app.contributions, app.goal_amount) {
        Some(GivingPace::GoalReached) => stat_card(
            frame,
            cards[3],
            "Pace",
            "Goal reached!".to_string(),
            "Praise the Lord!".to_string(),
        ),
        Some(GivingPace::Projected {
            average_per_month,
            months_to_goal,
        }) => stat_card(
            frame,
            cards[3],
            "Pace",
            format!("~{} months to goal", months_to_goal),
            format!("{}/month", format_inr(average_per_month)),
        ),
        None => stat_card(
            frame,
            cards[3],
            "Pace",
            "N/A".to_string(),
            "No dated history yet".to_string(),
        ),
    }
}

fn render_trend(frame: &mut Frame, app: &App, area: Rect) {
    let series = stats::monthly_series(&app.contributions);

    let block = Block::default()
        .title(" Monthly Trend ")
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    if series.is_empty() {
        let paragraph = Paragraph::new(Line::from(Span::styled(
            "No dated contributions to chart",
            styles::muted_style(),
        )))
        .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(block.inner(area));
    frame.render_widget(block, area);

    let values: Vec<u64> = series.iter().map(|m| m.total.max(0.0) as u64).collect();
    let sparkline = Sparkline::default()
        .data(&values)
        .style(styles::progress_style(app.stats.progress_percent));
    frame.render_widget(sparkline, chunks[0]);

    // Most recent months, newest first, as far as the space allows
    let visible = chunks[1].height as usize;
    let lines: Vec<Line> = series
        .iter()
        .rev()
        .take(visible)
        .map(|m| {
            Line::from(vec![
                Span::styled(format!("{:<10}", format_month(&m.month)), styles::list_item_style()),
                Span::styled(format!("{:>12}", format_inr(m.total)), styles::highlight_style()),
                Span::styled(
                    format!("  {} entries · {} contributors to date", m.entries, m.contributors_to_date),
                    styles::muted_style(),
                ),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), chunks[1]);
}

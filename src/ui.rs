use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, FormState, Mode};
use crate::store::NoticeLevel;
use crate::validate::Field;

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1), Constraint::Length(1)])
        .split(f.area());

    // Top bar
    let top = match &app.mode {
        Mode::Search => format!("Search: {}", app.snapshot.search_query),
        _ if !app.snapshot.search_query.is_empty() => format!(
            "articlebox  [search: {}]  /:edit search  Esc in search clears",
            app.snapshot.search_query
        ),
        _ => "articlebox  j/k:move  h/l:page  Enter:read  n:new  e:edit  d:delete  /:search  r:refresh  q:quit"
            .to_string(),
    };
    f.render_widget(Paragraph::new(top), chunks[0]);

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[1]);

    draw_list(f, app, panes[0]);
    draw_preview(f, app, panes[1]);

    // Bottom status
    let style = match app.status_level {
        Some(NoticeLevel::Success) => Style::default().fg(Color::Green),
        Some(NoticeLevel::Error) => Style::default().fg(Color::Red),
        None => Style::default(),
    };
    f.render_widget(Paragraph::new(app.status.clone()).style(style), chunks[2]);

    match &app.mode {
        Mode::Form(form) => draw_form(f, form),
        Mode::ConfirmDelete(_) => draw_confirm(f),
        _ => {}
    }
}

fn draw_list(f: &mut Frame, app: &App, area: Rect) {
    let view = app.page_view();
    let title = format!("Articles  page {} of {}", view.page, view.total_pages);
    let block = Block::default().borders(Borders::ALL).title(title);

    if app.snapshot.loading {
        f.render_widget(Paragraph::new("Loading articles…").block(block), area);
        return;
    }
    if let Some(err) = &app.snapshot.error {
        let msg = Paragraph::new(format!("{err}\n\nPress r to retry."))
            .style(Style::default().fg(Color::Red))
            .block(block);
        f.render_widget(msg, area);
        return;
    }

    let items: Vec<ListItem> = view.items.iter().enumerate().map(|(pos, a)| {
        let prefix = if pos == app.selected { "▶ " } else { "  " };
        let status = format!("[{}]", a.status);
        let line = Line::from(vec![
            Span::raw(prefix),
            Span::styled(format!("{status:<12}"), Style::default().add_modifier(Modifier::DIM)),
            Span::raw(a.title.clone()),
        ]);
        ListItem::new(line)
    }).collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD));
    f.render_widget(list, area);
}

fn draw_preview(f: &mut Frame, app: &App, area: Rect) {
    let body = if let Some(a) = app.selected_article() {
        let mut text = Text::default();
        text.lines.push(Line::from(a.title.clone()).style(Style::default().add_modifier(Modifier::BOLD)));
        text.lines.push(Line::from(format!("By {}    {}    Published: {}", a.author, a.category, a.date_line())));
        text.lines.push(Line::from(format!("Status: {}    Id: {}", a.status, a.id)));
        text.lines.push(Line::from(""));
        let content = if app.show_full { a.content.clone() } else { truncate(&a.content, 150) };
        text.lines.extend(Text::from(content).lines);
        text
    } else if app.snapshot.articles.is_empty() {
        Text::from("No articles loaded. Press r to refresh or n to write one.")
    } else {
        Text::from("No articles match the search.")
    };

    let preview = Paragraph::new(body)
        .block(Block::default().borders(Borders::ALL).title("Article"))
        .wrap(Wrap { trim: false });
    f.render_widget(preview, area);
}

fn draw_form(f: &mut Frame, form: &FormState) {
    let area = centered(f.area(), 80, 80);
    f.render_widget(Clear, area);

    let title = if form.editing.is_some() { "Edit Article" } else { "Create New Article" };
    let mut text = Text::default();
    for field in Field::ALL {
        let marker = if field == form.focus { "▶ " } else { "  " };
        let label_style = if field == form.focus {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        text.lines.push(Line::from(vec![
            Span::styled(format!("{marker}{}: ", field.label()), label_style),
            Span::raw(form.draft.field(field).to_string()),
            Span::styled(hint(field), Style::default().add_modifier(Modifier::DIM)),
        ]));
        if let Some(msg) = form.errors.get(field) {
            text.lines.push(Line::from(Span::styled(format!("    {msg}"), Style::default().fg(Color::Red))));
        }
    }
    text.lines.push(Line::from(""));
    let footer = if form.submitting { "Saving..." } else { "Tab/↑↓: field  Enter: save article  Esc: cancel" };
    text.lines.push(Line::from(footer));

    let widget = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });
    f.render_widget(widget, area);
}

fn draw_confirm(f: &mut Frame) {
    let area = centered(f.area(), 50, 20);
    f.render_widget(Clear, area);
    let widget = Paragraph::new("Are you sure you want to delete this article? (y/N)")
        .block(Block::default().borders(Borders::ALL).title("Delete"))
        .wrap(Wrap { trim: true });
    f.render_widget(widget, area);
}

fn hint(field: Field) -> &'static str {
    match field {
        Field::PublishDate => "  (YYYY-MM-DDTHH:MM)",
        Field::Status => "  (draft | published)",
        Field::Category => "  (mining | crypto)",
        _ => "",
    }
}

fn centered(area: Rect, pct_x: u16, pct_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - pct_y) / 2),
            Constraint::Percentage(pct_y),
            Constraint::Percentage((100 - pct_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - pct_x) / 2),
            Constraint::Percentage(pct_x),
            Constraint::Percentage((100 - pct_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

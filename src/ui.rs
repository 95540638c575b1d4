//! Terminal front end: the event loop and the render function.

use crate::app::{AddForm, App, FormField, Mode};
use crate::stats::Stats;
use crate::task::{Priority, Task};
use crate::theme::Palette;
use crate::view::FilterMode;
use chrono::Local;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Tabs},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;

const TICK: Duration = Duration::from_secs(1);

pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| render(f, app))?;

        // redraw at least once per tick so the clock moves
        if !event::poll(TICK)? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                app.handle_key(key);
            }
        }
        if app.should_quit {
            return Ok(());
        }
    }
}

/// Draw the whole screen from the current application state.
pub fn render(f: &mut Frame, app: &App) {
    let palette = app.theme.palette();
    let base = Style::default().fg(palette.fg).bg(palette.bg);
    f.render_widget(Block::default().style(base), f.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    render_header(f, chunks[0], app, &palette);
    render_progress(f, chunks[1], &app.store.stats(), &palette);
    render_filters(f, chunks[2], app, &palette);
    render_tasks(f, chunks[3], app, &palette);
    render_footer(f, chunks[4], app, &palette);

    match &app.mode {
        Mode::Adding(form) => render_add_form(f, form, &palette),
        Mode::Editing { buffer, .. } => render_prompt(f, "Edit task", buffer, &palette),
        Mode::Importing { path } => render_prompt(f, "Import from file", path, &palette),
        Mode::ConfirmClear => render_prompt(
            f,
            "Clear all",
            &format!("{} (y/N)", crate::store::CLEAR_PROMPT),
            &palette,
        ),
        Mode::Normal | Mode::Searching => {}
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let now = Local::now();
    let title = Line::from(vec![
        Span::styled(
            "NeoTasks",
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::raw(now.format("%H:%M").to_string()),
        Span::styled(format!(" {}", now.format("%p")), Style::default().fg(palette.muted)),
        Span::styled(
            format!("   theme: {}", app.theme.as_str()),
            Style::default().fg(palette.muted),
        ),
    ]);
    f.render_widget(
        Paragraph::new(title).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

fn render_progress(f: &mut Frame, area: Rect, stats: &Stats, palette: &Palette) {
    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(stats.detail_label())
                .borders(Borders::ALL),
        )
        .gauge_style(Style::default().fg(palette.accent))
        .percent(stats.percent())
        .label(format!("{} ({}%)", stats.progress_label(), stats.percent()));
    f.render_widget(gauge, area);
}

fn render_filters(f: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let selected = FilterMode::ALL
        .iter()
        .position(|m| *m == app.view.filter)
        .unwrap_or(0);
    let search = if app.mode == Mode::Searching {
        format!(" search: {}_ ", app.view.query)
    } else if app.view.query.is_empty() {
        " / to search ".to_string()
    } else {
        format!(" search: {} ", app.view.query)
    };
    let tabs = Tabs::new(FilterMode::ALL.iter().map(|m| m.as_str()))
        .select(selected)
        .highlight_style(
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )
        .block(
            Block::default()
                .title(search)
                .borders(Borders::ALL)
                .border_style(if app.mode == Mode::Searching {
                    Style::default().fg(palette.accent)
                } else {
                    Style::default()
                }),
        );
    f.render_widget(tabs, area);
}

fn priority_color(priority: Priority, palette: &Palette) -> Color {
    match priority {
        Priority::High => palette.high,
        Priority::Medium => palette.medium,
        Priority::Low => palette.low,
    }
}

fn task_line<'a>(task: &'a Task, palette: &Palette) -> Line<'a> {
    let mut text_style = Style::default();
    if task.completed {
        text_style = text_style
            .fg(palette.muted)
            .add_modifier(Modifier::CROSSED_OUT);
    }
    let mut spans = vec![
        Span::raw(if task.completed { "[x] " } else { "[ ] " }),
        Span::styled(task.text.as_str(), text_style),
        Span::raw("  "),
        Span::styled(
            task.priority.as_str().to_uppercase(),
            Style::default()
                .fg(priority_color(task.priority, palette))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" #{}", task.tag), Style::default().fg(palette.accent)),
    ];
    if let Some(due) = task.due_date {
        spans.push(Span::styled(
            format!(" (Due: {})", due.format("%d/%m/%Y")),
            Style::default().fg(palette.muted),
        ));
    }
    Line::from(spans)
}

fn render_tasks(f: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let visible = app.visible();
    let block = Block::default()
        .title(format!(" Tasks ({}) ", visible.len()))
        .borders(Borders::ALL);

    if visible.is_empty() {
        let hint = if app.store.is_empty() {
            "Nothing to do. Press 'a' to add a task."
        } else {
            "No task matches."
        };
        f.render_widget(
            Paragraph::new(Span::styled(hint, Style::default().fg(palette.muted))).block(block),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = visible
        .iter()
        .map(|t| ListItem::new(task_line(t, palette)))
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED));
    let mut state = ListState::default();
    state.select(Some(app.selected));
    f.render_stateful_widget(list, area, &mut state);
}

fn render_footer(f: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let line = match &app.status {
        Some(status) if status.is_error => Line::from(Span::styled(
            status.message.as_str(),
            Style::default().fg(palette.high),
        )),
        Some(status) => Line::from(status.message.as_str()),
        None => Line::from(Span::styled(
            "a add  / search  f filter  space toggle  e edit  d delete  m all done  c clear  x export  i import  t theme  q quit",
            Style::default().fg(palette.muted),
        )),
    };
    f.render_widget(Paragraph::new(line), area);
}

fn render_add_form(f: &mut Frame, form: &AddForm, palette: &Palette) {
    let area = centered_rect(60, 8, f.area());
    let field = |label: &'static str, value: String, which: FormField| {
        let style = if form.field == which {
            Style::default().fg(palette.accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let cursor = if form.field == which { "_" } else { "" };
        Line::from(vec![
            Span::styled(format!("{label:>9}: "), style),
            Span::raw(format!("{value}{cursor}")),
        ])
    };
    let lines = vec![
        field("Task", form.text.clone(), FormField::Text),
        field(
            "Priority",
            format!("< {} >", form.priority.as_str().to_uppercase()),
            FormField::Priority,
        ),
        field("Tag", form.tag.clone(), FormField::Tag),
        field("Due", form.due.clone(), FormField::Due),
        Line::from(Span::styled(
            "tab next field  enter add  esc cancel",
            Style::default().fg(palette.muted),
        )),
    ];
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .title(" New task ")
                .borders(Borders::ALL)
                .style(Style::default().fg(palette.fg).bg(palette.bg)),
        ),
        area,
    );
}

fn render_prompt(f: &mut Frame, title: &str, value: &str, palette: &Palette) {
    let area = centered_rect(60, 3, f.area());
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(format!("{value}_")).block(
            Block::default()
                .title(format!(" {title} "))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.accent))
                .style(Style::default().fg(palette.fg).bg(palette.bg)),
        ),
        area,
    );
}

fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let width = u16::try_from(u32::from(area.width) * u32::from(percent_x) / 100)
        .unwrap_or(area.width)
        .min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::store::TaskStore;
    use crate::task::NewTask;
    use ratatui::backend::TestBackend;
    use std::path::PathBuf;

    fn screen(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content
            .chunks(width)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn centered_rect_fits_very_wide_terminals() {
        let area = Rect {
            x: 0,
            y: 0,
            width: 4000,
            height: 50,
        };
        let rect = centered_rect(60, 8, area);
        assert_eq!(rect.width, 2400);
        assert_eq!(rect.x, 800);
        assert_eq!(rect.height, 8);
    }

    #[test]
    fn empty_list_renders_hint_and_zero_progress() {
        let store = TaskStore::open(Box::new(MemoryStore::new()));
        let app = App::new(store, FilterMode::All, PathBuf::from("."));
        let text = screen(&app);
        assert!(text.contains("Nothing to do"));
        assert!(text.contains("0/0 items"));
    }

    #[test]
    fn tasks_render_high_priority_first() {
        let mut store = TaskStore::open(Box::new(MemoryStore::new()));
        store
            .add(NewTask::new("sweep floor").priority(Priority::Low))
            .unwrap();
        store
            .add(NewTask::new("pay rent").priority(Priority::High).tag("bills"))
            .unwrap();
        let app = App::new(store, FilterMode::All, PathBuf::from("."));
        let text = screen(&app);
        let rent = text.find("pay rent").unwrap();
        let floor = text.find("sweep floor").unwrap();
        assert!(rent < floor);
        assert!(text.contains("#bills"));
        assert!(text.contains("HIGH"));
    }

    #[test]
    fn add_form_popup_is_drawn() {
        let store = TaskStore::open(Box::new(MemoryStore::new()));
        let mut app = App::new(store, FilterMode::All, PathBuf::from("."));
        app.mode = Mode::Adding(AddForm::default());
        assert!(screen(&app).contains("New task"));
    }
}

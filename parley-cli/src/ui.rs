use crate::app::App;
use crate::client::PromptKind;
use crate::controllers::console::CONSOLE_WELCOME;
use crate::controllers::status::Connection;
use crate::controllers::system_prompt::PromptEditor;
use crate::controllers::tabs::Tab;
use crate::controllers::tokens::{Level, TokenMeter};
use crate::controllers::work::{self, Dialog};
use crate::controllers::{Entry, Pane, Tone};
use crate::input::TextInput;
use crate::keymap::{Action, Scope};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame,
};

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(1),    // Active surface
            Constraint::Length(1), // Status line
        ])
        .split(f.area());

    render_tabs(f, app, chunks[0]);

    let body = if app.console.is_visible() {
        let split = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
            .split(chunks[1]);
        render_console(f, app, split[1]);
        split[0]
    } else {
        chunks[1]
    };

    match app.tabs.active() {
        Tab::Chat => render_chat(f, app, body),
        Tab::Summarize => render_summarize(f, app, body),
        Tab::Parse => render_parse(f, app, body),
        Tab::Work => render_work(f, app, body),
        Tab::Settings => render_settings(f, app, body),
    }

    render_status(f, app, chunks[2]);

    if let Some(dialog) = app.work.dialog() {
        render_dialog(f, dialog, f.area());
    }
}

fn render_tabs(f: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = Tab::ALL
        .iter()
        .enumerate()
        .map(|(i, tab)| Line::from(format!("F{} {}", i + 1, tab.title())))
        .collect();

    let tabs = Tabs::new(titles)
        .select(app.tabs.active().index())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Parley · {} ", app.status.model_name())),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(tabs, area);
}

fn tone_style(tone: Tone) -> Style {
    match tone {
        Tone::Plain => Style::default(),
        Tone::Welcome => Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
        Tone::User => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        Tone::Assistant => Style::default().fg(Color::Green),
        Tone::Pending => Style::default().fg(Color::Yellow),
        Tone::Meta => Style::default().fg(Color::DarkGray),
        Tone::Error => Style::default().fg(Color::Red),
    }
}

fn entry_lines(entries: &[Entry]) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    for entry in entries {
        let style = tone_style(entry.tone);
        for line in entry.text.split('\n') {
            lines.push(Line::from(Span::styled(line, style)));
        }
        lines.push(Line::from(""));
    }
    lines
}

/// Lines visible in a window of `height` rows, `scroll` lines up from the
/// bottom.
fn visible_window<T: Clone>(lines: &[T], height: usize, scroll: usize) -> Vec<T> {
    let total = lines.len();
    let start = if total > height {
        let max_scroll = total.saturating_sub(height);
        let actual_scroll = scroll.min(max_scroll);
        total.saturating_sub(height).saturating_sub(actual_scroll)
    } else {
        0
    };
    let end = (start + height).min(total);
    lines[start..end].to_vec()
}

fn render_pane(f: &mut Frame, pane: &Pane, area: Rect, title: String) {
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    let lines = entry_lines(pane.entries());
    let visible = visible_window(&lines, inner.height as usize, pane.scroll());

    let paragraph = Paragraph::new(visible)
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn render_input(
    f: &mut Frame,
    input: &TextInput,
    area: Rect,
    title: &str,
    placeholder: &str,
    focused: bool,
) {
    let (text, style) = if input.value().is_empty() {
        (placeholder, Style::default().fg(Color::DarkGray))
    } else {
        (input.value(), Style::default())
    };
    let border = if focused {
        Style::default().fg(Color::White)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let paragraph = Paragraph::new(text).style(style).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title.to_string())
            .border_style(border),
    );
    f.render_widget(paragraph, area);

    if focused && area.width > 2 && area.height > 2 {
        let (line, column) = input.cursor_position();
        let offset = |n: usize| u16::try_from(n).unwrap_or(u16::MAX);
        let x = area.x.saturating_add(1).saturating_add(offset(column));
        let y = area.y.saturating_add(1).saturating_add(offset(line));
        f.set_cursor_position((
            x.min(area.right().saturating_sub(2)),
            y.min(area.bottom().saturating_sub(2)),
        ));
    }
}

/// Height for an input box that grows with its content.
fn input_height(input: &TextInput, max: u16) -> u16 {
    let lines = u16::try_from(input.value().split('\n').count()).unwrap_or(u16::MAX);
    lines.saturating_add(2).clamp(3, max)
}

fn render_tokens(f: &mut Frame, meter: &TokenMeter, area: Rect) {
    let color = match meter.level() {
        Level::Normal => Color::Blue,
        Level::Warning => Color::Yellow,
        Level::Critical => Color::Red,
    };
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(color).bg(Color::Black))
        .percent(meter.percent().unwrap_or(0.0).round() as u16)
        .label(meter.label());
    f.render_widget(gauge, area);
}

fn render_chat(f: &mut Frame, app: &App, area: Rect) {
    let chat = &app.chat;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(input_height(&chat.input, 8)),
        ])
        .split(area);

    let title = if chat.timer().is_running() {
        format!(" Chat · {} ", chat.timer().display())
    } else {
        " Chat ".to_string()
    };
    render_pane(f, chat.pane(), chunks[0], title);
    render_tokens(f, chat.tokens(), chunks[1]);

    let input_title = if chat.is_streaming() {
        "Message (Esc to stop)"
    } else {
        "Message (Enter to send, Alt-Enter for newline)"
    };
    render_input(
        f,
        &chat.input,
        chunks[2],
        input_title,
        "Type your message...",
        !chat.is_streaming(),
    );
}

fn render_summarize(f: &mut Frame, app: &App, area: Rect) {
    let summarize = &app.summarize;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Length(1),
            Constraint::Min(3),
        ])
        .split(area);

    render_input(
        f,
        &summarize.input,
        chunks[0],
        "Text to summarize (Enter to send, Ctrl-L to clear)",
        "Paste or type the text to summarize...",
        !summarize.is_streaming(),
    );
    render_tokens(f, summarize.tokens(), chunks[1]);

    let timer = summarize.timer();
    let title = if timer.is_running() || timer.elapsed_secs() > 0.0 {
        format!(" Summary · {} ", timer.display())
    } else {
        " Summary ".to_string()
    };
    render_pane(f, summarize.pane(), chunks[2], title);
}

fn render_parse(f: &mut Frame, app: &App, area: Rect) {
    let parse = &app.parse;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(input_height(&parse.input, 10)),
        ])
        .split(area);

    render_pane(f, parse.pane(), chunks[0], " Parse ".to_string());
    render_input(
        f,
        &parse.input,
        chunks[1],
        "Text to parse",
        "Paste your text to parse...",
        !parse.is_streaming(),
    );
}

fn render_work(f: &mut Frame, app: &App, area: Rect) {
    let work = &app.work;
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(32), Constraint::Percentage(68)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(columns[0]);

    let projects: Vec<ListItem> = if work.projects().is_empty() {
        vec![ListItem::new(Span::styled(
            "No projects yet",
            tone_style(Tone::Welcome),
        ))]
    } else {
        work.projects()
            .iter()
            .map(|p| match &p.company {
                Some(company) => ListItem::new(format!("{} ({})", p.name, company)),
                None => ListItem::new(p.name.clone()),
            })
            .collect()
    };
    let mut state = ListState::default().with_selected(work.selected_index());
    let list = List::new(projects)
        .block(Block::default().borders(Borders::ALL).title(" Projects "))
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .highlight_symbol("▶ ");
    f.render_stateful_widget(list, left[0], &mut state);

    let now = work::local_now();
    let deliverables: Vec<ListItem> = if work.deliverables().is_empty() {
        vec![ListItem::new(Span::styled(
            "No upcoming deliverables",
            tone_style(Tone::Welcome),
        ))]
    } else {
        work.deliverables()
            .iter()
            .map(|d| {
                ListItem::new(vec![
                    Line::from(Span::styled(d.title.clone(), tone_style(Tone::User))),
                    Line::from(format!(
                        "{} · {}",
                        d.project_name.as_deref().unwrap_or("-"),
                        work::due_label(d, now)
                    )),
                ])
            })
            .collect()
    };
    f.render_widget(
        List::new(deliverables).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Due in {} days ", work::UPCOMING_DAYS)),
        ),
        left[1],
    );

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(columns[1]);

    let output = work.output();
    let paragraph = Paragraph::new(entry_lines(&output))
        .block(Block::default().borders(Borders::ALL).title(" Work Assistant "))
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, right[0]);

    if let Some(flash) = work.flash() {
        let tone = if flash.is_error {
            Tone::Error
        } else {
            Tone::Assistant
        };
        f.render_widget(
            Paragraph::new(Span::styled(flash.text.as_str(), tone_style(tone))),
            right[1],
        );
    }

    render_input(
        f,
        &work.query,
        right[2],
        "Ask about your projects",
        "What is due this week?",
        !work.has_dialog(),
    );
}

fn render_settings(f: &mut Frame, app: &App, area: Rect) {
    let halves = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    render_editor(
        f,
        &app.chat_prompt,
        halves[0],
        app.settings_focus == PromptKind::Chat,
    );
    render_editor(
        f,
        &app.summarize_prompt,
        halves[1],
        app.settings_focus == PromptKind::Summarize,
    );
}

fn render_editor(f: &mut Frame, editor: &PromptEditor, area: Rect, focused: bool) {
    let state = if editor.is_loaded() {
        editor.state().label()
    } else {
        "Loading..."
    };
    let title = format!(
        "{} [{}] (Ctrl-S to save, Tab to switch)",
        editor.kind().label(),
        state
    );
    render_input(f, &editor.input, area, &title, "", focused);
}

fn render_console(f: &mut Frame, app: &App, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();
    if app.console.entries().is_empty() {
        lines.push(Line::from(Span::styled(
            CONSOLE_WELCOME,
            tone_style(Tone::Welcome),
        )));
    }
    for entry in app.console.entries() {
        lines.push(Line::from(Span::styled(
            format!("[{}]", entry.time),
            tone_style(Tone::Meta),
        )));
        for line in entry.prompt.split('\n') {
            lines.push(Line::from(line));
        }
        lines.push(Line::from(""));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Prompts (Ctrl-P hide, Ctrl-K clear) ");
    let inner = block.inner(area);
    let visible = visible_window(&lines, inner.height as usize, app.console.scroll());
    f.render_widget(
        Paragraph::new(visible)
            .block(block)
            .wrap(Wrap { trim: false }),
        area,
    );
}

fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let connection = app.status.connection();
    let color = match connection {
        Connection::Connected => Color::Green,
        Connection::Checking | Connection::ModelMissing => Color::Yellow,
        Connection::Disconnected | Connection::Error => Color::Red,
    };

    let mut spans = vec![Span::styled(
        format!("● {}", connection.label()),
        Style::default().fg(color),
    )];
    if let Some(at) = app.status.checked_at() {
        spans.push(Span::styled(
            format!("  checked {}", at.format("%H:%M:%S")),
            tone_style(Tone::Meta),
        ));
    }
    spans.push(Span::styled(
        format!("  {}", app.server()),
        tone_style(Tone::Meta),
    ));
    spans.push(Span::raw("  "));
    spans.push(Span::styled(hints(app), tone_style(Tone::Meta)));

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn hints(app: &App) -> String {
    let tab = app.tabs.active();
    let local = Scope::Tab(tab);
    let wanted: Vec<(Scope, Action, &str)> = match tab {
        Tab::Chat | Tab::Summarize | Tab::Parse => vec![
            (Scope::Global, Action::Submit, "send"),
            (Scope::Global, Action::Stop, "stop"),
            (Scope::Global, Action::Clear, "clear"),
            (Scope::Global, Action::ToggleConsole, "prompts"),
            (Scope::Global, Action::Quit, "quit"),
        ],
        Tab::Work => vec![
            (local, Action::AddProject, "project"),
            (local, Action::ProcessEmail, "email"),
            (local, Action::AddStatus, "status"),
            (local, Action::AddDeliverable, "deliverable"),
            (Scope::Global, Action::Quit, "quit"),
        ],
        Tab::Settings => vec![
            (local, Action::SavePrompt, "save"),
            (local, Action::FocusNext, "switch"),
            (Scope::Global, Action::Quit, "quit"),
        ],
    };

    wanted
        .iter()
        .filter_map(|(scope, action, what)| {
            app.keymap()
                .key_for(*scope, *action)
                .map(|binding| format!("{} {}", binding.describe(), what))
        })
        .collect::<Vec<_>>()
        .join(" · ")
}

fn centered(area: Rect, width_percent: u16, height: u16) -> Rect {
    let width = (u32::from(area.width) * u32::from(width_percent) / 100) as u16;
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn render_dialog(f: &mut Frame, dialog: &Dialog, area: Rect) {
    let view = dialog.view();
    let heights: Vec<u16> = view
        .fields
        .iter()
        .map(|(spec, input, _)| {
            if spec.multiline {
                input_height(input, 8).max(5)
            } else {
                3
            }
        })
        .collect();
    let total: u16 = heights.iter().sum::<u16>() + 2 + 2;

    let popup = centered(area, 70, total);
    f.render_widget(Clear, popup);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", view.title))
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(popup);
    f.render_widget(block, popup);

    let mut constraints: Vec<Constraint> = heights.iter().map(|h| Constraint::Length(*h)).collect();
    constraints.push(Constraint::Length(1));
    constraints.push(Constraint::Min(0));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    for (i, (spec, input, focused)) in view.fields.iter().enumerate() {
        let label = if spec.required {
            format!("{} *", spec.label)
        } else {
            spec.label.to_string()
        };
        render_input(f, input, rows[i], &label, "", *focused);
    }

    let footer = match view.error {
        Some(message) => Span::styled(message, tone_style(Tone::Error)),
        None => Span::styled(
            "Enter to submit · Tab next field · Esc to cancel",
            tone_style(Tone::Meta),
        ),
    };
    f.render_widget(Paragraph::new(footer), rows[view.fields.len()]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};

    #[test]
    fn window_follows_the_bottom() {
        let lines: Vec<u32> = (0..10).collect();
        assert_eq!(visible_window(&lines, 3, 0), vec![7, 8, 9]);
        assert_eq!(visible_window(&lines, 3, 2), vec![5, 6, 7]);
        assert_eq!(visible_window(&lines, 3, 100), vec![0, 1, 2]);
        assert_eq!(visible_window(&lines, 20, 5), lines);
    }

    #[test]
    fn entries_are_separated_by_blank_lines() {
        let entries = vec![
            Entry {
                tone: Tone::User,
                text: "You: hi".into(),
            },
            Entry {
                tone: Tone::Assistant,
                text: "one\ntwo".into(),
            },
        ];
        assert_eq!(entry_lines(&entries).len(), 5);
    }

    #[test]
    fn input_grows_with_content() {
        let mut input = TextInput::new();
        assert_eq!(input_height(&input, 8), 3);
        input.set("a\nb\nc");
        assert_eq!(input_height(&input, 8), 5);
        input.set("\n".repeat(20));
        assert_eq!(input_height(&input, 8), 8);
    }

    #[test]
    fn huge_inputs_keep_the_cursor_inside_the_box() {
        let mut input = TextInput::new();
        input.set("\n".repeat(70_000));
        assert_eq!(input_height(&input, 8), 8);

        input.set("a".repeat(70_000));
        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        let area = Rect::new(0, 20, 80, 4);
        terminal
            .draw(|f| render_input(f, &input, area, "Message", "", true))
            .unwrap();
        let cursor = terminal.get_cursor_position().unwrap();
        assert_eq!((cursor.x, cursor.y), (78, 21));
    }
}

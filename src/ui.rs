use crate::app::{App, RenderInstruction};
use crate::domain::{Entry, PreviewKind, PreviewResult};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::{Color, Line, Modifier, Span, Style};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};

/// Everything the screen shows. Fed only through [`RenderInstruction`]s.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Surface {
    entries: Vec<Entry>,
    selected: Option<usize>,
    preview: Option<PreviewResult>,
    error: Option<String>,
}

impl Surface {
    pub fn apply(&mut self, instruction: RenderInstruction) {
        match instruction {
            RenderInstruction::ReplaceListing(entries) => {
                if entries.is_empty() {
                    self.selected = None;
                } else if let Some(selected) = self.selected {
                    self.selected = Some(selected.min(entries.len() - 1));
                }
                self.entries = entries;
            }
            RenderInstruction::SetSelection(index) => {
                if index < self.entries.len() {
                    self.selected = Some(index);
                }
            }
            RenderInstruction::RenderPreview(preview) => self.preview = Some(preview),
            RenderInstruction::ClearPreview => self.preview = None,
            RenderInstruction::ShowError(message) => self.error = Some(message),
        }
    }

    pub fn apply_all(&mut self, instructions: impl IntoIterator<Item = RenderInstruction>) {
        for instruction in instructions {
            self.apply(instruction);
        }
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

pub fn draw(frame: &mut Frame, surface: &Surface, app: &App) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(frame.area());

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(outer[0]);

    draw_list(frame, surface, app, main[0]);
    draw_preview(frame, surface, main[1]);
    draw_status_bar(frame, surface, app, outer[1]);
    draw_prompt(frame, app);
}

fn draw_list(frame: &mut Frame, surface: &Surface, app: &App, area: Rect) {
    let items: Vec<ListItem> = surface
        .entries
        .iter()
        .map(|entry| {
            let style = if entry.marked {
                Style::default().fg(Color::Yellow)
            } else if entry.is_directory() {
                Style::default().fg(Color::Blue)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(Span::styled(entry.to_string(), style)))
        })
        .collect();

    let title = if app.current_path().is_empty() {
        " (loading) ".to_string()
    } else {
        format!(" {} ", app.current_path())
    };

    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::LightGreen)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");

    let mut state = ListState::default();
    state.select(surface.selected);

    frame.render_stateful_widget(list, area, &mut state);
}

fn preview_lines(preview: Option<&PreviewResult>) -> Vec<Line<'_>> {
    match preview {
        None => vec![Line::from(Span::styled(
            "Nothing to preview.",
            Style::default().fg(Color::DarkGray),
        ))],
        Some(PreviewResult::DirectoryMarker) => vec![Line::from(Span::styled(
            "Directory. Press Enter to open it.",
            Style::default().fg(Color::Blue),
        ))],
        Some(PreviewResult::FileContent {
            kind: PreviewKind::Image,
            payload,
        }) => vec![Line::from(Span::styled(
            format!(
                "[image preview: {} KiB base64, not decoded]",
                payload.len().div_ceil(1024)
            ),
            Style::default().fg(Color::Magenta),
        ))],
        Some(PreviewResult::FileContent {
            kind: PreviewKind::Text,
            payload,
        }) => payload.lines().map(Line::from).collect(),
    }
}

fn draw_preview(frame: &mut Frame, surface: &Surface, area: Rect) {
    let paragraph = Paragraph::new(preview_lines(surface.preview.as_ref()))
        .block(Block::default().title(" Preview ").borders(Borders::ALL))
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, area);
}

fn draw_status_bar(frame: &mut Frame, surface: &Surface, app: &App, area: Rect) {
    let mode = app.mode().kind();
    let mut spans = vec![
        Span::styled(
            format!(" {} ", mode.label()),
            Style::default().bg(Color::Blue).fg(Color::White),
        ),
        Span::raw(" "),
    ];

    if app.is_locked() {
        spans.push(Span::styled(
            " LOCKED ",
            Style::default().bg(Color::Red).fg(Color::White),
        ));
        spans.push(Span::raw(" "));
    } else if app.busy() {
        spans.push(Span::styled(
            " BUSY ",
            Style::default().bg(Color::Yellow).fg(Color::Black),
        ));
        spans.push(Span::raw(" "));
    }

    if !app.requested_filter().is_empty() {
        spans.push(Span::styled(
            format!("filter: /{}/ ", app.requested_filter()),
            Style::default().fg(Color::Cyan),
        ));
    }

    match surface.error() {
        Some(message) => spans.push(Span::styled(
            message.to_string(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        None => spans.push(Span::styled(
            footer_help(mode),
            Style::default().fg(Color::Gray),
        )),
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn footer_help(mode: crate::mode::ModeKind) -> &'static str {
    use crate::mode::ModeKind;
    match mode {
        ModeKind::Normal => {
            "j/k move  l open  h up  space mark  v marked  / search  g goto  c copy  q quit"
        }
        ModeKind::MarkedView => "j/k move  l preview  h/v back  c copy  q quit",
        ModeKind::Search => "type regex  enter keep  esc cancel",
    }
}

fn draw_prompt(frame: &mut Frame, app: &App) {
    let Some(prompt) = app.prompt.as_ref() else {
        return;
    };
    let area = centered_rect(60, 20, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(format!("{}_", prompt.value)),
        Line::from(""),
        Line::from(Span::styled(
            "Enter: confirm  Esc: cancel",
            Style::default().fg(Color::Gray),
        )),
    ];
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(format!(" {} ", prompt.kind.title()))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

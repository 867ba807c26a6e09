//! Terminal card showing the current step

use std::cell::RefCell;
use std::rc::Rc;

use ratatui::{
    layout::{Alignment, Constraint, Direction as LayoutDirection, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::centered_rect;
use crate::services::{Direction, Presenter};
use crate::step::{ButtonRole, Element, StepContent};

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

#[derive(Debug, Default)]
struct CardState {
    content: Option<StepContent>,
    busy: bool,
    transition: Option<Direction>,
    spinner: usize,
    status: Option<String>,
}

/// What the terminal shows, shared between the presenter and the draw loop.
///
/// The flow owns the [`CardPresenter`]; the app keeps the `Card` to draw it
/// and to read the latest content when mapping keys to step events.
#[derive(Debug, Clone, Default)]
pub struct Card {
    state: Rc<RefCell<CardState>>,
}

impl Card {
    pub fn new() -> Self {
        Self::default()
    }

    /// Presenter writing into this card
    pub fn presenter(&self) -> CardPresenter {
        CardPresenter {
            state: Rc::clone(&self.state),
        }
    }

    pub fn content(&self) -> Option<StepContent> {
        self.state.borrow().content.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.state.borrow().busy
    }

    pub fn last_transition(&self) -> Option<Direction> {
        self.state.borrow().transition
    }

    /// One-line message under the buttons, e.g. a rejected action
    pub fn set_status(&self, message: impl Into<String>) {
        self.state.borrow_mut().status = Some(message.into());
    }

    pub fn clear_status(&self) {
        self.state.borrow_mut().status = None;
    }

    /// Advance the spinner by one frame while busy
    pub fn tick(&self) {
        let mut state = self.state.borrow_mut();
        if state.busy {
            state.spinner = (state.spinner + 1) % SPINNER.len();
        }
    }

    pub fn render(&self, frame: &mut Frame) {
        let state = self.state.borrow();
        let area = centered_rect(60, 60, frame.area());
        frame.render_widget(Clear, area);

        let title = state
            .content
            .as_ref()
            .map_or("pageflow", |content| content.title.as_str());
        let mut title_spans = vec![
            Span::raw(" "),
            Span::styled(
                title.to_string(),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
        ];
        if state.busy {
            title_spans.push(Span::styled(
                format!("{} saving ", SPINNER[state.spinner]),
                Style::default().fg(Color::Yellow),
            ));
        }

        let block = Block::default()
            .title(Line::from(title_spans))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        let inner = block.inner(area);
        frame.render_widget(block, area);

        let chunks = Layout::default()
            .direction(LayoutDirection::Vertical)
            .margin(1)
            .constraints([
                Constraint::Min(3),    // Body
                Constraint::Length(1), // Buttons
                Constraint::Length(1), // Status
                Constraint::Length(1), // Hint
            ])
            .split(inner);

        let Some(content) = &state.content else {
            let waiting = Paragraph::new("Waiting for the first step...")
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(waiting, chunks[0]);
            return;
        };

        let body = Paragraph::new(body_lines(content)).wrap(Wrap { trim: false });
        frame.render_widget(body, chunks[0]);

        let buttons = Paragraph::new(button_line(content)).alignment(Alignment::Center);
        frame.render_widget(buttons, chunks[1]);

        if let Some(status) = &state.status {
            let status = Paragraph::new(Line::from(Span::styled(
                status.as_str(),
                Style::default().fg(Color::Yellow),
            )))
            .alignment(Alignment::Center);
            frame.render_widget(status, chunks[2]);
        }

        let hint = Paragraph::new(hint_line(content, state.transition)).alignment(Alignment::Center);
        frame.render_widget(hint, chunks[3]);
    }
}

fn body_lines(content: &StepContent) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for element in &content.elements {
        match element {
            Element::Text { text } => {
                lines.push(Line::from(text.clone()));
                lines.push(Line::from(""));
            }
            Element::Choice {
                index,
                label,
                selected,
            } => {
                let (marker, style) = if *selected {
                    (
                        "(●)",
                        Style::default()
                            .fg(Color::Green)
                            .add_modifier(Modifier::BOLD),
                    )
                } else {
                    ("( )", Style::default().fg(Color::White))
                };
                lines.push(Line::from(vec![
                    Span::styled(format!("  [{}] ", index + 1), Style::default().fg(Color::Gray)),
                    Span::styled(format!("{} {}", marker, label), style),
                ]));
            }
            Element::Error { message } => {
                lines.push(Line::from(Span::styled(
                    message.clone(),
                    Style::default().fg(Color::Red),
                )));
            }
            Element::Button { .. } => {}
        }
    }
    lines
}

fn button_line(content: &StepContent) -> Line<'static> {
    let mut spans = Vec::new();
    for element in &content.elements {
        let Element::Button {
            label,
            role,
            enabled,
            ..
        } = element
        else {
            continue;
        };

        let style = match (*role, *enabled) {
            (ButtonRole::Primary, true) => Style::default()
                .fg(Color::Black)
                .bg(Color::Green)
                .add_modifier(Modifier::BOLD),
            (ButtonRole::Alternative, true) => Style::default().fg(Color::Red),
            (_, false) => Style::default().fg(Color::DarkGray),
        };
        let key = match *role {
            ButtonRole::Primary => "Enter",
            ButtonRole::Alternative => "Esc",
        };
        spans.push(Span::raw("   "));
        spans.push(Span::styled(format!(" {} [{}] ", label, key), style));
    }
    Line::from(spans)
}

fn hint_line(content: &StepContent, transition: Option<Direction>) -> Line<'static> {
    let arrow = match transition {
        Some(Direction::Forward) => "→ ",
        Some(Direction::Backward) => "← ",
        None => "",
    };
    let mut hint = match content.choice_count() {
        0 => format!("{}Esc back", arrow),
        count => format!("{}1-{} select · Esc back", arrow, count),
    };
    if content.dismissable {
        hint.push_str(" · d dismiss");
    }
    hint.push_str(" · q quit");
    Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray)))
}

/// [`Presenter`] that updates a [`Card`]
pub struct CardPresenter {
    state: Rc<RefCell<CardState>>,
}

impl Presenter for CardPresenter {
    fn render(&mut self, content: &StepContent) {
        self.state.borrow_mut().content = Some(content.clone());
    }

    fn show_activity_indicator(&mut self) {
        let mut state = self.state.borrow_mut();
        state.busy = true;
        state.spinner = 0;
    }

    fn hide_activity_indicator(&mut self) {
        self.state.borrow_mut().busy = false;
    }

    fn animate_transition(&mut self, direction: Direction) {
        self.state.borrow_mut().transition = Some(direction);
    }
}

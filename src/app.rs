use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;

use pageflow::config::Config;
use pageflow::onboarding::Onboarding;
use pageflow::services::TracingFeedback;
use pageflow::step::ButtonRole;
use pageflow::ui::{Card, TerminalGuard};
use pageflow::{FlowController, FlowError, FlowHandle, FlowState, StepEvent, TokioExecutor};

pub struct App {
    config: Config,
    card: Card,
    flow: FlowHandle,
    onboarding: Onboarding,
    should_quit: bool,
    /// Set once the completion page has been reached
    favorite: Option<String>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let card = Card::new();
        let onboarding = Onboarding::new(&config.flow, Arc::new(TracingFeedback));

        let controller = FlowController::new(
            Box::new(card.presenter()),
            Arc::new(TokioExecutor::current()),
        );
        let flow = FlowHandle::new(controller);
        flow.start(onboarding.first_step()?)?;

        if let Some(previous) = &config.preferences.favorite {
            card.set_status(format!("Current favorite: {}", previous));
        }

        Ok(Self {
            config,
            card,
            flow,
            onboarding,
            should_quit: false,
            favorite: None,
        })
    }

    /// Run until the flow is dismissed or the user quits. Returns the
    /// favorite when the flow was completed.
    pub fn run(&mut self) -> Result<Option<String>> {
        let _guard = TerminalGuard::new()?;
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;

        let tick_rate = self.config.tick_rate();

        while !self.should_quit {
            terminal.draw(|f| self.card.render(f))?;

            if event::poll(tick_rate)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }

            // Deliver finished saves
            if let Err(err) = self.flow.pump() {
                self.report(&err);
            }
            self.card.tick();
            self.sync_flow_state();
        }

        Ok(self.favorite.clone())
    }

    fn handle_key(&mut self, key: KeyCode) {
        self.card.clear_status();

        let result = match key {
            KeyCode::Char('q') => {
                tracing::info!("quit requested");
                self.should_quit = true;
                Ok(())
            }
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                self.flow.dispatch(StepEvent::Select(index))
            }
            KeyCode::Enter => match self.card.content().and_then(|c| c.action(ButtonRole::Primary)) {
                Some(event) => self.flow.dispatch(event),
                None => {
                    self.card.set_status("Nothing to confirm yet");
                    Ok(())
                }
            },
            // Through the step, so the completion page can ignore it
            KeyCode::Esc | KeyCode::Backspace => self.flow.dispatch(StepEvent::Back),
            KeyCode::Char('d') => self.flow.dismiss(),
            _ => Ok(()),
        };

        if let Err(err) = result {
            self.report(&err);
        }
    }

    fn report(&self, err: &FlowError) {
        tracing::warn!(error = %err, "flow rejected action");
        self.card.set_status(err.to_string());
    }

    fn sync_flow_state(&mut self) {
        let onboarding = &self.onboarding;
        let Ok((state, favorite)) = self.flow.inspect(|flow| {
            (
                flow.state(),
                onboarding.completed_favorite(flow).map(ToString::to_string),
            )
        }) else {
            return;
        };

        match state {
            FlowState::Active => self.favorite = favorite,
            FlowState::Dismissed => self.should_quit = true,
            FlowState::NotStarted => {}
        }
    }
}

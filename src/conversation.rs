//! The menu dialogue
//!
//! ```text
//!   Start | Terminated ── /start ──► AwaitingChoice ◄── "cpu" | "memoria" | other
//!   Start | AwaitingChoice ── /cancel ──► Terminated
//!   AwaitingChoice ── no data from backend ──► Terminated
//! ```
//!
//! [`transition`] is a pure function of the current state and the inbound
//! event. [`Controller`] runs the resulting [`Action`] against the backend,
//! the chart renderer and the chat transport.
//!
//! `/start` inside a conversation shows the menu again instead of being
//! dropped, and `/cancel` is answered even before the first `/start`.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::Metric;
use crate::chart::{BarChart, ChartRenderer};
use crate::ranking::top_five;
use crate::swis::NodeSource;

pub type ChatId = i64;

pub const START_COMMAND: &str = "start";
pub const CANCEL_COMMAND: &str = "cancel";

pub const MENU_PROMPT: &str = "¿Qué información deseas ver?";
pub const MENU_AGAIN_PROMPT: &str = "¿Quieres ver otra información?";
pub const INVALID_CHOICE_REPLY: &str = "Opción no válida. Usa 'CPU' o 'Memoria'.";
pub const BACKEND_FAILURE_REPLY: &str = "Error al obtener datos de SolarWinds. Inténtalo más tarde.";
pub const CANCELLED_REPLY: &str = "Operación cancelada.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationState {
    /// No conversation yet
    #[default]
    Start,
    AwaitingChoice,
    Terminated,
}

impl ConversationState {
    pub fn is_active(self) -> bool {
        self == ConversationState::AwaitingChoice
    }
}

/// A chat message as seen by the dialogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// `/name`, lowercased, without the `@botname` suffix
    Command(String),
    Text(String),
}

impl Inbound {
    pub fn parse(text: &str) -> Inbound {
        let trimmed = text.trim();
        let Some(command) = trimmed.strip_prefix('/') else {
            return Inbound::Text(text.to_string());
        };

        let name = command.split_whitespace().next().unwrap_or_default();
        let name = name.split('@').next().unwrap_or_default();
        Inbound::Command(name.to_lowercase())
    }
}

/// Reply keyboard attached to an outgoing text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// Leave whatever keyboard the user currently has
    Unchanged,
    /// One button per row, hidden after a choice
    Menu(Vec<String>),
    Remove,
}

impl Keyboard {
    pub fn metric_menu() -> Keyboard {
        Keyboard::Menu(
            Metric::ALL
                .iter()
                .map(|metric| metric.label().to_string())
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    PresentMenu,
    Report(Metric),
    RejectChoice,
    Cancel,
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// State after the action, assuming it succeeds
    pub next: ConversationState,
    pub action: Action,
}

impl Step {
    fn new(next: ConversationState, action: Action) -> Step {
        Step { next, action }
    }
}

pub fn transition(state: ConversationState, event: &Inbound) -> Step {
    use ConversationState::*;

    match (state, event) {
        (_, Inbound::Command(name)) if name == START_COMMAND => {
            Step::new(AwaitingChoice, Action::PresentMenu)
        }
        (Start | AwaitingChoice, Inbound::Command(name)) if name == CANCEL_COMMAND => {
            Step::new(Terminated, Action::Cancel)
        }
        (AwaitingChoice, Inbound::Text(text)) => match Metric::from_choice(text) {
            Some(metric) => Step::new(AwaitingChoice, Action::Report(metric)),
            None => Step::new(AwaitingChoice, Action::RejectChoice),
        },
        (state, _) => Step::new(state, Action::Ignore),
    }
}

/// Outgoing side of the chat transport.
#[async_trait]
pub trait Replier: Send + Sync {
    async fn send_text(&self, chat: ChatId, text: &str, keyboard: Keyboard) -> Result<()>;

    async fn send_photo(&self, chat: ChatId, path: &Path, caption: Option<&str>) -> Result<()>;
}

pub struct Controller<S, R, P> {
    source: S,
    renderer: R,
    replier: P,
}

impl<S, R, P> Controller<S, R, P>
where
    S: NodeSource,
    R: ChartRenderer,
    P: Replier,
{
    pub fn new(source: S, renderer: R, replier: P) -> Self {
        Self {
            source,
            renderer,
            replier,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn replier(&self) -> &P {
        &self.replier
    }

    /// Handle one inbound event and return the chat's new state.
    ///
    /// Rendering and delivery errors are returned as is; the caller keeps the
    /// previous state in that case.
    #[instrument(skip(self, event))]
    pub async fn handle(
        &self,
        chat: ChatId,
        state: ConversationState,
        event: &Inbound,
    ) -> Result<ConversationState> {
        let step = transition(state, event);
        debug!("{state:?} -> {step:?}");

        match step.action {
            Action::PresentMenu => {
                self.replier
                    .send_text(chat, MENU_PROMPT, Keyboard::metric_menu())
                    .await?;
            }
            Action::Report(metric) => return self.report(chat, metric).await,
            Action::RejectChoice => {
                self.replier
                    .send_text(chat, INVALID_CHOICE_REPLY, Keyboard::Unchanged)
                    .await?;
            }
            Action::Cancel => {
                info!("conversation cancelled");
                self.replier
                    .send_text(chat, CANCELLED_REPLY, Keyboard::Remove)
                    .await?;
            }
            Action::Ignore => {}
        }

        Ok(step.next)
    }

    /// fetch → rank → render → send, then offer the menu again.
    #[instrument(skip(self))]
    async fn report(&self, chat: ChatId, metric: Metric) -> Result<ConversationState> {
        let ranked = match self.source.fetch_nodes().await {
            Some(nodes) => top_five(&nodes, metric),
            None => None,
        };

        let Some(ranked) = ranked else {
            warn!("no node data available, ending conversation");
            self.replier
                .send_text(chat, BACKEND_FAILURE_REPLY, Keyboard::Unchanged)
                .await?;
            return Ok(ConversationState::Terminated);
        };

        let chart = BarChart::new(&ranked, metric);
        let path = self
            .renderer
            .render(&chart)
            .with_context(|| format!("failed to render {} chart", metric.label()))?;

        let generated = Utc::now().format("%Y-%m-%d %H:%M UTC");
        let caption = format!("{} · {generated}", chart.title);
        self.replier
            .send_photo(chat, &path, Some(caption.as_str()))
            .await
            .context("failed to deliver chart")?;

        self.replier
            .send_text(chat, MENU_AGAIN_PROMPT, Keyboard::metric_menu())
            .await?;

        Ok(ConversationState::AwaitingChoice)
    }
}

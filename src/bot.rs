//! Polling loop tying the Bot API transport to the dialogue
//!
//! Conversation state lives here, one entry per chat that is inside a
//! conversation. Updates are handled one at a time in arrival order.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, error, info, instrument};

use crate::chart::ChartRenderer;
use crate::conversation::{ChatId, Controller, ConversationState, Inbound, Replier};
use crate::swis::NodeSource;
use crate::telegram::{TelegramClient, TelegramError};

/// Pause after a failed `getUpdates` call.
const POLL_BACKOFF: Duration = Duration::from_secs(5);

/// Conversation state per chat. Chats without an entry are in
/// [`ConversationState::Start`].
#[derive(Debug, Default)]
pub struct Sessions {
    states: HashMap<ChatId, ConversationState>,
}

impl Sessions {
    pub fn state(&self, chat: ChatId) -> ConversationState {
        self.states.get(&chat).copied().unwrap_or_default()
    }

    pub fn set(&mut self, chat: ChatId, state: ConversationState) {
        if state.is_active() {
            self.states.insert(chat, state);
        } else {
            // a finished conversation starts over on the next /start
            self.states.remove(&chat);
        }
    }

    pub fn active(&self) -> usize {
        self.states.len()
    }
}

pub struct Bot<S, R, P> {
    controller: Controller<S, R, P>,
    sessions: Sessions,
    offset: i64,
}

impl<S, R, P> Bot<S, R, P>
where
    S: NodeSource,
    R: ChartRenderer,
    P: Replier,
{
    pub fn new(controller: Controller<S, R, P>) -> Self {
        Self {
            controller,
            sessions: Sessions::default(),
            offset: 0,
        }
    }

    pub fn sessions(&self) -> &Sessions {
        &self.sessions
    }

    pub fn controller(&self) -> &Controller<S, R, P> {
        &self.controller
    }

    /// Run one event through the dialogue. Errors are logged and leave the
    /// chat in its previous state.
    #[instrument(skip(self, event))]
    pub async fn dispatch(&mut self, chat: ChatId, event: Inbound) {
        let state = self.sessions.state(chat);

        match self.controller.handle(chat, state, &event).await {
            Ok(next) => {
                debug!("chat {chat}: {state:?} -> {next:?}");
                self.sessions.set(chat, next);
            }
            Err(e) => error!("chat {chat}: failed to handle {event:?}: {e:#}"),
        }
    }

    /// Fetch one batch of updates and dispatch them. Returns the number of
    /// updates consumed.
    pub async fn poll_once(&mut self, telegram: &TelegramClient) -> Result<usize, TelegramError> {
        let updates = telegram.get_updates(self.offset).await?;

        for update in &updates {
            self.offset = self.offset.max(update.update_id + 1);
            if let Some((chat, event)) = update.event() {
                self.dispatch(chat, event).await;
            }
        }

        Ok(updates.len())
    }

    /// Poll forever.
    pub async fn run(mut self, telegram: TelegramClient) {
        info!("polling for updates");

        loop {
            if let Err(e) = self.poll_once(&telegram).await {
                error!("failed to poll updates: {e}");
                tokio::time::sleep(POLL_BACKOFF).await;
            }
        }
    }
}

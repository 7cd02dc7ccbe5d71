//! Turn lifecycle for one chat session.
//!
//! A turn moves `Idle -> AwaitingResponse -> Idle`. Beginning a turn appends
//! the user message, finishing it appends exactly one assistant message, so
//! the log always alternates user/assistant once the turn completes.

use tracing::debug;

use crate::client::{Completer, Completion};
use crate::state::{ChatMessage, ChatRole, ConversationLog};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnPhase {
    #[default]
    Idle,
    AwaitingResponse,
}

/// Session context: owns the conversation log and the turn state.
#[derive(Debug, Default)]
pub struct ChatSession {
    log: ConversationLog,
    phase: TurnPhase,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn is_awaiting(&self) -> bool {
        self.phase == TurnPhase::AwaitingResponse
    }

    /// Append the user message and return the history to send.
    ///
    /// Returns `None` without touching the log when the input is blank or a
    /// turn is already in flight.
    pub fn begin_turn(&mut self, input: &str) -> Option<Vec<ChatMessage>> {
        if input.trim().is_empty() || self.is_awaiting() {
            return None;
        }

        self.log.append(ChatRole::User, input);
        self.phase = TurnPhase::AwaitingResponse;
        debug!(entries = self.log.len(), "turn started");

        Some(self.log.snapshot().to_vec())
    }

    /// Record the outcome of the in-flight turn as one assistant message.
    pub fn finish_turn(&mut self, completion: Completion) -> Option<&ChatMessage> {
        if !self.is_awaiting() {
            debug!("finish_turn called with no turn in flight");
            return None;
        }

        self.phase = TurnPhase::Idle;
        Some(self.log.append(ChatRole::Assistant, completion.into_text()))
    }

    /// Run a whole turn against `completer`.
    pub async fn submit(&mut self, completer: &dyn Completer, input: &str) -> Option<&ChatMessage> {
        let history = self.begin_turn(input)?;
        let completion = completer.complete(&history).await;
        self.finish_turn(completion)
    }
}

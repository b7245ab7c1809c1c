//! Append-only tutor chat with a single outstanding turn.

use shared::{
    domain::{ChatMessage, ChatRole},
    protocol::AgentReply,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{gateway::GatewayError, normalize::normalize_tutor_reply};

pub const TUTOR_REJECTED_TEXT: &str = "Sorry, I had trouble with that. Please try again.";
pub const TUTOR_CONNECTION_TEXT: &str = "Connection error. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendRejected {
    #[error("the tutor is still answering")]
    Busy,
    #[error("message is empty")]
    Empty,
    #[error("no such follow-up question")]
    UnknownFollowUp,
}

#[derive(Debug, Clone)]
pub struct PendingTurn {
    pub prompt: String,
}

pub fn tutor_prompt(module_title: &str, text: &str) -> String {
    format!("[Module: {module_title}] {text}")
}

#[derive(Debug, Default)]
pub struct TutorConversation {
    transcript: Vec<ChatMessage>,
    busy: bool,
    open: bool,
}

impl TutorConversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Appends the learner's message right away and marks the turn in flight.
    pub fn begin_send(
        &mut self,
        text: &str,
        module_title: &str,
    ) -> Result<PendingTurn, SendRejected> {
        if text.trim().is_empty() {
            return Err(SendRejected::Empty);
        }
        if self.busy {
            return Err(SendRejected::Busy);
        }

        self.transcript.push(ChatMessage::user(text));
        self.busy = true;
        debug!(module = module_title, "tutor turn started");
        Ok(PendingTurn {
            prompt: tutor_prompt(module_title, text),
        })
    }

    /// Appends exactly one tutor message for the turn and returns it.
    pub fn complete(
        &mut self,
        pending: PendingTurn,
        outcome: Result<AgentReply, GatewayError>,
    ) -> ChatMessage {
        self.busy = false;
        debug!(prompt_len = pending.prompt.len(), "tutor turn finished");

        let message = match outcome {
            Ok(reply) if reply.success => {
                let tutor = normalize_tutor_reply(&reply);
                let mut message = ChatMessage::tutor(tutor.explanation);
                message.code = tutor.code_example;
                message.analogy = tutor.analogy;
                message.follow_ups = tutor.follow_up_questions;
                message
            }
            Ok(_) => {
                warn!("tutor reported failure");
                ChatMessage::tutor(TUTOR_REJECTED_TEXT)
            }
            Err(err) => {
                warn!(error = %err, "tutor unreachable");
                ChatMessage::tutor(TUTOR_CONNECTION_TEXT)
            }
        };

        self.transcript.push(message.clone());
        message
    }

    /// Text of a suggested question on a tutor message.
    pub fn follow_up(
        &self,
        message_index: usize,
        question_index: usize,
    ) -> Result<String, SendRejected> {
        self.transcript
            .get(message_index)
            .filter(|m| m.role == ChatRole::Tutor)
            .and_then(|m| m.follow_ups.get(question_index))
            .cloned()
            .ok_or(SendRejected::UnknownFollowUp)
    }
}

#[cfg(test)]
#[path = "tests/tutor_tests.rs"]
mod tests;

//! Per-attempt state machine for code challenges.

use shared::{
    catalog::Challenge,
    error::ErrorCode,
    protocol::{AgentReply, EvaluationResult},
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{gateway::GatewayError, normalize::normalize_evaluation};

pub const EVALUATION_FAILED_FEEDBACK: &str = "Evaluation failed. Try again.";
pub const CONNECTION_ERROR_FEEDBACK: &str = "Connection error.";

#[derive(Debug, Clone, PartialEq)]
pub enum ChallengePhase {
    Idle,
    Evaluating,
    Resolved(EvaluationResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitRejected {
    #[error("an evaluation is already in flight")]
    Busy,
    #[error("no challenge selected")]
    NoChallenge,
    #[error("nothing to submit")]
    EmptyDraft,
}

/// Everything needed to finish a submission once the evaluator answers.
#[derive(Debug, Clone)]
pub struct PendingEvaluation {
    pub challenge: Challenge,
    pub prompt: String,
    attempt: u64,
}

#[derive(Debug, Clone)]
pub struct EvaluationOutcome {
    pub challenge: Challenge,
    pub result: EvaluationResult,
    /// XP a first pass is worth; `None` for a failed attempt.
    pub xp_to_award: Option<u64>,
    /// Whether the result landed on the attempt still on screen.
    pub displayed: bool,
}

pub fn evaluation_prompt(challenge_prompt: &str, code: &str) -> String {
    format!(
        "Challenge: {challenge_prompt}\n\nUser's submitted code:\n```asm\n{code}\n```\n\nEvaluate this submission for correctness."
    )
}

#[derive(Debug)]
pub struct ChallengeSession {
    active: Option<Challenge>,
    draft: String,
    phase: ChallengePhase,
    busy: bool,
    hints_shown: usize,
    attempt: u64,
}

impl Default for ChallengeSession {
    fn default() -> Self {
        Self {
            active: None,
            draft: String::new(),
            phase: ChallengePhase::Idle,
            busy: false,
            hints_shown: 0,
            attempt: 0,
        }
    }
}

impl ChallengeSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fresh attempt. An evaluation still in flight keeps the busy
    /// flag but its result will no longer be shown.
    pub fn select(&mut self, challenge: Challenge) {
        debug!(challenge = %challenge.id, "challenge selected");
        self.active = Some(challenge);
        self.draft.clear();
        self.phase = ChallengePhase::Idle;
        self.hints_shown = 0;
        self.attempt += 1;
    }

    pub fn clear(&mut self) {
        self.active = None;
        self.draft.clear();
        self.phase = ChallengePhase::Idle;
        self.hints_shown = 0;
        self.attempt += 1;
    }

    pub fn active(&self) -> Option<&Challenge> {
        self.active.as_ref()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, code: impl Into<String>) {
        self.draft = code.into();
    }

    pub fn phase(&self) -> &ChallengePhase {
        &self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn result(&self) -> Option<&EvaluationResult> {
        match &self.phase {
            ChallengePhase::Resolved(result) => Some(result),
            _ => None,
        }
    }

    pub fn begin_submission(&mut self) -> Result<PendingEvaluation, SubmitRejected> {
        if self.busy {
            return Err(SubmitRejected::Busy);
        }
        let Some(challenge) = self.active.clone() else {
            return Err(SubmitRejected::NoChallenge);
        };
        if self.draft.trim().is_empty() {
            return Err(SubmitRejected::EmptyDraft);
        }

        self.busy = true;
        self.phase = ChallengePhase::Evaluating;
        self.hints_shown = 0;
        info!(challenge = %challenge.id, attempt = self.attempt, "submitting for evaluation");

        Ok(PendingEvaluation {
            prompt: evaluation_prompt(&challenge.prompt, &self.draft),
            challenge,
            attempt: self.attempt,
        })
    }

    pub fn resolve(
        &mut self,
        pending: PendingEvaluation,
        outcome: Result<AgentReply, GatewayError>,
    ) -> EvaluationOutcome {
        self.busy = false;

        let result = match outcome {
            Ok(reply) if reply.success => normalize_evaluation(reply.result()),
            Ok(_) => {
                warn!(challenge = %pending.challenge.id, "evaluator reported failure");
                EvaluationResult::unavailable(
                    EVALUATION_FAILED_FEEDBACK,
                    ErrorCode::ServiceUnavailable.user_label(),
                )
            }
            Err(err) => {
                warn!(challenge = %pending.challenge.id, error = %err, "evaluator unreachable");
                EvaluationResult::unavailable(
                    CONNECTION_ERROR_FEEDBACK,
                    ErrorCode::Network.user_label(),
                )
            }
        };

        let xp_to_award = result.passed().then(|| {
            if result.xp_awarded > 0 {
                result.xp_awarded
            } else {
                pending.challenge.xp_reward
            }
        });

        let displayed = pending.attempt == self.attempt;
        if displayed {
            self.phase = ChallengePhase::Resolved(result.clone());
        } else {
            debug!(challenge = %pending.challenge.id, "discarding result for a stale attempt");
        }
        info!(
            challenge = %pending.challenge.id,
            passed = result.passed(),
            score = result.score,
            "evaluation resolved"
        );

        EvaluationOutcome {
            challenge: pending.challenge,
            result,
            xp_to_award,
            displayed,
        }
    }

    /// Reveals one more hint of a failed result. Returns whether one was shown.
    pub fn reveal_hint(&mut self) -> bool {
        match &self.phase {
            ChallengePhase::Resolved(result)
                if !result.passed() && self.hints_shown < result.hints.len() =>
            {
                self.hints_shown += 1;
                true
            }
            _ => false,
        }
    }

    pub fn hints_shown(&self) -> usize {
        self.hints_shown
    }

    pub fn visible_hints(&self) -> &[String] {
        match &self.phase {
            ChallengePhase::Resolved(result) if !result.passed() => {
                &result.hints[..self.hints_shown.min(result.hints.len())]
            }
            _ => &[],
        }
    }

    /// `Resolved(fail) -> Idle`, keeping the draft. Anything else is a no-op.
    pub fn retry(&mut self) -> bool {
        match &self.phase {
            ChallengePhase::Resolved(result) if !result.passed() => {
                self.phase = ChallengePhase::Idle;
                self.hints_shown = 0;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
#[path = "tests/challenge_tests.rs"]
mod tests;

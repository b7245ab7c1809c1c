use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{AgentId, ChallengeId, ModuleId, ProgressRecord};

/// Body posted to the reasoning service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    pub message: String,
    pub agent_id: AgentId,
}

/// Envelope returned by the reasoning service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<AgentResponse>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Either free text (possibly JSON-encoded) or a structured object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AgentReply {
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            response: Some(AgentResponse {
                result: Some(result),
                message: None,
            }),
        }
    }

    pub fn failed() -> Self {
        Self {
            success: false,
            response: None,
        }
    }

    pub fn result(&self) -> Option<&Value> {
        self.response.as_ref().and_then(|r| r.result.as_ref())
    }

    pub fn message(&self) -> Option<&str> {
        self.response
            .as_ref()
            .and_then(|r| r.message.as_deref())
            .filter(|m| !m.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PassFail {
    Pass,
    #[default]
    Fail,
}

/// Fully typed verdict for one challenge submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub is_correct: bool,
    pub score: f64,
    pub xp_awarded: u64,
    pub feedback: String,
    pub what_code_does: String,
    pub what_was_expected: String,
    pub errors: Vec<String>,
    pub hints: Vec<String>,
    pub pass_fail: PassFail,
}

impl EvaluationResult {
    /// Failing result used when the evaluator could not be reached.
    pub fn unavailable(feedback: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            is_correct: false,
            score: 0.0,
            xp_awarded: 0,
            feedback: feedback.into(),
            what_code_does: String::new(),
            what_was_expected: String::new(),
            errors: vec![error.into()],
            hints: Vec::new(),
            pass_fail: PassFail::Fail,
        }
    }

    pub fn passed(&self) -> bool {
        self.pass_fail == PassFail::Pass || self.is_correct
    }
}

/// Fully typed tutor answer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TutorReply {
    pub explanation: String,
    pub code_example: String,
    pub analogy: String,
    pub follow_up_questions: Vec<String>,
}

/// Save slot wire shape. Field names are fixed by existing saves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavePayload {
    pub xp: u64,
    #[serde(rename = "doneMods")]
    pub done_mods: Vec<ModuleId>,
    #[serde(rename = "doneCh")]
    pub done_ch: Vec<ChallengeId>,
    pub streak: u32,
}

impl From<&ProgressRecord> for SavePayload {
    fn from(record: &ProgressRecord) -> Self {
        Self {
            xp: record.xp,
            done_mods: record.completed_modules.iter().copied().collect(),
            done_ch: record.completed_challenges.iter().cloned().collect(),
            streak: record.streak,
        }
    }
}

pub fn encode_save_payload(record: &ProgressRecord) -> serde_json::Result<String> {
    serde_json::to_string(&SavePayload::from(record))
}

/// Reads a save slot. Returns `None` when the payload is not a JSON object;
/// individual fields that are missing or mistyped fall back to their defaults.
pub fn decode_save_payload(raw: &str) -> Option<ProgressRecord> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let fields = value.as_object()?;
    Some(record_from_fields(fields))
}

fn record_from_fields(fields: &Map<String, Value>) -> ProgressRecord {
    let xp = fields.get("xp").and_then(Value::as_u64).unwrap_or(0);

    let completed_modules = fields
        .get("doneMods")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_u64)
                .filter_map(|id| u32::try_from(id).ok())
                .filter(|id| *id >= 1)
                .map(ModuleId)
                .collect()
        })
        .unwrap_or_default();

    let completed_challenges = fields
        .get("doneCh")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(ChallengeId::new)
                .collect()
        })
        .unwrap_or_default();

    let streak = fields
        .get("streak")
        .and_then(Value::as_u64)
        .and_then(|s| u32::try_from(s).ok())
        .filter(|s| *s >= 1)
        .unwrap_or(1);

    ProgressRecord {
        xp,
        completed_modules,
        completed_challenges,
        streak,
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;

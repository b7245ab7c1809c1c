//! Coerces loosely shaped agent results into typed values.

use serde_json::{Map, Value};
use shared::protocol::{AgentReply, EvaluationResult, PassFail, TutorReply};

pub const TUTOR_FALLBACK_TEXT: &str = "Let me help with that!";

/// Turns an agent `result` into a JSON object. Text is parsed as JSON when it
/// holds an object and otherwise wrapped as `{ "text": <raw> }`.
pub fn parse_result(result: Option<&Value>) -> Map<String, Value> {
    match result {
        Some(Value::Object(fields)) => fields.clone(),
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(fields)) => fields,
            _ => {
                let mut fields = Map::new();
                fields.insert("text".to_string(), Value::String(raw.clone()));
                fields
            }
        },
        _ => Map::new(),
    }
}

pub fn normalize_evaluation(result: Option<&Value>) -> EvaluationResult {
    let fields = parse_result(result);

    let pass_fail = if text(&fields, "pass_fail") == "PASS" {
        PassFail::Pass
    } else {
        PassFail::Fail
    };

    EvaluationResult {
        is_correct: fields.get("is_correct") == Some(&Value::Bool(true)),
        score: fields
            .get("score")
            .and_then(Value::as_f64)
            .map(|s| s.clamp(0.0, 100.0))
            .unwrap_or(0.0),
        xp_awarded: positive_whole(fields.get("xp_awarded")),
        feedback: text(&fields, "feedback"),
        what_code_does: text(&fields, "what_code_does"),
        what_was_expected: text(&fields, "what_was_expected"),
        errors: text_list(&fields, "errors"),
        hints: text_list(&fields, "hints"),
        pass_fail,
    }
}

pub fn normalize_tutor_reply(reply: &AgentReply) -> TutorReply {
    let fields = parse_result(reply.result());

    let explanation = non_empty(&fields, "explanation")
        .or_else(|| non_empty(&fields, "text"))
        .or_else(|| reply.message().map(str::to_string))
        .unwrap_or_else(|| TUTOR_FALLBACK_TEXT.to_string());

    TutorReply {
        explanation,
        code_example: text(&fields, "code_example"),
        analogy: text(&fields, "analogy"),
        follow_up_questions: text_list(&fields, "follow_up_questions"),
    }
}

fn text(fields: &Map<String, Value>, key: &str) -> String {
    fields
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn non_empty(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn text_list(fields: &Map<String, Value>, key: &str) -> Vec<String> {
    fields
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn positive_whole(value: Option<&Value>) -> u64 {
    match value {
        Some(v) => v
            .as_u64()
            .or_else(|| v.as_f64().filter(|n| *n > 0.0).map(|n| n.round() as u64))
            .unwrap_or(0),
        None => 0,
    }
}

#[cfg(test)]
#[path = "tests/normalize_tests.rs"]
mod tests;

use super::*;
use serde_json::json;

fn sample_record() -> ProgressRecord {
    let mut record = ProgressRecord {
        xp: 275,
        streak: 3,
        ..ProgressRecord::default()
    };
    record.completed_modules.insert(ModuleId(1));
    record.completed_modules.insert(ModuleId(2));
    record.completed_challenges.insert(ChallengeId::new("c1_1"));
    record.completed_challenges.insert(ChallengeId::new("c1_2"));
    record.completed_challenges.insert(ChallengeId::new("c2_1"));
    record
}

#[test]
fn save_payload_uses_legacy_field_names() {
    let encoded = encode_save_payload(&sample_record()).expect("encode");
    let value: Value = serde_json::from_str(&encoded).expect("json");
    assert_eq!(value["xp"], json!(275));
    assert_eq!(value["doneMods"], json!([1, 2]));
    assert_eq!(value["doneCh"], json!(["c1_1", "c1_2", "c2_1"]));
    assert_eq!(value["streak"], json!(3));
}

#[test]
fn decodes_what_it_encodes() {
    let record = sample_record();
    let encoded = encode_save_payload(&record).expect("encode");
    assert_eq!(decode_save_payload(&encoded), Some(record));
}

#[test]
fn corrupt_or_non_object_payload_is_absent() {
    assert_eq!(decode_save_payload("{not json"), None);
    assert_eq!(decode_save_payload("null"), None);
    assert_eq!(decode_save_payload("[1,2,3]"), None);
    assert_eq!(decode_save_payload("\"aq_save\""), None);
}

#[test]
fn missing_fields_default_individually() {
    let record = decode_save_payload(r#"{"xp": 120}"#).expect("object payload");
    assert_eq!(record.xp, 120);
    assert!(record.completed_modules.is_empty());
    assert!(record.completed_challenges.is_empty());
    assert_eq!(record.streak, 1);

    let empty = decode_save_payload("{}").expect("object payload");
    assert_eq!(empty, ProgressRecord::default());
}

#[test]
fn mistyped_fields_do_not_poison_the_rest() {
    let record = decode_save_payload(
        r#"{"xp": "lots", "doneMods": [1, "two", -3, 0, 2], "doneCh": ["c1_1", 7], "streak": 0}"#,
    )
    .expect("object payload");
    assert_eq!(record.xp, 0);
    assert_eq!(
        record.completed_modules.iter().copied().collect::<Vec<_>>(),
        vec![ModuleId(1), ModuleId(2)]
    );
    assert_eq!(
        record.completed_challenges.iter().cloned().collect::<Vec<_>>(),
        vec![ChallengeId::new("c1_1")]
    );
    assert_eq!(record.streak, 1);
}

#[test]
fn agent_reply_tolerates_missing_response() {
    let reply: AgentReply = serde_json::from_str(r#"{"success": true}"#).expect("decode");
    assert!(reply.success);
    assert!(reply.result().is_none());
    assert!(reply.message().is_none());

    let reply: AgentReply = serde_json::from_str("{}").expect("decode");
    assert!(!reply.success);
}

#[test]
fn agent_reply_ignores_empty_message() {
    let reply: AgentReply =
        serde_json::from_str(r#"{"success": true, "response": {"message": ""}}"#).expect("decode");
    assert!(reply.message().is_none());
}

#[test]
fn pass_fail_uses_upper_case_labels() {
    assert_eq!(
        serde_json::to_value(PassFail::Pass).expect("encode"),
        json!("PASS")
    );
    let parsed: PassFail = serde_json::from_value(json!("FAIL")).expect("decode");
    assert_eq!(parsed, PassFail::Fail);
}

#[test]
fn evaluation_passes_on_either_verdict_field() {
    let mut result = EvaluationResult::unavailable("", "");
    assert!(!result.passed());
    result.is_correct = true;
    assert!(result.passed());
    result.is_correct = false;
    result.pass_fail = PassFail::Pass;
    assert!(result.passed());
}

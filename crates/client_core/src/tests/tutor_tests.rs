use super::*;
use serde_json::json;

#[test]
fn prefixes_prompt_with_module_title() {
    let mut chat = TutorConversation::new();
    let pending = chat
        .begin_send("  what is EAX?  ", "Registers 101")
        .expect("send");
    assert_eq!(pending.prompt, "[Module: Registers 101]   what is EAX?  ");
    assert_eq!(chat.transcript().len(), 1);
    assert_eq!(chat.transcript()[0].role, ChatRole::User);
    assert_eq!(chat.transcript()[0].text, "  what is EAX?  ");
    assert!(chat.is_busy());
}

#[test]
fn rejects_blank_messages_and_sends_while_busy() {
    let mut chat = TutorConversation::new();
    assert_eq!(
        chat.begin_send("   ", "Registers 101").expect_err("blank"),
        SendRejected::Empty
    );

    chat.begin_send("first", "Registers 101").expect("send");
    assert_eq!(
        chat.begin_send("second", "Registers 101").expect_err("busy"),
        SendRejected::Busy
    );
    assert_eq!(chat.transcript().len(), 1);
}

#[test]
fn success_appends_structured_tutor_message() {
    let mut chat = TutorConversation::new();
    let pending = chat.begin_send("what is EAX?", "Registers 101").expect("send");
    let reply = AgentReply::ok(json!({
        "explanation": "EAX is the accumulator.",
        "code_example": "mov eax, 5",
        "analogy": "A calculator display",
        "follow_up_questions": ["What is EBX?", "Why 32 bits?"]
    }));

    let message = chat.complete(pending, Ok(reply));
    assert!(!chat.is_busy());
    assert_eq!(message.role, ChatRole::Tutor);
    assert_eq!(message.text, "EAX is the accumulator.");
    assert_eq!(message.code, "mov eax, 5");
    assert_eq!(message.analogy, "A calculator display");
    assert_eq!(chat.transcript().len(), 2);
    assert_eq!(chat.transcript()[1], message);
}

#[test]
fn non_success_appends_one_apology_and_keeps_user_message() {
    let mut chat = TutorConversation::new();
    let pending = chat.begin_send("hello", "Stack Operations").expect("send");
    let message = chat.complete(pending, Ok(AgentReply::failed()));

    assert_eq!(message.text, TUTOR_REJECTED_TEXT);
    assert_eq!(chat.transcript().len(), 2);
    assert_eq!(chat.transcript()[0].text, "hello");
    assert!(!chat.is_busy());
}

#[test]
fn transport_failure_appends_connection_error() {
    let mut chat = TutorConversation::new();
    let pending = chat.begin_send("hello", "Stack Operations").expect("send");
    let message = chat.complete(pending, Err(GatewayError::Status(502)));

    assert_eq!(message.text, TUTOR_CONNECTION_TEXT);
    assert!(message.follow_ups.is_empty());
    assert_eq!(chat.transcript().len(), 2);

    chat.begin_send("again", "Stack Operations")
        .expect("busy flag cleared after failure");
}

#[test]
fn follow_up_resolves_suggested_question_text() {
    let mut chat = TutorConversation::new();
    let pending = chat.begin_send("what is EAX?", "Registers 101").expect("send");
    chat.complete(
        pending,
        Ok(AgentReply::ok(json!({
            "explanation": "Accumulator.",
            "follow_up_questions": ["What is EBX?"]
        }))),
    );

    assert_eq!(chat.follow_up(1, 0).expect("question"), "What is EBX?");
    assert_eq!(
        chat.follow_up(1, 1).expect_err("out of range"),
        SendRejected::UnknownFollowUp
    );
    assert_eq!(
        chat.follow_up(0, 0).expect_err("user message"),
        SendRejected::UnknownFollowUp
    );
}

#[test]
fn closing_the_panel_keeps_the_transcript() {
    let mut chat = TutorConversation::new();
    chat.open();
    let pending = chat.begin_send("hi", "Registers 101").expect("send");
    chat.complete(pending, Ok(AgentReply::ok(json!("plain answer"))));

    chat.close();
    assert!(!chat.is_open());
    chat.open();
    assert!(chat.is_open());
    assert_eq!(chat.transcript().len(), 2);
    assert_eq!(chat.transcript()[1].text, "plain answer");
}

use interview_capture::nats::client::FINAL_TRANSCRIPT_SUBJECT;
use interview_capture::nats::messages::TranscriptMessage;

#[test]
fn test_transcript_deserialization() {
    let json = r#"{
        "session_id": "interview",
        "text": "I led the migration",
        "partial": false,
        "timestamp": "2026-03-02T09:15:05Z",
        "confidence": 0.95
    }"#;

    let msg: TranscriptMessage = serde_json::from_str(json).unwrap();
    assert_eq!(msg.session_id, "interview");
    assert_eq!(msg.text, "I led the migration");
    assert!(!msg.partial);
    assert_eq!(msg.confidence, 0.95);
    assert!(msg.is_final_for("interview"));
}

#[test]
fn test_partial_transcript_is_not_final() {
    let json = r#"{
        "session_id": "interview",
        "text": "I led the",
        "partial": true,
        "timestamp": "2026-03-02T09:15:04Z",
        "confidence": 0.61
    }"#;

    let msg: TranscriptMessage = serde_json::from_str(json).unwrap();
    assert!(msg.partial);
    assert!(!msg.is_final_for("interview"));
}

#[test]
fn test_transcript_for_other_session_is_ignored() {
    let json = r#"{
        "session_id": "standup",
        "text": "Nothing blocking",
        "partial": false,
        "timestamp": "2026-03-02T09:15:05Z",
        "confidence": 0.9
    }"#;

    let msg: TranscriptMessage = serde_json::from_str(json).unwrap();
    assert!(!msg.is_final_for("interview"));
    assert!(msg.is_final_for("standup"));
}

#[test]
fn test_final_transcript_subject() {
    assert_eq!(FINAL_TRANSCRIPT_SUBJECT, "stt.text.final");
}

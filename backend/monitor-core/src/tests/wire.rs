// Unit tests for wire record decoding and command construction.

use crate::wire::{Notification, PendingCommand, ServerStatus};

use std::time::Duration;

#[test]
fn given_pascal_case_json_when_status_decoded_then_fields_mapped() {
    let json = r#"{
        "LastEventID": 5,
        "LastNotificationUpdateID": 1,
        "ProgramState": "Running",
        "SuggestedStatusIcon": "Active",
        "SchedulerQueueIds": [[1, "2"]]
    }"#;

    let status: ServerStatus = serde_json::from_str(json).unwrap();

    assert_eq!(status.last_event_id, 5);
    assert_eq!(status.last_notification_update_id, 1);
    assert_eq!(status.program_state.as_deref(), Some("Running"));
}

/// Unknown server fields must be tolerated; the tray only consumes a
/// stable subset of a status document that keeps growing server-side.
#[test]
fn given_minimal_status_json_when_decoded_then_optional_fields_default() {
    let status: ServerStatus =
        serde_json::from_str(r#"{"LastEventID": 0, "LastNotificationUpdateID": -1}"#).unwrap();

    assert!(status.program_state.is_none());
    assert!(status.suggested_status_icon.is_none());
}

#[test]
fn given_notification_json_when_decoded_then_timestamp_parsed() {
    let json = r#"{
        "ID": 42,
        "Type": "Warning",
        "Title": "Missed schedule",
        "Message": "Backup 'docs' did not run",
        "Timestamp": "2026-08-06T12:30:00Z"
    }"#;

    let notification: Notification = serde_json::from_str(json).unwrap();

    assert_eq!(notification.id, 42);
    assert_eq!(notification.timestamp.to_rfc3339(), "2026-08-06T12:30:00+00:00");
}

#[test]
fn given_immediate_fetch_when_state_command_built_then_longpoll_false_and_no_duration() {
    let command = PendingCommand::current_state(None, 0);

    assert_eq!(command.action(), "get-current-state");
    assert_eq!(command.get("longpoll"), Some("false"));
    assert_eq!(command.get("lasteventid"), Some("0"));
    assert_eq!(command.get("duration"), None);
}

#[test]
fn given_longpoll_fetch_when_state_command_built_then_duration_formatted() {
    let command = PendingCommand::current_state(Some(Duration::from_secs(300)), 17);

    assert_eq!(command.get("longpoll"), Some("true"));
    assert_eq!(command.get("lasteventid"), Some("17"));
    assert_eq!(command.get("duration"), Some("5m"));
}

#[test]
fn given_dismiss_command_when_built_then_id_carried() {
    let command = PendingCommand::dismiss_notification(9);

    assert_eq!(command.action(), "dismiss-notification");
    assert_eq!(command.get("id"), Some("9"));
}

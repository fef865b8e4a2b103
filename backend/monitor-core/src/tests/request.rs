// Unit tests for form encoding and timeout derivation.

use crate::config::ConnectionConfig;
use crate::request::{RequestExecutor, encode_form_with_format};
use crate::wire::PendingCommand;

use std::time::Duration;

fn executor() -> RequestExecutor {
    let config = ConnectionConfig::for_server("http://127.0.0.1:8200/");
    RequestExecutor::new(&config, None).unwrap()
}

fn pairs(params: &[(&str, &str)]) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(k, v)| (String::from(*k), String::from(*v)))
        .collect()
}

/// **VALUE**: Verifies parameter order is preserved and `format=json` is
/// appended, never prepended or injected mid-body.
///
/// **WHY THIS MATTERS**: The dispatch tests (and the server's logs) rely on
/// a deterministic body; reordering would break FIFO assertions downstream.
#[test]
fn given_ordered_params_when_encoded_then_order_preserved_and_format_appended() {
    let body = encode_form_with_format(&pairs(&[
        ("action", "send-command"),
        ("command", "pause"),
        ("duration", "10m"),
    ]));

    assert_eq!(body, "action=send-command&command=pause&duration=10m&format=json");
}

/// **BUG THIS CATCHES**: Unescaped '&' or '=' in a value splitting the form
/// body into bogus parameters.
#[test]
fn given_reserved_characters_when_encoded_then_percent_escaped() {
    let body = encode_form_with_format(&pairs(&[("action", "x"), ("note", "a&b=c d")]));

    assert_eq!(body, "action=x&note=a%26b%3Dc%20d&format=json");
}

#[test]
fn given_utf8_value_when_encoded_then_multibyte_escaped() {
    let body = encode_form_with_format(&pairs(&[("action", "x"), ("name", "bkup-\u{00e9}")]));

    assert_eq!(body, "action=x&name=bkup-%C3%A9&format=json");
}

/// **VALUE**: Pins the long-poll timeout derivation: negotiated duration plus
/// the configured grace, but only for status fetches carrying a duration.
///
/// **WHY THIS MATTERS**: Too short and every long-poll dies mid-hold as a
/// spurious timeout; unbounded and shutdown can hang on a dead server.
#[test]
fn given_longpoll_status_fetch_when_timeout_derived_then_duration_plus_grace() {
    // GIVEN: A long-poll status fetch holding for 5 minutes
    let command = PendingCommand::current_state(Some(Duration::from_secs(300)), 7);

    // WHEN: Deriving the request timeout (default grace: 5s)
    let timeout = executor().timeout_for(&command);

    // THEN: 5m + 5s
    assert_eq!(timeout, Duration::from_secs(305));
}

#[test]
fn given_immediate_status_fetch_when_timeout_derived_then_default() {
    let command = PendingCommand::current_state(None, 0);

    assert_eq!(executor().timeout_for(&command), Duration::from_secs(30));
}

#[test]
fn given_non_status_action_with_duration_when_timeout_derived_then_default() {
    // A pause command carries a duration too; it must not stretch the timeout
    let command = PendingCommand::send_command("pause").with("duration", "10m");

    assert_eq!(executor().timeout_for(&command), Duration::from_secs(30));
}

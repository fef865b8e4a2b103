// Unit tests for the command queue. The dispatch loop itself is covered in
// integration_tests/dispatcher.rs against a mock server.

use crate::dispatcher::CommandQueue;
use crate::wire::PendingCommand;

/// **VALUE**: Pins the queue's FIFO ordering at the data-structure level.
///
/// **WHY THIS MATTERS**: Command ordering is a user-visible contract - a
/// pause followed by a resume must never reach the server reversed.
#[test]
fn given_three_commands_when_popped_then_fifo_order() {
    // GIVEN: Three commands enqueued in order
    let queue = CommandQueue::new();
    queue.push(PendingCommand::send_command("pause"));
    queue.push(PendingCommand::send_command("resume"));
    queue.push(PendingCommand::send_command("stop"));

    // WHEN/THEN: Popped in the same order
    assert_eq!(queue.pop().unwrap().get("command"), Some("pause"));
    assert_eq!(queue.pop().unwrap().get("command"), Some("resume"));
    assert_eq!(queue.pop().unwrap().get("command"), Some("stop"));
    assert!(queue.pop().is_none());
}

#[test]
fn given_empty_queue_when_popped_then_none() {
    let queue = CommandQueue::new();

    assert!(queue.pop().is_none());
    assert_eq!(queue.len(), 0);
}

#[test]
fn given_pushes_and_pops_when_len_queried_then_tracks_outstanding() {
    let queue = CommandQueue::new();
    queue.push(PendingCommand::send_command("pause"));
    queue.push(PendingCommand::send_command("resume"));

    assert_eq!(queue.len(), 2);
    queue.pop();
    assert_eq!(queue.len(), 1);
}

use super::first_marker;
use super::markers;
use super::settled_len;
use super::strip_markers;
use super::tokenize;
use super::ActionMarker;
use super::ActionStatus;
use super::Decision;
use super::Segment;

#[test]
fn it_parses_a_marker() {
    let marker = first_marker("Ready. [ACTION_ID:a1b2:send_email]").unwrap();
    assert_eq!(marker, ActionMarker::new("a1b2", "send_email"));
    assert_eq!(marker.status, ActionStatus::Pending);
    assert_eq!(marker.label(), "send email");
}

#[test]
fn it_returns_none_without_markers() {
    assert!(first_marker("Just text, [with] brackets: and colons").is_none());
}

#[test]
fn it_keeps_colons_in_the_action_name() {
    let marker = first_marker("[ACTION_ID:42:create_issue:repo]").unwrap();
    assert_eq!(marker.action_id, "42");
    assert_eq!(marker.action_name, "create_issue:repo");
}

#[test]
fn it_uses_the_first_of_several_markers() {
    let text = "[ACTION_ID:first:send_email] then [ACTION_ID:second:delete_file]";
    assert_eq!(first_marker(text).unwrap().action_id, "first");

    let all = markers(text);
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].action_id, "second");
}

#[test]
fn it_skips_malformed_markers() {
    let text = "a [ACTION_ID:only_id] b [ACTION_ID::name] c [ACTION_ID:id:] d [ACTION_ID:ok:run]";
    let all = markers(text);
    assert_eq!(all, vec![ActionMarker::new("ok", "run")]);
    assert_eq!(strip_markers(text), "a  b  c  d ");
}

#[test]
fn it_tokenizes_segments_in_order() {
    let segments = tokenize("Hi [ACTION_ID:x:y] there [ACTION_ID:broken] [ACTION_ID:z:");
    assert_eq!(
        segments,
        vec![
            Segment::Text("Hi "),
            Segment::Marker(ActionMarker::new("x", "y")),
            Segment::Text(" there "),
            Segment::Malformed("[ACTION_ID:broken]"),
            Segment::Text(" "),
            Segment::Incomplete("[ACTION_ID:z:"),
        ]
    );
}

#[test]
fn it_hides_markers_still_streaming_in() {
    assert_eq!(strip_markers("Sending now [ACTION_ID:3f1c"), "Sending now ");
    assert!(first_marker("Sending now [ACTION_ID:3f1c").is_none());
}

#[test]
fn it_strips_markers_and_keeps_text() {
    assert_eq!(
        strip_markers("Before [ACTION_ID:a:b] after"),
        "Before  after".to_string()
    );
    assert_eq!(strip_markers(""), "");
    assert_eq!(strip_markers("[ACTION_ID:a:b]"), "");
}

#[test]
fn it_handles_multibyte_text_around_markers() {
    let text = "Envoyé ✅ [ACTION_ID:é1:send_émail] fin";
    assert_eq!(first_marker(text).unwrap().action_name, "send_émail");
    assert_eq!(strip_markers(text), "Envoyé ✅  fin");
}

#[test]
fn it_reports_final_statuses() {
    assert!(!ActionStatus::Pending.is_final());
    assert!(!ActionStatus::Submitting.is_final());
    assert!(ActionStatus::Approved.is_final());
    assert!(ActionStatus::Rejected.is_final());
}

#[test]
fn it_maps_decisions_to_statuses_and_follow_ups() {
    assert_eq!(Decision::Approve.status(), ActionStatus::Approved);
    assert_eq!(Decision::Reject.status(), ActionStatus::Rejected);
    assert_eq!(Decision::Approve.follow_up(), "Approved. Please proceed.");
    assert_eq!(
        Decision::Reject.follow_up(),
        "Rejected. Do not proceed with this action."
    );
    assert_eq!(Decision::Approve.to_string(), "approve");
}

#[test]
fn it_holds_back_a_possible_marker_opening() {
    assert_eq!(settled_len("Sending now"), 11);
    assert_eq!(settled_len("Sending now ["), 12);
    assert_eq!(settled_len("Sending now [ACTION_I"), 12);
    assert_eq!(settled_len("Sending [x] now"), 15);
    assert_eq!(settled_len("Sending now [ACTIVE]"), 20);
    assert_eq!(settled_len("é ["), 3);
}

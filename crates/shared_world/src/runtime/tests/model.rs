use serde_json::json;

use shared_world_proto::{session_scope, VIEW_JOIN_EVENT};

use super::*;

#[test]
fn bootstrap_creates_root_from_config() {
    let model = recorder_model(recorder_config());
    let root = model.root().expect("root");
    assert_eq!(root, 1);
    assert!(model.actor(root).expect("root actor").has_behavior("recorder"));
    assert_eq!(model.seq(), 0);
}

#[test]
fn bootstrap_rejects_unknown_root_behavior() {
    let config = SessionConfig {
        root_behaviors: vec!["missing".to_string()],
        ..SessionConfig::default()
    };
    let mut model = Model::new(config, recorder_registry());
    let err = model.bootstrap().unwrap_err();
    assert_eq!(
        err,
        SessionError::BehaviorNotFound {
            name: "missing".to_string()
        }
    );
}

#[test]
fn ordered_events_reach_subscribers_in_order() {
    let mut model = recorder_model(recorder_config());
    model
        .apply(&test_event(1, 0, "ping", json!({ "tag": "a" })))
        .unwrap();
    model
        .apply(&test_event(2, 5, "ping", json!({ "tag": "b" })))
        .unwrap();

    assert_eq!(field_list(&model, 1, "log"), vec![json!("a"), json!("b")]);
    assert_eq!(model.seq(), 2);
    assert_eq!(model.time(), 5);
}

#[test]
fn sequence_gap_is_rejected_without_side_effects() {
    let mut model = recorder_model(recorder_config());
    let err = model
        .apply(&test_event(2, 0, "ping", json!({ "tag": "early" })))
        .unwrap_err();
    assert_eq!(err, SessionError::SequenceGap { expected: 1, found: 2 });
    assert!(err.requires_resync());
    assert_eq!(model.seq(), 0);
    assert!(field_list(&model, 1, "log").is_empty());

    model
        .apply(&test_event(1, 0, "ping", json!({ "tag": "first" })))
        .unwrap();
    let duplicate = model
        .apply(&test_event(1, 0, "ping", json!({ "tag": "first" })))
        .unwrap_err();
    assert_eq!(duplicate, SessionError::SequenceGap { expected: 2, found: 1 });
    assert_eq!(field_list(&model, 1, "log"), vec![json!("first")]);
}

#[test]
fn futures_fire_by_time_then_submission_order() {
    let mut model = recorder_model(recorder_config());
    model
        .apply(&test_event(1, 0, "later", json!({ "delay": 10, "tag": "x" })))
        .unwrap();
    model
        .apply(&test_event(2, 0, "later", json!({ "delay": 5, "tag": "y" })))
        .unwrap();
    model
        .apply(&test_event(3, 0, "later", json!({ "delay": 10, "tag": "z" })))
        .unwrap();
    assert_eq!(model.state().futures.len(), 3);

    let report = model.apply(&tick(4, 20)).unwrap();
    assert_eq!(report.futures_run, 3);
    assert_eq!(
        field_list(&model, 1, "log"),
        vec![json!("y"), json!("x"), json!("z")]
    );
    assert!(model.state().futures.is_empty());
}

#[test]
fn due_futures_run_before_the_envelope_message() {
    let mut model = recorder_model(recorder_config());
    model
        .apply(&test_event(1, 0, "later", json!({ "delay": 10, "tag": "future" })))
        .unwrap();
    model
        .apply(&test_event(2, 10, "ping", json!({ "tag": "message" })))
        .unwrap();
    assert_eq!(
        field_list(&model, 1, "log"),
        vec![json!("future"), json!("message")]
    );
}

#[test]
fn zero_delay_future_waits_for_the_next_tick() {
    let mut model = recorder_model(recorder_config());
    model
        .apply(&test_event(1, 0, "later", json!({ "delay": 0, "tag": "soon" })))
        .unwrap();
    assert!(field_list(&model, 1, "log").is_empty());

    model.apply(&tick(2, 0)).unwrap();
    assert!(field_list(&model, 1, "log").is_empty());

    model.apply(&tick(3, 1)).unwrap();
    assert_eq!(field_list(&model, 1, "log"), vec![json!("soon")]);
}

#[test]
fn envelope_time_never_moves_backwards() {
    let mut model = recorder_model(recorder_config());
    model.apply(&tick(1, 100)).unwrap();
    model.apply(&tick(2, 40)).unwrap();
    assert_eq!(model.time(), 100);
}

#[test]
fn recoverable_failure_is_isolated_to_its_handler() {
    let mut model = recorder_model(recorder_config());
    let report = model.apply(&test_event(1, 0, "fail", json!({}))).unwrap();
    assert_eq!(report.recoverable_errors.len(), 1);
    assert!(report.recoverable_errors[0].contains("asked to fail"));
    assert!(!model.is_halted());

    model
        .apply(&test_event(2, 0, "ping", json!({ "tag": "after" })))
        .unwrap();
    assert_eq!(field_list(&model, 1, "log"), vec![json!("after")]);
}

#[test]
fn fatal_failure_halts_the_model() {
    let mut model = recorder_model(recorder_config());
    let err = model.apply(&test_event(1, 0, "fatal", json!({}))).unwrap_err();
    match err {
        SessionError::Diverged { seq, reason } => {
            assert_eq!(seq, 1);
            assert!(reason.contains("asked to stop"));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(model.is_halted());
    assert_eq!(
        model.apply(&test_event(2, 0, "ping", json!({}))).unwrap_err(),
        SessionError::Halted
    );
}

#[test]
fn panic_in_handler_halts_the_model() {
    let mut model = recorder_model(recorder_config());
    let err = model.apply(&test_event(1, 0, "panic", json!({}))).unwrap_err();
    assert!(matches!(err, SessionError::Diverged { seq: 1, .. }));
    assert!(model.halt_reason().expect("reason").contains("asked to panic"));
    assert!(err.requires_resync());
}

#[test]
fn cascade_is_bounded_per_step() {
    let config = SessionConfig {
        max_cascade_events: 8,
        ..recorder_config()
    };
    let mut model = recorder_model(config);
    let report = model.apply(&test_event(1, 0, "loop", json!({}))).unwrap();

    assert_eq!(report.publications_delivered, 8);
    assert_eq!(report.dropped_publications, 1);
    assert_eq!(report.recoverable_errors.len(), 1);
    assert!(report.recoverable_errors[0].contains("cascade limit 8"));
    let root = model.actor(1).expect("root");
    assert_eq!(root.get_f64("loops"), Some(8.0));
    assert!(!model.is_halted());

    model
        .apply(&test_event(2, 0, "ping", json!({ "tag": "still alive" })))
        .unwrap();
    assert_eq!(field_list(&model, 1, "log"), vec![json!("still alive")]);
}

#[test]
fn destroy_cascades_to_children_and_cancels_their_futures() {
    let mut model = recorder_model(recorder_config());
    model.apply(&test_event(1, 0, "spawn", json!({}))).unwrap();
    assert_eq!(field_list(&model, 1, "spawned"), vec![json!(2)]);

    model
        .apply(&envelope(
            2,
            0,
            ReflectedMessage::publish(actor_scope(2), "spawn", json!({})),
        ))
        .unwrap();
    assert_eq!(model.actor(3).expect("grandchild").parent(), Some(2));
    model
        .apply(&envelope(
            3,
            0,
            ReflectedMessage::publish(actor_scope(3), "later", json!({ "delay": 100, "tag": "ghost" })),
        ))
        .unwrap();
    assert_eq!(model.state().futures.len(), 1);

    let report = model
        .apply(&test_event(4, 0, "destroy", json!({ "actor": 2 })))
        .unwrap();
    assert!(model.actor(2).is_none());
    assert!(model.actor(3).is_none());
    assert_eq!(model.actor(1).expect("root").children().count(), 0);
    assert!(model.state().futures.is_empty());
    assert!(model.state().bus.subscribers(&actor_scope(2), "ping").is_empty());
    assert!(model.state().bus.subscribers(&actor_scope(3), "later").is_empty());

    let torn: Vec<_> = report
        .notifications
        .iter()
        .filter(|notification| notification.event == "torn")
        .map(|notification| notification.payload["actor"].clone())
        .collect();
    assert_eq!(torn, vec![json!(3), json!(2)]);

    let report = model.apply(&tick(5, 200)).unwrap();
    assert_eq!(report.futures_run, 0);
}

#[test]
fn view_join_and_exit_are_system_events() {
    let mut model = recorder_model(recorder_config());
    let report = model
        .apply(&envelope(
            1,
            0,
            ReflectedMessage::ViewJoin {
                view_id: "alice".to_string(),
            },
        ))
        .unwrap();
    assert!(model.views().contains("alice"));
    let joined = &report.notifications[0];
    assert_eq!(joined.scope, session_scope(DEFAULT_SESSION_ID));
    assert_eq!(joined.event, VIEW_JOIN_EVENT);
    assert_eq!(joined.payload, json!({ "view_id": "alice" }));
    assert_eq!(joined.source, None);

    model
        .apply(&envelope(
            2,
            0,
            ReflectedMessage::ViewExit {
                view_id: "alice".to_string(),
            },
        ))
        .unwrap();
    assert!(model.views().is_empty());
}

#[test]
fn envelope_publications_are_not_view_notifications() {
    let mut model = recorder_model(recorder_config());
    let report = model
        .apply(&test_event(1, 0, "ping", json!({ "tag": "quiet" })))
        .unwrap();
    assert!(report.notifications.is_empty());
    assert_eq!(report.handlers_run, 1);
}

#[test]
fn replicas_fed_the_same_envelopes_hash_identically() {
    let envelopes = vec![
        test_event(1, 0, "roll", json!({})),
        test_event(2, 3, "later", json!({ "delay": 4, "tag": "f" })),
        test_event(3, 5, "roll", json!({})),
        tick(4, 9),
        test_event(5, 9, "spawn", json!({})),
    ];
    let mut a = recorder_model(recorder_config());
    let mut b = recorder_model(recorder_config());
    for envelope in &envelopes {
        a.apply(envelope).unwrap();
        b.apply(envelope).unwrap();
    }
    assert_eq!(a.state(), b.state());
    assert_eq!(a.state_hash().unwrap(), b.state_hash().unwrap());
    assert_eq!(field_list(&a, 1, "rolls").len(), 2);
}

#[test]
fn snapshot_restore_then_replay_matches_live_model() {
    let mut live = recorder_model(recorder_config());
    live.apply(&test_event(1, 0, "roll", json!({}))).unwrap();
    live.apply(&test_event(2, 0, "later", json!({ "delay": 30, "tag": "late" })))
        .unwrap();
    let snapshot = live.snapshot();
    assert_eq!(snapshot.seq(), 2);

    let mut restored =
        Model::from_snapshot(recorder_config(), recorder_registry(), snapshot).unwrap();
    let rest = [test_event(3, 10, "roll", json!({})), tick(4, 40)];
    for envelope in &rest {
        live.apply(envelope).unwrap();
        restored.apply(envelope).unwrap();
    }
    assert_eq!(restored.state_hash().unwrap(), live.state_hash().unwrap());
    assert_eq!(field_list(&restored, 1, "log"), vec![json!("late")]);
}

#[test]
fn from_snapshot_checks_installed_behaviors() {
    let model = recorder_model(recorder_config());

    let mut newer = model.snapshot();
    newer.behaviors[0].version = 9;
    let err = Model::from_snapshot(recorder_config(), recorder_registry(), newer).unwrap_err();
    assert_eq!(
        err,
        SessionError::BehaviorVersionMismatch {
            name: "recorder".to_string(),
            expected: 9,
            found: 1,
        }
    );

    let err = Model::from_snapshot(recorder_config(), BehaviorRegistry::new(), model.snapshot())
        .unwrap_err();
    assert!(matches!(err, SessionError::BehaviorNotFound { .. }));
}

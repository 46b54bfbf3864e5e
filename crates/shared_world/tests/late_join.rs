use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::json;

use shared_world::text::{EditKind, Run};
use shared_world::{
    actor_scope, builtin_behaviors, builtin_pawns, codec_for, Client, CodecKind,
    InMemoryReflector, SessionConfig, SessionRootBehavior, SessionStore, AVATAR_MOVE_EVENT,
};

fn temp_dir(prefix: &str) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("shared-world-{prefix}-{unique}"))
}

fn join(id: &str, config: &SessionConfig, reflector: &InMemoryReflector) -> Client {
    Client::join(
        id,
        config.clone(),
        builtin_behaviors(),
        builtin_pawns(),
        reflector,
    )
    .expect("join")
}

fn avatar(client: &Client, view_id: &str) -> u64 {
    let model = client.model();
    let root = model.actor(model.root().expect("root")).expect("root actor");
    SessionRootBehavior::avatar_of(&root, view_id).expect("avatar")
}

/// Two clients move, fall and type for a while, uploading snapshots on the
/// way.
fn busy_session(config: &SessionConfig, reflector: &InMemoryReflector) -> Vec<Client> {
    let mut alice = join("alice", config, reflector);
    let mut bob = join("bob", config, reflector);
    alice.pump(reflector).unwrap();
    bob.pump(reflector).unwrap();

    for round in 0..20u32 {
        let mover = if round % 2 == 0 { &alice } else { &bob };
        let scope = actor_scope(avatar(mover, mover.id()));
        mover
            .publish(reflector, &scope, AVATAR_MOVE_EVENT, json!({ "dx": 1.25 }))
            .unwrap();
        mover
            .edit_document(
                reflector,
                EditKind::Insert {
                    runs: vec![Run::new(format!("{round} "))],
                },
            )
            .unwrap();
        reflector.tick(120).unwrap();
        alice.pump(reflector).unwrap();
        bob.pump(reflector).unwrap();
    }
    vec![alice, bob]
}

#[test]
fn late_joiner_converges_from_the_latest_snapshot() {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = SessionConfig {
        persist_period_ms: 500,
        ..SessionConfig::default()
    };
    let reflector = InMemoryReflector::new();
    let mut clients = busy_session(&config, &reflector);
    let uploaded = reflector.latest_snapshot().unwrap().expect("snapshot");
    assert!(uploaded.seq > 2);

    let mut carol = join("carol", &config, &reflector);
    assert_eq!(carol.model().seq(), uploaded.seq);
    carol.pump(&reflector).unwrap();
    for client in clients.iter_mut() {
        client.pump(&reflector).unwrap();
    }

    let expected = clients[0].state_hash().unwrap();
    assert_eq!(clients[1].state_hash().unwrap(), expected);
    assert_eq!(carol.state_hash().unwrap(), expected);
    // document, three avatars
    assert_eq!(carol.view().pawn_count(), 4);
}

#[test]
fn late_joiner_with_cbor_snapshots() {
    let config = SessionConfig {
        persist_period_ms: 300,
        codec: CodecKind::Cbor,
        ..SessionConfig::default()
    };
    let reflector = InMemoryReflector::new();
    let mut clients = busy_session(&config, &reflector);
    let uploaded = reflector.latest_snapshot().unwrap().expect("snapshot");
    assert_eq!(uploaded.codec, CodecKind::Cbor);
    let parsed = codec_for(CodecKind::Cbor).parse(&uploaded.blob).unwrap();
    assert_eq!(parsed.seq(), uploaded.seq);

    let mut carol = join("carol", &config, &reflector);
    carol.pump(&reflector).unwrap();
    for client in clients.iter_mut() {
        client.pump(&reflector).unwrap();
    }
    assert_eq!(carol.state_hash().unwrap(), clients[0].state_hash().unwrap());
}

#[test]
fn joiner_after_only_the_first_snapshot_replays_the_rest() {
    let config = SessionConfig {
        persist_period_ms: u64::MAX,
        ..SessionConfig::default()
    };
    let reflector = InMemoryReflector::new();
    let mut clients = busy_session(&config, &reflector);
    // the very first pump always fires
    let uploaded = reflector.latest_snapshot().unwrap().expect("first snapshot");
    assert_eq!(uploaded.seq, 2);

    let mut carol = join("carol", &config, &reflector);
    let report = carol.pump(&reflector).unwrap();
    assert_eq!(report.skipped, 0);
    for client in clients.iter_mut() {
        client.pump(&reflector).unwrap();
    }
    assert_eq!(carol.state_hash().unwrap(), clients[0].state_hash().unwrap());
}

#[test]
fn persisted_session_resumes_where_it_stopped() {
    let config = SessionConfig {
        persist_period_ms: 700,
        ..SessionConfig::default()
    };
    let reflector = InMemoryReflector::new();
    let clients = busy_session(&config, &reflector);
    let dir = temp_dir("late-join-store");
    let store = SessionStore::new(&dir, CodecKind::Json);
    clients[0].save_to(&store).unwrap();

    let mut restored = store.restore(config.clone(), builtin_behaviors()).unwrap();
    assert_eq!(restored.state_hash().unwrap(), clients[0].state_hash().unwrap());

    let (snapshot, journal) = store.load().unwrap();
    assert_eq!(snapshot.seq() + journal.len() as u64, clients[0].model().seq());

    reflector.tick(50).unwrap();
    let next = reflector.history().unwrap().pop().expect("tick");
    restored.apply(&next).unwrap();
    assert_eq!(restored.seq(), next.seq);
    fs::remove_dir_all(&dir).unwrap();
}

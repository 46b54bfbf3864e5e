use shared_world::text::{EditKind, Run};
use shared_world::{
    actor_scope, builtin_behaviors, builtin_pawns, ActorId, Client, InMemoryReflector,
    SessionConfig, SessionError, SessionRootBehavior, AVATAR_MOVE_EVENT,
};

const DEFAULT_ROUNDS: u64 = 10;
const TICK_MS: u64 = 100;

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();
    if matches!(args.get(1).map(|s| s.as_str()), Some("--help") | Some("-h")) {
        println!("Usage: shared_world_demo [rounds]");
        println!("Runs two clients through a session, then joins a third from a snapshot.");
        return;
    }

    let rounds = match args.get(1) {
        Some(raw) => match raw.parse::<u64>() {
            Ok(rounds) => rounds,
            Err(_) => {
                eprintln!("Invalid rounds: {raw}");
                std::process::exit(1);
            }
        },
        None => DEFAULT_ROUNDS,
    };

    let config = match SessionConfig::from_default_sources() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(config, rounds) {
        eprintln!("session error: {err}");
        std::process::exit(1);
    }
}

fn run(config: SessionConfig, rounds: u64) -> Result<(), SessionError> {
    let reflector = InMemoryReflector::new();
    let join = |id: &str| {
        Client::join(
            id,
            config.clone(),
            builtin_behaviors(),
            builtin_pawns(),
            &reflector,
        )
    };
    let mut alice = join("alice")?;
    let mut bob = join("bob")?;

    for round in 0..rounds {
        let (writer, letter) = if round % 2 == 0 {
            (&alice, "a")
        } else {
            (&bob, "b")
        };
        if let Some(avatar) = avatar_of(writer) {
            writer.publish(
                &reflector,
                &actor_scope(avatar),
                AVATAR_MOVE_EVENT,
                serde_json::json!({ "dx": 0.5, "dz": 0.0, "jump": if round % 3 == 0 { 2.0 } else { 0.0 } }),
            )?;
        }
        writer.edit_document(
            &reflector,
            EditKind::Insert {
                runs: vec![Run::new(letter)],
            },
        )?;
        reflector.tick(TICK_MS)?;
        alice.pump(&reflector)?;
        bob.pump(&reflector)?;
    }

    let mut carol = join("carol")?;
    for client in [&mut alice, &mut bob, &mut carol] {
        client.pump(&reflector)?;
    }

    println!("seq: {}", reflector.last_seq()?);
    println!("time: {}ms", reflector.time()?);
    if let Some(snapshot) = reflector.latest_snapshot()? {
        println!("latest snapshot: seq {} ({} bytes)", snapshot.seq, snapshot.blob.len());
    }
    for client in [&alice, &bob, &carol] {
        println!(
            "{}: seq={} pawns={} hash={}",
            client.id(),
            client.model().seq(),
            client.view().pawn_count(),
            client.state_hash()?
        );
    }
    Ok(())
}

fn avatar_of(client: &Client) -> Option<ActorId> {
    let root = client.model().root()?;
    let root = client.model().actor(root)?;
    SessionRootBehavior::avatar_of(&root, client.id())
}

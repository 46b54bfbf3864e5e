use shared_world::text::{EditKind, Run, Selection, TextStyle};
use shared_world::{
    builtin_behaviors, builtin_pawns, Client, ClientStatus, InMemoryReflector, Pawn,
    SessionConfig, TextPawn,
};

fn join(id: &str, reflector: &InMemoryReflector) -> Client {
    Client::join(
        id,
        SessionConfig::default(),
        builtin_behaviors(),
        builtin_pawns(),
        reflector,
    )
    .expect("join")
}

fn text(client: &Client) -> String {
    document(client).plain_text()
}

fn document(client: &Client) -> &shared_world::text::DocumentModel {
    let id = client.document_actor().expect("document actor");
    client
        .model()
        .actor(id)
        .and_then(|actor| actor.document())
        .expect("document")
}

fn insert(text: &str) -> EditKind {
    EditKind::Insert {
        runs: vec![Run::new(text)],
    }
}

fn select(start: usize, end: usize) -> EditKind {
    EditKind::Select {
        start,
        end,
        bol: false,
    }
}

#[test]
fn lagging_selection_is_reconciled_and_styled() {
    let reflector = InMemoryReflector::new();
    let mut alice = join("alice", &reflector);
    let mut bob = join("bob", &reflector);
    alice.pump(&reflector).unwrap();
    bob.pump(&reflector).unwrap();

    alice.edit_document(&reflector, insert("hello world")).unwrap();
    alice.pump(&reflector).unwrap();
    bob.pump(&reflector).unwrap();

    // alice prepends while bob, not yet seeing it, selects "world"
    alice.edit_document(&reflector, select(0, 0)).unwrap();
    alice.pump(&reflector).unwrap();
    alice.edit_document(&reflector, insert("big ")).unwrap();
    bob.edit_document(&reflector, select(6, 11)).unwrap();
    alice.pump(&reflector).unwrap();
    bob.pump(&reflector).unwrap();

    assert_eq!(text(&bob), "big hello world");
    let selection = document(&bob).doc().selection("bob");
    assert_eq!((selection.start, selection.end), (10, 15));

    bob.edit_document(
        &reflector,
        EditKind::SetStyle {
            style: TextStyle::bold(),
            merge: false,
        },
    )
    .unwrap();
    alice.pump(&reflector).unwrap();
    bob.pump(&reflector).unwrap();

    for client in [&alice, &bob] {
        let doc = document(client);
        assert_eq!(doc.style_at(10), Some(TextStyle::bold()));
        assert_eq!(doc.style_at(14), Some(TextStyle::bold()));
        assert_eq!(doc.style_at(4), None);
    }
    assert_eq!(alice.state_hash().unwrap(), bob.state_hash().unwrap());
}

#[test]
fn own_unpumped_edits_shift_a_later_selection() {
    let reflector = InMemoryReflector::new();
    let mut alice = join("alice", &reflector);
    alice.pump(&reflector).unwrap();
    alice.edit_document(&reflector, insert("abc")).unwrap();
    alice.pump(&reflector).unwrap();
    alice.edit_document(&reflector, select(0, 0)).unwrap();
    alice.pump(&reflector).unwrap();

    // all three are stamped against "abc"; the selection covers "b"
    alice.edit_document(&reflector, insert("xy")).unwrap();
    alice.edit_document(&reflector, select(1, 2)).unwrap();
    alice
        .edit_document(&reflector, EditKind::Delete { backspace: false })
        .unwrap();
    alice.pump(&reflector).unwrap();

    assert_eq!(text(&alice), "xyac");
    assert_eq!(document(&alice).doc().selection("alice"), Selection::caret(3));
}

#[test]
fn undo_reverts_only_the_callers_edit() {
    let reflector = InMemoryReflector::new();
    let mut alice = join("alice", &reflector);
    let mut bob = join("bob", &reflector);
    alice.pump(&reflector).unwrap();
    bob.pump(&reflector).unwrap();

    alice.edit_document(&reflector, insert("hello")).unwrap();
    alice.pump(&reflector).unwrap();
    bob.pump(&reflector).unwrap();
    bob.edit_document(&reflector, select(5, 5)).unwrap();
    bob.pump(&reflector).unwrap();
    bob.edit_document(&reflector, insert(" there")).unwrap();
    bob.pump(&reflector).unwrap();
    alice.pump(&reflector).unwrap();
    assert_eq!(text(&alice), "hello there");

    alice.edit_document(&reflector, EditKind::Undo).unwrap();
    alice.pump(&reflector).unwrap();
    bob.pump(&reflector).unwrap();

    assert_eq!(text(&alice), " there");
    assert_eq!(text(&bob), " there");
    assert_eq!(alice.state_hash().unwrap(), bob.state_hash().unwrap());
}

#[test]
fn undo_without_history_changes_nothing() {
    let reflector = InMemoryReflector::new();
    let mut alice = join("alice", &reflector);
    alice.pump(&reflector).unwrap();
    alice.edit_document(&reflector, EditKind::Undo).unwrap();
    let report = alice.pump(&reflector).unwrap();
    assert_eq!(report.recoverable_errors, 1);
    assert_eq!(*alice.status(), ClientStatus::Connected);
    assert_eq!(document(&alice).timezone(), 0);
}

#[test]
fn caret_of_other_users_moves_with_inserts() {
    let reflector = InMemoryReflector::new();
    let mut alice = join("alice", &reflector);
    let mut bob = join("bob", &reflector);
    alice.pump(&reflector).unwrap();
    bob.pump(&reflector).unwrap();

    alice.edit_document(&reflector, insert("abcdef")).unwrap();
    alice.pump(&reflector).unwrap();
    bob.pump(&reflector).unwrap();
    bob.edit_document(&reflector, select(3, 3)).unwrap();
    bob.pump(&reflector).unwrap();
    alice.pump(&reflector).unwrap();

    alice.edit_document(&reflector, select(0, 0)).unwrap();
    alice.pump(&reflector).unwrap();
    alice.edit_document(&reflector, insert("xy")).unwrap();
    alice.pump(&reflector).unwrap();

    assert_eq!(document(&alice).doc().selection("bob"), Selection::caret(5));
    assert_eq!(text(&alice), "xyabcdef");
}

#[test]
fn text_pawn_follows_the_document() {
    let reflector = InMemoryReflector::new();
    let mut alice = join("alice", &reflector);
    alice.pump(&reflector).unwrap();
    let long = "lorem ipsum dolor sit amet consectetur adipiscing elit sed do eiusmod";
    alice.edit_document(&reflector, insert(long)).unwrap();
    alice.pump(&reflector).unwrap();

    let id = alice.document_actor().unwrap();
    let summary = alice.view().pawn(id).expect("text pawn").summary();
    assert_eq!(summary["text"], long);
    assert_eq!(summary["relayouts"], 2);
    let lines = summary["lines"].as_u64().expect("lines");
    assert!(lines >= 2, "{lines} lines");

    let standalone = TextPawn::new(
        &alice.model().actor(id).expect("document"),
        "alice",
        1_000.0,
    );
    assert_eq!(standalone.layout().lines.len(), 1);
    assert_eq!(standalone.text(), long);
}

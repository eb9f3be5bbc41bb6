use std::collections::BTreeSet;

use contracts::{RoomStatus, HUNT_TARGET_CHALLENGES};
use hunt_api::{HuntError, HuntService};
use hunt_core::ledger::{self, CompletionStatus};
use hunt_core::OwningIdentity;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn service() -> HuntService {
    HuntService::open_in_memory().expect("in-memory service")
}

fn interests(tags: &[&str]) -> BTreeSet<String> {
    tags.iter().map(|tag| tag.to_string()).collect()
}

fn create(service: &mut HuntService, code: &str, city: &str, host: &str) {
    service
        .create_room(Some(code), city, host, None, None, &BTreeSet::new())
        .expect("create room");
}

#[test]
fn small_city_pool_selects_everything() {
    let mut service = service();
    create(&mut service, "ABC-123", "caracas", "d1");

    let room = service
        .start_hunt_with_rng("ABC-123", "d1", None, &mut StdRng::seed_from_u64(7))
        .expect("start hunt");

    let selected = room.selected_challenge_ids.expect("selection present");
    assert_eq!(selected.len(), 10);
    assert_eq!(room.total_challenges, 10);
    assert_eq!(room.status, RoomStatus::InProgress);
}

#[test]
fn large_city_pool_selects_the_target_count() {
    let mut service = service();
    create(&mut service, "LIS-001", "lisbon", "d1");

    let room = service
        .start_hunt_with_rng("LIS-001", "d1", None, &mut StdRng::seed_from_u64(11))
        .expect("start hunt");

    let selected = room.selected_challenge_ids.expect("selection present");
    assert_eq!(selected.len(), HUNT_TARGET_CHALLENGES);
    assert_eq!(room.total_challenges, HUNT_TARGET_CHALLENGES as u32);

    let distinct: BTreeSet<u32> = selected.iter().copied().collect();
    assert_eq!(distinct.len(), selected.len());
}

#[test]
fn non_host_cannot_start_and_room_stays_waiting() {
    let mut service = service();
    create(&mut service, "ABC-123", "caracas", "d1");
    service
        .join_room("ABC-123", "d2", None, Some("Maya"), &interests(&["food"]))
        .expect("join");

    let result = service.start_hunt_with_rng("ABC-123", "d2", None, &mut StdRng::seed_from_u64(1));
    assert!(matches!(result, Err(HuntError::Forbidden(_))));

    let room = service.room_with_participants("ABC-123").expect("room");
    assert_eq!(room.room.status, RoomStatus::Waiting);
    assert!(room.room.selected_challenge_ids.is_none());
}

#[test]
fn start_is_rejected_once_in_progress() {
    let mut service = service();
    create(&mut service, "ABC-123", "caracas", "d1");
    service
        .start_hunt_with_rng("ABC-123", "d1", None, &mut StdRng::seed_from_u64(1))
        .expect("start");

    let replay = service.start_hunt_with_rng("ABC-123", "d1", None, &mut StdRng::seed_from_u64(2));
    assert!(matches!(replay, Err(HuntError::InvalidState(_))));
}

#[test]
fn completion_statuses_partition_across_devices() {
    let mut service = service();
    create(&mut service, "ABC-123", "caracas", "d1");
    service
        .join_room("ABC-123", "d2", None, Some("Maya"), &BTreeSet::new())
        .expect("join");
    let room = service
        .start_hunt_with_rng("ABC-123", "d1", None, &mut StdRng::seed_from_u64(3))
        .expect("start");
    let challenge_id = room.selected_challenge_ids.expect("selection")[0];

    service
        .add_completion("ABC-123", challenge_id, "d1", None, Some("Ana"))
        .expect("d1 completes");

    let completions = service.completions("ABC-123").expect("completions");
    let viewer_d1 = OwningIdentity::resolve("d1", None);
    let viewer_d2 = OwningIdentity::resolve("d2", None);

    assert_eq!(
        ledger::challenge_status(&completions, challenge_id, &viewer_d1),
        CompletionStatus::CompletedByViewer
    );
    assert_eq!(
        ledger::challenge_status(&completions, challenge_id, &viewer_d2),
        CompletionStatus::CompletedByOthers
    );

    service
        .add_completion("ABC-123", challenge_id, "d2", None, Some("Maya"))
        .expect("d2 completes");
    let completions = service.completions("ABC-123").expect("completions");
    assert_eq!(
        ledger::challenge_status(&completions, challenge_id, &viewer_d1),
        CompletionStatus::CompletedByViewerAndOthers
    );
}

#[test]
fn completion_is_idempotent_per_identity() {
    let mut service = service();
    create(&mut service, "ABC-123", "caracas", "d1");
    let room = service
        .start_hunt_with_rng("ABC-123", "d1", None, &mut StdRng::seed_from_u64(5))
        .expect("start");
    let challenge_id = room.selected_challenge_ids.expect("selection")[0];

    let first = service
        .add_completion("ABC-123", challenge_id, "d1", None, Some("Ana"))
        .expect("first");
    let second = service
        .add_completion("ABC-123", challenge_id, "d1", None, Some("Ana"))
        .expect("replay");

    assert_eq!(first.id, second.id);
    assert_eq!(service.completions("ABC-123").expect("rows").len(), 1);
}

#[test]
fn account_identity_spans_devices() {
    let mut service = service();
    create(&mut service, "ABC-123", "caracas", "d1");
    let room = service
        .start_hunt_with_rng("ABC-123", "d1", None, &mut StdRng::seed_from_u64(5))
        .expect("start");
    let challenge_id = room.selected_challenge_ids.expect("selection")[0];

    // Same signed-in person from a phone and a tablet.
    service
        .add_completion("ABC-123", challenge_id, "d1", Some("acct-1"), Some("Ana"))
        .expect("phone");
    service
        .add_completion("ABC-123", challenge_id, "d9", Some("acct-1"), Some("Ana"))
        .expect("tablet replay");

    let completions = service.completions("ABC-123").expect("rows");
    assert_eq!(completions.len(), 1);

    let viewer = OwningIdentity::resolve("d9", Some("acct-1"));
    assert_eq!(
        ledger::challenge_status(&completions, challenge_id, &viewer),
        CompletionStatus::CompletedByViewer
    );
}

#[test]
fn completions_are_rejected_outside_the_selection() {
    let mut service = service();
    create(&mut service, "ABC-123", "caracas", "d1");

    let before_start = service.add_completion("ABC-123", 101, "d1", None, None);
    assert!(matches!(before_start, Err(HuntError::InvalidState(_))));

    service
        .start_hunt_with_rng("ABC-123", "d1", None, &mut StdRng::seed_from_u64(5))
        .expect("start");
    let unknown = service.add_completion("ABC-123", 999, "d1", None, None);
    assert!(matches!(unknown, Err(HuntError::InvalidArgument(_))));
}

#[test]
fn uncomplete_removes_only_the_callers_mark() {
    let mut service = service();
    create(&mut service, "ABC-123", "caracas", "d1");
    let room = service
        .start_hunt_with_rng("ABC-123", "d1", None, &mut StdRng::seed_from_u64(5))
        .expect("start");
    let challenge_id = room.selected_challenge_ids.expect("selection")[0];

    service
        .add_completion("ABC-123", challenge_id, "d1", None, None)
        .expect("d1");
    service
        .add_completion("ABC-123", challenge_id, "d2", None, None)
        .expect("d2");

    service
        .remove_completion("ABC-123", challenge_id, "d1", None)
        .expect("remove d1");

    let completions = service.completions("ABC-123").expect("rows");
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].completed_by_device_id, "d2");

    // Removing an absent mark is a no-op.
    service
        .remove_completion("ABC-123", challenge_id, "d1", None)
        .expect("idempotent remove");
}

#[test]
fn swap_preserves_length_and_untouched_positions() {
    let mut service = service();
    create(&mut service, "LIS-001", "lisbon", "d1");
    let room = service
        .start_hunt_with_rng("LIS-001", "d1", None, &mut StdRng::seed_from_u64(13))
        .expect("start");
    let before = room.selected_challenge_ids.expect("selection");

    let to_replace = [before[2], before[7]];
    let room = service
        .swap_challenges_with_rng("LIS-001", &to_replace, &mut StdRng::seed_from_u64(14))
        .expect("swap");
    let after = room.selected_challenge_ids.expect("selection");

    assert_eq!(after.len(), before.len());
    assert!(!after.contains(&to_replace[0]));
    assert!(!after.contains(&to_replace[1]));

    for (index, id) in before.iter().enumerate() {
        if !to_replace.contains(id) {
            assert_eq!(after[index], *id, "untouched position {index} moved");
        }
    }

    let distinct: BTreeSet<u32> = after.iter().copied().collect();
    assert_eq!(distinct.len(), after.len());
}

#[test]
fn swap_rejects_unselected_ids_and_exhausted_pools() {
    let mut service = service();
    create(&mut service, "ABC-123", "caracas", "d1");
    let room = service
        .start_hunt_with_rng("ABC-123", "d1", None, &mut StdRng::seed_from_u64(9))
        .expect("start");
    let selected = room.selected_challenge_ids.expect("selection");

    let unselected = service.swap_challenges_with_rng(
        "ABC-123",
        &[999],
        &mut StdRng::seed_from_u64(9),
    );
    assert!(matches!(unselected, Err(HuntError::InvalidArgument(_))));

    // Caracas has 10 eligible challenges and all 10 are in play.
    let exhausted = service.swap_challenges_with_rng(
        "ABC-123",
        &selected[..1],
        &mut StdRng::seed_from_u64(9),
    );
    assert!(matches!(
        exhausted,
        Err(HuntError::InsufficientPool {
            requested: 1,
            available: 0,
        })
    ));
}

#[test]
fn room_completion_is_gated_and_idempotent() {
    let mut service = service();
    create(&mut service, "ABC-123", "caracas", "d1");

    let early = service.complete_room("ABC-123");
    assert!(matches!(early, Err(HuntError::InvalidState(_))));

    service
        .start_hunt_with_rng("ABC-123", "d1", None, &mut StdRng::seed_from_u64(4))
        .expect("start");
    let room = service.complete_room("ABC-123").expect("complete");
    assert_eq!(room.status, RoomStatus::Completed);

    let again = service.complete_room("ABC-123").expect("replay");
    assert_eq!(again.status, RoomStatus::Completed);
}

#[test]
fn joining_again_links_the_account_instead_of_duplicating() {
    let mut service = service();
    create(&mut service, "ABC-123", "caracas", "d1");
    service
        .join_room("ABC-123", "d2", None, None, &BTreeSet::new())
        .expect("anonymous join");

    let room = service
        .join_room(
            "ABC-123",
            "d2",
            Some("acct-2"),
            Some("Maya"),
            &interests(&["art"]),
        )
        .expect("signed-in rejoin");

    assert_eq!(room.participants.len(), 2);
    let maya = room
        .participants
        .iter()
        .find(|participant| participant.device_id == "d2")
        .expect("row kept");
    assert_eq!(maya.account_id.as_deref(), Some("acct-2"));
    assert_eq!(maya.display_name.as_deref(), Some("Maya"));
    assert_eq!(maya.interests, interests(&["art"]));
}

#[test]
fn leaderboard_counts_per_identity_with_name_fallback() {
    let mut service = service();
    create(&mut service, "ABC-123", "caracas", "d1");
    let room = service
        .start_hunt_with_rng("ABC-123", "d1", None, &mut StdRng::seed_from_u64(21))
        .expect("start");
    let selected = room.selected_challenge_ids.expect("selection");

    service
        .add_completion("ABC-123", selected[0], "d1", None, Some("Ana"))
        .expect("c1");
    service
        .add_completion("ABC-123", selected[1], "d1", None, Some("Ana"))
        .expect("c2");
    service
        .add_completion("ABC-123", selected[0], "d2", None, None)
        .expect("c3");

    let board = service.leaderboard("ABC-123").expect("leaderboard");
    assert_eq!(board.len(), 2);
    assert_eq!(board[0].name, "Ana");
    assert_eq!(board[0].tasks_completed, 2);
    assert_eq!(board[1].name, "Explorer");
    assert_eq!(board[1].tasks_completed, 1);
}

#[test]
fn room_summaries_carry_live_completed_counts() {
    let mut service = service();
    create(&mut service, "ABC-123", "caracas", "d1");
    let room = service
        .start_hunt_with_rng("ABC-123", "d1", None, &mut StdRng::seed_from_u64(2))
        .expect("start");
    let selected = room.selected_challenge_ids.expect("selection");

    service
        .add_completion("ABC-123", selected[0], "d1", None, None)
        .expect("c1");
    service
        .add_completion("ABC-123", selected[1], "d1", None, None)
        .expect("c2");
    // Two identities on one challenge still count it once.
    service
        .add_completion("ABC-123", selected[0], "d2", None, None)
        .expect("c3");

    let summaries = service.rooms_by_device("d1").expect("summaries");
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].completed_count, 2);

    assert!(service.rooms_by_device("ghost").expect("none").is_empty());
}

//! Read-side derivations over a completion-ledger snapshot. Nothing here
//! is persisted; clients re-derive these views from each poll.

use std::collections::BTreeSet;

use contracts::{Completion, LeaderboardEntry};

use crate::identity::OwningIdentity;

/// How a challenge looks to a particular viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    Incomplete,
    CompletedByViewer,
    CompletedByOthers,
    CompletedByViewerAndOthers,
}

/// Classify one challenge by partitioning its live completions into the
/// viewer's and everyone else's.
pub fn challenge_status(
    completions: &[Completion],
    challenge_id: u32,
    viewer: &OwningIdentity,
) -> CompletionStatus {
    let mut by_viewer = false;
    let mut by_others = false;

    for completion in completions {
        if completion.challenge_id != challenge_id {
            continue;
        }
        if OwningIdentity::of_completion(completion) == *viewer {
            by_viewer = true;
        } else {
            by_others = true;
        }
    }

    match (by_viewer, by_others) {
        (false, false) => CompletionStatus::Incomplete,
        (true, false) => CompletionStatus::CompletedByViewer,
        (false, true) => CompletionStatus::CompletedByOthers,
        (true, true) => CompletionStatus::CompletedByViewerAndOthers,
    }
}

/// Challenge ids with at least one live completion by anyone, the input to
/// step gating.
pub fn completed_challenge_ids(completions: &[Completion]) -> BTreeSet<u32> {
    completions
        .iter()
        .map(|completion| completion.challenge_id)
        .collect()
}

/// Completions counted for a challenge: distinct owning identities, not
/// raw rows.
pub fn distinct_owner_count(completions: &[Completion], challenge_id: u32) -> usize {
    completions
        .iter()
        .filter(|completion| completion.challenge_id == challenge_id)
        .map(|completion| OwningIdentity::of_completion(completion).owner_key())
        .collect::<BTreeSet<String>>()
        .len()
}

/// Per-identity completion counts, descending; ties keep arrival order
/// (first completion seen in the snapshot wins the higher placing).
pub fn leaderboard(completions: &[Completion]) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = Vec::new();

    for completion in completions {
        let key = OwningIdentity::of_completion(completion).owner_key();
        match entries.iter_mut().find(|entry| entry.id == key) {
            Some(entry) => {
                entry.tasks_completed += 1;
                if entry.name == DEFAULT_DISPLAY_NAME {
                    if let Some(name) = non_blank(completion.completed_by_display_name.as_deref()) {
                        entry.name = name.to_string();
                    }
                }
            }
            None => entries.push(LeaderboardEntry {
                id: key,
                name: non_blank(completion.completed_by_display_name.as_deref())
                    .unwrap_or(DEFAULT_DISPLAY_NAME)
                    .to_string(),
                tasks_completed: 1,
            }),
        }
    }

    entries.sort_by(|a, b| b.tasks_completed.cmp(&a.tasks_completed));
    entries
}

const DEFAULT_DISPLAY_NAME: &str = "Explorer";

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion(
        id: i64,
        challenge_id: u32,
        device_id: &str,
        account_id: Option<&str>,
        name: Option<&str>,
    ) -> Completion {
        Completion {
            id,
            room_code: "ABC-123".to_string(),
            challenge_id,
            completed_by_device_id: device_id.to_string(),
            completed_by_account_id: account_id.map(str::to_string),
            completed_by_display_name: name.map(str::to_string),
            completed_at: format!("2026-01-01T00:00:{id:02}Z"),
        }
    }

    #[test]
    fn status_partitions_by_owning_identity() {
        let snapshot = vec![completion(1, 3, "d1", None, None)];
        let d1 = OwningIdentity::resolve("d1", None);
        let d2 = OwningIdentity::resolve("d2", None);

        assert_eq!(
            challenge_status(&snapshot, 3, &d1),
            CompletionStatus::CompletedByViewer
        );
        assert_eq!(
            challenge_status(&snapshot, 3, &d2),
            CompletionStatus::CompletedByOthers
        );
        assert_eq!(
            challenge_status(&snapshot, 4, &d1),
            CompletionStatus::Incomplete
        );
    }

    #[test]
    fn viewer_and_others_when_both_completed() {
        let snapshot = vec![
            completion(1, 3, "d1", None, None),
            completion(2, 3, "d2", None, None),
        ];
        let d1 = OwningIdentity::resolve("d1", None);
        assert_eq!(
            challenge_status(&snapshot, 3, &d1),
            CompletionStatus::CompletedByViewerAndOthers
        );
    }

    #[test]
    fn signed_in_viewer_matches_completion_from_another_device() {
        let snapshot = vec![completion(1, 3, "d_old", Some("user_9"), None)];
        let viewer = OwningIdentity::resolve("d_new", Some("user_9"));
        assert_eq!(
            challenge_status(&snapshot, 3, &viewer),
            CompletionStatus::CompletedByViewer
        );
    }

    #[test]
    fn distinct_owners_collapse_duplicate_rows() {
        let snapshot = vec![
            completion(1, 3, "d_phone", Some("user_9"), None),
            completion(2, 3, "d_laptop", Some("user_9"), None),
            completion(3, 3, "d2", None, None),
        ];
        assert_eq!(distinct_owner_count(&snapshot, 3), 2);
    }

    #[test]
    fn leaderboard_sorts_descending_with_stable_ties() {
        let snapshot = vec![
            completion(1, 1, "d1", None, Some("Ana")),
            completion(2, 1, "d2", None, None),
            completion(3, 2, "d2", None, Some("Ben")),
            completion(4, 2, "d3", None, None),
        ];
        let board = leaderboard(&snapshot);

        assert_eq!(board.len(), 3);
        assert_eq!(board[0].id, "dev:d2");
        assert_eq!(board[0].tasks_completed, 2);
        assert_eq!(board[0].name, "Ben");
        // d1 arrived before d3; the tie keeps that order.
        assert_eq!(board[1].id, "dev:d1");
        assert_eq!(board[1].name, "Ana");
        assert_eq!(board[2].id, "dev:d3");
        assert_eq!(board[2].name, "Explorer");
    }
}

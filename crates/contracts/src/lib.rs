//! Cross-boundary contracts for the hunt service: wire DTOs shared by the
//! core engine, the API server, and clients, plus the error taxonomy.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Challenges assigned to a room when the host starts the hunt.
pub const HUNT_TARGET_CHALLENGES: usize = 15;
/// Challenges per gated step on the hunt page.
pub const CHALLENGES_PER_STEP: usize = 3;
/// Clients poll room and ledger state on this fixed interval.
pub const POLL_INTERVAL_MS: u64 = 2000;

/// Room codes are two groups of three drawn from this alphabet, e.g. `ABC-123`.
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const ROOM_CODE_GROUP_LEN: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub challenge_count: u32,
}

/// One location-based task. Immutable, sourced from the catalog provider;
/// the core never creates or mutates challenges.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub id: u32,
    pub caption: String,
    pub image_url: String,
    #[serde(default)]
    pub interest_tags: BTreeSet<String>,
    /// Placeholder entries pad out a city page but are never dealt into a
    /// hunt or drawn by a swap.
    #[serde(default)]
    pub placeholder: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    InProgress,
    Completed,
}

impl RoomStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "waiting" => Some(Self::Waiting),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A shared hunt session. `selected_challenge_ids` stays `None` until the
/// host starts the hunt; once set its length equals `total_challenges` and
/// only the swap operation may rewrite elements. `status` never regresses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub code: String,
    pub city_id: String,
    pub status: RoomStatus,
    pub host_device_id: String,
    pub host_account_id: Option<String>,
    pub selected_challenge_ids: Option<Vec<u32>>,
    pub total_challenges: u32,
    pub created_at: String,
    pub updated_at: String,
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "code={} city={} status={} challenges={}",
            self.code, self.city_id, self.status, self.total_challenges
        )
    }
}

/// One person in a room. Uniqueness is per device within a room, except
/// that an authenticated re-join from a new device reuses the existing
/// account-linked row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: i64,
    pub room_code: String,
    pub device_id: String,
    pub account_id: Option<String>,
    pub display_name: Option<String>,
    #[serde(default)]
    pub interests: BTreeSet<String>,
    pub joined_at: String,
    pub updated_at: String,
}

/// A live record that an owning identity finished a challenge in a room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    pub id: i64,
    pub room_code: String,
    pub challenge_id: u32,
    pub completed_by_device_id: String,
    pub completed_by_account_id: Option<String>,
    pub completed_by_display_name: Option<String>,
    pub completed_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub id: String,
    pub name: String,
    pub tasks_completed: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomWithParticipants {
    #[serde(flatten)]
    pub room: Room,
    pub participants: Vec<Participant>,
}

/// Room plus its live completed-challenge count, recomputed from the
/// ledger on every read so history views never drift.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    #[serde(flatten)]
    pub room: Room,
    pub completed_count: u32,
}

impl fmt::Display for RoomSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} completed={}/{}",
            self.room, self.completed_count, self.room.total_challenges
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Conflict,
    InvalidState,
    Forbidden,
    InvalidArgument,
    InsufficientPool,
    InternalError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub error_code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(error_code: ErrorCode, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            error_code,
            message: message.into(),
            details,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{:?}: {} ({details})", self.error_code, self.message),
            None => write!(f, "{:?}: {}", self.error_code, self.message),
        }
    }
}

//! Room and hunt-session service: room lifecycle, participant identity
//! reconciliation, interest-weighted challenge assignment, and the
//! multi-writer completion ledger, backed by SQLite and exposed over HTTP.

mod catalog;
mod server;
mod store;

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use contracts::{
    Challenge, Completion, LeaderboardEntry, Participant, Room, RoomStatus, RoomSummary,
    RoomWithParticipants, HUNT_TARGET_CHALLENGES, ROOM_CODE_ALPHABET, ROOM_CODE_GROUP_LEN,
};
use hunt_core::{ledger, selector, OwningIdentity};
use rand::Rng;
use tracing::info;

pub use catalog::{Catalog, CatalogError, CATALOG_PATH_ENV};
pub use server::{default_sqlite_path, serve, ServerError};
pub use store::{HuntStore, StoreError};

/// Collision retries before giving up on code allocation. The 36^6 code
/// space makes exhausting this effectively impossible.
const CODE_ALLOCATION_ATTEMPTS: usize = 32;

#[derive(Debug)]
pub enum HuntError {
    NotFound(String),
    InvalidState(String),
    Forbidden(String),
    InvalidArgument(String),
    InsufficientPool { requested: usize, available: usize },
    Catalog(CatalogError),
    Store(StoreError),
}

impl fmt::Display for HuntError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(what) => write!(f, "not found: {what}"),
            Self::InvalidState(detail) => write!(f, "invalid state: {detail}"),
            Self::Forbidden(detail) => write!(f, "forbidden: {detail}"),
            Self::InvalidArgument(detail) => write!(f, "invalid argument: {detail}"),
            Self::InsufficientPool {
                requested,
                available,
            } => write!(
                f,
                "not enough unused challenges: requested {requested}, available {available}"
            ),
            Self::Catalog(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for HuntError {}

impl From<StoreError> for HuntError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<CatalogError> for HuntError {
    fn from(value: CatalogError) -> Self {
        Self::Catalog(value)
    }
}

/// Stateless-per-request facade over the durable store. Each operation
/// resolves synchronously against SQLite; the server wraps this in a
/// mutex and every handler takes the lock for the duration of one call.
#[derive(Debug)]
pub struct HuntService {
    store: HuntStore,
    catalog: Catalog,
}

impl HuntService {
    pub fn new(store: HuntStore, catalog: Catalog) -> Self {
        Self { store, catalog }
    }

    /// Store at `path`, catalog from `HUNT_CATALOG_PATH` or built-in.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HuntError> {
        Ok(Self::new(HuntStore::open(path)?, Catalog::load()?))
    }

    pub fn open_in_memory() -> Result<Self, HuntError> {
        Ok(Self::new(HuntStore::open_in_memory()?, Catalog::builtin()))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Create a room and its host participant. A colliding code is
    /// regenerated and retried internally; callers never see `Conflict`.
    /// The insert's primary-key failure is the correctness backstop, not
    /// any prior existence check.
    pub fn create_room(
        &mut self,
        requested_code: Option<&str>,
        city_id: &str,
        host_device_id: &str,
        host_account_id: Option<&str>,
        display_name: Option<&str>,
        interests: &BTreeSet<String>,
    ) -> Result<RoomWithParticipants, HuntError> {
        ensure_device_id(host_device_id)?;
        if self.catalog.city(city_id).is_none() {
            return Err(HuntError::NotFound(format!("city {city_id}")));
        }

        let now = now_rfc3339();
        let host_account = non_blank(host_account_id);
        let mut rng = rand::rng();
        let mut code = match requested_code.map(str::trim).filter(|code| !code.is_empty()) {
            Some(requested) => requested.to_uppercase(),
            None => generate_room_code(&mut rng),
        };

        for _ in 0..CODE_ALLOCATION_ATTEMPTS {
            let room = Room {
                code: code.clone(),
                city_id: city_id.to_string(),
                status: RoomStatus::Waiting,
                host_device_id: host_device_id.to_string(),
                host_account_id: host_account.map(str::to_string),
                selected_challenge_ids: None,
                total_challenges: 0,
                created_at: now.clone(),
                updated_at: now.clone(),
            };

            match self.store.insert_room(&room) {
                Ok(()) => {
                    self.store.insert_participant(&Participant {
                        id: 0,
                        room_code: code.clone(),
                        device_id: host_device_id.to_string(),
                        account_id: host_account.map(str::to_string),
                        display_name: non_blank(display_name).map(str::to_string),
                        interests: interests.clone(),
                        joined_at: now.clone(),
                        updated_at: now.clone(),
                    })?;
                    info!(code = %code, city_id, "room created");
                    return self.room_with_participants(&code);
                }
                Err(StoreError::DuplicateRoomCode(_)) => {
                    code = generate_room_code(&mut rng);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(HuntError::Store(StoreError::DuplicateRoomCode(code)))
    }

    /// Join, reconciling identity: an account-linked row is matched first
    /// so re-joining from a new device never duplicates a person, and a
    /// participant created anonymously is linked in place on sign-in.
    pub fn join_room(
        &mut self,
        code: &str,
        device_id: &str,
        account_id: Option<&str>,
        display_name: Option<&str>,
        interests: &BTreeSet<String>,
    ) -> Result<RoomWithParticipants, HuntError> {
        ensure_device_id(device_id)?;
        let room = self.require_room(code)?;
        let now = now_rfc3339();
        let account = non_blank(account_id);

        let existing = match account {
            Some(acct) => match self.store.participant_by_account(&room.code, acct)? {
                Some(participant) => Some(participant),
                None => self.store.participant_by_device(&room.code, device_id)?,
            },
            None => self.store.participant_by_device(&room.code, device_id)?,
        };

        match existing {
            Some(participant) => {
                let interests_json = serde_json::to_string(interests).map_err(StoreError::from)?;
                self.store.update_participant_profile(
                    participant.id,
                    account,
                    non_blank(display_name),
                    &interests_json,
                    &now,
                )?;
            }
            None => {
                self.store.insert_participant(&Participant {
                    id: 0,
                    room_code: room.code.clone(),
                    device_id: device_id.to_string(),
                    account_id: account.map(str::to_string),
                    display_name: non_blank(display_name).map(str::to_string),
                    interests: interests.clone(),
                    joined_at: now.clone(),
                    updated_at: now,
                })?;
            }
        }

        self.room_with_participants(code)
    }

    pub fn start_hunt(
        &mut self,
        code: &str,
        device_id: &str,
        account_id: Option<&str>,
    ) -> Result<Room, HuntError> {
        self.start_hunt_with_rng(code, device_id, account_id, &mut rand::rng())
    }

    /// Host-only, `waiting`-only. The waiting guard doubles as the retry
    /// guard: a replayed start cannot re-randomize a running hunt.
    pub fn start_hunt_with_rng(
        &mut self,
        code: &str,
        device_id: &str,
        account_id: Option<&str>,
        rng: &mut impl Rng,
    ) -> Result<Room, HuntError> {
        let room = self.require_room(code)?;

        let is_host = match OwningIdentity::of_room_host(&room) {
            OwningIdentity::Account(host) => non_blank(account_id) == Some(host.as_str()),
            OwningIdentity::Device(host) => device_id == host,
        };
        if !is_host {
            return Err(HuntError::Forbidden(format!(
                "only the host may start the hunt in room {code}"
            )));
        }

        if room.status != RoomStatus::Waiting {
            return Err(HuntError::InvalidState(format!(
                "room {code} is {}; the hunt can only start while waiting",
                room.status
            )));
        }

        let pool = self.eligible_pool(&room.city_id)?;
        let profiles = self.interest_profiles(code)?;
        let selected = selector::select(&pool, &profiles, HUNT_TARGET_CHALLENGES, rng);

        self.store
            .update_room_selection(code, &selected, RoomStatus::InProgress, &now_rfc3339())?;
        info!(code, selected = selected.len(), "hunt started");
        self.require_room(code)
    }

    pub fn swap_challenges(&mut self, code: &str, ids_to_replace: &[u32]) -> Result<Room, HuntError> {
        self.swap_challenges_with_rng(code, ids_to_replace, &mut rand::rng())
    }

    /// Replace exactly the given ids with fresh draws from the city's
    /// unused, non-placeholder pool. Positions of untouched ids are
    /// preserved; the whole swap fails rather than partially applying
    /// when the unused pool is too small.
    pub fn swap_challenges_with_rng(
        &mut self,
        code: &str,
        ids_to_replace: &[u32],
        rng: &mut impl Rng,
    ) -> Result<Room, HuntError> {
        let room = self.require_room(code)?;
        let Some(selected) = room.selected_challenge_ids.clone() else {
            return Err(HuntError::InvalidState(format!(
                "room {code} has no challenges to swap; the hunt has not started"
            )));
        };

        if ids_to_replace.is_empty() {
            return Err(HuntError::InvalidArgument(
                "no challenge ids to replace".to_string(),
            ));
        }
        let distinct: BTreeSet<u32> = ids_to_replace.iter().copied().collect();
        if distinct.len() != ids_to_replace.len() {
            return Err(HuntError::InvalidArgument(
                "duplicate challenge ids in swap request".to_string(),
            ));
        }
        if let Some(missing) = ids_to_replace.iter().find(|id| !selected.contains(id)) {
            return Err(HuntError::InvalidArgument(format!(
                "challenge {missing} is not currently selected in room {code}"
            )));
        }

        // Snapshot read of the current selection immediately precedes the
        // write; concurrent swaps may interleave but each write keeps the
        // length and element-uniqueness invariants.
        let selected_set: BTreeSet<u32> = selected.iter().copied().collect();
        let complement: Vec<Challenge> = self
            .eligible_pool(&room.city_id)?
            .into_iter()
            .filter(|challenge| !selected_set.contains(&challenge.id))
            .collect();

        if complement.len() < ids_to_replace.len() {
            return Err(HuntError::InsufficientPool {
                requested: ids_to_replace.len(),
                available: complement.len(),
            });
        }

        let profiles = self.interest_profiles(code)?;
        let replacements = selector::select(&complement, &profiles, ids_to_replace.len(), rng);

        let mut next = selected;
        selector::replace_in_place(&mut next, ids_to_replace, &replacements);

        self.store
            .update_room_selection(code, &next, room.status, &now_rfc3339())?;
        info!(code, swapped = ids_to_replace.len(), "challenges swapped");
        self.require_room(code)
    }

    /// Idempotent: completing an already-completed room is fine. Status
    /// never regresses, and a waiting room cannot jump straight to done.
    pub fn complete_room(&mut self, code: &str) -> Result<Room, HuntError> {
        let room = self.require_room(code)?;
        match room.status {
            RoomStatus::Waiting => Err(HuntError::InvalidState(format!(
                "room {code} is waiting; there is no hunt to complete"
            ))),
            RoomStatus::InProgress => {
                self.store
                    .update_room_status(code, RoomStatus::Completed, &now_rfc3339())?;
                info!(code, "room completed");
                self.require_room(code)
            }
            RoomStatus::Completed => Ok(room),
        }
    }

    pub fn room_with_participants(&self, code: &str) -> Result<RoomWithParticipants, HuntError> {
        let room = self.require_room(code)?;
        let participants = self.store.participants(code)?;
        Ok(RoomWithParticipants { room, participants })
    }

    pub fn rooms_by_device(&self, device_id: &str) -> Result<Vec<RoomSummary>, HuntError> {
        self.summarize(self.store.rooms_by_device(device_id)?)
    }

    pub fn rooms_by_account(&self, account_id: &str) -> Result<Vec<RoomSummary>, HuntError> {
        self.summarize(self.store.rooms_by_account(account_id)?)
    }

    pub fn all_room_summaries(&self) -> Result<Vec<RoomSummary>, HuntError> {
        self.summarize(self.store.all_rooms()?)
    }

    /// Mark complete for the requester's owning identity. Idempotent per
    /// identity; independent across identities. Rejects ids outside the
    /// room's current selection.
    pub fn add_completion(
        &mut self,
        code: &str,
        challenge_id: u32,
        device_id: &str,
        account_id: Option<&str>,
        display_name: Option<&str>,
    ) -> Result<Completion, HuntError> {
        ensure_device_id(device_id)?;
        let room = self.require_room(code)?;
        let Some(selected) = &room.selected_challenge_ids else {
            return Err(HuntError::InvalidState(format!(
                "room {code} has not started; nothing can be completed"
            )));
        };
        if !selected.contains(&challenge_id) {
            return Err(HuntError::InvalidArgument(format!(
                "challenge {challenge_id} is not assigned to room {code}"
            )));
        }

        let identity = OwningIdentity::resolve(device_id, account_id);
        let completion = self.store.add_completion(
            code,
            challenge_id,
            &identity.owner_key(),
            device_id,
            non_blank(account_id),
            non_blank(display_name),
            &now_rfc3339(),
        )?;
        Ok(completion)
    }

    pub fn remove_completion(
        &mut self,
        code: &str,
        challenge_id: u32,
        device_id: &str,
        account_id: Option<&str>,
    ) -> Result<(), HuntError> {
        ensure_device_id(device_id)?;
        self.require_room(code)?;
        let identity = OwningIdentity::resolve(device_id, account_id);
        self.store
            .remove_completion(code, challenge_id, &identity.owner_key())?;
        Ok(())
    }

    pub fn completions(&self, code: &str) -> Result<Vec<Completion>, HuntError> {
        self.require_room(code)?;
        Ok(self.store.completions(code)?)
    }

    pub fn leaderboard(&self, code: &str) -> Result<Vec<LeaderboardEntry>, HuntError> {
        let completions = self.completions(code)?;
        Ok(ledger::leaderboard(&completions))
    }

    fn require_room(&self, code: &str) -> Result<Room, HuntError> {
        self.store
            .room(code)?
            .ok_or_else(|| HuntError::NotFound(format!("room {code}")))
    }

    fn eligible_pool(&self, city_id: &str) -> Result<Vec<Challenge>, HuntError> {
        self.catalog
            .eligible_pool(city_id)
            .ok_or_else(|| HuntError::NotFound(format!("city {city_id}")))
    }

    fn interest_profiles(&self, code: &str) -> Result<Vec<BTreeSet<String>>, HuntError> {
        Ok(self
            .store
            .participants(code)?
            .into_iter()
            .map(|participant| participant.interests)
            .collect())
    }

    fn summarize(&self, rooms: Vec<Room>) -> Result<Vec<RoomSummary>, HuntError> {
        let mut summaries = Vec::with_capacity(rooms.len());
        for room in rooms {
            let completed_count = self.store.completed_challenge_count(&room.code)?;
            summaries.push(RoomSummary {
                room,
                completed_count,
            });
        }
        Ok(summaries)
    }
}

fn generate_room_code(rng: &mut impl Rng) -> String {
    let mut code = String::with_capacity(ROOM_CODE_GROUP_LEN * 2 + 1);
    for position in 0..ROOM_CODE_GROUP_LEN * 2 {
        if position == ROOM_CODE_GROUP_LEN {
            code.push('-');
        }
        let index = rng.random_range(0..ROOM_CODE_ALPHABET.len());
        code.push(ROOM_CODE_ALPHABET[index] as char);
    }
    code
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn ensure_device_id(device_id: &str) -> Result<(), HuntError> {
    if device_id.trim().is_empty() {
        return Err(HuntError::InvalidArgument(
            "deviceId must not be blank".to_string(),
        ));
    }
    Ok(())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|inner| !inner.is_empty())
}

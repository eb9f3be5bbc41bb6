//! SQLite-backed room, participant, and completion storage.
//!
//! The store holds rows and uniqueness constraints only; the room state
//! machine lives in [`crate::HuntService`]. Uniqueness is enforced where
//! correctness depends on it: `rooms.code` is the primary key (room-code
//! allocation backstop) and completions are unique per
//! `(room_code, challenge_id, owner_key)`, so idempotency per owning
//! identity survives concurrent writers.

use std::fmt;
use std::path::Path;

use contracts::{Completion, Participant, Room, RoomStatus};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    Serde(serde_json::Error),
    DuplicateRoomCode(String),
    CorruptRow(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite error: {err}"),
            Self::Serde(err) => write!(f, "serde error: {err}"),
            Self::DuplicateRoomCode(code) => write!(f, "room code already exists: {code}"),
            Self::CorruptRow(detail) => write!(f, "corrupt row: {detail}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

#[derive(Debug)]
pub struct HuntStore {
    conn: Connection,
}

struct RoomRow {
    code: String,
    city_id: String,
    status: String,
    host_device_id: String,
    host_account_id: Option<String>,
    selected_json: Option<String>,
    total_challenges: i64,
    created_at: String,
    updated_at: String,
}

struct ParticipantRow {
    id: i64,
    room_code: String,
    device_id: String,
    account_id: Option<String>,
    display_name: Option<String>,
    interests_json: String,
    joined_at: String,
    updated_at: String,
}

impl HuntStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.configure()?;
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let mut store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn insert_room(&mut self, room: &Room) -> Result<(), StoreError> {
        let selected_json = room
            .selected_challenge_ids
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let inserted = self.conn.execute(
            "INSERT INTO rooms (
                code,
                city_id,
                status,
                host_device_id,
                host_account_id,
                selected_json,
                total_challenges,
                created_at,
                updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                room.code.as_str(),
                room.city_id.as_str(),
                room.status.as_str(),
                room.host_device_id.as_str(),
                room.host_account_id.as_deref(),
                selected_json,
                i64::from(room.total_challenges),
                room.created_at.as_str(),
                room.updated_at.as_str(),
            ],
        );

        match inserted {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateRoomCode(room.code.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn room(&self, code: &str) -> Result<Option<Room>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT code, city_id, status, host_device_id, host_account_id,
                        selected_json, total_challenges, created_at, updated_at
                 FROM rooms WHERE code = ?1",
                params![code],
                room_row,
            )
            .optional()?;

        row.map(parse_room).transpose()
    }

    pub fn update_room_selection(
        &mut self,
        code: &str,
        selected: &[u32],
        status: RoomStatus,
        updated_at: &str,
    ) -> Result<(), StoreError> {
        let selected_json = serde_json::to_string(selected)?;
        self.conn.execute(
            "UPDATE rooms
             SET selected_json = ?2,
                 total_challenges = ?3,
                 status = ?4,
                 updated_at = ?5
             WHERE code = ?1",
            params![
                code,
                selected_json,
                selected.len() as i64,
                status.as_str(),
                updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn update_room_status(
        &mut self,
        code: &str,
        status: RoomStatus,
        updated_at: &str,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE rooms SET status = ?2, updated_at = ?3 WHERE code = ?1",
            params![code, status.as_str(), updated_at],
        )?;
        Ok(())
    }

    pub fn all_rooms(&self) -> Result<Vec<Room>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT code, city_id, status, host_device_id, host_account_id,
                    selected_json, total_challenges, created_at, updated_at
             FROM rooms ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([], room_row)?;

        let mut rooms = Vec::new();
        for row in rows {
            rooms.push(parse_room(row?)?);
        }
        Ok(rooms)
    }

    /// Rooms this device participates in, newest first.
    pub fn rooms_by_device(&self, device_id: &str) -> Result<Vec<Room>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT r.code, r.city_id, r.status, r.host_device_id, r.host_account_id,
                    r.selected_json, r.total_challenges, r.created_at, r.updated_at
             FROM rooms r
             JOIN participants p ON p.room_code = r.code
             WHERE p.device_id = ?1
             ORDER BY r.created_at DESC",
        )?;
        let rows = stmt.query_map(params![device_id], room_row)?;

        let mut rooms = Vec::new();
        for row in rows {
            rooms.push(parse_room(row?)?);
        }
        Ok(rooms)
    }

    pub fn rooms_by_account(&self, account_id: &str) -> Result<Vec<Room>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT r.code, r.city_id, r.status, r.host_device_id, r.host_account_id,
                    r.selected_json, r.total_challenges, r.created_at, r.updated_at
             FROM rooms r
             JOIN participants p ON p.room_code = r.code
             WHERE p.account_id = ?1
             ORDER BY r.created_at DESC",
        )?;
        let rows = stmt.query_map(params![account_id], room_row)?;

        let mut rooms = Vec::new();
        for row in rows {
            rooms.push(parse_room(row?)?);
        }
        Ok(rooms)
    }

    pub fn insert_participant(&mut self, participant: &Participant) -> Result<i64, StoreError> {
        let interests_json = serde_json::to_string(&participant.interests)?;
        self.conn.execute(
            "INSERT INTO participants (
                room_code,
                device_id,
                account_id,
                display_name,
                interests_json,
                joined_at,
                updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                participant.room_code.as_str(),
                participant.device_id.as_str(),
                participant.account_id.as_deref(),
                participant.display_name.as_deref(),
                interests_json,
                participant.joined_at.as_str(),
                participant.updated_at.as_str(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn participants(&self, room_code: &str) -> Result<Vec<Participant>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, room_code, device_id, account_id, display_name,
                    interests_json, joined_at, updated_at
             FROM participants WHERE room_code = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![room_code], participant_row)?;

        let mut participants = Vec::new();
        for row in rows {
            participants.push(parse_participant(row?)?);
        }
        Ok(participants)
    }

    pub fn participant_by_account(
        &self,
        room_code: &str,
        account_id: &str,
    ) -> Result<Option<Participant>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, room_code, device_id, account_id, display_name,
                        interests_json, joined_at, updated_at
                 FROM participants WHERE room_code = ?1 AND account_id = ?2",
                params![room_code, account_id],
                participant_row,
            )
            .optional()?;
        row.map(parse_participant).transpose()
    }

    pub fn participant_by_device(
        &self,
        room_code: &str,
        device_id: &str,
    ) -> Result<Option<Participant>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, room_code, device_id, account_id, display_name,
                        interests_json, joined_at, updated_at
                 FROM participants WHERE room_code = ?1 AND device_id = ?2",
                params![room_code, device_id],
                participant_row,
            )
            .optional()?;
        row.map(parse_participant).transpose()
    }

    /// Link an account (or refresh profile fields) on an existing row. The
    /// participant identity persists across the anonymous-to-authenticated
    /// transition; only these columns change.
    pub fn update_participant_profile(
        &mut self,
        participant_id: i64,
        account_id: Option<&str>,
        display_name: Option<&str>,
        interests_json: &str,
        updated_at: &str,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE participants
             SET account_id = COALESCE(?2, account_id),
                 display_name = COALESCE(?3, display_name),
                 interests_json = ?4,
                 updated_at = ?5
             WHERE id = ?1",
            params![
                participant_id,
                account_id,
                display_name,
                interests_json,
                updated_at,
            ],
        )?;
        Ok(())
    }

    /// Idempotent append: `INSERT OR IGNORE` rides on the
    /// `(room_code, challenge_id, owner_key)` uniqueness constraint, then
    /// the live row is read back, so a retried or concurrent add returns
    /// the surviving record instead of duplicating it.
    pub fn add_completion(
        &mut self,
        room_code: &str,
        challenge_id: u32,
        owner_key: &str,
        device_id: &str,
        account_id: Option<&str>,
        display_name: Option<&str>,
        completed_at: &str,
    ) -> Result<Completion, StoreError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO completions (
                room_code,
                challenge_id,
                owner_key,
                device_id,
                account_id,
                display_name,
                completed_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                room_code,
                i64::from(challenge_id),
                owner_key,
                device_id,
                account_id,
                display_name,
                completed_at,
            ],
        )?;

        let completion = self.conn.query_row(
            "SELECT id, room_code, challenge_id, device_id, account_id, display_name, completed_at
             FROM completions
             WHERE room_code = ?1 AND challenge_id = ?2 AND owner_key = ?3",
            params![room_code, i64::from(challenge_id), owner_key],
            completion_row,
        )?;
        Ok(completion)
    }

    /// Delete the owning identity's live record; no-op when absent.
    pub fn remove_completion(
        &mut self,
        room_code: &str,
        challenge_id: u32,
        owner_key: &str,
    ) -> Result<usize, StoreError> {
        let deleted = self.conn.execute(
            "DELETE FROM completions
             WHERE room_code = ?1 AND challenge_id = ?2 AND owner_key = ?3",
            params![room_code, i64::from(challenge_id), owner_key],
        )?;
        Ok(deleted)
    }

    /// Full snapshot in arrival order; leaderboard ties depend on it.
    pub fn completions(&self, room_code: &str) -> Result<Vec<Completion>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, room_code, challenge_id, device_id, account_id, display_name, completed_at
             FROM completions WHERE room_code = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![room_code], completion_row)?;

        let mut completions = Vec::new();
        for row in rows {
            completions.push(row?);
        }
        Ok(completions)
    }

    /// Live count of challenges with at least one completion in the room.
    /// History views call this instead of trusting a cached counter.
    pub fn completed_challenge_count(&self, room_code: &str) -> Result<u32, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT challenge_id) FROM completions WHERE room_code = ?1",
            params![room_code],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u32)
    }

    fn configure(&mut self) -> Result<(), StoreError> {
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    }

    fn migrate(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS rooms (
                code TEXT PRIMARY KEY,
                city_id TEXT NOT NULL,
                status TEXT NOT NULL,
                host_device_id TEXT NOT NULL,
                host_account_id TEXT,
                selected_json TEXT,
                total_challenges INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS participants (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                room_code TEXT NOT NULL,
                device_id TEXT NOT NULL,
                account_id TEXT,
                display_name TEXT,
                interests_json TEXT NOT NULL DEFAULT '[]',
                joined_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (room_code, device_id)
            );

            CREATE TABLE IF NOT EXISTS completions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                room_code TEXT NOT NULL,
                challenge_id INTEGER NOT NULL,
                owner_key TEXT NOT NULL,
                device_id TEXT NOT NULL,
                account_id TEXT,
                display_name TEXT,
                completed_at TEXT NOT NULL,
                UNIQUE (room_code, challenge_id, owner_key)
            );

            CREATE INDEX IF NOT EXISTS idx_participants_room ON participants(room_code);
            CREATE INDEX IF NOT EXISTS idx_participants_account ON participants(account_id);
            CREATE INDEX IF NOT EXISTS idx_completions_room ON completions(room_code);
            ",
        )?;

        self.conn.execute(
            "INSERT OR IGNORE INTO schema_migrations(version, name, applied_at)
             VALUES(1, 'initial_v1', '')",
            [],
        )?;

        Ok(())
    }
}

fn room_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RoomRow> {
    Ok(RoomRow {
        code: row.get(0)?,
        city_id: row.get(1)?,
        status: row.get(2)?,
        host_device_id: row.get(3)?,
        host_account_id: row.get(4)?,
        selected_json: row.get(5)?,
        total_challenges: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn parse_room(row: RoomRow) -> Result<Room, StoreError> {
    let status = RoomStatus::parse(&row.status).ok_or_else(|| {
        StoreError::CorruptRow(format!("room {} has status {}", row.code, row.status))
    })?;
    let selected_challenge_ids = row
        .selected_json
        .as_deref()
        .map(serde_json::from_str::<Vec<u32>>)
        .transpose()?;

    Ok(Room {
        code: row.code,
        city_id: row.city_id,
        status,
        host_device_id: row.host_device_id,
        host_account_id: row.host_account_id,
        selected_challenge_ids,
        total_challenges: row.total_challenges.max(0) as u32,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn participant_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ParticipantRow> {
    Ok(ParticipantRow {
        id: row.get(0)?,
        room_code: row.get(1)?,
        device_id: row.get(2)?,
        account_id: row.get(3)?,
        display_name: row.get(4)?,
        interests_json: row.get(5)?,
        joined_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn parse_participant(row: ParticipantRow) -> Result<Participant, StoreError> {
    let interests = serde_json::from_str(&row.interests_json)?;
    Ok(Participant {
        id: row.id,
        room_code: row.room_code,
        device_id: row.device_id,
        account_id: row.account_id,
        display_name: row.display_name,
        interests,
        joined_at: row.joined_at,
        updated_at: row.updated_at,
    })
}

fn completion_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Completion> {
    let challenge_id: i64 = row.get(2)?;
    Ok(Completion {
        id: row.get(0)?,
        room_code: row.get(1)?,
        challenge_id: challenge_id.max(0) as u32,
        completed_by_device_id: row.get(3)?,
        completed_by_account_id: row.get(4)?,
        completed_by_display_name: row.get(5)?,
        completed_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(code: &str) -> Room {
        Room {
            code: code.to_string(),
            city_id: "caracas".to_string(),
            status: RoomStatus::Waiting,
            host_device_id: "d_host".to_string(),
            host_account_id: None,
            selected_challenge_ids: None,
            total_challenges: 0,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn duplicate_room_code_is_a_distinct_error() {
        let mut store = HuntStore::open_in_memory().expect("open store");
        store.insert_room(&room("ABC-123")).expect("first insert");

        match store.insert_room(&room("ABC-123")) {
            Err(StoreError::DuplicateRoomCode(code)) => assert_eq!(code, "ABC-123"),
            other => panic!("expected DuplicateRoomCode, got {other:?}"),
        }
    }

    #[test]
    fn selection_round_trips_through_json_column() {
        let mut store = HuntStore::open_in_memory().expect("open store");
        store.insert_room(&room("ABC-123")).expect("insert");
        store
            .update_room_selection("ABC-123", &[5, 9, 2], RoomStatus::InProgress, "t1")
            .expect("update");

        let loaded = store.room("ABC-123").expect("load").expect("present");
        assert_eq!(loaded.selected_challenge_ids, Some(vec![5, 9, 2]));
        assert_eq!(loaded.total_challenges, 3);
        assert_eq!(loaded.status, RoomStatus::InProgress);
    }

    #[test]
    fn add_completion_is_idempotent_per_owner_key() {
        let mut store = HuntStore::open_in_memory().expect("open store");
        store.insert_room(&room("ABC-123")).expect("insert");

        let first = store
            .add_completion("ABC-123", 3, "dev:d1", "d1", None, None, "t1")
            .expect("first add");
        let second = store
            .add_completion("ABC-123", 3, "dev:d1", "d1", None, Some("Ana"), "t2")
            .expect("second add");

        assert_eq!(first.id, second.id);
        assert_eq!(second.completed_at, "t1", "existing row returned unchanged");
        assert_eq!(store.completions("ABC-123").expect("list").len(), 1);
    }

    #[test]
    fn different_owners_both_persist_on_the_same_challenge() {
        let mut store = HuntStore::open_in_memory().expect("open store");
        store.insert_room(&room("ABC-123")).expect("insert");

        store
            .add_completion("ABC-123", 3, "dev:d1", "d1", None, None, "t1")
            .expect("d1 add");
        store
            .add_completion("ABC-123", 3, "dev:d2", "d2", None, None, "t1")
            .expect("d2 add");

        assert_eq!(store.completions("ABC-123").expect("list").len(), 2);
        assert_eq!(store.completed_challenge_count("ABC-123").expect("count"), 1);
    }

    #[test]
    fn remove_completion_is_a_noop_when_absent() {
        let mut store = HuntStore::open_in_memory().expect("open store");
        store.insert_room(&room("ABC-123")).expect("insert");

        assert_eq!(
            store.remove_completion("ABC-123", 3, "dev:d1").expect("remove"),
            0
        );

        store
            .add_completion("ABC-123", 3, "dev:d1", "d1", None, None, "t1")
            .expect("add");
        assert_eq!(
            store.remove_completion("ABC-123", 3, "dev:d1").expect("remove"),
            1
        );
        assert!(store.completions("ABC-123").expect("list").is_empty());
    }
}

//! The single "same person" rule. A participant or completion is owned by
//! the account id when one is present, otherwise by the device token.
//! Every mutation path and every "is this mine" read resolves through
//! here; nothing else in the repo compares device or account ids directly.

use contracts::{Completion, Participant, Room};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OwningIdentity {
    Account(String),
    Device(String),
}

impl OwningIdentity {
    /// Account id wins when present and non-blank; a signed-in person keeps
    /// the same identity across devices.
    pub fn resolve(device_id: &str, account_id: Option<&str>) -> Self {
        match account_id {
            Some(account) if !account.trim().is_empty() => Self::Account(account.to_string()),
            _ => Self::Device(device_id.to_string()),
        }
    }

    pub fn of_completion(completion: &Completion) -> Self {
        Self::resolve(
            &completion.completed_by_device_id,
            completion.completed_by_account_id.as_deref(),
        )
    }

    pub fn of_participant(participant: &Participant) -> Self {
        Self::resolve(&participant.device_id, participant.account_id.as_deref())
    }

    /// The identity that may start a room's hunt: its account id if one was
    /// recorded at creation, else the creating device.
    pub fn of_room_host(room: &Room) -> Self {
        Self::resolve(&room.host_device_id, room.host_account_id.as_deref())
    }

    /// Stable storage key, also used to deduplicate completions in SQL.
    pub fn owner_key(&self) -> String {
        match self {
            Self::Account(id) => format!("acct:{id}"),
            Self::Device(id) => format!("dev:{id}"),
        }
    }
}

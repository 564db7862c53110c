//! Domain events parsed from server text
//!
//! Push events come from unsolicited log lines, listings from the replies
//! to `ListPlayers` and `ListSquads`.

mod classifier;

pub use classifier::*;

use std::fmt;

use serde::Serialize;

/// An admin warning sent to a player
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warn {
    pub player_name: String,
    pub message: String,
}

/// A player removed from the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Kick {
    pub player_id: String,
    pub eos_id: String,
    pub steam_id: String,
    pub player_name: String,
}

/// Chat channel a message was sent on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChatType {
    ChatAll,
    ChatTeam,
    ChatSquad,
    ChatAdmin,
}

impl ChatType {
    /// Tag as it appears in server text
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatType::ChatAll => "ChatAll",
            ChatType::ChatTeam => "ChatTeam",
            ChatType::ChatSquad => "ChatSquad",
            ChatType::ChatAdmin => "ChatAdmin",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "ChatAll" => Some(ChatType::ChatAll),
            "ChatTeam" => Some(ChatType::ChatTeam),
            "ChatSquad" => Some(ChatType::ChatSquad),
            "ChatAdmin" => Some(ChatType::ChatAdmin),
            _ => None,
        }
    }
}

impl fmt::Display for ChatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chat line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub chat_type: ChatType,
    pub eos_id: String,
    pub steam_id: String,
    pub player_name: String,
    pub message: String,
}

/// An admin entering or leaving the admin camera
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminCameraEvent {
    pub eos_id: String,
    pub steam_id: String,
    pub admin_name: String,
    /// `true` when the camera was possessed, `false` when released
    pub possessed: bool,
}

/// A squad being created
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SquadCreated {
    pub player_name: String,
    pub eos_id: String,
    pub steam_id: String,
    pub squad_id: String,
    pub squad_name: String,
    pub team_name: String,
}

/// One row of `ListPlayers`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Player {
    pub player_id: String,
    pub eos_id: String,
    pub steam_id: String,
    pub player_name: String,
    pub team_id: String,
    /// Squad number, or `N/A` when unassigned
    pub squad_id: String,
    pub role: String,
    pub is_leader: bool,
    pub is_in_squad: bool,
}

/// One row of `ListSquads`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Squad {
    pub squad_id: String,
    pub squad_name: String,
    pub size: String,
    pub creator_name: String,
    pub creator_eos_id: String,
    pub creator_steam_id: String,
    /// Taken from the most recent team header above the row
    pub team_id: String,
    pub team_name: String,
    pub locked: bool,
}

/// A classified push line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum PushEvent {
    Warn(Warn),
    Kick(Kick),
    Chat(ChatMessage),
    PossessedAdminCamera(AdminCameraEvent),
    UnpossessedAdminCamera(AdminCameraEvent),
    SquadCreated(SquadCreated),
}

/// A parsed listing reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Listing {
    Players(Vec<Player>),
    Squads(Vec<Squad>),
}

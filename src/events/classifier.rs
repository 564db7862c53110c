//! Classification of server text into typed events
//!
//! Push lines are tried against each event shape in a fixed priority order
//! and the first match wins. Listings are parsed row by row according to
//! the command that produced them.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::{
    AdminCameraEvent, ChatMessage, ChatType, Kick, Listing, Player, PushEvent, Squad,
    SquadCreated, Warn,
};

/// Command whose reply is a player listing
pub const LIST_PLAYERS_COMMAND: &str = "ListPlayers";
/// Command whose reply is a squad listing
pub const LIST_SQUADS_COMMAND: &str = "ListSquads";

/// Marks a player row without a squad
const NO_SQUAD: &str = "N/A";

static WARN: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r#"^Remote admin has warned player (.*)\. Message was "([\s\S]*)"$"#)
});

static KICK: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"^Kicked player ([0-9]+)\. \[Online IDs= EOS: ([0-9a-f]{32}) steam: ([0-9]{17})\] (.*)$")
});

static CHAT: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"^\[(ChatAll|ChatTeam|ChatSquad|ChatAdmin)\] \[Online IDs:EOS: ([0-9a-f]{32}) steam: ([0-9]{17})\] (.+?) : (.*)$",
    )
});

// The server logs "Ids" on possess and "IDs" on unpossess.
static POSSESS_ADMIN_CAMERA: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"^\[Online Ids:EOS: ([0-9a-f]{32}) steam: ([0-9]{17})\] (.+) has possessed admin camera\.$")
});

static UNPOSSESS_ADMIN_CAMERA: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"^\[Online IDs:EOS: ([0-9a-f]{32}) steam: ([0-9]{17})\] (.+) has unpossessed admin camera\.$")
});

static SQUAD_CREATED: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"^(.+) \(Online IDs: EOS: ([0-9a-f]{32}) steam: ([0-9]{17})\) has created Squad ([0-9]+) \(Squad Name: (.+)\) on (.+)$",
    )
});

static PLAYER_ROW: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"ID: ([0-9]+) \| Online IDs: EOS: ([0-9a-f]{32}) steam: ([0-9]{17}) \| Name: (.+) \| Team ID: ([0-9]+) \| Squad ID: ([0-9]+|N/A) \| Is Leader: (True|False) \| Role: ([A-Za-z0-9_]*)\b",
    )
});

static SQUAD_ROW: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"ID: ([0-9]+) \| Name: (.+) \| Size: ([0-9]+) \| Locked: (True|False) \| Creator Name: (.+) \| Creator Online IDs: EOS: ([0-9a-f]{32}) steam: ([0-9]{17})",
    )
});

static TEAM_HEADER: LazyLock<Regex> = LazyLock::new(|| pattern(r"Team ID: (1|2) \((.+)\)/"));

fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("built-in pattern must compile")
}

/// Push shapes in priority order
const PUSH_PARSERS: [fn(&str) -> Option<PushEvent>; 6] = [
    parse_warn,
    parse_kick,
    parse_chat,
    parse_possess_admin_camera,
    parse_unpossess_admin_camera,
    parse_squad_created,
];

/// Classify one unsolicited server line.
///
/// Each shape must match the whole line. Returns `None` for lines matching
/// no known shape.
pub fn classify_push(line: &str) -> Option<PushEvent> {
    let line = line.trim_end_matches(['\r', '\n']);
    PUSH_PARSERS.iter().find_map(|parse| parse(line))
}

/// Parse the reply to a listing command.
///
/// Returns `None` unless `command` is `ListPlayers` or `ListSquads`.
pub fn classify_listing(text: &str, command: &str) -> Option<Listing> {
    match command.trim() {
        LIST_PLAYERS_COMMAND => Some(Listing::Players(parse_players(text))),
        LIST_SQUADS_COMMAND => Some(Listing::Squads(parse_squads(text))),
        _ => None,
    }
}

fn field(caps: &Captures<'_>, index: usize) -> String {
    caps.get(index)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

fn parse_warn(line: &str) -> Option<PushEvent> {
    let caps = WARN.captures(line)?;
    Some(PushEvent::Warn(Warn {
        player_name: field(&caps, 1),
        message: field(&caps, 2),
    }))
}

fn parse_kick(line: &str) -> Option<PushEvent> {
    let caps = KICK.captures(line)?;
    Some(PushEvent::Kick(Kick {
        player_id: field(&caps, 1),
        eos_id: field(&caps, 2),
        steam_id: field(&caps, 3),
        player_name: field(&caps, 4),
    }))
}

fn parse_chat(line: &str) -> Option<PushEvent> {
    let caps = CHAT.captures(line)?;
    Some(PushEvent::Chat(ChatMessage {
        chat_type: ChatType::from_tag(&caps[1])?,
        eos_id: field(&caps, 2),
        steam_id: field(&caps, 3),
        player_name: field(&caps, 4),
        message: field(&caps, 5),
    }))
}

fn admin_camera(caps: &Captures<'_>, possessed: bool) -> AdminCameraEvent {
    AdminCameraEvent {
        eos_id: field(caps, 1),
        steam_id: field(caps, 2),
        admin_name: field(caps, 3),
        possessed,
    }
}

fn parse_possess_admin_camera(line: &str) -> Option<PushEvent> {
    let caps = POSSESS_ADMIN_CAMERA.captures(line)?;
    Some(PushEvent::PossessedAdminCamera(admin_camera(&caps, true)))
}

fn parse_unpossess_admin_camera(line: &str) -> Option<PushEvent> {
    let caps = UNPOSSESS_ADMIN_CAMERA.captures(line)?;
    Some(PushEvent::UnpossessedAdminCamera(admin_camera(&caps, false)))
}

fn parse_squad_created(line: &str) -> Option<PushEvent> {
    let caps = SQUAD_CREATED.captures(line)?;
    Some(PushEvent::SquadCreated(SquadCreated {
        player_name: field(&caps, 1),
        eos_id: field(&caps, 2),
        steam_id: field(&caps, 3),
        squad_id: field(&caps, 4),
        squad_name: field(&caps, 5),
        team_name: field(&caps, 6),
    }))
}

fn parse_players(text: &str) -> Vec<Player> {
    text.split('\n')
        .filter_map(|line| PLAYER_ROW.captures(line))
        .map(|caps| {
            let squad_id = field(&caps, 6);
            Player {
                player_id: field(&caps, 1),
                eos_id: field(&caps, 2),
                steam_id: field(&caps, 3),
                player_name: field(&caps, 4),
                team_id: field(&caps, 5),
                is_in_squad: squad_id != NO_SQUAD,
                squad_id,
                is_leader: &caps[7] == "True",
                role: field(&caps, 8),
            }
        })
        .collect()
}

fn parse_squads(text: &str) -> Vec<Squad> {
    let mut squads = Vec::new();
    let mut team_id = String::new();
    let mut team_name = String::new();

    for line in text.split('\n') {
        if let Some(team) = TEAM_HEADER.captures(line) {
            team_id = field(&team, 1);
            team_name = field(&team, 2);
        }

        let Some(caps) = SQUAD_ROW.captures(line) else {
            continue;
        };

        squads.push(Squad {
            squad_id: field(&caps, 1),
            squad_name: field(&caps, 2),
            size: field(&caps, 3),
            locked: &caps[4] == "True",
            creator_name: field(&caps, 5),
            creator_eos_id: field(&caps, 6),
            creator_steam_id: field(&caps, 7),
            team_id: team_id.clone(),
            team_name: team_name.clone(),
        });
    }

    squads
}

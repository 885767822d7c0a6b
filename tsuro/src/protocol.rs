//! Messages exchanged between the server and the players.
//!
//! Every message is a single line of JSON, tagged with an `action` field.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Action, ActionKind, BoardView, Color, PlayerId, PlayerStatus, ProtocolError, TileRef};

/// Strategies a client may announce when registering.
pub const KNOWN_STRATEGIES: [&str; 2] = ["random", "human"];

/// Sent by a player to the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Asks to join the game. Unset fields are chosen by the server.
    Register {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<Color>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        strategy: Option<String>,
    },
    /// Answers an [`ServerMessage::ActionRequest`].
    ActionResponse { player: PlayerId, placement: Action },
}

const CLIENT_ACTIONS: [&str; 2] = ["REGISTER", "ACTION_RESPONSE"];

impl ClientMessage {
    /// Parses a line received from a client, telling apart unknown actions
    /// from otherwise broken messages.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(line).map_err(|err| ProtocolError::MalformedInput {
            reason: err.to_string(),
        })?;
        let name = match value.get("action") {
            Some(Value::String(name)) => name.clone(),
            Some(_) => {
                return Err(ProtocolError::MalformedInput {
                    reason: String::from("the action must be a string"),
                })
            }
            None => {
                return Err(ProtocolError::MalformedInput {
                    reason: String::from("missing action"),
                })
            }
        };
        if !CLIENT_ACTIONS.contains(&name.as_str()) {
            return Err(ProtocolError::UnknownAction { name });
        }
        serde_json::from_value(value).map_err(|err| ProtocolError::MalformedInput {
            reason: err.to_string(),
        })
    }
}

/// Sent by the server to one or all players.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// Confirms a registration.
    AssignIdentity {
        player: PlayerId,
        name: String,
        color: Color,
    },
    /// The registration was refused. The connection is closed afterwards.
    ConnectionDenied { reason: String },
    /// Tells everyone whose turn it is.
    TurnStatus { player: PlayerId, kind: ActionKind },
    /// The recipient's current hand. Actions refer to tiles by their index in this list.
    Hand { tiles: Vec<TileRef> },
    /// The recipient has to answer with an [`ClientMessage::ActionResponse`].
    ActionRequest { kind: ActionKind, board: BoardView },
    /// The recipient's hand was discarded.
    HandClear,
    PlayerRemoved {
        player: PlayerId,
        status: PlayerStatus,
    },
    StateUpdate { board: BoardView },
    GameOver { winners: Vec<PlayerId> },
    MalformedInput { reason: String },
    UnknownAction { name: String },
    UnknownStrategy { strategy: String },
    InvalidId { claimed: PlayerId },
    /// The last action was not applied.
    ActionRejected { reason: String },
}

impl From<ProtocolError> for ServerMessage {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::MalformedInput { reason } => ServerMessage::MalformedInput { reason },
            ProtocolError::UnknownAction { name } => ServerMessage::UnknownAction { name },
        }
    }
}

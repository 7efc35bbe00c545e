//! Wire protocol: inbound action parsing and outbound message shapes.
//!
//! Every frame is one UTF-8 JSON object carrying an `action` tag. Inbound
//! `move` and `surrender` frames are relayed with whatever fields the client
//! put in them, so they are kept as raw JSON objects instead of being fully
//! typed; everything the server itself produces is typed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::{ClockState, Color};

/// Why an inbound frame could not be decoded. The offending connection gets
/// the rendered message back as an `error` reply; the server never crashes
/// on bad input.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing or non-string `action` field")]
    MissingAction,
    #[error("missing or non-string `room` field for `{0}`")]
    MissingRoom(&'static str),
    #[error("malformed `startGame` request: {0}")]
    BadStartGame(serde_json::Error),
}

/// Parameters of a `startGame` request. Allotments default to zero when the
/// client omits them; `hostColor` is required.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGameRequest {
    pub room: String,
    #[serde(default)]
    pub white_time_ms: i64,
    #[serde(default)]
    pub black_time_ms: i64,
    #[serde(default)]
    pub increment_ms: i64,
    pub host_color: Color,
}

/// One decoded inbound frame, dispatched on its `action` tag.
#[derive(Debug)]
pub enum ClientAction {
    CreateRoom,
    JoinRoom { room: String },
    StartGame(StartGameRequest),
    /// Original payload kept whole for relay/merge.
    Move { room: String, payload: Map<String, Value> },
    LeaveRoom { room: String },
    Surrender { room: String, payload: Map<String, Value> },
    /// Recognized as a frame, but not as any known action.
    Unknown(String),
}

impl ClientAction {
    /// Decode one inbound text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(payload) = value else {
            return Err(ProtocolError::MissingAction);
        };
        let Some(action) = payload
            .get("action")
            .and_then(Value::as_str)
            .map(str::to_string)
        else {
            return Err(ProtocolError::MissingAction);
        };

        match action.as_str() {
            "createRoom" => Ok(Self::CreateRoom),
            "joinRoom" => Ok(Self::JoinRoom {
                room: require_room(&payload, "joinRoom")?,
            }),
            "startGame" => serde_json::from_value(Value::Object(payload))
                .map(Self::StartGame)
                .map_err(ProtocolError::BadStartGame),
            "move" => {
                let room = require_room(&payload, "move")?;
                Ok(Self::Move { room, payload })
            }
            "leaveRoom" => Ok(Self::LeaveRoom {
                room: require_room(&payload, "leaveRoom")?,
            }),
            "surrender" => {
                let room = require_room(&payload, "surrender")?;
                Ok(Self::Surrender { room, payload })
            }
            other => Ok(Self::Unknown(other.to_string())),
        }
    }
}

fn require_room(payload: &Map<String, Value>, action: &'static str) -> Result<String, ProtocolError> {
    payload
        .get("room")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(ProtocolError::MissingRoom(action))
}

/// Snapshot of the authoritative clock, attached to `gameStart` and merged
/// into every `move` broadcast. `lastSwitchTime` is `null` while the game is
/// armed but the first move has not been made.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub time_a: i64,
    pub time_b: i64,
    pub current_player: Color,
    pub last_switch_time: Option<i64>,
}

impl From<&ClockState> for TimerState {
    fn from(state: &ClockState) -> Self {
        Self {
            time_a: state.time_a,
            time_b: state.time_b,
            current_player: state.current_player,
            last_switch_time: state.last_switch_time,
        }
    }
}

/// Typed outbound messages, one variant per reply/broadcast shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    RoomCreated {
        room: String,
    },
    JoinedRoom {
        room: String,
    },
    Error {
        message: String,
    },
    PlayerJoined {
        room: String,
    },
    GameStart {
        room: String,
        white_time_ms: i64,
        black_time_ms: i64,
        increment_ms: i64,
        host_color: Color,
        server_timestamp: i64,
        timer_state: TimerState,
    },
    PlayerLeft {
        room: String,
    },
    PromotedToHost {
        room: String,
    },
}

/// What goes out on the wire: either a typed server message or a relayed
/// client payload preserved verbatim (with `timerState` merged in for moves
/// during an active game).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutboundPayload {
    Message(ServerMessage),
    Raw(Map<String, Value>),
}

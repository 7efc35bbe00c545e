//! Session manager: the room directory, the clock store, and the
//! transitions the message router dispatches into.
//!
//! The manager performs no I/O. Every operation mutates the two maps and
//! returns the outbound envelopes it produced; the router delivers them
//! after the session lock is released. That keeps the whole lifecycle and
//! clock logic unit-testable with a fixed clock and no sockets.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::common::time::Clock;
use crate::domain::{ClockState, ConnectionId, Room, START_SYNC_BUFFER_MS, generate_room_id};
use crate::protocol::{OutboundPayload, ServerMessage, StartGameRequest, TimerState};

/// One outbound envelope produced by a session transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Outgoing {
    pub target: ConnectionId,
    pub payload: OutboundPayload,
}

impl Outgoing {
    pub(crate) fn message(target: ConnectionId, message: ServerMessage) -> Self {
        Self {
            target,
            payload: OutboundPayload::Message(message),
        }
    }

    pub(crate) fn raw(target: ConnectionId, payload: Map<String, Value>) -> Self {
        Self {
            target,
            payload: OutboundPayload::Raw(payload),
        }
    }

    /// Wire encoding of the payload.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.payload).unwrap()
    }
}

/// Exclusive owner of the room directory and the clock store.
///
/// Lives behind a single async mutex, so each inbound message's transition
/// runs to completion before the next begins and the maps need no further
/// locking.
pub struct SessionManager {
    rooms: HashMap<String, Room>,
    clocks: HashMap<String, ClockState>,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            rooms: HashMap::new(),
            clocks: HashMap::new(),
            clock,
        }
    }

    /// Register a fresh room with `conn` as host and reply with its code.
    pub fn create_room(&mut self, conn: ConnectionId) -> Vec<Outgoing> {
        let room_id = generate_room_id(&self.rooms);
        self.rooms.insert(room_id.clone(), Room::new(conn));
        tracing::info!("Room {} created by {}", room_id, conn);
        vec![Outgoing::message(conn, ServerMessage::RoomCreated { room: room_id })]
    }

    /// Add `conn` as guest. Unknown and full rooms are answered with an
    /// `error` reply to the requester and nothing else changes.
    pub fn join_room(&mut self, conn: ConnectionId, room_id: &str) -> Vec<Outgoing> {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return vec![Outgoing::message(
                conn,
                ServerMessage::Error {
                    message: format!("Room {room_id} does not exist"),
                },
            )];
        };
        if room.is_full() {
            return vec![Outgoing::message(
                conn,
                ServerMessage::Error {
                    message: format!("Room {room_id} is full"),
                },
            )];
        }

        room.push(conn);
        tracing::info!("Client {} joined room {}", conn, room_id);

        let mut outgoing = vec![Outgoing::message(
            conn,
            ServerMessage::JoinedRoom {
                room: room_id.to_string(),
            },
        )];
        // Rooms only exist non-empty, so a host is always present here.
        if let Some(host) = room.host() {
            outgoing.push(Outgoing::message(
                host,
                ServerMessage::PlayerJoined {
                    room: room_id.to_string(),
                },
            ));
        }
        outgoing
    }

    /// Arm the clock and broadcast `gameStart` to both members. Ignored
    /// unless the room currently holds exactly two members; no game starts
    /// otherwise.
    pub fn start_game(&mut self, req: StartGameRequest) -> Vec<Outgoing> {
        let Some(room) = self.rooms.get(&req.room) else {
            return Vec::new();
        };
        if room.members().len() != Room::CAPACITY {
            tracing::warn!(
                "Ignoring startGame for room {} with {} member(s)",
                req.room,
                room.members().len()
            );
            return Vec::new();
        }

        let state = ClockState::new(
            req.white_time_ms,
            req.black_time_ms,
            req.increment_ms,
            req.host_color,
        );
        let message = ServerMessage::GameStart {
            room: req.room.clone(),
            white_time_ms: req.white_time_ms,
            black_time_ms: req.black_time_ms,
            increment_ms: req.increment_ms,
            host_color: req.host_color,
            // Clients anchor their countdown to this; push it slightly into
            // the future to cover the one-way transmission delay.
            server_timestamp: self.clock.now_millis() + START_SYNC_BUFFER_MS,
            timer_state: TimerState::from(&state),
        };
        let outgoing = room
            .members()
            .iter()
            .map(|&member| Outgoing::message(member, message.clone()))
            .collect();

        self.clocks.insert(req.room.clone(), state);
        tracing::info!("Game started in room {}", req.room);
        outgoing
    }

    /// Relay a move. With an active clock the move is settled first and the
    /// merged payload goes to both members, sender included, since both
    /// clients need the authoritative timer update. Without one the payload
    /// is relayed unmodified to the other member only.
    pub fn relay_move(
        &mut self,
        conn: ConnectionId,
        room_id: &str,
        mut payload: Map<String, Value>,
    ) -> Vec<Outgoing> {
        let Some(room) = self.rooms.get(room_id) else {
            return Vec::new();
        };
        match self.clocks.get_mut(room_id) {
            Some(state) => {
                state.record_move(self.clock.now_millis());
                payload.insert(
                    "timerState".to_string(),
                    serde_json::to_value(TimerState::from(&*state)).unwrap(),
                );
                room.members()
                    .iter()
                    .map(|&member| Outgoing::raw(member, payload.clone()))
                    .collect()
            }
            None => room
                .others(conn)
                .map(|member| Outgoing::raw(member, payload.clone()))
                .collect(),
        }
    }

    /// Relay a resignation verbatim to the other member. No state changes;
    /// the clock keeps its bookkeeping and a stray later move would still be
    /// processed.
    pub fn surrender(
        &self,
        conn: ConnectionId,
        room_id: &str,
        payload: Map<String, Value>,
    ) -> Vec<Outgoing> {
        let Some(room) = self.rooms.get(room_id) else {
            return Vec::new();
        };
        room.others(conn)
            .map(|member| Outgoing::raw(member, payload.clone()))
            .collect()
    }

    /// Remove `conn` from the room, notifying the remaining member and
    /// promoting it to host if the host departed. An emptied room is torn
    /// down together with its clock state.
    pub fn leave_room(&mut self, conn: ConnectionId, room_id: &str) -> Vec<Outgoing> {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return Vec::new();
        };
        if !room.contains(conn) {
            return Vec::new();
        }

        let was_host = room.host() == Some(conn);
        let mut outgoing: Vec<Outgoing> = room
            .others(conn)
            .map(|member| {
                Outgoing::message(
                    member,
                    ServerMessage::PlayerLeft {
                        room: room_id.to_string(),
                    },
                )
            })
            .collect();

        room.remove(conn);
        tracing::info!("Client {} left room {}", conn, room_id);

        if was_host {
            if let Some(new_host) = room.host() {
                outgoing.push(Outgoing::message(
                    new_host,
                    ServerMessage::PromotedToHost {
                        room: room_id.to_string(),
                    },
                ));
                tracing::info!("Client {} promoted to host of room {}", new_host, room_id);
            }
        }

        if room.is_empty() {
            self.rooms.remove(room_id);
            self.clocks.remove(room_id);
            tracing::info!("Room {} emptied and removed", room_id);
        }
        outgoing
    }

    /// Socket-close cleanup: apply `leave_room` wherever `conn` is found.
    /// A connection belongs to at most one room, but the sweep is defensive.
    pub fn disconnect(&mut self, conn: ConnectionId) -> Vec<Outgoing> {
        let room_ids: Vec<String> = self
            .rooms
            .iter()
            .filter(|(_, room)| room.contains(conn))
            .map(|(room_id, _)| room_id.clone())
            .collect();

        let mut outgoing = Vec::new();
        for room_id in room_ids {
            outgoing.extend(self.leave_room(conn, &room_id));
        }
        outgoing
    }

    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn clock_state(&self, room_id: &str) -> Option<&ClockState> {
        self.clocks.get(room_id)
    }
}

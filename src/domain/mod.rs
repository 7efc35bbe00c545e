//! Domain model: room membership and the authoritative chess clock.

mod clock;
mod room;

pub use clock::{ClockState, Color, MOVE_SWITCH_BUFFER_MS, START_SYNC_BUFFER_MS};
pub use room::{ConnectionId, Room, generate_room_id};

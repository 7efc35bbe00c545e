//! Authoritative chess-clock bookkeeping.
//!
//! The server never ticks. It records when the running side's turn began
//! and settles elapsed time lazily, at the moment the next move arrives.
//! A side that stops moving is therefore never flagged server-side; clients
//! own flag-fall detection.

use serde::{Deserialize, Serialize};

/// Forward buffer added to the game-start synchronization timestamp, so
/// clients anchoring their countdown to it are not penalized for the
/// message's one-way transmission delay.
pub const START_SYNC_BUFFER_MS: i64 = 500;

/// Forward buffer added to `last_switch_time` after every move, compensating
/// the same latency for the side whose clock starts running.
pub const MOVE_SWITCH_BUFFER_MS: i64 = 1_000;

/// Side to move. Serialized as `"White"` / `"Black"` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opposite(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

/// Per-room clock record. Remaining time is stored per seat: `time_a` is the
/// host's, `time_b` the guest's, with `white_is_a` mapping seats to colors.
///
/// `last_switch_time` is `None` from game start until the first move, so the
/// first move never costs time regardless of how long it takes to arrive.
#[derive(Debug, Clone, PartialEq)]
pub struct ClockState {
    pub(crate) time_a: i64,
    pub(crate) time_b: i64,
    pub(crate) current_player: Color,
    pub(crate) last_switch_time: Option<i64>,
    pub(crate) white_is_a: bool,
    pub(crate) increment_ms: i64,
}

impl ClockState {
    /// Arm the clock for a new game. White always moves first, independent
    /// of which seat the host took.
    pub fn new(white_time_ms: i64, black_time_ms: i64, increment_ms: i64, host_color: Color) -> Self {
        let white_is_a = host_color == Color::White;
        let (time_a, time_b) = if white_is_a {
            (white_time_ms, black_time_ms)
        } else {
            (black_time_ms, white_time_ms)
        };
        Self {
            time_a,
            time_b,
            current_player: Color::White,
            last_switch_time: None,
            white_is_a,
            increment_ms,
        }
    }

    /// Settle the move the running side just completed: deduct its lazily
    /// computed thinking time (floored at zero), credit the increment, flip
    /// the turn, and restart the count from `now_ms` plus the compensation
    /// buffer.
    ///
    /// The increment is credited even when the deduction floored at zero, so
    /// remaining time can never go negative but a mover always receives its
    /// increment.
    pub fn record_move(&mut self, now_ms: i64) {
        // A reply landing inside the compensation buffer makes the raw
        // difference negative; floor it so the buffer never credits time.
        let elapsed_ms = match self.last_switch_time {
            None => 0,
            Some(since) => (now_ms - since).max(0),
        };

        let mover = self.current_player;
        let increment_ms = self.increment_ms;
        let remaining = self.seat_time_mut(mover);
        *remaining = (*remaining - elapsed_ms).max(0) + increment_ms;

        self.current_player = mover.opposite();
        self.last_switch_time = Some(now_ms + MOVE_SWITCH_BUFFER_MS);
    }

    /// Remaining time of the seat playing `color`, in milliseconds.
    pub fn remaining_ms(&self, color: Color) -> i64 {
        if (color == Color::White) == self.white_is_a {
            self.time_a
        } else {
            self.time_b
        }
    }

    fn seat_time_mut(&mut self, color: Color) -> &mut i64 {
        if (color == Color::White) == self.white_is_a {
            &mut self.time_a
        } else {
            &mut self.time_b
        }
    }
}

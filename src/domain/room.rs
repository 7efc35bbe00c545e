//! Room membership: an ordered pair of connections, host at index 0.

use std::collections::HashMap;

use rand::Rng;
use uuid::Uuid;

/// Opaque handle for one client connection. Carries no identity beyond
/// transport liveness.
pub type ConnectionId = Uuid;

/// A session container holding up to two participant connections.
///
/// `members[0]` is always the host; the role belongs to the position, so it
/// moves to the remaining member when the host departs. A room only exists
/// in the directory while it has at least one member.
#[derive(Debug, Clone)]
pub struct Room {
    members: Vec<ConnectionId>,
}

impl Room {
    pub const CAPACITY: usize = 2;

    pub fn new(host: ConnectionId) -> Self {
        Self {
            members: vec![host],
        }
    }

    /// Current host, i.e. the member at position 0.
    pub fn host(&self) -> Option<ConnectionId> {
        self.members.first().copied()
    }

    pub fn members(&self) -> &[ConnectionId] {
        &self.members
    }

    pub fn contains(&self, conn: ConnectionId) -> bool {
        self.members.contains(&conn)
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= Self::CAPACITY
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn push(&mut self, conn: ConnectionId) {
        self.members.push(conn);
    }

    pub fn remove(&mut self, conn: ConnectionId) {
        self.members.retain(|&member| member != conn);
    }

    /// Every member except `conn`, in join order.
    pub fn others(&self, conn: ConnectionId) -> impl Iterator<Item = ConnectionId> + '_ {
        self.members.iter().copied().filter(move |&member| member != conn)
    }
}

/// Generate a 4-digit room code not currently present in the directory, by
/// rejection sampling. The id space is small on purpose (codes are typed by
/// hand); exhaustion is not handled.
pub fn generate_room_id(rooms: &HashMap<String, Room>) -> String {
    let mut rng = rand::thread_rng();
    loop {
        let code = rng.gen_range(1000..10000).to_string();
        if !rooms.contains_key(&code) {
            return code;
        }
    }
}

//! Messages exchanged between clients and the authoritative server.
//!
//! Every message is archive-encoded with its discriminant first, followed by
//! the fields of the active variant only.

use creepline_archive::{Archive, ArchiveError, InputArchive, OutputArchive};

use crate::{GameInstanceId, PlayerActions, PlayerId, Tick};

/// Largest encoded snapshot a state sync may carry.
pub const MAX_SNAPSHOT_BYTES: usize = 1 << 16;

/// Asks the server to start a new game instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NewGameRequest {
    /// Player that will own the instance.
    pub player: PlayerId,
}

impl Archive for NewGameRequest {
    fn serialize(&self, output: &mut OutputArchive) {
        output.put(&self.player);
    }

    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
        Ok(Self {
            player: input.take()?,
        })
    }
}

/// Names the instance created for a [`NewGameRequest`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NewGameResponse {
    /// Identifier of the new instance.
    pub game: GameInstanceId,
}

impl Archive for NewGameResponse {
    fn serialize(&self, output: &mut OutputArchive) {
        output.put(&self.game);
    }

    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
        Ok(Self {
            game: input.take()?,
        })
    }
}

/// Authoritative entity state for one instance at one tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateSync {
    /// Instance the snapshot describes.
    pub game: GameInstanceId,
    /// Tick the snapshot was captured at.
    pub tick: Tick,
    /// Archive-encoded [`Snapshot`](crate::Snapshot).
    pub snapshot: Vec<u8>,
}

impl Archive for StateSync {
    fn serialize(&self, output: &mut OutputArchive) {
        output.put(&self.game);
        output.put(&self.tick);
        output.write_sequence(&self.snapshot);
    }

    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
        Ok(Self {
            game: input.take()?,
            tick: input.take()?,
            snapshot: input.read_sequence(MAX_SNAPSHOT_BYTES)?,
        })
    }
}

/// Client to server messages.
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    /// Start a new instance.
    NewGame(NewGameRequest),
    /// Fixed-rate actions issued for one tick.
    PlayerActions(PlayerActions),
}

impl Archive for Request {
    fn serialize(&self, output: &mut OutputArchive) {
        match self {
            Self::NewGame(request) => {
                output.write_discriminant(0);
                output.put(request);
            }
            Self::PlayerActions(actions) => {
                output.write_discriminant(1);
                output.put(actions);
            }
        }
    }

    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
        Ok(match input.read_discriminant("Request", 2)? {
            0 => Self::NewGame(input.take()?),
            _ => Self::PlayerActions(input.take()?),
        })
    }
}

/// Server to client messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    /// Acknowledges a new connection.
    Connected {
        /// Identifier the server assigned to the connection.
        player: PlayerId,
    },
    /// Answers a [`NewGameRequest`].
    NewGame(NewGameResponse),
    /// Carries an authoritative snapshot.
    StateSync(StateSync),
}

impl Archive for Response {
    fn serialize(&self, output: &mut OutputArchive) {
        match self {
            Self::Connected { player } => {
                output.write_discriminant(0);
                output.put(player);
            }
            Self::NewGame(response) => {
                output.write_discriminant(1);
                output.put(response);
            }
            Self::StateSync(sync) => {
                output.write_discriminant(2);
                output.put(sync);
            }
        }
    }

    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
        Ok(match input.read_discriminant("Response", 3)? {
            0 => Self::Connected {
                player: input.take()?,
            },
            1 => Self::NewGame(input.take()?),
            _ => Self::StateSync(input.take()?),
        })
    }
}

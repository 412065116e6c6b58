#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Fixed-timestep simulation of creepline game instances.
//!
//! A [`GameInstance`] accumulates frame time and advances its world in
//! [`TIME_STEP`](creepline_core::TIME_STEP) ticks, running its tick systems in
//! registration order. A [`Server`] hosts many instances and feeds them
//! requests decoded by the network thread.

pub mod instance;
pub mod server;
pub mod systems;

use creepline_archive::ArchiveError;
use creepline_core::GameInstanceId;
use creepline_system_actions::ContextError;
use thiserror::Error;

pub use instance::{GameInstance, InstanceState, Outgoing, Role};
pub use server::{Inbound, Outbound, Server};
pub use systems::TickSystem;

/// Number of per-tick action lists an instance keeps.
pub const ACTION_HISTORY: usize = 128;

/// Ticks between two state syncs sent by an authoritative instance.
pub const DEFAULT_SYNC_INTERVAL: u32 = 6;

/// Most ticks a single frame may catch up on. Frame time beyond that backlog
/// is dropped.
pub const MAX_TICKS_PER_CALL: u32 = 30;

/// Failures that stop an instance from advancing.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// A tick system hit a context stack precondition violation.
    #[error("tick system `{system}` failed: {source}")]
    Context {
        /// Name of the failing system.
        system: &'static str,
        /// Underlying stack error.
        #[source]
        source: ContextError,
    },
    /// A state sync carried an undecodable snapshot.
    #[error("state sync for game {game} is malformed: {source}")]
    Snapshot {
        /// Instance the sync was addressed to.
        game: u64,
        /// Decoding failure.
        #[source]
        source: ArchiveError,
    },
}

impl SimulationError {
    pub(crate) fn snapshot(game: GameInstanceId, source: ArchiveError) -> Self {
        Self::Snapshot {
            game: game.get(),
            source,
        }
    }
}

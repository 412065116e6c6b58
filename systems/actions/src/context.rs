//! Layered interaction contexts.

use creepline_core::{EntityId, TowerKind};
use thiserror::Error;

use crate::bindings::BindingTable;

/// Interpretation mode of an action context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContextState {
    /// Free play: view movement, waves and placement entry.
    Default,
    /// A placement preview follows the pointer.
    Placement,
    /// Authoritative instance applying remote intents.
    Server,
}

/// State a context carries alongside its bindings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextPayload {
    /// No extra state.
    None,
    /// Preview owned by a placement context.
    Placement {
        /// Ghost entity standing in for the tower.
        ghost: EntityId,
        /// Tower the preview stands in for.
        tower: TowerKind,
    },
}

/// Interaction context: a state, its binding table and its payload.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionContext {
    state: ContextState,
    bindings: BindingTable,
    payload: ContextPayload,
}

impl ActionContext {
    /// Free-play context with the default bindings.
    #[must_use]
    pub fn default_play() -> Self {
        Self {
            state: ContextState::Default,
            bindings: BindingTable::defaults(),
            payload: ContextPayload::None,
        }
    }

    /// Placement context owning the provided preview.
    #[must_use]
    pub fn placement(ghost: EntityId, tower: TowerKind) -> Self {
        Self {
            state: ContextState::Placement,
            bindings: BindingTable::placement_defaults(),
            payload: ContextPayload::Placement { ghost, tower },
        }
    }

    /// Authoritative context. It maps no local input.
    #[must_use]
    pub fn server() -> Self {
        Self {
            state: ContextState::Server,
            bindings: BindingTable::empty(),
            payload: ContextPayload::None,
        }
    }

    /// Interpretation mode.
    #[must_use]
    pub const fn state(&self) -> ContextState {
        self.state
    }

    /// Bindings evaluated while the context is active.
    #[must_use]
    pub const fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    /// Extra state of the context.
    #[must_use]
    pub const fn payload(&self) -> ContextPayload {
        self.payload
    }

    /// Ghost owned by a placement context.
    #[must_use]
    pub const fn ghost(&self) -> Option<EntityId> {
        match self.payload {
            ContextPayload::Placement { ghost, .. } => Some(ghost),
            ContextPayload::None => None,
        }
    }
}

/// Errors raised by context stack transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    /// A pop would remove the bottom context.
    #[error("cannot pop the bottom action context")]
    BottomContext,
}

/// Stack of contexts. Only the front context interprets actions.
///
/// The bottom context is stored apart from the overlays, so the stack can
/// never be empty.
#[derive(Clone, Debug, PartialEq)]
pub struct ContextStack {
    bottom: ActionContext,
    overlays: Vec<ActionContext>,
}

impl ContextStack {
    /// Creates a stack holding only `bottom`.
    #[must_use]
    pub fn new(bottom: ActionContext) -> Self {
        Self {
            bottom,
            overlays: Vec::new(),
        }
    }

    /// Active context.
    #[must_use]
    pub fn front(&self) -> &ActionContext {
        self.overlays.last().unwrap_or(&self.bottom)
    }

    /// Context at the bottom of the stack.
    #[must_use]
    pub const fn bottom(&self) -> &ActionContext {
        &self.bottom
    }

    /// Overlays `context` on top of the active one.
    pub fn push_front(&mut self, context: ActionContext) {
        self.overlays.push(context);
    }

    /// Removes the active context and exposes the one beneath it.
    pub fn pop_front(&mut self) -> Result<ActionContext, ContextError> {
        self.overlays.pop().ok_or(ContextError::BottomContext)
    }

    /// Number of contexts, the bottom included.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.overlays.len() + 1
    }

    /// Points placement contexts owning ghost `from` at ghost `to`.
    ///
    /// Returns `true` when a context was updated.
    pub fn rekey_ghost(&mut self, from: EntityId, to: EntityId) -> bool {
        let mut updated = false;
        for context in std::iter::once(&mut self.bottom).chain(self.overlays.iter_mut()) {
            if let ContextPayload::Placement { ghost, .. } = &mut context.payload {
                if *ghost == from {
                    *ghost = to;
                    updated = true;
                }
            }
        }
        updated
    }
}

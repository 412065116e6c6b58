//! Authoritative host running many independent instances.

use std::collections::BTreeMap;

use creepline_core::{GameInstanceId, NewGameResponse, PlayerId, Request, Response};
use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver, UnboundedSender};

use crate::{
    instance::{GameInstance, Outgoing, Role},
    DEFAULT_SYNC_INTERVAL,
};

/// Message from the network thread, tagged with the connection it concerns.
#[derive(Clone, Debug, PartialEq)]
pub enum Inbound {
    /// A connection sent a request.
    Request {
        /// Connection the request arrived on.
        player: PlayerId,
        /// Decoded request.
        request: Request,
    },
    /// A connection closed.
    Disconnected {
        /// Connection that went away.
        player: PlayerId,
    },
}

/// Response for the network thread to deliver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outbound {
    /// Connection the response is addressed to.
    pub player: PlayerId,
    /// Response to encode and send.
    pub response: Response,
}

/// Hosts instances and shuttles messages between them and the network thread.
pub struct Server {
    inbound: UnboundedReceiver<Inbound>,
    outbound: UnboundedSender<Outbound>,
    instances: BTreeMap<GameInstanceId, GameInstance>,
    next_game: u64,
    sync_interval: u32,
}

impl Server {
    /// Creates a host fed by `inbound` that replies through `outbound`.
    #[must_use]
    pub fn new(inbound: UnboundedReceiver<Inbound>, outbound: UnboundedSender<Outbound>) -> Self {
        Self {
            inbound,
            outbound,
            instances: BTreeMap::new(),
            next_game: 1,
            sync_interval: DEFAULT_SYNC_INTERVAL,
        }
    }

    /// Overrides the number of ticks between state syncs.
    #[must_use]
    pub fn with_sync_interval(mut self, sync_interval: u32) -> Self {
        self.sync_interval = sync_interval.max(1);
        self
    }

    /// Running instance with the provided identifier.
    #[must_use]
    pub fn instance(&self, game: GameInstanceId) -> Option<&GameInstance> {
        self.instances.get(&game)
    }

    /// Number of running instances.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Drains the inbound queue, then advances every instance by `dt`.
    ///
    /// Instances that hit a fatal precondition violation are dropped; the
    /// others keep running. Returns `false` once the network thread has gone
    /// away.
    pub fn pump(&mut self, dt: f32) -> bool {
        let connected = loop {
            match self.inbound.try_recv() {
                Ok(message) => self.handle(message),
                Err(TryRecvError::Empty) => break true,
                Err(TryRecvError::Disconnected) => break false,
            }
        };

        let mut failed = Vec::new();
        for (game, instance) in &mut self.instances {
            if let Err(error) = instance.advance(dt) {
                tracing::error!(game = game.get(), %error, "instance stopped");
                failed.push(*game);
                continue;
            }
            let owner = instance.state().player();
            for outgoing in instance.take_outbox() {
                if let Outgoing::StateSync(sync) = outgoing {
                    send(
                        &self.outbound,
                        Outbound {
                            player: owner,
                            response: Response::StateSync(sync),
                        },
                    );
                }
            }
        }
        for game in failed {
            let _ = self.instances.remove(&game);
        }

        connected
    }

    fn handle(&mut self, message: Inbound) {
        match message {
            Inbound::Request { player, request } => self.handle_request(player, request),
            Inbound::Disconnected { player } => {
                let dropped = self.drop_games_of(player);
                tracing::info!(player = player.get(), dropped, "owner disconnected");
            }
        }
    }

    fn handle_request(&mut self, player: PlayerId, request: Request) {
        match request {
            Request::NewGame(request) => {
                if request.player != player {
                    tracing::debug!(
                        requested = request.player.get(),
                        connection = player.get(),
                        "new game requested for another player id; using the connection's"
                    );
                }
                let replaced = self.drop_games_of(player);
                if replaced > 0 {
                    tracing::info!(player = player.get(), replaced, "previous game replaced");
                }

                let game = GameInstanceId::new(self.next_game);
                self.next_game += 1;
                let role = Role::Server {
                    sync_interval: self.sync_interval,
                };
                let _ = self
                    .instances
                    .insert(game, GameInstance::new(game, player, role));
                tracing::info!(game = game.get(), player = player.get(), "instance created");
                send(
                    &self.outbound,
                    Outbound {
                        player,
                        response: Response::NewGame(NewGameResponse { game }),
                    },
                );
            }
            Request::PlayerActions(actions) => {
                let Some(instance) = self.instances.get_mut(&actions.game) else {
                    tracing::warn!(game = actions.game.get(), "actions for unknown instance dropped");
                    return;
                };
                let owner = instance.state().player();
                if player != owner {
                    tracing::warn!(
                        game = actions.game.get(),
                        owner = owner.get(),
                        connection = player.get(),
                        "actions for another player's instance dropped"
                    );
                    return;
                }
                let accepted = instance.fold(&actions);
                if accepted < actions.len() {
                    tracing::warn!(
                        game = actions.game.get(),
                        dropped = actions.len() - accepted,
                        "action list full"
                    );
                }
            }
        }
    }

    /// Removes every instance owned by `player` and returns how many went.
    fn drop_games_of(&mut self, player: PlayerId) -> usize {
        let before = self.instances.len();
        self.instances
            .retain(|_, instance| instance.state().player() != player);
        before - self.instances.len()
    }
}

fn send(outbound: &UnboundedSender<Outbound>, message: Outbound) {
    if outbound.send(message).is_err() {
        tracing::debug!("network thread gone; response discarded");
    }
}

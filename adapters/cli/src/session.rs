//! Server host loop and scripted headless client.

use std::{
    net::SocketAddr,
    thread,
    time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};
use creepline_core::{
    Action, GameInstanceId, NewGameRequest, NewGameResponse, PlayerId, Request, Response,
    TowerKind, TIME_STEP,
};
use creepline_net::{NetClient, NetServer};
use creepline_simulation::{GameInstance, Outgoing, Role, Server};
use creepline_system_actions::{ContextState, InputSnapshot, PointerRay};
use creepline_world::query;
use glam::Vec3;
use tokio::sync::mpsc::unbounded_channel;

use crate::{
    config::{ClientConfig, ServerConfig},
    script::{Script, ScriptAction},
};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
const POINTER_HEIGHT: f32 = 10.0;

fn frame_period() -> Duration {
    Duration::from_secs_f32(TIME_STEP)
}

/// Hosts instances until the network thread stops.
pub(crate) fn serve(config: &ServerConfig) -> Result<()> {
    let (inbound_tx, inbound) = unbounded_channel();
    let (outbound, outbound_rx) = unbounded_channel();
    let net = NetServer::spawn(config.bind, inbound_tx, outbound_rx)
        .with_context(|| format!("failed to bind {}", config.bind))?;
    let mut host = Server::new(inbound, outbound).with_sync_interval(config.sync_interval);
    tracing::info!(
        addr = %net.local_addr(),
        sync_interval = config.sync_interval,
        "server running"
    );

    let mut last = Instant::now();
    loop {
        thread::sleep(frame_period());
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f32();
        last = now;
        if !host.pump(dt) {
            break;
        }
    }

    tracing::warn!(instances = host.instance_count(), "network thread exited");
    net.shutdown().context("network thread failed")
}

/// Plays a scripted session, locally or against a server.
pub(crate) fn play(config: &ClientConfig) -> Result<()> {
    let script = match &config.script {
        Some(path) => Script::load(path)?,
        None => Script::default(),
    };
    let mut link = if config.multiplayer {
        Some(Link::open(config.connect)?)
    } else {
        None
    };
    let (player, game) = link.as_ref().map_or(
        (PlayerId::new(1), GameInstanceId::new(1)),
        |link| (link.player, link.game),
    );

    let mut instance = GameInstance::new(
        game,
        player,
        Role::Client {
            multiplayer: config.multiplayer,
        },
    );
    let mut driver = Driver::new(script);
    for _ in 0..config.ticks {
        let input = driver.prepare(&mut instance);
        let _ = instance.frame(input, TIME_STEP)?;
        if let Some(link) = &mut link {
            link.exchange(&mut instance)?;
            thread::sleep(frame_period());
        }
    }

    let world = &instance.state().world;
    tracing::info!(
        tick = instance.tick().get(),
        creeps = query::creeps(world).len(),
        towers = query::towers(world).len(),
        leaked = query::leaked(world),
        killed = query::killed(world),
        unplayed = driver.script.remaining(),
        "session finished"
    );

    match link {
        Some(link) => link.client.disconnect().context("disconnect failed"),
        None => Ok(()),
    }
}

struct Link {
    client: NetClient,
    player: PlayerId,
    game: GameInstanceId,
}

impl Link {
    fn open(addr: SocketAddr) -> Result<Self> {
        let mut client =
            NetClient::connect(addr).with_context(|| format!("failed to connect to {addr}"))?;
        let player = match client.recv_timeout(HANDSHAKE_TIMEOUT)? {
            Some(Response::Connected { player }) => player,
            other => bail!("expected a connection acknowledgement, got {other:?}"),
        };
        client.send(Request::NewGame(NewGameRequest { player }))?;
        let game = match client.recv_timeout(HANDSHAKE_TIMEOUT)? {
            Some(Response::NewGame(NewGameResponse { game })) => game,
            other => bail!("expected a new game reply, got {other:?}"),
        };
        tracing::info!(player = player.get(), game = game.get(), "joined game");
        Ok(Self {
            client,
            player,
            game,
        })
    }

    fn exchange(&mut self, instance: &mut GameInstance) -> Result<()> {
        for outgoing in instance.take_outbox() {
            if let Outgoing::Actions(actions) = outgoing {
                self.client.send(Request::PlayerActions(actions))?;
            }
        }
        while let Some(response) = self.client.try_recv()? {
            match response {
                Response::StateSync(sync) => {
                    if let Err(error) = instance.apply_state_sync(&sync) {
                        tracing::warn!(%error, tick = sync.tick.get(), "state sync rejected");
                    }
                }
                other => tracing::debug!(?other, "unexpected response ignored"),
            }
        }
        Ok(())
    }
}

/// Turns script steps into submitted actions and input frames.
///
/// A tower is placed the way a player would: the preview is opened with the
/// pointer aimed at the target, and the build is issued on the next frame.
struct Driver {
    script: Script,
    pending: Option<(TowerKind, Vec3)>,
    confirm: bool,
}

impl Driver {
    fn new(script: Script) -> Self {
        Self {
            script,
            pending: None,
            confirm: false,
        }
    }

    fn prepare(&mut self, instance: &mut GameInstance) -> InputSnapshot {
        let mut input = InputSnapshot::new();

        if std::mem::take(&mut self.confirm)
            && instance.state().contexts.front().state() == ContextState::Placement
        {
            tracing::warn!(tick = instance.tick().get(), "scripted tower rejected");
            submit(instance, Action::exit_placement());
        }
        if let Some((tower, position)) = self.pending.take() {
            submit(instance, Action::build_tower(tower, position));
            input = input.with_pointer(aim_at(position));
            self.confirm = true;
        }

        for action in self.script.due(instance.tick().get()) {
            match action {
                ScriptAction::SendWave { creep } => submit(instance, Action::send_wave(creep)),
                ScriptAction::Move { direction } => {
                    submit(instance, Action::move_view(direction));
                }
                ScriptAction::BuildTower { x, z, tower } => {
                    let position = Vec3::new(x, 0.0, z);
                    submit(instance, Action::enter_placement(tower));
                    input = input.with_pointer(aim_at(position));
                    self.pending = Some((tower, position));
                }
            }
        }
        input
    }
}

fn aim_at(target: Vec3) -> PointerRay {
    PointerRay {
        origin: target + Vec3::Y * POINTER_HEIGHT,
        direction: Vec3::NEG_Y,
    }
}

fn submit(instance: &mut GameInstance, action: Action) {
    if !instance.submit(action) {
        tracing::warn!(kind = ?action.kind(), "action list full; scripted action dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline() -> GameInstance {
        GameInstance::new(
            GameInstanceId::new(1),
            PlayerId::new(1),
            Role::Client { multiplayer: false },
        )
    }

    fn run(driver: &mut Driver, instance: &mut GameInstance, ticks: u32) {
        for _ in 0..ticks {
            let input = driver.prepare(instance);
            let _ = instance.frame(input, TIME_STEP).expect("frame");
        }
    }

    #[test]
    fn scripted_builds_go_through_the_preview() {
        let script = Script::parse(
            "[[step]]\ntick = 0\naction = \"build_tower\"\nx = 6.5\nz = 14.5\n",
        )
        .expect("valid");
        let mut driver = Driver::new(script);
        let mut instance = offline();
        run(&mut driver, &mut instance, 3);

        let towers = query::towers(&instance.state().world);
        assert_eq!(towers.len(), 1, "tower committed from the preview");
        assert_eq!((towers[0].position.x, towers[0].position.z), (6.5, 14.5));
        assert_eq!(instance.state().contexts.depth(), 1, "placement closed");
        assert_eq!(query::ghost_count(&instance.state().world), 0);
    }

    #[test]
    fn blocked_builds_close_the_preview() {
        let script = Script::parse(
            "[[step]]\ntick = 0\naction = \"build_tower\"\nx = 6.5\nz = 14.5\n\n\
             [[step]]\ntick = 5\naction = \"build_tower\"\nx = 6.6\nz = 14.5\n",
        )
        .expect("valid");
        let mut driver = Driver::new(script);
        let mut instance = offline();
        run(&mut driver, &mut instance, 10);

        assert_eq!(query::towers(&instance.state().world).len(), 1);
        assert_eq!(instance.state().contexts.depth(), 1);
        assert_eq!(query::ghost_count(&instance.state().world), 0);
    }

    #[test]
    fn waves_are_submitted_on_their_tick() {
        let script = Script::parse("[[step]]\ntick = 2\naction = \"send_wave\"\n").expect("valid");
        let mut driver = Driver::new(script);
        let mut instance = offline();
        run(&mut driver, &mut instance, 2);
        assert!(query::creeps(&instance.state().world).is_empty());
        run(&mut driver, &mut instance, 1);
        assert_eq!(query::creeps(&instance.state().world).len(), 2);
    }
}

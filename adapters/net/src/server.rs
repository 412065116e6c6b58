//! Server side network thread.

use std::{
    collections::BTreeMap,
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
};

use creepline_core::{PlayerId, Request, Response};
use creepline_simulation::{Inbound, Outbound};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    runtime::Builder,
    sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    time::{sleep, sleep_until, Instant},
};

use crate::{encode_frame, FrameDecoder, NetError, IDLE_TIMEOUT, POLL_TIMEOUT};

const READ_CHUNK: usize = 4096;

/// Accepts peers and moves their frames to and from the simulation thread.
///
/// Decoded requests are pushed onto the inbound queue tagged with the
/// connection's [`PlayerId`], followed by a disconnect notice once the
/// connection closes. Responses from the outbound queue are routed to the
/// connection they name.
#[derive(Debug)]
pub struct NetServer {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<Result<(), NetError>>>,
}

impl NetServer {
    /// Binds `addr` and starts the network thread.
    pub fn spawn(
        addr: SocketAddr,
        inbound: UnboundedSender<Inbound>,
        outbound: UnboundedReceiver<Outbound>,
    ) -> Result<Self, NetError> {
        let listener = std::net::TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;
        let running = Arc::new(AtomicBool::new(true));

        let flag = Arc::clone(&running);
        let thread = std::thread::Builder::new()
            .name("creepline-net-server".into())
            .spawn(move || {
                let runtime = Builder::new_current_thread().enable_all().build()?;
                runtime.block_on(async move {
                    let listener = TcpListener::from_std(listener)?;
                    serve(listener, flag, inbound, outbound).await
                })
            })?;
        tracing::info!(%local_addr, "listening");

        Ok(Self {
            local_addr,
            running,
            thread: Some(thread),
        })
    }

    /// Address the listener is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Reports whether the network thread is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }

    /// Clears the running flag and waits for the network thread to exit.
    pub fn shutdown(mut self) -> Result<(), NetError> {
        self.running.store(false, Ordering::Release);
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| NetError::Panicked)?,
            None => Ok(()),
        }
    }
}

impl Drop for NetServer {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

async fn serve(
    listener: TcpListener,
    running: Arc<AtomicBool>,
    inbound: UnboundedSender<Inbound>,
    mut outbound: UnboundedReceiver<Outbound>,
) -> Result<(), NetError> {
    let mut peers: BTreeMap<PlayerId, UnboundedSender<Response>> = BTreeMap::new();
    let (closed_tx, mut closed) = unbounded_channel::<PlayerId>();
    let mut next_player = 1;

    while running.load(Ordering::Acquire) {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(error) => {
                        tracing::warn!(%error, "accept failed");
                        continue;
                    }
                };
                let player = PlayerId::new(next_player);
                next_player += 1;
                let (responses_tx, responses) = unbounded_channel();
                let _ = responses_tx.send(Response::Connected { player });
                let _ = peers.insert(player, responses_tx);
                tracing::info!(%peer, player = player.get(), "peer connected");

                let inbound = inbound.clone();
                let closed = closed_tx.clone();
                let _task = tokio::spawn(async move {
                    if let Err(error) = run_peer(player, stream, &inbound, responses).await {
                        tracing::warn!(player = player.get(), %error, "peer dropped");
                    }
                    let _ = closed.send(player);
                });
            }
            Some(message) = outbound.recv() => {
                match peers.get(&message.player) {
                    Some(peer) => {
                        if peer.send(message.response).is_err() {
                            tracing::debug!(player = message.player.get(), "response for closing peer");
                        }
                    }
                    None => {
                        tracing::debug!(player = message.player.get(), "response for unknown peer dropped");
                    }
                }
            }
            Some(player) = closed.recv() => {
                let _ = peers.remove(&player);
                tracing::info!(player = player.get(), "peer disconnected");
                if inbound.send(Inbound::Disconnected { player }).is_err() {
                    tracing::debug!(player = player.get(), "simulation gone; disconnect not reported");
                }
            }
            () = sleep(POLL_TIMEOUT) => {}
        }
    }

    tracing::info!(peers = peers.len(), "network thread stopping");
    Ok(())
}

async fn run_peer(
    player: PlayerId,
    stream: TcpStream,
    inbound: &UnboundedSender<Inbound>,
    mut responses: UnboundedReceiver<Response>,
) -> Result<(), NetError> {
    let (mut reader, mut writer) = stream.into_split();
    let mut decoder = FrameDecoder::new();
    let mut chunk = [0; READ_CHUNK];
    let mut deadline = Instant::now() + IDLE_TIMEOUT;

    loop {
        tokio::select! {
            read = reader.read(&mut chunk) => {
                let read = read?;
                if read == 0 {
                    return Ok(());
                }
                deadline = Instant::now() + IDLE_TIMEOUT;
                decoder.extend(&chunk[..read]);
                while let Some(request) = decoder.next_frame::<Request>()? {
                    if inbound.send(Inbound::Request { player, request }).is_err() {
                        return Err(NetError::Closed);
                    }
                }
            }
            response = responses.recv() => {
                let Some(response) = response else {
                    return Ok(());
                };
                writer.write_all(&encode_frame(&response)?).await?;
            }
            () = sleep_until(deadline) => {
                return Err(NetError::Timeout(IDLE_TIMEOUT));
            }
        }
    }
}

//! Client side network thread.

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
    time::{Duration, Instant},
};

use creepline_core::{Request, Response};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{tcp::OwnedReadHalf, TcpStream},
    runtime::Builder,
    sync::mpsc::{error::TryRecvError, unbounded_channel, UnboundedReceiver, UnboundedSender},
    time::{sleep, timeout},
};

use crate::{encode_frame, FrameDecoder, NetError, DISCONNECT_TIMEOUT, POLL_TIMEOUT};

const READ_CHUNK: usize = 4096;

/// Connection to a creepline server, driven from a background thread.
#[derive(Debug)]
pub struct NetClient {
    running: Arc<AtomicBool>,
    requests: UnboundedSender<Request>,
    responses: UnboundedReceiver<Response>,
    thread: Option<JoinHandle<Result<(), NetError>>>,
}

impl NetClient {
    /// Connects to `addr` and starts the network thread.
    pub fn connect(addr: SocketAddr) -> Result<Self, NetError> {
        let stream = std::net::TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        stream.set_nonblocking(true)?;
        let running = Arc::new(AtomicBool::new(true));
        let (requests, outgoing) = unbounded_channel();
        let (incoming, responses) = unbounded_channel();

        let flag = Arc::clone(&running);
        let thread = std::thread::Builder::new()
            .name("creepline-net-client".into())
            .spawn(move || {
                let runtime = Builder::new_current_thread().enable_all().build()?;
                runtime.block_on(async move {
                    let stream = TcpStream::from_std(stream)?;
                    run(stream, flag, outgoing, incoming).await
                })
            })?;
        tracing::info!(%addr, "connected");

        Ok(Self {
            running,
            requests,
            responses,
            thread: Some(thread),
        })
    }

    /// Queues a request for the server.
    pub fn send(&self, request: Request) -> Result<(), NetError> {
        self.requests.send(request).map_err(|_| NetError::Closed)
    }

    /// Next response that has already arrived.
    pub fn try_recv(&mut self) -> Result<Option<Response>, NetError> {
        match self.responses.try_recv() {
            Ok(response) => Ok(Some(response)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(NetError::Closed),
        }
    }

    /// Waits up to `limit` for the next response.
    pub fn recv_timeout(&mut self, limit: Duration) -> Result<Option<Response>, NetError> {
        let deadline = Instant::now() + limit;
        loop {
            if let Some(response) = self.try_recv()? {
                return Ok(Some(response));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            std::thread::sleep(POLL_TIMEOUT);
        }
    }

    /// Closes the write side and gives the server [`DISCONNECT_TIMEOUT`] to
    /// close the connection before it is reset.
    pub fn disconnect(mut self) -> Result<(), NetError> {
        self.running.store(false, Ordering::Release);
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| NetError::Panicked)?,
            None => Ok(()),
        }
    }
}

impl Drop for NetClient {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

async fn run(
    stream: TcpStream,
    running: Arc<AtomicBool>,
    mut outgoing: UnboundedReceiver<Request>,
    incoming: UnboundedSender<Response>,
) -> Result<(), NetError> {
    let (mut reader, mut writer) = stream.into_split();
    let mut decoder = FrameDecoder::new();
    let mut chunk = [0; READ_CHUNK];

    while running.load(Ordering::Acquire) {
        tokio::select! {
            read = reader.read(&mut chunk) => {
                let read = read?;
                if read == 0 {
                    tracing::info!("server closed the connection");
                    return Ok(());
                }
                decoder.extend(&chunk[..read]);
                while let Some(response) = decoder.next_frame::<Response>()? {
                    if incoming.send(response).is_err() {
                        tracing::debug!("client handle gone; response discarded");
                    }
                }
            }
            Some(request) = outgoing.recv() => {
                writer.write_all(&encode_frame(&request)?).await?;
            }
            () = sleep(POLL_TIMEOUT) => {}
        }
    }

    writer.shutdown().await?;
    match timeout(DISCONNECT_TIMEOUT, drain(&mut reader)).await {
        Ok(closed) => closed,
        Err(_) => {
            tracing::warn!(after = ?DISCONNECT_TIMEOUT, "server kept the connection open; resetting");
            Ok(())
        }
    }
}

async fn drain(reader: &mut OwnedReadHalf) -> Result<(), NetError> {
    let mut chunk = [0; READ_CHUNK];
    while reader.read(&mut chunk).await? > 0 {}
    Ok(())
}

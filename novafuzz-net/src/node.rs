//! Parent/child connection lifecycle on top of [`crate::message`]: the 16
//! byte handshake, one reader/one writer OS thread per socket marshalling
//! frames through `std::sync::mpsc`, and the higher-level parent/child
//! behaviors from the distributed transport (sync caching, periodic
//! keepalives, reconnection with backoff).
//!
//! This crate only depends on `novafuzz-ir`, not `novafuzz-corpus`: sync and
//! program payloads are opaque bytes here, produced and cached by the caller.

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::NetError;
use crate::frame::FrameDecoder;
use crate::message::{Message, NodeId};

const HANDSHAKE_POLL_INTERVAL: Duration = Duration::from_secs(1);
const HANDSHAKE_MAX_POLLS: u32 = 10;
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(60);
pub const SYNC_CACHE_TTL: Duration = Duration::from_secs(15 * 60);
pub const BROADCAST_STARTUP_DELAY: Duration = Duration::from_secs(10 * 60);
pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(30);
pub const RECONNECT_MAX_RETRIES: u32 = 10;

/// A higher-level event surfaced to whatever owns a [`ParentNode`] or
/// [`ChildNode`], decoded from an inbound [`Message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetEvent {
    ChildConnected(NodeId),
    ChildDisconnected(NodeId),
    Crash(NodeId, Vec<u8>),
    Program(NodeId, Vec<u8>),
    Statistics(NodeId, Vec<u8>),
    Log(NodeId, Vec<u8>),
    Sync(Vec<u8>),
    Shutdown,
}

fn read_peer_id_with_polling(stream: &mut TcpStream) -> Result<NodeId, NetError> {
    stream.set_read_timeout(Some(HANDSHAKE_POLL_INTERVAL))?;
    let mut buf = [0u8; 16];
    let mut filled = 0usize;
    for _ in 0..HANDSHAKE_MAX_POLLS {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => return Err(NetError::Handshake("peer closed during handshake".into())),
            Ok(n) => {
                filled += n;
                if filled == buf.len() {
                    stream.set_read_timeout(None)?;
                    return Ok(NodeId(buf));
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => continue,
            Err(e) => return Err(NetError::Io(e)),
        }
    }
    Err(NetError::Handshake("timed out waiting for peer id".into()))
}

fn reader_loop(mut stream: TcpStream, tx: mpsc::Sender<Result<Message, NetError>>) {
    let mut decoder = FrameDecoder::new();
    let mut buf = [0u8; 4096];
    loop {
        match stream.read(&mut buf) {
            Ok(0) => {
                let _ = tx.send(Err(NetError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "peer closed connection"))));
                return;
            }
            Ok(n) => {
                decoder.feed(&buf[..n]);
                loop {
                    match decoder.try_decode() {
                        Ok(Some(frame)) => match Message::from_frame(frame) {
                            Ok(message) => {
                                if tx.send(Ok(message)).is_err() {
                                    return;
                                }
                            }
                            Err(e) => {
                                let _ = tx.send(Err(e));
                                return;
                            }
                        },
                        Ok(None) => break,
                        Err(e) => {
                            let _ = tx.send(Err(e));
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                let _ = tx.send(Err(NetError::Io(e)));
                return;
            }
        }
    }
}

fn writer_loop(mut stream: TcpStream, rx: mpsc::Receiver<Message>) {
    while let Ok(message) = rx.recv() {
        let frame = match message.into_frame() {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("dropping message that failed to frame: {e}");
                continue;
            }
        };
        if stream.write_all(&frame.encode()).is_err() {
            return;
        }
    }
}

/// One live socket: identified peer, plus the reader/writer threads that
/// keep the blocking I/O off whatever thread owns this handle.
struct Connection {
    peer_id: NodeId,
    outbound: mpsc::Sender<Message>,
    inbound: mpsc::Receiver<Result<Message, NetError>>,
    shutdown_handle: TcpStream,
}

impl Connection {
    fn establish(mut stream: TcpStream, local_id: NodeId) -> Result<Self, NetError> {
        stream.write_all(&local_id.to_bytes())?;
        let peer_id = read_peer_id_with_polling(&mut stream)?;
        stream.set_nodelay(true).ok();

        let reader_stream = stream.try_clone()?;
        let shutdown_handle = stream.try_clone()?;

        let (tx_in, rx_in) = mpsc::channel();
        let (tx_out, rx_out) = mpsc::channel();

        thread::spawn(move || reader_loop(reader_stream, tx_in));
        thread::spawn(move || writer_loop(stream, rx_out));

        Ok(Self { peer_id, outbound: tx_out, inbound: rx_in, shutdown_handle })
    }

    fn send(&self, message: Message) -> Result<(), NetError> {
        self.outbound
            .send(message)
            .map_err(|_| NetError::Io(io::Error::new(io::ErrorKind::NotConnected, "connection closed")))
    }

    /// Drains every message currently buffered, stopping at the first error
    /// or disconnect (the caller is expected to drop the connection then).
    fn drain(&self) -> (Vec<Message>, Option<NetError>) {
        let mut messages = Vec::new();
        loop {
            match self.inbound.try_recv() {
                Ok(Ok(message)) => messages.push(message),
                Ok(Err(e)) => return (messages, Some(e)),
                Err(mpsc::TryRecvError::Empty) => return (messages, None),
                Err(mpsc::TryRecvError::Disconnected) => {
                    return (messages, Some(NetError::Io(io::Error::new(io::ErrorKind::NotConnected, "reader thread exited"))))
                }
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let _ = self.shutdown_handle.shutdown(std::net::Shutdown::Both);
    }
}

/// The parent side of the transport: accepts children, broadcasts new
/// programs and periodic keepalives, routes per-child reports upward.
pub struct ParentNode {
    listener: TcpListener,
    local_id: NodeId,
    children: HashMap<NodeId, Connection>,
    last_keepalive: Instant,
    startup: Instant,
    cached_sync: Option<(Vec<u8>, Instant)>,
}

impl ParentNode {
    pub fn bind(addr: impl std::net::ToSocketAddrs, local_id: NodeId) -> Result<Self, NetError> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let now = Instant::now();
        Ok(Self {
            listener,
            local_id,
            children: HashMap::new(),
            last_keepalive: now,
            startup: now,
            cached_sync: None,
        })
    }

    /// Whether the startup delay for broadcasting newly found programs has
    /// elapsed; callers gate [`Self::broadcast`] of `program` messages on it.
    pub fn past_startup_delay(&self) -> bool {
        self.startup.elapsed() >= BROADCAST_STARTUP_DELAY
    }

    /// Accepts any pending inbound connections, performing the handshake
    /// inline. A handshake failure drops that socket and is not fatal to the
    /// listener.
    pub fn accept_new_children(&mut self) -> Vec<NetEvent> {
        let mut events = Vec::new();
        loop {
            let stream = match self.listener.accept() {
                Ok((stream, _addr)) => stream,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(_) => break,
            };
            match Connection::establish(stream, self.local_id) {
                Ok(connection) => {
                    let peer_id = connection.peer_id;
                    self.children.insert(peer_id, connection);
                    events.push(NetEvent::ChildConnected(peer_id));
                }
                Err(e) => log::warn!("child handshake failed: {e}"),
            }
        }
        events
    }

    /// Sends a `sync` to `child`, reusing the last serialized corpus state if
    /// it is still within [`SYNC_CACHE_TTL`]. `produce` is only invoked on a
    /// cache miss, since serializing the corpus is the expensive part.
    pub fn send_sync(&mut self, child: NodeId, produce: impl FnOnce() -> Vec<u8>) -> Result<(), NetError> {
        let payload = self.cached_sync_payload(produce);
        match self.children.get(&child) {
            Some(connection) => connection.send(Message::Sync(payload)),
            None => Err(NetError::Io(io::Error::new(io::ErrorKind::NotFound, "unknown child"))),
        }
    }

    fn cached_sync_payload(&mut self, produce: impl FnOnce() -> Vec<u8>) -> Vec<u8> {
        if let Some((payload, cached_at)) = &self.cached_sync {
            if cached_at.elapsed() < SYNC_CACHE_TTL {
                return payload.clone();
            }
        }
        let payload = produce();
        self.cached_sync = Some((payload.clone(), Instant::now()));
        payload
    }

    /// Broadcasts to every connected child, pruning any that have gone away
    /// mid-send rather than failing the whole broadcast.
    pub fn broadcast(&mut self, message: Message) {
        let mut dead = Vec::new();
        for (id, connection) in &self.children {
            if connection.send(message.clone()).is_err() {
                dead.push(*id);
            }
        }
        for id in dead {
            self.children.remove(&id);
        }
    }

    /// Sends a `keepalive` to all children if the interval has elapsed.
    /// Call once per event loop tick.
    pub fn maybe_send_keepalives(&mut self) {
        if self.last_keepalive.elapsed() >= KEEPALIVE_INTERVAL {
            self.broadcast(Message::KeepAlive);
            self.last_keepalive = Instant::now();
        }
    }

    pub fn shutdown_all(&mut self) {
        self.broadcast(Message::Shutdown);
        self.children.clear();
    }

    /// Drains every connected child's inbound queue, returning routed
    /// events. Disconnected children are pruned and reported once.
    pub fn poll_events(&mut self) -> Vec<NetEvent> {
        let mut events = Vec::new();
        let mut dead = Vec::new();
        for (id, connection) in &self.children {
            let (messages, error) = connection.drain();
            for message in messages {
                events.push(match message {
                    Message::Crash(payload) => NetEvent::Crash(*id, payload),
                    Message::Program(payload) => NetEvent::Program(*id, payload),
                    Message::Statistics(payload) => NetEvent::Statistics(*id, payload),
                    Message::Log(payload) => NetEvent::Log(*id, payload),
                    Message::KeepAlive | Message::Shutdown | Message::Identify(_) | Message::Sync(_) => continue,
                });
            }
            if let Some(e) = error {
                log::warn!("child {id:?} disconnected: {e}");
                dead.push(*id);
            }
        }
        for id in dead {
            self.children.remove(&id);
            events.push(NetEvent::ChildDisconnected(id));
        }
        events
    }
}

/// The child side of the transport: identifies itself once handshaken,
/// forwards crashes unconditionally and programs only after the initial
/// sync has been applied.
pub struct ChildNode {
    connection: Connection,
    sync_applied: bool,
}

impl ChildNode {
    pub fn connect(addr: impl std::net::ToSocketAddrs, local_id: NodeId) -> Result<Self, NetError> {
        let stream = TcpStream::connect(addr)?;
        let connection = Connection::establish(stream, local_id)?;
        connection.send(Message::Identify(local_id))?;
        Ok(Self { connection, sync_applied: false })
    }

    /// Retries [`Self::connect`] with a fixed backoff, per the transport's
    /// reconnection policy.
    pub fn reconnect_with_backoff(addr: impl std::net::ToSocketAddrs + Clone, local_id: NodeId) -> Result<Self, NetError> {
        let mut last_err = None;
        for attempt in 0..RECONNECT_MAX_RETRIES {
            if attempt > 0 {
                thread::sleep(RECONNECT_BACKOFF);
            }
            match Self::connect(addr.clone(), local_id) {
                Ok(child) => return Ok(child),
                Err(e) => {
                    log::warn!("reconnect attempt {attempt} failed: {e}");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| NetError::Handshake("exhausted reconnect attempts".into())))
    }

    pub fn forward_crash(&self, payload: Vec<u8>) -> Result<(), NetError> {
        self.connection.send(Message::Crash(payload))
    }

    /// A no-op (returns `Ok`) before the initial sync has been applied, per
    /// the transport's "don't report interesting programs the parent might
    /// already know about" rule.
    pub fn forward_program(&self, payload: Vec<u8>) -> Result<(), NetError> {
        if !self.sync_applied {
            return Ok(());
        }
        self.connection.send(Message::Program(payload))
    }

    pub fn report_statistics(&self, payload: Vec<u8>) -> Result<(), NetError> {
        self.connection.send(Message::Statistics(payload))
    }

    pub fn forward_log(&self, payload: Vec<u8>) -> Result<(), NetError> {
        self.connection.send(Message::Log(payload))
    }

    /// Drains the connection, surfacing [`NetEvent::Sync`]/[`NetEvent::Shutdown`]
    /// and marking the initial sync as applied as a side effect.
    pub fn poll_events(&mut self) -> Result<Vec<NetEvent>, NetError> {
        let (messages, error) = self.connection.drain();
        let mut events = Vec::new();
        for message in messages {
            match message {
                Message::Sync(payload) => {
                    self.sync_applied = true;
                    events.push(NetEvent::Sync(payload));
                }
                Message::Shutdown => events.push(NetEvent::Shutdown),
                Message::KeepAlive | Message::Identify(_) | Message::Crash(_) | Message::Program(_) | Message::Statistics(_) | Message::Log(_) => {}
            }
        }
        if let Some(e) = error {
            return Err(e);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::net::TcpListener;

    fn free_addr() -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    }

    #[test]
    fn sync_payload_is_cached_within_the_ttl() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut parent = ParentNode::bind(free_addr(), NodeId::random(&mut rng)).unwrap();

        let first = parent.cached_sync_payload(|| b"expensive-1".to_vec());
        let second = parent.cached_sync_payload(|| b"expensive-2".to_vec());

        assert_eq!(first, b"expensive-1".to_vec());
        assert_eq!(second, first, "producer should not run again inside the TTL");
    }

    #[test]
    fn sync_payload_is_recomputed_once_the_ttl_elapses() {
        let mut rng = SmallRng::seed_from_u64(6);
        let mut parent = ParentNode::bind(free_addr(), NodeId::random(&mut rng)).unwrap();

        let _ = parent.cached_sync_payload(|| b"stale".to_vec());
        parent.cached_sync = Some((b"stale".to_vec(), Instant::now() - SYNC_CACHE_TTL));

        let refreshed = parent.cached_sync_payload(|| b"fresh".to_vec());
        assert_eq!(refreshed, b"fresh".to_vec());
    }

    #[test]
    fn parent_accepts_a_child_and_routes_a_crash() {
        let mut rng = SmallRng::seed_from_u64(1);
        let addr = free_addr();
        let mut parent = ParentNode::bind(addr, NodeId::random(&mut rng)).unwrap();

        let child_addr = addr;
        let child_thread = thread::spawn(move || {
            let mut child_rng = SmallRng::seed_from_u64(2);
            let child = ChildNode::connect(child_addr, NodeId::random(&mut child_rng)).unwrap();
            child.forward_crash(b"boom".to_vec()).unwrap();
            child
        });

        let mut events = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        while events.is_empty() && Instant::now() < deadline {
            events.extend(parent.accept_new_children());
            events.extend(parent.poll_events());
            thread::sleep(Duration::from_millis(20));
        }

        let child = child_thread.join().unwrap();
        let _ = child;

        assert!(events.iter().any(|e| matches!(e, NetEvent::ChildConnected(_))));
        assert!(events.iter().any(|e| matches!(e, NetEvent::Crash(_, payload) if payload == b"boom")));
    }

    #[test]
    fn program_is_not_forwarded_before_sync_is_applied() {
        let mut rng = SmallRng::seed_from_u64(3);
        let addr = free_addr();
        let mut parent = ParentNode::bind(addr, NodeId::random(&mut rng)).unwrap();

        let child_addr = addr;
        let child_thread = thread::spawn(move || {
            let mut child_rng = SmallRng::seed_from_u64(4);
            let mut child = ChildNode::connect(child_addr, NodeId::random(&mut child_rng)).unwrap();
            child.forward_program(b"too-early".to_vec()).unwrap();

            let deadline = Instant::now() + Duration::from_secs(5);
            while !child.sync_applied && Instant::now() < deadline {
                let _ = child.poll_events();
                thread::sleep(Duration::from_millis(20));
            }
            child.forward_program(b"after-sync".to_vec()).unwrap();
        });

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut child_id = None;
        while child_id.is_none() && Instant::now() < deadline {
            for event in parent.accept_new_children() {
                if let NetEvent::ChildConnected(id) = event {
                    child_id = Some(id);
                }
            }
            thread::sleep(Duration::from_millis(20));
        }
        let child_id = child_id.unwrap();
        parent.send_sync(child_id, || b"state".to_vec()).unwrap();

        let mut programs = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        while programs.is_empty() && Instant::now() < deadline {
            for event in parent.poll_events() {
                if let NetEvent::Program(_, payload) = event {
                    programs.push(payload);
                }
            }
            thread::sleep(Duration::from_millis(20));
        }

        child_thread.join().unwrap();
        assert_eq!(programs, vec![b"after-sync".to_vec()]);
    }
}

use std::fmt;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use super::error::TransportError;
use super::frame::{LENGTH_PREFIX_SIZE, encode_frame, read_frame};

/// Upper bound on payloads handed out by a single `poll`, so a fast producer
/// cannot keep one drain running forever.
pub const POLL_BUDGET: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// `close()` was called on this side.
    Local,
    /// Peer closed the stream (including a partial frame at EOF).
    Eof,
    Io(String),
    /// Bad length prefix; the stream cannot be resynchronized.
    Protocol(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Local => write!(f, "closed locally"),
            CloseReason::Eof => write!(f, "connection closed by peer"),
            CloseReason::Io(e) => write!(f, "i/o error: {}", e),
            CloseReason::Protocol(e) => write!(f, "protocol error: {}", e),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransportStats {
    pub frames_sent: u64,
    pub bytes_sent: u64,
    pub frames_received: u64,
    pub bytes_received: u64,
}

#[derive(Debug, Default)]
struct ReceiveCounters {
    frames: AtomicU64,
    bytes: AtomicU64,
}

#[derive(Debug)]
enum Inbound {
    Payload(Vec<u8>),
    Closed(CloseReason),
}

/// Cloneable handle that can tear the connection down from any thread.
#[derive(Debug, Clone)]
pub struct CloseHandle {
    open: Arc<AtomicBool>,
    stream: Arc<TcpStream>,
}

impl CloseHandle {
    /// Idempotent. Shutting the socket down unblocks the receive thread.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            let _ = self.stream.shutdown(Shutdown::Both);
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

struct Connection {
    writer: BufWriter<TcpStream>,
    inbox: Receiver<Inbound>,
    handle: CloseHandle,
    reader: Option<JoinHandle<()>>,
    peer: SocketAddr,
}

/// Length-prefixed frame transport over TCP. One background thread per
/// connection reads frames and hands payloads over an unbounded channel;
/// the owning thread drains them with `poll`.
#[derive(Default)]
pub struct FrameTransport {
    connection: Option<Connection>,
    counters: Arc<ReceiveCounters>,
    stats: TransportStats,
    close_reason: Option<CloseReason>,
}

impl FrameTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self, host: &str, port: u16) -> Result<(), TransportError> {
        if self.is_open() {
            log::debug!("connect() ignored, already connected");
            return Ok(());
        }
        self.shutdown_connection();

        let addr = format!("{}:{}", host, port);
        let stream = TcpStream::connect((host, port)).map_err(|source| {
            TransportError::Connect {
                addr: addr.clone(),
                source,
            }
        })?;
        stream.set_nodelay(true)?;

        let peer = stream.peer_addr()?;
        let read_stream = stream.try_clone()?;
        let control_stream = stream.try_clone()?;

        let (tx, rx) = mpsc::channel();
        let open = Arc::new(AtomicBool::new(true));
        let handle = CloseHandle {
            open: Arc::clone(&open),
            stream: Arc::new(control_stream),
        };

        self.counters = Arc::new(ReceiveCounters::default());
        let counters = Arc::clone(&self.counters);

        let reader = thread::Builder::new()
            .name("fieldsync-recv".to_string())
            .spawn(move || receive_loop(read_stream, tx, open, counters))?;

        log::info!("Connected to {}", peer);

        self.connection = Some(Connection {
            writer: BufWriter::new(stream),
            inbox: rx,
            handle,
            reader: Some(reader),
            peer,
        });
        self.close_reason = None;
        self.stats = TransportStats::default();

        Ok(())
    }

    /// Writes one frame. A failed write closes the transport; the closure is
    /// also reported through `close_reason` on the next poll.
    pub fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let frame = encode_frame(payload)?;

        let conn = match self.connection.as_mut() {
            Some(conn) if conn.handle.is_open() => conn,
            _ => return Err(TransportError::NotConnected),
        };

        let result = conn
            .writer
            .write_all(&frame)
            .and_then(|_| conn.writer.flush());

        match result {
            Ok(()) => {
                self.stats.frames_sent += 1;
                self.stats.bytes_sent += frame.len() as u64;
                Ok(())
            }
            Err(e) => {
                log::error!("Send failed: {}", e);
                conn.handle.close();
                if self.close_reason.is_none() {
                    self.close_reason = Some(CloseReason::Io(e.to_string()));
                }
                Err(TransportError::Io(e))
            }
        }
    }

    /// Non-blocking drain of received payloads, at most `POLL_BUDGET` per call.
    pub fn poll(&mut self) -> Poll<'_> {
        Poll {
            transport: self,
            remaining: POLL_BUDGET,
        }
    }

    pub fn close(&mut self) {
        if let Some(conn) = &self.connection {
            conn.handle.close();
            if self.close_reason.is_none() {
                self.close_reason = Some(CloseReason::Local);
            }
        }
    }

    pub fn close_handle(&self) -> Option<CloseHandle> {
        self.connection.as_ref().map(|c| c.handle.clone())
    }

    pub fn is_open(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|c| c.handle.is_open())
    }

    /// Set once the connection has ended, until the next `connect`.
    pub fn close_reason(&self) -> Option<&CloseReason> {
        self.close_reason.as_ref()
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.connection.as_ref().map(|c| c.peer)
    }

    pub fn stats(&self) -> TransportStats {
        TransportStats {
            frames_received: self.counters.frames.load(Ordering::Relaxed),
            bytes_received: self.counters.bytes.load(Ordering::Relaxed),
            ..self.stats.clone()
        }
    }

    /// Breaks the write half only, so the next `send` fails while the
    /// receive thread keeps running.
    #[cfg(test)]
    pub(crate) fn shut_down_writes(&self) {
        if let Some(conn) = &self.connection {
            let _ = conn.writer.get_ref().shutdown(Shutdown::Write);
        }
    }

    fn shutdown_connection(&mut self) {
        if let Some(mut conn) = self.connection.take() {
            conn.handle.close();
            if let Some(reader) = conn.reader.take() {
                let _ = reader.join();
            }
        }
    }
}

impl Drop for FrameTransport {
    fn drop(&mut self) {
        self.shutdown_connection();
    }
}

pub struct Poll<'a> {
    transport: &'a mut FrameTransport,
    remaining: usize,
}

impl Iterator for Poll<'_> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        if self.remaining == 0 {
            return None;
        }
        let conn = self.transport.connection.as_ref()?;

        match conn.inbox.try_recv() {
            Ok(Inbound::Payload(payload)) => {
                self.remaining -= 1;
                Some(payload)
            }
            Ok(Inbound::Closed(reason)) => {
                conn.handle.open.store(false, Ordering::Release);
                // A local close already recorded why.
                self.transport.close_reason.get_or_insert(reason);
                None
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                conn.handle.open.store(false, Ordering::Release);
                self.transport.close_reason.get_or_insert(CloseReason::Eof);
                None
            }
        }
    }
}

fn receive_loop(
    stream: TcpStream,
    tx: Sender<Inbound>,
    open: Arc<AtomicBool>,
    counters: Arc<ReceiveCounters>,
) {
    let mut reader = BufReader::new(stream);

    let reason = loop {
        match read_frame(&mut reader) {
            Ok(payload) => {
                counters.frames.fetch_add(1, Ordering::Relaxed);
                counters
                    .bytes
                    .fetch_add((LENGTH_PREFIX_SIZE + payload.len()) as u64, Ordering::Relaxed);
                if tx.send(Inbound::Payload(payload)).is_err() {
                    break CloseReason::Local;
                }
            }
            Err(_) if !open.load(Ordering::Acquire) => break CloseReason::Local,
            Err(TransportError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                break CloseReason::Eof;
            }
            Err(TransportError::Protocol(e)) => {
                log::error!("Invalid frame, dropping connection: {}", e);
                break CloseReason::Protocol(e.to_string());
            }
            Err(e) => break CloseReason::Io(e.to_string()),
        }
    };

    open.store(false, Ordering::Release);
    let _ = reader.get_ref().shutdown(Shutdown::Both);
    log::info!("Receive loop ended: {}", reason);
    let _ = tx.send(Inbound::Closed(reason));
}

//! Flow replay over a live connection.
//!
//! A replayer walks a flow in capture order and plays one side of the
//! conversation: entries of its own direction are written to the peer,
//! entries of the other direction are awaited until the expected number of
//! bytes has arrived. Received bytes are counted, not compared, so a peer
//! that answers with different content still drives the session forward.

use crate::core::{Direction, Flow};
use crate::error::{ReplayError, Result};
use serde::Serialize;
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};

/// Side of the conversation to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Connects out; sends sent entries, expects received ones.
    Client,
    /// Accepts connections; sends received entries, expects sent ones.
    Server,
}

impl Role {
    /// Direction of the entries this role writes.
    #[must_use]
    pub const fn sends(self) -> Direction {
        match self {
            Self::Client => Direction::Sent,
            Self::Server => Direction::Received,
        }
    }

    /// Direction of the entries this role waits for.
    #[must_use]
    pub const fn expects(self) -> Direction {
        self.sends().opposite()
    }
}

/// Counters for one replayed session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    /// Entries written to the peer.
    pub sent_entries: usize,
    /// Entries read from the peer.
    pub received_entries: usize,
    /// Bytes written.
    pub sent_bytes: usize,
    /// Bytes read.
    pub received_bytes: usize,
}

/// Plays one side of a flow over any byte stream.
///
/// # Examples
///
/// ```
/// use flowdiff::core::{Direction, Entry, Flow};
/// use flowdiff::replay::{Replayer, Role};
///
/// let flow = Flow::from_entries(vec![Entry::new(Direction::Sent, 0, b"hi".to_vec())]);
/// let mut out = std::io::Cursor::new(Vec::new());
/// let summary = Replayer::new(&flow, Role::Client).run(&mut out).unwrap();
/// assert_eq!(summary.sent_bytes, 2);
/// assert_eq!(out.into_inner(), b"hi");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Replayer<'a> {
    flow: &'a Flow,
    role: Role,
}

impl<'a> Replayer<'a> {
    /// Creates a replayer for one side of `flow`.
    #[must_use]
    pub const fn new(flow: &'a Flow, role: Role) -> Self {
        Self { flow, role }
    }

    /// Replays the whole flow over `stream`.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::Send`] or [`ReplayError::Receive`] on I/O
    /// failure and [`ReplayError::ConnectionClosed`] if the peer closes
    /// before an expected entry has fully arrived.
    pub fn run<S: Read + Write>(&self, stream: &mut S) -> Result<ReplaySummary> {
        let mut summary = ReplaySummary::default();
        let mut buf = Vec::new();

        for (n, entry) in self.flow.iter().enumerate() {
            if entry.direction == self.role.sends() {
                tracing::info!(entry = n, data = %hex::encode(&entry.data), "send");
                stream
                    .write_all(&entry.data)
                    .and_then(|()| stream.flush())
                    .map_err(|e| ReplayError::Send {
                        entry: n,
                        reason: e.to_string(),
                    })?;
                summary.sent_entries += 1;
                summary.sent_bytes += entry.len();
            } else {
                buf.resize(entry.len(), 0);
                receive_exact(stream, &mut buf, n)?;
                if buf != entry.data {
                    tracing::debug!(entry = n, "received bytes differ from capture");
                }
                summary.received_entries += 1;
                summary.received_bytes += entry.len();
            }
        }

        Ok(summary)
    }
}

/// Reads until `buf` is full, logging every chunk as it arrives.
fn receive_exact<S: Read>(stream: &mut S, buf: &mut [u8], entry: usize) -> Result<()> {
    let mut received = 0;
    while received < buf.len() {
        match stream.read(&mut buf[received..]) {
            Ok(0) => {
                return Err(ReplayError::ConnectionClosed {
                    entry,
                    expected: buf.len(),
                    received,
                }
                .into());
            }
            Ok(count) => {
                tracing::info!(
                    entry,
                    data = %hex::encode(&buf[received..received + count]),
                    "recv"
                );
                received += count;
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => {
                return Err(ReplayError::Receive {
                    entry,
                    reason: e.to_string(),
                }
                .into());
            }
        }
    }
    Ok(())
}

/// Connects to a replay peer.
///
/// # Errors
///
/// Returns [`ReplayError::Connect`] if the connection cannot be made.
pub fn connect<A: ToSocketAddrs + std::fmt::Display>(address: A) -> Result<TcpStream> {
    let stream = TcpStream::connect(&address).map_err(|e| ReplayError::Connect {
        address: address.to_string(),
        reason: e.to_string(),
    })?;
    tracing::info!(%address, "connected");
    Ok(stream)
}

/// Listening side of a replay.
#[derive(Debug)]
pub struct ReplayServer {
    listener: TcpListener,
}

impl ReplayServer {
    /// Binds the listening socket.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::Listen`] if the address cannot be bound.
    pub fn bind<A: ToSocketAddrs + std::fmt::Display>(address: A) -> Result<Self> {
        let listener = TcpListener::bind(&address).map_err(|e| ReplayError::Listen {
            address: address.to_string(),
            reason: e.to_string(),
        })?;
        tracing::info!(%address, "listening");
        Ok(Self { listener })
    }

    /// Returns the bound address.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket has no local address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts one connection and replays `flow` over it.
    ///
    /// # Errors
    ///
    /// Returns an error if accepting fails or the session fails.
    pub fn serve_one(&self, flow: &Flow) -> Result<ReplaySummary> {
        let (mut stream, peer) = self.listener.accept().map_err(|e| ReplayError::Listen {
            address: self
                .listener
                .local_addr()
                .map_or_else(|_| "?".to_string(), |a| a.to_string()),
            reason: e.to_string(),
        })?;
        tracing::info!(%peer, "accepted connection");
        Replayer::new(flow, Role::Server).run(&mut stream)
    }

    /// Serves connections one after another.
    ///
    /// With `once` the first session's result is returned. Otherwise a
    /// failed session is logged and the next connection is accepted; the
    /// loop only ends on an accept failure.
    ///
    /// # Errors
    ///
    /// Returns the session error when `once` is set, or the accept error.
    pub fn serve(&self, flow: &Flow, once: bool) -> Result<ReplaySummary> {
        loop {
            match self.serve_one(flow) {
                Ok(summary) if once => return Ok(summary),
                Ok(summary) => tracing::info!(?summary, "session finished"),
                Err(e) if once => return Err(e),
                Err(crate::error::Error::Replay(e @ ReplayError::Listen { .. })) => {
                    return Err(e.into());
                }
                Err(e) => tracing::warn!(error = %e, "session failed"),
            }
        }
    }
}

/// Binds `address` and serves `flow` to incoming connections.
///
/// # Errors
///
/// See [`ReplayServer::bind`] and [`ReplayServer::serve`].
pub fn serve<A: ToSocketAddrs + std::fmt::Display>(
    address: A,
    flow: &Flow,
    once: bool,
) -> Result<ReplaySummary> {
    ReplayServer::bind(address)?.serve(flow, once)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Entry;
    use crate::error::Error;
    use std::io::Cursor;

    /// In-memory peer that hands out at most `chunk` bytes per read.
    struct Peer {
        input: Cursor<Vec<u8>>,
        chunk: usize,
        output: Vec<u8>,
    }

    impl Peer {
        fn new(input: &[u8], chunk: usize) -> Self {
            Self {
                input: Cursor::new(input.to_vec()),
                chunk,
                output: Vec::new(),
            }
        }
    }

    impl Read for Peer {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let len = buf.len().min(self.chunk);
            self.input.read(&mut buf[..len])
        }
    }

    impl Write for Peer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn conversation() -> Flow {
        Flow::from_entries(vec![
            Entry::new(Direction::Sent, 0, b"HELLO".to_vec()),
            Entry::new(Direction::Received, 0, b"WORLD!".to_vec()),
            Entry::new(Direction::Sent, 5, b"BYE".to_vec()),
        ])
    }

    #[test]
    fn test_roles() {
        assert_eq!(Role::Client.sends(), Direction::Sent);
        assert_eq!(Role::Client.expects(), Direction::Received);
        assert_eq!(Role::Server.sends(), Direction::Received);
        assert_eq!(Role::Server.expects(), Direction::Sent);
    }

    #[test]
    fn test_client_tolerates_partial_reads() {
        let flow = conversation();
        let mut peer = Peer::new(b"WORLD!", 1);

        let summary = Replayer::new(&flow, Role::Client).run(&mut peer).unwrap();
        assert_eq!(peer.output, b"HELLOBYE");
        assert_eq!(
            summary,
            ReplaySummary {
                sent_entries: 2,
                received_entries: 1,
                sent_bytes: 8,
                received_bytes: 6,
            }
        );
    }

    #[test]
    fn test_server_plays_other_side() {
        let flow = conversation();
        let mut peer = Peer::new(b"HELLOBYE", 3);

        let summary = Replayer::new(&flow, Role::Server).run(&mut peer).unwrap();
        assert_eq!(peer.output, b"WORLD!");
        assert_eq!(summary.received_entries, 2);
        assert_eq!(summary.sent_entries, 1);
    }

    #[test]
    fn test_received_content_not_compared() {
        let flow = conversation();
        let mut peer = Peer::new(b"xxxxxx", 6);
        assert!(Replayer::new(&flow, Role::Client).run(&mut peer).is_ok());
    }

    #[test]
    fn test_connection_closed_early() {
        let flow = conversation();
        let mut peer = Peer::new(b"WOR", 2);

        let err = Replayer::new(&flow, Role::Client)
            .run(&mut peer)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            Error::Replay(ReplayError::ConnectionClosed {
                entry: 1,
                expected: 6,
                received: 3
            })
        ));
    }

    #[test]
    fn test_tcp_loopback() {
        let flow = conversation();
        let server = ReplayServer::bind("127.0.0.1:0").unwrap();
        let address = server.local_addr().unwrap();

        let server_flow = flow.clone();
        let handle = std::thread::spawn(move || server.serve(&server_flow, true));

        let mut stream = connect(address).unwrap();
        let client = Replayer::new(&flow, Role::Client).run(&mut stream).unwrap();
        let served = handle.join().unwrap().unwrap();

        assert_eq!(client.sent_bytes, served.received_bytes);
        assert_eq!(client.received_bytes, served.sent_bytes);
    }

    #[test]
    fn test_connect_refused() {
        let server = ReplayServer::bind("127.0.0.1:0").unwrap();
        let address = server.local_addr().unwrap();
        drop(server);

        let err = connect(address).err().unwrap();
        assert!(matches!(err, Error::Replay(ReplayError::Connect { .. })));
    }
}

//! A sink that streams records to a live socket.
//!
//! Records are sent as newline-terminated JSON arrays. While the connection
//! is being established, records queue up and are sent in one batch once it
//! is up. The sink keeps nothing on disk; pair it with a
//! [`BufferingStore`](crate::BufferingStore) through a
//! [`FanoutSink`](crate::FanoutSink) when records must survive a crash.

use crate::sink::Sink;
use logspool_codec::Record;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// An established connection.
pub trait Connection: Send {
    /// Sends one payload.
    fn send(&mut self, payload: &[u8]) -> io::Result<()>;
}

/// Opens connections.
pub trait Connector: Send + Sync {
    /// Connects, blocking until the connection is usable or has failed.
    fn connect(&self) -> io::Result<Box<dyn Connection>>;
}

impl Connection for TcpStream {
    fn send(&mut self, payload: &[u8]) -> io::Result<()> {
        self.write_all(payload)?;
        self.flush()
    }
}

/// Connects over TCP.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
    timeout: Duration,
}

impl TcpConnector {
    /// Creates a connector for `addr` (`host:port`).
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }
}

impl Connector for TcpConnector {
    fn connect(&self) -> io::Result<Box<dyn Connection>> {
        let mut last_err = None;
        for addr in self.addr.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    return Ok(Box::new(stream));
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::AddrNotAvailable, "address resolved to nothing")
        }))
    }
}

/// Where the sink is in its connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and no attempt running.
    NotConnected,
    /// A connection attempt is running; records are queued.
    Connecting,
    /// Records are sent as they arrive.
    Connected,
}

struct State {
    phase: ConnectionState,
    pending: VecDeque<Record>,
    connection: Option<Box<dyn Connection>>,
}

struct Shared {
    connector: Box<dyn Connector>,
    max_pending: usize,
    state: Mutex<State>,
}

impl Shared {
    fn enqueue(&self, state: &mut State, record: Record) {
        if state.pending.len() >= self.max_pending {
            state.pending.pop_front();
            warn!(max_pending = self.max_pending, "socket queue full; dropping oldest record");
        }
        state.pending.push_back(record);
    }

    fn finish_connect(&self, result: io::Result<Box<dyn Connection>>) {
        let mut state = self.state.lock();
        let mut connection = match result {
            Ok(connection) => connection,
            Err(e) => {
                debug!(error = %e, "socket connect failed");
                state.phase = ConnectionState::NotConnected;
                return;
            }
        };

        if !state.pending.is_empty() {
            let batch: Vec<Record> = state.pending.iter().cloned().collect();
            if let Err(e) = send_batch(connection.as_mut(), &batch) {
                debug!(error = %e, "socket send failed");
                state.phase = ConnectionState::NotConnected;
                return;
            }
            state.pending.clear();
        }

        state.connection = Some(connection);
        state.phase = ConnectionState::Connected;
    }
}

fn send_batch(connection: &mut dyn Connection, records: &[Record]) -> io::Result<()> {
    let mut payload = serde_json::to_vec(records)?;
    payload.push(b'\n');
    connection.send(&payload)
}

/// Streams records over a connection with a not-connected → connecting →
/// connected state machine.
///
/// The first record logged while not connected starts a background connect
/// attempt. Records logged until it succeeds are queued (oldest dropped past
/// `max_pending`) and sent as one batch on connect. A failed send drops the
/// connection and requeues the record; the next `log` reconnects.
pub struct SocketSink {
    shared: Arc<Shared>,
}

impl SocketSink {
    /// Creates a sink that connects lazily through `connector`.
    pub fn new(connector: impl Connector + 'static, max_pending: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                connector: Box::new(connector),
                max_pending: max_pending.max(1),
                state: Mutex::new(State {
                    phase: ConnectionState::NotConnected,
                    pending: VecDeque::new(),
                    connection: None,
                }),
            }),
        }
    }

    /// Creates a TCP sink for `addr`.
    pub fn tcp(addr: impl Into<String>) -> Self {
        Self::new(TcpConnector::new(addr, Duration::from_secs(5)), 10_000)
    }

    /// Returns the connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state.lock().phase
    }

    /// Returns the number of queued records.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    fn start_connect(&self) {
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("logspool-socket".into())
            .spawn(move || {
                let result = shared.connector.connect();
                shared.finish_connect(result);
            });

        if let Err(e) = spawned {
            warn!(error = %e, "failed to start socket connect");
            self.shared.state.lock().phase = ConnectionState::NotConnected;
        }
    }
}

impl Sink for SocketSink {
    fn log(&self, record: Record) {
        let mut state = self.shared.state.lock();

        match state.phase {
            ConnectionState::Connected => {
                let sent = match state.connection.as_mut() {
                    Some(connection) => send_batch(connection.as_mut(), std::slice::from_ref(&record)),
                    None => Err(io::Error::from(io::ErrorKind::NotConnected)),
                };
                if let Err(e) = sent {
                    debug!(error = %e, "socket send failed; reconnecting");
                    state.connection = None;
                    state.phase = ConnectionState::NotConnected;
                    self.shared.enqueue(&mut state, record);
                }
            }
            ConnectionState::Connecting => {
                self.shared.enqueue(&mut state, record);
            }
            ConnectionState::NotConnected => {
                self.shared.enqueue(&mut state, record);
                state.phase = ConnectionState::Connecting;
                drop(state);
                self.start_connect();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logspool_codec::Severity;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::sync::mpsc::{self, Receiver, SyncSender};
    use std::time::Instant;

    /// Connector whose connect blocks until the test releases it.
    struct Gate {
        release: Mutex<Receiver<bool>>,
        sent: Arc<Mutex<Vec<Vec<Record>>>>,
        fail_sends: bool,
    }

    struct Memory {
        sent: Arc<Mutex<Vec<Vec<Record>>>>,
        fail: bool,
    }

    impl Connection for Memory {
        fn send(&mut self, payload: &[u8]) -> io::Result<()> {
            if self.fail {
                return Err(io::ErrorKind::BrokenPipe.into());
            }
            let batch = serde_json::from_slice(&payload[..payload.len() - 1])?;
            self.sent.lock().push(batch);
            Ok(())
        }
    }

    impl Connector for Gate {
        fn connect(&self) -> io::Result<Box<dyn Connection>> {
            let ok = self
                .release
                .lock()
                .recv()
                .map_err(|_| io::Error::from(io::ErrorKind::Other))?;
            if ok {
                Ok(Box::new(Memory {
                    sent: Arc::clone(&self.sent),
                    fail: self.fail_sends,
                }))
            } else {
                Err(io::ErrorKind::ConnectionRefused.into())
            }
        }
    }

    fn gated(fail_sends: bool) -> (SocketSink, SyncSender<bool>, Arc<Mutex<Vec<Vec<Record>>>>) {
        let (release, gate) = mpsc::sync_channel(4);
        let sent = Arc::new(Mutex::new(Vec::new()));
        let sink = SocketSink::new(
            Gate {
                release: Mutex::new(gate),
                sent: Arc::clone(&sent),
                fail_sends,
            },
            100,
        );
        (sink, release, sent)
    }

    fn wait_for(sink: &SocketSink, state: ConnectionState) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while sink.state() != state {
            assert!(Instant::now() < deadline, "never reached {state:?}");
            thread::sleep(Duration::from_millis(2));
        }
    }

    fn record(message: &str) -> Record {
        Record::new(Severity::Info, message)
    }

    #[test]
    fn queues_while_connecting_then_drains() {
        let (sink, release, sent) = gated(false);

        sink.log(record("a"));
        assert_eq!(sink.state(), ConnectionState::Connecting);
        sink.log(record("b"));
        assert_eq!(sink.pending(), 2);

        release.send(true).unwrap();
        wait_for(&sink, ConnectionState::Connected);
        assert_eq!(sink.pending(), 0);

        sink.log(record("c"));
        let sent = sent.lock();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].len(), 2);
        assert_eq!(sent[1][0].message, "c");
    }

    #[test]
    fn failed_connect_keeps_queue_and_retries() {
        let (sink, release, sent) = gated(false);

        sink.log(record("a"));
        release.send(false).unwrap();
        wait_for(&sink, ConnectionState::NotConnected);
        assert_eq!(sink.pending(), 1);

        sink.log(record("b"));
        release.send(true).unwrap();
        wait_for(&sink, ConnectionState::Connected);
        assert_eq!(sent.lock()[0].len(), 2);
    }

    #[test]
    fn failed_drain_returns_to_not_connected() {
        let (sink, release, _) = gated(true);

        sink.log(record("a"));
        release.send(true).unwrap();
        wait_for(&sink, ConnectionState::NotConnected);
        assert_eq!(sink.pending(), 1);
    }

    #[test]
    fn queue_is_bounded() {
        let (release, gate) = mpsc::sync_channel(1);
        let sink = SocketSink::new(
            Gate {
                release: Mutex::new(gate),
                sent: Arc::new(Mutex::new(Vec::new())),
                fail_sends: false,
            },
            2,
        );

        for m in ["a", "b", "c"] {
            sink.log(record(m));
        }
        assert_eq!(sink.pending(), 2);
        drop(release);
    }

    #[test]
    fn tcp_sink_streams_json_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            serde_json::from_str::<Vec<Record>>(line.trim_end()).unwrap()
        });

        let sink = SocketSink::tcp(addr);
        sink.log(record("over tcp"));

        let received = server.join().unwrap();
        assert_eq!(received[0].message, "over tcp");
    }
}

//! `MapperTransport`: the map-worker side of spec.md §4.3. Owns `R`
//! outgoing connections and `R` outbound [`SignalingQueue`]s, one per
//! reducer destination, and runs a single send-loop I/O thread that fans
//! queued payloads out as length-prefixed frames.

use crate::connector::SendConnector;
use crate::error::{Result, TransportError};
use mio::net::TcpStream;
use mio::{Events, Poll, PollOpt, Ready, Token};
use mrlite_base::wire::encode_record;
use mrlite_queue::{Add, SignalingQueue};
use slog::{crit, debug, o, Logger};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub struct MapperTransport {
    queues: Vec<Arc<SignalingQueue>>,
    io_thread: Option<JoinHandle<Result<()>>>,
}

impl MapperTransport {
    /// Connects to every reducer in `reducers`, in order, and spawns the
    /// send-loop I/O thread. `queue_capacity` is `Q_m` in bytes, applied to
    /// each of the `R` outbound queues independently.
    pub fn connect(reducers: &[SocketAddr], queue_capacity: usize, log: &Logger) -> Result<MapperTransport> {
        let mut streams = Vec::with_capacity(reducers.len());
        for addr in reducers {
            let std_stream = std::net::TcpStream::connect(addr)?;
            std_stream.set_nonblocking(true)?;
            streams.push(TcpStream::from_stream(std_stream)?);
        }

        let queues: Vec<Arc<SignalingQueue>> = (0..reducers.len())
            .map(|_| Arc::new(SignalingQueue::new(queue_capacity, 1)))
            .collect();

        let poll = Poll::new()?;
        for (i, stream) in streams.iter().enumerate() {
            poll.register(stream, Token(i), Ready::writable(), PollOpt::level())?;
        }

        let thread_queues = queues.clone();
        let thread_log = log.new(o!("component" => "transport-send"));
        let io_thread = thread::spawn(move || send_loop(poll, streams, thread_queues, thread_log));

        Ok(MapperTransport {
            queues,
            io_thread: Some(io_thread),
        })
    }

    /// Routes `(key, value)` to reducer `dest`, blocking if that
    /// destination's queue is full (backpressure).
    pub fn send(&self, dest: usize, key: &[u8], value: &[u8]) -> Result<()> {
        let payload = encode_record(key, value);
        match self.queues[dest].add(&payload, true) {
            Add::Added(_) => Ok(()),
            Add::Rejected => Err(TransportError::OversizeRecord {
                size: payload.len() as u64,
                limit: self.queues[dest].capacity() as u64,
            }),
            Add::WouldBlock => unreachable!("blocking add cannot return WouldBlock"),
        }
    }

    /// Declares that this mapper will send nothing more to `dest`.
    pub fn signal(&self, dest: usize) {
        self.queues[dest].signal(0);
    }

    /// Declares end-of-stream to every destination.
    pub fn signal_all(&self) {
        for i in 0..self.queues.len() {
            self.signal(i);
        }
    }

    pub fn num_destinations(&self) -> usize {
        self.queues.len()
    }

    /// Waits for the send-loop thread to finish flushing every terminator
    /// frame. Callers must have signaled every destination first.
    pub fn join(mut self) -> Result<()> {
        self.io_thread
            .take()
            .expect("join called twice")
            .join()
            .unwrap_or_else(|_| Err(TransportError::Io(std::io::Error::new(std::io::ErrorKind::Other, "send-loop thread panicked"))))
    }
}

fn send_loop(poll: Poll, mut streams: Vec<TcpStream>, queues: Vec<Arc<SignalingQueue>>, log: Logger) -> Result<()> {
    let n = streams.len();
    let mut events = Events::with_capacity(n.max(1));
    let mut connectors: Vec<SendConnector> = (0..n).map(|_| SendConnector::new()).collect();
    let mut finished = vec![false; n];
    let mut remaining = n;

    while remaining > 0 {
        poll.poll(&mut events, Some(Duration::from_millis(50)))?;

        for event in &events {
            let i = event.token().0;
            if finished[i] {
                continue;
            }
            match connectors[i].pump(&queues[i], &mut streams[i]) {
                Ok(true) => {
                    debug!(log, "destination finished"; "dest" => i);
                    finished[i] = true;
                    remaining -= 1;
                    poll.deregister(&streams[i])?;
                }
                Ok(false) => {}
                Err(err) => {
                    crit!(log, "fatal send error"; "dest" => i, "error" => %err);
                    return Err(err);
                }
            }
        }

        // Writable readiness is level-triggered and a destination with an
        // empty queue stays writable, so this loop polls continuously while
        // any destination is still open; the short sleep keeps that from
        // pinning a CPU core while queues are idle.
        if remaining > 0 {
            thread::sleep(Duration::from_millis(1));
        }
    }

    Ok(())
}

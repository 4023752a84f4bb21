//! `ReducerTransport`: the reduce-worker side of spec.md §4.3. Accepts
//! exactly `M` connections from map workers, then runs a single
//! receive-loop I/O thread that reassembles frames from every connection
//! into one shared inbound [`SignalingQueue`].

use crate::connector::RecvConnector;
use crate::error::Result;
use mio::net::TcpStream;
use mio::{Events, Poll, PollOpt, Ready, Token};
use mrlite_queue::SignalingQueue;
use slog::{crit, debug, info, o, Logger};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub struct ReducerTransport {
    inbound: Arc<SignalingQueue>,
    io_thread: Option<JoinHandle<Result<()>>>,
}

impl ReducerTransport {
    /// Binds `addr` and blocks accepting exactly `num_mappers` connections
    /// before spawning the receive-loop I/O thread. `queue_capacity` is
    /// `Q_r` in bytes for the single shared inbound queue.
    pub fn bind(addr: &SocketAddr, num_mappers: usize, queue_capacity: usize, log: &Logger) -> Result<ReducerTransport> {
        let listener = std::net::TcpListener::bind(addr)?;
        let mut streams = Vec::with_capacity(num_mappers);
        for _ in 0..num_mappers {
            let (stream, peer) = listener.accept()?;
            info!(log, "accepted mapper connection"; "peer" => %peer);
            stream.set_nonblocking(true)?;
            streams.push(TcpStream::from_stream(stream)?);
        }

        let inbound = Arc::new(SignalingQueue::new(queue_capacity, 1));

        let poll = Poll::new()?;
        for (i, stream) in streams.iter().enumerate() {
            poll.register(stream, Token(i), Ready::readable(), PollOpt::level())?;
        }

        let thread_inbound = inbound.clone();
        let thread_log = log.new(o!("component" => "transport-recv"));
        let io_thread = thread::spawn(move || recv_loop(poll, streams, thread_inbound, thread_log));

        Ok(ReducerTransport {
            inbound,
            io_thread: Some(io_thread),
        })
    }

    /// Blocks for the next inbound payload. Returns `None` once every
    /// mapper has signaled end-of-stream and the queue has drained.
    pub fn recv(&self) -> Option<Vec<u8>> {
        self.inbound.remove(true)
    }

    /// Joins the receive-loop thread, surfacing any fatal protocol/I/O
    /// error it hit.
    pub fn join(mut self) -> Result<()> {
        self.io_thread
            .take()
            .expect("join called twice")
            .join()
            .unwrap_or_else(|_| {
                Err(crate::error::TransportError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "receive-loop thread panicked",
                )))
            })
    }
}

fn recv_loop(poll: Poll, mut streams: Vec<TcpStream>, inbound: Arc<SignalingQueue>, log: Logger) -> Result<()> {
    let n = streams.len();
    let mut events = Events::with_capacity(n.max(1));
    let mut connectors: Vec<RecvConnector> = (0..n).map(|_| RecvConnector::new()).collect();
    let mut finished = vec![false; n];
    let mut remaining = n;

    while remaining > 0 {
        poll.poll(&mut events, Some(Duration::from_millis(50)))?;

        for event in &events {
            let i = event.token().0;
            if finished[i] {
                continue;
            }
            match connectors[i].pump(&mut streams[i], &inbound) {
                Ok(true) => {
                    debug!(log, "peer signaled end-of-stream"; "peer" => i);
                    finished[i] = true;
                    remaining -= 1;
                    poll.deregister(&streams[i])?;
                }
                Ok(false) => {}
                Err(err) => {
                    crit!(log, "fatal receive error"; "peer" => i, "error" => %err);
                    return Err(err);
                }
            }
        }
    }

    inbound.signal(0);
    info!(log, "all mappers signaled end-of-stream");
    Ok(())
}

//! The many-producer, many-consumer transport between map and reduce
//! workers (spec.md §4.3): length-prefixed TCP framing over a `mio`
//! event loop on one side, [`mrlite_queue::SignalingQueue`] on the other.
//!
//! A map worker's [`MapperTransport`] owns `R` outgoing connections, one
//! per reducer, each backed by its own outbound queue so a slow reducer
//! only backs up its own destination. A reduce worker's
//! [`ReducerTransport`] owns `M` incoming connections funneling into a
//! single shared inbound queue.

mod buffer;
mod chunk;
mod chunkpool;
mod connector;
mod error;
mod mapper;
mod reducer;

pub use error::{Result, TransportError};
pub use mapper::MapperTransport;
pub use reducer::ReducerTransport;

#[cfg(test)]
mod integration_tests {
    use super::*;
    use slog::Logger;
    use std::net::{SocketAddr, TcpListener};
    use std::thread;

    fn discard_log() -> Logger {
        mrlite_base::logging::discard()
    }

    fn free_port() -> u16 {
        TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
    }

    #[test]
    fn one_mapper_one_reducer_round_trips_and_terminates() {
        let port = free_port();
        let addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();
        let log = discard_log();

        let reducer_log = log.clone();
        let server = thread::spawn(move || ReducerTransport::bind(&addr, 1, 1 << 16, &reducer_log).unwrap());

        // Give the listener a moment to bind before the mapper connects.
        thread::sleep(std::time::Duration::from_millis(50));

        let mapper = MapperTransport::connect(&[addr], 1 << 16, &log).unwrap();
        mapper.send(0, b"fox", b"2").unwrap();
        mapper.send(0, b"the", b"1").unwrap();
        mapper.signal(0);
        mapper.join().unwrap();

        let reducer = server.join().unwrap();
        let mut received = Vec::new();
        while let Some(payload) = reducer.recv() {
            received.push(mrlite_base::wire::decode_record(&payload).unwrap());
        }
        assert_eq!(reducer.recv(), None);
        assert_eq!(
            received,
            vec![(b"fox".to_vec(), b"2".to_vec()), (b"the".to_vec(), b"1".to_vec())]
        );
        reducer.join().unwrap();
    }

    #[test]
    fn terminator_propagates_from_multiple_mappers() {
        let port = free_port();
        let addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();
        let log = discard_log();

        let reducer_log = log.clone();
        let server = thread::spawn(move || ReducerTransport::bind(&addr, 3, 1 << 16, &reducer_log).unwrap());
        thread::sleep(std::time::Duration::from_millis(50));

        let mut mappers = Vec::new();
        for _ in 0..3 {
            let mapper = MapperTransport::connect(&[addr], 1 << 16, &log).unwrap();
            mapper.signal(0);
            mappers.push(mapper);
        }
        for mapper in mappers {
            mapper.join().unwrap();
        }

        let reducer = server.join().unwrap();
        assert_eq!(reducer.recv(), None);
        reducer.join().unwrap();
    }
}

//! `SignalingQueue`: a fixed-capacity circular byte buffer coordinating `P`
//! producers and any number of consumers within a single process (spec.md
//! §4.1). Guarded by one mutex and two condition variables, exactly as the
//! original system's `SignalingQueue`/`ConditionVariable` pair — Rust's
//! `std::sync::{Mutex, Condvar}` is the direct, idiomatic replacement for
//! that hand-rolled pthread wrapper.

use std::collections::{HashSet, VecDeque};
use std::sync::{Condvar, Mutex};

/// Result of [`SignalingQueue::remove_into`].
#[derive(Debug, Eq, PartialEq)]
pub enum RemoveInto {
    /// The message was copied into the destination buffer; holds its size.
    Size(usize),
    /// The queue is empty and every producer has signaled completion (or
    /// the call was non-blocking and the queue was momentarily empty).
    Empty,
    /// The destination buffer is smaller than the next message.
    TooSmall,
}

/// Result of [`SignalingQueue::add`].
#[derive(Debug, Eq, PartialEq)]
pub enum Add {
    /// Bytes were enqueued; holds the message size.
    Added(usize),
    /// Non-blocking `add` found insufficient free space.
    WouldBlock,
    /// The payload is larger than the queue's capacity, of invalid size, or
    /// the queue is already closed to further production.
    Rejected,
}

struct State {
    buffer: Vec<u8>,
    capacity: usize,
    free: usize,
    write_pos: usize,
    positions: VecDeque<(usize, usize)>,
    num_producers: usize,
    finished_producers: HashSet<usize>,
}

impl State {
    fn closed_to_production(&self) -> bool {
        self.finished_producers.len() >= self.num_producers
    }
}

pub struct SignalingQueue {
    state: Mutex<State>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl SignalingQueue {
    /// `capacity` is in bytes; `num_producers` is the number of distinct
    /// producer ids that must each call [`SignalingQueue::signal`] before
    /// consumers observe end-of-stream.
    pub fn new(capacity: usize, num_producers: usize) -> SignalingQueue {
        assert!(capacity > 0, "SignalingQueue capacity must be positive");
        SignalingQueue {
            state: Mutex::new(State {
                buffer: vec![0u8; capacity],
                capacity,
                free: capacity,
                write_pos: 0,
                positions: VecDeque::new(),
                num_producers,
                finished_producers: HashSet::new(),
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    /// Enqueues `bytes`. Blocking `add` waits for free space; non-blocking
    /// `add` returns [`Add::WouldBlock`] immediately if there isn't enough.
    pub fn add(&self, bytes: &[u8], blocking: bool) -> Add {
        let size = bytes.len();
        if size == 0 || size > self.capacity() {
            return Add::Rejected;
        }

        let mut state = self.state.lock().unwrap();
        if state.closed_to_production() {
            return Add::Rejected;
        }

        while size > state.free {
            if !blocking {
                return Add::WouldBlock;
            }
            state = self.not_full.wait(state).unwrap();
        }

        let write_pos = state.write_pos;
        let capacity = state.capacity;
        state.positions.push_back((write_pos, size));
        state.free -= size;

        if write_pos + size <= capacity {
            state.buffer[write_pos..write_pos + size].copy_from_slice(bytes);
            state.write_pos = (write_pos + size) % capacity;
        } else {
            let first = capacity - write_pos;
            state.buffer[write_pos..capacity].copy_from_slice(&bytes[..first]);
            state.buffer[..size - first].copy_from_slice(&bytes[first..]);
            state.write_pos = size - first;
        }

        drop(state);
        self.not_empty.notify_one();
        Add::Added(size)
    }

    /// Removes the next message into an owned `Vec<u8>`. Always succeeds in
    /// size terms (unlike [`SignalingQueue::remove_into`], there's no fixed
    /// destination to overflow).
    pub fn remove(&self, blocking: bool) -> Option<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(&(pos, len)) = state.positions.front() {
                let capacity = state.capacity;
                let mut out = vec![0u8; len];
                if pos + len <= capacity {
                    out.copy_from_slice(&state.buffer[pos..pos + len]);
                } else {
                    let first = capacity - pos;
                    out[..first].copy_from_slice(&state.buffer[pos..capacity]);
                    out[first..].copy_from_slice(&state.buffer[..len - first]);
                }
                state.positions.pop_front();
                state.free += len;
                drop(state);
                self.not_full.notify_one();
                return Some(out);
            }

            if state.closed_to_production() {
                return None;
            }
            if !blocking {
                return None;
            }
            state = self.not_empty.wait(state).unwrap();
        }
    }

    /// Removes the next message into `dst`. Returns [`RemoveInto::TooSmall`]
    /// without consuming the message if `dst` is smaller than it.
    pub fn remove_into(&self, dst: &mut [u8], blocking: bool) -> RemoveInto {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(&(pos, len)) = state.positions.front() {
                if len > dst.len() {
                    return RemoveInto::TooSmall;
                }
                let capacity = state.capacity;
                if pos + len <= capacity {
                    dst[..len].copy_from_slice(&state.buffer[pos..pos + len]);
                } else {
                    let first = capacity - pos;
                    dst[..first].copy_from_slice(&state.buffer[pos..capacity]);
                    dst[first..len].copy_from_slice(&state.buffer[..len - first]);
                }
                state.positions.pop_front();
                state.free += len;
                drop(state);
                self.not_full.notify_one();
                return RemoveInto::Size(len);
            }

            if state.closed_to_production() {
                return RemoveInto::Empty;
            }
            if !blocking {
                return RemoveInto::Empty;
            }
            state = self.not_empty.wait(state).unwrap();
        }
    }

    /// Records that producer `producer_id` will add nothing more. Once every
    /// producer has signaled, blocked consumers wake up and observe
    /// end-of-stream.
    pub fn signal(&self, producer_id: usize) {
        let mut state = self.state.lock().unwrap();
        state.finished_producers.insert(producer_id);
        let done = state.closed_to_production();
        drop(state);
        if done {
            self.not_empty.notify_all();
        }
    }

    /// `true` iff the queue is empty and every producer has signaled.
    pub fn closed(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.positions.is_empty() && state.closed_to_production()
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().unwrap().capacity
    }

    /// Free byte count; for the invariant `free + live_payload == capacity`.
    pub fn free_bytes(&self) -> usize {
        self.state.lock().unwrap().free
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn add_then_remove_roundtrips() {
        let q = SignalingQueue::new(64, 1);
        assert_eq!(q.add(b"hello", true), Add::Added(5));
        assert_eq!(q.remove(true).unwrap(), b"hello");
    }

    #[test]
    fn oversize_message_is_rejected() {
        let q = SignalingQueue::new(4, 1);
        assert_eq!(q.add(b"hello", true), Add::Rejected);
    }

    #[test]
    fn nonblocking_add_on_full_queue_returns_would_block() {
        let q = SignalingQueue::new(4, 1);
        assert_eq!(q.add(b"ab", true), Add::Added(2));
        assert_eq!(q.add(b"ab", true), Add::Added(2));
        assert_eq!(q.add(b"x", false), Add::WouldBlock);
    }

    #[test]
    fn remove_on_empty_signaled_queue_returns_none() {
        let q = SignalingQueue::new(16, 1);
        q.signal(0);
        assert_eq!(q.remove(true), None);
        assert!(q.closed());
    }

    #[test]
    fn remove_into_too_small_buffer_fails_without_consuming() {
        let q = SignalingQueue::new(16, 1);
        q.add(b"hello", true);
        let mut tiny = [0u8; 2];
        assert_eq!(q.remove_into(&mut tiny, true), RemoveInto::TooSmall);
        // message still present
        assert_eq!(q.remove(true).unwrap(), b"hello");
    }

    #[test]
    fn free_plus_live_equals_capacity() {
        let q = SignalingQueue::new(32, 1);
        q.add(b"abcdefgh", true);
        assert_eq!(q.free_bytes() + 8, q.capacity());
    }

    #[test]
    fn wraps_around_the_ring() {
        let q = SignalingQueue::new(10, 1);
        assert_eq!(q.add(b"abcde", true), Add::Added(5)); // write_pos -> 5
        assert_eq!(q.remove(true).unwrap(), b"abcde"); // free -> 10, write_pos stays 5
        assert_eq!(q.add(b"fghij", true), Add::Added(5)); // write_pos -> 0
        assert_eq!(q.add(b"klmno", true), Add::Added(5)); // wraps: pos 0..10 then 0
        assert_eq!(q.remove(true).unwrap(), b"fghij");
        assert_eq!(q.remove(true).unwrap(), b"klmno");
    }

    #[test]
    fn signal_wakes_blocked_consumer() {
        let q = Arc::new(SignalingQueue::new(16, 1));
        let q2 = q.clone();
        let handle = thread::spawn(move || q2.remove(true));
        thread::sleep(Duration::from_millis(50));
        q.signal(0);
        assert_eq!(handle.join().unwrap(), None);
    }

    #[test]
    fn multiple_producers_all_must_signal() {
        let q = SignalingQueue::new(16, 2);
        q.signal(0);
        assert!(!q.closed());
        q.signal(1);
        assert!(q.closed());
    }

    #[test]
    fn signaling_unknown_producer_ids_is_harmless() {
        let q = SignalingQueue::new(16, 1);
        q.signal(42);
        assert!(q.closed());
    }
}

//! Per-connection framing state machines. A [`SendConnector`] turns queued
//! payloads into length-prefixed frames on the wire (the mapper side); a
//! [`RecvConnector`] turns a wire byte stream back into payloads (the
//! reducer side). Both sit one layer above [`crate::buffer::Buffer`] and
//! below [`crate::mapper::MapperTransport`]/[`crate::reducer::ReducerTransport`],
//! exactly the split spec.md §4.2 draws between `FramedSocket` (bytes) and
//! the Transport layer (frames).

use crate::buffer::Buffer;
use crate::error::{Result, TransportError};
use byteorder::{LittleEndian, WriteBytesExt};
use mrlite_queue::SignalingQueue;
use std::io::{Read, Write};

#[derive(Debug, Eq, PartialEq)]
enum SendState {
    /// Still may have more payloads to pull from the outbound queue.
    Active,
    /// The terminator frame has been queued into `out` but maybe not yet
    /// flushed to the socket.
    Draining,
    /// Terminator frame fully flushed; nothing more to do for this peer.
    Done,
}

/// Drains one outbound [`SignalingQueue`] into one socket as length-prefixed
/// frames, finishing with a zero-length terminator once the queue closes.
pub struct SendConnector {
    out: Buffer,
    state: SendState,
}

impl SendConnector {
    pub fn new() -> SendConnector {
        SendConnector {
            out: Buffer::new(),
            state: SendState::Active,
        }
    }

    /// Makes as much progress as the queue and socket allow without
    /// blocking. Returns `Ok(true)` once the terminator frame has been
    /// fully written — the caller should stop polling this connector.
    pub fn pump<W: Write>(&mut self, queue: &SignalingQueue, socket: &mut W) -> Result<bool> {
        loop {
            if self.state == SendState::Done {
                return Ok(true);
            }

            if self.out.is_empty() {
                match self.state {
                    SendState::Draining => {
                        self.state = SendState::Done;
                        continue;
                    }
                    SendState::Active => match queue.remove(false) {
                        Some(payload) => {
                            let mut framed = Vec::with_capacity(4 + payload.len());
                            framed.write_u32::<LittleEndian>(payload.len() as u32)?;
                            framed.extend_from_slice(&payload);
                            self.out.push(&framed);
                        }
                        None => {
                            if queue.closed() {
                                self.out.push(&0u32.to_le_bytes());
                                self.state = SendState::Draining;
                            } else {
                                return Ok(false);
                            }
                        }
                    },
                    SendState::Done => unreachable!(),
                }
                continue;
            }

            self.out.egress(&mut *socket)?;
            if !self.out.is_empty() {
                // Socket would block with bytes still pending; wait for the
                // next writable readiness event.
                return Ok(false);
            }
        }
    }
}

impl Default for SendConnector {
    fn default() -> Self {
        SendConnector::new()
    }
}

enum RecvState {
    Length,
    Body(u32),
}

/// Reassembles length-prefixed frames read off one socket into complete
/// payloads, pushed into the shared inbound [`SignalingQueue`]. A
/// zero-length frame marks this peer done and is reported back to the
/// caller rather than enqueued.
pub struct RecvConnector {
    staging: Buffer,
    state: RecvState,
}

impl RecvConnector {
    pub fn new() -> RecvConnector {
        RecvConnector {
            staging: Buffer::new(),
            state: RecvState::Length,
        }
    }

    /// Reads whatever is available from `socket`, then extracts as many
    /// complete frames as the staged bytes allow. Returns `Ok(true)` the
    /// call in which the peer's terminator frame is observed.
    pub fn pump<R: Read>(&mut self, socket: &mut R, queue: &SignalingQueue) -> Result<bool> {
        self.staging.ingress(&mut *socket)?;

        loop {
            match self.state {
                RecvState::Length => {
                    if self.staging.len() < 4 {
                        return Ok(false);
                    }
                    let header = self.staging.take(4);
                    let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
                    if len == 0 {
                        return Ok(true);
                    }
                    self.state = RecvState::Body(len);
                }
                RecvState::Body(len) => {
                    if (self.staging.len() as u64) < len as u64 {
                        return Ok(false);
                    }
                    let payload = self.staging.take(len as usize);
                    match queue.add(&payload, true) {
                        mrlite_queue::Add::Rejected => {
                            return Err(TransportError::OversizeRecord {
                                size: len as u64,
                                limit: queue.capacity() as u64,
                            });
                        }
                        _ => {}
                    }
                    self.state = RecvState::Length;
                }
            }
        }
    }
}

impl Default for RecvConnector {
    fn default() -> Self {
        RecvConnector::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mrlite_base::wire::encode_record;
    use std::io::Cursor;
    use std::sync::Arc;

    #[test]
    fn send_connector_frames_then_terminates() {
        let queue = SignalingQueue::new(1024, 1);
        queue.add(&encode_record(b"fox", b"2"), true);
        queue.signal(0);

        let mut connector = SendConnector::new();
        let mut wire = Vec::new();
        loop {
            if connector.pump(&queue, &mut wire).unwrap() {
                break;
            }
        }

        let mut expect = Vec::new();
        let payload = encode_record(b"fox", b"2");
        expect.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
        expect.extend_from_slice(&payload);
        expect.write_u32::<LittleEndian>(0).unwrap();
        assert_eq!(wire, expect);
    }

    #[test]
    fn recv_connector_reassembles_frames_and_reports_terminator() {
        let payload = encode_record(b"fox", b"2");
        let mut wire = Vec::new();
        wire.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
        wire.extend_from_slice(&payload);
        wire.write_u32::<LittleEndian>(0).unwrap();

        let queue = Arc::new(SignalingQueue::new(1024, 1));
        let mut connector = RecvConnector::new();
        let mut cursor = Cursor::new(wire);
        let mut terminated = false;
        loop {
            if connector.pump(&mut cursor, &queue).unwrap() {
                terminated = true;
                break;
            }
            if cursor.position() as usize == cursor.get_ref().len() {
                break;
            }
        }
        assert!(terminated);
        assert_eq!(queue.remove(false).unwrap(), payload);
    }

    #[test]
    fn recv_connector_handles_a_frame_split_across_reads() {
        let payload = encode_record(b"the", b"1");
        let mut wire = Vec::new();
        wire.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
        wire.extend_from_slice(&payload);

        let queue = Arc::new(SignalingQueue::new(1024, 1));
        let mut connector = RecvConnector::new();

        let mid = wire.len() / 2;
        let mut first = Cursor::new(wire[..mid].to_vec());
        assert!(!connector.pump(&mut first, &queue).unwrap());
        assert!(queue.remove(false).is_none());

        let mut second = Cursor::new(wire[mid..].to_vec());
        assert!(!connector.pump(&mut second, &queue).unwrap());
        assert_eq!(queue.remove(false).unwrap(), payload);
    }
}

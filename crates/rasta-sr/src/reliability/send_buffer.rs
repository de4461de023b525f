// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Send ring with retransmission support.
//!
//! Entries progress through three zones: confirmed entries are dropped from
//! the front, already-sent-but-unconfirmed entries follow, and not-yet-sent
//! entries sit at the back. `not_sent` tracks the size of the back zone;
//! `used > not_sent` therefore means at least one transmitted entry is
//! still awaiting confirmation.
//!
//! When the peer requests a retransmission the whole ring is rebuilt into a
//! scratch ring: one RetrResp, the surviving Data traffic re-framed as
//! RetrData with fresh sequence numbers, and a terminating heartbeat. The
//! scratch ring is owned by the [`SendBufferSet`] so steady-state operation
//! never allocates.

use std::collections::VecDeque;

use crate::protocol::message::{self, MessageCodec, MessageHeaderCreate, MessageType, Pdu};
use crate::{Error, Result};

/// One send ring entry.
#[derive(Debug, Clone)]
struct SendEntry {
    /// Entry was handed to the redundancy layer at least once.
    already_sent: bool,
    pdu: Pdu,
}

/// Per-connection send ring.
#[derive(Debug)]
pub struct SendBuffer {
    capacity: u16,
    entries: VecDeque<SendEntry>,
    /// Entries at the back of the ring not yet handed to the adapter.
    not_sent: u16,
}

impl SendBuffer {
    /// Create an empty ring with the given capacity.
    pub fn new(capacity: u16) -> SendBuffer {
        SendBuffer {
            capacity,
            entries: VecDeque::with_capacity(capacity as usize),
            not_sent: 0,
        }
    }

    /// Drop every entry and reset the send markers.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.not_sent = 0;
    }

    /// Append a PDU as not-yet-sent.
    pub fn add(&mut self, pdu: Pdu) -> Result<()> {
        if self.entries.len() >= self.capacity as usize {
            return Err(Error::SendBufferFull);
        }
        self.entries.push_back(SendEntry { already_sent: false, pdu });
        self.not_sent += 1;
        Ok(())
    }

    /// Copy out the oldest not-yet-sent PDU and mark it sent.
    pub fn read_next(&mut self) -> Option<Pdu> {
        if self.not_sent == 0 {
            return None;
        }
        let index = self.entries.len() - self.not_sent as usize;
        let entry = &mut self.entries[index];
        entry.already_sent = true;
        self.not_sent -= 1;
        Some(entry.pdu.clone())
    }

    /// Drop confirmed entries from the front of the ring.
    ///
    /// Walks already-sent entries oldest first and removes every entry whose
    /// sequence number lies at most one ring capacity behind
    /// `confirmed_sequence_number`; stops after removing the confirmed entry
    /// itself or on the first newer one.
    pub fn remove_through(&mut self, confirmed_sequence_number: u32) {
        while self.entries.len() > self.not_sent as usize {
            let Some(front) = self.entries.front() else {
                break;
            };
            let entry_sn = message::sequence_number(&front.pdu);
            let difference = confirmed_sequence_number.wrapping_sub(entry_sn);
            if difference >= u32::from(self.capacity) {
                break;
            }
            self.entries.pop_front();
            if entry_sn == confirmed_sequence_number {
                break;
            }
        }
    }

    /// Whether a PDU with the given sequence number is still buffered.
    pub fn contains_sequence_number(&self, sequence_number: u32) -> bool {
        self.entries
            .iter()
            .any(|entry| message::sequence_number(&entry.pdu) == sequence_number)
    }

    /// Entries currently in the ring.
    #[inline]
    pub fn used(&self) -> u16 {
        self.entries.len() as u16
    }

    /// Free entries.
    #[inline]
    pub fn free(&self) -> u16 {
        self.capacity - self.used()
    }

    /// Entries not yet handed to the adapter.
    #[inline]
    pub fn pending_send(&self) -> u16 {
        self.not_sent
    }
}

/// Send rings of all connections plus the shared retransmission scratch.
#[derive(Debug)]
pub struct SendBufferSet {
    buffers: Vec<SendBuffer>,
    retr_scratch: SendBuffer,
}

impl SendBufferSet {
    /// Create one ring per connection, each with capacity `n_send_max`.
    pub fn new(connection_count: usize, n_send_max: u16) -> SendBufferSet {
        SendBufferSet {
            buffers: (0..connection_count).map(|_| SendBuffer::new(n_send_max)).collect(),
            retr_scratch: SendBuffer::new(n_send_max),
        }
    }

    /// The ring of one connection.
    #[inline]
    pub fn buffer(&self, connection_id: usize) -> &SendBuffer {
        &self.buffers[connection_id]
    }

    /// The ring of one connection, mutably.
    #[inline]
    pub fn buffer_mut(&mut self, connection_id: usize) -> &mut SendBuffer {
        &mut self.buffers[connection_id]
    }

    /// Rebuild the ring of `connection_id` for a retransmission.
    ///
    /// `retr_sequence_number` is the last sequence number the peer confirmed;
    /// the entry following it must be the oldest buffered entry. Fresh
    /// sequence numbers are assigned from `header.sequence_number` onwards;
    /// the next free sequence number is returned.
    ///
    /// The rebuilt ring starts with a RetrResp, re-frames surviving
    /// Data/RetrData as RetrData, keeps queued Data and RetrReq traffic in
    /// order (a heartbeat terminates the retransmitted section before the
    /// first such message), and appends a terminating heartbeat when the
    /// retransmitted section runs to the end of the ring.
    pub fn prepare_retransmission(
        &mut self,
        connection_id: usize,
        codec: &MessageCodec,
        retr_sequence_number: u32,
        header: MessageHeaderCreate,
    ) -> Result<u32> {
        let SendBufferSet { buffers, retr_scratch } = self;
        let buffer = &mut buffers[connection_id];

        if buffer.entries.is_empty() {
            return Err(Error::InvalidSequenceNumber);
        }

        let mut new_header = header;
        let mut expected_sn = retr_sequence_number;
        let mut retr_end_reached = false;

        retr_scratch.clear();
        push_fresh(retr_scratch, codec.create_retr_resp(new_header), &mut new_header)?;

        for entry in &buffer.entries {
            expected_sn = expected_sn.wrapping_add(1);
            if message::sequence_number(&entry.pdu) != expected_sn {
                return Err(Error::InvalidSequenceNumber);
            }
            let kind = message::message_type(&entry.pdu).ok_or(Error::InternalError)?;

            if entry.already_sent {
                match kind {
                    MessageType::Data | MessageType::RetrData => {
                        let pdu = codec.create_retr_data(new_header, message::payload(&entry.pdu));
                        push_fresh(retr_scratch, pdu, &mut new_header)?;
                    }
                    // Already confirmed control traffic is dropped.
                    _ => {}
                }
            } else {
                match kind {
                    MessageType::RetrData => {
                        // RetrData must not appear after the retransmitted
                        // section ended.
                        if retr_end_reached {
                            return Err(Error::InternalError);
                        }
                        let pdu = codec.create_retr_data(new_header, message::payload(&entry.pdu));
                        push_fresh(retr_scratch, pdu, &mut new_header)?;
                    }
                    MessageType::Data => {
                        retr_end_reached = true;
                        let pdu = codec.create_data(new_header, message::payload(&entry.pdu));
                        push_fresh(retr_scratch, pdu, &mut new_header)?;
                    }
                    MessageType::RetrReq => {
                        if !retr_end_reached {
                            push_fresh(retr_scratch, codec.create_heartbeat(new_header), &mut new_header)?;
                            retr_end_reached = true;
                        }
                        push_fresh(retr_scratch, codec.create_retr_req(new_header), &mut new_header)?;
                    }
                    // Queued heartbeats are stale by now.
                    MessageType::Heartbeat => {}
                    _ => return Err(Error::InternalError),
                }
            }
        }

        // Terminate the retransmitted section if it ran to the end.
        if !retr_end_reached {
            push_fresh(retr_scratch, codec.create_heartbeat(new_header), &mut new_header)?;
        }

        // The rebuilt ring replaces the connection's ring; everything in it
        // is unsent.
        std::mem::swap(&mut buffer.entries, &mut retr_scratch.entries);
        buffer.not_sent = buffer.entries.len() as u16;
        retr_scratch.clear();

        Ok(new_header.sequence_number)
    }
}

/// Append a freshly numbered PDU to the scratch ring and advance the
/// sequence number.
fn push_fresh(scratch: &mut SendBuffer, pdu: Pdu, header: &mut MessageHeaderCreate) -> Result<()> {
    scratch.add(pdu)?;
    header.sequence_number = header.sequence_number.wrapping_add(1);
    Ok(())
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Receive ring: delivered payloads waiting for the application.
//!
//! Validated Data/RetrData payloads land here; the application drains the
//! ring through `read_data`. Adding a payload immediately raises the
//! `message_received` notification so a polling-free application can react
//! synchronously.

use std::collections::VecDeque;

use crate::adapter::SrNotifications;
use crate::{Error, Result};

/// Per-connection receive ring.
#[derive(Debug)]
pub struct ReceivedBuffer {
    capacity: u16,
    ring: VecDeque<Vec<u8>>,
}

impl ReceivedBuffer {
    fn new(capacity: u16) -> ReceivedBuffer {
        ReceivedBuffer { capacity, ring: VecDeque::with_capacity(capacity as usize) }
    }

    /// Payloads waiting to be read.
    #[inline]
    pub fn used(&self) -> u16 {
        self.ring.len() as u16
    }

    /// Free entries.
    #[inline]
    pub fn free(&self) -> u16 {
        self.capacity - self.used()
    }

    /// Size of the next payload to read, 0 when the ring is empty.
    pub fn peek_next_size(&self) -> u16 {
        self.ring.front().map_or(0, |payload| payload.len() as u16)
    }
}

/// Receive rings of all connections.
#[derive(Debug)]
pub struct ReceivedBufferSet {
    buffers: Vec<ReceivedBuffer>,
}

impl ReceivedBufferSet {
    /// Create one ring per connection, each with capacity `n_send_max`.
    pub fn new(connection_count: usize, n_send_max: u16) -> ReceivedBufferSet {
        ReceivedBufferSet {
            buffers: (0..connection_count).map(|_| ReceivedBuffer::new(n_send_max)).collect(),
        }
    }

    /// Reset the ring of one connection.
    pub fn clear(&mut self, connection_id: usize) {
        self.buffers[connection_id].ring.clear();
    }

    /// Append a delivered payload and notify the application.
    ///
    /// Callers pre-check free space; a full ring here is an invariant break
    /// and surfaces as [`Error::ReceiveBufferFull`] for the fatal hook.
    pub fn add(
        &mut self,
        connection_id: usize,
        payload: Vec<u8>,
        notifications: &mut dyn SrNotifications,
    ) -> Result<()> {
        let buffer = &mut self.buffers[connection_id];
        if buffer.used() >= buffer.capacity {
            return Err(Error::ReceiveBufferFull);
        }
        buffer.ring.push_back(payload);
        notifications.message_received(connection_id as u32);
        Ok(())
    }

    /// Read the oldest delivered payload.
    pub fn read(&mut self, connection_id: usize) -> Result<Vec<u8>> {
        self.buffers[connection_id].ring.pop_front().ok_or(Error::NoMessageReceived)
    }

    /// Size of the next payload to read on a connection, 0 when empty.
    #[inline]
    pub fn peek_next_size(&self, connection_id: usize) -> u16 {
        self.buffers[connection_id].peek_next_size()
    }

    /// The ring of one connection.
    #[inline]
    pub fn buffer(&self, connection_id: usize) -> &ReceivedBuffer {
        &self.buffers[connection_id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        BufferUtilisation, ConnectionDiagnosticData, ConnectionState, DiscReason,
        RedundancyChannelDiagnosticData,
    };

    #[derive(Default)]
    struct CountingNotifications {
        received: Vec<u32>,
    }

    impl SrNotifications for CountingNotifications {
        fn message_received(&mut self, connection_id: u32) {
            self.received.push(connection_id);
        }
        fn connection_state_notification(
            &mut self,
            _connection_id: u32,
            _state: ConnectionState,
            _buffer_utilisation: BufferUtilisation,
            _opposite_buffer_size: u16,
            _disc_reason: DiscReason,
            _detailed_disc_reason: u16,
        ) {
        }
        fn sr_diagnostic_notification(
            &mut self,
            _connection_id: u32,
            _data: ConnectionDiagnosticData,
        ) {
        }
        fn red_diagnostic_notification(
            &mut self,
            _connection_id: u32,
            _data: RedundancyChannelDiagnosticData,
        ) {
        }
    }

    #[test]
    fn test_add_notifies_application() {
        let mut set = ReceivedBufferSet::new(2, 4);
        let mut notifications = CountingNotifications::default();

        set.add(1, vec![1, 2, 3], &mut notifications).expect("ring has space");
        assert_eq!(notifications.received, vec![1]);
        assert_eq!(set.buffer(1).used(), 1);
        assert_eq!(set.buffer(0).used(), 0);
    }

    #[test]
    fn test_read_is_fifo() {
        let mut set = ReceivedBufferSet::new(1, 4);
        let mut notifications = CountingNotifications::default();

        set.add(0, vec![1], &mut notifications).expect("space");
        set.add(0, vec![2, 2], &mut notifications).expect("space");

        assert_eq!(set.peek_next_size(0), 1);
        assert_eq!(set.read(0).expect("payload"), vec![1]);
        assert_eq!(set.peek_next_size(0), 2);
        assert_eq!(set.read(0).expect("payload"), vec![2, 2]);
        assert_eq!(set.read(0), Err(Error::NoMessageReceived));
        assert_eq!(set.peek_next_size(0), 0);
    }

    #[test]
    fn test_full_ring_is_reported() {
        let mut set = ReceivedBufferSet::new(1, 2);
        let mut notifications = CountingNotifications::default();

        set.add(0, vec![0], &mut notifications).expect("space");
        set.add(0, vec![1], &mut notifications).expect("space");
        assert_eq!(
            set.add(0, vec![2], &mut notifications),
            Err(Error::ReceiveBufferFull)
        );
        assert_eq!(set.buffer(0).free(), 0);
    }

    #[test]
    fn test_clear_resets_ring() {
        let mut set = ReceivedBufferSet::new(1, 2);
        let mut notifications = CountingNotifications::default();
        set.add(0, vec![0], &mut notifications).expect("space");

        set.clear(0);
        assert_eq!(set.buffer(0).used(), 0);
        assert_eq!(set.read(0), Err(Error::NoMessageReceived));
    }
}

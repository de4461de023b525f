// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Public API of the layer.
//!
//! [`SrLayer`] validates arguments and delegates to the engine; the protocol
//! itself lives in [`crate::engine`]. Besides the application-facing calls
//! it carries the two inbound notification entries the redundancy layer
//! invokes: one when a message becomes readable, one to forward transport
//! channel diagnostics.

use crate::adapter::{RedundancyAdapter, SrNotifications, SystemAdapter};
use crate::config::{SrConfig, MAX_CONNECTIONS};
use crate::engine::state_machine::ConnectionEvent;
use crate::engine::SrCore;
use crate::protocol::constants::{MAX_PAYLOAD_SIZE, MIN_PAYLOAD_SIZE};
use crate::types::{
    BufferUtilisation, ConnectionState, RedundancyChannelDiagnosticData,
    TransportChannelDiagnosticData,
};
use crate::{Error, Result};

/// The SafRetL layer instance.
///
/// One instance owns every configured connection. All entry points take
/// `&mut self`; the protocol is single-threaded and cooperative, and no
/// call blocks.
pub struct SrLayer {
    core: SrCore,
}

impl SrLayer {
    /// Build the layer from a configuration and the three adapter seams.
    ///
    /// Fails with [`Error::InvalidConfiguration`] when the configuration
    /// violates the protocol bounds.
    pub fn new(
        cfg: SrConfig,
        redundancy: Box<dyn RedundancyAdapter>,
        system: Box<dyn SystemAdapter>,
        notifications: Box<dyn SrNotifications>,
    ) -> Result<SrLayer> {
        Ok(SrLayer { core: SrCore::new(cfg, redundancy, system, notifications)? })
    }

    /// Open the connection configured for the sender/receiver pair.
    ///
    /// Returns the connection id. The network id must match the configured
    /// RaSTA network.
    pub fn open_connection(
        &mut self,
        sender_id: u32,
        receiver_id: u32,
        network_id: u32,
    ) -> Result<u32> {
        if network_id != self.core.cfg.rasta_network_id {
            return Err(Error::InvalidParameter);
        }
        let connection_id = self.core.connection_id_for(sender_id, receiver_id)?;
        self.core
            .process_state_machine(connection_id as usize, ConnectionEvent::Open, false, false);
        Ok(connection_id)
    }

    /// Request an orderly disconnect. `detailed_reason` is carried in the
    /// DiscReq for the application's own use.
    pub fn close_connection(&mut self, connection_id: u32, detailed_reason: u16) -> Result<()> {
        let connection_id = self.check_connection_id(connection_id)?;
        self.core.set_disc_detailed_reason(connection_id, detailed_reason);
        self.core.process_state_machine(connection_id, ConnectionEvent::Close, false, false);
        Ok(())
    }

    /// Queue an application payload for transmission.
    ///
    /// The payload must fit a single PDU (1..=1055 bytes). Fails with
    /// [`Error::SendBufferFull`] when the send ring has no room and
    /// [`Error::InvalidOperationInCurrentState`] while the connection is
    /// closed.
    pub fn send_data(&mut self, connection_id: u32, payload: &[u8]) -> Result<()> {
        if !(MIN_PAYLOAD_SIZE as usize..=MAX_PAYLOAD_SIZE as usize).contains(&payload.len()) {
            return Err(Error::InvalidMessageSize);
        }
        let connection_id = self.check_connection_id(connection_id)?;
        if self.core.connection_state(connection_id) == ConnectionState::Closed {
            return Err(Error::InvalidOperationInCurrentState);
        }
        if self.core.send_buffers.buffer(connection_id).free() == 0 {
            return Err(Error::SendBufferFull);
        }
        self.core.write_payload_to_temporary_buffer(connection_id, payload);
        self.core.process_state_machine(connection_id, ConnectionEvent::SendData, false, false);
        Ok(())
    }

    /// Read the oldest delivered payload into `buffer`.
    ///
    /// Returns the payload size. Fails with [`Error::NoMessageReceived`]
    /// when nothing is pending and [`Error::InvalidBufferSize`] when
    /// `buffer` cannot hold the next payload.
    pub fn read_data(&mut self, connection_id: u32, buffer: &mut [u8]) -> Result<u16> {
        let connection_id = self.check_connection_id(connection_id)?;
        if buffer.is_empty() {
            return Err(Error::InvalidBufferSize);
        }
        let next_size = self.core.received_buffers.peek_next_size(connection_id);
        if usize::from(next_size) > buffer.len() {
            return Err(Error::InvalidBufferSize);
        }
        let payload = self.core.received_buffers.read(connection_id)?;
        buffer[..payload.len()].copy_from_slice(&payload);
        Ok(payload.len() as u16)
    }

    /// Current state, ring occupancy and peer receive window of a
    /// connection.
    pub fn get_connection_state(
        &self,
        connection_id: u32,
    ) -> Result<(ConnectionState, BufferUtilisation, u16)> {
        let connection_id = self.check_connection_id(connection_id)?;
        let state = self.core.connection_state(connection_id);
        let (utilisation, opposite_buffer_size) =
            self.core.buffer_size_and_utilisation(connection_id);
        Ok((state, utilisation, opposite_buffer_size))
    }

    /// Periodic driver: drains pending receives, flushes the send rings and
    /// fires timer events.
    ///
    /// Must be called at least once per timer granularity. For every
    /// connection the supervision timeout wins over the heartbeat check;
    /// heartbeats are only scheduled while nothing else is pending to send.
    pub fn tick(&mut self) -> Result<()> {
        for connection_id in 0..self.core.connection_count() {
            self.drain_pending_receives(connection_id);

            self.core.send_pending_messages(connection_id);

            if self.core.is_message_timeout(connection_id) {
                self.core.process_state_machine(
                    connection_id,
                    ConnectionEvent::Timeout,
                    false,
                    false,
                );
            } else {
                let nothing_to_send =
                    self.core.send_buffers.buffer(connection_id).pending_send() == 0;
                if self.core.is_heartbeat_interval(connection_id) && nothing_to_send {
                    self.core.process_state_machine(
                        connection_id,
                        ConnectionEvent::SendHb,
                        false,
                        false,
                    );
                }
            }
        }
        Ok(())
    }

    /// Inbound notification from the redundancy layer: a message became
    /// readable on the channel. Drains the channel immediately.
    pub fn message_received_notification(&mut self, red_channel_id: u32) -> Result<()> {
        if red_channel_id >= MAX_CONNECTIONS {
            return Err(Error::InvalidParameter);
        }
        // 1:1 mapping between redundancy channel id and connection id.
        let connection_id = red_channel_id as usize;
        if connection_id >= self.core.connection_count() {
            return Err(Error::InvalidParameter);
        }
        self.core.set_received_message_pending(connection_id);
        self.drain_pending_receives(connection_id);
        Ok(())
    }

    /// Inbound notification from the redundancy layer: transport channel
    /// diagnostics, forwarded to the application clustered with the channel
    /// id.
    pub fn diagnostic_notification(
        &mut self,
        red_channel_id: u32,
        tr_channel_id: u32,
        data: TransportChannelDiagnosticData,
    ) -> Result<()> {
        if red_channel_id >= MAX_CONNECTIONS || red_channel_id as usize >= self.core.connection_count()
        {
            return Err(Error::InvalidParameter);
        }
        let forwarded = RedundancyChannelDiagnosticData {
            transport_channel_id: tr_channel_id,
            n_diagnosis: data.n_diagnosis,
            n_missed: data.n_missed,
            t_drift: data.t_drift,
            t_drift2: data.t_drift2,
        };
        self.core.notifications.red_diagnostic_notification(red_channel_id, forwarded);
        Ok(())
    }

    /// Receive drain loop: read and dispatch while a message is pending and
    /// both rings keep their reserve.
    fn drain_pending_receives(&mut self, connection_id: usize) {
        while self.core.is_received_message_pending_and_buffers_not_full(connection_id) {
            let outcome = self.core.receive_message(connection_id);
            if let Some(event) = outcome.event {
                self.core.process_state_machine(
                    connection_id,
                    event,
                    outcome.sequence_number_in_seq,
                    outcome.confirmed_time_stamp_in_seq,
                );
            }
        }
    }

    fn check_connection_id(&self, connection_id: u32) -> Result<usize> {
        let index = connection_id as usize;
        if index < self.core.connection_count() {
            Ok(index)
        } else {
            Err(Error::InvalidParameter)
        }
    }
}

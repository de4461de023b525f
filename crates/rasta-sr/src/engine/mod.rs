// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Protocol engine.
//!
//! [`SrCore`] owns everything: the validated configuration, the codec, the
//! adapter trait objects, per-connection state and the reliability buffers.
//! The receive pipeline validates an incoming PDU step by step (safety code,
//! type, size, address, sequence-number windows, timestamp ordering) and
//! stages it for the state machine; the send pipeline stamps CS_PDU/TS_PDU
//! and hands frames to the redundancy layer under the peer's flow-control
//! window.
//!
//! All protocol timers are cooperative: `tick` (on the API layer) asks
//! [`SrCore::is_message_timeout`] and [`SrCore::is_heartbeat_interval`] and
//! feeds the resulting events into the state machine.

pub mod connection;
pub mod state_machine;

use crate::adapter::{RedundancyAdapter, SrNotifications, SystemAdapter};
use crate::config::{
    SrConfig, MIN_FREE_RECEIVE_ENTRIES_FOR_POLL, MIN_FREE_SEND_ENTRIES_FOR_RETR,
};
use crate::diagnostics::Diagnostics;
use crate::protocol::constants::MAX_PDU_SIZE;
use crate::protocol::message::{
    self, MessageCodec, MessageHeader, MessageHeaderCreate, MessageHeaderUpdate, MessageType, Pdu,
    ProtocolVersion,
};
use crate::reliability::{ReceivedBufferSet, SendBufferSet};
use crate::types::{BufferUtilisation, DiscReason};
use crate::{Error, Result};

use connection::{ConnectionData, StagedMessage};
use state_machine::ConnectionEvent;

/// The sequence-number acceptance window is ten receive windows wide.
const SEQUENCE_NUMBER_RANGE_FACTOR: u32 = 10;

/// Outcome of one receive pipeline pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveOutcome {
    /// Event to feed into the state machine, if a message survived
    /// validation.
    pub event: Option<ConnectionEvent>,
    /// SN_PDU matched SN_R (always true for types without the check).
    pub sequence_number_in_seq: bool,
    /// CTS_PDU was within T_max of CTS_R (always true for types without
    /// the check).
    pub confirmed_time_stamp_in_seq: bool,
}

impl ReceiveOutcome {
    fn dropped() -> ReceiveOutcome {
        ReceiveOutcome {
            event: None,
            sequence_number_in_seq: false,
            confirmed_time_stamp_in_seq: false,
        }
    }
}

/// The SafRetL protocol engine.
pub struct SrCore {
    pub(crate) cfg: SrConfig,
    pub(crate) codec: MessageCodec,
    pub(crate) redundancy: Box<dyn RedundancyAdapter>,
    pub(crate) system: Box<dyn SystemAdapter>,
    pub(crate) notifications: Box<dyn SrNotifications>,
    timer_granularity: u32,
    pub(crate) connections: Vec<ConnectionData>,
    pub(crate) send_buffers: SendBufferSet,
    pub(crate) received_buffers: ReceivedBufferSet,
    pub(crate) diagnostics: Diagnostics,
    /// Scratch frame for adapter reads; sized once, reused for every PDU.
    read_scratch: Vec<u8>,
}

impl SrCore {
    /// Build the engine from a validated configuration.
    pub fn new(
        cfg: SrConfig,
        redundancy: Box<dyn RedundancyAdapter>,
        system: Box<dyn SystemAdapter>,
        notifications: Box<dyn SrNotifications>,
    ) -> Result<SrCore> {
        cfg.validate()?;

        let connection_count = cfg.connection_count();
        let codec = MessageCodec::new(cfg.safety_code_type, cfg.md4_initial_value);
        let timer_granularity = system.get_timer_granularity();

        log::debug!(
            "[SrCore::new] {} connections, t_max={}ms, t_h={}ms",
            connection_count,
            cfg.t_max,
            cfg.t_h
        );

        Ok(SrCore {
            connections: (0..connection_count).map(|_| ConnectionData::new(cfg.n_send_max)).collect(),
            send_buffers: SendBufferSet::new(connection_count, cfg.n_send_max),
            received_buffers: ReceivedBufferSet::new(connection_count, cfg.n_send_max),
            diagnostics: Diagnostics::new(
                connection_count,
                cfg.t_max,
                cfg.n_diag_window,
                cfg.diag_timing_distr_intervals,
            ),
            read_scratch: vec![0u8; MAX_PDU_SIZE as usize],
            timer_granularity,
            codec,
            redundancy,
            system,
            notifications,
            cfg,
        })
    }

    /// Number of configured connections.
    #[inline]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Abort through the replaceable fatal-error hook.
    pub(crate) fn fatal(&self, kind: Error) -> ! {
        log::error!("[SrCore] fatal error: {kind}");
        self.system.fatal_error(kind)
    }

    /// Resolve the connection configured for a sender/receiver pair.
    pub fn connection_id_for(&self, sender_id: u32, receiver_id: u32) -> Result<u32> {
        self.cfg
            .connections
            .iter()
            .position(|c| c.sender_id == sender_id && c.receiver_id == receiver_id)
            .map(|index| index as u32)
            .ok_or(Error::InvalidParameter)
    }

    /// The endpoint with the numerically larger sender id acts as server.
    pub fn is_connection_role_server(&self, connection_id: usize) -> bool {
        let conn_cfg = &self.cfg.connections[connection_id];
        conn_cfg.sender_id > conn_cfg.receiver_id
    }

    // =======================================================================
    // Connection reset (Open)
    // =======================================================================

    /// Re-arm all per-connection state for a fresh establishment and open
    /// the redundancy channel.
    pub(crate) fn init_connection_data(&mut self, connection_id: usize) {
        log::debug!("[SrCore::init_connection_data] conn={}", connection_id);

        let is_client = !self.is_connection_role_server(connection_id);
        let random_sn = self.system.get_random_u32();
        let now = self.system.get_timer_value();

        let conn = &mut self.connections[connection_id];
        conn.sequence_number_rx = 0;
        conn.last_sent_confirmed_sequence_number_tx = 0;
        conn.confirmed_sequence_number_rx = 0;
        conn.time_stamp_rx = 0;
        conn.time_stamp_tx = 0;
        conn.detailed_disconnect_reason = 0;
        conn.opposite_receive_buffer_size = self.cfg.n_send_max;
        conn.received_data_pending = false;
        conn.input_buffer = None;
        conn.temporary_send_payload = None;
        conn.t_rtd = 0;
        conn.t_alive = 0;

        // Client and server: SN_T random, T_i = T_max.
        conn.sequence_number_tx = random_sn;
        conn.timer_t_i = self.cfg.t_max;

        // Client only: CS_T = 0 and CTS_R = local time.
        conn.confirmed_sequence_number_tx = 0;
        conn.confirmed_time_stamp_rx = if is_client { now } else { 0 };

        self.diagnostics.reset_connection(connection_id);
        self.send_buffers.buffer_mut(connection_id).clear();
        self.received_buffers.clear(connection_id);

        // 1:1 mapping between connection id and redundancy channel id.
        self.redundancy.open_redundancy_channel(connection_id as u32);
    }

    /// Close the redundancy channel and flush the diagnostics of the
    /// connection.
    pub(crate) fn close_redundancy_channel(&mut self, connection_id: usize) {
        log::debug!("[SrCore::close_redundancy_channel] conn={}", connection_id);
        self.redundancy.close_redundancy_channel(connection_id as u32);
        self.diagnostics.send_notification(connection_id, self.notifications.as_mut());
    }

    // =======================================================================
    // Receive pipeline
    // =======================================================================

    /// Read one PDU from the adapter and run the validation pipeline.
    ///
    /// A surviving message is staged in the connection's input buffer and
    /// mapped to its state machine event; dropped messages update the
    /// matching diagnostic counter and produce no event.
    pub(crate) fn receive_message(&mut self, connection_id: usize) -> ReceiveOutcome {
        let channel_id = connection_id as u32;

        let size = match self.redundancy.read_message(channel_id, &mut self.read_scratch) {
            Ok(size) => size,
            Err(Error::NoMessageReceived) => {
                self.connections[connection_id].received_data_pending = false;
                return ReceiveOutcome::dropped();
            }
            Err(_) => self.fatal(Error::InternalError),
        };
        if size as usize > self.read_scratch.len() {
            self.fatal(Error::InternalError);
        }
        let pdu = Pdu::from_bytes(self.read_scratch[..size as usize].to_vec());

        // 1) General check: safety code, type, size; then authenticity.
        let Some(header) = self.general_message_check(connection_id, &pdu) else {
            return ReceiveOutcome::dropped();
        };

        // 2) Sequence number range.
        if !self.check_sequence_number_range(connection_id, &header) {
            sr_trace!(
                "[SrCore::receive_message] conn={} SN {} outside range (SN_R {})",
                connection_id,
                header.sequence_number,
                self.connections[connection_id].sequence_number_rx
            );
            return ReceiveOutcome::dropped();
        }

        // 3) Confirmed sequence number integrity.
        if !self.check_confirmed_sequence_number(connection_id, &header) {
            self.diagnostics.inc_confirmed_sequence_number_error(connection_id);
            return ReceiveOutcome::dropped();
        }

        // 4) Timestamp ordering.
        if !self.check_time_stamp(connection_id, &header) {
            return ReceiveOutcome::dropped();
        }

        // 5) In-sequence flags; the message is queued either way, the state
        // machine decides what an out-of-sequence message triggers.
        let sequence_number_in_seq = self.check_sequence_number(connection_id, &header);
        let confirmed_time_stamp_in_seq = self.check_confirmed_time_stamp(connection_id, &header);

        let event = ConnectionEvent::from_message_type(header.message_type);
        sr_trace!(
            "[SrCore::receive_message] conn={} event={:?} sn_in_seq={} cts_in_seq={}",
            connection_id,
            event,
            sequence_number_in_seq,
            confirmed_time_stamp_in_seq
        );

        self.connections[connection_id].input_buffer = Some(StagedMessage { header, pdu });

        ReceiveOutcome {
            event: Some(event),
            sequence_number_in_seq,
            confirmed_time_stamp_in_seq,
        }
    }

    /// Frame-level checks plus message authenticity. Returns the decoded
    /// header of an acceptable message.
    fn general_message_check(&mut self, connection_id: usize, pdu: &Pdu) -> Option<MessageHeader> {
        match self.codec.check(pdu) {
            Ok(()) => {}
            Err(Error::InvalidMessageSize) => {
                // Malformed length: dropped without a counter.
                sr_trace!("[SrCore::general_message_check] conn={} size mismatch", connection_id);
                return None;
            }
            Err(Error::InvalidMessageMd4) => {
                self.diagnostics.inc_safety_code_error(connection_id);
                return None;
            }
            Err(Error::InvalidMessageType) => {
                self.diagnostics.inc_type_error(connection_id);
                return None;
            }
            Err(_) => self.fatal(Error::InternalError),
        }

        let Some(header) = message::message_header(pdu) else {
            self.fatal(Error::InternalError);
        };

        // Authenticity: the PDU must name us as receiver and the configured
        // peer as sender.
        let conn_cfg = &self.cfg.connections[connection_id];
        if header.receiver_id != conn_cfg.sender_id || header.sender_id != conn_cfg.receiver_id {
            self.diagnostics.inc_address_error(connection_id);
            return None;
        }

        Some(header)
    }

    /// SN_PDU must lie within ten receive windows of SN_R; connection setup
    /// and RetrResp messages are exempt.
    fn check_sequence_number_range(&self, connection_id: usize, header: &MessageHeader) -> bool {
        match header.message_type {
            MessageType::ConnReq | MessageType::ConnResp | MessageType::RetrResp => true,
            MessageType::RetrReq
            | MessageType::DiscReq
            | MessageType::Heartbeat
            | MessageType::Data
            | MessageType::RetrData => {
                let difference = header
                    .sequence_number
                    .wrapping_sub(self.connections[connection_id].sequence_number_rx);
                difference <= SEQUENCE_NUMBER_RANGE_FACTOR * u32::from(self.cfg.n_send_max)
            }
        }
    }

    /// Exact sequence-number match for the in-sequence flag; failures count
    /// into `ec_sn`.
    fn check_sequence_number(&mut self, connection_id: usize, header: &MessageHeader) -> bool {
        let in_seq = match header.message_type {
            MessageType::ConnReq
            | MessageType::ConnResp
            | MessageType::RetrResp
            | MessageType::DiscReq => true,
            MessageType::RetrReq | MessageType::Heartbeat | MessageType::Data | MessageType::RetrData => {
                header.sequence_number == self.connections[connection_id].sequence_number_rx
            }
        };
        if !in_seq {
            self.diagnostics.inc_sequence_number_error(connection_id);
        }
        in_seq
    }

    /// CS_PDU window check: a ConnReq confirms nothing, a ConnResp must
    /// confirm our ConnReq, everything else must fall between CS_R and SN_T.
    fn check_confirmed_sequence_number(&self, connection_id: usize, header: &MessageHeader) -> bool {
        let conn = &self.connections[connection_id];
        match header.message_type {
            MessageType::ConnReq => header.confirmed_sequence_number == 0,
            MessageType::ConnResp => {
                header.confirmed_sequence_number == conn.sequence_number_tx.wrapping_sub(1)
            }
            MessageType::RetrReq
            | MessageType::RetrResp
            | MessageType::DiscReq
            | MessageType::Heartbeat
            | MessageType::Data
            | MessageType::RetrData => {
                let difference = header
                    .confirmed_sequence_number
                    .wrapping_sub(conn.confirmed_sequence_number_rx);
                let max_difference = conn
                    .sequence_number_tx
                    .wrapping_sub(conn.confirmed_sequence_number_rx.wrapping_sub(1));
                difference <= max_difference
            }
        }
    }

    /// TS_PDU must have advanced less than T_max since TS_R; only
    /// timeout-related types carry a meaningful timestamp.
    fn check_time_stamp(&self, connection_id: usize, header: &MessageHeader) -> bool {
        if !header.message_type.is_timeout_related() {
            return true;
        }
        let difference =
            header.time_stamp.wrapping_sub(self.connections[connection_id].time_stamp_rx);
        difference < self.cfg.t_max
    }

    /// CTS_PDU must have advanced less than T_max since CTS_R; only
    /// timeout-related types carry a meaningful confirmed timestamp.
    fn check_confirmed_time_stamp(&self, connection_id: usize, header: &MessageHeader) -> bool {
        if !header.message_type.is_timeout_related() {
            return true;
        }
        let difference = header
            .confirmed_time_stamp
            .wrapping_sub(self.connections[connection_id].confirmed_time_stamp_rx);
        difference < self.cfg.t_max
    }

    // =======================================================================
    // Regular processing of an accepted message
    // =======================================================================

    /// Apply a staged message to the connection state.
    ///
    /// Returns `false` when the timeliness calculation shows message age can
    /// no longer be guaranteed; the state machine then closes the
    /// connection with a timeout.
    pub(crate) fn process_received_message(&mut self, connection_id: usize) -> bool {
        let Some(staged) = self.connections[connection_id].input_buffer.take() else {
            self.fatal(Error::InternalError);
        };
        let header = staged.header;
        let now = self.system.get_timer_value();

        // Adaptive supervision: T_rtd, T_alive, new T_i.
        if header.message_type.is_timeout_related()
            && !self.calculate_timeliness(connection_id, &header, now)
        {
            return false;
        }

        let conn = &mut self.connections[connection_id];
        let mut confirmed_sequence_number_changed = false;

        conn.sequence_number_rx = header.sequence_number.wrapping_add(1);
        conn.confirmed_sequence_number_tx = header.sequence_number;
        if conn.confirmed_sequence_number_rx != header.confirmed_sequence_number {
            conn.confirmed_sequence_number_rx = header.confirmed_sequence_number;
            confirmed_sequence_number_changed = true;
        }
        conn.time_stamp_rx = header.time_stamp;

        if header.message_type.is_timeout_related() {
            conn.confirmed_time_stamp_rx = header.confirmed_time_stamp;
        } else if header.message_type == MessageType::ConnReq {
            // A ConnReq starts the confirmation chain: pretend our previous
            // sequence number was confirmed now. Overrides the generic CS_R
            // update above (the ConnReq carried 0).
            conn.confirmed_sequence_number_rx = conn.sequence_number_tx.wrapping_sub(1);
            conn.confirmed_time_stamp_rx = now;
        }

        // A ConnReq is the first message of the exchange and confirms
        // nothing.
        if confirmed_sequence_number_changed && header.message_type != MessageType::ConnReq {
            let confirmed = conn.confirmed_sequence_number_rx;
            self.send_buffers.buffer_mut(connection_id).remove_through(confirmed);
        }

        if matches!(header.message_type, MessageType::ConnReq | MessageType::ConnResp) {
            let (_, opposite_buffer_size) = message::conn_data(&staged.pdu);
            self.connections[connection_id].opposite_receive_buffer_size = opposite_buffer_size;
        }

        if matches!(header.message_type, MessageType::Data | MessageType::RetrData) {
            let payload = message::payload(&staged.pdu).to_vec();
            if let Err(kind) = self.received_buffers.add(
                connection_id,
                payload,
                self.notifications.as_mut(),
            ) {
                self.fatal(kind);
            }
        }

        self.received_flow_control_check(connection_id, header.message_type);

        if header.message_type.is_timeout_related() {
            let (t_rtd, t_alive) = {
                let conn = &self.connections[connection_id];
                (conn.t_rtd, conn.t_alive)
            };
            if let Err(kind) = self.diagnostics.update(
                connection_id,
                t_rtd,
                t_alive,
                self.notifications.as_mut(),
            ) {
                self.fatal(kind);
            }
        }

        true
    }

    /// Compute T_rtd and T_alive and derive the new supervision timeout.
    fn calculate_timeliness(
        &mut self,
        connection_id: usize,
        header: &MessageHeader,
        now: u32,
    ) -> bool {
        let conn = &mut self.connections[connection_id];
        conn.t_rtd = now
            .wrapping_add(self.timer_granularity)
            .wrapping_sub(header.confirmed_time_stamp);
        conn.t_alive = now.wrapping_sub(conn.confirmed_time_stamp_rx);

        if conn.t_rtd <= self.cfg.t_max {
            conn.timer_t_i = self.cfg.t_max - conn.t_rtd;
            true
        } else {
            // Message age can no longer be guaranteed.
            conn.timer_t_i = 0;
            false
        }
    }

    /// Forced-acknowledge check: once M_WA sequence numbers are unconfirmed
    /// towards the peer, confirm them with pending traffic or a heartbeat.
    fn received_flow_control_check(&mut self, connection_id: usize, message_type: MessageType) {
        // Only message types that do not themselves solicit a reply.
        if !matches!(
            message_type,
            MessageType::Heartbeat | MessageType::RetrResp | MessageType::Data | MessageType::RetrData
        ) {
            return;
        }
        let conn = &self.connections[connection_id];
        let unconfirmed = conn
            .confirmed_sequence_number_tx
            .wrapping_sub(conn.last_sent_confirmed_sequence_number_tx);
        if unconfirmed >= u32::from(self.cfg.m_w_a) {
            if self.send_buffers.buffer(connection_id).pending_send() == 0 {
                self.send_heartbeat(connection_id);
            } else {
                self.send_pending_messages(connection_id);
            }
        }
    }

    // =======================================================================
    // Staged-message helpers used by the state machine
    // =======================================================================

    /// On a close triggered by an incoming message: confirm its sequence
    /// number (CS_T = SN_PDU) and unstage it.
    pub(crate) fn update_confirmed_tx_sequence_number(&mut self, connection_id: usize) {
        let conn = &mut self.connections[connection_id];
        if let Some(staged) = conn.input_buffer.take() {
            conn.confirmed_sequence_number_tx = staged.header.sequence_number;
            sr_trace!(
                "[SrCore::update_confirmed_tx_sequence_number] conn={} CS_T={}",
                connection_id,
                conn.confirmed_sequence_number_tx
            );
        }
    }

    /// On an out-of-sequence retransmission request: take the peer's
    /// confirmation (CS_R = CS_PDU), purge the send ring and unstage the
    /// message.
    pub(crate) fn update_confirmed_rx_sequence_number(&mut self, connection_id: usize) {
        let conn = &mut self.connections[connection_id];
        if let Some(staged) = conn.input_buffer.take() {
            conn.confirmed_sequence_number_rx = staged.header.confirmed_sequence_number;
            let confirmed = conn.confirmed_sequence_number_rx;
            self.send_buffers.buffer_mut(connection_id).remove_through(confirmed);
            sr_trace!(
                "[SrCore::update_confirmed_rx_sequence_number] conn={} CS_R={}",
                connection_id,
                confirmed
            );
        }
    }

    /// Drop the staged message without processing it.
    pub(crate) fn clear_input_buffer(&mut self, connection_id: usize) {
        self.connections[connection_id].input_buffer = None;
    }

    /// Digit-wise protocol version acceptance of the staged ConnReq/ConnResp.
    pub(crate) fn is_protocol_version_accepted(&self, connection_id: usize) -> bool {
        let Some(staged) = self.connections[connection_id].input_buffer.as_ref() else {
            self.fatal(Error::InternalError);
        };
        let (version, _) = message::conn_data(&staged.pdu);
        let accepted = ProtocolVersion::CURRENT.accepts(version);
        sr_trace!(
            "[SrCore::is_protocol_version_accepted] conn={} accepted={}",
            connection_id,
            accepted
        );
        accepted
    }

    /// Whether the staged RetrReq asks for a sequence number we can still
    /// retransmit (the message after the peer's last confirmed one).
    pub(crate) fn is_retr_req_sequence_number_available(&self, connection_id: usize) -> bool {
        let Some(staged) = self.connections[connection_id].input_buffer.as_ref() else {
            self.fatal(Error::InternalError);
        };
        if staged.header.message_type != MessageType::RetrReq {
            return false;
        }
        let requested = staged.header.confirmed_sequence_number.wrapping_add(1);
        self.send_buffers.buffer(connection_id).contains_sequence_number(requested)
    }

    // =======================================================================
    // Send pipeline
    // =======================================================================

    /// Current SN_T; advances the counter.
    fn next_sequence_number(&mut self, connection_id: usize) -> u32 {
        let conn = &mut self.connections[connection_id];
        let current = conn.sequence_number_tx;
        conn.sequence_number_tx = conn.sequence_number_tx.wrapping_add(1);
        current
    }

    /// Header prototype for a fresh outbound PDU.
    fn create_header(&mut self, connection_id: usize) -> MessageHeaderCreate {
        let sequence_number = self.next_sequence_number(connection_id);
        let conn_cfg = &self.cfg.connections[connection_id];
        MessageHeaderCreate {
            sender_id: conn_cfg.sender_id,
            receiver_id: conn_cfg.receiver_id,
            sequence_number,
            confirmed_time_stamp: self.connections[connection_id].time_stamp_rx,
        }
    }

    /// Queue a PDU; a full ring here means the caller skipped its
    /// pre-check, which is fatal.
    fn queue_for_send(&mut self, connection_id: usize, pdu: Pdu) {
        if let Err(kind) = self.send_buffers.buffer_mut(connection_id).add(pdu) {
            self.fatal(kind);
        }
        self.send_pending_messages(connection_id);
    }

    /// Frame the staged application payload as a Data PDU and transmit.
    pub(crate) fn send_data_message(&mut self, connection_id: usize) {
        let Some(payload) = self.connections[connection_id].temporary_send_payload.take() else {
            self.fatal(Error::NoMessageToSend);
        };
        let header = self.create_header(connection_id);
        let pdu = self.codec.create_data(header, &payload);
        self.queue_for_send(connection_id, pdu);
    }

    /// Emit a connection request (client side). The CTS of a ConnReq is 0.
    pub(crate) fn send_conn_req(&mut self, connection_id: usize) {
        self.connections[connection_id].time_stamp_rx = 0;
        let header = self.create_header(connection_id);
        let pdu = self.codec.create_conn_req(header, self.cfg.n_send_max);
        self.queue_for_send(connection_id, pdu);
    }

    /// Emit a connection response (server side).
    pub(crate) fn send_conn_resp(&mut self, connection_id: usize) {
        let header = self.create_header(connection_id);
        let pdu = self.codec.create_conn_resp(header, self.cfg.n_send_max);
        self.queue_for_send(connection_id, pdu);
    }

    /// Emit a heartbeat.
    pub(crate) fn send_heartbeat(&mut self, connection_id: usize) {
        let header = self.create_header(connection_id);
        let pdu = self.codec.create_heartbeat(header);
        self.queue_for_send(connection_id, pdu);
    }

    /// Emit a retransmission request.
    pub(crate) fn send_retr_req(&mut self, connection_id: usize) {
        let header = self.create_header(connection_id);
        let pdu = self.codec.create_retr_req(header);
        self.queue_for_send(connection_id, pdu);
    }

    /// Emit a disconnection request and tear the channel down.
    ///
    /// The DiscReq bypasses the send ring: it is stamped and handed to the
    /// adapter directly, the ring is cleared, and the redundancy channel is
    /// closed.
    pub(crate) fn send_disc_req(&mut self, connection_id: usize, reason: DiscReason) {
        log::debug!("[SrCore::send_disc_req] conn={} reason={:?}", connection_id, reason);

        let header = self.create_header(connection_id);
        let detailed = self.connections[connection_id].detailed_disconnect_reason;
        let mut pdu = self.codec.create_disc_req(header, detailed, reason);

        let update = MessageHeaderUpdate {
            confirmed_sequence_number: self.connections[connection_id].confirmed_sequence_number_tx,
            time_stamp: self.system.get_timer_value(),
        };
        self.codec.update_header(&mut pdu, update);

        self.redundancy.send_message(connection_id as u32, pdu.as_bytes());
        self.send_buffers.buffer_mut(connection_id).clear();
        self.close_redundancy_channel(connection_id);
    }

    /// Record the application-provided disconnect detail.
    pub(crate) fn set_disc_detailed_reason(&mut self, connection_id: usize, detailed: u16) {
        self.connections[connection_id].detailed_disconnect_reason = detailed;
    }

    /// Stage the application payload for the next Data PDU.
    pub(crate) fn write_payload_to_temporary_buffer(&mut self, connection_id: usize, payload: &[u8]) {
        let conn = &mut self.connections[connection_id];
        if conn.temporary_send_payload.is_some() {
            self.fatal(Error::InternalError);
        }
        conn.temporary_send_payload = Some(payload.to_vec());
    }

    /// Rebuild the send ring for a peer-requested retransmission.
    pub(crate) fn handle_retr_req(&mut self, connection_id: usize) {
        let header = self.create_header(connection_id);
        let last_confirmed = self.connections[connection_id].confirmed_sequence_number_rx;
        match self.send_buffers.prepare_retransmission(
            connection_id,
            &self.codec,
            last_confirmed,
            header,
        ) {
            Ok(next_sequence_number) => {
                self.connections[connection_id].sequence_number_tx = next_sequence_number;
            }
            Err(kind) => self.fatal(kind),
        }
    }

    /// Transmit queued PDUs while the peer's receive window allows it.
    ///
    /// Each frame gets the current CS_T and a fresh timestamp immediately
    /// before it goes out; the stamped CS_T is remembered for the forced-
    /// acknowledge rule.
    pub(crate) fn send_pending_messages(&mut self, connection_id: usize) {
        loop {
            {
                let buffer = self.send_buffers.buffer(connection_id);
                let unconfirmed = buffer.used() - buffer.pending_send();
                let window_open = self.connections[connection_id].opposite_receive_buffer_size
                    > unconfirmed;
                if buffer.pending_send() == 0 || !window_open {
                    break;
                }
            }

            let Some(mut pdu) = self.send_buffers.buffer_mut(connection_id).read_next() else {
                self.fatal(Error::InternalError);
            };

            let now = self.system.get_timer_value();
            self.connections[connection_id].time_stamp_tx = now;

            // A ConnReq must confirm nothing.
            if message::message_type(&pdu) == Some(MessageType::ConnReq) {
                self.connections[connection_id].confirmed_sequence_number_tx = 0;
            }
            let confirmed = self.connections[connection_id].confirmed_sequence_number_tx;
            self.connections[connection_id].last_sent_confirmed_sequence_number_tx = confirmed;

            self.codec.update_header(
                &mut pdu,
                MessageHeaderUpdate { confirmed_sequence_number: confirmed, time_stamp: now },
            );

            self.redundancy.send_message(connection_id as u32, pdu.as_bytes());
        }
    }

    // =======================================================================
    // Timers and polling predicates
    // =======================================================================

    /// The supervision timer T_i expired without a timeout-related receive.
    pub(crate) fn is_message_timeout(&mut self, connection_id: usize) -> bool {
        let now = self.system.get_timer_value();
        let conn = &self.connections[connection_id];
        now.wrapping_sub(conn.confirmed_time_stamp_rx) > conn.timer_t_i
    }

    /// The heartbeat period elapsed since the last own transmission.
    pub(crate) fn is_heartbeat_interval(&mut self, connection_id: usize) -> bool {
        let now = self.system.get_timer_value();
        now.wrapping_sub(self.connections[connection_id].time_stamp_tx) >= self.cfg.t_h
    }

    /// Drain predicate for the receive poll: a message is pending and both
    /// rings keep their required reserve.
    pub(crate) fn is_received_message_pending_and_buffers_not_full(
        &self,
        connection_id: usize,
    ) -> bool {
        self.connections[connection_id].received_data_pending
            && self.received_buffers.buffer(connection_id).free()
                >= MIN_FREE_RECEIVE_ENTRIES_FOR_POLL
            && self.send_buffers.buffer(connection_id).free() >= MIN_FREE_SEND_ENTRIES_FOR_RETR
    }

    /// Note that the adapter has a readable message for the connection.
    pub(crate) fn set_received_message_pending(&mut self, connection_id: usize) {
        self.connections[connection_id].received_data_pending = true;
    }

    // =======================================================================
    // Notifications
    // =======================================================================

    /// Current ring occupancy and the peer's receive window.
    pub(crate) fn buffer_size_and_utilisation(
        &self,
        connection_id: usize,
    ) -> (BufferUtilisation, u16) {
        let send = self.send_buffers.buffer(connection_id);
        let receive = self.received_buffers.buffer(connection_id);
        (
            BufferUtilisation {
                send_buffer_used: send.used(),
                send_buffer_free: send.free(),
                receive_buffer_used: receive.used(),
                receive_buffer_free: receive.free(),
            },
            self.connections[connection_id].opposite_receive_buffer_size,
        )
    }

    /// Deliver a connection state notification with the current buffer
    /// utilisation.
    pub(crate) fn send_connection_state_notification(
        &mut self,
        connection_id: usize,
        state: crate::types::ConnectionState,
        disc_reason: DiscReason,
    ) {
        let (utilisation, opposite_buffer_size) = self.buffer_size_and_utilisation(connection_id);
        let detailed = self.connections[connection_id].detailed_disconnect_reason;
        self.notifications.connection_state_notification(
            connection_id as u32,
            state,
            utilisation,
            opposite_buffer_size,
            disc_reason,
            detailed,
        );
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Connection state machine: seven states, fourteen events.
//!
//! Each state has its own handler; cells not listed there ignore the event.
//! Four canonical actions recur across the table:
//!
//! 1. **Close connection** - confirm an incoming message's sequence number,
//!    emit a DiscReq, tear the channel down and notify `Closed` with the
//!    disconnect reason.
//! 2. **Ignore** - stay in the current state.
//! 3. **Regular processing** - apply the staged message to the connection
//!    state; a timeliness failure escalates to action 1 with a timeout
//!    reason.
//! 4. **Further event treatment** - the cell-specific follow-up (send a
//!    PDU, start a retransmission, hand data to the send pipeline).
//!
//! State notifications fire only when the state after the event differs
//! from the state captured at its entry.

use crate::engine::SrCore;
use crate::protocol::message::MessageType;
use crate::types::{ConnectionState, DiscReason};
use crate::Error;

/// Events driving the connection state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Application requested connection establishment.
    Open,
    /// Application requested an orderly disconnect.
    Close,
    /// Application staged a payload for transmission.
    SendData,
    /// ConnReq PDU passed the receive pipeline.
    ConnReqReceived,
    /// ConnResp PDU passed the receive pipeline.
    ConnRespReceived,
    /// RetrReq PDU passed the receive pipeline.
    RetrReqReceived,
    /// RetrResp PDU passed the receive pipeline.
    RetrRespReceived,
    /// DiscReq PDU passed the receive pipeline.
    DiscReqReceived,
    /// Heartbeat PDU passed the receive pipeline.
    HbReceived,
    /// Data PDU passed the receive pipeline.
    DataReceived,
    /// RetrData PDU passed the receive pipeline.
    RetrDataReceived,
    /// Heartbeat period elapsed with nothing pending to send.
    SendHb,
    /// Supervision timer T_i expired.
    Timeout,
}

impl ConnectionEvent {
    /// Receive event for a validated message type.
    pub fn from_message_type(message_type: MessageType) -> ConnectionEvent {
        match message_type {
            MessageType::ConnReq => ConnectionEvent::ConnReqReceived,
            MessageType::ConnResp => ConnectionEvent::ConnRespReceived,
            MessageType::RetrReq => ConnectionEvent::RetrReqReceived,
            MessageType::RetrResp => ConnectionEvent::RetrRespReceived,
            MessageType::DiscReq => ConnectionEvent::DiscReqReceived,
            MessageType::Heartbeat => ConnectionEvent::HbReceived,
            MessageType::Data => ConnectionEvent::DataReceived,
            MessageType::RetrData => ConnectionEvent::RetrDataReceived,
        }
    }
}

impl SrCore {
    /// Current state of a connection.
    pub fn connection_state(&self, connection_id: usize) -> ConnectionState {
        self.connections[connection_id].state
    }

    /// Dispatch one event into the state machine of a connection.
    pub(crate) fn process_state_machine(
        &mut self,
        connection_id: usize,
        event: ConnectionEvent,
        sequence_number_in_seq: bool,
        confirmed_time_stamp_in_seq: bool,
    ) {
        let state = self.connections[connection_id].state;
        self.connections[connection_id].state_old = state;

        sr_trace!(
            "[StateMachine] conn={} state={:?} event={:?}",
            connection_id,
            state,
            event
        );

        match state {
            ConnectionState::Closed => self.process_closed(connection_id, event),
            ConnectionState::Down => self.process_down(connection_id, event),
            ConnectionState::Start => self.process_start(
                connection_id,
                event,
                sequence_number_in_seq,
                confirmed_time_stamp_in_seq,
            ),
            ConnectionState::Up => self.process_up(
                connection_id,
                event,
                sequence_number_in_seq,
                confirmed_time_stamp_in_seq,
            ),
            ConnectionState::RetransRequest => {
                self.process_retrans_request(connection_id, event, sequence_number_in_seq);
            }
            ConnectionState::RetransRunning => self.process_retrans_running(
                connection_id,
                event,
                sequence_number_in_seq,
                confirmed_time_stamp_in_seq,
            ),
            ConnectionState::NotInitialized => self.fatal(Error::InternalError),
        }
    }

    // =======================================================================
    // Per-state handlers
    // =======================================================================

    fn process_closed(&mut self, connection_id: usize, event: ConnectionEvent) {
        if event == ConnectionEvent::Open {
            // SN_T = random; client only: CS_T = 0 and CTS_R = local time.
            self.init_connection_data(connection_id);
            if self.is_connection_role_server(connection_id) {
                self.update_state(connection_id, ConnectionState::Down);
            } else {
                self.send_conn_req(connection_id);
                self.update_state(connection_id, ConnectionState::Start);
            }
        }
        // Every other event is ignored while closed.
    }

    fn process_down(&mut self, connection_id: usize, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Open | ConnectionEvent::Close | ConnectionEvent::SendData => {
                self.close_channel_only(connection_id, false);
            }
            ConnectionEvent::ConnReqReceived => {
                if self.is_protocol_version_accepted(connection_id) {
                    if self.regular_processing(connection_id) {
                        self.send_conn_resp(connection_id);
                        self.update_state(connection_id, ConnectionState::Start);
                    }
                } else {
                    self.close_connection(connection_id, DiscReason::ProtocolVersionError, true);
                }
            }
            _ => {}
        }
    }

    fn process_start(
        &mut self,
        connection_id: usize,
        event: ConnectionEvent,
        sequence_number_in_seq: bool,
        confirmed_time_stamp_in_seq: bool,
    ) {
        match event {
            ConnectionEvent::Open | ConnectionEvent::SendData => {
                self.close_connection(connection_id, DiscReason::ServiceNotAllowed, false);
            }
            ConnectionEvent::Close => {
                self.close_connection(connection_id, DiscReason::UserRequest, false);
            }
            ConnectionEvent::ConnReqReceived
            | ConnectionEvent::RetrReqReceived
            | ConnectionEvent::RetrRespReceived
            | ConnectionEvent::DataReceived
            | ConnectionEvent::RetrDataReceived => {
                self.close_connection(connection_id, DiscReason::UnexpectedMessage, true);
            }
            ConnectionEvent::ConnRespReceived => {
                if self.is_connection_role_server(connection_id) {
                    self.close_connection(connection_id, DiscReason::UnexpectedMessage, true);
                } else if self.is_protocol_version_accepted(connection_id) {
                    if self.regular_processing(connection_id) {
                        self.send_heartbeat(connection_id);
                        self.update_state(connection_id, ConnectionState::Up);
                    }
                } else {
                    self.close_connection(connection_id, DiscReason::ProtocolVersionError, true);
                }
            }
            ConnectionEvent::DiscReqReceived => {
                self.close_channel_only(connection_id, true);
            }
            ConnectionEvent::HbReceived => {
                let is_server = self.is_connection_role_server(connection_id);
                match (sequence_number_in_seq, is_server) {
                    (true, true) => {
                        if confirmed_time_stamp_in_seq {
                            if self.regular_processing(connection_id) {
                                self.update_state(connection_id, ConnectionState::Up);
                            }
                        } else {
                            self.close_connection(
                                connection_id,
                                DiscReason::ProtocolSequenceError,
                                true,
                            );
                        }
                    }
                    (true, false) => {
                        self.close_connection(connection_id, DiscReason::UnexpectedMessage, true);
                    }
                    (false, true) => {
                        self.close_connection(connection_id, DiscReason::SequenceNumberError, true);
                    }
                    (false, false) => {
                        self.close_connection(connection_id, DiscReason::UnexpectedMessage, true);
                    }
                }
            }
            ConnectionEvent::SendHb => {
                // The client's first heartbeat is triggered by the ConnResp,
                // not by the timer.
                if self.is_connection_role_server(connection_id) {
                    self.send_heartbeat(connection_id);
                }
            }
            ConnectionEvent::Timeout => {
                self.close_connection(connection_id, DiscReason::Timeout, true);
            }
        }
    }

    fn process_up(
        &mut self,
        connection_id: usize,
        event: ConnectionEvent,
        sequence_number_in_seq: bool,
        confirmed_time_stamp_in_seq: bool,
    ) {
        match event {
            ConnectionEvent::Open => {
                self.close_connection(connection_id, DiscReason::ServiceNotAllowed, false);
            }
            ConnectionEvent::Close => {
                self.close_connection(connection_id, DiscReason::UserRequest, false);
            }
            ConnectionEvent::SendData => {
                self.send_data_message(connection_id);
            }
            ConnectionEvent::ConnReqReceived
            | ConnectionEvent::ConnRespReceived
            | ConnectionEvent::RetrRespReceived
            | ConnectionEvent::RetrDataReceived => {
                self.close_connection(connection_id, DiscReason::UnexpectedMessage, true);
            }
            ConnectionEvent::RetrReqReceived => {
                if self.is_retr_req_sequence_number_available(connection_id) {
                    if sequence_number_in_seq {
                        if self.regular_processing(connection_id) {
                            self.handle_retr_req(connection_id);
                        }
                    } else {
                        self.start_retransmission(
                            connection_id,
                            ConnectionState::RetransRequest,
                            true,
                        );
                    }
                } else {
                    self.close_connection(connection_id, DiscReason::RetransmissionFailed, true);
                }
            }
            ConnectionEvent::DiscReqReceived => {
                self.close_channel_only(connection_id, true);
            }
            ConnectionEvent::HbReceived | ConnectionEvent::DataReceived => {
                if sequence_number_in_seq {
                    if confirmed_time_stamp_in_seq {
                        let _ = self.regular_processing(connection_id);
                    } else {
                        self.close_connection(
                            connection_id,
                            DiscReason::ProtocolSequenceError,
                            true,
                        );
                    }
                } else {
                    // Discard and ask for a retransmission.
                    self.clear_input_buffer(connection_id);
                    self.send_retr_req(connection_id);
                    self.update_state(connection_id, ConnectionState::RetransRequest);
                }
            }
            ConnectionEvent::SendHb => {
                self.send_heartbeat(connection_id);
            }
            ConnectionEvent::Timeout => {
                self.close_connection(connection_id, DiscReason::Timeout, true);
            }
        }
    }

    fn process_retrans_request(
        &mut self,
        connection_id: usize,
        event: ConnectionEvent,
        sequence_number_in_seq: bool,
    ) {
        match event {
            ConnectionEvent::Open => {
                self.close_connection(connection_id, DiscReason::ServiceNotAllowed, false);
            }
            ConnectionEvent::Close => {
                self.close_connection(connection_id, DiscReason::UserRequest, false);
            }
            ConnectionEvent::SendData => {
                self.send_data_message(connection_id);
            }
            ConnectionEvent::ConnReqReceived | ConnectionEvent::ConnRespReceived => {
                self.close_connection(connection_id, DiscReason::UnexpectedMessage, true);
            }
            ConnectionEvent::RetrReqReceived => {
                if self.is_retr_req_sequence_number_available(connection_id) {
                    if sequence_number_in_seq {
                        if self.regular_processing(connection_id) {
                            self.handle_retr_req(connection_id);
                        }
                    } else {
                        // Peer asked again while our own request is in
                        // flight: rebuild, but the request was already sent.
                        self.start_retransmission(
                            connection_id,
                            ConnectionState::RetransRequest,
                            false,
                        );
                    }
                } else {
                    self.close_connection(connection_id, DiscReason::RetransmissionFailed, true);
                }
            }
            ConnectionEvent::RetrRespReceived => {
                if self.regular_processing(connection_id) {
                    self.update_state(connection_id, ConnectionState::RetransRunning);
                }
            }
            ConnectionEvent::DiscReqReceived => {
                self.close_channel_only(connection_id, true);
            }
            ConnectionEvent::HbReceived
            | ConnectionEvent::DataReceived
            | ConnectionEvent::RetrDataReceived => {
                // Regular traffic is ignored until the RetrResp arrives.
            }
            ConnectionEvent::SendHb => {
                self.send_heartbeat(connection_id);
            }
            ConnectionEvent::Timeout => {
                self.close_connection(connection_id, DiscReason::Timeout, true);
            }
        }
    }

    fn process_retrans_running(
        &mut self,
        connection_id: usize,
        event: ConnectionEvent,
        sequence_number_in_seq: bool,
        confirmed_time_stamp_in_seq: bool,
    ) {
        match event {
            ConnectionEvent::Open => {
                self.close_connection(connection_id, DiscReason::ServiceNotAllowed, false);
            }
            ConnectionEvent::Close => {
                self.close_connection(connection_id, DiscReason::UserRequest, false);
            }
            ConnectionEvent::SendData => {
                self.send_data_message(connection_id);
            }
            ConnectionEvent::ConnReqReceived | ConnectionEvent::ConnRespReceived => {
                self.close_connection(connection_id, DiscReason::UnexpectedMessage, true);
            }
            ConnectionEvent::RetrReqReceived => {
                if sequence_number_in_seq {
                    self.close_connection(connection_id, DiscReason::UnexpectedMessage, true);
                } else if self.is_retr_req_sequence_number_available(connection_id) {
                    self.start_retransmission(connection_id, ConnectionState::RetransRequest, true);
                } else {
                    self.close_connection(connection_id, DiscReason::RetransmissionFailed, true);
                }
            }
            ConnectionEvent::RetrRespReceived => {
                self.close_connection(connection_id, DiscReason::UnexpectedMessage, true);
            }
            ConnectionEvent::DiscReqReceived => {
                self.close_channel_only(connection_id, true);
            }
            ConnectionEvent::HbReceived
            | ConnectionEvent::DataReceived
            | ConnectionEvent::RetrDataReceived => {
                if sequence_number_in_seq {
                    if confirmed_time_stamp_in_seq {
                        if self.regular_processing(connection_id) {
                            // The first non-RetrData message ends the
                            // retransmission.
                            if event != ConnectionEvent::RetrDataReceived {
                                self.update_state(connection_id, ConnectionState::Up);
                            }
                        }
                    } else {
                        self.close_connection(
                            connection_id,
                            DiscReason::ProtocolSequenceError,
                            true,
                        );
                    }
                } else {
                    self.clear_input_buffer(connection_id);
                    self.send_retr_req(connection_id);
                    self.update_state(connection_id, ConnectionState::RetransRequest);
                }
            }
            ConnectionEvent::SendHb => {
                self.send_heartbeat(connection_id);
            }
            ConnectionEvent::Timeout => {
                self.close_connection(connection_id, DiscReason::Timeout, true);
            }
        }
    }

    // =======================================================================
    // Canonical actions
    // =======================================================================

    /// Action [3]: regular processing; a timeliness failure escalates to a
    /// timeout close.
    fn regular_processing(&mut self, connection_id: usize) -> bool {
        let timeliness_respected = self.process_received_message(connection_id);
        if !timeliness_respected {
            self.close_connection(connection_id, DiscReason::Timeout, true);
        }
        timeliness_respected
    }

    /// Action [1]: close with a DiscReq on the wire.
    fn close_connection(
        &mut self,
        connection_id: usize,
        disc_reason: DiscReason,
        is_incoming_message: bool,
    ) {
        if is_incoming_message {
            // CS_T = SN_PDU of the message that triggered the close.
            self.update_confirmed_tx_sequence_number(connection_id);
        }
        self.send_disc_req(connection_id, disc_reason);
        self.update_state_with_reason(connection_id, ConnectionState::Closed, disc_reason);
    }

    /// Close without emitting a DiscReq (peer disconnect, close while
    /// `Down`).
    fn close_channel_only(&mut self, connection_id: usize, is_incoming_message: bool) {
        if is_incoming_message {
            self.update_confirmed_tx_sequence_number(connection_id);
        }
        self.close_redundancy_channel(connection_id);
        self.update_state(connection_id, ConnectionState::Closed);
    }

    /// Action [4] for an out-of-sequence RetrReq: adopt the peer's
    /// confirmation, rebuild the ring, optionally request the peer's side.
    fn start_retransmission(
        &mut self,
        connection_id: usize,
        new_state: ConnectionState,
        retransmission_requested: bool,
    ) {
        self.update_confirmed_rx_sequence_number(connection_id);
        self.handle_retr_req(connection_id);
        if retransmission_requested {
            self.send_retr_req(connection_id);
        }
        self.update_state(connection_id, new_state);
    }

    fn update_state(&mut self, connection_id: usize, new_state: ConnectionState) {
        self.update_state_with_reason(connection_id, new_state, DiscReason::NotInUse);
    }

    /// Apply a state change and notify, but only when the state actually
    /// differs from the one captured at event entry.
    fn update_state_with_reason(
        &mut self,
        connection_id: usize,
        new_state: ConnectionState,
        disc_reason: DiscReason,
    ) {
        if new_state != self.connections[connection_id].state_old {
            self.connections[connection_id].state = new_state;
            log::debug!(
                "[StateMachine] conn={} -> {:?} (reason {:?})",
                connection_id,
                new_state,
                disc_reason
            );
            self.send_connection_state_notification(connection_id, new_state, disc_reason);
        }
    }
}

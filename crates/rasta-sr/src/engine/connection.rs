// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-connection mutable protocol state.
//!
//! All sequence numbers and timestamps are u32 with intentional wrap-around;
//! every comparison on them is a wrapping difference against a window.

use crate::protocol::message::{MessageHeader, Pdu};
use crate::types::ConnectionState;

/// A received PDU staged between the receive pipeline and the state
/// machine's chosen action.
#[derive(Debug, Clone)]
pub struct StagedMessage {
    /// Decoded header of the staged PDU.
    pub header: MessageHeader,
    /// The raw PDU, needed for payload and body extraction.
    pub pdu: Pdu,
}

/// Mutable state of one SafRetL connection.
///
/// Created with [`ConnectionData::new`], re-armed by the engine's connection
/// reset on every `Open`.
#[derive(Debug)]
pub struct ConnectionData {
    /// Current state machine state.
    pub state: ConnectionState,
    /// State captured at entry of the current event, used to suppress
    /// duplicate state notifications.
    pub state_old: ConnectionState,

    /// Next sequence number to send (SN_T).
    pub sequence_number_tx: u32,
    /// Next sequence number expected on receive (SN_R).
    pub sequence_number_rx: u32,
    /// Sequence number to confirm in the next outbound PDU (CS_T).
    pub confirmed_sequence_number_tx: u32,
    /// CS_T value stamped into the most recently transmitted PDU.
    pub last_sent_confirmed_sequence_number_tx: u32,
    /// Last received confirmed sequence number (CS_R).
    pub confirmed_sequence_number_rx: u32,

    /// Timestamp of the last received PDU (TS_R).
    pub time_stamp_rx: u32,
    /// Last received confirmed timestamp (CTS_R).
    pub confirmed_time_stamp_rx: u32,
    /// Timestamp of the last own transmission (TS_TX).
    pub time_stamp_tx: u32,

    /// Peer receive window, learned from ConnReq/ConnResp; starts at the
    /// own `n_send_max`.
    pub opposite_receive_buffer_size: u16,
    /// Application-provided detail for the next DiscReq.
    pub detailed_disconnect_reason: u16,
    /// The adapter signalled a readable message on the channel.
    pub received_data_pending: bool,

    /// Received PDU awaiting its state machine action.
    pub input_buffer: Option<StagedMessage>,
    /// Application payload staged for the next Data PDU.
    pub temporary_send_payload: Option<Vec<u8>>,

    /// Adaptive supervision timeout T_i [ms]; always within `[0, t_max]`.
    pub timer_t_i: u32,
    /// Round-trip delay measured on the last timeout-related receive [ms].
    pub t_rtd: u32,
    /// Alive time measured on the last timeout-related receive [ms].
    pub t_alive: u32,
}

impl ConnectionData {
    /// Zeroed connection state in `Closed`.
    pub fn new(n_send_max: u16) -> ConnectionData {
        ConnectionData {
            state: ConnectionState::Closed,
            state_old: ConnectionState::Closed,
            sequence_number_tx: 0,
            sequence_number_rx: 0,
            confirmed_sequence_number_tx: 0,
            last_sent_confirmed_sequence_number_tx: 0,
            confirmed_sequence_number_rx: 0,
            time_stamp_rx: 0,
            confirmed_time_stamp_rx: 0,
            time_stamp_tx: 0,
            opposite_receive_buffer_size: n_send_max,
            detailed_disconnect_reason: 0,
            received_data_pending: false,
            input_buffer: None,
            temporary_send_payload: None,
            timer_t_i: 0,
            t_rtd: 0,
            t_alive: 0,
        }
    }
}

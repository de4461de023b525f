// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Public value types shared between the layer, the adapters and the
//! application: connection states, disconnect reasons, buffer utilisation
//! and the diagnostic records delivered through [`SrNotifications`].
//!
//! [`SrNotifications`]: crate::adapter::SrNotifications

use crate::diagnostics::TIMING_DISTRIBUTION_BINS;

/// State of a SafRetL connection.
///
/// The state machine starts in `Closed`; `NotInitialized` exists only as the
/// pre-construction value reported before any `Open` was ever issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Layer constructed but connection never opened.
    NotInitialized,
    /// No connection; only `Open` is accepted.
    Closed,
    /// Server side waiting for a connection request.
    Down,
    /// Connection establishment in progress.
    Start,
    /// Connection established, data transfer allowed.
    Up,
    /// Retransmission requested from the peer, awaiting RetrResp.
    RetransRequest,
    /// Peer-requested retransmission currently being replayed.
    RetransRunning,
}

/// Reason reported with a disconnect, both on the wire (DiscReq) and in the
/// closing connection-state notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum DiscReason {
    /// Disconnect requested by the local application.
    UserRequest = 0,
    /// No disconnect happened; placeholder outside the `Closed` state.
    NotInUse = 1,
    /// Received message type not expected in the current state.
    UnexpectedMessage = 2,
    /// Sequence number check failed during connection establishment.
    SequenceNumberError = 3,
    /// Incoming message supervision timer expired.
    Timeout = 4,
    /// Requested service not allowed in the current state.
    ServiceNotAllowed = 5,
    /// Peer protocol version not acceptable.
    ProtocolVersionError = 6,
    /// Requested retransmission sequence number no longer available.
    RetransmissionFailed = 7,
    /// Protocol sequence error (confirmed timestamp out of sequence).
    ProtocolSequenceError = 8,
}

impl DiscReason {
    /// Wire encoding of the reason (u16 in the DiscReq PDU).
    #[inline]
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Decode a wire value; unknown values are rejected.
    pub fn from_u16(value: u16) -> Option<DiscReason> {
        match value {
            0 => Some(DiscReason::UserRequest),
            1 => Some(DiscReason::NotInUse),
            2 => Some(DiscReason::UnexpectedMessage),
            3 => Some(DiscReason::SequenceNumberError),
            4 => Some(DiscReason::Timeout),
            5 => Some(DiscReason::ServiceNotAllowed),
            6 => Some(DiscReason::ProtocolVersionError),
            7 => Some(DiscReason::RetransmissionFailed),
            8 => Some(DiscReason::ProtocolSequenceError),
            _ => None,
        }
    }
}

/// Send and receive ring occupancy, reported with every connection state
/// notification and from `get_connection_state`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferUtilisation {
    /// Entries currently held in the send ring.
    pub send_buffer_used: u16,
    /// Free entries in the send ring.
    pub send_buffer_free: u16,
    /// Payloads waiting to be read by the application.
    pub receive_buffer_used: u16,
    /// Free entries in the receive ring.
    pub receive_buffer_free: u16,
}

/// Per-connection diagnostic record, emitted when the diagnostic window
/// rolls over and when a connection is closed.
///
/// The five error counters wrap on overflow. The two histograms partition
/// `[0, t_max]` into five bins by the configured timing intervals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionDiagnosticData {
    /// Messages discarded due to an MD4 safety code mismatch.
    pub ec_safety: u32,
    /// Messages discarded due to a sender/receiver address mismatch.
    pub ec_address: u32,
    /// Messages discarded due to an unknown PDU type code.
    pub ec_type: u32,
    /// Messages whose sequence number was out of sequence.
    pub ec_sn: u32,
    /// Messages whose confirmed sequence number was out of sequence.
    pub ec_csn: u32,
    /// Round-trip delay distribution over the diagnostic window.
    pub t_rtd_distribution: [u32; TIMING_DISTRIBUTION_BINS],
    /// Alive time distribution over the diagnostic window.
    pub t_alive_distribution: [u32; TIMING_DISTRIBUTION_BINS],
}

/// Diagnostic record of a single transport channel, as delivered by the
/// redundancy layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportChannelDiagnosticData {
    /// Messages considered in this diagnosis period.
    pub n_diagnosis: u32,
    /// Messages missed on this transport channel.
    pub n_missed: u32,
    /// Accumulated delay relative to the fastest channel [ms].
    pub t_drift: u32,
    /// Accumulated squared delay relative to the fastest channel [ms^2].
    pub t_drift2: u32,
}

/// Redundancy-channel diagnostic record forwarded to the application,
/// clustering the transport channel data with its channel id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedundancyChannelDiagnosticData {
    /// Transport channel the data belongs to.
    pub transport_channel_id: u32,
    /// Messages considered in this diagnosis period.
    pub n_diagnosis: u32,
    /// Messages missed on this transport channel.
    pub n_missed: u32,
    /// Accumulated delay relative to the fastest channel [ms].
    pub t_drift: u32,
    /// Accumulated squared delay relative to the fastest channel [ms^2].
    pub t_drift2: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disc_reason_wire_roundtrip() {
        for value in 0..=8u16 {
            let reason = DiscReason::from_u16(value).expect("known reason");
            assert_eq!(reason.as_u16(), value);
        }
        assert_eq!(DiscReason::from_u16(9), None);
        assert_eq!(DiscReason::from_u16(0xFFFF), None);
    }

    #[test]
    fn test_buffer_utilisation_default_is_empty() {
        let util = BufferUtilisation::default();
        assert_eq!(util.send_buffer_used, 0);
        assert_eq!(util.receive_buffer_used, 0);
    }
}

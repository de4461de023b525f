// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire format constants - single source of truth for the PDU layout.
//!
//! Offsets and sizes below describe the common little-endian frame:
//!
//! ```text
//! 0        2        4        8        12       16       20       24       28
//! +--------+--------+--------+--------+--------+--------+--------+--------+----
//! | length | type   | recv   | send   | SN_PDU | CS_PDU | TS_PDU | CTS_PDU| body
//! +--------+--------+--------+--------+--------+--------+--------+--------+----
//! ```

// =======================================================================
// Frame sizes [bytes]
// =======================================================================

/// Size of the common PDU header.
pub const MESSAGE_HEADER_SIZE: u16 = 28;

/// Size of the payload length field in Data/RetrData PDUs.
pub const PAYLOAD_LENGTH_FIELD_SIZE: u16 = 2;

/// Maximum application payload per PDU.
pub const MAX_PAYLOAD_SIZE: u16 = 1055;

/// Minimum application payload per PDU.
pub const MIN_PAYLOAD_SIZE: u16 = 1;

/// Maximum safety code length (full MD4).
pub const MAX_SAFETY_CODE_SIZE: u16 = 16;

/// Maximum total PDU size at this layer.
pub const MAX_PDU_SIZE: u16 =
    MESSAGE_HEADER_SIZE + PAYLOAD_LENGTH_FIELD_SIZE + MAX_PAYLOAD_SIZE + MAX_SAFETY_CODE_SIZE;

// =======================================================================
// Frame lengths per PDU type, without the safety code [bytes]
// =======================================================================

/// Frame length of ConnReq/ConnResp.
pub const MSG_LEN_CONN: u16 = 42;

/// Frame length of RetrReq/RetrResp.
pub const MSG_LEN_RETR: u16 = 28;

/// Frame length of DiscReq.
pub const MSG_LEN_DISC_REQ: u16 = 32;

/// Frame length of a heartbeat.
pub const MSG_LEN_HEARTBEAT: u16 = 28;

/// Frame length of an empty Data/RetrData message.
pub const MSG_LEN_EMPTY_DATA: u16 = 30;

// =======================================================================
// Common header field offsets [bytes]
// =======================================================================

/// Message length field.
pub const OFFSET_LENGTH: usize = 0;
/// Message type field.
pub const OFFSET_TYPE: usize = 2;
/// Receiver identification.
pub const OFFSET_RECEIVER_ID: usize = 4;
/// Sender identification.
pub const OFFSET_SENDER_ID: usize = 8;
/// Sequence number SN_PDU.
pub const OFFSET_SEQUENCE_NUMBER: usize = 12;
/// Confirmed sequence number CS_PDU.
pub const OFFSET_CONFIRMED_SEQUENCE_NUMBER: usize = 16;
/// Timestamp TS_PDU.
pub const OFFSET_TIME_STAMP: usize = 20;
/// Confirmed timestamp CTS_PDU.
pub const OFFSET_CONFIRMED_TIME_STAMP: usize = 24;

// =======================================================================
// Body field offsets [bytes]
// =======================================================================

/// Protocol version in ConnReq/ConnResp (4 ASCII digits).
pub const OFFSET_PROTOCOL_VERSION: usize = 28;
/// N_sendMax in ConnReq/ConnResp.
pub const OFFSET_N_SEND_MAX: usize = 32;
/// Reserve field in ConnReq/ConnResp (u64, always 0).
pub const OFFSET_RESERVE: usize = 34;
/// Payload size in Data/RetrData.
pub const OFFSET_PAYLOAD_SIZE: usize = 28;
/// Payload bytes in Data/RetrData.
pub const OFFSET_PAYLOAD: usize = 30;
/// Detailed disconnect information in DiscReq.
pub const OFFSET_DISC_DETAILED: usize = 28;
/// Disconnect reason in DiscReq.
pub const OFFSET_DISC_REASON: usize = 30;

// =======================================================================
// Protocol version
// =======================================================================

/// Number of ASCII digits in the protocol version field.
pub const PROTOCOL_VERSION_SIZE: usize = 4;

/// Protocol version of this implementation ("03.03").
pub const PROTOCOL_VERSION: [u8; PROTOCOL_VERSION_SIZE] = *b"0303";

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! PDU codec: framing, safety code handling and field access for the eight
//! SafRetL message types.
//!
//! `create_*` fills every field except CS_PDU and TS_PDU, which stay zero
//! until [`MessageCodec::update_header`] stamps them immediately before
//! transmission and recomputes the safety code over the frame prefix.
//! [`MessageCodec::check`] is the receive-side counterpart: safety code,
//! type code, then size consistency.

use crate::config::{Md4InitValue, SafetyCodeType};
use crate::protocol::constants::*;
use crate::protocol::md4;
use crate::types::DiscReason;
use crate::{Error, Result};

/// A framed PDU as exchanged with the redundancy layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pdu {
    bytes: Vec<u8>,
}

impl Pdu {
    /// Wrap received bytes as a PDU. No validation happens here; run
    /// [`MessageCodec::check`] before trusting any field.
    pub fn from_bytes(bytes: Vec<u8>) -> Pdu {
        Pdu { bytes }
    }

    /// Raw frame bytes, safety code included.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Total frame size [bytes].
    #[inline]
    pub fn size(&self) -> u16 {
        self.bytes.len() as u16
    }

    #[inline]
    fn get_u16(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.bytes[offset], self.bytes[offset + 1]])
    }

    #[inline]
    fn get_u32(&self, offset: usize) -> u32 {
        u32::from_le_bytes([
            self.bytes[offset],
            self.bytes[offset + 1],
            self.bytes[offset + 2],
            self.bytes[offset + 3],
        ])
    }

    #[inline]
    fn set_u16(&mut self, offset: usize, value: u16) {
        self.bytes[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    #[inline]
    fn set_u32(&mut self, offset: usize, value: u32) {
        self.bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    #[inline]
    fn set_u64(&mut self, offset: usize, value: u64) {
        self.bytes[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    }
}

/// The eight SafRetL message types and their wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum MessageType {
    /// Connection request.
    ConnReq = 6200,
    /// Connection response.
    ConnResp = 6201,
    /// Retransmission request.
    RetrReq = 6212,
    /// Retransmission response.
    RetrResp = 6213,
    /// Disconnection request.
    DiscReq = 6216,
    /// Heartbeat.
    Heartbeat = 6220,
    /// Data.
    Data = 6240,
    /// Retransmitted data.
    RetrData = 6241,
}

impl MessageType {
    /// Wire code of the type.
    #[inline]
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Decode a wire code; unknown codes are rejected.
    pub fn from_u16(value: u16) -> Option<MessageType> {
        match value {
            6200 => Some(MessageType::ConnReq),
            6201 => Some(MessageType::ConnResp),
            6212 => Some(MessageType::RetrReq),
            6213 => Some(MessageType::RetrResp),
            6216 => Some(MessageType::DiscReq),
            6220 => Some(MessageType::Heartbeat),
            6240 => Some(MessageType::Data),
            6241 => Some(MessageType::RetrData),
            _ => None,
        }
    }

    /// Whether this type feeds the adaptive timeout supervision (T_rtd,
    /// T_alive, timer T_i).
    #[inline]
    pub fn is_timeout_related(self) -> bool {
        matches!(self, MessageType::Heartbeat | MessageType::Data | MessageType::RetrData)
    }
}

/// Four-ASCII-digit protocol version carried in ConnReq/ConnResp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolVersion(pub [u8; PROTOCOL_VERSION_SIZE]);

impl ProtocolVersion {
    /// The version implemented by this crate.
    pub const CURRENT: ProtocolVersion = ProtocolVersion(PROTOCOL_VERSION);

    /// Accept a received version that is the same or higher, compared
    /// digit-wise from the most significant digit.
    pub fn accepts(self, received: ProtocolVersion) -> bool {
        for (own, recv) in self.0.iter().zip(received.0.iter()) {
            if recv > own {
                return true;
            }
            if recv < own {
                return false;
            }
        }
        true
    }

    /// All digits are ASCII '0'..='9'.
    pub fn is_well_formed(self) -> bool {
        self.0.iter().all(u8::is_ascii_digit)
    }
}

/// Header fields supplied when a PDU is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeaderCreate {
    /// RaSTA id of the local endpoint.
    pub sender_id: u32,
    /// RaSTA id of the remote endpoint.
    pub receiver_id: u32,
    /// Sequence number SN_PDU.
    pub sequence_number: u32,
    /// Confirmed timestamp CTS_PDU (last received TS).
    pub confirmed_time_stamp: u32,
}

/// Header fields stamped immediately before transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeaderUpdate {
    /// Confirmed sequence number CS_PDU.
    pub confirmed_sequence_number: u32,
    /// Transmit timestamp TS_PDU.
    pub time_stamp: u32,
}

/// Decoded common PDU header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Total frame length as carried on the wire.
    pub message_length: u16,
    /// Decoded message type.
    pub message_type: MessageType,
    /// Receiver identification.
    pub receiver_id: u32,
    /// Sender identification.
    pub sender_id: u32,
    /// Sequence number SN_PDU.
    pub sequence_number: u32,
    /// Confirmed sequence number CS_PDU.
    pub confirmed_sequence_number: u32,
    /// Timestamp TS_PDU.
    pub time_stamp: u32,
    /// Confirmed timestamp CTS_PDU.
    pub confirmed_time_stamp: u32,
}

/// Stateful part of the codec: configured safety code type and MD4 initial
/// state.
#[derive(Debug, Clone)]
pub struct MessageCodec {
    safety_code_type: SafetyCodeType,
    md4_initial_value: Md4InitValue,
}

impl MessageCodec {
    /// Create a codec for the configured safety code.
    pub fn new(safety_code_type: SafetyCodeType, md4_initial_value: Md4InitValue) -> MessageCodec {
        MessageCodec { safety_code_type, md4_initial_value }
    }

    /// Byte length of the configured safety code.
    #[inline]
    pub fn safety_code_length(&self) -> u16 {
        self.safety_code_type.length()
    }

    fn new_frame(&self, length_without_code: u16, message_type: MessageType, header: MessageHeaderCreate) -> Pdu {
        let total = length_without_code + self.safety_code_length();
        let mut pdu = Pdu { bytes: vec![0u8; total as usize] };
        pdu.set_u16(OFFSET_LENGTH, total);
        pdu.set_u16(OFFSET_TYPE, message_type.as_u16());
        pdu.set_u32(OFFSET_RECEIVER_ID, header.receiver_id);
        pdu.set_u32(OFFSET_SENDER_ID, header.sender_id);
        pdu.set_u32(OFFSET_SEQUENCE_NUMBER, header.sequence_number);
        // CS_PDU and TS_PDU stay zero until update_header.
        pdu.set_u32(OFFSET_CONFIRMED_TIME_STAMP, header.confirmed_time_stamp);
        pdu
    }

    fn new_conn_frame(
        &self,
        message_type: MessageType,
        header: MessageHeaderCreate,
        n_send_max: u16,
    ) -> Pdu {
        debug_assert!(ProtocolVersion::CURRENT.is_well_formed());
        let mut pdu = self.new_frame(MSG_LEN_CONN, message_type, header);
        pdu.bytes[OFFSET_PROTOCOL_VERSION..OFFSET_PROTOCOL_VERSION + PROTOCOL_VERSION_SIZE]
            .copy_from_slice(&ProtocolVersion::CURRENT.0);
        pdu.set_u16(OFFSET_N_SEND_MAX, n_send_max);
        pdu.set_u64(OFFSET_RESERVE, 0);
        pdu
    }

    /// Create a connection request. The confirmed timestamp of a ConnReq is
    /// 0 by contract.
    pub fn create_conn_req(&self, header: MessageHeaderCreate, n_send_max: u16) -> Pdu {
        debug_assert_eq!(header.confirmed_time_stamp, 0, "ConnReq carries CTS_PDU = 0");
        self.new_conn_frame(MessageType::ConnReq, header, n_send_max)
    }

    /// Create a connection response.
    pub fn create_conn_resp(&self, header: MessageHeaderCreate, n_send_max: u16) -> Pdu {
        self.new_conn_frame(MessageType::ConnResp, header, n_send_max)
    }

    fn new_data_frame(&self, message_type: MessageType, header: MessageHeaderCreate, payload: &[u8]) -> Pdu {
        assert!(
            (MIN_PAYLOAD_SIZE as usize..=MAX_PAYLOAD_SIZE as usize).contains(&payload.len()),
            "payload size {} out of range",
            payload.len()
        );
        let mut pdu =
            self.new_frame(MSG_LEN_EMPTY_DATA + payload.len() as u16, message_type, header);
        pdu.set_u16(OFFSET_PAYLOAD_SIZE, payload.len() as u16);
        pdu.bytes[OFFSET_PAYLOAD..OFFSET_PAYLOAD + payload.len()].copy_from_slice(payload);
        pdu
    }

    /// Create a data message.
    pub fn create_data(&self, header: MessageHeaderCreate, payload: &[u8]) -> Pdu {
        self.new_data_frame(MessageType::Data, header, payload)
    }

    /// Create a retransmitted data message.
    pub fn create_retr_data(&self, header: MessageHeaderCreate, payload: &[u8]) -> Pdu {
        self.new_data_frame(MessageType::RetrData, header, payload)
    }

    /// Create a retransmission request.
    pub fn create_retr_req(&self, header: MessageHeaderCreate) -> Pdu {
        self.new_frame(MSG_LEN_RETR, MessageType::RetrReq, header)
    }

    /// Create a retransmission response.
    pub fn create_retr_resp(&self, header: MessageHeaderCreate) -> Pdu {
        self.new_frame(MSG_LEN_RETR, MessageType::RetrResp, header)
    }

    /// Create a heartbeat.
    pub fn create_heartbeat(&self, header: MessageHeaderCreate) -> Pdu {
        self.new_frame(MSG_LEN_HEARTBEAT, MessageType::Heartbeat, header)
    }

    /// Create a disconnection request.
    pub fn create_disc_req(
        &self,
        header: MessageHeaderCreate,
        detailed_reason: u16,
        reason: DiscReason,
    ) -> Pdu {
        let mut pdu = self.new_frame(MSG_LEN_DISC_REQ, MessageType::DiscReq, header);
        pdu.set_u16(OFFSET_DISC_DETAILED, detailed_reason);
        pdu.set_u16(OFFSET_DISC_REASON, reason.as_u16());
        pdu
    }

    /// Stamp CS_PDU and TS_PDU, then recompute the safety code over the
    /// frame prefix.
    pub fn update_header(&self, pdu: &mut Pdu, update: MessageHeaderUpdate) {
        pdu.set_u32(OFFSET_CONFIRMED_SEQUENCE_NUMBER, update.confirmed_sequence_number);
        pdu.set_u32(OFFSET_TIME_STAMP, update.time_stamp);

        let code_len = self.safety_code_length() as usize;
        if code_len > 0 {
            let prefix_len = pdu.bytes.len() - code_len;
            let digest = md4::compute(self.md4_initial_value, &pdu.bytes[..prefix_len]);
            pdu.bytes[prefix_len..].copy_from_slice(&digest[..code_len]);
        }
    }

    /// Receive-side frame validation: safety code, then type code, then
    /// size consistency.
    ///
    /// Structurally short frames fail the size check; no field of an
    /// unchecked PDU is trusted before this returns `Ok`.
    pub fn check(&self, pdu: &Pdu) -> Result<()> {
        let code_len = self.safety_code_length() as usize;
        let total = pdu.bytes.len();
        if total < MESSAGE_HEADER_SIZE as usize + code_len || total > MAX_PDU_SIZE as usize {
            return Err(Error::InvalidMessageSize);
        }

        // Safety code over the frame prefix.
        if code_len > 0 {
            let prefix_len = total - code_len;
            let digest = md4::compute(self.md4_initial_value, &pdu.bytes[..prefix_len]);
            if pdu.bytes[prefix_len..] != digest[..code_len] {
                return Err(Error::InvalidMessageMd4);
            }
        }

        // Type code.
        let Some(message_type) = MessageType::from_u16(pdu.get_u16(OFFSET_TYPE)) else {
            return Err(Error::InvalidMessageType);
        };

        // Length field against the received byte count.
        let message_length = pdu.get_u16(OFFSET_LENGTH);
        if message_length as usize != total {
            return Err(Error::InvalidMessageSize);
        }

        // Type-specific frame size.
        let expected = match message_type {
            MessageType::ConnReq | MessageType::ConnResp => MSG_LEN_CONN,
            MessageType::RetrReq | MessageType::RetrResp => MSG_LEN_RETR,
            MessageType::Heartbeat => MSG_LEN_HEARTBEAT,
            MessageType::DiscReq => MSG_LEN_DISC_REQ,
            MessageType::Data | MessageType::RetrData => {
                if total < OFFSET_PAYLOAD + code_len {
                    return Err(Error::InvalidMessageSize);
                }
                let payload_size = pdu.get_u16(OFFSET_PAYLOAD_SIZE);
                let body = MESSAGE_HEADER_SIZE + PAYLOAD_LENGTH_FIELD_SIZE;
                if payload_size != message_length - body - code_len as u16 {
                    return Err(Error::InvalidMessageSize);
                }
                MSG_LEN_EMPTY_DATA + payload_size
            }
        };
        if message_length != expected + code_len as u16 {
            return Err(Error::InvalidMessageSize);
        }

        Ok(())
    }
}

// =======================================================================
// Field accessors (valid only after a successful check)
// =======================================================================

/// Decode the common header. `None` when the type code is unknown.
pub fn message_header(pdu: &Pdu) -> Option<MessageHeader> {
    Some(MessageHeader {
        message_length: pdu.get_u16(OFFSET_LENGTH),
        message_type: MessageType::from_u16(pdu.get_u16(OFFSET_TYPE))?,
        receiver_id: pdu.get_u32(OFFSET_RECEIVER_ID),
        sender_id: pdu.get_u32(OFFSET_SENDER_ID),
        sequence_number: pdu.get_u32(OFFSET_SEQUENCE_NUMBER),
        confirmed_sequence_number: pdu.get_u32(OFFSET_CONFIRMED_SEQUENCE_NUMBER),
        time_stamp: pdu.get_u32(OFFSET_TIME_STAMP),
        confirmed_time_stamp: pdu.get_u32(OFFSET_CONFIRMED_TIME_STAMP),
    })
}

/// Decoded message type of a checked PDU.
pub fn message_type(pdu: &Pdu) -> Option<MessageType> {
    MessageType::from_u16(pdu.get_u16(OFFSET_TYPE))
}

/// Sequence number SN_PDU of a checked PDU.
pub fn sequence_number(pdu: &Pdu) -> u32 {
    pdu.get_u32(OFFSET_SEQUENCE_NUMBER)
}

/// Payload bytes of a checked Data/RetrData PDU.
pub fn payload(pdu: &Pdu) -> &[u8] {
    let size = pdu.get_u16(OFFSET_PAYLOAD_SIZE) as usize;
    &pdu.as_bytes()[OFFSET_PAYLOAD..OFFSET_PAYLOAD + size]
}

/// Protocol version and peer receive window of a checked ConnReq/ConnResp.
pub fn conn_data(pdu: &Pdu) -> (ProtocolVersion, u16) {
    let mut version = [0u8; PROTOCOL_VERSION_SIZE];
    version.copy_from_slice(
        &pdu.as_bytes()[OFFSET_PROTOCOL_VERSION..OFFSET_PROTOCOL_VERSION + PROTOCOL_VERSION_SIZE],
    );
    (ProtocolVersion(version), pdu.get_u16(OFFSET_N_SEND_MAX))
}

/// Detailed reason and disconnect reason code of a checked DiscReq.
pub fn disc_data(pdu: &Pdu) -> (u16, u16) {
    (pdu.get_u16(OFFSET_DISC_DETAILED), pdu.get_u16(OFFSET_DISC_REASON))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> MessageCodec {
        MessageCodec::new(SafetyCodeType::LowerMd4, Md4InitValue::RFC1320)
    }

    fn header() -> MessageHeaderCreate {
        MessageHeaderCreate {
            sender_id: 0x61,
            receiver_id: 0x62,
            sequence_number: 1000,
            confirmed_time_stamp: 0,
        }
    }

    fn stamp(codec: &MessageCodec, pdu: &mut Pdu, cs: u32, ts: u32) {
        codec.update_header(pdu, MessageHeaderUpdate { confirmed_sequence_number: cs, time_stamp: ts });
    }

    #[test]
    fn test_conn_req_frame_layout() {
        let codec = codec();
        let mut pdu = codec.create_conn_req(header(), 20);
        stamp(&codec, &mut pdu, 0, 77);

        // 42-byte frame + 8-byte lower MD4.
        assert_eq!(pdu.size(), 50);
        let hdr = message_header(&pdu).expect("valid header");
        assert_eq!(hdr.message_type, MessageType::ConnReq);
        assert_eq!(hdr.message_length, 50);
        assert_eq!(hdr.receiver_id, 0x62);
        assert_eq!(hdr.sender_id, 0x61);
        assert_eq!(hdr.sequence_number, 1000);
        assert_eq!(hdr.confirmed_sequence_number, 0);
        assert_eq!(hdr.time_stamp, 77);
        assert_eq!(hdr.confirmed_time_stamp, 0);

        let (version, n_send_max) = conn_data(&pdu);
        assert_eq!(&version.0, b"0303");
        assert_eq!(n_send_max, 20);
        // Reserve field is zero.
        assert_eq!(&pdu.as_bytes()[34..42], &[0u8; 8]);

        codec.check(&pdu).expect("round trip");
    }

    #[test]
    fn test_data_frame_layout() {
        let codec = codec();
        let mut pdu = codec.create_data(header(), &[0xAA, 0xBB, 0xCC]);
        stamp(&codec, &mut pdu, 41, 123);

        // 30 + 3 + 8 bytes.
        assert_eq!(pdu.size(), 41);
        assert_eq!(payload(&pdu), &[0xAA, 0xBB, 0xCC]);
        assert_eq!(message_type(&pdu), Some(MessageType::Data));
        codec.check(&pdu).expect("round trip");
    }

    #[test]
    fn test_all_plain_frame_sizes() {
        let codec = codec();
        let cases = [
            (codec.create_retr_req(header()), 28 + 8, MessageType::RetrReq),
            (codec.create_retr_resp(header()), 28 + 8, MessageType::RetrResp),
            (codec.create_heartbeat(header()), 28 + 8, MessageType::Heartbeat),
            (
                codec.create_disc_req(header(), 9, DiscReason::Timeout),
                32 + 8,
                MessageType::DiscReq,
            ),
        ];
        for (mut pdu, size, kind) in cases {
            stamp(&codec, &mut pdu, 5, 6);
            assert_eq!(pdu.size(), size);
            assert_eq!(message_type(&pdu), Some(kind));
            codec.check(&pdu).expect("frame checks");
        }
    }

    #[test]
    fn test_disc_req_body() {
        let codec = codec();
        let mut pdu = codec.create_disc_req(header(), 0x1234, DiscReason::ProtocolVersionError);
        stamp(&codec, &mut pdu, 0, 0);

        let (detailed, reason) = disc_data(&pdu);
        assert_eq!(detailed, 0x1234);
        assert_eq!(reason, DiscReason::ProtocolVersionError.as_u16());
    }

    #[test]
    fn test_update_header_recomputes_safety_code() {
        let codec = codec();
        let mut pdu = codec.create_heartbeat(header());
        stamp(&codec, &mut pdu, 10, 20);
        let first_code = pdu.as_bytes()[28..].to_vec();

        stamp(&codec, &mut pdu, 11, 21);
        assert_ne!(pdu.as_bytes()[28..], first_code[..]);
        codec.check(&pdu).expect("still valid after restamp");
    }

    #[test]
    fn test_check_detects_corruption() {
        let codec = codec();
        let mut pdu = codec.create_heartbeat(header());
        stamp(&codec, &mut pdu, 10, 20);

        let mut corrupted = pdu.as_bytes().to_vec();
        corrupted[12] ^= 0x01;
        assert_eq!(
            codec.check(&Pdu::from_bytes(corrupted)),
            Err(Error::InvalidMessageMd4)
        );
    }

    #[test]
    fn test_check_rejects_unknown_type() {
        let codec = MessageCodec::new(SafetyCodeType::None, Md4InitValue::RFC1320);
        let mut pdu = codec.create_heartbeat(header());
        pdu.set_u16(OFFSET_TYPE, 6999);
        assert_eq!(codec.check(&pdu), Err(Error::InvalidMessageType));
    }

    #[test]
    fn test_check_rejects_length_mismatch() {
        let codec = MessageCodec::new(SafetyCodeType::None, Md4InitValue::RFC1320);
        let mut pdu = codec.create_heartbeat(header());
        pdu.set_u16(OFFSET_LENGTH, 29);
        assert_eq!(codec.check(&pdu), Err(Error::InvalidMessageSize));
    }

    #[test]
    fn test_check_rejects_short_frame() {
        let codec = codec();
        assert_eq!(
            codec.check(&Pdu::from_bytes(vec![0u8; 10])),
            Err(Error::InvalidMessageSize)
        );
    }

    #[test]
    fn test_check_rejects_payload_size_mismatch() {
        let codec = MessageCodec::new(SafetyCodeType::None, Md4InitValue::RFC1320);
        let mut pdu = codec.create_data(header(), &[1, 2, 3, 4]);
        pdu.set_u16(OFFSET_PAYLOAD_SIZE, 3);
        assert_eq!(codec.check(&pdu), Err(Error::InvalidMessageSize));
    }

    #[test]
    fn test_no_safety_code_frames() {
        let codec = MessageCodec::new(SafetyCodeType::None, Md4InitValue::RFC1320);
        let mut pdu = codec.create_heartbeat(header());
        stamp(&codec, &mut pdu, 1, 2);
        assert_eq!(pdu.size(), 28);
        codec.check(&pdu).expect("no-code frame valid");
    }

    #[test]
    fn test_full_md4_frames() {
        let codec = MessageCodec::new(SafetyCodeType::FullMd4, Md4InitValue::RFC1320);
        let mut pdu = codec.create_heartbeat(header());
        stamp(&codec, &mut pdu, 1, 2);
        assert_eq!(pdu.size(), 44);
        codec.check(&pdu).expect("full-code frame valid");
    }

    #[test]
    fn test_mismatched_md4_init_rejects() {
        let sender = codec();
        let receiver = MessageCodec::new(
            SafetyCodeType::LowerMd4,
            Md4InitValue { init_a: 1, init_b: 2, init_c: 3, init_d: 4 },
        );
        let mut pdu = sender.create_heartbeat(header());
        stamp(&sender, &mut pdu, 1, 2);
        assert_eq!(receiver.check(&pdu), Err(Error::InvalidMessageMd4));
    }

    #[test]
    fn test_version_acceptance_is_digit_wise() {
        let own = ProtocolVersion::CURRENT; // "0303"
        assert!(own.accepts(ProtocolVersion(*b"0303")));
        assert!(own.accepts(ProtocolVersion(*b"0304")));
        assert!(own.accepts(ProtocolVersion(*b"0310")));
        assert!(own.accepts(ProtocolVersion(*b"1000")));
        assert!(!own.accepts(ProtocolVersion(*b"0302")));
        assert!(!own.accepts(ProtocolVersion(*b"0203")));
        // A higher early digit wins over lower later digits.
        assert!(own.accepts(ProtocolVersion(*b"0400")));
    }

    #[test]
    fn test_max_payload_roundtrip() {
        let codec = codec();
        let payload_bytes: Vec<u8> = (0..MAX_PAYLOAD_SIZE).map(|i| i as u8).collect();
        let mut pdu = codec.create_data(header(), &payload_bytes);
        stamp(&codec, &mut pdu, 1, 2);
        assert_eq!(pdu.size(), MAX_PDU_SIZE - 8); // full MD4 would hit the cap
        codec.check(&pdu).expect("max payload frame valid");
        assert_eq!(payload(&pdu), &payload_bytes[..]);
    }
}

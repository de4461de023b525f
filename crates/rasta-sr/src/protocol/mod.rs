// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SafRetL wire protocol: frame constants, MD4 safety code and the PDU
//! codec.
//!
//! Every multi-byte field on the wire is little-endian. A PDU consists of a
//! 28-byte common header, a type-specific body and an optional MD4 safety
//! code tail of 0, 8 or 16 bytes computed over everything before it.

pub mod constants;
pub mod md4;
pub mod message;

pub use message::{
    MessageCodec, MessageHeader, MessageHeaderCreate, MessageHeaderUpdate, MessageType, Pdu,
    ProtocolVersion,
};

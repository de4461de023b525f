// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # rasta-sr - RaSTA Safety and Retransmission Layer
//!
//! A pure Rust implementation of the Safety and Retransmission Layer
//! (SafRetL) of the RaSTA protocol stack (Rail Safe Transport Application,
//! DIN EN 50159 / VDE 0831-200). The layer multiplexes up to two
//! safety-critical connections over a lower redundancy layer and provides
//! authenticated, in-order, timely delivery with retransmission of lost
//! messages, heartbeat-based liveness supervision and per-connection
//! diagnostics.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rasta_sr::{
//!     ConnectionConfig, Md4InitValue, SafetyCodeType, SrConfig, SrLayer,
//! };
//! # fn adapters() -> (Box<dyn rasta_sr::RedundancyAdapter>,
//! #                   Box<dyn rasta_sr::SystemAdapter>,
//! #                   Box<dyn rasta_sr::SrNotifications>) { unimplemented!() }
//!
//! fn main() -> rasta_sr::Result<()> {
//!     let cfg = SrConfig {
//!         rasta_network_id: 1,
//!         t_max: 750,
//!         t_h: 300,
//!         safety_code_type: SafetyCodeType::LowerMd4,
//!         m_w_a: 10,
//!         n_send_max: 20,
//!         n_max_packet: 1,
//!         n_diag_window: 100,
//!         connections: vec![ConnectionConfig {
//!             connection_id: 0,
//!             sender_id: 0x61,
//!             receiver_id: 0x62,
//!         }],
//!         md4_initial_value: Md4InitValue::RFC1320,
//!         diag_timing_distr_intervals: [150, 300, 450, 600],
//!     };
//!     let (redundancy, system, notifications) = adapters();
//!     let mut layer = SrLayer::new(cfg, redundancy, system, notifications)?;
//!
//!     let conn = layer.open_connection(0x61, 0x62, 1)?;
//!
//!     // Drive timers, heartbeats and the receive poll from the main loop;
//!     // once the peer's ConnResp arrives the connection reports Up and
//!     // payloads flow.
//!     layer.tick()?;
//!     layer.send_data(conn, &[0xAA, 0xBB, 0xCC])?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +------------------------------------------------------------------+
//! |                        Application Layer                         |
//! |     open/close/send_data/read_data/get_connection_state/tick     |
//! +------------------------------------------------------------------+
//! |                       SafRetL (this crate)                       |
//! |  PDU codec + MD4 | send/receive rings | state machine | timers   |
//! +------------------------------------------------------------------+
//! |                  Redundancy Layer (external)                     |
//! |        open/close channel | send_message | read_message          |
//! +------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SrLayer`] | Entry point: owns all connection state and drives the protocol |
//! | [`SrConfig`] | Immutable layer configuration, validated at construction |
//! | [`RedundancyAdapter`] | Lower-layer channel interface consumed by the engine |
//! | [`SystemAdapter`] | Monotonic timer, entropy and fatal-error hook |
//! | [`SrNotifications`] | Callbacks delivered to the application |
//!
//! ## Concurrency model
//!
//! The whole layer is single-threaded and cooperative: every entry point
//! takes `&mut self` and runs to completion. There are no internal threads,
//! no blocking calls and no locks; the borrow checker enforces the mutual
//! exclusion the protocol requires.

/// Compile-time gated trace logging.
#[macro_use]
pub mod logging;

/// Adapter traits consumed (redundancy layer, system services) and produced
/// (application notifications) by the engine.
pub mod adapter;
/// Layer configuration: bounds, validation, optional file loaders.
pub mod config;
/// Per-connection diagnostics: error counters and timing histograms.
pub mod diagnostics;
/// Protocol engine: per-connection state, pipelines and the state machine.
pub mod engine;
/// PDU wire format: framing constants, MD4 safety code, message codec.
pub mod protocol;
/// Send and receive rings with retransmission support.
pub mod reliability;
/// Public API value types (states, reasons, diagnostic records).
pub mod types;

mod api;

pub use adapter::{RedundancyAdapter, SrNotifications, SystemAdapter};
pub use api::SrLayer;
pub use config::{ConnectionConfig, Md4InitValue, SafetyCodeType, SrConfig};
pub use types::{
    BufferUtilisation, ConnectionDiagnosticData, ConnectionState, DiscReason,
    RedundancyChannelDiagnosticData, TransportChannelDiagnosticData,
};

/// Errors returned by SafRetL operations.
///
/// The kind set is fixed by the protocol contract: the same values are
/// returned to callers, recorded in diagnostics, or handed to the
/// [`SystemAdapter::fatal_error`] hook when an internal invariant breaks.
/// Per-message validation failures are never surfaced here; they update a
/// diagnostic counter, drop the message, or disconnect with a
/// [`DiscReason`](types::DiscReason).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // ========================================================================
    // Flow results
    // ========================================================================
    /// Receive ring or redundancy channel has no message.
    NoMessageReceived,
    /// Send ring is empty (internal use only).
    NoMessageToSend,

    // ========================================================================
    // Lifecycle errors
    // ========================================================================
    /// The layer was never initialised.
    NotInitialized,
    /// A second initialisation was attempted.
    AlreadyInitialized,
    /// Configuration out of range or inconsistent.
    InvalidConfiguration,
    /// Argument out of range; fatal when raised on an internal contract.
    InvalidParameter,

    // ========================================================================
    // Message validation errors
    // ========================================================================
    /// Unknown PDU type code on receive.
    InvalidMessageType,
    /// Frame length field does not match the received byte count.
    InvalidMessageSize,
    /// Application buffer too small for the pending payload.
    InvalidBufferSize,
    /// Reserved for the redundancy layer check code; unused at this layer.
    InvalidMessageCrc,
    /// MD4 safety code verification failed.
    InvalidMessageMd4,

    // ========================================================================
    // Buffer errors
    // ========================================================================
    /// Receive ring full; fatal because callers pre-check free space.
    ReceiveBufferFull,
    /// Reserved for the redundancy layer defer queue; unused at this layer.
    DeferQueueEmpty,
    /// Send ring full.
    SendBufferFull,
    /// Requested retransmission sequence number not in the send ring.
    InvalidSequenceNumber,

    // ========================================================================
    // Other errors
    // ========================================================================
    /// Internal invariant violation; always fatal.
    InternalError,
    /// Operation not allowed in the current connection state.
    InvalidOperationInCurrentState,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Flow
            Error::NoMessageReceived => write!(f, "No message received"),
            Error::NoMessageToSend => write!(f, "No message to send"),
            // Lifecycle
            Error::NotInitialized => write!(f, "Layer not initialised"),
            Error::AlreadyInitialized => write!(f, "Layer already initialised"),
            Error::InvalidConfiguration => write!(f, "Invalid configuration"),
            Error::InvalidParameter => write!(f, "Invalid parameter"),
            // Message validation
            Error::InvalidMessageType => write!(f, "Invalid message type"),
            Error::InvalidMessageSize => write!(f, "Invalid message size"),
            Error::InvalidBufferSize => write!(f, "Buffer too small for pending message"),
            Error::InvalidMessageCrc => write!(f, "Invalid message CRC"),
            Error::InvalidMessageMd4 => write!(f, "MD4 safety code mismatch"),
            // Buffers
            Error::ReceiveBufferFull => write!(f, "Receive buffer full"),
            Error::DeferQueueEmpty => write!(f, "Defer queue empty"),
            Error::SendBufferFull => write!(f, "Send buffer full"),
            Error::InvalidSequenceNumber => {
                write!(f, "Sequence number not available for retransmission")
            }
            // Other
            Error::InternalError => write!(f, "Internal error"),
            Error::InvalidOperationInCurrentState => {
                write!(f, "Operation invalid in current connection state")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

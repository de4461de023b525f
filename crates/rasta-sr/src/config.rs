// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SafRetL configuration - single source of truth for protocol bounds.
//!
//! All protocol limits live here as named constants; nothing else in the
//! crate hardcodes them. The [`SrConfig`] structure is immutable after the
//! layer is constructed and is validated against the bounds below in the
//! order the protocol contract prescribes.
//!
//! With the `config-loaders` feature enabled the configuration types derive
//! serde and can be loaded from YAML (`SrConfig::from_yaml_str` /
//! `SrConfig::from_yaml_file`).

use crate::diagnostics;
use crate::{Error, Result};

#[cfg(feature = "config-loaders")]
use serde::{Deserialize, Serialize};

// =======================================================================
// Connection limits
// =======================================================================

/// Minimum number of configured connections.
pub const MIN_CONNECTIONS: u32 = 1;

/// Maximum number of configured connections (and redundancy channels).
pub const MAX_CONNECTIONS: u32 = 2;

// =======================================================================
// Timing bounds [ms]
// =======================================================================

/// Minimum accepted message age bound T_max.
pub const MIN_T_MAX: u32 = 750;

/// Maximum accepted message age bound T_max.
pub const MAX_T_MAX: u32 = 2000;

/// Minimum heartbeat period T_h.
pub const MIN_T_H: u32 = 300;

/// Maximum heartbeat period T_h.
pub const MAX_T_H: u32 = 750;

// =======================================================================
// Flow control bounds
// =======================================================================

/// Minimum confirmed-sequence acknowledgement threshold MWA.
pub const MIN_M_W_A: u16 = 1;

/// Maximum confirmed-sequence acknowledgement threshold MWA.
pub const MAX_M_W_A: u16 = 19;

/// Minimum receive window / send ring capacity N_sendMax.
pub const MIN_N_SEND_MAX: u16 = 2;

/// Maximum receive window / send ring capacity N_sendMax.
pub const MAX_N_SEND_MAX: u16 = 20;

/// The packetisation factor is fixed: one application message per PDU.
pub const N_MAX_PACKET: u32 = 1;

// =======================================================================
// Diagnostics bounds
// =======================================================================

/// Minimum diagnostic window length [messages].
pub const MIN_N_DIAG_WINDOW: u32 = 100;

/// Maximum diagnostic window length [messages].
pub const MAX_N_DIAG_WINDOW: u32 = 10000;

// =======================================================================
// Receive-poll reserves
// =======================================================================

/// Free receive-ring entries required before polling the adapter.
pub const MIN_FREE_RECEIVE_ENTRIES_FOR_POLL: u16 = 1;

/// Free send-ring entries required before polling the adapter.
///
/// Reserves room for the worst-case retransmission-of-retransmission
/// sequence (RetrResp + Hb + RetrReq).
pub const MIN_FREE_SEND_ENTRIES_FOR_RETR: u16 = 3;

/// Type of safety code appended to every PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "config-loaders", derive(Serialize, Deserialize))]
pub enum SafetyCodeType {
    /// No safety code.
    None,
    /// First 8 bytes of the MD4 digest.
    LowerMd4,
    /// Full 16-byte MD4 digest.
    FullMd4,
}

impl SafetyCodeType {
    /// Byte length of the safety code on the wire.
    #[inline]
    pub fn length(self) -> u16 {
        match self {
            SafetyCodeType::None => 0,
            SafetyCodeType::LowerMd4 => 8,
            SafetyCodeType::FullMd4 => 16,
        }
    }
}

/// Network-specific MD4 initial state.
///
/// The initial state is part of the safety mechanism: two networks with
/// different initial values reject each other's traffic at the safety code
/// check. Every value is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "config-loaders", derive(Serialize, Deserialize))]
pub struct Md4InitValue {
    /// Initial A register.
    pub init_a: u32,
    /// Initial B register.
    pub init_b: u32,
    /// Initial C register.
    pub init_c: u32,
    /// Initial D register.
    pub init_d: u32,
}

impl Md4InitValue {
    /// The standard RFC 1320 initial state.
    pub const RFC1320: Md4InitValue = Md4InitValue {
        init_a: 0x67452301,
        init_b: 0xEFCDAB89,
        init_c: 0x98BADCFE,
        init_d: 0x10325476,
    };
}

/// Static configuration of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "config-loaders", derive(Serialize, Deserialize))]
pub struct ConnectionConfig {
    /// Connection id; must equal the index in the connection table.
    pub connection_id: u32,
    /// RaSTA id of the local endpoint.
    pub sender_id: u32,
    /// RaSTA id of the remote endpoint.
    pub receiver_id: u32,
}

/// Immutable SafRetL layer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-loaders", derive(Serialize, Deserialize))]
pub struct SrConfig {
    /// Id of the RaSTA network this endpoint belongs to.
    pub rasta_network_id: u32,
    /// Maximum accepted message age [ms]. Valid: [`MIN_T_MAX`]..=[`MAX_T_MAX`].
    pub t_max: u32,
    /// Heartbeat period [ms]. Valid: [`MIN_T_H`]..=[`MAX_T_H`].
    pub t_h: u32,
    /// Safety code appended to every PDU.
    pub safety_code_type: SafetyCodeType,
    /// Confirmed-sequence acknowledgement threshold. Must stay below
    /// `n_send_max`.
    pub m_w_a: u16,
    /// Own receive window size and send ring capacity.
    pub n_send_max: u16,
    /// Packetisation factor; must be [`N_MAX_PACKET`].
    pub n_max_packet: u32,
    /// Diagnostic window length [messages].
    pub n_diag_window: u32,
    /// Connection table, indexed by connection id.
    pub connections: Vec<ConnectionConfig>,
    /// Network-specific MD4 initial state.
    pub md4_initial_value: Md4InitValue,
    /// Strictly ascending interval bounds partitioning `[0, t_max]` for the
    /// timing histograms.
    pub diag_timing_distr_intervals: [u32; 4],
}

impl SrConfig {
    /// Validate the configuration against the protocol bounds.
    ///
    /// The network id and the MD4 initial value are not checked: their full
    /// value range is valid.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_T_MAX..=MAX_T_MAX).contains(&self.t_max) {
            log::warn!("[SrConfig::validate] t_max {} out of range", self.t_max);
            return Err(Error::InvalidConfiguration);
        }
        if !(MIN_T_H..=MAX_T_H).contains(&self.t_h) {
            log::warn!("[SrConfig::validate] t_h {} out of range", self.t_h);
            return Err(Error::InvalidConfiguration);
        }
        if !(MIN_M_W_A..=MAX_M_W_A).contains(&self.m_w_a) {
            log::warn!("[SrConfig::validate] m_w_a {} out of range", self.m_w_a);
            return Err(Error::InvalidConfiguration);
        }
        if !(MIN_N_SEND_MAX..=MAX_N_SEND_MAX).contains(&self.n_send_max) {
            log::warn!("[SrConfig::validate] n_send_max {} out of range", self.n_send_max);
            return Err(Error::InvalidConfiguration);
        }
        if self.m_w_a >= self.n_send_max {
            log::warn!(
                "[SrConfig::validate] m_w_a {} must stay below n_send_max {}",
                self.m_w_a,
                self.n_send_max
            );
            return Err(Error::InvalidConfiguration);
        }
        if self.n_max_packet != N_MAX_PACKET {
            log::warn!("[SrConfig::validate] n_max_packet {} unsupported", self.n_max_packet);
            return Err(Error::InvalidConfiguration);
        }
        if !(MIN_N_DIAG_WINDOW..=MAX_N_DIAG_WINDOW).contains(&self.n_diag_window) {
            log::warn!("[SrConfig::validate] n_diag_window {} out of range", self.n_diag_window);
            return Err(Error::InvalidConfiguration);
        }
        let connection_count = self.connections.len() as u32;
        if !(MIN_CONNECTIONS..=MAX_CONNECTIONS).contains(&connection_count) {
            log::warn!("[SrConfig::validate] {} connections configured", connection_count);
            return Err(Error::InvalidConfiguration);
        }
        if !diagnostics::are_intervals_valid(self.t_max, &self.diag_timing_distr_intervals) {
            log::warn!("[SrConfig::validate] diagnostic timing intervals invalid");
            return Err(Error::InvalidConfiguration);
        }
        for (index, conn) in self.connections.iter().enumerate() {
            // Connection ids must be their table index; self-addressed
            // connections are meaningless.
            if conn.connection_id != index as u32 || conn.sender_id == conn.receiver_id {
                log::warn!("[SrConfig::validate] connection entry {} invalid", index);
                return Err(Error::InvalidConfiguration);
            }
        }
        Ok(())
    }

    /// Number of configured connections.
    #[inline]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

/// YAML loaders for the configuration, available with the `config-loaders`
/// feature.
#[cfg(feature = "config-loaders")]
impl SrConfig {
    /// Parse a configuration from a YAML document and validate it.
    pub fn from_yaml_str(yaml: &str) -> Result<SrConfig> {
        let cfg: SrConfig = serde_yaml::from_str(yaml).map_err(|e| {
            log::warn!("[SrConfig::from_yaml_str] parse failed: {}", e);
            Error::InvalidConfiguration
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load and validate a configuration from a YAML file.
    pub fn from_yaml_file(path: &std::path::Path) -> Result<SrConfig> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            log::warn!("[SrConfig::from_yaml_file] read failed: {}", e);
            Error::InvalidConfiguration
        })?;
        Self::from_yaml_str(&text)
    }
}

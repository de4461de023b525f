// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Adapter seams of the layer.
//!
//! The engine never touches sockets, clocks or the application directly: it
//! consumes a [`RedundancyAdapter`] (the lower RaSTA redundancy layer) and a
//! [`SystemAdapter`] (timer, entropy, fatal-error hook), and it produces
//! callbacks through [`SrNotifications`]. All three are trait objects owned
//! by the engine; implementations must not re-enter the layer from inside a
//! callback.

use crate::types::{
    BufferUtilisation, ConnectionDiagnosticData, ConnectionState, DiscReason,
    RedundancyChannelDiagnosticData,
};
use crate::{Error, Result};

/// Interface to the redundancy layer below SafRetL.
///
/// Channel ids map 1:1 onto connection ids. The channel is lossy and may
/// duplicate or reorder; all recovery happens above it.
pub trait RedundancyAdapter {
    /// Open the redundancy channel for a connection.
    fn open_redundancy_channel(&mut self, channel_id: u32);

    /// Close the redundancy channel for a connection.
    fn close_redundancy_channel(&mut self, channel_id: u32);

    /// Hand one complete PDU to the redundancy layer for transmission.
    fn send_message(&mut self, channel_id: u32, bytes: &[u8]);

    /// Read one pending PDU into `buf`.
    ///
    /// Returns the PDU size in bytes, or [`Error::NoMessageReceived`] when
    /// no message is pending on the channel.
    fn read_message(&mut self, channel_id: u32, buf: &mut [u8]) -> Result<u16>;
}

/// System services consumed by the engine.
pub trait SystemAdapter {
    /// Monotonic millisecond timer. Wraps freely at 2^32; all time
    /// arithmetic in the layer is wrapping by design.
    fn get_timer_value(&mut self) -> u32;

    /// Granularity of the timer in milliseconds.
    fn get_timer_granularity(&self) -> u32;

    /// Non-cryptographic random value, used for the initial sequence number.
    fn get_random_u32(&mut self) -> u32;

    /// Non-returning fatal error hook.
    ///
    /// Invoked on internal invariant violations. The default aborts via
    /// `panic!`; integration harnesses replace it to intercept instead of
    /// taking the process down.
    fn fatal_error(&self, kind: Error) -> ! {
        panic!("SafRetL fatal error: {kind}");
    }
}

/// Notifications delivered synchronously to the application.
///
/// All callbacks run during the entry point that caused them, in causal
/// order per connection.
pub trait SrNotifications {
    /// A payload became readable on the connection (`read_data` will
    /// succeed at least once).
    fn message_received(&mut self, connection_id: u32);

    /// The connection changed state. `disc_reason` is meaningful only when
    /// `state` is [`ConnectionState::Closed`]; otherwise it is
    /// [`DiscReason::NotInUse`].
    #[allow(clippy::too_many_arguments)]
    fn connection_state_notification(
        &mut self,
        connection_id: u32,
        state: ConnectionState,
        buffer_utilisation: BufferUtilisation,
        opposite_buffer_size: u16,
        disc_reason: DiscReason,
        detailed_disc_reason: u16,
    );

    /// Diagnostic window rolled over (or the connection closed): the
    /// accumulated SafRetL diagnostics for the connection.
    fn sr_diagnostic_notification(&mut self, connection_id: u32, data: ConnectionDiagnosticData);

    /// Redundancy-layer diagnostics forwarded verbatim.
    fn red_diagnostic_notification(
        &mut self,
        connection_id: u32,
        data: RedundancyChannelDiagnosticData,
    );
}

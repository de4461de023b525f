// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-connection diagnostics.
//!
//! Five wrapping error counters track rejected messages (safety code,
//! address, type, sequence number, confirmed sequence number), and two
//! five-bin histograms record the T_rtd and T_alive of every
//! timeout-related receive. After `n_diag_window` samples the accumulated
//! record is pushed to the application and everything resets.

use crate::adapter::SrNotifications;
use crate::types::ConnectionDiagnosticData;
use crate::{Error, Result};

/// Number of histogram bins; the four configured intervals partition
/// `[0, t_max]` into this many ranges.
pub const TIMING_DISTRIBUTION_BINS: usize = 5;

/// Number of configured interval bounds.
pub const TIMING_DISTRIBUTION_INTERVALS: usize = TIMING_DISTRIBUTION_BINS - 1;

/// Validate the configured histogram interval bounds against `t_max`.
///
/// Requires `0 < I1 < I2 < I3 < I4 < t_max`.
pub fn are_intervals_valid(t_max: u32, intervals: &[u32; TIMING_DISTRIBUTION_INTERVALS]) -> bool {
    if intervals[0] == 0 {
        return false;
    }
    for index in 0..TIMING_DISTRIBUTION_INTERVALS - 1 {
        if intervals[index] >= intervals[index + 1] {
            return false;
        }
    }
    intervals[TIMING_DISTRIBUTION_INTERVALS - 1] < t_max
}

/// Diagnostic state of a single connection.
#[derive(Debug, Default)]
struct ConnectionDiagnostics {
    data: ConnectionDiagnosticData,
    /// Timing samples since the last notification; rolls over at
    /// `n_diag_window`.
    message_counter: u32,
}

/// Diagnostics of all connections.
#[derive(Debug)]
pub struct Diagnostics {
    t_max: u32,
    n_diag_window: u32,
    intervals: [u32; TIMING_DISTRIBUTION_INTERVALS],
    connections: Vec<ConnectionDiagnostics>,
}

impl Diagnostics {
    /// Create zeroed diagnostics for every connection.
    pub fn new(
        connection_count: usize,
        t_max: u32,
        n_diag_window: u32,
        intervals: [u32; TIMING_DISTRIBUTION_INTERVALS],
    ) -> Diagnostics {
        Diagnostics {
            t_max,
            n_diag_window,
            intervals,
            connections: (0..connection_count).map(|_| ConnectionDiagnostics::default()).collect(),
        }
    }

    /// Reset counters, histograms and the window counter of a connection.
    pub fn reset_connection(&mut self, connection_id: usize) {
        self.connections[connection_id] = ConnectionDiagnostics::default();
    }

    /// Record a message dropped on the MD4 safety code check.
    pub fn inc_safety_code_error(&mut self, connection_id: usize) {
        let data = &mut self.connections[connection_id].data;
        data.ec_safety = data.ec_safety.wrapping_add(1);
        log::debug!("[Diagnostics] conn={} ec_safety={}", connection_id, data.ec_safety);
    }

    /// Record a message dropped on the address check.
    pub fn inc_address_error(&mut self, connection_id: usize) {
        let data = &mut self.connections[connection_id].data;
        data.ec_address = data.ec_address.wrapping_add(1);
        log::debug!("[Diagnostics] conn={} ec_address={}", connection_id, data.ec_address);
    }

    /// Record a message dropped on the type check.
    pub fn inc_type_error(&mut self, connection_id: usize) {
        let data = &mut self.connections[connection_id].data;
        data.ec_type = data.ec_type.wrapping_add(1);
        log::debug!("[Diagnostics] conn={} ec_type={}", connection_id, data.ec_type);
    }

    /// Record an out-of-sequence sequence number.
    pub fn inc_sequence_number_error(&mut self, connection_id: usize) {
        let data = &mut self.connections[connection_id].data;
        data.ec_sn = data.ec_sn.wrapping_add(1);
        log::debug!("[Diagnostics] conn={} ec_sn={}", connection_id, data.ec_sn);
    }

    /// Record an out-of-sequence confirmed sequence number.
    pub fn inc_confirmed_sequence_number_error(&mut self, connection_id: usize) {
        let data = &mut self.connections[connection_id].data;
        data.ec_csn = data.ec_csn.wrapping_add(1);
        log::debug!("[Diagnostics] conn={} ec_csn={}", connection_id, data.ec_csn);
    }

    /// Record the timing samples of a timeout-related receive.
    ///
    /// Both samples must already be bounded by `t_max`; the engine only
    /// reaches this point when timeliness held. A sample beyond the bound is
    /// a broken engine invariant and reported as
    /// [`Error::InternalError`] for the caller's fatal-error hook.
    pub fn update(
        &mut self,
        connection_id: usize,
        t_rtd: u32,
        t_alive: u32,
        notifications: &mut dyn SrNotifications,
    ) -> Result<()> {
        if t_rtd > self.t_max || t_alive > self.t_max {
            log::error!(
                "[Diagnostics::update] conn={} sample out of range (t_rtd={}, t_alive={}, t_max={})",
                connection_id,
                t_rtd,
                t_alive,
                self.t_max
            );
            return Err(Error::InternalError);
        }

        let connection = &mut self.connections[connection_id];
        let rtd_bin = bin_index(&self.intervals, t_rtd);
        let alive_bin = bin_index(&self.intervals, t_alive);
        connection.data.t_rtd_distribution[rtd_bin] += 1;
        connection.data.t_alive_distribution[alive_bin] += 1;
        connection.message_counter += 1;

        if connection.message_counter >= self.n_diag_window {
            sr_trace!("[Diagnostics::update] conn={} window elapsed", connection_id);
            self.send_notification(connection_id, notifications);
        }

        Ok(())
    }

    /// Push the accumulated record to the application and reset.
    pub fn send_notification(
        &mut self,
        connection_id: usize,
        notifications: &mut dyn SrNotifications,
    ) {
        let data = self.connections[connection_id].data;
        notifications.sr_diagnostic_notification(connection_id as u32, data);
        self.reset_connection(connection_id);
    }

    /// Snapshot of the current record (test and introspection aid).
    pub fn snapshot(&self, connection_id: usize) -> ConnectionDiagnosticData {
        self.connections[connection_id].data
    }
}

/// Histogram bin for a timing sample.
///
/// Bin `i < 4` covers `(I_i-1, I_i]` (with `I_-1 = 0` closed below); the
/// last bin covers `(I4, t_max]`.
fn bin_index(intervals: &[u32; TIMING_DISTRIBUTION_INTERVALS], value: u32) -> usize {
    for (index, bound) in intervals.iter().enumerate() {
        if value <= *bound {
            return index;
        }
    }
    TIMING_DISTRIBUTION_BINS - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        BufferUtilisation, ConnectionState, DiscReason, RedundancyChannelDiagnosticData,
    };

    #[derive(Default)]
    struct RecordingNotifications {
        diagnostics: Vec<(u32, ConnectionDiagnosticData)>,
    }

    impl SrNotifications for RecordingNotifications {
        fn message_received(&mut self, _connection_id: u32) {}
        fn connection_state_notification(
            &mut self,
            _connection_id: u32,
            _state: ConnectionState,
            _buffer_utilisation: BufferUtilisation,
            _opposite_buffer_size: u16,
            _disc_reason: DiscReason,
            _detailed_disc_reason: u16,
        ) {
        }
        fn sr_diagnostic_notification(
            &mut self,
            connection_id: u32,
            data: ConnectionDiagnosticData,
        ) {
            self.diagnostics.push((connection_id, data));
        }
        fn red_diagnostic_notification(
            &mut self,
            _connection_id: u32,
            _data: RedundancyChannelDiagnosticData,
        ) {
        }
    }

    fn diagnostics(window: u32) -> Diagnostics {
        Diagnostics::new(1, 750, window, [150, 300, 450, 600])
    }

    #[test]
    fn test_interval_validation() {
        assert!(are_intervals_valid(750, &[150, 300, 450, 600]));
        assert!(!are_intervals_valid(750, &[0, 300, 450, 600]));
        assert!(!are_intervals_valid(750, &[150, 150, 450, 600]));
        assert!(!are_intervals_valid(750, &[150, 300, 600, 450]));
        assert!(!are_intervals_valid(750, &[150, 300, 450, 750]));
        assert!(are_intervals_valid(750, &[1, 2, 3, 4]));
    }

    #[test]
    fn test_bin_boundaries() {
        let intervals = [150, 300, 450, 600];
        assert_eq!(bin_index(&intervals, 0), 0);
        assert_eq!(bin_index(&intervals, 150), 0);
        assert_eq!(bin_index(&intervals, 151), 1);
        assert_eq!(bin_index(&intervals, 300), 1);
        assert_eq!(bin_index(&intervals, 301), 2);
        assert_eq!(bin_index(&intervals, 450), 2);
        assert_eq!(bin_index(&intervals, 600), 3);
        assert_eq!(bin_index(&intervals, 601), 4);
        assert_eq!(bin_index(&intervals, 750), 4);
    }

    #[test]
    fn test_error_counters_wrap() {
        let mut diag = diagnostics(100);
        diag.connections[0].data.ec_safety = u32::MAX;
        diag.inc_safety_code_error(0);
        assert_eq!(diag.snapshot(0).ec_safety, 0);
    }

    #[test]
    fn test_window_rollover_notifies_and_resets() {
        let mut diag = diagnostics(100);
        let mut notifications = RecordingNotifications::default();

        for _ in 0..99 {
            diag.update(0, 200, 10, &mut notifications).expect("sample within bounds");
        }
        assert!(notifications.diagnostics.is_empty());

        diag.update(0, 200, 10, &mut notifications).expect("sample within bounds");
        assert_eq!(notifications.diagnostics.len(), 1);

        let (connection_id, data) = notifications.diagnostics[0];
        assert_eq!(connection_id, 0);
        assert_eq!(data.t_rtd_distribution, [0, 100, 0, 0, 0]);
        assert_eq!(data.t_alive_distribution, [100, 0, 0, 0, 0]);

        // Everything reset after the notification.
        assert_eq!(diag.snapshot(0), ConnectionDiagnosticData::default());
        assert_eq!(diag.connections[0].message_counter, 0);
    }

    #[test]
    fn test_histogram_sum_matches_counter() {
        let mut diag = diagnostics(1000);
        let mut notifications = RecordingNotifications::default();

        let samples = [0, 100, 151, 320, 460, 610, 750];
        for &sample in &samples {
            diag.update(0, sample, sample, &mut notifications).expect("sample within bounds");
        }

        let data = diag.snapshot(0);
        let rtd_sum: u32 = data.t_rtd_distribution.iter().sum();
        let alive_sum: u32 = data.t_alive_distribution.iter().sum();
        assert_eq!(rtd_sum, samples.len() as u32);
        assert_eq!(alive_sum, samples.len() as u32);
        assert_eq!(diag.connections[0].message_counter, samples.len() as u32);
    }

    #[test]
    fn test_manual_notification_resets_counters() {
        let mut diag = diagnostics(100);
        let mut notifications = RecordingNotifications::default();

        diag.inc_address_error(0);
        diag.inc_type_error(0);
        diag.send_notification(0, &mut notifications);

        let (_, data) = notifications.diagnostics[0];
        assert_eq!(data.ec_address, 1);
        assert_eq!(data.ec_type, 1);
        assert_eq!(diag.snapshot(0).ec_address, 0);
    }

    #[test]
    fn test_out_of_range_sample_is_internal_error() {
        let mut diag = diagnostics(100);
        let mut notifications = RecordingNotifications::default();

        assert_eq!(diag.update(0, 751, 0, &mut notifications), Err(Error::InternalError));
        assert_eq!(diag.update(0, 0, 751, &mut notifications), Err(Error::InternalError));

        // Nothing was recorded for the rejected samples.
        assert_eq!(diag.snapshot(0), ConnectionDiagnosticData::default());
        assert_eq!(diag.connections[0].message_counter, 0);
    }
}

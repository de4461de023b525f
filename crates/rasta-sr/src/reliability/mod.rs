// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reliability buffers of the layer.
//!
//! Each connection owns a send ring (outgoing PDUs kept until the peer
//! confirms them, rebuilt in place when a retransmission is requested) and a
//! receive ring (delivered payloads waiting for the application to read
//! them). Both are fixed-capacity rings sized from `n_send_max` at
//! construction.

pub mod received_buffer;
pub mod send_buffer;

pub use received_buffer::ReceivedBufferSet;
pub use send_buffer::{SendBuffer, SendBufferSet};

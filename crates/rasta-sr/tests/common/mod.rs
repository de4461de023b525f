// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared scenario-test harness: scripted redundancy channel, manual clock
//! and a recording notification sink.

// Each scenario binary compiles its own copy; not every binary uses every
// helper.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use rasta_sr::protocol::message::{
    self, MessageCodec, MessageHeader, MessageHeaderCreate, MessageHeaderUpdate, Pdu,
};
use rasta_sr::types::{
    BufferUtilisation, ConnectionDiagnosticData, ConnectionState, DiscReason,
    RedundancyChannelDiagnosticData,
};
use rasta_sr::{
    ConnectionConfig, Error, Md4InitValue, RedundancyAdapter, Result, SafetyCodeType, SrConfig,
    SrLayer, SrNotifications, SystemAdapter,
};

/// Local endpoint id used by the default test configuration.
pub const LOCAL_ID: u32 = 0x61;
/// Peer endpoint id used by the default test configuration.
pub const PEER_ID: u32 = 0x62;
/// Network id used by the default test configuration.
pub const NETWORK_ID: u32 = 1;
/// Initial sequence number handed out by the scripted random source.
pub const INITIAL_SN: u32 = 1000;
/// Clock value at harness construction.
pub const START_TIME: u32 = 1000;

#[derive(Default)]
pub struct ChannelScript {
    pub open_calls: Vec<u32>,
    pub close_calls: Vec<u32>,
    pub sent: Vec<(u32, Vec<u8>)>,
    pub inbound: VecDeque<(u32, Vec<u8>)>,
}

pub struct ScriptedRedundancy(pub Rc<RefCell<ChannelScript>>);

impl RedundancyAdapter for ScriptedRedundancy {
    fn open_redundancy_channel(&mut self, channel_id: u32) {
        self.0.borrow_mut().open_calls.push(channel_id);
    }

    fn close_redundancy_channel(&mut self, channel_id: u32) {
        self.0.borrow_mut().close_calls.push(channel_id);
    }

    fn send_message(&mut self, channel_id: u32, bytes: &[u8]) {
        self.0.borrow_mut().sent.push((channel_id, bytes.to_vec()));
    }

    fn read_message(&mut self, channel_id: u32, buf: &mut [u8]) -> Result<u16> {
        let mut script = self.0.borrow_mut();
        let position = script.inbound.iter().position(|(ch, _)| *ch == channel_id);
        match position {
            Some(index) => {
                let (_, bytes) = script.inbound.remove(index).expect("indexed frame exists");
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len() as u16)
            }
            None => Err(Error::NoMessageReceived),
        }
    }
}

pub struct ClockScript {
    pub now: u32,
    pub granularity: u32,
    pub random: u32,
}

pub struct ScriptedSystem(pub Rc<RefCell<ClockScript>>);

impl SystemAdapter for ScriptedSystem {
    fn get_timer_value(&mut self) -> u32 {
        self.0.borrow().now
    }

    fn get_timer_granularity(&self) -> u32 {
        self.0.borrow().granularity
    }

    fn get_random_u32(&mut self) -> u32 {
        self.0.borrow().random
    }
}

#[derive(Debug, Clone)]
pub struct StateNote {
    pub connection_id: u32,
    pub state: ConnectionState,
    pub utilisation: BufferUtilisation,
    pub opposite_buffer_size: u16,
    pub disc_reason: DiscReason,
    pub detailed_disc_reason: u16,
}

#[derive(Default)]
pub struct Notes {
    pub received: Vec<u32>,
    pub states: Vec<StateNote>,
    pub sr_diagnostics: Vec<(u32, ConnectionDiagnosticData)>,
    pub red_diagnostics: Vec<(u32, RedundancyChannelDiagnosticData)>,
}

pub struct RecordingNotifications(pub Rc<RefCell<Notes>>);

impl SrNotifications for RecordingNotifications {
    fn message_received(&mut self, connection_id: u32) {
        self.0.borrow_mut().received.push(connection_id);
    }

    fn connection_state_notification(
        &mut self,
        connection_id: u32,
        state: ConnectionState,
        utilisation: BufferUtilisation,
        opposite_buffer_size: u16,
        disc_reason: DiscReason,
        detailed_disc_reason: u16,
    ) {
        self.0.borrow_mut().states.push(StateNote {
            connection_id,
            state,
            utilisation,
            opposite_buffer_size,
            disc_reason,
            detailed_disc_reason,
        });
    }

    fn sr_diagnostic_notification(&mut self, connection_id: u32, data: ConnectionDiagnosticData) {
        self.0.borrow_mut().sr_diagnostics.push((connection_id, data));
    }

    fn red_diagnostic_notification(
        &mut self,
        connection_id: u32,
        data: RedundancyChannelDiagnosticData,
    ) {
        self.0.borrow_mut().red_diagnostics.push((connection_id, data));
    }
}

/// A layer under test plus handles into its scripted environment.
pub struct Harness {
    pub layer: SrLayer,
    pub net: Rc<RefCell<ChannelScript>>,
    pub clock: Rc<RefCell<ClockScript>>,
    pub notes: Rc<RefCell<Notes>>,
    /// Codec configured like the layer's, used to forge peer traffic.
    pub codec: MessageCodec,
    local_sender_id: u32,
    local_receiver_id: u32,
}

pub fn default_config(sender_id: u32, receiver_id: u32) -> SrConfig {
    SrConfig {
        rasta_network_id: NETWORK_ID,
        t_max: 750,
        t_h: 300,
        safety_code_type: SafetyCodeType::LowerMd4,
        m_w_a: 10,
        n_send_max: 20,
        n_max_packet: 1,
        n_diag_window: 100,
        connections: vec![ConnectionConfig { connection_id: 0, sender_id, receiver_id }],
        md4_initial_value: Md4InitValue {
            init_a: 0x67452301,
            init_b: 0xEFCDAB89,
            init_c: 0x98BADCFE,
            init_d: 0x10325476,
        },
        diag_timing_distr_intervals: [150, 300, 450, 600],
    }
}

impl Harness {
    /// Client-role harness (local id below peer id).
    pub fn client() -> Harness {
        Harness::with_config(default_config(LOCAL_ID, PEER_ID))
    }

    /// Server-role harness (local id above peer id).
    pub fn server() -> Harness {
        Harness::with_config(default_config(PEER_ID, LOCAL_ID))
    }

    pub fn with_config(cfg: SrConfig) -> Harness {
        let net = Rc::new(RefCell::new(ChannelScript::default()));
        let clock = Rc::new(RefCell::new(ClockScript {
            now: START_TIME,
            granularity: 1,
            random: INITIAL_SN,
        }));
        let notes = Rc::new(RefCell::new(Notes::default()));
        let codec = MessageCodec::new(cfg.safety_code_type, cfg.md4_initial_value);
        let local_sender_id = cfg.connections[0].sender_id;
        let local_receiver_id = cfg.connections[0].receiver_id;

        let layer = SrLayer::new(
            cfg,
            Box::new(ScriptedRedundancy(net.clone())),
            Box::new(ScriptedSystem(clock.clone())),
            Box::new(RecordingNotifications(notes.clone())),
        )
        .expect("test configuration is valid");

        Harness { layer, net, clock, notes, codec, local_sender_id, local_receiver_id }
    }

    /// Advance the scripted clock.
    pub fn advance_time(&self, delta_ms: u32) {
        let mut clock = self.clock.borrow_mut();
        clock.now = clock.now.wrapping_add(delta_ms);
    }

    pub fn now(&self) -> u32 {
        self.clock.borrow().now
    }

    /// Inject a peer frame and run the layer's receive drain.
    pub fn deliver(&mut self, pdu: &Pdu) {
        self.net.borrow_mut().inbound.push_back((0, pdu.as_bytes().to_vec()));
        self.layer
            .message_received_notification(0)
            .expect("channel 0 is configured");
    }

    /// Frames the layer handed to the redundancy layer so far, decoded.
    pub fn sent_headers(&self) -> Vec<MessageHeader> {
        self.net
            .borrow()
            .sent
            .iter()
            .map(|(_, bytes)| {
                message::message_header(&Pdu::from_bytes(bytes.clone()))
                    .expect("sent frames carry valid headers")
            })
            .collect()
    }

    /// Drop the record of frames sent so far.
    pub fn clear_sent(&self) {
        self.net.borrow_mut().sent.clear();
    }

    pub fn state_notes(&self) -> Vec<StateNote> {
        self.notes.borrow().states.clone()
    }

    pub fn last_state(&self) -> StateNote {
        self.notes.borrow().states.last().expect("a state notification was emitted").clone()
    }

    // ===================================================================
    // Peer frame forgery
    // ===================================================================

    /// Header prototype for a frame sent by the peer towards the layer.
    pub fn peer_header(&self, sequence_number: u32) -> MessageHeaderCreate {
        MessageHeaderCreate {
            sender_id: self.local_receiver_id,
            receiver_id: self.local_sender_id,
            sequence_number,
            confirmed_time_stamp: 0,
        }
    }

    /// Forge a stamped peer frame.
    pub fn stamped(&self, mut pdu: Pdu, confirmed_sequence_number: u32, time_stamp: u32) -> Pdu {
        self.codec.update_header(
            &mut pdu,
            MessageHeaderUpdate { confirmed_sequence_number, time_stamp },
        );
        pdu
    }

    /// Forge a peer heartbeat.
    pub fn peer_heartbeat(&self, sn: u32, cs: u32, ts: u32, cts: u32) -> Pdu {
        let mut header = self.peer_header(sn);
        header.confirmed_time_stamp = cts;
        self.stamped(self.codec.create_heartbeat(header), cs, ts)
    }

    /// Forge a peer data frame.
    pub fn peer_data(&self, sn: u32, cs: u32, ts: u32, cts: u32, payload: &[u8]) -> Pdu {
        let mut header = self.peer_header(sn);
        header.confirmed_time_stamp = cts;
        self.stamped(self.codec.create_data(header, payload), cs, ts)
    }

    /// Forge a peer retransmitted-data frame.
    pub fn peer_retr_data(&self, sn: u32, cs: u32, ts: u32, cts: u32, payload: &[u8]) -> Pdu {
        let mut header = self.peer_header(sn);
        header.confirmed_time_stamp = cts;
        self.stamped(self.codec.create_retr_data(header, payload), cs, ts)
    }

    /// Forge a peer connection response.
    pub fn peer_conn_resp(&self, sn: u32, cs: u32, ts: u32, n_send_max: u16) -> Pdu {
        let header = self.peer_header(sn);
        self.stamped(self.codec.create_conn_resp(header, n_send_max), cs, ts)
    }

    /// Forge a peer connection request.
    pub fn peer_conn_req(&self, sn: u32, ts: u32, n_send_max: u16) -> Pdu {
        let header = self.peer_header(sn);
        self.stamped(self.codec.create_conn_req(header, n_send_max), 0, ts)
    }

    /// Forge a peer retransmission request.
    pub fn peer_retr_req(&self, sn: u32, cs: u32, ts: u32) -> Pdu {
        let header = self.peer_header(sn);
        self.stamped(self.codec.create_retr_req(header), cs, ts)
    }

    /// Forge a peer retransmission response.
    pub fn peer_retr_resp(&self, sn: u32, cs: u32, ts: u32) -> Pdu {
        let header = self.peer_header(sn);
        self.stamped(self.codec.create_retr_resp(header), cs, ts)
    }

    /// Forge a peer disconnection request.
    pub fn peer_disc_req(&self, sn: u32, cs: u32, ts: u32, detailed: u16, reason: DiscReason) -> Pdu {
        let header = self.peer_header(sn);
        self.stamped(self.codec.create_disc_req(header, detailed, reason), cs, ts)
    }
}

/// Drive a client harness into `Up` and return `(sn_t, sn_r)` as seen from
/// the layer: the next own sequence number and the next expected peer
/// sequence number.
///
/// Peer sequence numbers start at `peer_sn`; the layer's ConnReq carried
/// [`INITIAL_SN`].
pub fn establish_client(harness: &mut Harness, peer_sn: u32) -> (u32, u32) {
    harness
        .layer
        .open_connection(LOCAL_ID, PEER_ID, NETWORK_ID)
        .expect("open_connection succeeds");

    // Peer answers our ConnReq (SN_PDU = INITIAL_SN) with its ConnResp.
    let conn_resp = harness.peer_conn_resp(peer_sn, INITIAL_SN, harness.now(), 20);
    harness.deliver(&conn_resp);

    assert_eq!(
        harness.layer.get_connection_state(0).expect("connection exists").0,
        ConnectionState::Up,
        "client reaches Up after ConnResp"
    );

    // ConnReq + Hb went out; next own SN is INITIAL_SN + 2.
    (INITIAL_SN.wrapping_add(2), peer_sn.wrapping_add(1))
}

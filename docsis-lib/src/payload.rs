//! Payload continuations: what runs on the bytes after the MAC header.

use crate::constants::MAC_ADDR_SIZE;
use crate::dissector::PacketInfo;
use crate::fields::{self, FieldDef};
use crate::tree::{FieldSink, FieldValue};

/// EtherType values below this are 802.3 lengths.
const ETHERTYPE_MIN: u16 = 0x0600;

const ETH_HEADER_SIZE: usize = 2 * MAC_ADDR_SIZE + 2;
const MGMT_HEADER_SIZE: usize = 2 * MAC_ADDR_SIZE + 8;

/// A dissector the DOCSIS layer hands its payload to.
pub trait PayloadDissector {
    fn name(&self) -> &'static str;

    /// Dissects `payload`, located at `offset` in the frame, and returns the
    /// number of bytes consumed.
    fn dissect(&self, payload: &[u8], offset: usize, pinfo: &PacketInfo, sink: &mut dyn FieldSink) -> usize;
}

fn mac_address(bytes: &[u8]) -> FieldValue {
    let mut mac = [0u8; MAC_ADDR_SIZE];
    mac.copy_from_slice(&bytes[..MAC_ADDR_SIZE]);
    FieldValue::Ether(mac)
}

fn add_u8(sink: &mut dyn FieldSink, def: FieldDef, payload: &[u8], pos: usize, offset: usize) {
    sink.add(def, offset + pos, 1, FieldValue::UInt(payload[pos] as u64));
}

fn add_trailing_data(sink: &mut dyn FieldSink, payload: &[u8], pos: usize, offset: usize) {
    if pos < payload.len() {
        sink.add(
            fields::DATA,
            offset + pos,
            payload.len() - pos,
            FieldValue::Bytes(payload[pos..].to_vec()),
        );
    }
}

/// Ethernet II / 802.3 header without a trailing FCS.
#[derive(Debug, Clone, Copy, Default)]
pub struct EthernetDissector;

impl PayloadDissector for EthernetDissector {
    fn name(&self) -> &'static str {
        "eth_withoutfcs"
    }

    fn dissect(&self, payload: &[u8], offset: usize, pinfo: &PacketInfo, sink: &mut dyn FieldSink) -> usize {
        if payload.len() < ETH_HEADER_SIZE {
            return DataDissector.dissect(payload, offset, pinfo, sink);
        }

        sink.open(fields::ETH, fields::ETH.name.to_string(), offset, ETH_HEADER_SIZE);
        sink.add(fields::ETH_DST, offset, MAC_ADDR_SIZE, mac_address(payload));
        sink.add(fields::ETH_SRC, offset + MAC_ADDR_SIZE, MAC_ADDR_SIZE, mac_address(&payload[MAC_ADDR_SIZE..]));
        let type_len = u16::from_be_bytes([payload[12], payload[13]]);
        let def = if type_len < ETHERTYPE_MIN {
            fields::ETH_LEN
        } else {
            fields::ETH_TYPE
        };
        sink.add(def, offset + 12, 2, FieldValue::UInt(type_len as u64));
        sink.close();

        add_trailing_data(sink, payload, ETH_HEADER_SIZE, offset);
        payload.len()
    }
}

/// DOCSIS MAC management message header.
#[derive(Debug, Clone, Copy, Default)]
pub struct MacMgmtDissector;

impl PayloadDissector for MacMgmtDissector {
    fn name(&self) -> &'static str {
        "docsis_mgmt"
    }

    fn dissect(&self, payload: &[u8], offset: usize, pinfo: &PacketInfo, sink: &mut dyn FieldSink) -> usize {
        if payload.len() < MGMT_HEADER_SIZE {
            return DataDissector.dissect(payload, offset, pinfo, sink);
        }

        sink.open(fields::MGMT, fields::MGMT.name.to_string(), offset, MGMT_HEADER_SIZE);
        sink.add(fields::MGMT_DST, offset, MAC_ADDR_SIZE, mac_address(payload));
        sink.add(fields::MGMT_SRC, offset + 6, MAC_ADDR_SIZE, mac_address(&payload[6..]));
        let msg_len = u16::from_be_bytes([payload[12], payload[13]]);
        sink.add(fields::MGMT_MSG_LEN, offset + 12, 2, FieldValue::UInt(msg_len as u64));
        add_u8(sink, fields::MGMT_DSAP, payload, 14, offset);
        add_u8(sink, fields::MGMT_SSAP, payload, 15, offset);
        add_u8(sink, fields::MGMT_CONTROL, payload, 16, offset);
        add_u8(sink, fields::MGMT_VERSION, payload, 17, offset);
        add_u8(sink, fields::MGMT_TYPE, payload, 18, offset);
        add_u8(sink, fields::MGMT_RSVD, payload, 19, offset);
        sink.close();

        add_trailing_data(sink, payload, MGMT_HEADER_SIZE, offset);
        payload.len()
    }
}

/// Opaque bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataDissector;

impl PayloadDissector for DataDissector {
    fn name(&self) -> &'static str {
        "data"
    }

    fn dissect(&self, payload: &[u8], offset: usize, _pinfo: &PacketInfo, sink: &mut dyn FieldSink) -> usize {
        add_trailing_data(sink, payload, 0, offset);
        payload.len()
    }
}

/// The continuations a [`crate::DocsisDissector`] dispatches to.
pub struct Continuations {
    /// Packet and isolation PDUs, and reassembled fragments.
    pub ethernet: Box<dyn PayloadDissector>,
    /// Timing and MAC management headers.
    pub mac_mgmt: Box<dyn PayloadDissector>,
    /// Reserved PDUs.
    pub data: Box<dyn PayloadDissector>,
}

impl Default for Continuations {
    fn default() -> Self {
        Self {
            ethernet: Box::new(EthernetDissector),
            mac_mgmt: Box::new(MacMgmtDissector),
            data: Box::new(DataDissector),
        }
    }
}

impl std::fmt::Debug for Continuations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Continuations")
            .field("ethernet", &self.ethernet.name())
            .field("mac_mgmt", &self.mac_mgmt.name())
            .field("data", &self.data.name())
            .finish()
    }
}

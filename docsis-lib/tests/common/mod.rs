//! Common test utilities and shared imports

// Allow unused imports and dead code since this is a shared module
// used across multiple test files - not all items are used in every test file
#[allow(unused_imports)]
pub use bytes::Bytes;
#[allow(unused_imports)]
pub use docsis_lib::capture::CapturedFrame;
#[allow(unused_imports)]
pub use docsis_lib::checksum::{fcs_field, hcs_field};
#[allow(unused_imports)]
pub use docsis_lib::tree::{ExpertKind, FieldValue};
#[allow(unused_imports)]
pub use docsis_lib::{DissectorConfig, DocsisDissector, DocsisError, FrameRecord, PacketInfo, ProtoTree, ReassemblyStore, Session};
#[allow(unused_imports)]
pub use hex;

/// Decode hex string to bytes for testing
#[allow(dead_code)]
pub fn hex_to_bytes(hex_data: &str) -> Bytes {
    Bytes::from(hex::decode(hex_data).expect("Failed to decode hex"))
}

/// Appends the HCS covering every byte of `header`.
#[allow(dead_code)]
pub fn with_hcs(header: &[u8]) -> Vec<u8> {
    let mut frame = header.to_vec();
    frame.extend_from_slice(&hcs_field(header).to_be_bytes());
    frame
}

/// Builds a frame with a correct LEN and HCS. EHDR_ON is set when `ehdr`
/// is not empty.
#[allow(dead_code)]
pub fn build_frame(fc: u8, ehdr: &[u8], pdu: &[u8]) -> Vec<u8> {
    let fc = if ehdr.is_empty() { fc & 0xFE } else { fc | 0x01 };
    let len = (ehdr.len() + 2 + pdu.len()) as u16;
    let mut header = vec![fc, ehdr.len() as u8];
    header.extend_from_slice(&len.to_be_bytes());
    header.extend_from_slice(ehdr);

    let mut frame = with_hcs(&header);
    frame.extend_from_slice(pdu);
    frame
}

/// Packet PDU frame.
#[allow(dead_code)]
pub fn packet_frame(ehdr: &[u8], pdu: &[u8]) -> Vec<u8> {
    build_frame(0x00, ehdr, pdu)
}

/// Ethernet II frame without FCS.
#[allow(dead_code)]
pub fn eth_payload(ethertype: u16, body: &[u8]) -> Vec<u8> {
    let mut eth = vec![0x00, 0x10, 0x95, 0x01, 0x02, 0x03];
    eth.extend_from_slice(&[0x00, 0x90, 0x83, 0x0A, 0x0B, 0x0C]);
    eth.extend_from_slice(&ethertype.to_be_bytes());
    eth.extend_from_slice(body);
    eth
}

/// Upstream privacy element as carried by a fragmentation header.
#[allow(dead_code)]
pub fn fragment_ehdr(sid: u16, seq: u8, first: bool, last: bool, encrypted: bool) -> Vec<u8> {
    let mut word = sid & 0x3FFF;
    if encrypted {
        word |= 0x8000;
    }
    let control = (seq & 0x0F) | if last { 0x10 } else { 0 } | if first { 0x20 } else { 0 };
    let [hi, lo] = word.to_be_bytes();
    vec![0x35, 0x10, hi, lo, 0x02, control]
}

/// Fragmentation header frame carrying `payload` and a correct trailing CRC.
#[allow(dead_code)]
pub fn fragment_frame(sid: u16, seq: u8, first: bool, last: bool, payload: &[u8]) -> Vec<u8> {
    fragment_frame_with(fragment_ehdr(sid, seq, first, last, false), payload)
}

#[allow(dead_code)]
pub fn fragment_frame_with(ehdr: Vec<u8>, payload: &[u8]) -> Vec<u8> {
    // LEN counts the CRC trailer; fill it in after the HCS is computed
    let mut pdu = payload.to_vec();
    pdu.extend_from_slice(&[0u8; 4]);
    let mut frame = build_frame(0xC6, &ehdr, &pdu);
    let covered = frame.len() - 4;
    let fcs = fcs_field(&frame[..covered]);
    frame[covered..].copy_from_slice(&fcs.to_be_bytes());
    frame
}

/// Numbers frames from 1.
#[allow(dead_code)]
pub fn captured(frames: Vec<Vec<u8>>) -> Vec<CapturedFrame> {
    frames
        .into_iter()
        .enumerate()
        .map(|(i, data)| CapturedFrame {
            number: i as u64 + 1,
            data: Bytes::from(data),
        })
        .collect()
}

/// Dissects one frame with a fresh session.
#[allow(dead_code)]
pub fn dissect_one(frame: &[u8]) -> FrameRecord {
    Session::default().dissect_frame(1, frame)
}

#[allow(dead_code)]
pub fn dissect_one_with(config: DissectorConfig, frame: &[u8]) -> FrameRecord {
    Session::new(config).dissect_frame(1, frame)
}

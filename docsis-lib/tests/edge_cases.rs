//! Tests for truncated, malformed and unusual frames

mod common;

use common::*;

#[test]
fn test_frames_shorter_than_fixed_header() {
    let test_cases = vec![
        (vec![], "Empty frame"),
        (vec![0xC4], "FC only"),
        (vec![0xC4, 0x05, 0x00, 0x10, 0x00], "5 byte request"),
        (vec![0xC8, 0x01, 0x00, 0x00, 0x20, 0x00], "6 byte queue depth request"),
    ];

    for (frame, description) in test_cases {
        let mut store = ReassemblyStore::new();
        let mut pinfo = PacketInfo::new(1);
        let mut tree = ProtoTree::new();
        match DocsisDissector::default().dissect(&frame, &mut store, &mut pinfo, &mut tree) {
            Err(DocsisError::InsufficientData { actual, .. }) => {
                assert_eq!(actual, frame.len(), "{}", description);
            }
            other => panic!("{}: Expected InsufficientData, got {:?}", description, other),
        }
        assert!(tree.roots.is_empty(), "{}: nothing should be emitted", description);
    }
}

#[test]
fn test_truncated_extended_header_is_an_error_record() {
    let record = dissect_one(&[0x01, 0x0A, 0x00, 0x0C, 0x13, 0x01]);
    assert!(record.error.unwrap().contains("expected at least 16 bytes"));
}

#[test]
fn test_unknown_mac_specific_header_stops_quietly() {
    // FC_PARM 5 is not assigned
    let frame = with_hcs(&[0xCA, 0x00, 0x00, 0x02]);
    let record = dissect_one(&frame);
    assert!(record.error.is_none());
    assert!(record.tree.experts.is_empty());
    assert_eq!(record.info, "Reserved");
    assert_eq!(record.tree.uint("docsis.fcparm"), Some(5));
}

#[test]
fn test_isolation_pdu_goes_to_ethernet() {
    let frame = build_frame(0x40, &[], &eth_payload(0x0800, &[]));
    let record = dissect_one(&frame);
    assert_eq!(record.tree.uint("docsis.fctype"), Some(1));
    assert_eq!(record.tree.uint("eth.type"), Some(0x0800));
}

#[test]
fn test_short_ethernet_payload_falls_back_to_data() {
    let frame = packet_frame(&[], &[0x01, 0x02, 0x03]);
    let record = dissect_one(&frame);
    assert!(record.tree.find("eth").is_none());
    assert_eq!(record.tree.find("data").unwrap().offset, 6);
}

#[test]
fn test_hex_capture_of_request_frame() {
    let frame = hex_to_bytes("c4050010");
    let record = dissect_one(&with_hcs(&frame));
    assert_eq!(record.tree.uint("docsis.mini_slots"), Some(5));
}

#[test]
fn test_arbitrary_bytes_never_panic() {
    let mut state: u32 = 0x1234_5678;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        state
    };

    let mut session = Session::default();
    for i in 0..2000u64 {
        let len = (next() % 48) as usize;
        let mut frame: Vec<u8> = (0..len).map(|_| next() as u8).collect();
        // Give half the frames a valid HCS so the payload paths run too
        if i % 2 == 0 && frame.len() >= 6 {
            let fc = frame[0];
            let header_len = docsis_lib::header::header_length(
                docsis_lib::header::FrameControl::from_bytes([fc]),
                frame[1] as u16,
            );
            if header_len <= frame.len() && fc & 0x3E != 0x08 {
                let hcs = hcs_field(&frame[..header_len - 2]);
                frame[header_len - 2..header_len].copy_from_slice(&hcs.to_be_bytes());
            }
        }
        let record = session.dissect_frame(i + 1, &frame);
        if frame.len() < 6 {
            assert!(record.error.is_some());
        }
    }
}

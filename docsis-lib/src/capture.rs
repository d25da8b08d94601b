//! Reading DOCSIS frames out of pcap and pcapng files.

use crate::constants::LINKTYPE_DOCSIS;
use crate::error::DocsisError;
use bytes::Bytes;
use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{Block, PcapBlockOwned, PcapError};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

const READER_BUFFER_SIZE: usize = 65536;

/// One captured frame, numbered from 1 in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    pub number: u64,
    pub data: Bytes,
}

/// Reads every frame of a legacy pcap or pcapng file.
///
/// All interfaces must use the DOCSIS link type.
pub fn read_frames<P: AsRef<Path>>(path: P) -> Result<Vec<CapturedFrame>, DocsisError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let frames = read_frames_from(file)?;
    info!(path = %path.display(), frames = frames.len(), "read capture");
    Ok(frames)
}

/// Same as [`read_frames`], from any reader.
pub fn read_frames_from<R: Read + Send>(source: R) -> Result<Vec<CapturedFrame>, DocsisError> {
    let mut reader = pcap_parser::create_reader(READER_BUFFER_SIZE, source)
        .map_err(|e| DocsisError::Capture(format!("Failed to open capture: {:?}", e)))?;

    let mut frames = Vec::new();
    loop {
        match reader.next() {
            Ok((offset, block)) => {
                let data = match block {
                    PcapBlockOwned::LegacyHeader(header) => {
                        check_link_type(header.network.0)?;
                        None
                    }
                    PcapBlockOwned::Legacy(packet) => Some(captured(packet.data, packet.caplen)),
                    PcapBlockOwned::NG(Block::InterfaceDescription(idb)) => {
                        check_link_type(idb.linktype.0)?;
                        None
                    }
                    PcapBlockOwned::NG(Block::EnhancedPacket(epb)) => Some(captured(epb.data, epb.caplen)),
                    PcapBlockOwned::NG(_) => None,
                };
                if let Some(data) = data {
                    frames.push(CapturedFrame {
                        number: frames.len() as u64 + 1,
                        data,
                    });
                }
                reader.consume(offset);
            }
            Err(PcapError::Eof) => break,
            Err(PcapError::Incomplete(_)) => {
                reader
                    .refill()
                    .map_err(|e| DocsisError::Capture(format!("Failed to read capture: {:?}", e)))?;
            }
            Err(e) => return Err(DocsisError::Capture(format!("{:?}", e))),
        }
    }

    debug!(frames = frames.len(), "capture parsed");
    Ok(frames)
}

fn check_link_type(link_type: i32) -> Result<(), DocsisError> {
    if link_type != LINKTYPE_DOCSIS {
        return Err(DocsisError::UnsupportedLinkType(link_type));
    }
    Ok(())
}

/// Packet data without block padding.
fn captured(data: &[u8], caplen: u32) -> Bytes {
    let len = (caplen as usize).min(data.len());
    Bytes::copy_from_slice(&data[..len])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn legacy_pcap(link_type: u32, packets: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&0xA1B2_C3D4u32.to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&4u16.to_le_bytes());
        out.extend_from_slice(&0i32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&65535u32.to_le_bytes());
        out.extend_from_slice(&link_type.to_le_bytes());
        for (i, packet) in packets.iter().enumerate() {
            out.extend_from_slice(&(i as u32).to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&(packet.len() as u32).to_le_bytes());
            out.extend_from_slice(&(packet.len() as u32).to_le_bytes());
            out.extend_from_slice(packet);
        }
        out
    }

    #[test]
    fn test_reads_legacy_docsis_capture() {
        let bytes = legacy_pcap(143, &[&[0xC4, 0x05, 0x00, 0x10, 0x12, 0x34], &[0xF8, 0x02, 0x00, 0x00, 0x00, 0x00]]);
        let frames = read_frames_from(Cursor::new(bytes)).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].number, 1);
        assert_eq!(frames[1].number, 2);
        assert_eq!(&frames[0].data[..], &[0xC4, 0x05, 0x00, 0x10, 0x12, 0x34]);
    }

    #[test]
    fn test_rejects_other_link_types() {
        let bytes = legacy_pcap(1, &[&[0u8; 14]]);
        match read_frames_from(Cursor::new(bytes)) {
            Err(DocsisError::UnsupportedLinkType(1)) => {}
            other => panic!("Expected UnsupportedLinkType, got {:?}", other),
        }
    }

    #[test]
    fn test_captured_strips_padding() {
        assert_eq!(&captured(&[1, 2, 3, 0], 3)[..], &[1, 2, 3]);
        assert_eq!(&captured(&[1, 2], 5)[..], &[1, 2]);
    }
}

use crate::constants::*;
use crate::error::DocsisError;
use modular_bitfield::prelude::*;
use num_enum::{FromPrimitive, IntoPrimitive, TryFromPrimitive};
use serde::Serialize;
use strum_macros::Display;
use zerocopy::byteorder::big_endian::U16;
use zerocopy::{FromBytes, Immutable, KnownLayout, Unaligned};

/// The frame control byte: `type(2) | parm(5) | ehdr_on(1)`, most significant first.
#[bitfield(bytes = 1)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameControl {
    pub ehdr_on: bool,
    pub fc_parm: B5,
    pub fc_type: B2,
}

impl FrameControl {
    pub fn frame_type(&self) -> FcType {
        FcType::try_from(self.fc_type()).unwrap_or(FcType::Reserved)
    }

    pub fn parm(&self) -> MacParm {
        MacParm::from_primitive(self.fc_parm())
    }

    /// Queue-depth requests widen MAC_PARM to two bytes, whatever the frame type.
    pub fn is_queue_depth_request(&self) -> bool {
        self.parm() == MacParm::QueueDepthRequest
    }

    pub fn is_mac_specific(&self, parm: MacParm) -> bool {
        self.frame_type() == FcType::MacSpecific && self.parm() == parm
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive, Display, Serialize)]
#[repr(u8)]
pub enum FcType {
    #[strum(to_string = "Packet PDU")]
    Packet = 0,
    #[strum(to_string = "Isolation PDU")]
    Isolation = 1,
    #[strum(to_string = "Reserved PDU")]
    Reserved = 2,
    #[strum(to_string = "MAC Specific")]
    MacSpecific = 3,
}

/// FC_PARM values of MAC-specific headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive, Display, Serialize)]
#[repr(u8)]
pub enum MacParm {
    #[strum(to_string = "Timing Header")]
    Timing = 0x00,
    #[strum(to_string = "Mac Management Header")]
    MacMgmt = 0x01,
    #[strum(to_string = "Request Frame")]
    RequestFrame = 0x02,
    #[strum(to_string = "Fragmentation Header")]
    FragmentHeader = 0x03,
    #[strum(to_string = "Queue Depth-based Request Frame")]
    QueueDepthRequest = 0x04,
    #[strum(to_string = "Concatenation Header")]
    Concatenation = 0x1C,

    #[strum(to_string = "Reserved")]
    #[num_enum(catch_all)]
    Other(u8),
}

#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct BaseHeaderRaw {
    fc: u8,
    mac_parm: u8,
    len_sid: U16,
}

#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct QueueDepthHeaderRaw {
    fc: u8,
    mac_parm: U16,
    len_sid: U16,
}

/// Size of the fixed part of the header (HCS included) for a given FC byte.
pub fn fixed_header_len(fc: FrameControl) -> usize {
    if fc.is_queue_depth_request() {
        QDR_HEADER_SIZE
    } else {
        MIN_HEADER_SIZE
    }
}

/// Full MAC header length: the fixed header plus, when EHDR_ON is set, the
/// extended header whose length MAC_PARM carries.
pub fn header_length(fc: FrameControl, mac_parm: u16) -> usize {
    let fixed = fixed_header_len(fc);
    if fc.ehdr_on() {
        fixed + mac_parm as usize
    } else {
        fixed
    }
}

/// The decoded fixed MAC header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacHeader {
    pub fc: FrameControl,
    pub mac_parm: u16,
    pub len_sid: u16,
}

impl MacHeader {
    /// Parses the fixed header and checks that the whole MAC header,
    /// extended header included, was captured.
    pub fn parse(frame: &[u8]) -> Result<Self, DocsisError> {
        let fc_byte = *frame.get(FC_OFFSET).ok_or(DocsisError::InsufficientData {
            expected: MIN_HEADER_SIZE,
            actual: 0,
        })?;
        let fc = FrameControl::from_bytes([fc_byte]);

        let fixed = fixed_header_len(fc);
        if frame.len() < fixed {
            return Err(DocsisError::InsufficientData {
                expected: fixed,
                actual: frame.len(),
            });
        }

        let (mac_parm, len_sid) = if fc.is_queue_depth_request() {
            let (raw, _) = QueueDepthHeaderRaw::ref_from_prefix(frame)
                .map_err(|_| DocsisError::InvalidFrame("Failed to read queue-depth header".to_string()))?;
            (raw.mac_parm.get(), raw.len_sid.get())
        } else {
            let (raw, _) = BaseHeaderRaw::ref_from_prefix(frame)
                .map_err(|_| DocsisError::InvalidFrame("Failed to read MAC header".to_string()))?;
            (raw.mac_parm as u16, raw.len_sid.get())
        };

        let header = Self { fc, mac_parm, len_sid };
        if frame.len() < header.header_len() {
            return Err(DocsisError::InsufficientData {
                expected: header.header_len(),
                actual: frame.len(),
            });
        }
        Ok(header)
    }

    pub fn header_len(&self) -> usize {
        header_length(self.fc, self.mac_parm)
    }

    pub fn ehdr_len(&self) -> usize {
        if self.fc.ehdr_on() { self.mac_parm as usize } else { 0 }
    }

    pub fn mac_parm_size(&self) -> usize {
        if self.fc.is_queue_depth_request() { 2 } else { 1 }
    }

    pub fn len_sid_offset(&self) -> usize {
        if self.fc.is_queue_depth_request() {
            QDR_LEN_SID_OFFSET
        } else {
            LEN_SID_OFFSET
        }
    }

    pub fn hcs_offset(&self) -> usize {
        self.header_len() - HCS_SIZE
    }

    /// Request frames carry no PDU; everything else may.
    pub fn has_pdu(&self) -> bool {
        !(self.fc.is_mac_specific(MacParm::RequestFrame) || self.fc.is_mac_specific(MacParm::QueueDepthRequest))
    }

    /// PDU length announced by the LEN field: `LEN - (EHDR + HCS)`.
    ///
    /// Only EHDR bytes count as overhead: a reserved MAC_PARM value on a
    /// frame without an extended header is not subtracted.
    ///
    /// Returns `None` when LEN is too small to cover its own header overhead.
    pub fn declared_pdu_len(&self) -> Option<usize> {
        if !self.has_pdu() {
            return Some(0);
        }
        (self.len_sid as usize).checked_sub(self.ehdr_len() + HCS_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_control_bits() {
        let fc = FrameControl::from_bytes([0xC4]);
        assert_eq!(fc.frame_type(), FcType::MacSpecific);
        assert_eq!(fc.parm(), MacParm::RequestFrame);
        assert!(!fc.ehdr_on());

        let fc = FrameControl::from_bytes([0x01]);
        assert_eq!(fc.frame_type(), FcType::Packet);
        assert_eq!(fc.fc_parm(), 0);
        assert!(fc.ehdr_on());

        let fc = FrameControl::from_bytes([0xF8]);
        assert_eq!(fc.parm(), MacParm::Concatenation);
    }

    #[test]
    fn test_frame_control_builder_matches_wire() {
        let fc = FrameControl::new()
            .with_fc_type(FcType::MacSpecific.into())
            .with_fc_parm(MacParm::FragmentHeader.into())
            .with_ehdr_on(true);
        assert_eq!(fc.into_bytes(), [0xC7]);
    }

    #[test]
    fn test_header_length_variants() {
        let plain = FrameControl::from_bytes([0x00]);
        let ehdr = FrameControl::from_bytes([0x01]);
        let qdr = FrameControl::from_bytes([0xC8]);
        assert_eq!(header_length(plain, 5), 6);
        assert_eq!(header_length(ehdr, 5), 11);
        assert_eq!(header_length(qdr, 0x1234), 7);
    }

    #[test]
    fn test_parse_queue_depth_header() {
        let frame = [0xC8, 0x01, 0x00, 0x00, 0x20, 0x00, 0x00];
        let header = MacHeader::parse(&frame).unwrap();
        assert_eq!(header.mac_parm, 0x0100);
        assert_eq!(header.len_sid, 0x0020);
        assert_eq!(header.header_len(), 7);
        assert_eq!(header.declared_pdu_len(), Some(0));
    }

    #[test]
    fn test_parse_rejects_truncated_extended_header() {
        // EHDR_ON with 8 bytes announced but only the fixed header captured
        let frame = [0x01, 0x08, 0x00, 0x0A, 0x00, 0x00];
        match MacHeader::parse(&frame) {
            Err(DocsisError::InsufficientData { expected, actual }) => {
                assert_eq!(expected, 14);
                assert_eq!(actual, 6);
            }
            other => panic!("Expected InsufficientData, got {:?}", other),
        }
    }

    #[test]
    fn test_declared_pdu_len_underflow() {
        let frame = [0x01, 0x04, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let header = MacHeader::parse(&frame).unwrap();
        assert_eq!(header.declared_pdu_len(), None);
    }

    #[test]
    fn test_reserved_mac_parm_is_not_overhead() {
        // Packet PDU without EHDR, MAC_PARM 0x07, LEN 10
        let frame = [0x00, 0x07, 0x00, 0x0A, 0x00, 0x00];
        let header = MacHeader::parse(&frame).unwrap();
        assert_eq!(header.header_len(), 6);
        assert_eq!(header.declared_pdu_len(), Some(8));
    }
}

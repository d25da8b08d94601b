//! Extended header (EHDR) decoder.
//!
//! The extended header is a run of `type(4) | len(4)` elements followed by
//! `len` value bytes. Decoding works on a *view* shaped like the MAC header:
//! byte 1 holds the extended header length and elements start at offset 4.
//! The top-level view is the frame itself; an Extended (type 15) element
//! re-reads the rest of the header from its own position as a nested view.
//!
//! Decoding never stores anything outside the call. What later stages need
//! (encryption, fragment identity) comes back in [`EhdrOutcome`].

use crate::constants::*;
use crate::fields;
use crate::tree::{ExpertInfo, ExpertKind, FieldSink, FieldValue};
use modular_bitfield::prelude::*;
use num_enum::{FromPrimitive, IntoPrimitive};
use serde::Serialize;
use strum_macros::Display;
use tracing::{debug, trace};

/// First byte of an element: `type(4) | len(4)`.
#[bitfield(bytes = 1)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementHeader {
    pub len: B4,
    pub eh_type: B4,
}

/// Key sequence / version byte of the privacy elements.
#[bitfield(bytes = 1)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySequence {
    pub version: B4,
    pub key_seq: B4,
}

/// Fragmentation control byte of an upstream privacy element.
#[bitfield(bytes = 1)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragControl {
    pub seq: B4,
    pub last: bool,
    pub first: bool,
    pub reserved: B2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive, Display, Serialize)]
#[repr(u8)]
pub enum EhdrType {
    #[strum(to_string = "NULL Configuration Parameter")]
    NullConfig = 0,
    #[strum(to_string = "Request")]
    Request = 1,
    #[strum(to_string = "Acknowledgement Requested (DEPRECATED)")]
    AckRequested = 2,
    #[strum(to_string = "Upstream Privacy Element")]
    UpstreamPrivacy = 3,
    #[strum(to_string = "Downstream Privacy Element")]
    DownstreamPrivacy = 4,
    #[strum(to_string = "Service Flow EH; PHS Header Downstream (DEPRECATED)")]
    ServiceFlowDown = 5,
    #[strum(to_string = "Service Flow EH; PHS Header Upstream (DEPRECATED)")]
    ServiceFlowUp = 6,
    #[strum(to_string = "Upstream Privacy with Fragmentation")]
    UpstreamPrivacyV2 = 7,
    #[strum(to_string = "Downstream Service")]
    DownstreamService = 8,
    #[strum(to_string = "Path Verify")]
    PathVerify = 9,
    #[strum(to_string = "Extended")]
    Extended = 15,

    #[strum(to_string = "Reserved")]
    #[num_enum(catch_all)]
    Reserved(u8),
}

/// Fragment identity carried by an upstream privacy element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FragmentInfo {
    pub sid: u16,
    pub seq: u8,
    pub first: bool,
    pub last: bool,
}

/// What the decoder found that matters past the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EhdrOutcome {
    pub is_encrypted: bool,
    pub fragment: Option<FragmentInfo>,
    /// Elements decoded across all views.
    pub elements: usize,
    /// Set when some view stopped early.
    pub aborted: bool,
}

#[derive(Debug, Clone, Copy)]
struct LengthMismatch {
    expected: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct EhdrDecoder {
    is_fragment: bool,
    abort_view_on_element_error: bool,
}

impl EhdrDecoder {
    /// `is_fragment` enables the fragmentation byte of upstream privacy
    /// elements; it is set for MAC-specific fragmentation headers.
    pub fn new(is_fragment: bool, abort_view_on_element_error: bool) -> Self {
        Self {
            is_fragment,
            abort_view_on_element_error,
        }
    }

    /// Decodes the extended header of `frame` into `sink`.
    pub fn decode(&self, frame: &[u8], sink: &mut dyn FieldSink) -> EhdrOutcome {
        let mut outcome = EhdrOutcome::default();
        let ehdr_len = frame.get(MAC_PARM_OFFSET).copied().unwrap_or(0) as usize;
        sink.open(fields::EHDR, fields::EHDR.name.to_string(), EHDR_OFFSET, ehdr_len);
        self.walk(frame, 0, sink, &mut outcome);
        sink.close();
        outcome
    }

    fn walk(&self, view: &[u8], base: usize, sink: &mut dyn FieldSink, outcome: &mut EhdrOutcome) {
        let Some(&ehdr_len) = view.get(MAC_PARM_OFFSET) else {
            return;
        };
        let header_end = (EHDR_OFFSET + ehdr_len as usize).min(view.len());
        let mut pos = EHDR_OFFSET;

        while pos < header_end {
            let element = ElementHeader::from_bytes([view[pos]]);
            let len = element.len() as usize;
            let eh_type = EhdrType::from_primitive(element.eh_type());

            if pos + 1 + len > header_end {
                sink.expert(ExpertInfo::new(
                    ExpertKind::EhdrPastEnd,
                    base + pos,
                    format!(
                        "{} element of {} bytes runs past end of extended header ({} bytes left)",
                        eh_type,
                        len,
                        header_end - pos - 1
                    ),
                ));
                debug!(offset = base + pos, %eh_type, len, "extended header element past end");
                outcome.aborted = true;
                return;
            }
            trace!(offset = base + pos, %eh_type, len, "extended header element");

            let label = if eh_type == EhdrType::ServiceFlowUp && len == 2 {
                "Unsolicited Grant Sync EHDR Sub-Layer".to_string()
            } else {
                eh_type.to_string()
            };
            sink.open(fields::EHDR_ELEMENT, label, base + pos, len + 1);
            sink.add(fields::EHDR_TYPE, base + pos, 1, FieldValue::UInt(element.eh_type() as u64));
            sink.add(fields::EHDR_ELEM_LEN, base + pos, 1, FieldValue::UInt(len as u64));
            outcome.elements += 1;

            let result = if eh_type == EhdrType::Extended {
                self.walk(&view[pos..header_end], base + pos, sink, outcome);
                Ok(())
            } else {
                let value = &view[pos + 1..pos + 1 + len];
                self.element(eh_type, value, base + pos + 1, sink, outcome)
            };
            sink.close();

            if let Err(mismatch) = result {
                sink.expert(ExpertInfo::new(
                    ExpertKind::EhdrLengthMismatch,
                    base + pos,
                    format!("Invalid {} length: expected {}, got {}", eh_type, mismatch.expected, len),
                ));
                if self.abort_view_on_element_error {
                    debug!(offset = base + pos, %eh_type, len, "aborting extended header view");
                    outcome.aborted = true;
                    return;
                }
            }

            pos += len + 1;
        }
    }

    fn element(
        &self,
        eh_type: EhdrType,
        value: &[u8],
        offset: usize,
        sink: &mut dyn FieldSink,
        outcome: &mut EhdrOutcome,
    ) -> Result<(), LengthMismatch> {
        let len = value.len();
        match eh_type {
            EhdrType::Request => {
                if len != 3 {
                    return Err(LengthMismatch { expected: "3" });
                }
                sink.add(fields::EHDR_MINI_SLOTS, offset, 1, FieldValue::UInt(value[0] as u64));
                let sid = u16::from_be_bytes([value[1], value[2]]) & SID_MASK;
                sink.add(fields::EHDR_SID, offset + 1, 2, FieldValue::UInt(sid as u64));
            }
            EhdrType::AckRequested => {
                if len != 2 {
                    return Err(LengthMismatch { expected: "2" });
                }
                let sid = u16::from_be_bytes([value[0], value[1]]) & SID_MASK;
                sink.add(fields::EHDR_SID, offset, 2, FieldValue::UInt(sid as u64));
            }
            EhdrType::UpstreamPrivacy => {
                let required = if self.is_fragment { 5 } else { 4 };
                if len < required {
                    return Err(LengthMismatch {
                        expected: if self.is_fragment { "at least 5" } else { "at least 4" },
                    });
                }
                let sid = privacy_header(value, offset, fields::EHDR_SID, sink, outcome);
                sink.add(fields::EHDR_MINI_SLOTS, offset + 3, 1, FieldValue::UInt(value[3] as u64));
                if self.is_fragment {
                    let frag = FragControl::from_bytes([value[4]]);
                    sink.add(fields::FRAG_RSVD, offset + 4, 1, FieldValue::UInt(frag.reserved() as u64));
                    sink.add(fields::FRAG_FIRST, offset + 4, 1, FieldValue::Bool(frag.first()));
                    sink.add(fields::FRAG_LAST, offset + 4, 1, FieldValue::Bool(frag.last()));
                    sink.add(fields::FRAG_SEQ, offset + 4, 1, FieldValue::UInt(frag.seq() as u64));
                    outcome.fragment = Some(FragmentInfo {
                        sid,
                        seq: frag.seq(),
                        first: frag.first(),
                        last: frag.last(),
                    });
                }
            }
            EhdrType::DownstreamPrivacy => {
                if len < 4 {
                    return Err(LengthMismatch { expected: "at least 4" });
                }
                privacy_header(value, offset, fields::EHDR_SAID, sink, outcome);
                sink.add(fields::EHDR_RESERVED, offset + 3, 1, FieldValue::UInt(value[3] as u64));
            }
            EhdrType::ServiceFlowDown | EhdrType::ServiceFlowUp => {
                if len < 1 {
                    return Err(LengthMismatch { expected: "at least 1" });
                }
                sink.add(fields::EHDR_PHSI, offset, 1, FieldValue::UInt(value[0] as u64));
                if len == 2 {
                    sink.add(fields::EHDR_QIND, offset + 1, 1, FieldValue::Bool(value[1] & PHS_QIND_MASK != 0));
                    sink.add(
                        fields::EHDR_GRANTS,
                        offset + 1,
                        1,
                        FieldValue::UInt((value[1] & PHS_GRANTS_MASK) as u64),
                    );
                }
            }
            EhdrType::UpstreamPrivacyV2 => {
                if len < 3 {
                    return Err(LengthMismatch { expected: "at least 3" });
                }
                privacy_header(value, offset, fields::EHDR_SID, sink, outcome);
            }
            EhdrType::DownstreamService => {
                if len < 1 {
                    return Err(LengthMismatch { expected: "at least 1" });
                }
                let priority = (value[0] & DS_TRAFFIC_PRI_MASK) >> 5;
                sink.add(fields::EHDR_DS_TRAFFIC_PRI, offset, 1, FieldValue::UInt(priority as u64));
                if len == 3 || len == 5 {
                    let dsid = u32::from_be_bytes([0, value[0], value[1], value[2]]) & DSID_MASK;
                    if len == 5 {
                        let change_count = (value[0] & DS_SEQ_CHG_CNT_MASK) >> 4;
                        sink.add(fields::EHDR_DS_SEQ_CHG_CNT, offset, 1, FieldValue::UInt(change_count as u64));
                    }
                    sink.add(fields::EHDR_DS_DSID, offset, 3, FieldValue::UInt(dsid as u64));
                    if len == 5 {
                        let seq_num = u16::from_be_bytes([value[3], value[4]]);
                        sink.add(fields::EHDR_DS_PKT_SEQ_NUM, offset + 3, 2, FieldValue::UInt(seq_num as u64));
                    }
                }
            }
            EhdrType::PathVerify if len == 5 => {
                sink.add(fields::EHDR_DPV_START_REF, offset, 1, FieldValue::UInt(value[0] as u64));
                let timestamp = u32::from_be_bytes([value[1], value[2], value[3], value[4]]);
                sink.add(fields::EHDR_DPV_TIMESTAMP, offset + 1, 4, FieldValue::UInt(timestamp as u64));
            }
            _ => {
                if len > 0 {
                    sink.add(fields::EHDR_VALUE, offset, len, FieldValue::Bytes(value.to_vec()));
                }
            }
        }
        Ok(())
    }
}

/// Emits the key-sequence byte and the enable/toggle/identifier word shared
/// by the privacy elements. Returns the 14-bit identifier.
fn privacy_header(
    value: &[u8],
    offset: usize,
    id_field: fields::FieldDef,
    sink: &mut dyn FieldSink,
    outcome: &mut EhdrOutcome,
) -> u16 {
    let key = KeySequence::from_bytes([value[0]]);
    sink.add(fields::EHDR_KEY_SEQ, offset, 1, FieldValue::UInt(key.key_seq() as u64));
    sink.add(fields::EHDR_VERSION, offset, 1, FieldValue::UInt(key.version() as u64));

    let word = u16::from_be_bytes([value[1], value[2]]);
    let enabled = word & BPI_ENABLE_MASK != 0;
    sink.add(fields::EHDR_BPI_EN, offset + 1, 2, FieldValue::Bool(enabled));
    sink.add(fields::EHDR_TOGGLE, offset + 1, 2, FieldValue::Bool(word & TOGGLE_MASK != 0));
    let id = word & SID_MASK;
    sink.add(id_field, offset + 1, 2, FieldValue::UInt(id as u64));

    if enabled {
        outcome.is_encrypted = true;
    }
    id
}

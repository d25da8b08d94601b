//! The DOCSIS MAC frame dissector.
//!
//! One call decodes one frame: the fixed header, the extended header, the
//! HCS, and then whatever the frame type says comes next. Fragments are fed
//! to the caller's [`ReassemblyStore`]; the dissector itself holds no state
//! between frames.

use crate::checksum::{ChecksumStatus, verify_fcs, verify_hcs};
use crate::config::DissectorConfig;
use crate::constants::*;
use crate::ehdr::{EhdrDecoder, EhdrOutcome, FragmentInfo};
use crate::error::DocsisError;
use crate::fields;
use crate::header::{FcType, MacHeader, MacParm};
use crate::payload::{Continuations, PayloadDissector};
use crate::reassembly::{FragmentOutcome, ReassemblyStore};
use crate::tree::{ExpertInfo, ExpertKind, FieldSink, FieldValue};
use bytes::Bytes;
use tracing::{debug, trace, warn};

/// Per-frame state shared with the payload continuations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PacketInfo {
    pub frame_number: u64,
    /// Set while a fragment that has not completed a message is processed.
    pub fragmented: bool,
    /// Summary line of the frame.
    pub info: String,
}

impl PacketInfo {
    pub fn new(frame_number: u64) -> Self {
        Self {
            frame_number,
            ..Self::default()
        }
    }

    fn append_info(&mut self, text: &str) {
        if self.info.is_empty() {
            self.info.push_str(text);
        } else {
            self.info.push_str(", ");
            self.info.push_str(text);
        }
    }
}

/// What the frame's header promised and what was captured.
#[derive(Debug, Clone, Copy)]
struct Lengths {
    header: usize,
    /// Declared PDU length; may exceed what was captured.
    pdu: usize,
    captured_pdu: usize,
}

impl Lengths {
    /// Bytes of the PDU that are actually present in the frame.
    fn available(&self) -> usize {
        self.pdu.min(self.captured_pdu)
    }

    fn consumed(&self) -> usize {
        self.header + self.available()
    }
}

#[derive(Debug, Default)]
pub struct DocsisDissector {
    config: DissectorConfig,
    continuations: Continuations,
}

impl DocsisDissector {
    pub fn new(config: DissectorConfig) -> Self {
        Self {
            config,
            continuations: Continuations::default(),
        }
    }

    pub fn with_continuations(config: DissectorConfig, continuations: Continuations) -> Self {
        Self { config, continuations }
    }

    pub fn config(&self) -> &DissectorConfig {
        &self.config
    }

    /// Dissects one MAC frame and returns the number of bytes consumed.
    ///
    /// Protocol errors inside the frame are reported as expert infos on
    /// `sink`. `Err` is returned only when the MAC header itself was not
    /// captured.
    pub fn dissect(
        &self,
        frame: &[u8],
        store: &mut ReassemblyStore,
        pinfo: &mut PacketInfo,
        sink: &mut dyn FieldSink,
    ) -> Result<usize, DocsisError> {
        let header = MacHeader::parse(frame)?;
        let fc = header.fc;
        let lengths = self.lengths(frame, &header, sink);

        trace!(
            frame = pinfo.frame_number,
            fc_type = %fc.frame_type(),
            fc_parm = fc.fc_parm(),
            header_len = lengths.header,
            pdu_len = lengths.pdu,
            "dissecting MAC frame"
        );

        sink.open(fields::DOCSIS, fields::DOCSIS.name.to_string(), 0, lengths.header);
        self.frame_control(&header, sink);

        let consumed = match fc.frame_type() {
            FcType::Packet | FcType::Isolation | FcType::Reserved => {
                pinfo.append_info(if fc.frame_type() == FcType::Reserved {
                    "Reserved PDU"
                } else {
                    "Data PDU"
                });
                let ehdr = self.extended_header(frame, &header, false, sink);
                if !self.hcs(frame, &header, sink) {
                    sink.close();
                    return Ok(lengths.header);
                }
                sink.close();

                let continuation = if fc.frame_type() == FcType::Reserved {
                    &self.continuations.data
                } else {
                    &self.continuations.ethernet
                };
                self.pdu(frame, &lengths, &ehdr, &**continuation, pinfo, sink)
            }
            FcType::MacSpecific => self.mac_specific(frame, &header, &lengths, store, pinfo, sink),
        };
        Ok(consumed)
    }

    /// Computes header and PDU lengths, reporting malformed LEN fields.
    fn lengths(&self, frame: &[u8], header: &MacHeader, sink: &mut dyn FieldSink) -> Lengths {
        let header_len = header.header_len();
        let captured_pdu = frame.len() - header_len;

        let pdu = match header.declared_pdu_len() {
            Some(len) => len,
            None => {
                sink.expert(ExpertInfo::new(
                    ExpertKind::MalformedLength,
                    header.len_sid_offset(),
                    format!(
                        "Length field {} is smaller than the extended header and HCS ({} bytes)",
                        header.len_sid,
                        header.ehdr_len() + HCS_SIZE
                    ),
                ));
                debug!(len = header.len_sid, "length field underflows header overhead");
                0
            }
        };

        if pdu > captured_pdu {
            sink.expert(ExpertInfo::new(
                ExpertKind::PayloadPastEnd,
                header_len,
                format!("Length field value goes past the end of the payload: {} > {}", pdu, captured_pdu),
            ));
        }

        Lengths {
            header: header_len,
            pdu,
            captured_pdu,
        }
    }

    fn frame_control(&self, header: &MacHeader, sink: &mut dyn FieldSink) {
        let fc = header.fc;
        sink.open(
            fields::FC,
            format!("{}: {}", fields::FC.name, fc.frame_type()),
            FC_OFFSET,
            1,
        );
        sink.add(fields::FC_TYPE, FC_OFFSET, 1, FieldValue::UInt(fc.fc_type() as u64));
        sink.add(fields::FC_PARM, FC_OFFSET, 1, FieldValue::UInt(fc.fc_parm() as u64));
        sink.add(fields::EHDR_ON, FC_OFFSET, 1, FieldValue::Bool(fc.ehdr_on()));
        sink.close();
    }

    /// Emits MAC_PARM and LEN, then the extended header when EHDR_ON is set.
    fn extended_header(
        &self,
        frame: &[u8],
        header: &MacHeader,
        is_fragment: bool,
        sink: &mut dyn FieldSink,
    ) -> EhdrOutcome {
        let len_offset = header.len_sid_offset();
        if header.fc.ehdr_on() {
            sink.add(fields::EHDR_LEN, MAC_PARM_OFFSET, 1, FieldValue::UInt(header.mac_parm as u64));
            sink.add(fields::LEN, len_offset, 2, FieldValue::UInt(header.len_sid as u64));
            EhdrDecoder::new(is_fragment, self.config.abort_view_on_element_error).decode(frame, sink)
        } else {
            sink.add(
                fields::MAC_PARM,
                MAC_PARM_OFFSET,
                header.mac_parm_size(),
                FieldValue::UInt(header.mac_parm as u64),
            );
            sink.add(fields::LEN, len_offset, 2, FieldValue::UInt(header.len_sid as u64));
            EhdrOutcome::default()
        }
    }

    /// Emits the HCS and returns whether dissection may go on.
    fn hcs(&self, frame: &[u8], header: &MacHeader, sink: &mut dyn FieldSink) -> bool {
        let offset = header.hcs_offset();
        let Some(check) = verify_hcs(frame, header.header_len(), self.config.validate_hcs) else {
            return false;
        };

        sink.add(fields::HCS, offset, HCS_SIZE, FieldValue::UInt(check.received as u64));
        sink.add(fields::HCS_STATUS, offset, HCS_SIZE, FieldValue::Text(check.status.to_string()));
        if check.status == ChecksumStatus::Bad {
            let computed = check.computed.unwrap_or_default();
            sink.expert(ExpertInfo::new(
                ExpertKind::BadHcs,
                offset,
                format!("Bad checksum [should be 0x{:04x}]", computed),
            ));
            warn!(received = check.received, computed, "bad HCS");
        }
        check.proceed()
    }

    fn mac_specific(
        &self,
        frame: &[u8],
        header: &MacHeader,
        lengths: &Lengths,
        store: &mut ReassemblyStore,
        pinfo: &mut PacketInfo,
        sink: &mut dyn FieldSink,
    ) -> usize {
        let parm = header.fc.parm();
        match parm {
            MacParm::Timing | MacParm::MacMgmt => {
                pinfo.append_info(&parm.to_string());
                let ehdr = self.extended_header(frame, header, false, sink);
                let proceed = self.hcs(frame, header, sink);
                sink.close();
                if !proceed {
                    return lengths.header;
                }
                self.pdu(frame, lengths, &ehdr, &*self.continuations.mac_mgmt, pinfo, sink)
            }
            MacParm::RequestFrame => {
                let sid = header.len_sid & SID_MASK;
                sink.add(fields::MINI_SLOTS, MAC_PARM_OFFSET, 1, FieldValue::UInt(header.mac_parm as u64));
                sink.add(fields::SID, LEN_SID_OFFSET, 2, FieldValue::UInt(sid as u64));
                self.hcs(frame, header, sink);
                sink.close();
                pinfo.append_info(&format!("Request: SID = {}, Mini-slots = {}", sid, header.mac_parm));
                lengths.header
            }
            MacParm::QueueDepthRequest => {
                let sid = header.len_sid & SID_MASK;
                sink.add(fields::REQUESTED_SIZE, MAC_PARM_OFFSET, 2, FieldValue::UInt(header.mac_parm as u64));
                sink.add(fields::SID, QDR_LEN_SID_OFFSET, 2, FieldValue::UInt(sid as u64));
                self.hcs(frame, header, sink);
                sink.close();
                pinfo.append_info(&format!(
                    "Queue Depth Request: SID = {}, Bytes Requested = {}",
                    sid, header.mac_parm
                ));
                lengths.header
            }
            MacParm::FragmentHeader => {
                pinfo.append_info("Fragmented Packet Header");
                let ehdr = self.extended_header(frame, header, true, sink);
                let proceed = self.hcs(frame, header, sink);
                sink.close();
                if !proceed {
                    return lengths.header;
                }
                self.fragment(frame, lengths, &ehdr, store, pinfo, sink)
            }
            MacParm::Concatenation => {
                sink.add(fields::CONCAT_CNT, MAC_PARM_OFFSET, 1, FieldValue::UInt(header.mac_parm as u64));
                sink.add(fields::CONCAT_LEN, LEN_SID_OFFSET, 2, FieldValue::UInt(header.len_sid as u64));
                self.hcs(frame, header, sink);
                sink.close();
                pinfo.append_info("Concatenated Frame");
                lengths.header
            }
            MacParm::Other(value) => {
                debug!(fc_parm = value, "unknown MAC specific header");
                sink.add(fields::MAC_PARM, MAC_PARM_OFFSET, 1, FieldValue::UInt(header.mac_parm as u64));
                sink.add(fields::LEN, LEN_SID_OFFSET, 2, FieldValue::UInt(header.len_sid as u64));
                sink.close();
                pinfo.append_info(&parm.to_string());
                lengths.header
            }
        }
    }

    /// Hands the captured PDU to `continuation`, or shows it as an encrypted
    /// record when the extended header turned encryption on.
    fn pdu(
        &self,
        frame: &[u8],
        lengths: &Lengths,
        ehdr: &EhdrOutcome,
        continuation: &dyn PayloadDissector,
        pinfo: &mut PacketInfo,
        sink: &mut dyn FieldSink,
    ) -> usize {
        if lengths.pdu == 0 {
            return lengths.header;
        }
        let payload = &frame[lengths.header..lengths.consumed()];
        lengths.header + self.payload(payload, lengths.header, ehdr.is_encrypted, continuation, pinfo, sink)
    }

    fn payload(
        &self,
        payload: &[u8],
        offset: usize,
        encrypted: bool,
        continuation: &dyn PayloadDissector,
        pinfo: &mut PacketInfo,
        sink: &mut dyn FieldSink,
    ) -> usize {
        if encrypted && !self.config.dissect_encrypted {
            pinfo.append_info("Encrypted Data");
            encrypted_record(payload, offset, sink);
            return payload.len();
        }
        trace!(continuation = continuation.name(), len = payload.len(), "handing off payload");
        continuation.dissect(payload, offset, pinfo, sink)
    }

    /// Verifies a fragment's CRC and feeds it to the reassembly store.
    fn fragment(
        &self,
        frame: &[u8],
        lengths: &Lengths,
        ehdr: &EhdrOutcome,
        store: &mut ReassemblyStore,
        pinfo: &mut PacketInfo,
        sink: &mut dyn FieldSink,
    ) -> usize {
        let Some(info) = ehdr.fragment else {
            sink.expert(ExpertInfo::new(
                ExpertKind::MissingFragmentInfo,
                EHDR_OFFSET,
                "Fragmentation header without upstream privacy element",
            ));
            return lengths.header;
        };

        let saved = pinfo.fragmented;
        pinfo.fragmented = true;
        let consumed = self.reassemble(frame, lengths, ehdr, info, store, pinfo, sink);
        pinfo.fragmented = saved;
        consumed
    }

    #[allow(clippy::too_many_arguments)]
    fn reassemble(
        &self,
        frame: &[u8],
        lengths: &Lengths,
        ehdr: &EhdrOutcome,
        info: FragmentInfo,
        store: &mut ReassemblyStore,
        pinfo: &mut PacketInfo,
        sink: &mut dyn FieldSink,
    ) -> usize {
        let Some(trailer) = (lengths.header + lengths.pdu).checked_sub(FCS_SIZE).filter(|&t| t >= lengths.header)
        else {
            sink.expert(ExpertInfo::new(
                ExpertKind::MalformedLength,
                lengths.header,
                format!("Fragment of {} bytes is shorter than its CRC", lengths.pdu),
            ));
            return lengths.header;
        };

        let Some(check) = verify_fcs(frame, trailer) else {
            sink.expert(ExpertInfo::new(
                ExpertKind::MalformedLength,
                trailer,
                "Fragment CRC lies past the end of the captured frame",
            ));
            return lengths.consumed();
        };

        sink.add(fields::FRAG_FCS, trailer, FCS_SIZE, FieldValue::UInt(check.received as u64));
        sink.add(fields::FRAG_FCS_STATUS, trailer, FCS_SIZE, FieldValue::Text(check.status.to_string()));
        if !check.proceed() {
            let computed = check.computed.unwrap_or_default();
            sink.expert(ExpertInfo::new(
                ExpertKind::BadFcs,
                trailer,
                format!("Bad fragment checksum [should be 0x{:08x}]", computed),
            ));
            warn!(sid = info.sid, seq = info.seq, received = check.received, computed, "bad fragment CRC");
            return lengths.consumed();
        }

        let data = &frame[lengths.header..trailer];
        sink.add(fields::FRAGMENT, lengths.header, data.len(), FieldValue::UInt(info.seq as u64));

        match store.add_fragment(info, Bytes::copy_from_slice(data)) {
            FragmentOutcome::Buffered { .. } => {
                pinfo.append_info(&format!("Message fragment {}", info.seq));
            }
            FragmentOutcome::Duplicate { seq } => {
                sink.add(fields::FRAGMENT_DUPLICATE, lengths.header, data.len(), FieldValue::Bool(true));
                pinfo.append_info(&format!("Message fragment {}", seq));
            }
            FragmentOutcome::Conflict { seq } => {
                sink.add(fields::FRAGMENT_DUPLICATE, lengths.header, data.len(), FieldValue::Bool(true));
                sink.expert(ExpertInfo::new(
                    ExpertKind::FragmentOverlap,
                    lengths.header,
                    format!("Fragment {} of SID {} overlaps with different data", seq, info.sid),
                ));
                pinfo.append_info(&format!("Message fragment {}", seq));
            }
            FragmentOutcome::Complete(reassembled) => {
                pinfo.fragmented = false;
                pinfo.append_info("Reassembled Message");
                sink.open(
                    fields::REASSEMBLED,
                    format!(
                        "[{} Message fragments ({} bytes)]",
                        reassembled.sequence.len(),
                        reassembled.data.len()
                    ),
                    lengths.header,
                    data.len(),
                );
                sink.add(
                    fields::REASSEMBLED_COUNT,
                    lengths.header,
                    0,
                    FieldValue::UInt(reassembled.sequence.len() as u64),
                );
                sink.add(
                    fields::REASSEMBLED_LENGTH,
                    lengths.header,
                    0,
                    FieldValue::UInt(reassembled.data.len() as u64),
                );
                // Payload fields nest under the reassembled subtree, with
                // offsets into the reassembled buffer
                self.payload(
                    &reassembled.data,
                    0,
                    ehdr.is_encrypted,
                    &*self.continuations.ethernet,
                    pinfo,
                    sink,
                );
                sink.close();
            }
        }
        lengths.consumed()
    }
}

/// Destination and source MAC addresses, then the ciphertext.
fn encrypted_record(payload: &[u8], offset: usize, sink: &mut dyn FieldSink) {
    let mut pos = 0;
    if payload.len() >= 2 * MAC_ADDR_SIZE {
        for def in [fields::DST, fields::SRC] {
            let mut mac = [0u8; MAC_ADDR_SIZE];
            mac.copy_from_slice(&payload[pos..pos + MAC_ADDR_SIZE]);
            sink.add(def, offset + pos, MAC_ADDR_SIZE, FieldValue::Ether(mac));
            pos += MAC_ADDR_SIZE;
        }
    }
    if pos < payload.len() {
        sink.add(
            fields::ENCRYPTED_PAYLOAD,
            offset + pos,
            payload.len() - pos,
            FieldValue::Bytes(payload[pos..].to_vec()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::hcs_field;
    use crate::tree::ProtoTree;

    fn with_hcs(mut header: Vec<u8>) -> Vec<u8> {
        let hcs = hcs_field(&header);
        header.extend_from_slice(&hcs.to_be_bytes());
        header
    }

    fn run(frame: &[u8]) -> (ProtoTree, PacketInfo) {
        let dissector = DocsisDissector::default();
        let mut store = ReassemblyStore::new();
        let mut pinfo = PacketInfo::new(1);
        let mut tree = ProtoTree::new();
        dissector.dissect(frame, &mut store, &mut pinfo, &mut tree).unwrap();
        tree.finish();
        (tree, pinfo)
    }

    #[test]
    fn test_request_frame() {
        let frame = with_hcs(vec![0xC4, 0x05, 0x00, 0x10]);
        let (tree, pinfo) = run(&frame);
        assert_eq!(tree.uint("docsis.mini_slots"), Some(5));
        assert_eq!(tree.uint("docsis.sid"), Some(16));
        assert_eq!(pinfo.info, "Request: SID = 16, Mini-slots = 5");
        assert!(tree.experts.is_empty());
    }

    #[test]
    fn test_concatenation_is_header_only() {
        let mut frame = with_hcs(vec![0xF8, 0x02, 0x00, 0x20]);
        frame.extend_from_slice(&[0u8; 32]);
        let (tree, pinfo) = run(&frame);
        assert_eq!(tree.uint("docsis.concat_cnt"), Some(2));
        assert_eq!(tree.uint("docsis.concat_len"), Some(32));
        assert!(tree.find("eth").is_none());
        assert_eq!(pinfo.info, "Concatenated Frame");
    }

    #[test]
    fn test_bad_hcs_suppresses_payload() {
        let mut frame = with_hcs(vec![0x00, 0x00, 0x00, 0x10]);
        frame.extend_from_slice(&[0xAB; 14]);
        frame[4] ^= 0xFF;
        let (tree, _) = run(&frame);
        assert!(tree.has_expert(ExpertKind::BadHcs));
        assert!(tree.find("eth").is_none());
    }

    #[test]
    fn test_encrypted_record_fits_short_payload() {
        let mut tree = ProtoTree::new();
        encrypted_record(&[1, 2, 3, 4], 6, &mut tree);
        assert!(tree.find("docsis.dst").is_none());
        assert_eq!(tree.find("docsis.encrypted_payload").unwrap().offset, 6);
    }

    #[test]
    fn test_packet_info_append() {
        let mut pinfo = PacketInfo::new(3);
        pinfo.append_info("Data PDU");
        pinfo.append_info("Encrypted Data");
        assert_eq!(pinfo.info, "Data PDU, Encrypted Data");
    }
}

//! A dissection session: one dissector and the reassembly state of one
//! pass over a capture.

use crate::capture::CapturedFrame;
use crate::config::DissectorConfig;
use crate::dissector::{DocsisDissector, PacketInfo};
use crate::fields;
use crate::reassembly::ReassemblyStore;
use crate::tree::ProtoTree;
use serde::Serialize;
use tracing::{debug, warn};

/// The dissection result of one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameRecord {
    pub number: u64,
    pub info: String,
    /// The frame carried a fragment that did not complete a message.
    pub fragmented: bool,
    pub tree: ProtoTree,
    /// Set when the frame could not be dissected at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct Session {
    dissector: DocsisDissector,
    store: ReassemblyStore,
}

impl Session {
    pub fn new(config: DissectorConfig) -> Self {
        Self::with_dissector(DocsisDissector::new(config))
    }

    pub fn with_dissector(dissector: DocsisDissector) -> Self {
        Self {
            dissector,
            store: ReassemblyStore::new(),
        }
    }

    pub fn dissector(&self) -> &DocsisDissector {
        &self.dissector
    }

    pub fn store(&self) -> &ReassemblyStore {
        &self.store
    }

    /// Dissects the next frame of the pass.
    pub fn dissect_frame(&mut self, number: u64, frame: &[u8]) -> FrameRecord {
        let mut pinfo = PacketInfo::new(number);
        let mut tree = ProtoTree::new();

        let error = match self.dissector.dissect(frame, &mut self.store, &mut pinfo, &mut tree) {
            Ok(consumed) => {
                debug!(frame = number, consumed, info = %pinfo.info, "frame dissected");
                None
            }
            Err(e) => {
                warn!(frame = number, "{}", e);
                Some(e.to_string())
            }
        };
        tree.finish();
        let fragmented = tree.find(fields::FRAGMENT.abbrev).is_some() && tree.find(fields::REASSEMBLED.abbrev).is_none();

        FrameRecord {
            number,
            info: pinfo.info,
            fragmented,
            tree,
            error,
        }
    }

    /// Dissects a whole capture from a clean reassembly state, so running it
    /// twice gives the same records.
    pub fn dissect_capture(&mut self, frames: &[CapturedFrame]) -> Vec<FrameRecord> {
        self.reset();
        let records: Vec<FrameRecord> = frames.iter().map(|f| self.dissect_frame(f.number, &f.data)).collect();
        if self.store.pending() > 0 {
            debug!(pending = self.store.pending(), "capture ended with unfinished fragment groups");
        }
        records
    }

    pub fn reset(&mut self) {
        self.store.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_short_frame_is_recorded_as_error() {
        let mut session = Session::default();
        let record = session.dissect_frame(4, &[0xC4, 0x05]);
        assert_eq!(record.number, 4);
        assert!(record.error.unwrap().contains("Insufficient data"));
        assert!(record.tree.roots.is_empty());
    }

    #[test]
    fn test_records_serialize_to_json() {
        let mut session = Session::default();
        let frames = vec![CapturedFrame {
            number: 1,
            data: Bytes::from_static(&[0xC4, 0x05, 0x00, 0x10, 0x00, 0x00]),
        }];
        let records = session.dissect_capture(&frames);
        let json = serde_json::to_string(&records).unwrap();
        assert!(json.contains("\"docsis.mini_slots\""));
        assert!(!json.contains("\"error\""));
    }
}

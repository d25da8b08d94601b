//! Fragment reassembly keyed by service identifier.
//!
//! Each SID has at most one group in flight. Fragments are stored by their
//! 4-bit sequence number and ordered relative to the group's base sequence:
//! that of the fragment flagged "first", or 0 while no such fragment is in.
//! A group completes once the fragment flagged "last" is in and every
//! sequence number from base to last (wrapping at 16) is present.
//!
//! The store lives as long as one capture pass; [`ReassemblyStore::reset`]
//! must be called before the same capture is dissected again.

use crate::constants::FRAG_SEQ_MODULUS;
use crate::ehdr::FragmentInfo;
use bytes::{Bytes, BytesMut};
use serde::Serialize;
use std::collections::HashMap;
use strum_macros::Display;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum GroupState {
    Empty,
    Collecting,
}

/// A completed reassembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reassembled {
    pub sid: u16,
    pub data: Bytes,
    /// Sequence numbers of the fragments, in payload order.
    pub sequence: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentOutcome {
    /// Stored; the group is still waiting for fragments.
    Buffered { index: u8, received: usize },
    Complete(Reassembled),
    /// Same sequence number and same bytes as a fragment already held.
    Duplicate { seq: u8 },
    /// Same sequence number, different bytes. The first copy is kept.
    Conflict { seq: u8 },
}

impl FragmentOutcome {
    pub fn completed(self) -> Option<Reassembled> {
        match self {
            FragmentOutcome::Complete(r) => Some(r),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct FragmentGroup {
    first_seq: Option<u8>,
    last_seq: Option<u8>,
    fragments: HashMap<u8, Bytes>,
}

impl FragmentGroup {
    fn new() -> Self {
        Self {
            first_seq: None,
            last_seq: None,
            fragments: HashMap::new(),
        }
    }

    fn base(&self) -> u8 {
        self.first_seq.unwrap_or(0)
    }

    fn index_of(&self, seq: u8) -> u8 {
        seq.wrapping_sub(self.base()) % FRAG_SEQ_MODULUS
    }

    fn try_assemble(&self) -> Option<(Bytes, Vec<u8>)> {
        let last = self.last_seq?;
        let last_index = self.index_of(last);
        // Without a first fragment, anything held past the last one means the
        // message started before sequence 0 and its head is still missing.
        if self.first_seq.is_none() && self.fragments.keys().any(|&seq| self.index_of(seq) > last_index) {
            return None;
        }
        let count = last_index as usize + 1;
        let base = self.base();

        let mut data = BytesMut::new();
        let mut sequence = Vec::with_capacity(count);
        for i in 0..count {
            let seq = base.wrapping_add(i as u8) % FRAG_SEQ_MODULUS;
            data.extend_from_slice(self.fragments.get(&seq)?);
            sequence.push(seq);
        }
        Some((data.freeze(), sequence))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReassemblyStore {
    groups: HashMap<u16, FragmentGroup>,
    /// Last fragment of the most recent completed group per SID, so that a
    /// retransmitted tail is recognised instead of starting a new group.
    retired: HashMap<u16, (u8, Bytes)>,
    completed: usize,
}

impl ReassemblyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one fragment whose CRC has already been verified.
    pub fn add_fragment(&mut self, info: FragmentInfo, data: Bytes) -> FragmentOutcome {
        let sid = info.sid;
        let seq = info.seq % FRAG_SEQ_MODULUS;

        if !self.groups.contains_key(&sid) {
            if let Some((retired_seq, retired_data)) = self.retired.get(&sid) {
                if *retired_seq == seq && *retired_data == data {
                    debug!(sid, seq, "retransmitted fragment of a completed group");
                    return FragmentOutcome::Duplicate { seq };
                }
            }
        }

        if info.first {
            if let Some(group) = self.groups.get(&sid) {
                if group.first_seq.is_some_and(|first| first != seq) {
                    warn!(
                        sid,
                        seq,
                        held = group.fragments.len(),
                        "new first fragment, discarding unfinished group"
                    );
                    self.groups.remove(&sid);
                }
            }
        }

        let group = self.groups.entry(sid).or_insert_with(|| {
            debug!(sid, seq, "starting fragment group");
            FragmentGroup::new()
        });
        if info.first {
            group.first_seq = Some(seq);
        }

        if let Some(existing) = group.fragments.get(&seq) {
            if *existing == data {
                debug!(sid, seq, "duplicate fragment");
                return FragmentOutcome::Duplicate { seq };
            }
            warn!(sid, seq, "conflicting fragment data, keeping first copy");
            return FragmentOutcome::Conflict { seq };
        }

        group.fragments.insert(seq, data);
        if info.last {
            group.last_seq = Some(seq);
        }

        if let Some((data, sequence)) = group.try_assemble() {
            let last = sequence.last().copied().unwrap_or(seq);
            if let Some(group) = self.groups.remove(&sid) {
                if let Some(tail) = group.fragments.get(&last) {
                    self.retired.insert(sid, (last, tail.clone()));
                }
            }
            self.completed += 1;
            debug!(sid, fragments = sequence.len(), len = data.len(), "reassembly complete");
            return FragmentOutcome::Complete(Reassembled { sid, data, sequence });
        }

        FragmentOutcome::Buffered {
            index: group.index_of(seq),
            received: group.fragments.len(),
        }
    }

    pub fn state(&self, sid: u16) -> GroupState {
        if self.groups.contains_key(&sid) {
            GroupState::Collecting
        } else {
            GroupState::Empty
        }
    }

    /// Number of groups still collecting.
    pub fn pending(&self) -> usize {
        self.groups.len()
    }

    /// Number of groups completed since the last reset.
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Returns every SID to the empty state.
    pub fn reset(&mut self) {
        self.groups.clear();
        self.retired.clear();
        self.completed = 0;
    }
}

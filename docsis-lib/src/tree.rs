//! The field-emission sink.
//!
//! Every decoder writes what it finds through [`FieldSink`]: leaf fields,
//! nested subtrees and expert infos. [`ProtoTree`] is the in-memory sink used
//! by the session, the CLI and the tests.

use crate::fields::FieldDef;
use serde::Serialize;
use std::fmt;
use strum_macros::Display;

/// A typed field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    None,
    Bool(bool),
    UInt(u64),
    Bytes(Vec<u8>),
    Text(String),
    Ether([u8; 6]),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::None => Ok(()),
            FieldValue::Bool(b) => write!(f, "{}", if *b { "Set" } else { "Not set" }),
            FieldValue::UInt(v) => write!(f, "{} (0x{:x})", v, v),
            FieldValue::Bytes(b) => {
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Ether(mac) => write!(
                f,
                "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
                mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, Serialize)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

/// What an expert info is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum ExpertKind {
    #[strum(to_string = "Malformed length")]
    MalformedLength,
    #[strum(to_string = "Length past end of payload")]
    PayloadPastEnd,
    #[strum(to_string = "Bad HCS")]
    BadHcs,
    #[strum(to_string = "Bad fragment FCS")]
    BadFcs,
    #[strum(to_string = "Extended header length mismatch")]
    EhdrLengthMismatch,
    #[strum(to_string = "Extended header element past end")]
    EhdrPastEnd,
    #[strum(to_string = "Fragment overlap")]
    FragmentOverlap,
    #[strum(to_string = "Missing fragment information")]
    MissingFragmentInfo,
}

impl ExpertKind {
    pub fn severity(&self) -> Severity {
        match self {
            ExpertKind::FragmentOverlap | ExpertKind::PayloadPastEnd => Severity::Warning,
            ExpertKind::MissingFragmentInfo => Severity::Note,
            _ => Severity::Error,
        }
    }
}

/// A non-fatal annotation attached to a frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpertInfo {
    pub kind: ExpertKind,
    pub severity: Severity,
    pub offset: usize,
    pub message: String,
}

impl ExpertInfo {
    pub fn new(kind: ExpertKind, offset: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            offset,
            message: message.into(),
        }
    }
}

/// Sink the decoders emit parsed fields into.
pub trait FieldSink {
    /// Adds a leaf field under the currently open subtree.
    fn add(&mut self, def: FieldDef, offset: usize, len: usize, value: FieldValue);

    /// Opens a subtree; following fields nest under it until [`FieldSink::close`].
    fn open(&mut self, def: FieldDef, label: String, offset: usize, len: usize);

    fn close(&mut self);

    fn expert(&mut self, info: ExpertInfo);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldNode {
    pub abbrev: &'static str,
    pub label: String,
    pub offset: usize,
    pub len: usize,
    pub value: FieldValue,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FieldNode>,
}

impl FieldNode {
    fn walk<'a>(&'a self, out: &mut Vec<&'a FieldNode>) {
        out.push(self);
        for child in &self.children {
            child.walk(out);
        }
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "    ".repeat(depth);
        match &self.value {
            FieldValue::None => writeln!(f, "{}{}", indent, self.label)?,
            value => writeln!(f, "{}{}: {}", indent, self.label, value)?,
        }
        for child in &self.children {
            child.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

/// In-memory field tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProtoTree {
    pub roots: Vec<FieldNode>,
    pub experts: Vec<ExpertInfo>,
    #[serde(skip)]
    open: Vec<FieldNode>,
}

impl ProtoTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn attach(&mut self, node: FieldNode) {
        match self.open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }

    /// Closes any subtree left open.
    pub fn finish(&mut self) {
        while !self.open.is_empty() {
            self.close();
        }
    }

    /// All nodes, depth first.
    pub fn nodes(&self) -> Vec<&FieldNode> {
        let mut out = Vec::new();
        for root in &self.roots {
            root.walk(&mut out);
        }
        out
    }

    pub fn find(&self, abbrev: &str) -> Option<&FieldNode> {
        self.nodes().into_iter().find(|n| n.abbrev == abbrev)
    }

    pub fn find_all(&self, abbrev: &str) -> Vec<&FieldNode> {
        self.nodes().into_iter().filter(|n| n.abbrev == abbrev).collect()
    }

    /// Value of the first unsigned field named `abbrev`.
    pub fn uint(&self, abbrev: &str) -> Option<u64> {
        self.find_all(abbrev).into_iter().find_map(|n| match n.value {
            FieldValue::UInt(v) => Some(v),
            _ => None,
        })
    }

    pub fn has_expert(&self, kind: ExpertKind) -> bool {
        self.experts.iter().any(|e| e.kind == kind)
    }
}

impl FieldSink for ProtoTree {
    fn add(&mut self, def: FieldDef, offset: usize, len: usize, value: FieldValue) {
        self.attach(FieldNode {
            abbrev: def.abbrev,
            label: def.name.to_string(),
            offset,
            len,
            value,
            children: Vec::new(),
        });
    }

    fn open(&mut self, def: FieldDef, label: String, offset: usize, len: usize) {
        self.open.push(FieldNode {
            abbrev: def.abbrev,
            label,
            offset,
            len,
            value: FieldValue::None,
            children: Vec::new(),
        });
    }

    fn close(&mut self) {
        if let Some(node) = self.open.pop() {
            self.attach(node);
        }
    }

    fn expert(&mut self, info: ExpertInfo) {
        self.experts.push(info);
    }
}

impl fmt::Display for ProtoTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for root in &self.roots {
            root.write_indented(f, 0)?;
        }
        for expert in &self.experts {
            writeln!(
                f,
                "[Expert Info ({}): {} at offset {}: {}]",
                expert.severity, expert.kind, expert.offset, expert.message
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields;

    #[test]
    fn test_nesting_and_lookup() {
        let mut tree = ProtoTree::new();
        tree.open(fields::DOCSIS, "DOCSIS".to_string(), 0, 6);
        tree.add(fields::FC_TYPE, 0, 1, FieldValue::UInt(3));
        tree.open(fields::EHDR, "Extended Header".to_string(), 4, 2);
        tree.add(fields::EHDR_SID, 5, 2, FieldValue::UInt(16));
        tree.finish();

        assert_eq!(tree.roots.len(), 1);
        assert_eq!(tree.roots[0].children.len(), 2);
        assert_eq!(tree.uint("docsis.ehdr.sid"), Some(16));
        assert!(tree.find("docsis.hcs").is_none());
    }

    #[test]
    fn test_display_renders_values_and_experts() {
        let mut tree = ProtoTree::new();
        tree.add(fields::DST, 0, 6, FieldValue::Ether([0, 1, 2, 3, 4, 5]));
        tree.expert(ExpertInfo::new(ExpertKind::BadHcs, 4, "Bad checksum"));
        let text = tree.to_string();
        assert!(text.contains("Destination Address: 00:01:02:03:04:05"));
        assert!(text.contains("[Expert Info (Error): Bad HCS at offset 4: Bad checksum]"));
    }
}

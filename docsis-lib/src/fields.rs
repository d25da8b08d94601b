// Field registry: filter abbreviation and display name of every emitted field

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub abbrev: &'static str,
    pub name: &'static str,
}

impl FieldDef {
    pub const fn new(abbrev: &'static str, name: &'static str) -> Self {
        Self { abbrev, name }
    }
}

// MAC header
pub const DOCSIS: FieldDef = FieldDef::new("docsis", "DOCSIS");
pub const FC: FieldDef = FieldDef::new("docsis.fc", "FC Byte");
pub const FC_TYPE: FieldDef = FieldDef::new("docsis.fctype", "FCType");
pub const FC_PARM: FieldDef = FieldDef::new("docsis.fcparm", "FCParm");
pub const EHDR_ON: FieldDef = FieldDef::new("docsis.ehdron", "EHDRON");
pub const MAC_PARM: FieldDef = FieldDef::new("docsis.macparm", "MacParm");
pub const EHDR_LEN: FieldDef = FieldDef::new("docsis.ehdrlen", "Extended Header Length (bytes)");
pub const LEN: FieldDef = FieldDef::new("docsis.len", "Length of the MAC frame (bytes)");
pub const CONCAT_CNT: FieldDef = FieldDef::new("docsis.concat_cnt", "Number of Concatenated Frames");
pub const CONCAT_LEN: FieldDef = FieldDef::new("docsis.concat_len", "Concatenation Length (bytes)");
pub const MINI_SLOTS: FieldDef = FieldDef::new("docsis.mini_slots", "MiniSlots");
pub const REQUESTED_SIZE: FieldDef = FieldDef::new("docsis.requested_size", "Bytes Requested");
pub const SID: FieldDef = FieldDef::new("docsis.sid", "SID");
pub const HCS: FieldDef = FieldDef::new("docsis.hcs", "Header check sequence");
pub const HCS_STATUS: FieldDef = FieldDef::new("docsis.hcs.status", "HCS Status");

// Extended header
pub const EHDR: FieldDef = FieldDef::new("docsis.ehdr", "Extended Header");
pub const EHDR_ELEMENT: FieldDef = FieldDef::new("docsis.ehdr.element", "Extended Header Element");
pub const EHDR_TYPE: FieldDef = FieldDef::new("docsis.ehdr.type", "Type");
pub const EHDR_ELEM_LEN: FieldDef = FieldDef::new("docsis.ehdr.len", "Length");
pub const EHDR_MINI_SLOTS: FieldDef = FieldDef::new("docsis.ehdr.minislots", "MiniSlots");
pub const EHDR_SID: FieldDef = FieldDef::new("docsis.ehdr.sid", "SID");
pub const EHDR_KEY_SEQ: FieldDef = FieldDef::new("docsis.ehdr.keyseq", "Key Sequence");
pub const EHDR_VERSION: FieldDef = FieldDef::new("docsis.ehdr.ver", "Version");
pub const EHDR_BPI_EN: FieldDef = FieldDef::new("docsis.ehdr.bpi_en", "Encryption");
pub const EHDR_TOGGLE: FieldDef = FieldDef::new("docsis.ehdr.toggle_bit", "Toggle");
pub const EHDR_SAID: FieldDef = FieldDef::new("docsis.ehdr.said", "SAID");
pub const EHDR_RESERVED: FieldDef = FieldDef::new("docsis.ehdr.rsvd", "Reserved");
pub const EHDR_PHSI: FieldDef = FieldDef::new("docsis.ehdr.phsi", "Payload Header Suppression Index");
pub const EHDR_QIND: FieldDef = FieldDef::new("docsis.ehdr.qind", "Queue Indicator");
pub const EHDR_GRANTS: FieldDef = FieldDef::new("docsis.ehdr.grants", "Active Grants");
pub const EHDR_DS_TRAFFIC_PRI: FieldDef = FieldDef::new("docsis.ehdr.ds_traffic_pri", "DS Traffic Priority");
pub const EHDR_DS_DSID: FieldDef = FieldDef::new("docsis.ehdr.ds_dsid", "DS DSID");
pub const EHDR_DS_SEQ_CHG_CNT: FieldDef = FieldDef::new("docsis.ehdr.ds_seq_chg_cnt", "DS Sequence Change Count");
pub const EHDR_DS_PKT_SEQ_NUM: FieldDef = FieldDef::new("docsis.ehdr.ds_pkt_seq_num", "DS Packet Sequence Number");
pub const EHDR_DPV_START_REF: FieldDef = FieldDef::new("docsis.ehdr.dpv_start_ref", "DPV Start Reference Point");
pub const EHDR_DPV_TIMESTAMP: FieldDef = FieldDef::new("docsis.ehdr.dpv_timestamp", "DPV Timestamp");
pub const EHDR_VALUE: FieldDef = FieldDef::new("docsis.ehdr.value", "Value");

// Fragmentation
pub const FRAG_RSVD: FieldDef = FieldDef::new("docsis.frag_rsvd", "Reserved");
pub const FRAG_FIRST: FieldDef = FieldDef::new("docsis.frag_first", "First Frame");
pub const FRAG_LAST: FieldDef = FieldDef::new("docsis.frag_last", "Last Frame");
pub const FRAG_SEQ: FieldDef = FieldDef::new("docsis.frag_seq", "Fragmentation Sequence #");
pub const FRAG_FCS: FieldDef = FieldDef::new("docsis.frag_fcs", "Fragment FCS");
pub const FRAG_FCS_STATUS: FieldDef = FieldDef::new("docsis.frag_fcs.status", "Fragment FCS Status");
pub const FRAGMENT: FieldDef = FieldDef::new("docsis.fragment", "Message fragment");
pub const FRAGMENT_DUPLICATE: FieldDef = FieldDef::new("docsis.fragment.overlap", "Message fragment overlap");
pub const REASSEMBLED: FieldDef = FieldDef::new("docsis.reassembled", "Reassembled Message");
pub const REASSEMBLED_COUNT: FieldDef = FieldDef::new("docsis.reassembled.count", "Message fragment count");
pub const REASSEMBLED_LENGTH: FieldDef = FieldDef::new("docsis.reassembled.length", "Reassembled DOCSIS length");

// Payload
pub const DST: FieldDef = FieldDef::new("docsis.dst", "Destination Address");
pub const SRC: FieldDef = FieldDef::new("docsis.src", "Source Address");
pub const ENCRYPTED_PAYLOAD: FieldDef = FieldDef::new("docsis.encrypted_payload", "Encrypted Payload");
pub const DATA: FieldDef = FieldDef::new("data", "Data");

// Ethernet without FCS
pub const ETH: FieldDef = FieldDef::new("eth", "Ethernet II");
pub const ETH_DST: FieldDef = FieldDef::new("eth.dst", "Destination");
pub const ETH_SRC: FieldDef = FieldDef::new("eth.src", "Source");
pub const ETH_TYPE: FieldDef = FieldDef::new("eth.type", "Type");
pub const ETH_LEN: FieldDef = FieldDef::new("eth.len", "Length");

// MAC management header
pub const MGMT: FieldDef = FieldDef::new("docsis_mgmt", "DOCSIS Mac Management");
pub const MGMT_DST: FieldDef = FieldDef::new("docsis_mgmt.dst", "Destination Address");
pub const MGMT_SRC: FieldDef = FieldDef::new("docsis_mgmt.src", "Source Address");
pub const MGMT_MSG_LEN: FieldDef = FieldDef::new("docsis_mgmt.msglen", "Message Length - DSAP to End (Bytes)");
pub const MGMT_DSAP: FieldDef = FieldDef::new("docsis_mgmt.dsap", "DSAP [0x00]");
pub const MGMT_SSAP: FieldDef = FieldDef::new("docsis_mgmt.ssap", "SSAP [0x00]");
pub const MGMT_CONTROL: FieldDef = FieldDef::new("docsis_mgmt.control", "Control [0x03]");
pub const MGMT_VERSION: FieldDef = FieldDef::new("docsis_mgmt.version", "Version");
pub const MGMT_TYPE: FieldDef = FieldDef::new("docsis_mgmt.type", "Type");
pub const MGMT_RSVD: FieldDef = FieldDef::new("docsis_mgmt.rsvd", "Reserved [0x00]");

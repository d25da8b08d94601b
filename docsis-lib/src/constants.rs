// Wire constants for the DOCSIS MAC header

/// Offset of the frame control byte
pub const FC_OFFSET: usize = 0;

/// Offset of the MAC_PARM field (1 byte, or 2 bytes for queue-depth requests)
pub const MAC_PARM_OFFSET: usize = 1;

/// Offset of the LEN/SID field in the common 6-byte header
pub const LEN_SID_OFFSET: usize = 2;

/// Offset of the LEN/SID field in the 7-byte queue-depth request header
pub const QDR_LEN_SID_OFFSET: usize = 3;

/// Size of the fixed MAC header, HCS included
pub const MIN_HEADER_SIZE: usize = 6;

/// Size of the fixed queue-depth request header, HCS included
pub const QDR_HEADER_SIZE: usize = 7;

/// Offset of the first extended header element
pub const EHDR_OFFSET: usize = 4;

/// Size of the header check sequence
pub const HCS_SIZE: usize = 2;

/// Size of the fragment CRC trailer
pub const FCS_SIZE: usize = 4;

/// Size of an IEEE 802 MAC address
pub const MAC_ADDR_SIZE: usize = 6;

/// pcap link type for DOCSIS MAC frames
pub const LINKTYPE_DOCSIS: i32 = 143;

/// Service identifier bits of a privacy element's SID word
pub const SID_MASK: u16 = 0x3FFF;

/// Encryption enable bit of a privacy element's SID word
pub const BPI_ENABLE_MASK: u16 = 0x8000;

/// Toggle bit of a privacy element's SID word
pub const TOGGLE_MASK: u16 = 0x4000;

/// Downstream service identifier bits of a DS service element
pub const DSID_MASK: u32 = 0x000F_FFFF;

/// Traffic priority bits of a DS service element
pub const DS_TRAFFIC_PRI_MASK: u8 = 0xE0;

/// Sequence change count bit of a DS service element
pub const DS_SEQ_CHG_CNT_MASK: u8 = 0x10;

/// Queue indicator bit of a PHS element
pub const PHS_QIND_MASK: u8 = 0x80;

/// Active grants bits of a PHS element
pub const PHS_GRANTS_MASK: u8 = 0x7F;

/// Fragment sequence numbers are 4 bits wide
pub const FRAG_SEQ_MODULUS: u8 = 16;

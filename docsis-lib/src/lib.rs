pub mod capture;
pub mod checksum;
pub mod config;
pub mod constants;
pub mod dissector;
pub mod ehdr;
pub mod error;
pub mod fields;
pub mod header;
pub mod payload;
pub mod reassembly;
pub mod session;
pub mod tree;

// Re-export the main entry points for easy access
pub use config::DissectorConfig;
pub use dissector::{DocsisDissector, PacketInfo};
pub use error::DocsisError;
pub use reassembly::ReassemblyStore;
pub use session::{FrameRecord, Session};
pub use tree::{FieldSink, ProtoTree};

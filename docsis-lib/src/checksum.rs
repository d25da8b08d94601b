//! Header check sequence (CRC-16-CCITT) and fragment CRC-32.
//!
//! Both CRCs are sent least-significant byte first, so the big-endian value a
//! receiver reads out of the frame is the byte-swapped CRC. The `*_field`
//! helpers return that on-the-wire value.

use crate::constants::{FCS_SIZE, HCS_SIZE};
use serde::Serialize;
use strum_macros::Display;

/// Reflected form of x^16 + x^12 + x^5 + 1
const CRC16_CCITT_POLY_REFLECTED: u16 = 0x8408;

/// CRC-16-CCITT with X.25 parameters (reflected, init 0xFFFF, xorout 0xFFFF).
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ CRC16_CCITT_POLY_REFLECTED;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}

/// CRC-32 with the IEEE 802.3 polynomial.
pub fn crc32_802(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// HCS as it reads big-endian from the frame, for the bytes it covers.
pub fn hcs_field(covered: &[u8]) -> u16 {
    crc16_ccitt(covered).swap_bytes()
}

/// Fragment CRC as it reads big-endian from the frame, for the bytes it covers.
pub fn fcs_field(covered: &[u8]) -> u32 {
    crc32_802(covered).swap_bytes()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum ChecksumStatus {
    Good,
    Bad,
    Unverified,
}

/// Outcome of one checksum comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecksumCheck {
    pub received: u32,
    pub computed: Option<u32>,
    pub status: ChecksumStatus,
}

impl ChecksumCheck {
    fn compare(received: u32, computed: u32) -> Self {
        let status = if received == computed {
            ChecksumStatus::Good
        } else {
            ChecksumStatus::Bad
        };
        Self {
            received,
            computed: Some(computed),
            status,
        }
    }

    /// `false` only when the checksum was verified and found wrong.
    pub fn proceed(&self) -> bool {
        self.status != ChecksumStatus::Bad
    }
}

/// Checks the HCS at `header_len - 2` against the CRC of `[0, header_len - 2)`.
///
/// Returns `None` if the frame is shorter than `header_len`.
pub fn verify_hcs(frame: &[u8], header_len: usize, validate: bool) -> Option<ChecksumCheck> {
    let hcs_offset = header_len.checked_sub(HCS_SIZE)?;
    let bytes = frame.get(hcs_offset..header_len)?;
    let received = u16::from_be_bytes([bytes[0], bytes[1]]) as u32;

    if !validate {
        return Some(ChecksumCheck {
            received,
            computed: None,
            status: ChecksumStatus::Unverified,
        });
    }
    Some(ChecksumCheck::compare(received, hcs_field(&frame[..hcs_offset]) as u32))
}

/// Checks the fragment CRC read at `trailer_offset` against the CRC of
/// `[0, frame.len() - 4)`.
pub fn verify_fcs(frame: &[u8], trailer_offset: usize) -> Option<ChecksumCheck> {
    let bytes = frame.get(trailer_offset..trailer_offset.checked_add(FCS_SIZE)?)?;
    let received = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let covered_len = frame.len().checked_sub(FCS_SIZE)?;
    Some(ChecksumCheck::compare(received, fcs_field(&frame[..covered_len])))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_values() {
        assert_eq!(crc16_ccitt(b"123456789"), 0x906E);
        assert_eq!(crc32_802(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_hcs_round_trip_and_bit_flips() {
        let mut frame = vec![0x00, 0x00, 0x00, 0x40, 0xAA, 0x55, 0x00, 0x00];
        let field = hcs_field(&frame[..6]);
        frame[6..8].copy_from_slice(&field.to_be_bytes());

        let check = verify_hcs(&frame, 8, true).unwrap();
        assert_eq!(check.status, ChecksumStatus::Good);
        assert!(check.proceed());

        for byte in 0..frame.len() {
            for bit in 0..8 {
                let mut corrupted = frame.clone();
                corrupted[byte] ^= 1 << bit;
                let check = verify_hcs(&corrupted, 8, true).unwrap();
                assert_eq!(check.status, ChecksumStatus::Bad, "flip at byte {} bit {}", byte, bit);
                assert!(!check.proceed());
            }
        }
    }

    #[test]
    fn test_hcs_unverified_when_disabled() {
        let frame = [0xC4, 0x05, 0x00, 0x10, 0xDE, 0xAD];
        let check = verify_hcs(&frame, 6, false).unwrap();
        assert_eq!(check.status, ChecksumStatus::Unverified);
        assert_eq!(check.received, 0xDEAD);
        assert!(check.computed.is_none());
        assert!(check.proceed());
    }

    #[test]
    fn test_hcs_short_frame() {
        assert!(verify_hcs(&[0x00, 0x00, 0x00], 6, true).is_none());
    }

    #[test]
    fn test_fcs_trailer() {
        let mut frame = vec![0xC7, 0x05, 0x00, 0x0F, 0x01, 0x02, 0x03, 0x04, 0x05, 0x00, 0x00, 0x00, 0x00];
        let covered = frame.len() - 4;
        let field = fcs_field(&frame[..covered]);
        frame[covered..].copy_from_slice(&field.to_be_bytes());
        assert_eq!(verify_fcs(&frame, covered).unwrap().status, ChecksumStatus::Good);

        frame[5] ^= 0x80;
        assert_eq!(verify_fcs(&frame, covered).unwrap().status, ChecksumStatus::Bad);
    }
}

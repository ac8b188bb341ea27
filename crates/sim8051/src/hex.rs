//! Intel HEX program image loader.
//!
//! Each record is `:LLAAAATT<data...>[CC]`: byte count, 16-bit load address,
//! record type, `LL` data bytes and an optional checksum, all in hex. Data
//! records (`00`) are placed in code memory, routed to the internal or
//! external bank by address. An end-of-file record (`01`) stops loading;
//! anything after it is ignored. Other record types are skipped.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::HexError;
use crate::system::System;

const RECORD_DATA: u8 = 0x00;
const RECORD_EOF: u8 = 0x01;

/// What a successful load placed in code memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Number of data records loaded.
    pub records: usize,
    /// Number of bytes written to code memory.
    pub bytes: usize,
}

/// Two hex digits at some offset of a record body.
enum Pair {
    Byte(u8),
    Invalid,
    Missing,
}

fn nibble(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}

fn pair(body: &[u8], at: usize) -> Pair {
    match body.get(at..at + 2) {
        None => Pair::Missing,
        Some(&[hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => {
            Pair::Byte(nibble(hi) << 4 | nibble(lo))
        }
        Some(_) => Pair::Invalid,
    }
}

/// Load an Intel HEX image from text into code memory.
pub fn load_hex(system: &mut System, text: &str) -> Result<LoadSummary, HexError> {
    let mut summary = LoadSummary::default();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let record = raw.trim_end();
        if record.is_empty() {
            continue;
        }
        let Some(body) = record.strip_prefix(':') else {
            return Err(HexError::MissingColon { line });
        };

        let body = body.as_bytes();

        let header = |at| match pair(body, at) {
            Pair::Byte(value) => Ok(value),
            _ => Err(HexError::BadHeader { line }),
        };
        let count = header(0)?;
        let addr_hi = header(2)?;
        let addr_lo = header(4)?;
        let kind = header(6)?;
        let addr = (addr_hi as u16) << 8 | addr_lo as u16;

        let mut data = Vec::with_capacity(count as usize);
        for i in 0..count as usize {
            match pair(body, 8 + i * 2) {
                Pair::Byte(value) => data.push(value),
                Pair::Invalid => return Err(HexError::BadData { line }),
                Pair::Missing => return Err(HexError::Truncated { line }),
            }
        }

        // The record ends after the data or after a two-digit checksum.
        let data_end = 8 + count as usize * 2;
        match body.len() - data_end {
            0 => {}
            2 => {
                let Pair::Byte(found) = pair(body, data_end) else {
                    return Err(HexError::BadData { line });
                };
                let sum = data.iter().fold(
                    count.wrapping_add(addr_hi).wrapping_add(addr_lo).wrapping_add(kind),
                    |acc, b| acc.wrapping_add(*b),
                );
                let expected = sum.wrapping_neg();
                if found != expected {
                    return Err(HexError::BadChecksum {
                        line,
                        expected,
                        found,
                    });
                }
            }
            _ => return Err(HexError::BadData { line }),
        }

        match kind {
            RECORD_DATA => {
                system.load_code(addr, &data);
                summary.records += 1;
                summary.bytes += data.len();
            }
            RECORD_EOF => {
                debug!(line, "end of file record");
                return Ok(summary);
            }
            other => debug!(line, kind = other, "skipping hex record"),
        }
    }

    Ok(summary)
}

/// Read and load an Intel HEX file.
pub fn load_hex_file(
    system: &mut System,
    path: impl AsRef<Path>,
) -> Result<LoadSummary, HexError> {
    let text = fs::read_to_string(path)?;
    load_hex(system, &text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_data_records_until_eof() {
        let mut sys = System::new();
        let image = ":0500000074031470FD03\n:00000001FF\n:01000000FF00\n";
        let summary = load_hex(&mut sys, image).unwrap();
        assert_eq!(summary, LoadSummary { records: 1, bytes: 5 });
        let code: Vec<u8> = (0..5).map(|a| sys.read_code(a)).collect();
        assert_eq!(code, vec![0x74, 0x03, 0x14, 0x70, 0xFD]);
    }

    #[test]
    fn routes_high_addresses_to_external_bank() {
        let mut sys = System::new();
        load_hex(&mut sys, ":020FFF00AABB\r\n").unwrap();
        assert_eq!(sys.read_code(0x0FFF), 0xAA);
        assert_eq!(sys.read_code(0x1000), 0xBB);
        sys.set_external_access(false);
        assert_eq!(sys.read_code(0x0FFF), 0x00);
        assert_eq!(sys.read_code(0x1000), 0xBB);
    }

    #[test]
    fn skips_blank_lines_and_other_records() {
        let mut sys = System::new();
        let summary = load_hex(&mut sys, "\n:020000040000\n\n:0100100042\n").unwrap();
        assert_eq!(summary.records, 1);
        assert_eq!(sys.read_code(0x0010), 0x42);
    }

    #[test]
    fn rejects_missing_colon() {
        let mut sys = System::new();
        let err = load_hex(&mut sys, ":0100000000\nhello\n").unwrap_err();
        assert!(matches!(err, HexError::MissingColon { line: 2 }));
    }

    #[test]
    fn rejects_bad_header() {
        let mut sys = System::new();
        let err = load_hex(&mut sys, ":01zz").unwrap_err();
        assert!(matches!(err, HexError::BadHeader { line: 1 }));
    }

    #[test]
    fn rejects_bad_and_short_data() {
        let mut sys = System::new();
        let err = load_hex(&mut sys, ":02000000AAXX").unwrap_err();
        assert!(matches!(err, HexError::BadData { line: 1 }));
        let err = load_hex(&mut sys, ":04000000AABB").unwrap_err();
        assert!(matches!(err, HexError::Truncated { line: 1 }));
    }

    #[test]
    fn rejects_signs_in_hex_fields() {
        let mut sys = System::new();
        let err = load_hex(&mut sys, ":+1000000+7\n").unwrap_err();
        assert!(matches!(err, HexError::BadHeader { line: 1 }));
        let err = load_hex(&mut sys, ":01000000+7\n").unwrap_err();
        assert!(matches!(err, HexError::BadData { line: 1 }));
        assert_eq!(sys.read_code(0), 0x00);
    }

    #[test]
    fn rejects_partial_or_trailing_checksum() {
        let mut sys = System::new();
        let err = load_hex(&mut sys, ":0100000074Z\n").unwrap_err();
        assert!(matches!(err, HexError::BadData { line: 1 }));
        let err = load_hex(&mut sys, ":01000000748B00\n").unwrap_err();
        assert!(matches!(err, HexError::BadData { line: 1 }));
        let err = load_hex(&mut sys, ":01000000748G\n").unwrap_err();
        assert!(matches!(err, HexError::BadData { line: 1 }));
        assert_eq!(sys.read_code(0), 0x00);
    }

    #[test]
    fn accepts_lowercase_digits() {
        let mut sys = System::new();
        load_hex(&mut sys, ":01000000748b\n").unwrap();
        assert_eq!(sys.read_code(0), 0x74);
    }

    #[test]
    fn rejects_bad_checksum() {
        let mut sys = System::new();
        let err = load_hex(&mut sys, ":0100000074FF").unwrap_err();
        assert!(matches!(
            err,
            HexError::BadChecksum {
                line: 1,
                expected: 0x8B,
                found: 0xFF
            }
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let mut sys = System::new();
        let err = load_hex_file(&mut sys, "/nonexistent/image.hex").unwrap_err();
        assert!(matches!(err, HexError::Io(_)));
    }
}

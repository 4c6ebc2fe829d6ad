//! Pure Rust parser for PAR2 Main and Input File Slice Checksum (IFSC) packets.
//!
//! Sibling to [`super::par2_metadata`]: same packet-header shape, different body.
//!
//! ## Main packet (`PAR 2.0\0Main\0\0\0\0`)
//!
//! - 8 bytes: slice size (little-endian u64), shared by every file in the set
//! - 4 bytes: recovery file count
//! - variable: recoverable/non-recoverable file ID lists (unused here)
//!
//! ## IFSC packet (`PAR 2.0\0IFSC\0\0\0\0`)
//!
//! - 16 bytes: file ID (matches a File Description packet's file ID)
//! - repeating, one entry per slice of the file:
//!   - 16 bytes: MD5 of the slice
//!   - 4 bytes: CRC32 of the slice (little-endian)

use std::path::Path;

const PAR2_MAGIC: &[u8; 8] = b"PAR2\0PKT";
const MAIN_TYPE: &[u8; 16] = b"PAR 2.0\0Main\0\0\0\0";
const IFSC_TYPE: &[u8; 16] = b"PAR 2.0\0IFSC\0\0\0\0";
const HEADER_SIZE: usize = 8 + 8 + 16 + 16 + 16; // 64 bytes
const TYPE_OFFSET: usize = 8 + 8 + 16 + 16; // 48 bytes
const IFSC_SLICE_ENTRY_SIZE: usize = 16 + 4; // md5 + crc32

/// Per-slice CRC32 checksums for one file, in slice order.
#[derive(Debug, Clone)]
pub(crate) struct Par2IfscEntry {
    pub(crate) file_id: [u8; 16],
    pub(crate) slice_crc32s: Vec<u32>,
}

/// Parse the slice size from a PAR2 file's Main packet, if present.
pub(crate) fn parse_slice_size(par2_path: &Path) -> crate::Result<Option<u64>> {
    let data = std::fs::read(par2_path)?;
    Ok(parse_slice_size_from_bytes(&data))
}

pub(crate) fn parse_slice_size_from_bytes(data: &[u8]) -> Option<u64> {
    for_each_packet(data, |packet_type, body| {
        if packet_type == MAIN_TYPE && body.len() >= 8 {
            Some(u64::from_le_bytes(body[0..8].try_into().ok()?))
        } else {
            None
        }
    })
}

/// Parse every IFSC packet in a PAR2 file.
pub(crate) fn parse_ifsc_entries(par2_path: &Path) -> crate::Result<Vec<Par2IfscEntry>> {
    let data = std::fs::read(par2_path)?;
    Ok(parse_ifsc_entries_from_bytes(&data))
}

pub(crate) fn parse_ifsc_entries_from_bytes(data: &[u8]) -> Vec<Par2IfscEntry> {
    let mut entries = Vec::new();
    walk_packets(data, |packet_type, body| {
        if packet_type != IFSC_TYPE || body.len() < 16 {
            return;
        }
        let mut file_id = [0u8; 16];
        file_id.copy_from_slice(&body[0..16]);

        let slice_body = &body[16..];
        let slice_crc32s = slice_body
            .chunks_exact(IFSC_SLICE_ENTRY_SIZE)
            .map(|entry| u32::from_le_bytes([entry[16], entry[17], entry[18], entry[19]]))
            .collect();

        entries.push(Par2IfscEntry {
            file_id,
            slice_crc32s,
        });
    });
    entries
}

/// Walk every well-formed packet in `data`, calling `f(packet_type, body)` for each.
fn walk_packets(data: &[u8], mut f: impl FnMut(&[u8], &[u8])) {
    let mut pos = 0;
    while pos + HEADER_SIZE <= data.len() {
        let Some(magic_pos) = find_magic(data, pos) else {
            break;
        };
        pos = magic_pos;
        if pos + HEADER_SIZE > data.len() {
            break;
        }

        let packet_len =
            u64::from_le_bytes(data[pos + 8..pos + 16].try_into().unwrap_or([0; 8])) as usize;
        if packet_len < HEADER_SIZE || pos + packet_len > data.len() {
            pos += 8;
            continue;
        }

        let packet_type = &data[pos + TYPE_OFFSET..pos + TYPE_OFFSET + 16];
        let body = &data[pos + HEADER_SIZE..pos + packet_len];
        f(packet_type, body);

        pos += packet_len;
    }
}

/// Like `walk_packets`, but short-circuits on the first `Some` returned by `f`.
fn for_each_packet<T>(data: &[u8], mut f: impl FnMut(&[u8], &[u8]) -> Option<T>) -> Option<T> {
    let mut result = None;
    walk_packets(data, |packet_type, body| {
        if result.is_none() {
            result = f(packet_type, body);
        }
    });
    result
}

fn find_magic(data: &[u8], start: usize) -> Option<usize> {
    if start + PAR2_MAGIC.len() > data.len() {
        return None;
    }
    data[start..]
        .windows(PAR2_MAGIC.len())
        .position(|w| w == PAR2_MAGIC)
        .map(|offset| start + offset)
}

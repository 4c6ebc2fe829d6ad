//! Quick-verify: a CRC32-only shortcut ahead of full PAR2 verification (§4.7).
//!
//! Every downloaded article already carries a `crc32fast` checksum of its decoded
//! payload (see `download_task::batch_processor`). A PAR2 set's IFSC packets carry
//! a CRC32 per fixed-size slice of each source file. [`crate::parity::crc_combine`]
//! lets both be folded into the CRC32 of the *whole file* without re-reading it
//! from disk: if the article-derived whole-file CRC32 matches the slice-derived
//! one, the file is intact and the expensive full PAR2 verify (which hashes every
//! byte again) can be skipped for it.
//!
//! This is strictly a fast path. Any file it can't positively confirm — no PAR2
//! entry, missing article checksums, a mismatch — falls through to full verify
//! rather than ever declaring a file damaged on its own authority.

use std::path::Path;

use super::crc_combine::combine_sequence;
use super::par2_ifsc::{parse_ifsc_entries, parse_slice_size};
use super::par2_metadata::parse_par2_file_entries;

/// One file's worth of article checksums, in on-disk segment order.
pub(crate) struct ArticleChecksums {
    pub(crate) filename: String,
    /// `(crc32, byte_len)` per article, ordered by segment number.
    pub(crate) articles: Vec<(u32, u64)>,
}

/// Outcome of a quick-verify attempt over a PAR2 set.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum QuickVerifyOutcome {
    /// Every file matched against its PAR2 slice checksums — full verify may be skipped.
    AllIntact,
    /// At least one file could not be confirmed; fall back to full PAR2 verify.
    Inconclusive,
}

/// Attempt to confirm every file in `files` against the PAR2 set's IFSC slice
/// checksums, using only the already-recorded per-article CRC32s.
pub(crate) fn quick_verify(par2_file: &Path, files: &[ArticleChecksums]) -> crate::Result<QuickVerifyOutcome> {
    if files.is_empty() {
        return Ok(QuickVerifyOutcome::Inconclusive);
    }

    let Some(slice_size) = parse_slice_size(par2_file)? else {
        return Ok(QuickVerifyOutcome::Inconclusive);
    };
    if slice_size == 0 {
        return Ok(QuickVerifyOutcome::Inconclusive);
    }

    let file_entries = parse_par2_file_entries(par2_file)?;
    let ifsc_entries = parse_ifsc_entries(par2_file)?;

    for file in files {
        let Some(matched) = confirm_file(file, slice_size, &file_entries, &ifsc_entries) else {
            return Ok(QuickVerifyOutcome::Inconclusive);
        };
        if !matched {
            return Ok(QuickVerifyOutcome::Inconclusive);
        }
    }

    Ok(QuickVerifyOutcome::AllIntact)
}

/// Returns `Some(true)` if `file` matches its PAR2 slice checksums, `Some(false)`
/// if it was matched and the CRC32s disagree, or `None` if it can't be confirmed
/// either way (no matching PAR2 entry, no article checksums, etc).
fn confirm_file(
    file: &ArticleChecksums,
    slice_size: u64,
    file_entries: &[crate::parity::par2_metadata::Par2FileEntry],
    ifsc_entries: &[super::par2_ifsc::Par2IfscEntry],
) -> Option<bool> {
    let file_entry = file_entries.iter().find(|e| e.filename == file.filename)?;
    let ifsc = ifsc_entries.iter().find(|e| e.file_id == file_entry.file_id)?;
    if ifsc.slice_crc32s.is_empty() || file.articles.is_empty() {
        return None;
    }

    let total_len: u64 = file.articles.iter().map(|(_, len)| *len).sum();
    let from_articles = combine_sequence(file.articles.iter().copied())?;
    let from_slices = combine_sequence(slice_lengths(slice_size, total_len, ifsc.slice_crc32s.len())
        .into_iter()
        .zip(ifsc.slice_crc32s.iter().copied())
        .map(|(len, crc)| (crc, len)))?;

    Some(from_articles == from_slices)
}

/// Per-slice byte lengths for a file of `total_len` bytes split into
/// `slice_count` slices of `slice_size`, with the final slice taking the remainder.
fn slice_lengths(slice_size: u64, total_len: u64, slice_count: usize) -> Vec<u64> {
    if slice_count == 0 {
        return Vec::new();
    }
    let mut lengths = vec![slice_size; slice_count - 1];
    let last = total_len.saturating_sub(slice_size * (slice_count as u64 - 1));
    lengths.push(last);
    lengths
}

/*-
 * Copyright 2003-2005 Colin Percival
 * Copyright 2012 Matthew Endsley
 * All rights reserved
 *
 * Redistribution and use in source and binary forms, with or without
 * modification, are permitted providing that the following conditions
 * are met:
 * 1. Redistributions of source code must retain the above copyright
 *    notice, this list of conditions and the following disclaimer.
 * 2. Redistributions in binary form must reproduce the above copyright
 *    notice, this list of conditions and the following disclaimer in the
 *    documentation and/or other materials provided with the distribution.
 *
 * THIS SOFTWARE IS PROVIDED BY THE AUTHOR ``AS IS'' AND ANY EXPRESS OR
 * IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE IMPLIED
 * WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE
 * ARE DISCLAIMED.  IN NO EVENT SHALL THE AUTHOR BE LIABLE FOR ANY
 * DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR CONSEQUENTIAL
 * DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS
 * OR SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION)
 * HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY, WHETHER IN CONTRACT,
 * STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING
 * IN ANY WAY OUT OF THE USE OF THIS SOFTWARE, EVEN IF ADVISED OF THE
 * POSSIBILITY OF SUCH DAMAGE.
 */

//! Patch generation.
//!
//! The scan walks `new` left to right, probing the suffix array of `old`
//! for approximate matches. A match is accepted once it beats the bytes the
//! previous alignment would already reproduce (`oldscore`) by more than 8;
//! the accepted segment is then extended forward from the last emission and
//! backward from the new match, both maximizing `2*s - i` so a few
//! mismatches are tolerated when they let regions fuse. Each segment emits
//! one control triple plus its diff and extra bytes.

use std::io::{Read, Write};

use bzip2::write::BzEncoder;
use bzip2::Compression;
use tracing::{debug, trace};

use crate::error::Result;
use crate::num::write_int;
use crate::suffix::SuffixArray;
use crate::MAGIC;

/// Compute a BSDIFF4 patch that transforms `old` into `new`.
pub fn diff(old: &[u8], new: &[u8]) -> Result<Vec<u8>> {
    generate(old, new)
}

/// Read both inputs to the end, diff them, and write the patch to `patch`.
pub fn diff_stream<R1, R2, W>(old: &mut R1, new: &mut R2, patch: &mut W) -> Result<()>
where
    R1: Read,
    R2: Read,
    W: Write,
{
    let mut old_buf = Vec::new();
    old.read_to_end(&mut old_buf)?;
    let mut new_buf = Vec::new();
    new.read_to_end(&mut new_buf)?;
    let out = generate(&old_buf, &new_buf)?;
    patch.write_all(&out)?;
    Ok(())
}

fn generate(old: &[u8], new: &[u8]) -> Result<Vec<u8>> {
    let sa = SuffixArray::build(old);
    debug!(old_len = old.len(), new_len = new.len(), "suffix array built");

    // Raw diff and extra buffers; control triples go straight through their
    // encoder as segments are produced.
    let mut db: Vec<u8> = Vec::new();
    let mut eb: Vec<u8> = Vec::new();
    let mut ctrl = BzEncoder::new(Vec::new(), Compression::best());

    let mut scan = 0usize;
    let mut len = 0usize;
    let mut pos = 0usize;
    let mut lastscan = 0usize;
    let mut lastpos = 0usize;
    let mut lastoffset = 0i64;

    while scan < new.len() {
        let mut oldscore = 0i64;
        scan += len;
        let mut scsc = scan;

        while scan < new.len() {
            let m = sa.longest_match(old, &new[scan..]);
            pos = m.pos;
            len = m.len;

            // Count how many probed bytes the previous alignment already
            // reproduces.
            while scsc < scan + len {
                let old_idx = (scsc as i64 + lastoffset) as usize;
                if old_idx < old.len() && old[old_idx] == new[scsc] {
                    oldscore += 1;
                }
                scsc += 1;
            }

            // Accept once the match strictly beats the old alignment, or
            // stop probing when it explains exactly the same bytes.
            if (len as i64 == oldscore && len != 0) || len as i64 > oldscore + 8 {
                break;
            }

            // The byte left behind at `scan` no longer counts.
            let old_idx = (scan as i64 + lastoffset) as usize;
            if old_idx < old.len() && old[old_idx] == new[scan] {
                oldscore -= 1;
            }
            scan += 1;
        }

        if len as i64 != oldscore || scan == new.len() {
            // Forward extension from the pending segment start.
            let mut s = 0i64;
            let mut best_f = 0i64;
            let mut lenf = 0usize;
            {
                let mut i = 0usize;
                while lastscan + i < scan && lastpos + i < old.len() {
                    if old[lastpos + i] == new[lastscan + i] {
                        s += 1;
                    }
                    i += 1;
                    if s * 2 - i as i64 > best_f * 2 - lenf as i64 {
                        best_f = s;
                        lenf = i;
                    }
                }
            }

            // Backward extension from the accepted match.
            let mut lenb = 0usize;
            if scan < new.len() {
                let mut s = 0i64;
                let mut best_b = 0i64;
                let mut i = 1usize;
                while scan >= lastscan + i && pos >= i {
                    if old[pos - i] == new[scan - i] {
                        s += 1;
                    }
                    if s * 2 - i as i64 > best_b * 2 - lenb as i64 {
                        best_b = s;
                        lenb = i;
                    }
                    i += 1;
                }
            }

            // The extensions may claim the same bytes of new; cut at the
            // point keeping the most reproduced bytes.
            if lastscan + lenf > scan - lenb {
                let overlap = (lastscan + lenf) - (scan - lenb);
                let mut s = 0i64;
                let mut best = 0i64;
                let mut lens = 0usize;
                for i in 0..overlap {
                    if new[lastscan + lenf - overlap + i] == old[lastpos + lenf - overlap + i] {
                        s += 1;
                    }
                    if new[scan - lenb + i] == old[pos - lenb + i] {
                        s -= 1;
                    }
                    if s > best {
                        best = s;
                        lens = i + 1;
                    }
                }
                lenf += lens;
                lenf -= overlap;
                lenb -= lens;
            }

            let extra_len = (scan - lenb) - (lastscan + lenf);
            db.extend(
                new[lastscan..lastscan + lenf]
                    .iter()
                    .zip(&old[lastpos..lastpos + lenf])
                    .map(|(n, o)| n.wrapping_sub(*o)),
            );
            eb.extend_from_slice(&new[lastscan + lenf..lastscan + lenf + extra_len]);

            let mut cbuf = [0u8; 24];
            write_int(lenf as i64, &mut cbuf[..8]);
            write_int(extra_len as i64, &mut cbuf[8..16]);
            write_int(
                (pos as i64 - lenb as i64) - (lastpos as i64 + lenf as i64),
                &mut cbuf[16..24],
            );
            ctrl.write_all(&cbuf)?;
            trace!(lenf, extra_len, "segment");

            lastscan = scan - lenb;
            lastpos = pos - lenb;
            lastoffset = pos as i64 - scan as i64;
        }
    }

    let ctrl_block = ctrl.finish()?;
    let diff_block = compress(&db)?;
    let extra_block = compress(&eb)?;
    debug!(
        ctrl = ctrl_block.len(),
        diff = diff_block.len(),
        extra = extra_block.len(),
        "patch blocks compressed"
    );

    let mut header = [0u8; 32];
    header[..8].copy_from_slice(MAGIC);
    write_int(ctrl_block.len() as i64, &mut header[8..16]);
    write_int(diff_block.len() as i64, &mut header[16..24]);
    write_int(new.len() as i64, &mut header[24..32]);

    let mut patch =
        Vec::with_capacity(32 + ctrl_block.len() + diff_block.len() + extra_block.len());
    patch.extend_from_slice(&header);
    patch.extend_from_slice(&ctrl_block);
    patch.extend_from_slice(&diff_block);
    patch.extend_from_slice(&extra_block);
    Ok(patch)
}

fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut enc = BzEncoder::new(Vec::new(), Compression::best());
    enc.write_all(data)?;
    Ok(enc.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num::read_int;
    use bzip2::read::BzDecoder;

    fn decode_blocks(patch: &[u8]) -> (Vec<[i64; 3]>, Vec<u8>, Vec<u8>) {
        let ctrl_len = read_int(patch[8..16].try_into().unwrap()) as usize;
        let diff_len = read_int(patch[16..24].try_into().unwrap()) as usize;

        let mut ctrl_raw = Vec::new();
        BzDecoder::new(&patch[32..32 + ctrl_len])
            .read_to_end(&mut ctrl_raw)
            .unwrap();
        let mut diff_raw = Vec::new();
        BzDecoder::new(&patch[32 + ctrl_len..32 + ctrl_len + diff_len])
            .read_to_end(&mut diff_raw)
            .unwrap();
        let mut extra_raw = Vec::new();
        BzDecoder::new(&patch[32 + ctrl_len + diff_len..])
            .read_to_end(&mut extra_raw)
            .unwrap();

        assert_eq!(ctrl_raw.len() % 24, 0);
        let triples = ctrl_raw
            .chunks_exact(24)
            .map(|c| {
                [
                    read_int(c[..8].try_into().unwrap()),
                    read_int(c[8..16].try_into().unwrap()),
                    read_int(c[16..24].try_into().unwrap()),
                ]
            })
            .collect();
        (triples, diff_raw, extra_raw)
    }

    #[test]
    fn header_declares_new_size() {
        let patch = diff(b"abc", b"abcdef").unwrap();
        assert_eq!(&patch[..8], MAGIC);
        assert_eq!(read_int(patch[24..32].try_into().unwrap()), 6);
    }

    #[test]
    fn empty_old_goes_through_extra() {
        let patch = diff(b"", b"Hello").unwrap();
        let (triples, diff_raw, extra_raw) = decode_blocks(&patch);

        assert_eq!(triples, vec![[0, 5, 0]]);
        assert!(diff_raw.is_empty());
        assert_eq!(extra_raw, b"Hello");
    }

    #[test]
    fn empty_new_emits_no_segments() {
        let patch = diff(b"old data", b"").unwrap();
        let (triples, diff_raw, extra_raw) = decode_blocks(&patch);

        assert!(triples.is_empty());
        assert!(diff_raw.is_empty());
        assert!(extra_raw.is_empty());
        assert_eq!(read_int(patch[24..32].try_into().unwrap()), 0);
    }

    #[test]
    fn single_byte_edit_is_one_additive_segment() {
        let patch = diff(b"abcdefghij", b"abcXefghij").unwrap();
        let (triples, diff_raw, extra_raw) = decode_blocks(&patch);

        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0][0], 10);
        assert_eq!(triples[0][1], 0);
        assert!(extra_raw.is_empty());
        assert_eq!(diff_raw.iter().filter(|&&b| b != 0).count(), 1);
        assert_eq!(diff_raw[3], b'X'.wrapping_sub(b'd'));
    }
}

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

//! Suffix sorting and longest-prefix search over the old data.
//!
//! The sorter is Larsson-Sadakane qsufsort: a bucket sort on the first byte
//! followed by doubling passes that refine groups of suffixes sharing a rank
//! at the current prefix length. Negative entries in the suffix array mark
//! runs of already-sorted suffixes; the outer walk merges adjacent runs so
//! each pass skips finished work. Expected cost is `O(n (log n)^2)`.

use std::cmp::Ordering;

/// Sorted suffix array over a byte string, covering all `n + 1` suffixes
/// including the empty one.
pub(crate) struct SuffixArray {
    ranks: Vec<isize>,
}

/// A prefix match of a query against some suffix of the old data.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Match {
    /// Start of the matched suffix in the old data.
    pub pos: usize,
    /// Shared prefix length.
    pub len: usize,
}

#[inline(always)]
fn usz(i: isize) -> usize {
    debug_assert!(i >= 0);
    i as usize
}

/// Count matching prefix bytes between two slices.
#[inline]
fn match_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

impl SuffixArray {
    /// Sort all suffixes of `old`.
    pub(crate) fn build(old: &[u8]) -> Self {
        let n = old.len();
        let mut sa = vec![0isize; n + 1];
        let mut rank = vec![0isize; n + 1];

        // Bucket sort on the first byte. After the shift, buckets[b] is the
        // rank slot just before b's bucket; the placement loop fills each
        // bucket left to right while rank[i] records the end-of-bucket slot.
        let mut buckets = [0usize; 256];
        for &b in old {
            buckets[b as usize] += 1;
        }
        for i in 1..256 {
            buckets[i] += buckets[i - 1];
        }
        for i in (1..256).rev() {
            buckets[i] = buckets[i - 1];
        }
        buckets[0] = 0;

        for (i, &b) in old.iter().enumerate() {
            buckets[b as usize] += 1;
            sa[buckets[b as usize]] = i as isize;
        }
        sa[0] = n as isize;
        for (i, &b) in old.iter().enumerate() {
            rank[i] = buckets[b as usize] as isize;
        }
        rank[n] = 0;

        // A bucket holding a single suffix is already in final position.
        for i in 1..256 {
            if buckets[i] == buckets[i - 1] + 1 {
                sa[buckets[i]] = -1;
            }
        }
        sa[0] = -1;

        // Doubling passes. A negative entry -k marks a run of k sorted
        // suffixes; a non-negative entry heads a group still sharing its
        // rank at prefix length h. Done when the whole array is one run.
        let mut h: isize = 1;
        while sa[0] != -(n as isize + 1) {
            let mut run: isize = 0;
            let mut i: isize = 0;
            while i <= n as isize {
                if sa[usz(i)] < 0 {
                    run -= sa[usz(i)];
                    i -= sa[usz(i)];
                } else {
                    if run != 0 {
                        sa[usz(i - run)] = -run;
                    }
                    let group = rank[usz(sa[usz(i)])] + 1 - i;
                    split(&mut sa, &mut rank, usz(i), usz(group), usz(h));
                    i += group;
                    run = 0;
                }
            }
            if run != 0 {
                sa[usz(i - run)] = -run;
            }
            h += h;
        }

        // Rebuild the array from the final ranks.
        for i in 0..=n {
            sa[usz(rank[i])] = i as isize;
        }

        SuffixArray { ranks: sa }
    }

    /// Longest prefix match of `query` against any suffix of `old`.
    pub(crate) fn longest_match(&self, old: &[u8], query: &[u8]) -> Match {
        self.search(old, query, 0, old.len())
    }

    /// Binary search over the rank interval `[lo, hi]`. The base case
    /// compares the two remaining endpoints and keeps whichever shares the
    /// longer prefix with `query`; the winner can be one rank away from the
    /// global optimum, which the diff scan tolerates.
    fn search(&self, old: &[u8], query: &[u8], lo: usize, hi: usize) -> Match {
        if hi - lo < 2 {
            let x = match_len(&old[usz(self.ranks[lo])..], query);
            let y = match_len(&old[usz(self.ranks[hi])..], query);
            if x > y {
                Match {
                    pos: usz(self.ranks[lo]),
                    len: x,
                }
            } else {
                Match {
                    pos: usz(self.ranks[hi]),
                    len: y,
                }
            }
        } else {
            let mid = lo + (hi - lo) / 2;
            let start = usz(self.ranks[mid]);
            let n = (old.len() - start).min(query.len());
            if old[start..start + n] < query[..n] {
                self.search(old, query, mid, hi)
            } else {
                self.search(old, query, lo, mid)
            }
        }
    }
}

/// Ternary-split sort of one rank group, keyed by the rank `h` positions
/// ahead. Groups shorter than 16 entries use a selection sort that peels off
/// equal-key sets; larger groups partition around the middle key, recurse on
/// the smaller-key side, give the equal-key set its new shared rank, and
/// tail-iterate on the larger-key side.
fn split(sa: &mut [isize], rank: &mut [isize], mut start: usize, mut len: usize, h: usize) {
    loop {
        if len < 16 {
            let mut k = start;
            while k < start + len {
                let mut j = 1;
                let mut x = rank[usz(sa[k]) + h];
                for i in 1..start + len - k {
                    let v = rank[usz(sa[k + i]) + h];
                    if v < x {
                        x = v;
                        j = 0;
                    }
                    if v == x {
                        sa.swap(k + j, k + i);
                        j += 1;
                    }
                }
                for idx in k..k + j {
                    rank[usz(sa[idx])] = (k + j - 1) as isize;
                }
                if j == 1 {
                    sa[k] = -1;
                }
                k += j;
            }
            return;
        }

        let x = rank[usz(sa[start + len / 2]) + h];
        let mut lt = 0;
        let mut eq = 0;
        for idx in start..start + len {
            let v = rank[usz(sa[idx]) + h];
            if v < x {
                lt += 1;
            }
            if v == x {
                eq += 1;
            }
        }
        let jj = start + lt;
        let kk = jj + eq;

        let mut i = start;
        let mut j = 0;
        let mut k = 0;
        while i < jj {
            match rank[usz(sa[i]) + h].cmp(&x) {
                Ordering::Less => i += 1,
                Ordering::Equal => {
                    sa.swap(i, jj + j);
                    j += 1;
                }
                Ordering::Greater => {
                    sa.swap(i, kk + k);
                    k += 1;
                }
            }
        }
        while jj + j < kk {
            if rank[usz(sa[jj + j]) + h] == x {
                j += 1;
            } else {
                sa.swap(jj + j, kk + k);
                k += 1;
            }
        }

        if jj > start {
            split(sa, rank, start, jj - start, h);
        }

        for idx in jj..kk {
            rank[usz(sa[idx])] = (kk - 1) as isize;
        }
        if jj == kk - 1 {
            sa[jj] = -1;
        }

        if start + len > kk {
            len = start + len - kk;
            start = kk;
            continue;
        }
        return;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    /// The array must be a permutation of 0..=n with suffixes in
    /// non-decreasing lexicographic order.
    fn assert_sorted(old: &[u8]) {
        let sa = SuffixArray::build(old);
        let n = old.len();

        let mut seen = vec![false; n + 1];
        for &r in &sa.ranks {
            let r = usz(r);
            assert!(r <= n, "entry out of range");
            assert!(!seen[r], "duplicate entry {r}");
            seen[r] = true;
        }

        for w in sa.ranks.windows(2) {
            let a = &old[usz(w[0])..];
            let b = &old[usz(w[1])..];
            assert!(a <= b, "suffixes out of order: {a:?} > {b:?}");
        }
    }

    #[test]
    fn sorts_simple_strings() {
        assert_sorted(b"");
        assert_sorted(b"a");
        assert_sorted(b"banana");
        assert_sorted(b"mississippi");
        assert_sorted(b"abcabcabc");
        assert_sorted(&[0, 0, 0, 0, 0]);
        assert_sorted(&[255, 0, 255, 0, 1]);
    }

    #[test]
    fn sorts_random_data() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut data = vec![0u8; 2048];
        rng.fill(&mut data[..]);
        assert_sorted(&data);

        // Low-entropy data stresses the group refinement.
        let mut runs = vec![0u8; 2048];
        for chunk in runs.chunks_mut(64) {
            chunk.fill(rng.gen_range(0..4));
        }
        assert_sorted(&runs);
    }

    #[test]
    fn match_len_basic() {
        assert_eq!(match_len(b"hello", b"hello"), 5);
        assert_eq!(match_len(b"hello", b"help"), 3);
        assert_eq!(match_len(b"hello", b"world"), 0);
        assert_eq!(match_len(b"", b"hello"), 0);
        assert_eq!(match_len(b"hello", b""), 0);
    }

    #[test]
    fn search_finds_substring() {
        let old = b"the quick brown fox jumps over the lazy dog";
        let sa = SuffixArray::build(old);

        let m = sa.longest_match(old, b"brown");
        assert_eq!(m.len, 5);
        assert_eq!(&old[m.pos..m.pos + 5], b"brown");

        let m = sa.longest_match(old, b"lazy dogs bark");
        assert_eq!(m.len, 8);
        assert_eq!(&old[m.pos..m.pos + 8], b"lazy dog");
    }

    #[test]
    fn search_with_no_common_bytes() {
        let old = b"aaaa";
        let sa = SuffixArray::build(old);
        let m = sa.longest_match(old, b"zzz");
        assert_eq!(m.len, 0);
    }

    #[test]
    fn search_empty_old() {
        let sa = SuffixArray::build(b"");
        let m = sa.longest_match(b"", b"anything");
        assert_eq!(m.len, 0);
        assert_eq!(m.pos, 0);
    }
}

/*
 * compress/matchfinder.rs
 *
 * LZ77 match finders, ported from libdeflate's matchfinder_common.h. Unlike
 * the original, which finds matches against a sliding 32 KiB window and
 * periodically rebases position-relative links, this operates over a single
 * in-memory input buffer (the one-shot buffer API this crate exposes), so
 * positions are plain `usize` offsets from the start of the buffer and no
 * rebasing is ever needed.
 *
 * Three strategies, matching the three match finders named in
 * matchfinder_common.h / hc_matchfinder.h / bt_matchfinder.h:
 *   - `HashTable`: one candidate per hash bucket (level 1's "HT" finder).
 *   - `HashChain`: a full chain per bucket, walked up to a depth limit
 *     (levels 2-9's "HC" finder).
 *   - `BinaryTree`: a self-sorting binary tree per bucket that returns
 *     matches in increasing length order (levels 10-12's "BT" finder).
 */

use crate::deflate_constants::{DEFLATE_MAX_MATCH_LEN, DEFLATE_MIN_MATCH_LEN};

const HASH_ORDER: u32 = 15;
const HASH_SIZE: usize = 1 << HASH_ORDER;
const HASH_MULTIPLIER: u32 = 0x1E35A7BD;

#[inline]
fn lz_hash(seq: u32) -> usize {
    ((seq.wrapping_mul(HASH_MULTIPLIER)) >> (32 - HASH_ORDER)) as usize
}

#[inline]
fn load_u32(buf: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]])
}

/// Extend a match already known to be `start_len` bytes long as far as it
/// will go, up to `max_len`. Mirrors `lz_extend()`.
#[inline]
pub fn lz_extend(buf: &[u8], strpos: usize, matchpos: usize, start_len: usize, max_len: usize) -> usize {
    let mut len = start_len;
    while len < max_len && buf[matchpos + len] == buf[strpos + len] {
        len += 1;
    }
    len
}

#[derive(Clone, Copy, Debug)]
pub struct Match {
    pub length: u32,
    pub offset: u32,
}

/// Level 1's single-candidate-per-bucket finder.
pub struct HashTableMatchFinder {
    table: Vec<i64>,
}

impl HashTableMatchFinder {
    pub fn new() -> Self {
        Self {
            table: vec![-1; HASH_SIZE],
        }
    }

    /// Look up and replace the candidate at `pos`'s hash bucket. Returns the
    /// previous occupant, if any and if still within the 32 KiB window.
    pub fn advance(&mut self, buf: &[u8], pos: usize) -> Option<usize> {
        if pos + 4 > buf.len() {
            return None;
        }
        let h = lz_hash(load_u32(buf, pos));
        let prev = self.table[h];
        self.table[h] = pos as i64;
        if prev >= 0 && pos - prev as usize <= DEFLATE_MAX_MATCH_OFFSET {
            Some(prev as usize)
        } else {
            None
        }
    }

    pub fn find_match(&mut self, buf: &[u8], pos: usize) -> Option<Match> {
        let cand = self.advance(buf, pos)?;
        let max_len = (buf.len() - pos).min(DEFLATE_MAX_MATCH_LEN);
        if max_len < DEFLATE_MIN_MATCH_LEN {
            return None;
        }
        let len = lz_extend(buf, pos, cand, 0, max_len);
        if len >= DEFLATE_MIN_MATCH_LEN {
            Some(Match {
                length: len as u32,
                offset: (pos - cand) as u32,
            })
        } else {
            None
        }
    }
}

const DEFLATE_MAX_MATCH_OFFSET: usize = crate::deflate_constants::DEFLATE_MAX_MATCH_OFFSET;

/// Levels 2-9's hash-chain finder: every position in a bucket is linked to
/// the previous one via `prev`, so a lookup walks the whole chain (bounded
/// by a caller-supplied depth) instead of only the most recent candidate.
pub struct HashChainMatchFinder {
    head: Vec<i64>,
    prev: Vec<i64>,
}

impl HashChainMatchFinder {
    pub fn new(input_len: usize) -> Self {
        Self {
            head: vec![-1; HASH_SIZE],
            prev: vec![-1; input_len.max(1)],
        }
    }

    /// Insert `pos` into its hash bucket's chain without searching.
    pub fn insert(&mut self, buf: &[u8], pos: usize) {
        if pos + 4 > buf.len() {
            return;
        }
        let h = lz_hash(load_u32(buf, pos));
        self.prev[pos] = self.head[h];
        self.head[h] = pos as i64;
    }

    /// Find the longest match at `pos`, walking up to `max_depth` chain
    /// links, then insert `pos` into the chain for future lookups.
    pub fn find_and_insert(&mut self, buf: &[u8], pos: usize, max_depth: u32) -> Option<Match> {
        if pos + 4 > buf.len() {
            return None;
        }
        let max_len = (buf.len() - pos).min(DEFLATE_MAX_MATCH_LEN);
        let h = lz_hash(load_u32(buf, pos));

        let mut best: Option<Match> = None;
        if max_len >= DEFLATE_MIN_MATCH_LEN {
            let mut cand = self.head[h];
            let mut depth = max_depth;
            let mut best_len = DEFLATE_MIN_MATCH_LEN - 1;
            while cand >= 0 && depth > 0 {
                let cpos = cand as usize;
                if pos - cpos <= DEFLATE_MAX_MATCH_OFFSET {
                    if buf[cpos + best_len] == buf[pos + best_len] {
                        let len = lz_extend(buf, pos, cpos, 0, max_len);
                        if len > best_len {
                            best_len = len;
                            best = Some(Match {
                                length: len as u32,
                                offset: (pos - cpos) as u32,
                            });
                            if len >= max_len {
                                break;
                            }
                        }
                    }
                }
                cand = self.prev[cpos];
                depth -= 1;
            }
        }

        self.prev[pos] = self.head[h];
        self.head[h] = pos as i64;

        best
    }

    pub fn skip(&mut self, buf: &[u8], pos: usize) {
        self.insert(buf, pos);
    }
}

/// Levels 10-12's near-optimal finder: a per-bucket binary tree keyed by the
/// lexicographic order of the suffix at each position, which lets a lookup
/// prune whole subtrees instead of walking a flat chain. Returns every
/// distinct match length encountered on the way down, in increasing length
/// order, so the caller's optimal parser can weigh all of them.
pub struct BinaryTreeMatchFinder {
    head: Vec<i64>,
    // child[2*pos] = left child, child[2*pos+1] = right child
    child: Vec<i64>,
    max_depth: u32,
}

impl BinaryTreeMatchFinder {
    pub fn new(input_len: usize, max_depth: u32) -> Self {
        Self {
            head: vec![-1; HASH_SIZE],
            child: vec![-1; 2 * input_len.max(1)],
            max_depth,
        }
    }

    /// Find all distinct-length matches at `pos` (shortest to longest) and
    /// rebuild the tree so that `pos` becomes its bucket's new root.
    pub fn find_and_insert(&mut self, buf: &[u8], pos: usize, matches: &mut Vec<Match>) {
        matches.clear();
        if pos + 4 > buf.len() {
            return;
        }
        let max_len = (buf.len() - pos).min(DEFLATE_MAX_MATCH_LEN);
        let h = lz_hash(load_u32(buf, pos));

        let mut cur = self.head[h];
        self.head[h] = pos as i64;

        if max_len < DEFLATE_MIN_MATCH_LEN {
            self.child[2 * pos] = -1;
            self.child[2 * pos + 1] = -1;
            // Still must splice out the old root so we don't leak it,
            // but with no room for a match there's nothing more to do.
            return;
        }

        let mut best_len = DEFLATE_MIN_MATCH_LEN - 1;
        let mut left_ins = 2 * pos; // where to attach the next "str < cand" node
        let mut right_ins = 2 * pos + 1; // where to attach the next "str > cand" node
        let mut depth = self.max_depth;

        while cur >= 0 && depth > 0 {
            let cpos = cur as usize;
            if pos - cpos > DEFLATE_MAX_MATCH_OFFSET {
                break;
            }
            let len = lz_extend(buf, pos, cpos, 0, max_len);
            if len > best_len {
                best_len = len;
                matches.push(Match {
                    length: len as u32,
                    offset: (pos - cpos) as u32,
                });
                if len >= max_len {
                    // Exact match to end of buffer: candidate's whole subtree
                    // is now unreachable (we can't distinguish further), cut
                    // both children off here.
                    self.child[left_ins] = self.child[2 * cpos];
                    self.child[right_ins] = self.child[2 * cpos + 1];
                    return;
                }
            }

            if buf[cpos + len] < buf[pos + len] {
                // candidate's suffix sorts before ours: it (and its left
                // subtree, already < it) belongs under our left side.
                self.child[left_ins] = cur;
                left_ins = 2 * cpos + 1;
                cur = self.child[2 * cpos + 1];
            } else {
                self.child[right_ins] = cur;
                right_ins = 2 * cpos;
                cur = self.child[2 * cpos];
            }
            depth -= 1;
        }

        self.child[left_ins] = -1;
        self.child[right_ins] = -1;
    }

    pub fn skip(&mut self, buf: &[u8], pos: usize) {
        let mut scratch = Vec::new();
        self.find_and_insert(buf, pos, &mut scratch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_chain_finds_repeated_pattern() {
        let data = b"abcdefabcdefabcdef".to_vec();
        let mut mf = HashChainMatchFinder::new(data.len());
        let mut found_any = false;
        for pos in 0..data.len() {
            if let Some(m) = mf.find_and_insert(&data, pos, 32) {
                assert!(m.length as usize >= DEFLATE_MIN_MATCH_LEN);
                assert!(m.offset as usize <= pos);
                found_any = true;
            }
        }
        assert!(found_any);
    }

    #[test]
    fn hash_table_single_candidate_roundtrips_offset() {
        let data = b"xxxxabcxxxxabcxxxx".to_vec();
        let mut mf = HashTableMatchFinder::new();
        let mut matched = false;
        for pos in 0..data.len() {
            if let Some(m) = mf.find_match(&data, pos) {
                assert_eq!(&data[pos..pos + m.length as usize], &data[pos - m.offset as usize..pos - m.offset as usize + m.length as usize]);
                matched = true;
            }
        }
        assert!(matched);
    }

    #[test]
    fn binary_tree_returns_increasing_lengths() {
        let data = b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_vec();
        let mut mf = BinaryTreeMatchFinder::new(data.len(), 64);
        let mut matches = Vec::new();
        let mut saw_match = false;
        for pos in 0..data.len() {
            mf.find_and_insert(&data, pos, &mut matches);
            if !matches.is_empty() {
                saw_match = true;
                for w in matches.windows(2) {
                    assert!(w[0].length < w[1].length);
                }
            }
        }
        assert!(saw_match);
    }

    #[test]
    fn lz_extend_stops_at_mismatch() {
        let data = b"abcXdefabcYdef".to_vec();
        let len = lz_extend(&data, 7, 0, 0, 7);
        assert_eq!(len, 3); // "abc" matches, 'Y' != 'X'
    }
}

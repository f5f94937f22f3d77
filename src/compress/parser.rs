/*
 * compress/parser.rs
 *
 * Turns an input buffer into a sequence of literal/match tokens. Mirrors the
 * family of parsing strategies `deflate_compress.c` keys off compression
 * level: greedy for low levels, lazy (and "lazy with 2-position lookahead")
 * for middle levels, and a near-optimal minimum-cost-path search over the
 * binary-tree match finder's candidate lists for the top levels.
 */

use super::matchfinder::{BinaryTreeMatchFinder, HashChainMatchFinder, HashTableMatchFinder, Match};
use super::token::Token;
use super::tables::{DEFLATE_EXTRA_LENGTH_BITS, DEFLATE_LENGTH_SLOT, DEFLATE_EXTRA_OFFSET_BITS};
use super::tables::offset_slot;
use crate::deflate_constants::DEFLATE_MIN_MATCH_LEN;

/// Map from the number of distinct byte values seen in a block's lead-in to
/// a minimum match length: the more distinct literals there are, the more
/// expensive literals are likely to be, so short matches become worthwhile.
/// Indices beyond the table are implicitly 3 (`DEFLATE_MIN_MATCH_LEN`).
const MIN_MATCH_LEN_BY_NUM_USED_LITERALS: [u8; 80] = [
    9, 9, 9, 9, 9, 9, 8, 8, 7, 7, 6, 6, 6, 6, 6, 6, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5,
    5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
];

/// How far to scan ahead for the initial `num_used_literals` estimate.
const MIN_MATCH_LEN_SCAN_LEN: usize = 4096;

fn choose_min_match_len(num_used_literals: usize, max_search_depth: u32) -> usize {
    let mut min_len = MIN_MATCH_LEN_BY_NUM_USED_LITERALS
        .get(num_used_literals)
        .copied()
        .unwrap_or(DEFLATE_MIN_MATCH_LEN as u8) as usize;
    // A shallow search can't reliably find long matches; don't ask for one.
    if max_search_depth < 16 {
        min_len = if max_search_depth < 5 {
            min_len.min(4)
        } else if max_search_depth < 10 {
            min_len.min(5)
        } else {
            min_len.min(7)
        };
    }
    min_len
}

/// Scan the first `MIN_MATCH_LEN_SCAN_LEN` bytes of `data` and derive the
/// minimum match length the greedy/lazy parsers should require, per
/// `deflate_compress.c`'s `calculate_min_match_len`/`choose_min_match_len`.
fn calculate_min_match_len(data: &[u8], max_search_depth: u32) -> usize {
    let mut used = [false; 256];
    for &b in &data[..data.len().min(MIN_MATCH_LEN_SCAN_LEN)] {
        used[b as usize] = true;
    }
    let num_used_literals = used.iter().filter(|&&u| u).count();
    choose_min_match_len(num_used_literals, max_search_depth)
}

/// Store every byte as a literal, no match finding at all. Level 0.
pub fn parse_store(input: &[u8]) -> Vec<Token> {
    input.iter().map(|&b| Token::Literal(b)).collect()
}

/// Level 1: one hash-table candidate per position, take it unconditionally
/// if it meets the minimum match length.
pub fn parse_greedy_ht(input: &[u8]) -> Vec<Token> {
    let mut mf = HashTableMatchFinder::new();
    let mut tokens = Vec::with_capacity(input.len() / 2);
    let mut pos = 0usize;
    while pos < input.len() {
        if let Some(m) = mf.find_match(input, pos) {
            let end = (pos + m.length as usize).min(input.len());
            // HashTableMatchFinder has no "insert without searching" path;
            // skipping over a match's interior means calling find_match
            // purely for its side effect of updating the hash table.
            for p in pos + 1..end {
                let _ = mf.find_match(input, p);
            }
            tokens.push(Token::Match {
                length: m.length,
                offset: m.offset,
            });
            pos = end;
        } else {
            tokens.push(Token::Literal(input[pos]));
            pos += 1;
        }
    }
    tokens
}

/// Levels 2-4: greedy hash-chain parsing, shallow search depth.
pub fn parse_greedy_hc(input: &[u8], max_depth: u32) -> Vec<Token> {
    let mut mf = HashChainMatchFinder::new(input.len());
    let mut tokens = Vec::with_capacity(input.len() / 2);
    let min_len = calculate_min_match_len(input, max_depth);
    let mut pos = 0usize;
    while pos < input.len() {
        match mf.find_and_insert(input, pos, max_depth) {
            Some(m) if m.length as usize >= min_len => {
                for p in pos + 1..(pos + m.length as usize).min(input.len()) {
                    mf.skip(input, p);
                }
                tokens.push(Token::Match {
                    length: m.length,
                    offset: m.offset,
                });
                pos += m.length as usize;
            }
            _ => {
                tokens.push(Token::Literal(input[pos]));
                pos += 1;
            }
        }
    }
    tokens
}

/// Levels 5-7 ("lazy"): before taking a match at `pos`, peek at `pos + 1`;
/// if a strictly longer match starts there, emit a literal at `pos` instead
/// and let the next iteration take the better match.
pub fn parse_lazy(input: &[u8], max_depth: u32) -> Vec<Token> {
    parse_lazy_generic(input, max_depth, false)
}

/// Levels 8-9 ("lazy2"): same idea, but the lookahead also considers
/// `pos + 2` when `pos + 1`'s match did not already win, catching a class of
/// improving matches lazy parsing alone misses.
pub fn parse_lazy2(input: &[u8], max_depth: u32) -> Vec<Token> {
    parse_lazy_generic(input, max_depth, true)
}

fn parse_lazy_generic(input: &[u8], max_depth: u32, two_ahead: bool) -> Vec<Token> {
    let mut mf = HashChainMatchFinder::new(input.len());
    let mut tokens = Vec::with_capacity(input.len() / 2);
    let min_len = calculate_min_match_len(input, max_depth);
    let mut pos = 0usize;
    let mut pending = mf.find_and_insert(input, pos, max_depth);

    while pos < input.len() {
        let cur = pending.filter(|m| m.length as usize >= min_len);
        match cur {
            Some(m) => {
                let next_pos = pos + 1;
                let next = if next_pos < input.len() {
                    mf.find_and_insert(input, next_pos, max_depth)
                } else {
                    None
                };
                let next_better = next.map_or(false, |n| n.length > m.length);
                if next_better {
                    tokens.push(Token::Literal(input[pos]));
                    pos = next_pos;
                    pending = next;
                    continue;
                }
                if two_ahead && next_pos + 1 < input.len() {
                    let after = mf.find_and_insert(input, next_pos + 1, max_depth);
                    if after.map_or(false, |n| n.length > m.length + 1) {
                        tokens.push(Token::Literal(input[pos]));
                        pos = next_pos;
                        pending = next;
                        continue;
                    }
                }
                tokens.push(Token::Match {
                    length: m.length,
                    offset: m.offset,
                });
                let end = (pos + m.length as usize).min(input.len());
                let mut p = next_pos + 1;
                while p < end {
                    mf.skip(input, p);
                    p += 1;
                }
                pos = end;
                pending = if pos < input.len() {
                    mf.find_and_insert(input, pos, max_depth)
                } else {
                    None
                };
            }
            None => {
                tokens.push(Token::Literal(input[pos]));
                pos += 1;
                pending = if pos < input.len() {
                    mf.find_and_insert(input, pos, max_depth)
                } else {
                    None
                };
            }
        }
    }
    tokens
}

/*
 * Approximate bit cost of a literal/match, used by the near-optimal parser's
 * cost-to-end DP in lieu of true Huffman codeword lengths (which are not yet
 * known on a first pass). 9 bits/per-event is libdeflate's own coarse
 * literal/length estimate before the first real cost pass.
 */
const ESTIMATED_LITERAL_COST: u32 = 9;

#[inline]
fn estimated_match_cost(length: u32, offset: u32) -> u32 {
    let len_slot = DEFLATE_LENGTH_SLOT[length as usize] as usize;
    let off_slot = offset_slot(offset) as usize;
    9 + DEFLATE_EXTRA_LENGTH_BITS[len_slot] as u32 + 5 + DEFLATE_EXTRA_OFFSET_BITS[off_slot] as u32
}

/// Levels 10-12: near-optimal parsing. For each position, collect every
/// distinct match length the binary-tree finder offers, then run a
/// minimum-cost-path search over a bounded lookahead window, picking the
/// token sequence with the lowest total estimated bit cost.
pub fn parse_near_optimal(input: &[u8], max_depth: u32) -> Vec<Token> {
    let n = input.len();
    let mut mf = BinaryTreeMatchFinder::new(n, max_depth);
    let mut tokens = Vec::with_capacity(n / 2);
    let mut matches_buf = Vec::new();

    // Cost-to-end DP computed over a bounded window so the whole file need
    // not be buffered as one DP table; libdeflate uses a similar bounded
    // "optimal block" horizon internally.
    const WINDOW: usize = 4096;

    let mut pos = 0usize;
    while pos < n {
        let window_end = (pos + WINDOW).min(n);
        let window_len = window_end - pos;

        // cost[i] = minimum bits to encode input[pos+i .. window_end]
        // choice[i] = token taken at offset i to achieve that cost
        let mut cost = vec![u32::MAX; window_len + 1];
        let mut choice: Vec<Option<Token>> = vec![None; window_len];
        cost[window_len] = 0;

        // Precompute matches at every position in the window up front so the
        // backward DP pass can consult them without re-querying the finder
        // (which mutates its tree as positions are visited in order).
        let mut all_matches: Vec<Vec<Match>> = Vec::with_capacity(window_len);
        for i in 0..window_len {
            let p = pos + i;
            let max_len = (n - p).min(super::super::deflate_constants::DEFLATE_MAX_MATCH_LEN);
            mf.find_and_insert(input, p, &mut matches_buf);
            let mut ms: Vec<Match> = matches_buf
                .iter()
                .copied()
                .filter(|m| (m.length as usize) <= max_len)
                .collect();
            ms.retain(|m| (m.length as usize) <= window_end - p);
            all_matches.push(std::mem::take(&mut ms));
        }

        for i in (0..window_len).rev() {
            let lit_cost = ESTIMATED_LITERAL_COST + cost[i + 1];
            cost[i] = lit_cost;
            choice[i] = Some(Token::Literal(input[pos + i]));

            for m in &all_matches[i] {
                let len = m.length as usize;
                if i + len > window_len {
                    continue;
                }
                let c = estimated_match_cost(m.length, m.offset) + cost[i + len];
                if c < cost[i] {
                    cost[i] = c;
                    choice[i] = Some(Token::Match {
                        length: m.length,
                        offset: m.offset,
                    });
                }
            }
        }

        let mut i = 0usize;
        while i < window_len {
            let tok = choice[i].unwrap();
            let advance = match tok {
                Token::Literal(_) => 1,
                Token::Match { length, .. } => length as usize,
            };
            tokens.push(tok);
            i += advance;
        }

        pos = window_end;
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fewer_distinct_literals_raise_the_match_floor() {
        assert_eq!(choose_min_match_len(0, 64), 9);
        assert_eq!(choose_min_match_len(6, 64), 8);
        assert_eq!(choose_min_match_len(16, 64), 5);
        assert_eq!(choose_min_match_len(200, 64), 3);
    }

    #[test]
    fn shallow_search_depth_caps_the_match_floor() {
        assert_eq!(choose_min_match_len(0, 3), 4);
        assert_eq!(choose_min_match_len(0, 8), 5);
        assert_eq!(choose_min_match_len(0, 12), 7);
        assert_eq!(choose_min_match_len(0, 16), 9);
    }

    #[test]
    fn calculate_min_match_len_counts_only_the_first_scan_window() {
        // 16 distinct byte values within the scan window -> min_len 5.
        let mut data: Vec<u8> = (0..MIN_MATCH_LEN_SCAN_LEN).map(|i| (i % 16) as u8).collect();
        // Many more distinct values past the scan window; if these were
        // wrongly counted too, num_used_literals would jump past the point
        // where the table bottoms out at 3.
        data.extend((16u8..216).collect::<Vec<u8>>());
        assert_eq!(calculate_min_match_len(&data, 64), 5);
    }
}

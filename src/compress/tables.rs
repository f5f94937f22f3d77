/*
 * compress/tables.rs
 *
 * Static tables shared by the match-finder, parser, and block writer: the
 * length/offset slot (a.k.a. "symbol") assignment and the number of extra
 * bits each slot carries. Mirrors libdeflate's deflate_compress.c tables.
 */

use crate::deflate_constants::DEFLATE_MAX_MATCH_LEN;

pub const DEFLATE_NUM_LEN_SYMS: usize = 29;
pub const DEFLATE_NUM_OFFSET_SYMS: usize = 30;

pub const DEFLATE_LENGTH_SLOT_BASE: [u32; DEFLATE_NUM_LEN_SYMS] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 258,
];

pub const DEFLATE_EXTRA_LENGTH_BITS: [u8; DEFLATE_NUM_LEN_SYMS] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

pub const DEFLATE_OFFSET_SLOT_BASE: [u32; DEFLATE_NUM_OFFSET_SYMS] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];

pub const DEFLATE_EXTRA_OFFSET_BITS: [u8; DEFLATE_NUM_OFFSET_SYMS] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/* Table: match length => length slot, indexed directly by length. */
pub const DEFLATE_LENGTH_SLOT: [u8; DEFLATE_MAX_MATCH_LEN + 1] = build_length_slot_table();

const fn build_length_slot_table() -> [u8; DEFLATE_MAX_MATCH_LEN + 1] {
    let mut table = [0u8; DEFLATE_MAX_MATCH_LEN + 1];
    let mut slot = 0usize;
    let mut len = DEFLATE_LENGTH_SLOT_BASE[0] as usize;
    while len <= DEFLATE_MAX_MATCH_LEN {
        let next_base = if slot + 1 < DEFLATE_NUM_LEN_SYMS {
            DEFLATE_LENGTH_SLOT_BASE[slot + 1] as usize
        } else {
            usize::MAX
        };
        if len >= next_base && slot + 1 < DEFLATE_NUM_LEN_SYMS {
            slot += 1;
        }
        table[len] = slot as u8;
        len += 1;
    }
    table
}

/*
 * Map a match offset (1..=32768) to its offset slot. Mirrors the condensed
 * `deflate_offset_slot[512]` table from the original: offsets <= 256 use a
 * direct table, larger offsets are bucketed by their top bits.
 */
#[inline]
pub fn offset_slot(offset: u32) -> u8 {
    if offset as usize <= 256 {
        OFFSET_SLOT_LOW[offset as usize]
    } else {
        OFFSET_SLOT_HIGH[((offset as usize - 1) >> 7) & 0xFF]
    }
}

const fn build_offset_slot_tables() -> ([u8; 257], [u8; 256]) {
    let mut low = [0u8; 257];
    let mut high = [0u8; 256];
    let mut slot = 0usize;
    let mut off = 1usize;
    while off <= 256 {
        let next_base = if slot + 1 < DEFLATE_NUM_OFFSET_SYMS {
            DEFLATE_OFFSET_SLOT_BASE[slot + 1] as usize
        } else {
            usize::MAX
        };
        if off >= next_base && slot + 1 < DEFLATE_NUM_OFFSET_SYMS {
            slot += 1;
        }
        low[off] = slot as u8;
        off += 1;
    }
    let mut bucket = 0usize;
    let mut idx = 0usize;
    // high[idx] is looked up for offset where (offset-1)>>7 == idx, so its
    // representative must be the smallest such offset: idx*128 + 1.
    slot = low[256] as usize;
    while idx < 256 {
        let off_in_bucket = bucket * 128 + 1;
        let next_base = if slot + 1 < DEFLATE_NUM_OFFSET_SYMS {
            DEFLATE_OFFSET_SLOT_BASE[slot + 1] as usize
        } else {
            usize::MAX
        };
        if off_in_bucket >= next_base && slot + 1 < DEFLATE_NUM_OFFSET_SYMS {
            slot += 1;
        }
        high[idx] = slot as u8;
        idx += 1;
        bucket += 1;
    }
    (low, high)
}

const OFFSET_SLOT_TABLES: ([u8; 257], [u8; 256]) = build_offset_slot_tables();
const OFFSET_SLOT_LOW: [u8; 257] = OFFSET_SLOT_TABLES.0;
const OFFSET_SLOT_HIGH: [u8; 256] = OFFSET_SLOT_TABLES.1;

/* The order in which precode codeword lengths are stored in a block header. */
pub const DEFLATE_PRECODE_LENS_PERMUTATION: [u8; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_slot_matches_known_points() {
        assert_eq!(DEFLATE_LENGTH_SLOT[3], 0);
        assert_eq!(DEFLATE_LENGTH_SLOT[10], 7);
        assert_eq!(DEFLATE_LENGTH_SLOT[258], 28);
    }

    #[test]
    fn offset_slot_matches_known_points() {
        assert_eq!(offset_slot(1), 0);
        assert_eq!(offset_slot(2), 1);
        assert_eq!(offset_slot(4), 3);
        assert_eq!(offset_slot(257), 16);
        assert_eq!(offset_slot(300), 16);
        assert_eq!(offset_slot(384), 16);
        assert_eq!(offset_slot(385), 17);
        assert_eq!(offset_slot(513), 18);
        assert_eq!(offset_slot(24577), 29);
        assert_eq!(offset_slot(32768), 29);
    }

    #[test]
    fn every_high_bucket_offset_round_trips_through_its_base() {
        // Exhaustively check every offset whose slot is looked up through
        // OFFSET_SLOT_HIGH, not just the bucket boundaries.
        for offset in 257u32..=32768 {
            let slot = offset_slot(offset) as usize;
            let base = DEFLATE_OFFSET_SLOT_BASE[slot];
            let extra = DEFLATE_EXTRA_OFFSET_BITS[slot] as u32;
            assert!(
                offset >= base && offset < base + (1 << extra),
                "offset {offset} mis-slotted to {slot} (base {base}, extra {extra})"
            );
        }
    }

    #[test]
    fn every_length_in_range_has_a_valid_slot_and_base() {
        for len in 3..=DEFLATE_MAX_MATCH_LEN {
            let slot = DEFLATE_LENGTH_SLOT[len] as usize;
            let base = DEFLATE_LENGTH_SLOT_BASE[slot] as usize;
            let extra = DEFLATE_EXTRA_LENGTH_BITS[slot] as u32;
            assert!(len >= base && len < base + (1 << extra).max(1));
        }
    }

    #[test]
    fn every_offset_in_range_has_a_valid_slot_and_base() {
        for offset in [1u32, 2, 3, 4, 5, 100, 1000, 10_000, 32768] {
            let slot = offset_slot(offset) as usize;
            let base = DEFLATE_OFFSET_SLOT_BASE[slot];
            let extra = DEFLATE_EXTRA_OFFSET_BITS[slot] as u32;
            assert!(offset >= base && offset < base + (1 << extra));
        }
    }
}

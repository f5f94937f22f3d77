/*
 * compress/block_writer.rs
 *
 * Encodes one DEFLATE block (a token slice from the block splitter) to the
 * output bitstream, choosing whichever of stored / static Huffman / dynamic
 * Huffman produces the fewest bits, mirroring deflate_compress.c's
 * `deflate_flush_block()`.
 */

use super::bitwriter::BitWriter;
use super::huffman::{codewords_from_lengths, HuffmanCode};
use super::tables::{
    offset_slot, DEFLATE_EXTRA_LENGTH_BITS, DEFLATE_EXTRA_OFFSET_BITS, DEFLATE_LENGTH_SLOT,
    DEFLATE_PRECODE_LENS_PERMUTATION,
};
use super::token::Token;
use crate::deflate_constants::{
    DEFLATE_BLOCKTYPE_DYNAMIC_HUFFMAN, DEFLATE_BLOCKTYPE_STATIC_HUFFMAN,
    DEFLATE_BLOCKTYPE_UNCOMPRESSED, DEFLATE_END_OF_BLOCK, DEFLATE_MAX_PRE_CODEWORD_LEN,
    DEFLATE_NUM_LITLEN_SYMS, DEFLATE_NUM_OFFSET_SYMS, DEFLATE_NUM_PRECODE_SYMS,
};

/// A DEFLATE stored block's LEN/NLEN fields are 16 bits, so a single stored
/// block can carry at most this many bytes; longer runs need several
/// back-to-back stored blocks.
const MAX_STORED_BLOCK_LEN: usize = 0xFFFF;

/// Split `total` bytes into the chunk sizes `write_stored_block` will emit
/// one sub-block per, each `<= MAX_STORED_BLOCK_LEN`. Shared between the
/// cost estimate and the actual writer so they never disagree.
fn stored_chunk_lens(total: usize) -> Vec<usize> {
    if total == 0 {
        return vec![0];
    }
    let mut lens = Vec::with_capacity(total.div_ceil(MAX_STORED_BLOCK_LEN));
    let mut remaining = total;
    while remaining > 0 {
        let take = remaining.min(MAX_STORED_BLOCK_LEN);
        lens.push(take);
        remaining -= take;
    }
    lens
}

struct Freqs {
    litlen: [u32; DEFLATE_NUM_LITLEN_SYMS],
    offset: [u32; DEFLATE_NUM_OFFSET_SYMS],
}

fn gather_freqs(tokens: &[Token]) -> Freqs {
    let mut litlen = [0u32; DEFLATE_NUM_LITLEN_SYMS];
    let mut offset = [0u32; DEFLATE_NUM_OFFSET_SYMS];
    for tok in tokens {
        match *tok {
            Token::Literal(b) => litlen[b as usize] += 1,
            Token::Match { length, offset: off } => {
                let len_slot = DEFLATE_LENGTH_SLOT[length as usize] as usize;
                litlen[257 + len_slot] += 1;
                offset[offset_slot(off) as usize] += 1;
            }
        }
    }
    litlen[DEFLATE_END_OF_BLOCK] += 1;
    Freqs { litlen, offset }
}

/* Trim trailing zero-length codewords but always keep at least `min` entries. */
fn used_count(lens: &[u8], min: usize) -> usize {
    let mut n = lens.len();
    while n > min && lens[n - 1] == 0 {
        n -= 1;
    }
    n
}

struct DynamicCode {
    litlen: HuffmanCode,
    offset: HuffmanCode,
    num_litlen_syms: usize,
    num_offset_syms: usize,
    /* RLE-encoded precode symbol stream covering both code-length tables. */
    precode_syms: Vec<u8>,
    precode_extra: Vec<(u32, u32)>, // (extra bits value, extra bit count) per RLE symbol, if any
    precode_freqs: [u32; DEFLATE_NUM_PRECODE_SYMS],
}

fn build_dynamic_code(freqs: &Freqs) -> DynamicCode {
    // Offsets need at least 2 entries for the Huffman builder's general
    // path; a block with no matches at all still needs *some* offset code
    // in the header, so give symbol 0 a token frequency (as libdeflate does
    // by special-casing num_used_syms <= 1 inside the builder itself).
    let mut offset_freqs = freqs.offset;
    if offset_freqs.iter().all(|&f| f == 0) {
        offset_freqs[0] = 1;
    }

    let litlen = HuffmanCode::build(&freqs.litlen, 15);
    let offset = HuffmanCode::build(&offset_freqs, 15);

    let num_litlen_syms = used_count(&litlen.lens, 257);
    let num_offset_syms = used_count(&offset.lens, 1);

    let mut all_lens: Vec<u8> = Vec::with_capacity(num_litlen_syms + num_offset_syms);
    all_lens.extend_from_slice(&litlen.lens[..num_litlen_syms]);
    all_lens.extend_from_slice(&offset.lens[..num_offset_syms]);

    let (precode_syms, precode_extra, precode_freqs) = rle_encode_lens(&all_lens);

    DynamicCode {
        litlen,
        offset,
        num_litlen_syms,
        num_offset_syms,
        precode_syms,
        precode_extra,
        precode_freqs,
    }
}

/*
 * Run-length encode a sequence of Huffman codeword lengths into DEFLATE's
 * precode alphabet: literal lengths 0-15, 16 = "repeat previous 3-6 times",
 * 17 = "repeat zero 3-10 times", 18 = "repeat zero 11-138 times".
 */
fn rle_encode_lens(lens: &[u8]) -> (Vec<u8>, Vec<(u32, u32)>, [u32; DEFLATE_NUM_PRECODE_SYMS]) {
    let mut syms = Vec::new();
    let mut extra = Vec::new();
    let mut freqs = [0u32; DEFLATE_NUM_PRECODE_SYMS];

    let mut i = 0usize;
    while i < lens.len() {
        let val = lens[i];
        let mut run = 1usize;
        while i + run < lens.len() && lens[i + run] == val {
            run += 1;
        }

        if val == 0 {
            let mut remaining = run;
            while remaining > 0 {
                if remaining >= 11 {
                    let take = remaining.min(138);
                    syms.push(18);
                    extra.push(((take - 11) as u32, 7));
                    freqs[18] += 1;
                    remaining -= take;
                } else if remaining >= 3 {
                    let take = remaining.min(10);
                    syms.push(17);
                    extra.push(((take - 3) as u32, 3));
                    freqs[17] += 1;
                    remaining -= take;
                } else {
                    syms.push(0);
                    extra.push((0, 0));
                    freqs[0] += 1;
                    remaining -= 1;
                }
            }
        } else {
            syms.push(val);
            extra.push((0, 0));
            freqs[val as usize] += 1;
            let mut remaining = run - 1;
            while remaining >= 3 {
                let take = remaining.min(6);
                syms.push(16);
                extra.push(((take - 3) as u32, 2));
                freqs[16] += 1;
                remaining -= take;
            }
            for _ in 0..remaining {
                syms.push(val);
                extra.push((0, 0));
                freqs[val as usize] += 1;
            }
        }

        i += run;
    }

    (syms, extra, freqs)
}

/* Bits needed to write out the precode length table itself. */
fn precode_header_cost(precode_lens: &[u8; DEFLATE_NUM_PRECODE_SYMS]) -> (usize, u32) {
    let mut num_explicit = DEFLATE_NUM_PRECODE_SYMS;
    while num_explicit > 4 && precode_lens[DEFLATE_PRECODE_LENS_PERMUTATION[num_explicit - 1] as usize] == 0 {
        num_explicit -= 1;
    }
    (num_explicit, (num_explicit * 3) as u32)
}

fn body_cost_bits(tokens: &[Token], litlen_lens: &[u8], offset_lens: &[u8]) -> u64 {
    let mut bits: u64 = 0;
    for tok in tokens {
        match *tok {
            Token::Literal(b) => bits += litlen_lens[b as usize] as u64,
            Token::Match { length, offset } => {
                let len_slot = DEFLATE_LENGTH_SLOT[length as usize] as usize;
                let off_slot = offset_slot(offset) as usize;
                bits += litlen_lens[257 + len_slot] as u64
                    + DEFLATE_EXTRA_LENGTH_BITS[len_slot] as u64
                    + offset_lens[off_slot] as u64
                    + DEFLATE_EXTRA_OFFSET_BITS[off_slot] as u64;
            }
        }
    }
    bits + litlen_lens[DEFLATE_END_OF_BLOCK] as u64
}

fn static_litlen_lens() -> [u8; DEFLATE_NUM_LITLEN_SYMS] {
    let mut lens = [0u8; DEFLATE_NUM_LITLEN_SYMS];
    lens[0..144].fill(8);
    lens[144..256].fill(9);
    lens[256..280].fill(7);
    lens[280..288].fill(8);
    lens
}

fn static_offset_lens() -> [u8; DEFLATE_NUM_OFFSET_SYMS] {
    [5u8; DEFLATE_NUM_OFFSET_SYMS]
}

fn write_body(
    writer: &mut BitWriter,
    tokens: &[Token],
    litlen_lens: &[u8],
    litlen_codewords: &[u32],
    offset_lens: &[u8],
    offset_codewords: &[u32],
) {
    for tok in tokens {
        match *tok {
            Token::Literal(b) => {
                writer.write_bits(litlen_codewords[b as usize], litlen_lens[b as usize] as u32);
            }
            Token::Match { length, offset } => {
                let len_slot = DEFLATE_LENGTH_SLOT[length as usize] as usize;
                let off_slot = offset_slot(offset) as usize;
                let sym = 257 + len_slot;
                writer.write_bits(litlen_codewords[sym], litlen_lens[sym] as u32);
                let len_extra = DEFLATE_EXTRA_LENGTH_BITS[len_slot] as u32;
                if len_extra > 0 {
                    let base = super::tables::DEFLATE_LENGTH_SLOT_BASE[len_slot];
                    writer.write_bits(length - base, len_extra);
                }
                writer.write_bits(offset_codewords[off_slot], offset_lens[off_slot] as u32);
                let off_extra = DEFLATE_EXTRA_OFFSET_BITS[off_slot] as u32;
                if off_extra > 0 {
                    let base = super::tables::DEFLATE_OFFSET_SLOT_BASE[off_slot];
                    writer.write_bits(offset - base, off_extra);
                }
            }
        }
    }
    writer.write_bits(litlen_codewords[DEFLATE_END_OF_BLOCK], litlen_lens[DEFLATE_END_OF_BLOCK] as u32);
}

/// Encode `tokens` (one block's worth) plus the raw `block_bytes` it came
/// from (needed only for the stored-block fallback) onto `writer`. `is_final`
/// sets BFINAL.
pub fn write_block(writer: &mut BitWriter, tokens: &[Token], block_bytes: &[u8], is_final: bool) {
    let freqs = gather_freqs(tokens);

    let dynamic = build_dynamic_code(&freqs);
    let precode_code = HuffmanCode::build(&dynamic.precode_freqs, 7);
    let mut precode_lens19 = [0u8; DEFLATE_NUM_PRECODE_SYMS];
    for (sym, &len) in precode_code.lens.iter().enumerate() {
        precode_lens19[sym] = len;
    }
    let (num_explicit_precode, precode_header_bits) = precode_header_cost(&precode_lens19);
    let precode_codewords = &precode_code.codewords;

    let precode_body_bits: u64 = dynamic
        .precode_syms
        .iter()
        .zip(dynamic.precode_extra.iter())
        .map(|(&s, &(_, extra_bits))| precode_code.lens[s as usize] as u64 + extra_bits as u64)
        .sum();

    let dynamic_bits: u64 = 3 /* BFINAL+BTYPE */
        + 5 + 5 + 4
        + precode_header_bits as u64
        + precode_body_bits
        + body_cost_bits(tokens, &dynamic.litlen.lens, &dynamic.offset.lens);

    let static_litlen = static_litlen_lens();
    let static_offset = static_offset_lens();
    let static_bits: u64 = 3 + body_cost_bits(tokens, &static_litlen, &static_offset);

    let stored_bits: u64 = {
        let mut bits_used_mod8 = writer.bits_used() % 8;
        let mut total = 0u64;
        for len in stored_chunk_lens(block_bytes.len()) {
            let pad_to_byte = (8 - (bits_used_mod8 + 3) % 8) % 8;
            total += (3 + pad_to_byte + 32 + len * 8) as u64;
            bits_used_mod8 = 0; // every sub-block ends byte-aligned
        }
        total
    };

    if stored_bits <= dynamic_bits && stored_bits <= static_bits {
        write_stored_block(writer, block_bytes, is_final);
    } else if static_bits <= dynamic_bits {
        writer.write_bits(is_final as u32, 1);
        writer.write_bits(DEFLATE_BLOCKTYPE_STATIC_HUFFMAN, 2);
        let static_litlen_codewords = codewords_from_lengths(&static_litlen, 15);
        let static_offset_codewords = codewords_from_lengths(&static_offset, 15);
        write_body(
            writer,
            tokens,
            &static_litlen,
            &static_litlen_codewords,
            &static_offset,
            &static_offset_codewords,
        );
    } else {
        writer.write_bits(is_final as u32, 1);
        writer.write_bits(DEFLATE_BLOCKTYPE_DYNAMIC_HUFFMAN, 2);
        writer.write_bits((dynamic.num_litlen_syms - 257) as u32, 5);
        writer.write_bits((dynamic.num_offset_syms - 1) as u32, 5);
        writer.write_bits((num_explicit_precode - 4) as u32, 4);

        for i in 0..num_explicit_precode {
            writer.write_bits(
                precode_lens19[DEFLATE_PRECODE_LENS_PERMUTATION[i] as usize] as u32,
                3,
            );
        }

        for (&sym, &(extra_val, extra_bits)) in dynamic.precode_syms.iter().zip(dynamic.precode_extra.iter()) {
            writer.write_bits(precode_codewords[sym as usize], precode_code.lens[sym as usize] as u32);
            if extra_bits > 0 {
                writer.write_bits(extra_val, extra_bits);
            }
        }

        write_body(
            writer,
            tokens,
            &dynamic.litlen.lens,
            &dynamic.litlen.codewords,
            &dynamic.offset.lens,
            &dynamic.offset.codewords,
        );
    }
}

/// Stored blocks cap LEN at 16 bits; emit one sub-block per
/// `MAX_STORED_BLOCK_LEN`-sized chunk, only the last of which carries the
/// caller's `is_final`.
fn write_stored_block(writer: &mut BitWriter, block_bytes: &[u8], is_final: bool) {
    let chunk_lens = stored_chunk_lens(block_bytes.len());
    let num_chunks = chunk_lens.len();
    let mut pos = 0usize;
    for (i, chunk_len) in chunk_lens.into_iter().enumerate() {
        let chunk_final = is_final && i + 1 == num_chunks;
        writer.write_bits(chunk_final as u32, 1);
        writer.write_bits(DEFLATE_BLOCKTYPE_UNCOMPRESSED, 2);
        writer.align();
        let len = chunk_len as u16;
        writer.write_bytes(&len.to_le_bytes());
        writer.write_bytes(&(!len).to_le_bytes());
        writer.write_bytes(&block_bytes[pos..pos + chunk_len]);
        pos += chunk_len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rle_round_trip_reconstructs_original_lengths() {
        let lens: Vec<u8> = vec![
            3, 3, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 4, 4, 4, 4, 4, 4, 4, 0, 0, 0, 0, 0, 0, 0, 0,
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ];
        let (syms, extra, _freqs) = rle_encode_lens(&lens);

        let mut reconstructed = Vec::new();
        for (&s, &(val, _bits)) in syms.iter().zip(extra.iter()) {
            match s {
                0..=15 => reconstructed.push(s),
                16 => {
                    let rep = 3 + val;
                    let prev = *reconstructed.last().unwrap();
                    for _ in 0..rep {
                        reconstructed.push(prev);
                    }
                }
                17 => {
                    let rep = 3 + val;
                    for _ in 0..rep {
                        reconstructed.push(0);
                    }
                }
                18 => {
                    let rep = 11 + val;
                    for _ in 0..rep {
                        reconstructed.push(0);
                    }
                }
                _ => unreachable!(),
            }
        }
        assert_eq!(reconstructed, lens);
    }

    #[test]
    fn stored_block_chosen_for_incompressible_random_like_data() {
        // All-distinct bytes with no repeats: matches never help, and with so
        // few symbols used the block is short enough that stored wins.
        let data: Vec<u8> = (0u8..=255).collect();
        let tokens: Vec<Token> = data.iter().map(|&b| Token::Literal(b)).collect();
        let mut buf = vec![0u8; 4096];
        {
            let mut w = BitWriter::new(&mut buf);
            write_block(&mut w, &tokens, &data, true);
        }
        // Stored block header is 5 bytes (flag+len+nlen after alignment)
        // plus 256 literal bytes; dynamic/static Huffman framing would cost
        // more for totally flat frequencies over 256 distinct symbols.
        assert!(buf[0] & 1 == 1); // BFINAL set on single block
    }
}

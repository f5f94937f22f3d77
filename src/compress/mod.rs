/*
 * compress/mod.rs
 *
 * The DEFLATE encoder: chooses a parsing strategy by compression level,
 * tokenizes the input, splits the tokens into blocks, and writes each block
 * with whichever framing (stored/static/dynamic) is cheapest. Mirrors
 * deflate_compress.c's `libdeflate_deflate_compress()` dispatch.
 */

pub mod bitwriter;
pub mod block_splitter;
pub mod block_writer;
pub mod huffman;
pub mod matchfinder;
pub mod parser;
pub mod tables;
pub mod token;

use bitwriter::BitWriter;
use block_splitter::MIN_BLOCK_LENGTH;
use token::Token;

pub const LIBDEFLATE_MIN_COMPRESSION_LEVEL: u32 = 0;
pub const LIBDEFLATE_MAX_COMPRESSION_LEVEL: u32 = 12;

/// Extra bytes `deflate_compress_bound` reserves past `5 * num_blocks + in_nbytes`.
const OUTPUT_END_PADDING: usize = 0;

/// A reusable compressor for a single compression level. Matches the
/// teacher's allocate-once-reuse-many-times `LibdeflateDecodeTables` idiom on
/// the decode side.
pub struct Compressor {
    level: u32,
}

impl Compressor {
    pub fn new(level: u32) -> Self {
        debug_assert!(level <= LIBDEFLATE_MAX_COMPRESSION_LEVEL);
        Self { level }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Worst-case output size for `in_nbytes` input bytes at this
    /// compressor's level (same for every level: fully-stored blocks bound
    /// all strategies).
    pub fn compress_bound(&self, in_nbytes: usize) -> usize {
        let max_num_blocks = in_nbytes.div_ceil(MIN_BLOCK_LENGTH).max(1);
        5 * max_num_blocks + in_nbytes + 1 + OUTPUT_END_PADDING
    }

    fn tokenize(&self, input: &[u8]) -> Vec<Token> {
        match self.level {
            0 => parser::parse_store(input),
            1 => parser::parse_greedy_ht(input),
            2..=4 => parser::parse_greedy_hc(input, 2 + (self.level - 2) * 4),
            5..=7 => parser::parse_lazy(input, 16 + (self.level - 5) * 16),
            8 | 9 => parser::parse_lazy2(input, 32 + (self.level - 8) * 32),
            _ => parser::parse_near_optimal(input, 48 + (self.level - 10) * 32),
        }
    }

    /// Compress `input` into `out`, returning the number of bytes written,
    /// or `None` if `out` was too small.
    pub fn compress(&self, input: &[u8], out: &mut [u8]) -> Option<usize> {
        if input.is_empty() {
            let mut writer = BitWriter::new(out);
            block_writer::write_block(&mut writer, &[], &[], true);
            return writer.finish();
        }

        let tokens = self.tokenize(input);
        let blocks = block_splitter::split_into_blocks(&tokens);

        let mut writer = BitWriter::new(out);
        let mut byte_pos = 0usize;
        let num_blocks = blocks.len();
        for (i, block_tokens) in blocks.iter().enumerate() {
            let block_byte_len: usize = block_tokens
                .iter()
                .map(|t| match t {
                    Token::Literal(_) => 1,
                    Token::Match { length, .. } => *length as usize,
                })
                .sum();
            let block_bytes = &input[byte_pos..byte_pos + block_byte_len];
            let is_final = i + 1 == num_blocks;
            block_writer::write_block(&mut writer, block_tokens, block_bytes, is_final);
            byte_pos += block_byte_len;
        }

        writer.finish()
    }
}

/// One-shot compression entry point: compress `input` into `out` at the
/// given level (0-12). Returns the number of bytes written to `out`, or
/// `None` if `out` was too small — call `deflate_compress_bound` first to
/// size the output buffer safely.
pub fn deflate_compress(level: u32, input: &[u8], out: &mut [u8]) -> Option<usize> {
    Compressor::new(level).compress(input, out)
}

/// Worst-case output size for compressing `in_nbytes` bytes at `level`.
pub fn deflate_compress_bound(level: u32, in_nbytes: usize) -> usize {
    Compressor::new(level).compress_bound(in_nbytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompress_deflate;
    use crate::streams::slice_input::SliceInput;
    use crate::streams::slice_output::SliceOutput;

    fn roundtrip(level: u32, data: &[u8]) {
        let bound = deflate_compress_bound(level, data.len());
        let mut compressed = vec![0u8; bound];
        let n = deflate_compress(level, data, &mut compressed).expect("compress fits bound");
        compressed.truncate(n);

        let mut decompressed = vec![0u8; data.len() + 64];
        let mut input = SliceInput::new(&compressed);
        let mut output = SliceOutput::new(&mut decompressed);
        decompress_deflate::decompress_deflate_slice(&mut input, &mut output)
            .unwrap_or_else(|e| panic!("level {level}: decompress failed: {e:?}"));
        let written = output.bytes_written();
        assert_eq!(&decompressed[..written], data, "level {level} roundtrip mismatch");
    }

    #[test]
    fn roundtrips_empty_input_at_every_level() {
        for level in 0..=LIBDEFLATE_MAX_COMPRESSION_LEVEL {
            roundtrip(level, &[]);
        }
    }

    #[test]
    fn roundtrips_short_text_at_every_level() {
        let data = b"the quick brown fox jumps over the lazy dog. the quick brown fox.";
        for level in 0..=LIBDEFLATE_MAX_COMPRESSION_LEVEL {
            roundtrip(level, data);
        }
    }

    #[test]
    fn roundtrips_highly_repetitive_data() {
        let data = vec![b'a'; 50_000];
        for level in [0, 1, 3, 6, 9, 12] {
            roundtrip(level, &data);
        }
    }

    #[test]
    fn roundtrips_pseudo_random_incompressible_data() {
        let mut state: u32 = 0x2545F491;
        let data: Vec<u8> = (0..20_000)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 16) as u8
            })
            .collect();
        for level in [0, 1, 6, 9] {
            roundtrip(level, &data);
        }
    }

    #[test]
    fn roundtrips_incompressible_data_spanning_multiple_stored_sub_blocks() {
        // Exceeds both a single stored block's 16-bit LEN cap (65535) and
        // the block splitter's soft block-length cap, forcing the stored
        // path to emit several back-to-back stored sub-blocks.
        let mut state: u32 = 0x9E3779B9;
        let data: Vec<u8> = (0..200_000)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 16) as u8
            })
            .collect();
        for level in [0, 1] {
            roundtrip(level, &data);
        }
    }

    #[test]
    fn compress_bound_is_never_exceeded() {
        let data = vec![0u8; 1_000_000];
        for level in [0, 6, 12] {
            let bound = deflate_compress_bound(level, data.len());
            let mut out = vec![0u8; bound];
            let n = deflate_compress(level, &data, &mut out).unwrap();
            assert!(n <= bound);
        }
    }
}

/*
 * deflate_constants.rs
 *
 * Constants from RFC 1951, mirrored from libdeflate's deflate_constants.h.
 */

pub const DEFLATE_BLOCKTYPE_UNCOMPRESSED: u32 = 0;
pub const DEFLATE_BLOCKTYPE_STATIC_HUFFMAN: u32 = 1;
pub const DEFLATE_BLOCKTYPE_DYNAMIC_HUFFMAN: u32 = 2;

pub const DEFLATE_MIN_MATCH_LEN: usize = 3;
pub const DEFLATE_MAX_MATCH_LEN: usize = 258;

pub const DEFLATE_MIN_MATCH_OFFSET: usize = 1;
pub const DEFLATE_MAX_MATCH_OFFSET: usize = 32768;

pub const DEFLATE_NUM_PRECODE_SYMS: usize = 19;
pub const DEFLATE_NUM_LITLEN_SYMS: usize = 288;
pub const DEFLATE_NUM_OFFSET_SYMS: usize = 32;

pub const DEFLATE_MAX_NUM_SYMS: usize = 288;

pub const DEFLATE_MAX_PRE_CODEWORD_LEN: usize = 7;
pub const DEFLATE_MAX_LITLEN_CODEWORD_LEN: usize = 15;
pub const DEFLATE_MAX_OFFSET_CODEWORD_LEN: usize = 15;
pub const DEFLATE_MAX_CODEWORD_LEN: usize = DEFLATE_MAX_LITLEN_CODEWORD_LEN;

/*
 * Worst-case number of output lengths generated by a single precode symbol:
 * presym 18 repeats zero up to 138 times, minus the 1 length already there.
 */
pub const DEFLATE_MAX_LENS_OVERRUN: usize = 137;

pub const DEFLATE_END_OF_BLOCK: usize = 256;

/* Litlen symbol at which length codes begin. */
pub const DEFLATE_FIRST_LEN_SYM: usize = 257;

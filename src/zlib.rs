/*
 * zlib_compress.c - compress with a zlib wrapper
 *
 * Originally public domain; changes after 2016-09-07 are copyrighted.
 *
 * Copyright 2016 Eric Biggers
 *
 * Permission is hereby granted, free of charge, to any person
 * obtaining a copy of this software and associated documentation
 * files (the "Software"), to deal in the Software without
 * restriction, including without limitation the rights to use,
 * copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the
 * Software is furnished to do so, subject to the following
 * conditions:
 *
 * The above copyright notice and this permission notice shall be
 * included in all copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
 * EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES
 * OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
 * NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT
 * HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY,
 * WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
 * FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR
 * OTHER DEALINGS IN THE SOFTWARE.
 */

use crate::checksums::adler32::adler32;
use crate::compress::{deflate_compress_bound, Compressor};
use crate::zlib_constants::*;

/// Worst-case output size for zlib-wrapping `in_nbytes` bytes at `level`.
pub fn zlib_compress_bound(level: u32, in_nbytes: usize) -> usize {
    ZLIB_MIN_OVERHEAD + deflate_compress_bound(level, in_nbytes)
}

fn flevel_for_level(level: u32) -> u8 {
    match level {
        0..=1 => ZLIB_FASTEST_COMPRESSION,
        2..=5 => ZLIB_FAST_COMPRESSION,
        6..=8 => ZLIB_DEFAULT_COMPRESSION,
        _ => ZLIB_SLOWEST_COMPRESSION,
    }
}

/// Compress `input` into a complete zlib stream in `out`, returning the
/// number of bytes written, or `None` if `out` was too small.
pub fn zlib_compress(level: u32, input: &[u8], out: &mut [u8]) -> Option<usize> {
    if out.len() < ZLIB_MIN_HEADER_SIZE {
        return None;
    }

    let cmf = (ZLIB_CINFO_32K_WINDOW << 4) | ZLIB_CM_DEFLATE;
    let flevel_bits = flevel_for_level(level) << 6;
    // FCHECK (the low 5 bits of FLG) is chosen so that CMF*256+FLG, as a
    // 16-bit big-endian integer, is a multiple of 31. FDICT is always 0
    // (no preset dictionary support), so only FCHECK needs solving for.
    let header_high = ((cmf as u16) << 8) | flevel_bits as u16;
    let fcheck = ((31 - (header_high % 31)) % 31) as u8;
    let flg = flevel_bits | fcheck;

    out[0] = cmf;
    out[1] = flg;

    let body_len = Compressor::new(level).compress(input, &mut out[ZLIB_MIN_HEADER_SIZE..])?;
    let footer_start = ZLIB_MIN_HEADER_SIZE + body_len;
    if out.len() < footer_start + ZLIB_FOOTER_SIZE {
        return None;
    }

    out[footer_start..footer_start + 4].copy_from_slice(&adler32(1, input).to_be_bytes());

    Some(footer_start + ZLIB_FOOTER_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompress_zlib::decompress_zlib_slice;
    use crate::streams::slice_input::SliceInput;
    use crate::streams::slice_output::SliceOutput;

    #[test]
    fn header_is_a_multiple_of_31() {
        let mut out = vec![0u8; zlib_compress_bound(6, 0)];
        zlib_compress(6, b"", &mut out).unwrap();
        let header = ((out[0] as u16) << 8) | out[1] as u16;
        assert_eq!(header % 31, 0);
    }

    #[test]
    fn roundtrips_through_decompressor() {
        let data = b"the quick brown fox jumps over the lazy dog";
        for level in [0, 1, 6, 9, 12] {
            let bound = zlib_compress_bound(level, data.len());
            let mut out = vec![0u8; bound];
            let n = zlib_compress(level, data, &mut out).unwrap();
            out.truncate(n);

            let mut decompressed = vec![0u8; data.len() + 64];
            let mut input = SliceInput::new(&out);
            let mut output = SliceOutput::new(&mut decompressed);
            decompress_zlib_slice(&mut input, &mut output).unwrap();
            assert_eq!(&decompressed[..output.bytes_written()], data);
        }
    }
}

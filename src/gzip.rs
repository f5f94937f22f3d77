/*
 * gzip_compress.c - compress with a gzip wrapper
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

use crate::checksums::crc32::crc32;
use crate::compress::{deflate_compress_bound, Compressor};
use crate::gzip_constants::*;

/// Worst-case output size for gzip-wrapping `in_nbytes` bytes at `level`.
pub fn gzip_compress_bound(level: u32, in_nbytes: usize) -> usize {
    GZIP_MIN_OVERHEAD + deflate_compress_bound(level, in_nbytes)
}

fn xfl_for_level(level: u32) -> u8 {
    if level < 2 {
        GZIP_XFL_FASTEST_COMPRESSION
    } else if level >= 8 {
        GZIP_XFL_SLOWEST_COMPRESSION
    } else {
        0
    }
}

/// Compress `input` into a complete gzip member in `out`, returning the
/// number of bytes written, or `None` if `out` was too small. Only the
/// fixed 10-byte header is emitted; the library leaves optional fields
/// (FNAME etc.) to the calling program, matching the original library's
/// division of labor with its CLI front end. The OS byte is always
/// `GZIP_OS_UNKNOWN`; the library has no reliable way to know what will
/// ultimately consume the stream.
pub fn gzip_compress(level: u32, input: &[u8], out: &mut [u8]) -> Option<usize> {
    if out.len() < GZIP_MIN_HEADER_SIZE {
        return None;
    }

    out[0] = GZIP_ID1;
    out[1] = GZIP_ID2;
    out[2] = GZIP_CM_DEFLATE;
    out[3] = 0; // FLG: no optional fields emitted by the library.
    out[4..8].copy_from_slice(&GZIP_MTIME_UNAVAILABLE.to_le_bytes());
    out[8] = xfl_for_level(level);
    out[9] = GZIP_OS_UNKNOWN;

    let body_len = Compressor::new(level).compress(input, &mut out[GZIP_MIN_HEADER_SIZE..])?;
    let footer_start = GZIP_MIN_HEADER_SIZE + body_len;
    if out.len() < footer_start + GZIP_FOOTER_SIZE {
        return None;
    }

    out[footer_start..footer_start + 4].copy_from_slice(&crc32(0, input).to_le_bytes());
    out[footer_start + 4..footer_start + 8]
        .copy_from_slice(&(input.len() as u32).to_le_bytes());

    Some(footer_start + GZIP_FOOTER_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompress_gzip::decompress_gzip_slice;
    use crate::streams::slice_input::SliceInput;
    use crate::streams::slice_output::SliceOutput;

    #[test]
    fn emits_well_formed_header_and_roundtrips() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let bound = gzip_compress_bound(6, data.len());
        let mut out = vec![0u8; bound];
        let n = gzip_compress(6, data, &mut out).unwrap();
        out.truncate(n);

        assert_eq!(out[0], GZIP_ID1);
        assert_eq!(out[1], GZIP_ID2);
        assert_eq!(out[2], GZIP_CM_DEFLATE);

        let mut decompressed = vec![0u8; data.len() + 64];
        let mut input = SliceInput::new(&out);
        let mut output = SliceOutput::new(&mut decompressed);
        decompress_gzip_slice(&mut input, &mut output).unwrap();
        assert_eq!(&decompressed[..output.bytes_written()], data);
    }

    #[test]
    fn empty_input_produces_the_canonical_byte_sequence() {
        let bound = gzip_compress_bound(6, 0);
        let mut out = vec![0u8; bound];
        let n = gzip_compress(6, b"", &mut out).unwrap();
        out.truncate(n);

        assert_eq!(
            out,
            [
                0x1F, 0x8B, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0x03, 0x00, 0x00,
                0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            ]
        );
    }

    #[test]
    fn empty_input_roundtrips() {
        let bound = gzip_compress_bound(1, 0);
        let mut out = vec![0u8; bound];
        let n = gzip_compress(1, &[], &mut out).unwrap();
        out.truncate(n);

        let mut decompressed = vec![0u8; 16];
        let mut input = SliceInput::new(&out);
        let mut output = SliceOutput::new(&mut decompressed);
        decompress_gzip_slice(&mut input, &mut output).unwrap();
        assert_eq!(output.bytes_written(), 0);
    }
}

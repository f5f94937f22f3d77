/*
 * zlib_decompress.c - decompress with a zlib wrapper
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

use crate::decompress_deflate::libdeflate_deflate_decompress;
use crate::zlib_constants::*;
use crate::{safety_check, DeflateInput, DeflateOutput, LibdeflateDecodeTables, LibdeflateError};

pub fn libdeflate_zlib_decompress<I: DeflateInput, O: DeflateOutput>(
    d: &mut LibdeflateDecodeTables,
    in_stream: &mut I,
    out_stream: &mut O,
) -> Result<(), LibdeflateError> {
    let cmf = in_stream.read_byte::<true>();
    let flg = in_stream.read_byte::<true>();
    safety_check!(in_stream.has_valid_bytes_slow());

    if (cmf & 0x0F) != ZLIB_CM_DEFLATE {
        return Err(LibdeflateError::BadData);
    }
    /* CMF and FLG, together interpreted as a 16-bit big-endian integer, must
     * be a multiple of 31. */
    if ((cmf as u16) * 256 + flg as u16) % 31 != 0 {
        return Err(LibdeflateError::BadData);
    }

    /* FDICT: dictionary preset is not supported. */
    if (flg & 0x20) != 0 {
        return Err(LibdeflateError::BadData);
    }

    let start = std::time::Instant::now();

    libdeflate_deflate_decompress(d, in_stream, out_stream)?;

    let result = out_stream
        .final_flush()
        .map_err(|_| LibdeflateError::InsufficientSpace)?;

    log::debug!(
        "zlib decompression finished in {:?}, {} bytes ({:.2} MB/s)",
        start.elapsed(),
        result.written,
        result.written as f64 / 1024.0 / 1024.0 / start.elapsed().as_secs_f64()
    );

    /* ADLER32 is stored big-endian, unlike gzip's little-endian CRC32. */
    let b0 = in_stream.read_byte::<true>();
    let b1 = in_stream.read_byte::<true>();
    let b2 = in_stream.read_byte::<true>();
    let b3 = in_stream.read_byte::<true>();
    let zlib_adler32 = u32::from_be_bytes([b0, b1, b2, b3]);

    if result.adler32 != zlib_adler32 {
        return Err(LibdeflateError::BadData);
    }

    Ok(())
}

/// One-shot entry point for decompressing a single zlib stream held
/// entirely in memory.
pub fn decompress_zlib_slice<I: DeflateInput, O: DeflateOutput>(
    in_stream: &mut I,
    out_stream: &mut O,
) -> Result<(), LibdeflateError> {
    let mut tables = crate::libdeflate_alloc_decode_tables();
    libdeflate_zlib_decompress(&mut tables, in_stream, out_stream)
}

// #![cfg_attr(debug_assertions, deny(warnings))]
pub mod bitstream;

pub mod checksums;
pub mod compress;
pub mod decode_blocks;
pub mod decompress_deflate;
pub mod decompress_gzip;
pub mod decompress_zlib;
mod decompress_utils;
mod deflate_constants;
pub mod gzip;
mod gzip_constants;
pub mod streams;
pub mod unchecked;
pub mod zlib;
mod zlib_constants;

#[macro_use]
extern crate static_assertions;

use crate::decompress_deflate::{
    decompress_deflate_slice, HuffmanDecodeStruct, OutStreamResult, FAST_TABLESIZE,
    LITLEN_SUBTABLESIZE, LITLEN_TABLESIZE, OFFSET_SUBTABLESIZE, OFFSET_TABLESIZE,
};
use crate::decompress_gzip::{decompress_gzip_slice, libdeflate_gzip_decompress};
use crate::decompress_utils::fast_decode_entry::FastDecodeEntry;
use crate::decompress_zlib::decompress_zlib_slice;
use crate::deflate_constants::DEFLATE_MAX_NUM_SYMS;
use crate::streams::deflate_chunked_buffer_input::DeflateChunkedBufferInput;
use crate::streams::deflate_chunked_buffer_output::DeflateChunkedBufferOutput;
use crate::streams::slice_input::SliceInput;
use crate::streams::slice_output::SliceOutput;
use crate::unchecked::UncheckedArray;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::mem::size_of;
use std::path::Path;

pub use crate::checksums::adler32::adler32;
pub use crate::checksums::crc32::crc32;
pub use crate::compress::{deflate_compress, deflate_compress_bound, Compressor};
pub use crate::gzip::{gzip_compress, gzip_compress_bound};
pub use crate::zlib::{zlib_compress, zlib_compress_bound};

/*
 * The main DEFLATE decompressor structure.  Since this implementation only
 * supports full buffer decompression, this structure does not store the entire
 * decompression state, but rather only some arrays that are too large to
 * comfortably allocate on the stack.
 */
pub struct LibdeflateDecodeTables {
    pub(crate) huffman_decode: HuffmanDecodeStruct,
    pub(crate) litlen_decode_table: UncheckedArray<FastDecodeEntry, LITLEN_TABLESIZE>,

    pub(crate) offset_decode_table: UncheckedArray<FastDecodeEntry, OFFSET_TABLESIZE>,

    pub(crate) fast_decode_table: UncheckedArray<FastDecodeEntry, FAST_TABLESIZE>,

    pub(crate) litlen_decode_subtable: UncheckedArray<FastDecodeEntry, LITLEN_SUBTABLESIZE>,
    pub(crate) offset_decode_subtable: UncheckedArray<FastDecodeEntry, OFFSET_SUBTABLESIZE>,

    /* used only during build_decode_table() */
    pub(crate) sorted_syms: UncheckedArray<u16, DEFLATE_MAX_NUM_SYMS>,
    pub(crate) static_codes_loaded: bool,
}

/*
 * Result of a call to libdeflate_deflate_decompress(),
 * libdeflate_zlib_decompress(), or libdeflate_gzip_decompress().
 */
#[derive(Debug)]
pub enum LibdeflateError {
    /* Decompressed failed because the compressed data was invalid, corrupt,
     * or otherwise unsupported.  */
    BadData = 1,

    /* A NULL 'actual_out_nbytes_ret' was provided, but the data would have
     * decompressed to fewer than 'out_nbytes_avail' bytes.  */
    ShortOutput = 2,

    /* The data would have decompressed to more than 'out_nbytes_avail'
     * bytes.  */
    InsufficientSpace = 3,
}

impl fmt::Display for LibdeflateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            LibdeflateError::BadData => "compressed data is invalid or corrupt",
            LibdeflateError::ShortOutput => "decompressed data is shorter than the output buffer",
            LibdeflateError::InsufficientSpace => "output buffer is too small",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for LibdeflateError {}

pub trait DeflateInput {
    const MAX_LOOK_BACK: usize = size_of::<usize>() * 2;
    const MAX_OVERREAD: usize = size_of::<usize>() * 2;

    unsafe fn get_le_word_no_advance(&mut self) -> usize;
    fn move_stream_pos<const REFILL: bool>(&mut self, amount: isize);
    fn get_stream_pos_mut(&mut self) -> &mut usize;
    fn tell_stream_pos(&self) -> usize;
    fn read<const REFILL: bool>(&mut self, out_data: &mut [u8]) -> usize;
    // Ensure that the current buffer has at least `Self::MAX_OVERREAD` elements. this function must never fail
    fn ensure_overread_length(&mut self);
    // Check if the stream buffer has at least Self::MAX_OVERREAD bytes remaining with either valid data or eof data
    fn has_readable_overread(&self) -> bool;
    fn has_valid_bytes_slow(&mut self) -> bool;
    fn read_exact_into<O: DeflateOutput>(&mut self, out_stream: &mut O, length: usize) -> bool;

    #[inline(always)]
    fn read_byte<const REFILL: bool>(&mut self) -> u8 {
        let mut byte = [0];
        self.read::<REFILL>(&mut byte);
        byte[0]
    }

    #[inline(always)]
    fn read_le_u16<const REFILL: bool>(&mut self) -> u16 {
        let mut bytes = [0, 0];
        self.read::<REFILL>(&mut bytes);
        u16::from_le_bytes(bytes)
    }

    #[inline(always)]
    fn read_le_u32<const REFILL: bool>(&mut self) -> u32 {
        let mut bytes = [0, 0, 0, 0];
        self.read::<REFILL>(&mut bytes);
        u32::from_le_bytes(bytes)
    }
}

pub trait DeflateOutput {
    const MAX_LOOK_BACK: usize = 32768;
    const OVERWRITE_MAX: usize = 16;

    fn has_writable_length(&mut self, length: usize) -> bool;
    fn flush_ensure_length(&mut self, length: usize) -> bool;

    fn get_output_ptr(&mut self) -> *mut u8;
    unsafe fn set_output_ptr(&mut self, ptr: *mut u8);

    /// A writable slice into the live output buffer, flushing first if
    /// necessary to make room. May be shorter than the caller wants; call
    /// repeatedly until the desired length has been copied.
    fn get_available_buffer(&mut self) -> &mut [u8];
    /// Mark `amount` bytes of the slice previously returned by
    /// `get_available_buffer` as written.
    unsafe fn advance_available_buffer_position(&mut self, amount: usize);

    fn final_flush(&mut self) -> Result<OutStreamResult, ()>;
}

pub fn libdeflate_alloc_decode_tables() -> LibdeflateDecodeTables {
    LibdeflateDecodeTables {
        huffman_decode: HuffmanDecodeStruct {
            lens: UncheckedArray::default(),
            precode_lens: UncheckedArray::default(),
            precode_decode_table: UncheckedArray::default(),
            fast_temp_litlen: Vec::with_capacity(FAST_TABLESIZE),
        },
        litlen_decode_table: UncheckedArray::default(),
        offset_decode_table: UncheckedArray::default(),
        fast_decode_table: UncheckedArray::default(),

        litlen_decode_subtable: UncheckedArray::default(),
        offset_decode_subtable: UncheckedArray::default(),

        sorted_syms: UncheckedArray::default(),
        static_codes_loaded: false,
    }
}

pub fn decompress_file_buffered(
    file: impl AsRef<Path>,
    func: impl FnMut(&[u8]) -> Result<(), ()>,
    buf_size: usize,
) -> Result<(), LibdeflateError> {
    let mut read_file = File::open(file).unwrap();
    let mut input_stream =
        DeflateChunkedBufferInput::new(|buf| read_file.read(buf).unwrap_or(0), buf_size);

    let mut output_stream = DeflateChunkedBufferOutput::new(func, buf_size);

    let mut decompressor = libdeflate_alloc_decode_tables();

    while {
        input_stream.ensure_overread_length();
        input_stream.has_valid_bytes_slow()
    } {
        libdeflate_gzip_decompress(&mut decompressor, &mut input_stream, &mut output_stream)?;
    }
    Ok(())
}

/// Decompress a complete, in-memory DEFLATE stream into `out`, returning
/// the number of bytes written. `out` must be large enough to hold the
/// whole decompressed result; use a generous estimate or grow-and-retry,
/// since unlike compression there is no general bound from the
/// compressed size alone.
pub fn deflate_decompress(input: &[u8], out: &mut [u8]) -> Result<usize, LibdeflateError> {
    let mut in_stream = SliceInput::new(input);
    let mut out_stream = SliceOutput::new(out);
    decompress_deflate_slice(&mut in_stream, &mut out_stream)?;
    Ok(out_stream.bytes_written())
}

/// Decompress a complete, in-memory zlib stream into `out`, verifying the
/// Adler-32 trailer. Returns the number of bytes written.
pub fn zlib_decompress(input: &[u8], out: &mut [u8]) -> Result<usize, LibdeflateError> {
    let mut in_stream = SliceInput::new(input);
    let mut out_stream = SliceOutput::new(out);
    decompress_zlib_slice(&mut in_stream, &mut out_stream)?;
    Ok(out_stream.bytes_written())
}

/// Decompress a complete, in-memory gzip member into `out`, verifying the
/// CRC-32 and ISIZE trailer fields. Returns the number of bytes written.
pub fn gzip_decompress(input: &[u8], out: &mut [u8]) -> Result<usize, LibdeflateError> {
    let mut in_stream = SliceInput::new(input);
    let mut out_stream = SliceOutput::new(out);
    decompress_gzip_slice(&mut in_stream, &mut out_stream)?;
    Ok(out_stream.bytes_written())
}

#[cfg(test)]
mod tests {
    use crate::{decompress_file_buffered, deflate_decompress, gzip_compress, zlib_decompress};
    use rayon::prelude::*;
    use std::io::Write;
    use std::sync::Mutex;

    #[test]
    fn decompress_file_buffered_drives_many_files_in_parallel() {
        let dir = std::env::temp_dir().join(format!("rdeflate-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let contents: Vec<Vec<u8>> = (0..16)
            .map(|i| format!("file {i}: the quick brown fox jumps over the lazy dog").into_bytes())
            .collect();

        let paths: Vec<_> = contents
            .iter()
            .enumerate()
            .map(|(i, data)| {
                let bound = gzip_compress_bound_for_test(data.len());
                let mut out = vec![0u8; bound];
                let n = gzip_compress(6, data, &mut out).unwrap();
                let path = dir.join(format!("{i}.gz"));
                std::fs::File::create(&path)
                    .unwrap()
                    .write_all(&out[..n])
                    .unwrap();
                path
            })
            .collect();

        paths.par_iter().enumerate().for_each(|(i, path)| {
            let collected = Mutex::new(Vec::new());
            decompress_file_buffered(
                path,
                |data| {
                    collected.lock().unwrap().extend_from_slice(data);
                    Ok(())
                },
                4096,
            )
            .unwrap();
            assert_eq!(collected.into_inner().unwrap(), contents[i]);
        });

        std::fs::remove_dir_all(&dir).unwrap();
    }

    fn gzip_compress_bound_for_test(len: usize) -> usize {
        crate::gzip_compress_bound(6, len) + 64
    }

    #[test]
    fn deflate_and_zlib_buffer_api_roundtrip() {
        let data = b"hello from the one-shot buffer API";

        let mut compressed = vec![0u8; crate::deflate_compress_bound(6, data.len())];
        let n = crate::deflate_compress(6, data, &mut compressed).unwrap();
        let mut decompressed = vec![0u8; data.len()];
        let written = deflate_decompress(&compressed[..n], &mut decompressed).unwrap();
        assert_eq!(&decompressed[..written], data);

        let mut zlib_out = vec![0u8; crate::zlib_compress_bound(6, data.len())];
        let n = crate::zlib_compress(6, data, &mut zlib_out).unwrap();
        let mut decompressed = vec![0u8; data.len()];
        let written = zlib_decompress(&zlib_out[..n], &mut decompressed).unwrap();
        assert_eq!(&decompressed[..written], data);
    }

    #[test]
    fn rejects_stored_block_with_mismatched_nlen() {
        // BFINAL=1, BTYPE=00 (stored) packed into the low 3 bits of the
        // first byte, then padding to a byte boundary, then a 4-byte
        // LEN/NLEN pair where NLEN is not the one's complement of LEN.
        let stream = [0b001u8, 0x05, 0x00, 0x05, 0x00, b'h', b'e', b'l', b'l', b'o'];
        let mut out = vec![0u8; 16];
        assert!(matches!(
            deflate_decompress(&stream, &mut out),
            Err(crate::LibdeflateError::BadData)
        ));
    }

    #[test]
    fn rejects_garbage_dynamic_block_header() {
        // BFINAL=1, BTYPE=10 (dynamic) followed by all-ones bits, which
        // yields a nonsensical HLIT/HDIST/HCLEN and precode code-length
        // sequence that can't build a valid Huffman table.
        let stream = [0xFFu8; 16];
        let mut out = vec![0u8; 16];
        assert!(deflate_decompress(&stream, &mut out).is_err());
    }
}

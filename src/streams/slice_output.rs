/*
 * streams/slice_output.rs
 *
 * `DeflateOutput` over a caller-supplied output slice, for the one-shot
 * `deflate_decompress`/`zlib_decompress`/`gzip_decompress` buffer API.
 * Same padded-buffer layout as `DeflateChunkedBufferOutput`
 * (`MAX_LOOK_BACK` zero bytes before the logical start so a corrupt match
 * offset can never walk the pointer before the allocation, `OVERWRITE_MAX`
 * slack bytes after the logical end for speculative word-sized writes), but
 * bounded to the caller's fixed capacity instead of an unboundedly
 * flushable sink: once that capacity is reached there is nothing further
 * to flush, so `has_writable_length`/`flush_ensure_length` simply report
 * exhaustion.
 */

use crate::checksums::adler32::adler32;
use crate::{DeflateOutput, OutStreamResult};
use crc32fast::Hasher;

pub struct SliceOutput<'a> {
    buffer: Box<[u8]>,
    last_usable_ptr: *mut u8,
    current_ptr: *mut u8,
    crc32: Hasher,
    out: &'a mut [u8],
}

impl<'a> SliceOutput<'a> {
    pub fn new(out: &'a mut [u8]) -> Self {
        let capacity = out.len();
        let mut buffer =
            vec![0u8; capacity + Self::MAX_LOOK_BACK + Self::OVERWRITE_MAX].into_boxed_slice();
        let buffer_start = buffer.as_mut_ptr();
        let (last_usable_ptr, current_ptr) = unsafe {
            (
                buffer_start.add(capacity + Self::MAX_LOOK_BACK),
                buffer_start.add(Self::MAX_LOOK_BACK),
            )
        };
        Self {
            buffer,
            last_usable_ptr,
            current_ptr,
            crc32: Hasher::new(),
            out,
        }
    }

    /// Number of logical bytes written so far.
    pub fn bytes_written(&self) -> usize {
        unsafe { self.current_ptr.offset_from(self.buffer.as_ptr()) as usize - Self::MAX_LOOK_BACK }
    }

    /// Copy the decompressed bytes back into the caller's slice. Idempotent.
    pub fn copy_out(&mut self) -> usize {
        let written = self.bytes_written();
        self.out[..written]
            .copy_from_slice(&self.buffer[Self::MAX_LOOK_BACK..Self::MAX_LOOK_BACK + written]);
        written
    }
}

impl<'a> DeflateOutput for SliceOutput<'a> {
    #[inline(always)]
    fn has_writable_length(&mut self, length: usize) -> bool {
        unsafe { self.current_ptr.add(length) <= self.last_usable_ptr }
    }

    fn flush_ensure_length(&mut self, length: usize) -> bool {
        // Nothing to flush to: `capacity` is the whole of the caller's
        // budget, so exhaustion here means the output is genuinely too
        // small for the decompressed data.
        self.has_writable_length(length)
    }

    #[inline(always)]
    fn get_output_ptr(&mut self) -> *mut u8 {
        self.current_ptr
    }

    #[inline(always)]
    unsafe fn set_output_ptr(&mut self, ptr: *mut u8) {
        self.current_ptr = ptr;
    }

    fn get_available_buffer(&mut self) -> &mut [u8] {
        unsafe {
            let avail = self.last_usable_ptr.offset_from(self.current_ptr) as usize;
            std::slice::from_raw_parts_mut(self.current_ptr, avail)
        }
    }

    #[inline(always)]
    unsafe fn advance_available_buffer_position(&mut self, amount: usize) {
        self.current_ptr = self.current_ptr.add(amount);
    }

    fn final_flush(&mut self) -> Result<OutStreamResult, ()> {
        let written = self.copy_out();
        self.crc32.update(&self.out[..written]);
        Ok(OutStreamResult {
            written,
            crc32: self.crc32.clone().finalize(),
            adler32: adler32(1, &self.out[..written]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_zero_bytes_written_initially() {
        let mut out = [0u8; 16];
        let output = SliceOutput::new(&mut out);
        assert_eq!(output.bytes_written(), 0);
    }

    #[test]
    fn writable_length_respects_caller_capacity() {
        let mut out = [0u8; 4];
        let mut output = SliceOutput::new(&mut out);
        assert!(output.has_writable_length(4));
        assert!(!output.has_writable_length(5));
    }

    #[test]
    fn copy_out_reflects_advanced_position() {
        let mut out = [0u8; 8];
        let mut output = SliceOutput::new(&mut out);
        let buf = output.get_available_buffer();
        buf[0] = b'h';
        buf[1] = b'i';
        unsafe {
            output.advance_available_buffer_position(2);
        }
        assert_eq!(output.bytes_written(), 2);
        let written = output.copy_out();
        assert_eq!(written, 2);
        assert_eq!(&out[..2], b"hi");
    }
}

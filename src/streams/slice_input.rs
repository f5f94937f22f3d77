/*
 * streams/slice_input.rs
 *
 * `DeflateInput` over a complete in-memory buffer, for the one-shot
 * `deflate_decompress`/`zlib_decompress`/`gzip_decompress` buffer API.
 * Structurally this is `DeflateChunkedBufferInput` with the refill callback
 * removed: the whole input is already resident, so "refilling" is simply
 * impossible once the real bytes are exhausted, and `MAX_OVERREAD` zero
 * bytes are appended once up front instead of being re-created per chunk.
 */

use crate::{DeflateInput, DeflateOutput};
use std::cmp::min;

pub struct SliceInput<'a> {
    /// `data` copied in, followed by `DeflateInput::MAX_OVERREAD` zero bytes.
    padded: Box<[u8]>,
    end_position: usize,
    overread_position_limit: usize,
    position: usize,
    _marker: std::marker::PhantomData<&'a ()>,
}

impl<'a> SliceInput<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        let mut padded = vec![0u8; data.len() + Self::MAX_OVERREAD].into_boxed_slice();
        padded[..data.len()].copy_from_slice(data);
        let overread_position_limit = data.len().saturating_sub(Self::MAX_OVERREAD);
        Self {
            padded,
            end_position: data.len(),
            overread_position_limit,
            position: 0,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<'a> DeflateInput for SliceInput<'a> {
    #[inline(always)]
    unsafe fn get_le_word_no_advance(&mut self) -> usize {
        usize::from_le_bytes(
            *(self.padded.as_ptr().add(self.position) as *const [u8; std::mem::size_of::<usize>()]),
        )
        .to_le()
    }

    #[inline(always)]
    fn move_stream_pos<const REFILL: bool>(&mut self, amount: isize) {
        self.position = self.position.wrapping_add_signed(amount);
    }

    fn get_stream_pos_mut(&mut self) -> &mut usize {
        &mut self.position
    }

    fn tell_stream_pos(&self) -> usize {
        self.position
    }

    #[inline(always)]
    fn read<const REFILL: bool>(&mut self, out_data: &mut [u8]) -> usize {
        let avail_bytes = min(out_data.len(), self.end_position.saturating_sub(self.position));
        out_data[..avail_bytes]
            .copy_from_slice(&self.padded[self.position..self.position + avail_bytes]);
        self.position += avail_bytes;
        avail_bytes
    }

    #[inline(always)]
    fn ensure_overread_length(&mut self) {
        // Nothing to refill: the whole buffer has been resident since
        // construction.
    }

    fn has_readable_overread(&self) -> bool {
        self.position <= self.overread_position_limit
    }

    fn has_valid_bytes_slow(&mut self) -> bool {
        self.position < self.end_position
    }

    #[inline(always)]
    fn read_exact_into<O: DeflateOutput>(&mut self, out_stream: &mut O, mut length: usize) -> bool {
        while length > 0 {
            let buffer = out_stream.get_available_buffer();
            let copyable = min(buffer.len(), length);
            if self.read::<true>(&mut buffer[0..copyable]) != copyable {
                return false;
            }
            unsafe {
                out_stream.advance_available_buffer_position(copyable);
            }
            length -= copyable;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_back_exactly_what_was_written() {
        let data = b"hello, world".to_vec();
        let mut input = SliceInput::new(&data);
        let mut out = [0u8; 5];
        assert_eq!(input.read::<true>(&mut out), 5);
        assert_eq!(&out, b"hello");
        assert_eq!(input.tell_stream_pos(), 5);
    }

    #[test]
    fn reports_exhaustion_past_end() {
        let data = b"ab".to_vec();
        let mut input = SliceInput::new(&data);
        let mut out = [0u8; 8];
        assert_eq!(input.read::<true>(&mut out), 2);
        assert!(!input.has_valid_bytes_slow());
    }
}

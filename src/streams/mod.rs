/*
 * streams/mod.rs
 *
 * DeflateInput/DeflateOutput implementations. The chunked-buffer streams
 * drive the callback-based `decompress_file_buffered` API; the slice
 * streams drive the one-shot in-memory `deflate_decompress`/`deflate_compress`
 * buffer API.
 */

pub mod deflate_chunked_buffer_input;
pub mod deflate_chunked_buffer_output;
pub mod slice_input;
pub mod slice_output;

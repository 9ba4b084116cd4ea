/*!
# `ImgSource` - Source Streams
*/

pub(super) mod buffer;
pub(super) mod file;
pub(super) mod incremental;

use crate::ImageError;
use std::sync::{
	Arc,
	Mutex,
};



/// # Shared Stream.
///
/// The source and its decoder(s) both hang onto the stream; decoders lock it
/// only for the duration of a read.
pub type SharedStream = Arc<Mutex<dyn SourceStream>>;



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Stream Type.
pub enum StreamType {
	/// # In-Memory Buffer.
	Buffer,

	/// # File.
	File,

	/// # Growable Incremental Buffer.
	Incremental,
}



/// # Source Stream.
///
/// Bytes with a cursor.
///
/// [`SourceStream::peek`] and [`SourceStream::read`] clamp the request to
/// whatever is left, so callers must compare the returned length with what
/// they asked for. [`SourceStream::peek_exact`] and
/// [`SourceStream::read_exact`] instead fail outright (without moving the
/// cursor) when too few bytes remain.
pub trait SourceStream: Send {
	/// # Peek.
	///
	/// Return up to `desired` bytes from the cursor without advancing it.
	/// Returns `None` if nothing is available.
	fn peek(&mut self, desired: usize) -> Option<&[u8]>;

	/// # Read.
	///
	/// Return up to `desired` bytes from the cursor, advancing it past them.
	/// Returns `None` if nothing is available.
	fn read(&mut self, desired: usize) -> Option<&[u8]>;

	/// # Tell.
	fn tell(&self) -> usize;

	/// # Seek.
	///
	/// Move the cursor to an absolute position, returning `false` if the
	/// position is beyond the end of the (currently available) data.
	fn seek(&mut self, pos: usize) -> bool;

	/// # Stream Size.
	///
	/// The number of bytes currently available.
	fn stream_size(&self) -> usize;

	/// # Stream Type.
	fn stream_type(&self) -> StreamType;

	/// # Peek Exact.
	///
	/// Fill `out` from the cursor without advancing it.
	fn peek_exact(&mut self, out: &mut [u8]) -> bool {
		match self.peek(out.len()) {
			Some(b) if b.len() == out.len() => {
				out.copy_from_slice(b);
				true
			},
			_ => false,
		}
	}

	/// # Read Exact.
	///
	/// Fill `out` from the cursor, advancing it.
	fn read_exact(&mut self, out: &mut [u8]) -> bool {
		self.peek_exact(out) && self.seek(self.tell() + out.len())
	}

	/// # Update Data.
	///
	/// Append more bytes. Only incremental streams support this.
	///
	/// ## Errors
	///
	/// The default implementation returns [`ImageError::DataUnsupport`].
	fn update_data(&mut self, _data: &[u8], _is_completed: bool) -> Result<(), ImageError> {
		Err(ImageError::DataUnsupport)
	}

	/// # Is Stream Completed?
	///
	/// Returns `false` while an incremental stream is still waiting on data.
	fn is_stream_completed(&self) -> bool { true }

	/// # Data Pointer.
	///
	/// The entire backing buffer, for in-memory streams.
	fn data_ptr(&self) -> Option<&[u8]> { None }
}



/// # Read At.
///
/// Read exactly `len` bytes starting at `pos`. The cursor is left after the
/// bytes on success and untouched on failure.
pub(crate) fn read_at(stream: &mut dyn SourceStream, pos: usize, len: usize) -> Option<Vec<u8>> {
	let old = stream.tell();
	if ! stream.seek(pos) { return None; }
	let mut out = vec![0_u8; len];
	if stream.read_exact(&mut out) { Some(out) }
	else {
		stream.seek(old);
		None
	}
}

/// # Read All.
///
/// Copy every available byte, borrowing the backing buffer when there is
/// one.
pub(crate) fn read_all(stream: &mut dyn SourceStream) -> Option<Vec<u8>> {
	if let Some(data) = stream.data_ptr() { return Some(data.to_vec()); }
	let size = stream.stream_size();
	read_at(stream, 0, size)
}



#[cfg(test)]
mod tests {
	use super::*;
	use crate::BufferSourceStream;

	#[test]
	fn t_helpers() {
		let mut stream = BufferSourceStream::from(vec![1_u8, 2, 3, 4, 5]);
		assert_eq!(read_at(&mut stream, 1, 2), Some(vec![2, 3]));
		assert_eq!(stream.tell(), 3);
		assert_eq!(read_at(&mut stream, 4, 2), None);
		assert_eq!(stream.tell(), 3, "Failure should not move the cursor.");
		assert_eq!(read_all(&mut stream), Some(vec![1, 2, 3, 4, 5]));
	}
}

/*!
# `ImgSource` - Incremental Stream
*/

use crate::ImageError;
use super::{
	SourceStream,
	StreamType,
};



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
/// # Incremental Mode.
pub enum IncrementalMode {
	/// # Each update carries everything received so far.
	FullData,

	#[default]
	/// # Each update carries only the new bytes.
	IncrementalData,
}



#[derive(Debug, Clone, Default)]
/// # Incremental Stream.
///
/// A buffer that grows as data arrives.
pub struct IncrementalSourceStream {
	/// # Data.
	data: Vec<u8>,

	/// # Cursor.
	pos: usize,

	/// # Mode.
	mode: IncrementalMode,

	/// # Done?
	completed: bool,
}

impl IncrementalSourceStream {
	#[must_use]
	/// # New.
	pub const fn new(mode: IncrementalMode) -> Self {
		Self {
			data: Vec::new(),
			pos: 0,
			mode,
			completed: false,
		}
	}
}

impl SourceStream for IncrementalSourceStream {
	fn peek(&mut self, desired: usize) -> Option<&[u8]> {
		let end = self.pos.saturating_add(desired).min(self.data.len());
		if desired == 0 || end <= self.pos { None }
		else { Some(&self.data[self.pos..end]) }
	}

	fn read(&mut self, desired: usize) -> Option<&[u8]> {
		let start = self.pos;
		let end = start.saturating_add(desired).min(self.data.len());
		if desired == 0 || end <= start { None }
		else {
			self.pos = end;
			Some(&self.data[start..end])
		}
	}

	#[inline]
	fn tell(&self) -> usize { self.pos }

	fn seek(&mut self, pos: usize) -> bool {
		if pos <= self.data.len() {
			self.pos = pos;
			true
		}
		else { false }
	}

	#[inline]
	fn stream_size(&self) -> usize { self.data.len() }

	#[inline]
	fn stream_type(&self) -> StreamType { StreamType::Incremental }

	/// # Update Data.
	///
	/// In [`IncrementalMode::IncrementalData`] mode the bytes are appended;
	/// in [`IncrementalMode::FullData`] mode they replace the buffer and must
	/// begin with everything received so far.
	fn update_data(&mut self, data: &[u8], is_completed: bool) -> Result<(), ImageError> {
		if self.completed {
			log::warn!("Data arrived after the stream was completed.");
			return Err(ImageError::SourceData);
		}

		match self.mode {
			IncrementalMode::IncrementalData => {
				self.data.try_reserve(data.len()).map_err(|_| ImageError::MallocAbnormal)?;
				self.data.extend_from_slice(data);
			},
			IncrementalMode::FullData => {
				if ! data.starts_with(&self.data) { return Err(ImageError::DataAbnormal); }
				let extra = &data[self.data.len()..];
				self.data.try_reserve(extra.len()).map_err(|_| ImageError::MallocAbnormal)?;
				self.data.extend_from_slice(extra);
			},
		}

		self.completed = is_completed;
		Ok(())
	}

	#[inline]
	fn is_stream_completed(&self) -> bool { self.completed }

	#[inline]
	fn data_ptr(&self) -> Option<&[u8]> { Some(&self.data) }
}



#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn t_incremental() {
		let mut stream = IncrementalSourceStream::new(IncrementalMode::IncrementalData);
		assert!(! stream.is_stream_completed());
		assert_eq!(stream.peek(1), None);

		assert!(stream.update_data(b"abc", false).is_ok());
		assert_eq!(stream.read(5), Some(&b"abc"[..]));
		assert!(stream.update_data(b"def", true).is_ok());
		assert!(stream.is_stream_completed());
		assert_eq!(stream.read(5), Some(&b"def"[..]));
		assert_eq!(stream.update_data(b"g", true), Err(ImageError::SourceData));
	}

	#[test]
	fn t_full_data() {
		let mut stream = IncrementalSourceStream::new(IncrementalMode::FullData);
		assert!(stream.update_data(b"ab", false).is_ok());
		assert!(stream.update_data(b"abcd", false).is_ok());
		assert_eq!(stream.stream_size(), 4);
		assert_eq!(stream.update_data(b"xbcde", false), Err(ImageError::DataAbnormal));
		assert!(stream.update_data(b"abcde", true).is_ok());
		assert_eq!(stream.data_ptr(), Some(&b"abcde"[..]));
	}
}

/*!
# `ImgSource` - Buffer Stream
*/

use super::{
	SourceStream,
	StreamType,
};



#[derive(Debug, Clone, Default)]
/// # Buffer Stream.
///
/// A fixed, in-memory source.
pub struct BufferSourceStream {
	/// # Data.
	data: Vec<u8>,

	/// # Cursor.
	pos: usize,
}

impl From<Vec<u8>> for BufferSourceStream {
	#[inline]
	fn from(data: Vec<u8>) -> Self { Self { data, pos: 0 } }
}

impl From<&[u8]> for BufferSourceStream {
	#[inline]
	fn from(data: &[u8]) -> Self { Self::from(data.to_vec()) }
}

impl SourceStream for BufferSourceStream {
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
	fn stream_type(&self) -> StreamType { StreamType::Buffer }

	#[inline]
	fn data_ptr(&self) -> Option<&[u8]> { Some(&self.data) }
}

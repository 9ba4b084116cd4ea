/*!
# `ImgSource` - File Stream
*/

use crate::ImageError;
use std::{
	fs::File,
	io::{
		Read,
		Seek,
		SeekFrom,
	},
	path::Path,
};
use super::{
	SourceStream,
	StreamType,
};



#[derive(Debug)]
/// # File Stream.
///
/// Reads are served from the file through a scratch buffer.
pub struct FileSourceStream {
	/// # File.
	file: File,

	/// # Total Size.
	size: usize,

	/// # Cursor.
	pos: usize,

	/// # Scratch.
	buf: Vec<u8>,
}

impl FileSourceStream {
	/// # Open.
	///
	/// ## Errors
	///
	/// Returns [`ImageError::SourceData`] if the file cannot be opened or is
	/// empty.
	pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ImageError> {
		let path = path.as_ref();
		let file = File::open(path).map_err(|e| {
			log::error!("Unable to open {}: {e}", path.display());
			ImageError::SourceData
		})?;
		let size = file.metadata()
			.ok()
			.and_then(|m| usize::try_from(m.len()).ok())
			.ok_or(ImageError::SourceData)?;
		if size == 0 { return Err(ImageError::SourceData); }

		Ok(Self {
			file,
			size,
			pos: 0,
			buf: Vec::new(),
		})
	}

	/// # Fill Scratch.
	///
	/// Load up to `desired` bytes from the cursor into the scratch buffer,
	/// returning how many were loaded.
	fn fill(&mut self, desired: usize) -> usize {
		let len = desired.min(self.size.saturating_sub(self.pos));
		if len == 0 { return 0; }

		self.buf.resize(len, 0);
		let Ok(pos) = u64::try_from(self.pos) else { return 0; };
		if
			self.file.seek(SeekFrom::Start(pos)).is_err() ||
			self.file.read_exact(&mut self.buf).is_err()
		{
			log::warn!("File read failed at offset {pos}.");
			self.buf.clear();
			return 0;
		}

		len
	}
}

impl SourceStream for FileSourceStream {
	fn peek(&mut self, desired: usize) -> Option<&[u8]> {
		let len = self.fill(desired);
		if len == 0 { None }
		else { Some(&self.buf[..len]) }
	}

	fn read(&mut self, desired: usize) -> Option<&[u8]> {
		let len = self.fill(desired);
		if len == 0 { None }
		else {
			self.pos += len;
			Some(&self.buf[..len])
		}
	}

	#[inline]
	fn tell(&self) -> usize { self.pos }

	fn seek(&mut self, pos: usize) -> bool {
		if pos <= self.size {
			self.pos = pos;
			true
		}
		else { false }
	}

	#[inline]
	fn stream_size(&self) -> usize { self.size }

	#[inline]
	fn stream_type(&self) -> StreamType { StreamType::File }
}



#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn t_file() {
		let path = concat!(env!("CARGO_MANIFEST_DIR"), "/skel/logo.bmp");
		let mut stream = FileSourceStream::open(path).expect("Missing fixture.");
		assert_eq!(stream.stream_size(), 1162);
		assert_eq!(stream.peek(2), Some(&b"BM"[..]));
		assert_eq!(stream.tell(), 0);
		assert_eq!(stream.read(2), Some(&b"BM"[..]));
		assert_eq!(stream.tell(), 2);

		assert!(stream.seek(1160));
		assert_eq!(stream.read(10).map(<[u8]>::len), Some(2));
		assert_eq!(stream.read(1), None);
		assert!(stream.data_ptr().is_none());

		assert!(FileSourceStream::open("/nope/not/here.bmp").is_err());
	}
}

/*!
# `ImgSource` - Incremental Pixel Maps
*/

use crate::{
	DecodeOptions,
	ImageDecodingState,
	ImageError,
	ImageSource,
	PixelMap,
};
use std::sync::Weak;



#[derive(Debug)]
/// # Incremental Pixel Map.
///
/// A pixel map that fills in as its (incremental) source receives data.
/// Call [`IncrementalPixelMap::promote_decoding`] after each update.
///
/// The map only holds a weak reference to its source; if the source goes
/// away first, further promotion fails with [`ImageError::SourceData`].
pub struct IncrementalPixelMap {
	/// # Source.
	source: Weak<ImageSource>,

	/// # Image Index.
	index: u32,

	/// # Options.
	opts: DecodeOptions,

	/// # Pixels.
	pixel_map: PixelMap,

	/// # State.
	state: ImageDecodingState,

	/// # Progress (0-100).
	progress: u8,

	/// # Terminal Error.
	error: Option<ImageError>,

	/// # Detached?
	detached: bool,
}

impl Drop for IncrementalPixelMap {
	fn drop(&mut self) { self.detach_from_decoding(); }
}

impl IncrementalPixelMap {
	/// # New.
	pub(crate) fn new(source: Weak<ImageSource>, index: u32, opts: DecodeOptions) -> Self {
		Self {
			source,
			index,
			opts,
			pixel_map: PixelMap::empty(),
			state: ImageDecodingState::Unresolved,
			progress: 0,
			error: None,
			detached: false,
		}
	}

	/// # Promote Decoding.
	///
	/// Decode whatever the source has to offer. Returns the state and
	/// progress (0-100) afterwards.
	///
	/// Once the image is done, or has failed, the session is released and
	/// subsequent calls just repeat the outcome.
	///
	/// ## Errors
	///
	/// Returns an error if decoding has failed, or the source is gone.
	pub fn promote_decoding(&mut self) -> Result<(ImageDecodingState, u8), ImageError> {
		match self.state {
			ImageDecodingState::ImageDecoded => return Ok((self.state, self.progress)),
			ImageDecodingState::ImageError =>
				return Err(self.error.unwrap_or(ImageError::DecodeFailed)),
			_ => {},
		}

		let Some(source) = self.source.upgrade() else {
			log::warn!("The source has already been dropped.");
			return Err(ImageError::SourceData);
		};

		match source.promote_decoding(self.index, &self.opts, &mut self.pixel_map) {
			Ok((state, progress)) => {
				self.state = state;
				self.progress = progress;
				if state == ImageDecodingState::ImageDecoded {
					source.detach_incremental_decoding(self.pixel_map.id());
					self.detached = true;
				}
				Ok((state, progress))
			},
			Err(e) => {
				self.state = ImageDecodingState::ImageError;
				self.error = Some(e);
				source.detach_incremental_decoding(self.pixel_map.id());
				self.detached = true;
				Err(e)
			},
		}
	}

	/// # Detach From Decoding.
	///
	/// Give up on the session, releasing its decoder. Safe to call more
	/// than once.
	pub fn detach_from_decoding(&mut self) {
		if ! self.detached {
			self.detached = true;
			if let Some(source) = self.source.upgrade() {
				source.detach_incremental_decoding(self.pixel_map.id());
			}
		}
	}
}

/// ## Getters.
impl IncrementalPixelMap {
	#[inline]
	#[must_use]
	/// # Pixel Map.
	///
	/// The pixels decoded so far. This may be empty, or only partially
	/// filled.
	pub const fn pixel_map(&self) -> &PixelMap { &self.pixel_map }

	#[must_use]
	/// # Into Pixel Map.
	pub fn into_pixel_map(mut self) -> PixelMap {
		self.detach_from_decoding();
		std::mem::take(&mut self.pixel_map)
	}

	#[inline]
	#[must_use]
	/// # Decoding State.
	pub const fn decoding_state(&self) -> ImageDecodingState { self.state }

	#[inline]
	#[must_use]
	/// # Decoding Progress (0-100).
	pub const fn decoding_progress(&self) -> u8 { self.progress }

	#[inline]
	#[must_use]
	/// # Image Index.
	pub const fn index(&self) -> u32 { self.index }
}

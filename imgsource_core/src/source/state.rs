/*!
# `ImgSource` - Source States
*/

use crate::{
	ImageDecoder,
	ImageError,
	ImageInfo,
	post::FinalOutputStep,
};
use std::fmt;



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
/// # Source Decoding State.
///
/// Where an [`ImageSource`](crate::ImageSource) is in working out what it
/// has been given. Success states only ever move forward.
pub enum SourceDecodingState {
	#[default]
	/// # Nothing Known Yet.
	Unresolved,

	/// # Stream Error (Terminal).
	SourceError,

	/// # Unknown Format (Terminal).
	UnknownFormat,

	/// # No Decoder (Terminal).
	UnsupportedFormat,

	/// # Format Recognized.
	FormatRecognized,

	/// # File Info Error (Terminal).
	FileInfoError,

	/// # File Info Decoded.
	FileInfoDecoded,
}

impl SourceDecodingState {
	#[must_use]
	/// # Terminal Error?
	pub const fn is_error(self) -> bool {
		matches!(
			self,
			Self::SourceError | Self::UnknownFormat | Self::UnsupportedFormat | Self::FileInfoError
		)
	}

	#[must_use]
	/// # As Error.
	///
	/// The error a terminal state keeps answering with.
	pub const fn as_error(self) -> Option<ImageError> {
		match self {
			Self::SourceError => Some(ImageError::SourceData),
			Self::UnknownFormat => Some(ImageError::UnknownFormat),
			Self::UnsupportedFormat => Some(ImageError::PluginCreateFailed),
			Self::FileInfoError => Some(ImageError::DecodeHeadAbnormal),
			_ => None,
		}
	}
}



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
/// # Source Info State.
pub enum SourceInfoState {
	/// # Stream Error.
	SourceError,

	#[default]
	/// # Waiting On Data.
	SourceIncomplete,

	/// # Unknown Format.
	UnknownFormat,

	/// # No Decoder.
	UnsupportedFormat,

	/// # File Info Error.
	FileInfoError,

	/// # File Info Parsed.
	FileInfoParsed,
}

impl From<SourceDecodingState> for SourceInfoState {
	fn from(src: SourceDecodingState) -> Self {
		match src {
			SourceDecodingState::Unresolved | SourceDecodingState::FormatRecognized => Self::SourceIncomplete,
			SourceDecodingState::SourceError => Self::SourceError,
			SourceDecodingState::UnknownFormat => Self::UnknownFormat,
			SourceDecodingState::UnsupportedFormat => Self::UnsupportedFormat,
			SourceDecodingState::FileInfoError => Self::FileInfoError,
			SourceDecodingState::FileInfoDecoded => Self::FileInfoParsed,
		}
	}
}



#[derive(Debug, Clone, Default, Eq, PartialEq)]
/// # Source Info.
pub struct SourceInfo {
	/// # Encoded Format (MIME).
	pub encoded_format: String,

	/// # Base Density.
	pub base_density: i32,

	/// # Top-Level Image Count.
	pub top_level_image_num: u32,

	/// # State.
	pub state: SourceInfoState,
}



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
/// # Image Decoding State.
pub enum ImageDecodingState {
	#[default]
	/// # Nothing Known Yet.
	Unresolved,

	/// # Header Error.
	BaseInfoError,

	/// # Header Parsed.
	BaseInfoParsed,

	/// # Decoding.
	ImageDecoding,

	/// # Decode Failed.
	ImageError,

	/// # Partially Decoded.
	PartialImage,

	/// # Decoded.
	ImageDecoded,
}

impl fmt::Display for ImageDecodingState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Unresolved => "unresolved",
			Self::BaseInfoError => "header error",
			Self::BaseInfoParsed => "header parsed",
			Self::ImageDecoding => "decoding",
			Self::ImageError => "error",
			Self::PartialImage => "partial",
			Self::ImageDecoded => "decoded",
		})
	}
}



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
/// # Image Decoding Status.
///
/// The cached per-index result of header parsing and decoding.
pub struct ImageDecodingStatus {
	/// # Info.
	pub image_info: ImageInfo,

	/// # State.
	pub image_state: ImageDecodingState,
}



/// # Incremental Decoding Context.
///
/// One in-flight incremental session. While the session is running it holds
/// the decoder; once it finishes or fails, the decoder is handed back and
/// only the outcome is remembered.
pub(crate) struct IncrementalDecodingContext {
	/// # Decoder (On Loan).
	pub(crate) decoder: Option<Box<dyn ImageDecoder>>,

	/// # State.
	pub(crate) state: ImageDecodingState,

	/// # Progress (0-100).
	pub(crate) progress: u8,

	/// # Terminal Error.
	pub(crate) error: Option<ImageError>,

	/// # Planned Post-Processing.
	pub(crate) step: FinalOutputStep,
}

impl fmt::Debug for IncrementalDecodingContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("IncrementalDecodingContext")
			.field("decoder", &self.decoder.is_some())
			.field("state", &self.state)
			.field("progress", &self.progress)
			.field("error", &self.error)
			.field("step", &self.step)
			.finish()
	}
}

impl IncrementalDecodingContext {
	/// # New.
	pub(crate) fn new(decoder: Box<dyn ImageDecoder>) -> Self {
		Self {
			decoder: Some(decoder),
			state: ImageDecodingState::BaseInfoParsed,
			progress: 0,
			error: None,
			step: FinalOutputStep::NoChange,
		}
	}
}



#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn t_order() {
		assert!(SourceDecodingState::Unresolved < SourceDecodingState::FormatRecognized);
		assert!(SourceDecodingState::FormatRecognized < SourceDecodingState::FileInfoDecoded);
		assert!(ImageDecodingState::BaseInfoParsed < ImageDecodingState::ImageDecoding);
		assert!(ImageDecodingState::BaseInfoError < ImageDecodingState::BaseInfoParsed);

		for s in [
			SourceDecodingState::SourceError,
			SourceDecodingState::UnknownFormat,
			SourceDecodingState::UnsupportedFormat,
			SourceDecodingState::FileInfoError,
		] {
			assert!(s.is_error());
			assert!(s.as_error().is_some());
		}
		assert!(! SourceDecodingState::FileInfoDecoded.is_error());
		assert_eq!(
			SourceInfoState::from(SourceDecodingState::FileInfoDecoded),
			SourceInfoState::FileInfoParsed,
		);
	}
}

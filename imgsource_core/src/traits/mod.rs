/*!
# `ImgSource` - Traits.
*/

use crate::{
	DecodeContext,
	DecodeOptions,
	ImageError,
	ImageInfo,
	ProgDecodeContext,
	SharedStream,
	Size,
};



/// # Format Agent.
///
/// Agents identify an encoded format from the first few bytes of a file.
pub trait FormatAgent: Send + Sync {
	/// # Format Type.
	///
	/// A MIME-like identifier, e.g. `"image/jpeg"`.
	fn format_type(&self) -> &str;

	/// # Header Size.
	///
	/// The number of bytes [`FormatAgent::check_format`] needs.
	fn header_size(&self) -> usize;

	/// # Check Format.
	///
	/// Returns `true` if the bytes look like this format. Implementations
	/// must return `false` if fewer than `header_size` bytes are supplied.
	fn check_format(&self, head: &[u8]) -> bool;
}



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd)]
/// # Decoder State.
///
/// The lifecycle every decoder walks through.
pub enum DecoderState {
	#[default]
	/// # No Source Yet.
	Undecided,

	/// # Source Bound.
	SourceInited,

	/// # Header Parsed.
	BaseInfoParsed,

	/// # Options Set; Ready to Decode.
	ImageDecoding,

	/// # Decode Failed.
	ImageError,

	/// # Decoded.
	ImageDecoded,
}



/// # Image Decoder.
///
/// This is implemented for each format capable of turning encoded bytes
/// into pixels.
///
/// The expected call order is `set_source`, `image_size`,
/// `set_decode_options`, then either `decode` or repeated calls to
/// `promote_incremental_decode`.
pub trait ImageDecoder: Send {
	/// # Set Source.
	///
	/// Bind the input stream, discarding any previous state.
	fn set_source(&mut self, stream: SharedStream);

	/// # Reset.
	///
	/// Forget everything but the source.
	fn reset(&mut self);

	/// # State.
	fn state(&self) -> DecoderState;

	/// # Image Size.
	///
	/// Parse the header (once) and return the dimensions of the image at
	/// `index`.
	///
	/// ## Errors
	///
	/// Returns [`ImageError::SourceDataIncomplete`] if more bytes are
	/// needed, [`ImageError::DecodeHeadAbnormal`] if the header is invalid,
	/// or [`ImageError::InvalidParameter`] if the index is out of range.
	fn image_size(&mut self, index: u32) -> Result<Size, ImageError>;

	/// # Set Decode Options.
	///
	/// Resolve the output format for the given options, returning the info
	/// the decoded pixels will have. If a decode has already happened, the
	/// decoder is reset first.
	///
	/// ## Errors
	///
	/// Returns any header errors, or an error if the options are invalid.
	fn set_decode_options(&mut self, index: u32, opts: &DecodeOptions)
	-> Result<ImageInfo, ImageError>;

	/// # Decode.
	///
	/// Decode the image into the context, allocating its buffer if needed.
	///
	/// ## Errors
	///
	/// Returns an error if the options have not been set, the buffer cannot
	/// be allocated, or the data cannot be decoded.
	fn decode(&mut self, index: u32, ctx: &mut DecodeContext) -> Result<(), ImageError>;

	/// # Promote Incremental Decode.
	///
	/// Decode as much as the stream currently allows. Returns `Ok` once the
	/// image is complete, or [`ImageError::SourceDataIncomplete`] if more
	/// data is needed.
	///
	/// ## Errors
	///
	/// The default implementation returns [`ImageError::DataUnsupport`].
	fn promote_incremental_decode(&mut self, _index: u32, _ctx: &mut ProgDecodeContext)
	-> Result<(), ImageError> {
		Err(ImageError::DataUnsupport)
	}

	/// # Top-Level Image Count.
	///
	/// ## Errors
	///
	/// Formats that need to parse the file to count images may return header
	/// errors.
	fn top_level_image_num(&mut self) -> Result<u32, ImageError> { Ok(1) }

	/// # Integer Property.
	///
	/// ## Errors
	///
	/// The default implementation returns [`ImageError::DataUnsupport`].
	fn image_property_int(&mut self, _index: u32, _key: &str) -> Result<i32, ImageError> {
		Err(ImageError::DataUnsupport)
	}

	/// # String Property.
	///
	/// ## Errors
	///
	/// The default implementation returns [`ImageError::DataUnsupport`].
	fn image_property_string(&mut self, _index: u32, _key: &str) -> Result<String, ImageError> {
		Err(ImageError::DataUnsupport)
	}

	/// # Modify Property.
	///
	/// ## Errors
	///
	/// The default implementation returns [`ImageError::DataUnsupport`].
	fn modify_image_property(&mut self, _index: u32, _key: &str, _value: &str)
	-> Result<(), ImageError> {
		Err(ImageError::DataUnsupport)
	}

	/// # Filter Area.
	///
	/// Byte ranges (offset, length) of privacy-sensitive metadata of the
	/// given type.
	///
	/// ## Errors
	///
	/// The default implementation returns [`ImageError::DataUnsupport`].
	fn filter_area(&mut self, _privacy_type: i32) -> Result<Vec<(u32, u32)>, ImageError> {
		Err(ImageError::DataUnsupport)
	}

	/// # Has Property?
	fn has_property(&self, _key: &str) -> bool { false }
}

/*!
# `ImgSource` - Buffered Decoding

Codec libraries that want the whole file at once are wrapped in a
[`BufferedDecoder`], which handles the decoder lifecycle, stream access,
sampling, and output conversion on their behalf.
*/

use crate::{
	DecodeContext,
	DecodeOptions,
	DecoderState,
	ImageDecoder,
	ImageError,
	ImageInfo,
	NinePatch,
	ProgDecodeContext,
	SharedStream,
	Size,
	kind::{
		header_error,
		output_info,
		RowWriter,
	},
	pixel::map::alloc_pixels,
	stream::read_all,
};
use std::sync::PoisonError;



/// # Codec.
///
/// The format-specific half of a [`BufferedDecoder`].
pub(crate) trait Codec: Send {
	/// # Incremental Support?
	const INCREMENTAL: bool = true;

	/// # Reset.
	///
	/// Drop anything cached from a previous source.
	fn reset(&mut self) {}

	/// # Parse Header.
	///
	/// Return the native info (size, pixel format, alpha type) from the
	/// bytes available so far.
	///
	/// ## Errors
	///
	/// Return [`ImageError::DecodeHeadAbnormal`] if the header cannot be
	/// parsed.
	fn parse_header(&mut self, raw: &[u8]) -> Result<ImageInfo, ImageError>;

	/// # Decode.
	///
	/// Decode the complete file into a contiguous native buffer matching
	/// the parsed header.
	///
	/// ## Errors
	///
	/// Return any errors encountered during decoding.
	fn decode(&mut self, raw: &[u8]) -> Result<Vec<u8>, ImageError>;

	/// # Nine-Patch.
	fn nine_patch(&self) -> Option<NinePatch> { None }
}



/// # Buffered Decoder.
pub(crate) struct BufferedDecoder<C: Codec> {
	/// # Codec.
	codec: C,

	/// # Source.
	stream: Option<SharedStream>,

	/// # State.
	state: DecoderState,

	/// # Native Info.
	native: Option<ImageInfo>,

	/// # Output Info and Sample Size.
	out: Option<(ImageInfo, u32)>,
}

impl<C: Codec> BufferedDecoder<C> {
	#[must_use]
	/// # New.
	pub(crate) const fn new(codec: C) -> Self {
		Self {
			codec,
			stream: None,
			state: DecoderState::Undecided,
			native: None,
			out: None,
		}
	}

	/// # Snapshot.
	///
	/// Copy the available bytes and note whether that's all of them.
	fn snapshot(&self) -> Result<(Vec<u8>, bool), ImageError> {
		let stream = self.stream.as_ref().ok_or(ImageError::SourceData)?;
		let mut stream = stream.lock().unwrap_or_else(PoisonError::into_inner);
		let completed = stream.is_stream_completed();
		let raw = read_all(&mut *stream).ok_or(header_error(completed))?;
		Ok((raw, completed))
	}

	/// # Parse Header (Once).
	fn ensure_header(&mut self) -> Result<ImageInfo, ImageError> {
		if self.state < DecoderState::SourceInited { return Err(ImageError::DecodeFailed); }
		if let Some(info) = self.native { return Ok(info); }

		let (raw, completed) = self.snapshot()?;
		match self.codec.parse_header(&raw) {
			Ok(info) if info.size.is_positive() => {
				self.native = Some(info);
				self.state = DecoderState::BaseInfoParsed;
				Ok(info)
			},
			Ok(_) => Err(ImageError::DecodeHeadAbnormal),
			Err(ImageError::DecodeHeadAbnormal) => Err(header_error(completed)),
			Err(e) => Err(e),
		}
	}

	/// # Decode Into.
	///
	/// The shared guts of one-shot and incremental decoding.
	fn decode_into(&mut self, ctx: &mut DecodeContext) -> Result<(), ImageError> {
		let (Some(native), Some((out, sample))) = (self.native, self.out) else {
			return Err(ImageError::DecodeFailed);
		};

		let (raw, completed) = self.snapshot()?;
		if ! completed { return Err(ImageError::SourceDataIncomplete); }

		let pixels = match self.codec.decode(&raw) {
			Ok(p) => p,
			Err(e) => {
				log::error!("Decoding failed: {e}");
				self.state = DecoderState::ImageError;
				return Err(ImageError::DecodeAbnormal);
			},
		};

		let mut writer = RowWriter::new(&native, &out, sample)?;
		let len = writer.buffer_len().ok_or(ImageError::TooLarge)?;
		if ctx.pixels.len() != len { ctx.pixels = alloc_pixels(len)?; }
		writer.write_all(&mut ctx.pixels, &pixels);

		ctx.info = out;
		ctx.is_partial = false;
		ctx.nine_patch = self.codec.nine_patch();
		self.state = DecoderState::ImageDecoded;
		Ok(())
	}
}

impl<C: Codec> ImageDecoder for BufferedDecoder<C> {
	fn set_source(&mut self, stream: SharedStream) {
		self.stream = Some(stream);
		self.reset();
	}

	fn reset(&mut self) {
		self.codec.reset();
		self.native = None;
		self.out = None;
		self.state =
			if self.stream.is_some() { DecoderState::SourceInited }
			else { DecoderState::Undecided };
	}

	#[inline]
	fn state(&self) -> DecoderState { self.state }

	fn image_size(&mut self, index: u32) -> Result<Size, ImageError> {
		let info = self.ensure_header()?;
		if index == 0 { Ok(info.size) }
		else { Err(ImageError::InvalidParameter) }
	}

	fn set_decode_options(&mut self, index: u32, opts: &DecodeOptions)
	-> Result<ImageInfo, ImageError> {
		if DecoderState::ImageDecoding <= self.state { self.reset(); }
		if index != 0 { return Err(ImageError::InvalidParameter); }

		let native = self.ensure_header()?;
		let out = output_info(&native, opts);
		self.out = Some((out, opts.sample()));
		self.state = DecoderState::ImageDecoding;
		Ok(out)
	}

	fn decode(&mut self, index: u32, ctx: &mut DecodeContext) -> Result<(), ImageError> {
		if index != 0 { return Err(ImageError::InvalidParameter); }
		if self.state != DecoderState::ImageDecoding { return Err(ImageError::DecodeFailed); }
		self.decode_into(ctx)
	}

	fn promote_incremental_decode(&mut self, index: u32, ctx: &mut ProgDecodeContext)
	-> Result<(), ImageError> {
		if ! C::INCREMENTAL { return Err(ImageError::DataUnsupport); }
		if index != 0 { return Err(ImageError::InvalidParameter); }

		match self.state {
			DecoderState::ImageDecoded => Ok(()),
			DecoderState::ImageDecoding => {
				match self.decode_into(&mut ctx.decode_context) {
					Ok(()) => {
						ctx.total_process_progress = 100;
						Ok(())
					},
					Err(ImageError::SourceDataIncomplete) => {
						ctx.total_process_progress = 0;
						Err(ImageError::SourceDataIncomplete)
					},
					Err(e) => Err(e),
				}
			},
			_ => Err(ImageError::DecodeFailed),
		}
	}
}

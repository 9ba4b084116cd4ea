/*!
# `ImgSource` - BMP Images.

BMP is simple enough to decode natively, and because rows are stored
uncompressed, it can be decoded incrementally one row at a time as data
trickles in.
*/

use crate::{
	AlphaType,
	DecodeContext,
	DecodeOptions,
	DecoderState,
	ImageDecoder,
	ImageError,
	ImageInfo,
	PixelFormat,
	ProgDecodeContext,
	SharedStream,
	Size,
	kind::{
		header_error,
		output_info,
		RowWriter,
	},
	pixel::map::alloc_pixels,
	stream::read_at,
};
use std::sync::PoisonError;



/// # Largest Possible Header.
///
/// File header, V5 info header, alpha bitfields, and a full palette.
const HEADER_MAX: usize = 14 + 124 + 16 + 256 * 4;

/// # Compression: None.
const BI_RGB: u32 = 0;

/// # Compression: Bitfields.
const BI_BITFIELDS: u32 = 3;

/// # Compression: Bitfields (with Alpha).
const BI_ALPHABITFIELDS: u32 = 6;



#[derive(Debug, Clone)]
/// # Parsed Header.
struct BmpHeader {
	/// # Width.
	width: usize,

	/// # Height.
	height: usize,

	/// # Rows Stored Bottom-Up?
	bottom_up: bool,

	/// # Bits Per Pixel.
	bpp: usize,

	/// # Pixel Data Offset.
	pixel_offset: usize,

	/// # Row Stride (Padded).
	stride: usize,

	/// # Channel Masks (RGBA).
	masks: [u32; 4],

	/// # Palette (RGBA).
	palette: Vec<[u8; 4]>,
}

impl BmpHeader {
	/// # Parse.
	///
	/// Returns [`ImageError::SourceDataIncomplete`] if more bytes are
	/// needed, or [`ImageError::DecodeHeadAbnormal`] if the header is bad.
	fn parse(raw: &[u8]) -> Result<Self, ImageError> {
		const SHORT: ImageError = ImageError::SourceDataIncomplete;
		const BAD: ImageError = ImageError::DecodeHeadAbnormal;

		if raw.len() < 18 { return Err(SHORT); }
		if raw[..2] != *b"BM" { return Err(BAD); }
		let pixel_offset = usize::try_from(le_u32(raw, 10)).map_err(|_| BAD)?;
		let dib = usize::try_from(le_u32(raw, 14)).map_err(|_| BAD)?;
		if dib != 12 && ! (40..=124).contains(&dib) { return Err(BAD); }
		if raw.len() < 14 + dib { return Err(SHORT); }

		// OS/2 headers are tiny and simple.
		let (width, height, bpp, compression, colors_used) =
			if dib == 12 {
				(
					i32::from(le_u16(raw, 18)),
					i32::from(le_u16(raw, 20)),
					le_u16(raw, 24),
					BI_RGB,
					0,
				)
			}
			else {
				(
					le_i32(raw, 18),
					le_i32(raw, 22),
					le_u16(raw, 28),
					le_u32(raw, 30),
					le_u32(raw, 46),
				)
			};

		if width <= 0 || height == 0 || height == i32::MIN { return Err(BAD); }
		let bottom_up = 0 < height;
		let width = usize::try_from(width).map_err(|_| BAD)?;
		let height = usize::try_from(height.abs()).map_err(|_| BAD)?;
		let bpp = usize::from(bpp);

		// Bitfields are either part of the header or tacked onto the end.
		let mut extra = 0;
		let masks = match (bpp, compression) {
			(16 | 32, BI_BITFIELDS | BI_ALPHABITFIELDS) => {
				let has_alpha = 56 <= dib || compression == BI_ALPHABITFIELDS;
				let mask_end = if has_alpha { 70 } else { 66 };

				// Masks trail a plain info header; anything bigger must hold
				// them itself.
				if dib == 40 {
					extra = mask_end - 54;
					if raw.len() < mask_end { return Err(SHORT); }
				}
				else if 14 + dib < mask_end { return Err(BAD); }

				let alpha = if has_alpha { le_u32(raw, 66) } else { 0 };
				[le_u32(raw, 54), le_u32(raw, 58), le_u32(raw, 62), alpha]
			},
			(16, BI_RGB) => [0x7C00, 0x03E0, 0x001F, 0],
			(32, BI_RGB) => [0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0],
			(1 | 4 | 8 | 24, BI_RGB) => [0; 4],
			_ => {
				log::debug!("Unsupported BMP: {bpp} bits, compression {compression}.");
				return Err(BAD);
			},
		};

		// Palette.
		let mut palette = Vec::new();
		if bpp <= 8 {
			let count =
				if colors_used == 0 { 1_usize << bpp }
				else { usize::try_from(colors_used).map_err(|_| BAD)?.min(256) };
			let size = if dib == 12 { 3 } else { 4 };
			let start = 14 + dib + extra;
			let end = start + count * size;
			if raw.len() < end { return Err(SHORT); }
			palette.extend(
				raw[start..end].chunks_exact(size).map(|c| [c[2], c[1], c[0], 255])
			);
		}

		let stride = bpp.checked_mul(width)
			.and_then(|x| x.checked_add(31))
			.map(|x| x / 32 * 4)
			.ok_or(ImageError::TooLarge)?;

		if pixel_offset < 14 + dib + extra { return Err(BAD); }

		Ok(Self {
			width,
			height,
			bottom_up,
			bpp,
			pixel_offset,
			stride,
			masks,
			palette,
		})
	}

	/// # Info.
	fn info(&self) -> Result<ImageInfo, ImageError> {
		let width = i32::try_from(self.width).map_err(|_| ImageError::TooLarge)?;
		let height = i32::try_from(self.height).map_err(|_| ImageError::TooLarge)?;
		let alpha =
			if self.masks[3] == 0 { AlphaType::Opaque }
			else { AlphaType::Unpremul };
		Ok(ImageInfo::new(Size::new(width, height), PixelFormat::Rgba8888, alpha))
	}

	/// # Row Length.
	///
	/// The meaningful bytes in a row, minus padding.
	const fn row_len(&self) -> usize { (self.bpp * self.width).div_ceil(8) }

	/// # Row Offset.
	///
	/// The file offset of the `n`th row as stored.
	const fn row_offset(&self, n: usize) -> usize { self.pixel_offset + n * self.stride }

	/// # Image Row.
	///
	/// The image row the `n`th stored row represents.
	const fn image_row(&self, n: usize) -> usize {
		if self.bottom_up { self.height - 1 - n }
		else { n }
	}

	/// # Decode Row.
	///
	/// Unpack one stored row into RGBA.
	fn decode_row(&self, src: &[u8], dst: &mut Vec<u8>) {
		dst.clear();
		match self.bpp {
			1 | 4 | 8 => for x in 0..self.width {
				let idx = match self.bpp {
					8 => src[x],
					4 => (src[x / 2] >> if x % 2 == 0 { 4 } else { 0 }) & 0x0F,
					_ => (src[x / 8] >> (7 - x % 8)) & 0x01,
				};
				let px = self.palette.get(usize::from(idx)).copied().unwrap_or([0, 0, 0, 255]);
				dst.extend_from_slice(&px);
			},
			24 => for c in src.chunks_exact(3).take(self.width) {
				dst.extend_from_slice(&[c[2], c[1], c[0], 255]);
			},
			16 => for c in src.chunks_exact(2).take(self.width) {
				let v = u32::from(u16::from_le_bytes([c[0], c[1]]));
				dst.extend_from_slice(&self.unmask(v));
			},
			_ => for c in src.chunks_exact(4).take(self.width) {
				let v = u32::from_le_bytes([c[0], c[1], c[2], c[3]]);
				dst.extend_from_slice(&self.unmask(v));
			},
		}
	}

	/// # Unmask.
	///
	/// Pull each channel out of a packed pixel using the bitfields.
	fn unmask(&self, v: u32) -> [u8; 4] {
		let [r, g, b, a] = self.masks.map(|m| channel(v, m));
		[r, g, b, if self.masks[3] == 0 { 255 } else { a }]
	}
}

/// # Channel From Mask.
///
/// Extract and rescale a channel to eight bits.
fn channel(v: u32, mask: u32) -> u8 {
	if mask == 0 { return 0; }
	let shift = mask.trailing_zeros();
	let bits = (mask >> shift).count_ones();
	let raw = (v & mask) >> shift;
	let out =
		if 8 <= bits { raw >> (bits - 8) }
		else {
			let max = (1_u32 << bits) - 1;
			(raw * 255 + max / 2) / max
		};
	u8::try_from(out).unwrap_or(u8::MAX)
}

/// # Little-Endian `u16`.
fn le_u16(raw: &[u8], idx: usize) -> u16 { u16::from_le_bytes([raw[idx], raw[idx + 1]]) }

/// # Little-Endian `u32`.
fn le_u32(raw: &[u8], idx: usize) -> u32 {
	u32::from_le_bytes([raw[idx], raw[idx + 1], raw[idx + 2], raw[idx + 3]])
}

/// # Little-Endian `i32`.
fn le_i32(raw: &[u8], idx: usize) -> i32 {
	i32::from_le_bytes([raw[idx], raw[idx + 1], raw[idx + 2], raw[idx + 3]])
}



#[derive(Default)]
/// # BMP Decoder.
pub(crate) struct BmpDecoder {
	/// # Source.
	stream: Option<SharedStream>,

	/// # State.
	state: DecoderState,

	/// # Header.
	header: Option<BmpHeader>,

	/// # Output Info.
	out: Option<ImageInfo>,

	/// # Row Writer.
	writer: Option<RowWriter>,

	/// # Stored Rows Decoded.
	rows: usize,

	/// # Row Scratch.
	row: Vec<u8>,
}

impl BmpDecoder {
	/// # Parse Header (Once).
	fn ensure_header(&mut self) -> Result<ImageInfo, ImageError> {
		if self.state < DecoderState::SourceInited { return Err(ImageError::DecodeFailed); }
		if let Some(h) = &self.header { return h.info(); }

		let stream = self.stream.as_ref().ok_or(ImageError::SourceData)?;
		let mut stream = stream.lock().unwrap_or_else(PoisonError::into_inner);
		let completed = stream.is_stream_completed();
		let len = stream.stream_size().min(HEADER_MAX);
		let raw = read_at(&mut *stream, 0, len).ok_or_else(|| header_error(completed))?;
		drop(stream);

		let header = BmpHeader::parse(&raw).map_err(|e|
			if e == ImageError::SourceDataIncomplete { header_error(completed) }
			else { e }
		)?;
		let info = header.info()?;
		self.header = Some(header);
		self.state = DecoderState::BaseInfoParsed;
		Ok(info)
	}

	/// # Advance.
	///
	/// Decode every stored row currently available. Returns `true` once all
	/// rows are done, along with whether the stream is complete.
	fn advance(&mut self, dst: &mut [u8]) -> Result<(bool, bool), ImageError> {
		let (Some(header), Some(writer), Some(stream)) =
			(self.header.as_ref(), self.writer.as_mut(), self.stream.as_ref())
		else { return Err(ImageError::DecodeFailed); };

		let mut stream = stream.lock().unwrap_or_else(PoisonError::into_inner);
		let row_len = header.row_len();
		while self.rows < header.height {
			let Some(raw) = read_at(&mut *stream, header.row_offset(self.rows), row_len)
			else { break; };
			header.decode_row(&raw, &mut self.row);
			writer.write_row(dst, header.image_row(self.rows), &self.row);
			self.rows += 1;
		}

		Ok((self.rows == header.height, stream.is_stream_completed()))
	}

	#[expect(clippy::cast_possible_truncation, reason = "Max is 100.")]
	/// # Progress.
	fn progress(&self) -> u8 {
		match &self.header {
			Some(h) if 0 < h.height => (self.rows * 100 / h.height) as u8,
			_ => 0,
		}
	}

	/// # Run.
	///
	/// Decode what we can into the context.
	fn run(&mut self, ctx: &mut DecodeContext) -> Result<(), ImageError> {
		let out = self.out.ok_or(ImageError::DecodeFailed)?;
		let len = out.buffer_len().ok_or(ImageError::TooLarge)?;
		if ctx.pixels.len() != len {
			ctx.pixels = alloc_pixels(len)?;
			self.rows = 0;
		}
		ctx.info = out;

		let (done, completed) = self.advance(&mut ctx.pixels)?;
		ctx.is_partial = ! done && 0 < self.rows;
		if done {
			self.state = DecoderState::ImageDecoded;
			Ok(())
		}
		else if completed {
			log::warn!("BMP data ended after {} rows.", self.rows);
			self.state = DecoderState::ImageError;
			Err(ImageError::DecodeAbnormal)
		}
		else { Err(ImageError::SourceDataIncomplete) }
	}
}

impl ImageDecoder for BmpDecoder {
	fn set_source(&mut self, stream: SharedStream) {
		self.stream = Some(stream);
		self.reset();
	}

	fn reset(&mut self) {
		self.header = None;
		self.out = None;
		self.writer = None;
		self.rows = 0;
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
		self.writer = Some(RowWriter::new(&native, &out, opts.sample())?);
		self.out = Some(out);
		self.rows = 0;
		self.state = DecoderState::ImageDecoding;
		Ok(out)
	}

	fn decode(&mut self, index: u32, ctx: &mut DecodeContext) -> Result<(), ImageError> {
		if index != 0 { return Err(ImageError::InvalidParameter); }
		if self.state != DecoderState::ImageDecoding { return Err(ImageError::DecodeFailed); }

		// One-shot decodes always start from the top.
		self.rows = 0;
		self.run(ctx)
	}

	fn promote_incremental_decode(&mut self, index: u32, ctx: &mut ProgDecodeContext)
	-> Result<(), ImageError> {
		if index != 0 { return Err(ImageError::InvalidParameter); }
		match self.state {
			DecoderState::ImageDecoded => {
				ctx.total_process_progress = 100;
				Ok(())
			},
			DecoderState::ImageDecoding => {
				let res = self.run(&mut ctx.decode_context);
				ctx.total_process_progress = self.progress();
				res
			},
			_ => Err(ImageError::DecodeFailed),
		}
	}
}



#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use crate::{
		BufferSourceStream,
		IncrementalMode,
		IncrementalSourceStream,
		SourceStream,
	};
	use std::sync::{
		Arc,
		Mutex,
	};

	/// # Generate a 24-bit BMP.
	///
	/// Pixel `(x, y)` is `(x * 10, y * 10, 0)`.
	pub(crate) fn bmp24(width: u16, height: u16) -> Vec<u8> {
		let (w, h) = (usize::from(width), usize::from(height));
		let stride = (w * 3).div_ceil(4) * 4;
		let size = 54 + stride * h;
		let mut out = Vec::with_capacity(size);
		out.extend_from_slice(b"BM");
		out.extend_from_slice(&u32::try_from(size).unwrap().to_le_bytes());
		out.extend_from_slice(&[0; 4]);
		out.extend_from_slice(&54_u32.to_le_bytes());
		out.extend_from_slice(&40_u32.to_le_bytes());
		out.extend_from_slice(&i32::from(width).to_le_bytes());
		out.extend_from_slice(&i32::from(height).to_le_bytes());
		out.extend_from_slice(&1_u16.to_le_bytes());
		out.extend_from_slice(&24_u16.to_le_bytes());
		out.extend_from_slice(&[0; 24]);

		// Bottom-up.
		for y in (0..h).rev() {
			for x in 0..w {
				out.extend_from_slice(&[0, (y * 10) as u8, (x * 10) as u8]);
			}
			out.resize(out.len() + stride - w * 3, 0);
		}

		out
	}

	fn shared<S: SourceStream + 'static>(s: S) -> SharedStream { Arc::new(Mutex::new(s)) }

	#[test]
	fn t_header() {
		let raw = include_bytes!("../../skel/logo.bmp");
		let header = BmpHeader::parse(raw).unwrap();
		assert_eq!((header.width, header.height, header.bpp), (16, 16, 32));
		assert_eq!(header.masks, [0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0xFF00_0000]);
		assert_eq!(header.pixel_offset, 0x8A);
		assert!(header.bottom_up);

		assert_eq!(BmpHeader::parse(&raw[..20]).err(), Some(ImageError::SourceDataIncomplete));
		assert_eq!(BmpHeader::parse(b"BZ\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0").err(), Some(ImageError::DecodeHeadAbnormal));
	}

	#[test]
	fn t_header_masks() {
		/// # Bare 32-bit header, `14 + dib` bytes long.
		fn header(dib: u32, compression: u32) -> Vec<u8> {
			let mut out = Vec::new();
			out.extend_from_slice(b"BM");
			out.extend_from_slice(&[0; 8]);
			out.extend_from_slice(&(14 + dib).to_le_bytes());
			out.extend_from_slice(&dib.to_le_bytes());
			out.extend_from_slice(&1_i32.to_le_bytes());
			out.extend_from_slice(&1_i32.to_le_bytes());
			out.extend_from_slice(&1_u16.to_le_bytes());
			out.extend_from_slice(&32_u16.to_le_bytes());
			out.extend_from_slice(&compression.to_le_bytes());
			out.resize(14 + dib as usize, 0);
			out
		}

		// Masks that would run past the header.
		assert_eq!(BmpHeader::parse(&header(52, BI_ALPHABITFIELDS)).err(), Some(ImageError::DecodeHeadAbnormal));
		assert_eq!(BmpHeader::parse(&header(44, BI_BITFIELDS)).err(), Some(ImageError::DecodeHeadAbnormal));
		assert_eq!(BmpHeader::parse(&header(55, BI_ALPHABITFIELDS)).err(), Some(ImageError::DecodeHeadAbnormal));

		// Trailing masks that have not arrived yet.
		assert_eq!(BmpHeader::parse(&header(40, BI_BITFIELDS)).err(), Some(ImageError::SourceDataIncomplete));
		assert_eq!(BmpHeader::parse(&header(40, BI_ALPHABITFIELDS)).err(), Some(ImageError::SourceDataIncomplete));

		// Masks inside the header.
		let mut raw = header(56, BI_BITFIELDS);
		raw[54..70].copy_from_slice(&[
			0, 0, 0xFF, 0,
			0, 0xFF, 0, 0,
			0xFF, 0, 0, 0,
			0, 0, 0, 0xFF,
		]);
		let h = BmpHeader::parse(&raw).unwrap();
		assert_eq!(h.masks, [0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0xFF00_0000]);
		assert_eq!(h.pixel_offset, 70);
	}

	#[test]
	fn t_channel() {
		assert_eq!(channel(0x00AB_0000, 0x00FF_0000), 0xAB);
		assert_eq!(channel(0x7C00, 0x7C00), 255);
		assert_eq!(channel(0x0000, 0x7C00), 0);
		assert_eq!(channel(0x1234, 0), 0);
	}

	#[test]
	fn t_decode() {
		let mut dec = BmpDecoder::default();
		dec.set_source(shared(BufferSourceStream::from(bmp24(10, 10))));
		assert_eq!(dec.state(), DecoderState::SourceInited);
		assert_eq!(dec.image_size(0), Ok(Size::new(10, 10)));
		assert_eq!(dec.image_size(1), Err(ImageError::InvalidParameter));

		let info = dec.set_decode_options(0, &DecodeOptions::default()).unwrap();
		assert_eq!(info.pixel_format, PixelFormat::Rgba8888);
		assert_eq!(info.alpha_type, AlphaType::Opaque);

		let mut ctx = DecodeContext::default();
		assert!(dec.decode(0, &mut ctx).is_ok());
		assert_eq!(dec.state(), DecoderState::ImageDecoded);
		assert_eq!(ctx.pixels.len(), 400);
		assert_eq!(&ctx.pixels[..4], &[0, 0, 0, 255]);
		// Pixel (3, 2).
		let idx = (2 * 10 + 3) * 4;
		assert_eq!(&ctx.pixels[idx..idx + 4], &[30, 20, 0, 255]);

		// Decoding again without new options is a no-go.
		assert_eq!(dec.decode(0, &mut ctx), Err(ImageError::DecodeFailed));
	}

	#[test]
	fn t_incremental() {
		let raw = bmp24(10, 10);
		let stream = shared(IncrementalSourceStream::new(IncrementalMode::IncrementalData));
		let mut dec = BmpDecoder::default();
		dec.set_source(Arc::clone(&stream));

		// Not enough for the header.
		stream.lock().unwrap().update_data(&raw[..30], false).unwrap();
		assert_eq!(dec.image_size(0), Err(ImageError::SourceDataIncomplete));

		// Header plus half the rows.
		stream.lock().unwrap().update_data(&raw[30..54 + 32 * 5], false).unwrap();
		assert!(dec.set_decode_options(0, &DecodeOptions::default()).is_ok());
		let mut ctx = ProgDecodeContext::default();
		assert_eq!(
			dec.promote_incremental_decode(0, &mut ctx),
			Err(ImageError::SourceDataIncomplete),
		);
		assert_eq!(ctx.total_process_progress, 50);
		assert!(ctx.decode_context.is_partial);

		// The rest.
		stream.lock().unwrap().update_data(&raw[54 + 32 * 5..], true).unwrap();
		assert!(dec.promote_incremental_decode(0, &mut ctx).is_ok());
		assert_eq!(ctx.total_process_progress, 100);
		assert!(! ctx.decode_context.is_partial);

		// Same as a one-shot decode?
		let mut one = BmpDecoder::default();
		one.set_source(shared(BufferSourceStream::from(raw)));
		assert!(one.set_decode_options(0, &DecodeOptions::default()).is_ok());
		let mut ctx2 = DecodeContext::default();
		assert!(one.decode(0, &mut ctx2).is_ok());
		assert_eq!(ctx.decode_context.pixels, ctx2.pixels);
	}

	#[test]
	fn t_truncated() {
		let raw = bmp24(4, 4);
		let mut dec = BmpDecoder::default();
		dec.set_source(shared(BufferSourceStream::from(&raw[..raw.len() - 12])));
		assert!(dec.set_decode_options(0, &DecodeOptions::default()).is_ok());
		let mut ctx = DecodeContext::default();
		assert_eq!(dec.decode(0, &mut ctx), Err(ImageError::DecodeAbnormal));
		assert!(ctx.is_partial);
		assert_eq!(dec.state(), DecoderState::ImageError);
	}

	#[test]
	fn t_fixture() {
		let raw = include_bytes!("../../skel/logo.bmp");
		let mut dec = BmpDecoder::default();
		dec.set_source(shared(BufferSourceStream::from(&raw[..])));
		let mut opts = DecodeOptions::default();
		opts.desired_pixel_format = PixelFormat::Bgra8888;
		opts.sample_size = 2;
		let info = dec.set_decode_options(0, &opts).unwrap();
		assert_eq!(info.size, Size::new(8, 8));
		assert_eq!(info.alpha_type, AlphaType::Unpremul);

		let mut ctx = DecodeContext::default();
		assert!(dec.decode(0, &mut ctx).is_ok());
		assert_eq!(ctx.pixels.len(), 8 * 8 * 4);
	}
}

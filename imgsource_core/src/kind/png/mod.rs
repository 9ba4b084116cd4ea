/*!
# `ImgSource` - PNG Images.
*/

mod chunk;

use chunk::Chunks;
use crate::{
	AlphaType,
	ImageError,
	ImageInfo,
	NinePatch,
	PixelFormat,
	Size,
	kind::buffered::Codec,
};
use rgb::RGBA8;



#[derive(Debug, Clone, Default)]
/// # PNG Codec.
pub(crate) struct PngCodec {
	/// # Nine-Patch.
	nine_patch: Option<NinePatch>,
}

impl Codec for PngCodec {
	fn reset(&mut self) { self.nine_patch = None; }

	/// # Parse Header.
	///
	/// For our purposes, the "header" is everything before the first `IDAT`
	/// chunk, since that is where transparency and nine-patch data live.
	fn parse_header(&mut self, raw: &[u8]) -> Result<ImageInfo, ImageError> {
		let mut chunks = Chunks::new(raw).ok_or(ImageError::DecodeHeadAbnormal)?;

		// IHDR comes first.
		let ihdr = chunks.next().ok_or(ImageError::DecodeHeadAbnormal)?;
		if ihdr.kind != *b"IHDR" || ihdr.data.len() != 13 {
			return Err(ImageError::DecodeHeadAbnormal);
		}
		let width = i32::try_from(be_u32(ihdr.data, 0)).map_err(|_| ImageError::TooLarge)?;
		let height = i32::try_from(be_u32(ihdr.data, 4)).map_err(|_| ImageError::TooLarge)?;
		let color_type = ihdr.data[9];

		let mut alpha = matches!(color_type, 4 | 6);
		let mut nine_patch = None;
		loop {
			let Some(chunk) = chunks.next() else {
				// We ran out of data before reaching the pixels.
				return Err(ImageError::DecodeHeadAbnormal);
			};
			match &chunk.kind {
				b"tRNS" => { alpha = true; },
				b"npTc" => { nine_patch = Some(NinePatch::from_chunk(chunk.data)); },
				b"IDAT" | b"IEND" => break,
				_ => {},
			}
		}

		self.nine_patch = nine_patch;
		Ok(ImageInfo::new(
			Size::new(width, height),
			PixelFormat::Rgba8888,
			if alpha { AlphaType::Unpremul } else { AlphaType::Opaque },
		))
	}

	fn decode(&mut self, raw: &[u8]) -> Result<Vec<u8>, ImageError> {
		let img = lodepng::decode32(raw).map_err(|e| {
			log::debug!("PNG: {e}");
			ImageError::DecodeFailed
		})?;

		let size = img.width.checked_mul(img.height)
			.and_then(|x| x.checked_mul(4))
			.ok_or(ImageError::TooLarge)?;
		let buffer: Vec<RGBA8> = img.buffer;
		let mut out = Vec::new();
		out.try_reserve_exact(size).map_err(|_| ImageError::MallocAbnormal)?;
		out.extend(buffer.into_iter().flat_map(|px| [px.r, px.g, px.b, px.a]));

		// Make sure the buffer was actually filled to the right size.
		if out.len() == size { Ok(out) }
		else { Err(ImageError::DecodeFailed) }
	}

	fn nine_patch(&self) -> Option<NinePatch> { self.nine_patch.clone() }
}

/// # Big-Endian `u32`.
fn be_u32(raw: &[u8], idx: usize) -> u32 {
	u32::from_be_bytes([raw[idx], raw[idx + 1], raw[idx + 2], raw[idx + 3]])
}

/*!
# `ImgSource` - JPEG Images.
*/

use crate::{
	AlphaType,
	ImageError,
	ImageInfo,
	PixelFormat,
	Size,
	kind::buffered::Codec,
};
use jpeg_decoder::PixelFormat as JpegFormat;



#[derive(Debug, Clone, Copy, Default)]
/// # JPEG Codec.
pub(crate) struct JpegCodec;

impl Codec for JpegCodec {
	fn parse_header(&mut self, mut raw: &[u8]) -> Result<ImageInfo, ImageError> {
		let mut jecoder = jpeg_decoder::Decoder::new(&mut raw);
		jecoder.read_info().map_err(|_| ImageError::DecodeHeadAbnormal)?;
		let info = jecoder.info().ok_or(ImageError::DecodeHeadAbnormal)?;

		// So many ways to be a JPEG...
		let format = match info.pixel_format {
			JpegFormat::L8 => PixelFormat::Gray8,
			JpegFormat::RGB24 => PixelFormat::Rgb888,
			JpegFormat::CMYK32 => PixelFormat::Cmyk,
			// Lossless isn't supported.
			JpegFormat::L16 => return Err(ImageError::DataUnsupport),
		};

		// JPEGs don't have alpha.
		Ok(ImageInfo::new(
			Size::new(i32::from(info.width), i32::from(info.height)),
			format,
			AlphaType::Opaque,
		))
	}

	fn decode(&mut self, mut raw: &[u8]) -> Result<Vec<u8>, ImageError> {
		let mut jecoder = jpeg_decoder::Decoder::new(&mut raw);
		let pixels = jecoder.decode().map_err(|e| {
			log::debug!("JPEG: {e}");
			ImageError::DecodeFailed
		})?;

		// Make sure the buffer was actually filled to the right size.
		let info = jecoder.info().ok_or(ImageError::DecodeFailed)?;
		let bpp = match info.pixel_format {
			JpegFormat::L8 => 1,
			JpegFormat::RGB24 => 3,
			JpegFormat::CMYK32 => 4,
			JpegFormat::L16 => return Err(ImageError::DataUnsupport),
		};
		let size = usize::from(info.width)
			.checked_mul(usize::from(info.height))
			.and_then(|x| x.checked_mul(bpp))
			.ok_or(ImageError::TooLarge)?;

		if pixels.len() == size { Ok(pixels) }
		else { Err(ImageError::DecodeFailed) }
	}
}

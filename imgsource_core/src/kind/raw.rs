/*!
# `ImgSource` - Raw Pixels
*/

use crate::{
	AlphaType,
	ImageError,
	ImageInfo,
	PixelFormat,
	Size,
	SourceOptions,
	kind::buffered::Codec,
};



#[derive(Debug, Clone, Copy)]
/// # Raw Codec.
///
/// The bytes are pixels already; all we need is to be told what they look
/// like.
pub(crate) struct RawCodec {
	/// # Format.
	format: PixelFormat,

	/// # Size.
	size: Size,
}

impl From<&SourceOptions> for RawCodec {
	fn from(opts: &SourceOptions) -> Self {
		Self { format: opts.pixel_format, size: opts.size }
	}
}

impl Codec for RawCodec {
	fn parse_header(&mut self, _raw: &[u8]) -> Result<ImageInfo, ImageError> {
		if matches!(self.format, PixelFormat::Unknown) || ! self.size.is_positive() {
			return Err(ImageError::DecodeHeadAbnormal);
		}
		Ok(ImageInfo::new(self.size, self.format, AlphaType::Unknown.valid_for(self.format)))
	}

	fn decode(&mut self, raw: &[u8]) -> Result<Vec<u8>, ImageError> {
		let len = ImageInfo::new(self.size, self.format, AlphaType::Unknown)
			.buffer_len()
			.ok_or(ImageError::TooLarge)?;
		raw.get(..len)
			.map(<[u8]>::to_vec)
			.ok_or(ImageError::DataAbnormal)
	}
}



#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		BufferSourceStream,
		DecodeContext,
		DecodeOptions,
		ImageDecoder,
		kind::buffered::BufferedDecoder,
	};
	use std::sync::{
		Arc,
		Mutex,
	};

	#[test]
	fn t_raw() {
		let opts = SourceOptions {
			pixel_format: PixelFormat::Rgb888,
			size: Size::new(2, 1),
			..SourceOptions::default()
		};
		let mut dec = BufferedDecoder::new(RawCodec::from(&opts));
		dec.set_source(Arc::new(Mutex::new(BufferSourceStream::from(vec![1, 2, 3, 4, 5, 6]))));
		assert_eq!(dec.image_size(0), Ok(Size::new(2, 1)));

		let info = dec.set_decode_options(0, &DecodeOptions::default()).unwrap();
		assert_eq!(info.pixel_format, PixelFormat::Rgba8888);
		assert_eq!(info.alpha_type, AlphaType::Opaque);

		let mut ctx = DecodeContext::default();
		assert!(dec.decode(0, &mut ctx).is_ok());
		assert_eq!(ctx.pixels, [1, 2, 3, 255, 4, 5, 6, 255]);
	}

	#[test]
	fn t_raw_bad() {
		// No size, no header.
		let mut dec = BufferedDecoder::new(RawCodec::from(&SourceOptions::default()));
		dec.set_source(Arc::new(Mutex::new(BufferSourceStream::from(vec![1, 2, 3]))));
		assert_eq!(dec.image_size(0), Err(ImageError::DecodeHeadAbnormal));

		// Not enough pixels.
		let opts = SourceOptions {
			pixel_format: PixelFormat::Rgba8888,
			size: Size::new(2, 2),
			..SourceOptions::default()
		};
		let mut dec = BufferedDecoder::new(RawCodec::from(&opts));
		dec.set_source(Arc::new(Mutex::new(BufferSourceStream::from(vec![1, 2, 3]))));
		assert!(dec.set_decode_options(0, &DecodeOptions::default()).is_ok());
		let mut ctx = DecodeContext::default();
		assert_eq!(dec.decode(0, &mut ctx), Err(ImageError::DecodeAbnormal));
	}
}

/*!
# `ImgSource`: `WebP` Handling

This uses [`libwebp-sys2`](https://crates.io/crates/libwebp-sys2) bindings to Google's
`libwebp`.
*/

use crate::{
	AlphaType,
	ImageError,
	ImageInfo,
	PixelFormat,
	Size,
	kind::buffered::Codec,
};
use std::os::raw::c_int;



#[derive(Debug, Clone, Copy, Default)]
/// # `WebP` Codec.
pub(crate) struct WebpCodec;

impl Codec for WebpCodec {
	const INCREMENTAL: bool = false;

	#[expect(unsafe_code, reason = "For FFI.")]
	fn parse_header(&mut self, raw: &[u8]) -> Result<ImageInfo, ImageError> {
		let mut width: c_int = 0;
		let mut height: c_int = 0;
		let res = unsafe {
			libwebp_sys::WebPGetInfo(raw.as_ptr(), raw.len(), &mut width, &mut height)
		};
		if res == 0 { return Err(ImageError::DecodeHeadAbnormal); }

		// The header doesn't say whether alpha is used, so assume it is.
		Ok(ImageInfo::new(
			Size::new(width, height),
			PixelFormat::Rgba8888,
			AlphaType::Unpremul,
		))
	}

	#[expect(unsafe_code, reason = "For FFI.")]
	fn decode(&mut self, raw: &[u8]) -> Result<Vec<u8>, ImageError> {
		let d = LibWebPDecode::try_from(raw)?;

		let width = usize::try_from(d.width).map_err(|_| ImageError::TooLarge)?;
		let height = usize::try_from(d.height).map_err(|_| ImageError::TooLarge)?;
		let size = width.checked_mul(height)
			.and_then(|x| x.checked_mul(4))
			.ok_or(ImageError::TooLarge)?;

		let buf: Vec<u8> = unsafe { std::slice::from_raw_parts(d.ptr, size) }.to_vec();
		if buf.len() == size { Ok(buf) }
		else { Err(ImageError::DecodeFailed) }
	}
}



/// # Decode Wrapper.
///
/// This exists solely to help with garbage cleanup.
struct LibWebPDecode {
	width: i32,
	height: i32,
	ptr: *mut u8,
}

impl TryFrom<&[u8]> for LibWebPDecode {
	type Error = ImageError;

	#[expect(unsafe_code, reason = "For FFI.")]
	fn try_from(src: &[u8]) -> Result<Self, Self::Error> {
		let mut width: c_int = 0;
		let mut height: c_int = 0;
		let result = unsafe {
			libwebp_sys::WebPDecodeRGBA(src.as_ptr(), src.len(), &mut width, &mut height)
		};

		if result.is_null() { Err(ImageError::DecodeFailed) }
		else {
			Ok(Self {
				width,
				height,
				ptr: result,
			})
		}
	}
}

impl Drop for LibWebPDecode {
	#[inline]
	#[expect(unsafe_code, reason = "For FFI.")]
	fn drop(&mut self) { unsafe { libwebp_sys::WebPFree(self.ptr.cast()); } }
}



#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		BufferSourceStream,
		DecodeContext,
		DecodeOptions,
		ImageDecoder,
		ProgDecodeContext,
		kind::buffered::BufferedDecoder,
	};
	use std::sync::{
		Arc,
		Mutex,
	};

	const LOGO: &[u8] = include_bytes!("../../skel/logo.webp");

	#[test]
	fn t_decode() {
		let mut dec = BufferedDecoder::new(WebpCodec);
		dec.set_source(Arc::new(Mutex::new(BufferSourceStream::from(LOGO))));
		assert_eq!(dec.image_size(0), Ok(Size::new(16, 16)));
		assert!(dec.set_decode_options(0, &DecodeOptions::default()).is_ok());

		// No incremental support.
		let mut prog = ProgDecodeContext::default();
		assert_eq!(dec.promote_incremental_decode(0, &mut prog), Err(ImageError::DataUnsupport));

		let mut ctx = DecodeContext::default();
		assert!(dec.decode(0, &mut ctx).is_ok());
		assert_eq!(ctx.pixels.len(), 16 * 16 * 4);
	}
}

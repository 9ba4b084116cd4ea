/*!
# `ImgSource` - Pixel Conversion
*/

use crate::{
	AlphaType,
	ImageError,
	ImageInfo,
	PixelFormat,
};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use super::kernel::{
	AlphaConvert,
	Argb8888,
	Bgr888,
	Bgra8888,
	Cmyk,
	Gray8,
	GrayAlpha88,
	ReadPixel,
	Rgb161616,
	Rgb565,
	Rgb888,
	Rgba16161616,
	Rgba8888,
	RgbaF16,
	WritePixel,
};



/// # Conversion Kernel.
///
/// Arguments are destination, source, pixel count, and the alpha step.
type Kernel = fn(&mut [u8], &[u8], usize, AlphaConvert);

/// # Kernel Table.
///
/// Built on first use, immutable after.
static KERNELS: Lazy<HashMap<(PixelFormat, PixelFormat), Kernel>> = Lazy::new(|| {
	let mut map: HashMap<(PixelFormat, PixelFormat), Kernel> = HashMap::with_capacity(60);

	/// # Helper: One Source, Every Destination.
	macro_rules! register {
		($($src:ty),+ $(,)?) => ($(
			register!(@one $src, Argb8888);
			register!(@one $src, Rgba8888);
			register!(@one $src, Bgra8888);
			register!(@one $src, Rgb565);
			register!(@one $src, RgbaF16);
		)+);
		(@one $src:ty, $dst:ty) => (
			map.insert(
				(<$src as ReadPixel>::FORMAT, <$dst as WritePixel>::FORMAT),
				kernel::<$src, $dst> as Kernel,
			);
		);
	}

	register!(
		Gray8,
		GrayAlpha88,
		Rgb888,
		Bgr888,
		Rgb565,
		Rgba8888,
		Bgra8888,
		Argb8888,
		Rgb161616,
		Rgba16161616,
		Cmyk,
		RgbaF16,
	);

	log::debug!("Built {} pixel conversion kernels.", map.len());
	map
});

/// # Generic Kernel.
///
/// Read each source pixel, run the alpha step, write it back out.
fn kernel<S: ReadPixel, D: WritePixel>(
	dst: &mut [u8],
	src: &[u8],
	count: usize,
	alpha: AlphaConvert,
) {
	let src_bpp = S::FORMAT.bytes_per_pixel();
	let dst_bpp = D::FORMAT.bytes_per_pixel();
	for (s, d) in src.chunks_exact(src_bpp).zip(dst.chunks_exact_mut(dst_bpp)).take(count) {
		D::write(d, alpha.apply(S::read(s)));
	}
}



#[derive(Clone, Copy)]
/// # Pixel Converter.
///
/// A converter is built once for a given source/destination pairing, then
/// applied to any number of pixel runs.
pub struct PixelConvert {
	/// # Kernel.
	///
	/// This is only `None` for identity conversions.
	kernel: Option<Kernel>,

	/// # Alpha Step.
	alpha: AlphaConvert,

	/// # Source Bytes Per Pixel.
	src_bpp: usize,

	/// # Destination Bytes Per Pixel.
	dst_bpp: usize,

	/// # Conversion Needed?
	need_convert: bool,
}

impl std::fmt::Debug for PixelConvert {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PixelConvert")
			.field("alpha", &self.alpha)
			.field("src_bpp", &self.src_bpp)
			.field("dst_bpp", &self.dst_bpp)
			.field("need_convert", &self.need_convert)
			.finish_non_exhaustive()
	}
}

impl PixelConvert {
	/// # New.
	///
	/// Build a converter from `src` pixels to `dst` pixels.
	///
	/// When the formats and alpha handling are identical, no kernel is
	/// needed and [`PixelConvert::is_need_convert`] returns `false`.
	///
	/// ## Errors
	///
	/// This will return an error if either format is unknown, or if there is
	/// no kernel for the pairing.
	pub fn create(src: &ImageInfo, dst: &ImageInfo) -> Result<Self, ImageError> {
		let (sf, df) = (src.pixel_format, dst.pixel_format);
		if matches!(sf, PixelFormat::Unknown) || matches!(df, PixelFormat::Unknown) {
			log::error!("Unable to convert {sf} pixels to {df}.");
			return Err(ImageError::ColorConvert);
		}

		let alpha = alpha_convert(src.alpha_type, dst.alpha_type);
		let need_convert = sf != df || alpha != AlphaConvert::NoConvert;
		let kernel =
			if need_convert {
				let Some(k) = KERNELS.get(&(sf, df)) else {
					log::error!("No kernel converts {sf} pixels to {df}.");
					return Err(ImageError::ColorConvert);
				};
				Some(*k)
			}
			else { None };

		Ok(Self {
			kernel,
			alpha,
			src_bpp: sf.bytes_per_pixel(),
			dst_bpp: df.bytes_per_pixel(),
			need_convert,
		})
	}

	#[inline]
	#[must_use]
	/// # Conversion Needed?
	///
	/// Returns `false` if the source and destination are the same, in which
	/// case [`PixelConvert::convert`] does nothing and callers should copy
	/// (or reuse) the source directly.
	pub const fn is_need_convert(&self) -> bool { self.need_convert }

	#[inline]
	#[must_use]
	/// # Source Bytes Per Pixel.
	pub const fn src_bytes_per_pixel(&self) -> usize { self.src_bpp }

	#[inline]
	#[must_use]
	/// # Destination Bytes Per Pixel.
	pub const fn dst_bytes_per_pixel(&self) -> usize { self.dst_bpp }

	/// # Convert.
	///
	/// Convert `count` pixels from `src` into `dst`, reading exactly
	/// `count * src_bpp` bytes and writing exactly `count * dst_bpp` bytes.
	///
	/// Identity converters leave `dst` untouched. Buffers too short for the
	/// requested count are likewise left alone.
	pub fn convert(&self, dst: &mut [u8], src: &[u8], count: usize) {
		let Some(kernel) = self.kernel else { return; };
		if count == 0 { return; }

		let src_len = count.checked_mul(self.src_bpp);
		let dst_len = count.checked_mul(self.dst_bpp);
		match (src_len, dst_len) {
			(Some(s), Some(d)) if s <= src.len() && d <= dst.len() => {
				kernel(&mut dst[..d], &src[..s], count, self.alpha);
			},
			_ => {
				log::warn!("Pixel buffers are too small to convert {count} pixels.");
			},
		}
	}
}



/// # Alpha Conversion Type.
const fn alpha_convert(src: AlphaType, dst: AlphaType) -> AlphaConvert {
	match (src, dst) {
		(AlphaType::Premul, AlphaType::Unpremul) => AlphaConvert::Unpremul,
		(AlphaType::Premul, AlphaType::Opaque) => AlphaConvert::UnpremulOpaque,
		(AlphaType::Unpremul, AlphaType::Premul) => AlphaConvert::Premul,
		(AlphaType::Unpremul, AlphaType::Opaque) => AlphaConvert::Opaque,
		_ => AlphaConvert::NoConvert,
	}
}

#[must_use]
/// # Supported Conversions.
///
/// Return every source/destination pixel format pairing with a kernel.
pub fn supported_conversions() -> Vec<(PixelFormat, PixelFormat)> {
	let mut out: Vec<_> = KERNELS.keys().copied().collect();
	out.sort_unstable_by_key(|(a, b)| (a.as_str(), b.as_str()));
	out
}



#[cfg(test)]
mod tests {
	use super::*;
	use crate::Size;

	/// # Sentinel.
	const SENTINEL: u8 = 0xA5;

	fn info(pixel_format: PixelFormat, alpha_type: AlphaType) -> ImageInfo {
		ImageInfo::new(Size::new(4, 1), pixel_format, alpha_type)
	}

	#[test]
	fn t_table() {
		let all = supported_conversions();
		assert_eq!(all.len(), 60);
		assert!(all.contains(&(PixelFormat::Cmyk, PixelFormat::RgbaF16)));
		assert!(! all.iter().any(|(_, d)| matches!(d, PixelFormat::Gray8)));
	}

	#[test]
	fn t_dispatch_completeness() {
		const COUNT: usize = 5;
		for (sf, df) in supported_conversions() {
			let conv = PixelConvert::create(
				&info(sf, AlphaType::Unpremul),
				&info(df, AlphaType::Premul),
			).expect("Kernel missing.");
			let (sb, db) = (sf.bytes_per_pixel(), df.bytes_per_pixel());
			assert_eq!(conv.src_bytes_per_pixel(), sb);
			assert_eq!(conv.dst_bytes_per_pixel(), db);

			// Only the first COUNT pixels should be touched; the extra source
			// bytes are garbage the kernel must never see.
			let src: Vec<u8> = (0..sb * (COUNT + 2)).map(|i| (i * 37) as u8).collect();
			let mut dst = vec![SENTINEL; db * (COUNT + 2)];
			conv.convert(&mut dst, &src, COUNT);
			assert!(
				dst[db * COUNT..].iter().all(|&b| b == SENTINEL),
				"{sf} -> {df} wrote past the end.",
			);

			// Changing the trailing source bytes must not change the result.
			let mut src2 = src.clone();
			for b in &mut src2[sb * COUNT..] { *b = ! *b; }
			let mut dst2 = vec![SENTINEL; db * (COUNT + 2)];
			conv.convert(&mut dst2, &src2, COUNT);
			assert_eq!(dst, dst2, "{sf} -> {df} read past the end.");
		}
	}

	#[test]
	fn t_identity() {
		for fmt in [PixelFormat::Rgba8888, PixelFormat::Gray8, PixelFormat::RgbaF16] {
			for alpha in [AlphaType::Opaque, AlphaType::Premul, AlphaType::Unpremul] {
				let i = info(fmt, alpha);
				let conv = PixelConvert::create(&i, &i).expect("Identity failed.");
				assert!(! conv.is_need_convert());

				let src = vec![1_u8; 64];
				let mut dst = vec![SENTINEL; 64];
				conv.convert(&mut dst, &src, 4);
				assert!(dst.iter().all(|&b| b == SENTINEL));
			}
		}
	}

	#[test]
	fn t_unknown() {
		let good = info(PixelFormat::Rgba8888, AlphaType::Premul);
		let bad = info(PixelFormat::Unknown, AlphaType::Premul);
		assert_eq!(PixelConvert::create(&bad, &good).err(), Some(ImageError::ColorConvert));
		assert_eq!(PixelConvert::create(&good, &bad).err(), Some(ImageError::ColorConvert));

		// There is no kernel targeting greyscale.
		let grey = info(PixelFormat::Gray8, AlphaType::Opaque);
		assert_eq!(PixelConvert::create(&good, &grey).err(), Some(ImageError::ColorConvert));
	}

	#[test]
	fn t_convert_values() {
		// Premultiplied RGBA to straight BGRA.
		let conv = PixelConvert::create(
			&info(PixelFormat::Rgba8888, AlphaType::Premul),
			&info(PixelFormat::Bgra8888, AlphaType::Unpremul),
		).unwrap();
		let mut dst = [0_u8; 4];
		conv.convert(&mut dst, &[64, 32, 0, 128], 1);
		assert_eq!(dst, [0, 64, 128, 128]);

		// Straight RGBA to opaque.
		let conv = PixelConvert::create(
			&info(PixelFormat::Rgba8888, AlphaType::Unpremul),
			&info(PixelFormat::Argb8888, AlphaType::Opaque),
		).unwrap();
		conv.convert(&mut dst, &[1, 2, 3, 4], 1);
		assert_eq!(dst, [255, 1, 2, 3]);

		// Unknown alpha means hands off.
		let conv = PixelConvert::create(
			&info(PixelFormat::Rgba8888, AlphaType::Unknown),
			&info(PixelFormat::Rgba8888, AlphaType::Premul),
		).unwrap();
		assert!(! conv.is_need_convert());

		// Short buffers are ignored.
		let conv = PixelConvert::create(
			&info(PixelFormat::Rgb888, AlphaType::Opaque),
			&info(PixelFormat::Rgba8888, AlphaType::Opaque),
		).unwrap();
		let mut dst = [SENTINEL; 8];
		conv.convert(&mut dst, &[1, 2, 3], 2);
		assert_eq!(dst, [SENTINEL; 8]);
		conv.convert(&mut dst, &[1, 2, 3, 4, 5, 6], 2);
		assert_eq!(dst, [1, 2, 3, 255, 4, 5, 6, 255]);
	}
}

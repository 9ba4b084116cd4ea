/*!
# `ImgSource` - Kinds
*/

pub(super) mod bmp;
pub(super) mod buffered;
pub(super) mod image;
#[cfg(feature = "jpeg")] pub(super) mod jpeg;
#[cfg(feature = "png")]  pub(super) mod png;
pub(super) mod raw;
#[cfg(feature = "webp")] pub(super) mod webp;

use crate::{
	AlphaType,
	ColorSpace,
	DecodeOptions,
	ImageError,
	ImageInfo,
	PixelConvert,
	PixelFormat,
	Size,
};



#[must_use]
/// # Header Error.
///
/// A header that will not parse is only "wrong" once the stream is
/// complete; until then, more bytes might fix it.
pub(crate) const fn header_error(completed: bool) -> ImageError {
	if completed { ImageError::DecodeHeadAbnormal }
	else { ImageError::SourceDataIncomplete }
}

#[must_use]
/// # Sampled Size.
///
/// Divide each dimension by the sample size, rounding up.
pub(crate) const fn sampled_size(size: Size, sample: u32) -> Size {
	if sample <= 1 { return size; }
	let sample = sample as i64;
	let w = (size.width as i64 + sample - 1) / sample;
	let h = (size.height as i64 + sample - 1) / sample;
	Size::new(w as i32, h as i32)
}

#[must_use]
/// # Output Info.
///
/// Work out what a decoder will actually hand back for the given options.
/// Formats other than the five conversion targets fall back to RGBA; an
/// unknown alpha type keeps the native one.
pub(crate) const fn output_info(native: &ImageInfo, opts: &DecodeOptions) -> ImageInfo {
	let pixel_format = match opts.desired_pixel_format {
		PixelFormat::Rgba8888 => PixelFormat::Rgba8888,
		PixelFormat::Bgra8888 => PixelFormat::Bgra8888,
		PixelFormat::Argb8888 => PixelFormat::Argb8888,
		PixelFormat::Rgb565 => PixelFormat::Rgb565,
		PixelFormat::RgbaF16 => PixelFormat::RgbaF16,
		_ => PixelFormat::Rgba8888,
	};

	let alpha_type =
		if matches!(opts.desired_alpha_type, AlphaType::Unknown) { native.alpha_type }
		else { opts.desired_alpha_type };

	let color_space =
		if matches!(opts.desired_color_space, ColorSpace::Unknown) { native.color_space }
		else { opts.desired_color_space };

	ImageInfo {
		size: sampled_size(native.size, opts.sample()),
		pixel_format,
		color_space,
		alpha_type: alpha_type.valid_for(pixel_format),
		base_density: native.base_density,
	}
}



#[derive(Debug)]
/// # Row Writer.
///
/// Subsample and convert native rows into an output buffer.
pub(crate) struct RowWriter {
	/// # Converter.
	converter: PixelConvert,

	/// # Sample Size.
	sample: usize,

	/// # Native Width.
	src_width: usize,

	/// # Output Width.
	width: usize,

	/// # Output Height.
	height: usize,

	/// # Output Row Bytes.
	row_bytes: usize,

	/// # Scratch (for subsampling).
	scratch: Vec<u8>,
}

impl RowWriter {
	/// # New.
	///
	/// ## Errors
	///
	/// Returns an error if either size is invalid or the pixels cannot be
	/// converted.
	pub(crate) fn new(native: &ImageInfo, out: &ImageInfo, sample: u32)
	-> Result<Self, ImageError> {
		let converter = PixelConvert::create(native, out)?;
		let (src_width, _) = native.size.dimensions().ok_or(ImageError::DecodeHeadAbnormal)?;
		let (width, height) = out.size.dimensions().ok_or(ImageError::DecodeHeadAbnormal)?;
		let row_bytes = out.row_bytes().ok_or(ImageError::TooLarge)?;
		Ok(Self {
			converter,
			sample: usize::try_from(sample.max(1)).map_err(|_| ImageError::InvalidParameter)?,
			src_width,
			width,
			height,
			row_bytes,
			scratch: Vec::new(),
		})
	}

	/// # Buffer Length.
	pub(crate) fn buffer_len(&self) -> Option<usize> { self.row_bytes.checked_mul(self.height) }

	/// # Write Row.
	///
	/// Write native row `y` into `dst`. Rows that fall between samples are
	/// ignored.
	pub(crate) fn write_row(&mut self, dst: &mut [u8], y: usize, row: &[u8]) {
		if y % self.sample != 0 { return; }
		let y = y / self.sample;
		if self.height <= y { return; }

		let start = y * self.row_bytes;
		let Some(dst) = dst.get_mut(start..start + self.row_bytes) else { return; };

		let bpp = self.converter.src_bytes_per_pixel();
		let src: &[u8] =
			if self.sample == 1 { row }
			else {
				self.scratch.clear();
				for x in (0..self.src_width).step_by(self.sample).take(self.width) {
					if let Some(px) = row.get(x * bpp..(x + 1) * bpp) {
						self.scratch.extend_from_slice(px);
					}
				}
				&self.scratch
			};

		if self.converter.is_need_convert() {
			self.converter.convert(dst, src, self.width);
		}
		else if let Some(src) = src.get(..self.row_bytes) {
			dst.copy_from_slice(src);
		}
	}

	/// # Write All.
	///
	/// Write every row of a contiguous native buffer.
	pub(crate) fn write_all(&mut self, dst: &mut [u8], native: &[u8]) {
		let stride = self.src_width * self.converter.src_bytes_per_pixel();
		if stride == 0 { return; }
		for (y, row) in native.chunks_exact(stride).enumerate() {
			self.write_row(dst, y, row);
		}
	}
}

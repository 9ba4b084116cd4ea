/*!
# `ImgSource` - Scanline Filter
*/

use crate::{
	ImageError,
	ImageInfo,
	PixelConvert,
	PixelFormat,
	Rect,
};



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Filter Row Type.
///
/// How a source row relates to the crop region.
pub enum FilterRowType {
	/// # Outside the region; skip it.
	NonReferenceRow,

	/// # Inside the region.
	NormalReferenceRow,

	/// # The last row of the region.
	LastReferenceRow,
}



#[derive(Debug, Clone)]
/// # Scanline Filter.
///
/// Crop and (optionally) convert one row at a time.
pub struct ScanlineFilter {
	/// # Source Region.
	region: Rect,

	/// # Source Bytes Per Pixel.
	src_bpp: usize,

	/// # Conversion Requested?
	need_convert: bool,

	/// # Converter.
	converter: Option<PixelConvert>,
}

impl ScanlineFilter {
	#[must_use]
	/// # New.
	pub const fn new(src_format: PixelFormat) -> Self {
		Self {
			region: Rect::new(0, 0, 0, 0),
			src_bpp: src_format.bytes_per_pixel(),
			need_convert: false,
			converter: None,
		}
	}

	/// # Set Source Region.
	pub const fn set_src_region(&mut self, region: Rect) { self.region = region; }

	/// # Set Pixel Conversion.
	///
	/// Request conversion from `src` to `dst`. If the two are equivalent,
	/// rows are copied as-is.
	///
	/// ## Errors
	///
	/// If no converter can be built, an error is returned, and subsequent
	/// calls to [`ScanlineFilter::filter_line`] will fail too.
	pub fn set_pixel_convert(&mut self, src: &ImageInfo, dst: &ImageInfo)
	-> Result<(), ImageError> {
		self.need_convert = true;
		match PixelConvert::create(src, dst) {
			Ok(conv) => {
				self.need_convert = conv.is_need_convert();
				self.converter = Some(conv);
				Ok(())
			},
			Err(e) => {
				self.converter = None;
				Err(e)
			},
		}
	}

	#[must_use]
	/// # Row Type.
	pub const fn get_filter_row_type(&self, row: i32) -> FilterRowType {
		let top = self.region.top as i64;
		let bottom = top + self.region.height as i64;
		let row = row as i64;
		if row < top || bottom <= row { FilterRowType::NonReferenceRow }
		else if row + 1 == bottom { FilterRowType::LastReferenceRow }
		else { FilterRowType::NormalReferenceRow }
	}

	/// # Filter Line.
	///
	/// Copy (or convert) the region's slice of `src` into `dst`.
	///
	/// ## Errors
	///
	/// Returns [`ImageError::Crop`] if either buffer is too small for the
	/// region, or [`ImageError::ColorConvert`] if conversion was requested
	/// but no converter could be built.
	pub fn filter_line(&self, dst: &mut [u8], src: &[u8]) -> Result<(), ImageError> {
		let left = usize::try_from(self.region.left).map_err(|_| ImageError::Crop)?;
		let width = usize::try_from(self.region.width).map_err(|_| ImageError::Crop)?;
		let start = left.checked_mul(self.src_bpp).ok_or(ImageError::Crop)?;
		let len = width.checked_mul(self.src_bpp).ok_or(ImageError::Crop)?;
		let end = start.checked_add(len).ok_or(ImageError::Crop)?;
		if dst.is_empty() || src.len() < end { return Err(ImageError::Crop); }
		let src = &src[start..end];

		if self.need_convert {
			let conv = self.converter.as_ref().ok_or(ImageError::ColorConvert)?;
			let dst_len = width.checked_mul(conv.dst_bytes_per_pixel())
				.ok_or(ImageError::Crop)?;
			if dst.len() < dst_len { return Err(ImageError::Crop); }
			conv.convert(dst, src, width);
		}
		else {
			if dst.len() < len { return Err(ImageError::Crop); }
			dst[..len].copy_from_slice(src);
		}

		Ok(())
	}
}



#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		AlphaType,
		Size,
	};

	#[test]
	fn t_row_type() {
		let mut filter = ScanlineFilter::new(PixelFormat::Rgba8888);
		filter.set_src_region(Rect::new(0, 2, 4, 3));
		assert_eq!(filter.get_filter_row_type(0), FilterRowType::NonReferenceRow);
		assert_eq!(filter.get_filter_row_type(2), FilterRowType::NormalReferenceRow);
		assert_eq!(filter.get_filter_row_type(3), FilterRowType::NormalReferenceRow);
		assert_eq!(filter.get_filter_row_type(4), FilterRowType::LastReferenceRow);
		assert_eq!(filter.get_filter_row_type(5), FilterRowType::NonReferenceRow);
	}

	#[test]
	fn t_filter_line() {
		let mut filter = ScanlineFilter::new(PixelFormat::Rgb888);
		filter.set_src_region(Rect::new(1, 0, 2, 1));
		let src = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];

		// Straight copy.
		let mut dst = [0_u8; 6];
		assert!(filter.filter_line(&mut dst, &src).is_ok());
		assert_eq!(dst, [4, 5, 6, 7, 8, 9]);

		// Short buffers.
		assert_eq!(filter.filter_line(&mut [], &src), Err(ImageError::Crop));
		assert_eq!(filter.filter_line(&mut dst, &src[..5]), Err(ImageError::Crop));

		// Conversion.
		let size = Size::new(4, 1);
		assert!(filter.set_pixel_convert(
			&ImageInfo::new(size, PixelFormat::Rgb888, AlphaType::Opaque),
			&ImageInfo::new(size, PixelFormat::Argb8888, AlphaType::Opaque),
		).is_ok());
		let mut dst = [0_u8; 8];
		assert!(filter.filter_line(&mut dst, &src).is_ok());
		assert_eq!(dst, [255, 4, 5, 6, 255, 7, 8, 9]);

		// Broken conversion.
		assert!(filter.set_pixel_convert(
			&ImageInfo::new(size, PixelFormat::Rgb888, AlphaType::Opaque),
			&ImageInfo::new(size, PixelFormat::Gray8, AlphaType::Opaque),
		).is_err());
		assert_eq!(filter.filter_line(&mut dst, &src), Err(ImageError::ColorConvert));
	}
}

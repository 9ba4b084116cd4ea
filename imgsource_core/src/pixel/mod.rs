/*!
# `ImgSource` - Pixels
*/

pub(super) mod convert;
pub(super) mod filter;
pub(super) mod kernel;
pub(super) mod map;

use std::fmt;



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
/// # Pixel Format.
///
/// The in-memory layout of decoded pixels. Eight-bit channel formats store
/// their bytes in the order of their name (`Rgba8888` is `R, G, B, A`);
/// `Rgb565`, the sixteen-bit channel formats, and `RgbaF16` store native-endian
/// `u16` values.
pub enum PixelFormat {
	#[default]
	/// # Unknown.
	Unknown,

	/// # Alpha Only (8-bit).
	Alpha8,

	/// # Greyscale (8-bit).
	Gray8,

	/// # Greyscale + Alpha (8-bit).
	GrayAlpha88,

	/// # RGB (8-bit).
	Rgb888,

	/// # BGR (8-bit).
	Bgr888,

	/// # Packed RGB (5/6/5 bits).
	Rgb565,

	/// # RGBA (8-bit).
	Rgba8888,

	/// # BGRA (8-bit).
	Bgra8888,

	/// # ARGB (8-bit).
	Argb8888,

	/// # RGB (16-bit).
	Rgb161616,

	/// # RGBA (16-bit).
	Rgba16161616,

	/// # CMYK (8-bit, inverted).
	Cmyk,

	/// # RGBA (half-float).
	RgbaF16,
}

impl fmt::Display for PixelFormat {
	#[inline]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl PixelFormat {
	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Unknown => "UNKNOWN",
			Self::Alpha8 => "ALPHA_8",
			Self::Gray8 => "GRAY_8",
			Self::GrayAlpha88 => "GRAY_ALPHA_88",
			Self::Rgb888 => "RGB_888",
			Self::Bgr888 => "BGR_888",
			Self::Rgb565 => "RGB_565",
			Self::Rgba8888 => "RGBA_8888",
			Self::Bgra8888 => "BGRA_8888",
			Self::Argb8888 => "ARGB_8888",
			Self::Rgb161616 => "RGB_161616",
			Self::Rgba16161616 => "RGBA_16161616",
			Self::Cmyk => "CMYK",
			Self::RgbaF16 => "RGBA_F16",
		}
	}

	#[must_use]
	/// # Bytes Per Pixel.
	///
	/// This returns zero for [`PixelFormat::Unknown`].
	pub const fn bytes_per_pixel(self) -> usize {
		match self {
			Self::Unknown => 0,
			Self::Alpha8 | Self::Gray8 => 1,
			Self::GrayAlpha88 | Self::Rgb565 => 2,
			Self::Rgb888 | Self::Bgr888 => 3,
			Self::Rgba8888 | Self::Bgra8888 | Self::Argb8888 | Self::Cmyk => 4,
			Self::Rgb161616 => 6,
			Self::Rgba16161616 | Self::RgbaF16 => 8,
		}
	}

	#[must_use]
	/// # Has Alpha Channel?
	pub const fn has_alpha(self) -> bool {
		matches!(
			self,
			Self::Alpha8 | Self::GrayAlpha88 | Self::Rgba8888 | Self::Bgra8888 |
			Self::Argb8888 | Self::Rgba16161616 | Self::RgbaF16
		)
	}
}



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
/// # Alpha Type.
pub enum AlphaType {
	#[default]
	/// # Unknown.
	Unknown,

	/// # Opaque (No Alpha).
	Opaque,

	/// # Premultiplied.
	Premul,

	/// # Unpremultiplied.
	Unpremul,
}

impl AlphaType {
	#[must_use]
	/// # Valid For Format.
	///
	/// Normalize the alpha type for a given pixel format: formats without an
	/// alpha channel are always opaque, `Alpha8` is always premultiplied, and
	/// an unknown alpha type on a four-channel format is taken to be
	/// premultiplied.
	pub const fn valid_for(self, format: PixelFormat) -> Self {
		match format {
			PixelFormat::Alpha8 => Self::Premul,
			PixelFormat::Rgba8888 | PixelFormat::Bgra8888 | PixelFormat::Argb8888 |
			PixelFormat::RgbaF16 =>
				if matches!(self, Self::Unknown) { Self::Premul }
				else { self },
			PixelFormat::Gray8 | PixelFormat::Rgb888 | PixelFormat::Bgr888 |
			PixelFormat::Rgb565 | PixelFormat::Rgb161616 | PixelFormat::Cmyk => Self::Opaque,
			PixelFormat::Unknown | PixelFormat::GrayAlpha88 | PixelFormat::Rgba16161616 => self,
		}
	}
}



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
/// # Color Space.
pub enum ColorSpace {
	#[default]
	/// # Unknown.
	Unknown,

	/// # sRGB.
	Srgb,

	/// # Linear sRGB.
	LinearSrgb,

	/// # Display P3.
	DisplayP3,

	/// # Adobe RGB (1998).
	AdobeRgb,
}



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
/// # Size.
pub struct Size {
	/// # Width.
	pub width: i32,

	/// # Height.
	pub height: i32,
}

impl Size {
	#[inline]
	#[must_use]
	/// # New.
	pub const fn new(width: i32, height: i32) -> Self { Self { width, height } }

	#[inline]
	#[must_use]
	/// # Is Positive?
	///
	/// Returns `true` if both dimensions are greater than zero.
	pub const fn is_positive(self) -> bool { 0 < self.width && 0 < self.height }

	#[must_use]
	/// # Dimensions as `usize`.
	///
	/// Returns `None` if either dimension is zero or negative.
	pub fn dimensions(self) -> Option<(usize, usize)> {
		if self.is_positive() {
			Some((usize::try_from(self.width).ok()?, usize::try_from(self.height).ok()?))
		}
		else { None }
	}
}



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
/// # Rectangle.
pub struct Rect {
	/// # Left.
	pub left: i32,

	/// # Top.
	pub top: i32,

	/// # Width.
	pub width: i32,

	/// # Height.
	pub height: i32,
}

impl Rect {
	#[inline]
	#[must_use]
	/// # New.
	pub const fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
		Self { left, top, width, height }
	}

	#[inline]
	#[must_use]
	/// # Is Empty?
	///
	/// An empty rectangle means "no crop".
	pub const fn is_empty(self) -> bool { self.width <= 0 || self.height <= 0 }

	#[must_use]
	/// # Fits Within?
	///
	/// Returns `true` if the rectangle lies entirely inside an image of the
	/// given size.
	pub const fn fits(self, size: Size) -> bool {
		0 <= self.left && 0 <= self.top && 0 < self.width && 0 < self.height &&
		(self.left as i64) + (self.width as i64) <= (size.width as i64) &&
		(self.top as i64) + (self.height as i64) <= (size.height as i64)
	}

	#[must_use]
	/// # Is Full Frame?
	///
	/// Returns `true` if the rectangle covers exactly the whole image.
	pub const fn is_full(self, size: Size) -> bool {
		self.left == 0 && self.top == 0 &&
		self.width == size.width && self.height == size.height
	}
}



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
/// # Image Info.
pub struct ImageInfo {
	/// # Dimensions.
	pub size: Size,

	/// # Pixel Format.
	pub pixel_format: PixelFormat,

	/// # Color Space.
	pub color_space: ColorSpace,

	/// # Alpha Type.
	pub alpha_type: AlphaType,

	/// # Base Density (DPI).
	pub base_density: i32,
}

impl ImageInfo {
	#[must_use]
	/// # New.
	pub const fn new(size: Size, pixel_format: PixelFormat, alpha_type: AlphaType) -> Self {
		Self {
			size,
			pixel_format,
			color_space: ColorSpace::Srgb,
			alpha_type,
			base_density: 0,
		}
	}

	#[must_use]
	/// # Row Bytes.
	///
	/// Returns `None` if the width is invalid or the multiplication
	/// overflows.
	pub fn row_bytes(&self) -> Option<usize> {
		let width = usize::try_from(self.size.width).ok()?;
		width.checked_mul(self.pixel_format.bytes_per_pixel())
	}

	#[must_use]
	/// # Buffer Length.
	///
	/// Total bytes needed to hold every pixel, overflow-checked.
	pub fn buffer_len(&self) -> Option<usize> {
		let height = usize::try_from(self.size.height).ok()?;
		self.row_bytes()?.checked_mul(height)
	}
}



#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn t_alpha_valid_for() {
		assert_eq!(AlphaType::Unpremul.valid_for(PixelFormat::Rgb565), AlphaType::Opaque);
		assert_eq!(AlphaType::Unknown.valid_for(PixelFormat::Rgba8888), AlphaType::Premul);
		assert_eq!(AlphaType::Unpremul.valid_for(PixelFormat::Bgra8888), AlphaType::Unpremul);
		assert_eq!(AlphaType::Opaque.valid_for(PixelFormat::Alpha8), AlphaType::Premul);
		assert_eq!(AlphaType::Unknown.valid_for(PixelFormat::Unknown), AlphaType::Unknown);
	}

	#[test]
	fn t_rect() {
		let size = Size::new(10, 8);
		assert!(Rect::new(0, 0, 10, 8).fits(size));
		assert!(Rect::new(0, 0, 10, 8).is_full(size));
		assert!(Rect::new(2, 3, 4, 5).fits(size));
		assert!(! Rect::new(2, 3, 9, 5).fits(size));
		assert!(! Rect::new(-1, 0, 2, 2).fits(size));
		assert!(Rect::default().is_empty());
	}

	#[test]
	fn t_buffer_len() {
		let info = ImageInfo::new(Size::new(3, 2), PixelFormat::RgbaF16, AlphaType::Premul);
		assert_eq!(info.row_bytes(), Some(24));
		assert_eq!(info.buffer_len(), Some(48));

		let info = ImageInfo::new(Size::new(-3, 2), PixelFormat::Rgba8888, AlphaType::Premul);
		assert_eq!(info.buffer_len(), None);
	}
}

/*!
# `ImgSource` - Pixel Kernels

Channel math shared by the conversion table: alpha (un)premultiplication,
half-float bit twiddling, and the per-format pixel readers and writers that
get monomorphized into the individual conversion kernels.
*/

use super::PixelFormat;



/// # Largest Premultiply Input.
///
/// Anything wider than fifteen bits is rejected outright.
const PREMUL_MAX: u32 = 0x7FFF;



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Alpha Conversion.
pub(crate) enum AlphaConvert {
	/// # Leave Alone.
	NoConvert,

	/// # Premultiply.
	Premul,

	/// # Unpremultiply.
	Unpremul,

	/// # Unpremultiply, then force opaque.
	UnpremulOpaque,

	/// # Force opaque.
	Opaque,
}

impl AlphaConvert {
	#[inline]
	/// # Apply.
	///
	/// Run the conversion against a single RGBA pixel.
	pub(crate) const fn apply(self, px: [u8; 4]) -> [u8; 4] {
		let [r, g, b, a] = px;
		match self {
			Self::NoConvert => px,
			Self::Premul => [
				premul_255(r as u32, a as u32),
				premul_255(g as u32, a as u32),
				premul_255(b as u32, a as u32),
				a,
			],
			Self::Unpremul => [
				unpremul_255(r, a),
				unpremul_255(g, a),
				unpremul_255(b, a),
				a,
			],
			Self::UnpremulOpaque => [
				unpremul_255(r, a),
				unpremul_255(g, a),
				unpremul_255(b, a),
				255,
			],
			Self::Opaque => [r, g, b, 255],
		}
	}
}



#[must_use]
/// # Premultiply.
///
/// Return `round(color * alpha / 255)`. Inputs wider than fifteen bits, or a
/// multiplication that would overflow, yield zero.
pub const fn premul_255(color: u32, alpha: u32) -> u8 {
	if PREMUL_MAX < color || PREMUL_MAX < alpha { return 0; }
	let Some(product) = color.checked_mul(alpha) else { return 0; };
	let out = (product + 127) / 255;
	if 255 < out { 255 }
	else { out as u8 }
}

#[must_use]
/// # Unpremultiply.
///
/// Return `round(color * 255 / alpha)`, clamped to `0..=255`. Zero color or
/// zero alpha stay zero; full alpha returns the color unchanged.
pub const fn unpremul_255(color: u8, alpha: u8) -> u8 {
	if color == 0 || alpha == 0 { return 0; }
	if alpha == 255 { return color; }
	let alpha = alpha as u32;
	let out = (color as u32 * 255 + alpha / 2) / alpha;
	if 255 < out { 255 }
	else { out as u8 }
}



#[must_use]
/// # `f32` to Half-Float Bits.
///
/// Round-to-nearest conversion of a single-precision float to IEEE-754
/// binary16, including subnormals, infinities, and NaN.
pub const fn f32_to_f16(value: f32) -> u16 {
	let bits = value.to_bits();
	let sign = ((bits >> 16) & 0x8000) as u16;
	let exp = ((bits >> 23) & 0xFF) as i32;
	let mant = bits & 0x007F_FFFF;

	// Infinity and NaN.
	if exp == 0xFF {
		return sign | 0x7C00 | if mant == 0 { 0 } else { 0x0200 };
	}

	let mut half_exp = exp - 127 + 15;

	// Too big.
	if 0x1F <= half_exp { return sign | 0x7C00; }

	// Subnormal (or zero).
	if half_exp <= 0 {
		if half_exp < -10 { return sign; }
		let full = mant | 0x0080_0000;
		let shift = (14 - half_exp) as u32;
		let rounded = (full + (1 << (shift - 1))) >> shift;
		return sign | rounded as u16;
	}

	// Normal.
	let mut rounded = mant + 0x1000;
	if rounded & 0x0080_0000 != 0 {
		rounded = 0;
		half_exp += 1;
		if 0x1F <= half_exp { return sign | 0x7C00; }
	}

	sign | ((half_exp as u16) << 10) | (rounded >> 13) as u16
}

#[must_use]
/// # Half-Float Bits to `f32`.
pub const fn f16_to_f32(half: u16) -> f32 {
	let sign = ((half & 0x8000) as u32) << 16;
	let exp = ((half >> 10) & 0x1F) as u32;
	let mant = (half & 0x03FF) as u32;

	let bits =
		if exp == 0 {
			if mant == 0 { sign }
			else {
				// Normalize the subnormal.
				let mut e = 113_u32;
				let mut m = mant;
				while m & 0x0400 == 0 {
					m <<= 1;
					e -= 1;
				}
				sign | (e << 23) | ((m & 0x03FF) << 13)
			}
		}
		else if exp == 0x1F { sign | 0x7F80_0000 | (mant << 13) }
		else { sign | ((exp + 112) << 23) | (mant << 13) };

	f32::from_bits(bits)
}

#[inline]
#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss, reason = "Value is 0..=255.")]
/// # Half-Float to Channel.
fn f16_to_u8(half: u16) -> u8 {
	let v = f16_to_f32(half);
	// NaN lands at zero.
	if v.is_nan() || v <= 0.0 { 0 }
	else if 1.0 <= v { 255 }
	else { (v * 255.0).round() as u8 }
}

#[inline]
/// # Channel to Half-Float.
fn u8_to_f16(v: u8) -> u16 { f32_to_f16(f32::from(v) / 255.0) }

#[inline]
/// # Native-Endian `u16` at Offset.
fn ne_u16(src: &[u8], idx: usize) -> u16 {
	u16::from_ne_bytes([src[idx * 2], src[idx * 2 + 1]])
}

#[inline]
/// # High Byte of a Native-Endian `u16`.
fn ne_u16_hi(src: &[u8], idx: usize) -> u8 { ne_u16(src, idx).to_be_bytes()[0] }



/// # Readable Pixel Layout.
///
/// Each implementation unpacks one source pixel into straight RGBA.
pub(crate) trait ReadPixel {
	/// # Format.
	const FORMAT: PixelFormat;

	/// # Read.
	///
	/// The slice is exactly `FORMAT.bytes_per_pixel()` long.
	fn read(src: &[u8]) -> [u8; 4];
}

/// # Writable Pixel Layout.
///
/// Each implementation packs one RGBA pixel into its own layout.
pub(crate) trait WritePixel {
	/// # Format.
	const FORMAT: PixelFormat;

	/// # Write.
	///
	/// The slice is exactly `FORMAT.bytes_per_pixel()` long.
	fn write(dst: &mut [u8], px: [u8; 4]);
}

/// # Helper: Layout Marker Types.
macro_rules! layout {
	($($ty:ident),+ $(,)?) => ($(
		#[derive(Debug, Clone, Copy)]
		#[doc = concat!("# `", stringify!($ty), "` Layout.")]
		pub(crate) struct $ty;
	)+);
}

layout!(
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

impl ReadPixel for Gray8 {
	const FORMAT: PixelFormat = PixelFormat::Gray8;
	#[inline]
	fn read(src: &[u8]) -> [u8; 4] { [src[0], src[0], src[0], 255] }
}

impl ReadPixel for GrayAlpha88 {
	const FORMAT: PixelFormat = PixelFormat::GrayAlpha88;
	#[inline]
	fn read(src: &[u8]) -> [u8; 4] { [src[0], src[0], src[0], src[1]] }
}

impl ReadPixel for Rgb888 {
	const FORMAT: PixelFormat = PixelFormat::Rgb888;
	#[inline]
	fn read(src: &[u8]) -> [u8; 4] { [src[0], src[1], src[2], 255] }
}

impl ReadPixel for Bgr888 {
	const FORMAT: PixelFormat = PixelFormat::Bgr888;
	#[inline]
	fn read(src: &[u8]) -> [u8; 4] { [src[2], src[1], src[0], 255] }
}

impl ReadPixel for Rgb565 {
	const FORMAT: PixelFormat = PixelFormat::Rgb565;
	#[inline]
	fn read(src: &[u8]) -> [u8; 4] {
		let v = ne_u16(src, 0);
		let r = ((v >> 11) & 0x1F) as u8;
		let g = ((v >> 5) & 0x3F) as u8;
		let b = (v & 0x1F) as u8;
		[(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2), 255]
	}
}

impl ReadPixel for Rgba8888 {
	const FORMAT: PixelFormat = PixelFormat::Rgba8888;
	#[inline]
	fn read(src: &[u8]) -> [u8; 4] { [src[0], src[1], src[2], src[3]] }
}

impl ReadPixel for Bgra8888 {
	const FORMAT: PixelFormat = PixelFormat::Bgra8888;
	#[inline]
	fn read(src: &[u8]) -> [u8; 4] { [src[2], src[1], src[0], src[3]] }
}

impl ReadPixel for Argb8888 {
	const FORMAT: PixelFormat = PixelFormat::Argb8888;
	#[inline]
	fn read(src: &[u8]) -> [u8; 4] { [src[1], src[2], src[3], src[0]] }
}

impl ReadPixel for Rgb161616 {
	const FORMAT: PixelFormat = PixelFormat::Rgb161616;
	#[inline]
	fn read(src: &[u8]) -> [u8; 4] {
		[ne_u16_hi(src, 0), ne_u16_hi(src, 1), ne_u16_hi(src, 2), 255]
	}
}

impl ReadPixel for Rgba16161616 {
	const FORMAT: PixelFormat = PixelFormat::Rgba16161616;
	#[inline]
	fn read(src: &[u8]) -> [u8; 4] {
		[ne_u16_hi(src, 0), ne_u16_hi(src, 1), ne_u16_hi(src, 2), ne_u16_hi(src, 3)]
	}
}

impl ReadPixel for Cmyk {
	const FORMAT: PixelFormat = PixelFormat::Cmyk;
	#[inline]
	#[expect(clippy::cast_possible_truncation, reason = "Max is 255.")]
	fn read(src: &[u8]) -> [u8; 4] {
		let k = u16::from(src[3]);
		let ch = |v: u8| (u16::from(v) * k / 255) as u8;
		[ch(src[0]), ch(src[1]), ch(src[2]), 255]
	}
}

impl ReadPixel for RgbaF16 {
	const FORMAT: PixelFormat = PixelFormat::RgbaF16;
	#[inline]
	fn read(src: &[u8]) -> [u8; 4] {
		[
			f16_to_u8(ne_u16(src, 0)),
			f16_to_u8(ne_u16(src, 1)),
			f16_to_u8(ne_u16(src, 2)),
			f16_to_u8(ne_u16(src, 3)),
		]
	}
}

impl WritePixel for Argb8888 {
	const FORMAT: PixelFormat = PixelFormat::Argb8888;
	#[inline]
	fn write(dst: &mut [u8], [r, g, b, a]: [u8; 4]) {
		dst.copy_from_slice(&[a, r, g, b]);
	}
}

impl WritePixel for Rgba8888 {
	const FORMAT: PixelFormat = PixelFormat::Rgba8888;
	#[inline]
	fn write(dst: &mut [u8], px: [u8; 4]) { dst.copy_from_slice(&px); }
}

impl WritePixel for Bgra8888 {
	const FORMAT: PixelFormat = PixelFormat::Bgra8888;
	#[inline]
	fn write(dst: &mut [u8], [r, g, b, a]: [u8; 4]) {
		dst.copy_from_slice(&[b, g, r, a]);
	}
}

impl WritePixel for Rgb565 {
	const FORMAT: PixelFormat = PixelFormat::Rgb565;
	#[inline]
	fn write(dst: &mut [u8], [r, g, b, _]: [u8; 4]) {
		let v: u16 =
			(u16::from(r >> 3) << 11) |
			(u16::from(g >> 2) << 5) |
			u16::from(b >> 3);
		dst.copy_from_slice(&v.to_ne_bytes());
	}
}

impl WritePixel for RgbaF16 {
	const FORMAT: PixelFormat = PixelFormat::RgbaF16;
	#[inline]
	fn write(dst: &mut [u8], px: [u8; 4]) {
		for (chunk, v) in dst.chunks_exact_mut(2).zip(px) {
			chunk.copy_from_slice(&u8_to_f16(v).to_ne_bytes());
		}
	}
}

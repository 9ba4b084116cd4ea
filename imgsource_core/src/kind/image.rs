/*!
# `ImgSource` - Image Kind
*/

use crate::FormatAgent;
use std::fmt;



/// # MIME: Raw.
pub const MIME_RAW: &str = "image/x-raw";



#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
/// # Image Kind.
///
/// The built-in encoded formats, each of which doubles as its own
/// [`FormatAgent`].
pub enum ImageKind {
	/// # JPEG.
	Jpeg,

	/// # PNG.
	Png,

	/// # GIF.
	Gif,

	/// # BMP.
	Bmp,

	/// # WebP.
	Webp,

	/// # HEIF.
	Heif,

	/// # Raw Pixels.
	///
	/// The catch-all: it accepts anything and is never scanned.
	Raw,
}

impl AsRef<str> for ImageKind {
	#[inline]
	fn as_ref(&self) -> &str { self.as_str() }
}

impl fmt::Display for ImageKind {
	#[inline]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl TryFrom<&[u8]> for ImageKind {
	type Error = crate::ImageError;

	/// # From Raw Bytes.
	///
	/// Check the magic against every agent but the raw one.
	fn try_from(src: &[u8]) -> Result<Self, Self::Error> {
		Self::ALL.into_iter()
			.find(|k| ! matches!(k, Self::Raw) && k.check_format(src))
			.ok_or(crate::ImageError::UnknownFormat)
	}
}

impl FormatAgent for ImageKind {
	#[inline]
	fn format_type(&self) -> &str { self.mime() }

	#[inline]
	fn header_size(&self) -> usize {
		match self {
			Self::Jpeg => 3,
			Self::Png => 8,
			Self::Gif => 6,
			Self::Bmp => 2,
			Self::Webp => 14,
			Self::Heif => 12,
			Self::Raw => 0,
		}
	}

	fn check_format(&self, src: &[u8]) -> bool {
		if src.len() < self.header_size() { return false; }
		match self {
			Self::Jpeg => src[..3] == [0xFF, 0xD8, 0xFF],
			Self::Png => src[..8] == [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'],
			Self::Gif => src[..6] == *b"GIF87a" || src[..6] == *b"GIF89a",
			Self::Bmp => src[..2] == *b"BM",
			Self::Webp => src[..4] == *b"RIFF" && src[8..14] == *b"WEBPVP",
			Self::Heif =>
				src[4..8] == *b"ftyp" &&
				matches!(&src[8..12], b"heic" | b"heix" | b"hevc" | b"hevx" | b"mif1" | b"msf1"),
			Self::Raw => true,
		}
	}
}

/// ## Getters.
impl ImageKind {
	/// # All Kinds.
	///
	/// In registry order; raw comes last.
	pub const ALL: [Self; 7] = [
		Self::Jpeg, Self::Png, Self::Gif, Self::Bmp, Self::Webp, Self::Heif, Self::Raw,
	];

	#[must_use]
	/// # As String Slice.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Jpeg => "JPEG",
			Self::Png => "PNG",
			Self::Gif => "GIF",
			Self::Bmp => "BMP",
			Self::Webp => "WebP",
			Self::Heif => "HEIF",
			Self::Raw => "Raw",
		}
	}

	#[must_use]
	/// # MIME Type.
	pub const fn mime(self) -> &'static str {
		match self {
			Self::Jpeg => "image/jpeg",
			Self::Png => "image/png",
			Self::Gif => "image/gif",
			Self::Bmp => "image/bmp",
			Self::Webp => "image/webp",
			Self::Heif => "image/heif",
			Self::Raw => MIME_RAW,
		}
	}

	#[must_use]
	/// # From MIME Type.
	pub fn from_mime(mime: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|k| k.mime().eq_ignore_ascii_case(mime))
	}

	#[must_use]
	/// # Extension.
	pub const fn extension(self) -> &'static str {
		match self {
			Self::Jpeg => "jpg",
			Self::Png => "png",
			Self::Gif => "gif",
			Self::Bmp => "bmp",
			Self::Webp => "webp",
			Self::Heif => "heic",
			Self::Raw => "raw",
		}
	}
}

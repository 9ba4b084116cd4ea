/*!
# `ImgSource` - Error
*/

use std::{
	error::Error,
	fmt,
};



#[cfg(feature = "bin")]
/// # Help Text.
const HELP: &str = concat!(r#"
ImgSource v"#, env!("CARGO_PKG_VERSION"), r#"
Identify and decode JPEG, PNG, BMP, and WebP images.

USAGE:
    imgsource [FLAGS] [OPTIONS] <FILE(S)>...

FLAGS:
    -h, --help              Print help information and exit.
    -i, --info              Print the image info only; skip pixel decoding.
    -V, --version           Print version information and exit.

OPTIONS:
    -c, --chunk <NUM>       Feed the file to an incremental decoder <NUM>
                            bytes at a time instead of decoding it in one go.
    -f, --format <MIME>     Format hint, e.g. "image/png".
    -s, --sample <NUM>      Downsample by this integer factor.

TRAILING ARGS:
    <FILE(S)>...            One or more image files to decode.
"#);

/// # Success.
///
/// The status code reported by [`ImageError::code`] is never this value; it
/// is here for callers juggling raw status codes.
pub const SUCCESS: u32 = 0;

/// # Error Base.
///
/// Every error code is this base plus the variant offset.
pub const ERR_BASE: u32 = 0x0380_0000;



#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
/// # Errors.
pub enum ImageError {
	/// # Source data is unreadable or missing.
	SourceData,

	/// # Source data is incomplete (more bytes may fix it).
	SourceDataIncomplete,

	/// # Encoded format is unknown.
	UnknownFormat,

	/// # No decoder could be created for the format.
	PluginCreateFailed,

	/// # The header could not be parsed.
	DecodeHeadAbnormal,

	/// # The pixel data could not be decoded.
	DecodeAbnormal,

	/// # Decoding failed.
	DecodeFailed,

	/// # Memory allocation failed.
	MallocAbnormal,

	/// # Invalid parameter.
	InvalidParameter,

	/// # Operation not supported by the decoder.
	DataUnsupport,

	/// # Malformed (non-image) data.
	DataAbnormal,

	/// # Cropping failed.
	Crop,

	/// # Color conversion failed.
	ColorConvert,

	/// # Resize or rotation failed.
	Transform,

	/// # Image dimensions are too big.
	TooLarge,

	/// # The requested property does not exist.
	PropertyNotExist,

	#[cfg(feature = "bin")]
	/// # No Images.
	NoImages,

	#[cfg(feature = "bin")]
	/// # Print Help (Not an Error).
	PrintHelp,

	#[cfg(feature = "bin")]
	/// # Print Version (Not an Error).
	PrintVersion,
}

impl AsRef<str> for ImageError {
	#[inline]
	fn as_ref(&self) -> &str { self.as_str() }
}

impl Error for ImageError {}

impl fmt::Display for ImageError {
	#[inline]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl ImageError {
	#[must_use]
	/// # As Str.
	///
	/// Return the error as an English string slice.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::SourceData => "The image source could not be read.",
			Self::SourceDataIncomplete => "The image source is incomplete.",
			Self::UnknownFormat => "The image format is unknown.",
			Self::PluginCreateFailed => "No decoder is available for this format.",
			Self::DecodeHeadAbnormal => "The image header is invalid.",
			Self::DecodeAbnormal => "The image data is invalid.",
			Self::DecodeFailed => "The image could not be decoded.",
			Self::MallocAbnormal => "Unable to allocate the pixel buffer.",
			Self::InvalidParameter => "Invalid parameter.",
			Self::DataUnsupport => "The operation is not supported.",
			Self::DataAbnormal => "The data is malformed.",
			Self::Crop => "The image could not be cropped.",
			Self::ColorConvert => "The pixel format could not be converted.",
			Self::Transform => "The image could not be transformed.",
			Self::TooLarge => "The image dimensions are out of range.",
			Self::PropertyNotExist => "The property does not exist.",
			#[cfg(feature = "bin")] Self::NoImages => "No images were specified.",
			#[cfg(feature = "bin")] Self::PrintHelp => HELP,
			#[cfg(feature = "bin")] Self::PrintVersion => concat!("ImgSource v", env!("CARGO_PKG_VERSION")),
		}
	}

	#[must_use]
	/// # Status Code.
	///
	/// Return the numeric status code for this error. Codes are stable and
	/// never equal [`SUCCESS`].
	pub const fn code(self) -> u32 {
		ERR_BASE + match self {
			Self::SourceData => 1,
			Self::SourceDataIncomplete => 2,
			Self::UnknownFormat => 3,
			Self::PluginCreateFailed => 4,
			Self::DecodeHeadAbnormal => 5,
			Self::DecodeAbnormal => 6,
			Self::DecodeFailed => 7,
			Self::MallocAbnormal => 8,
			Self::InvalidParameter => 9,
			Self::DataUnsupport => 10,
			Self::DataAbnormal => 11,
			Self::Crop => 12,
			Self::ColorConvert => 13,
			Self::Transform => 14,
			Self::TooLarge => 15,
			Self::PropertyNotExist => 16,
			#[cfg(feature = "bin")] Self::NoImages => 100,
			#[cfg(feature = "bin")] Self::PrintHelp => 101,
			#[cfg(feature = "bin")] Self::PrintVersion => 102,
		}
	}

	#[must_use]
	/// # Is Incomplete?
	///
	/// Returns `true` for the one recoverable error: not enough bytes (yet).
	pub const fn is_incomplete(self) -> bool {
		matches!(self, Self::SourceDataIncomplete)
	}
}

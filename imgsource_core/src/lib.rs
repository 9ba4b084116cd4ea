/*!
# `ImgSource` - Library

This crate turns encoded images into pixels. It sniffs the format, parses
file and image headers lazily, and decodes either in one go or a bit at a
time as data arrives. Output can be cropped, resized, rotated, and converted
between a handful of pixel formats along the way.

The entry point is [`ImageSource`], backed by a [`CodecRegistry`] of format
agents and decoder factories.
*/

#![deny(unsafe_code)]

#![warn(clippy::filetype_is_file)]
#![warn(clippy::integer_division)]
#![warn(clippy::needless_borrow)]
#![warn(clippy::nursery)]
#![warn(clippy::pedantic)]
#![warn(clippy::perf)]
#![warn(clippy::suboptimal_flops)]
#![warn(clippy::unneeded_field_pattern)]
#![warn(macro_use_extern_crate)]
#![warn(missing_copy_implementations)]
#![warn(missing_debug_implementations)]
#![warn(missing_docs)]
#![warn(non_ascii_idents)]
#![warn(trivial_casts)]
#![warn(trivial_numeric_casts)]
#![warn(unreachable_pub)]
#![warn(unused_crate_dependencies)]
#![warn(unused_extern_crates)]
#![warn(unused_import_braces)]

#![allow(clippy::module_name_repetitions)]



mod error;
mod kind;
mod options;
mod pixel;
mod post;
mod registry;
mod source;
mod stream;
mod traits;

pub use error::{
	ERR_BASE,
	ImageError,
	SUCCESS,
};
pub use kind::image::{
	ImageKind,
	MIME_RAW,
};
pub use options::{
	DecodeContext,
	DecodeOptions,
	IncrementalSourceOptions,
	ProgDecodeContext,
	SourceOptions,
};
pub use pixel::{
	AlphaType,
	ColorSpace,
	ImageInfo,
	PixelFormat,
	Rect,
	Size,
	convert::{
		PixelConvert,
		supported_conversions,
	},
	filter::{
		FilterRowType,
		ScanlineFilter,
	},
	kernel::{
		f16_to_f32,
		f32_to_f16,
		premul_255,
		unpremul_255,
	},
	map::{
		AllocatorType,
		NinePatch,
		PixelMap,
		PixelMapId,
	},
};
pub use post::{
	FinalOutputStep,
	decode_post_proc,
	final_output_step,
};
pub use registry::{
	CodecRegistry,
	DecoderFactory,
};
pub use source::{
	ImageSource,
	incremental::IncrementalPixelMap,
	listener::{
		DecodeEvent,
		DecodeListener,
		PeerListener,
	},
	state::{
		ImageDecodingState,
		ImageDecodingStatus,
		SourceDecodingState,
		SourceInfo,
		SourceInfoState,
	},
};
pub use stream::{
	SharedStream,
	SourceStream,
	StreamType,
	buffer::BufferSourceStream,
	file::FileSourceStream,
	incremental::{
		IncrementalMode,
		IncrementalSourceStream,
	},
};
pub use traits::{
	DecoderState,
	FormatAgent,
	ImageDecoder,
};

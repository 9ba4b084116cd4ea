/*!
# `ImgSource` - Options
*/

use crate::{
	AllocatorType,
	AlphaType,
	ColorSpace,
	ImageInfo,
	IncrementalMode,
	NinePatch,
	PixelFormat,
	Rect,
	Size,
};



#[derive(Debug, Clone, Default, Eq, PartialEq)]
/// # Source Options.
pub struct SourceOptions {
	/// # Format Hint.
	///
	/// A MIME type like `"image/png"` to check before all the others.
	pub format_hint: String,

	/// # Base Density.
	pub base_density: i32,

	/// # Pixel Format (Raw Sources).
	pub pixel_format: PixelFormat,

	/// # Size (Raw Sources).
	pub size: Size,
}



#[derive(Debug, Clone, Default, Eq, PartialEq)]
/// # Incremental Source Options.
pub struct IncrementalSourceOptions {
	/// # Source Options.
	pub source_options: SourceOptions,

	/// # Mode.
	pub incremental_mode: IncrementalMode,
}



#[derive(Debug, Clone, Copy, PartialEq)]
/// # Decode Options.
pub struct DecodeOptions {
	/// # Fit Density.
	///
	/// When this and the source's base density are both set and differ, the
	/// output is rescaled by `fit_density / base_density`.
	pub fit_density: i32,

	/// # Crop Region.
	///
	/// An empty rectangle means no crop.
	pub crop_rect: Rect,

	/// # Desired Size.
	pub desired_size: Size,

	/// # Rotation (Degrees).
	pub rotate_degrees: f32,

	/// # Sample Size.
	///
	/// An integer downscale factor applied by the decoder.
	pub sample_size: u32,

	/// # Desired Pixel Format.
	pub desired_pixel_format: PixelFormat,

	/// # Desired Alpha Type.
	pub desired_alpha_type: AlphaType,

	/// # Desired Color Space.
	pub desired_color_space: ColorSpace,

	/// # Allow Partial Image?
	pub allow_partial_image: bool,

	/// # Editable?
	pub editable: bool,

	/// # Allocator Type.
	pub allocator_type: AllocatorType,
}

impl Default for DecodeOptions {
	fn default() -> Self {
		Self {
			fit_density: 0,
			crop_rect: Rect::default(),
			desired_size: Size::default(),
			rotate_degrees: 0.0,
			sample_size: 1,
			desired_pixel_format: PixelFormat::Unknown,
			desired_alpha_type: AlphaType::Unknown,
			desired_color_space: ColorSpace::Unknown,
			allow_partial_image: true,
			editable: false,
			allocator_type: AllocatorType::Default,
		}
	}
}

impl DecodeOptions {
	#[inline]
	#[must_use]
	/// # Sample Size.
	///
	/// Zero is treated as one.
	pub const fn sample(&self) -> u32 {
		if self.sample_size == 0 { 1 }
		else { self.sample_size }
	}
}



#[derive(Debug, Default)]
/// # Decode Context.
///
/// The per-call output of a decoder: pixels, the info describing them, and
/// any extras discovered along the way.
pub struct DecodeContext {
	/// # Pixels.
	///
	/// Decoders allocate this themselves if it arrives empty.
	pub pixels: Vec<u8>,

	/// # Allocator.
	pub allocator: AllocatorType,

	/// # Output Info.
	pub info: ImageInfo,

	/// # Partial Output?
	///
	/// Set when only some of the rows have been decoded.
	pub is_partial: bool,

	/// # Nine-Patch.
	pub nine_patch: Option<NinePatch>,
}

impl DecodeContext {
	#[must_use]
	/// # New.
	pub const fn new(allocator: AllocatorType) -> Self {
		Self {
			pixels: Vec::new(),
			allocator,
			info: ImageInfo::new(Size::new(0, 0), PixelFormat::Unknown, AlphaType::Unknown),
			is_partial: false,
			nine_patch: None,
		}
	}
}



#[derive(Debug, Default)]
/// # Progressive Decode Context.
pub struct ProgDecodeContext {
	/// # Decode Context.
	pub decode_context: DecodeContext,

	/// # Progress (0-100).
	pub total_process_progress: u8,
}

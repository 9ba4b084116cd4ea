/*!
# `ImgSource` - Pixel Map
*/

use crate::{
	ImageError,
	ImageInfo,
	PixelFormat,
	Size,
};
use std::sync::atomic::{
	AtomicU64,
	Ordering::Relaxed,
};



/// # Next Pixel Map ID.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
/// # Allocator Type.
pub enum AllocatorType {
	#[default]
	/// # Whatever.
	Default,

	/// # Heap.
	Heap,

	/// # Shared Memory.
	///
	/// Shared-memory requests are honored with an ordinary heap buffer tagged
	/// as shared, so consumers can still tell what was asked for.
	SharedMem,

	/// # Caller-Managed.
	Custom,
}



#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
/// # Pixel Map ID.
///
/// Every [`PixelMap`] gets a unique ID at construction. Incremental decoding
/// sessions are keyed by it.
pub struct PixelMapId(u64);

impl PixelMapId {
	#[must_use]
	/// # Next.
	fn next() -> Self { Self(NEXT_ID.fetch_add(1, Relaxed)) }

	#[inline]
	#[must_use]
	/// # As `u64`.
	pub const fn get(self) -> u64 { self.0 }
}



#[derive(Debug, Clone, Default, Eq, PartialEq)]
/// # Nine-Patch Data.
///
/// The raw payload of a PNG `npTc` chunk, plus the stretch region counts
/// when they could be read.
pub struct NinePatch {
	/// # Raw Chunk Data.
	pub data: Vec<u8>,

	/// # Horizontal Divs.
	pub x_divs: u8,

	/// # Vertical Divs.
	pub y_divs: u8,
}

impl NinePatch {
	#[must_use]
	/// # From Chunk.
	pub fn from_chunk(data: &[u8]) -> Self {
		// Byte zero is the "was deserialized" flag, then the counts.
		let x_divs = data.get(1).copied().unwrap_or(0);
		let y_divs = data.get(2).copied().unwrap_or(0);
		Self { data: data.to_vec(), x_divs, y_divs }
	}
}



/// # Allocate Pixels.
///
/// Return a zero-filled buffer of `len` bytes.
///
/// ## Errors
///
/// If the allocation fails, [`ImageError::MallocAbnormal`] is returned.
pub(crate) fn alloc_pixels(len: usize) -> Result<Vec<u8>, ImageError> {
	if len == 0 { return Err(ImageError::MallocAbnormal); }
	let mut out: Vec<u8> = Vec::new();
	out.try_reserve_exact(len).map_err(|_| {
		log::error!("Unable to allocate {len} bytes of pixels.");
		ImageError::MallocAbnormal
	})?;
	out.resize(len, 0);
	Ok(out)
}



#[derive(Debug)]
/// # Pixel Map.
///
/// A decoded image: info, row stride, and the pixels themselves.
pub struct PixelMap {
	/// # ID.
	id: PixelMapId,

	/// # Info.
	info: ImageInfo,

	/// # Row Bytes.
	row_bytes: usize,

	/// # Pixels.
	pixels: Vec<u8>,

	/// # Allocator.
	allocator: AllocatorType,

	/// # Editable?
	editable: bool,

	/// # Nine-Patch.
	nine_patch: Option<NinePatch>,
}

impl Default for PixelMap {
	#[inline]
	fn default() -> Self { Self::empty() }
}

impl PixelMap {
	#[must_use]
	/// # Empty.
	///
	/// An empty map with a fresh ID, for incremental decoding to fill.
	pub fn empty() -> Self {
		Self {
			id: PixelMapId::next(),
			info: ImageInfo::default(),
			row_bytes: 0,
			pixels: Vec::new(),
			allocator: AllocatorType::Default,
			editable: false,
			nine_patch: None,
		}
	}

	/// # New.
	///
	/// ## Errors
	///
	/// Returns [`ImageError::InvalidParameter`] if the pixel buffer length
	/// does not match the info.
	pub fn new(info: ImageInfo, pixels: Vec<u8>, allocator: AllocatorType)
	-> Result<Self, ImageError> {
		let row_bytes = info.row_bytes().ok_or(ImageError::InvalidParameter)?;
		if info.buffer_len() != Some(pixels.len()) || pixels.is_empty() {
			return Err(ImageError::InvalidParameter);
		}

		let mut out = Self::empty();
		out.info = info;
		out.row_bytes = row_bytes;
		out.pixels = pixels;
		out.allocator = allocator;
		Ok(out)
	}
}

/// ## Getters.
impl PixelMap {
	#[inline]
	#[must_use]
	/// # ID.
	pub const fn id(&self) -> PixelMapId { self.id }

	#[inline]
	#[must_use]
	/// # Info.
	pub const fn info(&self) -> &ImageInfo { &self.info }

	#[inline]
	#[must_use]
	/// # Width.
	pub const fn width(&self) -> i32 { self.info.size.width }

	#[inline]
	#[must_use]
	/// # Height.
	pub const fn height(&self) -> i32 { self.info.size.height }

	#[inline]
	#[must_use]
	/// # Size.
	pub const fn size(&self) -> Size { self.info.size }

	#[inline]
	#[must_use]
	/// # Pixel Format.
	pub const fn pixel_format(&self) -> PixelFormat { self.info.pixel_format }

	#[inline]
	#[must_use]
	/// # Row Bytes.
	pub const fn row_bytes(&self) -> usize { self.row_bytes }

	#[inline]
	#[must_use]
	/// # Pixels.
	pub fn pixels(&self) -> &[u8] { &self.pixels }

	#[inline]
	#[must_use]
	/// # Allocator.
	pub const fn allocator(&self) -> AllocatorType { self.allocator }

	#[inline]
	#[must_use]
	/// # Editable?
	pub const fn is_editable(&self) -> bool { self.editable }

	#[inline]
	#[must_use]
	/// # Nine-Patch.
	pub const fn nine_patch(&self) -> Option<&NinePatch> { self.nine_patch.as_ref() }

	#[inline]
	#[must_use]
	/// # Is Empty?
	pub fn is_empty(&self) -> bool { self.pixels.is_empty() }

	#[inline]
	#[must_use]
	/// # Into Pixels.
	pub fn into_pixels(self) -> Vec<u8> { self.pixels }
}

/// ## Setters.
impl PixelMap {
	#[inline]
	/// # Pixels (Mutable).
	///
	/// Returns `None` unless the map was decoded as editable.
	pub fn pixels_mut(&mut self) -> Option<&mut [u8]> {
		if self.editable { Some(&mut self.pixels) }
		else { None }
	}

	/// # Set Editable.
	pub(crate) const fn set_editable(&mut self, editable: bool) { self.editable = editable; }

	/// # Set Nine-Patch.
	pub(crate) fn set_nine_patch(&mut self, nine_patch: Option<NinePatch>) {
		self.nine_patch = nine_patch;
	}

	/// # Replace Pixels.
	///
	/// Swap in a new buffer and info, e.g. after a post-processing step.
	///
	/// ## Errors
	///
	/// Returns [`ImageError::InvalidParameter`] if the buffer does not match
	/// the info.
	pub(crate) fn replace(&mut self, info: ImageInfo, pixels: Vec<u8>, allocator: AllocatorType)
	-> Result<(), ImageError> {
		let row_bytes = info.row_bytes().ok_or(ImageError::InvalidParameter)?;
		if info.buffer_len() != Some(pixels.len()) { return Err(ImageError::InvalidParameter); }
		self.info = info;
		self.row_bytes = row_bytes;
		self.pixels = pixels;
		self.allocator = allocator;
		Ok(())
	}

	/// # Take Pixels.
	///
	/// Lend the buffer out (to an incremental decoder).
	pub(crate) fn take_pixels(&mut self) -> Vec<u8> { std::mem::take(&mut self.pixels) }

	/// # Restore Pixels.
	///
	/// Take a (possibly partial) buffer back from an incremental decoder.
	/// The info is only updated when the buffer matches it.
	pub(crate) fn restore_pixels(&mut self, info: ImageInfo, pixels: Vec<u8>, allocator: AllocatorType) {
		if ! pixels.is_empty() && info.buffer_len() == Some(pixels.len()) {
			self.info = info;
			self.row_bytes = info.row_bytes().unwrap_or(0);
			self.allocator = allocator;
		}
		self.pixels = pixels;
	}
}

/*!
# `ImgSource` - Post-Processing

Decoders hand back pixels at the (sampled) native size; anything else the
caller asked for (cropping, resizing, rotation, pixel conversion) happens
here, in that order.
*/

use crate::{
	AllocatorType,
	DecodeOptions,
	FilterRowType,
	ImageError,
	ImageInfo,
	PixelConvert,
	PixelFormat,
	PixelMap,
	Rect,
	ScanlineFilter,
	Size,
	pixel::map::alloc_pixels,
};
use fast_image_resize::{
	FilterType,
	PixelType,
	ResizeAlg,
	ResizeOptions,
	Resizer,
	images::Image,
};



/// # Scale Epsilon.
const EPSILON: f32 = 1e-6;



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
/// # Final Output Step.
///
/// The most significant change post-processing has to make.
pub enum FinalOutputStep {
	#[default]
	/// # Nothing To Do.
	NoChange,

	/// # Crop and/or Convert.
	ConvertChange,

	/// # Rotate.
	RotateChange,

	/// # Resize (Desired Size).
	SizeChange,

	/// # Resize (Density).
	DensityChange,
}

impl FinalOutputStep {
	#[must_use]
	/// # Forces Heap Allocation?
	///
	/// Resizing replaces the buffer wholesale, so the requested allocator
	/// no longer applies.
	pub const fn forces_heap(self) -> bool {
		matches!(self, Self::SizeChange | Self::DensityChange)
	}
}



#[must_use]
/// # Final Output Step.
///
/// Work out the most significant post-processing step needed to turn the
/// decoder output described by `info` into what `opts` asked for. The first
/// match wins: size, density (unless nine-patch), rotation, then
/// crop/conversion.
pub fn final_output_step(opts: &DecodeOptions, info: &ImageInfo, has_nine_patch: bool)
-> FinalOutputStep {
	if size_target(opts, info).is_some() { FinalOutputStep::SizeChange }
	else if ! has_nine_patch && density_target(opts, info).is_some() {
		FinalOutputStep::DensityChange
	}
	else if needs_rotation(opts.rotate_degrees) { FinalOutputStep::RotateChange }
	else if
		needs_crop(opts.crop_rect, info.size) ||
		target_info(opts, info) != *info
	{
		FinalOutputStep::ConvertChange
	}
	else { FinalOutputStep::NoChange }
}

/// # Decode Post-Processing.
///
/// Apply crop, resize, rotation, and conversion (as needed) to the map.
///
/// ## Errors
///
/// Returns [`ImageError::Crop`] if the crop region does not fit, or
/// [`ImageError::Transform`] if resizing fails. Conversions the engine
/// cannot perform are skipped with a warning.
pub fn decode_post_proc(opts: &DecodeOptions, map: &mut PixelMap, step: FinalOutputStep)
-> Result<(), ImageError> {
	if matches!(step, FinalOutputStep::NoChange) { return Ok(()); }

	crop(map, opts.crop_rect)?;

	let info = *map.info();
	let target = size_target(opts, &info).or_else(||
		if map.nine_patch().is_some() { None }
		else { density_target(opts, &info) }
	);
	if let Some(size) = target { resize(map, size)?; }

	if needs_rotation(opts.rotate_degrees) { rotate(map, opts.rotate_degrees)?; }

	convert(map, opts)
}



#[expect(clippy::cast_precision_loss, reason = "Close enough for a ratio.")]
/// # Size Target.
///
/// The desired size, if both dimensions are set and the implied scale is
/// not one.
fn size_target(opts: &DecodeOptions, info: &ImageInfo) -> Option<Size> {
	let want = opts.desired_size;
	if ! want.is_positive() || ! info.size.is_positive() { return None; }
	let sx = want.width as f32 / info.size.width as f32;
	let sy = want.height as f32 / info.size.height as f32;
	if EPSILON < (sx - 1.0).abs() || EPSILON < (sy - 1.0).abs() { Some(want) }
	else { None }
}

#[expect(clippy::cast_possible_truncation, reason = "Rounded and clamped.")]
/// # Density Target.
///
/// The rescaled size, if both densities are set and differ.
fn density_target(opts: &DecodeOptions, info: &ImageInfo) -> Option<Size> {
	let (base, fit) = (info.base_density, opts.fit_density);
	if base <= 0 || fit <= 0 || base == fit || ! info.size.is_positive() { return None; }
	let scale = f64::from(fit) / f64::from(base);
	let w = (f64::from(info.size.width) * scale).round().clamp(1.0, f64::from(i32::MAX)) as i32;
	let h = (f64::from(info.size.height) * scale).round().clamp(1.0, f64::from(i32::MAX)) as i32;
	Some(Size::new(w, h))
}

/// # Needs Rotation?
fn needs_rotation(degrees: f32) -> bool {
	degrees.is_finite() && EPSILON < degrees.rem_euclid(360.0).abs()
}

/// # Needs Crop?
const fn needs_crop(rect: Rect, size: Size) -> bool {
	! rect.is_empty() && ! rect.is_full(size)
}

/// # Target Info.
///
/// The format and alpha the caller wants, with unknowns filled in from the
/// current info.
fn target_info(opts: &DecodeOptions, info: &ImageInfo) -> ImageInfo {
	let pixel_format =
		if matches!(opts.desired_pixel_format, PixelFormat::Unknown) { info.pixel_format }
		else { opts.desired_pixel_format };
	let alpha_type =
		if matches!(opts.desired_alpha_type, crate::AlphaType::Unknown) { info.alpha_type }
		else { opts.desired_alpha_type };
	ImageInfo {
		pixel_format,
		alpha_type: alpha_type.valid_for(pixel_format),
		..*info
	}
}

/// # Convert Buffer.
///
/// Convert a whole contiguous buffer from one info to another.
fn convert_buffer(src_info: &ImageInfo, dst_info: &ImageInfo, src: &[u8])
-> Result<Vec<u8>, ImageError> {
	let conv = PixelConvert::create(src_info, dst_info)?;
	if ! conv.is_need_convert() { return Ok(src.to_vec()); }

	let (w, h) = src_info.size.dimensions().ok_or(ImageError::ColorConvert)?;
	let count = w.checked_mul(h).ok_or(ImageError::TooLarge)?;
	let mut out = alloc_pixels(dst_info.buffer_len().ok_or(ImageError::TooLarge)?)?;
	conv.convert(&mut out, src, count);
	Ok(out)
}



/// # Crop.
fn crop(map: &mut PixelMap, rect: Rect) -> Result<(), ImageError> {
	let info = *map.info();
	if ! needs_crop(rect, info.size) { return Ok(()); }
	if ! rect.fits(info.size) {
		log::error!("Crop region does not fit the image.");
		return Err(ImageError::Crop);
	}

	let mut filter = ScanlineFilter::new(info.pixel_format);
	filter.set_src_region(rect);

	let out_info = ImageInfo { size: Size::new(rect.width, rect.height), ..info };
	let row_bytes = out_info.row_bytes().ok_or(ImageError::Crop)?;
	let mut out = alloc_pixels(out_info.buffer_len().ok_or(ImageError::Crop)?)?;

	let mut dst_rows = out.chunks_exact_mut(row_bytes);
	for (y, row) in map.pixels().chunks_exact(map.row_bytes()).enumerate() {
		let y = i32::try_from(y).map_err(|_| ImageError::Crop)?;
		let kind = filter.get_filter_row_type(y);
		if matches!(kind, FilterRowType::NonReferenceRow) { continue; }

		let dst = dst_rows.next().ok_or(ImageError::Crop)?;
		filter.filter_line(dst, row)?;
		if matches!(kind, FilterRowType::LastReferenceRow) { break; }
	}

	let allocator = map.allocator();
	map.replace(out_info, out, allocator)
}

/// # Resize.
///
/// Four-byte formats are resized directly; the rest detour through
/// `RGBA_8888`.
fn resize(map: &mut PixelMap, size: Size) -> Result<(), ImageError> {
	let info = *map.info();
	if size == info.size || ! size.is_positive() { return Ok(()); }

	let work =
		if info.pixel_format.bytes_per_pixel() == 4 { info }
		else { ImageInfo { pixel_format: PixelFormat::Rgba8888, ..info } };
	let src_pixels =
		if work == info { map.take_pixels() }
		else { convert_buffer(&info, &work, map.pixels())? };

	let (sw, sh) = dimensions_u32(info.size)?;
	let (dw, dh) = dimensions_u32(size)?;
	let src = Image::from_vec_u8(sw, sh, src_pixels, PixelType::U8x4)
		.map_err(|_| ImageError::Transform)?;
	let mut dst = Image::new(dw, dh, PixelType::U8x4);

	let options = ResizeOptions::new()
		.resize_alg(ResizeAlg::Convolution(FilterType::Bilinear))
		.use_alpha(false);
	Resizer::new().resize(&src, &mut dst, &options).map_err(|e| {
		log::error!("Resize failed: {e}");
		ImageError::Transform
	})?;

	let out_info = ImageInfo { size, ..info };
	let mut pixels = dst.into_vec();
	if work != info {
		pixels = convert_buffer(&ImageInfo { size, ..work }, &out_info, &pixels)?;
	}

	map.replace(out_info, pixels, AllocatorType::Heap)
}

/// # Dimensions (`u32`).
fn dimensions_u32(size: Size) -> Result<(u32, u32), ImageError> {
	let w = u32::try_from(size.width).map_err(|_| ImageError::Transform)?;
	let h = u32::try_from(size.height).map_err(|_| ImageError::Transform)?;
	if w == 0 || h == 0 { Err(ImageError::Transform) }
	else { Ok((w, h)) }
}

#[expect(clippy::cast_possible_truncation, reason = "Rounded first.")]
#[expect(clippy::cast_sign_loss, reason = "Rounded first.")]
#[expect(clippy::cast_precision_loss, reason = "Images are not that big.")]
/// # Rotate.
///
/// Rotate clockwise. Quarter turns are exact; anything else is sampled
/// nearest-neighbour into the bounding box, leaving the corners zeroed.
fn rotate(map: &mut PixelMap, degrees: f32) -> Result<(), ImageError> {
	let info = *map.info();
	let (w, h) = info.size.dimensions().ok_or(ImageError::Transform)?;
	let bpp = info.pixel_format.bytes_per_pixel();
	let src = map.pixels();

	let degrees = f64::from(degrees).rem_euclid(360.0);
	let quarters = (degrees / 90.0).round();
	let (out_info, out) =
		if (degrees - quarters * 90.0).abs() < 1e-3 {
			let quarters = (quarters as u32) % 4;
			let (nw, nh, size) =
				if quarters % 2 == 0 { (w, h, info.size) }
				else { (h, w, Size::new(info.size.height, info.size.width)) };
			let out_info = ImageInfo { size, ..info };
			let mut out = alloc_pixels(src.len())?;
			for y in 0..h {
				for x in 0..w {
					let (dx, dy) = match quarters {
						1 => (h - 1 - y, x),
						2 => (w - 1 - x, h - 1 - y),
						3 => (y, w - 1 - x),
						_ => (x, y),
					};
					let s = (y * w + x) * bpp;
					let d = (dy * nw + dx) * bpp;
					out[d..d + bpp].copy_from_slice(&src[s..s + bpp]);
				}
			}
			debug_assert!(nh * nw * bpp == out.len(), "Rotated buffer mismatch.");
			(out_info, out)
		}
		else {
			let (sin, cos) = degrees.to_radians().sin_cos();
			let (wf, hf) = (w as f64, h as f64);
			let nw = (wf * cos.abs() + hf * sin.abs()).ceil().max(1.0) as usize;
			let nh = (wf * sin.abs() + hf * cos.abs()).ceil().max(1.0) as usize;
			let out_info = ImageInfo {
				size: Size::new(
					i32::try_from(nw).map_err(|_| ImageError::TooLarge)?,
					i32::try_from(nh).map_err(|_| ImageError::TooLarge)?,
				),
				alpha_type:
					if info.pixel_format.has_alpha() && matches!(info.alpha_type, crate::AlphaType::Opaque) {
						crate::AlphaType::Premul
					}
					else { info.alpha_type },
				..info
			};
			let mut out = alloc_pixels(out_info.buffer_len().ok_or(ImageError::TooLarge)?)?;

			let (cx, cy) = (wf / 2.0, hf / 2.0);
			let (ncx, ncy) = (nw as f64 / 2.0, nh as f64 / 2.0);
			for y in 0..nh {
				let dy = y as f64 + 0.5 - ncy;
				for x in 0..nw {
					let dx = x as f64 + 0.5 - ncx;
					let sx = (dx * cos + dy * sin + cx).floor();
					let sy = (dy * cos - dx * sin + cy).floor();
					if sx < 0.0 || sy < 0.0 || wf <= sx || hf <= sy { continue; }
					let s = (sy as usize * w + sx as usize) * bpp;
					let d = (y * nw + x) * bpp;
					out[d..d + bpp].copy_from_slice(&src[s..s + bpp]);
				}
			}
			(out_info, out)
		};

	let allocator = map.allocator();
	map.replace(out_info, out, allocator)
}

/// # Convert.
///
/// Convert to the requested format and alpha type. If there is no kernel
/// for the pairing, the map is left as-is.
fn convert(map: &mut PixelMap, opts: &DecodeOptions) -> Result<(), ImageError> {
	let info = *map.info();
	let dst = target_info(opts, &info);
	if dst == info { return Ok(()); }

	match convert_buffer(&info, &dst, map.pixels()) {
		Ok(pixels) => {
			let allocator = map.allocator();
			map.replace(dst, pixels, allocator)
		},
		Err(ImageError::ColorConvert) => {
			log::warn!(
				"Unable to convert {} to {}; keeping the original.",
				info.pixel_format,
				dst.pixel_format,
			);
			Ok(())
		},
		Err(e) => Err(e),
	}
}



#[cfg(test)]
mod tests {
	use super::*;
	use crate::AlphaType;

	/// # RGBA Map.
	///
	/// Each pixel is `[index, 0, 0, 255]`.
	fn map(w: i32, h: i32) -> PixelMap {
		let info = ImageInfo::new(Size::new(w, h), PixelFormat::Rgba8888, AlphaType::Opaque);
		let pixels = (0..w * h).flat_map(|i| [i as u8, 0, 0, 255]).collect();
		PixelMap::new(info, pixels, AllocatorType::Heap).unwrap()
	}

	fn reds(map: &PixelMap) -> Vec<u8> {
		map.pixels().chunks_exact(4).map(|px| px[0]).collect()
	}

	#[test]
	fn t_final_output_step() {
		let info = ImageInfo::new(Size::new(10, 10), PixelFormat::Rgba8888, AlphaType::Opaque);
		let mut opts = DecodeOptions::default();
		assert_eq!(final_output_step(&opts, &info, false), FinalOutputStep::NoChange);

		// Same size is no change.
		opts.desired_size = Size::new(10, 10);
		assert_eq!(final_output_step(&opts, &info, false), FinalOutputStep::NoChange);

		opts.crop_rect = Rect::new(0, 0, 5, 5);
		assert_eq!(final_output_step(&opts, &info, false), FinalOutputStep::ConvertChange);

		opts.rotate_degrees = 90.0;
		assert_eq!(final_output_step(&opts, &info, false), FinalOutputStep::RotateChange);

		let info2 = ImageInfo { base_density: 160, ..info };
		opts.fit_density = 320;
		assert_eq!(final_output_step(&opts, &info2, false), FinalOutputStep::DensityChange);
		assert_eq!(final_output_step(&opts, &info2, true), FinalOutputStep::RotateChange);

		opts.desired_size = Size::new(20, 10);
		assert_eq!(final_output_step(&opts, &info2, true), FinalOutputStep::SizeChange);
		assert!(FinalOutputStep::SizeChange.forces_heap());

		// A format change on its own.
		let mut opts = DecodeOptions::default();
		opts.desired_pixel_format = PixelFormat::Bgra8888;
		assert_eq!(final_output_step(&opts, &info, false), FinalOutputStep::ConvertChange);

		// Premul is the same as opaque for an opaque source.
		let mut opts = DecodeOptions::default();
		opts.desired_pixel_format = PixelFormat::Rgb565;
		let info565 = ImageInfo::new(Size::new(10, 10), PixelFormat::Rgb565, AlphaType::Opaque);
		opts.desired_alpha_type = AlphaType::Premul;
		assert_eq!(final_output_step(&opts, &info565, false), FinalOutputStep::NoChange);
	}

	#[test]
	fn t_crop() {
		let mut m = map(4, 3);
		let mut opts = DecodeOptions::default();
		opts.crop_rect = Rect::new(1, 1, 2, 2);
		assert!(decode_post_proc(&opts, &mut m, FinalOutputStep::ConvertChange).is_ok());
		assert_eq!(m.size(), Size::new(2, 2));
		assert_eq!(reds(&m), [5, 6, 9, 10]);

		opts.crop_rect = Rect::new(1, 1, 5, 5);
		assert_eq!(
			decode_post_proc(&opts, &mut m, FinalOutputStep::ConvertChange),
			Err(ImageError::Crop),
		);
	}

	#[test]
	fn t_rotate() {
		// 3x2:
		// 0 1 2
		// 3 4 5
		let mut m = map(3, 2);
		let mut opts = DecodeOptions::default();
		opts.rotate_degrees = 90.0;
		assert!(decode_post_proc(&opts, &mut m, FinalOutputStep::RotateChange).is_ok());
		assert_eq!(m.size(), Size::new(2, 3));
		assert_eq!(reds(&m), [3, 0, 4, 1, 5, 2]);

		let mut m = map(3, 2);
		opts.rotate_degrees = -180.0;
		assert!(decode_post_proc(&opts, &mut m, FinalOutputStep::RotateChange).is_ok());
		assert_eq!(reds(&m), [5, 4, 3, 2, 1, 0]);

		let mut m = map(3, 2);
		opts.rotate_degrees = 270.0;
		assert!(decode_post_proc(&opts, &mut m, FinalOutputStep::RotateChange).is_ok());
		assert_eq!(reds(&m), [2, 5, 1, 4, 0, 3]);

		let mut m = map(10, 10);
		opts.rotate_degrees = 45.0;
		assert!(decode_post_proc(&opts, &mut m, FinalOutputStep::RotateChange).is_ok());
		assert_eq!(m.size(), Size::new(15, 15));
		assert_eq!(m.info().alpha_type, AlphaType::Premul);
		assert_eq!(&m.pixels()[..4], &[0, 0, 0, 0]);
	}

	#[test]
	fn t_resize() {
		let info = ImageInfo::new(Size::new(4, 4), PixelFormat::Rgb565, AlphaType::Opaque);
		let mut m = PixelMap::new(info, vec![0xFF; 32], AllocatorType::SharedMem).unwrap();
		let mut opts = DecodeOptions::default();
		opts.desired_size = Size::new(2, 3);
		assert!(decode_post_proc(&opts, &mut m, FinalOutputStep::SizeChange).is_ok());
		assert_eq!(m.size(), Size::new(2, 3));
		assert_eq!(m.pixel_format(), PixelFormat::Rgb565);
		assert_eq!(m.allocator(), AllocatorType::Heap);

		// White stays white.
		assert!(m.pixels().iter().all(|&b| b == 0xFF));
	}

	#[test]
	fn t_density() {
		let info = ImageInfo {
			base_density: 2,
			..ImageInfo::new(Size::new(4, 4), PixelFormat::Bgra8888, AlphaType::Opaque)
		};
		let mut m = PixelMap::new(info, vec![9; 64], AllocatorType::Heap).unwrap();
		let mut opts = DecodeOptions::default();
		opts.fit_density = 1;
		assert_eq!(final_output_step(&opts, &info, false), FinalOutputStep::DensityChange);
		assert!(decode_post_proc(&opts, &mut m, FinalOutputStep::DensityChange).is_ok());
		assert_eq!(m.size(), Size::new(2, 2));
	}

	#[test]
	fn t_convert() {
		let mut m = map(2, 1);
		let mut opts = DecodeOptions::default();
		opts.desired_pixel_format = PixelFormat::Argb8888;
		assert!(decode_post_proc(&opts, &mut m, FinalOutputStep::ConvertChange).is_ok());
		assert_eq!(m.pixel_format(), PixelFormat::Argb8888);
		assert_eq!(m.pixels(), [255, 0, 0, 0, 255, 1, 0, 0]);

		// No kernel: keep what we have.
		opts.desired_pixel_format = PixelFormat::Gray8;
		assert!(decode_post_proc(&opts, &mut m, FinalOutputStep::ConvertChange).is_ok());
		assert_eq!(m.pixel_format(), PixelFormat::Argb8888);
	}
}

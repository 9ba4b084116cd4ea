/*!
# `ImgSource` - Incremental Scenarios
*/

use imgsource_core::{
	CodecRegistry,
	DecodeEvent,
	DecodeListener,
	DecodeOptions,
	ImageDecodingState,
	ImageError,
	ImageSource,
	IncrementalMode,
	IncrementalSourceOptions,
	Size,
	SourceDecodingState,
	SourceOptions,
};
use proptest::prelude::*;
use std::sync::{
	Arc,
	Mutex,
};



/// # BMP (24-bit, Bottom-Up).
///
/// Pixel `(x, y)` is `rgb(x * 10, y * 10, 0)`.
fn bmp24(width: u16, height: u16) -> Vec<u8> {
	let (w, h) = (usize::from(width), usize::from(height));
	let stride = (w * 3).div_ceil(4) * 4;
	let size = 54 + stride * h;
	let mut out = Vec::with_capacity(size);
	out.extend_from_slice(b"BM");
	out.extend_from_slice(&u32::try_from(size).unwrap().to_le_bytes());
	out.extend_from_slice(&[0; 4]);
	out.extend_from_slice(&54_u32.to_le_bytes());
	out.extend_from_slice(&40_u32.to_le_bytes());
	out.extend_from_slice(&i32::from(width).to_le_bytes());
	out.extend_from_slice(&i32::from(height).to_le_bytes());
	out.extend_from_slice(&1_u16.to_le_bytes());
	out.extend_from_slice(&24_u16.to_le_bytes());
	out.extend_from_slice(&[0; 24]);

	for y in (0..h).rev() {
		for x in 0..w {
			out.extend_from_slice(&[0, (y * 10) as u8, (x * 10) as u8]);
		}
		out.resize(out.len() + stride - w * 3, 0);
	}

	out
}

fn incremental() -> Arc<ImageSource> {
	Arc::new(ImageSource::incremental(
		Arc::new(CodecRegistry::builtin()),
		IncrementalSourceOptions::default(),
	))
}

/// # One-Shot Pixels.
fn one_shot(raw: &[u8]) -> Vec<u8> {
	let src = ImageSource::from_bytes(Arc::new(CodecRegistry::builtin()), raw, SourceOptions::default())
		.unwrap();
	src.create_pixel_map(0, &DecodeOptions::default()).unwrap().into_pixels()
}

/// # Chunked Pixels.
///
/// Feed the data in pieces, promoting after each.
fn chunked(raw: &[u8], sizes: &[usize]) -> (ImageDecodingState, u8, Vec<u8>) {
	let src = incremental();
	let mut map = src.create_incremental_pixel_map(0, &DecodeOptions::default());
	let mut last_progress = 0;

	let mut pos = 0;
	let mut sizes = sizes.iter().copied().cycle();
	while pos < raw.len() {
		let end = raw.len().min(pos + sizes.next().unwrap_or(raw.len()).max(1));
		src.update_data(&raw[pos..end], end == raw.len()).unwrap();
		pos = end;

		let (state, progress) = map.promote_decoding().unwrap();
		assert!(last_progress <= progress, "Progress went backwards.");
		last_progress = progress;
		if state == ImageDecodingState::ImageDecoded { break; }
	}

	let state = map.decoding_state();
	let progress = map.decoding_progress();
	(state, progress, map.into_pixel_map().into_pixels())
}

#[derive(Default)]
struct Events(Mutex<Vec<DecodeEvent>>);

impl DecodeListener for Events {
	fn on_event(&self, event: DecodeEvent) { self.0.lock().unwrap().push(event); }
}



#[test]
fn t_bmp_rows() {
	let raw = bmp24(10, 10);
	let src = incremental();
	assert!(src.is_incremental_source());

	let events = Arc::new(Events::default());
	src.add_decode_listener(events.clone());

	// Nothing yet.
	let mut map = src.create_incremental_pixel_map(0, &DecodeOptions::default());
	assert_eq!(map.promote_decoding(), Ok((ImageDecodingState::Unresolved, 0)));

	// Header and half the rows.
	src.update_data(&raw[..54 + 32 * 5], false).unwrap();
	assert_eq!(src.get_image_info(0).map(|i| i.size), Ok(Size::new(10, 10)));
	assert_eq!(map.promote_decoding(), Ok((ImageDecodingState::PartialImage, 50)));
	assert_eq!(map.pixel_map().size(), Size::new(10, 10));
	let idx = 9 * 40;
	assert_eq!(&map.pixel_map().pixels()[idx..idx + 4], &[0, 90, 0, 255]);

	// Promoting again without new data changes nothing.
	assert_eq!(map.promote_decoding(), Ok((ImageDecodingState::PartialImage, 50)));

	// The rest.
	src.update_data(&raw[54 + 32 * 5..], true).unwrap();
	assert_eq!(map.promote_decoding(), Ok((ImageDecodingState::ImageDecoded, 100)));
	assert_eq!(map.decoding_progress(), 100);

	// Done is done.
	assert_eq!(map.promote_decoding(), Ok((ImageDecodingState::ImageDecoded, 100)));
	assert_eq!(map.into_pixel_map().into_pixels(), one_shot(&raw));

	// Each event once.
	assert_eq!(
		*events.0.lock().unwrap(),
		[DecodeEvent::HeaderDecode, DecodeEvent::PartialDecode, DecodeEvent::CompleteDecode],
	);

	// No more data after completion.
	assert!(src.update_data(&[0], true).is_err());
}

#[test]
fn t_bmp_truncated() {
	let raw = bmp24(4, 4);
	let src = incremental();
	let mut map = src.create_incremental_pixel_map(0, &DecodeOptions::default());

	// The stream ends early.
	src.update_data(&raw[..raw.len() - 16], true).unwrap();
	assert_eq!(map.promote_decoding(), Err(ImageError::DecodeAbnormal));
	assert_eq!(map.decoding_state(), ImageDecodingState::ImageError);

	// And stays that way.
	assert_eq!(map.promote_decoding(), Err(ImageError::DecodeAbnormal));
	assert_eq!(src.decoder_census(), (true, 0));
}

#[cfg(feature = "jpeg")]
#[test]
fn t_one_shot_needs_more() {
	let raw = bmp24(4, 4);
	let src = incremental();
	let opts = DecodeOptions { allow_partial_image: false, ..DecodeOptions::default() };

	// Two of four rows; not an error, just not ready.
	src.update_data(&raw[..54 + 24], false).unwrap();
	assert_eq!(src.create_pixel_map(0, &opts).err(), Some(ImageError::SourceDataIncomplete));
	assert_eq!(src.get_image_decoding_state(0), Some(ImageDecodingState::ImageDecoding));

	src.update_data(&raw[54 + 24..], true).unwrap();
	let map = src.create_pixel_map(0, &opts).unwrap();
	assert_eq!(src.get_image_decoding_state(0), Some(ImageDecodingState::ImageDecoded));
	assert_eq!(map.into_pixels(), one_shot(&raw));
}

#[test]
fn t_jpeg_incomplete() {
	let raw = include_bytes!("../skel/logo.jpg");
	let src = incremental();

	// Three bytes are enough to know what it is, but not much else.
	src.update_data(&raw[..3], false).unwrap();
	assert_eq!(src.get_encoded_format().as_deref(), Ok("image/jpeg"));
	assert_eq!(src.get_image_info(0), Err(ImageError::SourceDataIncomplete));
	assert_eq!(
		src.create_pixel_map(0, &DecodeOptions::default()).err(),
		Some(ImageError::SourceDataIncomplete),
	);

	let mut map = src.create_incremental_pixel_map(0, &DecodeOptions::default());
	assert_eq!(map.promote_decoding(), Ok((ImageDecodingState::Unresolved, 0)));

	// All but the end: JPEG decoding waits for everything.
	src.update_data(&raw[3..], false).unwrap();
	assert_eq!(map.promote_decoding(), Ok((ImageDecodingState::ImageDecoding, 0)));

	src.update_data(&[], true).unwrap();
	assert_eq!(map.promote_decoding(), Ok((ImageDecodingState::ImageDecoded, 100)));
	assert_eq!(map.pixel_map().size(), Size::new(16, 16));
}

#[test]
fn t_empty_incremental() {
	let src = incremental();
	assert_eq!(src.get_encoded_format(), Err(ImageError::SourceDataIncomplete));
	assert_eq!(src.get_source_decoding_state(), SourceDecodingState::Unresolved);

	// Finished with nothing.
	src.update_data(&[], true).unwrap();
	assert_eq!(src.get_encoded_format(), Err(ImageError::SourceData));
	assert_eq!(src.get_source_decoding_state(), SourceDecodingState::SourceError);
}

#[test]
fn t_full_data_mode() {
	let raw = bmp24(6, 6);
	let src = Arc::new(ImageSource::incremental(
		Arc::new(CodecRegistry::builtin()),
		IncrementalSourceOptions {
			source_options: SourceOptions::default(),
			incremental_mode: IncrementalMode::FullData,
		},
	));

	let mut map = src.create_incremental_pixel_map(0, &DecodeOptions::default());
	src.update_data(&raw[..70], false).unwrap();
	assert!(map.promote_decoding().is_ok());
	src.update_data(&raw, true).unwrap();
	assert_eq!(map.promote_decoding(), Ok((ImageDecodingState::ImageDecoded, 100)));
}

#[test]
fn t_state_monotonic() {
	let raw = bmp24(8, 8);
	let src = incremental();
	let mut states = vec![src.get_source_decoding_state()];

	for (idx, byte) in raw.iter().enumerate() {
		src.update_data(&[*byte], idx + 1 == raw.len()).unwrap();
		let _res = src.get_source_info();
		states.push(src.get_source_decoding_state());
	}

	assert!(states.windows(2).all(|w| w[0] <= w[1]), "State went backwards.");
	assert_eq!(states.last(), Some(&SourceDecodingState::FileInfoDecoded));

	// Once decoded, it stays decoded.
	let first = states.iter().position(|s| *s == SourceDecodingState::FileInfoDecoded).unwrap();
	assert!(states[first..].iter().all(|s| *s == SourceDecodingState::FileInfoDecoded));
}

#[test]
fn t_decoder_census() {
	let raw = bmp24(10, 10);
	let src = incremental();
	src.update_data(&raw[..100], false).unwrap();

	// The header parse leaves the decoder idle.
	assert!(src.get_image_info(0).is_ok());
	assert_eq!(src.decoder_census(), (true, 0));

	// A session takes it.
	let mut a = src.create_incremental_pixel_map(0, &DecodeOptions::default());
	assert!(a.promote_decoding().is_ok());
	assert_eq!(src.decoder_census(), (false, 1));

	// A second session gets its own.
	let mut b = src.create_incremental_pixel_map(0, &DecodeOptions::default());
	assert!(b.promote_decoding().is_ok());
	assert_eq!(src.decoder_census(), (false, 2));

	// One-shot decoding in the middle borrows and drops its own.
	assert!(src.create_pixel_map(0, &DecodeOptions::default()).is_ok());
	assert_eq!(src.decoder_census(), (false, 2));

	// Detaching twice is fine.
	a.detach_from_decoding();
	a.detach_from_decoding();
	assert_eq!(src.decoder_census(), (false, 1));

	// The last one back returns to the idle slot.
	src.update_data(&raw[100..], true).unwrap();
	assert_eq!(b.promote_decoding(), Ok((ImageDecodingState::ImageDecoded, 100)));
	assert_eq!(src.decoder_census(), (true, 0));
	drop(b);
	assert_eq!(src.decoder_census(), (true, 0));
}

#[test]
fn t_orphaned() {
	let src = incremental();
	let mut map = src.create_incremental_pixel_map(0, &DecodeOptions::default());
	drop(src);
	assert_eq!(map.promote_decoding(), Err(ImageError::SourceData));
}

#[cfg(feature = "jpeg")]
#[test]
fn t_jpeg_chunks() {
	let raw = include_bytes!("../skel/logo.jpg");
	let expected = one_shot(raw);
	for size in [1, 7, 1024, raw.len()] {
		let (state, progress, pixels) = chunked(raw, &[size]);
		assert_eq!(state, ImageDecodingState::ImageDecoded);
		assert_eq!(progress, 100);
		assert_eq!(pixels, expected, "Chunk size {size} differs.");
	}
}



proptest! {
	#[test]
	fn t_bmp_chunks(sizes in prop::collection::vec(1_usize..64, 1..8)) {
		let raw = bmp24(9, 7);
		let (state, progress, pixels) = chunked(&raw, &sizes);
		prop_assert_eq!(state, ImageDecodingState::ImageDecoded);
		prop_assert_eq!(progress, 100);
		prop_assert_eq!(pixels, one_shot(&raw));
	}

	#[cfg(feature = "jpeg")]
	#[test]
	fn t_jpeg_random_chunks(sizes in prop::collection::vec(1_usize..256, 1..8)) {
		let raw = include_bytes!("../skel/logo.jpg");
		let (state, progress, pixels) = chunked(raw, &sizes);
		prop_assert_eq!(state, ImageDecodingState::ImageDecoded);
		prop_assert_eq!(progress, 100);
		prop_assert_eq!(pixels, one_shot(raw));
	}
}

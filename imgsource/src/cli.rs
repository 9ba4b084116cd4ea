/*!
# ImgSource - CLI
*/

use dactyl::{
	NiceElapsed,
	NiceU64,
};
use fyi_msg::Msg;
use imgsource_core::{
	ImageDecodingState,
	ImageError,
	ImageInfo,
	PixelMap,
	SourceInfo,
};
use std::{
	path::Path,
	time::Duration,
};



/// # Print Path Title.
///
/// This prints the source image path with an ANSI-colored border, like:
///
/// ```ignore
/// +---------------------+
/// | /path/to/source.png |
/// +---------------------+
/// ```
pub(super) fn print_header_path(path: &Path) {
	let txt = path.to_string_lossy();
	let dashes = "-".repeat(txt.len() + 2);

	println!(
		"\x1b[38;5;199m+{dashes}+\n| \x1b[0m{txt} \x1b[38;5;199m|\n+{dashes}+\x1b[0m",
	);
}

/// # Print Info.
pub(super) fn print_info(src: &SourceInfo, image: &ImageInfo) {
	Msg::from(format!(
		"\x1b[1m{}\x1b[0m, {}x{} \x1b[2m({} image{}.)\x1b[0m",
		src.encoded_format,
		image.size.width,
		image.size.height,
		src.top_level_image_num,
		if src.top_level_image_num == 1 { "" } else { "s" },
	))
		.with_indent(1)
		.print();
}

/// # Print Progress.
///
/// One line per incremental promotion.
pub(super) fn print_progress(chunk: usize, state: ImageDecodingState, progress: u8) {
	Msg::from(progress_line(chunk, state, progress))
		.with_indent(1)
		.print();
}

/// # Progress Line.
fn progress_line(chunk: usize, state: ImageDecodingState, progress: u8) -> String {
	format!(
		"\x1b[2mChunk #{}:\x1b[0m {state} \x1b[2m({progress}%)\x1b[0m",
		NiceU64::from(chunk as u64 + 1).as_str(),
	)
}

/// # Print Pixels.
pub(super) fn print_pixels(map: &PixelMap, time: Duration) {
	Msg::success(format!(
		"Decoded \x1b[1m{}x{}\x1b[0m {}.",
		map.width(),
		map.height(),
		map.pixel_format(),
	))
		.with_indent(1)
		.with_suffix(pixels_suffix(map.pixels().len(), time))
		.print();
}

/// # Pixels Suffix.
fn pixels_suffix(len: usize, time: Duration) -> String {
	format!(
		" \x1b[2m({} bytes in {}.)\x1b[0m",
		NiceU64::from(len as u64).as_str(),
		NiceElapsed::from(time).as_str(),
	)
}

/// # Print Error.
pub(super) fn print_error(err: ImageError) {
	Msg::warning(err.as_str())
		.with_indent(1)
		.print();
}



#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn t_progress_line() {
		let line = progress_line(0, ImageDecodingState::PartialImage, 50);
		assert!(line.contains("Chunk #1:"));
		assert!(line.contains("partial"));
		assert!(line.contains("(50%)"));

		let line = progress_line(1233, ImageDecodingState::ImageDecoded, 100);
		assert!(line.contains("Chunk #1,234:"));
		assert!(line.contains("decoded"));
	}

	#[test]
	fn t_pixels_suffix() {
		let line = pixels_suffix(1_048_576, Duration::from_secs(2));
		assert!(line.contains("1,048,576 bytes"));
		assert!(line.contains(NiceElapsed::from(Duration::from_secs(2)).as_str()));
	}
}

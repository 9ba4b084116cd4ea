/*!
# ImgSource
*/

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



mod cli;

use argyle::Argument;
use imgsource_core::{
	CodecRegistry,
	DecodeOptions,
	ImageDecodingState,
	ImageError,
	ImageSource,
	IncrementalSourceOptions,
	PixelMap,
	SourceOptions,
};
use std::{
	num::NonZeroUsize,
	path::{
		Path,
		PathBuf,
	},
	sync::Arc,
	time::Instant,
};



/// # Main.
///
/// This lets us bubble up startup errors so they can be pretty-printed.
fn main() {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
		.init();

	match _main() {
		Ok(()) => {},
		Err(e @ (ImageError::PrintHelp | ImageError::PrintVersion)) => {
			println!("{e}");
		},
		Err(e) => {
			eprintln!("Error: {e}");
			std::process::exit(1);
		},
	}
}

#[inline]
/// # Actual Main.
fn _main() -> Result<(), ImageError> {
	let settings = Settings::from_args()?;
	let registry = Arc::new(CodecRegistry::builtin());
	log::debug!("Decoders: {}", registry.supported_formats().join(", "));

	for path in &settings.paths {
		cli::print_header_path(path);
		let now = Instant::now();
		let res =
			if let Some(chunk) = settings.chunk {
				settings.decode_chunked(&registry, path, chunk)
			}
			else { settings.decode(&registry, path) };

		match res {
			Ok(Some(map)) => cli::print_pixels(&map, now.elapsed()),
			Ok(None) => {},
			Err(e) => cli::print_error(e),
		}
	}

	Ok(())
}



#[derive(Debug)]
/// # Settings.
struct Settings {
	/// # Files.
	paths: Vec<PathBuf>,

	/// # Info Only?
	info: bool,

	/// # Incremental Chunk Size.
	chunk: Option<NonZeroUsize>,

	/// # Format Hint.
	format: String,

	/// # Sample Size.
	sample: u32,
}

impl Settings {
	/// # From CLI.
	///
	/// ## Errors
	///
	/// Returns an error if an option value is invalid, no files were
	/// given, or help/version output was requested instead.
	fn from_args() -> Result<Self, ImageError> {
		let mut out = Self {
			paths: Vec::new(),
			info: false,
			chunk: None,
			format: String::new(),
			sample: 1,
		};

		let args = argyle::args()
			.with_keywords(include!(concat!(env!("OUT_DIR"), "/argyle.rs")));
		for arg in args {
			match arg {
				Argument::Key("-h" | "--help") => return Err(ImageError::PrintHelp),
				Argument::Key("-i" | "--info") => { out.info = true; },
				Argument::Key("-V" | "--version") => return Err(ImageError::PrintVersion),

				Argument::KeyWithValue("-c" | "--chunk", s) => {
					let n = s.trim().parse::<usize>().map_err(|_| ImageError::InvalidParameter)?;
					out.chunk = Some(NonZeroUsize::new(n).ok_or(ImageError::InvalidParameter)?);
				},
				Argument::KeyWithValue("-f" | "--format", s) => {
					out.format = s.trim().to_ascii_lowercase();
				},
				Argument::KeyWithValue("-s" | "--sample", s) => {
					out.sample = s.trim().parse::<u32>()
						.ok()
						.filter(|n| 0 < *n)
						.ok_or(ImageError::InvalidParameter)?;
				},

				// Assume files.
				Argument::Other(s) => { out.paths.push(PathBuf::from(s)); },
				Argument::InvalidUtf8(s) => { out.paths.push(PathBuf::from(s)); },

				// Nothing else is relevant.
				_ => {},
			}
		}

		if out.paths.is_empty() { Err(ImageError::NoImages) }
		else { Ok(out) }
	}

	/// # Source Options.
	fn source_options(&self) -> SourceOptions {
		SourceOptions {
			format_hint: self.format.clone(),
			..SourceOptions::default()
		}
	}

	/// # Decode Options.
	fn decode_options(&self) -> DecodeOptions {
		DecodeOptions {
			sample_size: self.sample,
			..DecodeOptions::default()
		}
	}

	/// # Decode (One Shot).
	///
	/// Print the source info, then decode the first image (unless only the
	/// info was requested).
	fn decode(&self, registry: &Arc<CodecRegistry>, path: &Path)
	-> Result<Option<PixelMap>, ImageError> {
		let src = ImageSource::from_path(Arc::clone(registry), path, self.source_options())?;
		let info = src.get_source_info()?;
		let image = src.get_image_info(0)?;
		cli::print_info(&info, &image);
		if self.info { return Ok(None); }

		src.create_pixel_map(0, &self.decode_options()).map(Some)
	}

	/// # Decode (Chunked).
	///
	/// Feed the file to an incremental source `chunk` bytes at a time,
	/// promoting after each update.
	fn decode_chunked(&self, registry: &Arc<CodecRegistry>, path: &Path, chunk: NonZeroUsize)
	-> Result<Option<PixelMap>, ImageError> {
		let raw = std::fs::read(path).map_err(|_| ImageError::SourceData)?;
		let src = Arc::new(ImageSource::incremental(
			Arc::clone(registry),
			IncrementalSourceOptions {
				source_options: self.source_options(),
				..IncrementalSourceOptions::default()
			},
		));

		let mut map = src.create_incremental_pixel_map(0, &self.decode_options());
		let mut printed = false;
		let total = raw.chunks(chunk.get()).len();
		for (idx, part) in raw.chunks(chunk.get()).enumerate() {
			src.update_data(part, idx + 1 == total)?;

			if ! printed {
				if let (Ok(info), Ok(image)) = (src.get_source_info(), src.get_image_info(0)) {
					cli::print_info(&info, &image);
					printed = true;
					if self.info { return Ok(None); }
				}
			}

			let (state, progress) = map.promote_decoding()?;
			cli::print_progress(idx, state, progress);
			if state == ImageDecodingState::ImageDecoded { break; }
		}

		if map.decoding_state() == ImageDecodingState::ImageDecoded {
			Ok(Some(map.into_pixel_map()))
		}
		else { Err(ImageError::SourceDataIncomplete) }
	}
}

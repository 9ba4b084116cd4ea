/*!
# `ImgSource` - Image Source

An [`ImageSource`] wraps a stream of encoded bytes and works out, lazily and
in stages, what it is looking at: first the format, then the file info, then
the per-image headers. Images can then be decoded in one go with
[`ImageSource::create_pixel_map`], or a bit at a time as data arrives with
[`ImageSource::create_incremental_pixel_map`].

There is only ever one decoder per source at rest. Incremental sessions
borrow it (or make their own if it is already out) and hand it back when
they finish.
*/

pub(super) mod data_url;
pub(super) mod incremental;
pub(super) mod listener;
pub(super) mod state;

use crate::{
	AllocatorType,
	AlphaType,
	BufferSourceStream,
	CodecRegistry,
	DecodeContext,
	DecodeOptions,
	FileSourceStream,
	FormatAgent,
	ImageDecoder,
	ImageError,
	ImageInfo,
	IncrementalSourceOptions,
	IncrementalSourceStream,
	MIME_RAW,
	NinePatch,
	PixelFormat,
	PixelMap,
	PixelMapId,
	ProgDecodeContext,
	SharedStream,
	SourceOptions,
	SourceStream,
	post::{
		decode_post_proc,
		final_output_step,
	},
	stream::read_at,
};
use incremental::IncrementalPixelMap;
use listener::{
	DecodeEvent,
	DecodeListener,
	Listeners,
	PeerListener,
};
use state::{
	ImageDecodingState,
	ImageDecodingStatus,
	IncrementalDecodingContext,
	SourceDecodingState,
	SourceInfo,
};
use std::{
	collections::{
		BTreeMap,
		HashMap,
		HashSet,
	},
	fmt,
	path::Path,
	sync::{
		Arc,
		Mutex,
		MutexGuard,
		PoisonError,
		Weak,
	},
};



/// # Decode State.
///
/// Everything guarded by the decoding lock.
#[derive(Default)]
struct Inner {
	/// # Source State.
	state: SourceDecodingState,

	/// # Source Info.
	source_info: SourceInfo,

	/// # Idle Decoder.
	main_decoder: Option<Box<dyn ImageDecoder>>,

	/// # Per-Index Status.
	status: BTreeMap<u32, ImageDecodingStatus>,

	/// # Incremental Sessions.
	inc: HashMap<PixelMapId, IncrementalDecodingContext>,

	/// # Events Already Sent (Incremental).
	sent_events: HashSet<(PixelMapId, DecodeEvent)>,

	/// # Last Sample Size.
	last_sample_size: u32,

	/// # Nine-Patch.
	nine_patch: Option<NinePatch>,
}

impl Inner {
	/// # Sessions Holding Decoders.
	fn loaned(&self) -> usize {
		self.inc.values().filter(|c| c.decoder.is_some()).count()
	}

	/// # Return Decoder.
	///
	/// A borrowed decoder goes back to the idle slot if nobody else has one;
	/// otherwise it is dropped.
	fn return_decoder(&mut self, decoder: Box<dyn ImageDecoder>) {
		if self.main_decoder.is_none() && self.loaned() == 0 {
			self.main_decoder = Some(decoder);
		}
		debug_assert!(
			self.main_decoder.is_none() || self.loaned() == 0,
			"The idle decoder and a loaned decoder coexist.",
		);
	}

	/// # Set Source State.
	fn set_source_state(&mut self, state: SourceDecodingState) {
		self.state = state;
		self.source_info.state = state.into();
	}

	/// # Reset.
	///
	/// Forget the file info and per-index status, and drop the idle decoder.
	fn reset(&mut self) {
		self.set_source_state(SourceDecodingState::Unresolved);
		self.status.clear();
		self.main_decoder = None;
	}
}



/// # Image Source.
pub struct ImageSource {
	/// # Registry.
	registry: Arc<CodecRegistry>,

	/// # Stream.
	stream: SharedStream,

	/// # Options.
	opts: SourceOptions,

	/// # Incremental?
	is_incremental: bool,

	/// # Decode State.
	inner: Mutex<Inner>,

	/// # Listeners.
	listeners: Mutex<Listeners>,
}

impl fmt::Debug for ImageSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let inner = self.lock();
		f.debug_struct("ImageSource")
			.field("opts", &self.opts)
			.field("is_incremental", &self.is_incremental)
			.field("state", &inner.state)
			.field("source_info", &inner.source_info)
			.field("sessions", &inner.inc.len())
			.finish_non_exhaustive()
	}
}

impl Drop for ImageSource {
	fn drop(&mut self) {
		let peers = self.listeners.get_mut()
			.unwrap_or_else(PoisonError::into_inner)
			.take_peers();
		for peer in peers { peer.on_peer_destroy(); }
	}
}

/// ## Construction.
impl ImageSource {
	/// # From Bytes.
	///
	/// The bytes are copied. `data:image/...;base64,` URLs are decoded first,
	/// their MIME type becoming the format hint if none was given.
	///
	/// ## Errors
	///
	/// Returns [`ImageError::SourceData`] if the data is empty or the data
	/// URL cannot be decoded.
	pub fn from_bytes(registry: Arc<CodecRegistry>, data: &[u8], opts: SourceOptions)
	-> Result<Self, ImageError> {
		if data_url::is_data_url(data) { Self::from_data_url(registry, data, opts) }
		else if data.is_empty() { Err(ImageError::SourceData) }
		else { Ok(Self::from_stream(registry, BufferSourceStream::from(data), opts)) }
	}

	/// # From Vec.
	///
	/// Same as [`ImageSource::from_bytes`], but without the copy.
	///
	/// ## Errors
	///
	/// Returns [`ImageError::SourceData`] if the data is empty or the data
	/// URL cannot be decoded.
	pub fn from_vec(registry: Arc<CodecRegistry>, data: Vec<u8>, opts: SourceOptions)
	-> Result<Self, ImageError> {
		if data_url::is_data_url(&data) { Self::from_data_url(registry, &data, opts) }
		else if data.is_empty() { Err(ImageError::SourceData) }
		else { Ok(Self::from_stream(registry, BufferSourceStream::from(data), opts)) }
	}

	/// # From Path.
	///
	/// ## Errors
	///
	/// Returns [`ImageError::SourceData`] if the file cannot be opened or is
	/// empty.
	pub fn from_path<P: AsRef<Path>>(registry: Arc<CodecRegistry>, path: P, opts: SourceOptions)
	-> Result<Self, ImageError> {
		FileSourceStream::open(path).map(|s| Self::from_stream(registry, s, opts))
	}

	#[must_use]
	/// # From Stream.
	pub fn from_stream<S: SourceStream + 'static>(
		registry: Arc<CodecRegistry>,
		stream: S,
		opts: SourceOptions,
	) -> Self {
		Self::new(registry, Arc::new(Mutex::new(stream)), opts, false)
	}

	#[must_use]
	/// # From Shared Stream.
	pub fn from_shared(registry: Arc<CodecRegistry>, stream: SharedStream, opts: SourceOptions)
	-> Self {
		Self::new(registry, stream, opts, false)
	}

	#[must_use]
	/// # Incremental.
	///
	/// Create an empty source to be fed with [`ImageSource::update_data`].
	pub fn incremental(registry: Arc<CodecRegistry>, opts: IncrementalSourceOptions) -> Self {
		let stream = IncrementalSourceStream::new(opts.incremental_mode);
		Self::new(registry, Arc::new(Mutex::new(stream)), opts.source_options, true)
	}

	/// # From Data URL.
	fn from_data_url(registry: Arc<CodecRegistry>, data: &[u8], mut opts: SourceOptions)
	-> Result<Self, ImageError> {
		let url = data_url::decode(data)?;
		if opts.format_hint.is_empty() { opts.format_hint = url.mime; }
		Ok(Self::from_stream(registry, BufferSourceStream::from(url.data), opts))
	}

	/// # New.
	fn new(
		registry: Arc<CodecRegistry>,
		stream: SharedStream,
		opts: SourceOptions,
		is_incremental: bool,
	) -> Self {
		let inner = Inner {
			source_info: SourceInfo {
				base_density: opts.base_density,
				..SourceInfo::default()
			},
			last_sample_size: 1,
			..Inner::default()
		};

		Self {
			registry,
			stream,
			opts,
			is_incremental,
			inner: Mutex::new(inner),
			listeners: Mutex::new(Listeners::default()),
		}
	}
}

/// ## Source Info.
impl ImageSource {
	/// # Update Data.
	///
	/// Append more bytes to an incremental source.
	///
	/// ## Errors
	///
	/// Returns [`ImageError::DataUnsupport`] for non-incremental sources, or
	/// any error from the stream.
	pub fn update_data(&self, data: &[u8], is_completed: bool) -> Result<(), ImageError> {
		if ! self.is_incremental { return Err(ImageError::DataUnsupport); }
		self.lock_stream().update_data(data, is_completed)
	}

	/// # Encoded Format.
	///
	/// ## Errors
	///
	/// Returns [`ImageError::SourceDataIncomplete`] if more data is needed to
	/// tell, or the terminal error if the source has already failed.
	pub fn get_encoded_format(&self) -> Result<String, ImageError> {
		let mut inner = self.lock();
		self.recognize(&mut inner)?;
		Ok(inner.source_info.encoded_format.clone())
	}

	/// # Source Info.
	///
	/// ## Errors
	///
	/// Returns any errors encountered while decoding the source info.
	pub fn get_source_info(&self) -> Result<SourceInfo, ImageError> {
		let mut inner = self.lock();
		self.decode_source_info(&mut inner, false)?;
		Ok(inner.source_info.clone())
	}

	/// # Top-Level Image Count.
	///
	/// ## Errors
	///
	/// Returns any errors encountered while decoding the source info.
	pub fn get_top_level_image_num(&self) -> Result<u32, ImageError> {
		let mut inner = self.lock();
		self.decode_source_info(&mut inner, true)?;
		Ok(inner.source_info.top_level_image_num)
	}

	#[must_use]
	/// # Source Decoding State.
	pub fn get_source_decoding_state(&self) -> SourceDecodingState { self.lock().state }

	#[must_use]
	/// # Image Decoding State.
	///
	/// Returns `None` if the image at `index` has not been looked at yet.
	pub fn get_image_decoding_state(&self, index: u32) -> Option<ImageDecodingState> {
		self.lock().status.get(&index).map(|s| s.image_state)
	}

	#[must_use]
	/// # Nine-Patch Info.
	///
	/// This is only known once an image has been decoded.
	pub fn get_nine_patch_info(&self) -> Option<NinePatch> { self.lock().nine_patch.clone() }

	#[must_use]
	/// # Incremental?
	pub const fn is_incremental_source(&self) -> bool { self.is_incremental }

	#[must_use]
	/// # Supported Formats.
	pub fn supported_formats(&self) -> Vec<String> { self.registry.supported_formats() }

	/// # Image Info.
	///
	/// ## Errors
	///
	/// Returns [`ImageError::SourceDataIncomplete`] if more data is needed,
	/// otherwise any (cached) error encountered parsing the header.
	pub fn get_image_info(&self, index: u32) -> Result<ImageInfo, ImageError> {
		let mut inner = self.lock();
		self.get_valid_image_status(&mut inner, index).map(|s| s.image_info)
	}

	#[must_use]
	/// # Decoder Census.
	///
	/// Whether the idle decoder slot is filled, and how many incremental
	/// sessions are holding decoders. At most one of these is ever non-zero.
	pub fn decoder_census(&self) -> (bool, usize) {
		let inner = self.lock();
		(inner.main_decoder.is_some(), inner.loaned())
	}

	/// # Lock Decode State.
	fn lock(&self) -> MutexGuard<'_, Inner> {
		self.inner.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// # Lock Stream.
	fn lock_stream(&self) -> MutexGuard<'_, dyn SourceStream + 'static> {
		self.stream.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// # Recognize Format.
	///
	/// Run the format detection if it hasn't happened yet.
	fn recognize(&self, inner: &mut Inner) -> Result<(), ImageError> {
		if let Some(e) = inner.state.as_error() { return Err(e); }
		if SourceDecodingState::FormatRecognized <= inner.state { return Ok(()); }

		match self.detect_format() {
			Ok(mime) => {
				log::debug!("Recognized {mime}.");
				inner.source_info.encoded_format = mime;
				inner.set_source_state(SourceDecodingState::FormatRecognized);
				Ok(())
			},
			Err(ImageError::SourceDataIncomplete) => Err(ImageError::SourceDataIncomplete),
			Err(ImageError::UnknownFormat) => {
				inner.set_source_state(SourceDecodingState::UnknownFormat);
				Err(ImageError::UnknownFormat)
			},
			Err(e) => {
				inner.set_source_state(SourceDecodingState::SourceError);
				Err(e)
			},
		}
	}

	/// # Detect Format.
	///
	/// Check the hinted agent first, then everyone else, falling back to raw.
	fn detect_format(&self) -> Result<String, ImageError> {
		let mut stream = self.lock_stream();
		let completed = stream.is_stream_completed();
		if completed && stream.stream_size() == 0 {
			log::error!("The source is empty.");
			return Err(ImageError::SourceData);
		}

		let mut incomplete = false;
		let mut check = |agent: &dyn FormatAgent| -> bool {
			let len = agent.header_size();
			if len == 0 { return agent.check_format(&[]); }
			let old = stream.tell();
			let head = read_at(&mut *stream, 0, len);
			stream.seek(old);
			match head {
				Some(head) => agent.check_format(&head),
				None => {
					if ! completed { incomplete = true; }
					false
				},
			}
		};

		// The hint.
		let hinted = self.registry.agent(&self.opts.format_hint);
		if let Some(agent) = hinted {
			if check(agent) { return Ok(agent.format_type().to_owned()); }
		}

		// Everyone else.
		for agent in self.registry.agents() {
			let agent: &dyn FormatAgent = &**agent;
			let mime = agent.format_type();
			if
				mime == MIME_RAW ||
				hinted.is_some_and(|h| h.format_type() == mime)
			{
				continue;
			}
			if check(agent) { return Ok(mime.to_owned()); }
		}

		if incomplete { Err(ImageError::SourceDataIncomplete) }
		else if self.registry.agent(MIME_RAW).is_some() { Ok(MIME_RAW.to_owned()) }
		else { Err(ImageError::UnknownFormat) }
	}

	/// # Decode Source Info.
	///
	/// Walk the source state machine as far as it will go. If
	/// `is_acquired_num` is set, the image count is re-derived.
	fn decode_source_info(&self, inner: &mut Inner, is_acquired_num: bool)
	-> Result<(), ImageError> {
		if SourceDecodingState::FileInfoDecoded <= inner.state {
			if ! is_acquired_num { return Ok(()); }
			inner.set_source_state(SourceDecodingState::FormatRecognized);
		}

		self.recognize(inner)?;

		// Format recognized; find a decoder and count the images.
		let mut decoder = match self.borrow_decoder(inner) {
			Ok(d) => d,
			Err(e) => {
				log::error!("Unsupported format: {}.", inner.source_info.encoded_format);
				inner.set_source_state(SourceDecodingState::UnsupportedFormat);
				return Err(e);
			},
		};
		let res = decoder.top_level_image_num();
		inner.return_decoder(decoder);

		match res {
			Ok(num) => {
				inner.source_info.top_level_image_num = num;
				inner.set_source_state(SourceDecodingState::FileInfoDecoded);
				Ok(())
			},
			Err(ImageError::SourceDataIncomplete) => Err(ImageError::SourceDataIncomplete),
			Err(e) => {
				log::error!("Unable to decode file info: {e}");
				inner.set_source_state(SourceDecodingState::FileInfoError);
				Err(e)
			},
		}
	}

	/// # Valid Image Status.
	///
	/// Return the cached status for an index, parsing its header if needed.
	/// Header failures other than "incomplete" are cached.
	fn get_valid_image_status(&self, inner: &mut Inner, index: u32)
	-> Result<ImageDecodingStatus, ImageError> {
		if let Some(status) = inner.status.get(&index) {
			if status.image_state < ImageDecodingState::BaseInfoParsed {
				return Err(ImageError::DecodeFailed);
			}
			return Ok(*status);
		}

		self.decode_source_info(inner, false)?;

		let mut decoder = self.borrow_decoder(inner)?;
		let res = decoder.image_size(index);
		inner.return_decoder(decoder);

		match res {
			Ok(size) => {
				let mut info = ImageInfo::new(size, PixelFormat::Unknown, AlphaType::Unknown);
				info.base_density = self.opts.base_density;
				let status = ImageDecodingStatus {
					image_info: info,
					image_state: ImageDecodingState::BaseInfoParsed,
				};
				inner.status.insert(index, status);
				Ok(status)
			},
			Err(ImageError::SourceDataIncomplete) => Err(ImageError::SourceDataIncomplete),
			Err(e) => {
				log::error!("Unable to parse image #{index}: {e}");
				inner.status.insert(index, ImageDecodingStatus {
					image_info: ImageInfo::default(),
					image_state: ImageDecodingState::BaseInfoError,
				});
				Err(e)
			},
		}
	}

	/// # Borrow Decoder.
	///
	/// Take the idle decoder, or make a new one.
	fn borrow_decoder(&self, inner: &mut Inner) -> Result<Box<dyn ImageDecoder>, ImageError> {
		if let Some(d) = inner.main_decoder.take() { return Ok(d); }
		let mut d = self.registry.create_decoder(&inner.source_info.encoded_format, &self.opts)?;
		d.set_source(Arc::clone(&self.stream));
		Ok(d)
	}
}

/// ## Decoding.
impl ImageSource {
	/// # Create Pixel Map.
	///
	/// Decode the image at `index` in one go, then crop, resize, rotate,
	/// and convert it as the options require.
	///
	/// ## Errors
	///
	/// Returns [`ImageError::SourceDataIncomplete`] if more data is needed,
	/// or any other error encountered along the way.
	pub fn create_pixel_map(&self, index: u32, opts: &DecodeOptions)
	-> Result<PixelMap, ImageError> {
		let mut inner = self.lock();

		// A new sample size needs a fresh start.
		if opts.sample() != inner.last_sample_size {
			inner.reset();
			inner.last_sample_size = opts.sample();
		}

		self.get_valid_image_status(&mut inner, index)?;

		let mut decoder = self.borrow_decoder(&mut inner)?;
		let info = match self.apply_options(&mut *decoder, index, opts) {
			Ok(info) => info,
			Err(e) => {
				inner.return_decoder(decoder);
				return Err(e);
			},
		};
		set_state(&mut inner, index, info, ImageDecodingState::ImageDecoding);

		// Let everyone know.
		drop(inner);
		self.notify(DecodeEvent::HeaderDecode);
		let mut inner = self.lock();

		let step = final_output_step(opts, &info, inner.nine_patch.is_some());
		let allocator =
			if step.forces_heap() { AllocatorType::Heap }
			else { opts.allocator_type };
		let mut ctx = DecodeContext::new(allocator);
		let res = decoder.decode(index, &mut ctx);
		inner.return_decoder(decoder);
		ctx.info.base_density = self.opts.base_density;

		let partial = match res {
			Ok(()) => {
				set_state(&mut inner, index, ctx.info, ImageDecodingState::ImageDecoded);
				false
			},
			Err(e) if ctx.is_partial && opts.allow_partial_image => {
				log::warn!("Returning a partial image: {e}");
				set_state(&mut inner, index, ctx.info, ImageDecodingState::PartialImage);
				true
			},
			Err(ImageError::SourceDataIncomplete) => {
				log::debug!("Image #{index} needs more data.");
				return Err(ImageError::SourceDataIncomplete);
			},
			Err(e) => {
				log::error!("Decoding failed: {e}");
				set_state(&mut inner, index, info, ImageDecodingState::ImageError);
				return Err(e);
			},
		};
		if ctx.nine_patch.is_some() { inner.nine_patch.clone_from(&ctx.nine_patch); }
		drop(inner);

		// Build the map and finish it up.
		let mut map = PixelMap::new(ctx.info, ctx.pixels, ctx.allocator)?;
		map.set_editable(opts.editable);
		map.set_nine_patch(ctx.nine_patch);
		let step = final_output_step(opts, map.info(), map.nine_patch().is_some());
		decode_post_proc(opts, &mut map, step)?;

		self.notify(
			if partial { DecodeEvent::PartialDecode }
			else { DecodeEvent::CompleteDecode }
		);
		Ok(map)
	}

	#[must_use]
	/// # Create Incremental Pixel Map.
	///
	/// The map starts out empty; call
	/// [`IncrementalPixelMap::promote_decoding`] whenever new data arrives.
	pub fn create_incremental_pixel_map(self: &Arc<Self>, index: u32, opts: &DecodeOptions)
	-> IncrementalPixelMap {
		if let Err(e) = self.get_image_info(index) {
			log::debug!("Image #{index} is not ready yet: {e}");
		}
		IncrementalPixelMap::new(Arc::downgrade(self), index, *opts)
	}

	/// # Promote Decoding.
	///
	/// Advance the incremental session for `map`, starting it if needed.
	/// Returns the session state and progress (0-100). Running out of data
	/// is not an error; the state simply stays short of
	/// [`ImageDecodingState::ImageDecoded`].
	///
	/// ## Errors
	///
	/// Returns the (cached) error if the session has failed.
	pub fn promote_decoding(&self, index: u32, opts: &DecodeOptions, map: &mut PixelMap)
	-> Result<(ImageDecodingState, u8), ImageError> {
		let id = map.id();
		let mut inner = self.lock();

		// Start a session?
		if ! inner.inc.contains_key(&id) {
			match self.get_valid_image_status(&mut inner, index) {
				Ok(_) => {},
				Err(ImageError::SourceDataIncomplete) =>
					return Ok((ImageDecodingState::Unresolved, 0)),
				Err(e) => return Err(e),
			}
			let decoder = self.borrow_decoder(&mut inner)?;
			inner.inc.insert(id, IncrementalDecodingContext::new(decoder));
		}

		// Apply the options.
		if session(&mut inner, id)?.state == ImageDecodingState::BaseInfoParsed {
			let ctx = session(&mut inner, id)?;
			let decoder = ctx.decoder.as_mut().ok_or(ImageError::DecodeFailed)?;
			let info = match self.apply_options(&mut **decoder, index, opts) {
				Ok(info) => info,
				Err(ImageError::SourceDataIncomplete) =>
					return Ok((ImageDecodingState::BaseInfoParsed, 0)),
				Err(e) => {
					end_session(&mut inner, id, Some(e));
					return Err(e);
				},
			};

			let nine = inner.nine_patch.is_some();
			let ctx = session(&mut inner, id)?;
			ctx.state = ImageDecodingState::ImageDecoding;
			ctx.step = final_output_step(opts, &info, nine);
			set_state(&mut inner, index, info, ImageDecodingState::ImageDecoding);
			if inner.sent_events.insert((id, DecodeEvent::HeaderDecode)) {
				drop(inner);
				self.notify(DecodeEvent::HeaderDecode);
				inner = self.lock();
			}
		}

		// Pick up where we left off.
		let ctx = session(&mut inner, id)?;
		match ctx.state {
			ImageDecodingState::ImageDecoded => return Ok((ImageDecodingState::ImageDecoded, 100)),
			ImageDecodingState::ImageError =>
				return Err(ctx.error.unwrap_or(ImageError::DecodeFailed)),
			ImageDecodingState::ImageDecoding => {},
			_ => return Err(ImageError::DecodeFailed),
		}

		let allocator =
			if ctx.step.forces_heap() { AllocatorType::Heap }
			else { opts.allocator_type };
		let decoder = ctx.decoder.as_mut().ok_or(ImageError::DecodeFailed)?;
		let mut prog = ProgDecodeContext::default();
		prog.decode_context.allocator = allocator;
		prog.decode_context.pixels = map.take_pixels();
		let res = decoder.promote_incremental_decode(index, &mut prog);
		ctx.progress = prog.total_process_progress;
		let progress = ctx.progress;

		let mut dc = prog.decode_context;
		dc.info.base_density = self.opts.base_density;
		map.restore_pixels(dc.info, dc.pixels, dc.allocator);
		map.set_editable(opts.editable);

		match res {
			Ok(()) => {
				if dc.nine_patch.is_some() { inner.nine_patch.clone_from(&dc.nine_patch); }
				map.set_nine_patch(dc.nine_patch);
				end_session(&mut inner, id, None);
				set_state(&mut inner, index, *map.info(), ImageDecodingState::ImageDecoded);
				let send = inner.sent_events.insert((id, DecodeEvent::CompleteDecode));
				drop(inner);

				let step = final_output_step(opts, map.info(), map.nine_patch().is_some());
				if let Err(e) = decode_post_proc(opts, map, step) {
					end_session(&mut self.lock(), id, Some(e));
					return Err(e);
				}
				if send { self.notify(DecodeEvent::CompleteDecode); }
				Ok((ImageDecodingState::ImageDecoded, 100))
			},
			Err(ImageError::SourceDataIncomplete) =>
				if dc.is_partial && opts.allow_partial_image {
					set_state(&mut inner, index, *map.info(), ImageDecodingState::PartialImage);
					if inner.sent_events.insert((id, DecodeEvent::PartialDecode)) {
						drop(inner);
						self.notify(DecodeEvent::PartialDecode);
					}
					Ok((ImageDecodingState::PartialImage, progress))
				}
				else { Ok((ImageDecodingState::ImageDecoding, progress)) },
			Err(e) => {
				log::error!("Incremental decoding failed: {e}");
				end_session(&mut inner, id, Some(e));
				set_state(&mut inner, index, *map.info(), ImageDecodingState::ImageError);
				Err(e)
			},
		}
	}

	/// # Detach Incremental Decoding.
	///
	/// End the session for a map, returning its decoder. This is safe to call
	/// more than once.
	pub fn detach_incremental_decoding(&self, id: PixelMapId) {
		let mut inner = self.lock();
		if let Some(ctx) = inner.inc.remove(&id) {
			if let Some(decoder) = ctx.decoder { inner.return_decoder(decoder); }
		}
		inner.sent_events.retain(|(i, _)| *i != id);
	}

	/// # Apply Options.
	///
	/// Set the decode options and check the crop fits what comes out.
	fn apply_options(&self, decoder: &mut dyn ImageDecoder, index: u32, opts: &DecodeOptions)
	-> Result<ImageInfo, ImageError> {
		let mut info = decoder.set_decode_options(index, opts)?;
		if ! opts.crop_rect.is_empty() && ! opts.crop_rect.fits(info.size) {
			log::error!("The crop region does not fit the image.");
			return Err(ImageError::Crop);
		}
		info.base_density = self.opts.base_density;
		Ok(info)
	}
}



/// ## Properties.
impl ImageSource {
	/// # Integer Property.
	///
	/// ## Errors
	///
	/// Returns any source errors, or whatever the decoder says.
	pub fn get_image_property_int(&self, index: u32, key: &str) -> Result<i32, ImageError> {
		self.with_decoder(|d| d.image_property_int(index, key))
	}

	/// # String Property.
	///
	/// ## Errors
	///
	/// Returns any source errors, or whatever the decoder says.
	pub fn get_image_property_string(&self, index: u32, key: &str) -> Result<String, ImageError> {
		self.with_decoder(|d| d.image_property_string(index, key))
	}

	/// # Modify Property.
	///
	/// ## Errors
	///
	/// Returns any source errors, or whatever the decoder says.
	pub fn modify_image_property(&self, index: u32, key: &str, value: &str)
	-> Result<(), ImageError> {
		self.with_decoder(|d| d.modify_image_property(index, key, value))
	}

	/// # Filter Area.
	///
	/// ## Errors
	///
	/// Returns any source errors, or whatever the decoder says.
	pub fn get_filter_area(&self, privacy_type: i32) -> Result<Vec<(u32, u32)>, ImageError> {
		self.with_decoder(|d| d.filter_area(privacy_type))
	}

	/// # With Decoder.
	fn with_decoder<F, T>(&self, cb: F) -> Result<T, ImageError>
	where F: FnOnce(&mut dyn ImageDecoder) -> Result<T, ImageError> {
		let mut inner = self.lock();
		self.decode_source_info(&mut inner, false)?;
		let mut decoder = self.borrow_decoder(&mut inner)?;
		let res = cb(&mut *decoder);
		inner.return_decoder(decoder);
		res
	}
}

/// ## Listeners.
impl ImageSource {
	/// # Add Decode Listener.
	pub fn add_decode_listener(&self, listener: Arc<dyn DecodeListener>) {
		self.lock_listeners().add_decode(listener);
	}

	/// # Remove Decode Listener.
	pub fn remove_decode_listener(&self, listener: &Arc<dyn DecodeListener>) {
		self.lock_listeners().remove_decode(listener);
	}

	/// # Add Peer Listener.
	pub fn add_peer_listener(&self, listener: Weak<dyn PeerListener>) {
		self.lock_listeners().add_peer(listener);
	}

	/// # Remove Peer Listener.
	pub fn remove_peer_listener(&self, listener: &Weak<dyn PeerListener>) {
		self.lock_listeners().remove_peer(listener);
	}

	/// # Lock Listeners.
	fn lock_listeners(&self) -> MutexGuard<'_, Listeners> {
		self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// # Notify.
	///
	/// The decode lock must not be held.
	fn notify(&self, event: DecodeEvent) {
		let listeners = self.lock_listeners().decode_listeners();
		log::debug!("Sending {event} event to {} listener(s).", listeners.len());
		for l in listeners { l.on_event(event); }
	}
}



/// # Session.
fn session(inner: &mut Inner, id: PixelMapId)
-> Result<&mut IncrementalDecodingContext, ImageError> {
	inner.inc.get_mut(&id).ok_or(ImageError::DecodeFailed)
}

/// # Set Image State.
fn set_state(inner: &mut Inner, index: u32, info: ImageInfo, state: ImageDecodingState) {
	let entry = inner.status.entry(index).or_default();
	entry.image_state = state;
	if info.size.is_positive() { entry.image_info = info; }
}

/// # End Session.
///
/// Record the outcome and hand the decoder back. The session itself stays
/// put, answering with the outcome, until it is detached.
fn end_session(inner: &mut Inner, id: PixelMapId, err: Option<ImageError>) {
	let decoder = inner.inc.get_mut(&id).and_then(|ctx| {
		if err.is_some() { ctx.state = ImageDecodingState::ImageError; }
		else {
			ctx.state = ImageDecodingState::ImageDecoded;
			ctx.progress = 100;
		}
		ctx.error = err;
		ctx.decoder.take()
	});
	if let Some(decoder) = decoder { inner.return_decoder(decoder); }
}

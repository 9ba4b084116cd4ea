/*!
# `ImgSource` - Codec Registry

Format agents and decoder factories, keyed by MIME type. The registry is
built explicitly and shared between sources by `Arc`.
*/

use crate::{
	FormatAgent,
	ImageDecoder,
	ImageError,
	ImageKind,
	SourceOptions,
	kind::{
		bmp::BmpDecoder,
		buffered::BufferedDecoder,
		raw::RawCodec,
	},
};
use std::{
	collections::HashMap,
	fmt,
};



/// # Decoder Factory.
pub type DecoderFactory = Box<dyn Fn(&SourceOptions) -> Box<dyn ImageDecoder> + Send + Sync>;



#[derive(Default)]
/// # Codec Registry.
pub struct CodecRegistry {
	/// # Format Agents (Ordered).
	agents: Vec<Box<dyn FormatAgent>>,

	/// # Decoder Factories.
	decoders: HashMap<String, DecoderFactory>,
}

impl fmt::Debug for CodecRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CodecRegistry")
			.field("agents", &self.agents.iter().map(|a| a.format_type()).collect::<Vec<_>>())
			.field("decoders", &self.supported_formats())
			.finish()
	}
}

impl CodecRegistry {
	#[must_use]
	/// # New (Empty).
	pub fn new() -> Self { Self::default() }

	#[must_use]
	/// # Built-In Codecs.
	///
	/// Every built-in format agent, and a decoder for each compiled-in
	/// format. GIF and HEIF are recognized but have no decoder.
	pub fn builtin() -> Self {
		let mut out = Self::new();
		for kind in ImageKind::ALL { out.register_agent(Box::new(kind)); }

		out.register_decoder(ImageKind::Bmp.mime(), |_| Box::new(BmpDecoder::default()));
		out.register_decoder(
			ImageKind::Raw.mime(),
			|opts| Box::new(BufferedDecoder::new(RawCodec::from(opts))),
		);

		#[cfg(feature = "jpeg")]
		out.register_decoder(
			ImageKind::Jpeg.mime(),
			|_| Box::new(BufferedDecoder::new(crate::kind::jpeg::JpegCodec)),
		);

		#[cfg(feature = "png")]
		out.register_decoder(
			ImageKind::Png.mime(),
			|_| Box::new(BufferedDecoder::new(crate::kind::png::PngCodec::default())),
		);

		#[cfg(feature = "webp")]
		out.register_decoder(
			ImageKind::Webp.mime(),
			|_| Box::new(BufferedDecoder::new(crate::kind::webp::WebpCodec)),
		);

		out
	}

	/// # Register Agent.
	///
	/// Agents are scanned in registration order. An agent replacing one with
	/// the same format type keeps the original's position.
	pub fn register_agent(&mut self, agent: Box<dyn FormatAgent>) {
		if let Some(old) = self.agents.iter_mut().find(|a| a.format_type() == agent.format_type()) {
			*old = agent;
		}
		else { self.agents.push(agent); }
	}

	/// # Register Decoder.
	///
	/// Replace or add the decoder factory for a MIME type.
	pub fn register_decoder<F>(&mut self, mime: &str, factory: F)
	where F: Fn(&SourceOptions) -> Box<dyn ImageDecoder> + Send + Sync + 'static {
		self.decoders.insert(mime.to_ascii_lowercase(), Box::new(factory));
	}

	#[must_use]
	/// # Agents.
	pub fn agents(&self) -> &[Box<dyn FormatAgent>] { &self.agents }

	#[must_use]
	/// # Agent by MIME.
	pub fn agent(&self, mime: &str) -> Option<&dyn FormatAgent> {
		self.agents.iter()
			.find(|a| a.format_type().eq_ignore_ascii_case(mime))
			.map(|a| &**a)
	}

	/// # Create Decoder.
	///
	/// ## Errors
	///
	/// Returns [`ImageError::PluginCreateFailed`] if no decoder is registered
	/// for the format.
	pub fn create_decoder(&self, mime: &str, opts: &SourceOptions)
	-> Result<Box<dyn ImageDecoder>, ImageError> {
		match self.decoders.get(&mime.to_ascii_lowercase()) {
			Some(factory) => Ok(factory(opts)),
			None => {
				log::error!("No decoder for {mime}.");
				Err(ImageError::PluginCreateFailed)
			},
		}
	}

	#[must_use]
	/// # Supported Formats.
	///
	/// The MIME types with a decoder, sorted.
	pub fn supported_formats(&self) -> Vec<String> {
		let mut out: Vec<String> = self.decoders.keys().cloned().collect();
		out.sort_unstable();
		out
	}
}

/*!
# `ImgSource` - Data URLs

Sources may arrive as `data:image/<type>;base64,<payload>` strings.
*/

use base64::Engine;
use crate::ImageError;



/// # Prefix.
const PREFIX: &[u8] = b"data:image/";

/// # Payload Marker.
const MARKER: &[u8] = b";base64,";



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Decoded Data URL.
pub(crate) struct DataUrl {
	/// # MIME Type.
	pub(crate) mime: String,

	/// # Payload.
	pub(crate) data: Vec<u8>,
}

#[must_use]
/// # Is Data URL?
pub(crate) fn is_data_url(src: &[u8]) -> bool { src.starts_with(PREFIX) }

/// # Decode Data URL.
///
/// ## Errors
///
/// Returns [`ImageError::SourceData`] if the marker is missing or the
/// payload is not valid base64.
pub(crate) fn decode(src: &[u8]) -> Result<DataUrl, ImageError> {
	if ! is_data_url(src) { return Err(ImageError::SourceData); }
	let pos = src.windows(MARKER.len())
		.position(|w| w == MARKER)
		.ok_or(ImageError::SourceData)?;

	let mime = std::str::from_utf8(&src[5..pos])
		.map_err(|_| ImageError::SourceData)?
		.to_ascii_lowercase();
	let payload = src[pos + MARKER.len()..].trim_ascii();
	if payload.is_empty() { return Err(ImageError::SourceData); }

	let mut data = Vec::with_capacity(estimated_len(payload));
	base64::engine::general_purpose::STANDARD.decode_vec(payload, &mut data)
		.map_err(|e| {
			log::error!("Invalid base64 payload: {e}");
			ImageError::SourceData
		})?;

	if data.is_empty() { Err(ImageError::SourceData) }
	else { Ok(DataUrl { mime, data }) }
}

/// # Estimated Length.
///
/// The payload length less padding, less a quarter. This is only ever used
/// as a capacity hint.
fn estimated_len(payload: &[u8]) -> usize {
	let pad = payload.iter().rev().take_while(|&&b| b == b'=').count();
	let len = payload.len() - pad;
	len - (len / 8) * 2
}

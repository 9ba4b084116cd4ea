/*!
# `ImgSource` - PNG Chunks
*/



/// # PNG Signature.
const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];



#[derive(Debug, Clone, Copy)]
/// # Chunk.
pub(super) struct Chunk<'a> {
	/// # Type.
	pub(super) kind: [u8; 4],

	/// # Data.
	pub(super) data: &'a [u8],
}



#[derive(Debug, Clone)]
/// # Chunk Iterator.
///
/// Walk the complete chunks of a (possibly partial) PNG, stopping at the
/// first one that is cut off.
pub(super) struct Chunks<'a> {
	/// # Remaining Bytes.
	raw: &'a [u8],
}

impl<'a> Chunks<'a> {
	/// # New.
	///
	/// Returns `None` if the signature is wrong or missing.
	pub(super) fn new(raw: &'a [u8]) -> Option<Self> {
		let rest = raw.strip_prefix(&SIGNATURE)?;
		Some(Self { raw: rest })
	}
}

impl<'a> Iterator for Chunks<'a> {
	type Item = Chunk<'a>;

	fn next(&mut self) -> Option<Self::Item> {
		let len = usize::try_from(u32::from_be_bytes(self.raw.get(..4)?.try_into().ok()?)).ok()?;
		let kind: [u8; 4] = self.raw.get(4..8)?.try_into().ok()?;
		let end = len.checked_add(12)?;
		let data = self.raw.get(8..8 + len)?;
		self.raw = self.raw.get(end..)?;
		Some(Chunk { kind, data })
	}
}



#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn t_chunks() {
		let raw = include_bytes!("../../../skel/logo.png");
		let kinds: Vec<[u8; 4]> = Chunks::new(raw).unwrap().map(|c| c.kind).collect();
		assert_eq!(kinds.first(), Some(b"IHDR"));
		assert_eq!(kinds.last(), Some(b"IEND"));
		assert!(kinds.contains(b"tRNS"));

		// Partial chunks are not returned.
		assert_eq!(Chunks::new(&raw[..40]).unwrap().count(), 1);
		assert!(Chunks::new(b"nope").is_none());
	}
}

/*!
# `ImgSource` - Listeners
*/

use std::{
	fmt,
	sync::{
		Arc,
		Weak,
	},
};



#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
/// # Decode Event.
pub enum DecodeEvent {
	/// # Header Decoded (Options Applied).
	HeaderDecode,

	/// # Partial Image Available.
	PartialDecode,

	/// # Image Complete.
	CompleteDecode,
}

impl fmt::Display for DecodeEvent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::HeaderDecode => "header",
			Self::PartialDecode => "partial",
			Self::CompleteDecode => "complete",
		})
	}
}



/// # Decode Listener.
///
/// Listeners are called with no source locks held, so they may call back
/// into the source, but the source may have moved on by the time they do.
pub trait DecodeListener: Send + Sync {
	/// # On Event.
	fn on_event(&self, event: DecodeEvent);
}

/// # Peer Listener.
///
/// Notified once, when the source is dropped.
pub trait PeerListener: Send + Sync {
	/// # On Peer Destroy.
	fn on_peer_destroy(&self);
}



#[derive(Default)]
/// # Listener Sets.
pub(crate) struct Listeners {
	/// # Decode Listeners.
	decode: Vec<Arc<dyn DecodeListener>>,

	/// # Peer Listeners.
	peer: Vec<Weak<dyn PeerListener>>,
}

impl Listeners {
	/// # Add Decode Listener.
	pub(crate) fn add_decode(&mut self, listener: Arc<dyn DecodeListener>) {
		if ! self.decode.iter().any(|l| Arc::ptr_eq(l, &listener)) {
			self.decode.push(listener);
		}
	}

	/// # Remove Decode Listener.
	pub(crate) fn remove_decode(&mut self, listener: &Arc<dyn DecodeListener>) {
		self.decode.retain(|l| ! Arc::ptr_eq(l, listener));
	}

	/// # Add Peer Listener.
	pub(crate) fn add_peer(&mut self, listener: Weak<dyn PeerListener>) {
		self.peer.retain(|l| l.strong_count() != 0);
		if ! self.peer.iter().any(|l| Weak::ptr_eq(l, &listener)) {
			self.peer.push(listener);
		}
	}

	/// # Remove Peer Listener.
	pub(crate) fn remove_peer(&mut self, listener: &Weak<dyn PeerListener>) {
		self.peer.retain(|l| ! Weak::ptr_eq(l, listener) && l.strong_count() != 0);
	}

	/// # Decode Listeners (Cloned).
	pub(crate) fn decode_listeners(&self) -> Vec<Arc<dyn DecodeListener>> {
		self.decode.clone()
	}

	/// # Live Peer Listeners.
	pub(crate) fn take_peers(&mut self) -> Vec<Arc<dyn PeerListener>> {
		std::mem::take(&mut self.peer).iter().filter_map(Weak::upgrade).collect()
	}
}



#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{
		AtomicUsize,
		Ordering::SeqCst,
	};

	#[derive(Default)]
	struct Counter(AtomicUsize);

	impl DecodeListener for Counter {
		fn on_event(&self, _event: DecodeEvent) { self.0.fetch_add(1, SeqCst); }
	}

	impl PeerListener for Counter {
		fn on_peer_destroy(&self) { self.0.fetch_add(1, SeqCst); }
	}

	#[test]
	fn t_listeners() {
		let mut set = Listeners::default();
		let a: Arc<dyn DecodeListener> = Arc::new(Counter::default());
		set.add_decode(Arc::clone(&a));
		set.add_decode(Arc::clone(&a));
		assert_eq!(set.decode_listeners().len(), 1);
		set.remove_decode(&a);
		assert!(set.decode_listeners().is_empty());

		let p = Arc::new(Counter::default());
		let weak: Weak<dyn PeerListener> = Arc::downgrade(&p) as Weak<dyn PeerListener>;
		set.add_peer(weak.clone());
		set.add_peer(weak);
		let peers = set.take_peers();
		assert_eq!(peers.len(), 1);
		peers[0].on_peer_destroy();
		assert_eq!(p.0.load(SeqCst), 1);
		assert!(set.take_peers().is_empty());
	}
}

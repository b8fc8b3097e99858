use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Callback which undoes a [`ReferenceHolder::hold_onto`].
pub type Release = Box<dyn FnOnce()>;

/// Something that keeps consumers of the graph alive.
///
/// The graph itself only references its consumers weakly, so an effect or a
/// legacy listener lives exactly as long as whatever holds it. Passing the
/// owner explicitly keeps that contract visible at every call site: the
/// consumer stays active at least as long as the owner, unless the returned
/// [`Release`] is invoked first.
pub trait ReferenceHolder {
	fn hold_onto(&self, value: Rc<dyn Any>) -> Release;
}

/// Owner which holds nothing.
///
/// For call sites that keep the consumer alive some other way, typically by
/// keeping the [`Disposer`] returned from `effect`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeakHolder;

impl ReferenceHolder for WeakHolder {
	fn hold_onto(&self, _: Rc<dyn Any>) -> Release {
		Box::new(|| {})
	}
}

/// Owner which keeps everything handed to it alive until it is released or
/// until the holder itself is dropped.
#[derive(Default)]
pub struct Holder {
	inner: Rc<HolderInner>,
}

#[derive(Default)]
struct HolderInner {
	next_id: Cell<u64>,
	held: RefCell<Vec<(u64, Rc<dyn Any>)>>,
}

impl Holder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.inner.held.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Drops every held value at once.
	pub fn clear(&self) {
		let held = std::mem::take(&mut *self.inner.held.borrow_mut());
		drop(held);
	}
}

impl ReferenceHolder for Holder {
	fn hold_onto(&self, value: Rc<dyn Any>) -> Release {
		self.inner.hold_onto(value)
	}
}

impl HolderInner {
	fn hold_onto(self: &Rc<Self>, value: Rc<dyn Any>) -> Release {
		let id = self.next_id.get();
		self.next_id.set(id + 1);
		self.held.borrow_mut().push((id, value));

		// The release callback must not keep the holder alive.
		let inner = Rc::downgrade(self);
		Box::new(move || {
			let Some(inner) = inner.upgrade() else {
				return;
			};
			let released = {
				let mut held = inner.held.borrow_mut();
				held.iter()
					.position(|(held_id, _)| *held_id == id)
					.map(|index| held.remove(index))
			};
			drop(released);
		})
	}
}

impl Holder {
	/// Handle that holds onto values for this holder while it is alive, and
	/// holds nothing afterwards.
	pub(crate) fn downgrade(&self) -> HolderRef {
		HolderRef {
			inner: Rc::downgrade(&self.inner),
		}
	}
}

pub(crate) struct HolderRef {
	inner: Weak<HolderInner>,
}

impl ReferenceHolder for HolderRef {
	fn hold_onto(&self, value: Rc<dyn Any>) -> Release {
		match self.inner.upgrade() {
			Some(inner) => inner.hold_onto(value),
			None => Box::new(|| {}),
		}
	}
}

impl std::fmt::Debug for Holder {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Holder").field("held", &self.len()).finish()
	}
}

/// Handle returned by `effect`.
///
/// [`dispose`](Disposer::dispose) kills the effect and releases it from its
/// owner. Calling it again does nothing. Dropping the handle without calling
/// it leaves the effect running for as long as its owner lives.
pub struct Disposer {
	dispose: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Disposer {
	pub(crate) fn new(dispose: impl FnOnce() + 'static) -> Self {
		Disposer {
			dispose: RefCell::new(Some(Box::new(dispose))),
		}
	}

	pub fn dispose(&self) {
		let dispose = self.dispose.borrow_mut().take();
		if let Some(dispose) = dispose {
			dispose();
		}
	}

	pub fn is_disposed(&self) -> bool {
		self.dispose.borrow().is_none()
	}
}

impl std::fmt::Debug for Disposer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Disposer")
			.field("disposed", &self.is_disposed())
			.finish()
	}
}

//! Listener based engine.
//!
//! States are plain value cells that call their listeners whenever they
//! change. A memo evaluates eagerly, subscribes to everything it read and
//! evaluates again on every notification. Nothing is lazy and intermediate
//! values are visible to effects, this engine exists for code written against
//! listeners that has not moved to the node graph yet.

mod basic;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use tracing::debug;

pub use basic::BasicState;

use basic::DerivedBasicState;

use crate::addr::RcAddr;
use crate::holder::{Disposer, HolderRef, Release, ReferenceHolder};
use crate::observer::Observed;
use crate::{Engine, MutableState, MutableStateRef, Observer, StateRef, Value};

/// State which can be listened to for changes directly.
pub trait OnSetValue<T> {
	/// Calls `listener` with every new value.
	///
	/// The state only references the listener weakly, `owner` keeps it (and
	/// the state) alive. The returned callback unsubscribes.
	fn on_set_value(&self, owner: &dyn ReferenceHolder, listener: Rc<dyn Fn(&T)>) -> Release;
}

/// Type erased [`OnSetValue`], what a legacy memo subscribes to.
pub(crate) trait Listenable: 'static {
	fn listen(&self, owner: &dyn ReferenceHolder, listener: Rc<dyn Fn()>) -> Release;
}

/// Engine built on [`OnSetValue`] listeners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Legacy;

impl Engine for Legacy {
	fn mutable_state<T: Value>(&self, value: T) -> MutableStateRef<T> {
		BasicState::new(value)
	}

	fn memo<T, F>(&self, func: F) -> StateRef<T>
	where
		T: Value,
		F: Fn(&Observer) -> T + 'static,
	{
		let observer = Observer::new();
		let initial = func(&observer);

		let derived = DerivedBasicState::new(initial);
		let memo = Rc::new(LegacyMemo {
			func: Box::new(func),
			subscribed: RefCell::new(IndexMap::default()),
			target: Rc::downgrade(derived.state()),
			owner: derived.holder().downgrade(),
		});
		memo.resubscribe(observer.take_listenables());

		derived
	}

	fn effect<F>(&self, owner: &dyn ReferenceHolder, func: F) -> Disposer
	where
		F: Fn(&Observer) + 'static,
	{
		let disposed = Rc::new(Cell::new(false));
		let memo = self.memo({
			let disposed = disposed.clone();
			move |cx| {
				if !disposed.get() {
					func(cx)
				}
			}
		});

		let release = owner.hold_onto(Rc::new(memo.clone()));
		Disposer::new(move || {
			disposed.set(true);
			release();
			drop(memo);
			debug!("legacy effect disposed");
		})
	}

	fn derived_state<T, B>(&self, initial: T, builder: B) -> StateRef<T>
	where
		T: Value,
		B: FnOnce(&dyn ReferenceHolder, &MutableStateRef<T>),
	{
		let derived = DerivedBasicState::new(initial);
		let state: MutableStateRef<T> = derived.state().clone();
		builder(derived.holder(), &state);
		derived
	}
}

/// Re-evaluation half of a legacy memo.
///
/// Listeners registered on the sources hold this strongly and are themselves
/// held by the memo's own holder, so the whole subscription set goes away
/// together with the memo state.
struct LegacyMemo<T> {
	func: Box<dyn Fn(&Observer) -> T>,
	subscribed: RefCell<IndexMap<RcAddr<dyn Listenable>, Release, FxBuildHasher>>,
	target: Weak<BasicState<T>>,
	owner: HolderRef,
}

impl<T: Value> LegacyMemo<T> {
	fn recompute(self: &Rc<Self>) {
		let observer = Observer::new();
		let value = (self.func)(&observer);
		self.resubscribe(observer.take_listenables());

		if let Some(target) = self.target.upgrade() {
			target.set(value);
		}
	}

	/// Subscribes to newly read sources and drops the ones no longer read.
	fn resubscribe(self: &Rc<Self>, observed: Observed<dyn Listenable>) {
		for source in observed.iter() {
			if self.subscribed.borrow().contains_key(source) {
				continue;
			}

			let memo = self.clone();
			let release = source.listen(&self.owner, Rc::new(move || memo.recompute()));
			self.subscribed.borrow_mut().insert(source.clone(), release);
		}

		let stale: Vec<Release> = {
			let mut subscribed = self.subscribed.borrow_mut();
			let (keep, stale): (Vec<_>, Vec<_>) = std::mem::take(&mut *subscribed)
				.into_iter()
				.partition(|(source, _)| observed.contains(source));
			*subscribed = keep.into_iter().collect();
			stale.into_iter().map(|(_, release)| release).collect()
		};

		for release in stale {
			release();
		}
	}
}

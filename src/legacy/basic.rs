use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::holder::{Holder, Release, ReferenceHolder};
use crate::legacy::{Listenable, OnSetValue};
use crate::{MutableState, Observer, State, Value};

struct Entry<T> {
	listener: Weak<dyn Fn(&T)>,
	removed: Rc<Cell<bool>>,
}

/// Listeners of a legacy state.
///
/// Listeners may subscribe or unsubscribe while a notification is running.
/// Ones added during a notification are not called for it, ones removed
/// during it are skipped if they have not been reached yet.
pub(crate) struct Listeners<T> {
	entries: RefCell<Vec<Entry<T>>>,
}

impl<T> Listeners<T> {
	pub fn new() -> Self {
		Listeners {
			entries: RefCell::new(Vec::new()),
		}
	}

	pub fn add(&self, listener: &Rc<dyn Fn(&T)>) -> Rc<Cell<bool>> {
		let removed = Rc::new(Cell::new(false));
		let mut entries = self.entries.borrow_mut();
		entries.retain(|entry| !entry.removed.get() && entry.listener.strong_count() > 0);
		entries.push(Entry {
			listener: Rc::downgrade(listener),
			removed: removed.clone(),
		});
		removed
	}

	pub fn remove_flagged(&self) {
		self.entries.borrow_mut().retain(|entry| !entry.removed.get());
	}

	pub fn notify(&self, value: &T) {
		let snapshot: Vec<_> = self
			.entries
			.borrow()
			.iter()
			.filter(|entry| !entry.removed.get())
			.filter_map(|entry| Some((entry.listener.upgrade()?, entry.removed.clone())))
			.collect();

		for (listener, removed) in snapshot {
			if !removed.get() {
				listener(value);
			}
		}
	}

	#[cfg(test)]
	pub fn len(&self) -> usize {
		self.entries.borrow().len()
	}
}

/// Plain value cell which notifies its listeners on every change.
pub struct BasicState<T> {
	value: RefCell<T>,
	listeners: Listeners<T>,
	this: Weak<BasicState<T>>,
}

impl<T: Value> BasicState<T> {
	pub fn new(value: T) -> Rc<Self> {
		Rc::new_cyclic(|this| BasicState {
			value: RefCell::new(value),
			listeners: Listeners::new(),
			this: this.clone(),
		})
	}

	/// Registers `listener`, keeping `keep_alive` and the listener alive from
	/// `owner` for as long as the subscription exists.
	fn subscribe(
		&self,
		keep_alive: Rc<dyn Any>,
		owner: &dyn ReferenceHolder,
		listener: Rc<dyn Fn(&T)>,
	) -> Release {
		let removed = self.listeners.add(&listener);
		let release = owner.hold_onto(Rc::new((keep_alive, listener)));

		let this = self.this.clone();
		Box::new(move || {
			removed.set(true);
			if let Some(this) = this.upgrade() {
				this.listeners.remove_flagged();
			}
			release();
		})
	}

	#[cfg(test)]
	pub(crate) fn listener_count(&self) -> usize {
		self.listeners.len()
	}
}

impl<T: Value> State<T> for BasicState<T> {
	fn get(&self, observer: &Observer) -> T {
		if let Some(this) = self.this.upgrade() {
			observer.observe_listenable(this);
		}
		self.get_untracked()
	}

	fn get_untracked(&self) -> T {
		self.value.borrow().clone()
	}
}

impl<T: Value> MutableState<T> for BasicState<T> {
	fn set_with(&self, mapper: &mut dyn FnMut(&T) -> T) {
		let current = self.get_untracked();
		let value = mapper(&current);
		if value == current {
			return;
		}

		*self.value.borrow_mut() = value.clone();
		self.listeners.notify(&value);
	}
}

impl<T: Value> OnSetValue<T> for BasicState<T> {
	fn on_set_value(&self, owner: &dyn ReferenceHolder, listener: Rc<dyn Fn(&T)>) -> Release {
		match self.this.upgrade() {
			Some(this) => self.subscribe(this, owner, listener),
			None => Box::new(|| {}),
		}
	}
}

impl<T: Value> Listenable for BasicState<T> {
	fn listen(&self, owner: &dyn ReferenceHolder, listener: Rc<dyn Fn()>) -> Release {
		self.on_set_value(owner, Rc::new(move |_: &T| listener()))
	}
}

/// Legacy state whose value is pushed into it from the outside, owning
/// whatever pushes it.
///
/// Subscribers keep the whole derived state alive, and with it everything its
/// holder owns, so chains of derived states stay connected as long as their
/// last consumer does.
pub(crate) struct DerivedBasicState<T> {
	holder: Holder,
	state: Rc<BasicState<T>>,
	this: Weak<DerivedBasicState<T>>,
}

impl<T: Value> DerivedBasicState<T> {
	pub fn new(value: T) -> Rc<Self> {
		Rc::new_cyclic(|this| DerivedBasicState {
			holder: Holder::new(),
			state: BasicState::new(value),
			this: this.clone(),
		})
	}

	pub fn holder(&self) -> &Holder {
		&self.holder
	}

	pub fn state(&self) -> &Rc<BasicState<T>> {
		&self.state
	}
}

impl<T: Value> State<T> for DerivedBasicState<T> {
	fn get(&self, observer: &Observer) -> T {
		if let Some(this) = self.this.upgrade() {
			observer.observe_listenable(this);
		}
		self.state.get_untracked()
	}

	fn get_untracked(&self) -> T {
		self.state.get_untracked()
	}
}

impl<T: Value> OnSetValue<T> for DerivedBasicState<T> {
	fn on_set_value(&self, owner: &dyn ReferenceHolder, listener: Rc<dyn Fn(&T)>) -> Release {
		match self.this.upgrade() {
			Some(this) => self.state.subscribe(this, owner, listener),
			None => Box::new(|| {}),
		}
	}
}

impl<T: Value> Listenable for DerivedBasicState<T> {
	fn listen(&self, owner: &dyn ReferenceHolder, listener: Rc<dyn Fn()>) -> Release {
		self.on_set_value(owner, Rc::new(move |_: &T| listener()))
	}
}

use std::rc::Rc;

use crate::addr::RcAddr;
use crate::holder::{Disposer, Holder, ReferenceHolder};
use crate::{
	DelegatingMutableState, DelegatingState, MutableState, MutableStateRef, Observer, State,
	StateRef, Value,
};

/// A way of propagating changes through a graph of states.
///
/// Every implementation gives the same observable behavior for the graph
/// operations: effects see consistent values, a write that does not change a
/// value does not re-run anything downstream, and consumers are only kept
/// alive by their owners. They differ in how much of the graph they visit to
/// get there.
pub trait Engine {
	fn mutable_state<T: Value>(&self, value: T) -> MutableStateRef<T>;

	/// Derived state. The function is not called until the value is read.
	fn memo<T, F>(&self, func: F) -> StateRef<T>
	where
		T: Value,
		F: Fn(&Observer) -> T + 'static;

	/// Runs `func` now and again whenever anything it read changes.
	///
	/// The effect stays alive while `owner` holds onto it or while the
	/// returned [`Disposer`] is alive, whichever is longer, and stops for good
	/// once disposed.
	fn effect<F>(&self, owner: &dyn ReferenceHolder, func: F) -> Disposer
	where
		F: Fn(&Observer) + 'static;

	/// State that mirrors `state` until rebound to another one.
	fn state_delegating_to<T: Value>(&self, state: StateRef<T>) -> Rc<dyn DelegatingState<T>> {
		Rc::new(Delegating {
			target: self.mutable_state(RcAddr::new(state)),
		})
	}

	/// Like [`state_delegating_to`](Engine::state_delegating_to), writes go to
	/// whatever the state is currently bound to.
	fn mutable_state_delegating_to<T: Value>(
		&self,
		state: MutableStateRef<T>,
	) -> Rc<dyn DelegatingMutableState<T>> {
		Rc::new(DelegatingMutable {
			target: self.mutable_state(RcAddr::new(state)),
		})
	}

	/// State whose value is pushed by `builder` through the mutable state it
	/// is handed. Anything registered on the owner lives as long as the
	/// returned state.
	fn derived_state<T, B>(&self, initial: T, builder: B) -> StateRef<T>
	where
		T: Value,
		B: FnOnce(&dyn ReferenceHolder, &MutableStateRef<T>),
	{
		let holder = Holder::new();
		let state = self.mutable_state(initial);
		builder(&holder, &state);
		Rc::new(DerivedState {
			_holder: holder,
			state,
		})
	}
}

struct Delegating<T: Value> {
	target: MutableStateRef<RcAddr<dyn State<T>>>,
}

impl<T: Value> State<T> for Delegating<T> {
	fn get(&self, observer: &Observer) -> T {
		self.target.get(observer).get(observer)
	}

	fn get_untracked(&self) -> T {
		self.target.get_untracked().get_untracked()
	}
}

impl<T: Value> DelegatingState<T> for Delegating<T> {
	fn rebind(&self, state: StateRef<T>) {
		self.target.set(RcAddr::new(state));
	}
}

struct DelegatingMutable<T: Value> {
	target: MutableStateRef<RcAddr<dyn MutableState<T>>>,
}

impl<T: Value> State<T> for DelegatingMutable<T> {
	fn get(&self, observer: &Observer) -> T {
		self.target.get(observer).get(observer)
	}

	fn get_untracked(&self) -> T {
		self.target.get_untracked().get_untracked()
	}
}

impl<T: Value> MutableState<T> for DelegatingMutable<T> {
	fn set_with(&self, mapper: &mut dyn FnMut(&T) -> T) {
		self.target.get_untracked().set_with(mapper);
	}
}

impl<T: Value> DelegatingMutableState<T> for DelegatingMutable<T> {
	fn rebind(&self, state: MutableStateRef<T>) {
		self.target.set(RcAddr::new(state));
	}
}

struct DerivedState<T: Value> {
	_holder: Holder,
	state: MutableStateRef<T>,
}

impl<T: Value> State<T> for DerivedState<T> {
	fn get(&self, observer: &Observer) -> T {
		self.state.get(observer)
	}

	fn get_untracked(&self) -> T {
		self.state.get_untracked()
	}
}

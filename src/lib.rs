//! Incremental reactive state graph.
//!
//! Values live in [mutable states](mutable_state). [Memos](memo) derive new
//! values from them lazily, and [effects](effect) run side effects whenever
//! what they read changes. Reads inside a memo or effect go through the
//! [`Observer`] handed to it, which is how the graph learns its edges, so the
//! dependencies of a node are whatever it read during its last evaluation.
//!
//! ```
//! use stategraph::{effect, memo, mutable_state, Holder, MutableState, State};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let owner = Holder::new();
//! let count = mutable_state(1);
//! let double = memo({
//! 	let count = count.clone();
//! 	move |cx| count.get(cx) * 2
//! });
//!
//! let seen = Rc::new(Cell::new(0));
//! let _disposer = effect(&owner, {
//! 	let seen = seen.clone();
//! 	move |cx| seen.set(double.get(cx))
//! });
//!
//! count.set(5);
//! assert_eq!(seen.get(), 10);
//! ```
//!
//! The graph never keeps a consumer alive just because it observes
//! something. Effects stay alive through the [`ReferenceHolder`] they were
//! created with and through their [`Disposer`]. Cyclic dependencies are not
//! detected, a memo that reads itself recurses until the stack runs out.
//!
//! Everything is single threaded. Handles are `Rc` based, and the pending
//! update batch as well as the selected [`EngineKind`] are per thread.

#[doc(hidden)]
pub mod macros;

mod addr;
mod combinators;
mod config;
mod constant;
mod engine;
mod error;
mod graph;
mod holder;
mod legacy;
mod observer;
mod update;

use std::rc::Rc;

pub use combinators::{and, bimap, map, not, or, zip, zip_with};
pub use config::{EngineKind, ENGINE_ENV};
pub use constant::{state_of, Const};
pub use engine::Engine;
pub use error::{Error, Result};
pub use graph::{MarkThenPull, MarkThenPushAndPull};
pub use holder::{Disposer, Holder, ReferenceHolder, Release, WeakHolder};
pub use legacy::{BasicState, Legacy, OnSetValue};
pub use observer::Observer;

/// Readable state.
pub trait State<T>: 'static {
	/// Returns the current value and records this state as a dependency of
	/// whatever `observer` is evaluating.
	fn get(&self, observer: &Observer) -> T;

	/// Returns the current value without recording anything. Outdated
	/// derived values are still brought up to date first.
	fn get_untracked(&self) -> T;
}

pub trait MutableState<T>: State<T> {
	/// Replaces the value with `mapper(current)`. Nothing is notified if the
	/// result equals the current value.
	fn set_with(&self, mapper: &mut dyn FnMut(&T) -> T);

	fn set(&self, value: T)
	where
		T: Clone,
	{
		self.set_with(&mut |_| value.clone());
	}
}

/// State that forwards to another state which can be swapped out.
///
/// Anything observing the delegating state follows it across rebinds.
pub trait DelegatingState<T>: State<T> {
	fn rebind(&self, state: StateRef<T>);
}

pub trait DelegatingMutableState<T>: MutableState<T> {
	fn rebind(&self, state: MutableStateRef<T>);
}

pub type StateRef<T> = Rc<dyn State<T>>;
pub type MutableStateRef<T> = Rc<dyn MutableState<T>>;

/// Anything that can be stored in a state.
pub trait Value: Clone + PartialEq + 'static {}

impl<T: Clone + PartialEq + 'static> Value for T {}

pub fn mutable_state<T: Value>(value: T) -> MutableStateRef<T> {
	EngineKind::current().mutable_state(value)
}

/// Lazily evaluated derived state, see [`Engine::memo`].
pub fn memo<T, F>(func: F) -> StateRef<T>
where
	T: Value,
	F: Fn(&Observer) -> T + 'static,
{
	EngineKind::current().memo(func)
}

/// Side effect kept up to date with what it reads, see [`Engine::effect`].
pub fn effect<F>(owner: &dyn ReferenceHolder, func: F) -> Disposer
where
	F: Fn(&Observer) + 'static,
{
	EngineKind::current().effect(owner, func)
}

pub fn state_delegating_to<T: Value>(state: StateRef<T>) -> Rc<dyn DelegatingState<T>> {
	EngineKind::current().state_delegating_to(state)
}

pub fn mutable_state_delegating_to<T: Value>(
	state: MutableStateRef<T>,
) -> Rc<dyn DelegatingMutableState<T>> {
	EngineKind::current().mutable_state_delegating_to(state)
}

pub fn derived_state<T, B>(initial: T, builder: B) -> StateRef<T>
where
	T: Value,
	B: FnOnce(&dyn ReferenceHolder, &MutableStateRef<T>),
{
	EngineKind::current().derived_state(initial, builder)
}

//! Derived states built on [`memo`].

use std::rc::Rc;

use crate::{memo, MutableState, MutableStateRef, Observer, State, StateRef, Value};

pub fn map<T, R>(state: &StateRef<T>, func: impl Fn(T) -> R + 'static) -> StateRef<R>
where
	T: Value,
	R: Value,
{
	let state = state.clone();
	memo(move |cx| func(state.get(cx)))
}

pub fn zip<A, B>(a: &StateRef<A>, b: &StateRef<B>) -> StateRef<(A, B)>
where
	A: Value,
	B: Value,
{
	zip_with(a, b, |a, b| (a, b))
}

pub fn zip_with<A, B, R>(
	a: &StateRef<A>,
	b: &StateRef<B>,
	func: impl Fn(A, B) -> R + 'static,
) -> StateRef<R>
where
	A: Value,
	B: Value,
	R: Value,
{
	let (a, b) = (a.clone(), b.clone());
	memo(move |cx| func(a.get(cx), b.get(cx)))
}

/// Reads both sides, so switching either one re-evaluates.
pub fn and(a: &StateRef<bool>, b: &StateRef<bool>) -> StateRef<bool> {
	zip_with(a, b, |a, b| a && b)
}

pub fn or(a: &StateRef<bool>, b: &StateRef<bool>) -> StateRef<bool> {
	zip_with(a, b, |a, b| a || b)
}

pub fn not(state: &StateRef<bool>) -> StateRef<bool> {
	map(state, |value| !value)
}

/// Two-way mapping of a mutable state.
///
/// Reads go through `map`. Writes map the current value, apply the mapper and
/// store the result through `unmap`.
pub fn bimap<T, U>(
	state: &MutableStateRef<T>,
	map: impl Fn(T) -> U + 'static,
	unmap: impl Fn(U) -> T + 'static,
) -> MutableStateRef<U>
where
	T: Value,
	U: Value,
{
	let map: Rc<dyn Fn(T) -> U> = Rc::new(map);
	let mapped = memo({
		let state = state.clone();
		let map = map.clone();
		move |cx| map(state.get(cx))
	});

	Rc::new(Bimap {
		source: state.clone(),
		mapped,
		map,
		unmap: Box::new(unmap),
	})
}

struct Bimap<T, U> {
	source: MutableStateRef<T>,
	mapped: StateRef<U>,
	map: Rc<dyn Fn(T) -> U>,
	unmap: Box<dyn Fn(U) -> T>,
}

impl<T: Value, U: Value> State<U> for Bimap<T, U> {
	fn get(&self, observer: &Observer) -> U {
		self.mapped.get(observer)
	}

	fn get_untracked(&self) -> U {
		self.mapped.get_untracked()
	}
}

impl<T: Value, U: Value> MutableState<U> for Bimap<T, U> {
	fn set_with(&self, mapper: &mut dyn FnMut(&U) -> U) {
		self.source
			.set_with(&mut |value: &T| (self.unmap)(mapper(&(self.map)(value.clone()))));
	}
}

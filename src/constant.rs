use std::rc::Rc;

use crate::{Observer, State, StateRef, Value};

/// State that never changes. Reading it records nothing.
pub struct Const<T> {
	value: T,
}

impl<T: Value> Const<T> {
	pub fn new(value: T) -> Rc<Self> {
		Rc::new(Const { value })
	}
}

impl<T: Value> State<T> for Const<T> {
	fn get(&self, _: &Observer) -> T {
		self.value.clone()
	}

	fn get_untracked(&self) -> T {
		self.value.clone()
	}
}

/// Wraps a plain value into a [`State`], for APIs that take states.
pub fn state_of<T: Value>(value: T) -> StateRef<T> {
	Const::new(value)
}

use std::cell::Cell;
use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::graph::{MarkThenPull, MarkThenPushAndPull};
use crate::holder::{Disposer, ReferenceHolder};
use crate::legacy::Legacy;
use crate::{Engine, MutableStateRef, Observer, StateRef, Value};

/// Environment variable holding the default engine name for new threads.
pub const ENGINE_ENV: &str = "STATEGRAPH_ENGINE";

thread_local! {
	static CURRENT: Cell<EngineKind> = Cell::new(EngineKind::from_env_or_default());
}

/// Runtime choice between the available engines.
///
/// The free functions of this crate go through the engine selected for the
/// current thread. It starts out as whatever [`ENGINE_ENV`] names, or
/// [`EngineKind::MarkThenPushAndPull`] if it is unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EngineKind {
	MarkThenPull,
	#[default]
	MarkThenPushAndPull,
	Legacy,
}

impl EngineKind {
	pub const ALL: [EngineKind; 3] = [
		EngineKind::MarkThenPull,
		EngineKind::MarkThenPushAndPull,
		EngineKind::Legacy,
	];

	pub fn name(self) -> &'static str {
		match self {
			EngineKind::MarkThenPull => "mark-then-pull",
			EngineKind::MarkThenPushAndPull => "mark-then-push-and-pull",
			EngineKind::Legacy => "legacy",
		}
	}

	/// Engine used by the free functions on this thread.
	pub fn current() -> Self {
		CURRENT.with(Cell::get)
	}

	pub fn set_current(kind: Self) {
		CURRENT.with(|current| current.set(kind));
		debug!(engine = %kind, "engine selected");
	}

	/// Runs `func` with `self` as the current engine, restoring the previous
	/// one afterwards, also when `func` panics.
	pub fn scope<R>(self, func: impl FnOnce() -> R) -> R {
		let previous = CURRENT.with(|current| current.replace(self));
		let _restore = Restore(previous);
		func()
	}

	/// Engine named by [`ENGINE_ENV`], if it is set.
	pub fn from_env() -> Result<Option<Self>> {
		match std::env::var(ENGINE_ENV) {
			Ok(name) => name.parse().map(Some),
			Err(_) => Ok(None),
		}
	}

	fn from_env_or_default() -> Self {
		let kind = Self::resolve(Self::from_env());
		debug!(engine = %kind, "engine selected");
		kind
	}

	fn resolve(configured: Result<Option<Self>>) -> Self {
		match configured {
			Ok(kind) => kind.unwrap_or_default(),
			Err(error) => {
				warn!(%error, "ignoring {ENGINE_ENV}");
				Self::default()
			}
		}
	}
}

struct Restore(EngineKind);

impl Drop for Restore {
	fn drop(&mut self) {
		CURRENT.with(|current| current.set(self.0));
	}
}

impl FromStr for EngineKind {
	type Err = Error;

	fn from_str(name: &str) -> Result<Self> {
		match name.trim().to_ascii_lowercase().as_str() {
			"mark-then-pull" | "pull" => Ok(EngineKind::MarkThenPull),
			"mark-then-push-and-pull" | "push-pull" => Ok(EngineKind::MarkThenPushAndPull),
			"legacy" => Ok(EngineKind::Legacy),
			_ => Err(Error::UnknownEngine(name.to_string())),
		}
	}
}

impl fmt::Display for EngineKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

macro_rules! dispatch {
	($kind:expr, $engine:ident => $body:expr) => {
		match $kind {
			EngineKind::MarkThenPull => {
				let $engine = MarkThenPull;
				$body
			}
			EngineKind::MarkThenPushAndPull => {
				let $engine = MarkThenPushAndPull;
				$body
			}
			EngineKind::Legacy => {
				let $engine = Legacy;
				$body
			}
		}
	};
}

impl Engine for EngineKind {
	fn mutable_state<T: Value>(&self, value: T) -> MutableStateRef<T> {
		dispatch!(*self, engine => engine.mutable_state(value))
	}

	fn memo<T, F>(&self, func: F) -> StateRef<T>
	where
		T: Value,
		F: Fn(&Observer) -> T + 'static,
	{
		dispatch!(*self, engine => engine.memo(func))
	}

	fn effect<F>(&self, owner: &dyn ReferenceHolder, func: F) -> Disposer
	where
		F: Fn(&Observer) + 'static,
	{
		dispatch!(*self, engine => engine.effect(owner, func))
	}

	fn derived_state<T, B>(&self, initial: T, builder: B) -> StateRef<T>
	where
		T: Value,
		B: FnOnce(&dyn ReferenceHolder, &MutableStateRef<T>),
	{
		dispatch!(*self, engine => engine.derived_state(initial, builder))
	}
}

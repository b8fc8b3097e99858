//! Node graph engines.
//!
//! Both engines share one node implementation and propagate a write in two
//! steps. Marking walks everything downstream of the written state and flags
//! it as possibly outdated. Pulling then brings queued nodes up to date,
//! recursively updating whatever they depend on first and stopping wherever a
//! recomputed value turns out unchanged.
//!
//! [`MarkThenPull`] queues every possibly affected effect and is kept simple
//! on purpose, it is the reference the other engine is tested against.
//! [`MarkThenPushAndPull`] only queues nodes that are known to be outdated,
//! so sub-graphs whose inputs did not actually change are never visited. In
//! exchange it may recompute memos that nothing reads any more.

mod node;

use tracing::debug;

pub(crate) use node::{AnyNode, NodeState};
#[cfg(test)]
pub(crate) use node::Live;

use node::{Node, NodeKind, Propagation};

use crate::holder::{Disposer, ReferenceHolder};
use crate::{Engine, MutableStateRef, Observer, StateRef, Value};

/// Minimal mark-then-pull engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkThenPull;

/// Semi-lazy mark-then-push-and-pull engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkThenPushAndPull;

impl Engine for MarkThenPull {
	fn mutable_state<T: Value>(&self, value: T) -> MutableStateRef<T> {
		Node::mutable(Propagation::MarkThenPull, value)
	}

	fn memo<T, F>(&self, func: F) -> StateRef<T>
	where
		T: Value,
		F: Fn(&Observer) -> T + 'static,
	{
		Node::memo(Propagation::MarkThenPull, Box::new(func))
	}

	fn effect<F>(&self, owner: &dyn ReferenceHolder, func: F) -> Disposer
	where
		F: Fn(&Observer) + 'static,
	{
		effect(Propagation::MarkThenPull, owner, Box::new(func))
	}
}

impl Engine for MarkThenPushAndPull {
	fn mutable_state<T: Value>(&self, value: T) -> MutableStateRef<T> {
		Node::mutable(Propagation::MarkThenPushAndPull, value)
	}

	fn memo<T, F>(&self, func: F) -> StateRef<T>
	where
		T: Value,
		F: Fn(&Observer) -> T + 'static,
	{
		Node::memo(Propagation::MarkThenPushAndPull, Box::new(func))
	}

	fn effect<F>(&self, owner: &dyn ReferenceHolder, func: F) -> Disposer
	where
		F: Fn(&Observer) + 'static,
	{
		effect(Propagation::MarkThenPushAndPull, owner, Box::new(func))
	}
}

fn effect(
	propagation: Propagation,
	owner: &dyn ReferenceHolder,
	func: Box<dyn Fn(&Observer)>,
) -> Disposer {
	let node = Node::<()>::new(NodeKind::Effect, propagation, NodeState::Dirty, Some(func), Some(()));
	node.update();

	let release = owner.hold_onto(node.clone());
	Disposer::new(move || {
		node.cleanup();
		release();
		debug!(?propagation, "effect disposed");
	})
}

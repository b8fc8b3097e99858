use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use smallvec::SmallVec;
use tracing::trace;

use crate::addr::WeakAddr;
use crate::observer::{Observed, Observer};
use crate::update::Update;
use crate::{MutableState, State};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
	/// Leaf set directly by the caller. No dependencies, no function.
	Mutable,
	/// Lazily computed value. Any number of dependencies and dependents.
	Memo,
	/// Eagerly maintained root. Never has dependents.
	Effect,
}

/// Lifecycle of a node. Transitions through [`AnyNode::mark`] only ever move
/// forward in this order, [`Node::update`] is what brings a node back to
/// `Clean`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum NodeState {
	Clean,
	/// Some transitive dependency may have changed.
	ToBeChecked,
	/// The cached value is known to be outdated.
	Dirty,
	/// Disposed. Never updated again.
	Dead,
}

/// Queueing policy of a graph engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Propagation {
	/// Queue every effect that leaves `Clean` and let the pull phase sort
	/// out which of them actually changed.
	MarkThenPull,
	/// Queue every node that becomes `Dirty`, memos included, so sub-graphs
	/// whose inputs did not change are never visited.
	MarkThenPushAndPull,
}

pub(crate) type Live = SmallVec<[Rc<dyn AnyNode>; 4]>;

/// Type erased view of a [`Node`], used for the edges of the graph.
pub(crate) trait AnyNode: 'static {
	fn state(&self) -> NodeState;
	fn update(&self);
	fn mark(self: Rc<Self>, state: NodeState);
	fn live_dependents(&self) -> Live;
	fn add_dependent(&self, dependent: Weak<dyn AnyNode>);
	fn remove_dependent(&self, addr: *const ());
}

/// Marks `node` dirty and every node downstream of it as possibly dirty.
pub(crate) fn mark_dirty(node: Rc<dyn AnyNode>) {
	if node.state() >= NodeState::Dirty {
		return;
	}

	let mut pending: Vec<Rc<dyn AnyNode>> = node.live_dependents().into_iter().rev().collect();
	node.mark(NodeState::Dirty);

	// Pre-order walk, without recursion so long chains stay off the stack.
	while let Some(next) = pending.pop() {
		if next.state() != NodeState::Clean {
			continue;
		}
		pending.extend(next.live_dependents().into_iter().rev());
		next.mark(NodeState::ToBeChecked);
	}
}

/// Weak back-edges to the nodes that read this one.
///
/// Dead entries are skipped while iterating and compacted the next time an
/// edge is added, or once the list has doubled since the last compaction.
struct Dependents {
	list: Vec<WeakAddr<dyn AnyNode>>,
	stale: bool,
	sweep_at: usize,
}

const MIN_SWEEP: usize = 8;

impl Dependents {
	fn new() -> Self {
		Dependents {
			list: Vec::new(),
			stale: false,
			sweep_at: MIN_SWEEP,
		}
	}

	fn push(&mut self, dependent: Weak<dyn AnyNode>) {
		if self.stale || self.list.len() >= self.sweep_at {
			self.sweep();
		}
		self.list.push(WeakAddr::new(dependent));
	}

	fn remove(&mut self, addr: *const ()) {
		if let Some(index) = self.list.iter().position(|it| it.addr() == addr) {
			self.list.remove(index);
		}
	}

	fn live(&mut self) -> Live {
		let mut live = Live::new();
		for dependent in &self.list {
			match dependent.upgrade() {
				Some(dependent) => live.push(dependent),
				None => self.stale = true,
			}
		}
		live
	}

	fn sweep(&mut self) {
		let before = self.list.len();
		self.list.retain(|it| it.strong_count() > 0);
		self.stale = false;
		self.sweep_at = MIN_SWEEP.max(self.list.len() * 2);
		if before != self.list.len() {
			trace!(swept = before - self.list.len(), live = self.list.len(), "dependents");
		}
	}
}

pub(crate) struct Node<T> {
	kind: NodeKind,
	propagation: Propagation,
	state: Cell<NodeState>,
	func: Option<Box<dyn Fn(&Observer) -> T>>,
	value: RefCell<Option<T>>,
	dependencies: RefCell<Observed<dyn AnyNode>>,
	dependents: RefCell<Dependents>,
	this: Weak<Node<T>>,
}

impl<T> Node<T>
where
	T: Clone + PartialEq + 'static,
{
	pub fn new(
		kind: NodeKind,
		propagation: Propagation,
		state: NodeState,
		func: Option<Box<dyn Fn(&Observer) -> T>>,
		value: Option<T>,
	) -> Rc<Self> {
		debug_assert_eq!(kind == NodeKind::Mutable, func.is_none());
		Rc::new_cyclic(|this| Node {
			kind,
			propagation,
			state: Cell::new(state),
			func,
			value: RefCell::new(value),
			dependencies: RefCell::new(Observed::default()),
			dependents: RefCell::new(Dependents::new()),
			this: this.clone(),
		})
	}

	pub fn mutable(propagation: Propagation, value: T) -> Rc<Self> {
		Node::new(NodeKind::Mutable, propagation, NodeState::Clean, None, Some(value))
	}

	pub fn memo(propagation: Propagation, func: Box<dyn Fn(&Observer) -> T>) -> Rc<Self> {
		Node::new(NodeKind::Memo, propagation, NodeState::Dirty, Some(func), None)
	}

	#[cfg(test)]
	pub(crate) fn dependency_count(&self) -> usize {
		self.dependencies.borrow().len()
	}

	#[cfg(test)]
	pub(crate) fn dependent_count(&self) -> usize {
		self.dependents.borrow_mut().live().len()
	}

	fn recompute(&self) {
		let Some(func) = self.func.as_ref() else {
			unreachable!("only mutable nodes have no function, and those are never dirty");
		};

		let observer = Observer::new();
		let value = func(&observer);

		// An effect may dispose itself while it runs.
		if self.state.get() == NodeState::Dead {
			return;
		}

		self.reconcile(observer.take_nodes());

		let changed = self.value.borrow().as_ref() != Some(&value);
		if changed {
			*self.value.borrow_mut() = Some(value);
			for dependent in self.live_dependents() {
				dependent.mark(NodeState::Dirty);
			}
		}
	}

	/// Replaces the dependencies with what the last evaluation read and keeps
	/// the back-edges in sync.
	fn reconcile(&self, observed: Observed<dyn AnyNode>) {
		let addr = self.addr();
		let previous = std::mem::replace(&mut *self.dependencies.borrow_mut(), observed);

		let added: Live = {
			let current = self.dependencies.borrow();
			for dependency in previous.iter() {
				if !current.contains(dependency) {
					dependency.remove_dependent(addr);
				}
			}
			current
				.iter()
				.filter(|it| !previous.contains(*it))
				.map(|it| Rc::clone(&**it))
				.collect()
		};

		if !added.is_empty() {
			let this = self.this.clone() as Weak<dyn AnyNode>;
			for dependency in added {
				dependency.add_dependent(this.clone());
			}
		}

		// Dropping the old edges may drop whole upstream memos.
		drop(previous);
	}

	/// Kills the node and detaches it from everything it depends on.
	pub fn cleanup(&self) {
		let addr = self.addr();
		self.state.set(NodeState::Dead);
		let dependencies = std::mem::take(&mut *self.dependencies.borrow_mut());
		for dependency in dependencies.iter() {
			dependency.remove_dependent(addr);
		}
		drop(dependencies);
	}

	fn addr(&self) -> *const () {
		(self as *const Self).cast::<()>()
	}
}

impl<T> AnyNode for Node<T>
where
	T: Clone + PartialEq + 'static,
{
	fn state(&self) -> NodeState {
		self.state.get()
	}

	fn update(&self) {
		match self.state.get() {
			NodeState::Clean | NodeState::Dead => return,
			NodeState::ToBeChecked => {
				let dependencies: Live = self
					.dependencies
					.borrow()
					.iter()
					.map(|it| Rc::clone(&**it))
					.collect();
				for dependency in dependencies {
					dependency.update();
					if self.state.get() >= NodeState::Dirty {
						break;
					}
				}
			}
			NodeState::Dirty => {}
		}

		if self.state.get() == NodeState::Dirty {
			self.recompute();
		}

		if self.state.get() != NodeState::Dead {
			self.state.set(NodeState::Clean);
		}
	}

	fn mark(self: Rc<Self>, state: NodeState) {
		let previous = self.state.get();
		if previous >= state {
			return;
		}

		let queue = match self.propagation {
			Propagation::MarkThenPull => {
				self.kind == NodeKind::Effect && previous == NodeState::Clean
			}
			Propagation::MarkThenPushAndPull => state == NodeState::Dirty,
		};

		self.state.set(state);
		if queue {
			Update::queue(self);
		}
	}

	fn live_dependents(&self) -> Live {
		self.dependents.borrow_mut().live()
	}

	fn add_dependent(&self, dependent: Weak<dyn AnyNode>) {
		debug_assert_ne!(self.kind, NodeKind::Effect);
		self.dependents.borrow_mut().push(dependent);
	}

	fn remove_dependent(&self, addr: *const ()) {
		self.dependents.borrow_mut().remove(addr);
	}
}

impl<T> State<T> for Node<T>
where
	T: Clone + PartialEq + 'static,
{
	fn get(&self, observer: &Observer) -> T {
		if let Some(this) = self.this.upgrade() {
			observer.observe_node(this);
		}
		self.get_untracked()
	}

	fn get_untracked(&self) -> T {
		let state = self.state.get();
		if state != NodeState::Clean && state != NodeState::Dead {
			self.update();
		}
		match self.value.borrow().as_ref() {
			Some(value) => value.clone(),
			None => unreachable!("a memo holds a value once it has been updated"),
		}
	}
}

impl<T> MutableState<T> for Node<T>
where
	T: Clone + PartialEq + 'static,
{
	fn set_with(&self, mapper: &mut dyn FnMut(&T) -> T) {
		debug_assert_eq!(self.kind, NodeKind::Mutable, "only mutable states can be set");

		let current = self.get_untracked();
		let value = mapper(&current);
		if value == current {
			return;
		}

		*self.value.borrow_mut() = Some(value);
		for dependent in self.live_dependents() {
			mark_dirty(dependent);
		}
		Update::flush();
	}
}

impl<T> Drop for Node<T> {
	fn drop(&mut self) {
		let addr = (self as *const Self).cast::<()>();
		let dependencies = std::mem::take(self.dependencies.get_mut());
		for dependency in dependencies.iter() {
			dependency.remove_dependent(addr);
		}
	}
}

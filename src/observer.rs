use std::cell::RefCell;
use std::rc::Rc;

use fxhash::FxBuildHasher;
use indexmap::IndexSet;

use crate::addr::RcAddr;
use crate::graph::AnyNode;
use crate::legacy::Listenable;

pub(crate) type Observed<T> = IndexSet<RcAddr<T>, FxBuildHasher>;

/// Capture context handed to every memo and effect function.
///
/// Each evaluation gets its own `Observer`. Reading a state through
/// [`State::get`](crate::State::get) records that state here, and once the
/// evaluation returns the owning node rebuilds its dependencies from what was
/// recorded. Reads are kept in first-read order without duplicates.
pub struct Observer {
	inner: RefCell<ObserverInner>,
}

#[derive(Default)]
struct ObserverInner {
	nodes: Observed<dyn AnyNode>,
	listenables: Observed<dyn Listenable>,
}

impl Observer {
	pub(crate) fn new() -> Self {
		Observer {
			inner: RefCell::new(ObserverInner::default()),
		}
	}

	pub(crate) fn observe_node(&self, node: Rc<dyn AnyNode>) {
		self.inner.borrow_mut().nodes.insert(RcAddr::new(node));
	}

	pub(crate) fn observe_listenable(&self, listenable: Rc<dyn Listenable>) {
		self.inner
			.borrow_mut()
			.listenables
			.insert(RcAddr::new(listenable));
	}

	pub(crate) fn take_nodes(&self) -> Observed<dyn AnyNode> {
		std::mem::take(&mut self.inner.borrow_mut().nodes)
	}

	pub(crate) fn take_listenables(&self) -> Observed<dyn Listenable> {
		std::mem::take(&mut self.inner.borrow_mut().listenables)
	}
}

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::trace;

use crate::graph::AnyNode;

thread_local! {
	static UPDATE: Update = Update::new();
}

/// Per-thread batch of nodes waiting to be brought up to date.
///
/// Writes queue nodes while marking and then flush. A flush started while
/// another one is running returns immediately, the outer loop picks up
/// whatever got queued in the meantime.
pub(crate) struct Update {
	queue: RefCell<Vec<Rc<dyn AnyNode>>>,
	processing: Cell<bool>,
}

impl Update {
	fn new() -> Self {
		Update {
			queue: RefCell::new(Vec::new()),
			processing: Cell::new(false),
		}
	}

	pub fn queue(node: Rc<dyn AnyNode>) {
		UPDATE.with(|update| update.queue.borrow_mut().push(node));
	}

	pub fn flush() {
		UPDATE.with(Update::run);
	}

	#[cfg(test)]
	pub(crate) fn is_processing() -> bool {
		UPDATE.with(|update| update.processing.get())
	}

	#[cfg(test)]
	pub(crate) fn queued() -> usize {
		UPDATE.with(|update| update.queue.borrow().len())
	}

	fn run(&self) {
		if self.processing.get() || self.queue.borrow().is_empty() {
			return;
		}

		self.processing.set(true);
		let mut reset = Reset {
			update: self,
			processed: 0,
		};

		loop {
			let next = self.queue.borrow().get(reset.processed).cloned();
			let Some(node) = next else {
				break;
			};
			node.update();
			reset.processed += 1;
		}

		trace!(visited = reset.processed, "update flushed");
	}
}

/// Ends a flush, also when a node panicked. Only nodes that were brought up
/// to date leave the queue, the failing one and everything after it are
/// visited again by the next flush.
struct Reset<'a> {
	update: &'a Update,
	processed: usize,
}

impl Drop for Reset<'_> {
	fn drop(&mut self) {
		let processed: Vec<_> = self
			.update
			.queue
			.borrow_mut()
			.drain(..self.processed)
			.collect();
		self.update.processing.set(false);
		drop(processed);
	}
}

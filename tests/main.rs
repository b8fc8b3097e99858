use std::cell::{Cell, RefCell};
use std::rc::Rc;

use stategraph::{
	derived_state, effect, map, memo, mutable_state, mutable_state_delegating_to, state_delegating_to,
	state_of, zip, DelegatingMutableState, DelegatingState, Disposer, EngineKind, Holder, MutableState,
	MutableStateRef, State, StateRef,
};


use mock::Spy;

const GRAPH: [EngineKind; 2] = [EngineKind::MarkThenPull, EngineKind::MarkThenPushAndPull];

fn each_engine(engines: &[EngineKind], test: impl Fn(EngineKind)) {
	for &kind in engines {
		kind.scope(|| test(kind));
	}
}

fn recorder() -> (Rc<RefCell<Vec<i64>>>, impl Fn(i64) + Clone) {
	let log = Rc::new(RefCell::new(Vec::new()));
	let push = {
		let log = log.clone();
		move |value: i64| log.borrow_mut().push(value)
	};
	(log, push)
}

#[test]
fn memo_and_effect() {
	each_engine(&GRAPH, |_| {
		let owner = Holder::new();
		let a = mutable_state(10i64);
		assert_eq!(a.get_untracked(), 10);

		let b = memo!((a) cx => a.get(cx) + 10);
		assert_eq!(b.get_untracked(), 20);

		let mock = mock::SharedMock::new();
		mock.get().expect_trigger().times(1).return_const(());

		let _effect = effect!(&owner, (a, b, mock) cx => {
			mock.get().trigger(a.get(cx) + b.get(cx));
		});

		mock.get().checkpoint();

		mock.get().expect_trigger().withf(|value| *value == 50).times(1).return_const(());

		a.set(20);
		a.set(20);
		a.set(20);

		assert_eq!(b.get_untracked(), 30);

		mock.get().checkpoint();
	});
}

#[test]
fn equal_write_does_not_rerun_effects() {
	each_engine(&EngineKind::ALL, |_| {
		let owner = Holder::new();
		let a = mutable_state(1i64);

		let mock = mock::SharedMock::new();
		mock.get().expect_trigger().once().return_const(());

		let _effect = effect!(&owner, (a, mock) cx => {
			mock.get().trigger(a.get(cx));
		});

		mock.get().checkpoint();

		mock.get().expect_trigger().times(0).return_const(());

		a.set(1);
		a.set_with(&mut |value| *value);

		mock.get().checkpoint();
	});
}

#[test]
fn effects_see_consistent_values() {
	each_engine(&GRAPH, |kind| {
		let owner = Holder::new();
		let m = mutable_state(1i64);
		let a = memo!((m) cx => m.get(cx) * 2);
		let b = memo!((a, m) cx => a.get(cx) + m.get(cx));

		let seen = Rc::new(RefCell::new(Vec::new()));
		let _effect = effect!(&owner, (m, b, seen) cx => {
			seen.borrow_mut().push((m.get(cx), b.get(cx)));
		});

		for x in [2, 3, 7, -4] {
			m.set(x);
		}

		let seen = seen.borrow();
		assert_eq!(seen.len(), 5, "{kind}");
		for &(x, b) in seen.iter() {
			assert_eq!(b, x * 2 + x, "{kind}");
		}
	});
}

#[test]
fn memos_are_not_evaluated_until_read() {
	each_engine(&GRAPH, |_| {
		let calls = Rc::new(Cell::new(0));
		let source = mutable_state(1i64);
		let double = memo!((calls, source) cx => {
			calls.set(calls.get() + 1);
			source.get(cx) * 2
		});

		assert_eq!(calls.get(), 0);
		source.set(2);
		assert_eq!(calls.get(), 0);

		assert_eq!(double.get_untracked(), 4);
		assert_eq!(double.get_untracked(), 4);
		assert_eq!(calls.get(), 1);
	});
}

#[test]
fn pull_engine_leaves_unobserved_memos_alone() {
	EngineKind::MarkThenPull.scope(|| {
		let calls = Rc::new(Cell::new(0));
		let source = mutable_state(1i64);
		let double = memo!((calls, source) cx => {
			calls.set(calls.get() + 1);
			source.get(cx) * 2
		});
		assert_eq!(double.get_untracked(), 2);

		source.set(2);
		source.set(3);
		assert_eq!(calls.get(), 1);

		assert_eq!(double.get_untracked(), 6);
		assert_eq!(calls.get(), 2);
	});
}

#[test]
fn unchanged_memo_cuts_off_propagation() {
	each_engine(&EngineKind::ALL, |_| {
		let owner = Holder::new();
		let m = mutable_state(2i64);
		let even = memo!((m) cx => m.get(cx) % 2 == 0);

		let mock = mock::SharedMock::new();
		mock.get().expect_trigger().withf(|value| *value == 1).times(1).return_const(());

		let _effect = effect!(&owner, (even, mock) cx => {
			mock.get().trigger(even.get(cx) as i64);
		});

		m.set(4);
		m.set(6);
		mock.get().checkpoint();

		mock.get().expect_trigger().withf(|value| *value == 0).times(1).return_const(());
		m.set(7);
		mock.get().checkpoint();
	});
}

#[test]
fn dependencies_follow_the_branch_taken() {
	each_engine(&EngineKind::ALL, |kind| {
		let owner = Holder::new();
		let flag = mutable_state(true);
		let a = mutable_state(1i64);
		let b = mutable_state(100i64);
		let calls = Rc::new(Cell::new(0));

		let picked = memo!((flag, a, b, calls) cx => {
			calls.set(calls.get() + 1);
			if flag.get(cx) { a.get(cx) } else { b.get(cx) }
		});
		let (seen, push) = recorder();
		let _effect = effect!(&owner, (picked) cx => push(picked.get(cx)));
		let baseline = calls.get();

		b.set(101);
		assert_eq!(calls.get(), baseline, "{kind}: unread branch recomputed");

		flag.set(false);
		assert_eq!(calls.get(), baseline + 1, "{kind}");

		a.set(2);
		assert_eq!(calls.get(), baseline + 1, "{kind}: dropped branch recomputed");

		b.set(102);
		assert_eq!(calls.get(), baseline + 2, "{kind}");
		assert_eq!(*seen.borrow(), [1, 101, 102], "{kind}");
	});
}

#[test]
fn disposing_twice_is_harmless() {
	each_engine(&EngineKind::ALL, |_| {
		let owner = Holder::new();
		let source = mutable_state(0i64);
		let (seen, push) = recorder();

		let disposer = effect!(&owner, (source) cx => push(source.get(cx)));
		assert_eq!(owner.len(), 1);

		source.set(1);
		disposer.dispose();
		assert!(disposer.is_disposed());
		assert!(owner.is_empty());
		disposer.dispose();

		source.set(2);
		assert_eq!(*seen.borrow(), [0, 1]);
	});
}

#[test]
fn effect_may_dispose_itself() {
	each_engine(&EngineKind::ALL, |kind| {
		let owner = Holder::new();
		let source = mutable_state(0i64);
		let slot: Rc<RefCell<Option<Disposer>>> = Rc::new(RefCell::new(None));
		let (seen, push) = recorder();

		let disposer = effect!(&owner, (source, slot) cx => {
			let value = source.get(cx);
			push(value);
			if value >= 2 {
				if let Some(disposer) = slot.borrow().as_ref() {
					disposer.dispose();
				}
			}
		});
		*slot.borrow_mut() = Some(disposer);

		for value in 1..5 {
			source.set(value);
		}
		assert_eq!(*seen.borrow(), [0, 1, 2], "{kind}");
	});
}

#[test]
fn writes_from_effects_join_the_running_update() {
	each_engine(&EngineKind::ALL, |kind| {
		let owner = Holder::new();
		let a = mutable_state(0i64);
		let b = mutable_state(0i64);
		let (seen, push) = recorder();

		let _forward = effect!(&owner, (a, b) cx => b.set(a.get(cx) * 10));
		let _record = effect!(&owner, (b) cx => push(b.get(cx)));

		a.set(1);
		a.set(2);
		assert_eq!(*seen.borrow(), [0, 10, 20], "{kind}");
	});
}

#[test]
fn delegating_state_follows_rebinds() {
	each_engine(&EngineKind::ALL, |kind| {
		let owner = Holder::new();
		let first = mutable_state(1i64);
		let second = mutable_state(2i64);
		let delegating = state_delegating_to(first.clone());
		let (seen, push) = recorder();

		let _effect = effect!(&owner, (delegating) cx => push(delegating.get(cx)));

		delegating.rebind(second.clone());
		first.set(5);
		second.set(7);
		delegating.rebind(first.clone());
		delegating.rebind(first.clone());

		assert_eq!(*seen.borrow(), [1, 2, 7, 5], "{kind}");
	});
}

#[test]
fn delegating_mutable_state_writes_to_its_target() {
	each_engine(&EngineKind::ALL, |kind| {
		let first = mutable_state(1i64);
		let second = mutable_state(2i64);
		let delegating = mutable_state_delegating_to(first.clone());

		delegating.set(10);
		assert_eq!(first.get_untracked(), 10, "{kind}");

		delegating.rebind(second.clone());
		assert_eq!(delegating.get_untracked(), 2, "{kind}");
		delegating.set_with(&mut |value| value + 1);
		assert_eq!(second.get_untracked(), 3, "{kind}");
		assert_eq!(first.get_untracked(), 10, "{kind}");
	});
}

#[test]
fn derived_state_is_pushed_by_its_builder() {
	each_engine(&EngineKind::ALL, |kind| {
		let source = mutable_state(1i64);
		let tripled = derived_state(0i64, |owner, out| {
			let (source, out) = (source.clone(), out.clone());
			let _ = effect(owner, move |cx| out.set(source.get(cx) * 3));
		});
		assert_eq!(tripled.get_untracked(), 3, "{kind}");

		let owner = Holder::new();
		let (seen, push) = recorder();
		let _effect = effect!(&owner, (tripled) cx => push(tripled.get(cx)));

		source.set(2);
		assert_eq!(tripled.get_untracked(), 6, "{kind}");
		assert_eq!(*seen.borrow(), [3, 6], "{kind}");
	});
}

#[test]
fn constants_and_combinators() {
	each_engine(&EngineKind::ALL, |kind| {
		let owner = Holder::new();
		let offset = state_of(100i64);
		let source = mutable_state(1i64);
		let readable: StateRef<i64> = source.clone();

		let shifted = map(&readable, |value| value + 1);
		let pair = zip(&shifted, &offset);
		let (seen, push) = recorder();
		let _effect = effect!(&owner, (pair) cx => {
			let (shifted, offset) = pair.get(cx);
			push(shifted + offset);
		});

		source.set(5);
		assert_eq!(*seen.borrow(), [102, 106], "{kind}");
		assert_eq!(offset.get_untracked(), 100);
	});
}

#[test]
fn long_chain_settles() {
	each_engine(&EngineKind::ALL, |kind| {
		let owner = Holder::new();
		let source = mutable_state(0i64);
		let mut last: StateRef<i64> = source.clone();
		for _ in 0..200 {
			last = memo!((last) cx => last.get(cx) + 1);
		}

		let (seen, push) = recorder();
		let _effect = effect!(&owner, (last) cx => push(last.get(cx)));

		source.set(1);
		assert_eq!(*seen.borrow(), [200, 201], "{kind}");
	});
}

#[test]
fn many_effects_on_one_state() {
	each_engine(&EngineKind::ALL, |kind| {
		let owner = Holder::new();
		let source: MutableStateRef<i64> = mutable_state(0);
		let total = Rc::new(Cell::new(0i64));

		for _ in 0..10_000 {
			let _ = effect!(&owner, (source, total) cx => total.set(total.get() + source.get(cx)));
		}

		source.set(1);
		assert_eq!(total.get(), 10_000, "{kind}");

		owner.clear();
		source.set(2);
		assert_eq!(total.get(), 10_000, "{kind}");
	});
}

#[test]
fn effects_recover_after_a_panicking_effect() {
	each_engine(&EngineKind::ALL, |kind| {
		let owner = Holder::new();
		let m = mutable_state(0i64);
		let (failing_seen, failing_push) = recorder();
		let (seen, push) = recorder();

		let _failing = effect!(&owner, (m) cx => {
			let value = m.get(cx);
			if value == 1 {
				panic!("effect failed on {value}");
			}
			failing_push(value);
		});
		let _effect = effect!(&owner, (m) cx => push(m.get(cx)));

		let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| m.set(1)));
		assert!(result.is_err(), "{kind}");

		m.set(2);
		m.set(3);
		assert_eq!(*seen.borrow(), [0, 2, 3], "{kind}");
		assert_eq!(*failing_seen.borrow(), [0, 2, 3], "{kind}");
	});
}

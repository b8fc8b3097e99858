pub use enclose::enclose;

/// [`memo`](crate::memo) that clones the listed handles into the closure.
///
/// ```
/// use stategraph::{memo, mutable_state, State};
///
/// let count = mutable_state(2);
/// let double = memo!((count) cx => count.get(cx) * 2);
/// assert_eq!(double.get_untracked(), 4);
/// ```
#[macro_export]
macro_rules! memo {
	(( $($d_tt:tt)* ) $cx:ident => $($b:tt)*) => {
		$crate::memo($crate::macros::enclose!(($( $d_tt )*) move |$cx: &$crate::Observer| { $($b)* }))
	};
	($cx:ident => $($b:tt)*) => {
		$crate::memo(move |$cx: &$crate::Observer| { $($b)* })
	};
}

/// [`effect`](crate::effect) that clones the listed handles into the closure.
#[macro_export]
macro_rules! effect {
	($owner:expr, ( $($d_tt:tt)* ) $cx:ident => $($b:tt)*) => {
		$crate::effect($owner, $crate::macros::enclose!(($( $d_tt )*) move |$cx: &$crate::Observer| { $($b)* }))
	};
	($owner:expr, $cx:ident => $($b:tt)*) => {
		$crate::effect($owner, move |$cx: &$crate::Observer| { $($b)* })
	};
}

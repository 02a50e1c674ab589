//! Data-parallel fan-out on the rayon pool.
//!
//! Every iteration starts from the caller's snapshot as it was when the
//! fan-out began. Overrides an iteration enters are visible to that iteration
//! only, even when rayon runs several iterations on one thread.

use linktape_deps::current;
use rayon::prelude::*;

use crate::TaskClass;

/// Runs `f(0)..f(iterations)` in parallel and returns the results in index order.
pub fn concurrent_perform<R, F>(iterations: usize, f: F) -> Vec<R>
where
	F: Fn(usize) -> R + Send + Sync,
	R: Send,
{
	let baseline = current();
	tracing::trace!(worker_class = TaskClass::Parallel.as_str(), iterations, "worker.concurrent_perform");
	(0..iterations).into_par_iter().map(|index| baseline.run(|| f(index))).collect()
}

/// Maps `items` through `f` in parallel, preserving order.
pub fn par_map<T, R, F>(items: Vec<T>, f: F) -> Vec<R>
where
	T: Send,
	F: Fn(T) -> R + Send + Sync,
	R: Send,
{
	let baseline = current();
	tracing::trace!(worker_class = TaskClass::Parallel.as_str(), items = items.len(), "worker.par_map");
	items.into_par_iter().map(|item| baseline.run(|| f(item))).collect()
}

#[cfg(test)]
mod tests {
	use linktape_deps::{Overrides, dependency_key, read, with_overrides};
	use rstest::rstest;

	use super::*;

	dependency_key! {
		struct Factor: u64 = 1;
		struct Label: &'static str = "base";
	}

	#[test]
	fn iterations_are_isolated_from_each_other() {
		let results = concurrent_perform(64, |index| {
			let factor = index as u64 + 2;
			with_overrides(Overrides::new().with::<Factor>(factor), || {
				std::thread::yield_now();
				read::<Factor>() * 10
			})
			.unwrap()
		});

		let expected: Vec<u64> = (0..64).map(|index| (index + 2) * 10).collect();
		assert_eq!(results, expected);
		assert_eq!(read::<Factor>(), 1);
	}

	#[rstest]
	#[case(None)]
	#[case(Some("outer"))]
	fn iterations_start_from_caller_snapshot(#[case] label: Option<&'static str>) {
		let overrides = label.map_or_else(Overrides::new, |label| Overrides::new().with::<Label>(label));
		let seen = with_overrides(overrides, || concurrent_perform(8, |_| read::<Label>())).unwrap();
		assert!(seen.iter().all(|seen| *seen == label.unwrap_or("base")), "{seen:?}");
	}

	#[test]
	fn par_map_preserves_order() {
		let words = vec!["a", "bb", "ccc"];
		let lengths = with_overrides(Overrides::new().with::<Factor>(3), || {
			par_map(words, |word| word.len() as u64 * read::<Factor>())
		})
		.unwrap();
		assert_eq!(lengths, vec![3, 6, 9]);
	}
}

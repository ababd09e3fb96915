//! Ordered fan-out over scoped worker threads.

use std::num::NonZeroUsize;
use std::thread;

/// Below this many items the work runs on the calling thread.
const PARALLEL_THRESHOLD: usize = 256;

/// Applies `f` to every item, splitting the slice across worker threads.
///
/// Each worker owns one contiguous chunk and returns its results as a vector;
/// the vectors are concatenated in chunk order, so the output is positional
/// and never depends on completion order.
pub(crate) fn map_ordered<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let workers = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);

    if items.len() < PARALLEL_THRESHOLD || workers < 2 {
        return items.iter().map(&f).collect();
    }

    let chunk_size = items.len().div_ceil(workers);
    let f = &f;

    thread::scope(|scope| {
        let handles: Vec<_> = items
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move || chunk.iter().map(f).collect::<Vec<R>>()))
            .collect();

        let mut out = Vec::with_capacity(items.len());
        for handle in handles {
            match handle.join() {
                Ok(part) => out.extend(part),
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        out
    })
}

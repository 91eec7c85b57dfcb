//! Bounded-concurrency worker pool (§4.C, §5).
//!
//! Grounded on the teacher's flat-parallelism collector
//! (`commands::list::collect`), which flattens work into a single queue and
//! drives it through a Rayon thread pool rather than nested `par_iter`
//! calls. Mistletoe needs a pool sized *per command* (bounded by `J`), so
//! instead of reusing Rayon's global pool (as the teacher does for `wt
//! list`), each call builds its own `rayon::ThreadPool` of exactly `J`
//! threads and installs the fan-out on it — giving the hard concurrency
//! ceiling §5 requires without nested-parallelism hazards.

use std::sync::Mutex;

use rayon::prelude::*;

use crate::error::MistletoeError;

pub const MAX_JOBS: u32 = 128;

/// Resolve the effective job count per §4.C: explicit flag, else manifest
/// `jobs`, else 1; clamped to `[1, 128]`; forced to 1 (with a notice) when
/// `verbose` is set and the resolved value would otherwise exceed 1.
pub fn resolve_jobs(flag: Option<u32>, manifest_jobs: Option<u32>, verbose: bool) -> Result<usize, MistletoeError> {
    let requested = flag
        .filter(|&v| v > 0)
        .or_else(|| manifest_jobs.filter(|&v| v > 0))
        .unwrap_or(1);

    if requested == 0 || requested > MAX_JOBS {
        return Err(MistletoeError::FlagOutOfRange { flag: "jobs", value: requested.to_string() });
    }

    if verbose && requested > 1 {
        log::warn!("--verbose requires sequential execution; treating --jobs={requested} as 1");
        return Ok(1);
    }

    Ok(requested as usize)
}

/// Run `task` for every index in `0..n`, with at most `jobs` running
/// concurrently. Results are returned indexed by task index — execution
/// order is unconstrained, but the returned `Vec` always lines up with the
/// input order, so callers can re-sort by repository id deterministically
/// before rendering (§5 "Ordering guarantees").
///
/// Per-task failures are captured as `Err` in the slot, not propagated: a
/// failing task never stops the others from finishing (§4.C, §7).
pub fn run_indexed<T, F>(jobs: usize, n: usize, task: F) -> Vec<Result<T, MistletoeError>>
where
    T: Send,
    F: Fn(usize) -> Result<T, MistletoeError> + Sync,
{
    if n == 0 {
        return Vec::new();
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .expect("failed to build worker pool");

    let slots: Mutex<Vec<Option<Result<T, MistletoeError>>>> = Mutex::new((0..n).map(|_| None).collect());

    pool.install(|| {
        (0..n).into_par_iter().for_each(|i| {
            let outcome = task(i);
            slots.lock().expect("worker pool result lock poisoned")[i] = Some(outcome);
        });
    });

    slots
        .into_inner()
        .expect("worker pool result lock poisoned")
        .into_iter()
        .map(|slot| slot.expect("every index must be populated exactly once"))
        .collect()
}

/// Find the first fatal error by task index (§5, §7 "first-error wins").
pub fn first_error<T>(results: &[Result<T, MistletoeError>]) -> Option<&MistletoeError> {
    results.iter().find_map(|r| r.as_ref().err())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn resolves_flag_over_manifest_jobs() {
        assert_eq!(resolve_jobs(Some(4), Some(2), false).unwrap(), 4);
    }

    #[test]
    fn falls_back_to_manifest_jobs_then_one() {
        assert_eq!(resolve_jobs(None, Some(3), false).unwrap(), 3);
        assert_eq!(resolve_jobs(None, None, false).unwrap(), 1);
        assert_eq!(resolve_jobs(Some(0), None, false).unwrap(), 1);
    }

    #[test]
    fn rejects_out_of_range_jobs() {
        assert!(resolve_jobs(Some(129), None, false).is_err());
    }

    #[test]
    fn verbose_clamps_to_one() {
        assert_eq!(resolve_jobs(Some(8), None, true).unwrap(), 1);
    }

    #[test]
    fn worker_bound_never_exceeds_configured_jobs() {
        let in_flight = AtomicUsize::new(0);
        let max_seen = AtomicUsize::new(0);
        let results = run_indexed(3, 30, |_| {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            max_seen.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(5));
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok::<(), MistletoeError>(())
        });
        assert_eq!(results.len(), 30);
        assert!(max_seen.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn results_stay_index_aligned_regardless_of_completion_order() {
        let results = run_indexed(4, 8, |i| Ok::<usize, MistletoeError>(i));
        for (i, r) in results.into_iter().enumerate() {
            assert_eq!(r.unwrap(), i);
        }
    }

    #[test]
    fn a_failing_task_does_not_prevent_others_from_completing() {
        let results = run_indexed(2, 4, |i| {
            if i == 1 {
                Err(MistletoeError::UserAborted)
            } else {
                Ok(i)
            }
        });
        assert!(results[1].is_err());
        assert_eq!(results[0].as_ref().unwrap(), &0);
        assert_eq!(results[2].as_ref().unwrap(), &2);
        assert_eq!(results[3].as_ref().unwrap(), &3);
        assert!(first_error(&results).is_some());
    }
}

use crate::constants;

/// Number of worker threads to use when scanning or hashing `num_items`
/// files in parallel. Scales with file count between
/// `MIN_SCAN_WORKERS` and `MAX_SCAN_WORKERS`, and can be overridden with
/// the `STRATA_NUM_THREADS` environment variable.
pub fn num_threads_for_items(num_items: usize) -> usize {
    if let Ok(num_threads) = std::env::var("STRATA_NUM_THREADS") {
        if let Ok(num_threads) = num_threads.parse::<usize>() {
            return num_threads.max(1);
        }
    }

    let num_cpus = num_cpus::get();
    let upper = constants::MAX_SCAN_WORKERS.min(num_cpus);
    let workers = upper.max(constants::MIN_SCAN_WORKERS.min(num_cpus));

    if num_items == 0 {
        1
    } else {
        workers.min(num_items)
    }
}

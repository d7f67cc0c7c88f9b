// ============================================================================
// Component Dispatch
// Runs independent per-component work inline or on scoped threads
// ============================================================================

use crate::config::EngineConfig;
use crate::error::Result;
use tracing::trace;

/// Evaluate `work(k)` for every component `k`, in order.
///
/// Components run on crossbeam scoped threads once `samples` reaches the
/// configured threshold; results are identical either way. The first error
/// in component order wins.
pub(crate) fn map_components<T, F>(
    count: usize,
    samples: usize,
    config: &EngineConfig,
    work: F,
) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> Result<T> + Sync,
{
    if count < 2 || samples < config.parallel_threshold {
        return (0..count).map(&work).collect();
    }
    trace!(components = count, samples, "dispatching components to scoped threads");

    let work = &work;
    let results = crossbeam::scope(|scope| {
        let handles: Vec<_> = (0..count).map(|k| scope.spawn(move |_| work(k))).collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect::<Vec<_>>()
    })
    .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
    results.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UnitFieldError;

    #[test]
    fn test_inline_and_threaded_agree() {
        let inline = EngineConfig::new();
        let threaded = EngineConfig::new().with_parallel_threshold(1);
        let square = |k: usize| Ok((k * k) as f64);
        assert_eq!(
            map_components(5, 10, &inline, square).unwrap(),
            map_components(5, 10, &threaded, square).unwrap()
        );
    }

    #[test]
    fn test_first_error_wins() {
        let threaded = EngineConfig::new().with_parallel_threshold(1);
        let result: Result<Vec<usize>> = map_components(4, 10, &threaded, |k| {
            if k >= 2 {
                Err(UnitFieldError::shape(format!("component {k}")))
            } else {
                Ok(k)
            }
        });
        assert!(matches!(result, Err(UnitFieldError::ShapeMismatch(m)) if m == "component 2"));
    }
}

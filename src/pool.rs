//! Core specification pool implementation

use crate::assistant::Assistant;
use crate::config::PoolConfiguration;
use crate::metrics::{MetricsTracker, PoolMetrics};
use crate::pooled::{Pooled, Recycler, Shell};
use crate::recycle::Recycle;

use crossbeam::queue::SegQueue;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, trace, warn};

/// Thread-safe pool recycling values that satisfy a caller specification.
///
/// Released values wait in a FIFO value bag. An acquisition probes at most
/// `tolerance` of them, asking the assistant whether each fits the
/// specification; rejected candidates go back to the tail. When nothing
/// fits, `acquire` builds a new value through the assistant while
/// `try_acquire` reports absence. Empty handle shells are recycled in a
/// second, capped bag.
///
/// Cloning the pool is cheap and yields another reference to the same bags.
///
/// # Examples
///
/// ```
/// use esox_specpool::{DelegateAssistant, SpecPool};
///
/// let assistant = DelegateAssistant::builder()
///     .with_create(|len: &usize| Vec::<u8>::with_capacity(*len))
///     .with_acceptance(|buffer: &Vec<u8>, len: &usize, _| buffer.capacity() >= *len)
///     .build()
///     .unwrap();
/// let pool = SpecPool::new(assistant);
///
/// pool.release(Vec::with_capacity(1024));
///
/// let small = pool.try_acquire(&512).unwrap();
/// assert!(small.capacity() >= 1024);
/// assert!(pool.try_acquire(&512).is_none());
/// ```
pub struct SpecPool<S: ?Sized, T: Recycle, A: Assistant<S, T>> {
    inner: Arc<PoolInner<S, T, A>>,
}

struct PoolInner<S: ?Sized, T: Recycle, A: Assistant<S, T>> {
    assistant: A,
    values: SegQueue<Box<Shell<T>>>,
    shells: SegQueue<Box<Shell<T>>>,
    config: PoolConfiguration,
    metrics: MetricsTracker,
    live_handles: AtomicUsize,
    _spec: PhantomData<fn(&S)>,
}

impl<S, T, A> SpecPool<S, T, A>
where
    S: ?Sized + 'static,
    T: Recycle + Send + 'static,
    A: Assistant<S, T> + 'static,
{
    /// Create a pool with the default configuration
    pub fn new(assistant: A) -> Self {
        Self::with_configuration(assistant, PoolConfiguration::default())
    }

    /// Create a pool with an explicit configuration
    pub fn with_configuration(assistant: A, config: PoolConfiguration) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                assistant,
                values: SegQueue::new(),
                shells: SegQueue::new(),
                config,
                metrics: MetricsTracker::default(),
                live_handles: AtomicUsize::new(0),
                _spec: PhantomData,
            }),
        }
    }

    /// The assistant this pool consults
    pub fn assistant(&self) -> &A {
        &self.inner.assistant
    }

    /// The configuration this pool was built with
    pub fn configuration(&self) -> &PoolConfiguration {
        &self.inner.config
    }

    /// Get a handle for `spec`, building a value if no bagged one fits
    pub fn acquire(&self, spec: &S) -> Result<Pooled<T>, A::Error> {
        self.acquire_with_tolerance(spec, self.inner.config.default_tolerance)
    }

    /// Like [`acquire`](Self::acquire) with an explicit probe budget.
    ///
    /// At most `tolerance` candidates are dequeued before falling back to
    /// the assistant's `create`. A creation error is returned as is and
    /// leaves both bags untouched.
    pub fn acquire_with_tolerance(
        &self,
        spec: &S,
        tolerance: usize,
    ) -> Result<Pooled<T>, A::Error> {
        if let Some(handle) = self.try_acquire_with_tolerance(spec, tolerance) {
            return Ok(handle);
        }

        let value = self.inner.create(spec)?;
        let mut shell = self.inner.take_shell();
        shell.bind(value);
        Ok(self.activate(shell))
    }

    /// Get a handle for `spec` only if a bagged value fits
    pub fn try_acquire(&self, spec: &S) -> Option<Pooled<T>> {
        self.try_acquire_with_tolerance(spec, self.inner.config.default_tolerance)
    }

    /// Like [`try_acquire`](Self::try_acquire) with an explicit probe budget
    pub fn try_acquire_with_tolerance(&self, spec: &S, tolerance: usize) -> Option<Pooled<T>> {
        match self.inner.probe(spec, tolerance) {
            Some(mut shell) => {
                if let Some(value) = shell.value.as_mut() {
                    value.revive();
                }
                Some(self.activate(shell))
            }
            None => {
                self.inner.metrics.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Take a value for `spec` into caller ownership.
    ///
    /// A bagged value that fits is unwrapped and only its shell is
    /// recycled; otherwise a new value is built. Either way the value will
    /// not come back to the pool unless passed to [`release`](Self::release).
    pub fn acquire_value(&self, spec: &S) -> Result<T, A::Error> {
        self.acquire_value_with_tolerance(spec, self.inner.config.default_tolerance)
    }

    /// Like [`acquire_value`](Self::acquire_value) with an explicit probe budget
    pub fn acquire_value_with_tolerance(
        &self,
        spec: &S,
        tolerance: usize,
    ) -> Result<T, A::Error> {
        if let Some(value) = self.try_acquire_value_with_tolerance(spec, tolerance) {
            return Ok(value);
        }

        let value = self.inner.create(spec)?;
        self.inner.assistant.register_get(&value);
        Ok(value)
    }

    /// Take a bagged value for `spec` into caller ownership, if one fits
    pub fn try_acquire_value(&self, spec: &S) -> Option<T> {
        self.try_acquire_value_with_tolerance(spec, self.inner.config.default_tolerance)
    }

    /// Like [`try_acquire_value`](Self::try_acquire_value) with an explicit probe budget
    pub fn try_acquire_value_with_tolerance(&self, spec: &S, tolerance: usize) -> Option<T> {
        self.try_acquire_with_tolerance(spec, tolerance)
            .and_then(Pooled::into_inner)
    }

    /// Put a value into the value bag.
    ///
    /// Applies the value's `reset` hook (unless disabled in the
    /// configuration) and drains the bag right away if the assistant
    /// reports its watermark was reached.
    pub fn release(&self, value: T) {
        let mut shell = self.inner.take_shell();
        shell.bind(value);
        self.inner.enqueue(shell);
    }

    /// Drain the value bag, disposing every value in it.
    ///
    /// Returns the number of values disposed.
    pub fn clear(&self) -> usize {
        self.inner.clear()
    }

    /// Drop every empty shell kept for reuse
    pub fn clear_shells(&self) -> usize {
        self.inner.clear_shells()
    }

    /// Values currently waiting in the bag.
    ///
    /// A point-in-time reading that concurrent callers may already have
    /// invalidated.
    pub fn count(&self) -> usize {
        self.inner.values.len()
    }

    /// Empty shells currently waiting for reuse
    pub fn shell_count(&self) -> usize {
        self.inner.shells.len()
    }

    /// Handles handed out and not yet disposed or unwrapped
    pub fn live_handles(&self) -> usize {
        self.inner.live_handles.load(Ordering::Acquire)
    }

    /// Get pool metrics
    pub fn get_metrics(&self) -> PoolMetrics {
        self.inner.metrics.get_metrics(
            self.inner.values.len(),
            self.inner.shells.len(),
            self.live_handles(),
        )
    }

    /// Export metrics
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.get_metrics().export()
    }

    /// Export metrics in Prometheus format
    #[cfg(feature = "metrics")]
    pub fn export_metrics_prometheus(
        &self,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> crate::PoolResult<String> {
        crate::metrics::MetricsExporter::export_prometheus(&self.get_metrics(), pool_name, tags)
    }

    fn activate(&self, shell: Box<Shell<T>>) -> Pooled<T> {
        if let Some(value) = shell.value.as_ref() {
            self.inner.assistant.register_get(value);
        }
        self.inner.live_handles.fetch_add(1, Ordering::AcqRel);

        let home: Arc<dyn Recycler<T>> = self.inner.clone();
        Pooled::new(shell, home)
    }
}

/// Shell taken off the value bag while the assistant judges it.
///
/// Goes back to the tail when dropped, including during an unwind out of
/// `meets_expectation`, unless the shell was taken out first.
struct Candidate<'a, T> {
    bag: &'a SegQueue<Box<Shell<T>>>,
    shell: Option<Box<Shell<T>>>,
}

impl<T> Candidate<'_, T> {
    fn value(&self) -> Option<&T> {
        self.shell.as_ref().and_then(|shell| shell.value.as_ref())
    }
}

impl<T> Drop for Candidate<'_, T> {
    fn drop(&mut self) {
        if let Some(shell) = self.shell.take() {
            self.bag.push(shell);
        }
    }
}

impl<S, T, A> PoolInner<S, T, A>
where
    S: ?Sized,
    T: Recycle + Send,
    A: Assistant<S, T>,
{
    /// Scan up to `tolerance` bagged candidates for one the assistant
    /// accepts. The bag length read is racy; under contention the budget
    /// can only shrink, and an empty dequeue ends the scan.
    fn probe(&self, spec: &S, tolerance: usize) -> Option<Box<Shell<T>>> {
        let budget = tolerance.min(self.values.len());

        for remaining in (1..=budget).rev() {
            let shell = self.values.pop()?;
            self.metrics.probes.fetch_add(1, Ordering::Relaxed);

            if shell.value.is_none() {
                self.recycle_shell(shell);
                continue;
            }

            let mut candidate = Candidate {
                bag: &self.values,
                shell: Some(shell),
            };
            let accepted = candidate
                .value()
                .is_some_and(|value| self.assistant.meets_expectation(value, spec, remaining));
            if accepted {
                self.metrics.hits.fetch_add(1, Ordering::Relaxed);
                return candidate.shell.take();
            }

            trace!(remaining, "Candidate rejected, requeued at tail");
            self.metrics.rejected_probes.fetch_add(1, Ordering::Relaxed);
        }

        None
    }

    fn create(&self, spec: &S) -> Result<T, A::Error> {
        let value = self.assistant.create(spec)?;
        self.metrics.creations.fetch_add(1, Ordering::Relaxed);
        debug!(available = self.values.len(), "Built new value after probe miss");
        Ok(value)
    }

    fn take_shell(&self) -> Box<Shell<T>> {
        self.shells.pop().unwrap_or_else(Shell::empty)
    }

    fn enqueue(&self, mut shell: Box<Shell<T>>) {
        if shell.value.is_none() {
            self.recycle_shell(shell);
            return;
        }

        if let Some(value) = shell.value.as_mut() {
            if self.config.reset_on_release {
                value.reset();
            }
            self.assistant.register_return(value);
        }

        shell.temporary = true;
        shell.disposed = true;
        self.values.push(shell);
        self.metrics.returns.fetch_add(1, Ordering::Relaxed);

        if self.assistant.is_clear() {
            debug!("Clear watermark reached after release");
            self.clear();
        }
    }

    fn clear(&self) -> usize {
        let mut disposed = 0;
        while let Some(mut shell) = self.values.pop() {
            if let Some(value) = shell.value.take() {
                value.dispose();
                disposed += 1;
            }
        }

        self.assistant.register_clear(disposed);
        self.metrics.clears.fetch_add(1, Ordering::Relaxed);
        self.metrics.disposed.fetch_add(disposed, Ordering::Relaxed);
        debug!(disposed, "Value bag cleared");
        disposed
    }

    fn clear_shells(&self) -> usize {
        let mut discarded = 0;
        while self.shells.pop().is_some() {
            discarded += 1;
        }

        self.metrics.shells_discarded.fetch_add(discarded, Ordering::Relaxed);
        debug!(discarded, "Shell bag flushed");
        discarded
    }
}

impl<S, T, A> Recycler<T> for PoolInner<S, T, A>
where
    S: ?Sized,
    T: Recycle + Send,
    A: Assistant<S, T>,
{
    fn give_back(&self, shell: Box<Shell<T>>) {
        self.enqueue(shell);
    }

    fn recycle_shell(&self, mut shell: Box<Shell<T>>) {
        shell.value = None;
        shell.temporary = true;
        shell.disposed = true;
        self.shells.push(shell);
        self.metrics.shells_recycled.fetch_add(1, Ordering::Relaxed);

        if self.shells.len() > self.config.max_shells {
            self.clear_shells();
        }
    }

    fn handle_closed(&self) {
        self.live_handles.fetch_sub(1, Ordering::AcqRel);
    }
}

impl<S: ?Sized, T: Recycle, A: Assistant<S, T>> Drop for SpecPool<S, T, A> {
    fn drop(&mut self) {
        // only outstanding handles still own the shared state
        let live = self.inner.live_handles.load(Ordering::Acquire);
        if live > 0 && Arc::strong_count(&self.inner) == live + 1 {
            warn!(live, "Last pool reference dropped with handles outstanding");
        }
    }
}

impl<S: ?Sized, T: Recycle, A: Assistant<S, T>> Drop for PoolInner<S, T, A> {
    fn drop(&mut self) {
        let mut disposed = 0;
        while let Some(mut shell) = self.values.pop() {
            if let Some(value) = shell.value.take() {
                value.dispose();
                disposed += 1;
            }
        }
        if disposed > 0 {
            debug!(disposed, "Disposed bagged values on pool drop");
        }
    }
}

impl<S: ?Sized, T: Recycle, A: Assistant<S, T>> Clone for SpecPool<S, T, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, T, A> std::fmt::Debug for SpecPool<S, T, A>
where
    S: ?Sized,
    T: Recycle,
    A: Assistant<S, T> + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecPool")
            .field("assistant", &self.inner.assistant)
            .field("available_values", &self.inner.values.len())
            .field("available_shells", &self.inner.shells.len())
            .field("live_handles", &self.inner.live_handles.load(Ordering::Relaxed))
            .finish()
    }
}

//! Policy contract consulted by the pool, and a closure driven default

use crate::errors::{PoolError, PoolResult};

use std::convert::Infallible;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Idle values tolerated before [`DelegateAssistant::is_clear`] asks for a flush.
pub const DEFAULT_CLEAR_WATERMARK: usize = 256;

/// Strategy deciding how values are built, matched and flushed.
///
/// The pool never interprets a specification `S` itself; every judgement
/// about whether a value fits goes through `meets_expectation`. The pool
/// calls these methods without any synchronization of its own, so the
/// accounting hooks must be safe under concurrent use.
pub trait Assistant<S: ?Sized, T>: Send + Sync {
    /// Error raised by `create`, handed to the acquirer unmodified.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Build a fresh value satisfying `spec`.
    fn create(&self, spec: &S) -> Result<T, Self::Error>;

    /// Whether a bagged `value` may serve `spec`.
    ///
    /// `remaining_tolerance` counts down to 1 over a single probe run,
    /// which lets an implementation relax its criteria as the budget
    /// runs out. Must not touch pool state.
    fn meets_expectation(&self, value: &T, spec: &S, remaining_tolerance: usize) -> bool;

    /// Called on every successful acquisition.
    fn register_get(&self, value: &T);

    /// Called on every release into the value bag.
    fn register_return(&self, value: &T);

    /// Whether the pool should drain its value bag right after a release.
    fn is_clear(&self) -> bool;

    /// Called once the pool has drained its value bag.
    ///
    /// `drained` is the number of values taken out by this drain. Values
    /// released concurrently may still be bagged and remain counted.
    fn register_clear(&self, _drained: usize) {}
}

type CreateFn<S, T, E> = Box<dyn Fn(&S) -> Result<T, E> + Send + Sync>;
type AcceptFn<S, T> = Box<dyn Fn(&T, &S, usize) -> bool + Send + Sync>;

/// Assistant assembled from caller supplied closures.
///
/// Keeps a single idle counter: releases raise it, acquisitions lower it
/// (never below zero). Once it reaches the watermark, `is_clear` reports
/// true until the pool flushes.
///
/// # Examples
///
/// ```
/// use esox_specpool::{Assistant, DelegateAssistant};
///
/// let assistant = DelegateAssistant::builder()
///     .with_create(|len: &usize| vec![0u8; *len])
///     .with_acceptance(|buffer: &Vec<u8>, len: &usize, _| buffer.capacity() >= *len)
///     .with_watermark(2)
///     .build()
///     .unwrap();
///
/// let buffer = assistant.create(&16).unwrap();
/// assert!(assistant.meets_expectation(&buffer, &8, 1));
/// assert!(!assistant.meets_expectation(&buffer, &64, 1));
/// ```
pub struct DelegateAssistant<S: ?Sized, T, E = Infallible> {
    create: CreateFn<S, T, E>,
    accept: Option<AcceptFn<S, T>>,
    watermark: usize,
    idle: AtomicUsize,
}

impl<S: ?Sized, T> DelegateAssistant<S, T, Infallible> {
    /// Start building an assistant.
    pub fn builder() -> DelegateAssistantBuilder<S, T, Infallible> {
        DelegateAssistantBuilder {
            create: None,
            accept: None,
            watermark: DEFAULT_CLEAR_WATERMARK,
        }
    }
}

impl<S: ?Sized, T, E> DelegateAssistant<S, T, E> {
    /// Current idle count driving the watermark.
    pub fn idle(&self) -> usize {
        self.idle.load(Ordering::Acquire)
    }

    /// Configured watermark.
    pub fn watermark(&self) -> usize {
        self.watermark
    }
}

impl<S, T, E> Assistant<S, T> for DelegateAssistant<S, T, E>
where
    S: ?Sized,
    E: std::error::Error + Send + Sync + 'static,
{
    type Error = E;

    fn create(&self, spec: &S) -> Result<T, E> {
        (self.create)(spec)
    }

    fn meets_expectation(&self, value: &T, spec: &S, remaining_tolerance: usize) -> bool {
        match &self.accept {
            Some(accept) => accept(value, spec, remaining_tolerance),
            None => true,
        }
    }

    fn register_get(&self, _value: &T) {
        let _ = self
            .idle
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |idle| {
                Some(idle.saturating_sub(1))
            });
    }

    fn register_return(&self, _value: &T) {
        let _ = self
            .idle
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |idle| {
                Some(idle.saturating_add(1))
            });
    }

    fn is_clear(&self) -> bool {
        self.idle.load(Ordering::Acquire) >= self.watermark
    }

    fn register_clear(&self, drained: usize) {
        let _ = self
            .idle
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |idle| {
                Some(idle.saturating_sub(drained))
            });
    }
}

impl<S: ?Sized, T, E> fmt::Debug for DelegateAssistant<S, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegateAssistant")
            .field("has_acceptance", &self.accept.is_some())
            .field("watermark", &self.watermark)
            .field("idle", &self.idle())
            .finish()
    }
}

/// Builder for [`DelegateAssistant`].
pub struct DelegateAssistantBuilder<S: ?Sized, T, E = Infallible> {
    create: Option<CreateFn<S, T, E>>,
    accept: Option<AcceptFn<S, T>>,
    watermark: usize,
}

impl<S: ?Sized + 'static, T: 'static, E: 'static> DelegateAssistantBuilder<S, T, E> {
    /// Use an infallible constructor.
    pub fn with_create<F>(mut self, create: F) -> Self
    where
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        self.create = Some(Box::new(move |spec| Ok(create(spec))));
        self
    }

    /// Use a constructor that can fail. Its error type becomes the
    /// assistant's error type.
    pub fn with_try_create<E2, F>(self, create: F) -> DelegateAssistantBuilder<S, T, E2>
    where
        F: Fn(&S) -> Result<T, E2> + Send + Sync + 'static,
    {
        DelegateAssistantBuilder {
            create: Some(Box::new(create)),
            accept: self.accept,
            watermark: self.watermark,
        }
    }

    /// Set the acceptance test. Without one every bagged value matches.
    pub fn with_acceptance<F>(mut self, accept: F) -> Self
    where
        F: Fn(&T, &S, usize) -> bool + Send + Sync + 'static,
    {
        self.accept = Some(Box::new(accept));
        self
    }

    /// Set the idle count at which the pool is told to flush.
    pub fn with_watermark(mut self, watermark: usize) -> Self {
        self.watermark = watermark;
        self
    }

    /// Never ask the pool to flush.
    pub fn without_watermark(self) -> Self {
        self.with_watermark(usize::MAX)
    }

    /// Finish the assistant.
    ///
    /// Fails with [`PoolError::MissingCreateStrategy`] when no constructor
    /// was supplied.
    pub fn build(self) -> PoolResult<DelegateAssistant<S, T, E>> {
        let create = self.create.ok_or(PoolError::MissingCreateStrategy)?;
        Ok(DelegateAssistant {
            create,
            accept: self.accept,
            watermark: self.watermark,
            idle: AtomicUsize::new(0),
        })
    }
}

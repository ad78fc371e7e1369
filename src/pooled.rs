//! Handles binding a pooled value to its return-on-dispose behaviour

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Heap slot a value lives in while it is bagged or handed out.
///
/// Shells outlive the values they carry: once a value leaves for good the
/// empty shell goes to the shell bag and is bound again on a later miss.
pub(crate) struct Shell<T> {
    pub(crate) value: Option<T>,
    pub(crate) temporary: bool,
    pub(crate) disposed: bool,
}

impl<T> Shell<T> {
    pub(crate) fn empty() -> Box<Self> {
        Box::new(Self {
            value: None,
            temporary: true,
            disposed: true,
        })
    }

    pub(crate) fn bind(&mut self, value: T) {
        self.value = Some(value);
        self.temporary = true;
    }
}

/// The pool side of a handle: where shells go when the handle lets go.
pub(crate) trait Recycler<T>: Send + Sync {
    /// Put a bound shell back into the value bag.
    fn give_back(&self, shell: Box<Shell<T>>);

    /// Drop whatever the shell still binds and keep the shell for reuse.
    fn recycle_shell(&self, shell: Box<Shell<T>>);

    /// A live handle stopped being live.
    fn handle_closed(&self);
}

/// A value checked out of a [`SpecPool`](crate::SpecPool).
///
/// While the handle is in temporary-use mode (the default), disposing it
/// returns the value to the pool. `Drop` disposes, so the value goes back
/// on every exit path, unwinding included. [`Pooled::into_inner`] switches
/// to caller-owned mode and hands the value out for good.
///
/// # Examples
///
/// ```
/// use esox_specpool::{DelegateAssistant, SpecPool};
///
/// let assistant = DelegateAssistant::builder()
///     .with_create(|len: &usize| vec![0u8; *len])
///     .build()
///     .unwrap();
/// let pool = SpecPool::new(assistant);
///
/// {
///     let buffer = pool.acquire(&32).unwrap();
///     assert_eq!(buffer.len(), 32);
/// }
/// assert_eq!(pool.count(), 1);
///
/// let owned = pool.acquire(&32).unwrap().into_inner().unwrap();
/// assert_eq!(pool.count(), 0);
/// drop(owned);
/// ```
pub struct Pooled<T> {
    shell: Option<Box<Shell<T>>>,
    home: Arc<dyn Recycler<T>>,
}

impl<T> Pooled<T> {
    pub(crate) fn new(mut shell: Box<Shell<T>>, home: Arc<dyn Recycler<T>>) -> Self {
        shell.disposed = false;
        Self {
            shell: Some(shell),
            home,
        }
    }

    /// Whether disposing this handle returns the value to the pool.
    pub fn is_temporary(&self) -> bool {
        self.shell.as_ref().is_some_and(|shell| shell.temporary)
    }

    /// Whether the handle has already let go of its value.
    pub fn is_disposed(&self) -> bool {
        self.shell.as_ref().is_none_or(|shell| shell.disposed)
    }

    /// Let go of the value. Calling this more than once is a no-op.
    pub fn dispose(&mut self) {
        let Some(mut shell) = self.shell.take() else {
            return;
        };
        shell.disposed = true;
        self.home.handle_closed();

        if shell.temporary && shell.value.is_some() {
            self.home.give_back(shell);
        } else {
            self.home.recycle_shell(shell);
        }
    }

    /// Take ownership of the value. It will not return to the pool.
    ///
    /// Only the shell is recycled. Returns `None` if the handle was
    /// already disposed.
    pub fn into_inner(mut self) -> Option<T> {
        let mut shell = self.shell.take()?;
        shell.temporary = false;
        shell.disposed = true;
        let value = shell.value.take();

        self.home.handle_closed();
        self.home.recycle_shell(shell);
        value
    }
}

impl<T> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.shell
            .as_ref()
            .and_then(|shell| shell.value.as_ref())
            .expect("Pooled value used after dispose")
    }
}

impl<T> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.shell
            .as_mut()
            .and_then(|shell| shell.value.as_mut())
            .expect("Pooled value used after dispose")
    }
}

impl<T> Drop for Pooled<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T: fmt::Debug> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("value", &self.shell.as_ref().and_then(|shell| shell.value.as_ref()))
            .field("temporary", &self.is_temporary())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

//! Optional capabilities a pooled value can expose

use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

/// Hooks the pool applies to values as they move in and out of the bag.
///
/// Every method has a no-op default, so a type opts in with an empty
/// `impl Recycle for MyType {}` and only overrides what it supports.
///
/// # Examples
///
/// ```
/// use esox_specpool::Recycle;
///
/// struct Scratch(Vec<u8>);
///
/// impl Recycle for Scratch {
///     fn reset(&mut self) {
///         self.0.clear();
///     }
/// }
///
/// let mut scratch = Scratch(vec![1, 2, 3]);
/// scratch.reset();
/// assert!(scratch.0.is_empty());
/// ```
pub trait Recycle {
    /// Return the value to a clean state before it enters the value bag.
    fn reset(&mut self) {}

    /// Applied when a bagged value is handed out again.
    fn revive(&mut self) {}

    /// Release whatever the value holds. Called once per value by
    /// [`SpecPool::clear`](crate::SpecPool::clear).
    fn dispose(self)
    where
        Self: Sized,
    {
    }
}

impl<T> Recycle for Vec<T> {
    fn reset(&mut self) {
        self.clear();
    }
}

impl<T> Recycle for VecDeque<T> {
    fn reset(&mut self) {
        self.clear();
    }
}

impl Recycle for String {
    fn reset(&mut self) {
        self.clear();
    }
}

macro_rules! inert_recycle {
    ($($ty:ty),* $(,)?) => {
        $(impl Recycle for $ty {})*
    };
}

inert_recycle!(
    (),
    bool,
    char,
    f32,
    f64,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    &'static str,
);

// Shared handles are left alone; the last owner releases the target.
impl<T: ?Sized> Recycle for Arc<T> {}

impl<T: ?Sized> Recycle for Rc<T> {}

impl<T: Recycle> Recycle for Box<T> {
    fn reset(&mut self) {
        (**self).reset();
    }

    fn revive(&mut self) {
        (**self).revive();
    }

    fn dispose(self) {
        (*self).dispose();
    }
}

impl<T: Recycle> Recycle for Option<T> {
    fn reset(&mut self) {
        if let Some(value) = self {
            value.reset();
        }
    }

    fn revive(&mut self) {
        if let Some(value) = self {
            value.revive();
        }
    }

    fn dispose(self) {
        if let Some(value) = self {
            value.dispose();
        }
    }
}

macro_rules! tuple_recycle {
    ($(($($name:ident $idx:tt),+)),* $(,)?) => {
        $(
            impl<$($name: Recycle),+> Recycle for ($($name,)+) {
                fn reset(&mut self) {
                    $(self.$idx.reset();)+
                }

                fn revive(&mut self) {
                    $(self.$idx.revive();)+
                }

                fn dispose(self) {
                    $(self.$idx.dispose();)+
                }
            }
        )*
    };
}

tuple_recycle!(
    (A 0),
    (A 0, B 1),
    (A 0, B 1, C 2),
    (A 0, B 1, C 2, D 3),
);

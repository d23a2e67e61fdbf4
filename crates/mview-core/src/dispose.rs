#![forbid(unsafe_code)]

//! Explicit teardown for representations leaving a view.
//!
//! A representation can leave a [`ModelBacked`](crate::backed::ModelBacked)
//! three ways: it is replaced by a newer one, the model is cleared, or it
//! arrives after being superseded. All three paths call [`Dispose::dispose`]
//! exactly once, so representations that hold GPU handles, file handles or
//! pooled buffers can release them deterministically instead of relying on
//! whichever thread happens to drop the value last.

use std::sync::Arc;

/// Teardown hook for representations.
///
/// The default implementation simply drops the value.
pub trait Dispose {
    /// Release any resources held by the representation.
    fn dispose(self)
    where
        Self: Sized,
    {
    }
}

impl Dispose for () {}

impl<T: Dispose> Dispose for Box<T> {
    fn dispose(self) {
        (*self).dispose();
    }
}

/// Disposing a shared handle releases this reference only.
impl<T: ?Sized> Dispose for Arc<T> {}

impl<T: Dispose> Dispose for Option<T> {
    fn dispose(self) {
        if let Some(inner) = self {
            inner.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counted(Arc<AtomicUsize>);

    impl Dispose for Counted {
        fn dispose(self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn boxed_dispose_reaches_inner() {
        let hits = Arc::new(AtomicUsize::new(0));
        Box::new(Counted(hits.clone())).dispose();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn option_dispose_skips_none() {
        let hits = Arc::new(AtomicUsize::new(0));
        None::<Counted>.dispose();
        Some(Counted(hits.clone())).dispose();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dispose_releases_reference() {
        let shared = Arc::new(5_u32);
        let handle = Arc::clone(&shared);
        handle.dispose();
        assert_eq!(Arc::strong_count(&shared), 1);
    }
}

use std::future::Future;
use std::pin::Pin;

use crate::Result;

/// Boxed future returned by a work unit.
pub type WorkFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// One unit of work run inside the lock-guarded region.
///
/// An `Err` marks a failed iteration; the caller logs it and keeps going.
pub trait WorkUnit: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Execute one unit of work.
    fn execute(&self) -> WorkFuture<'_>;
}

/// Work unit backed by a closure.
pub struct FnWorkUnit<F> {
    name: String,
    f: F,
}

impl<F, Fut> FnWorkUnit<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F, Fut> WorkUnit for FnWorkUnit<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self) -> WorkFuture<'_> {
        Box::pin((self.f)())
    }
}

//! Scoped context fields.
//!
//! Every execution context owns a stack of immutable field frames. A frame
//! is pushed by [`enter`] and popped when the returned [`ScopeGuard`] is
//! dropped, on every exit path including panics. Records snapshot the
//! merged view of the stack when they are created.
//!
//! The stack lives in a thread-local slot. Async tasks get their own stack
//! by wrapping the future in a [`ContextFuture`]: the task's stack is
//! swapped into the slot for the duration of each poll, so tasks sharing a
//! worker thread never observe each other's frames.

use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::error::ScopeError;
use crate::record::Fields;

static NEXT_FRAME_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

#[derive(Debug, Clone)]
struct Frame {
    id: u64,
    fields: Arc<Fields>,
}

impl Frame {
    fn new(fields: Fields) -> Self {
        Frame {
            id: NEXT_FRAME_ID.fetch_add(1, Ordering::Relaxed),
            fields: Arc::new(fields),
        }
    }
}

/// Handle for an entered scope. Dropping it exits the scope.
///
/// Guards are tied to the execution context that created them and are
/// therefore neither `Send` nor `Sync`.
///
/// A guard held across an `.await` keeps its frame on the stack of the
/// whole task. Concurrent branches of one task (`join!`, `select!`) share
/// that stack, so each branch that enters scopes across `.await` points
/// must be wrapped with [`LogContextExt::in_log_context`] or
/// [`LogContextExt::in_current_log_context`]. Otherwise the branches see
/// each other's fields, and exiting in a different order than they
/// entered panics.
#[must_use = "the scope is exited as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ScopeGuard {
    id: u64,
    _not_send: PhantomData<*const ()>,
}

impl ScopeGuard {
    /// Identifier of the frame this guard owns.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Exit the scope explicitly. Equivalent to dropping the guard.
    pub fn exit(self) {
        drop(self)
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if let Err(err) = pop_frame(self.id) {
            // A second panic while unwinding would abort the process.
            if !std::thread::panicking() {
                panic!("{}", err);
            }
        }
    }
}

/// Push `fields` as a new innermost frame of the current execution context.
///
/// Do not hold the guard across `.await` in a branch that runs
/// concurrently with others in the same task unless that branch has its
/// own stack; see [`ScopeGuard`].
pub fn enter(fields: Fields) -> ScopeGuard {
    let frame = Frame::new(fields);
    let id = frame.id;
    CONTEXT_STACK.with(|stack| stack.borrow_mut().push(frame));
    ScopeGuard {
        id,
        _not_send: PhantomData,
    }
}

/// Run `f` inside a scope carrying `fields`.
pub fn scope<R>(fields: Fields, f: impl FnOnce() -> R) -> R {
    let _guard = enter(fields);
    f()
}

fn pop_frame(id: u64) -> Result<(), ScopeError> {
    let popped = CONTEXT_STACK.try_with(|stack| {
        let mut stack = stack.borrow_mut();
        match stack.last() {
            Some(top) if top.id == id => {
                stack.pop();
                Ok(())
            }
            Some(top) => {
                let innermost = top.id;
                match stack.iter().position(|f| f.id == id) {
                    Some(pos) => {
                        stack.remove(pos);
                        Err(ScopeError::OutOfOrder { exiting: id, innermost })
                    }
                    None => Err(ScopeError::NotActive(id)),
                }
            }
            None => Err(ScopeError::NotActive(id)),
        }
    });
    // The slot is already gone during thread teardown; nothing to restore.
    popped.unwrap_or(Ok(()))
}

/// Merged view of all active frames, outer to inner, inner keys winning.
pub fn current_fields() -> Fields {
    CONTEXT_STACK
        .try_with(|stack| {
            let stack = stack.borrow();
            let mut merged = Fields::new();
            for frame in stack.iter() {
                merged.extend(frame.fields.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            merged
        })
        .unwrap_or_default()
}

/// Number of active frames in the current execution context.
pub fn depth() -> usize {
    CONTEXT_STACK.try_with(|stack| stack.borrow().len()).unwrap_or(0)
}

fn snapshot() -> Vec<Frame> {
    CONTEXT_STACK
        .try_with(|stack| stack.borrow().clone())
        .unwrap_or_default()
}

/// Swaps a task-owned stack into the thread-local slot and back on drop.
struct Installed<'a> {
    stack: &'a mut Vec<Frame>,
}

impl<'a> Installed<'a> {
    fn new(stack: &'a mut Vec<Frame>) -> Self {
        CONTEXT_STACK.with(|slot| std::mem::swap(&mut *slot.borrow_mut(), stack));
        Installed { stack }
    }
}

impl Drop for Installed<'_> {
    fn drop(&mut self) {
        let _ = CONTEXT_STACK.try_with(|slot| std::mem::swap(&mut *slot.borrow_mut(), self.stack));
    }
}

/// Future that runs with its own context stack.
///
/// Created through [`LogContextExt`].
pub struct ContextFuture<F> {
    inner: Option<Pin<Box<F>>>,
    stack: Vec<Frame>,
}

impl<F: Future> Future for ContextFuture<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let _installed = Installed::new(&mut this.stack);
        match this.inner.as_mut() {
            Some(inner) => inner.as_mut().poll(cx),
            None => panic!("ContextFuture polled after completion"),
        }
    }
}

impl<F> Drop for ContextFuture<F> {
    fn drop(&mut self) {
        // Guards held inside the future pop from the task stack, so the
        // stack has to be installed while the future is torn down.
        if let Some(inner) = self.inner.take() {
            let _installed = Installed::new(&mut self.stack);
            drop(inner);
        }
    }
}

/// Extension methods attaching a context stack to a future.
pub trait LogContextExt: Future + Sized {
    /// Run the future with the caller's current frames plus `fields`.
    fn in_log_context(self, fields: Fields) -> ContextFuture<Self> {
        let mut stack = snapshot();
        stack.push(Frame::new(fields));
        ContextFuture {
            inner: Some(Box::pin(self)),
            stack,
        }
    }

    /// Run the future with a snapshot of the caller's current frames.
    fn in_current_log_context(self) -> ContextFuture<Self> {
        ContextFuture {
            inner: Some(Box::pin(self)),
            stack: snapshot(),
        }
    }
}

impl<F: Future> LogContextExt for F {}

/// Spawn a tokio task that inherits the caller's context frames.
#[cfg(feature = "tokio")]
pub fn spawn<F>(future: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(future.in_current_log_context())
}

/// Build a [`Fields`] map from `key => value` pairs.
///
/// Values go through [`field_value`](crate::record::field_value), so
/// anything `Serialize + Debug` is accepted.
#[macro_export]
macro_rules! fields {
    () => { $crate::record::Fields::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut fields = $crate::record::Fields::new();
        $( fields.insert(::std::string::String::from($key), $crate::record::field_value(&$value)); )+
        fields
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields;
    use serde_json::json;

    #[test]
    fn nested_scopes_merge_and_restore() {
        let outer = enter(fields! { "a" => 1 });
        assert_eq!(current_fields(), fields! { "a" => 1 });

        let inner = enter(fields! { "a" => 2, "b" => 3 });
        assert_eq!(current_fields(), fields! { "a" => 2, "b" => 3 });
        assert_eq!(depth(), 2);

        inner.exit();
        assert_eq!(current_fields(), fields! { "a" => 1 });

        drop(outer);
        assert!(current_fields().is_empty());
        assert_eq!(depth(), 0);
    }

    #[test]
    fn scope_is_released_on_early_return() {
        fn lookup(fail: bool) -> Result<usize, String> {
            let _guard = enter(fields! { "step" => "lookup" });
            if fail {
                return Err("nope".into());
            }
            Ok(depth())
        }

        assert_eq!(lookup(false), Ok(1));
        assert!(lookup(true).is_err());
        assert_eq!(depth(), 0);
    }

    #[test]
    fn scope_is_released_when_the_block_panics() {
        let result = std::panic::catch_unwind(|| {
            scope(fields! { "request_id" => "abc" }, || {
                assert_eq!(current_fields()["request_id"], json!("abc"));
                panic!("boom");
            })
        });

        assert!(result.is_err());
        assert_eq!(depth(), 0);
    }

    #[test]
    #[should_panic(expected = "still active")]
    fn exiting_an_outer_scope_first_panics() {
        let outer = enter(fields! { "a" => 1 });
        let _inner = enter(fields! { "b" => 2 });
        outer.exit();
    }

    #[test]
    fn out_of_order_exit_still_removes_the_frame() {
        let outer = enter(fields! { "a" => 1 });
        let inner = enter(fields! { "b" => 2 });
        assert_ne!(outer.id(), inner.id());
        let expected = ScopeError::OutOfOrder {
            exiting: outer.id(),
            innermost: inner.id(),
        }
        .to_string();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| outer.exit()));
        let payload = result.unwrap_err();
        let message = payload
            .downcast_ref::<String>()
            .cloned()
            .unwrap_or_default();
        assert_eq!(message, expected);
        assert_eq!(current_fields(), fields! { "b" => 2 });
        inner.exit();
        assert_eq!(depth(), 0);
    }

    #[test]
    fn threads_have_independent_stacks() {
        let _guard = enter(fields! { "req" => "main" });

        let seen = std::thread::spawn(|| {
            let before = current_fields();
            let _guard = enter(fields! { "req" => "worker" });
            (before, current_fields())
        })
        .join()
        .unwrap();

        assert!(seen.0.is_empty());
        assert_eq!(seen.1, fields! { "req" => "worker" });
        assert_eq!(current_fields(), fields! { "req" => "main" });
    }

    #[tokio::test(flavor = "current_thread")]
    async fn tasks_sharing_a_thread_are_isolated() {
        async fn observe() -> Vec<Fields> {
            let mut seen = Vec::new();
            for _ in 0..3 {
                seen.push(current_fields());
                tokio::task::yield_now().await;
            }
            seen
        }

        let a = tokio::spawn(observe().in_log_context(fields! { "req" => "A" }));
        let b = tokio::spawn(observe().in_log_context(fields! { "req" => "B" }));

        for fields in a.await.unwrap() {
            assert_eq!(fields, fields! { "req" => "A" });
        }
        for fields in b.await.unwrap() {
            assert_eq!(fields, fields! { "req" => "B" });
        }
        assert_eq!(depth(), 0);
    }

    #[cfg(feature = "tokio")]
    #[tokio::test(flavor = "current_thread")]
    async fn spawned_tasks_inherit_the_callers_frames() {
        let guard = enter(fields! { "tenant" => "acme" });
        let handle = spawn(async { current_fields() });
        guard.exit();

        assert_eq!(handle.await.unwrap(), fields! { "tenant" => "acme" });
    }

    #[test]
    fn dropping_a_context_future_leaves_the_thread_stack_untouched() {
        let outer = enter(fields! { "a" => 1 });
        let fut = async {
            let _guard = enter(fields! { "b" => 2 });
            std::future::pending::<()>().await;
        }
        .in_log_context(fields! { "c" => 3 });

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let timed_out = rt.block_on(async {
            tokio::time::timeout(std::time::Duration::from_millis(10), fut).await
        });

        assert!(timed_out.is_err());
        assert_eq!(current_fields(), fields! { "a" => 1 });
        outer.exit();
    }
}

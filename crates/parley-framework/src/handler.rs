//! Handler system for the Parley framework.
//!
//! Handlers are plain async functions or closures whose parameters implement
//! [`FromContext`], in the style of Axum:
//!
//! ```rust,ignore
//! async fn greet(conv: Conversation, arg: CommandArg) -> Outcome {
//!     if arg.is_empty() {
//!         return Outcome::reject("Who should I greet?");
//!     }
//!     conv.send(&format!("Hello, {}!", &*arg)).await.ok();
//!     Outcome::Continue
//! }
//! ```
//!
//! If any parameter cannot be extracted the handler is skipped and the chain
//! moves on.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::FutureExt;
use tracing::debug;

use crate::context::ParleyContext;
use crate::extractor::FromContext;
use crate::outcome::{HandlerResult, IntoOutcome, Outcome};

/// A type alias for a boxed, pinned future that is `Send`.
pub type BoxFuture<'a, T> = futures::future::BoxFuture<'a, T>;

// ============================================================================
// Handler Trait
// ============================================================================

/// The core trait for event handlers.
///
/// Implemented for async functions that take up to 12 [`FromContext`]
/// parameters and return anything implementing [`IntoOutcome`].
pub trait Handler<T>: Clone + Send + Sync + 'static {
    /// Call the handler with the given context.
    fn call(self, ctx: Arc<ParleyContext>) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut, R> Handler<()> for F
where
    F: FnOnce() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome,
{
    fn call(self, _ctx: Arc<ParleyContext>) -> BoxFuture<'static, HandlerResult> {
        async move { (self)().await.into_outcome() }.boxed()
    }
}

macro_rules! impl_handler {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case)]
        impl<F, Fut, R, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = R> + Send + 'static,
            R: IntoOutcome,
            $( $ty: FromContext + Send + 'static, )*
        {
            fn call(self, ctx: Arc<ParleyContext>) -> BoxFuture<'static, HandlerResult> {
                async move {
                    $(
                        let $ty = match $ty::from_context(&ctx) {
                            Ok(value) => value,
                            Err(err) => {
                                debug!(
                                    parameter = std::any::type_name::<$ty>(),
                                    error = %err,
                                    "Handler parameter unavailable, skipping"
                                );
                                return Ok(Outcome::Skip);
                            }
                        };
                    )*

                    (self)($($ty,)*).await.into_outcome()
                }
                .boxed()
            }
        }
    };
}

impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12);

// ============================================================================
// Type Erasure
// ============================================================================

/// Wraps a [`Handler`] so it can be stored behind [`ErasedHandler`].
pub struct HandlerFn<F, T> {
    f: F,
    _marker: PhantomData<fn() -> T>,
}

impl<F, T> HandlerFn<F, T> {
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<F: Clone, T> Clone for HandlerFn<F, T> {
    fn clone(&self) -> Self {
        Self::new(self.f.clone())
    }
}

/// Type-erased handler trait for dynamic dispatch.
pub trait ErasedHandler: Send + Sync {
    /// Execute the handler with the given context.
    fn call(&self, ctx: Arc<ParleyContext>) -> BoxFuture<'static, HandlerResult>;

    /// A name for logs.
    fn name(&self) -> &'static str;
}

impl<F, T> ErasedHandler for HandlerFn<F, T>
where
    F: Handler<T>,
    T: 'static,
{
    fn call(&self, ctx: Arc<ParleyContext>) -> BoxFuture<'static, HandlerResult> {
        self.f.clone().call(ctx)
    }

    fn name(&self) -> &'static str {
        std::any::type_name::<F>()
    }
}

/// A type-erased handler that can be stored in collections.
pub type BoxedHandler = Arc<dyn ErasedHandler>;

/// Convert a handler function into a boxed handler.
pub fn into_handler<F, T>(f: F) -> BoxedHandler
where
    F: Handler<T>,
    T: 'static,
{
    Arc::new(HandlerFn::new(f))
}

//! Request pipeline stages and the primitive that chains them.
//!
//! A stage is any function from a handler to a handler. [`compose`] chains
//! two of them; the outer stage sees the request first and the response
//! last. Stages may change the handler type, e.g. [`crate::webhook::into_http`]
//! turns a webhook handler into an HTTP route.

pub mod auth;
pub mod proxy;
pub mod timeout;

pub use auth::{require_token, token_matches};
pub use proxy::{ClientAddr, proxy_headers};
pub use timeout::timeout;

/// `compose(outer, inner)(x) == outer(inner(x))`.
pub fn compose<A, B, C>(outer: impl Fn(B) -> C, inner: impl Fn(A) -> B) -> impl Fn(A) -> C {
    move |a| outer(inner(a))
}

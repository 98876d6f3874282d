//! Capability links: signed, time-bounded tokens and the clock they are
//! checked against.

pub mod clock;
pub mod token;

pub use clock::{Clock, SystemClock};
pub use token::{TokenCodec, TokenError};

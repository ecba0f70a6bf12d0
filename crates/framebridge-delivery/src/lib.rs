//! Delivery with retry semantics.
//!
//! - **RetryPolicy**: attempt-count and delay state machine over a typed
//!   [`AttemptOutcome`] inspected explicitly by the loop (no
//!   exception-driven retry)
//! - **Dispatcher**: runs the retry loop over a [`Transport`] collaborator;
//!   actual socket I/O lives outside this workspace

pub mod dispatch;
pub mod error;
pub mod retry;

pub use dispatch::{DeliveryReceipt, Dispatcher, Transport, TransportReceipt};
pub use error::DeliveryError;
pub use retry::{AttemptOutcome, RetryPolicy, RetryState};

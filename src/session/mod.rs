//! Scanner session lifecycle.
//!
//! A [`ScannerSession`] owns the backend handle and dispatches the three
//! scan strategies. Results carry timestamps from a per-session
//! [`MonotonicClock`].

mod clock;
mod scanner_session;

pub use clock::MonotonicClock;
pub use scanner_session::ScannerSession;

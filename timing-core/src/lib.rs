// Shared race timing logic: formatting, lap ledger, lifecycle, validation and stream decoding.

pub mod backoff;
pub mod format;
pub mod ledger;
pub mod lifecycle;
pub mod model;
pub mod session;
pub mod sse;
pub mod validation;

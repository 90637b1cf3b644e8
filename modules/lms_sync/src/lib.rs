// === PUBLIC CONTRACT ===
// Platform capability trait and the resource models it exchanges
pub mod contract;

pub use contract::{client, error, model};

// === MODULE DEFINITION ===
pub mod module;
pub use module::LmsSync;

// === INTERNAL MODULES ===
// Exposed for the server binary and integration tests.
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;

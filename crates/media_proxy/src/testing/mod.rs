//! An in-memory engine for exercising the proxies.
//!
//! [FakeEngine] keeps native reference counts for everything it creates, counts attribute fetches, and lets a test
//! drive notifications from any thread, so tests can check that proxies fetch exactly as often as they should and give
//! back exactly the references they took.
mod fake_engine;

pub use fake_engine::*;

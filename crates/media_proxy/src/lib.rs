//! Proxies over a native media engine.
//!
//! Every proxy here stands in for one reference-counted native object: a [Media] which can be played, a [MediaList]
//! of them, a [MediaPlayer], and a [RendererDiscoverer] with the [RendererItem]s it finds.  Proxies are cheap to clone
//! (cloning retains the native object) and release it when the last clone drops.  Notifications from the engine
//! arrive on its own threads and reach listeners through a [DeliveryContext] of the application's choosing.
//!
//! The engine itself is behind the [native::NativeEngine] trait.  [testing::FakeEngine] is an in-memory
//! implementation for tests.
mod config;
mod engine;
mod error;
mod media;
mod media_info;
mod media_list;
pub mod native;
mod player;
mod renderer;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::*;
pub use engine::*;
pub use error::*;
pub use media::*;
pub use media_info::*;
pub use media_list::*;
pub use player::*;
pub use renderer::*;

pub use resource_proxy::{
    inline, DeliveryContext, DeliveryQueue, Inline, Listener, NativeId, RawEvent,
};

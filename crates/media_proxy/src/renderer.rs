use std::convert::Infallible;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use ahash::AHashMap;
use resource_proxy::{
    DeliveryContext, EventHub, HandleRef, Lease, Listener, NativeId, RawEvent, Resource,
};

use crate::engine::Engine;
use crate::error::{check, Result};

/// A kind of renderer discovery the engine offers.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct RendererService {
    pub name: String,
    pub long_name: String,
}

/// What a renderer can do.  Combine with `|`.
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq, derive_more::BitOr)]
pub struct RendererFlags(u32);

impl RendererFlags {
    pub const NONE: RendererFlags = RendererFlags(0);
    pub const CAN_AUDIO: RendererFlags = RendererFlags(0x0001);
    pub const CAN_VIDEO: RendererFlags = RendererFlags(0x0002);

    pub fn contains(self, other: RendererFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

/// A renderer as the engine describes it.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct RendererInfo {
    pub name: String,
    pub kind: String,
    pub icon_url: Option<String>,
    pub flags: RendererFlags,
}

/// Names look like `Living-Room-TV-1a2b`; people want to see `Living Room TV`.
fn display_name(name: &str) -> String {
    match name.rfind('-') {
        Some(i) => name[..i].replace('-', " "),
        None => name.to_string(),
    }
}

pub(crate) struct RendererItemCore {
    engine: Engine,
    info: RendererInfo,
    display_name: String,
    reference: i64,
    hub: EventHub<(), Infallible>,
}

impl Resource for RendererItemCore {
    type State = ();
    type Event = Infallible;

    fn hub(&self) -> &EventHub<(), Infallible> {
        &self.hub
    }

    fn on_raw_event(&self, _: NativeId, _: &mut (), _: &RawEvent) -> Option<Infallible> {
        None
    }

    fn teardown(&self, native: NativeId) {
        self.engine.native().renderer_item_release(native);
    }
}

/// A device media can be sent to, as found by a [RendererDiscoverer].
///
/// Two items are the same renderer when the engine gave them the same reference, whatever their descriptions say.
#[derive(Clone)]
pub struct RendererItem {
    inner: HandleRef<RendererItemCore>,
}

impl RendererItem {
    fn hold(engine: &Engine, discoverer: NativeId, reference: i64) -> Option<RendererItem> {
        let Some((native, info)) = engine.native().renderer_item_hold(discoverer, reference) else {
            log::debug!(
                "Renderer {} of {:?} vanished before it could be held",
                reference,
                discoverer
            );
            return None;
        };

        let core = RendererItemCore {
            engine: engine.clone(),
            display_name: display_name(&info.name),
            info,
            reference,
            hub: EventHub::new(()),
        };
        Some(RendererItem {
            inner: HandleRef::new(native, core),
        })
    }

    fn core(&self) -> &RendererItemCore {
        self.inner.resource()
    }

    pub fn name(&self) -> &str {
        &self.core().info.name
    }

    pub fn display_name(&self) -> &str {
        &self.core().display_name
    }

    pub fn kind(&self) -> &str {
        &self.core().info.kind
    }

    pub fn icon_url(&self) -> Option<&str> {
        self.core().info.icon_url.as_deref()
    }

    pub fn flags(&self) -> RendererFlags {
        self.core().info.flags
    }

    pub fn can_audio(&self) -> bool {
        self.flags().contains(RendererFlags::CAN_AUDIO)
    }

    pub fn can_video(&self) -> bool {
        self.flags().contains(RendererFlags::CAN_VIDEO)
    }

    /// The engine's identity for this renderer.
    pub fn reference(&self) -> i64 {
        self.core().reference
    }

    pub fn is_released(&self) -> bool {
        !self.inner.is_alive()
    }

    pub fn release(self) {
        self.inner.release();
    }
}

impl PartialEq for RendererItem {
    fn eq(&self, other: &RendererItem) -> bool {
        self.reference() == other.reference()
    }
}

impl Eq for RendererItem {}

impl Hash for RendererItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.reference().hash(state);
    }
}

impl std::fmt::Debug for RendererItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererItem")
            .field("name", &self.name())
            .field("reference", &self.reference())
            .field("handle", &self.inner)
            .finish()
    }
}

/// Notifications about a [RendererDiscoverer].
#[derive(Clone, Debug, PartialEq)]
pub enum RendererEvent {
    ItemAdded { item: RendererItem },
    ItemDeleted { item: RendererItem },
}

impl RendererEvent {
    pub const ITEM_ADDED: i32 = 0x502;
    pub const ITEM_DELETED: i32 = 0x503;
}

pub(crate) struct DiscovererCore {
    engine: Engine,
    hub: EventHub<AHashMap<i64, RendererItem>, RendererEvent>,
}

impl Resource for DiscovererCore {
    type State = AHashMap<i64, RendererItem>;
    type Event = RendererEvent;

    fn hub(&self) -> &EventHub<AHashMap<i64, RendererItem>, RendererEvent> {
        &self.hub
    }

    fn on_raw_event(
        &self,
        native: NativeId,
        index: &mut AHashMap<i64, RendererItem>,
        event: &RawEvent,
    ) -> Option<RendererEvent> {
        let reference = event.arg1;
        match event.kind {
            RendererEvent::ITEM_ADDED => {
                let item = RendererItem::hold(&self.engine, native, reference)?;
                if let Some(replaced) = index.insert(reference, item.clone()) {
                    log::debug!("Renderer {} was reported twice", replaced.reference());
                }
                Some(RendererEvent::ItemAdded { item })
            }
            RendererEvent::ITEM_DELETED => match index.remove(&reference) {
                Some(item) => Some(RendererEvent::ItemDeleted { item }),
                None => {
                    log::debug!("Ignoring removal of unknown renderer {}", reference);
                    None
                }
            },
            other => {
                log::debug!("Ignoring discoverer notification {} for {:?}", other, native);
                None
            }
        }
    }

    fn teardown(&self, native: NativeId) {
        let items = self.hub.with_state(std::mem::take);
        log::trace!("Releasing {} discovered renderers", items.len());
        std::mem::drop(items);
        self.engine.native().discoverer_release(native);
    }
}

/// Finds renderers of one kind.
#[derive(Clone)]
pub struct RendererDiscoverer {
    inner: HandleRef<DiscovererCore>,
}

impl RendererDiscoverer {
    /// `name` is one of the services from [RendererDiscoverer::list].
    pub fn new(engine: &Engine, name: &str) -> Result<RendererDiscoverer> {
        let native = engine.native().discoverer_new(name)?;
        let core = DiscovererCore {
            engine: engine.clone(),
            hub: EventHub::new(AHashMap::new()),
        };
        let inner = HandleRef::new(native, core);
        engine.attach(&inner);
        Ok(RendererDiscoverer { inner })
    }

    pub fn list(engine: &Engine) -> Vec<RendererService> {
        engine.native().renderer_services()
    }

    fn core(&self) -> &DiscovererCore {
        self.inner.resource()
    }

    #[track_caller]
    fn live(&self) -> Lease<'_, DiscovererCore> {
        match self.inner.lease() {
            Some(l) => l,
            None => panic!("Renderer discoverer is released"),
        }
    }

    /// # Panics
    ///
    /// If the discoverer was released.
    #[track_caller]
    pub fn start(&self) -> Result<()> {
        let lease = self.live();
        check(
            self.core().engine.native().discoverer_start(lease.native()),
            "start renderer discovery",
        )
    }

    /// Stop discovering.  This also clears the listener.
    ///
    /// # Panics
    ///
    /// If the discoverer was released.
    #[track_caller]
    pub fn stop(&self) {
        let lease = self.live();
        self.clear_event_listener();
        self.core().engine.native().discoverer_stop(lease.native());
    }

    /// Every renderer found so far.
    pub fn items(&self) -> Vec<RendererItem> {
        self.core()
            .hub
            .with_state(|index| index.values().cloned().collect())
    }

    pub fn is_released(&self) -> bool {
        !self.inner.is_alive()
    }

    pub fn release(self) {
        self.inner.release();
    }

    #[track_caller]
    pub fn set_event_listener(
        &self,
        listener: impl Listener<RendererEvent>,
        context: Arc<dyn DeliveryContext>,
    ) {
        let _lease = self.live();
        let old = self.core().hub.set_listener(Arc::new(listener), context);
        std::mem::drop(old);
    }

    pub fn clear_event_listener(&self) {
        std::mem::drop(self.core().hub.clear_listener());
    }

    #[cfg(any(test, feature = "testing"))]
    pub fn native_id(&self) -> Option<NativeId> {
        self.inner.lease().map(|l| l.native())
    }
}

impl std::fmt::Debug for RendererDiscoverer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererDiscoverer")
            .field("handle", &self.inner)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_drop_the_suffix() {
        assert_eq!(display_name("Living-Room-TV-1a2b"), "Living Room TV");
        assert_eq!(display_name("Kitchen"), "Kitchen");
        assert_eq!(display_name("-x"), "");
    }

    #[test]
    fn flags() {
        let both = RendererFlags::CAN_AUDIO | RendererFlags::CAN_VIDEO;
        assert!(both.contains(RendererFlags::CAN_VIDEO));
        assert!(!RendererFlags::CAN_AUDIO.contains(RendererFlags::CAN_VIDEO));
    }
}

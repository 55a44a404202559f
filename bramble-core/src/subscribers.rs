use flax::{
    component::{ComponentDesc, ComponentKey, ComponentValue},
    events::EventSubscriber,
    Component, Entity,
};

/// Forwards removed component values over a channel.
///
/// Removal covers both explicit component removal and entity despawn, which
/// makes this the authoritative teardown signal for externally held
/// resources.
pub struct RemovedComponentSubscriber<T> {
    tx: flume::Sender<(Entity, T)>,
    component: ComponentKey,
}

impl<T> RemovedComponentSubscriber<T> {
    pub fn new(tx: flume::Sender<(Entity, T)>, component: Component<T>) -> Self
    where
        T: ComponentValue,
    {
        Self {
            tx,
            component: component.key(),
        }
    }
}

impl<T: ComponentValue + Clone> EventSubscriber for RemovedComponentSubscriber<T> {
    fn on_added(&self, _: &flax::archetype::ArchetypeStorage, _: &flax::events::EventData) {}

    fn on_modified(&self, _: &flax::events::EventData) {}

    fn on_removed(
        &self,
        storage: &flax::archetype::ArchetypeStorage,
        event: &flax::events::EventData,
    ) {
        let storage = storage.downcast_ref::<T>();
        for (&id, slot) in event.ids.iter().zip(event.slots) {
            self.tx.send((id, storage[slot].clone())).ok();
        }
    }

    fn matches_arch(&self, arch: &flax::archetype::Archetype) -> bool {
        arch.has(self.component)
    }

    fn matches_component(&self, v: ComponentDesc) -> bool {
        v.key() == self.component
    }

    fn is_connected(&self) -> bool {
        self.tx.is_connected()
    }
}

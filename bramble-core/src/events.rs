use std::{any::TypeId, collections::HashMap, sync::mpsc};

use downcast_rs::{impl_downcast, Downcast};

/// Type keyed event fan-out.
///
/// A dispatcher is created lazily for each event type on first send or
/// subscription.
pub struct Events {
    dispatchers: HashMap<TypeId, Box<dyn AnyEventDispatcher>>,
}

impl Events {
    pub fn new() -> Events {
        Self {
            dispatchers: HashMap::new(),
        }
    }

    /// Sends an event of type T to all subscribed listeners.
    pub fn send<T: 'static + Clone + Send + Sync>(&mut self, event: T) {
        if let Some(dispatcher) = self
            .dispatchers
            .get_mut(&TypeId::of::<T>())
            .and_then(|v| v.downcast_mut::<EventDispatcher<T>>())
        {
            dispatcher.send(event)
        }
    }

    /// Subscribes to events of type T.
    ///
    /// The subscription is removed when the returned receiver is dropped.
    pub fn subscribe<T: 'static + Clone + Send + Sync>(&mut self) -> flume::Receiver<T> {
        let (tx, rx) = flume::unbounded();
        self.subscribe_sender(tx);
        rx
    }

    /// Subscribes to events of type T using a provided sender.
    pub fn subscribe_sender<S, T: 'static + Clone + Send + Sync>(&mut self, sender: S)
    where
        S: 'static + EventSender<T> + Send + Sync,
    {
        if let Some(dispatcher) = self
            .dispatchers
            .entry(TypeId::of::<T>())
            .or_insert_with(new_event_dispatcher::<T>)
            .downcast_mut::<EventDispatcher<T>>()
        {
            dispatcher.subscribe(sender)
        }
    }
}

impl Default for Events {
    fn default() -> Self {
        Self::new()
    }
}

trait AnyEventDispatcher: 'static + Send + Sync + Downcast {}
impl_downcast!(AnyEventDispatcher);

/// Handles event dispatching for a single type of event
pub struct EventDispatcher<T> {
    subscribers: Vec<Subscriber<T>>,
}

impl<T> EventDispatcher<T>
where
    T: Clone,
{
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    /// Sends an event to all subscribers. The event is cloned for each
    /// registered subscriber. Requires mutable access to clean up no longer
    /// active subscribers.
    pub fn send(&mut self, event: T) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()));
    }

    /// Subscribes to events using sender to send events. The subscriber is
    /// automatically cleaned up when the receiving end is dropped.
    pub fn subscribe<S>(&mut self, sender: S)
    where
        S: 'static + EventSender<T> + Send + Sync,
    {
        self.subscribers.push(Subscriber::new(sender));
    }
}

impl<T: Clone> Default for EventDispatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static + Send + Sync + Clone> AnyEventDispatcher for EventDispatcher<T> {}

struct Subscriber<T> {
    sender: Box<dyn EventSender<T> + Send + Sync>,
}

impl<T> Subscriber<T> {
    pub fn new<S>(sender: S) -> Self
    where
        S: 'static + EventSender<T> + Send + Sync,
    {
        Self {
            sender: Box::new(sender),
        }
    }

    pub fn send(&self, event: T) -> bool {
        self.sender.send(event)
    }
}

/// Describes a type which can send events. Implemented for mpsc and flume
/// channels.
pub trait EventSender<T> {
    /// Send an event. Returns true if receiver is still alive.
    fn send(&self, event: T) -> bool;
}

impl<T> EventSender<T> for mpsc::Sender<T> {
    fn send(&self, event: T) -> bool {
        self.send(event).is_ok()
    }
}

impl<T> EventSender<T> for flume::Sender<T> {
    fn send(&self, event: T) -> bool {
        self.send(event).is_ok()
    }
}

fn new_event_dispatcher<T: 'static + Clone + Send + Sync>() -> Box<dyn AnyEventDispatcher> {
    let dispatcher: EventDispatcher<T> = EventDispatcher::new();
    Box::new(dispatcher)
}

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// An event that can be routed by [`EventBus`] according to its kind.
pub trait Event {
    type Kind: Copy + Eq + fmt::Debug;

    fn kind(&self) -> Self::Kind;
}

/// Handle returned by [`EventBus::on`], used to unsubscribe later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EventRef(u64);

impl EventRef {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

type Listener<E> = Rc<dyn Fn(&E)>;

struct Subscription<E: Event> {
    id: u64,
    kind: E::Kind,
    listener: Listener<E>,
}

/// Private publish/subscribe dispatcher owned by a component.
///
/// Listeners run synchronously, in registration order, with no internal
/// borrow held, so a listener may call back into the component that emitted
/// the event (including subscribing or unsubscribing). Listeners added while
/// an event is being dispatched only see later events.
pub struct EventBus<E: Event> {
    subscriptions: RefCell<Vec<Subscription<E>>>,
}

impl<E: Event> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> EventBus<E> {
    pub fn new() -> Self {
        Self {
            subscriptions: RefCell::new(Vec::new()),
        }
    }

    /// Registers `listener` for events of `kind`.
    pub fn on(&self, kind: E::Kind, listener: impl Fn(&E) + 'static) -> EventRef {
        let id = NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed);
        self.subscriptions.borrow_mut().push(Subscription {
            id,
            kind,
            listener: Rc::new(listener),
        });
        EventRef(id)
    }

    /// Removes a listener. Returns `false` when the reference is unknown.
    pub fn off(&self, event_ref: EventRef) -> bool {
        let mut subscriptions = self.subscriptions.borrow_mut();
        let before = subscriptions.len();
        subscriptions.retain(|sub| sub.id != event_ref.0);
        subscriptions.len() != before
    }

    /// Dispatches `event` and returns how many listeners were invoked.
    pub fn emit(&self, event: &E) -> usize {
        let kind = event.kind();
        let listeners: Vec<Listener<E>> = self
            .subscriptions
            .borrow()
            .iter()
            .filter(|sub| sub.kind == kind)
            .map(|sub| Rc::clone(&sub.listener))
            .collect();
        for listener in &listeners {
            listener(event);
        }
        listeners.len()
    }

    pub fn listener_count(&self, kind: E::Kind) -> usize {
        self.subscriptions
            .borrow()
            .iter()
            .filter(|sub| sub.kind == kind)
            .count()
    }

    pub fn clear(&self) {
        self.subscriptions.borrow_mut().clear();
    }
}

impl<E: Event> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.subscriptions.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug)]
    enum Ping {
        Left(u32),
        Right,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum PingKind {
        Left,
        Right,
    }

    impl Event for Ping {
        type Kind = PingKind;

        fn kind(&self) -> PingKind {
            match self {
                Ping::Left(_) => PingKind::Left,
                Ping::Right => PingKind::Right,
            }
        }
    }

    #[test]
    fn listeners_run_in_registration_order_for_matching_kind() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let first = Rc::clone(&log);
        bus.on(PingKind::Left, move |event: &Ping| {
            if let Ping::Left(value) = event {
                first.borrow_mut().push(format!("first:{value}"));
            }
        });
        let second = Rc::clone(&log);
        bus.on(PingKind::Left, move |_| second.borrow_mut().push("second".into()));
        let right = Rc::clone(&log);
        bus.on(PingKind::Right, move |_| right.borrow_mut().push("right".into()));

        assert_eq!(bus.emit(&Ping::Left(7)), 2);
        assert_eq!(*log.borrow(), vec!["first:7".to_string(), "second".to_string()]);
    }

    #[test]
    fn off_removes_only_the_given_listener() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let handle = bus.on(PingKind::Right, move |_| counter.set(counter.get() + 1));
        bus.on(PingKind::Right, |_| {});

        assert!(bus.off(handle));
        assert!(!bus.off(handle));
        assert_eq!(bus.emit(&Ping::Right), 1);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn listener_may_subscribe_during_dispatch() {
        let bus = Rc::new(EventBus::new());
        let hits = Rc::new(Cell::new(0));
        let inner_bus = Rc::clone(&bus);
        let inner_hits = Rc::clone(&hits);
        bus.on(PingKind::Right, move |_| {
            let counter = Rc::clone(&inner_hits);
            inner_bus.on(PingKind::Right, move |_| counter.set(counter.get() + 1));
        });

        assert_eq!(bus.emit(&Ping::Right), 1);
        assert_eq!(hits.get(), 0);
        assert_eq!(bus.listener_count(PingKind::Right), 2);
    }
}

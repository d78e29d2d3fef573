//! Listener registration tokens
//!
//! Every subscribe call hands back a `Subscription`. Disposing it stops
//! delivery to that listener without touching the session it observes, so
//! teardown order between a screen and a controller does not matter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Disposer for a registered listener
#[derive(Debug, Clone)]
pub struct Subscription {
    active: Arc<AtomicBool>,
}

impl Subscription {
    fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Stop delivering events to the listener. Idempotent.
    pub fn dispose(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A single listener with an ordered, closable event stream.
///
/// Delivery is serialized per listener: once `finish` has delivered the
/// final event, no earlier-produced event can arrive after it.
pub struct Subscriber<T> {
    callback: Callback<T>,
    subscription: Subscription,
    open: Arc<Mutex<bool>>,
}

impl<T> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        Self {
            callback: Arc::clone(&self.callback),
            subscription: self.subscription.clone(),
            open: Arc::clone(&self.open),
        }
    }
}

impl<T> Subscriber<T> {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
            subscription: Subscription::new(),
            open: Arc::new(Mutex::new(true)),
        }
    }

    /// Token handed to the caller
    pub fn subscription(&self) -> Subscription {
        self.subscription.clone()
    }

    /// Deliver an event unless the stream was finished or disposed
    pub fn notify(&self, event: &T) {
        let open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        if *open && self.subscription.is_active() {
            (self.callback)(event);
        }
    }

    /// Deliver a last event and close the stream
    pub fn finish(&self, event: &T) {
        let mut open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        if *open && self.subscription.is_active() {
            (self.callback)(event);
        }
        *open = false;
    }
}

/// Fan-out to any number of listeners
pub struct Listeners<T> {
    subscribers: Arc<Mutex<Vec<Subscriber<T>>>>,
}

impl<T> Clone for Listeners<T> {
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T> Listeners<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let subscriber = Subscriber::new(callback);
        let subscription = subscriber.subscription();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(subscriber);
        subscription
    }

    /// Deliver to every live listener, dropping disposed ones
    pub fn emit(&self, event: &T) {
        let live: Vec<Subscriber<T>> = {
            let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
            subscribers.retain(|s| s.subscription.is_active());
            subscribers.clone()
        };
        for subscriber in live {
            subscriber.notify(event);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.subscription.is_active())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//! Listener lists for workspace events.
//!
//! A [`ListenerList`] only holds weak references to callbacks. Registering
//! returns a [`Listener`] handle that owns the callback; dropping the handle
//! deregisters it, and the stale entry is swept on the next dispatch.

use std::borrow::Borrow;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use crossbeam_skiplist::SkipSet;

use crate::model::WorkspaceModel;

/// An event that can be dispatched to listeners.
pub trait Event: fmt::Debug + Send + Sync {
    /// What each listener returns.
    type HandlerReturnType: fmt::Debug;

    /// Folds a listener's return value back into the event. Called after each
    /// listener, in registration order. Does nothing by default.
    fn update(&mut self, _handler_result: Self::HandlerReturnType) {}
}

type Callback<E> = dyn Fn(&E) -> <E as Event>::HandlerReturnType + Send + Sync;

struct ListenerEntry<E: Event> {
    callback: Weak<Callback<E>>,
    order: usize,
}

// Entries are identified and ordered by registration order alone.
impl<E: Event> Eq for ListenerEntry<E> {}

impl<E: Event> PartialEq for ListenerEntry<E> {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order
    }
}

impl<E: Event> Ord for ListenerEntry<E> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.order.cmp(&other.order)
    }
}

impl<E: Event> PartialOrd for ListenerEntry<E> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<E: Event> Borrow<usize> for ListenerEntry<E> {
    fn borrow(&self) -> &usize {
        &self.order
    }
}

static NEXT_LISTENER_ORDER: AtomicUsize = AtomicUsize::new(0);

/// Listeners for one event type, called in the order they were registered.
pub struct ListenerList<E: Event> {
    inner: SkipSet<ListenerEntry<E>>,
}

impl<E: Event + 'static> ListenerList<E> {
    pub fn new() -> Self {
        ListenerList {
            inner: SkipSet::new(),
        }
    }

    /// Number of registrations, including ones not yet swept.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Calls every live listener with `event`, feeding each result to
    /// [`Event::update`], and drops entries whose handle is gone.
    ///
    /// Only code inside the crate emits events.
    pub(crate) fn dispatch(&self, event: &mut E) {
        let mut stale = Vec::new();

        for entry in self.inner.iter() {
            match entry.callback.upgrade() {
                Some(callback) => {
                    let result = callback(event);
                    event.update(result);
                }
                None => stale.push(entry.order),
            }
        }

        for order in stale {
            self.inner.remove(&order);
        }
    }
}

impl<E: Event + 'static> Default for ListenerList<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> fmt::Debug for ListenerList<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerList")
            .field("listener_count", &self.inner.len())
            .finish()
    }
}

/// An active registration. Keep it alive for as long as the callback should run.
pub struct Listener<E: Event> {
    _callback: Arc<Callback<E>>,
    order: usize,
}

impl<E: Event + 'static> Listener<E> {
    pub fn new<F>(listeners: &ListenerList<E>, callback: F) -> Self
    where
        F: Fn(&E) -> E::HandlerReturnType + Send + Sync + 'static,
    {
        let order = NEXT_LISTENER_ORDER.fetch_add(1, Ordering::SeqCst);
        let callback: Arc<Callback<E>> = Arc::new(callback);
        listeners.inner.insert(ListenerEntry {
            callback: Arc::downgrade(&callback),
            order,
        });

        Listener {
            _callback: callback,
            order,
        }
    }
}

impl<E: Event> fmt::Debug for Listener<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener").field("order", &self.order).finish()
    }
}

/// Defines a struct with one public [`ListenerList`] per named event.
macro_rules! define_event_listeners {
    ($struct_name:ident { $($field_name:ident: $event_type:ty),* $(,)? }) => {
        /// Listener lists, one per event.
        #[derive(Debug, Default)]
        pub struct $struct_name {
            $(
                pub $field_name: $crate::event::ListenerList<$event_type>,
            )*
        }

        impl $struct_name {
            pub fn new() -> Self {
                Self {
                    $(
                        $field_name: $crate::event::ListenerList::new(),
                    )*
                }
            }
        }
    };
}

pub(crate) use define_event_listeners;

/// Why the workspace model changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeReason {
    /// The tree changed (close, toggle, select, engine update).
    Layout,
    Direction,
    /// Same tree, new settings or restore data.
    Metadata,
    /// Storage was cleared and the default workspace reinstated.
    Reset,
}

/// The canonical workspace model was replaced.
#[derive(Debug, Clone)]
pub struct ModelChanged {
    pub model: WorkspaceModel,
    pub reason: ChangeReason,
}

impl Event for ModelChanged {
    type HandlerReturnType = ();
}

/// A panel was shown or hidden by its component key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelToggled {
    pub key: String,
    pub visible: bool,
}

impl Event for PanelToggled {
    type HandlerReturnType = ();
}

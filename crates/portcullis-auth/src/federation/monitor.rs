//! Options monitors.
//!
//! Handlers read their options through [`OptionsMonitor`] so that a
//! reloadable source could be plugged in later. Dynamically registered
//! providers are built once from a stored record, so they use
//! [`StaticOptionsMonitor`]: a constant value and a change subscription that
//! never fires.

use std::fmt;
use std::sync::Arc;

/// Listener invoked with the new options and the options name.
pub type ChangeListener<T> = Box<dyn Fn(&T, &str) + Send + Sync>;

/// A source of named, possibly changing options.
pub trait OptionsMonitor<T>: Send + Sync {
    /// Returns the current default options.
    fn current(&self) -> Arc<T>;

    /// Returns the options registered under `name`.
    fn get(&self, name: &str) -> Arc<T>;

    /// Registers a listener for option changes.
    ///
    /// Dropping the returned subscription unregisters the listener.
    fn on_change(&self, listener: ChangeListener<T>) -> ChangeSubscription;
}

/// Handle returned by [`OptionsMonitor::on_change`].
#[must_use = "dropping the subscription unregisters the listener"]
pub struct ChangeSubscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl ChangeSubscription {
    /// A subscription that is not attached to anything.
    pub fn noop() -> Self {
        Self { unsubscribe: None }
    }

    /// A subscription that runs `unsubscribe` when dropped.
    pub fn new(unsubscribe: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Returns `true` if dropping this subscription has an effect.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.unsubscribe.is_some()
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl fmt::Debug for ChangeSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeSubscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Monitor over a fixed value. Every name maps to the same options and
/// change listeners are discarded.
pub struct StaticOptionsMonitor<T> {
    value: Arc<T>,
}

impl<T> StaticOptionsMonitor<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: Arc::new(value),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for StaticOptionsMonitor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticOptionsMonitor")
            .field("value", &self.value)
            .finish()
    }
}

impl<T: Send + Sync> OptionsMonitor<T> for StaticOptionsMonitor<T> {
    fn current(&self) -> Arc<T> {
        self.value.clone()
    }

    fn get(&self, _name: &str) -> Arc<T> {
        self.value.clone()
    }

    fn on_change(&self, _listener: ChangeListener<T>) -> ChangeSubscription {
        ChangeSubscription::noop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_static_monitor_returns_same_value_for_every_name() {
        let monitor = StaticOptionsMonitor::new("value".to_string());

        assert_eq!(*monitor.current(), "value");
        assert_eq!(*monitor.get("okta"), "value");
        assert!(Arc::ptr_eq(&monitor.current(), &monitor.get("other")));
    }

    #[test]
    fn test_static_monitor_subscription_is_noop() {
        let monitor = StaticOptionsMonitor::new(1u32);
        let subscription = monitor.on_change(Box::new(|_, _| panic!("never called")));
        assert!(!subscription.is_active());
    }

    #[test]
    fn test_subscription_runs_unsubscribe_on_drop() {
        let flag = Arc::new(AtomicBool::new(false));
        let observed = flag.clone();

        let subscription = ChangeSubscription::new(move || observed.store(true, Ordering::SeqCst));
        assert!(subscription.is_active());
        drop(subscription);

        assert!(flag.load(Ordering::SeqCst));
    }
}

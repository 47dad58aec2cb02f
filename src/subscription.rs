//! The push side of a follow: observers, subscription handles and the emitter
//! bridging the follow loop to one observer.
//!
//! ## Rules
//! - Disposal happens **at most once**; later calls are no-ops.
//! - Every delivery runs under a delivery gate and checks the disposal slot
//!   first. `dispose` takes the same gate, so once it returns no callback is
//!   running or will run. The gate is reentrant: an observer may dispose its
//!   own subscription from inside a callback.
//! - A terminal error disposes the subscription **before** it is delivered.

use crate::error::Error;
use crate::follow::{Flow, LineEvent, Sink};
use crate::operators::Pipeline;
use parking_lot::{Mutex, ReentrantMutex};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Consumer of a followed file.
///
/// Callbacks run on whichever task drives the follow and should return quickly;
/// the next poll only starts once every event of the previous one was offered.
pub trait Observer<T>: Send {
    /// Called once, before any other callback, with the handle that cancels the follow.
    fn on_subscribe(&mut self, subscription: &Subscription) {
        let _ = subscription;
    }

    /// A new value.
    fn on_next(&mut self, value: T);

    /// The file was replaced or truncated. Informational; values keep coming.
    fn on_rotated(&mut self) {}

    /// Terminal failure. Nothing is delivered afterwards.
    fn on_error(&mut self, error: Error);
}

enum Slot {
    Unset,
    Active(CancellationToken),
    Disposed,
}

struct Shared {
    slot: Mutex<Slot>,
    gate: ReentrantMutex<()>,
}

/// Handle to one active follow.
///
/// Clones refer to the same follow.
#[derive(Clone)]
pub struct Subscription {
    shared: Arc<Shared>,
}

impl Subscription {
    pub(crate) fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot::Unset),
                gate: ReentrantMutex::new(()),
            }),
        }
    }

    /// Stops the follow. No callback runs after this returns.
    pub fn dispose(&self) {
        let _gate = self.shared.gate.lock();
        self.release();
    }

    pub fn is_disposed(&self) -> bool {
        matches!(*self.shared.slot.lock(), Slot::Disposed)
    }

    /// Installs the token that stops the follow loop.
    ///
    /// Returns false when the token was not kept; it is then cancelled right away.
    pub(crate) fn set_once(&self, token: CancellationToken) -> bool {
        let mut slot = self.shared.slot.lock();
        if matches!(*slot, Slot::Unset) {
            *slot = Slot::Active(token);
            return true;
        }
        let already_set = matches!(*slot, Slot::Active(_));
        drop(slot);

        if already_set {
            warn!("subscription already has a follow attached; cancelling the new one");
        }
        token.cancel();
        false
    }

    /// Moves the slot to `Disposed`. True when this call did the transition.
    fn release(&self) -> bool {
        let previous = std::mem::replace(&mut *self.shared.slot.lock(), Slot::Disposed);
        match previous {
            Slot::Active(token) => {
                token.cancel();
                true
            }
            Slot::Unset => true,
            Slot::Disposed => false,
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Sink that runs the pipeline and hands results to the observer.
pub(crate) struct Emitter<T> {
    subscription: Subscription,
    pipeline: Pipeline<T>,
    observer: Box<dyn Observer<T>>,
    path: String,
}

impl<T> Emitter<T> {
    pub(crate) fn new(
        subscription: Subscription,
        pipeline: Pipeline<T>,
        observer: Box<dyn Observer<T>>,
        path: String,
    ) -> Self {
        Self {
            subscription,
            pipeline,
            observer,
            path,
        }
    }

    fn terminate(&mut self, error: Error) {
        if self.subscription.release() {
            self.observer.on_error(error);
        }
    }
}

impl<T> Sink for Emitter<T> {
    fn emit(&mut self, event: LineEvent) -> Flow {
        let shared = Arc::clone(&self.subscription.shared);
        let _gate = shared.gate.lock();
        if self.subscription.is_disposed() {
            return Flow::Stop;
        }

        match event {
            LineEvent::Line(line) => match (self.pipeline)(line) {
                Ok(value) => self.observer.on_next(value),
                Err(error) => {
                    self.terminate(error);
                    return Flow::Stop;
                }
            },
            LineEvent::Rotated => self.observer.on_rotated(),
            LineEvent::NotFound => {
                let error = Error::NotFound {
                    path: self.path.clone(),
                };
                self.terminate(error);
                return Flow::Stop;
            }
            LineEvent::Error(error) => {
                self.terminate(error);
                return Flow::Stop;
            }
        }

        if self.subscription.is_disposed() {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }
}

//! Image scaler / loader.
//!
//! [`ImageLoader`] turns an image locator into a bounded [`DisplaySize`]. Each
//! call to [`ImageLoader::request`] with a new (source, device) pair starts a
//! resolution on a worker thread and bumps a generation counter. When a
//! resolution completes, its result is published only if its generation is
//! still the current one, so a slow response for an outdated source can never
//! overwrite the state of a newer request.
//!
//! The published state is a [`LoadState`] carried by a `tokio::sync::watch`
//! channel: callers can poll it with [`ImageLoader::state`], await it with
//! [`ImageLoader::ready`], or keep a receiver from [`ImageLoader::subscribe`].
//!
//! Handlers run on the worker thread after the lock is released, and only
//! while their resolution is still current. A request issued while a handler
//! is already running does not interrupt it.

use crate::scale::scale_to_fit;
use crate::source::ImageResolver;
use crate::{DeviceClass, DisplaySize, Error, LoadState, NaturalSize, Result};
use log::{debug, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use tokio::sync::watch;

type ReadyHandler = Arc<dyn Fn() + Send + Sync>;
type ErrorHandler = Arc<dyn Fn(&Error) + Send + Sync>;
type PublishHook = Arc<dyn Fn(DisplaySize) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Request {
    source: String,
    device: DeviceClass,
}

struct Inner {
    generation: u64,
    active: Option<Request>,
    on_ready: Option<ReadyHandler>,
    on_error: Option<ErrorHandler>,
    on_publish: Option<PublishHook>,
}

struct Shared {
    inner: Mutex<Inner>,
    state_tx: watch::Sender<LoadState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn complete(&self, generation: u64, request: &Request, outcome: Result<NaturalSize>) {
        let notify = {
            let inner = self.lock();
            if inner.generation != generation {
                debug!(
                    "dropping stale resolution for {} (generation {}, current {})",
                    request.source, generation, inner.generation
                );
                return;
            }

            match outcome {
                Ok(natural) => {
                    let size = scale_to_fit(natural, request.device);
                    debug!(
                        "resolved {} to {}x{}, display {}x{}",
                        request.source, natural.width, natural.height, size.width, size.height
                    );
                    self.state_tx.send_replace(LoadState::Ready(size));
                    Outcome::Ready(size, inner.on_publish.clone(), inner.on_ready.clone())
                }
                Err(err) => Outcome::Failed(inner.on_error.clone(), err),
            }
        };

        // Handlers run without the lock held so they may call back into the loader.
        match notify {
            Outcome::Ready(size, hook, cb) => {
                if let Some(hook) = hook {
                    if !self.is_current(generation) {
                        return;
                    }
                    hook(size);
                }
                if let Some(cb) = cb {
                    if !self.is_current(generation) {
                        debug!("{} superseded before on_ready", request.source);
                        return;
                    }
                    cb();
                }
            }
            Outcome::Failed(Some(cb), err) => {
                if self.is_current(generation) {
                    cb(&err);
                }
            }
            Outcome::Failed(None, err) => {
                debug!("resolution of {} failed, staying pending: {}", request.source, err)
            }
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    /// Forget the active request if it is still `generation`, so the same pair
    /// can be requested again.
    fn abandon(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation == generation {
            inner.active = None;
        }
    }
}

enum Outcome {
    Ready(DisplaySize, Option<PublishHook>, Option<ReadyHandler>),
    Failed(Option<ErrorHandler>, Error),
}

/// Resolves image sources into display sizes and signals readiness once per
/// resolution.
pub struct ImageLoader {
    resolver: Arc<dyn ImageResolver>,
    shared: Arc<Shared>,
}

impl ImageLoader {
    pub fn new(resolver: Arc<dyn ImageResolver>) -> Self {
        let (state_tx, _) = watch::channel(LoadState::Pending);
        Self {
            resolver,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    generation: 0,
                    active: None,
                    on_ready: None,
                    on_error: None,
                    on_publish: None,
                }),
                state_tx,
            }),
        }
    }

    /// Request the display size of `source` on `device`.
    ///
    /// Returns `Ok(false)` when the pair is already the active request; nothing
    /// is re-resolved in that case. Otherwise the state resets to
    /// [`LoadState::Pending`], a new resolution starts, and `Ok(true)` is
    /// returned. An empty source is rejected.
    pub fn request(&self, source: &str, device: DeviceClass) -> Result<bool> {
        if source.trim().is_empty() {
            return Err(Error::ConfigError("image source must not be empty".to_string()));
        }

        let request = Request {
            source: source.to_string(),
            device,
        };

        let generation = {
            let mut inner = self.shared.lock();
            if inner.active.as_ref() == Some(&request) {
                return Ok(false);
            }
            inner.generation += 1;
            inner.active = Some(request.clone());
            self.shared.state_tx.send_replace(LoadState::Pending);
            inner.generation
        };
        debug!(
            "requesting {} for {:?} (generation {})",
            request.source, request.device, generation
        );

        let shared = Arc::clone(&self.shared);
        let resolver = Arc::clone(&self.resolver);
        let spawned = thread::Builder::new()
            .name("meme-svg-loader".to_string())
            .spawn(move || {
                let outcome = resolver.resolve(&request.source);
                shared.complete(generation, &request, outcome);
            });

        if let Err(e) = spawned {
            warn!("failed to spawn loader thread: {}", e);
            self.shared.abandon(generation);
            return Err(Error::Other(format!("Failed to spawn loader thread: {}", e)));
        }
        Ok(true)
    }

    /// Register the callback fired once each time a resolution is published.
    ///
    /// Replacing the callback never restarts a resolution.
    pub fn set_on_ready<F>(&self, cb: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shared.lock().on_ready = Some(Arc::new(cb));
    }

    pub fn clear_on_ready(&self) {
        self.shared.lock().on_ready = None;
    }

    /// Register a callback for failed resolutions.
    ///
    /// Without one, failures are only logged and the state stays pending.
    pub fn set_on_error<F>(&self, cb: F)
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.shared.lock().on_error = Some(Arc::new(cb));
    }

    pub fn clear_on_error(&self) {
        self.shared.lock().on_error = None;
    }

    /// Hook run with the new size right after it is published and before
    /// `on_ready`.
    pub(crate) fn set_on_publish<F>(&self, hook: F)
    where
        F: Fn(DisplaySize) + Send + Sync + 'static,
    {
        self.shared.lock().on_publish = Some(Arc::new(hook));
    }

    pub fn state(&self) -> LoadState {
        *self.shared.state_tx.borrow()
    }

    /// The published display size, `None` while pending.
    pub fn display_size(&self) -> Option<DisplaySize> {
        self.state().size()
    }

    /// The (source, device) pair most recently requested.
    pub fn active_request(&self) -> Option<(String, DeviceClass)> {
        self.shared
            .lock()
            .active
            .as_ref()
            .map(|r| (r.source.clone(), r.device))
    }

    /// Number of resolutions started so far.
    pub fn generation(&self) -> u64 {
        self.shared.lock().generation
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.shared.state_tx.subscribe()
    }

    /// Wait until a display size is published for the current request.
    ///
    /// A resolution that never succeeds keeps this future pending; wrap it in
    /// `tokio::time::timeout` to bound the wait.
    pub async fn ready(&self) -> Option<DisplaySize> {
        let mut rx = self.subscribe();
        loop {
            if let LoadState::Ready(size) = *rx.borrow_and_update() {
                return Some(size);
            }
            if rx.changed().await.is_err() {
                return None;
            }
        }
    }
}

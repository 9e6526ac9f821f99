use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_PRELOAD_DELAY: Duration = Duration::from_millis(5);

/// Turns a thumbnail file into a displayable image no larger than the given
/// bounds. Only ever called from the loader thread.
pub trait ThumbnailDecoder: Send + 'static {
    type Image: Send + 'static;

    fn load_and_scale(&self, path: &Path, max_width: u32, max_height: u32)
        -> Option<Self::Image>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub path: PathBuf,
    pub max_width: u32,
    pub max_height: u32,
    pub list_index: usize,
    pub is_preload: bool,
}

impl LoadRequest {
    /// A request for the item the user is looking at.
    pub fn current(path: PathBuf, list_index: usize, max_width: u32, max_height: u32) -> Self {
        Self {
            path,
            max_width,
            max_height,
            list_index,
            is_preload: false,
        }
    }

    /// A speculative request for an item the user is likely to reach next.
    pub fn preload(path: PathBuf, list_index: usize, max_width: u32, max_height: u32) -> Self {
        Self {
            is_preload: true,
            ..Self::current(path, list_index, max_width, max_height)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadHint {
    pub path: PathBuf,
    pub list_index: usize,
}

/// A finished load. `image` is `None` when the file could not be decoded,
/// which callers treat as "no thumbnail".
#[derive(Debug)]
pub struct LoadResult<T> {
    pub image: Option<T>,
    pub list_index: usize,
    pub source_path: PathBuf,
}

struct Mailbox<T> {
    request: Option<LoadRequest>,
    hint: Option<PreloadHint>,
    result: Option<LoadResult<T>>,
    shutdown: bool,
}

impl<T> Mailbox<T> {
    fn new() -> Self {
        Self {
            request: None,
            hint: None,
            result: None,
            shutdown: false,
        }
    }

    /// Installs a request unless it would displace a pending current one
    /// with a preload. Returns whether the request was taken.
    fn offer(&mut self, request: LoadRequest, hint: Option<PreloadHint>) -> bool {
        if request.is_preload && self.request.as_ref().is_some_and(|r| !r.is_preload) {
            return false;
        }
        if !request.is_preload {
            self.hint = hint;
        }
        self.request = Some(request);
        true
    }

    /// A finished load for `path` may be published only if nothing newer is
    /// waiting, or the waiting request is for the same file.
    fn accepts(&self, path: &Path) -> bool {
        self.request.as_ref().map_or(true, |r| r.path == path)
    }
}

struct Shared<T> {
    mailbox: Mutex<Mailbox<T>>,
    wake: Condvar,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Mailbox<T>> {
        self.mailbox.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Background thumbnail loader: one worker thread fed through a one-slot
/// request mailbox, answering through a one-slot result mailbox.
///
/// The lock only covers handing metadata back and forth; decoding runs
/// unlocked, so the render thread can always supersede an in-flight load
/// without waiting on it. Superseded loads still run to completion and are
/// dropped when they try to publish.
pub struct ThumbnailLoader<T> {
    shared: Arc<Shared<T>>,
    worker: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> ThumbnailLoader<T> {
    pub fn spawn<D>(decoder: D, preload_delay: Duration) -> Result<Self>
    where
        D: ThumbnailDecoder<Image = T>,
    {
        let shared = Arc::new(Shared {
            mailbox: Mutex::new(Mailbox::new()),
            wake: Condvar::new(),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("thumb-loader".to_string())
            .spawn(move || run_worker(&worker_shared, &decoder, preload_delay))
            .context("failed to spawn thumbnail loader thread")?;

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }
}

impl<T> ThumbnailLoader<T> {
    /// Queues a load. A current request always replaces whatever is pending
    /// and carries the hint to preload once it is done; a preload never
    /// replaces a pending current request.
    pub fn submit(&self, request: LoadRequest, hint: Option<PreloadHint>) {
        let list_index = request.list_index;
        let is_preload = request.is_preload;
        let mut mailbox = self.shared.lock();
        if mailbox.shutdown {
            return;
        }
        if mailbox.offer(request, hint) {
            self.shared.wake.notify_one();
        } else {
            debug!(list_index, is_preload, "thumb: request dropped behind current load");
        }
    }

    /// Takes the latest finished load, if any. Never blocks on decoding.
    pub fn try_take_result(&self) -> Option<LoadResult<T>> {
        let result = self.shared.lock().result.take();
        if result.is_some() {
            // The worker may be holding a preload back for this slot.
            self.shared.wake.notify_all();
        }
        result
    }

    pub fn has_pending_request(&self) -> bool {
        self.shared.lock().request.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Stops and joins the worker. Safe to call more than once.
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        {
            let mut mailbox = self.shared.lock();
            mailbox.shutdown = true;
            mailbox.request = None;
            mailbox.hint = None;
            self.shared.wake.notify_all();
        }
        if worker.join().is_err() {
            warn!("thumbnail loader thread panicked");
        }
        self.shared.lock().result = None;
    }
}

impl<T> Drop for ThumbnailLoader<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker<D: ThumbnailDecoder>(
    shared: &Shared<D::Image>,
    decoder: &D,
    preload_delay: Duration,
) {
    debug!("thumb: loader started");
    let mut mailbox = shared.lock();
    loop {
        while mailbox.request.is_none() && !mailbox.shutdown {
            mailbox = shared
                .wake
                .wait(mailbox)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if mailbox.shutdown {
            break;
        }
        let Some(request) = mailbox.request.take() else {
            continue;
        };
        drop(mailbox);

        let image = decoder.load_and_scale(&request.path, request.max_width, request.max_height);

        mailbox = shared.lock();
        if !mailbox.accepts(&request.path) {
            debug!(list_index = request.list_index, "thumb: discarded (superseded)");
            continue;
        }
        // A matching re-request is satisfied by this load.
        mailbox.request = None;
        debug!(
            list_index = request.list_index,
            preload = request.is_preload,
            found = image.is_some(),
            "thumb: loaded"
        );
        mailbox.result = Some(LoadResult {
            image,
            list_index: request.list_index,
            source_path: request.path.clone(),
        });

        if request.is_preload || mailbox.hint.is_none() {
            continue;
        }

        // Give the render thread a moment to take the result first.
        drop(mailbox);
        thread::sleep(preload_delay);
        mailbox = shared.lock();

        // The preload must not overwrite a result the render thread has not
        // taken yet; hold the hint until it has, or until new work arrives.
        while mailbox.result.is_some()
            && mailbox.hint.is_some()
            && mailbox.request.is_none()
            && !mailbox.shutdown
        {
            mailbox = shared
                .wake
                .wait(mailbox)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if mailbox.request.is_none() && !mailbox.shutdown {
            if let Some(hint) = mailbox.hint.take() {
                debug!(list_index = hint.list_index, "thumb: preloading");
                mailbox.request = Some(LoadRequest::preload(
                    hint.path,
                    hint.list_index,
                    request.max_width,
                    request.max_height,
                ));
            }
        }
    }
    debug!("thumb: loader stopped");
}

use crate::cache::ThumbnailCache;
use crate::fade::{FadeState, ALPHA_MAX};
use crate::loader::{LoadRequest, LoadResult, PreloadHint, ThumbnailDecoder, ThumbnailLoader};
use crate::preload::hint_index;
use crate::res_cache::ThumbnailResolver;
use crate::settings::ThumbnailSettings;
use std::path::PathBuf;
use tracing::{debug, error};

/// Where the displayed thumbnail ends up each frame.
pub trait ThumbnailSurface<T> {
    /// Whether `draw` honours the alpha it is given.
    fn supports_alpha_mod(&self) -> bool;

    fn draw(&mut self, image: &T, alpha: u8);
}

/// What the browser looks like this frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    pub entries: &'a [PathBuf],
    pub selected: Option<usize>,
    /// A navigation key is held past its initial press (fast scrolling).
    pub nav_held: bool,
    pub supports_alpha: bool,
    pub now_ms: u64,
}

/// The thumbnail to draw this frame. Borrowed from the session, so it
/// cannot be kept past the next `update`.
#[derive(Debug)]
pub struct DisplayedThumbnail<'a, T> {
    pub list_index: usize,
    pub image: &'a T,
    pub alpha: u8,
}

/// Per-listing thumbnail state driven once per rendered frame: the cache,
/// the background loader and the fade-in, all owned by the render thread.
pub struct ThumbnailSession<T> {
    cache: ThumbnailCache<T>,
    loader: Option<ThumbnailLoader<T>>,
    fade: FadeState,
    max_width: u32,
    max_height: u32,
    /// Selection the last full evaluation ran for. `None` forces a re-run.
    last_processed: Option<usize>,
    /// Previous selection, for the scroll direction.
    last_selected: Option<usize>,
    /// The selected entry has a thumbnail file, loaded or not.
    thumb_exists: bool,
}

impl<T: Send + 'static> ThumbnailSession<T> {
    /// Starts the loader thread. If it cannot be started the session still
    /// works, it just never shows a thumbnail.
    pub fn start<D>(decoder: D, settings: &ThumbnailSettings) -> Self
    where
        D: ThumbnailDecoder<Image = T>,
    {
        let loader = match ThumbnailLoader::spawn(decoder, settings.preload_delay()) {
            Ok(loader) => Some(loader),
            Err(err) => {
                error!("{err:#}; continuing without thumbnails");
                None
            }
        };
        Self::with_loader(loader, settings)
    }

    pub fn with_loader(loader: Option<ThumbnailLoader<T>>, settings: &ThumbnailSettings) -> Self {
        Self {
            cache: ThumbnailCache::new(settings.cache_capacity),
            loader,
            fade: FadeState::new(settings.fade_duration_ms),
            max_width: settings.max_width,
            max_height: settings.max_height,
            last_processed: None,
            last_selected: None,
            thumb_exists: false,
        }
    }

    /// Forgets everything tied to the previous listing.
    pub fn directory_changed(&mut self) {
        self.cache.clear();
        if let Some(loader) = &self.loader {
            drop(loader.try_take_result());
        }
        self.last_processed = None;
        self.last_selected = None;
        self.thumb_exists = false;
        self.fade.reset();
    }

    /// Runs one frame of thumbnail bookkeeping. Returns true when the
    /// thumbnail area needs to be redrawn.
    pub fn update<R: ThumbnailResolver>(&mut self, frame: &FrameInput<'_>, resolver: &mut R) -> bool {
        let mut dirty = false;

        if let Some(result) = self.loader.as_ref().and_then(ThumbnailLoader::try_take_result) {
            dirty |= self.accept_result(result, frame, resolver);
        }

        if frame.selected != self.last_processed {
            self.cache.clear_displayed();
            self.thumb_exists = false;
            dirty = true;
            // While scrolling fast, wait until the selection settles.
            if !frame.nav_held {
                self.evaluate_selection(frame, resolver);
            }
        }

        if self.thumb_exists && !self.cache.is_displayed_valid() {
            if let Some(index) = self.last_processed {
                if self.cache.find(index).is_some() {
                    debug!(list_index = index, "thumb: ready");
                    self.show(index, frame);
                    dirty = true;
                }
            }
        }

        if self.thumb_exists
            && self.cache.displayed_index().is_some()
            && !self.cache.is_displayed_valid()
        {
            debug!(
                list_index = ?self.cache.displayed_index(),
                "thumb: displayed entry evicted, re-requesting"
            );
            self.last_processed = None;
            dirty = true;
        }

        if self.fade.is_active() && self.cache.displayed_data().is_some() {
            if frame.supports_alpha {
                dirty |= self.fade.update(frame.now_ms);
            } else {
                // Opacity went away mid-fade; show the image solid.
                self.fade.reset();
                dirty = true;
            }
        }

        dirty
    }

    /// Fresh lookup of what to draw right now.
    pub fn displayed(&self) -> Option<DisplayedThumbnail<'_, T>> {
        let list_index = self.cache.displayed_index()?;
        let image = self.cache.displayed_data()?;
        Some(DisplayedThumbnail {
            list_index,
            image,
            alpha: self.fade.alpha(),
        })
    }

    /// Draws the displayed thumbnail, if any. Returns whether anything was drawn.
    pub fn present<S: ThumbnailSurface<T>>(&self, surface: &mut S) -> bool {
        let Some(shown) = self.displayed() else {
            return false;
        };
        let alpha = if surface.supports_alpha_mod() {
            shown.alpha
        } else {
            ALPHA_MAX
        };
        surface.draw(shown.image, alpha);
        true
    }

    /// Whether the selected entry has a thumbnail file, even if it is still
    /// loading. Layout uses this to reserve room for the preview.
    pub fn thumbnail_expected(&self) -> bool {
        self.thumb_exists
    }

    /// Nothing more will change for `selected` without new input: its
    /// thumbnail is absent, or shown and fully faded in.
    pub fn is_settled(&self, selected: Option<usize>) -> bool {
        if self.last_processed != selected {
            return false;
        }
        if !self.thumb_exists {
            return true;
        }
        self.cache.is_displayed_valid() && !self.fade.is_active()
    }

    pub fn has_loader(&self) -> bool {
        self.loader.as_ref().is_some_and(ThumbnailLoader::is_running)
    }

    pub fn cache(&self) -> &ThumbnailCache<T> {
        &self.cache
    }

    pub fn fade(&self) -> &FadeState {
        &self.fade
    }

    /// Stops the loader and releases every cached image.
    pub fn shutdown(&mut self) {
        if let Some(loader) = self.loader.as_mut() {
            loader.shutdown();
        }
        self.cache.clear();
        self.thumb_exists = false;
        self.fade.reset();
    }

    /// Moves a finished load into the cache. Returns true when the frame
    /// needs a redraw because of it.
    fn accept_result<R: ThumbnailResolver>(
        &mut self,
        result: LoadResult<T>,
        frame: &FrameInput<'_>,
        resolver: &mut R,
    ) -> bool {
        let LoadResult {
            image,
            list_index,
            source_path,
        } = result;

        // Loads started for an earlier listing land on unrelated indices.
        let expected = frame
            .entries
            .get(list_index)
            .and_then(|entry| resolver.thumb_path(entry));
        if expected.as_deref() != Some(source_path.as_path()) {
            debug!(list_index, "thumb: dropped result from another listing");
            return false;
        }

        match image {
            Some(image) => {
                self.cache.push(list_index, &source_path, image);
                false
            }
            None => {
                debug!(list_index, "thumb: no usable image");
                let is_selected = self.last_processed == Some(list_index);
                if is_selected && self.thumb_exists && self.cache.find(list_index).is_none() {
                    self.thumb_exists = false;
                    return true;
                }
                false
            }
        }
    }

    fn evaluate_selection<R: ThumbnailResolver>(&mut self, frame: &FrameInput<'_>, resolver: &mut R) {
        let previous = self.last_selected;
        self.last_processed = frame.selected;
        self.last_selected = frame.selected;

        let Some((index, entry)) = frame
            .selected
            .and_then(|index| frame.entries.get(index).map(|entry| (index, entry)))
        else {
            return;
        };
        let Some(thumb_path) = resolver.thumb_path(entry) else {
            return;
        };
        self.thumb_exists = true;

        let hint = hint_index(index, previous, frame.entries.len()).and_then(|next| {
            resolver
                .thumb_path(&frame.entries[next])
                .map(|path| PreloadHint {
                    path,
                    list_index: next,
                })
        });

        if self.cache.find(index).is_some() {
            debug!(list_index = index, "thumb: hit");
            self.show(index, frame);
            if let Some(hint) = hint.filter(|hint| self.cache.find(hint.list_index).is_none()) {
                self.submit(
                    LoadRequest::preload(hint.path, hint.list_index, self.max_width, self.max_height),
                    None,
                );
            }
            return;
        }

        debug!(
            list_index = index,
            hint = ?hint.as_ref().map(|hint| hint.list_index),
            "thumb: miss, requesting"
        );
        self.submit(
            LoadRequest::current(thumb_path, index, self.max_width, self.max_height),
            hint,
        );
    }

    fn show(&mut self, index: usize, frame: &FrameInput<'_>) {
        self.cache.set_displayed(index);
        if frame.supports_alpha {
            self.fade.start(frame.now_ms);
        } else {
            self.fade.reset();
        }
    }

    fn submit(&self, request: LoadRequest, hint: Option<PreloadHint>) {
        if let Some(loader) = &self.loader {
            loader.submit(request, hint);
        }
    }
}

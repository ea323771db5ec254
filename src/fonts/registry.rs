// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Font registry

use super::{FontRecord, GlyphSource};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::collections::hash_map::{Entry, HashMap};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Font fetch errors
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("font read error")]
    Io(#[from] std::io::Error),
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
    #[error("font fetch failed: {0}")]
    Other(String),
}

/// Font parse errors
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("font parse error")]
    Ttf(#[from] ttf_parser::FaceParsingError),
    #[error("font face not supported by shaper")]
    Shaping,
    #[error("font parse error: {0}")]
    Other(String),
}

/// Font load errors
///
/// Cloned for every caller waiting on the same load.
#[derive(Error, Debug, Clone)]
pub enum FontError {
    #[error("failed to fetch font {url}")]
    Fetch {
        url: String,
        source: Arc<FetchError>,
    },
    #[error("failed to parse font {url}")]
    Parse {
        url: String,
        source: Arc<ParseError>,
    },
    /// The requested font failed, then so did the default font
    #[error("font {requested} failed to load and so did the default font {default}")]
    DefaultFontFailed {
        requested: String,
        default: String,
        source: Box<FontError>,
    },
}

/// Network (or other) source of font bytes
///
/// Called on a background thread.
pub trait FontFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Font parser
///
/// Called on a background thread.
pub trait FontParser: Send + Sync {
    fn parse(&self, data: Vec<u8>) -> Result<Arc<dyn GlyphSource>, ParseError>;
}

/// Reads `file://` URLs and plain paths from the local file system
#[derive(Clone, Copy, Debug, Default)]
pub struct FileFetcher;

impl FontFetcher for FileFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let path = match url.strip_prefix("file://") {
            Some(path) => path,
            None if url.contains("://") => {
                let scheme = url.split("://").next().unwrap_or_default();
                return Err(FetchError::UnsupportedScheme(scheme.to_string()));
            }
            None => url,
        };
        Ok(std::fs::read(path)?)
    }
}

/// Font load completion handler
pub type FontCallback = Box<dyn FnOnce(Result<Arc<FontRecord>, FontError>)>;

struct Waiter {
    /// The URL this waiter asked for
    requested: String,
    callback: FontCallback,
}

struct Completion {
    url: String,
    result: Result<FontRecord, FontError>,
}

/// Loads and caches fonts by URL
///
/// Loads run on background threads; their results are delivered on the
/// thread calling [`FontRegistry::poll`] or [`FontRegistry::wait`], which is
/// also where callbacks run. Concurrent loads of one URL share one fetch.
///
/// A failed font is retried once as the default font; if that fails too the
/// callers receive [`FontError::DefaultFontFailed`]. Failures are not
/// cached, so a later request will try again.
pub struct FontRegistry {
    default_url: String,
    fetcher: Arc<dyn FontFetcher>,
    parser: Arc<dyn FontParser>,
    fonts: HashMap<String, Arc<FontRecord>>,
    pending: HashMap<String, Vec<Waiter>>,
    send: Sender<Completion>,
    recv: Receiver<Completion>,
}

impl FontRegistry {
    /// Construct
    pub fn new(
        default_url: impl Into<String>,
        fetcher: Arc<dyn FontFetcher>,
        parser: Arc<dyn FontParser>,
    ) -> Self {
        let (send, recv) = unbounded();
        FontRegistry {
            default_url: default_url.into(),
            fetcher,
            parser,
            fonts: HashMap::new(),
            pending: HashMap::new(),
            send,
            recv,
        }
    }

    /// URL of the default font
    pub fn default_url(&self) -> &str {
        &self.default_url
    }

    /// Get a loaded font
    pub fn get(&self, url: &str) -> Option<&Arc<FontRecord>> {
        self.fonts.get(url)
    }

    /// Register an already-parsed font under `url`
    ///
    /// Does nothing if a font is already loaded for `url`.
    pub fn register(&mut self, url: &str, source: Arc<dyn GlyphSource>) -> Arc<FontRecord> {
        self.fonts
            .entry(url.to_string())
            .or_insert_with(|| Arc::new(FontRecord::new(url, source)))
            .clone()
    }

    /// Number of distinct URLs currently loading
    pub fn num_pending(&self) -> usize {
        self.pending.len()
    }

    /// Load a font
    ///
    /// If the font is cached, `callback` is called immediately. Otherwise it
    /// is called from a later [`Self::poll`] or [`Self::wait`].
    pub fn load(&mut self, url: &str, callback: FontCallback) {
        let waiter = Waiter {
            requested: url.to_string(),
            callback,
        };
        self.load_for(url, waiter);
    }

    fn load_for(&mut self, url: &str, waiter: Waiter) {
        if let Some(font) = self.fonts.get(url) {
            log::trace!("font cache hit: {url}");
            (waiter.callback)(Ok(font.clone()));
            return;
        }

        let start = match self.pending.entry(url.to_string()) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().push(waiter);
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(vec![waiter]);
                true
            }
        };
        if start {
            log::debug!("loading font: {url}");
            self.spawn_load(url.to_string());
        }
    }

    fn spawn_load(&self, url: String) {
        let fetcher = self.fetcher.clone();
        let parser = self.parser.clone();
        let send = self.send.clone();
        let job = move |url: String| {
            let result = load_font(&*fetcher, &*parser, &url);
            // The receiver lives as long as the registry
            let _ = send.send(Completion { url, result });
        };

        let thread_url = url.clone();
        let job_in_thread = job.clone();
        let spawned = std::thread::Builder::new()
            .name("font-load".into())
            .spawn(move || job_in_thread(thread_url));
        if let Err(err) = spawned {
            log::warn!("failed to spawn font loader thread ({err}); loading inline");
            job(url);
        }
    }

    /// Deliver completed loads
    ///
    /// Returns the number of loads (successful or not) delivered.
    pub fn poll(&mut self) -> usize {
        let mut n = 0;
        while let Ok(completion) = self.recv.try_recv() {
            self.complete(completion);
            n += 1;
        }
        n
    }

    /// Block until at least one load completes (or `timeout` elapses), then
    /// deliver all completed loads
    pub fn wait(&mut self, timeout: Duration) -> usize {
        if self.pending.is_empty() {
            return 0;
        }
        match self.recv.recv_timeout(timeout) {
            Ok(completion) => {
                self.complete(completion);
                1 + self.poll()
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }

    fn complete(&mut self, completion: Completion) {
        let Completion { url, result } = completion;
        let waiters = self.pending.remove(&url).unwrap_or_default();

        match result {
            Ok(record) => {
                log::debug!("loaded font: {url}");
                let font = Arc::new(record);
                self.fonts.insert(url, font.clone());
                for waiter in waiters {
                    (waiter.callback)(Ok(font.clone()));
                }
            }
            Err(err) if url != self.default_url => {
                log::warn!("{err}; falling back to default font");
                let default_url = self.default_url.clone();
                for waiter in waiters {
                    self.load_for(&default_url, waiter);
                }
            }
            Err(err) => {
                log::error!("default font failed: {err}");
                for waiter in waiters {
                    let result = if waiter.requested == url {
                        err.clone()
                    } else {
                        FontError::DefaultFontFailed {
                            requested: waiter.requested,
                            default: url.clone(),
                            source: Box::new(err.clone()),
                        }
                    };
                    (waiter.callback)(Err(result));
                }
            }
        }
    }
}

fn load_font(
    fetcher: &dyn FontFetcher,
    parser: &dyn FontParser,
    url: &str,
) -> Result<FontRecord, FontError> {
    let data = fetcher.fetch(url).map_err(|err| FontError::Fetch {
        url: url.to_string(),
        source: Arc::new(err),
    })?;
    let source = parser.parse(data).map_err(|err| FontError::Parse {
        url: url.to_string(),
        source: Arc::new(err),
    })?;
    Ok(FontRecord::new(url, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::mock::MockFont;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TestFetcher {
        fetches: AtomicUsize,
    }

    impl FontFetcher for TestFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if url.contains("missing") {
                Err(FetchError::Other("not found".into()))
            } else {
                Ok(url.as_bytes().to_vec())
            }
        }
    }

    struct TestParser;

    impl FontParser for TestParser {
        fn parse(&self, _: Vec<u8>) -> Result<Arc<dyn GlyphSource>, ParseError> {
            Ok(Arc::new(MockFont::new()))
        }
    }

    type Results = Rc<RefCell<Vec<Result<String, FontError>>>>;

    fn registry(default: &str) -> (FontRegistry, Arc<TestFetcher>) {
        let fetcher = Arc::new(TestFetcher::default());
        let registry = FontRegistry::new(default, fetcher.clone(), Arc::new(TestParser));
        (registry, fetcher)
    }

    fn callback(results: &Results) -> FontCallback {
        let results = results.clone();
        Box::new(move |r| {
            results
                .borrow_mut()
                .push(r.map(|font| font.url().to_string()));
        })
    }

    fn drain(registry: &mut FontRegistry) {
        while registry.num_pending() > 0 {
            registry.wait(Duration::from_secs(5));
        }
    }

    #[test]
    fn dedupe_concurrent_loads() {
        let (mut registry, fetcher) = registry("default");
        let results = Results::default();
        registry.load("a", callback(&results));
        registry.load("a", callback(&results));
        assert_eq!(registry.num_pending(), 1);
        drain(&mut registry);

        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 1);
        let results = results.borrow();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| matches!(r.as_deref(), Ok("a"))));
    }

    #[test]
    fn cached_load_is_immediate() {
        let (mut registry, fetcher) = registry("default");
        let results = Results::default();
        registry.load("a", callback(&results));
        drain(&mut registry);
        registry.load("a", callback(&results));
        assert_eq!(results.borrow().len(), 2);
        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn falls_back_to_default() {
        let (mut registry, _) = registry("default");
        let results = Results::default();
        registry.load("missing", callback(&results));
        drain(&mut registry);
        assert_eq!(results.borrow()[0].as_deref().ok(), Some("default"));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn default_failure_is_terminal() {
        let (mut registry, fetcher) = registry("missing-default");
        let results = Results::default();
        registry.load("missing-font", callback(&results));
        drain(&mut registry);

        // One fetch of the font, one of the default; no retry loop
        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 2);
        assert!(matches!(
            results.borrow()[0],
            Err(FontError::DefaultFontFailed { ref requested, .. }) if requested == "missing-font"
        ));

        registry.load("missing-default", callback(&results));
        drain(&mut registry);
        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 3);
        assert!(matches!(results.borrow()[1], Err(FontError::Fetch { .. })));
    }

    #[test]
    fn file_fetcher_rejects_http() {
        let result = FileFetcher.fetch("https://example.com/font.ttf");
        assert!(matches!(result, Err(FetchError::UnsupportedScheme(s)) if s == "https"));
    }
}

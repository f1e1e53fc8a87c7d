//! URL pattern learning.
//!
//! [`PatternLearner`] turns (old, new) example URL pairs into positional
//! templates and maps fresh URLs that fit a known template onto the most
//! recent example seen for it.

pub mod registry;
pub mod template;

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

pub use registry::{PatternMap, RegistryError, UrlPattern};
pub use template::{TemplateSegment, UrlTemplate, path_segments};

/// Template registry shared by every crawl session in the process.
///
/// All reads and the load-merge-save cycle go through one async mutex, so
/// concurrent sessions never lose each other's templates.
#[derive(Debug)]
pub struct PatternLearner {
    path: PathBuf,
    patterns: Mutex<PatternMap>,
}

impl PatternLearner {
    /// Empty learner bound to `path`; nothing is read yet
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            patterns: Mutex::new(PatternMap::new()),
        }
    }

    /// Learner loaded from `path`.
    ///
    /// An unreadable or corrupt registry is logged and replaced by an empty one.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let learner = Self::new(path);
        match learner.load().await {
            Ok(count) => {
                log::debug!(target: "sitemirror::patterns", "Loaded {count} URL patterns from {}", learner.path.display());
            }
            Err(e) => {
                log::warn!(target: "sitemirror::patterns", "Starting with an empty pattern registry: {e}");
            }
        }
        learner
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Merge the on-disk registry into memory; returns the resulting template count
    pub async fn load(&self) -> Result<usize, RegistryError> {
        let mut patterns = self.patterns.lock().await;
        let on_disk = registry::read_registry(&self.path).await?;
        let merged = registry::merge(on_disk, &patterns);
        *patterns = merged;
        Ok(patterns.len())
    }

    /// Merge memory into the on-disk registry and write it back atomically.
    ///
    /// Templates only present on disk are kept; for shared templates the newer
    /// entry wins. A corrupt file on disk is overwritten.
    pub async fn save(&self) -> Result<(), RegistryError> {
        let mut patterns = self.patterns.lock().await;

        let on_disk = match registry::read_registry(&self.path).await {
            Ok(on_disk) => on_disk,
            Err(e @ RegistryError::Corrupt { .. }) => {
                log::warn!(target: "sitemirror::patterns", "Overwriting corrupt registry: {e}");
                PatternMap::new()
            }
            Err(e) => return Err(e),
        };

        let merged = registry::merge(on_disk, &patterns);
        registry::write_registry(&self.path, &merged).await?;

        log::debug!(
            target: "sitemirror::patterns",
            "Saved {} URL patterns to {}",
            merged.len(),
            self.path.display()
        );
        *patterns = merged;
        Ok(())
    }

    /// Learn a template from an example pair.
    ///
    /// Returns the template string, or `None` when the paths have different
    /// segment counts and cannot be aligned.
    pub async fn learn(&self, old_url: &str, new_url: &str) -> Option<String> {
        let Some(template) = UrlTemplate::learn(old_url, new_url) else {
            log::warn!(
                target: "sitemirror::patterns",
                "Skipping unmatchable pair: {old_url} and {new_url} have different path lengths"
            );
            return None;
        };

        let key = template.to_string();
        self.patterns
            .lock()
            .await
            .insert(key.clone(), UrlPattern::new(old_url, new_url));

        log::info!(target: "sitemirror::patterns", "Learned URL pattern {key} ({old_url} -> {new_url})");
        Some(key)
    }

    /// Map `url` onto the stored `example_new` of the first matching template.
    ///
    /// The stored example is returned as-is; placeholders are not substituted.
    /// URLs that fit no template come back unchanged.
    pub async fn normalize(&self, url: &str) -> String {
        let patterns = self.patterns.lock().await;
        for (key, pattern) in patterns.iter() {
            if UrlTemplate::parse(key).matches(url) {
                log::debug!(target: "sitemirror::patterns", "{url} matches {key}");
                return pattern.example_new.clone();
            }
        }
        url.to_string()
    }

    /// Copy of the current templates for matching outside the async lock
    pub async fn snapshot(&self) -> PatternSnapshot {
        let patterns = self.patterns.lock().await;
        PatternSnapshot {
            templates: patterns
                .iter()
                .map(|(key, pattern)| (UrlTemplate::parse(key), pattern.example_new.clone()))
                .collect(),
        }
    }

    pub async fn get(&self, template: &str) -> Option<UrlPattern> {
        self.patterns.lock().await.get(template).cloned()
    }

    /// Known templates in matching order
    pub async fn templates(&self) -> Vec<String> {
        self.patterns.lock().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.patterns.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.patterns.lock().await.is_empty()
    }
}

/// Templates frozen at one point in time, in matching order.
///
/// Page preparation runs synchronously over a parsed document and cannot
/// await the learner, so it matches against one of these instead.
#[derive(Debug, Clone, Default)]
pub struct PatternSnapshot {
    templates: Vec<(UrlTemplate, String)>,
}

impl PatternSnapshot {
    /// Stored `example_new` of the first template `url` fits
    pub fn normalize(&self, url: &str) -> Option<&str> {
        self.templates
            .iter()
            .find(|(template, _)| template.matches(url))
            .map(|(_, example_new)| example_new.as_str())
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

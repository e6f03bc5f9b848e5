//! Direct mode: editing the live preference store of the logged in user.
//!
//! Only the three section keys are read and written. Everything else in the
//! domain belongs to the dock and is left to the preference daemon.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use plist::{Dictionary, Value};

use crate::io::elevate::DefaultsCodec;
use crate::io::plist_io;
use crate::io::reload::{ReloadOutcome, ReloadRace};
use crate::io::session::SessionSignal;
use crate::io::store::{DockStore, StoreError, StoreMode};
use crate::model::document::{Document, section_tiles};
use crate::model::section::{Section, Sections};

/// Key the dock bumps every time it rewrites its own preferences
pub const MOD_COUNT_KEY: &str = "mod-count";

/// How often the settle wait re-reads the modification count
pub const SETTLE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A key/value preference domain
pub trait PreferenceStore {
    fn get(&mut self, key: &str) -> Result<Option<Value>, StoreError>;
    /// Stage a value; nothing is persisted until [`PreferenceStore::synchronize`]
    fn set(&mut self, key: &str, value: Value);
    fn synchronize(&mut self) -> Result<(), StoreError>;
    /// The domain's modification counter, 0 when unset
    fn modification_count(&mut self) -> Result<i64, StoreError>;
}

/// A preference domain accessed through `defaults export/import`
pub struct DefaultsPreferences {
    domain: String,
    codec: DefaultsCodec,
    cache: Option<Dictionary>,
    pending: Dictionary,
}

impl DefaultsPreferences {
    pub fn new(domain: &str) -> Self {
        DefaultsPreferences {
            domain: domain.to_string(),
            codec: DefaultsCodec::default(),
            cache: None,
            pending: Dictionary::new(),
        }
    }

    fn export(&self) -> Result<Dictionary, StoreError> {
        let bytes = self.codec.export(&self.domain)?;
        plist_io::decode(&bytes, Path::new(&self.domain))
    }

    fn snapshot(&mut self) -> Result<&Dictionary, StoreError> {
        if self.cache.is_none() {
            self.cache = Some(self.export()?);
        }
        Ok(self.cache.get_or_insert_with(Dictionary::new))
    }
}

impl PreferenceStore for DefaultsPreferences {
    fn get(&mut self, key: &str) -> Result<Option<Value>, StoreError> {
        if let Some(value) = self.pending.get(key) {
            return Ok(Some(value.clone()));
        }
        Ok(self.snapshot()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) {
        self.pending.insert(key.to_string(), value);
    }

    fn synchronize(&mut self) -> Result<(), StoreError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        // Merge into a fresh export so keys the dock changed meanwhile survive
        let mut merged = self.export()?;
        for (key, value) in std::mem::take(&mut self.pending) {
            merged.insert(key, value);
        }
        self.codec.import(&self.domain, &merged)?;
        self.cache = Some(merged);
        Ok(())
    }

    fn modification_count(&mut self) -> Result<i64, StoreError> {
        let fresh = self.export()?;
        let count = fresh
            .get(MOD_COUNT_KEY)
            .and_then(Value::as_signed_integer)
            .unwrap_or(0);
        self.cache = Some(fresh);
        Ok(count)
    }
}

/// The live dock of the session we run as
pub struct DirectStore<P, S> {
    path: PathBuf,
    prefs: P,
    signal: S,
    reload_timeout: Duration,
    /// How long to wait for a freshly set up dock to finish writing
    modification_wait: Option<Duration>,
    poll_interval: Duration,
    /// Section keys that existed when the document was read
    present: [bool; 3],
}

impl<P: PreferenceStore, S: SessionSignal> DirectStore<P, S> {
    pub fn new(
        path: PathBuf,
        prefs: P,
        signal: S,
        reload_timeout: Duration,
        modification_wait: Option<Duration>,
    ) -> Self {
        DirectStore {
            path,
            prefs,
            signal,
            reload_timeout,
            modification_wait,
            poll_interval: SETTLE_POLL_INTERVAL,
            present: [false; 3],
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// A new account's dock rewrites its preferences a couple of times on
    /// first login. Edits made before that are lost, so wait until the
    /// modification count shows the dock has settled.
    fn wait_for_modifications(&mut self) -> Result<(), StoreError> {
        let Some(wait) = self.modification_wait else {
            return Ok(());
        };
        let start = Instant::now();
        loop {
            let count = self.prefs.modification_count()?;
            if count >= 2 {
                return Ok(());
            }
            if start.elapsed() >= wait {
                tracing::warn!(count, "dock preferences still settling, continuing anyway");
                return Ok(());
            }
            tracing::debug!(count, "waiting for dock preferences to settle");
            thread::sleep(self.poll_interval);
        }
    }
}

impl<P: PreferenceStore, S: SessionSignal> DockStore for DirectStore<P, S> {
    fn mode(&self) -> StoreMode {
        StoreMode::Direct
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn read(&mut self) -> Result<Document, StoreError> {
        self.wait_for_modifications()?;
        let mut sections = Sections::new();
        for section in Section::ALL {
            let value = self.prefs.get(section.key())?;
            self.present[section.slot()] = value.is_some();
            sections.set(section, section_tiles(value.as_ref(), section));
        }
        Ok(Document::from_sections(sections))
    }

    fn write(&mut self, doc: &Document, reload: bool) -> Result<(), StoreError> {
        for section in Section::ALL {
            if self.present[section.slot()] || doc.sections.len(section) > 0 {
                self.prefs.set(section.key(), doc.section_value(section));
            }
        }
        self.prefs.synchronize()?;

        if !reload {
            return Ok(());
        }
        // Only changes after the reload request count as the dock's answer
        let race = ReloadRace::arm(&self.path);
        race.discard_pending();
        if let Err(e) = self.signal.request_reload() {
            tracing::warn!(error = %e, "reload request failed");
        }
        let signal = &self.signal;
        match race.finish(self.reload_timeout, || signal.force_restart())? {
            ReloadOutcome::Observed => tracing::info!("dock reloaded"),
            ReloadOutcome::ForcedRestart => tracing::info!("dock restarted"),
        }
        Ok(())
    }
}

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::io::elevate::DefaultsCodec;
use crate::io::plist_io::{self, DocumentCodec, PlistFile};
use crate::io::prefs::{DefaultsPreferences, DirectStore};
use crate::io::session::{
    DOCK_DOMAIN, LaunchdSignal, Session, SessionSignal, account_for_uid, is_console_document,
    is_live_document,
};
use crate::model::document::Document;

/// Error type for reading and writing dock documents
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not read dock document {path}: {reason}")]
    DocumentUnreadable { path: PathBuf, reason: String },
    #[error("could not write dock document {path}: {reason}")]
    DocumentUnwritable { path: PathBuf, reason: String },
    #[error("{program} failed: {reason}")]
    Subprocess { program: String, reason: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which persistence path a store uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// The live preference store of the session we run as
    Direct,
    /// The document file, possibly on behalf of another user
    Indirect,
}

impl std::fmt::Display for StoreMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreMode::Direct => write!(f, "direct"),
            StoreMode::Indirect => write!(f, "indirect"),
        }
    }
}

/// Load and save one dock document
pub trait DockStore {
    fn mode(&self) -> StoreMode;
    fn path(&self) -> &Path;
    /// Read the document. Missing section keys read as empty sections.
    fn read(&mut self) -> Result<Document, StoreError>;
    /// Persist the document and, if `reload` is set, make the dock pick it up.
    fn write(&mut self, doc: &Document, reload: bool) -> Result<(), StoreError>;
}

/// Tunables for opening a store
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    pub reload_timeout: Duration,
    pub modification_wait: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            reload_timeout: Duration::from_millis(250),
            modification_wait: Duration::from_secs(5),
        }
    }
}

/// Pick the persistence mode for `path` and open a store for it.
///
/// The live preference store is used only when `path` is the console user's
/// own document and we are running as that user; everything else goes
/// through the document file.
pub fn open_store(
    path: &Path,
    session: &dyn Session,
    options: &StoreOptions,
) -> Box<dyn DockStore> {
    if is_live_document(session, path) {
        let uid = session.current_uid();
        tracing::debug!(path = %path.display(), "editing the live dock as the logged in user");
        return Box::new(DirectStore::new(
            path.to_path_buf(),
            DefaultsPreferences::new(DOCK_DOMAIN),
            LaunchdSignal { uid },
            options.reload_timeout,
            Some(options.modification_wait),
        ));
    }

    let console_signal = if is_console_document(session, path) {
        session
            .console_user()
            .map(|a| Box::new(LaunchdSignal { uid: a.uid }) as Box<dyn SessionSignal>)
    } else {
        None
    };
    let codec = indirect_codec(path, session);
    tracing::debug!(path = %path.display(), "editing the dock document on disk");
    Box::new(IndirectStore::new(path.to_path_buf(), codec, console_signal))
}

/// On macOS documents go through `defaults`, as the owner when we are root;
/// elsewhere the file is read directly.
fn indirect_codec(path: &Path, session: &dyn Session) -> Box<dyn DocumentCodec> {
    if !cfg!(target_os = "macos") {
        return Box::new(PlistFile);
    }
    let run_as = match plist_io::file_owner(path) {
        Ok(owner) if session.current_uid() == 0 && owner != 0 => {
            account_for_uid(owner).map(|a| a.uid)
        }
        _ => None,
    };
    Box::new(DefaultsCodec { run_as })
}

/// Indirect mode: the whole document is read from and written back to its
/// file. Unmanaged keys are carried through untouched and the file's owner
/// is restored after the rewrite.
pub struct IndirectStore {
    path: PathBuf,
    codec: Box<dyn DocumentCodec>,
    /// Set only when this is the console user's document
    console_signal: Option<Box<dyn SessionSignal>>,
}

impl IndirectStore {
    pub fn new(
        path: PathBuf,
        codec: Box<dyn DocumentCodec>,
        console_signal: Option<Box<dyn SessionSignal>>,
    ) -> Self {
        IndirectStore {
            path,
            codec,
            console_signal,
        }
    }
}

impl DockStore for IndirectStore {
    fn mode(&self) -> StoreMode {
        StoreMode::Indirect
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn read(&mut self) -> Result<Document, StoreError> {
        let root = self.codec.load(&self.path)?;
        Ok(Document::from_dictionary(root))
    }

    fn write(&mut self, doc: &Document, reload: bool) -> Result<(), StoreError> {
        let unwritable = |reason: String| StoreError::DocumentUnwritable {
            path: self.path.clone(),
            reason,
        };
        let owner = plist_io::file_owner(&self.path)
            .map_err(|e| unwritable(format!("unable to get owner: {}", e)))?;

        self.codec.save(&self.path, &doc.to_dictionary())?;
        plist_io::restore_owner(&self.path, owner)
            .map_err(|e| unwritable(format!("unable to restore owner {}: {}", owner, e)))?;

        if reload {
            match &self.console_signal {
                Some(signal) => {
                    tracing::info!("restarting dock for console user");
                    signal.force_restart()?;
                }
                None => tracing::debug!("not the console user's dock, skipping reload"),
            }
        }
        Ok(())
    }
}

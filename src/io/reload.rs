use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::io::store::StoreError;

/// How a reload race ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The document changed on disk before the deadline; no restart needed
    Observed,
    /// The deadline passed and the dock was force-restarted
    ForcedRestart,
}

/// Shared flag telling the losing side of a race to stand down
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
enum RaceEvent {
    Changed,
    Deadline,
}

/// A change watcher on a dock document racing a deadline.
///
/// Arm it after the document has been written and before the dock is asked
/// to reload, so only the dock's own rewrite ends the race early. Then call
/// [`ReloadRace::finish`]. The file watcher and a timer thread both report
/// into one channel; whichever arrives first wins and cancels the other.
pub struct ReloadRace {
    _watcher: Option<RecommendedWatcher>,
    tx: mpsc::Sender<RaceEvent>,
    rx: mpsc::Receiver<RaceEvent>,
    token: CancelToken,
}

impl ReloadRace {
    /// Start watching `path`. If no watcher can be set up, the race can only
    /// end at the deadline.
    pub fn arm(path: &Path) -> Self {
        let (tx, rx) = mpsc::channel();
        let token = CancelToken::default();
        let watcher = match watch_document(path, tx.clone(), token.clone()) {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not watch dock document");
                None
            }
        };
        ReloadRace {
            _watcher: watcher,
            tx,
            rx,
            token,
        }
    }

    /// Drop change events queued so far. Backends that report with some
    /// latency can still deliver events for writes made before arming.
    pub fn discard_pending(&self) {
        let dropped = self.rx.try_iter().count();
        if dropped > 0 {
            tracing::debug!(dropped, "ignoring changes from before the reload request");
        }
    }

    /// Wait for a change or the deadline. On timeout `force` runs
    /// unconditionally; an observed change cancels it.
    pub fn finish<F>(self, timeout: Duration, force: F) -> Result<ReloadOutcome, StoreError>
    where
        F: FnOnce() -> Result<(), StoreError>,
    {
        let deadline_tx = self.tx.clone();
        let deadline_token = self.token.clone();
        thread::spawn(move || {
            thread::sleep(timeout);
            if !deadline_token.is_cancelled() {
                let _ = deadline_tx.send(RaceEvent::Deadline);
            }
        });

        let event = self.rx.recv().unwrap_or(RaceEvent::Deadline);
        self.token.cancel();
        match event {
            RaceEvent::Changed => {
                tracing::debug!("dock document changed, skipping forced restart");
                Ok(ReloadOutcome::Observed)
            }
            RaceEvent::Deadline => {
                tracing::debug!("timed out waiting for dock document update");
                force()?;
                Ok(ReloadOutcome::ForcedRestart)
            }
        }
    }
}

/// Watch the document's directory (preference files are replaced, not
/// edited in place) and report changes to the document itself.
fn watch_document(
    path: &Path,
    tx: mpsc::Sender<RaceEvent>,
    token: CancelToken,
) -> Result<RecommendedWatcher, notify::Error> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let name: Option<OsString> = path.file_name().map(|n| n.to_os_string());

    let mut watcher = RecommendedWatcher::new(
        move |result: Result<Event, notify::Error>| {
            let event = match result {
                Ok(e) => e,
                Err(_) => return,
            };
            if token.is_cancelled() {
                return;
            }
            match event.kind {
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
                _ => return,
            }
            let relevant = event
                .paths
                .iter()
                .any(|p| p.file_name().map(|n| n.to_os_string()) == name);
            if relevant {
                let _ = tx.send(RaceEvent::Changed);
            }
        },
        Config::default(),
    )?;

    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::TempDir;

    #[test]
    fn test_deadline_forces_restart() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("com.apple.dock.plist");
        std::fs::write(&path, b"x").unwrap();

        let race = ReloadRace::arm(&path);
        let forced = Cell::new(false);
        let outcome = race
            .finish(Duration::from_millis(50), || {
                forced.set(true);
                Ok(())
            })
            .unwrap();
        assert_eq!(outcome, ReloadOutcome::ForcedRestart);
        assert!(forced.get());
    }

    #[test]
    fn test_observed_change_cancels_restart() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("com.apple.dock.plist");
        let race = ReloadRace::arm(&path);
        race.tx.send(RaceEvent::Changed).unwrap();

        let forced = Cell::new(false);
        let outcome = race
            .finish(Duration::from_secs(30), || {
                forced.set(true);
                Ok(())
            })
            .unwrap();
        assert_eq!(outcome, ReloadOutcome::Observed);
        assert!(!forced.get());
    }

    #[test]
    fn test_discarded_change_does_not_end_race() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("com.apple.dock.plist");
        let race = ReloadRace::arm(&path);
        race.tx.send(RaceEvent::Changed).unwrap();
        race.discard_pending();

        let outcome = race
            .finish(Duration::from_millis(50), || Ok(()))
            .unwrap();
        assert_eq!(outcome, ReloadOutcome::ForcedRestart);
    }

    #[test]
    fn test_write_after_arming_is_observed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("com.apple.dock.plist");
        std::fs::write(&path, b"before").unwrap();

        let race = ReloadRace::arm(&path);
        std::fs::write(&path, b"after").unwrap();
        let outcome = race
            .finish(Duration::from_secs(10), || Ok(()))
            .unwrap();
        assert_eq!(outcome, ReloadOutcome::Observed);
    }

    #[test]
    fn test_unwatchable_path_still_times_out() {
        let race = ReloadRace::arm(Path::new("/nonexistent-dir-for-reload-test/dock.plist"));
        let outcome = race
            .finish(Duration::from_millis(20), || Ok(()))
            .unwrap();
        assert_eq!(outcome, ReloadOutcome::ForcedRestart);
    }

    #[test]
    fn test_force_error_propagates() {
        let race = ReloadRace::arm(Path::new("/nonexistent-dir-for-reload-test/dock.plist"));
        let result = race.finish(Duration::from_millis(20), || {
            Err(StoreError::Subprocess {
                program: "launchctl".into(),
                reason: "exit status: 1".into(),
            })
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_cancel_token_shared() {
        let token = CancelToken::default();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }
}

//! State machine running the pipeline stages in a background thread

use super::{
    import, parse, scan, CheckStateChange, EventBus, ImportEvent, ImportSummary, PipelineResult,
    StageContext,
};
use crate::store::{LibraryStore, WorkspaceLibraryDb};
use crate::{ImportSettings, MessageLogger};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// Pipeline state
///
/// ```text
/// Reset → Scanning → Scanned → Parsing → Parsed → Importing → Imported
/// ```
///
/// A cancelled scan returns to `Reset`, a cancelled parse or import to
/// `Scanned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Reset,
    Scanning,
    Scanned,
    Parsing,
    Parsed,
    Importing,
    Imported,
}

struct StageOutput {
    result: PipelineResult,
    summary: Option<ImportSummary>,
}

/// Imports KiCad libraries into a destination library
///
/// Only one stage runs at a time. The result is owned by the running stage
/// and handed back when it finished; every accessor waits for the running
/// stage first.
pub struct ImportController {
    db: Arc<dyn WorkspaceLibraryDb>,
    store: LibraryStore,
    settings: ImportSettings,
    log: MessageLogger,
    events: EventBus,
    abort: Arc<AtomicBool>,
    state: Arc<Mutex<State>>,
    result: PipelineResult,
    summary: Option<ImportSummary>,
    task: Option<JoinHandle<StageOutput>>,
    libs_path: Option<PathBuf>,
    shapes_3d_path: Option<PathBuf>,
}

impl ImportController {
    pub fn new(
        db: Arc<dyn WorkspaceLibraryDb>,
        destination: impl Into<PathBuf>,
        settings: ImportSettings,
        log: MessageLogger,
    ) -> Self {
        Self {
            db,
            store: LibraryStore::new(destination),
            settings,
            log,
            events: EventBus::new(),
            abort: Arc::new(AtomicBool::new(false)),
            state: Arc::new(Mutex::new(State::Reset)),
            result: PipelineResult::default(),
            summary: None,
            task: None,
            libs_path: None,
            shapes_3d_path: None,
        }
    }

    pub fn state(&self) -> State {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn log(&self) -> &MessageLogger {
        &self.log
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    /// Settings used by the next import
    pub fn settings_mut(&mut self) -> &mut ImportSettings {
        &mut self.settings
    }

    pub fn libs_path(&self) -> Option<&Path> {
        self.libs_path.as_deref()
    }

    pub fn shapes_3d_path(&self) -> Option<&Path> {
        self.shapes_3d_path.as_deref()
    }

    /// Handle to request cancellation from another thread, e.g. a signal
    /// handler
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Block until the running stage has finished
    pub fn wait(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        match task.join() {
            Ok(output) => {
                self.result = output.result;
                if output.summary.is_some() {
                    self.summary = output.summary;
                }
            }
            Err(_) => {
                self.log.critical("Background task failed unexpectedly.");
                self.result = PipelineResult::default();
                self.set_state(State::Reset);
            }
        }
    }

    /// The result of the last finished stage
    pub fn result(&mut self) -> &PipelineResult {
        self.wait();
        &self.result
    }

    /// Counts of the last import, if any
    pub fn import_summary(&mut self) -> Option<ImportSummary> {
        self.wait();
        self.summary
    }

    /// Stop the running stage and wait for it
    pub fn cancel(&mut self) {
        self.abort.store(true, Ordering::SeqCst);
        self.wait();
    }

    /// Cancel and forget everything
    pub fn reset(&mut self) {
        self.cancel();
        self.set_state(State::Reset);
        self.result = PipelineResult::default();
        self.summary = None;
        self.libs_path = None;
        self.shapes_3d_path = None;
    }

    /// A parsed or imported result must be scanned again before parsing
    pub fn can_start_parsing(&mut self) -> bool {
        self.state() == State::Scanned && self.result().file_count > 0
    }

    pub fn can_start_selecting(&mut self) -> bool {
        matches!(self.state(), State::Parsed | State::Imported) && self.result().has_elements()
    }

    pub fn can_start_import(&mut self) -> bool {
        matches!(self.state(), State::Parsed | State::Imported)
            && self.result().has_pending_import()
    }

    /// Start scanning `libs` and `shapes_3d` for KiCad libraries
    pub fn start_scan(&mut self, libs: &Path, shapes_3d: Option<&Path>) -> bool {
        self.wait();
        if self.state() != State::Reset {
            self.log.critical("Unexpected state.");
            self.events.emit(ImportEvent::ScanFinished);
            return false;
        }
        self.libs_path = Some(libs.to_path_buf());
        self.shapes_3d_path = shapes_3d.map(Path::to_path_buf);

        let libs = libs.to_path_buf();
        let shapes_3d = self.shapes_3d_path.clone();
        self.spawn(State::Scanning, move |_, ctx| {
            let result = scan(&libs, shapes_3d.as_deref(), &ctx);
            let next = if ctx.is_aborted() {
                State::Reset
            } else {
                State::Scanned
            };
            (result, None, next, ImportEvent::ScanFinished)
        });
        true
    }

    /// Start parsing the scanned libraries
    pub fn start_parse(&mut self) -> bool {
        self.wait();
        if self.state() != State::Scanned {
            self.log.critical("Unexpected state.");
            self.events.emit(ImportEvent::ParseFinished);
            return false;
        }

        let db = Arc::clone(&self.db);
        let settings = self.settings.clone();
        self.spawn(State::Parsing, move |mut result, ctx| {
            parse(&mut result, db.as_ref(), &settings, &ctx);
            let next = if ctx.is_aborted() {
                State::Scanned
            } else {
                State::Parsed
            };
            (result, None, next, ImportEvent::ParseFinished)
        });
        true
    }

    /// Start importing the selected elements
    pub fn start_import(&mut self) -> bool {
        self.wait();
        if self.state() != State::Parsed {
            self.log.critical("Unexpected state.");
            self.events.emit(ImportEvent::ImportFinished);
            return false;
        }

        let db = Arc::clone(&self.db);
        let settings = self.settings.clone();
        let store = self.store.clone();
        self.spawn(State::Importing, move |result, ctx| {
            let summary = import(&result, &store, db.as_ref(), &settings, &ctx);
            let next = if ctx.is_aborted() {
                // The "already imported" state is outdated now
                State::Scanned
            } else {
                State::Imported
            };
            (result, Some(summary), next, ImportEvent::ImportFinished)
        });
        true
    }

    pub fn set_symbol_checked(&mut self, lib_name: &str, name: &str, checked: bool) {
        self.wait();
        let changes = self.result.set_symbol_checked(lib_name, name, checked);
        self.notify(changes);
    }

    pub fn set_component_checked(&mut self, lib_name: &str, name: &str, checked: bool) {
        self.wait();
        let changes = self.result.set_component_checked(lib_name, name, checked);
        self.notify(changes);
    }

    pub fn set_device_checked(&mut self, lib_name: &str, name: &str, checked: bool) {
        self.wait();
        let changes = self.result.set_device_checked(lib_name, name, checked);
        self.notify(changes);
    }

    pub fn set_package_checked(&mut self, lib_name: &str, name: &str, checked: bool) {
        self.wait();
        let changes = self.result.set_package_checked(lib_name, name, checked);
        self.notify(changes);
    }

    fn notify(&self, changes: Vec<CheckStateChange>) {
        for change in changes {
            self.events.emit(ImportEvent::CheckStateChanged(change));
        }
    }

    fn set_state(&self, state: State) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Run `stage` on the current result in a background thread
    ///
    /// The stage returns the new result, the import counts, the state to
    /// enter and the event announcing its end.
    fn spawn<F>(&mut self, running: State, stage: F)
    where
        F: FnOnce(
                PipelineResult,
                StageContext,
            ) -> (PipelineResult, Option<ImportSummary>, State, ImportEvent)
            + Send
            + 'static,
    {
        self.abort.store(false, Ordering::SeqCst);
        self.set_state(running);
        let ctx = StageContext::new(self.log.clone(), self.events.clone(), Arc::clone(&self.abort));
        let state = Arc::clone(&self.state);
        let result = std::mem::take(&mut self.result);
        log::debug!("Starting stage {:?}", running);
        self.task = Some(thread::spawn(move || {
            let (result, summary, next, finished) = stage(result, ctx.clone());
            *state.lock().unwrap_or_else(|e| e.into_inner()) = next;
            ctx.events.emit(finished);
            StageOutput { result, summary }
        }));
    }
}

impl Drop for ImportController {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::CheckState;
    use crate::store::FsLibraryDb;
    use crate::Severity;
    use std::fs;
    use std::sync::mpsc;
    use std::time::Duration;

    fn controller(dest: &Path) -> ImportController {
        let db = Arc::new(FsLibraryDb::new([dest.to_path_buf()]));
        ImportController::new(db, dest, ImportSettings::default(), MessageLogger::new())
    }

    fn write_footprints(root: &Path, count: usize) {
        fs::create_dir_all(root.join("Lib.pretty")).unwrap();
        for i in 0..count {
            fs::write(
                root.join(format!("Lib.pretty/F{}.kicad_mod", i)),
                format!(r#"(footprint "F{}" (layer "F.Cu"))"#, i),
            )
            .unwrap();
        }
    }

    /// Hold the stage at the first event matching `pause_on` until the
    /// abort flag is set, returns a receiver signalled once the stage paused
    fn pause_stage(
        ctrl: &ImportController,
        pause_on: fn(&ImportEvent) -> bool,
    ) -> mpsc::Receiver<()> {
        let (paused_tx, paused_rx) = mpsc::channel();
        let paused_tx = Mutex::new(paused_tx);
        let armed = AtomicBool::new(true);
        let abort = ctrl.abort_handle();
        ctrl.events().subscribe(move |e| {
            if pause_on(e) && armed.swap(false, Ordering::SeqCst) {
                paused_tx.lock().unwrap().send(()).unwrap();
                while !abort.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(1));
                }
            }
        });
        paused_rx
    }

    fn has_info(ctrl: &ImportController, text: &str) -> bool {
        ctrl.log()
            .messages()
            .iter()
            .any(|m| m.severity == Severity::Info && m.text == text)
    }

    #[test]
    fn test_stages_require_order() {
        let dest = tempfile::tempdir().unwrap();
        let mut ctrl = controller(dest.path());
        let finished = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&finished);
        ctrl.events().subscribe(move |e| {
            if matches!(e, ImportEvent::ParseFinished | ImportEvent::ImportFinished) {
                sink.lock().unwrap().push(e.clone());
            }
        });

        assert!(!ctrl.start_parse());
        assert!(!ctrl.start_import());
        assert_eq!(ctrl.state(), State::Reset);
        assert_eq!(ctrl.log().count(Severity::Critical), 2);
        assert_eq!(
            *finished.lock().unwrap(),
            vec![ImportEvent::ParseFinished, ImportEvent::ImportFinished]
        );
    }

    #[test]
    fn test_scan_and_reset() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("Lib.pretty")).unwrap();
        fs::write(
            src.path().join("Lib.pretty/A.kicad_mod"),
            r#"(footprint "A" (layer "F.Cu"))"#,
        )
        .unwrap();

        let mut ctrl = controller(dest.path());
        assert!(ctrl.start_scan(src.path(), None));
        ctrl.wait();
        assert_eq!(ctrl.state(), State::Scanned);
        assert_eq!(ctrl.result().file_count, 1);
        assert!(ctrl.can_start_parsing());
        assert!(!ctrl.can_start_selecting());
        assert!(!ctrl.start_scan(src.path(), None));

        assert!(ctrl.start_parse());
        ctrl.wait();
        assert_eq!(ctrl.state(), State::Parsed);
        assert!(ctrl.can_start_selecting());
        assert!(ctrl.can_start_import());

        ctrl.set_package_checked("Lib", "A", false);
        assert_eq!(ctrl.result().footprint_libs[0].footprints[0].checked, CheckState::Unchecked);
        assert!(!ctrl.can_start_import());

        ctrl.reset();
        assert_eq!(ctrl.state(), State::Reset);
        assert_eq!(ctrl.result(), &PipelineResult::default());
        assert!(ctrl.libs_path().is_none());
    }

    #[test]
    fn test_cancel_parse_returns_to_scanned() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write_footprints(src.path(), 5);

        let mut ctrl = controller(dest.path());
        assert!(ctrl.start_scan(src.path(), None));
        ctrl.wait();
        assert_eq!(ctrl.state(), State::Scanned);

        let paused = pause_stage(&ctrl, |e| matches!(e, ImportEvent::ProgressPercent(_)));
        assert!(ctrl.start_parse());
        paused.recv().unwrap();
        assert!(ctrl.is_running());
        assert_eq!(ctrl.state(), State::Parsing);

        ctrl.cancel();
        assert!(!ctrl.is_running());
        assert_eq!(ctrl.state(), State::Scanned);
        assert!(has_info(&ctrl, "Aborted."));
        assert!(ctrl.result().footprint_libs[0].footprints.is_empty());
        assert!(!ctrl.can_start_import());

        assert!(ctrl.start_parse());
        ctrl.wait();
        assert_eq!(ctrl.state(), State::Parsed);
        assert_eq!(ctrl.result().footprint_libs[0].footprints.len(), 5);
    }

    #[test]
    fn test_cancel_scan_returns_to_reset() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write_footprints(src.path(), 2);

        let mut ctrl = controller(dest.path());
        let paused = pause_stage(&ctrl, |e| matches!(e, ImportEvent::ProgressStatus(_)));
        assert!(ctrl.start_scan(src.path(), None));
        paused.recv().unwrap();
        assert_eq!(ctrl.state(), State::Scanning);

        ctrl.cancel();
        assert_eq!(ctrl.state(), State::Reset);
        assert!(has_info(&ctrl, "Aborted."));
        assert_eq!(ctrl.result().file_count, 0);
        assert!(!ctrl.can_start_parsing());

        assert!(ctrl.start_scan(src.path(), None));
        ctrl.wait();
        assert_eq!(ctrl.state(), State::Scanned);
        assert_eq!(ctrl.result().file_count, 2);
    }

    #[test]
    fn test_check_state_changes_are_emitted() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        fs::write(
            src.path().join("Device.kicad_sym"),
            r#"(kicad_symbol_lib (version 20231120) (generator "x")
  (symbol "R" (property "Footprint" "Lib:R" (at 0 0 0) (effects (font (size 1.27 1.27))))
    (symbol "R_1_1"
      (pin passive line (at 0 0 0) (length 1) (name "~" (effects (font (size 1.27 1.27)))) (number "1" (effects (font (size 1.27 1.27))))))))"#,
        )
        .unwrap();

        let mut ctrl = controller(dest.path());
        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&changes);
        ctrl.events().subscribe(move |e| {
            if let ImportEvent::CheckStateChanged(change) = e {
                sink.lock().unwrap().push(change.clone());
            }
        });
        ctrl.start_scan(src.path(), None);
        ctrl.wait();
        ctrl.start_parse();
        ctrl.wait();

        ctrl.set_device_checked("Device", "R", false);
        ctrl.set_component_checked("Device", "R", false);
        assert!(changes.lock().unwrap().is_empty());
        ctrl.set_device_checked("Device", "R", true);
        let changes = changes.lock().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].name, "R");
        assert_eq!(changes[0].state, CheckState::ImplicitlyChecked);
    }
}

#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    fs,
    path::{Path, PathBuf},
    rc::Rc,
    sync::Arc,
    thread,
    time::Duration,
};

use anyhow::anyhow;
use client_host_embedder::{
    cli::LaunchArgs,
    constants::{ENTRY_COMPONENT_TYPE, STATE_HOLDER_TYPE},
    host::{Dimension, HostedComponent, RawSurface, StubHandle, Surface},
    launcher::{ArchiveSource, LaunchConfig, Launcher},
    runtime::{Archive, ConfigSlot, FieldDef, FieldKind, Modifiers, StaticArchive, TypeDef},
    settings::LauncherSettings,
    watchdog::Terminator,
    window::{NativeWindow, WindowEvent, WindowFactory},
};
use parking_lot::Mutex;
use tempfile::TempDir;

/// Ordered record of everything the host did, shared across threads.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.0.lock().iter().position(|e| e == entry)
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().iter().filter(|e| *e == entry).count()
    }
}

pub struct RecordingTerminator {
    journal: Journal,
}

impl RecordingTerminator {
    pub fn new(journal: &Journal) -> Arc<Self> {
        Arc::new(Self { journal: journal.clone() })
    }
}

impl Terminator for RecordingTerminator {
    fn terminate(&self, code: i32) {
        self.journal.push(format!("exit {code}"));
    }

    fn terminate_now(&self, code: i32) {
        self.journal.push(format!("forced exit {code}"));
    }
}

pub struct RecordingComponent {
    journal: Journal,
    stub: Option<StubHandle>,
    stop_delay: Duration,
    resize_on_init: Option<Dimension>,
}

impl RecordingComponent {
    pub fn new(journal: &Journal) -> Self {
        Self { journal: journal.clone(), stub: None, stop_delay: Duration::ZERO, resize_on_init: None }
    }

    pub fn with_stop_delay(mut self, delay: Duration) -> Self {
        self.stop_delay = delay;
        self
    }

    pub fn requesting_resize(mut self, size: Dimension) -> Self {
        self.resize_on_init = Some(size);
        self
    }
}

impl HostedComponent for RecordingComponent {
    fn set_stub(&mut self, stub: StubHandle) {
        self.journal.push("set_stub");
        self.stub = Some(stub);
    }

    fn init(&mut self) {
        let Some(stub) = &self.stub else {
            self.journal.push("init without stub");
            return;
        };
        let param = |name: &str| stub.parameter(name).unwrap_or_else(|| "-".to_string());
        let surface = stub
            .surface()
            .map(|s| format!("{}x{}", s.width, s.height))
            .unwrap_or_else(|| "none".to_string());
        self.journal.push(format!(
            "init username={} sessionid={} stand-alone={} surface={}",
            param("username"),
            param("sessionid"),
            param("stand-alone"),
            surface
        ));
        if let Some(size) = self.resize_on_init {
            stub.request_resize(size.width, size.height);
        }
    }

    fn start(&mut self) {
        let active = self.stub.as_ref().is_some_and(StubHandle::is_active);
        self.journal.push(format!("start active={active}"));
    }

    fn stop(&mut self) {
        if !self.stop_delay.is_zero() {
            thread::sleep(self.stop_delay);
        }
        self.journal.push("stop");
    }

    fn destroy(&mut self) {
        self.journal.push("destroy");
    }

    fn resize(&mut self, width: i32, height: i32) {
        self.journal.push(format!("resize {width}x{height}"));
    }

    fn set_visible(&mut self, visible: bool) {
        self.journal.push(format!("component visible {visible}"));
    }

    fn code_base(&self) -> Option<String> {
        Some("file:///opt/client/bin/".to_string())
    }
}

/// Backing storage for a declared directory field.
#[derive(Debug, Default)]
pub struct DirSlot(RefCell<Option<PathBuf>>);

impl DirSlot {
    pub fn get(&self) -> Option<PathBuf> {
        self.0.borrow().clone()
    }
}

impl ConfigSlot for DirSlot {
    fn set_path(&self, path: &Path) -> Result<(), String> {
        *self.0.borrow_mut() = Some(path.to_path_buf());
        Ok(())
    }
}

/// Slot whose writes always fail.
pub struct LockedSlot;

impl ConfigSlot for LockedSlot {
    fn set_path(&self, _path: &Path) -> Result<(), String> {
        Err("field is final".to_string())
    }
}

pub fn dir_field(name: &str, modifiers: Modifiers, slot: Rc<DirSlot>) -> FieldDef {
    FieldDef::new(name, FieldKind::Directory, modifiers, slot)
}

/// State holder with one private static directory field, decoys that must
/// not be patched, a `main` entry point and a directory probe.
pub fn state_holder(journal: &Journal, slot: &Rc<DirSlot>) -> TypeDef {
    let main_journal = journal.clone();
    let probe_slot = Rc::clone(slot);
    TypeDef::new(STATE_HOLDER_TYPE)
        .with_field(FieldDef::new(
            "theMinecraft",
            FieldKind::Other,
            Modifiers::private_static(),
            Rc::new(DirSlot::default()),
        ))
        .with_field(dir_field(
            "publicDir",
            Modifiers(Modifiers::PUBLIC | Modifiers::STATIC),
            Rc::new(DirSlot::default()),
        ))
        .with_field(dir_field(
            "finalDir",
            Modifiers(Modifiers::PRIVATE | Modifiers::STATIC | Modifiers::FINAL),
            Rc::new(DirSlot::default()),
        ))
        .with_field(dir_field("minecraftDir", Modifiers::private_static(), Rc::clone(slot)))
        .with_method(
            "main",
            Rc::new(move |args: &[String]| {
                main_journal.push(format!("main {}", args.join(" ")));
                Ok(())
            }),
        )
        .with_directory_probe(Rc::new(move |name: &str| {
            probe_slot.get().map(|dir| dir.join(format!(".{name}")))
        }))
}

pub fn entry_component(journal: &Journal) -> TypeDef {
    let journal = journal.clone();
    TypeDef::new(ENTRY_COMPONENT_TYPE).with_constructor(Rc::new(move || {
        journal.push("constructed");
        Ok(Box::new(RecordingComponent::new(&journal)) as Box<dyn HostedComponent>)
    }))
}

pub fn failing_entry_component() -> TypeDef {
    TypeDef::new(ENTRY_COMPONENT_TYPE)
        .with_constructor(Rc::new(|| Err("constructor panicked".to_string())))
}

/// Hands `types` to the first archive requested and nothing to the rest.
pub struct TestArchives {
    types: Vec<TypeDef>,
    served: Cell<usize>,
}

impl TestArchives {
    pub fn new(types: Vec<TypeDef>) -> Self {
        Self { types, served: Cell::new(0) }
    }
}

impl ArchiveSource for TestArchives {
    fn archive(&self, path: &Path) -> Box<dyn Archive> {
        let index = self.served.get();
        self.served.set(index + 1);
        let types = if index == 0 { self.types.clone() } else { Vec::new() };
        Box::new(StaticArchive::new(path, types))
    }
}

pub struct FakeWindow {
    journal: Journal,
    size: Dimension,
    events: VecDeque<WindowEvent>,
}

impl NativeWindow for FakeWindow {
    fn set_size(&mut self, size: Dimension) {
        self.size = size;
        self.journal.push(format!("window size {}x{}", size.width, size.height));
    }

    fn center(&mut self) {
        self.journal.push("window centered");
    }

    fn maximize(&mut self) {
        self.journal.push("window maximized");
    }

    fn validate(&mut self) {
        self.journal.push("window validated");
    }

    fn surface(&self) -> Surface {
        Surface { handle: RawSurface(7), width: self.size.width, height: self.size.height }
    }

    fn set_visible(&mut self, visible: bool) {
        self.journal.push(format!("window visible {visible}"));
    }

    fn next_event(&mut self) -> Option<WindowEvent> {
        self.events.pop_front()
    }
}

pub struct FakeWindowFactory {
    pub journal: Journal,
    pub events: Vec<WindowEvent>,
    pub fail: bool,
}

impl FakeWindowFactory {
    pub fn new(journal: &Journal, events: Vec<WindowEvent>) -> Self {
        Self { journal: journal.clone(), events, fail: false }
    }
}

impl WindowFactory for FakeWindowFactory {
    type Window = FakeWindow;

    fn create(&self, title: &str, size: Dimension) -> anyhow::Result<FakeWindow> {
        if self.fail {
            return Err(anyhow!("no display available"));
        }
        self.journal.push(format!("window created {title} {}x{}", size.width, size.height));
        Ok(FakeWindow {
            journal: self.journal.clone(),
            size,
            events: self.events.iter().copied().collect(),
        })
    }
}

/// Install root with empty archive files where the launcher expects them.
pub struct Install {
    pub dir: TempDir,
    pub config: LaunchConfig,
    pub settings: LauncherSettings,
}

pub fn install(mode: Option<&str>) -> Install {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("client");
    let settings = LauncherSettings { grace_period_ms: 100, ..LauncherSettings::default() };
    let args = LaunchArgs {
        install_root: root,
        username: "alice".to_string(),
        session_token: "tok-123".to_string(),
        title: "Client".to_string(),
        mode: mode.map(str::to_string),
        ignored: Vec::new(),
    };
    let config = LaunchConfig::new(args, &settings);
    for path in &config.archive_paths {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }
    Install { dir, config, settings }
}

pub fn launcher(
    install: &Install,
    windows: FakeWindowFactory,
    types: Vec<TypeDef>,
    journal: &Journal,
) -> Launcher<FakeWindowFactory, TestArchives> {
    Launcher::new(
        install.settings.clone(),
        windows,
        TestArchives::new(types),
        RecordingTerminator::new(journal),
    )
}

//! Session controller.
//!
//! This module provides the `SessionController`, which owns the single active
//! emulation session and drives its lifecycle:
//!
//! ```text
//! Idle ──load──▶ Booting ──start ok──▶ Running ◀──resume/pause──▶ Paused
//!   ▲               │                     │                          │
//!   └──boot failed──┘                     └────── load / shutdown ───┘
//! ```
//!
//! # Concurrency
//!
//! Every operation runs under one async lock. Boot requests therefore
//! serialize: a load issued while another boot is in flight waits for it and
//! then supersedes it. Retiring a session cancels its autosave task before any
//! resource of the next session is created, and each task is bound to the
//! epoch of the session that spawned it.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use gbaweb_core::config::GbaConfig;
use gbaweb_core::emulator::{
    EmulatorModule, EntryPoint, Launch, ModuleLoader, PAUSE_ENTRY_POINTS, RESUME_ENTRY_POINTS,
    START_ENTRY_POINTS, TEARDOWN_ENTRY_POINTS,
};
use gbaweb_core::error::{GbaError, Result};
use gbaweb_core::identity::RomIdentity;
use gbaweb_core::save::SaveRepository;
use gbaweb_core::session::{LoadOutcome, SaveOutcome, SessionState, SessionView, Status};
use tokio::sync::{Mutex, watch};

use super::autosave::AutosaveTask;
use crate::bridge::VirtualFsBridge;

/// Where the save seeded into a new session comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveSeed {
    /// Look the identity up in the save store.
    FromStore,
    /// Boot without writing a save file.
    Skip,
    /// Seed these bytes.
    Provided(Vec<u8>),
}

/// One pairing of a ROM with a running emulator instance and its autosave task.
struct Session {
    epoch: u64,
    identity: RomIdentity,
    name: String,
    rom: Arc<[u8]>,
    module: Arc<dyn EmulatorModule>,
    bridge: VirtualFsBridge,
    paused: bool,
    autosave: AutosaveTask,
}

#[derive(Default)]
struct Slot {
    session: Option<Session>,
    /// Module kept between sessions when `reuse_module` is enabled.
    cached_module: Option<Arc<dyn EmulatorModule>>,
}

struct Shared {
    slot: Mutex<Slot>,
    store: Arc<dyn SaveRepository>,
    loader: Arc<dyn ModuleLoader>,
    config: GbaConfig,
    view: watch::Sender<SessionView>,
    epoch: AtomicU64,
    timers: Arc<AtomicUsize>,
}

/// Drives the emulation session. Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct SessionController {
    shared: Arc<Shared>,
}

impl SessionController {
    /// Creates an idle controller.
    ///
    /// # Errors
    ///
    /// Returns `GbaError::Config` if `config` fails validation.
    pub fn new(
        store: Arc<dyn SaveRepository>,
        loader: Arc<dyn ModuleLoader>,
        config: GbaConfig,
    ) -> Result<Self> {
        config.validate()?;
        let (view, _) = watch::channel(SessionView::default());
        Ok(Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot::default()),
                store,
                loader,
                config,
                view,
                epoch: AtomicU64::new(0),
                timers: Arc::new(AtomicUsize::new(0)),
            }),
        })
    }

    /// Subscribes to view updates.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.shared.view.subscribe()
    }

    /// Returns the latest published view.
    pub fn view(&self) -> SessionView {
        self.shared.view.borrow().clone()
    }

    pub fn state(&self) -> SessionState {
        self.shared.view.borrow().state
    }

    /// Number of autosave tasks currently alive. Never more than one.
    pub fn active_autosave_timers(&self) -> usize {
        self.shared.timers.load(Ordering::SeqCst)
    }

    /// Loads a user-selected ROM, seeding its save from the store.
    ///
    /// Returns the ROM's identity once the core is running.
    pub async fn load_rom(&self, bytes: Vec<u8>, name: impl Into<String>) -> Result<RomIdentity> {
        self.boot_rom(bytes, name, SaveSeed::FromStore).await
    }

    /// Boots `bytes` as a new session, superseding the current one.
    pub async fn boot_rom(
        &self,
        bytes: Vec<u8>,
        name: impl Into<String>,
        seed: SaveSeed,
    ) -> Result<RomIdentity> {
        let name = name.into();
        // Status belongs to whoever holds the slot, so publish only once we do
        let mut slot = self.shared.slot.lock().await;
        self.set_status(Status::ProcessingRom);

        if bytes.is_empty() {
            tracing::warn!("[SessionController] Rejected empty ROM {:?}", name);
            self.set_status(Status::RomLoadFailed);
            return Err(GbaError::EmptyRom);
        }

        let identity = RomIdentity::digest(&bytes);
        tracing::info!(
            "[SessionController] Loading {:?} ({} bytes, identity {})",
            name,
            bytes.len(),
            identity.preview()
        );

        let seed = match seed {
            SaveSeed::Skip => None,
            SaveSeed::Provided(save) => Some(save),
            SaveSeed::FromStore => match self.shared.store.get(&identity).await {
                Ok(save) => save,
                Err(e) => {
                    tracing::warn!(
                        "[SessionController] Could not read stored save for {}, booting without it: {}",
                        identity,
                        e
                    );
                    None
                }
            },
        };

        self.boot_locked(&mut slot, Arc::from(bytes), name, identity.clone(), seed, None)
            .await?;
        Ok(identity)
    }

    /// Copies the core's save file into the store.
    ///
    /// With `report` set, the outcome is published as a status message.
    /// Without it (autosave), failures are only logged.
    pub async fn save_now(&self, report: bool) -> Result<SaveOutcome> {
        let slot = self.shared.slot.lock().await;
        self.save_locked(&slot, report, None).await
    }

    /// Restarts the session with the save currently in the store.
    ///
    /// Nothing restarts when the store holds no save for the loaded ROM.
    pub async fn load_from_store(&self) -> Result<LoadOutcome> {
        let mut slot = self.shared.slot.lock().await;

        let Some(session) = slot.session.as_ref() else {
            self.set_status(Status::LoadRomBeforeLoading);
            return Ok(LoadOutcome::NoSession);
        };
        let identity = session.identity.clone();
        let name = session.name.clone();
        let rom = session.rom.clone();

        let save = match self.shared.store.get(&identity).await {
            Ok(Some(save)) => save,
            Ok(None) => {
                tracing::info!("[SessionController] No stored save for {}", identity);
                self.set_status(Status::NoStoredSave);
                return Ok(LoadOutcome::NoStoredSave);
            }
            Err(e) => {
                tracing::error!("[SessionController] Failed to read stored save: {}", e);
                self.set_status(Status::LoadFailed);
                return Err(e);
            }
        };

        let bytes = save.len();
        self.boot_locked(&mut slot, rom, name, identity, Some(save), Some(Status::LoadedFromStore))
            .await?;
        Ok(LoadOutcome::Loaded { bytes })
    }

    /// Suspends the core's main loop. Autosave keeps running.
    pub async fn pause(&self) -> Result<()> {
        self.set_paused(true).await
    }

    /// Restarts the core's main loop.
    pub async fn resume(&self) -> Result<()> {
        self.set_paused(false).await
    }

    /// Tears the session down and returns to idle.
    pub async fn shutdown(&self) {
        let mut slot = self.shared.slot.lock().await;
        self.retire(&mut slot, false);
        slot.cached_module = None;
        tracing::info!("[SessionController] Shut down");
        self.shared.view.send_replace(SessionView {
            status: Status::Closed,
            ..SessionView::default()
        });
    }

    async fn boot_locked(
        &self,
        slot: &mut Slot,
        rom: Arc<[u8]>,
        name: String,
        identity: RomIdentity,
        seed: Option<Vec<u8>>,
        ready_status: Option<Status>,
    ) -> Result<()> {
        self.shared.view.send_replace(SessionView {
            status: Status::InitializingCore,
            state: SessionState::Booting,
            rom_name: Some(name.clone()),
            identity: Some(identity.clone()),
        });

        self.retire(slot, self.shared.config.reuse_module);
        let epoch = self.shared.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        let module = match self.acquire_module(slot).await {
            Ok(module) => module,
            Err(e) => return Err(self.fail_boot(e)),
        };

        let started = self.start_core(module.as_ref(), &rom, &identity, seed.as_deref()).await;
        let (bridge, seeded) = match started {
            Ok(started) => started,
            Err(e) => {
                teardown(module.as_ref());
                slot.cached_module = None;
                return Err(self.fail_boot(e));
            }
        };

        let autosave = self.spawn_autosave(epoch);
        slot.session = Some(Session {
            epoch,
            identity: identity.clone(),
            name: name.clone(),
            rom,
            module,
            bridge,
            paused: false,
            autosave,
        });

        let status = ready_status.unwrap_or(if seeded {
            Status::RomLoadedWithSave
        } else {
            Status::RomLoaded
        });
        tracing::info!(
            "[SessionController] Session {} running {:?} (save seeded: {})",
            epoch,
            name,
            seeded
        );
        self.shared.view.send_replace(SessionView {
            status,
            state: SessionState::Running,
            rom_name: Some(name),
            identity: Some(identity),
        });
        Ok(())
    }

    async fn acquire_module(&self, slot: &mut Slot) -> Result<Arc<dyn EmulatorModule>> {
        if let Some(module) = slot.cached_module.clone() {
            tracing::debug!("[SessionController] Reusing loaded emulator module");
            return Ok(module);
        }

        let module = self.shared.loader.load().await.map_err(|e| match e {
            GbaError::ModuleUnavailable(_) => e,
            other => GbaError::module_unavailable(other.to_string()),
        })?;
        if self.shared.config.reuse_module {
            slot.cached_module = Some(module.clone());
        }
        Ok(module)
    }

    /// Prepares the filesystem and starts the core. Returns the bridge and
    /// whether a save was seeded.
    async fn start_core(
        &self,
        module: &dyn EmulatorModule,
        rom: &[u8],
        identity: &RomIdentity,
        seed: Option<&[u8]>,
    ) -> Result<(VirtualFsBridge, bool)> {
        let fs = module.filesystem().ok_or_else(|| {
            GbaError::module_unavailable("emulator module exposes no filesystem")
        })?;
        let bridge = VirtualFsBridge::new(fs, self.shared.config.layout());

        for dir in [&bridge.layout().rom_directory, &bridge.layout().save_directory] {
            if let Err(e) = bridge.ensure_directory(dir) {
                tracing::warn!("[SessionController] Continuing boot: {}", e);
            }
        }

        let rom_path = bridge.write_rom(identity, rom)?;
        let seeded = bridge.seed_save(identity, seed)?;

        let entry = module
            .probe(START_ENTRY_POINTS)
            .ok_or(GbaError::StartMethodMissing)?;
        tracing::debug!("[SessionController] Starting core via {}", entry);

        module
            .start(entry, Launch { rom, rom_path: &rom_path })
            .await
            .map_err(|e| match e {
                GbaError::EntryPoint { .. } => e,
                other => GbaError::EntryPoint {
                    entry: entry.to_string(),
                    message: other.to_string(),
                },
            })?;

        Ok((bridge, seeded))
    }

    fn fail_boot(&self, error: GbaError) -> GbaError {
        let status = match &error {
            GbaError::ModuleUnavailable(_) => Status::CoreLoadFailed,
            GbaError::StartMethodMissing | GbaError::EntryPoint { .. } => Status::RomStartFailed,
            _ => Status::RomLoadFailed,
        };
        if error.is_fatal_to_boot() {
            tracing::error!("[SessionController] Boot failed: {}", error);
        } else {
            tracing::warn!("[SessionController] Boot aborted: {}", error);
        }
        self.shared.view.send_replace(SessionView {
            status,
            ..SessionView::default()
        });
        error
    }

    /// Ends the current session, if any. Its autosave task is cancelled
    /// before anything else happens.
    fn retire(&self, slot: &mut Slot, keep_module: bool) {
        let Some(mut session) = slot.session.take() else {
            return;
        };
        session.autosave.cancel();

        if keep_module {
            if session.module.supports(EntryPoint::PauseMainLoop) {
                if let Err(e) = session.module.control(EntryPoint::PauseMainLoop) {
                    tracing::warn!(
                        "[SessionController] {}",
                        GbaError::PreviousInstanceTeardown(e.to_string())
                    );
                }
            }
            slot.cached_module = Some(session.module.clone());
        } else {
            teardown(session.module.as_ref());
        }
        tracing::debug!("[SessionController] Retired session {}", session.epoch);
    }

    fn spawn_autosave(&self, epoch: u64) -> AutosaveTask {
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        AutosaveTask::spawn(
            self.shared.config.autosave_interval(),
            self.shared.timers.clone(),
            move || {
                let weak = weak.clone();
                async move {
                    if let Some(shared) = weak.upgrade() {
                        SessionController { shared }.autosave_tick(epoch).await;
                    }
                }
            },
        )
    }

    async fn autosave_tick(&self, epoch: u64) {
        let slot = self.shared.slot.lock().await;
        match self.save_locked(&slot, false, Some(epoch)).await {
            Ok(SaveOutcome::Stale) => {
                tracing::debug!("[Autosave] Skipped tick of superseded session {}", epoch);
            }
            Ok(outcome) => tracing::trace!("[Autosave] {:?}", outcome),
            // Already logged; the timer keeps running
            Err(_) => {}
        }
    }

    async fn save_locked(
        &self,
        slot: &Slot,
        report: bool,
        expected_epoch: Option<u64>,
    ) -> Result<SaveOutcome> {
        let Some(session) = slot.session.as_ref() else {
            if report {
                self.set_status(Status::LoadRomBeforeSaving);
            }
            return Ok(SaveOutcome::NoSession);
        };
        if expected_epoch.is_some_and(|epoch| epoch != session.epoch) {
            return Ok(SaveOutcome::Stale);
        }

        let result = match session.bridge.read_save(&session.identity) {
            Ok(Some(save)) => self
                .shared
                .store
                .put(&session.identity, &save)
                .await
                .map(|()| SaveOutcome::Saved { bytes: save.len() }),
            Ok(None) => Ok(SaveOutcome::NoSaveData),
            Err(e) => Err(e),
        };

        match &result {
            Ok(SaveOutcome::Saved { bytes }) => {
                tracing::debug!(
                    "[SessionController] Committed {} save bytes for {}",
                    bytes,
                    session.identity
                );
                self.set_status(if report { Status::Saved } else { Status::Autosaved });
            }
            Ok(_) => {
                if report {
                    self.set_status(Status::NoSaveYet);
                }
            }
            Err(e) if report => {
                tracing::error!("[SessionController] Save failed: {}", e);
                self.set_status(Status::SaveFailed);
            }
            Err(e) => {
                tracing::warn!("[Autosave] Save failed for {}: {}", session.identity, e);
            }
        }
        result
    }

    async fn set_paused(&self, paused: bool) -> Result<()> {
        let (entries, action, done, failed) = if paused {
            (PAUSE_ENTRY_POINTS, "pause", Status::Paused, Status::PauseFailed)
        } else {
            (RESUME_ENTRY_POINTS, "resume", Status::Resumed, Status::ResumeFailed)
        };

        let mut slot = self.shared.slot.lock().await;
        let Some(session) = slot.session.as_mut() else {
            self.set_status(Status::NoActiveEmulation);
            return Err(GbaError::NoActiveSession);
        };
        if session.paused == paused {
            self.set_status(done);
            return Ok(());
        }

        let supported: Vec<EntryPoint> = entries
            .iter()
            .copied()
            .filter(|entry| session.module.supports(*entry))
            .collect();
        if supported.is_empty() {
            tracing::warn!("[SessionController] Emulator module cannot {}", action);
            self.set_status(failed);
            return Err(GbaError::ControlUnavailable(action.to_string()));
        }

        for entry in supported {
            if let Err(e) = session.module.control(entry) {
                tracing::error!("[SessionController] {} failed: {}", entry, e);
                self.set_status(failed);
                return Err(GbaError::EntryPoint {
                    entry: entry.to_string(),
                    message: e.to_string(),
                });
            }
        }

        session.paused = paused;
        let state = if paused {
            SessionState::Paused
        } else {
            SessionState::Running
        };
        self.shared.view.send_modify(|view| {
            view.status = done;
            view.state = state;
        });
        Ok(())
    }

    fn set_status(&self, status: Status) {
        self.shared.view.send_modify(|view| view.status = status);
    }
}

/// Invokes every supported teardown entry. Failures are logged only.
fn teardown(module: &dyn EmulatorModule) {
    for entry in TEARDOWN_ENTRY_POINTS
        .iter()
        .copied()
        .filter(|entry| module.supports(*entry))
    {
        if let Err(e) = module.control(entry) {
            tracing::warn!(
                "[SessionController] {}",
                GbaError::PreviousInstanceTeardown(format!("{entry}: {e}"))
            );
        }
    }
}

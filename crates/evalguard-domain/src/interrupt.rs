//! Best-effort change cleanup when the process is interrupted.
//!
//! A single listener thread is started the first time a hook is registered. It waits for
//! SIGINT / SIGTERM, runs every registered hook, then exits the process. Hooks are registered
//! for the duration of an evaluation through [`InterruptGuard`] and removed when the guard drops.
//!
//! Once started, the listener owns both signals for the life of the process. A signal that
//! arrives while no hook is registered gets the platform's default action, so an idle process
//! is terminated by the signal exactly as it would be without the listener.
//!
//! Only unix platforms have a listener; elsewhere [`InterruptGuard::register`] returns `None`.

use std::collections::BTreeMap;
use std::io;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::{debug, error, warn};

type CleanupHook = Box<dyn Fn() + Send>;

struct Registry {
    next_id: u64,
    hooks: BTreeMap<u64, (String, CleanupHook)>,
}

static REGISTRY: Mutex<Registry> = Mutex::new(Registry {
    next_id: 0,
    hooks: BTreeMap::new(),
});

static LISTENER: OnceLock<bool> = OnceLock::new();

fn registry() -> MutexGuard<'static, Registry> {
    REGISTRY.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registration of a cleanup hook; deregisters on drop.
#[derive(Debug)]
pub struct InterruptGuard {
    id: u64,
    label: String,
}

impl InterruptGuard {
    /// Register `hook` to run if the process is interrupted.
    ///
    /// Returns `None` when the signal listener cannot be started; the caller then runs unguarded.
    pub fn register(label: impl Into<String>, hook: impl Fn() + Send + 'static) -> Option<Self> {
        if !listener_running() {
            return None;
        }
        let label = label.into();
        let mut registry = registry();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.hooks.insert(id, (label.clone(), Box::new(hook)));
        debug!(label = %label, id, "interrupt cleanup hook registered");
        Some(InterruptGuard { id, label })
    }

    pub fn is_registered(&self) -> bool {
        is_active(self.id)
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        registry().hooks.remove(&self.id);
        debug!(label = %self.label, id = self.id, "interrupt cleanup hook removed");
    }
}

pub(crate) fn is_active(id: u64) -> bool {
    registry().hooks.contains_key(&id)
}

fn listener_running() -> bool {
    *LISTENER.get_or_init(|| match spawn_listener() {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "interrupt listener unavailable; evaluations will not clean up on interrupt");
            false
        }
    })
}

#[cfg(unix)]
fn spawn_listener() -> io::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    std::thread::Builder::new()
        .name("evalguard-interrupt".to_string())
        .spawn(move || {
            for signal in signals.forever() {
                handle_signal(signal);
            }
        })?;
    Ok(())
}

#[cfg(not(unix))]
fn spawn_listener() -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "interrupt cleanup needs unix signals",
    ))
}

#[cfg(unix)]
fn handle_signal(signal: std::ffi::c_int) {
    let registry = registry();
    if run_hooks(&registry) > 0 {
        std::process::exit(0);
    }
    drop(registry);

    debug!(signal, "no active evaluation; applying the default signal action");
    if let Err(err) = signal_hook::low_level::emulate_default_handler(signal) {
        error!(signal, error = %err, "default signal action failed");
        std::process::exit(128 + signal);
    }
}

/// Run every registered hook. Returns how many ran.
#[cfg_attr(not(unix), allow(dead_code))]
fn run_hooks(registry: &Registry) -> usize {
    if registry.hooks.is_empty() {
        return 0;
    }
    error!(
        active = registry.hooks.len(),
        "unexpected termination; reverting changes made by active evaluations, do not interrupt this process"
    );
    for (label, hook) in registry.hooks.values() {
        warn!(label = %label, "reverting changes");
        hook();
    }
    registry.hooks.len()
}

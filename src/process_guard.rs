//! Lifecycle management for build tool child processes
//!
//! A build of superlu_dist can run for many minutes. If solver-deps is
//! interrupted, the `make`/`cmake` process tree it started must not keep
//! writing into the install prefix.
//!
//! - Every tool runs as the leader of its own process group
//! - Running groups are tracked in a global registry
//! - The signal thread only records the signal and terminates the registered
//!   groups; the main thread sees [`interrupted()`] and unwinds to `main`,
//!   which is the only place the process exits
//! - Termination is SIGTERM to each group, then SIGKILL to any group that
//!   still has members after the grace period

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::BTreeSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::{Duration, Instant};

/// Grace period between SIGTERM and SIGKILL after an interrupt.
pub const INTERRUPT_GRACE: Duration = Duration::from_secs(3);

static CHILD_REGISTRY: Mutex<ChildRegistry> = Mutex::new(ChildRegistry::new());

/// First signal received, 0 while the run is uninterrupted.
static INTERRUPTED_BY: AtomicI32 = AtomicI32::new(0);

/// Signal that interrupted the run, if any.
pub fn interrupted() -> Option<i32> {
    match INTERRUPTED_BY.load(Ordering::SeqCst) {
        0 => None,
        sig => Some(sig),
    }
}

/// Process groups of the tools currently running.
#[derive(Debug, Default)]
pub struct ChildRegistry {
    groups: BTreeSet<u32>,
}

impl ChildRegistry {
    pub const fn new() -> Self {
        Self {
            groups: BTreeSet::new(),
        }
    }

    pub fn global() -> &'static Mutex<ChildRegistry> {
        &CHILD_REGISTRY
    }

    /// Track a tool spawned with [`CommandProcessGroup::in_new_process_group`];
    /// its PID is also its process group ID.
    pub fn register(&mut self, pgid: u32) {
        self.groups.insert(pgid);
        tracing::debug!("Registered process group {}", pgid);
    }

    pub fn unregister(&mut self, pgid: u32) {
        self.groups.remove(&pgid);
        tracing::debug!("Unregistered process group {}", pgid);
    }

    pub fn groups(&self) -> Vec<u32> {
        self.groups.iter().copied().collect()
    }
}

/// Terminate every registered process group.
///
/// The registry lock is only held to take a snapshot, so the main thread can
/// reap and unregister its child while termination is in progress.
pub fn terminate_children(grace_period: Duration) {
    let groups = match ChildRegistry::global().lock() {
        Ok(registry) => registry.groups(),
        Err(poisoned) => poisoned.into_inner().groups(),
    };
    terminate_groups(&groups, grace_period);
}

/// SIGTERM each group, wait up to `grace_period` for it to empty, then
/// SIGKILL whatever is left.
///
/// A group outlives its leader when the leader was already reaped but
/// compilers it started are still running, so liveness is checked per group.
pub fn terminate_groups(groups: &[u32], grace_period: Duration) {
    if groups.is_empty() {
        return;
    }
    tracing::info!("Terminating {} build process group(s)", groups.len());

    for &pgid in groups {
        signal_group(pgid, Signal::SIGTERM);
    }

    let start = Instant::now();
    loop {
        let remaining: Vec<u32> = groups.iter().copied().filter(|&g| group_exists(g)).collect();
        if remaining.is_empty() {
            tracing::debug!("All build process groups exited");
            return;
        }
        if start.elapsed() >= grace_period {
            for pgid in remaining {
                tracing::warn!("Process group {} did not exit, sending SIGKILL", pgid);
                signal_group(pgid, Signal::SIGKILL);
            }
            return;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

/// Negative PID addresses the whole group, so compilers spawned by make die too
fn signal_group(pgid: u32, sig: Signal) {
    match signal::kill(Pid::from_raw(-(pgid as i32)), sig) {
        Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
        Err(e) => tracing::warn!(
            "Failed to send {} to process group {}: {}",
            sig.as_str(),
            pgid,
            e
        ),
    }
}

/// Whether any process (zombies included) is left in the group
fn group_exists(pgid: u32) -> bool {
    signal::kill(Pid::from_raw(-(pgid as i32)), None).is_ok()
}

/// Terminates anything still registered when dropped.
pub struct ProcessGuard {
    grace_period: Duration,
}

impl ProcessGuard {
    pub fn new() -> Self {
        Self {
            grace_period: Duration::from_secs(5),
        }
    }
}

impl Default for ProcessGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        terminate_children(self.grace_period);
    }
}

fn signal_label(sig: i32) -> &'static str {
    Signal::try_from(sig).map(Signal::as_str).unwrap_or("UNKNOWN")
}

/// Install handlers for SIGINT, SIGTERM and SIGHUP.
///
/// The first signal is recorded for [`interrupted()`] and the running tools
/// get SIGTERM, then SIGKILL after [`INTERRUPT_GRACE`]. A repeated signal
/// kills them at once. The process does not exit from here.
pub fn init_signal_handlers() -> Result<(), std::io::Error> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;

    std::thread::spawn(move || {
        for sig in signals.forever() {
            let first = INTERRUPTED_BY
                .compare_exchange(0, sig, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok();

            if first {
                tracing::error!("Received {}, aborting build", signal_label(sig));
                terminate_children(INTERRUPT_GRACE);
            } else {
                tracing::warn!("Received {} again, killing build processes", signal_label(sig));
                terminate_children(Duration::ZERO);
            }
        }
    });

    Ok(())
}

/// Extension trait for std::process::Command to set up process groups
pub trait CommandProcessGroup {
    /// Run the command as leader of a new process group, killed if we die
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl CommandProcessGroup for std::process::Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        // SAFETY: only async-signal-safe calls (setpgid, prctl) between fork and exec
        unsafe {
            self.pre_exec(|| {
                nix::unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0))
                    .map_err(std::io::Error::other)?;
                nix::sys::prctl::set_pdeathsig(Signal::SIGTERM).map_err(std::io::Error::other)?;
                Ok(())
            });
        }
        self
    }
}

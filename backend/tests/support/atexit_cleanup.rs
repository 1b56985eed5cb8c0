//! Shared embedded PostgreSQL cluster with process-exit shutdown.
//!
//! The library keeps its shared cluster alive for the life of the process.
//! Under `nextest` every test binary is its own process, and a postmaster
//! left running from one binary stops the next from starting on the same
//! data directory. Binaries therefore take an exclusive file lock before
//! bootstrapping, and register a `libc::atexit` hook that stops the
//! postmaster they started.

#[cfg(unix)]
use std::ffi::CString;
#[cfg(unix)]
use std::os::unix::ffi::OsStrExt;
#[cfg(unix)]
use std::path::{Path, PathBuf};
#[cfg(unix)]
use std::sync::OnceLock;
#[cfg(unix)]
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

#[cfg(unix)]
use color_eyre::eyre::eyre;
#[cfg(unix)]
use pg_embedded_setup_unpriv::BootstrapError;
use pg_embedded_setup_unpriv::{BootstrapResult, ClusterHandle};

const BOOTSTRAP_ATTEMPTS: usize = 5;
const BOOTSTRAP_RETRY_DELAY: Duration = Duration::from_millis(500);
const STABLE_PASSWORD: &str = "birdwatch_embedded_test";
#[cfg(unix)]
const LOCK_FILE_NAME: &str = "birdwatch-pg-embedded-shared-cluster.lock";

#[cfg(unix)]
static POSTMASTER_PID: AtomicI32 = AtomicI32::new(0);
#[cfg(unix)]
static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();
#[cfg(unix)]
static LOCK_FD: OnceLock<i32> = OnceLock::new();

/// Hold an exclusive `flock` on a well-known temp file for the rest of the
/// process, so only one test binary drives the cluster at a time.
#[cfg(unix)]
fn lock_shared_cluster() -> BootstrapResult<()> {
    if LOCK_FD.get().is_some() {
        return Ok(());
    }

    let path = std::env::temp_dir().join(LOCK_FILE_NAME);
    let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|error| {
        BootstrapError::from(eyre!("encode lock path '{}': {error}", path.display()))
    })?;

    // SAFETY: `c_path` is NUL-terminated and outlives the call.
    let fd = unsafe { libc::open(c_path.as_ptr(), libc::O_CREAT | libc::O_RDWR, 0o600) };
    if fd < 0 {
        let error = std::io::Error::last_os_error();
        return Err(BootstrapError::from(eyre!(
            "open lock file '{}': {error}",
            path.display()
        )));
    }

    // SAFETY: `fd` was just returned by `open`.
    if unsafe { libc::flock(fd, libc::LOCK_EX) } != 0 {
        let error = std::io::Error::last_os_error();
        // SAFETY: `fd` is open and owned here.
        unsafe { libc::close(fd) };
        return Err(BootstrapError::from(eyre!(
            "lock '{}': {error}",
            path.display()
        )));
    }

    if LOCK_FD.set(fd).is_err() {
        // SAFETY: another thread stored its descriptor first; this one is ours.
        unsafe { libc::close(fd) };
    }
    Ok(())
}

/// Shared cluster handle, bootstrapping it on first use.
///
/// Bootstrap is retried because concurrent binaries can briefly see a
/// half-initialised data directory.
pub fn shared_cluster_handle() -> BootstrapResult<&'static ClusterHandle> {
    pin_password();
    #[cfg(unix)]
    lock_shared_cluster()?;

    let mut attempt = 1;
    loop {
        match pg_embedded_setup_unpriv::test_support::shared_cluster_handle() {
            Ok(handle) => {
                #[cfg(unix)]
                stop_on_exit(handle);
                return Ok(handle);
            }
            Err(error) if attempt >= BOOTSTRAP_ATTEMPTS => return Err(error),
            Err(_) => {
                std::thread::sleep(BOOTSTRAP_RETRY_DELAY);
                attempt += 1;
            }
        }
    }
}

/// Pin `PG_PASSWORD` unless the caller set one.
///
/// The library generates a fresh password per process but skips `initdb`
/// when the data directory already exists, so a later binary would fail
/// authentication against the first binary's password.
fn pin_password() {
    if std::env::var_os("PG_PASSWORD").is_none() {
        // SAFETY: runs before the library starts any threads, guarded by the
        // shared-cluster lock.
        unsafe { std::env::set_var("PG_PASSWORD", STABLE_PASSWORD) };
    }
}

#[cfg(unix)]
fn read_postmaster_pid(data_dir: &Path) -> Option<i32> {
    let dir = cap_std::fs::Dir::open_ambient_dir(data_dir, cap_std::ambient_authority()).ok()?;
    let content = dir.read_to_string("postmaster.pid").ok()?;
    content.lines().next()?.trim().parse().ok()
}

/// `atexit` hook: SIGTERM the recorded postmaster, then SIGKILL if it is
/// still alive after five seconds.
#[cfg(unix)]
extern "C" fn stop_postmaster() {
    let recorded = POSTMASTER_PID.load(Ordering::Relaxed);
    if recorded <= 0 {
        return;
    }
    // The pid file must still name the same process, or the pid was reused.
    let pid = match DATA_DIR.get().and_then(|dir| read_postmaster_pid(dir)) {
        Some(current) if current == recorded => current,
        _ => return,
    };

    // SAFETY: `pid` matches the cluster's own pid file.
    if unsafe { libc::kill(pid, libc::SIGTERM) } != 0 {
        return;
    }
    for _ in 0..50 {
        std::thread::sleep(Duration::from_millis(100));
        // SAFETY: signal 0 only checks that the process exists.
        if unsafe { libc::kill(pid, 0) } != 0 {
            return;
        }
    }
    // SAFETY: as above; the graceful budget is spent.
    unsafe { libc::kill(pid, libc::SIGKILL) };
}

#[cfg(unix)]
fn stop_on_exit(handle: &ClusterHandle) {
    let data_dir = &handle.settings().data_dir;
    let Some(pid) = read_postmaster_pid(data_dir) else {
        return;
    };
    if POSTMASTER_PID
        .compare_exchange(0, pid, Ordering::Relaxed, Ordering::Relaxed)
        .is_err()
    {
        return;
    }
    let _ = DATA_DIR.set(data_dir.clone());

    // SAFETY: `stop_postmaster` only reads the statics set above.
    let rc = unsafe { libc::atexit(stop_postmaster) };
    if rc != 0 {
        eprintln!(
            "pg-embed: atexit registration failed (rc={rc}); \
             postmaster {pid} may outlive the tests"
        );
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn an_explicit_password_is_left_alone() {
        let _guard = env_lock::lock_env([("PG_PASSWORD", Some("chosen"))]);

        super::pin_password();

        assert_eq!(std::env::var("PG_PASSWORD").as_deref(), Ok("chosen"));
    }

    #[cfg(unix)]
    #[test]
    fn a_missing_data_dir_yields_no_pid() {
        let dir = std::env::temp_dir().join(format!("birdwatch-pid-{}", uuid::Uuid::new_v4()));

        assert_eq!(super::read_postmaster_pid(&dir), None);
    }
}

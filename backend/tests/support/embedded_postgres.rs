//! Per-test databases cloned from a migrated template.
//!
//! The template is named after a hash of `migrations/`, so editing a
//! migration produces a fresh template instead of reusing a stale schema.
//! Each test then gets its own `TemporaryDatabase`, dropped with the guard.

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::Duration;

use birdwatch::outbound::persistence::run_pending_migrations;
use color_eyre::eyre::{Result, WrapErr, eyre};
use pg_embedded_setup_unpriv::test_support::hash_directory;
use pg_embedded_setup_unpriv::{ClusterHandle, TemporaryDatabase};
use uuid::Uuid;

use super::atexit_cleanup::shared_cluster_handle;

static TEMPLATE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const TEMPLATE_PREFIX: &str = "birdwatch_template";
const PROVISION_ATTEMPTS: usize = 5;
const PROVISION_RETRY_DELAY: Duration = Duration::from_millis(500);

fn migrations_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations")
}

fn template_name() -> Result<String> {
    let hash = hash_directory(migrations_dir()).map_err(|err| eyre!("hash migrations: {err}"))?;
    let short = hash.get(..8).unwrap_or(&hash);
    Ok(format!("{TEMPLATE_PREFIX}_{short}"))
}

/// Create the template database and migrate it, unless it already exists.
fn ensure_template(cluster: &ClusterHandle) -> Result<String> {
    let name = template_name()?;
    let _guard = TEMPLATE_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    let exists = cluster
        .database_exists(name.as_str())
        .map_err(|err| eyre!("template check: {err:?}"))?;
    if !exists {
        cluster
            .create_database(name.as_str())
            .map_err(|err| eyre!("create template: {err:?}"))?;
        migrate_schema(&cluster.connection().database_url(&name))?;
    }
    Ok(name)
}

/// Clone a fresh database from the migrated template, retrying while other
/// test binaries hold the template open.
pub fn provision_template_database(cluster: &ClusterHandle) -> Result<TemporaryDatabase> {
    let mut last_error = eyre!("no provisioning attempt ran");
    for attempt in 1..=PROVISION_ATTEMPTS {
        let cloned = ensure_template(cluster).and_then(|template| {
            let name = format!("test_{}", Uuid::new_v4().simple());
            cluster
                .temporary_database_from_template(name.as_str(), template.as_str())
                .map_err(|err| eyre!("clone template: {err:?}"))
        });
        match cloned {
            Ok(database) => return Ok(database),
            Err(error) => {
                last_error = error.wrap_err(format!("attempt {attempt}/{PROVISION_ATTEMPTS}"));
            }
        }
        if attempt < PROVISION_ATTEMPTS {
            std::thread::sleep(PROVISION_RETRY_DELAY);
        }
    }
    Err(last_error)
}

/// Apply the crate's embedded migrations to `url` through the same entry
/// point the worker uses at start-up.
pub fn migrate_schema(url: &str) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("build migration runtime")?;
    let applied = runtime
        .block_on(run_pending_migrations(url))
        .wrap_err("run migrations")?;
    if applied == 0 {
        return Err(eyre!("fresh template had no pending migrations"));
    }
    Ok(())
}

/// Bootstrap (or join) the shared cluster and clone a fresh database.
pub fn fresh_database() -> Result<TemporaryDatabase> {
    let cluster = shared_cluster_handle().map_err(|err| eyre!("embedded cluster: {err:?}"))?;
    provision_template_database(cluster)
}

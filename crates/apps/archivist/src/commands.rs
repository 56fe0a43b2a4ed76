//! Command handlers
//!
//! Each handler returns the process exit code for a run that reached a
//! defined end; `Err` is reserved for setup failures.

use anyhow::{Context, Result};
use chrono::Local;
use chunks::{
    ChunkFetcher, ChunkStore, EdamClient, FileChunkStore, Outcome, Plan, SyncConfig, SyncDriver,
    ThreadSleeper, determine_plan, flatten, plan_backfill, resume_point,
};
use log::{error, info};
use std::path::Path;
use std::process::ExitCode;

/// Exit code for a run stopped by a fatal error
const EXIT_HALTED: u8 = 2;

fn connect(settings: &SyncConfig) -> Result<EdamClient> {
    let token = settings.token()?;
    info!(
        "Connecting to {}",
        if settings.sandbox {
            "the Evernote sandbox"
        } else {
            "Evernote"
        }
    );
    EdamClient::connect(token, settings.sandbox).context("Failed to connect to Evernote")
}

/// Archive every version newer than the archive
pub fn sync(settings: &SyncConfig) -> Result<ExitCode> {
    let client = connect(settings)?;
    let store = FileChunkStore::new(&settings.data_dir)?;

    let cursor = match determine_plan(&client, &store, settings.default_floor)? {
        Plan::UpToDate { version } => {
            println!("Already at highest version. ( {} )", version);
            return Ok(ExitCode::SUCCESS);
        }
        Plan::Sync(cursor) => cursor,
    };

    let fetcher = ChunkFetcher::new(&client, settings.filter.clone(), ThreadSleeper);
    let driver = SyncDriver::new(fetcher, &store, settings.pacing());
    let outcome = driver.run(cursor, |progress| {
        println!(
            "{:.2}% complete\t{} / {}",
            progress.percent, progress.version, progress.target
        );
    });

    match outcome {
        Outcome::Done {
            last_version,
            synced,
        } => {
            println!(
                "Archived {} versions to {} ( now at {} )",
                synced,
                store.root().display(),
                last_version
            );
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Halted { last_good, cause } => halted(last_good, cause),
    }
}

/// Fetch the versions missing between `down_to` and the highest archived one
pub fn backfill(settings: &SyncConfig, down_to: i32) -> Result<ExitCode> {
    let store = FileChunkStore::open(&settings.data_dir);
    let backfill = plan_backfill(&store, down_to)?;
    if backfill.is_empty() {
        println!(
            "Nothing to backfill between {} and {}.",
            down_to,
            backfill.ceiling()
        );
        return Ok(ExitCode::SUCCESS);
    }

    let client = connect(settings)?;
    let fetcher = ChunkFetcher::new(&client, settings.filter.clone(), ThreadSleeper);
    let driver = SyncDriver::new(fetcher, &store, settings.pacing());
    let outcome = driver.run_backfill(backfill, |progress| {
        println!(
            "{:.2}% complete\t{} ( below {} )",
            progress.percent, progress.version, progress.target
        );
    });

    match outcome {
        Outcome::Done { synced, .. } => {
            println!("Backfilled {} versions in {}", synced, store.root().display());
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Halted { last_good, cause } => halted(last_good, cause),
    }
}

fn halted(last_good: i32, cause: chunks::SyncError) -> Result<ExitCode> {
    error!("{:#}", anyhow::Error::from(cause));
    println!("Halted. Last good version: {}", last_good);
    Ok(ExitCode::from(EXIT_HALTED))
}

/// Show the latest remote version and the archive position
pub fn status(settings: &SyncConfig, json: bool) -> Result<ExitCode> {
    let client = connect(settings)?;
    let state = client.sync_state().context("Failed to read sync state")?;

    let store = FileChunkStore::open(&settings.data_dir);
    let persisted = store.persisted_versions()?;
    let archived = persisted.len();
    let highest = resume_point(persisted, settings.default_floor);
    let pending = (i64::from(state.update_count) - i64::from(highest)).max(0);

    if json {
        let report = serde_json::json!({
            "note_store_url": client.note_store_url(),
            "remote": state,
            "data_dir": store.root(),
            "archived": archived,
            "highest_persisted": highest,
            "pending": pending,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("NoteStore:          {}", client.note_store_url());
    println!("Remote version:     {}", state.update_count);
    println!(
        "Remote time:        {}",
        state.current_time.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    );
    println!(
        "Full sync before:   {}",
        state.full_sync_before.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    );
    println!("Archive:            {}", store.root().display());
    println!("Archived versions:  {}", archived);
    println!("Highest persisted:  {}", highest);
    println!("Pending:            {}", pending);
    Ok(ExitCode::SUCCESS)
}

/// Save the account's notebooks next to the version artifacts
pub fn notebooks(settings: &SyncConfig) -> Result<ExitCode> {
    let client = connect(settings)?;
    let notebooks = client
        .list_notebooks()
        .context("Failed to list notebooks")?;
    let count = notebooks.as_list().map_or(0, |items| items.len());

    let store = FileChunkStore::new(&settings.data_dir)?;
    let path = store.save_snapshot("notebooks", &flatten(&notebooks))?;
    println!("Saved {} notebooks to {}", count, path.display());
    Ok(ExitCode::SUCCESS)
}

/// Write the resolved settings as a settings file
///
/// The token is left out so the file can be shared; it is expected in the
/// environment unless added by hand.
pub fn init(settings: &SyncConfig, path: Option<&Path>, force: bool) -> Result<ExitCode> {
    let exists = match path {
        Some(path) => path.exists(),
        None => SyncConfig::exists(),
    };
    if exists && !force {
        anyhow::bail!("Settings file already exists (use --force to overwrite)");
    }

    let template = SyncConfig {
        auth_token: None,
        ..settings.clone()
    };
    let written = match path {
        Some(path) => {
            template.save_to(path)?;
            path.to_path_buf()
        }
        None => template.save()?,
    };
    println!("Wrote {}", written.display());
    Ok(ExitCode::SUCCESS)
}

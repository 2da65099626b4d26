// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `shmring stat` command - Show fill level and lock state.

use serde::Serialize;
use shmring_core::{AccessMode, RingStats};

use crate::error::CliError;
use crate::session::Session;

/// Report printed by `stat`.
#[derive(Debug, Serialize)]
struct StatReport {
    name: String,
    object_size: usize,
    mode: String,
    #[serde(flatten)]
    stats: RingStats,
    /// Whether the lock could be taken within the configured timeout. When
    /// false the figures are an unlocked snapshot.
    locked: bool,
    abandoned: bool,
}

pub async fn execute(
    session: &Session,
    name: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let ring = session.attach(name, AccessMode::ReadOnly)?;

    let (stats, locked, abandoned) = match session.acquire(&ring).await {
        Ok(guard) => (guard.stats()?, true, guard.is_abandoned()),
        Err(CliError::LockTimeout { waited_ms, .. }) => {
            tracing::warn!(name = %name, waited_ms = waited_ms, "Lock busy, reporting snapshot");
            (ring.snapshot()?, false, false)
        }
        Err(e) => return Err(e.into()),
    };

    let report = StatReport {
        name: name.to_string(),
        object_size: ring.segment().object_size()?,
        mode: ring
            .segment()
            .access_mode()
            .map(|m| m.to_string())
            .unwrap_or_default(),
        stats,
        locked,
        abandoned,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let fill = if report.stats.capacity > 1 {
        report.stats.pending as f64 * 100.0 / (report.stats.capacity - 1) as f64
    } else {
        0.0
    };

    println!("Ring: {}", report.name);
    println!("  Object Size: {} bytes", report.object_size);
    println!("  Mapped:      {}", report.mode);
    println!("  Capacity:    {} bytes", report.stats.capacity);
    println!("  Pending:     {} bytes ({:.1}%)", report.stats.pending, fill);
    println!("  Free:        {} bytes", report.stats.free);
    if !report.locked {
        println!("  (lock busy; figures are an unlocked snapshot)");
    }
    if report.abandoned {
        println!("  ⚠ Lock was abandoned by a dead holder");
    }

    Ok(())
}

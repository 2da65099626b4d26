// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `shmring create` command - Create or attach to a ring.

use shmring_core::{AccessMode, RingChannel};

use crate::error::CliError;
use crate::session::Session;

pub async fn execute(
    session: &Session,
    name: &str,
    size: Option<usize>,
    exclusive: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let configured = session.channel(name);
    let size = size
        .or_else(|| configured.map(|c| c.size))
        .ok_or_else(|| CliError::UnknownSize {
            name: name.to_string(),
        })?;
    let open_if_exists = !exclusive && configured.map_or(true, |c| c.open_if_exists);

    tracing::info!(name = %name, size = size, "Creating ring");

    let mut ring = RingChannel::new();
    let outcome = ring.create(name, size, open_if_exists)?;
    ring.map(AccessMode::ReadOnly, 0)?;
    let stats = ring.snapshot()?;

    println!("✓ {} ({})", name, outcome);
    println!("  Capacity: {} bytes", stats.capacity);
    println!("  Pending:  {} bytes", stats.pending);

    Ok(())
}

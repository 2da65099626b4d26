// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `shmring clear` command - Reset a ring to empty.

use shmring_core::AccessMode;

use crate::session::Session;

pub async fn execute(session: &Session, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let ring = session.attach(name, AccessMode::ReadWrite)?;
    let guard = session.acquire(&ring).await?;

    let dropped = guard.data_to_read().unwrap_or(0);
    guard.clear()?;
    guard.unlock()?;

    println!("✓ Cleared {} ({} pending bytes discarded)", name, dropped);
    Ok(())
}

// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `shmring write` command - Append bytes to a ring.
//!
//! All or nothing: a payload larger than the free space is rejected and
//! the ring is left unchanged.

use shmring_core::AccessMode;
use tokio::io::AsyncReadExt;

use crate::session::{handle_abandoned, Session};

pub async fn execute(
    session: &Session,
    name: &str,
    data: Option<String>,
    hex: bool,
    reset_abandoned: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = match data {
        Some(data) => data.into_bytes(),
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin().read_to_end(&mut buf).await?;
            buf
        }
    };

    let payload = if hex {
        let text = String::from_utf8_lossy(&raw);
        hex::decode(text.trim()).map_err(crate::error::CliError::from)?
    } else {
        raw
    };

    let ring = session.attach(name, AccessMode::ReadWrite)?;
    let guard = session.acquire(&ring).await?;
    handle_abandoned(&guard, reset_abandoned)?;

    guard.write(&payload)?;
    let pending = guard.data_to_read()?;
    guard.unlock()?;

    tracing::info!(name = %name, bytes = payload.len(), pending = pending, "Wrote payload");
    Ok(())
}

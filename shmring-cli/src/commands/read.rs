// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `shmring read` command - Consume pending bytes from a ring.

use shmring_core::AccessMode;
use tokio::io::AsyncWriteExt;

use crate::session::{handle_abandoned, Session};

pub async fn execute(
    session: &Session,
    name: &str,
    max: usize,
    hex: bool,
    reset_abandoned: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let ring = session.attach(name, AccessMode::ReadWrite)?;

    let mut buf = vec![0u8; max];
    let n = {
        let guard = session.acquire(&ring).await?;
        handle_abandoned(&guard, reset_abandoned)?;
        let n = guard.read(&mut buf)?;
        guard.unlock()?;
        n
    };
    buf.truncate(n);

    tracing::debug!(name = %name, bytes = n, "Read payload");

    let mut stdout = tokio::io::stdout();
    if hex {
        stdout.write_all(hex::encode(&buf).as_bytes()).await?;
        stdout.write_all(b"\n").await?;
    } else {
        stdout.write_all(&buf).await?;
    }
    stdout.flush().await?;

    Ok(())
}

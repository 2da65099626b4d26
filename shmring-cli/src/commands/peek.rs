// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `shmring peek` command - Hex dump of pending bytes without consuming them.

use shmring_core::AccessMode;

use crate::session::Session;

/// Bytes per hex dump line.
const LINE_WIDTH: usize = 16;

pub async fn execute(
    session: &Session,
    name: &str,
    max: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let ring = session.attach(name, AccessMode::ReadOnly)?;

    let mut buf = vec![0u8; max];
    let (n, pending) = {
        let guard = session.acquire(&ring).await?;
        if guard.is_abandoned() {
            tracing::warn!(name = %name, "Lock was abandoned; content may be inconsistent");
        }
        (guard.peek(&mut buf)?, guard.data_to_read()?)
    };
    buf.truncate(n);

    println!(
        "{}: showing {} of {} pending bytes (crc32 {:#010x})",
        name,
        n,
        pending,
        crc32fast::hash(&buf)
    );
    for (i, line) in buf.chunks(LINE_WIDTH).enumerate() {
        let printable: String = line
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
            .collect();
        println!(
            "{:08x}  {:<width$}  {}",
            i * LINE_WIDTH,
            hex::encode(line),
            printable,
            width = LINE_WIDTH * 2
        );
    }

    Ok(())
}

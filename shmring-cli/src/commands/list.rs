// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `shmring list` command - List channels from configuration.
//!
//! Live fill levels are shown for rings that currently exist. Listing never
//! creates a ring.

use shmring_core::{AccessMode, RingChannel, RingStats};

use crate::session::Session;

fn live_stats(name: &str) -> Option<RingStats> {
    let mut ring = RingChannel::new();
    ring.open(name).ok()?;
    ring.map(AccessMode::ReadOnly, 0).ok()?;
    ring.snapshot().ok()
}

pub async fn execute(session: &Session) -> Result<(), Box<dyn std::error::Error>> {
    let config = session.config()?;

    if config.channels.is_empty() {
        println!("No channels defined in configuration.");
        return Ok(());
    }

    println!("╔══════════════════════════════════════════════════════════════════════════════╗");
    println!("║                           CONFIGURED CHANNELS                                ║");
    println!("╠═══════════════════╦════════════╦════════════╦══════════════════════════════╣");
    println!("║ Name              ║ Size       ║ Mode       ║ Status                       ║");
    println!("╠═══════════════════╬════════════╬════════════╬══════════════════════════════╣");

    for channel in &config.channels {
        let status = match live_stats(channel.name.as_str()) {
            Some(stats) => format!("{} / {} bytes pending", stats.pending, stats.capacity - 1),
            None => "not created".to_string(),
        };

        println!(
            "║ {:<17} ║ {:<10} ║ {:<10} ║ {:<28} ║",
            channel.name.as_str(),
            channel.size,
            channel.mode.to_string(),
            status
        );
    }

    println!("╚═══════════════════╩════════════╩════════════╩══════════════════════════════╝");
    println!();
    println!("Total: {} channel(s)", config.channels.len());

    Ok(())
}

// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `shmring validate` command - Validate configuration file.

use shmring_core::ConfigLoader;

pub async fn execute(file: &str) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(file = %file, "Validating configuration");

    match ConfigLoader::load_file(file) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Lock Settings:");
            match config.lock.timeout {
                Some(timeout) => println!("  Timeout:       {}ms", timeout.as_millis()),
                None => println!("  Timeout:       none (block)"),
            }
            println!(
                "  Poll Interval: {}ms",
                config.lock.poll_interval.as_millis()
            );
            println!();
            println!("Channels ({}):", config.channels.len());
            for channel in &config.channels {
                println!(
                    "  - {} (size: {}, mode: {}, open_if_exists: {}, unlink_on_close: {})",
                    channel.name,
                    channel.size,
                    channel.mode,
                    channel.open_if_exists,
                    channel.unlink_on_close
                );
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed:");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }
}

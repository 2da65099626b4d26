// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `shmring remove` command - Unlink a ring's OS objects.
//!
//! Processes that already have the ring mapped keep using it; new attachers
//! will not find it.

use shmring_core::RingChannel;

pub async fn execute(name: &str) -> Result<(), Box<dyn std::error::Error>> {
    if RingChannel::remove(name)? {
        println!("✓ Removed {}", name);
    } else {
        println!("{} does not exist", name);
    }
    Ok(())
}

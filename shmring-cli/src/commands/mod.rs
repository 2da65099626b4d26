// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CLI command modules.

pub mod clear;
pub mod create;
pub mod list;
pub mod peek;
pub mod read;
pub mod remove;
pub mod stat;
pub mod validate;
pub mod write;

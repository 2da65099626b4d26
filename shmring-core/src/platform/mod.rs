// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Platform primitives: named shared memory objects, mapped views and the
//! robust process-shared mutex. Linux only.

mod mutex;
mod object;
mod view;

pub(crate) use mutex::RobustMutex;
pub(crate) use object::SharedObject;
pub(crate) use view::MappedView;

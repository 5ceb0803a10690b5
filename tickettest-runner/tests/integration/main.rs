// Copyright (c) The tickettest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

mod fixtures;
#[cfg(unix)]
mod full_cycle;

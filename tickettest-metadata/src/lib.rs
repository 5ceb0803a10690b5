// Copyright (c) The tickettest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structured access to tickettest machine-readable output.
//!
//! This crate contains the documented exit codes for `tickettest`, along with the schema of the
//! JSON report written by `tickettest run` and the output of
//! `tickettest list --message-format json`.

#![warn(missing_docs)]

mod exit_codes;
mod report;

pub use exit_codes::*;
pub use report::*;

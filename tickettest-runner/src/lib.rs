// Copyright (c) The tickettest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for tickettest.
//!
//! The basic flow is:
//!
//! 1. [`collect`] fetches a ticket from an [`IssueTracker`](tracker::IssueTracker), along with the
//!    issues that describe its test cases.
//! 2. [`matcher::build_pattern`] turns those test cases into a name filter for the test runner.
//! 3. [`runner::TestRunner`] invokes Jest with that filter and parses its JSON output.
//! 4. [`reconcile::reconcile`] pairs each test case with the runner's result for it.
//! 5. [`reporter`] writes results to the console, to a JSON report, and back to the tracker.

pub mod collect;
pub mod config;
pub mod errors;
pub mod helpers;
pub mod matcher;
pub mod reconcile;
pub mod reporter;
pub mod runner;
pub mod test_case;
pub mod tracker;

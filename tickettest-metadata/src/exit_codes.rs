// Copyright (c) The tickettest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `tickettest` failures.
///
/// `tickettest` runs may fail for a variety of reasons. This structure documents the exit codes
/// that may occur in case of expected failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum TicketTestExitCode {}

impl TicketTestExitCode {
    /// No errors occurred and every test case passed.
    pub const OK: i32 = 0;

    /// The ticket has no test cases to run, but no other errors occurred.
    pub const NO_TEST_CASES: i32 = 4;

    /// No test case failed, but one or more test cases were not reported by the test runner.
    pub const TEST_CASES_UNMATCHED: i32 = 5;

    /// The requested ticket does not exist in the issue tracker.
    pub const TICKET_NOT_FOUND: i32 = 91;

    /// A matching mode other than the supported ones was requested, or the test pattern could
    /// not be constructed.
    pub const UNSUPPORTED_MATCH_MODE: i32 = 94;

    /// A user issue happened while setting up a tickettest invocation.
    pub const SETUP_ERROR: i32 = 96;

    /// Talking to the issue tracker produced an error.
    pub const TRACKER_ERROR: i32 = 97;

    /// One or more test cases failed.
    pub const TEST_RUN_FAILED: i32 = 100;

    /// The test runner could not be executed, or its output could not be read.
    pub const RUNNER_FAILED: i32 = 101;

    /// Writing data to stdout, stderr or the report file produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}

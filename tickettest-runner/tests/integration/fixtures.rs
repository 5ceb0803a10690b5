// Copyright (c) The tickettest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use tickettest_runner::tracker::{InMemoryTracker, Issue, LinkDirection};

pub(crate) fn manifest_dir() -> &'static Utf8Path {
    Utf8Path::new(env!("CARGO_MANIFEST_DIR"))
}

/// Canned Jest output shared with the unit tests.
pub(crate) fn jest_output_path() -> Utf8PathBuf {
    manifest_dir().join("../fixtures/jest-output.json")
}

pub(crate) fn fake_jest_path() -> Utf8PathBuf {
    manifest_dir().join("test-helpers/fake-jest.sh")
}

/// A ticket with two subtasks, one linked test issue, one issue linked with an unrelated link
/// type, and a subtask that doesn't exist.
pub(crate) fn shop_tracker() -> InMemoryTracker {
    InMemoryTracker::new()
        .with_issue(
            Issue::new("SHOP-1", "Checkout flow")
                .with_labels(["checkout"])
                .with_subtask("SHOP-2")
                .with_subtask("SHOP-3")
                .with_subtask("SHOP-99")
                .with_link("Tests", LinkDirection::Inward, "SHOP-4")
                .with_link("Tests", LinkDirection::Inward, "SHOP-6")
                .with_link("Blocks", LinkDirection::Outward, "SHOP-5"),
        )
        .with_issue(Issue::new("SHOP-2", "adds item"))
        .with_issue(Issue::new("SHOP-3", "removes item"))
        .with_issue(Issue::new("SHOP-4", "charges card"))
        .with_issue(Issue::new("SHOP-5", "Payment provider outage"))
        .with_issue(Issue::new("SHOP-6", "refunds order"))
}

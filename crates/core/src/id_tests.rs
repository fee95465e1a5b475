// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

crate::define_id! {
    pub struct TestId("tst-");
}

#[test]
fn round_trips_through_display_and_from_string() {
    let id = TestId::new();
    let again = TestId::from_string(id.to_string());
    assert_eq!(id, again);
}

#[test]
fn suffix_strips_prefix() {
    let id = TestId::from_string("tst-abcdefghijklmnopqrs");
    assert_eq!(id.suffix(), "abcdefghijklmnopqrs");
}

#[test]
fn serializes_as_bare_string() {
    let id = TestId::from_string("tst-abcdefghijklmnopqrs");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"tst-abcdefghijklmnopqrs\"");
}

#[test]
fn two_generated_ids_differ() {
    assert_ne!(TestId::new(), TestId::new());
}

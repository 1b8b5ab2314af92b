// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Restricting artifact files to the ones a user asked for.

use crate::types::FileMap;
use std::collections::HashSet;

/// Remove every file whose name is not in `allow_list`.
///
/// An empty allow-list means no restriction and leaves `files` untouched.
pub fn filter_files(files: &mut FileMap, allow_list: &[String]) {
    if allow_list.is_empty() {
        return;
    }

    let allowed: HashSet<&str> = allow_list.iter().map(String::as_str).collect();
    files.retain(|name, _| allowed.contains(name.as_str()));
}

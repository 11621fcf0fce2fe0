// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Identifier comparison helpers
//!
//! SQL Server compares identifiers case-insensitively under the default
//! collation, and `[name]` refers to the same object as `name`.

/// Compare two identifiers the way SQL Server does by default
pub fn ident_eq(a: &str, b: &str) -> bool {
    strip_brackets(a).eq_ignore_ascii_case(strip_brackets(b))
}

/// Strip one level of `[...]` or `"..."` quoting from an identifier
///
/// Doubled closing delimiters inside the quotes are left as written; the
/// tokenizer is responsible for unescaping them.
pub fn strip_brackets(name: &str) -> &str {
    let trimmed = name.trim();
    if trimmed.len() >= 2
        && ((trimmed.starts_with('[') && trimmed.ends_with(']'))
            || (trimmed.starts_with('"') && trimmed.ends_with('"')))
    {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

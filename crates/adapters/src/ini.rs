// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A narrow `.ini` reader covering exactly what `application.ini` and
//! `email.ini` use: `[section]` headers, `key = value` / `key: value` pairs,
//! `;`/`#` comments, and blank lines. No interpolation, no multi-line
//! values.

use std::collections::BTreeMap;

/// Section name -> key -> value.
pub type IniDocument = BTreeMap<String, BTreeMap<String, String>>;

pub fn parse_ini(contents: &str) -> IniDocument {
    let mut doc = IniDocument::new();
    let mut section = String::new();

    for raw_line in contents.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            section = name.trim().to_string();
            doc.entry(section.clone()).or_default();
            continue;
        }
        let Some((key, value)) = split_key_value(line) else {
            continue;
        };
        doc.entry(section.clone())
            .or_default()
            .insert(key.trim().to_string(), value.trim().to_string());
    }

    doc
}

fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let eq = line.find('=');
    let colon = line.find(':');
    let sep = match (eq, colon) {
        (Some(e), Some(c)) => e.min(c),
        (Some(e), None) => e,
        (None, Some(c)) => c,
        (None, None) => return None,
    };
    Some((&line[..sep], &line[sep + 1..]))
}

pub fn get<'a>(doc: &'a IniDocument, section: &str, key: &str) -> Option<&'a str> {
    doc.get(section).and_then(|kv| kv.get(key)).map(String::as_str)
}

#[cfg(test)]
#[path = "ini_tests.rs"]
mod tests;

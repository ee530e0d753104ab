//! Canonical binary encoding of build step metadata
//!
//! The encoding is part of the cache key contract: any change to field order,
//! integer widths or string framing changes every InputHash. Bump
//! `ENCODING_VERSION` when the layout changes.
//!
//! | # | Field          | Encoding                                   |
//! |---|----------------|--------------------------------------------|
//! | 1 | version byte   | `u8` = `ENCODING_VERSION`                  |
//! | 2 | command        | `str`                                      |
//! | 3 | outputs        | `u64` count, then `str` kind, `str` path   |
//! | 4 | context        | `u64` count, then `str` key, `str` value   |
//! | 5 | name           | `str`                                      |
//! | 6 | step version   | `i64`                                      |
//! | 7 | cpu arch       | `str`                                      |
//!
//! `str` is a little-endian `u64` byte length followed by UTF-8 bytes. Maps
//! are written in ascending key order. Dependency contents are not part of
//! this encoding; they are digested separately. Dependency paths are left out
//! on purpose: renaming a dependency with unchanged content keeps the hash.

use crate::step::BuildStep;
use std::path::Path;

/// Current metadata encoding version
pub const ENCODING_VERSION: u8 = 1;

/// Encode the hash-relevant metadata of a build step
pub fn encode_metadata(step: &BuildStep) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);
    buf.push(ENCODING_VERSION);

    put_str(&mut buf, &step.command);

    // BTreeMap iteration is already key-sorted
    put_u64(&mut buf, step.outputs.len() as u64);
    for (kind, path) in &step.outputs {
        put_str(&mut buf, kind);
        put_path(&mut buf, path);
    }

    put_u64(&mut buf, step.context.len() as u64);
    for (key, value) in &step.context {
        put_str(&mut buf, key);
        put_str(&mut buf, value);
    }

    put_str(&mut buf, &step.name);
    buf.extend_from_slice(&step.version.to_le_bytes());
    put_str(&mut buf, step.arch.as_str());

    buf
}

fn put_u64(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn put_str(buf: &mut Vec<u8>, value: &str) {
    put_u64(buf, value.len() as u64);
    buf.extend_from_slice(value.as_bytes());
}

fn put_path(buf: &mut Vec<u8>, path: &Path) {
    put_str(buf, &path.to_string_lossy());
}

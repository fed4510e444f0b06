//! Zip archive assembly for share downloads.

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::Result;

/// Build an in-memory zip from `(name, bytes)` pairs.
///
/// Entries are stored uncompressed. Repeated names get a ` (n)` suffix
/// before the extension so that every file of the share is kept.
pub fn build_archive<'a, I>(entries: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let mut used = HashSet::new();

    for (name, data) in entries {
        let entry_name = unique_entry_name(name, &mut used);
        writer.start_file(entry_name, options)?;
        writer.write_all(data)?;
    }

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}

fn unique_entry_name(name: &str, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_string()) {
        return name.to_string();
    }

    let path = Path::new(name);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(name);
    let ext = path.extension().and_then(|e| e.to_str());

    let mut n = 1;
    loop {
        let candidate = match ext {
            Some(ext) => format!("{stem} ({n}).{ext}"),
            None => format!("{stem} ({n})"),
        };
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

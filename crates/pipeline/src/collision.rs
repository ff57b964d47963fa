use std::collections::BTreeSet;

/// Picks the lowest free version for `base` among `existing` file names.
///
/// Candidates are `{base}_v1{.ext}`, `{base}_v2{.ext}`, ... and the first one
/// not in `existing` wins, so gaps are reused. Names are compared exactly;
/// `extension` is given without the leading dot and keeps its case.
///
/// ```
/// use routine_pipeline::resolve_collision;
/// use std::collections::BTreeSet;
///
/// let existing = BTreeSet::from(["Song_v1.mp3".to_string(), "Song_v2.mp3".to_string()]);
/// assert_eq!(resolve_collision("Song", Some("mp3"), &existing), ("Song_v3.mp3".to_string(), 3));
/// ```
pub fn resolve(base: &str, extension: Option<&str>, existing: &BTreeSet<String>) -> (String, u32) {
    let suffix = match extension {
        Some(ext) if !ext.is_empty() => format!(".{ext}"),
        _ => String::new(),
    };
    let mut version: u32 = 1;
    loop {
        let candidate = format!("{base}_v{version}{suffix}");
        if !existing.contains(&candidate) {
            return (candidate, version);
        }
        version += 1;
    }
}

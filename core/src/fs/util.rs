//! Name helpers shared by the folder and archive backends.
//!
//! Entry names are handled as plain strings rather than `Path`s because archive entries use
//! `/` on every platform while folder names may carry either separator.

const SEPARATORS: &[char] = &['/', '\\'];

/// Split a name into its path segments, ignoring empty ones.
pub fn segments(name: &str) -> impl Iterator<Item = &str> {
    name.split(SEPARATORS).filter(|segment| !segment.is_empty())
}

/// Final path segment of `name`.
pub fn file_name(name: &str) -> &str {
    name.rsplit(SEPARATORS).next().unwrap_or(name)
}

/// Extension of the final segment including the dot (`".png"`), or `""` when there is none.
pub fn extension(name: &str) -> &str {
    let file = file_name(name);
    file.rfind('.').map(|dot| &file[dot..]).unwrap_or("")
}

/// Final segment with its extension removed.
pub fn stem(name: &str) -> &str {
    let file = file_name(name);
    file.rfind('.').map(|dot| &file[..dot]).unwrap_or(file)
}

/// Whether any segment of `name` is dot-prefixed or a macOS resource-fork folder.
pub fn is_hidden(name: &str) -> bool {
    segments(name).any(|segment| segment.starts_with('.') || segment == "__MACOSX")
}

/// Whether the extension of `name` appears in the lowercase allow-list.
pub fn is_recognized(name: &str, extensions: &[String]) -> bool {
    let ext = extension(name).trim_start_matches('.');
    if ext.is_empty() {
        return false;
    }
    let lower = ext.to_ascii_lowercase();
    extensions.iter().any(|allowed| *allowed == lower)
}

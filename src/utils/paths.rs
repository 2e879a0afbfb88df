use regex::Regex;
use std::sync::LazyLock;

static SLASH_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new("//+").expect("valid regex"));

/// Convert every directory separator to `/` and collapse repeated slashes.
pub fn normalize_separators(path: &str) -> String {
    let norm = path.replace('\\', "/");
    SLASH_RUN.replace_all(&norm, "/").into_owned()
}

/// File name after the last separator, or the whole input when there is none.
pub fn short_file_name(full_path: &str) -> &str {
    match full_path.rfind(['/', '\\']) {
        Some(idx) => &full_path[idx + 1..],
        None => full_path,
    }
}

/// Directory portion including the trailing slash, empty when there is none.
pub fn directory_part(full_path: &str) -> String {
    let norm = normalize_separators(full_path);
    match norm.rfind('/') {
        Some(idx) => norm[..=idx].to_string(),
        None => String::new(),
    }
}

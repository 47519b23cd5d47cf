//! Extension, size and count filtering applied before transfers start.

use std::collections::HashSet;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const SIZE_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// Lowercased text after the last `.`; the whole name when there is no dot.
pub fn extract_extension(file_name: &str) -> String {
    file_name
        .rsplit('.')
        .next()
        .unwrap_or(file_name)
        .to_lowercase()
}

/// Turns `"pdf, .PNG"` into the accept string `".pdf,.png"`.
///
/// Empty input or `*` accepts everything (`*/*`).
pub fn normalize_allowed_types(file_types: Option<&str>) -> String {
    let Some(types) = file_types.map(str::trim).filter(|t| !t.is_empty() && *t != "*") else {
        return "*/*".to_string();
    };

    types
        .split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .map(|ext| if ext.starts_with('.') { ext } else { format!(".{ext}") })
        .collect::<Vec<_>>()
        .join(",")
}

/// Human-readable size with one decimal, trailing zeros dropped.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let fixed = format!("{value:.1}");
    let clean = if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.')
    } else {
        fixed.as_str()
    };
    format!("{clean} {}", SIZE_UNITS[unit])
}

/// Caller-side file admission rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileFilter {
    /// Lowercased extensions without the dot; `None` allows all.
    pub allowed_extensions: Option<HashSet<String>>,
    /// Maximum size in MiB; `None` means unlimited.
    pub max_size_mb: Option<f64>,
    /// Maximum number of files held at once.
    pub max_file_count: Option<usize>,
}

/// Result of filtering a selection.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome<T> {
    pub allowed: Vec<T>,
    /// Count of files dropped for type or size.
    pub rejected: usize,
}

impl FileFilter {
    /// Parses a comma-separated extension list (`"pdf, docx"`).
    ///
    /// Non-positive sizes are treated as unlimited.
    pub fn new(extensions: Option<&str>, max_size_mb: Option<f64>) -> Self {
        let allowed_extensions = extensions
            .map(|list| {
                list.split(',')
                    .map(|e| e.trim().trim_start_matches('.').to_lowercase())
                    .filter(|e| !e.is_empty())
                    .collect::<HashSet<_>>()
            })
            .filter(|set| !set.is_empty());

        Self {
            allowed_extensions,
            max_size_mb: max_size_mb.filter(|mb| *mb > 0.0),
            max_file_count: None,
        }
    }

    pub fn with_max_file_count(mut self, max: usize) -> Self {
        self.max_file_count = Some(max);
        self
    }

    /// Returns `true` if a file passes both the type and the size rule.
    pub fn allows(&self, file_name: &str, size: u64) -> bool {
        let type_ok = self
            .allowed_extensions
            .as_ref()
            .is_none_or(|set| set.contains(&extract_extension(file_name)));
        let size_ok = self
            .max_size_mb
            .is_none_or(|max| size as f64 / BYTES_PER_MB <= max);
        type_ok && size_ok
    }

    /// Splits a selection into allowed files and a rejected count.
    pub fn partition<T>(&self, files: Vec<T>, describe: impl Fn(&T) -> (&str, u64)) -> FilterOutcome<T> {
        let mut allowed = Vec::with_capacity(files.len());
        let mut rejected = 0;
        for file in files {
            let (name, size) = describe(&file);
            if self.allows(name, size) {
                allowed.push(file);
            } else {
                rejected += 1;
            }
        }
        FilterOutcome { allowed, rejected }
    }

    /// Returns `true` if adding `incoming` files to `existing` would exceed the cap.
    pub fn exceeds_count(&self, existing: usize, incoming: usize) -> bool {
        self.max_file_count
            .is_some_and(|max| existing + incoming > max)
    }
}

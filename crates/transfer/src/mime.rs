use cloudfiles_protocol::constants::OCTET_STREAM;

/// Exact base types allowed through to the local save step.
const ALLOWED_TYPES: &[&str] = &[
    OCTET_STREAM,
    "application/json",
    "application/pdf",
    "application/zip",
    "application/x-bzip",
    "text/plain",
    "text/markdown",
    "text/html",
    "text/xml",
    "image/svg+xml",
];

/// Major types allowed wholesale.
const ALLOWED_MAJOR_TYPES: &[&str] = &["image/", "audio/", "video/", "font/"];

/// Normalizes a server-declared MIME type against the allow-list.
///
/// Parameters after `;` are dropped and the base type is lowercased.
/// Anything outside the list becomes `application/octet-stream`, so an
/// untrusted declaration cannot trigger native rendering on save.
pub fn resolve_safe_mime_type(mime_type: Option<&str>) -> String {
    let raw = mime_type.filter(|m| !m.is_empty()).unwrap_or(OCTET_STREAM);
    let base = raw.split(';').next().unwrap_or_default().trim().to_lowercase();

    let allowed = ALLOWED_TYPES.contains(&base.as_str())
        || ALLOWED_MAJOR_TYPES.iter().any(|major| base.starts_with(major));

    if allowed { base } else { OCTET_STREAM.to_string() }
}

/// Short display label for a MIME type (`application/pdf` → `pdf`).
pub fn file_type_label(mime_type: &str) -> Option<String> {
    if mime_type.is_empty() {
        return None;
    }

    const OFFICE_LABELS: &[(&str, &str)] = &[
        ("vnd.openxmlformats-officedocument.wordprocessingml.document", "msword"),
        ("vnd.openxmlformats-officedocument.spreadsheetml.sheet", "excel"),
        ("vnd.openxmlformats-officedocument.presentationml.presentation", "powerpoint"),
        ("vnd.oasis.opendocument.presentation", "presentation"),
        ("vnd.oasis.opendocument.spreadsheet", "spreadsheet"),
        ("vnd.oasis.opendocument.text", "text"),
        ("vnd.ms-powerpoint", "powerpoint"),
    ];
    if let Some((_, label)) = OFFICE_LABELS.iter().find(|(needle, _)| mime_type.contains(needle)) {
        return Some((*label).to_string());
    }

    let subtype = match mime_type.rfind('/') {
        Some(slash) if slash + 1 < mime_type.len() && !mime_type[slash + 1..].contains(';') => {
            &mime_type[slash + 1..]
        }
        _ => mime_type,
    };
    Some(subtype.to_lowercase())
}

use std::path::{Component, Path};

use cloudfiles_protocol::constants::DEFAULT_DOWNLOAD_NAME;

use crate::TransferError;

/// Validates that a download name is a single plain file name.
///
/// Rejects:
/// - Empty names
/// - Absolute paths (Unix `/` or Windows `C:\`)
/// - Parent directory traversal (`..`)
/// - Any directory separator (the name must not create subdirectories)
pub fn validate_file_name(file_name: &str) -> Result<(), TransferError> {
    if file_name.is_empty() {
        return Err(TransferError::InvalidPath("empty file name".into()));
    }

    let path = Path::new(file_name);
    if path.is_absolute() {
        return Err(TransferError::InvalidPath(format!(
            "absolute path not allowed: {file_name}"
        )));
    }

    let mut components = path.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        (Some(Component::ParentDir), _) | (_, Some(Component::ParentDir)) => {
            Err(TransferError::InvalidPath(format!(
                "parent directory traversal not allowed: {file_name}"
            )))
        }
        _ => Err(TransferError::InvalidPath(format!(
            "file name must not contain directories: {file_name}"
        ))),
    }
}

/// Returns `file_name` if usable, otherwise the default download name.
pub fn sanitize_download_name(file_name: Option<&str>) -> String {
    match file_name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) if validate_file_name(name).is_ok() => name.to_string(),
        _ => DEFAULT_DOWNLOAD_NAME.to_string(),
    }
}

//! Naming helpers for scratch files and remote folders.

use crate::{CoreError, CoreResult};

/// Characters the document library rejects in folder names.
const ILLEGAL_FOLDER_CHARS: &[char] = &['"', '*', ':', '<', '>', '?', '/', '\\', '|'];

/// Reduce an uploaded filename to its base name, stripping any directory
/// components a hostile client could smuggle in. Empty and dot-only names
/// are rejected.
pub fn sanitize_filename(name: &str) -> CoreResult<String> {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim();

    if base.is_empty() || base == "." || base == ".." {
        return Err(CoreError::InvalidFilename(name.to_string()));
    }

    Ok(base.to_string())
}

/// Strip characters that are illegal in document-library folder names.
/// Empty results fall back to a placeholder so the remote path stays valid.
pub fn sanitize_client_folder(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !ILLEGAL_FOLDER_CHARS.contains(c))
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        "SinNombre".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Keep only alphanumerics, spaces, dashes and underscores — safe for use
/// inside a local filename.
pub fn sanitize_for_filename(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .to_string()
}

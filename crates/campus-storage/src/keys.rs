//! Shared object naming for storage backends.
//!
//! Object name format: `{stem}-{unix_millis}-{random13}.{ext}` where `stem` is the original file
//! name without its extension and with every character outside `[A-Za-z0-9]` replaced by `-`.

use crate::traits::{StorageError, StorageResult};
use rand::Rng;

const RANDOM_SUFFIX_LEN: usize = 13;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

fn random_suffix() -> String {
    let mut rng = rand::rng();
    (0..RANDOM_SUFFIX_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect()
}

/// Generate a collision-resistant object name for `original_name`.
///
/// The extension is the text after the last `.`; a name without a dot gets no extension.
/// The result never contains `/`, `..` or whitespace.
pub fn generate_object_name(original_name: &str) -> String {
    let original_name = original_name.trim();
    let (stem, ext) = match original_name.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() => (stem, Some(ext)),
        _ => (original_name, None),
    };

    let mut stem = sanitize(stem);
    if stem.is_empty() {
        stem.push_str("file");
    }
    let timestamp = chrono::Utc::now().timestamp_millis();
    let suffix = random_suffix();

    let ext = ext
        .map(|e| e.chars().filter(|c| c.is_ascii_alphanumeric()).collect::<String>())
        .filter(|e| !e.is_empty());

    match ext {
        Some(ext) => format!("{}-{}-{}.{}", stem, timestamp, suffix, ext),
        None => format!("{}-{}-{}", stem, timestamp, suffix),
    }
}

/// Reject object paths that could escape their bucket.
pub fn validate_object_path(path: &str) -> StorageResult<()> {
    if path.is_empty() {
        return Err(StorageError::InvalidKey("Object path is empty".to_string()));
    }
    if path.contains("..") || path.starts_with('/') || path.contains('\\') || path.contains('\0') {
        return Err(StorageError::InvalidKey(format!(
            "Object path contains invalid characters: {}",
            path
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_object_name_format() {
        let name = generate_object_name("Mi Foto (1).PNG");
        assert!(name.starts_with("Mi-Foto--1--"), "{}", name);
        assert!(name.ends_with(".PNG"));

        let parts: Vec<&str> = name.trim_end_matches(".PNG").rsplitn(3, '-').collect();
        assert_eq!(parts[0].len(), 13);
        assert!(parts[0].chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert!(parts[1].parse::<i64>().is_ok());
    }

    #[test]
    fn test_generate_object_name_without_extension() {
        let name = generate_object_name("README");
        assert!(name.starts_with("README-"));
        assert!(!name.contains('.'));
    }

    #[test]
    fn test_generate_object_name_hostile_input() {
        let name = generate_object_name("../../etc/passwd.sh");
        assert!(validate_object_path(&name).is_ok());
        assert!(!name.contains('/'));

        let dotfile = generate_object_name(".env");
        assert!(dotfile.starts_with("file-"));
        assert!(dotfile.ends_with(".env"));
    }

    #[test]
    fn test_generate_object_name_unique() {
        let names: HashSet<String> = (0..1000).map(|_| generate_object_name("a.png")).collect();
        assert_eq!(names.len(), 1000);
    }

    #[test]
    fn test_validate_object_path() {
        assert!(validate_object_path("courses/1/a.png").is_ok());
        assert!(validate_object_path("").is_err());
        assert!(validate_object_path("/abs").is_err());
        assert!(validate_object_path("users/../secret").is_err());
        assert!(validate_object_path("users\\1").is_err());
    }
}

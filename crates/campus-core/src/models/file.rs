/// A user-selected file as handed over by a file input or a drop zone.
///
/// `declared_size` and `mime_type` are what the picker reported; validation trusts them,
/// just like the browser `File` object it replaces.
#[derive(Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub name: String,
    pub declared_size: u64,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl FileHandle {
    /// Build a handle whose declared size is the length of `data`.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_size: data.len() as u64,
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Build a handle with an explicit declared size (the bytes may be a placeholder).
    pub fn with_declared_size(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        declared_size: u64,
        data: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            declared_size,
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// Extension after the last dot, if any.
    pub fn extension(&self) -> Option<&str> {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
    }
}

impl std::fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandle")
            .field("name", &self.name)
            .field("declared_size", &self.declared_size)
            .field("mime_type", &self.mime_type)
            .field("data_len", &self.data.len())
            .finish()
    }
}

/// Human readable size: `0 Bytes`, `512 Bytes`, `1.5 KB`, `5 MB`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

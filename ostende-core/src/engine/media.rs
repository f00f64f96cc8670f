//! Playable media detection inside retrieved content

use serde::Serialize;

use super::ContentFile;

/// Container formats recognised by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContainerFormat {
    Mp4,
    WebM,
    Mkv,
    Avi,
    Mov,
    Unknown,
}

impl ContainerFormat {
    /// Detects the container from a file name's extension.
    pub fn from_file_name(name: &str) -> Self {
        match file_extension(name).as_deref() {
            Some("mp4") | Some("m4v") => ContainerFormat::Mp4,
            Some("webm") => ContainerFormat::WebM,
            Some("mkv") => ContainerFormat::Mkv,
            Some("avi") => ContainerFormat::Avi,
            Some("mov") => ContainerFormat::Mov,
            _ => ContainerFormat::Unknown,
        }
    }

    /// Returns the MIME type for the render target
    pub fn mime_type(&self) -> &'static str {
        match self {
            ContainerFormat::Mp4 => "video/mp4",
            ContainerFormat::WebM => "video/webm",
            ContainerFormat::Mkv => "video/x-matroska",
            ContainerFormat::Avi => "video/x-msvideo",
            ContainerFormat::Mov => "video/quicktime",
            ContainerFormat::Unknown => "application/octet-stream",
        }
    }
}

/// Lower-cased extension without the dot.
fn file_extension(name: &str) -> Option<String> {
    let (stem, extension) = name.rsplit_once('.')?;
    if stem.is_empty() || extension.is_empty() {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}

/// Whether `name` ends with one of the allowed extensions.
pub fn is_playable(name: &str, allowed_extensions: &[String]) -> bool {
    file_extension(name)
        .is_some_and(|extension| allowed_extensions.iter().any(|allowed| *allowed == extension))
}

/// First file in listing order whose extension is allowed.
pub fn find_playable_file<'a>(
    files: &'a [ContentFile],
    allowed_extensions: &[String],
) -> Option<&'a ContentFile> {
    files
        .iter()
        .find(|file| is_playable(&file.name, allowed_extensions))
}

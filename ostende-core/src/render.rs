//! Rendering boundary: the single display surface a session plays into.

use std::fmt;

use tokio::io::AsyncRead;

use crate::engine::{ContainerFormat, ContentFile, RenderSignals};

/// Opaque handle on the selected media file, streamed by the engine.
pub struct PlayableFile {
    file: ContentFile,
    stream: Box<dyn AsyncRead + Send + Unpin>,
}

impl PlayableFile {
    pub fn new(file: ContentFile, stream: Box<dyn AsyncRead + Send + Unpin>) -> Self {
        Self { file, stream }
    }

    pub fn name(&self) -> &str {
        &self.file.name
    }

    pub fn length(&self) -> u64 {
        self.file.length
    }

    pub fn format(&self) -> ContainerFormat {
        ContainerFormat::from_file_name(&self.file.name)
    }

    pub fn file(&self) -> &ContentFile {
        &self.file
    }

    /// Gives up the handle for the underlying byte stream.
    pub fn into_stream(self) -> Box<dyn AsyncRead + Send + Unpin> {
        self.stream
    }
}

impl fmt::Debug for PlayableFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayableFile")
            .field("file", &self.file)
            .finish_non_exhaustive()
    }
}

/// Caller-supplied output surface, exclusively owned by one session.
///
/// Holds at most one file. `attach` must not block: completion, failure
/// and the first produced output are reported through `signals`.
pub trait RenderTarget: Send {
    /// Attaches `file`, replacing whatever was attached before.
    fn attach(&mut self, file: PlayableFile, signals: RenderSignals);

    /// Detaches the current file, if any.
    fn detach(&mut self);
}

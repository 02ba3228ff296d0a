//! JSON-lines outbox for digests.
#![forbid(unsafe_code)]

use std::io::{self, Write};

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};

use crate::{CourseDigest, DigestError, DigestSink};

/// Appends each digest as one JSON document per line.
///
/// The file and its parent directory are created on first delivery. A
/// downstream mailer consumes the outbox.
#[derive(Debug, Clone)]
pub struct JsonLinesDigestSink {
    path: Utf8PathBuf,
}

impl JsonLinesDigestSink {
    /// Write digests to `path`.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Outbox location.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

#[async_trait]
impl DigestSink for JsonLinesDigestSink {
    async fn deliver(&self, digest: &CourseDigest) -> Result<(), DigestError> {
        let mut line =
            serde_json::to_string(digest).map_err(|source| DigestError::Serialise {
                course_id: digest.course_id,
                source,
            })?;
        line.push('\n');
        let target = self.path.clone();
        tokio::task::spawn_blocking(move || append_line(&target, &line))
            .await
            .map_err(io::Error::other)
            .and_then(|written| written)
            .map_err(|source| DigestError::WriteOutbox {
                path: self.path.clone(),
                source,
            })
    }
}

fn append_line(path: &Utf8Path, line: &str) -> io::Result<()> {
    let mut file = suitec_fs::open_append(path)?;
    file.write_all(line.as_bytes())?;
    file.flush()
}

use std::io;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::response::Response;

/// Status line plus headers in ascending key order, ending with the blank
/// line that terminates the header block.
pub fn serialize_head(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::new();

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        resp.proto,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    // Headers
    let mut keys: Vec<&String> = resp.headers.keys().collect();
    keys.sort();
    for k in keys {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(resp.headers[k].as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf
}

pub struct ResponseWriter {
    head: Vec<u8>,
    body_path: Option<PathBuf>,
    content_length: Option<usize>,
}

impl ResponseWriter {
    pub fn new(response: &Response) -> Self {
        Self {
            head: serialize_head(response),
            body_path: response.file_path.clone(),
            content_length: response
                .headers
                .get("Content-Length")
                .and_then(|v| v.parse().ok()),
        }
    }

    /// Writes the head, then the file body if there is one.
    ///
    /// The body is read before anything is written and never exceeds the
    /// declared `Content-Length`. A file that shrank below it since the
    /// head was built fails with nothing written, so a keep-alive peer
    /// never sees a short body. The first failure aborts the rest; nothing
    /// is retried.
    pub async fn write_to_stream<W>(&self, stream: &mut W) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let body = match &self.body_path {
            Some(path) => Some(self.read_body(path).await?),
            None => None,
        };

        stream.write_all(&self.head).await?;
        if let Some(body) = &body {
            stream.write_all(body).await?;
        }

        stream.flush().await
    }

    async fn read_body(&self, path: &Path) -> io::Result<Vec<u8>> {
        let mut body = tokio::fs::read(path).await?;
        if let Some(len) = self.content_length {
            if body.len() < len {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "{} shrank to {} bytes, {} declared",
                        path.display(),
                        body.len(),
                        len
                    ),
                ));
            }
            body.truncate(len);
        }
        Ok(body)
    }
}

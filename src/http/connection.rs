use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Instant;

use crate::config::Config;
use crate::files::DocumentRoot;
use crate::http::parser::{ReadError, RequestError, RequestReader};
use crate::http::request::Request;
use crate::http::response::{Response, StatusCode};
use crate::http::writer::ResponseWriter;

/// Immutable per-server settings shared by every connection.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub document_root: DocumentRoot,
    /// Read deadline armed before each request
    pub idle_timeout: Duration,
}

impl ConnectionSettings {
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            document_root: DocumentRoot::open(&cfg.static_files.root)?,
            idle_timeout: cfg.server.idle_timeout(),
        })
    }
}

pub struct Connection<S = TcpStream> {
    reader: RequestReader<S>,
    settings: Arc<ConnectionSettings>,
    state: ConnectionState,
}

pub enum ConnectionState {
    AwaitingRequest,
    Responding(Response, Disposition),
    Closed,
}

/// What happens to the connection once a response has been written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    KeepAlive,
    Close,
}

/// Anything but a 200 closes the connection, including a 404 for a client
/// that wanted to keep it open. A 200 closes only on `Connection: close`.
pub fn disposition_for(response: &Response) -> Disposition {
    match response.status {
        StatusCode::BadRequest | StatusCode::NotFound => Disposition::Close,
        StatusCode::Ok => match &response.request {
            Some(req) if req.close => Disposition::Close,
            Some(_) => Disposition::KeepAlive,
            None => Disposition::Close,
        },
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, settings: Arc<ConnectionSettings>) -> Self {
        Self {
            reader: RequestReader::new(stream),
            settings,
            state: ConnectionState::AwaitingRequest,
        }
    }

    /// Serves requests until the connection is closed.
    ///
    /// A write failure is returned after the stream has been shut down.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let result = self.serve().await;
        // The peer may already be gone.
        let _ = self.reader.get_mut().shutdown().await;
        result
    }

    async fn serve(&mut self) -> anyhow::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::AwaitingRequest => {
                    self.reader
                        .set_deadline(Instant::now() + self.settings.idle_timeout);

                    self.state = match self.reader.read_request().await {
                        Ok(request) => {
                            let response = self.handle_request(request).await;
                            let disposition = disposition_for(&response);
                            ConnectionState::Responding(response, disposition)
                        }
                        Err(err) => Self::handle_read_error(err),
                    };
                }

                ConnectionState::Responding(response, disposition) => {
                    ResponseWriter::new(&response)
                        .write_to_stream(self.reader.get_mut())
                        .await
                        .with_context(|| {
                            format!("failed to write {} response", response.status.as_u16())
                        })?;

                    if disposition == Disposition::KeepAlive {
                        self.state = ConnectionState::AwaitingRequest; // go back for next request
                    } else {
                        self.state = ConnectionState::Closed;
                    }
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }

    async fn handle_request(&self, req: Request) -> Response {
        let response = match self.settings.document_root.resolve(&req.url).await {
            Some(file) => Response::ok(req, file),
            None => Response::not_found(req),
        };

        if let Some(req) = &response.request {
            tracing::info!(
                method = req.method.as_str(),
                url = %req.url,
                host = %req.host,
                status = response.status.as_u16(),
                "Request handled"
            );
        }

        response
    }

    fn handle_read_error(err: RequestError) -> ConnectionState {
        match err.kind {
            ReadError::EndOfInput => {
                tracing::debug!("Connection closed by peer");
                ConnectionState::Closed
            }
            ReadError::TimedOut if !err.bytes_received => {
                tracing::debug!("Idle timeout, closing connection");
                ConnectionState::Closed
            }
            _ => {
                tracing::debug!(error = %err, "Rejecting request");
                ConnectionState::Responding(Response::bad_request(), Disposition::Close)
            }
        }
    }
}

//! HTTP front end
//!
//! `GET /filteredimage?image_url=<url>` runs the pipeline and streams the
//! resulting JPEG back, deleting the transient file once the response has
//! been written. Every pipeline failure becomes the same 422 response.

use crate::pipeline::FilterPipeline;
use crate::{Error, Result};
use reqwest::Url;
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use tiny_http::{Header, Method, Request, Response, Server};
use tracing::{debug, error, info, warn};

pub const INDEX_MESSAGE: &str = "try GET /filteredimage?image_url={{}}";
pub const MISSING_URL_MESSAGE: &str = "image_url is required";
pub const UNPROCESSABLE_MESSAGE: &str = "Unable to process the image at the provided URL.";

#[derive(Debug, PartialEq, Eq)]
pub enum Route {
    Index,
    FilteredImage { image_url: Option<String> },
    NotFound,
}

impl Route {
    /// Matches a request line. `raw_url` is the path plus query as sent by
    /// the client.
    pub fn parse(method: &Method, raw_url: &str) -> Self {
        if *method != Method::Get {
            return Route::NotFound;
        }

        let Ok(url) = Url::parse("http://localhost").and_then(|base| base.join(raw_url)) else {
            return Route::NotFound;
        };

        match url.path() {
            "/" => Route::Index,
            "/filteredimage" => {
                let image_url = url
                    .query_pairs()
                    .find(|(key, _)| key == "image_url")
                    .map(|(_, value)| value.into_owned())
                    .filter(|value| !value.is_empty());
                Route::FilteredImage { image_url }
            }
            _ => Route::NotFound,
        }
    }
}

#[derive(Serialize)]
struct MessageBody<'a> {
    message: &'a str,
}

fn header(name: &str, value: &str) -> Option<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).ok()
}

fn with_content_type<R: Read>(response: Response<R>, content_type: &str) -> Response<R> {
    match header("Content-Type", content_type) {
        Some(h) => response.with_header(h),
        None => response,
    }
}

fn text_response(status: u16, body: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    with_content_type(
        Response::from_data(body.as_bytes().to_vec()).with_status_code(status),
        "text/plain; charset=utf-8",
    )
}

fn json_message(status: u16, message: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    let body = serde_json::to_vec(&MessageBody { message }).unwrap_or_default();
    with_content_type(
        Response::from_data(body).with_status_code(status),
        "application/json",
    )
}

/// Writes a response on the blocking pool; tiny_http's writer is synchronous.
async fn respond<R>(request: Request, response: Response<R>)
where
    R: Read + Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || request.respond(response)).await;
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("Failed to write response: {}", e),
        Err(e) => error!("Response task join error: {}", e),
    }
}

/// Streams the artifact, then deletes it whether or not the send succeeded.
async fn send_artifact(request: Request, path: PathBuf, pipeline: Arc<FilterPipeline>) {
    let outcome = tokio::task::spawn_blocking(move || {
        let sent = match File::open(&path) {
            Ok(file) => request.respond(with_content_type(Response::from_file(file), "image/jpeg")),
            Err(e) => {
                warn!("Filtered image {} vanished before sending: {}", path.display(), e);
                request.respond(json_message(422, UNPROCESSABLE_MESSAGE))
            }
        };
        if let Err(e) = sent {
            debug!("Failed to send {}: {}", path.display(), e);
        }
        pipeline.cleanup(&[path]);
    })
    .await;

    if let Err(e) = outcome {
        error!("Send task join error: {}", e);
    }
}

pub async fn dispatch(request: Request, pipeline: Arc<FilterPipeline>) {
    let route = Route::parse(request.method(), request.url());
    debug!("{} {} -> {:?}", request.method(), request.url(), route);

    match route {
        Route::Index => respond(request, text_response(200, INDEX_MESSAGE)).await,
        Route::FilteredImage { image_url: None } => {
            respond(request, json_message(400, MISSING_URL_MESSAGE)).await
        }
        Route::FilteredImage {
            image_url: Some(image_url),
        } => {
            let result = pipeline.filter_image_from_url(&image_url).await;
            match result {
                Ok(artifact) => send_artifact(request, artifact.into_path(), pipeline).await,
                Err(e) => {
                    warn!("Unable to filter {} ({:?}): {}", image_url, e.kind(), e);
                    respond(request, json_message(422, UNPROCESSABLE_MESSAGE)).await
                }
            }
        }
        Route::NotFound => respond(request, text_response(404, "404 Not Found")).await,
    }
}

/// A bound, not yet running server.
pub struct FilterServer {
    server: Arc<Server>,
    pipeline: Arc<FilterPipeline>,
}

impl FilterServer {
    pub fn bind(addr: &str, pipeline: Arc<FilterPipeline>) -> Result<Self> {
        let server = Server::http(addr)
            .map_err(|e| Error::Server(format!("Failed to bind {}: {}", addr, e)))?;
        Ok(Self {
            server: Arc::new(server),
            pipeline,
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Starts accepting connections on a dedicated thread. Each request is
    /// handled as its own task on the current tokio runtime.
    pub fn spawn(self) -> Result<ServerHandle> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Server(format!("No tokio runtime: {}", e)))?;
        let addr = self.local_addr();
        let server = self.server.clone();
        let pipeline = self.pipeline;

        let thread = std::thread::Builder::new()
            .name("http-accept".to_string())
            .spawn(move || {
                for request in server.incoming_requests() {
                    runtime.spawn(dispatch(request, pipeline.clone()));
                }
                debug!("Accept loop finished");
            })
            .map_err(|e| Error::Server(format!("Failed to spawn accept thread: {}", e)))?;

        if let Some(addr) = addr {
            info!("Listening on http://{}", addr);
        }

        Ok(ServerHandle {
            server: self.server,
            thread: Some(thread),
        })
    }
}

pub struct ServerHandle {
    server: Arc<Server>,
    thread: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Stops accepting new connections and waits for the accept loop to exit.
    pub fn shutdown(mut self) {
        self.server.unblock();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Accept thread panicked");
            }
        }
    }
}

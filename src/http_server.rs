//! HTTP Server Module
//!
//! Routes the four STA endpoints onto the core: protocol creation, content
//! upload (full or chunked), upload-position query, and content download.
//! The basic-auth gate runs before any request reaches the core.

use crate::config::Config;
use crate::content_server::ContentServer;
use crate::envelope;
use crate::range_resolver;
use crate::registry::SessionRegistry;
use crate::shutdown::ShutdownSignal;
use crate::store::ObjectStore;
use crate::{Result, StaError};
use base64::Engine;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::header::{
    HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, HOST,
    RANGE, WWW_AUTHENTICATE,
};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

const ROUTE_PREFIX: &str = "/staws/arquivos";

/// The STA mock's HTTP front: routing glue and credential gate around the
/// session registry, content server, and durable store.
pub struct StaServer {
    config: Arc<Config>,
    registry: Arc<SessionRegistry>,
    store: Arc<dyn ObjectStore>,
    content: ContentServer,
}

impl StaServer {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<SessionRegistry>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        let content = ContentServer::new(Arc::clone(&registry), Arc::clone(&store));
        Self {
            config,
            registry,
            store,
            content,
        }
    }

    /// Accept connections until shutdown is signaled.
    pub async fn start(self: Arc<Self>, addr: SocketAddr, mut shutdown: ShutdownSignal) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| StaError::HttpError(format!("failed to bind {}: {}", addr, e)))?;

        info!("STA mock listening on {}", addr);

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    let (stream, remote) = accept_result.map_err(|e| {
                        StaError::HttpError(format!("failed to accept connection: {}", e))
                    })?;

                    let io = TokioIo::new(stream);
                    let server = Arc::clone(&self);

                    tokio::spawn(async move {
                        let service = service_fn(move |req| {
                            let server = Arc::clone(&server);
                            async move {
                                Ok::<_, Infallible>(server.handle_request(req).await)
                            }
                        });

                        if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                            debug!("connection from {} ended with error: {}", remote, e);
                        }
                    });
                }
                _ = shutdown.wait_for_shutdown() => {
                    info!("STA mock received shutdown signal");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Dispatch one request: auth gate first, then routing on method and
    /// path. Core errors map onto statuses at this boundary.
    pub async fn handle_request<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body,
        B::Error: std::fmt::Display,
    {
        if self.config.auth.enabled && !self.is_authorized(req.headers()) {
            return unauthorized_response();
        }

        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let result = match route(&path) {
            Some(Route::Collection) if method == Method::POST => self.create_protocol(req).await,
            Some(Route::Content(protocol)) if method == Method::PUT => {
                self.upload_content(&protocol, req).await
            }
            Some(Route::Content(protocol)) if method == Method::GET => {
                self.download_content(&protocol, req).await
            }
            Some(Route::Position(protocol)) if method == Method::GET => {
                self.upload_position(&protocol).await
            }
            _ => {
                debug!("no route for {} {}", method, path);
                Err(StaError::SessionNotFound(path.clone()))
            }
        };

        match result {
            Ok(response) => response,
            Err(e) => error_response(&method, &path, e),
        }
    }

    fn is_authorized(&self, headers: &HeaderMap) -> bool {
        let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
            return false;
        };
        let Some(encoded) = value.strip_prefix("Basic ") else {
            return false;
        };
        let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(encoded.trim()) else {
            return false;
        };
        let Ok(credentials) = String::from_utf8(decoded) else {
            return false;
        };
        let Some((user, pass)) = credentials.split_once(':') else {
            return false;
        };
        user == self.config.auth.username && pass == self.config.auth.password
    }

    /// POST /staws/arquivos — open a session and return the protocol
    /// envelope. The metadata XML body is accepted but not parsed.
    async fn create_protocol<B>(&self, req: Request<B>) -> Result<Response<Full<Bytes>>>
    where
        B: Body,
        B::Error: std::fmt::Display,
    {
        let base_url = base_url_of(req.headers());
        // Drain the metadata document; its contents carry no weight here.
        let _ = req
            .into_body()
            .collect()
            .await
            .map_err(|e| StaError::HttpError(format!("failed to read request body: {}", e)))?;

        let protocol = self.registry.open()?;
        let body = envelope::protocol_created(&base_url, &protocol);

        Ok(Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "application/xml")
            .body(Full::new(Bytes::from(body)))?)
    }

    /// PUT /staws/arquivos/{protocolo}/conteudo — full-body write when no
    /// Content-Range accompanies the request, chunk write otherwise. A
    /// write that completes the upload triggers the store handoff.
    async fn upload_content<B>(
        &self,
        protocol: &str,
        req: Request<B>,
    ) -> Result<Response<Full<Bytes>>>
    where
        B: Body,
        B::Error: std::fmt::Display,
    {
        let content_range = req
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = req
            .into_body()
            .collect()
            .await
            .map_err(|e| StaError::HttpError(format!("failed to read request body: {}", e)))?
            .to_bytes();

        let session = self
            .registry
            .get(protocol)
            .ok_or_else(|| StaError::SessionNotFound(protocol.to_string()))?;

        let complete = {
            let mut session = session.lock().await;
            match &content_range {
                None => {
                    debug!("protocol {}: full-body write of {} bytes", protocol, body.len());
                    session.write_full(&body)?;
                }
                Some(header) => {
                    let placement = range_resolver::parse_content_range(header)?;
                    let declared = placement.end - placement.start + 1;
                    if declared != body.len() as u64 {
                        warn!(
                            "protocol {}: Content-Range {:?} declares {} bytes but body has {}",
                            protocol,
                            header,
                            declared,
                            body.len()
                        );
                    }
                    session.declare_total_size(placement.total);
                    session.write_chunk(placement.start, &body)?;
                }
            }
            session.is_complete()
        };

        if complete {
            self.registry
                .complete_and_evict(protocol, self.store.as_ref())
                .await?;
        }

        Ok(Response::builder()
            .status(StatusCode::OK)
            .body(Full::new(Bytes::new()))?)
    }

    /// GET /staws/arquivos/{protocolo}/posicaoupload
    async fn upload_position(&self, protocol: &str) -> Result<Response<Full<Bytes>>> {
        let ranges = self.content.upload_position(protocol).await?;
        let body = envelope::upload_position(&ranges);

        Ok(Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "application/xml")
            .body(Full::new(Bytes::from(body)))?)
    }

    /// GET /staws/arquivos/{protocolo}/conteudo with optional Range header
    async fn download_content<B>(
        &self,
        protocol: &str,
        req: Request<B>,
    ) -> Result<Response<Full<Bytes>>>
    where
        B: Body,
    {
        let range = match req.headers().get(RANGE).and_then(|v| v.to_str().ok()) {
            Some(header) => Some(range_resolver::parse_range_request(header)?),
            None => None,
        };

        let read = self.content.serve(protocol, range).await?;

        let mut builder = Response::builder()
            .status(read.status)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, read.body.len());
        if let Some(content_range) = &read.content_range {
            builder = builder.header(CONTENT_RANGE, content_range.as_str());
        }
        Ok(builder.body(Full::new(read.body))?)
    }
}

enum Route {
    /// POST target: the protocol collection
    Collection,
    /// The content resource of one protocol
    Content(String),
    /// The upload-position resource of one protocol
    Position(String),
}

fn route(path: &str) -> Option<Route> {
    let rest = path.strip_prefix(ROUTE_PREFIX)?;
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [] => Some(Route::Collection),
        [protocol, "conteudo"] => Some(Route::Content(protocol.to_string())),
        [protocol, "posicaoupload"] => Some(Route::Position(protocol.to_string())),
        _ => None,
    }
}

fn base_url_of(headers: &HeaderMap) -> String {
    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{}", host)
}

fn unauthorized_response() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::UNAUTHORIZED;
    response.headers_mut().insert(
        WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"STA Mock\""),
    );
    response
}

fn error_response(method: &Method, path: &str, error: StaError) -> Response<Full<Bytes>> {
    let status = match &error {
        StaError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        StaError::RangeMalformed(_) => StatusCode::BAD_REQUEST,
        StaError::RangeNotSatisfiable(_) => StatusCode::RANGE_NOT_SATISFIABLE,
        StaError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        StaError::StoreError(_) => StatusCode::BAD_GATEWAY,
        StaError::HttpError(_) | StaError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        warn!("{} {} failed: {}", method, path, error);
    } else {
        debug!("{} {} rejected: {}", method, path, error);
    }

    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

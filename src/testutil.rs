//! In-process HTTP responder standing in for the cat service in tests.

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use parking_lot::Mutex;
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
pub(crate) struct Route {
    pub path: String,
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub delay: Option<Duration>,
}

impl Route {
    pub fn new(path: &str, content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.to_string(),
            status: 200,
            content_type,
            body: body.into(),
            delay: None,
        }
    }

    pub fn json(path: &str, body: &str) -> Self {
        Self::new(path, "application/json", body.as_bytes())
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

pub(crate) struct MockServer {
    listener: TcpListener,
    addr: SocketAddr,
    requests: RequestLog,
}

type RequestLog = Arc<Mutex<Vec<String>>>;

impl MockServer {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        Self {
            listener,
            addr,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Request targets (path and query) seen so far, in arrival order.
    pub fn request_log(&self) -> RequestLog {
        Arc::clone(&self.requests)
    }

    /// Serves `routes` until the test runtime shuts down. Unknown paths get a
    /// 404.
    pub fn serve(self, routes: Vec<Route>) {
        let app: Router = routes
            .into_iter()
            .fold(Router::new(), |app, route| {
                let path = route.path.clone();
                let route = Arc::new(route);
                let requests = Arc::clone(&self.requests);
                app.route(&path, get(move |uri: Uri| respond(uri, route, requests)))
            })
            .fallback({
                let requests = Arc::clone(&self.requests);
                move |uri: Uri| async move {
                    log_request(&requests, &uri);
                    (StatusCode::NOT_FOUND, "not found")
                }
            });

        tokio::spawn(async move {
            let _ = axum::serve(self.listener, app).await;
        });
    }
}

fn log_request(requests: &Mutex<Vec<String>>, uri: &Uri) {
    let target = uri
        .path_and_query()
        .map(|target| target.as_str())
        .unwrap_or_else(|| uri.path());
    requests.lock().push(target.to_string());
}

async fn respond(uri: Uri, route: Arc<Route>, requests: RequestLog) -> Response {
    log_request(&requests, &uri);

    if let Some(delay) = route.delay {
        tokio::time::sleep(delay).await;
    }

    let status = StatusCode::from_u16(route.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, route.content_type)],
        route.body.clone(),
    )
        .into_response()
}

pub(crate) fn encoded_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let buffer = RgbaImage::from_pixel(width, height, Rgba([200, 120, 40, 255]));
    let image = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(buffer).to_rgb8()),
        _ => DynamicImage::ImageRgba8(buffer),
    };

    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
    bytes
}

pub(crate) fn metadata_json(id: &str, url: &str, mime_type: &str) -> String {
    format!(
        r#"{{"id":"{}","tags":["cute","fluffy"],"created_at":"2025-01-01T12:00:00Z","url":"{}","mimetype":"{}"}}"#,
        id, url, mime_type
    )
}

#![allow(dead_code)]

use std::io::Cursor;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};

use axum::{
    Router,
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode},
    routing::post,
};
use base64::Engine;
use image::{DynamicImage, Rgba, RgbaImage};
use tokio::sync::Notify;

/// One multipart upload as seen by the fake service.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub field_name: String,
    pub file_name: String,
    pub len: usize,
    pub content_type: String,
}

type Responder = dyn Fn(&str) -> (StatusCode, String) + Send + Sync;

#[derive(Clone)]
struct FakeState {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    responder: Arc<Responder>,
    hold: Option<(String, Arc<Notify>)>,
}

/// Detection service stand-in listening on an ephemeral port.
pub struct FakeDetection {
    pub addr: SocketAddr,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl FakeDetection {
    pub async fn spawn<F>(responder: F) -> Self
    where
        F: Fn(&str) -> (StatusCode, String) + Send + Sync + 'static,
    {
        Self::spawn_inner(Arc::new(responder), None).await
    }

    /// Like `spawn`, but uploads named `held_file` wait for `gate` before answering.
    pub async fn spawn_holding<F>(responder: F, held_file: &str, gate: Arc<Notify>) -> Self
    where
        F: Fn(&str) -> (StatusCode, String) + Send + Sync + 'static,
    {
        Self::spawn_inner(Arc::new(responder), Some((held_file.to_string(), gate))).await
    }

    async fn spawn_inner(responder: Arc<Responder>, hold: Option<(String, Arc<Notify>)>) -> Self {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let state = FakeState {
            calls: calls.clone(),
            responder,
            hold,
        };
        let app = Router::new().route("/", post(detect)).with_state(state);
        let addr = serve(app).await;
        Self { addr, calls }
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

async fn detect(
    State(state): State<FakeState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> (StatusCode, String) {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let mut file_name = String::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let field_name = field.name().unwrap_or_default().to_string();
        file_name = field.file_name().unwrap_or_default().to_string();
        let len = field.bytes().await.map(|b| b.len()).unwrap_or(0);
        state.calls.lock().unwrap().push(RecordedCall {
            field_name,
            file_name: file_name.clone(),
            len,
            content_type: content_type.clone(),
        });
    }

    if let Some((held, gate)) = &state.hold {
        if *held == file_name {
            gate.notified().await;
        }
    }

    (state.responder)(&file_name)
}

/// Serve `app` on 127.0.0.1 with an OS-assigned port.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Answer every upload with one box and its own file name as the text.
pub fn echo_name(file_name: &str) -> (StatusCode, String) {
    (
        StatusCode::OK,
        format!(r#"{{"boxes":[[1,1,4,4]],"text":["{}"]}}"#, file_name),
    )
}

pub fn solid_png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

pub fn write_png(dir: &Path, name: &str) {
    std::fs::write(dir.join(name), solid_png(8, 8, [0, 0, 255, 255])).unwrap();
}

pub fn write_jpeg(dir: &Path, name: &str) {
    let img = image::RgbImage::from_pixel(8, 8, image::Rgb([0, 0, 255]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Jpeg)
        .unwrap();
    std::fs::write(dir.join(name), out.into_inner()).unwrap();
}

/// Decode a `data:image/png;base64,` URL back into pixels.
pub fn decode_png_data_url(url: &str) -> RgbaImage {
    let payload = url
        .strip_prefix("data:image/png;base64,")
        .expect("png data url");
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .unwrap();
    image::load_from_memory(&bytes).unwrap().to_rgba8()
}

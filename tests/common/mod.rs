//! Shared fixtures for integration tests
//!
//! Everything here runs without a model file or network access: the
//! segmentation model is replaced by a synthetic backend and the editing API
//! by an in-process client.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use ndarray::Array4;
use photo_process::{
    api::{build_router, AppState},
    config::{EnhancementConfig, SegmentationConfig},
    enhancement::{EditResponse, EditedImage, ImageEditClient, ImageEditRequest},
    error::{PhotoError, Result},
    inference::InferenceBackend,
    pipeline::PhotoPipeline,
    segmentation::{ModelSegmenter, Segmenter},
    ProfileEnhancer,
};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const BOUNDARY: &str = "photo-process-test-boundary";

/// Synthetic segmentation model: foreground is the centered square covering
/// the middle half of each side
pub struct CenteredSquareModel {
    input_size: u32,
}

impl CenteredSquareModel {
    pub fn new(input_size: u32) -> Self {
        Self { input_size }
    }
}

impl InferenceBackend for CenteredSquareModel {
    fn infer(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
        let shape = input.shape();
        if shape != [1, 3, self.input_size as usize, self.input_size as usize] {
            return Err(PhotoError::processing(format!("unexpected input shape {shape:?}")));
        }
        let size = self.input_size as usize;
        let (lo, hi) = (size / 4, size - size / 4);
        Ok(Array4::from_shape_fn((1, 1, size, size), |(_, _, y, x)| {
            if (lo..hi).contains(&x) && (lo..hi).contains(&y) {
                1.0
            } else {
                0.0
            }
        }))
    }

    fn input_size(&self) -> u32 {
        self.input_size
    }

    fn name(&self) -> &str {
        "centered-square"
    }
}

/// Segmenter that marks the centered square covering the middle half of
/// each side as fully opaque and everything else as fully transparent
pub struct ExactSquareSegmenter;

impl Segmenter for ExactSquareSegmenter {
    fn remove_background(&self, image: &RgbImage) -> Result<RgbaImage> {
        let (width, height) = image.dimensions();
        Ok(RgbaImage::from_fn(width, height, |x, y| {
            let p = image.get_pixel(x, y);
            let inside = (width / 4..width - width / 4).contains(&x)
                && (height / 4..height - height / 4).contains(&y);
            Rgba([p[0], p[1], p[2], if inside { 255 } else { 0 }])
        }))
    }
}

/// What the fake editing API answers
#[derive(Clone)]
pub enum EditReply {
    /// A PNG of the given image, base64-encoded
    Image(RgbImage),
    /// `{"data": []}`
    Empty,
    /// A transport-level failure
    Fail,
}

/// In-process editing API that counts calls
pub struct FakeEditClient {
    reply: EditReply,
    calls: AtomicUsize,
    last_request: Mutex<Option<(String, ImageEditRequest)>>,
}

impl FakeEditClient {
    pub fn new(reply: EditReply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<(String, ImageEditRequest)> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageEditClient for FakeEditClient {
    async fn edit_image(&self, api_key: &str, request: ImageEditRequest) -> Result<EditResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some((api_key.to_string(), request));

        match &self.reply {
            EditReply::Image(image) => Ok(EditResponse {
                data: vec![EditedImage {
                    b64_json: Some(STANDARD.encode(encode(image, ImageFormat::Png))),
                }],
            }),
            EditReply::Empty => Ok(EditResponse::default()),
            EditReply::Fail => Err(PhotoError::upstream("connection refused")),
        }
    }
}

/// Router wired to the synthetic model and the given editing client
pub fn test_app(api_key: Option<&str>, client: Arc<FakeEditClient>) -> Router {
    let segmentation = SegmentationConfig::default();
    let segmenter = ModelSegmenter::new(
        CenteredSquareModel::new(segmentation.input_size),
        &segmentation,
    );
    test_app_with_segmenter(Arc::new(segmenter), api_key, client)
}

/// Router wired to an arbitrary segmenter
pub fn test_app_with_segmenter(
    segmenter: Arc<dyn Segmenter>,
    api_key: Option<&str>,
    client: Arc<FakeEditClient>,
) -> Router {
    let enhancement = EnhancementConfig {
        api_key: api_key.map(str::to_string),
        ..EnhancementConfig::default()
    };
    let enhancer = ProfileEnhancer::new(enhancement, client);

    let pipeline = PhotoPipeline::new(segmenter, enhancer);
    build_router(AppState::new(Arc::new(pipeline), 2 * 1024 * 1024))
}

pub fn solid(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb(color))
}

pub fn encode(image: &RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut buffer, format)
        .unwrap();
    buffer.into_inner()
}

/// Hand-built `multipart/form-data` body
#[derive(Default)]
pub struct MultipartBody {
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
        self
    }

    pub fn into_request(mut self) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Request::builder()
            .method("POST")
            .uri("/process-photo")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

/// Standard upload: one image part plus a mode field
pub fn photo_request(image_bytes: &[u8], content_type: &str, mode: &str) -> Request<Body> {
    MultipartBody::new()
        .file("image", "photo", content_type, image_bytes)
        .text("mode", mode)
        .into_request()
}

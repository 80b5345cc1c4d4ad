//! Pdfium-backed PDF access.
//!
//! One process-wide Pdfium handle, loaded lazily. Per-document state is a
//! [`PdfPages`] value that memoizes extracted page text for the lifetime of
//! a single locator/scanner invocation and renders page images for the
//! extraction client.
//!
//! All of this is blocking CPU work; callers in async context go through
//! `tokio::task::spawn_blocking`.

use std::io::Cursor;
use std::path::Path;
use std::sync::OnceLock;

use base64::{engine::general_purpose, Engine as _};
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::info;

use crate::app::locator::PageRange;
use crate::error::AppError;

const RENDER_DPI: f32 = 150.0;
const PAGE_WIDTH_INCHES: f32 = 8.5;
const PAGE_HEIGHT_INCHES: f32 = 14.0;

/// The `thread_safe` feature serializes access to the underlying library,
/// but the binding type itself does not carry Send + Sync. This wrapper
/// lets the instance live in a OnceLock.
struct SyncPdfium(Pdfium);

// SAFETY: pdfium-render's `thread_safe` feature guards every FFI call with
// a mutex.
unsafe impl Send for SyncPdfium {}
unsafe impl Sync for SyncPdfium {}

static PDFIUM_INSTANCE: OnceLock<std::result::Result<SyncPdfium, String>> = OnceLock::new();

/// Global Pdfium handle. Loads the dynamic library on first use; a load
/// failure is cached so we do not retry on every request.
pub fn load_pdfium() -> std::result::Result<&'static Pdfium, String> {
    PDFIUM_INSTANCE
        .get_or_init(init_pdfium)
        .as_ref()
        .map(|sp| &sp.0)
        .map_err(|e| e.clone())
}

fn init_pdfium() -> std::result::Result<SyncPdfium, String> {
    // Prefer a library dropped next to the binary, fall back to the system.
    let local = Pdfium::pdfium_platform_library_name_at_path("./lib/");
    match Pdfium::bind_to_library(&local) {
        Ok(bindings) => {
            info!("pdfium: using bundled library at ./lib/");
            return Ok(SyncPdfium(Pdfium::new(bindings)));
        }
        Err(e) => {
            info!("pdfium: no bundled library ({e:?}), trying system library");
        }
    }

    Pdfium::bind_to_system_library()
        .map(|bindings| SyncPdfium(Pdfium::new(bindings)))
        .map_err(|e| format!("failed to load pdfium library: {e:?}"))
}

/// Read seam between the locator and the PDF backend. Implemented by
/// [`PdfPages`] in production and by in-memory fixtures in tests.
pub trait PageText {
    fn page_count(&self) -> usize;

    /// Plain text of one zero-based page. Memoized per instance.
    fn page_text(&mut self, index: usize) -> Result<&str, AppError>;
}

/// One open PDF document plus its lazily filled page-text cache.
///
/// The cache is scoped to this value; every locator or scanner invocation
/// gets its own and nothing is shared across concurrent requests.
pub struct PdfPages {
    document: PdfDocument<'static>,
    text_cache: Vec<Option<String>>,
}

impl PdfPages {
    pub fn open(path: &Path) -> Result<Self, AppError> {
        if !path.is_file() {
            return Err(AppError::ResourceNotFound(path.display().to_string()));
        }

        let pdfium = load_pdfium().map_err(AppError::Pdf)?;
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| AppError::Pdf(format!("failed to open {}: {e:?}", path.display())))?;
        let count = document.pages().len() as usize;

        Ok(Self {
            document,
            text_cache: vec![None; count],
        })
    }

    /// Renders every page in `range` to a PNG data URL, in page order.
    /// Resolution is chosen for diagram legibility in the vision model,
    /// not for print.
    pub fn render_page_images(&self, range: PageRange) -> Result<Vec<String>, AppError> {
        let render_config = PdfRenderConfig::new()
            .set_target_width((RENDER_DPI * PAGE_WIDTH_INCHES) as i32)
            .set_maximum_height((RENDER_DPI * PAGE_HEIGHT_INCHES) as i32);

        let mut images = Vec::with_capacity(range.len());
        for index in range.start()..=range.end() {
            let page = self
                .document
                .pages()
                .get(page_index_u16(index)?)
                .map_err(|e| AppError::Pdf(format!("failed to load page {}: {e:?}", index + 1)))?;
            let bitmap = page
                .render_with_config(&render_config)
                .map_err(|e| AppError::Pdf(format!("failed to render page {}: {e:?}", index + 1)))?;
            images.push(png_data_url(&bitmap.as_image())?);
        }
        Ok(images)
    }
}

impl PageText for PdfPages {
    fn page_count(&self) -> usize {
        self.text_cache.len()
    }

    fn page_text(&mut self, index: usize) -> Result<&str, AppError> {
        if index >= self.text_cache.len() {
            return Err(AppError::Pdf(format!(
                "page index {} out of bounds ({} pages)",
                index,
                self.text_cache.len()
            )));
        }

        if self.text_cache[index].is_none() {
            let page = self
                .document
                .pages()
                .get(page_index_u16(index)?)
                .map_err(|e| AppError::Pdf(format!("failed to load page {}: {e:?}", index + 1)))?;
            let text = match page.text() {
                Ok(tp) => tp.all(),
                // Pages without a text layer scan as empty rather than fatal.
                Err(_) => String::new(),
            };
            self.text_cache[index] = Some(text);
        }

        Ok(self.text_cache[index].get_or_insert_with(String::new))
    }
}

fn page_index_u16(index: usize) -> Result<u16, AppError> {
    u16::try_from(index).map_err(|_| AppError::Pdf(format!("page index {index} exceeds u16")))
}

fn png_data_url(image: &DynamicImage) -> Result<String, AppError> {
    let mut png_bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png_bytes), image::ImageOutputFormat::Png)
        .map_err(|e| AppError::Pdf(format!("png encode failed: {e}")))?;
    Ok(format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(&png_bytes)
    ))
}

//! Opened input documents
//!
//! A document is either a PDF container (text layer + embedded raster
//! images) or a plain image file that goes straight to OCR.

mod images;

use crate::error::ExtractError;
use image::DynamicImage;
use std::fs::File;
use std::io::Read;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

pub use images::{decode_image_stream, page_images};

/// File extensions picked up when scanning a folder
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["pdf", "jpg", "jpeg", "png", "bmp", "gif"];

/// An input opened for extraction; read-only after load
pub enum Document {
    Pdf(PdfDocument),
    Image { path: PathBuf, image: DynamicImage },
}

pub struct PdfDocument {
    pub path: PathBuf,
    bytes: Vec<u8>,
    doc: lopdf::Document,
}

impl Document {
    /// Open `path` as a PDF if it looks like one, otherwise as an image
    ///
    /// This is the pipeline's only fatal failure point.
    pub fn open(path: &Path) -> Result<Self, ExtractError> {
        if is_pdf(path)? {
            let bytes = std::fs::read(path).map_err(|e| ExtractError::open(path, e))?;
            let doc = lopdf::Document::load_mem(&bytes).map_err(|e| ExtractError::open(path, e))?;
            tracing::debug!("Opened PDF {:?} ({} pages)", path, doc.get_pages().len());
            return Ok(Document::Pdf(PdfDocument {
                path: path.to_path_buf(),
                bytes,
                doc,
            }));
        }

        let image = image::open(path).map_err(|e| ExtractError::open(path, e))?;
        tracing::debug!("Opened image {:?} ({}x{})", path, image.width(), image.height());
        Ok(Document::Image {
            path: path.to_path_buf(),
            image,
        })
    }

    pub fn path(&self) -> &Path {
        match self {
            Document::Pdf(pdf) => &pdf.path,
            Document::Image { path, .. } => path,
        }
    }

    /// Number of pages; an image file counts as one
    pub fn page_count(&self) -> usize {
        match self {
            Document::Pdf(pdf) => pdf.page_count(),
            Document::Image { .. } => 1,
        }
    }

    /// Embedded text of every page, concatenated in page order
    ///
    /// Image files have no text layer. A text layer that cannot be decoded
    /// is treated as absent so the document still reaches OCR.
    pub fn embedded_text(&self) -> String {
        match self {
            Document::Pdf(pdf) => pdf.embedded_text(),
            Document::Image { .. } => String::new(),
        }
    }

    /// Consume the document and return its raster images in encounter order
    pub fn into_images(self) -> Vec<DynamicImage> {
        match self {
            Document::Pdf(pdf) => pdf.images(),
            Document::Image { image, .. } => vec![image],
        }
    }
}

impl PdfDocument {
    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    pub fn embedded_text(&self) -> String {
        // pdf-extract panics on some malformed font programs
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(&self.bytes)
        }));
        match result {
            Ok(Ok(pages)) => pages.concat(),
            Ok(Err(e)) => {
                tracing::warn!("Failed to read text layer of {:?}: {}", self.path, e);
                String::new()
            }
            Err(_) => {
                tracing::warn!("Text layer extraction of {:?} panicked", self.path);
                String::new()
            }
        }
    }

    /// Decode every image XObject, pages in order, skipping failures
    pub fn images(&self) -> Vec<DynamicImage> {
        let mut images = Vec::new();

        for (page_num, page_id) in self.doc.get_pages() {
            for (object_id, stream) in page_images(&self.doc, page_id) {
                match decode_image_stream(&self.doc, stream) {
                    Ok(img) => {
                        tracing::debug!(
                            "Page {}: decoded image {:?} ({}x{})",
                            page_num,
                            object_id,
                            img.width(),
                            img.height()
                        );
                        images.push(img);
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Page {}: skipping image {:?}: {}",
                            page_num,
                            object_id,
                            e
                        );
                    }
                }
            }
        }

        images
    }
}

/// Check if a file is a PDF by extension or magic bytes
fn is_pdf(path: &Path) -> Result<bool, ExtractError> {
    if let Some(ext) = path.extension() {
        if ext.to_string_lossy().to_lowercase() == "pdf" {
            return Ok(true);
        }
    }

    let mut file = File::open(path).map_err(|e| ExtractError::open(path, e))?;

    let mut magic = [0u8; 5];
    if file.read_exact(&mut magic).is_ok() {
        return Ok(&magic == b"%PDF-");
    }

    Ok(false)
}

/// Whether `path` has one of the supported extensions (case-insensitive)
pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_supported_extensions() {
        assert!(has_supported_extension(Path::new("scan.PDF")));
        assert!(has_supported_extension(Path::new("photo.jpeg")));
        assert!(has_supported_extension(Path::new("dir/page.gif")));
        assert!(!has_supported_extension(Path::new("notes.txt")));
        assert!(!has_supported_extension(Path::new("README")));
    }

    #[test]
    fn test_is_pdf_by_magic_bytes() {
        let mut file = tempfile::Builder::new().suffix(".bin").tempfile().unwrap();
        file.write_all(b"%PDF-1.5\n").unwrap();
        assert!(is_pdf(file.path()).unwrap());
    }

    #[test]
    fn test_is_pdf_rejects_png() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(b"\x89PNG\r\n\x1a\n").unwrap();
        assert!(!is_pdf(file.path()).unwrap());
    }

    #[test]
    fn test_open_missing_file_is_fatal() {
        let result = Document::open(Path::new("/nonexistent/input.png"));
        assert!(matches!(result, Err(ExtractError::DocumentOpen { .. })));
    }

    #[test]
    fn test_open_corrupt_pdf_is_fatal() {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        file.write_all(b"%PDF-1.4\nthis is not a pdf body").unwrap();
        let result = Document::open(file.path());
        assert!(matches!(result, Err(ExtractError::DocumentOpen { .. })));
    }
}

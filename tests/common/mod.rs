//! Shared fixtures: a scripted recognizer and an in-memory PDF builder.

#![allow(dead_code)]

use image::{DynamicImage, GrayImage, Luma};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use pdf_ocr_extract::{ExtractError, TextRecognizer};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::NamedTempFile;

/// Recognizer that answers `text-<width>` for the (preprocessed) image
/// it receives, with optional per-width delays and failures.
#[derive(Default)]
pub struct ScriptedRecognizer {
    calls: AtomicUsize,
    delays: HashMap<u32, Duration>,
    failing: HashSet<u32>,
    languages: Mutex<Vec<String>>,
    completed: Mutex<Vec<u32>>,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delay(mut self, width: u32, delay: Duration) -> Self {
        self.delays.insert(width, delay);
        self
    }

    pub fn fail(mut self, width: u32) -> Self {
        self.failing.insert(width);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn languages(&self) -> Vec<String> {
        self.languages.lock().unwrap().clone()
    }

    /// Widths in the order recognition finished
    pub fn completed(&self) -> Vec<u32> {
        self.completed.lock().unwrap().clone()
    }
}

impl TextRecognizer for ScriptedRecognizer {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn description(&self) -> &'static str {
        "Test recognizer"
    }

    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<String, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.languages.lock().unwrap().push(language.to_string());

        let width = image.width();
        if let Some(delay) = self.delays.get(&width) {
            std::thread::sleep(*delay);
        }
        self.completed.lock().unwrap().push(width);

        if self.failing.contains(&width) {
            return Err(ExtractError::RecognitionError(format!(
                "engine rejected image of width {}",
                width
            )));
        }
        Ok(format!("text-{}", width))
    }

    fn supported_languages(&self) -> Vec<String> {
        vec!["eng".to_string(), "spa".to_string()]
    }
}

/// Expected recognizer output for a raw image of `width` pixels (< 1000,
/// so preprocessing doubles it)
pub fn label(width: u32) -> String {
    format!("text-{}", width * 2)
}

pub fn gray(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        if (x + y) % 3 == 0 {
            Luma([20])
        } else {
            Luma([235])
        }
    })
}

/// One image XObject placed on a synthesized page
pub enum PageImage {
    Raster(GrayImage),
    /// Declares 8-bit gray samples but carries too few bytes to decode
    Corrupt,
}

impl From<GrayImage> for PageImage {
    fn from(image: GrayImage) -> Self {
        PageImage::Raster(image)
    }
}

/// Contents of one synthesized page
#[derive(Default)]
pub struct PageSpec {
    pub text: Option<String>,
    pub images: Vec<PageImage>,
    /// Draw the images through a Form XObject instead of directly
    pub via_form: bool,
}

impl PageSpec {
    pub fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    pub fn images(images: Vec<GrayImage>) -> Self {
        Self::mixed(images.into_iter().map(PageImage::from).collect())
    }

    pub fn mixed(images: Vec<PageImage>) -> Self {
        Self {
            images,
            ..Default::default()
        }
    }

    pub fn form(images: Vec<GrayImage>) -> Self {
        Self {
            via_form: true,
            ..Self::images(images)
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn blank() -> Self {
        Self::default()
    }
}

fn image_xobject(doc: &mut Document, image: &PageImage) -> ObjectId {
    let (width, height, samples) = match image {
        PageImage::Raster(image) => (image.width(), image.height(), image.as_raw().clone()),
        PageImage::Corrupt => (20, 5, vec![0; 3]),
    };
    doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        samples,
    ))
}

fn draw_ops(names: &[String]) -> Vec<Operation> {
    let mut ops = Vec::new();
    for name in names {
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new(
            "cm",
            vec![100.into(), 0.into(), 0.into(), 100.into(), 50.into(), 50.into()],
        ));
        ops.push(Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]));
        ops.push(Operation::new("Q", vec![]));
    }
    ops
}

/// Build a PDF in memory from page specs
pub fn build_pdf(pages: Vec<PageSpec>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids: Vec<Object> = Vec::new();
    for spec in &pages {
        let ids: Vec<ObjectId> = spec
            .images
            .iter()
            .map(|img| image_xobject(&mut doc, img))
            .collect();
        let names: Vec<String> = (0..ids.len()).map(|i| format!("Im{}", i)).collect();

        let mut image_dict = Dictionary::new();
        for (name, id) in names.iter().zip(&ids) {
            image_dict.set(name.as_bytes().to_vec(), *id);
        }

        let mut ops;
        let mut xobjects = Dictionary::new();
        if spec.via_form {
            let form_content = Content {
                operations: draw_ops(&names),
            };
            let form_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Form",
                    "BBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                    "Resources" => dictionary! { "XObject" => image_dict },
                },
                form_content.encode().unwrap(),
            ));
            xobjects.set("Fm0", form_id);
            ops = draw_ops(&["Fm0".to_string()]);
        } else {
            xobjects = image_dict;
            ops = draw_ops(&names);
        }

        if let Some(text) = &spec.text {
            ops.push(Operation::new("BT", vec![]));
            ops.push(Operation::new("Tf", vec!["F1".into(), 24.into()]));
            ops.push(Operation::new("Td", vec![100.into(), 600.into()]));
            ops.push(Operation::new("Tj", vec![Object::string_literal(text.as_str())]));
            ops.push(Operation::new("ET", vec![]));
        }

        let content = Content { operations: ops };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
                "XObject" => xobjects,
            },
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages.len() as i64,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Persist bytes to a temp file with the given suffix
pub fn write_temp(bytes: &[u8], suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

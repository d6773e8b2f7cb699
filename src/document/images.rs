//! Image XObject discovery and decoding

use crate::error::ExtractError;
use fax::decoder::{decode_g3, decode_g4, pels};
use fax::Color;
use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashSet;

/// Image XObjects drawn by a page, in resource order
///
/// Resources inherited from the page tree are honoured and Form XObjects
/// are searched recursively. Each XObject is listed at most once per page.
pub fn page_images(doc: &Document, page_id: ObjectId) -> Vec<(ObjectId, &Stream)> {
    let mut found = Vec::new();
    let mut visited = HashSet::new();

    if let Some(resources) = page_resources(doc, page_id) {
        collect_images(doc, resources, &mut visited, &mut found);
    }

    found
}

fn collect_images<'a>(
    doc: &'a Document,
    resources: &'a Dictionary,
    visited: &mut HashSet<ObjectId>,
    found: &mut Vec<(ObjectId, &'a Stream)>,
) {
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
    else {
        return;
    };

    for (_name, value) in xobjects.iter() {
        let Ok(object_id) = value.as_reference() else {
            continue;
        };
        if !visited.insert(object_id) {
            continue;
        }
        let Ok(stream) = doc.get_object(object_id).and_then(|obj| obj.as_stream()) else {
            continue;
        };

        match subtype(stream) {
            Some(b"Image") => found.push((object_id, stream)),
            Some(b"Form") => {
                if let Some(form_resources) = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|obj| resolve(doc, obj))
                    .and_then(|obj| obj.as_dict().ok())
                {
                    collect_images(doc, form_resources, visited, found);
                }
            }
            _ => {}
        }
    }
}

/// Page resources, walking up `/Parent` links when the page inherits them
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    // Bounded walk; a malformed tree may contain a cycle
    for _ in 0..32 {
        if let Some(resources) = node
            .get(b"Resources")
            .ok()
            .and_then(|obj| resolve(doc, obj))
            .and_then(|obj| obj.as_dict().ok())
        {
            return Some(resources);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn subtype(stream: &Stream) -> Option<&[u8]> {
    stream.dict.get(b"Subtype").ok()?.as_name().ok()
}

/// Supported sample layouts after colour space resolution
#[derive(Debug, Clone, PartialEq, Eq)]
enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    /// Palette of `base` samples, one entry per index up to `hival`
    Indexed {
        base: Box<ColorSpace>,
        palette: Vec<u8>,
    },
    Unsupported(String),
}

impl ColorSpace {
    fn components(&self) -> Option<usize> {
        match self {
            ColorSpace::Gray => Some(1),
            ColorSpace::Rgb => Some(3),
            ColorSpace::Cmyk => Some(4),
            ColorSpace::Indexed { .. } | ColorSpace::Unsupported(_) => None,
        }
    }

    fn name(&self) -> &str {
        match self {
            ColorSpace::Gray => "Gray",
            ColorSpace::Rgb => "RGB",
            ColorSpace::Cmyk => "CMYK",
            ColorSpace::Indexed { .. } => "Indexed",
            ColorSpace::Unsupported(name) => name.as_str(),
        }
    }
}

/// Decode a PDF image XObject into a raster image
pub fn decode_image_stream(doc: &Document, stream: &Stream) -> Result<DynamicImage, ExtractError> {
    let width = dimension(stream, b"Width")?;
    let height = dimension(stream, b"Height")?;

    let filters = filters(stream);
    match filters.last().map(String::as_str) {
        Some("DCTDecode") if filters.len() == 1 => {
            return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)
                .map_err(|e| ExtractError::ImageDecode(format!("Invalid JPEG data: {}", e)));
        }
        Some("CCITTFaxDecode") if filters.len() == 1 => {
            return decode_ccitt(doc, stream, height).map(DynamicImage::ImageLuma8);
        }
        Some("DCTDecode" | "CCITTFaxDecode" | "JPXDecode" | "JBIG2Decode") => {
            return Err(ExtractError::ImageDecode(format!(
                "Unsupported image filter chain: {}",
                filters.join(", ")
            )));
        }
        _ => {}
    }

    let data = if filters.is_empty() {
        stream.content.clone()
    } else {
        stream.decompressed_content().map_err(|e| {
            ExtractError::ImageDecode(format!("Failed to decompress image: {}", e))
        })?
    };

    let (color_space, bits_per_component) = if is_image_mask(stream) {
        (ColorSpace::Gray, 1)
    } else {
        let bits = stream
            .dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(|b| b.as_i64().ok())
            .unwrap_or(8);
        (color_space(doc, stream), bits)
    };

    tracing::debug!(
        "PDF image: {}x{}, {} bits, color_space={}, data_len={}",
        width,
        height,
        bits_per_component,
        color_space.name(),
        data.len()
    );

    match (color_space, bits_per_component) {
        (ColorSpace::Gray, 1) => {
            let mut image = unpack_bilevel(&data, width, height)?;
            if inverted_decode(stream) {
                image::imageops::invert(&mut image);
            }
            Ok(DynamicImage::ImageLuma8(image))
        }
        (ColorSpace::Indexed { base, palette }, bits @ (1 | 2 | 4 | 8)) => {
            let indices = unpack_samples(&data, width, height, bits as usize)?;
            expand_indexed(&indices, &base, &palette, width, height)
        }
        (ColorSpace::Unsupported(name), _) => Err(ExtractError::ImageDecode(format!(
            "Unsupported color space: {}",
            name
        ))),
        (space, 8) => raster(&space, width, height, data),
        (space, bits) => Err(ExtractError::ImageDecode(format!(
            "Unsupported sample format: {} at {} bits",
            space.name(),
            bits
        ))),
    }
}

/// Build an image from 8-bit samples of a device colour space
fn raster(
    space: &ColorSpace,
    width: u32,
    height: u32,
    data: Vec<u8>,
) -> Result<DynamicImage, ExtractError> {
    match space {
        ColorSpace::Gray => {
            let data = exact_samples(data, width, height, 1)?;
            GrayImage::from_raw(width, height, data)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(|| {
                    ExtractError::ImageDecode("Invalid grayscale image data".to_string())
                })
        }
        ColorSpace::Rgb => {
            let data = exact_samples(data, width, height, 3)?;
            RgbImage::from_raw(width, height, data)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| ExtractError::ImageDecode("Invalid RGB image data".to_string()))
        }
        ColorSpace::Cmyk => {
            let data = exact_samples(data, width, height, 4)?;
            RgbImage::from_raw(width, height, cmyk_to_rgb(&data))
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| {
                    ExtractError::ImageDecode("Invalid CMYK->RGB conversion".to_string())
                })
        }
        other => Err(ExtractError::ImageDecode(format!(
            "Cannot rasterize {} samples",
            other.name()
        ))),
    }
}

/// Replace palette indices with their base colour samples
fn expand_indexed(
    indices: &[u8],
    base: &ColorSpace,
    palette: &[u8],
    width: u32,
    height: u32,
) -> Result<DynamicImage, ExtractError> {
    let components = base.components().ok_or_else(|| {
        ExtractError::ImageDecode(format!("Unsupported Indexed base: {}", base.name()))
    })?;
    let entries = palette.len() / components;
    if entries == 0 {
        return Err(ExtractError::ImageDecode("Empty Indexed palette".to_string()));
    }

    let mut samples = Vec::with_capacity(indices.len() * components);
    for &index in indices {
        // Out-of-range indices clamp to the last entry
        let entry = (index as usize).min(entries - 1) * components;
        samples.extend_from_slice(&palette[entry..entry + components]);
    }
    raster(base, width, height, samples)
}

/// CCITT Group 3/4 fax data, the usual encoding of bilevel scans
fn decode_ccitt(doc: &Document, stream: &Stream, height: u32) -> Result<GrayImage, ExtractError> {
    let params = decode_parms(doc, stream);
    let param = |key: &[u8]| params.and_then(|p| p.get(key).ok());

    let k = param(b"K").and_then(|v| v.as_i64().ok()).unwrap_or(0);
    let columns = param(b"Columns").and_then(|v| v.as_i64().ok()).unwrap_or(1728);
    let black_is_1 = param(b"BlackIs1")
        .and_then(|v| v.as_bool().ok())
        .unwrap_or(false);
    let columns = u16::try_from(columns)
        .ok()
        .filter(|c| *c > 0)
        .ok_or_else(|| ExtractError::ImageDecode(format!("Invalid CCITT columns: {}", columns)))?;

    // Sample value of a black pel before /Decode is applied
    let (black, white) = if black_is_1 { (255, 0) } else { (0, 255) };

    let mut pixels = Vec::with_capacity(columns as usize * height as usize);
    let mut rows = 0u32;
    let push_line = |transitions: &[u16]| {
        if rows < height {
            pixels.extend(pels(transitions, columns).map(|color| match color {
                Color::Black => black,
                Color::White => white,
            }));
            rows += 1;
        }
    };

    let input = stream.content.iter().copied();
    let complete = if k < 0 {
        decode_g4(input, columns, u16::try_from(height).ok(), push_line)
    } else {
        decode_g3(input, push_line)
    };

    if rows == 0 {
        return Err(ExtractError::ImageDecode(format!(
            "CCITT data (K={}) decoded no rows",
            k
        )));
    }
    if complete.is_none() || rows < height {
        tracing::warn!("CCITT image truncated: {} of {} rows decoded", rows, height);
        pixels.resize(columns as usize * height as usize, white);
    }

    let mut image = GrayImage::from_raw(columns as u32, height, pixels)
        .ok_or_else(|| ExtractError::ImageDecode("Invalid CCITT image data".to_string()))?;
    if inverted_decode(stream) {
        image::imageops::invert(&mut image);
    }
    Ok(image)
}

/// `/DecodeParms` for the last filter, as a dictionary
fn decode_parms<'a>(doc: &'a Document, stream: &'a Stream) -> Option<&'a Dictionary> {
    let parms = resolve(doc, stream.dict.get(b"DecodeParms").ok()?)?;
    match parms {
        Object::Array(items) => items
            .last()
            .and_then(|obj| resolve(doc, obj))
            .and_then(|obj| obj.as_dict().ok()),
        other => other.as_dict().ok(),
    }
}

fn is_image_mask(stream: &Stream) -> bool {
    stream
        .dict
        .get(b"ImageMask")
        .ok()
        .and_then(|obj| obj.as_bool().ok())
        .unwrap_or(false)
}

/// Whether `/Decode [1 0]` flips a single-component image
fn inverted_decode(stream: &Stream) -> bool {
    stream
        .dict
        .get(b"Decode")
        .ok()
        .and_then(|obj| obj.as_array().ok())
        .and_then(|range| range.first())
        .and_then(|low| low.as_float().ok())
        .is_some_and(|low| low >= 1.0)
}

fn dimension(stream: &Stream, key: &[u8]) -> Result<u32, ExtractError> {
    stream
        .dict
        .get(key)
        .ok()
        .and_then(|v| v.as_i64().ok())
        .filter(|v| *v > 0 && *v <= u32::MAX as i64)
        .map(|v| v as u32)
        .ok_or_else(|| {
            ExtractError::ImageDecode(format!(
                "Missing or invalid image {}",
                String::from_utf8_lossy(key).to_lowercase()
            ))
        })
}

/// Filter names in application order
fn filters(stream: &Stream) -> Vec<String> {
    match stream.dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![String::from_utf8_lossy(name).to_string()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_name().ok())
            .map(|name| String::from_utf8_lossy(name).to_string())
            .collect(),
        _ => Vec::new(),
    }
}

/// Truncate trailing padding; reject short buffers
fn exact_samples(
    mut data: Vec<u8>,
    width: u32,
    height: u32,
    components: usize,
) -> Result<Vec<u8>, ExtractError> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(components))
        .ok_or_else(|| ExtractError::ImageDecode("Image dimensions overflow".to_string()))?;

    if data.len() < expected {
        return Err(ExtractError::ImageDecode(format!(
            "Image data too short: data_len={}, expected={}",
            data.len(),
            expected
        )));
    }
    data.truncate(expected);
    Ok(data)
}

/// Unpack `bits`-wide samples (1, 2, 4 or 8; rows padded to whole bytes)
/// into one byte per sample
fn unpack_samples(
    data: &[u8],
    width: u32,
    height: u32,
    bits: usize,
) -> Result<Vec<u8>, ExtractError> {
    let row_bytes = (width as usize)
        .checked_mul(bits)
        .map(|row_bits| row_bits.div_ceil(8))
        .ok_or_else(|| ExtractError::ImageDecode("Image dimensions overflow".to_string()))?;
    let expected = row_bytes
        .checked_mul(height as usize)
        .ok_or_else(|| ExtractError::ImageDecode("Image dimensions overflow".to_string()))?;

    if data.len() < expected {
        return Err(ExtractError::ImageDecode(format!(
            "{}-bit image data too short: data_len={}, expected={}",
            bits,
            data.len(),
            expected
        )));
    }

    let mask = ((1u16 << bits) - 1) as u8;
    let mut samples = Vec::with_capacity(width as usize * height as usize);
    for row in data[..expected].chunks_exact(row_bytes) {
        for x in 0..width as usize {
            let offset = x * bits;
            let shift = 8 - bits - offset % 8;
            samples.push((row[offset / 8] >> shift) & mask);
        }
    }
    Ok(samples)
}

/// Expand 1-bit samples to 8-bit gray
fn unpack_bilevel(data: &[u8], width: u32, height: u32) -> Result<GrayImage, ExtractError> {
    let samples = unpack_samples(data, width, height, 1)?;
    GrayImage::from_raw(width, height, samples.into_iter().map(|bit| bit * 255).collect())
        .ok_or_else(|| ExtractError::ImageDecode("Invalid bilevel image data".to_string()))
}

fn cmyk_to_rgb(data: &[u8]) -> Vec<u8> {
    let mut rgb_data = Vec::with_capacity(data.len() / 4 * 3);
    for chunk in data.chunks_exact(4) {
        let c = chunk[0] as f32 / 255.0;
        let m = chunk[1] as f32 / 255.0;
        let y = chunk[2] as f32 / 255.0;
        let k = chunk[3] as f32 / 255.0;
        rgb_data.push(((1.0 - c) * (1.0 - k) * 255.0) as u8);
        rgb_data.push(((1.0 - m) * (1.0 - k) * 255.0) as u8);
        rgb_data.push(((1.0 - y) * (1.0 - k) * 255.0) as u8);
    }
    rgb_data
}

/// Resolve the colour space of an image stream, following indirect
/// references
fn color_space(doc: &Document, stream: &Stream) -> ColorSpace {
    match stream.dict.get(b"ColorSpace").ok().and_then(|obj| resolve(doc, obj)) {
        Some(obj) => parse_color_space(doc, obj),
        None => ColorSpace::Rgb,
    }
}

fn parse_color_space(doc: &Document, cs_obj: &Object) -> ColorSpace {
    if let Ok(name) = cs_obj.as_name() {
        return named_color_space(name);
    }

    // Array form, e.g. [/ICCBased 12 0 R] or [/Indexed /DeviceRGB 255 <...>]
    let Some(items) = cs_obj.as_array().ok() else {
        return ColorSpace::Rgb;
    };
    let Some(family) = items.first().and_then(|f| f.as_name().ok()) else {
        return ColorSpace::Rgb;
    };

    match family {
        b"ICCBased" => {
            let components = items
                .get(1)
                .and_then(|obj| resolve(doc, obj))
                .and_then(|obj| obj.as_stream().ok())
                .and_then(|icc| icc.dict.get(b"N").ok())
                .and_then(|n| n.as_i64().ok());
            match components {
                Some(1) => ColorSpace::Gray,
                Some(4) => ColorSpace::Cmyk,
                Some(3) | None => ColorSpace::Rgb,
                Some(n) => ColorSpace::Unsupported(format!("ICCBased with {} components", n)),
            }
        }
        b"Indexed" | b"I" => indexed_color_space(doc, items),
        other => named_color_space(other),
    }
}

/// `[/Indexed base hival lookup]`, lookup given as a string or a stream
fn indexed_color_space(doc: &Document, items: &[Object]) -> ColorSpace {
    let base = match items.get(1).and_then(|obj| resolve(doc, obj)) {
        Some(obj) => parse_color_space(doc, obj),
        None => return ColorSpace::Unsupported("Indexed without base".to_string()),
    };
    let Some(components) = base.components() else {
        return ColorSpace::Unsupported(format!("Indexed over {}", base.name()));
    };

    let hival = items
        .get(2)
        .and_then(|obj| obj.as_i64().ok())
        .unwrap_or(255)
        .clamp(0, 255) as usize;

    let lookup = match items.get(3).and_then(|obj| resolve(doc, obj)) {
        Some(Object::String(bytes, _)) => bytes.clone(),
        Some(Object::Stream(table)) if table.dict.get(b"Filter").is_ok() => {
            match table.decompressed_content() {
                Ok(bytes) => bytes,
                Err(e) => return ColorSpace::Unsupported(format!("Indexed lookup: {}", e)),
            }
        }
        Some(Object::Stream(table)) => table.content.clone(),
        _ => return ColorSpace::Unsupported("Indexed without lookup table".to_string()),
    };

    let needed = (hival + 1) * components;
    if lookup.len() < needed {
        return ColorSpace::Unsupported(format!(
            "Indexed lookup too short: {} of {} bytes",
            lookup.len(),
            needed
        ));
    }

    ColorSpace::Indexed {
        base: Box::new(base),
        palette: lookup[..needed].to_vec(),
    }
}

fn named_color_space(name: &[u8]) -> ColorSpace {
    match name {
        b"DeviceGray" | b"CalGray" | b"G" => ColorSpace::Gray,
        b"DeviceRGB" | b"CalRGB" | b"RGB" => ColorSpace::Rgb,
        b"DeviceCMYK" | b"CMYK" => ColorSpace::Cmyk,
        other => ColorSpace::Unsupported(String::from_utf8_lossy(other).to_string()),
    }
}

//! TIFF input/output.
//!
//! Tiles and mosaics are read through the `tiff` decoder with every
//! observed sample format widened or clipped into u16. Hyperstacks are
//! written as multi-page grayscale TIFF with an ImageJ-style
//! ImageDescription tag on the first page, one page per `[Y, X]` plane in
//! row-major order of the leading axes (`C` fastest, then `Z`, then `T`).

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use image::{GrayImage, ImageBuffer, Luma};
use ndarray::Array2;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

use crate::consts::IMAGEJ_VERSION_TAG;
use crate::error::{HiconaError, Result};
use crate::hyperstack::{Axis, Hyperstack, PixelData};

fn to_u16(result: DecodingResult, path: &Path) -> Result<Vec<u16>> {
    match result {
        DecodingResult::U16(v) => Ok(v),
        DecodingResult::U8(v) => Ok(v.into_iter().map(u16::from).collect()),
        DecodingResult::I16(v) => Ok(v.into_iter().map(|x| x.max(0) as u16).collect()),
        DecodingResult::U32(v) => Ok(v.into_iter().map(|x| x.min(65_535) as u16).collect()),
        DecodingResult::F32(v) => Ok(v
            .into_iter()
            .map(|x| x.clamp(0.0, 65_535.0) as u16)
            .collect()),
        DecodingResult::F64(v) => Ok(v
            .into_iter()
            .map(|x| x.clamp(0.0, 65_535.0) as u16)
            .collect()),
        other => Err(HiconaError::Pipeline(format!(
            "unsupported TIFF sample format {other:?} in {}",
            path.display()
        ))),
    }
}

/// Load the first page of a TIFF as a `[Y, X]` u16 array.
pub fn load_plane(path: &Path) -> Result<Array2<u16>> {
    let file = File::open(path)?;
    let mut decoder = Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited());
    let (w, h) = decoder.dimensions()?;
    let pixels = to_u16(decoder.read_image()?, path)?;
    Ok(Array2::from_shape_vec((h as usize, w as usize), pixels)?)
}

/// Load every page of a TIFF as `[Y, X]` u16 arrays, in file order.
pub fn load_pages(path: &Path) -> Result<Vec<Array2<u16>>> {
    let file = File::open(path)?;
    let mut decoder = Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited());
    let mut pages = Vec::new();
    loop {
        let (w, h) = decoder.dimensions()?;
        let pixels = to_u16(decoder.read_image()?, path)?;
        pages.push(Array2::from_shape_vec((h as usize, w as usize), pixels)?);
        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
    }
    Ok(pages)
}

/// Read the ImageDescription tag of a TIFF, if present.
pub fn read_image_description(path: &Path) -> Result<Option<String>> {
    let file = File::open(path)?;
    let mut decoder = Decoder::new(BufReader::new(file))?;
    match decoder.get_tag_ascii_string(Tag::ImageDescription) {
        Ok(desc) => Ok(Some(desc)),
        Err(_) => Ok(None),
    }
}

/// ImageJ-style hyperstack description for a stack with the given page
/// count and axis lengths. The channels/slices/frames lines appear only
/// when the corresponding axis is present.
pub fn build_image_description(
    images: usize,
    channels: Option<usize>,
    slices: Option<usize>,
    frames: Option<usize>,
) -> String {
    let mut desc = format!("ImageJ={IMAGEJ_VERSION_TAG}\nimages={images}\n");
    if let Some(c) = channels {
        desc.push_str(&format!("channels={c}\n"));
    }
    if let Some(z) = slices {
        desc.push_str(&format!("slices={z}\n"));
    }
    if let Some(t) = frames {
        desc.push_str(&format!("frames={t}\n"));
    }
    desc.push_str("hyperstack=true\nmode=grayscale");
    desc
}

/// Save a hyperstack as a multi-page grayscale TIFF, preserving bit depth.
pub fn save_hyperstack(path: &Path, stack: &Hyperstack) -> Result<()> {
    let shape = stack.shape();
    let ndim = shape.len();
    let (h, w) = (shape[ndim - 2], shape[ndim - 1]);
    let page_px = h * w;
    let pages: usize = shape[..ndim - 2].iter().product::<usize>().max(1);

    let description = build_image_description(
        pages,
        stack.axis_len(Axis::C),
        stack.axis_len(Axis::Z),
        stack.axis_len(Axis::T),
    );

    let file = File::create(path)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))?;

    match stack.data() {
        PixelData::U16(a) => {
            let contiguous = a.as_standard_layout();
            let flat = contiguous
                .as_slice()
                .ok_or_else(|| HiconaError::Pipeline("non-contiguous pixel buffer".into()))?;
            for (i, page) in flat.chunks(page_px).enumerate() {
                let mut img = encoder.new_image::<colortype::Gray16>(w as u32, h as u32)?;
                if i == 0 {
                    img.encoder()
                        .write_tag(Tag::ImageDescription, description.as_str())?;
                }
                img.write_data(page)?;
            }
        }
        PixelData::U8(a) => {
            let contiguous = a.as_standard_layout();
            let flat = contiguous
                .as_slice()
                .ok_or_else(|| HiconaError::Pipeline("non-contiguous pixel buffer".into()))?;
            for (i, page) in flat.chunks(page_px).enumerate() {
                let mut img = encoder.new_image::<colortype::Gray8>(w as u32, h as u32)?;
                if i == 0 {
                    img.encoder()
                        .write_tag(Tag::ImageDescription, description.as_str())?;
                }
                img.write_data(page)?;
            }
        }
    }
    Ok(())
}

/// Save a single `[Y, X]` hyperstack page through the `image` crate,
/// preserving bit depth. Used for stitch tiles and masks.
pub fn save_plane(path: &Path, plane: &Hyperstack) -> Result<()> {
    let shape = plane.shape();
    if shape.len() != 2 {
        return Err(HiconaError::Pipeline(format!(
            "expected a YX plane, got {} dims",
            shape.len()
        )));
    }
    let (h, w) = (shape[0], shape[1]);
    match plane.data() {
        PixelData::U16(a) => {
            let contiguous = a.as_standard_layout();
            let pixels = contiguous
                .as_slice()
                .ok_or_else(|| HiconaError::Pipeline("non-contiguous pixel buffer".into()))?
                .to_vec();
            let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w as u32, h as u32, pixels)
                .ok_or_else(|| HiconaError::Pipeline("buffer size mismatch".into()))?;
            img.save(path)?;
        }
        PixelData::U8(a) => {
            let contiguous = a.as_standard_layout();
            let pixels = contiguous
                .as_slice()
                .ok_or_else(|| HiconaError::Pipeline("non-contiguous pixel buffer".into()))?
                .to_vec();
            let img = GrayImage::from_raw(w as u32, h as u32, pixels)
                .ok_or_else(|| HiconaError::Pipeline("buffer size mismatch".into()))?;
            img.save(path)?;
        }
    }
    Ok(())
}

/// Save a bare `[Z, Y, X]` u16 substack as a plain multi-page TIFF
/// (EDF handoff format).
pub fn save_substack(path: &Path, substack: &ndarray::ArrayD<u16>) -> Result<()> {
    let shape = substack.shape();
    if shape.len() != 3 {
        return Err(HiconaError::Pipeline(format!(
            "expected a ZYX substack, got {} dims",
            shape.len()
        )));
    }
    let (z, h, w) = (shape[0], shape[1], shape[2]);
    let contiguous = substack.as_standard_layout();
    let flat = contiguous
        .as_slice()
        .ok_or_else(|| HiconaError::Pipeline("non-contiguous pixel buffer".into()))?;

    let description = build_image_description(z, None, Some(z), None);
    let file = File::create(path)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))?;
    for (i, page) in flat.chunks(h * w).enumerate() {
        let mut img = encoder.new_image::<colortype::Gray16>(w as u32, h as u32)?;
        if i == 0 {
            img.encoder()
                .write_tag(Tag::ImageDescription, description.as_str())?;
        }
        img.write_data(page)?;
    }
    Ok(())
}

//! Background removal for product photos.
//!
//! Shopping images are mostly a product on a flat studio backdrop. Pixels
//! connected to the image border whose colour is close to the border colour
//! are treated as background and made transparent.

use std::collections::VecDeque;

use anyhow::{Context, Result};
use image::{ImageBuffer, ImageEncoder, Rgba, RgbaImage};

use super::BaseBackgroundRemover;

/// Per-channel distance under which a pixel counts as background.
pub const DEFAULT_TOLERANCE: u8 = 32;

pub struct EdgeFloodRemover {
    tolerance: u8,
}

impl EdgeFloodRemover {
    pub fn new(tolerance: u8) -> Self {
        Self { tolerance }
    }
}

impl Default for EdgeFloodRemover {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl BaseBackgroundRemover for EdgeFloodRemover {
    fn remove_background(&self, image: &[u8]) -> Result<Vec<u8>> {
        let mut rgba = image::load_from_memory(image)
            .context("Failed to decode image")?
            .to_rgba8();

        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            anyhow::bail!("image has no pixels");
        }

        let backdrop = border_color(&rgba);
        clear_connected_backdrop(&mut rgba, backdrop, self.tolerance);

        encode_png(&rgba)
    }
}

/// Average colour of the four corners.
fn border_color(img: &RgbaImage) -> [u8; 3] {
    let (w, h) = img.dimensions();
    let corners = [
        img.get_pixel(0, 0),
        img.get_pixel(w - 1, 0),
        img.get_pixel(0, h - 1),
        img.get_pixel(w - 1, h - 1),
    ];

    let mut sum = [0u32; 3];
    for px in corners {
        for (channel, total) in sum.iter_mut().enumerate() {
            *total += px.0[channel] as u32;
        }
    }

    [(sum[0] / 4) as u8, (sum[1] / 4) as u8, (sum[2] / 4) as u8]
}

fn is_backdrop(px: &Rgba<u8>, backdrop: [u8; 3], tolerance: u8) -> bool {
    px.0[..3]
        .iter()
        .zip(backdrop.iter())
        .all(|(a, b)| a.abs_diff(*b) <= tolerance)
}

/// Breadth-first fill from every border pixel, clearing alpha on matches.
fn clear_connected_backdrop(img: &mut RgbaImage, backdrop: [u8; 3], tolerance: u8) {
    let (w, h) = img.dimensions();
    let mut visited = vec![false; (w as usize) * (h as usize)];
    let mut queue = VecDeque::new();

    let idx = |x: u32, y: u32| (y as usize) * (w as usize) + x as usize;

    for x in 0..w {
        queue.push_back((x, 0));
        queue.push_back((x, h - 1));
    }
    for y in 0..h {
        queue.push_back((0, y));
        queue.push_back((w - 1, y));
    }

    while let Some((x, y)) = queue.pop_front() {
        let i = idx(x, y);
        if visited[i] {
            continue;
        }
        visited[i] = true;

        let px = img.get_pixel_mut(x, y);
        if !is_backdrop(px, backdrop, tolerance) {
            continue;
        }
        px.0[3] = 0;

        if x > 0 {
            queue.push_back((x - 1, y));
        }
        if x + 1 < w {
            queue.push_back((x + 1, y));
        }
        if y > 0 {
            queue.push_back((x, y - 1));
        }
        if y + 1 < h {
            queue.push_back((x, y + 1));
        }
    }
}

fn encode_png(img: &ImageBuffer<Rgba<u8>, Vec<u8>>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    encoder
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .context("Failed to encode PNG")?;
    Ok(buf)
}

//! Image rendering for measurements using tiny-skia
//!
//! These functions rasterise finished measurements inside a map extent, for
//! the area capture export.

use std::io;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use image::RgbaImage;
use tiny_skia::{FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use super::geometry::{ViewTransform, shape};
use crate::config::{MeasureStyle, ShapeColor};
use crate::domain::{Coord, Extent, MeasureKind, Shape};
use crate::measure::registry::RegistryEntry;

/// Convert RgbaImage to Pixmap, apply drawing function, and copy back
///
/// Meant for opaque backgrounds such as a rendered basemap.
fn with_pixmap(img: &mut RgbaImage, f: impl FnOnce(&mut Pixmap)) -> Result<()> {
    let (w, h) = (img.width(), img.height());
    let size = tiny_skia::IntSize::from_wh(w, h).ok_or_else(|| anyhow!("Empty image"))?;
    let mut pixmap = Pixmap::from_vec(img.as_raw().clone(), size)
        .ok_or_else(|| anyhow!("Image buffer does not match {}x{}", w, h))?;

    f(&mut pixmap);

    // Copy back
    img.copy_from_slice(pixmap.data());
    Ok(())
}

fn paint(color: ShapeColor) -> Paint<'static> {
    let [r, g, b, a] = color.to_rgba_u8();
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;
    paint
}

fn round_stroke(width: f32) -> Stroke {
    Stroke {
        width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Default::default()
    }
}

/// Build a polyline path, closed for rings
fn build_line_path(view: &ViewTransform, points: &[Coord], close: bool) -> Option<tiny_skia::Path> {
    let (first, rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    let (x, y) = view.to_pixel(*first);
    pb.move_to(x, y);
    for p in rest {
        let (x, y) = view.to_pixel(*p);
        pb.line_to(x, y);
    }
    if close {
        pb.close();
    }
    pb.finish()
}

/// Build an ellipse path using cubic bezier curves
fn build_ellipse_path(cx: f32, cy: f32, rx: f32, ry: f32) -> Option<tiny_skia::Path> {
    let kx = rx * shape::BEZIER_K;
    let ky = ry * shape::BEZIER_K;

    let mut pb = PathBuilder::new();

    // Start at top
    pb.move_to(cx, cy - ry);
    pb.cubic_to(cx + kx, cy - ry, cx + rx, cy - ky, cx + rx, cy);
    pb.cubic_to(cx + rx, cy + ky, cx + kx, cy + ry, cx, cy + ry);
    pb.cubic_to(cx - kx, cy + ry, cx - rx, cy + ky, cx - rx, cy);
    pb.cubic_to(cx - rx, cy - ky, cx - kx, cy - ry, cx, cy - ry);

    pb.close();
    pb.finish()
}

/// Stroke a path over a dark halo
fn stroke_with_halo(pixmap: &mut Pixmap, path: &tiny_skia::Path, style: &MeasureStyle) {
    let mut halo = Paint::default();
    halo.set_color_rgba8(0, 0, 0, shape::SHADOW_ALPHA);
    halo.anti_alias = true;
    let halo_stroke = round_stroke(style.stroke_width + shape::OUTLINE * 2.0);
    pixmap.stroke_path(path, &halo, &halo_stroke, Transform::identity(), None);

    let stroke = round_stroke(style.stroke_width);
    pixmap.stroke_path(path, &paint(style.stroke), &stroke, Transform::identity(), None);
}

fn fill_and_stroke(pixmap: &mut Pixmap, path: &tiny_skia::Path, style: &MeasureStyle) {
    pixmap.fill_path(
        path,
        &paint(style.fill),
        FillRule::EvenOdd,
        Transform::identity(),
        None,
    );
    stroke_with_halo(pixmap, path, style);
}

/// Dot with an outline, as used for the radius center
fn draw_point(pixmap: &mut Pixmap, view: &ViewTransform, at: Coord, style: &MeasureStyle) {
    let (x, y) = view.to_pixel(at);
    let r = style.point_radius;
    let Some(path) = build_ellipse_path(x, y, r, r) else {
        return;
    };
    pixmap.fill_path(
        &path,
        &paint(style.stroke),
        FillRule::Winding,
        Transform::identity(),
        None,
    );
    let stroke = round_stroke(style.point_outline_width);
    pixmap.stroke_path(
        &path,
        &paint(style.point_outline),
        &stroke,
        Transform::identity(),
        None,
    );
}

fn draw_shape(pixmap: &mut Pixmap, view: &ViewTransform, shape: &Shape, style: &MeasureStyle) {
    match shape {
        Shape::Point(p) => draw_point(pixmap, view, *p, style),
        Shape::LineString(points) => {
            if let Some(path) = build_line_path(view, points, false) {
                stroke_with_halo(pixmap, &path, style);
            }
        }
        Shape::Polygon(ring) => {
            if let Some(path) = build_line_path(view, ring, true) {
                fill_and_stroke(pixmap, &path, style);
            }
        }
        Shape::Circle { center, radius } => {
            let (cx, cy) = view.to_pixel(*center);
            let (rx, ry) = view.to_pixel_radii(*radius);
            if let Some(path) = build_ellipse_path(cx, cy, rx, ry) {
                fill_and_stroke(pixmap, &path, style);
            }
        }
    }
}

/// Draw every entry in registry order, radius centers on top of their circle
fn draw_entries(
    pixmap: &mut Pixmap,
    view: &ViewTransform,
    entries: &[RegistryEntry],
    style: &MeasureStyle,
) {
    for entry in entries {
        draw_shape(pixmap, view, &entry.shape, style);
        if entry.kind == MeasureKind::Radius {
            let center = match &entry.shape {
                Shape::Circle { center, .. } => *center,
                other => other.anchor(),
            };
            draw_point(pixmap, view, center, style);
        }
    }
}

/// Rasterise the measurements inside `extent` onto a transparent image
pub fn capture_extent(
    entries: &[RegistryEntry],
    extent: &Extent,
    width: u32,
    height: u32,
    style: &MeasureStyle,
) -> Result<RgbaImage> {
    let view = ViewTransform::new(extent, width, height)
        .ok_or_else(|| anyhow!("Cannot capture an empty extent into {}x{}", width, height))?;
    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| anyhow!("Failed to allocate {}x{} pixmap", width, height))?;

    draw_entries(&mut pixmap, &view, entries, style);

    // The pixmap is premultiplied, image expects straight alpha
    let mut img = RgbaImage::new(width, height);
    for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = image::Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    log::debug!(
        "Captured {} measurements into {}x{}",
        entries.len(),
        width,
        height
    );
    Ok(img)
}

/// Draw the measurements onto an existing opaque image covering `extent`
pub fn draw_measurements_on_image(
    img: &mut RgbaImage,
    entries: &[RegistryEntry],
    extent: &Extent,
    style: &MeasureStyle,
) -> Result<()> {
    let view = ViewTransform::new(extent, img.width(), img.height())
        .ok_or_else(|| anyhow!("Cannot draw an empty extent"))?;
    with_pixmap(img, |pixmap| draw_entries(pixmap, &view, entries, style))
}

/// Bounding box of every entry with a margin, for captures without an extent
pub fn entries_extent(entries: &[RegistryEntry], margin: f64) -> Option<Extent> {
    let coords: Vec<Coord> = entries
        .iter()
        .flat_map(|e| e.shape.to_coords(crate::domain::CIRCLE_SIDES))
        .collect();
    let extent = Extent::of(&coords)?;
    let pad = extent.width().max(extent.height()).max(1.0) * margin;
    Some(Extent {
        min_x: extent.min_x - pad,
        min_y: extent.min_y - pad,
        max_x: extent.max_x + pad,
        max_y: extent.max_y + pad,
    })
}

fn write_png<W: io::Write>(w: W, image: &RgbaImage) -> Result<(), png::EncodingError> {
    let mut encoder = png::Encoder::new(w, image.width(), image.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(image.as_raw())
}

pub fn save_png(img: &RgbaImage, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_png(file, img)
        .with_context(|| format!("Failed to write PNG to {}", path.display()))
}

/// Load a map snapshot to draw the measurements on
pub fn load_background(path: &Path) -> Result<RgbaImage> {
    let img = image::open(path)
        .with_context(|| format!("Failed to open background {}", path.display()))?;
    Ok(img.to_rgba8())
}

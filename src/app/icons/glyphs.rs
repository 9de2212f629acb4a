use std::fs;

use ab_glyph::{point, Font, FontVec, OutlinedGlyph, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use tracing::debug;

const BITMAP_WIDTH: u32 = 5;
const BITMAP_HEIGHT: u32 = 7;
const BITMAP_SPACING: u32 = 1;

/// 5x7 glyphs, one row per byte, most significant of the low five bits on the left.
fn bitmap_glyph(ch: char) -> Option<[u8; 7]> {
    match ch.to_ascii_uppercase() {
        'A' => Some([0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001]),
        'P' => Some([0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000]),
        _ => None,
    }
}

pub fn load_first_font(candidates: &[String]) -> Option<FontVec> {
    candidates.iter().find_map(|path| {
        let bytes = fs::read(path).ok()?;
        match FontVec::try_from_vec(bytes) {
            Ok(font) => {
                debug!(font = %path, "using placeholder font");
                Some(font)
            }
            Err(_) => None,
        }
    })
}

fn blend(image: &mut RgbaImage, x: i32, y: i32, color: [u8; 3], coverage: f32) {
    if x < 0 || y < 0 || x as u32 >= image.width() || y as u32 >= image.height() {
        return;
    }
    let coverage = coverage.clamp(0.0, 1.0);
    let pixel = image.get_pixel_mut(x as u32, y as u32);
    for channel in 0..3 {
        let base = pixel.0[channel] as f32;
        pixel.0[channel] = (base + (color[channel] as f32 - base) * coverage).round() as u8;
    }
}

pub fn draw_text_centered(image: &mut RgbaImage, font: &FontVec, px: f32, text: &str, color: [u8; 3]) {
    let scale = PxScale::from(px);
    let scaled = font.as_scaled(scale);

    let mut caret = 0.0f32;
    let mut previous = None;
    let mut outlined: Vec<OutlinedGlyph> = Vec::new();
    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = previous {
            caret += scaled.kern(prev, id);
        }
        let glyph = id.with_scale_and_position(scale, point(caret, scaled.ascent()));
        caret += scaled.h_advance(id);
        previous = Some(id);
        if let Some(glyph) = font.outline_glyph(glyph) {
            outlined.push(glyph);
        }
    }
    if outlined.is_empty() {
        return;
    }

    let (min_x, min_y, max_x, max_y) = outlined.iter().map(|glyph| glyph.px_bounds()).fold(
        (f32::MAX, f32::MAX, f32::MIN, f32::MIN),
        |(min_x, min_y, max_x, max_y), rect| {
            (
                min_x.min(rect.min.x),
                min_y.min(rect.min.y),
                max_x.max(rect.max.x),
                max_y.max(rect.max.y),
            )
        },
    );
    let offset_x = (image.width() as f32 - (max_x - min_x)) / 2.0 - min_x;
    let offset_y = (image.height() as f32 - (max_y - min_y)) / 2.0 - min_y;

    for glyph in outlined {
        let bounds = glyph.px_bounds();
        let left = (bounds.min.x + offset_x).round() as i32;
        let top = (bounds.min.y + offset_y).round() as i32;
        glyph.draw(|x, y, coverage| {
            blend(image, left + x as i32, top + y as i32, color, coverage);
        });
    }
}

pub fn draw_bitmap_text_centered(image: &mut RgbaImage, text: &str, color: [u8; 3]) {
    let scale = (image.width().min(image.height()) / 32).max(1);
    let glyph_count = text.chars().count() as u32;
    if glyph_count == 0 {
        return;
    }
    let advance = (BITMAP_WIDTH + BITMAP_SPACING) * scale;
    let text_width = advance * glyph_count - BITMAP_SPACING * scale;
    let text_height = BITMAP_HEIGHT * scale;
    let left = (image.width() as i32 - text_width as i32) / 2;
    let top = (image.height() as i32 - text_height as i32) / 2;

    for (index, ch) in text.chars().enumerate() {
        let Some(rows) = bitmap_glyph(ch) else {
            continue;
        };
        let glyph_left = left + (index as u32 * advance) as i32;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..BITMAP_WIDTH {
                if bits & (1 << (BITMAP_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        blend(
                            image,
                            glyph_left + (col * scale + dx) as i32,
                            top + (row as u32 * scale + dy) as i32,
                            color,
                            1.0,
                        );
                    }
                }
            }
        }
    }
}

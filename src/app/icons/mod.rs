pub mod glyphs;

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{ImageFormat, Rgba, RgbaImage};
use tracing::{info, warn};

use crate::app::error::AppError;
use crate::app::icons::glyphs::{draw_bitmap_text_centered, draw_text_centered, load_first_font};

pub const PLACEHOLDER_FILE_NAME: &str = "default_icon.png";
const BACKGROUND: Rgba<u8> = Rgba([100, 100, 100, 255]);
const FOREGROUND: [u8; 3] = [255, 255, 255];
const LABEL: &str = "APP";
const LABEL_PX_AT_64: f32 = 20.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderIcon {
    pub path: PathBuf,
    pub created: bool,
}

/// Configured path, else next to the executable when that directory already
/// holds the icon or accepts writes, else the config directory.
pub fn resolve_placeholder_path(configured: &str) -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    placeholder_path_in(configured, exe_dir, dirs::config_dir())
}

fn placeholder_path_in(
    configured: &str,
    exe_dir: Option<PathBuf>,
    config_dir: Option<PathBuf>,
) -> PathBuf {
    let configured = configured.trim();
    if !configured.is_empty() {
        return PathBuf::from(configured);
    }
    if let Some(dir) = exe_dir {
        let candidate = dir.join(PLACEHOLDER_FILE_NAME);
        if candidate.exists() || dir_accepts_writes(&dir) {
            return candidate;
        }
    }
    config_dir
        .unwrap_or_else(|| PathBuf::from("."))
        .join("adb-manager")
        .join(PLACEHOLDER_FILE_NAME)
}

fn dir_accepts_writes(dir: &Path) -> bool {
    let marker = dir.join(".adb-manager-write-check");
    match fs::OpenOptions::new().write(true).create_new(true).open(&marker) {
        Ok(_) => {
            let _ = fs::remove_file(&marker);
            true
        }
        Err(_) => false,
    }
}

pub fn render_placeholder(size: u32, fonts: &[String]) -> RgbaImage {
    let mut image = RgbaImage::from_pixel(size, size, BACKGROUND);
    match load_first_font(fonts) {
        Some(font) => {
            let px = LABEL_PX_AT_64 * size as f32 / 64.0;
            draw_text_centered(&mut image, &font, px, LABEL, FOREGROUND);
        }
        None => {
            warn!("no placeholder font found, using built-in bitmap font");
            draw_bitmap_text_centered(&mut image, LABEL, FOREGROUND);
        }
    }
    image
}

pub fn ensure_placeholder_icon(
    path: &Path,
    size: u32,
    fonts: &[String],
    trace_id: &str,
) -> Result<PlaceholderIcon, AppError> {
    if path.exists() {
        return Ok(PlaceholderIcon {
            path: path.to_path_buf(),
            created: false,
        });
    }

    info!(trace_id = %trace_id, path = %path.display(), "generating placeholder icon");
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            AppError::system(format!("Failed to create icon directory: {err}"), trace_id)
        })?;
    }
    let bytes = encode_png(&render_placeholder(size, fonts))
        .map_err(|err| AppError::system(err, trace_id))?;
    fs::write(path, bytes)
        .map_err(|err| AppError::system(format!("Failed to write placeholder icon: {err}"), trace_id))?;

    Ok(PlaceholderIcon {
        path: path.to_path_buf(),
        created: true,
    })
}

/// An unwritable location still yields an in-memory placeholder.
pub fn placeholder_png(path: &Path, size: u32, fonts: &[String], trace_id: &str) -> Vec<u8> {
    let from_disk = ensure_placeholder_icon(path, size, fonts, trace_id)
        .and_then(|icon| {
            fs::read(&icon.path).map_err(|err| {
                AppError::system(format!("Failed to read placeholder icon: {err}"), trace_id)
            })
        })
        .and_then(|bytes| normalize_icon(&bytes, size).map_err(|err| AppError::system(err, trace_id)));
    match from_disk {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(trace_id = %trace_id, error = %err, "falling back to in-memory placeholder");
            encode_png(&render_placeholder(size, fonts)).unwrap_or_default()
        }
    }
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, String> {
    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|err| format!("Failed to encode PNG: {err}"))?;
    Ok(cursor.into_inner())
}

pub fn normalize_icon(bytes: &[u8], size: u32) -> Result<Vec<u8>, String> {
    let decoded =
        image::load_from_memory(bytes).map_err(|err| format!("Failed to decode icon: {err}"))?;
    let fitted = if decoded.width() == size && decoded.height() == size {
        decoded
    } else {
        decoded.resize(size, size, FilterType::Lanczos3)
    };
    encode_png(&fitted.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn placeholder_generation_is_idempotent() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("icons").join(PLACEHOLDER_FILE_NAME);

        let first = ensure_placeholder_icon(&path, 64, &[], "trace-a").expect("first");
        assert!(first.created);
        let written = fs::read(&path).expect("read");

        let second = ensure_placeholder_icon(&path, 64, &[], "trace-b").expect("second");
        assert!(!second.created);
        assert_eq!(fs::read(&path).expect("read"), written);
    }

    #[test]
    fn existing_file_is_never_overwritten() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join(PLACEHOLDER_FILE_NAME);
        fs::write(&path, b"user supplied").expect("write");

        let icon = ensure_placeholder_icon(&path, 64, &[], "trace-keep").expect("ensure");
        assert!(!icon.created);
        assert_eq!(fs::read(&path).expect("read"), b"user supplied");
    }

    #[test]
    fn generated_placeholder_is_a_gray_png_of_requested_size() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join(PLACEHOLDER_FILE_NAME);
        ensure_placeholder_icon(&path, 64, &[], "trace-png").expect("ensure");

        let image = image::open(&path).expect("decode").to_rgba8();
        assert_eq!(image.dimensions(), (64, 64));
        assert_eq!(image.get_pixel(0, 0), &BACKGROUND);
        assert!(image.pixels().any(|pixel| pixel.0[..3] == FOREGROUND));
    }

    #[test]
    fn normalize_icon_fits_and_keeps_aspect() {
        let wide = RgbaImage::from_pixel(128, 64, Rgba([10, 20, 30, 255]));
        let bytes = encode_png(&wide).expect("encode");
        let normalized = normalize_icon(&bytes, 64).expect("normalize");
        let image = image::load_from_memory(&normalized).expect("decode");
        assert_eq!((image.width(), image.height()), (64, 32));
    }

    #[test]
    fn normalize_icon_rejects_garbage() {
        assert!(normalize_icon(b"<html>not an image</html>", 64).is_err());
    }

    #[test]
    fn unwritable_location_still_yields_png() {
        let tmp = TempDir::new().expect("tmp");
        let blocker = tmp.path().join("file");
        fs::write(&blocker, b"x").expect("write");
        // A path below a regular file can never be created.
        let path = blocker.join(PLACEHOLDER_FILE_NAME);
        let bytes = placeholder_png(&path, 64, &[], "trace-mem");
        assert!(bytes.starts_with(b"\x89PNG"));
    }

    #[test]
    fn placeholder_sits_next_to_writable_executable() {
        let exe = TempDir::new().expect("exe");
        let config = TempDir::new().expect("config");
        let path = placeholder_path_in(
            "",
            Some(exe.path().to_path_buf()),
            Some(config.path().to_path_buf()),
        );
        assert_eq!(path, exe.path().join(PLACEHOLDER_FILE_NAME));
        assert!(!exe.path().join(".adb-manager-write-check").exists());
    }

    #[test]
    fn unwritable_executable_dir_falls_back_to_config_dir() {
        let exe = TempDir::new().expect("exe");
        let config = TempDir::new().expect("config");
        let missing = exe.path().join("not-created");
        let path = placeholder_path_in("", Some(missing), Some(config.path().to_path_buf()));
        assert_eq!(
            path,
            config.path().join("adb-manager").join(PLACEHOLDER_FILE_NAME)
        );
    }

    #[test]
    fn existing_icon_next_to_executable_is_reused() {
        let exe = TempDir::new().expect("exe");
        let bundled = exe.path().join(PLACEHOLDER_FILE_NAME);
        fs::write(&bundled, b"png").expect("write");
        let path = placeholder_path_in("", Some(exe.path().to_path_buf()), None);
        assert_eq!(path, bundled);
    }

    #[test]
    fn configured_placeholder_path_wins() {
        let path = placeholder_path_in(" /opt/icons/app.png ", None, None);
        assert_eq!(path, PathBuf::from("/opt/icons/app.png"));
    }
}

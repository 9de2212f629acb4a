use std::fs::File;
use std::path::{Path, PathBuf};

use zip::ZipArchive;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApkFile {
    pub path: PathBuf,
    pub file_name: String,
}

pub fn is_apk_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("apk"))
        .unwrap_or(false)
}

pub fn display_file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

pub fn normalize_apk_path(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

pub fn inspect_apk(path: &Path) -> Result<ApkFile, String> {
    let path = normalize_apk_path(path);
    let file_name = display_file_name(&path);
    if !path.is_file() {
        return Err(format!("File not found: {}", path.display()));
    }
    let file = File::open(&path).map_err(|err| format!("Failed to open {file_name}: {err}"))?;
    ZipArchive::new(file).map_err(|err| format!("{file_name} is not a valid APK: {err}"))?;
    Ok(ApkFile { path, file_name })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_fake_apk(path: &Path) {
        let file = File::create(path).expect("create apk");
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file("AndroidManifest.xml", SimpleFileOptions::default())
            .expect("start file");
        zip.write_all(b"<manifest/>").expect("write manifest");
        zip.finish().expect("finish");
    }

    #[test]
    fn recognizes_apk_extension_case_insensitively() {
        assert!(is_apk_path(Path::new("/tmp/app.apk")));
        assert!(is_apk_path(Path::new("/tmp/APP.APK")));
        assert!(!is_apk_path(Path::new("/tmp/app.apks")));
        assert!(!is_apk_path(Path::new("/tmp/notes.txt")));
        assert!(!is_apk_path(Path::new("/tmp/apk")));
    }

    #[test]
    fn inspects_zip_backed_apk() {
        let tmp = TempDir::new().expect("tmp");
        let apk = tmp.path().join("demo.apk");
        write_fake_apk(&apk);

        let info = inspect_apk(&apk).expect("valid apk");
        assert_eq!(info.file_name, "demo.apk");
        assert_eq!(info.path, apk);
    }

    #[test]
    fn rejects_non_zip_and_missing_files() {
        let tmp = TempDir::new().expect("tmp");
        let bogus = tmp.path().join("bogus.apk");
        fs::write(&bogus, b"definitely not a zip").expect("write");

        let err = inspect_apk(&bogus).expect_err("not a zip");
        assert!(err.contains("not a valid APK"));

        let err = inspect_apk(&tmp.path().join("gone.apk")).expect_err("missing");
        assert!(err.contains("not found"));
    }
}

use std::path::{Path, PathBuf};

const SDK_ROOT_VARS: [&str; 2] = ["ANDROID_HOME", "ANDROID_SDK_ROOT"];

fn adb_file_name() -> &'static str {
    if cfg!(windows) {
        "adb.exe"
    } else {
        "adb"
    }
}

pub fn normalize_command_path(value: &str) -> String {
    let trimmed = value.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|candidate| candidate.strip_suffix(quote))
        {
            return inner.trim().to_string();
        }
    }
    trimmed.to_string()
}

pub fn find_sdk_adb<I>(sdk_roots: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    sdk_roots
        .into_iter()
        .map(|root| root.join("platform-tools").join(adb_file_name()))
        .find(|candidate| candidate.is_file())
}

pub fn resolve_adb_program(config_command_path: &str) -> String {
    let normalized = normalize_command_path(config_command_path);
    if !normalized.is_empty() {
        return normalized;
    }
    let roots = SDK_ROOT_VARS
        .iter()
        .filter_map(|var| std::env::var_os(var))
        .map(PathBuf::from);
    match find_sdk_adb(roots) {
        Some(path) => path.to_string_lossy().to_string(),
        None => "adb".to_string(),
    }
}

pub fn validate_adb_program(program: &str) -> Result<(), String> {
    if program.trim().is_empty() {
        return Err("ADB command is empty".to_string());
    }
    if program == "adb" {
        return Ok(());
    }
    let path = Path::new(program);
    if path.is_dir() {
        return Err("ADB path must point to an executable file".to_string());
    }
    if !path.exists() {
        return Err(format!("ADB executable not found at {program}"));
    }
    Ok(())
}

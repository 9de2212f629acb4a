use crate::app::models::DeviceSummary;

/// Extracts package identifiers from `pm list packages` output.
pub fn parse_package_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let package = match line.rsplit_once(':') {
                Some((_, tail)) => tail.trim(),
                None => line,
            };
            if package.is_empty() {
                None
            } else {
                Some(package.to_string())
            }
        })
        .collect()
}

pub fn parse_adb_devices(output: &str) -> Vec<DeviceSummary> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !line.trim_start().starts_with('*'))
        .filter(|line| !line.to_lowercase().contains("list of devices"))
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let serial = tokens.next()?.to_string();
            let state = tokens.next()?.to_string();
            Some(DeviceSummary { serial, state })
        })
        .collect()
}

/// Loose reachability test: adb answered with anything mentioning `device`,
/// which includes the bare `List of devices attached` header.
pub fn mentions_device(output: &str) -> bool {
    output.contains("device")
}

pub fn has_ready_device(output: &str) -> bool {
    parse_adb_devices(output)
        .iter()
        .any(|summary| summary.state == "device")
}

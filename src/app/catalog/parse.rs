use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

const TITLE_POINTER: &str = "/1/2/0/0";
const ICON_POINTER: &str = "/1/2/95/0/3/2";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailsPage {
    pub title: String,
    pub icon_url: Option<String>,
}

fn ds5_pattern() -> Result<&'static Regex, String> {
    static PATTERN: OnceLock<Result<Regex, String>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"(?s)AF_initDataCallback\(\{key:\s*'ds:5',\s*hash:\s*'[^']*',\s*data:\s*(\[.+?\]),\s*sideChannel:",
            )
            .map_err(|err| format!("Failed to build regex: {err}"))
        })
        .as_ref()
        .map_err(Clone::clone)
}

pub fn extract_ds5_payload(html: &str) -> Result<Value, String> {
    let payload = ds5_pattern()?
        .captures(html)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| "Could not find ds:5 data in page".to_string())?;
    serde_json::from_str(payload.as_str()).map_err(|err| format!("Malformed ds:5 JSON: {err}"))
}

pub fn parse_details_page(html: &str) -> Result<DetailsPage, String> {
    let payload = extract_ds5_payload(html)?;
    let title = payload
        .pointer(TITLE_POINTER)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .ok_or_else(|| "Details page has no title".to_string())?
        .to_string();
    let icon_url = payload
        .pointer(ICON_POINTER)
        .and_then(Value::as_str)
        .filter(|url| url.starts_with("http"))
        .map(str::to_string);
    Ok(DetailsPage { title, icon_url })
}

#[cfg(test)]
pub(crate) fn sample_details_page(title: &str, icon_url: Option<&str>) -> String {
    use serde_json::json;

    let mut details = vec![Value::Null; 96];
    details[0] = json!([title]);
    if let Some(url) = icon_url {
        details[95] = json!([[null, null, null, [null, null, url]]]);
    }
    let data = json!([null, [null, null, details]]);
    format!(
        "<html><script nonce=\"x\">AF_initDataCallback({{key: 'ds:5', hash: '7', data:{data}, sideChannel: {{}}}});</script></html>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_title_and_icon() {
        let html = sample_details_page("Signal Private Messenger", Some("https://play-lh.example/icon"));
        let page = parse_details_page(&html).expect("parse");
        assert_eq!(page.title, "Signal Private Messenger");
        assert_eq!(page.icon_url.as_deref(), Some("https://play-lh.example/icon"));
    }

    #[test]
    fn icon_is_optional() {
        let html = sample_details_page("No Icon", None);
        let page = parse_details_page(&html).expect("parse");
        assert!(page.icon_url.is_none());
    }

    #[test]
    fn missing_payload_is_an_error() {
        let err = parse_details_page("<html>not found</html>").expect_err("no payload");
        assert!(err.contains("ds:5"));
    }

    #[test]
    fn empty_title_is_an_error() {
        let html = sample_details_page("   ", None);
        assert!(parse_details_page(&html).is_err());
    }

    #[test]
    fn payload_pattern_is_compiled_once() {
        let first = ds5_pattern().expect("pattern");
        let second = ds5_pattern().expect("pattern");
        assert!(std::ptr::eq(first, second));
    }
}

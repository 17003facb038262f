//! Discovery by scraping the server's own pages.
//!
//! The markup assumptions live here and nowhere else: app names come from
//! anchors pointing at the per-app documentation export, session names from
//! the option values of the session-creation form. Both are plain functions
//! over HTML text so a different discovery strategy can replace them without
//! touching the middleware.

use std::sync::OnceLock;

use regex::Regex;

fn docs_href_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"href="[^"]*ExportAppDocs/([^/"?#]+)"#).expect("static pattern")
    })
}

fn config_select_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)<select[^>]*name="session_config"[^>]*>(.*?)</select>"#)
            .expect("static pattern")
    })
}

fn option_value_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"<option[^>]*value="([^"]*)""#).expect("static pattern"))
}

/// App names referenced by documentation-export links, in page order,
/// deduplicated.
pub fn app_names(html: &str) -> Vec<String> {
    let mut names = Vec::new();
    for caps in docs_href_pattern().captures_iter(html) {
        let name = caps[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Non-empty option values of the session-config select, in page order,
/// deduplicated. Other selects on the page (room pickers and the like) are
/// ignored.
pub fn session_names(html: &str) -> Vec<String> {
    let Some(caps) = config_select_pattern().captures(html) else {
        return Vec::new();
    };
    let block = &caps[1];
    let mut names = Vec::new();
    for caps in option_value_pattern().captures_iter(block) {
        let name = caps[1].trim().to_string();
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

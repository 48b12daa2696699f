//! Traffic-source attribution and search keyword extraction.

use url::Url;

/// Query parameters that commonly carry a search phrase.
const SEARCH_PARAMS: [&str; 6] = ["q", "query", "wd", "keyword", "search", "p"];

/// Known search engines by referrer host, without the `www.` prefix.
const SEARCH_ENGINES: [(&str, &str); 7] = [
    ("google.com", "Google"),
    ("bing.com", "Bing"),
    ("baidu.com", "Baidu"),
    ("yahoo.com", "Yahoo"),
    ("sogou.com", "Sogou"),
    ("so.com", "360 Search"),
    ("duckduckgo.com", "DuckDuckGo"),
];

pub const SOURCE_DIRECT: &str = "direct";
pub const SOURCE_INTERNAL: &str = "internal";

/// Labels where a visit came from.
///
/// No referrer is `"direct"`; a known search engine gets its label; the
/// current host is `"internal"`; any other host is returned as-is. A
/// referrer that is not a URL is returned verbatim.
pub fn traffic_source(referrer: &str, current_host: &str) -> String {
    let referrer = referrer.trim();
    if referrer.is_empty() {
        return SOURCE_DIRECT.to_string();
    }

    let Some(host) = Url::parse(referrer)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
    else {
        return referrer.to_string();
    };

    let bare = host.strip_prefix("www.").unwrap_or(&host);
    if let Some((_, label)) = SEARCH_ENGINES.iter().find(|(domain, _)| *domain == bare) {
        return (*label).to_string();
    }

    if host.eq_ignore_ascii_case(current_host) {
        return SOURCE_INTERNAL.to_string();
    }

    host
}

/// First non-empty search parameter in the page URL, then in the referrer.
pub fn search_keyword(page_url: &str, referrer: &str) -> String {
    [page_url, referrer]
        .into_iter()
        .filter_map(|candidate| Url::parse(candidate).ok())
        .find_map(|url| keyword_in(&url))
        .unwrap_or_default()
}

fn keyword_in(url: &Url) -> Option<String> {
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    SEARCH_PARAMS.iter().find_map(|param| {
        pairs
            .iter()
            .find(|(k, v)| k == param && !v.is_empty())
            .map(|(_, v)| v.clone())
    })
}

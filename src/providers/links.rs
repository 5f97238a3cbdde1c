use reqwest::header::{HeaderMap, LINK};
use url::Url;

/// Extracts the `rel="next"` target from the `Link` headers of a response.
///
/// Both GitHub and Buildkite advertise further pages this way; an absent or
/// malformed header means the listing is exhausted.
pub fn next_page_url(headers: &HeaderMap) -> Option<Url> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(parse_next_link)
        .and_then(|target| Url::parse(&target).ok())
}

/// Parses a single `Link` header value such as
/// `<https://api.github.com/x?page=2>; rel="next", <...>; rel="last"`.
pub fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|link| {
        let mut parts = link.split(';');
        let target = parts.next()?.trim();
        let target = target.strip_prefix('<')?.strip_suffix('>')?;

        let is_next = parts.any(|param| {
            let Some((name, value)) = param.split_once('=') else {
                return false;
            };
            name.trim().eq_ignore_ascii_case("rel")
                && value
                    .trim()
                    .trim_matches('"')
                    .split_whitespace()
                    .any(|rel| rel.eq_ignore_ascii_case("next"))
        });

        is_next.then(|| target.to_string())
    })
}

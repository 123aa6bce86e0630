//! URL canonicalization for state fingerprinting.
//!
//! Semantically equivalent URLs must normalize to the same string, so the
//! visited set and the per-URL visit counters key on the output of
//! [`normalize_url`]. Normalization is idempotent.

use url::Url;

/// Query keys injected by marketing tooling, irrelevant to page identity.
const TRACKING_PARAMS: [&str; 8] = [
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "msclkid",
];

/// Canonicalize an absolute URL.
///
/// Lowercases scheme and host, strips a single trailing slash (unless the
/// path is `/`), drops tracking query keys, sorts the remaining query pairs
/// by key (then value), and removes the fragment. Unparseable input is
/// returned unchanged.
#[must_use]
pub fn normalize_url(input: &str) -> String {
    let Ok(mut url) = Url::parse(input) else {
        return input.to_string();
    };

    let path = url.path().to_string();
    if path.len() > 1
        && let Some(stripped) = path.strip_suffix('/')
    {
        url.set_path(stripped);
    }

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    pairs.sort();

    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(&pairs);
    }
    url.set_fragment(None);

    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_scheme_and_host() {
        assert_eq!(
            normalize_url("HTTPS://Example.COM/Path"),
            "https://example.com/Path"
        );
    }

    #[test]
    fn strips_single_trailing_slash_but_keeps_root() {
        assert_eq!(normalize_url("https://a.com/docs/"), "https://a.com/docs");
        assert_eq!(normalize_url("https://a.com/"), "https://a.com/");
    }

    #[test]
    fn removes_tracking_keys_and_sorts_the_rest() {
        assert_eq!(
            normalize_url("https://a.com/p?utm_source=x&b=2&a=1&gclid=y"),
            "https://a.com/p?a=1&b=2"
        );
    }

    #[test]
    fn drops_fragment() {
        assert_eq!(normalize_url("https://a.com/p#section"), "https://a.com/p");
    }

    #[test]
    fn unparseable_input_passes_through() {
        assert_eq!(normalize_url("not a url"), "not a url");
    }

    #[test]
    fn equivalent_urls_collapse() {
        let a = normalize_url("https://A.com/p/?b=2&a=1&utm_medium=m#top");
        let b = normalize_url("https://a.com/p?a=1&b=2");
        assert_eq!(a, b);
    }
}

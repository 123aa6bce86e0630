//! Property tests for URL normalization.

use proptest::prelude::*;
use sentinel::explore::normalize_url;

fn url_strategy() -> impl Strategy<Value = String> {
    let scheme = prop_oneof![Just("http"), Just("https")];
    let host = "[a-z]{1,12}\\.[a-z]{2,3}";
    let path = proptest::collection::vec("[a-zA-Z0-9_-]{1,8}", 0..4);
    let query = proptest::collection::vec(("[a-z_]{1,10}", "[a-zA-Z0-9]{0,6}"), 0..4);
    let fragment = proptest::option::of("[a-zA-Z0-9]{1,8}");

    (scheme, host, path, query, fragment).prop_map(|(scheme, host, path, query, fragment)| {
        let mut url = format!("{scheme}://{host}/{}", path.join("/"));
        if !query.is_empty() {
            let pairs: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
            url.push('?');
            url.push_str(&pairs.join("&"));
        }
        if let Some(fragment) = fragment {
            url.push('#');
            url.push_str(&fragment);
        }
        url
    })
}

proptest! {
    #[test]
    fn normalization_is_idempotent_on_urls(url in url_strategy()) {
        let once = normalize_url(&url);
        let twice = normalize_url(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn normalization_is_idempotent_on_arbitrary_strings(input in ".*") {
        let once = normalize_url(&input);
        let twice = normalize_url(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn tracking_keys_are_always_stripped(host in "[a-z]{1,10}", key in "[a-z]{1,6}") {
        let url = format!("https://{host}.test/p?utm_source=a&{key}x=1&gclid=b#frag");
        let normalized = normalize_url(&url);
        prop_assert!(!normalized.contains("utm_source"));
        prop_assert!(!normalized.contains("gclid"));
        prop_assert!(!normalized.contains('#'));
        let expected_fragment = format!("{}x=1", key);
        prop_assert!(normalized.contains(&expected_fragment));
    }
}

//! Product URL validation and name derivation.
//!
//! Pure functions, no network access. Malformed input yields `false` or
//! an empty string, never an error.

/// Check that a string parses as an absolute URL with a host.
pub fn is_valid_url(input: &str) -> bool {
    match url::Url::parse(input) {
        Ok(parsed) => parsed.has_host(),
        Err(_) => false,
    }
}

/// Check that a URL points at the supported retailer (Amazon).
///
/// Matches any `amazon.` host, covering regional storefronts like
/// `amazon.co.uk` and `amazon.de`.
pub fn is_supported_retail_url(input: &str) -> bool {
    url::Url::parse(input)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.contains("amazon.")))
        .unwrap_or(false)
}

/// Best-effort human-readable product name from a URL path.
///
/// Amazon product URLs carry a slug segment like
/// `Wireless-Noise-Cancelling-Headphones`; the longest hyphenated
/// segment of at least 10 characters is taken, hyphens become spaces, and each
/// word is capitalized. Returns an empty string when no such segment
/// exists or the URL does not parse.
pub fn derive_product_name(input: &str) -> String {
    let parsed = match url::Url::parse(input) {
        Ok(u) => u,
        Err(_) => return String::new(),
    };

    let slug = parsed
        .path()
        .split('/')
        .filter(|part| part.contains('-') && part.len() >= 10)
        .max_by_key(|part| part.len());

    match slug {
        Some(part) => part
            .split('-')
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" "),
        None => String::new(),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

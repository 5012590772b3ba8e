//! Store key and composite index key derivation.

use base64::Engine;
use sha2::{Digest, Sha256};

use crate::defaults::SUBSCRIPTION_KEY_PREFIX;

/// Hostname of a site URL, or the empty string when it does not parse.
///
/// Scheme, port, and path are discarded so two URLs on the same host
/// produce the same composite key.
pub fn site_hostname(base_url: &str) -> String {
    url::Url::parse(base_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

fn combination_key(base_url: &str, discriminator: &str) -> String {
    format!(
        "{}/{}/{}",
        urlencoding::encode(SUBSCRIPTION_KEY_PREFIX),
        urlencoding::encode(&site_hostname(base_url)),
        urlencoding::encode(discriminator)
    )
}

/// Key into `ByURLSpaceKey` for a site and space.
pub fn url_space_key_combination_key(base_url: &str, space_key: &str) -> String {
    combination_key(base_url, space_key)
}

/// Key into `ByURLPageID` for a site and page.
pub fn url_page_id_combination_key(base_url: &str, page_id: &str) -> String {
    combination_key(base_url, page_id)
}

/// Store key holding the serialized registry.
pub fn subscription_key() -> String {
    key_hash(SUBSCRIPTION_KEY_PREFIX)
}

fn key_hash(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostname_drops_scheme_port_and_path() {
        assert_eq!(site_hostname("https://wiki.example.com:8443/wiki/x"), "wiki.example.com");
        assert_eq!(site_hostname("http://wiki.example.com"), "wiki.example.com");
    }

    #[test]
    fn test_hostname_of_unparseable_url_is_empty() {
        assert_eq!(site_hostname("not a url"), "");
    }

    #[test]
    fn test_space_key_format() {
        assert_eq!(
            url_space_key_combination_key("https://wiki.example.com", "ENG"),
            "confluence_subs/wiki.example.com/ENG"
        );
    }

    #[test]
    fn test_same_host_different_path_collides() {
        let a = url_page_id_combination_key("https://wiki.example.com/a", "42");
        let b = url_page_id_combination_key("http://wiki.example.com:8080/b/c", "42");
        assert_eq!(a, b);
    }

    #[test]
    fn test_discriminator_is_escaped() {
        let key = url_space_key_combination_key("https://wiki.example.com", "a/b c");
        assert_eq!(key, "confluence_subs/wiki.example.com/a%2Fb%20c");
    }

    #[test]
    fn test_subscription_key_is_stable_hash() {
        let key = subscription_key();
        assert_eq!(key, subscription_key());
        // base64 of a 32-byte digest
        assert_eq!(key.len(), 44);
        assert!(key.ends_with('='));
    }
}

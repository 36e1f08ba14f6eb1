//! Source URL resolution

use log::{debug, warn};

use crate::config::EstimatorConfig;

const FALLBACK_HOST_PATH: &str = "api.fast.com/netflix/speedtest";

/// Fallback download endpoint, scheme picked by `use_https`
pub fn default_url(use_https: bool) -> String {
    let scheme = if use_https { "https" } else { "http" };
    format!("{}://{}", scheme, FALLBACK_HOST_PATH)
}

/// Produce exactly `stream_count` source URLs from the configuration.
///
/// Configured URLs are reused round-robin when there are fewer than
/// `stream_count` of them, and the extras are dropped when there are more.
/// With no configured URLs every stream uses the fallback endpoint, so the
/// run still has `stream_count` concurrent streams rather than one.
pub fn resolve_urls(config: &EstimatorConfig) -> Vec<String> {
    let sources = if config.urls.is_empty() {
        warn!("No download sources configured");
        println!("Using fallback endpoint");
        vec![default_url(config.use_https)]
    } else {
        config.urls.clone()
    };

    let urls: Vec<String> = sources
        .iter()
        .cycle()
        .take(config.stream_count)
        .cloned()
        .collect();

    for (index, url) in urls.iter().enumerate() {
        debug!(" - stream {}: {}", index, url);
    }
    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(urls: &[&str], stream_count: usize) -> EstimatorConfig {
        EstimatorConfig {
            urls: urls.iter().map(|u| u.to_string()).collect(),
            stream_count,
            ..EstimatorConfig::default()
        }
    }

    #[test]
    fn test_default_url_scheme() {
        assert_eq!(default_url(true), "https://api.fast.com/netflix/speedtest");
        assert_eq!(default_url(false), "http://api.fast.com/netflix/speedtest");
    }

    #[test]
    fn test_fallback_when_empty() {
        let mut config = config_with(&[], 3);
        config.use_https = false;
        let urls = resolve_urls(&config);
        assert_eq!(urls.len(), 3);
        assert!(urls.iter().all(|u| u == "http://api.fast.com/netflix/speedtest"));
    }

    #[test]
    fn test_cycles_short_list() {
        let urls = resolve_urls(&config_with(&["http://a/", "http://b/"], 5));
        assert_eq!(
            urls,
            vec!["http://a/", "http://b/", "http://a/", "http://b/", "http://a/"]
        );
    }

    #[test]
    fn test_truncates_long_list() {
        let urls = resolve_urls(&config_with(&["http://a/", "http://b/", "http://c/"], 2));
        assert_eq!(urls, vec!["http://a/", "http://b/"]);
    }
}

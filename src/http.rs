use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;

use crate::config::ResolverConfig;

/// Shared HTTP client for all repository traffic. Identity encoding keeps
/// the downloaded bytes exactly what the published checksum was computed
/// over.
pub fn build_http_client(config: &ResolverConfig) -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(default_headers)
        .connect_timeout(config.connect_timeout)
        .read_timeout(config.read_timeout)
        .build()
}

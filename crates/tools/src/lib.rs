#![forbid(unsafe_code)]

pub mod bench;
pub mod lint;
pub mod report;
pub mod retention;
pub mod sql;

use anyhow::Context;
use storage::rest::{RestClient, RestConfig};

/// REST client signed with `key` for both the `apikey` header and the bearer token.
///
/// # Errors
///
/// Fails for an unparsable URL, an empty key, or an HTTP client that cannot be built.
pub fn service_client(url: &str, key: &str) -> anyhow::Result<RestClient> {
    let config = RestConfig::new(url, key).context("invalid backend configuration")?;
    RestClient::new(config).context("building HTTP client")
}

use url::Url;

use crate::config::Config;

/// Fully-resolved URLs for the authentication and zone-data services.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub authenticate: Url,
    pub links: Url,
    /// Base that relative entries of the link list are resolved against.
    pub downloads_base: Url,
}

impl Endpoints {
    pub fn new(auth_base: &str, czds_base: &str) -> Result<Self, url::ParseError> {
        let auth_base = with_trailing_slash(auth_base)?;
        let czds_base = with_trailing_slash(czds_base)?;
        Ok(Self {
            authenticate: auth_base.join("api/authenticate")?,
            links: czds_base.join("czds/downloads/links")?,
            downloads_base: czds_base,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, url::ParseError> {
        Self::new(&config.authentication_base_url, &config.czds_base_url)
    }
}

/// `Url::join` replaces the last path segment unless the base ends in `/`.
fn with_trailing_slash(base: &str) -> Result<Url, url::ParseError> {
    if base.ends_with('/') {
        Url::parse(base)
    } else {
        Url::parse(&format!("{}/", base))
    }
}

pub mod cds;
pub mod sentinel;

use crate::error::Result;

/// Copernicus Data Space OAuth2 client credentials, layered from the
/// environment (optionally a local `firegrid.toml`).
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ApiCredentials {
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("firegrid").required(false))
            .add_source(config::Environment::default())
            .build()?;

        Ok(Self {
            client_id: settings.get_string("client_id")?,
            client_secret: settings.get_string("client_secret")?,
        })
    }
}

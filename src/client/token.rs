use crate::core::catalog::TokenSource;
use crate::error::CatalogError;
use async_trait::async_trait;
use regex::Regex;

const WEB_PLAYER: &str = "https://music.apple.com";

/// Finds the web player's bundle script in its landing page.
pub fn find_index_script(html: &str) -> Option<String> {
    let re = Regex::new(r#"/assets/index(?:-legacy)?[~-][^/"']+\.js"#).ok()?;
    re.find(html).map(|m| m.as_str().to_string())
}

/// Pulls the embedded developer JWT out of the bundle script.
pub fn find_token(js: &str) -> Option<String> {
    let re = Regex::new(r#"eyJh[^"]*"#).ok()?;
    re.find(js).map(|m| m.as_str().to_string())
}

/// Scrapes an anonymous bearer token from the public web player.
pub struct WebPlayerToken {
    client: reqwest::Client,
    base: String,
}

impl WebPlayerToken {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base(client, WEB_PLAYER)
    }

    pub fn with_base(client: reqwest::Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into(),
        }
    }

    async fn fetch_text(&self, url: &str) -> Result<String, CatalogError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl TokenSource for WebPlayerToken {
    async fn token(&self) -> Result<String, CatalogError> {
        let html = self.fetch_text(&self.base).await?;
        let script = find_index_script(&html)
            .ok_or_else(|| CatalogError::Token("index script not found in web player page".to_string()))?;
        tracing::debug!(script = %script, "found web player bundle");

        let js = self.fetch_text(&format!("{}{}", self.base, script)).await?;
        find_token(&js).ok_or_else(|| CatalogError::Token("no token in web player bundle".to_string()))
    }
}

/// A scraped token, falling back to the one configured by the user.
pub struct FallbackToken<T> {
    primary: T,
    fallback: Option<String>,
}

impl<T: TokenSource> FallbackToken<T> {
    pub fn new(primary: T, fallback: Option<String>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl<T: TokenSource> TokenSource for FallbackToken<T> {
    async fn token(&self) -> Result<String, CatalogError> {
        match self.primary.token().await {
            Ok(token) => Ok(token),
            Err(e) => match &self.fallback {
                Some(token) => {
                    tracing::warn!(error = %e, "token scrape failed, using configured authorization-token");
                    Ok(token.clone())
                }
                None => Err(e),
            },
        }
    }
}

//! WordPress REST API client

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde_json::Value;

use super::{BlogApi, http_client};
use crate::config::Config;
use crate::error::{ApiError, ConfigError, Result};

const SITE_USER_AGENT: &str = "365-Evergreen-Static-Site/1.0";

pub struct WordPressClient {
    http: HttpClient,
    site_url: String,
}

impl WordPressClient {
    pub fn new(http: HttpClient, site_url: &str) -> Self {
        Self {
            http,
            site_url: site_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let site_url = config
            .wordpress_url
            .as_deref()
            .ok_or(ConfigError::Missing("WORDPRESS_SITE_URL"))?;
        Ok(Self::new(http_client()?, site_url))
    }

    fn endpoint_url(&self, endpoint: &str, query: Option<&str>) -> String {
        let mut url = format!("{}/wp-json/wp/v2/{}", self.site_url, endpoint);
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }
        url
    }
}

#[async_trait]
impl BlogApi for WordPressClient {
    async fn fetch(&self, endpoint: &str, query: Option<&str>) -> Result<Value> {
        let url = self.endpoint_url(endpoint, query);
        log::info!("Fetching from WordPress: {}", url);

        let response = self
            .http
            .get(&url)
            .header(USER_AGENT, SITE_USER_AGENT)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(ApiError::from)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::ServerError {
                status: status.as_u16(),
                message: format!("WordPress API responded with status: {}", status.as_u16()),
            }
            .into());
        }

        let body = response.json::<Value>().await.map_err(|e| {
            ApiError::InvalidResponse(format!("WordPress returned invalid JSON: {}", e))
        })?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[test]
    fn test_endpoint_url() {
        let client = WordPressClient::new(HttpClient::new(), "https://blog.example.com/");
        assert_eq!(
            client.endpoint_url("posts", Some("per_page=3&_embed")),
            "https://blog.example.com/wp-json/wp/v2/posts?per_page=3&_embed"
        );
        assert_eq!(
            client.endpoint_url("categories", Some("")),
            "https://blog.example.com/wp-json/wp/v2/categories"
        );
    }

    #[tokio::test]
    async fn test_fetch_passes_query_and_user_agent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/wp-json/wp/v2/posts")
            .match_header("user-agent", SITE_USER_AGENT)
            .match_query(Matcher::UrlEncoded("per_page".into(), "3".into()))
            .with_status(200)
            .with_body(r#"[{"id":1,"title":{"rendered":"Hello"}}]"#)
            .create_async()
            .await;

        let client = WordPressClient::new(HttpClient::new(), &server.url());
        let posts = client.fetch("posts", Some("per_page=3")).await.unwrap();

        assert_eq!(posts[0]["title"]["rendered"], "Hello");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upstream_failure_keeps_status() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/wp-json/wp/v2/pages")
            .with_status(502)
            .create_async()
            .await;

        let client = WordPressClient::new(HttpClient::new(), &server.url());
        let err = client.fetch("pages", None).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Server error (502): WordPress API responded with status: 502"
        );
    }
}

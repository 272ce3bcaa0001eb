//! sitemap 下载

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::SitemapError;

/// "GET URL，带超时，返回原始字节或失败"
#[async_trait]
pub trait SitemapFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, SitemapError>;
}

/// 基于 reqwest 的实现
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SitemapFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, SitemapError> {
        debug!(url, "GET sitemap");
        let fetch_err = |source| SitemapError::Fetch {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(fetch_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SitemapError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(fetch_err)?;
        Ok(body.to_vec())
    }
}

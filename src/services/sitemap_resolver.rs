//! sitemap 解析服务 - 业务能力层
//!
//! 下载 sitemap，展开 sitemapindex，输出扁平有序的 URL 记录。
//! 单个 sitemap 的下载或解析失败只记录错误并返回空结果，不影响其他 sitemap。

use std::collections::HashSet;

use futures::future::BoxFuture;
use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader;
use tracing::{error, info, warn};
use url::Url;

use crate::error::SitemapError;
use crate::infrastructure::SitemapFetcher;
use crate::models::UrlRecord;

/// `<urlset><url>` 中的一条原始记录
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RawUrlEntry {
    pub loc: Option<String>,
    pub lastmod: Option<String>,
    pub priority: Option<String>,
}

/// 一个 sitemap 文档的结构：`urlset` 条目与 `sitemapindex` 嵌套地址，两者可以同时存在
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SitemapDocument {
    pub urls: Vec<RawUrlEntry>,
    pub sitemaps: Vec<String>,
}

const URL_ENTRY: &[&str] = &["urlset", "url"];
const URL_LOC: &[&str] = &["urlset", "url", "loc"];
const URL_LASTMOD: &[&str] = &["urlset", "url", "lastmod"];
const URL_PRIORITY: &[&str] = &["urlset", "url", "priority"];
const SITEMAP_ENTRY: &[&str] = &["sitemapindex", "sitemap"];
const SITEMAP_LOC: &[&str] = &["sitemapindex", "sitemap", "loc"];

/// 解析 sitemap 文档；其他结构的文档得到空结果
pub fn parse_sitemap(xml: &[u8]) -> Result<SitemapDocument, quick_xml::Error> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut document = SitemapDocument::default();
    let mut entry = RawUrlEntry::default();
    let mut nested_loc = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            XmlEvent::Start(e) => {
                path.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                if at(&path, URL_ENTRY) {
                    entry = RawUrlEntry::default();
                } else if at(&path, SITEMAP_ENTRY) {
                    nested_loc.clear();
                }
            }
            XmlEvent::End(_) => {
                if at(&path, URL_ENTRY) {
                    document.urls.push(std::mem::take(&mut entry));
                } else if at(&path, SITEMAP_ENTRY) && !nested_loc.trim().is_empty() {
                    document.sitemaps.push(nested_loc.trim().to_string());
                }
                path.pop();
            }
            XmlEvent::Text(t) => {
                let text = t.unescape()?;
                push_text(&path, &text, &mut entry, &mut nested_loc);
            }
            XmlEvent::CData(c) => {
                let raw = c.into_inner();
                let text = String::from_utf8_lossy(&raw);
                push_text(&path, &text, &mut entry, &mut nested_loc);
            }
            XmlEvent::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(document)
}

fn push_text(path: &[String], text: &str, entry: &mut RawUrlEntry, nested_loc: &mut String) {
    let slot = if at(path, URL_LOC) {
        entry.loc.get_or_insert_with(String::new)
    } else if at(path, URL_LASTMOD) {
        entry.lastmod.get_or_insert_with(String::new)
    } else if at(path, URL_PRIORITY) {
        entry.priority.get_or_insert_with(String::new)
    } else if at(path, SITEMAP_LOC) {
        nested_loc
    } else {
        return;
    };
    slot.push_str(text);
}

fn at(path: &[String], expected: &[&str]) -> bool {
    path.len() == expected.len() && path.iter().zip(expected).all(|(a, b)| a == b)
}

/// sitemap 解析服务
pub struct SitemapResolver<F> {
    fetcher: F,
    exclude_patterns: Vec<String>,
}

impl<F: SitemapFetcher> SitemapResolver<F> {
    pub fn new(fetcher: F, exclude_patterns: Vec<String>) -> Self {
        Self {
            fetcher,
            exclude_patterns,
        }
    }

    /// 解析 sitemap 并递归展开
    ///
    /// # 参数
    /// - `sitemap_url`: sitemap 或 sitemapindex 的地址
    ///
    /// # 返回
    /// 按文档顺序拼接的 URL 记录（已排除）。下载或解析失败的节点贡献空结果，整体从不失败
    pub async fn resolve(&self, sitemap_url: &str) -> Vec<UrlRecord> {
        let mut visited = HashSet::new();
        self.resolve_node(sitemap_url.to_string(), &mut visited).await
    }

    /// 是否命中排除规则
    pub fn is_excluded(&self, url: &str) -> bool {
        self.exclude_patterns.iter().any(|p| url.contains(p.as_str()))
    }

    fn resolve_node<'a>(
        &'a self,
        sitemap_url: String,
        visited: &'a mut HashSet<String>,
    ) -> BoxFuture<'a, Vec<UrlRecord>> {
        Box::pin(async move {
            // 同一次 resolve 中重复出现的 sitemap 直接跳过，防止循环引用
            if !visited.insert(sitemap_url.clone()) {
                warn!("sitemap 已处理过，跳过: {}", sitemap_url);
                return Vec::new();
            }

            info!("提取 sitemap 中的 URL: {}", sitemap_url);
            let document = match self.load(&sitemap_url).await {
                Ok(document) => document,
                Err(e) => {
                    error!("提取 sitemap {} 失败 - {}", sitemap_url, e);
                    return Vec::new();
                }
            };

            let mut records: Vec<UrlRecord> = document
                .urls
                .into_iter()
                .filter_map(|entry| self.to_record(entry))
                .collect();

            for nested in document.sitemaps {
                let nested_records = self.resolve_node(nested, visited).await;
                records.extend(nested_records);
            }

            info!("从 {} 提取到 {} 个 URL", sitemap_url, records.len());
            records
        })
    }

    async fn load(&self, sitemap_url: &str) -> Result<SitemapDocument, SitemapError> {
        let body = self.fetcher.fetch(sitemap_url).await?;
        parse_sitemap(&body).map_err(|source| SitemapError::Parse {
            url: sitemap_url.to_string(),
            source,
        })
    }

    fn to_record(&self, entry: RawUrlEntry) -> Option<UrlRecord> {
        let loc = entry.loc?.trim().to_string();
        let parsed = Url::parse(&loc).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") || self.is_excluded(&loc) {
            return None;
        }

        let record = UrlRecord::new(loc)
            .with_priority(UrlRecord::parse_priority(entry.priority.as_deref()));
        match entry.lastmod.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(lastmod) => Some(record.with_last_modified(lastmod)),
            None => Some(record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_urlset() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
            <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
              <url><loc>https://example.test/</loc><priority>1.0</priority></url>
              <url>
                <loc>https://example.test/catalog/?a=1&amp;b=2</loc>
                <lastmod>2024-05-01</lastmod>
              </url>
            </urlset>"#;

        let doc = parse_sitemap(xml).unwrap();
        assert_eq!(doc.urls.len(), 2);
        assert!(doc.sitemaps.is_empty());
        assert_eq!(doc.urls[0].priority.as_deref(), Some("1.0"));
        assert_eq!(
            doc.urls[1].loc.as_deref(),
            Some("https://example.test/catalog/?a=1&b=2")
        );
        assert_eq!(doc.urls[1].lastmod.as_deref(), Some("2024-05-01"));
    }

    #[test]
    fn test_parse_sitemapindex_with_prefix_and_cdata() {
        let xml = br#"<sm:sitemapindex xmlns:sm="http://www.sitemaps.org/schemas/sitemap/0.9">
              <sm:sitemap><sm:loc>https://example.test/a.xml</sm:loc></sm:sitemap>
              <sm:sitemap><sm:loc><![CDATA[https://example.test/b.xml]]></sm:loc></sm:sitemap>
            </sm:sitemapindex>"#;

        let doc = parse_sitemap(xml).unwrap();
        assert!(doc.urls.is_empty());
        assert_eq!(
            doc.sitemaps,
            vec!["https://example.test/a.xml", "https://example.test/b.xml"]
        );
    }

    #[test]
    fn test_parse_unknown_shape_is_empty() {
        let doc = parse_sitemap(b"<html><body><loc>https://x.test/</loc></body></html>").unwrap();
        assert_eq!(doc, SitemapDocument::default());
    }

    #[test]
    fn test_parse_mismatched_tags_fails() {
        assert!(parse_sitemap(b"<urlset><url><loc>x</url></urlset>").is_err());
    }
}

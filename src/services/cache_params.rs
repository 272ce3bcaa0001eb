//! 预热 URL 构造

use url::Url;

use crate::config::QueryParam;

/// 在 URL 上设置缓存参数
///
/// 同名参数只保留一个（第一次出现的位置），值为配置值；不存在时追加到末尾。
/// 对同一参数重复调用结果不变。
///
/// # 参数
/// - `url`: 原始 URL
/// - `params`: 要设置的查询参数
///
/// # 返回
/// 返回预热 URL；`url` 不是绝对 URL 时返回解析错误
pub fn add_cache_params(url: &str, params: &[QueryParam]) -> Result<String, url::ParseError> {
    let mut parsed = Url::parse(url)?;
    if params.is_empty() {
        return Ok(parsed.into());
    }

    let mut pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
    for param in params {
        let mut seen = false;
        pairs.retain_mut(|(name, value)| {
            if *name != param.name {
                return true;
            }
            if seen {
                return false;
            }
            seen = true;
            *value = param.value.clone();
            true
        });
        if !seen {
            pairs.push((param.name.clone(), param.value.clone()));
        }
    }

    parsed
        .query_pairs_mut()
        .clear()
        .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    Ok(parsed.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clear_cache(value: &str) -> Vec<QueryParam> {
        vec![QueryParam::new("clear_cache", value)]
    }

    #[test]
    fn test_appends_param() {
        let url = add_cache_params("https://s.test/catalog/", &clear_cache("Y")).unwrap();
        assert_eq!(url, "https://s.test/catalog/?clear_cache=Y");
    }

    #[test]
    fn test_keeps_existing_query() {
        let url = add_cache_params("https://s.test/?page=2", &clear_cache("Y")).unwrap();
        assert_eq!(url, "https://s.test/?page=2&clear_cache=Y");
    }

    #[test]
    fn test_idempotent_with_latest_value() {
        let once = add_cache_params("https://s.test/a", &clear_cache("Y")).unwrap();
        let twice = add_cache_params(&once, &clear_cache("N")).unwrap();
        assert_eq!(twice, "https://s.test/a?clear_cache=N");
        assert_eq!(twice.matches("clear_cache").count(), 1);
    }

    #[test]
    fn test_collapses_duplicates() {
        let url = add_cache_params("https://s.test/?clear_cache=1&x=2&clear_cache=3", &clear_cache("Y")).unwrap();
        assert_eq!(url, "https://s.test/?clear_cache=Y&x=2");
    }

    #[test]
    fn test_invalid_url() {
        assert!(add_cache_params("/relative", &clear_cache("Y")).is_err());
    }
}

//! JS 执行器 - 基础设施层
//!
//! 持有 page 资源，只暴露"在页面上下文中求值"的能力

use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::SessionError;

/// JS 执行器
///
/// 不认识 URL 记录或统计，只负责求值
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（用于导航等其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 交还 page（用于关闭）
    pub fn into_page(self) -> Page {
        self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue, SessionError> {
        let result = self
            .page
            .evaluate(js_code.into())
            .await
            .map_err(|e| SessionError::Probe(e.to_string()))?;
        result
            .into_value()
            .map_err(|e| SessionError::Probe(e.to_string()))
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T, SessionError> {
        let json_value = self.eval(js_code).await?;
        serde_json::from_value(json_value).map_err(|e| SessionError::Probe(e.to_string()))
    }

    /// 执行布尔探针，页面内抛出的异常按 false 处理
    pub async fn probe(&self, expression: &str) -> Result<bool, SessionError> {
        self.eval_as::<bool>(wrap_probe(expression)).await
    }
}

/// 把表达式包进 try/catch，并强制转换为布尔值
pub(crate) fn wrap_probe(expression: &str) -> String {
    format!(
        "(() => {{ try {{ return Boolean({}); }} catch (e) {{ return false; }} }})()",
        expression
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_probe() {
        let js = wrap_probe("window.BX !== undefined");
        assert!(js.starts_with("(() => { try { return Boolean(window.BX !== undefined);"));
        assert!(js.ends_with("})()"));
    }
}

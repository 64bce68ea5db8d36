use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::app::config::AuditConfig;
use crate::core::models::AuditRecord;

/// 审计记录存储，只写不读
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn insert(&self, record: &AuditRecord) -> Result<()>;
}

/// 未配置审计存储时只打日志
pub struct DisabledAudit;

#[async_trait]
impl AuditStore for DisabledAudit {
    async fn insert(&self, record: &AuditRecord) -> Result<()> {
        info!("审计存储未配置，跳过记录: {} {}", record.email, record.status);
        Ok(())
    }
}

/// PostgREST 风格的 REST 表接口：POST {endpoint}/rest/v1/{table}
pub struct RestAuditStore {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    table: String,
}

impl RestAuditStore {
    pub fn new(client: reqwest::Client, endpoint: &str, api_key: &str, table: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            table: table.to_string(),
        }
    }

    pub fn from_config(config: &AuditConfig) -> Option<Self> {
        let endpoint = config.endpoint.as_deref()?;
        let api_key = config.api_key.as_deref()?;
        Some(Self::new(reqwest::Client::new(), endpoint, api_key, &config.table))
    }
}

#[async_trait]
impl AuditStore for RestAuditStore {
    async fn insert(&self, record: &AuditRecord) -> Result<()> {
        let url = format!("{}/rest/v1/{}", self.endpoint, self.table);
        debug!("写入审计记录: {}", url);

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=minimal")
            .json(&[record])
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(anyhow!("审计记录写入失败 {}: {}", status, text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record() -> AuditRecord {
        AuditRecord {
            email: "jane@example.com".to_string(),
            url: "https://jane.design".to_string(),
            status: "pending".to_string(),
            screenshot_url: Some("https://cdn/x.png".to_string()),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_posts_row() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/reviews"))
            .and(header("apikey", "service-key"))
            .and(header("authorization", "Bearer service-key"))
            .and(body_partial_json(serde_json::json!([{
                "email": "jane@example.com",
                "status": "pending",
                "screenshot_url": "https://cdn/x.png"
            }])))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let store = RestAuditStore::new(reqwest::Client::new(), &server.uri(), "service-key", "reviews");
        store.insert(&record()).await.expect("写入应成功");
    }

    #[tokio::test]
    async fn test_insert_surfaces_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let store = RestAuditStore::new(reqwest::Client::new(), &server.uri(), "k", "reviews");
        assert!(store.insert(&record()).await.is_err());
    }

    #[test]
    fn test_from_config_needs_endpoint_and_key() {
        let mut config = AuditConfig::default();
        assert!(RestAuditStore::from_config(&config).is_none());
        config.endpoint = Some("https://db.example.com/".to_string());
        config.api_key = Some("k".to_string());
        let store = RestAuditStore::from_config(&config).unwrap();
        assert_eq!(store.endpoint, "https://db.example.com");
    }
}

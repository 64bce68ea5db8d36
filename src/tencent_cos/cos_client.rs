use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha1::{Digest, Sha1};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, error};

use crate::app::config::StorageConfig;
use crate::storage::ObjectStore;

type HmacSha1 = Hmac<Sha1>;

/// Config类, 保存用户相关信息
#[derive(Debug, Clone)]
pub struct CosConfig {
    pub secret_id: String,
    pub secret_key: String,
    pub token: Option<String>,
    pub region: Option<String>,
    pub bucket: String,
    pub scheme: String,
    pub endpoint: Option<String>,
    pub public_base_url: Option<String>,
}

impl CosConfig {
    pub fn from_storage(storage: &StorageConfig) -> Result<Self> {
        let secret_id = storage.secret_id.clone().ok_or_else(|| anyhow!("SecretId is required"))?;
        let secret_key = storage.secret_key.clone().ok_or_else(|| anyhow!("SecretKey is required"))?;
        let bucket = storage.bucket.clone().ok_or_else(|| anyhow!("Bucket is required"))?;
        if storage.region.is_none() && storage.endpoint.is_none() {
            return Err(anyhow!("Region or endpoint is required"));
        }
        Ok(Self {
            secret_id,
            secret_key,
            token: None,
            region: storage.region.clone(),
            bucket,
            scheme: storage.scheme.clone().unwrap_or_else(|| "https".to_string()),
            endpoint: storage.endpoint.clone(),
            public_base_url: storage.public_base_url.clone(),
        })
    }

    /// 返回 (scheme, host)；endpoint 可以带协议前缀
    fn scheme_and_host(&self) -> Result<(String, String)> {
        if let Some(endpoint) = &self.endpoint {
            let endpoint = endpoint.trim_end_matches('/');
            if let Some(host) = endpoint.strip_prefix("http://") {
                return Ok(("http".to_string(), host.to_string()));
            }
            if let Some(host) = endpoint.strip_prefix("https://") {
                return Ok(("https".to_string(), host.to_string()));
            }
            return Ok((self.scheme.clone(), endpoint.to_string()));
        }
        let region = self.region.as_deref().ok_or_else(|| anyhow!("Region is required"))?;
        Ok((
            self.scheme.clone(),
            format!("{}.cos.{}.myqcloud.com", self.bucket, region),
        ))
    }
}

static BUILT_IN_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// cos客户端类, 封装相应请求
pub struct CosS3Client {
    pub conf: CosConfig,
    pub client: reqwest::Client,
}

impl CosS3Client {
    pub fn new(conf: CosConfig, client: Option<reqwest::Client>) -> Self {
        let client = client.unwrap_or_else(|| {
            BUILT_IN_CLIENT
                .get_or_init(|| {
                    reqwest::Client::builder()
                        .timeout(std::time::Duration::from_secs(30))
                        .build()
                        .unwrap_or_default()
                })
                .clone()
        });
        Self { conf, client }
    }

    /// 生成 q-sign 签名授权头
    fn authorization(&self, method: &str, path: &str, host: &str, now: DateTime<Utc>) -> Result<String> {
        let expired = now + Duration::hours(1);
        let key_time = format!("{};{}", now.timestamp(), expired.timestamp());

        // 1. SignKey
        let mut mac = HmacSha1::new_from_slice(self.conf.secret_key.as_bytes()).map_err(|e| anyhow!("{}", e))?;
        mac.update(key_time.as_bytes());
        let sign_key = hex::encode(mac.finalize().into_bytes());

        // 2. HttpString
        let http_string = format!("{}\n{}\n\nhost={}\n", method.to_lowercase(), path, host);
        let sha1_http = hex::encode(Sha1::digest(http_string.as_bytes()));

        // 3. StringToSign
        let string_to_sign = format!("sha1\n{}\n{}\n", key_time, sha1_http);

        // 4. Signature
        let mut mac = HmacSha1::new_from_slice(sign_key.as_bytes()).map_err(|e| anyhow!("{}", e))?;
        mac.update(string_to_sign.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(format!(
            "q-sign-algorithm=sha1&q-ak={}&q-sign-time={}&q-key-time={}&q-header-list=host&q-url-param-list=&q-signature={}",
            self.conf.secret_id, key_time, key_time, signature
        ))
    }

    pub async fn put_object(&self, local_file_path: &Path, key: &str, content_type: &str) -> Result<()> {
        let file_content = tokio::fs::read(local_file_path).await?;
        let (scheme, host) = self.conf.scheme_and_host()?;
        let path = format!("/{}", key);
        let url = format!("{}://{}{}", scheme, host, path);
        let auth = self.authorization("PUT", &path, &host, Utc::now())?;

        debug!("开始上传文件到 COS，bucket: {}, key: {}", self.conf.bucket, key);
        let mut request = self
            .client
            .put(&url)
            .header("Host", &host)
            .header("Authorization", auth)
            .header("Content-Type", content_type);

        if let Some(token) = &self.conf.token {
            request = request.header("x-cos-security-token", token);
        }

        let response = request.body(file_content).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!("文件上传到 COS 失败: {} {}", status, text);
            Err(anyhow!("Upload failed with status {}: {}", status, text))
        }
    }
}

#[async_trait]
impl ObjectStore for CosS3Client {
    async fn upload_file(&self, local_path: &Path, key: &str, content_type: &str) -> Result<()> {
        self.put_object(local_path, key, content_type).await
    }

    fn public_url(&self, key: &str) -> String {
        let encoded = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        match &self.conf.public_base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), encoded),
            None => match self.conf.scheme_and_host() {
                Ok((scheme, host)) => format!("{}://{}/{}", scheme, host, encoded),
                Err(_) => encoded,
            },
        }
    }
}

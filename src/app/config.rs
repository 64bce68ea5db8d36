use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::models::{Priority, Recommendation, Subscores};

/// 配置结构版本，配置文件格式变化时递增
pub const CONFIG_VERSION: u32 = 1;

/// 整个服务唯一的配置对象，启动时加载后以只读方式注入各组件
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub browser: BrowserSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// 同时打开的浏览器会话上限
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    #[serde(default = "default_queue_timeout_ms")]
    pub queue_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Timeouts {
    #[serde(default = "default_request_deadline_ms")]
    pub request_deadline_ms: u64,
    #[serde(default = "default_load_budget_ms")]
    pub load_budget_ms: u64,
    #[serde(default = "default_case_study_load_ms")]
    pub case_study_load_ms: u64,
    #[serde(default = "default_score_timeout_ms")]
    pub score_timeout_ms: u64,
}

impl Timeouts {
    pub fn request_deadline(&self) -> Duration {
        Duration::from_millis(self.request_deadline_ms)
    }

    pub fn load_budget(&self) -> Duration {
        Duration::from_millis(self.load_budget_ms)
    }

    pub fn case_study_load(&self) -> Duration {
        Duration::from_millis(self.case_study_load_ms)
    }

    pub fn score_timeout(&self) -> Duration {
        Duration::from_millis(self.score_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
    #[serde(default = "default_max_case_studies")]
    pub max_case_studies: usize,
    #[serde(default = "default_keywords")]
    pub case_study_keywords: Vec<String>,
    #[serde(default = "default_true")]
    pub require_link_text: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScoringConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u64,
    #[serde(default = "default_system_message")]
    pub system_message: String,
    #[serde(default = "default_prompt_template")]
    pub prompt_template: String,
    #[serde(default)]
    pub defaults: DefaultScores,
}

/// 评分失败或字段缺失时使用的固定默认值
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DefaultScores {
    #[serde(default = "default_overall")]
    pub overall_score: u8,
    #[serde(default = "default_subscores")]
    pub subscores: Subscores,
    #[serde(default = "default_summary")]
    pub summary: String,
    #[serde(default = "default_strengths")]
    pub strengths: Vec<String>,
    #[serde(default = "default_weaknesses")]
    pub weaknesses: Vec<String>,
    #[serde(default = "default_recommendations")]
    pub recommendations: Vec<Recommendation>,
    #[serde(default = "default_section_review")]
    pub section_review: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub secret_id: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub bucket: Option<String>,
    /// 覆盖默认的 `{bucket}.cos.{region}.myqcloud.com`
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub scheme: Option<String>,
    /// CDN 域名或其它公开访问前缀
    #[serde(default)]
    pub public_base_url: Option<String>,
    #[serde(default)]
    pub key_prefix: Option<String>,
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl StorageConfig {
    pub fn is_configured(&self) -> bool {
        self.secret_id.is_some() && self.secret_key.is_some() && self.bucket.is_some()
            && (self.region.is_some() || self.endpoint.is_some())
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("portfolio_review"))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuditConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_audit_table")]
    pub table: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserSettings {
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub block_heavy_resources: bool,
}

impl AppConfig {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = config_path.unwrap_or_else(|| Path::new("config.toml"));
        if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
            let cfg: AppConfig = toml::from_str(&raw)
                .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
            return Ok(cfg);
        }
        Ok(AppConfig::default())
    }

    /// 读取配置文件后再用环境变量覆盖（密钥只从环境变量来）
    pub fn from_env() -> Result<Self> {
        let path = std::env::var("CONFIG_PATH").ok().map(PathBuf::from);
        let mut cfg = Self::load(path.as_deref())?;
        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("PORT") {
            self.server.port = v.parse().with_context(|| format!("PORT 不是合法端口: {}", v))?;
        }
        if let Some(v) = get("MAX_SESSIONS") {
            self.server.max_sessions = v
                .parse()
                .with_context(|| format!("MAX_SESSIONS 不是合法数字: {}", v))?;
        }
        if let Some(v) = get("REQUEST_DEADLINE_MS") {
            self.timeouts.request_deadline_ms = v
                .parse()
                .with_context(|| format!("REQUEST_DEADLINE_MS 不是合法数字: {}", v))?;
        }
        if let Some(v) = get("CHROME_PATH") {
            self.browser.chrome_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("LLM_API_KEY") {
            self.scoring.api_key = Some(v);
        }
        if let Some(v) = get("LLM_BASE_URL") {
            self.scoring.base_url = v;
        }
        if let Some(v) = get("LLM_MODEL") {
            self.scoring.model = v;
        }
        if let Some(v) = get("COS_SECRET_ID") {
            self.storage.secret_id = Some(v);
        }
        if let Some(v) = get("COS_SECRET_KEY") {
            self.storage.secret_key = Some(v);
        }
        if let Some(v) = get("COS_REGION") {
            self.storage.region = Some(v);
        }
        if let Some(v) = get("COS_BUCKET") {
            self.storage.bucket = Some(v);
        }
        if let Some(v) = get("COS_ENDPOINT") {
            self.storage.endpoint = Some(v);
        }
        if let Some(v) = get("COS_PUBLIC_BASE_URL") {
            self.storage.public_base_url = Some(v);
        }
        if let Some(v) = get("AUDIT_STORE_URL") {
            self.audit.endpoint = Some(v);
        }
        if let Some(v) = get("AUDIT_STORE_KEY") {
            self.audit.api_key = Some(v);
        }
        if let Some(v) = get("AUDIT_TABLE") {
            self.audit.table = v;
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            server: ServerConfig::default(),
            timeouts: Timeouts::default(),
            extraction: ExtractionConfig::default(),
            scoring: ScoringConfig::default(),
            storage: StorageConfig::default(),
            audit: AuditConfig::default(),
            browser: BrowserSettings::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            max_sessions: default_max_sessions(),
            queue_timeout_ms: default_queue_timeout_ms(),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            request_deadline_ms: default_request_deadline_ms(),
            load_budget_ms: default_load_budget_ms(),
            case_study_load_ms: default_case_study_load_ms(),
            score_timeout_ms: default_score_timeout_ms(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_text_chars: default_max_text_chars(),
            max_prompt_chars: default_max_prompt_chars(),
            max_case_studies: default_max_case_studies(),
            case_study_keywords: default_keywords(),
            require_link_text: true,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            system_message: default_system_message(),
            prompt_template: default_prompt_template(),
            defaults: DefaultScores::default(),
        }
    }
}

impl Default for DefaultScores {
    fn default() -> Self {
        Self {
            overall_score: default_overall(),
            subscores: default_subscores(),
            summary: default_summary(),
            strengths: default_strengths(),
            weaknesses: default_weaknesses(),
            recommendations: default_recommendations(),
            section_review: default_section_review(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            table: default_audit_table(),
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            chrome_path: None,
            user_agent: default_user_agent(),
            block_heavy_resources: false,
        }
    }
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_port() -> u16 {
    3000
}

fn default_max_sessions() -> usize {
    4
}

fn default_queue_timeout_ms() -> u64 {
    2_000
}

fn default_request_deadline_ms() -> u64 {
    55_000
}

fn default_load_budget_ms() -> u64 {
    20_000
}

fn default_case_study_load_ms() -> u64 {
    10_000
}

fn default_score_timeout_ms() -> u64 {
    12_000
}

fn default_max_text_chars() -> usize {
    8_000
}

fn default_max_prompt_chars() -> usize {
    6_000
}

fn default_max_case_studies() -> usize {
    3
}

fn default_keywords() -> Vec<String> {
    ["case", "work", "project", "portfolio"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1/".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u64 {
    2_000
}

fn default_system_message() -> String {
    "You are a senior product design hiring manager reviewing UX portfolios. \
     Respond with a single JSON object and nothing else."
        .to_string()
}

fn default_prompt_template() -> String {
    r#"Review the UX/product design portfolio at {url}.

Homepage content:
{content}

Case studies:
{case_studies}

Return JSON with this shape:
{
  "overallScore": 0-100,
  "subscores": {"uxThinking": 0-100, "clarity": 0-100, "storytelling": 0-100, "professionalism": 0-100},
  "summary": "two or three sentences",
  "strengths": ["..."],
  "weaknesses": ["..."],
  "interviewReadiness": "Ready for interviews" | "Almost ready" | "Needs more work" | "Significant improvements needed",
  "standoutFeature": "..." or null,
  "recommendations": [{"priority": "high" | "medium" | "low", "category": "...", "text": "..."}],
  "caseStudies": [{
    "score": 0-100,
    "summary": "...",
    "strengths": ["..."],
    "recommendations": [{"priority": "...", "category": "...", "text": "..."}],
    "sections": [{"type": "...", "name": "...", "aiReview": "...", "score": 0-100, "suggestions": ["..."]}]
  }]
}
List caseStudies in the same order as given above."#
        .to_string()
}

fn default_overall() -> u8 {
    72
}

fn default_subscores() -> Subscores {
    Subscores {
        ux_thinking: 70,
        clarity: 74,
        storytelling: 68,
        professionalism: 76,
    }
}

fn default_summary() -> String {
    "Automated review was not available for this portfolio, so baseline scores are shown. \
     The structure suggests a working portfolio that would benefit from clearer case-study narratives."
        .to_string()
}

fn default_strengths() -> Vec<String> {
    vec![
        "Portfolio is publicly reachable and presents work samples".to_string(),
        "Visual presentation appears consistent".to_string(),
    ]
}

fn default_weaknesses() -> Vec<String> {
    vec![
        "Design process and decision-making are hard to follow".to_string(),
        "Outcomes and measurable impact are not clearly stated".to_string(),
    ]
}

fn default_recommendations() -> Vec<Recommendation> {
    vec![
        Recommendation {
            priority: Priority::High,
            category: "Storytelling".to_string(),
            text: "Frame each case study around the problem, your role, the process and the outcome."
                .to_string(),
        },
        Recommendation {
            priority: Priority::Medium,
            category: "Impact".to_string(),
            text: "Quantify results with metrics or qualitative evidence from users.".to_string(),
        },
        Recommendation {
            priority: Priority::Low,
            category: "Clarity".to_string(),
            text: "Lead with a short summary so reviewers can scan the project in seconds."
                .to_string(),
        },
    ]
}

fn default_section_review() -> String {
    "Automated section review unavailable.".to_string()
}

fn default_audit_table() -> String {
    "reviews".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

pub mod draft;
pub mod payload;
pub mod prompt;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

use crate::app::config::ScoringConfig;
use crate::ask_llm::{LlmConfig, ask_llm_with_config};

pub use draft::{CaseStudyDraft, ScoreDraft, SubscoreDraft};
pub use payload::extract_json_payload;
pub use prompt::{CaseStudyBrief, ScoringInput, render_prompt};

/// 评分接口；任何失败都以 None 表示，由组装阶段套用默认值
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, input: &ScoringInput) -> Option<ScoreDraft>;
}

/// 解析模型的原始回复
pub fn parse_score_response(raw: &str) -> Result<ScoreDraft> {
    let value = extract_json_payload(raw)?;
    Ok(ScoreDraft::from_value(&value))
}

/// 通过 OpenAI 兼容接口评分，单次尝试，不重试
pub struct LlmScorer {
    config: ScoringConfig,
    timeout: Duration,
    max_prompt_chars: usize,
}

impl LlmScorer {
    pub fn new(config: ScoringConfig, timeout: Duration, max_prompt_chars: usize) -> Self {
        Self {
            config,
            timeout,
            max_prompt_chars,
        }
    }

    fn llm_config(&self, api_key: String) -> LlmConfig {
        LlmConfig {
            api_key,
            api_base_url: self.config.base_url.clone(),
            model_name: self.config.model.clone(),
            system_message: Some(self.config.system_message.clone()),
            temperature: Some(self.config.temperature),
            max_tokens: Some(self.config.max_tokens),
        }
    }
}

#[async_trait]
impl Scorer for LlmScorer {
    async fn score(&self, input: &ScoringInput) -> Option<ScoreDraft> {
        let Some(api_key) = self.config.api_key.clone() else {
            warn!("⚠️ 未配置 LLM_API_KEY，跳过评分，使用默认分数");
            return None;
        };

        let prompt = render_prompt(&self.config.prompt_template, input, self.max_prompt_chars);
        let llm = self.llm_config(api_key);

        let raw = match tokio::time::timeout(self.timeout, ask_llm_with_config(&prompt, &llm)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!("❌ 评分请求失败: {}", e);
                return None;
            }
            Err(_) => {
                warn!("⏱️ 评分请求超时 ({}ms)，使用默认分数", self.timeout.as_millis());
                return None;
            }
        };

        match parse_score_response(&raw) {
            Ok(draft) if draft.is_empty() => {
                warn!("⚠️ 模型回复中没有可用字段，使用默认分数");
                None
            }
            Ok(draft) => {
                info!("✓ 评分完成: overallScore={:?}", draft.overall_score);
                Some(draft)
            }
            Err(e) => {
                warn!("❌ 模型回复解析失败: {}", e);
                None
            }
        }
    }
}

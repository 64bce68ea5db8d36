use openai::Credentials;
use openai::chat::{ChatCompletion, ChatCompletionMessage, ChatCompletionMessageRole};
use tracing::{debug, warn};

/// LLM 请求配置
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API 密钥
    pub api_key: String,
    /// API 基础 URL
    pub api_base_url: String,
    /// 模型名称
    pub model_name: String,
    /// 系统消息
    pub system_message: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u64>,
}

fn message(role: ChatCompletionMessageRole, content: String) -> ChatCompletionMessage {
    ChatCompletionMessage {
        role,
        content: Some(content),
        name: None,
        function_call: None,
        tool_call_id: None,
        tool_calls: None,
    }
}

/// 带配置的 LLM 调用函数，返回去掉首尾空白的回复内容
///
/// 调用方负责超时：丢弃返回的 future 即取消请求。
pub async fn ask_llm_with_config(user_message: &str, config: &LlmConfig) -> anyhow::Result<String> {
    debug!("正在调用 LLM API，模型: {}", config.model_name);
    debug!("用户消息长度: {} 字符", user_message.chars().count());

    let credentials = Credentials::new(config.api_key.as_str(), config.api_base_url.as_str());

    let mut messages = Vec::new();

    // 添加系统消息（如果提供）
    if let Some(system_msg) = &config.system_message {
        messages.push(message(ChatCompletionMessageRole::System, system_msg.clone()));
    }
    messages.push(message(ChatCompletionMessageRole::User, user_message.to_string()));

    let mut builder = ChatCompletion::builder(config.model_name.as_str(), messages).credentials(credentials);
    if let Some(temperature) = config.temperature {
        builder = builder.temperature(temperature);
    }
    if let Some(max_tokens) = config.max_tokens {
        builder = builder.max_tokens(max_tokens);
    }

    let chat_completion = builder.create().await.map_err(|e| {
        warn!("LLM API 调用失败: {}", e);
        anyhow::anyhow!("LLM API 调用失败: {}", e)
    })?;

    debug!("LLM API 调用成功");

    let returned_message = chat_completion
        .choices
        .first()
        .ok_or_else(|| anyhow::anyhow!("LLM 返回结果为空"))?
        .message
        .clone();

    let content = returned_message
        .content
        .ok_or_else(|| anyhow::anyhow!("LLM 返回内容为空"))?;

    Ok(content.trim().to_string())
}

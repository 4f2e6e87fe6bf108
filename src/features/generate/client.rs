use axum::http::StatusCode;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;

use crate::config::UpstreamConfig;
use crate::error::AppError;

use super::keys::KeyRotator;
use super::models::{
    Content, GeneratePayload, GenerateReply, GenerationConfig, Part, aspect_ratio_config,
    safety_settings_off,
};

/// 已通过校验的参考图（随 prompt 一起内联进请求体）。
pub struct ReferenceImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// 一次成功生成的产物。
#[derive(Debug)]
pub struct GenerationOutput {
    /// 上游返回的说明文字（可能为空）
    pub text: String,
    /// 生成图片的原始字节
    pub image_bytes: Vec<u8>,
}

/// 单个 Key 的尝试结果，用于区分“Key 本身失效”与其他失败。
enum AttemptError {
    /// 上游明确报告 API Key 失效，应永久剔除该 Key
    InvalidKey,
    /// 其他失败（网络/超时/非 2xx/解析失败），换下一个 Key 继续
    Other(AppError),
}

/// 上游生成服务客户端。
///
/// 配置了凭证池时按轮换顺序逐 Key 尝试；否则走固定回退地址。
/// 出站请求自带超时，调用期间不持有任何存储层的锁。
pub struct GenerationClient {
    client: reqwest::Client,
    rotator: KeyRotator,
    endpoint_template: String,
    fallback_url: Option<String>,
    bearer_token: Option<String>,
    max_output_tokens: u32,
    temperature: f32,
}

impl GenerationClient {
    pub fn new(cfg: &UpstreamConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout_duration())
            .build()
            .map_err(|e| AppError::Internal(format!("初始化 HTTP Client 失败: {e}")))?;

        Ok(Self {
            client,
            rotator: KeyRotator::new(cfg.api_keys.clone()),
            endpoint_template: cfg.endpoint_template.clone(),
            fallback_url: cfg.fallback_url.clone(),
            bearer_token: cfg.bearer_token.clone(),
            max_output_tokens: cfg.max_output_tokens,
            temperature: cfg.temperature,
        })
    }

    /// 凭证池（供启动检查与状态上报读取存活数量）。
    pub fn rotator(&self) -> &KeyRotator {
        &self.rotator
    }

    /// 是否具备可用的上游配置（凭证池或回退地址其一）。
    pub fn is_configured(&self) -> bool {
        !self.rotator.is_empty() || self.fallback_url.is_some()
    }

    /// 发起一次图片生成。
    ///
    /// prompt 已由调用方做过非空校验；参考图已通过文件校验。
    pub async fn generate(
        &self,
        prompt: &str,
        reference_images: &[ReferenceImage],
        aspect_ratio: &str,
    ) -> Result<GenerationOutput, AppError> {
        let payload = self.build_payload(prompt, reference_images, aspect_ratio);
        let reply = self.dispatch(&payload).await?;
        let (text, image) = parse_reply(reply)?;
        let image_bytes = image.ok_or(AppError::NoImageProduced)?;
        Ok(GenerationOutput { text, image_bytes })
    }

    fn build_payload(
        &self,
        prompt: &str,
        reference_images: &[ReferenceImage],
        aspect_ratio: &str,
    ) -> GeneratePayload {
        let mut parts = vec![Part::text(format!("Image generation prompt: {prompt}"))];
        for img in reference_images {
            parts.push(Part::inline_image(
                img.mime_type.clone(),
                BASE64.encode(&img.bytes),
            ));
        }

        GeneratePayload {
            contents: vec![Content {
                role: "user".to_string(),
                parts,
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.max_output_tokens,
                temperature: self.temperature,
                image_config: aspect_ratio_config(aspect_ratio),
            },
            safety_settings: safety_settings_off(),
        }
    }

    /// 凭证轮换分发：每个存活 Key 在一次逻辑请求内至多尝试一次。
    async fn dispatch(&self, payload: &GeneratePayload) -> Result<GenerateReply, AppError> {
        if !self.rotator.is_empty() {
            let attempts = self.rotator.len();
            for _ in 0..attempts {
                let Some(key) = self.rotator.next_key() else {
                    break;
                };
                let url = self.endpoint_template.replace("{key}", &key);
                match self.call(&url, payload).await {
                    Ok(reply) => return Ok(reply),
                    Err(AttemptError::InvalidKey) => {
                        tracing::warn!("上游报告 API Key 失效，已永久剔除");
                        self.rotator.invalidate(&key);
                    }
                    Err(AttemptError::Other(e)) => {
                        tracing::warn!(error = %e, "上游请求失败，换用下一个 Key");
                    }
                }
            }
            return Err(AppError::UpstreamExhausted);
        }

        let Some(url) = self.fallback_url.as_deref() else {
            return Err(AppError::Config(
                "未配置上游 API Key，也未配置回退地址".to_string(),
            ));
        };
        // 固定端点模式：失败即终止，不做轮换
        self.call(url, payload).await.map_err(|e| match e {
            AttemptError::InvalidKey => AppError::Network("固定端点拒绝了请求".to_string()),
            AttemptError::Other(e) => e,
        })
    }

    async fn call(&self, url: &str, payload: &GeneratePayload) -> Result<GenerateReply, AttemptError> {
        let mut req = self.client.post(url).json(payload);
        if let Some(token) = &self.bearer_token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| AttemptError::Other(e.into()))?;
        let status = resp.status();

        if status == StatusCode::BAD_REQUEST {
            // 400 需要进一步区分：Key 失效 vs 普通请求错误
            let body: Value = resp
                .json()
                .await
                .map_err(|e| AttemptError::Other(AppError::Json(e.to_string())))?;
            if is_invalid_key_error(&body) {
                return Err(AttemptError::InvalidKey);
            }
            return Err(AttemptError::Other(AppError::Network(format!(
                "上游返回 400: {body}"
            ))));
        }

        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AttemptError::Other(AppError::Network(format!(
                "上游返回 {status}: {}",
                text.chars().take(200).collect::<String>()
            ))));
        }

        resp.json::<GenerateReply>()
            .await
            .map_err(|e| AttemptError::Other(AppError::Json(format!("解析上游响应失败: {e}"))))
    }
}

/// 判断上游 400 响应是否为 API Key 失效。
fn is_invalid_key_error(body: &Value) -> bool {
    body.get("error")
        .and_then(|e| e.get("details"))
        .and_then(Value::as_array)
        .is_some_and(|details| {
            details
                .iter()
                .any(|d| d.get("reason").and_then(Value::as_str) == Some("API_KEY_INVALID"))
        })
}

/// 解析上游回复：文本换行拼接，内联图片取最后一张（顺序处理，后者覆盖前者）。
fn parse_reply(reply: GenerateReply) -> Result<(String, Option<Vec<u8>>), AppError> {
    let mut texts: Vec<String> = Vec::new();
    let mut image: Option<Vec<u8>> = None;

    if let Some(candidate) = reply.candidates.into_iter().next() {
        for part in candidate.content.parts {
            if let Some(t) = part.text {
                texts.push(t);
            } else if let Some(inline) = part.inline_data {
                let bytes = BASE64
                    .decode(inline.data.as_bytes())
                    .map_err(|e| AppError::Json(format!("解码上游图片数据失败: {e}")))?;
                image = Some(bytes);
            }
        }
    }

    Ok((texts.join("\n").trim().to_string(), image))
}

use serde::{Deserialize, Serialize};

/// 上游支持的宽高比白名单，白名单外的取值以及 "auto" 均不下发 imageConfig。
pub const ALLOWED_ASPECT_RATIOS: [&str; 10] = [
    "1:1", "2:3", "3:2", "3:4", "4:3", "4:5", "5:4", "9:16", "16:9", "21:9",
];

/// 内容安全的五个类别。按产品要求全部显式关闭过滤（非默认行为）。
const SAFETY_CATEGORIES: [&str; 5] = [
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_CIVIC_INTEGRITY",
];

/// generateContent 请求体
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePayload {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
    pub safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub role: String,
    pub parts: Vec<Part>,
}

/// 请求与响应共用的 part：文本或 base64 内联图片二者其一。
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn inline_image(mime_type: impl Into<String>, base64_data: impl Into<String>) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.into(),
                data: base64_data.into(),
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub max_output_tokens: u32,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_config: Option<ImageConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub aspect_ratio: String,
}

#[derive(Debug, Serialize)]
pub struct SafetySetting {
    pub category: &'static str,
    pub threshold: &'static str,
}

/// 全类别关闭过滤的安全配置。
pub fn safety_settings_off() -> Vec<SafetySetting> {
    SAFETY_CATEGORIES
        .iter()
        .map(|category| SafetySetting {
            category,
            threshold: "OFF",
        })
        .collect()
}

/// 宽高比提示：仅白名单内且非 "auto"（大小写不敏感）时下发。
pub fn aspect_ratio_config(raw: &str) -> Option<ImageConfig> {
    let value = raw.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("auto") {
        return None;
    }
    ALLOWED_ASPECT_RATIOS
        .contains(&value)
        .then(|| ImageConfig {
            aspect_ratio: value.to_string(),
        })
}

/// generateContent 响应体（只取解析所需字段）
#[derive(Debug, Deserialize)]
pub struct GenerateReply {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Content,
}

/// 生成接口对外响应
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[schema(example = json!({
  "success": true,
  "result_image": "/user_content/7b6c9d3e-....png",
  "response_text": "Here is your image."
}))]
pub struct GenerateResponse {
    pub success: bool,
    /// 结果图访问路径
    pub result_image: String,
    /// 上游返回的说明文字（可能为空）
    pub response_text: String,
}

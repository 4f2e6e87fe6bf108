use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Asia::Seoul;
use serde::{Deserialize, Serialize};

/// 当前韩国时间（UTC+9），画廊记录统一使用该时区落时间戳。
pub fn now_kst() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&Seoul).fixed_offset()
}

/// 随生成请求一起上传的参考图
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UploadedImage {
    /// 用户侧原始文件名
    pub filename: String,
    /// 存储后的访问路径（/user_content/...）
    pub path: String,
}

/// 画廊记录（存储层内部结构）。
///
/// `creator_ip` 仅用于审核，绝不随任何非管理员响应序列化输出。
#[derive(Debug, Clone)]
pub struct GalleryRecord {
    /// 唯一 ID（结果 Blob 名去掉扩展名）
    pub id: String,
    /// 结果图访问路径
    pub result_image: String,
    /// 原始提示词，创建后不可变
    pub prompt: String,
    /// 参考图（0~2 张）
    pub uploaded_images: Vec<UploadedImage>,
    /// 上游返回的说明文字
    pub response_text: String,
    /// 创建时间（UTC+9），只在创建时落一次
    pub created_at: DateTime<FixedOffset>,
    /// 点赞数，只增不减
    pub likes: u64,
    /// 创建者 IP，仅供审核
    pub creator_ip: String,
}

/// 对外暴露的画廊条目视图
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[schema(example = json!({
  "id": "7b6c9d3e-5f61-4f3a-9f50-1c2d3e4f5a6b",
  "result_image": "/user_content/7b6c9d3e-5f61-4f3a-9f50-1c2d3e4f5a6b.png",
  "prompt": "a cat in space",
  "uploaded_images": [],
  "response_text": "Here you go.",
  "created_at": "2025-09-20T13:10:44+09:00",
  "likes": 3,
  "user_liked": false
}))]
pub struct GalleryItemView {
    pub id: String,
    pub result_image: String,
    pub prompt: String,
    pub uploaded_images: Vec<UploadedImage>,
    pub response_text: String,
    pub created_at: DateTime<FixedOffset>,
    pub likes: u64,
    /// 当前调用方 IP 是否已点赞
    pub user_liked: bool,
}

impl GalleryItemView {
    pub(crate) fn from_record(record: &GalleryRecord, user_liked: bool) -> Self {
        Self {
            id: record.id.clone(),
            result_image: record.result_image.clone(),
            prompt: record.prompt.clone(),
            uploaded_images: record.uploaded_images.clone(),
            response_text: record.response_text.clone(),
            created_at: record.created_at,
            likes: record.likes,
            user_liked,
        }
    }
}

/// 分页结果
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct GalleryPage {
    pub images: Vec<GalleryItemView>,
    /// 当前页之后是否还有数据
    pub has_more: bool,
    /// 过滤前的总条数
    pub total: usize,
    pub page: u32,
    pub per_page: u32,
}

/// 点赞响应
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[schema(example = json!({"success": true, "likes": 4, "user_liked": true}))]
pub struct LikeResponse {
    pub success: bool,
    pub likes: u64,
    pub user_liked: bool,
}

/// 画廊排序方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// 最新优先（默认）
    #[default]
    Newest,
    /// 最早优先
    Oldest,
    /// 点赞数降序
    Likes,
}

impl SortKey {
    /// 宽容解析：未知取值回退到默认的 newest。
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("oldest") => SortKey::Oldest,
            Some("likes") => SortKey::Likes,
            _ => SortKey::Newest,
        }
    }
}

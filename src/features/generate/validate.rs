use crate::error::AppError;

/// 允许上传的图片扩展名
const ALLOWED_EXTENSIONS: [&str; 8] = ["png", "jpg", "jpeg", "gif", "bmp", "webp", "tiff", "svg"];

/// 单个上传文件大小上限（15MB）
pub const MAX_FILE_SIZE: usize = 15 * 1024 * 1024;

/// 校验上传的参考图：扩展名、MIME 类型、文件大小。
///
/// 与生成流程解耦，任何一项不通过都直接拒绝本次请求。
pub fn validate_image_file(
    filename: &str,
    content_type: Option<&str>,
    size: usize,
) -> Result<(), AppError> {
    if filename.is_empty() {
        return Err(AppError::Validation("文件未选择或文件名为空".to_string()));
    }

    let lower = filename.to_lowercase();
    let Some(ext) = lower.rsplit_once('.').map(|(_, e)| e) else {
        return Err(AppError::Validation(format!("文件扩展名缺失: {filename}")));
    };
    if !ALLOWED_EXTENSIONS.contains(&ext) {
        let mut allowed: Vec<&str> = ALLOWED_EXTENSIONS.to_vec();
        allowed.sort_unstable();
        return Err(AppError::Validation(format!(
            "不支持的文件格式，允许的格式: {}",
            allowed.join(", ")
        )));
    }

    match content_type {
        Some(ct) if ct.starts_with("image/") => {}
        _ => {
            return Err(AppError::Validation(format!("不是图片文件: {filename}")));
        }
    }

    if size == 0 {
        return Err(AppError::Validation(format!("空文件: {filename}")));
    }
    if size > MAX_FILE_SIZE {
        let size_mb = size as f64 / (1024.0 * 1024.0);
        return Err(AppError::Validation(format!(
            "文件过大（{size_mb:.2}MB），最大允许 15MB"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{MAX_FILE_SIZE, validate_image_file};

    #[test]
    fn accepts_all_allowed_formats() {
        for ext in ["png", "jpg", "jpeg", "gif", "bmp", "webp", "tiff", "svg"] {
            let name = format!("pic.{ext}");
            assert!(
                validate_image_file(&name, Some("image/png"), 1024).is_ok(),
                "should accept {name}"
            );
        }
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(validate_image_file("PIC.PNG", Some("image/png"), 1024).is_ok());
    }

    #[test]
    fn rejects_unknown_extension_and_missing_extension() {
        assert!(validate_image_file("doc.pdf", Some("image/png"), 1024).is_err());
        assert!(validate_image_file("noext", Some("image/png"), 1024).is_err());
        assert!(validate_image_file("", Some("image/png"), 1024).is_err());
    }

    #[test]
    fn rejects_non_image_mime() {
        assert!(validate_image_file("a.png", Some("text/plain"), 1024).is_err());
        assert!(validate_image_file("a.png", None, 1024).is_err());
    }

    #[test]
    fn rejects_empty_and_oversized_files() {
        assert!(validate_image_file("a.png", Some("image/png"), 0).is_err());
        assert!(validate_image_file("a.png", Some("image/png"), MAX_FILE_SIZE + 1).is_err());
        assert!(validate_image_file("a.png", Some("image/png"), MAX_FILE_SIZE).is_ok());
    }
}

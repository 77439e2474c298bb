/// Name and key helpers / 名称与对象键工具函数

/// Client names are case-insensitive and stored upper-cased / 客户端名称统一大写
pub fn normalize_name(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Clean and normalize an object key / 清理和规范化对象键
/// 1. Replace backslashes with forward slashes / 将反斜杠替换为正斜杠
/// 2. Drop empty and `.` segments, `..` removes the previous one / 清理 . 和 ..
/// 3. No leading slash, object keys are relative / 不带前导斜杠
pub fn clean_key(key: &str) -> String {
    let key = key.replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();

    for part in key.split('/') {
        match part {
            "" | "." => continue,
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }

    parts.join("/")
}

/// Directory prefix for listing, empty or ending with `/` / 目录前缀
pub fn dir_prefix(path: &str) -> String {
    let key = clean_key(path);
    if key.is_empty() {
        key
    } else {
        format!("{}/", key)
    }
}

/// Content type guessed from the key's extension / 根据扩展名推断内容类型
pub fn content_type_for(key: &str) -> String {
    mime_guess::from_path(key)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name(" minio "), "MINIO");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn test_clean_key() {
        assert_eq!(clean_key(""), "");
        assert_eq!(clean_key("."), "");
        assert_eq!(clean_key("../.."), "");
        assert_eq!(clean_key("a/b/c"), "a/b/c");
        assert_eq!(clean_key("/a/b/c"), "a/b/c");
        assert_eq!(clean_key("a\\b\\c"), "a/b/c");
        assert_eq!(clean_key("/a//b///c"), "a/b/c");
        assert_eq!(clean_key("/a/./b/../c"), "a/c");
    }

    #[test]
    fn test_dir_prefix() {
        assert_eq!(dir_prefix("/"), "");
        assert_eq!(dir_prefix("avatars"), "avatars/");
        assert_eq!(dir_prefix("/avatars/2024/"), "avatars/2024/");
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type_for("a/b/photo.png"), "image/png");
        assert_eq!(content_type_for("notes.txt"), "text/plain");
        assert_eq!(content_type_for("blob"), "application/octet-stream");
    }
}

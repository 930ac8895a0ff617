use thiserror::Error;

/// 虛擬根資料夾的路徑。 / Path of the synthetic vault root folder.
pub const ROOT_PATH: &str = "/";

/// 路徑驗證錯誤。 / Reasons a vault path is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path is empty")]
    Empty,
    #[error("path segment '{0}' is not allowed")]
    InvalidSegment(String),
    #[error("path contains forbidden character {0:?}")]
    InvalidCharacter(char),
}

/// 將反斜線轉為斜線並去除多餘的分隔符號。 / Converts backslashes and collapses redundant separators.
///
/// Leading and trailing separators are dropped, so `"/notes//a.md"` becomes
/// `"notes/a.md"`. A path made only of separators normalizes to [`ROOT_PATH`];
/// an empty input stays empty.
pub fn normalize_path(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }
    let replaced = raw.replace('\\', "/");
    let segments: Vec<&str> = replaced
        .split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.is_empty() {
        return ROOT_PATH.to_string();
    }
    segments.join("/")
}

/// 正規化並驗證可用於建立節點的路徑。 / Normalizes a path and rejects anything that cannot name a node.
pub fn validate_path(raw: &str) -> Result<String, PathError> {
    let normalized = normalize_path(raw);
    if normalized.is_empty() || normalized == ROOT_PATH {
        return Err(PathError::Empty);
    }
    if let Some(ch) = normalized.chars().find(|ch| *ch == '\0' || ch.is_control()) {
        return Err(PathError::InvalidCharacter(ch));
    }
    for segment in normalized.split('/') {
        if segment == "." || segment == ".." {
            return Err(PathError::InvalidSegment(segment.to_string()));
        }
    }
    Ok(normalized)
}

/// 取得父資料夾路徑；頂層節點的父資料夾為根目錄。 / Parent folder path; top-level nodes live under the root.
pub fn parent_path(path: &str) -> Option<&str> {
    if path.is_empty() || path == ROOT_PATH {
        return None;
    }
    match path.rfind('/') {
        Some(index) => Some(&path[..index]),
        None => Some(ROOT_PATH),
    }
}

/// 路徑最後一段名稱。 / Last segment of the path.
pub fn file_name(path: &str) -> &str {
    if path == ROOT_PATH {
        return "";
    }
    path.rsplit('/').next().unwrap_or(path)
}

/// 副檔名（不含點）；無副檔名時回傳空字串。 / Extension without the dot, or empty.
pub fn extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => "",
        Some(index) => &name[index + 1..],
    }
}

/// 去除副檔名後的檔名。 / Name with the extension stripped.
pub fn basename(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(index) => &name[..index],
    }
}

/// 所有上層資料夾（由淺至深，不含根目錄與自身）。 / Proper ancestor folders, shallowest first.
pub fn ancestors(path: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut offset = 0;
    while let Some(found) = path[offset..].find('/') {
        let end = offset + found;
        result.push(path[..end].to_string());
        offset = end + 1;
    }
    result
}

/// 將名稱接在資料夾之下。 / Joins a child name onto a folder path.
pub fn join(folder: &str, name: &str) -> String {
    if folder.is_empty() || folder == ROOT_PATH {
        name.to_string()
    } else {
        format!("{folder}/{name}")
    }
}

/// `path` 是否位於 `ancestor` 之下。 / Whether `path` lies strictly below `ancestor`.
pub fn is_descendant(path: &str, ancestor: &str) -> bool {
    if ancestor == ROOT_PATH {
        return path != ROOT_PATH;
    }
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'/'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_separators() {
        assert_eq!(normalize_path("notes\\daily//2024.md"), "notes/daily/2024.md");
        assert_eq!(normalize_path("/Welcome.md/"), "Welcome.md");
        assert_eq!(normalize_path("//"), ROOT_PATH);
        assert_eq!(normalize_path(""), "");
    }

    #[test]
    fn validate_rejects_relative_segments() {
        assert_eq!(validate_path("a/../b"), Err(PathError::InvalidSegment("..".into())));
        assert_eq!(validate_path("/"), Err(PathError::Empty));
        assert_eq!(validate_path("a\u{0}b"), Err(PathError::InvalidCharacter('\0')));
        assert_eq!(validate_path(" notes/a.md "), Ok("notes/a.md".to_string()));
    }

    #[test]
    fn name_helpers() {
        assert_eq!(parent_path("a/b/c.md"), Some("a/b"));
        assert_eq!(parent_path("c.md"), Some(ROOT_PATH));
        assert_eq!(parent_path(ROOT_PATH), None);
        assert_eq!(file_name("a/b/c.md"), "c.md");
        assert_eq!(extension("c.tar.gz"), "gz");
        assert_eq!(extension(".hidden"), "");
        assert_eq!(basename("c.md"), "c");
        assert_eq!(ancestors("a/b/c.md"), vec!["a".to_string(), "a/b".to_string()]);
        assert!(ancestors("c.md").is_empty());
        assert_eq!(join(ROOT_PATH, "x"), "x");
        assert!(is_descendant("a/b", "a"));
        assert!(!is_descendant("ab", "a"));
        assert!(!is_descendant("a", "a"));
    }
}

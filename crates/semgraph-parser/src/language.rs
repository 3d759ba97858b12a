//! Extension-to-language detection, trimmed from the teacher's
//! `language.rs` map down to the languages this workspace actually ships
//! a plugin for, plus the common ones tree-sitter fallback would cover in
//! a fuller deployment (detected for workspace-language reporting even
//! though only Rust has a real extraction plugin here).

use std::path::Path;

pub fn detect(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?;
    Some(match ext {
        "rs" => "rust",
        "py" => "python",
        "js" | "jsx" | "mjs" => "javascript",
        "ts" | "tsx" => "typescript",
        "go" => "go",
        "java" => "java",
        "rb" => "ruby",
        "php" => "php",
        "cs" => "csharp",
        "cpp" | "cc" | "cxx" | "hpp" | "h" => "cpp",
        "swift" => "swift",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn detects_rust_extension() {
        assert_eq!(detect(&PathBuf::from("src/main.rs")), Some("rust"));
    }

    #[test]
    fn returns_none_for_unknown_extension() {
        assert_eq!(detect(&PathBuf::from("README.md")), None);
    }
}

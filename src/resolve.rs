use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

// Outcome of resolving a raw url() reference against the source directory.
// `Path` is best effort: the candidate is returned even when nothing exists
// at it, and the metadata probe reports the miss downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Resolved {
    Path(PathBuf),
    NotAnImage(PathBuf),
}

fn image_extension_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\.(jpg|jpeg|png|gif|svg|bmp)\b").expect("image extension pattern")
    })
}

// Turns a possibly-relative, possibly-alias-prefixed reference into an
// absolute candidate path. Over-traversed `../` references and `@` aliases
// pointing at a `src` root are common build-tool conventions; each fallback
// fires only when the previous candidate is absent, and both may fire in
// sequence on one reference.
pub(crate) fn fix_absolute_path(source_dir: &Path, raw_path: &str) -> Resolved {
    let mut relative = raw_path.to_string();
    let mut absolute = normalize(&source_dir.join(&relative));

    if !image_extension_pattern().is_match(&absolute.to_string_lossy()) {
        return Resolved::NotAnImage(absolute);
    }

    if !absolute.exists() && relative.contains("../") {
        relative = relative.replacen("../", "", 1);
        absolute = normalize(&source_dir.join(&relative));
    }

    if !absolute.exists() && relative.starts_with('@') {
        if let Some(root) = nearest_src_ancestor(source_dir) {
            let stripped = relative[1..].trim_start_matches('/');
            absolute = normalize(&root.join(stripped));
        }
    }

    Resolved::Path(absolute)
}

// Nearest directory named exactly `src` on the way up from `dir`, `dir`
// itself included.
fn nearest_src_ancestor(dir: &Path) -> Option<PathBuf> {
    dir.ancestors()
        .find(|ancestor| ancestor.file_name().is_some_and(|name| name == "src"))
        .map(Path::to_path_buf)
}

// Lexical normalization: `.` segments drop, `..` pops the previous segment.
// No filesystem access, so unlike canonicalize this works for paths that do
// not exist yet.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push(component.as_os_str());
                }
                // Excess `..` above an absolute root is dropped.
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_tree(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let dir = std::env::temp_dir().join(format!(
            "autosize_resolve_{tag}_{}_{}",
            std::process::id(),
            nanos
        ));
        fs::create_dir_all(&dir).expect("create temp tree");
        dir
    }

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(path, b"x").expect("write file");
    }

    fn resolved_path(resolved: Resolved) -> PathBuf {
        match resolved {
            Resolved::Path(path) => path,
            Resolved::NotAnImage(path) => panic!("unexpected non-image: {}", path.display()),
        }
    }

    #[test]
    fn rejects_references_without_an_image_extension() {
        let dir = temp_tree("ext");
        match fix_absolute_path(&dir, "notes.txt") {
            Resolved::NotAnImage(path) => assert!(path.ends_with("notes.txt")),
            other => panic!("expected NotAnImage, got {other:?}"),
        }
    }

    #[test]
    fn extension_match_is_case_insensitive_and_bounded() {
        let dir = temp_tree("ext2");
        assert!(matches!(
            fix_absolute_path(&dir, "logo.PNG"),
            Resolved::Path(_)
        ));
        // Query suffix after the extension is still an image reference.
        assert!(matches!(
            fix_absolute_path(&dir, "logo.png?v=3"),
            Resolved::Path(_)
        ));
        // `pngx` is not a recognized extension.
        assert!(matches!(
            fix_absolute_path(&dir, "logo.pngx"),
            Resolved::NotAnImage(_)
        ));
    }

    #[test]
    fn plain_join_wins_when_the_file_exists() {
        let dir = temp_tree("plain");
        let file = dir.join("img/a.png");
        touch(&file);
        assert_eq!(resolved_path(fix_absolute_path(&dir, "img/a.png")), file);
    }

    #[test]
    fn over_traversed_reference_drops_one_parent_segment() {
        let root = temp_tree("strip");
        let styles = root.join("src/styles");
        fs::create_dir_all(&styles).expect("styles dir");
        // ../img/logo.png escapes too far; the real file sits next to the
        // source file.
        let file = styles.join("img/logo.png");
        touch(&file);
        assert_eq!(
            resolved_path(fix_absolute_path(&styles, "../img/logo.png")),
            file
        );
    }

    #[test]
    fn missing_candidate_is_still_returned() {
        let dir = temp_tree("miss");
        let resolved = resolved_path(fix_absolute_path(&dir, "img/ghost.png"));
        assert_eq!(resolved, dir.join("img/ghost.png"));
        assert!(!resolved.exists());
    }

    #[test]
    fn stripped_candidate_is_returned_even_when_absent() {
        let dir = temp_tree("strip_miss");
        let resolved = resolved_path(fix_absolute_path(&dir, "../img/ghost.png"));
        assert_eq!(resolved, dir.join("img/ghost.png"));
        assert!(!resolved.exists());
    }

    #[test]
    fn alias_resolves_against_the_nearest_src_ancestor() {
        let root = temp_tree("alias");
        let styles = root.join("src/styles");
        fs::create_dir_all(&styles).expect("styles dir");
        let file = root.join("src/assets/logo.png");
        touch(&file);
        assert_eq!(
            resolved_path(fix_absolute_path(&styles, "@assets/logo.png")),
            file
        );
        assert_eq!(
            resolved_path(fix_absolute_path(&styles, "@/assets/logo.png")),
            file
        );
    }

    #[test]
    fn alias_without_a_src_ancestor_keeps_the_joined_candidate() {
        let dir = temp_tree("noalias");
        let resolved = resolved_path(fix_absolute_path(&dir, "@assets/logo.png"));
        assert_eq!(resolved, dir.join("@assets/logo.png"));
    }

    #[test]
    fn both_fallbacks_fire_in_sequence() {
        let root = temp_tree("chain");
        let styles = root.join("src/styles");
        fs::create_dir_all(&styles).expect("styles dir");
        let file = root.join("src/assets/logo.png");
        touch(&file);
        // `../@assets/logo.png`: the traversal strip leaves `@assets/logo.png`,
        // which then resolves through the alias root.
        assert_eq!(
            resolved_path(fix_absolute_path(&styles, "../@assets/logo.png")),
            file
        );
    }

    #[test]
    fn nested_src_picks_the_deepest_ancestor() {
        let root = temp_tree("nested");
        let inner = root.join("src/packages/widget/src/styles");
        fs::create_dir_all(&inner).expect("inner dirs");
        let file = root.join("src/packages/widget/src/assets/a.png");
        touch(&file);
        assert_eq!(
            resolved_path(fix_absolute_path(&inner, "@assets/a.png")),
            file
        );
    }

    #[test]
    fn normalize_collapses_dot_segments() {
        assert_eq!(
            normalize(Path::new("/a/b/../c/./d.png")),
            PathBuf::from("/a/c/d.png")
        );
        assert_eq!(normalize(Path::new("/a/../../b.png")), PathBuf::from("/b.png"));
    }
}

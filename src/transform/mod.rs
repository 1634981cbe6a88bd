//! Rewriting registry paths and imports for the consumer's project layout.
//!
//! Registry files live under virtual prefixes (`lib/`, `lib/primitives/`,
//! `shared/`, `greater/`) and import each other through the `$greater/` namespace:
//!
//! ```text
//! import { cn } from '$greater/lib/utils/cn.ts';
//! ```
//!
//! At install time every file is placed through the project's aliases and every
//! `$greater/` specifier is rewritten to point at the installed file, either through
//! an import alias (`$lib/components/ui/utils/cn.ts`) or as a relative path
//! (`./utils/cn.ts`). Any other specifier is left alone.

use regex::{Captures, Regex};
use similar::{ChangeTag, TextDiff};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use crate::config::ComponentConfig;
use crate::constants::VIRTUAL_IMPORT_PREFIX;

/// Maps a virtual path prefix to a project directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapping {
    /// Virtual prefix including the trailing slash, e.g. `lib/primitives/`
    pub prefix: String,
    /// Project-relative directory without trailing slash
    pub target: String,
}

/// Mapping rules for `config`, longest prefix first.
pub fn build_path_mappings(config: &ComponentConfig) -> Vec<PathMapping> {
    let aliases = &config.aliases;
    let mut mappings = vec![
        mapping("lib/primitives/", &aliases.hooks),
        mapping("lib/", &aliases.lib),
        mapping("shared/", &aliases.components),
        mapping("greater/", &aliases.greater),
    ];
    for (name, dir) in &aliases.extra {
        let prefix = format!("{name}/");
        if !mappings.iter().any(|m| m.prefix == prefix) {
            mappings.push(mapping(&prefix, dir));
        }
    }
    mappings.sort_by(|a, b| {
        b.prefix.len().cmp(&a.prefix.len()).then_with(|| a.prefix.cmp(&b.prefix))
    });
    mappings
}

fn mapping(prefix: &str, target: &str) -> PathMapping {
    PathMapping {
        prefix: prefix.to_string(),
        target: target.replace('\\', "/").trim_end_matches('/').to_string(),
    }
}

/// Project-relative location of `virtual_path`.
///
/// The first (longest) matching rule wins; unmatched paths are returned unchanged.
pub fn transform_path(virtual_path: &str, mappings: &[PathMapping]) -> String {
    for m in mappings {
        if let Some(rest) = virtual_path.strip_prefix(&m.prefix) {
            if m.target.is_empty() {
                return rest.to_string();
            }
            return format!("{}/{}", m.target, rest);
        }
    }
    virtual_path.to_string()
}

/// How a file's imports are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// JavaScript / TypeScript modules
    Script,
    /// Single-file components containing script and style blocks
    Markup,
    /// CSS and preprocessor stylesheets
    Stylesheet,
    /// Copied verbatim
    Other,
}

impl FileKind {
    /// Classify by extension.
    pub fn from_path(path: &str) -> Self {
        let ext = Path::new(path).extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("ts" | "js" | "mts" | "mjs" | "cts" | "cjs" | "tsx" | "jsx") => Self::Script,
            Some("svelte" | "vue" | "html" | "astro") => Self::Markup,
            Some("css" | "scss" | "sass" | "less" | "pcss" | "postcss") => Self::Stylesheet,
            _ => Self::Other,
        }
    }
}

fn script_pattern() -> Option<&'static Regex> {
    static RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
        Regex::new(
            r#"(?P<pre>\b(?:from|import|require)\s*(?:\(\s*)?)(?P<open>["'])\$greater/(?P<path>[^"'\s]+)(?P<close>["'])"#,
        )
        .ok()
    });
    RE.as_ref()
}

fn stylesheet_pattern() -> Option<&'static Regex> {
    static RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
        Regex::new(
            r#"(?P<pre>@import\s+(?:url\(\s*)?)(?P<open>["']?)\$greater/(?P<path>[^"'()\s;]+)(?P<close>["']?)"#,
        )
        .ok()
    });
    RE.as_ref()
}

/// Whether `content` references the `$greater/` namespace at all.
#[must_use]
pub fn has_greater_imports(content: &str) -> bool {
    content.contains(VIRTUAL_IMPORT_PREFIX)
}

/// Rewrite every `$greater/` specifier in `content`.
///
/// `importer_local_path` is the project-relative path the file is installed at;
/// relative specifiers are computed from its directory. An import alias is used
/// instead when its directory contains the target (the deepest such alias wins).
pub fn transform_imports(
    content: &str,
    mappings: &[PathMapping],
    kind: FileKind,
    importer_local_path: &str,
    import_aliases: &BTreeMap<String, String>,
) -> String {
    if kind == FileKind::Other || !has_greater_imports(content) {
        return content.to_string();
    }

    let rewrite = |caps: &Captures| -> String {
        let target = transform_path(&caps["path"], mappings);
        let specifier = aliased_specifier(&target, import_aliases)
            .unwrap_or_else(|| relative_specifier(importer_local_path, &target));
        format!("{}{}{}{}", &caps["pre"], &caps["open"], specifier, &caps["close"])
    };

    let patterns: Vec<&Regex> = match kind {
        FileKind::Script => script_pattern().into_iter().collect(),
        FileKind::Stylesheet => stylesheet_pattern().into_iter().collect(),
        FileKind::Markup => script_pattern().into_iter().chain(stylesheet_pattern()).collect(),
        FileKind::Other => Vec::new(),
    };

    let mut result = content.to_string();
    for pattern in patterns {
        result = pattern.replace_all(&result, &rewrite).into_owned();
    }
    result
}

fn aliased_specifier(target: &str, import_aliases: &BTreeMap<String, String>) -> Option<String> {
    import_aliases
        .iter()
        .filter_map(|(alias, dir)| {
            let dir = dir.trim_end_matches('/');
            target
                .strip_prefix(dir)
                .and_then(|rest| rest.strip_prefix('/'))
                .map(|rest| (dir.len(), format!("{}/{}", alias.trim_end_matches('/'), rest)))
        })
        .max_by_key(|(depth, _)| *depth)
        .map(|(_, specifier)| specifier)
}

/// `./` or `../` specifier from the directory of `from_file` to `to_file`.
fn relative_specifier(from_file: &str, to_file: &str) -> String {
    let from_dir: Vec<&str> = {
        let mut segments: Vec<&str> = from_file.split('/').filter(|s| !s.is_empty()).collect();
        segments.pop();
        segments
    };
    let to: Vec<&str> = to_file.split('/').filter(|s| !s.is_empty()).collect();

    let common = from_dir.iter().zip(to.iter()).take_while(|(a, b)| a == b).count();
    let ups = from_dir.len() - common;
    let rest = to[common..].join("/");

    if ups == 0 {
        format!("./{rest}")
    } else {
        format!("{}{rest}", "../".repeat(ups))
    }
}

/// What a transformation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformSummary {
    /// Number of rewritten specifiers
    pub changed_imports: usize,
    /// `(original, rewritten)` specifier pairs in file order
    pub rewritten: Vec<(String, String)>,
    /// Number of lines that differ
    pub changed_lines: usize,
}

/// Compare a file before and after [`transform_imports`].
pub fn get_transform_summary(original: &str, transformed: &str) -> TransformSummary {
    let diff = TextDiff::from_lines(original, transformed);
    let changed_lines = diff.iter_all_changes().filter(|c| c.tag() == ChangeTag::Delete).count();

    let mut rewritten = Vec::new();
    let before: Vec<&str> = original.lines().collect();
    let after: Vec<&str> = transformed.lines().collect();
    if before.len() == after.len() {
        for (old, new) in before.iter().zip(after.iter()).filter(|(a, b)| a != b) {
            for (from, to) in tokens(old).zip(tokens(new)) {
                if from != to && from.starts_with(VIRTUAL_IMPORT_PREFIX) {
                    rewritten.push((from.to_string(), to.to_string()));
                }
            }
        }
    }

    TransformSummary {
        changed_imports: rewritten.len(),
        rewritten,
        changed_lines,
    }
}

fn tokens(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | '(' | ')' | ';' | '`'))
        .filter(|t| !t.is_empty())
}

//! The substitution engine.
//!
//! Expands variable references and inline include directives in text,
//! recursively and up to a bounded depth. The engine is deliberately
//! fail-soft for authoring mistakes: a missing variable leaves its
//! placeholder untouched and a missing include file becomes an empty
//! string, both with a warning. Only circular references (the depth guard)
//! and real I/O failures abort an agent's composition.
//!
//! All expansion state travels in an explicit [`SubstContext`] — there is
//! no engine-level mutable "current file", so nested expansions for
//! different files cannot observe each other's context.

use crate::compose::headings::fit_headings;
use crate::compose::scanner::{self, IncludeCall, Token};
use crate::config::VarMap;
use crate::error::{Result, ScribeError};
use crate::fs as fsutil;
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Maximum recursive expansion depth; the circular-reference guard.
pub const MAX_SUBSTITUTION_DEPTH: usize = 10;

/// Per-expansion context, threaded explicitly through every call.
#[derive(Debug, Clone)]
pub struct SubstContext<'v> {
    /// The active variable mapping (read-only).
    pub vars: &'v VarMap,
    /// Current recursion depth.
    pub depth: usize,
    /// The file whose content is being expanded, for diagnostics only.
    pub file: Option<PathBuf>,
    /// Warn when a referenced variable is not defined.
    pub warn_on_missing: bool,
    /// Expand references inside included file content.
    pub substitute_in_includes: bool,
}

impl<'v> SubstContext<'v> {
    /// Create a top-level context (depth 0, no file).
    pub fn new(vars: &'v VarMap, warn_on_missing: bool, substitute_in_includes: bool) -> Self {
        Self {
            vars,
            depth: 0,
            file: None,
            warn_on_missing,
            substitute_in_includes,
        }
    }

    /// Attach a diagnostic file location.
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// The context one recursion level down.
    fn deeper(&self) -> Self {
        let mut next = self.clone();
        next.depth += 1;
        next
    }

    /// Human-readable location for warnings and errors.
    fn location(&self) -> String {
        match &self.file {
            Some(file) => format!("'{}'", file.display()),
            None => "inline text".to_string(),
        }
    }
}

/// The expansion worker for one agent composition.
///
/// Owns mutable access to the composition's dependency set and warning
/// sink; the include-reading methods double as the `read_file` /
/// `read_file_raw` helper capability handed to template renderers.
pub struct Expander<'a> {
    base_dir: &'a Path,
    deps: &'a mut BTreeSet<PathBuf>,
    warnings: &'a mut Vec<String>,
}

impl<'a> Expander<'a> {
    /// Create an expander recording into the given dependency set and
    /// warning sink. Paths resolve against `base_dir`.
    pub fn new(
        base_dir: &'a Path,
        deps: &'a mut BTreeSet<PathBuf>,
        warnings: &'a mut Vec<String>,
    ) -> Self {
        Self {
            base_dir,
            deps,
            warnings,
        }
    }

    /// The directory relative paths resolve against.
    pub fn base_dir(&self) -> &Path {
        self.base_dir
    }

    /// Record a file path the current composition depends on.
    pub fn record_dependency(&mut self, path: PathBuf) {
        self.deps.insert(path);
    }

    /// Surface a non-fatal warning to the user and the composition result.
    pub fn warn(&mut self, message: String) {
        eprintln!("warning: {}", message);
        self.warnings.push(message);
    }

    /// Expand all references in `text`.
    ///
    /// Returns the input unchanged (apart from resolved references) — text
    /// without reference syntax is returned as-is.
    pub fn expand(&mut self, text: &str, ctx: &SubstContext<'_>) -> Result<String> {
        if ctx.depth > MAX_SUBSTITUTION_DEPTH {
            return Err(ScribeError::SubstitutionDepthExceeded {
                limit: MAX_SUBSTITUTION_DEPTH,
                context: ctx.location(),
            });
        }

        let mut out = String::with_capacity(text.len());
        for token in scanner::scan(text) {
            match token {
                Token::Literal(s) => out.push_str(s),
                Token::Variable { name, source } => match ctx.vars.get(name) {
                    Some(value) => {
                        let rendered = value.render();
                        out.push_str(&self.expand(&rendered, &ctx.deeper())?);
                    }
                    None => {
                        if ctx.warn_on_missing {
                            self.warn(format!(
                                "variable '{}' referenced in {} but not defined; leaving placeholder untouched",
                                name,
                                ctx.location()
                            ));
                        }
                        out.push_str(source);
                    }
                },
                Token::Include { call, .. } => {
                    out.push_str(&self.read_include(&call, ctx)?);
                }
                Token::Malformed { reason, source } => {
                    if ctx.warn_on_missing {
                        self.warn(format!(
                            "unrecognized reference in {}: {}; leaving it untouched",
                            ctx.location(),
                            reason
                        ));
                    }
                    out.push_str(source);
                }
            }
        }
        Ok(out)
    }

    /// Read an included file with full include semantics: path expansion,
    /// dependency recording, heading fitting, and (unless raw) recursive
    /// substitution of the content.
    pub fn read_include(&mut self, call: &IncludeCall, ctx: &SubstContext<'_>) -> Result<String> {
        let path_str = self.expand(&call.path, &ctx.deeper())?;
        let path_str = path_str.trim();
        if path_str.is_empty() {
            self.warn(format!(
                "include in {} has an empty path; skipping",
                ctx.location()
            ));
            return Ok(String::new());
        }

        let path = fsutil::resolve_relative(self.base_dir, path_str);
        // Recorded before the read: a file that is missing now still
        // affects the output once it appears.
        self.deps.insert(path.clone());

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.warn(format!(
                    "file not found during substitution: '{}'",
                    path_str
                ));
                return Ok(String::new());
            }
            Err(e) => {
                return Err(ScribeError::FileRead {
                    path,
                    message: e.to_string(),
                });
            }
        };

        let content = match call.fit_headings {
            Some(level) => fit_headings(&content, level),
            None => content,
        };

        if call.raw || !ctx.substitute_in_includes {
            Ok(content)
        } else {
            self.expand(&content, &ctx.deeper().with_file(path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VarValue;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        base: PathBuf,
        deps: BTreeSet<PathBuf>,
        warnings: Vec<String>,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let base = temp.path().to_path_buf();
            Self {
                _temp: temp,
                base,
                deps: BTreeSet::new(),
                warnings: Vec::new(),
            }
        }

        fn write(&self, name: &str, content: &str) -> PathBuf {
            let path = self.base.join(name);
            std::fs::write(&path, content).unwrap();
            path
        }

        fn expander(&mut self) -> Expander<'_> {
            Expander::new(&self.base, &mut self.deps, &mut self.warnings)
        }
    }

    fn vars(pairs: &[(&str, &str)]) -> VarMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), VarValue::from(*v)))
            .collect()
    }

    #[test]
    fn reference_free_text_is_identity() {
        let mut fx = Fixture::new();
        let map = vars(&[("unused", "x")]);
        let ctx = SubstContext::new(&map, true, true);

        let input = "plain text, no references at all";
        let result = fx.expander().expand(input, &ctx).unwrap();

        assert_eq!(result, input);
    }

    #[test]
    fn expands_simple_variable() {
        let mut fx = Fixture::new();
        let map = vars(&[("project", "Acme")]);
        let ctx = SubstContext::new(&map, true, true);

        let result = fx.expander().expand("Welcome to {{ project }}!", &ctx).unwrap();

        assert_eq!(result, "Welcome to Acme!");
    }

    #[test]
    fn expands_nested_variable_values() {
        let mut fx = Fixture::new();
        let map = vars(&[("greeting", "Hello {{ name }}"), ("name", "World")]);
        let ctx = SubstContext::new(&map, true, true);

        let result = fx.expander().expand("{{ greeting }}!", &ctx).unwrap();

        assert_eq!(result, "Hello World!");
    }

    #[test]
    fn missing_variable_keeps_placeholder_verbatim() {
        let mut fx = Fixture::new();
        let map = VarMap::new();
        let ctx = SubstContext::new(&map, true, true);

        let input = "before {{  missing_var  }} after";
        let result = fx.expander().expand(input, &ctx).unwrap();

        assert_eq!(result, input);
        assert_eq!(fx.warnings.len(), 1);
        assert!(fx.warnings[0].contains("missing_var"));
    }

    #[test]
    fn missing_variable_warning_respects_flag() {
        let mut fx = Fixture::new();
        let map = VarMap::new();
        let ctx = SubstContext::new(&map, false, true);

        let result = fx.expander().expand("{{ missing }}", &ctx).unwrap();

        assert_eq!(result, "{{ missing }}");
        assert!(fx.warnings.is_empty());
    }

    #[test]
    fn non_string_values_coerce_at_substitution() {
        let mut fx = Fixture::new();
        let mut map = VarMap::new();
        map.insert("count".to_string(), VarValue::Int(3));
        map.insert("strict".to_string(), VarValue::Bool(false));
        let ctx = SubstContext::new(&map, true, true);

        let result = fx
            .expander()
            .expand("count={{ count }} strict={{ strict }}", &ctx)
            .unwrap();

        assert_eq!(result, "count=3 strict=false");
    }

    #[test]
    fn circular_reference_hits_depth_guard() {
        let mut fx = Fixture::new();
        let map = vars(&[("a", "{{ b }}"), ("b", "{{ a }}")]);
        let ctx = SubstContext::new(&map, true, true);

        let err = fx.expander().expand("{{ a }}", &ctx).unwrap_err();

        assert!(matches!(
            err,
            ScribeError::SubstitutionDepthExceeded { limit, .. } if limit == MAX_SUBSTITUTION_DEPTH
        ));
    }

    #[test]
    fn deep_but_finite_chain_expands() {
        let mut fx = Fixture::new();
        // a -> b -> c -> d: well within the bound.
        let map = vars(&[
            ("a", "{{ b }}"),
            ("b", "{{ c }}"),
            ("c", "{{ d }}"),
            ("d", "done"),
        ]);
        let ctx = SubstContext::new(&map, true, true);

        assert_eq!(fx.expander().expand("{{ a }}", &ctx).unwrap(), "done");
    }

    #[test]
    fn include_reads_file_and_records_dependency() {
        let mut fx = Fixture::new();
        let path = fx.write("body.md", "included {{ word }}");
        let map = vars(&[("word", "content")]);
        let ctx = SubstContext::new(&map, true, true);

        let result = fx
            .expander()
            .expand(r#"{{ read_file("body.md") }}"#, &ctx)
            .unwrap();

        assert_eq!(result, "included content");
        assert!(fx.deps.contains(&path));
    }

    #[test]
    fn include_raw_skips_substitution() {
        let mut fx = Fixture::new();
        fx.write("raw.md", "keep {{ word }} as-is");
        let map = vars(&[("word", "content")]);
        let ctx = SubstContext::new(&map, true, true);

        let result = fx
            .expander()
            .expand(r#"{{ read_file_raw("raw.md") }}"#, &ctx)
            .unwrap();

        assert_eq!(result, "keep {{ word }} as-is");
    }

    #[test]
    fn substitute_in_includes_flag_disables_expansion() {
        let mut fx = Fixture::new();
        fx.write("body.md", "value: {{ word }}");
        let map = vars(&[("word", "content")]);
        let ctx = SubstContext::new(&map, true, false);

        let result = fx
            .expander()
            .expand(r#"{{ read_file("body.md") }}"#, &ctx)
            .unwrap();

        assert_eq!(result, "value: {{ word }}");
    }

    #[test]
    fn include_path_is_expanded_first() {
        let mut fx = Fixture::new();
        let path = fx.write("part-two.md", "two");
        let map = vars(&[("part", "two")]);
        let ctx = SubstContext::new(&map, true, true);

        let result = fx
            .expander()
            .expand(r#"{{ read_file("part-{{ part }}.md") }}"#, &ctx)
            .unwrap();

        assert_eq!(result, "two");
        assert!(fx.deps.contains(&path));
    }

    #[test]
    fn missing_include_is_empty_with_warning() {
        let mut fx = Fixture::new();
        let map = VarMap::new();
        let ctx = SubstContext::new(&map, true, true);

        let result = fx
            .expander()
            .expand(r#"A{{ read_file("absent.md") }}B"#, &ctx)
            .unwrap();

        assert_eq!(result, "AB");
        assert_eq!(fx.warnings.len(), 1);
        assert!(fx.warnings[0].contains("absent.md"));
        // Still recorded: its creation would change the output.
        let expected = fx.base.join("absent.md");
        assert!(fx.deps.contains(&expected));
    }

    #[test]
    fn nested_includes_record_all_dependencies() {
        let mut fx = Fixture::new();
        let outer = fx.write("outer.md", r#"outer + {{ read_file("inner.md") }}"#);
        let inner = fx.write("inner.md", "inner");
        let map = VarMap::new();
        let ctx = SubstContext::new(&map, true, true);

        let result = fx
            .expander()
            .expand(r#"{{ read_file("outer.md") }}"#, &ctx)
            .unwrap();

        assert_eq!(result, "outer + inner");
        assert!(fx.deps.contains(&outer));
        assert!(fx.deps.contains(&inner));
    }

    #[test]
    fn include_with_fit_headings_shifts_content() {
        let mut fx = Fixture::new();
        fx.write("doc.md", "# Title\n\nBody.");
        let map = VarMap::new();
        let ctx = SubstContext::new(&map, true, true);

        let result = fx
            .expander()
            .expand(r#"{{ read_file("doc.md", fit_headings=3) }}"#, &ctx)
            .unwrap();

        assert_eq!(result, "### Title\n\nBody.");
    }

    #[test]
    fn malformed_directive_is_preserved_with_warning() {
        let mut fx = Fixture::new();
        let map = VarMap::new();
        let ctx = SubstContext::new(&map, true, true);

        let input = "{{ read_file(unquoted) }}";
        let result = fx.expander().expand(input, &ctx).unwrap();

        assert_eq!(result, input);
        assert_eq!(fx.warnings.len(), 1);
    }

    #[test]
    fn expanding_expanded_output_is_stable() {
        let mut fx = Fixture::new();
        let map = vars(&[("name", "World")]);
        let ctx = SubstContext::new(&map, true, true);

        let once = fx.expander().expand("Hello {{ name }}", &ctx).unwrap();
        let twice = fx.expander().expand(&once, &ctx).unwrap();

        assert_eq!(once, twice);
    }
}

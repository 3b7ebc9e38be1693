//! Markdown heading-level fitting for included content.
//!
//! Shifts every ATX heading in a fragment so the shallowest heading lands
//! at the requested level. Content with no headings passes through
//! unchanged. Lines inside fenced code blocks are never treated as
//! headings.

/// Shift heading levels so the shallowest heading sits at `level`.
///
/// Resulting levels are clamped to 1..=6; `level` itself is clamped the
/// same way.
pub fn fit_headings(content: &str, level: u8) -> String {
    let target = level.clamp(1, 6);

    let shallowest = heading_lines(content)
        .filter_map(|(_, heading)| heading)
        .min();

    let Some(shallowest) = shallowest else {
        return content.to_string();
    };

    let delta = i16::from(target) - i16::from(shallowest);
    if delta == 0 {
        return content.to_string();
    }

    let mut out = String::with_capacity(content.len());
    for (line, heading) in heading_lines(content) {
        match heading {
            Some(current) => {
                let shifted = (i16::from(current) + delta).clamp(1, 6) as usize;
                let rest = line.trim_start().trim_start_matches('#');
                out.push_str(&"#".repeat(shifted));
                out.push_str(rest);
            }
            None => out.push_str(line),
        }
        out.push('\n');
    }

    if !content.ends_with('\n') {
        out.pop();
    }
    out
}

/// Iterate lines paired with their ATX heading level (fence-aware).
fn heading_lines(content: &str) -> impl Iterator<Item = (&str, Option<u8>)> {
    let mut in_fence = false;
    content.lines().map(move |line| {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            return (line, None);
        }
        if in_fence {
            return (line, None);
        }
        (line, heading_level(line))
    })
}

/// Parse the ATX heading level of a line, if any.
///
/// Up to three leading spaces are allowed; the hash run must be 1..=6 long
/// and followed by whitespace or end of line.
fn heading_level(line: &str) -> Option<u8> {
    let leading_spaces = line.len() - line.trim_start_matches(' ').len();
    if leading_spaces > 3 {
        return None;
    }
    let rest = &line[leading_spaces..];

    let hashes = rest.len() - rest.trim_start_matches('#').len();
    if hashes == 0 || hashes > 6 {
        return None;
    }

    let after = &rest[hashes..];
    if after.is_empty() || after.starts_with(' ') || after.starts_with('\t') {
        Some(hashes as u8)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_headings_passes_through() {
        let content = "just text\n\nmore text\n";
        assert_eq!(fit_headings(content, 2), content);
    }

    #[test]
    fn shifts_down_to_target() {
        let content = "# Title\n\nBody.\n\n## Section\n";
        let result = fit_headings(content, 3);
        assert_eq!(result, "### Title\n\nBody.\n\n#### Section\n");
    }

    #[test]
    fn shifts_up_to_target() {
        let content = "### Deep\n\n#### Deeper\n";
        let result = fit_headings(content, 1);
        assert_eq!(result, "# Deep\n\n## Deeper\n");
    }

    #[test]
    fn already_at_target_is_unchanged() {
        let content = "## Section\ntext\n";
        assert_eq!(fit_headings(content, 2), content);
    }

    #[test]
    fn levels_clamp_at_six() {
        let content = "# One\n\n### Three\n";
        let result = fit_headings(content, 5);
        // Shallowest (1) lands at 5; the h3 would land at 7 and clamps to 6.
        assert_eq!(result, "##### One\n\n###### Three\n");
    }

    #[test]
    fn target_level_clamps_into_range() {
        let content = "## Section\n";
        assert_eq!(fit_headings(content, 9), "###### Section\n");
    }

    #[test]
    fn fenced_code_is_not_shifted() {
        let content = "# Title\n\n```\n# not a heading\n```\n";
        let result = fit_headings(content, 2);
        assert_eq!(result, "## Title\n\n```\n# not a heading\n```\n");
    }

    #[test]
    fn hash_without_space_is_not_a_heading() {
        let content = "#hashtag\n## Real\n";
        let result = fit_headings(content, 1);
        assert_eq!(result, "#hashtag\n# Real\n");
    }

    #[test]
    fn preserves_missing_trailing_newline() {
        let content = "# Title";
        assert_eq!(fit_headings(content, 2), "## Title");
    }

    #[test]
    fn heading_level_parsing() {
        assert_eq!(heading_level("# one"), Some(1));
        assert_eq!(heading_level("###### six"), Some(6));
        assert_eq!(heading_level("####### seven"), None);
        assert_eq!(heading_level("   ## indented"), Some(2));
        assert_eq!(heading_level("    ## code-indented"), None);
        assert_eq!(heading_level("##"), Some(2));
        assert_eq!(heading_level("text"), None);
    }
}

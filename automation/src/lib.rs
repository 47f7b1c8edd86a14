//! String parsing for the shell automation around the plot catalog.
//!
//! Every function here is pure: no I/O, no shared state. `None` means "no
//! match", which the binary turns into exit code 1.

pub mod noqa;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static AUTO_BRANCH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^auto/([^/\s]+)/([^/\s]+)$").expect("valid regex"));
static SUB_ISSUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Sub-Issue:\s*#(\d+)").expect("valid regex"));
static PLOT_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|/)plots/([^/]+)/([^/]+)/([^/]+)/([^/]+)\.py$").expect("valid regex")
});

const ATTEMPT_PREFIX: &str = "ai-attempt-";
const STATUS_PREFIX: &str = "status:";

/// Known workflow statuses, in lifecycle order.
pub const STATUSES: [&str; 7] = [
    "queued",
    "in-progress",
    "testing",
    "reviewing",
    "approved",
    "rejected",
    "merged",
];

/// Parsed `auto/<spec-id>/<library>` branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutoBranch {
    pub spec_id: String,
    pub library: String,
    pub is_auto_branch: bool,
}

/// Parsed `plots/<library>/<category>/<spec>/<variant>.py` path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlotPath {
    pub library: String,
    pub spec_id: String,
    pub variant: String,
}

pub fn extract_branch(branch: &str) -> Option<AutoBranch> {
    let caps = AUTO_BRANCH_RE.captures(branch.trim())?;
    Some(AutoBranch {
        spec_id: caps[1].to_string(),
        library: caps[2].to_string(),
        is_auto_branch: true,
    })
}

/// First `Sub-Issue: #<n>` reference in `text`.
pub fn extract_sub_issue(text: &str) -> Option<u64> {
    SUB_ISSUE_RE
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}

/// Largest `ai-attempt-<n>` among comma-separated labels; 0 when none.
///
/// Tokens without a numeric suffix do not count. Suffixes too large for
/// `u64` saturate.
pub fn attempt_count(labels: &str) -> u64 {
    split_labels(labels)
        .filter_map(|label| label.strip_prefix(ATTEMPT_PREFIX))
        .filter(|suffix| !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()))
        .map(|suffix| suffix.parse::<u64>().unwrap_or(u64::MAX))
        .max()
        .unwrap_or(0)
}

pub fn parse_plot_path(path: &str) -> Option<PlotPath> {
    let caps = PLOT_PATH_RE.captures(path.trim())?;
    Some(PlotPath {
        library: caps[1].to_string(),
        spec_id: caps[3].to_string(),
        variant: caps[4].to_string(),
    })
}

/// `gh`-style label arguments moving `current` labels to the `target` status.
///
/// Returns `Some("")` when the target label is already present and `None`
/// when `target` is not a known status. `target` may be bare or prefixed.
pub fn status_transition(current: &str, target: &str) -> Option<String> {
    let target = target.trim();
    let target = target.strip_prefix(STATUS_PREFIX).unwrap_or(target);
    if !STATUSES.contains(&target) {
        return None;
    }
    let target_label = format!("{STATUS_PREFIX}{target}");

    let labels: Vec<&str> = split_labels(current).collect();
    if labels.contains(&target_label.as_str()) {
        return Some(String::new());
    }

    let mut args: Vec<String> = Vec::new();
    for label in labels {
        let is_status = label
            .strip_prefix(STATUS_PREFIX)
            .is_some_and(|name| STATUSES.contains(&name));
        if is_status {
            args.push(format!("--remove-label {label}"));
        }
    }
    args.push(format!("--add-label {target_label}"));
    Some(args.join(" "))
}

/// Quality bucket for a review score.
pub fn quality_label(score: i64) -> &'static str {
    match score {
        s if s >= 90 => "quality:excellent",
        s if s >= 80 => "quality:good",
        s if s >= 70 => "quality:fair",
        _ => "quality:poor",
    }
}

fn split_labels(labels: &str) -> impl Iterator<Item = &str> {
    labels.split(',').map(str::trim).filter(|l| !l.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_branch_parses() {
        let branch = extract_branch("auto/scatter-basic/matplotlib").expect("match");
        assert_eq!(branch.spec_id, "scatter-basic");
        assert_eq!(branch.library, "matplotlib");
        assert_eq!(
            serde_json::to_string(&branch).expect("json"),
            r#"{"spec_id":"scatter-basic","library":"matplotlib","is_auto_branch":true}"#
        );
    }

    #[test]
    fn non_auto_branches_do_not_match() {
        assert_eq!(extract_branch("main"), None);
        assert_eq!(extract_branch("auto/scatter-basic"), None);
        assert_eq!(extract_branch("auto/a/b/c"), None);
        assert_eq!(extract_branch("feature/auto/a/b"), None);
    }

    #[test]
    fn sub_issue_number() {
        assert_eq!(
            extract_sub_issue("Tracking work.\n\nSub-Issue: #1234\n"),
            Some(1234)
        );
        assert_eq!(extract_sub_issue("Sub-Issue:#7"), Some(7));
        assert_eq!(extract_sub_issue("Closes #12"), None);
    }

    #[test]
    fn attempt_count_takes_max_and_ignores_malformed() {
        assert_eq!(attempt_count("ai-attempt-2,library:matplotlib"), 2);
        assert_eq!(attempt_count("ai-attempt-1, ai-attempt-3 ,ai-attempt-2"), 3);
        assert_eq!(attempt_count("ai-attempt-,ai-attempt-x,ai-attempt--1"), 0);
        assert_eq!(attempt_count(""), 0);
    }

    #[test]
    fn attempt_count_handles_large_suffixes() {
        assert_eq!(
            attempt_count("ai-attempt-99999999999,ai-attempt-3"),
            99_999_999_999
        );
        assert_eq!(
            attempt_count("ai-attempt-2,ai-attempt-999999999999999999999999"),
            u64::MAX
        );
    }

    #[test]
    fn plot_path_parses() {
        let path = parse_plot_path("plots/matplotlib/scatter/scatter-basic/default.py").expect("match");
        assert_eq!(
            path,
            PlotPath {
                library: "matplotlib".to_string(),
                spec_id: "scatter-basic".to_string(),
                variant: "default".to_string(),
            }
        );
        assert_eq!(
            serde_json::to_string(&path).expect("json"),
            r#"{"library":"matplotlib","spec_id":"scatter-basic","variant":"default"}"#
        );
        assert!(parse_plot_path("./plots/plotly/line/line-basic/dark.py").is_some());
    }

    #[test]
    fn plot_path_rejects_other_shapes() {
        assert_eq!(parse_plot_path("plots/matplotlib/scatter-basic/default.py"), None);
        assert_eq!(parse_plot_path("plots/matplotlib/scatter/scatter-basic/default.png"), None);
        assert_eq!(parse_plot_path("src/main.py"), None);
    }

    #[test]
    fn status_transition_swaps_labels() {
        assert_eq!(
            status_transition("status:testing,library:seaborn", "reviewing").as_deref(),
            Some("--remove-label status:testing --add-label status:reviewing")
        );
        assert_eq!(
            status_transition("", "status:queued").as_deref(),
            Some("--add-label status:queued")
        );
        assert_eq!(
            status_transition("status:queued,status:in-progress", "testing").as_deref(),
            Some(
                "--remove-label status:queued --remove-label status:in-progress --add-label status:testing"
            )
        );
    }

    #[test]
    fn status_transition_noop_and_unknown() {
        assert_eq!(
            status_transition("status:approved", "approved").as_deref(),
            Some("")
        );
        assert_eq!(status_transition("status:approved", "shipped"), None);
    }

    #[test]
    fn quality_thresholds() {
        assert_eq!(quality_label(95), "quality:excellent");
        assert_eq!(quality_label(90), "quality:excellent");
        assert_eq!(quality_label(87), "quality:good");
        assert_eq!(quality_label(70), "quality:fair");
        assert_eq!(quality_label(50), "quality:poor");
        assert_eq!(quality_label(-3), "quality:poor");
    }
}

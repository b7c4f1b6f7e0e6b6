//! Commit-message shaping for the CL pipeline (§4.7 step 5-7): building the
//! squashed message, splicing labels ahead of the `Change-Id` trailer, and
//! extracting a previously-assigned Change-Id so re-mailing a branch keeps
//! the same one.

const CHANGE_ID_PREFIX: &str = "Change-Id:";

/// Concatenate non-merge commit messages into the body of a squash commit
/// (§4.7 step 5, first half).
pub fn build_commit_message(commit_messages: &[String]) -> String {
    commit_messages
        .iter()
        .map(|m| m.trim())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Labels appended by `mail()` before the Change-Id line (§4.7 step 5).
#[derive(Debug, Clone, Default)]
pub struct Labels {
    pub autosubmit: bool,
    pub presubmit_none: bool,
}

/// Splice labels into `message`, ahead of any existing `Change-Id:` line.
/// A label already present anywhere in the message is never duplicated.
pub fn splice_labels(message: &str, labels: &Labels) -> String {
    let mut to_add = Vec::new();
    if labels.autosubmit && !contains_line_prefix(message, "AutoSubmit") {
        to_add.push("AutoSubmit".to_string());
    }
    if labels.presubmit_none && !contains_line_prefix(message, "PresubmitTest:") {
        to_add.push("PresubmitTest: none".to_string());
    }

    if to_add.is_empty() {
        return message.to_string();
    }

    match find_change_id_line(message) {
        Some(idx) => {
            let (before, after) = message.split_at(idx);
            let mut spliced = before.trim_end().to_string();
            spliced.push('\n');
            for label in &to_add {
                spliced.push_str(label);
                spliced.push('\n');
            }
            spliced.push('\n');
            spliced.push_str(after.trim_start());
            spliced
        }
        None => {
            let mut spliced = message.trim_end().to_string();
            spliced.push('\n');
            spliced.push('\n');
            for label in &to_add {
                spliced.push_str(label);
                spliced.push('\n');
            }
            spliced
        }
    }
}

/// Find the byte offset of the `Change-Id:` line, if present.
fn find_change_id_line(message: &str) -> Option<usize> {
    let mut offset = 0;
    for line in message.split_inclusive('\n') {
        if line.trim_start().starts_with(CHANGE_ID_PREFIX) {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

fn contains_line_prefix(message: &str, prefix: &str) -> bool {
    message.lines().any(|l| l.trim_start().starts_with(prefix))
}

/// Extract the `Change-Id: I<hex>` trailer from a commit message, if any
/// (§4.7: "read the previous commit-message file, extract any existing
/// Change-Id trailer" so re-mailing preserves it).
pub fn extract_change_id(message: &str) -> Option<String> {
    message.lines().find_map(|line| {
        let line = line.trim_start();
        line.strip_prefix(CHANGE_ID_PREFIX)
            .map(|rest| rest.trim().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_commit_message_joins_with_blank_line() {
        let msgs = vec!["first".to_string(), "second".to_string()];
        assert_eq!(build_commit_message(&msgs), "first\n\nsecond");
    }

    #[test]
    fn splice_labels_inserts_before_change_id() {
        let message = "summary\n\nChange-Id: I0123\n";
        let labels = Labels {
            autosubmit: true,
            presubmit_none: true,
        };
        let spliced = splice_labels(message, &labels);
        let autosubmit_pos = spliced.find("AutoSubmit").unwrap();
        let presubmit_pos = spliced.find("PresubmitTest: none").unwrap();
        let change_id_pos = spliced.find("Change-Id:").unwrap();
        assert!(autosubmit_pos < change_id_pos);
        assert!(presubmit_pos < change_id_pos);
    }

    #[test]
    fn splice_labels_is_idempotent() {
        let message = "summary\n\nAutoSubmit\nChange-Id: I0123\n";
        let labels = Labels {
            autosubmit: true,
            presubmit_none: false,
        };
        let spliced = splice_labels(message, &labels);
        assert_eq!(spliced.matches("AutoSubmit").count(), 1);
    }

    #[test]
    fn splice_labels_without_change_id_appends_at_end() {
        let message = "summary";
        let labels = Labels {
            autosubmit: true,
            presubmit_none: false,
        };
        let spliced = splice_labels(message, &labels);
        assert!(spliced.ends_with("AutoSubmit\n"));
    }

    #[test]
    fn extract_change_id_finds_trailer() {
        let message = "summary\n\nChange-Id: I0123abcdef\n";
        assert_eq!(extract_change_id(message), Some("I0123abcdef".to_string()));
    }

    #[test]
    fn extract_change_id_absent() {
        assert_eq!(extract_change_id("summary only"), None);
    }
}

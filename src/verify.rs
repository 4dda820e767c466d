// Issue accumulation for validation and codec verification
//
// Verification reports every independent problem in one pass instead of
// stopping at the first. Codecs and validators push into a
// caller-supplied stack; the CLI decides the exit code from the worst
// severity seen.

use std::fmt;

/// How serious a verification finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Suppressed in output.
    Silent,
    Hint,
    Warning,
    /// The configuration cannot be used as-is.
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Silent => "silent",
            Severity::Hint => "hint",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        };
        write!(f, "{}", s)
    }
}

/// One verification finding with its document or entity location.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub severity: Severity,
    pub location: String,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.location, self.message)
    }
}

/// A mutable stack of findings threaded through a verification pass.
#[derive(Debug, Clone, Default)]
pub struct IssueStack {
    issues: Vec<Issue>,
}

impl IssueStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, severity: Severity, location: impl Into<String>, message: impl Into<String>) {
        self.issues.push(Issue {
            severity,
            location: location.into(),
            message: message.into(),
        });
    }

    pub fn hint(&mut self, location: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Hint, location, message);
    }

    pub fn warn(&mut self, location: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Warning, location, message);
    }

    pub fn critical(&mut self, location: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Critical, location, message);
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Worst severity seen, if any finding was recorded.
    pub fn max_severity(&self) -> Option<Severity> {
        self.issues.iter().map(|i| i.severity).max()
    }

    pub fn has_critical(&self) -> bool {
        self.max_severity() == Some(Severity::Critical)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Warning);
        assert!(Severity::Warning > Severity::Hint);
        assert!(Severity::Hint > Severity::Silent);
    }

    #[test]
    fn test_stack_accumulates() {
        let mut stack = IssueStack::new();
        stack.warn("channels[0]", "no scan list");
        stack.critical("zones[1]", "dangling channel reference");
        assert_eq!(stack.len(), 2);
        assert!(stack.has_critical());
        assert_eq!(stack.max_severity(), Some(Severity::Critical));
    }

    #[test]
    fn test_issue_display() {
        let mut stack = IssueStack::new();
        stack.warn("contacts[2]", "duplicate DMR ID");
        assert_eq!(
            stack.issues()[0].to_string(),
            "warning: contacts[2]: duplicate DMR ID"
        );
    }
}

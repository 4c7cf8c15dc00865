//! Editor tab state.

/// Ordered set of open file names plus the current tab.
///
/// Names are not checked against the filesystem; a tab may outlive its file
/// until it is closed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenFiles {
    tabs: Vec<String>,
    current: Option<String>,
}

impl OpenFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `name` if absent and make it current.
    pub fn open(&mut self, name: &str) {
        if !self.contains(name) {
            self.tabs.push(name.to_string());
        }
        self.current = Some(name.to_string());
    }

    /// Remove `name`. If it was current, the last remaining tab (or none)
    /// becomes current.
    pub fn close(&mut self, name: &str) -> bool {
        let before = self.tabs.len();
        self.tabs.retain(|t| t != name);
        if self.current.as_deref() == Some(name) {
            self.current = self.tabs.last().cloned();
        }
        self.tabs.len() != before
    }

    /// Make an already open tab current.
    pub fn select(&mut self, name: &str) -> bool {
        if self.contains(name) {
            self.current = Some(name.to_string());
            true
        } else {
            false
        }
    }

    pub fn tabs(&self) -> &[String] {
        &self.tabs
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tabs.iter().any(|t| t == name)
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_is_idempotent() {
        let mut files = OpenFiles::new();
        files.open("a.js");
        files.open("b.js");
        files.open("a.js");
        assert_eq!(files.tabs(), ["a.js", "b.js"]);
        assert_eq!(files.current(), Some("a.js"));
    }

    #[test]
    fn closing_current_selects_last_tab() {
        let mut files = OpenFiles::new();
        files.open("a.js");
        files.open("b.js");
        files.open("c.js");
        files.select("b.js");
        assert!(files.close("b.js"));
        assert_eq!(files.current(), Some("c.js"));
        assert!(files.close("c.js"));
        assert_eq!(files.current(), Some("a.js"));
        assert!(files.close("a.js"));
        assert_eq!(files.current(), None);
        assert!(files.is_empty());
    }

    #[test]
    fn closing_other_tab_keeps_current() {
        let mut files = OpenFiles::new();
        files.open("a.js");
        files.open("b.js");
        files.close("a.js");
        assert_eq!(files.current(), Some("b.js"));
    }

    #[test]
    fn close_unknown_is_noop() {
        let mut files = OpenFiles::new();
        files.open("a.js");
        assert!(!files.close("zzz"));
        assert_eq!(files.tabs(), ["a.js"]);
    }

    #[test]
    fn select_requires_open_tab() {
        let mut files = OpenFiles::new();
        assert!(!files.select("a.js"));
        assert_eq!(files.current(), None);
    }
}

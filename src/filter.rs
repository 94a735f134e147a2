use std::collections::BTreeSet;

/// Package whitelist/blacklist translated into slash path prefixes.
///
/// Filter entries are dotted package prefixes; a leading `-` marks a
/// blacklist entry. An empty entry, or no entries at all, means scan
/// everything, which becomes the single whitelist prefix `/`.
#[derive(Debug, Clone)]
pub struct PathFilter {
    whitelist: Vec<String>,
    blacklist: Vec<String>,
}

impl PathFilter {
    pub fn from_packages<S: AsRef<str>>(packages: &[S]) -> Self {
        let mut whitelist: BTreeSet<String> = BTreeSet::new();
        let mut blacklist: BTreeSet<String> = BTreeSet::new();
        let mut scan_all = packages.is_empty();
        for package in packages {
            let package = package.as_ref();
            if package.is_empty() {
                scan_all = true;
                break;
            }
            let prefix = format!("{}/", package.replace('.', "/"));
            match prefix.strip_prefix('-') {
                Some(stripped) => blacklist.insert(stripped.to_string()),
                None => whitelist.insert(prefix),
            };
        }
        // A prefix on both lists is blacklisted.
        let whitelist: Vec<String> = if scan_all {
            vec!["/".to_string()]
        } else {
            whitelist.difference(&blacklist).cloned().collect()
        };
        Self {
            whitelist,
            blacklist: blacklist.into_iter().collect(),
        }
    }

    /// True when a relative directory path (trailing slash) is exactly a
    /// blacklisted prefix; the caller prunes the whole subtree.
    pub fn prunes_directory(&self, relative_dir: &str) -> bool {
        self.blacklist.iter().any(|b| relative_dir == b)
    }

    /// Classifies a relative directory path (trailing slash, `/` for the
    /// root). Returns `(in_whitelist, keep_recursing)`: scan files here when
    /// the first holds, keep descending toward a whitelisted path when the
    /// second does.
    pub fn directory_scope(&self, relative_dir: &str) -> (bool, bool) {
        let mut keep_recursing = false;
        for prefix in &self.whitelist {
            if relative_dir == prefix {
                return (true, keep_recursing);
            }
            if prefix.starts_with(relative_dir) || relative_dir == "/" {
                keep_recursing = true;
            }
        }
        (false, keep_recursing)
    }

    /// Whitelist/blacklist prefix test for an archive entry path.
    pub fn archive_entry_in_scope(&self, entry_path: &str) -> bool {
        let whitelisted = self
            .whitelist
            .iter()
            .any(|w| entry_path.starts_with(w.as_str()) || w == "/");
        whitelisted
            && !self
                .blacklist
                .iter()
                .any(|b| entry_path.starts_with(b.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_scans_everything() {
        let f = PathFilter::from_packages::<&str>(&[]);
        assert_eq!(f.whitelist, vec!["/"]);
        assert!(f.archive_entry_in_scope("anything/at/all.class"));
        assert_eq!(f.directory_scope("/"), (true, false));
    }

    #[test]
    fn empty_entry_scans_everything() {
        let f = PathFilter::from_packages(&["com.xyz", ""]);
        assert_eq!(f.whitelist, vec!["/"]);
    }

    #[test]
    fn translates_packages_and_blacklist() {
        let f = PathFilter::from_packages(&["com.xyz.widget", "-com.xyz.widget.internal"]);
        assert_eq!(f.whitelist, vec!["com/xyz/widget/"]);
        assert_eq!(f.blacklist, vec!["com/xyz/widget/internal/"]);
        assert!(f.archive_entry_in_scope("com/xyz/widget/W.class"));
        assert!(!f.archive_entry_in_scope("com/xyz/widget/internal/I.class"));
        assert!(!f.archive_entry_in_scope("com/other/O.class"));
    }

    #[test]
    fn prefix_on_both_lists_is_blacklisted() {
        let f = PathFilter::from_packages(&["com.a", "com.b", "-com.b"]);
        assert_eq!(f.whitelist, vec!["com/a/"]);
        assert!(!f.archive_entry_in_scope("com/b/B.class"));
    }

    #[test]
    fn directory_scope_recurses_toward_whitelist() {
        let f = PathFilter::from_packages(&["com.xyz.widget"]);
        // Root always keeps recursing.
        assert_eq!(f.directory_scope("/"), (false, true));
        // On the way down toward the whitelisted package.
        assert_eq!(f.directory_scope("com/"), (false, true));
        assert_eq!(f.directory_scope("com/xyz/"), (false, true));
        // The whitelisted directory itself.
        assert_eq!(f.directory_scope("com/xyz/widget/"), (true, false));
        // A sibling subtree that can never reach the whitelist.
        assert_eq!(f.directory_scope("org/"), (false, false));
    }

    #[test]
    fn blacklisted_directory_is_pruned() {
        let f = PathFilter::from_packages(&["w", "-w.b"]);
        assert!(f.prunes_directory("w/b/"));
        assert!(!f.prunes_directory("w/"));
    }
}

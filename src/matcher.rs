use std::io::Read;
use std::path::Path;

use regex::Regex;

use crate::classfile::ConstantValue;
use crate::error::ScanError;

/// What a loader knows a qualified name to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
    Annotation,
}

/// Caller-supplied collaborator that turns a matched qualified name into a
/// runtime handle. The scanner never loads anything itself.
///
/// `kind_of` backs registration validation; returning `None` means the
/// loader cannot classify the name and validation is skipped.
pub trait TypeLoader {
    type Handle;

    fn kind_of(&self, qualified_name: &str) -> Option<TypeKind>;

    fn load(&mut self, qualified_name: &str) -> anyhow::Result<Self::Handle>;
}

/// Loader that classifies nothing and "loads" a name by returning it.
/// Used by the CLI and anywhere a name is all the caller needs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NameLoader;

impl TypeLoader for NameLoader {
    type Handle = String;

    fn kind_of(&self, _qualified_name: &str) -> Option<TypeKind> {
        None
    }

    fn load(&mut self, qualified_name: &str) -> anyhow::Result<String> {
        Ok(qualified_name.to_string())
    }
}

pub type ClassCallback<H> = Box<dyn FnMut(H)>;
pub type FieldCallback = Box<dyn FnMut(&str, &str, ConstantValue)>;
pub type FileCallback = Box<dyn FnMut(&Path, &str, &mut dyn Read) -> anyhow::Result<()>>;

/// One registered graph query, checked against the finalized graph after a
/// scan, in registration order.
pub(crate) enum ClassMatcher<H> {
    SubclassesOf {
        superclass: String,
        callback: ClassCallback<H>,
    },
    SubinterfacesOf {
        superinterface: String,
        callback: ClassCallback<H>,
    },
    Implementing {
        interface: String,
        callback: ClassCallback<H>,
    },
    AnnotatedWith {
        annotation: String,
        callback: ClassCallback<H>,
    },
}

/// A path pattern plus the callback to feed matching file streams to.
/// The pattern is anchored at compile time so it must cover the whole
/// relative path, not just a substring of it.
pub(crate) struct FilePathMatcher {
    pattern: Regex,
    callback: FileCallback,
}

impl FilePathMatcher {
    pub(crate) fn new(pattern: &str, callback: FileCallback) -> Result<Self, ScanError> {
        let anchored = format!(r"\A(?:{pattern})\z");
        let compiled = Regex::new(&anchored).map_err(|source| ScanError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            pattern: compiled,
            callback,
        })
    }

    pub(crate) fn matches(&self, relative_path: &str) -> bool {
        self.pattern.is_match(relative_path)
    }

    pub(crate) fn invoke(
        &mut self,
        absolute_path: &Path,
        relative_path: &str,
        stream: &mut dyn Read,
    ) -> anyhow::Result<()> {
        (self.callback)(absolute_path, relative_path, stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_must_match_whole_path() {
        let m = FilePathMatcher::new(r".*\.txt", Box::new(|_, _, _| Ok(()))).unwrap();
        assert!(m.matches("w/greeting.txt"));
        assert!(!m.matches("w/greeting.txt.bak"));
    }

    #[test]
    fn invalid_pattern_is_rejected_at_registration() {
        let result = FilePathMatcher::new(r"(unclosed", Box::new(|_, _, _| Ok(())));
        assert!(matches!(result, Err(ScanError::InvalidPattern { .. })));
    }
}

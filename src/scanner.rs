use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::classfile::ConstantValue;
use crate::error::ScanError;
use crate::filter::PathFilter;
use crate::graph::ClassGraph;
use crate::matcher::{ClassMatcher, FieldCallback, FilePathMatcher, TypeKind, TypeLoader};
use crate::scan::ScanContext;

/// Scanner facade: owns the roots, the package filter, every registered
/// matcher, the shadowing set, the relation graph and the last-modified
/// high-water mark. Registration methods are chainable; `scan` traverses
/// the roots, finalizes the graph and dispatches matches in registration
/// order.
pub struct ClasspathScanner<L: TypeLoader> {
    roots: Vec<PathBuf>,
    filter: PathFilter,
    loader: L,
    class_matchers: Vec<ClassMatcher<L::Handle>>,
    path_matchers: Vec<FilePathMatcher>,
    field_targets: HashMap<String, HashMap<String, usize>>,
    field_callbacks: Vec<FieldCallback>,
    encountered: HashSet<String>,
    graph: ClassGraph,
    last_modified: Option<SystemTime>,
    use_archive_entry_timestamps: bool,
}

impl<L: TypeLoader> ClasspathScanner<L> {
    /// Builds a scanner over an ordered list of roots and a package filter.
    ///
    /// Roots are deduplicated preserving order, and roots that do not exist
    /// are dropped. Package filter entries are dotted prefixes; a leading
    /// `-` blacklists, an empty entry (or an empty list) scans everything.
    pub fn new<S: AsRef<str>>(roots: Vec<PathBuf>, packages: &[S], loader: L) -> Self {
        let mut seen = HashSet::new();
        let roots = roots
            .into_iter()
            .filter(|p| seen.insert(p.clone()) && p.exists())
            .collect();
        Self {
            roots,
            filter: PathFilter::from_packages(packages),
            loader,
            class_matchers: Vec::new(),
            path_matchers: Vec::new(),
            field_targets: HashMap::new(),
            field_callbacks: Vec::new(),
            encountered: HashSet::new(),
            graph: ClassGraph::new(),
            last_modified: None,
            use_archive_entry_timestamps: false,
        }
    }

    /// Trust per-entry timestamps inside archives instead of the archive
    /// file's own modification time. Off by default.
    pub fn use_archive_entry_timestamps(mut self, enabled: bool) -> Self {
        self.use_archive_entry_timestamps = enabled;
        self
    }

    /// Registers a callback for every class that transitively extends
    /// `superclass_name`. Fails if the loader knows the name to be an
    /// interface.
    pub fn register_subclass_match(
        &mut self,
        superclass_name: &str,
        callback: impl FnMut(L::Handle) + 'static,
    ) -> Result<&mut Self, ScanError> {
        if matches!(
            self.loader.kind_of(superclass_name),
            Some(TypeKind::Interface | TypeKind::Annotation)
        ) {
            return Err(ScanError::NotAClass {
                name: superclass_name.to_string(),
            });
        }
        self.class_matchers.push(ClassMatcher::SubclassesOf {
            superclass: superclass_name.to_string(),
            callback: Box::new(callback),
        });
        Ok(self)
    }

    /// Registers a callback for every interface that transitively extends
    /// `superinterface_name`.
    pub fn register_subinterface_match(
        &mut self,
        superinterface_name: &str,
        callback: impl FnMut(L::Handle) + 'static,
    ) -> Result<&mut Self, ScanError> {
        if matches!(self.loader.kind_of(superinterface_name), Some(TypeKind::Class)) {
            return Err(ScanError::NotAnInterface {
                name: superinterface_name.to_string(),
            });
        }
        self.class_matchers.push(ClassMatcher::SubinterfacesOf {
            superinterface: superinterface_name.to_string(),
            callback: Box::new(callback),
        });
        Ok(self)
    }

    /// Registers a callback for every class that implements
    /// `interface_name`, directly or through a superclass or subinterface.
    pub fn register_implementation_match(
        &mut self,
        interface_name: &str,
        callback: impl FnMut(L::Handle) + 'static,
    ) -> Result<&mut Self, ScanError> {
        if matches!(self.loader.kind_of(interface_name), Some(TypeKind::Class)) {
            return Err(ScanError::NotAnInterface {
                name: interface_name.to_string(),
            });
        }
        self.class_matchers.push(ClassMatcher::Implementing {
            interface: interface_name.to_string(),
            callback: Box::new(callback),
        });
        Ok(self)
    }

    /// Registers a callback for every class carrying the annotation.
    pub fn register_annotation_match(
        &mut self,
        annotation_name: &str,
        callback: impl FnMut(L::Handle) + 'static,
    ) -> Result<&mut Self, ScanError> {
        if matches!(
            self.loader.kind_of(annotation_name),
            Some(TypeKind::Class | TypeKind::Interface)
        ) {
            return Err(ScanError::NotAnAnnotation {
                name: annotation_name.to_string(),
            });
        }
        self.class_matchers.push(ClassMatcher::AnnotatedWith {
            annotation: annotation_name.to_string(),
            callback: Box::new(callback),
        });
        Ok(self)
    }

    /// Registers a callback for a set of fully-qualified static final field
    /// names, e.g. `com.xyz.Widget.VERSION`. The callback receives the
    /// class name, the field name and the decoded constant initializer,
    /// delivered while the classfile is parsed. Entries without a class
    /// qualifier are ignored.
    pub fn register_static_final_field_match<S: AsRef<str>>(
        &mut self,
        field_names: &[S],
        callback: impl FnMut(&str, &str, ConstantValue) + 'static,
    ) -> &mut Self {
        let index = self.field_callbacks.len();
        self.field_callbacks.push(Box::new(callback));
        for qualified in field_names {
            let qualified = qualified.as_ref();
            match qualified.rsplit_once('.') {
                Some((class, field)) if !class.is_empty() => {
                    self.field_targets
                        .entry(class.to_string())
                        .or_default()
                        .insert(field.to_string(), index);
                }
                _ => {
                    tracing::debug!(
                        field = qualified,
                        "ignoring field match without a class qualifier"
                    );
                }
            }
        }
        self
    }

    /// Registers a callback for non-classfile paths matching the regular
    /// expression. The pattern must cover the whole relative path. The
    /// callback receives the absolute path, the relative path and a stream
    /// over the contents; the stream is closed when the callback returns.
    pub fn register_path_pattern_match(
        &mut self,
        pattern: &str,
        callback: impl FnMut(&Path, &str, &mut dyn Read) -> anyhow::Result<()> + 'static,
    ) -> Result<&mut Self, ScanError> {
        self.path_matchers
            .push(FilePathMatcher::new(pattern, Box::new(callback))?);
        Ok(self)
    }

    /// Performs a full scan: traverses every root, rebuilds the graph,
    /// finalizes it and runs the registered class matchers in registration
    /// order.
    pub fn scan(&mut self) -> Result<(), ScanError> {
        self.scan_internal(false)
    }

    /// Re-runs the traversal in timestamp-only mode and reports whether any
    /// in-scope file or directory changed since the last scan. Always true
    /// before the first scan.
    pub fn classpath_modified_since_last_scan(&mut self) -> Result<bool, ScanError> {
        let Some(previous) = self.last_modified else {
            return Ok(true);
        };
        self.scan_internal(true)?;
        Ok(self.last_modified > Some(previous))
    }

    fn scan_internal(&mut self, timestamps_only: bool) -> Result<(), ScanError> {
        self.encountered.clear();
        if !timestamps_only {
            self.graph.reset();
        }

        let roots = self.roots.clone();
        let mut ctx = ScanContext {
            filter: &self.filter,
            path_matchers: &mut self.path_matchers,
            field_targets: &self.field_targets,
            field_callbacks: &mut self.field_callbacks,
            encountered: &mut self.encountered,
            graph: &mut self.graph,
            last_modified: &mut self.last_modified,
            use_archive_entry_timestamps: self.use_archive_entry_timestamps,
            timestamps_only,
        };
        for root in &roots {
            ctx.scan_root(root)?;
        }

        if !timestamps_only {
            self.graph.finalize();
            self.dispatch_matches()?;
        }
        Ok(())
    }

    /// Runs every registered class matcher against the finalized graph,
    /// loading each matching name through the caller's loader. A loader
    /// failure aborts the remaining dispatch.
    fn dispatch_matches(&mut self) -> Result<(), ScanError> {
        let graph = &self.graph;
        let loader = &mut self.loader;
        for matcher in &mut self.class_matchers {
            let (names, callback) = match matcher {
                ClassMatcher::SubclassesOf { superclass, callback } => {
                    (graph.subclasses_of(superclass), callback)
                }
                ClassMatcher::SubinterfacesOf { superinterface, callback } => {
                    (graph.subinterfaces_of(superinterface), callback)
                }
                ClassMatcher::Implementing { interface, callback } => {
                    (graph.implementors_of(interface), callback)
                }
                ClassMatcher::AnnotatedWith { annotation, callback } => {
                    (graph.classes_with_annotation(annotation), callback)
                }
            };
            for name in names {
                let handle = loader.load(name).map_err(|error| ScanError::TypeLoad {
                    name: name.clone(),
                    error,
                })?;
                (*callback)(handle);
            }
        }
        Ok(())
    }

    pub fn names_of_subclasses_of(&self, superclass_name: &str) -> Vec<String> {
        self.graph.subclasses_of(superclass_name).to_vec()
    }

    pub fn names_of_superclasses_of(&self, subclass_name: &str) -> Vec<String> {
        self.graph.superclasses_of(subclass_name).to_vec()
    }

    pub fn names_of_subinterfaces_of(&self, superinterface_name: &str) -> Vec<String> {
        self.graph.subinterfaces_of(superinterface_name).to_vec()
    }

    pub fn names_of_superinterfaces_of(&self, subinterface_name: &str) -> Vec<String> {
        self.graph.superinterfaces_of(subinterface_name).to_vec()
    }

    pub fn names_of_classes_implementing(&self, interface_name: &str) -> Vec<String> {
        self.graph.implementors_of(interface_name).to_vec()
    }

    pub fn names_of_classes_with_annotation(&self, annotation_name: &str) -> Vec<String> {
        self.graph.classes_with_annotation(annotation_name).to_vec()
    }

    /// All class and interface names seen by the last scan, after whitelist,
    /// blacklist and shadowing.
    pub fn names_of_all_classes(&self) -> Vec<String> {
        self.graph.all_class_names().to_vec()
    }
}

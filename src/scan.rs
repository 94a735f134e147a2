//! Classpath traversal: directories recursively, archives by entry
//! iteration, plain files directly.
//!
//! The walk owns all per-scan mutation: it feeds classfile streams to the
//! header parser, non-classfile streams to registered path matchers, and
//! keeps the highest modification timestamp it has seen. In timestamp-only
//! mode nothing is parsed and no callback fires; only the timestamp moves.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use memmap2::Mmap;
use zip::ZipArchive;

use crate::classfile::read_classfile_header;
use crate::error::{ClassfileError, ScanError};
use crate::filter::PathFilter;
use crate::graph::ClassGraph;
use crate::matcher::{FieldCallback, FilePathMatcher};

/// Borrowed view of the scanner's per-scan state; lives for one traversal.
pub(crate) struct ScanContext<'a> {
    pub(crate) filter: &'a PathFilter,
    pub(crate) path_matchers: &'a mut [FilePathMatcher],
    pub(crate) field_targets: &'a HashMap<String, HashMap<String, usize>>,
    pub(crate) field_callbacks: &'a mut [FieldCallback],
    pub(crate) encountered: &'a mut HashSet<String>,
    pub(crate) graph: &'a mut ClassGraph,
    pub(crate) last_modified: &'a mut Option<SystemTime>,
    pub(crate) use_archive_entry_timestamps: bool,
    pub(crate) timestamps_only: bool,
}

impl ScanContext<'_> {
    pub(crate) fn scan_root(&mut self, root: &Path) -> Result<(), ScanError> {
        let meta = std::fs::metadata(root).map_err(|source| ScanError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        if meta.is_dir() {
            self.scan_dir(root, root, false)
        } else if is_archive(root) {
            self.scan_archive(root)
        } else {
            // A regular file listed directly as a root.
            let relative = root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.scan_file(root, &relative)
        }
    }

    fn scan_dir(&mut self, root: &Path, dir: &Path, in_whitelist: bool) -> Result<(), ScanError> {
        let relative = relative_dir_path(root, dir);
        if self.filter.prunes_directory(&relative) {
            return Ok(());
        }
        let (in_whitelist, keep_recursing) = if in_whitelist {
            (true, false)
        } else {
            self.filter.directory_scope(&relative)
        };
        if !in_whitelist && !keep_recursing {
            return Ok(());
        }

        self.touch_path(dir)?;
        let entries = std::fs::read_dir(dir).map_err(|source| ScanError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| ScanError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|source| ScanError::Io {
                path: path.clone(),
                source,
            })?;
            if file_type.is_dir() {
                self.scan_dir(root, &path, in_whitelist)?;
            } else if in_whitelist && file_type.is_file() {
                let relative_file =
                    format!("{relative}{}", entry.file_name().to_string_lossy());
                self.scan_file(&path, &relative_file)?;
            }
        }
        Ok(())
    }

    fn scan_file(&mut self, path: &Path, relative: &str) -> Result<(), ScanError> {
        self.touch_path(path)?;
        if self.timestamps_only {
            return Ok(());
        }

        if relative.ends_with(".class") {
            let file = File::open(path).map_err(|source| ScanError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let outcome = read_classfile_header(
                BufReader::new(file),
                self.encountered,
                self.field_targets,
            );
            self.handle_parse_outcome(path, outcome)
        } else {
            for i in 0..self.path_matchers.len() {
                if !self.path_matchers[i].matches(relative) {
                    continue;
                }
                let mut file = File::open(path).map_err(|source| ScanError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                self.path_matchers[i]
                    .invoke(path, relative, &mut file)
                    .map_err(|error| ScanError::Callback {
                        path: path.to_path_buf(),
                        error,
                    })?;
            }
            Ok(())
        }
    }

    /// Iterates an archive's entries. Archives inside archives are treated
    /// as opaque entries, never opened.
    fn scan_archive(&mut self, path: &Path) -> Result<(), ScanError> {
        let archive_mtime = modified_time(path)?;
        let file = File::open(path).map_err(|source| ScanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        // SAFETY: The archive is opened read-only and the mapping is dropped
        // before the file handle at the end of this scope.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|source| ScanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut archive =
            ZipArchive::new(Cursor::new(&mmap[..])).map_err(|source| ScanError::Archive {
                path: path.to_path_buf(),
                source,
            })?;

        let now = SystemTime::now();
        let mut future_warned = false;
        for index in 0..archive.len() {
            let (entry_path, entry_mtime) = {
                let entry = archive.by_index(index).map_err(|source| ScanError::Archive {
                    path: path.to_path_buf(),
                    source,
                })?;
                if entry.is_dir() {
                    continue;
                }
                let mtime = if self.use_archive_entry_timestamps {
                    dos_datetime_to_system_time(entry.last_modified())
                } else {
                    archive_mtime
                };
                (entry.name().to_string(), mtime)
            };

            if !self.filter.archive_entry_in_scope(&entry_path) {
                continue;
            }
            self.touch(entry_mtime);
            if entry_mtime > now && !future_warned {
                tracing::warn!(
                    archive = %path.display(),
                    "archive contains modification timestamps after the current time"
                );
                future_warned = true;
            }
            if self.timestamps_only {
                continue;
            }

            if entry_path.ends_with(".class") {
                let mut entry = archive.by_index(index).map_err(|source| ScanError::Archive {
                    path: path.to_path_buf(),
                    source,
                })?;
                let outcome =
                    read_classfile_header(&mut entry, self.encountered, self.field_targets);
                self.handle_parse_outcome(Path::new(&entry_path), outcome)?;
            } else {
                for i in 0..self.path_matchers.len() {
                    if !self.path_matchers[i].matches(&entry_path) {
                        continue;
                    }
                    let mut entry =
                        archive.by_index(index).map_err(|source| ScanError::Archive {
                            path: path.to_path_buf(),
                            source,
                        })?;
                    self.path_matchers[i]
                        .invoke(Path::new(&entry_path), &entry_path, &mut entry)
                        .map_err(|error| ScanError::Callback {
                            path: PathBuf::from(&entry_path),
                            error,
                        })?;
                }
            }
        }
        Ok(())
    }

    /// Malformed classfiles are diagnosed and skipped; real I/O failures
    /// abort the scan.
    fn handle_parse_outcome(
        &mut self,
        path: &Path,
        outcome: Result<Option<crate::classfile::ClassfileInfo>, ClassfileError>,
    ) -> Result<(), ScanError> {
        match outcome {
            Ok(Some(info)) => {
                for m in &info.field_matches {
                    (self.field_callbacks[m.callback])(&info.name, &m.field, m.value.clone());
                }
                if info.is_interface {
                    self.graph.add_interface(&info.name, &info.interfaces);
                } else {
                    self.graph.add_class(
                        &info.name,
                        &info.superclass,
                        &info.interfaces,
                        &info.annotations,
                    );
                }
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(ClassfileError::Io(source)) => Err(ScanError::Io {
                path: path.to_path_buf(),
                source,
            }),
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    %error,
                    "skipping malformed classfile"
                );
                Ok(())
            }
        }
    }

    fn touch_path(&mut self, path: &Path) -> Result<(), ScanError> {
        let mtime = modified_time(path)?;
        self.touch(mtime);
        Ok(())
    }

    fn touch(&mut self, mtime: SystemTime) {
        if self.last_modified.map_or(true, |current| mtime > current) {
            *self.last_modified = Some(mtime);
        }
    }
}

pub(crate) fn is_archive(path: &Path) -> bool {
    let lower = path.to_string_lossy().to_lowercase();
    lower.ends_with(".jar") || lower.ends_with(".zip")
}

fn modified_time(path: &Path) -> Result<SystemTime, ScanError> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|source| ScanError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Relative path of `dir` under `root`, slash-separated with a trailing
/// slash; the root itself is `/`.
fn relative_dir_path(root: &Path, dir: &Path) -> String {
    let relative = dir.strip_prefix(root).unwrap_or(dir);
    let mut out = String::new();
    for component in relative.components() {
        out.push_str(&component.as_os_str().to_string_lossy());
        out.push('/');
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Zip entry times are DOS date/time fields; converted through
/// days-from-civil into a `SystemTime`.
fn dos_datetime_to_system_time(dt: zip::DateTime) -> SystemTime {
    let days = days_from_civil(
        i64::from(dt.year()),
        i64::from(dt.month()),
        i64::from(dt.day()),
    );
    let secs = days * 86_400
        + i64::from(dt.hour()) * 3_600
        + i64::from(dt.minute()) * 60
        + i64::from(dt.second());
    if secs >= 0 {
        UNIX_EPOCH + Duration::from_secs(secs as u64)
    } else {
        UNIX_EPOCH
    }
}

/// Days since 1970-01-01 for a proleptic Gregorian date.
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

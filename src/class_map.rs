//! Class map and hierarchy traversal
//!
//! The inspected application is PHP, but the inspector never runs PHP.
//! Instead it works against statically known class metadata: each class is
//! a [`ClassInfo`] record (name, defining file, parent, declared traits)
//! and a [`ClassMap`] resolves names to records and walks inheritance
//! chains by iterative traversal.
//!
//! A map can be filled two ways:
//! - directly, from metadata the caller already has
//! - by scanning a PHP source tree with line-oriented pattern matching
//!   (namespace / use imports / class declarations / in-body trait use)

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Statically known metadata for one PHP class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassInfo {
    /// Fully qualified class name (e.g., "App\\Service\\Mailer")
    pub name: String,

    /// Defining source file. Absent for built-in classes and for ancestors
    /// the map does not know; the scanner skips file-less entries silently.
    pub file: Option<PathBuf>,

    /// Fully qualified parent class name, if the class extends one
    pub parent: Option<String>,

    /// Fully qualified names of traits this class uses directly
    pub traits: Vec<String>,
}

impl ClassInfo {
    /// A class the map knows nothing about beyond its name.
    ///
    /// Hierarchy chains end with such a stub when an ancestor is not in the
    /// map, so marker checks still see the ancestor's name.
    pub fn stub(name: impl Into<String>) -> Self {
        ClassInfo {
            name: name.into(),
            file: None,
            parent: None,
            traits: Vec::new(),
        }
    }
}

/// Name-to-metadata table for the inspected application's classes.
#[derive(Debug, Default)]
pub struct ClassMap {
    classes: HashMap<String, Arc<ClassInfo>>,
}

impl ClassMap {
    /// Create an empty class map
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class. A later insert for the same name replaces the
    /// earlier one.
    pub fn insert(&mut self, info: ClassInfo) {
        self.classes.insert(info.name.clone(), Arc::new(info));
    }

    /// Look up a class by fully qualified name
    pub fn get(&self, name: &str) -> Option<Arc<ClassInfo>> {
        self.classes.get(name).cloned()
    }

    /// Whether the map knows this class
    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Number of known classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// The inheritance chain for a class: the class itself first, then each
    /// ancestor in order.
    ///
    /// The chain ends at the first class without a parent. An ancestor the
    /// map does not know still appears, as a file-less stub, so callers can
    /// match marker names against the full chain. A parent cycle in a
    /// malformed map ends the chain instead of looping.
    pub fn hierarchy_of(&self, name: &str) -> Vec<Arc<ClassInfo>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(name.to_string());

        while let Some(class_name) = current {
            if !seen.insert(class_name.clone()) {
                debug!("Parent cycle at {} while walking hierarchy of {}", class_name, name);
                break;
            }

            match self.get(&class_name) {
                Some(info) => {
                    current = info.parent.clone();
                    chain.push(info);
                }
                None => {
                    chain.push(Arc::new(ClassInfo::stub(class_name)));
                    current = None;
                }
            }
        }

        chain
    }

    /// All traits declared anywhere in a class's inheritance chain
    pub fn traits_of_hierarchy(&self, name: &str) -> Vec<String> {
        self.hierarchy_of(name)
            .iter()
            .flat_map(|class| class.traits.iter().cloned())
            .collect()
    }

    /// Walk a directory tree and register every class declared in a `.php`
    /// file under it. Returns the number of classes found.
    ///
    /// Unreadable files are skipped with a debug log; they must not abort
    /// the walk.
    pub fn scan_php_sources(&mut self, root: &Path) -> Result<usize> {
        let mut count = 0;

        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("php") {
                continue;
            }

            let content = match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    debug!("Skipping unreadable PHP file {:?}: {}", path, e);
                    continue;
                }
            };

            for class in parse_php_classes(&content, path) {
                debug!("Found class {} in {:?}", class.name, path);
                self.insert(class);
                count += 1;
            }
        }

        info!("Class map scan of {:?} found {} classes", root, count);
        Ok(count)
    }

    /// Convenience: build a map by scanning one source tree
    pub fn from_php_sources(root: &Path) -> Result<Self> {
        let mut map = ClassMap::new();
        map.scan_php_sources(root)
            .with_context(|| format!("Failed to scan PHP sources under {:?}", root))?;
        Ok(map)
    }
}

lazy_static! {
    // Match: namespace App\Service;
    static ref NAMESPACE_RE: Regex =
        Regex::new(r"^\s*namespace\s+([A-Za-z0-9_\\]+)\s*;").unwrap();

    // Match file-level imports: use SR\Di\DiTrait; or use Foo\Bar as Baz;
    static ref IMPORT_RE: Regex =
        Regex::new(r"^\s*use\s+\\?([A-Za-z0-9_\\]+?)(?:\s+as\s+([A-Za-z0-9_]+))?\s*;").unwrap();

    // Match: class Mailer extends AbstractMailer (abstract/final allowed)
    static ref CLASS_RE: Regex =
        Regex::new(r"^\s*(?:abstract\s+|final\s+)?class\s+([A-Za-z0-9_]+)(?:\s+extends\s+(\\?[A-Za-z0-9_\\]+))?").unwrap();

    // Match trait use inside a class body: use DiTrait; or use A, B;
    static ref TRAIT_USE_RE: Regex =
        Regex::new(r"^\s*use\s+([\\A-Za-z0-9_,\s]+?)\s*;").unwrap();
}

/// Extract every class declared in one PHP file.
///
/// Line-oriented, not an AST: the namespace and file-level `use` imports are
/// collected until the first declaration, `class X extends Y` opens a class,
/// and `use T;` lines inside a class body are recorded as trait use. Brace
/// depth is tracked per line, which is as precise as the rest of the
/// pattern matching here needs.
pub fn parse_php_classes(content: &str, path: &Path) -> Vec<ClassInfo> {
    let mut classes = Vec::new();

    let mut namespace = String::new();
    let mut imports: HashMap<String, String> = HashMap::new();
    let mut depth: i32 = 0;
    let mut current: Option<ClassInfo> = None;

    for line in content.lines() {
        if depth == 0 {
            if let Some(caps) = NAMESPACE_RE.captures(line) {
                namespace = caps[1].to_string();
            } else if let Some(caps) = IMPORT_RE.captures(line) {
                let full = caps[1].to_string();
                let alias = caps
                    .get(2)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_else(|| last_segment(&full).to_string());
                imports.insert(alias, full);
            }

            if let Some(caps) = CLASS_RE.captures(line) {
                // Finalize a previous brace-balanced class on the same level
                if let Some(done) = current.take() {
                    classes.push(done);
                }

                let short_name = caps[1].to_string();
                let name = if namespace.is_empty() {
                    short_name
                } else {
                    format!("{}\\{}", namespace, short_name)
                };

                let parent = caps
                    .get(2)
                    .map(|m| resolve_name(m.as_str(), &namespace, &imports));

                current = Some(ClassInfo {
                    name,
                    file: Some(path.to_path_buf()),
                    parent,
                    traits: Vec::new(),
                });
            }
        } else if depth == 1 {
            // At class-body level, `use` pulls in traits
            if let (Some(class), Some(caps)) = (current.as_mut(), TRAIT_USE_RE.captures(line)) {
                for raw in caps[1].split(',') {
                    let raw = raw.trim();
                    if !raw.is_empty() {
                        class.traits.push(resolve_name(raw, &namespace, &imports));
                    }
                }
            }
        }

        let opens = line.matches('{').count() as i32;
        let closes = line.matches('}').count() as i32;
        let had_body = depth + opens > 0;
        depth = (depth + opens - closes).max(0);

        // A class is complete once its body braces balance out
        if had_body && depth == 0 {
            if let Some(done) = current.take() {
                classes.push(done);
            }
        }
    }

    if let Some(done) = current.take() {
        classes.push(done);
    }

    classes
}

/// Resolve a class reference against the file's namespace and imports.
///
/// `\Fully\Qualified` names are taken as-is, a leading segment matching an
/// import alias is expanded, anything else is prefixed with the current
/// namespace.
fn resolve_name(raw: &str, namespace: &str, imports: &HashMap<String, String>) -> String {
    if let Some(stripped) = raw.strip_prefix('\\') {
        return stripped.to_string();
    }

    let (first, rest) = match raw.split_once('\\') {
        Some((first, rest)) => (first, Some(rest)),
        None => (raw, None),
    };

    if let Some(full) = imports.get(first) {
        return match rest {
            Some(rest) => format!("{}\\{}", full, rest),
            None => full.clone(),
        };
    }

    if namespace.is_empty() {
        raw.to_string()
    } else {
        format!("{}\\{}", namespace, raw)
    }
}

fn last_segment(name: &str) -> &str {
    name.rsplit('\\').next().unwrap_or(name)
}

//! collection of ydl documents (top-level key, value and path to source file)
//!
//! Every `.ydl` file contributes one top-level key to the merged tree: its file stem.
//! `persons.ydl` becomes `persons`, so a file's entries are addressed as
//! `ydl:/persons/<entry>`.
//!
//! Documents are merged in load order, later documents taking priority over earlier ones
//! ([Value::merge]). [YdlDocuments::load_chain] loads the outermost directory first, so files
//! near the working directory override system wide ones.
use crate::value::{Value, ValueError};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

pub const FILE_EXTENSION: &str = "ydl";

#[derive(Default, Debug)]
pub struct YdlDocuments {
    sources: Vec<Source>,
    documents: Vec<Document>,
}

#[derive(Debug, Clone, PartialEq)]
struct Document {
    source_index: usize,
    key: String,
    value: Value,
}

impl YdlDocuments {
    /// Inserts a document under the top-level `key`
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: Value,
        path: impl Into<Option<PathBuf>>,
    ) {
        let source_index = self.sources.len();
        self.sources.push(path.into());
        self.documents.push(Document {
            source_index,
            key: key.into(),
            value,
        });
    }

    /// Inserts every top-level entry of `tree` as a document of its own
    pub fn insert_tree(
        &mut self,
        tree: Value,
        path: impl Into<Option<PathBuf>>,
    ) -> Result<(), LoadError> {
        let path = path.into();
        let Value::Mapping(entries) = tree else {
            return Err(LoadError::NotAMapping(display_source(&path)));
        };

        let source_index = self.sources.len();
        self.sources.push(path);
        for (key, value) in entries {
            self.documents.push(Document {
                source_index,
                key,
                value,
            });
        }
        Ok(())
    }

    pub fn documents(&self) -> impl Iterator<Item = SourceDocument> {
        self.documents.iter().map(|document| {
            (
                &self.sources[document.source_index],
                document.key.as_str(),
                &document.value,
            )
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.documents.iter().map(|document| document.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// All documents merged into one tree, later documents taking priority
    pub fn merged(&self) -> Value {
        let mut tree = Value::Mapping(IndexMap::new());
        for document in &self.documents {
            tree.merge(Value::Mapping(IndexMap::from([(
                document.key.clone(),
                document.value.clone(),
            )])));
        }
        tree
    }
}

impl YdlDocuments {
    pub fn load_file(&mut self, file_path: &Path) -> Result<(), LoadError> {
        let file_path = file_path.canonicalize()?;
        tracing::info!(path=%file_path.display(), "loading file");

        let key = file_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .ok_or_else(|| LoadError::NoFileName(file_path.clone()))?;

        let file_contents = std::fs::read_to_string(&file_path)?;
        let yaml: serde_yaml::Value = if file_contents.trim().is_empty() {
            serde_yaml::Value::Null
        } else {
            serde_yaml::from_str(&file_contents).map_err(|source| LoadError::Parse {
                path: file_path.clone(),
                source,
            })?
        };

        // a file without entries (only comments, say) still claims its key
        let value = if yaml.is_null() {
            Value::Mapping(IndexMap::new())
        } else {
            Value::try_from(yaml).map_err(|source| LoadError::Value {
                path: file_path.clone(),
                source,
            })?
        };

        self.insert(key, value, Some(file_path));
        Ok(())
    }

    /// Loads all `.ydl` files of `dir_path` in file name order
    pub fn load_directory(&mut self, dir_path: &Path) -> Result<(), LoadError> {
        let file_paths = ydl_files(dir_path)?;
        if file_paths.is_empty() {
            return Err(LoadError::NoFilesFound);
        }

        for file_path in file_paths {
            self.load_file(&file_path)?;
        }
        Ok(())
    }

    /// Loads the `.ydl` files of `start` and of the directories above it
    ///
    /// Walks up from `start` until a directory has no `.ydl` files, then loads the outermost
    /// directory first, so files closer to `start` take priority.
    pub fn load_chain(&mut self, start: &Path) -> Result<(), LoadError> {
        let start = start.canonicalize()?;

        let mut chain = Vec::new();
        for dir in start.ancestors() {
            let file_paths = match ydl_files(dir) {
                Ok(file_paths) => file_paths,
                Err(LoadError::IoError(err)) if dir != start.as_path() => {
                    tracing::debug!(dir=%dir.display(), %err, "chain ends at unreadable directory");
                    break;
                }
                Err(err) => return Err(err),
            };

            if file_paths.is_empty() {
                break;
            }
            chain.push(file_paths);
        }

        if chain.is_empty() {
            return Err(LoadError::NoFilesFound);
        }

        for file_path in chain.into_iter().rev().flatten() {
            self.load_file(&file_path)?;
        }
        Ok(())
    }
}

fn ydl_files(dir_path: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let mut file_paths = Vec::new();

    for dir_entry in std::fs::read_dir(dir_path)? {
        let dir_entry = dir_entry?;
        if !dir_entry.file_type()?.is_file() {
            continue;
        }

        let file_path = dir_entry.path();
        if file_path.extension().is_some_and(|ext| ext == FILE_EXTENSION) {
            file_paths.push(file_path);
        }
    }

    file_paths.sort();
    Ok(file_paths)
}

fn display_source(source: &Source) -> String {
    match source {
        Some(path) => path.display().to_string(),
        None => "<inline>".to_string(),
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("No files found in directory")]
    NoFilesFound,
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    #[error("Unable to parse yaml file '{}'", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("Unsupported value in '{}'", .path.display())]
    Value { path: PathBuf, source: ValueError },
    #[error("No file name in '{}'", .0.display())]
    NoFileName(PathBuf),
    #[error("Top level of '{0}' is not a mapping")]
    NotAMapping(String),
}

impl From<Value> for YdlDocuments {
    /// One document per top-level key; anything but a mapping becomes a single document `""`
    fn from(value: Value) -> Self {
        let mut documents = YdlDocuments::default();
        if let Value::Mapping(entries) = value {
            documents.sources.push(None);
            for (key, value) in entries {
                documents.documents.push(Document {
                    source_index: 0,
                    key,
                    value,
                });
            }
        } else {
            documents.insert("", value, None);
        }
        documents
    }
}

/// Utility macro to create [YdlDocuments]
///
/// Create from a single tree, one document per top-level key
/// ```
/// # use ydl::ydl_documents;
/// let documents = ydl_documents!("persons: { bob: { name: Bob } }");
/// assert_eq!(documents.keys().collect::<Vec<_>>(), vec!["persons"]);
/// ```
///
/// Create from multiple documents (top-level key required)
/// ```
/// # use ydl::ydl_documents;
/// let documents = ydl_documents! {
///   "persons" => "bob: { name: Bob }",
///   "lawyers" => "ded: { name: Ded }"
/// };
/// assert_eq!(documents.len(), 2);
/// ```
///
/// # Panic
/// Panics on invalid input
///
/// ```should_panic
/// # use ydl::ydl_documents;
/// ydl_documents!("not: [valid");
/// ```
#[macro_export]
macro_rules! ydl_documents {
    // single tree without source
    { $expr:expr } => {
        $crate::documents::YdlDocuments::from(
            $expr.parse::<$crate::value::Value>().expect("document must parse")
        )
    };
    // multiple documents, each under its own key
    { $($key:expr => $expr:expr),+ $(,)? } => {{
        let mut docs = $crate::documents::YdlDocuments::default();
        $(
            docs.insert(
                $key,
                $expr.parse::<$crate::value::Value>().expect("document must parse"),
                None,
            );
        )+

        docs
    }};
}

pub type Source = Option<PathBuf>;
pub type SourceDocument<'a> = (&'a Source, &'a str, &'a Value);

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fixture_dir(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join(name)
    }

    #[test]
    fn later_documents_take_priority() {
        let documents = ydl_documents! {
            "persons" => "bob: { name: Bob, city: Springfield }",
            "courts" => "[district]",
            "persons" => "bob: { city: Shelbyville }\nalice: { name: Alice }",
        };

        let expected: Value = r#"
persons:
  bob: { name: Bob, city: Shelbyville }
  alice: { name: Alice }
courts: [district]
"#
        .parse()
        .unwrap();
        assert_eq!(documents.merged(), expected);
        assert_eq!(documents.source_count(), 3);
    }

    #[test]
    fn single_tree_is_split_per_key() {
        let documents = ydl_documents!("a: 1\nb: { c: 2 }");
        assert_eq!(documents.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(documents.source_count(), 1);
        assert!(documents.documents().all(|(source, _, _)| source.is_none()));
    }

    #[test]
    fn insert_tree_requires_a_mapping() {
        let mut documents = YdlDocuments::default();
        let err = documents
            .insert_tree(Value::from(vec![1i64, 2]), None)
            .expect_err("sequence at top level");
        assert_eq!(err.to_string(), "Top level of '<inline>' is not a mapping");
        assert!(documents.is_empty());
    }

    #[test]
    fn directory_is_loaded_in_file_name_order() {
        let mut documents = YdlDocuments::default();
        documents
            .load_directory(&fixture_dir("chain").join("outer"))
            .unwrap();

        assert_eq!(
            documents.keys().collect::<Vec<_>>(),
            vec!["empty", "lawyers", "persons"]
        );
        assert_eq!(
            documents.merged().get("empty"),
            Some(&Value::Mapping(IndexMap::new()))
        );
    }

    #[test]
    fn nearer_directories_win() {
        let mut documents = YdlDocuments::default();
        documents
            .load_chain(&fixture_dir("chain").join("outer").join("inner"))
            .unwrap();

        let keys: Vec<_> = documents.keys().collect();
        let outer = keys.iter().position(|key| *key == "lawyers").unwrap();
        let inner = keys.iter().rposition(|key| *key == "persons").unwrap();
        assert!(outer < inner);

        let bob = documents.merged().get("persons").and_then(|p| p.get("bob")).cloned();
        let expected: Value = "{ name: Bob, city: Shelbyville }".parse().unwrap();
        assert_eq!(bob, Some(expected));
    }

    #[test]
    fn chain_needs_files_at_the_start() {
        let mut documents = YdlDocuments::default();
        let err = documents
            .load_chain(&fixture_dir("chain"))
            .expect_err("no ydl files");
        assert!(matches!(err, LoadError::NoFilesFound));
    }

    #[test]
    fn empty_directory() {
        let mut documents = YdlDocuments::default();
        let err = documents
            .load_directory(&fixture_dir("chain"))
            .expect_err("no ydl files");
        assert!(matches!(err, LoadError::NoFilesFound));
    }

    #[test]
    fn invalid_files_name_their_path() {
        let mut documents = YdlDocuments::default();
        let err = documents
            .load_file(&fixture_dir("invalid").join("nulls.ydl"))
            .expect_err("null entry");

        assert!(matches!(
            &err,
            LoadError::Value { path, source: ValueError::Null(at) }
                if path.ends_with("nulls.ydl") && at == "/bob/city"
        ));
    }
}

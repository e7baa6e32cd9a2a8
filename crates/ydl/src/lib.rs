//! # ydl - yaml data library with cross-references
//!
//! ## Introduction for developers
//!
//! Read this to understand how `ydl` works internally.
//!
//! ### Loading files
//!
//! Every `.ydl` file is a YAML document. Its file stem becomes a top-level key of the merged
//! tree: the entries of `persons.ydl` live under `persons`. [documents::YdlDocuments] keeps
//! the loaded documents with their source path and merges them ([value::Value::merge]), later
//! documents taking priority.
//!
//! At this point the documents only have to be valid YAML without nulls. Scalars are typed
//! during conversion to [value::Value]: booleans, integers, decimals, strings and dates
//! (strings of the exact form `YYYY-MM-DD`).
//!
//! ### Cross-references
//!
//! A string of the form `ydl:/lawyers/ded/address` is a cross-reference
//! ([reference::Syntax]). It names an absolute position in the merged tree. Segments are
//! mapping keys, or sequence indices (0-based) if they are all digits.
//!
//! ```yaml
//! # lawyers.ydl
//! ded:
//!   name: Ded Doherty
//!   address: ydl:/addresses/office
//!
//! # addresses.ydl
//! office:
//!   city: Topeka
//! ```
//!
//! After resolution `ydl:/lawyers/ded/address` holds a copy of `ydl:/addresses/office`.
//!
//! ### Building the tree
//!
//! see [tree::Tree::new]
//!
//! The merged tree is walked once. Each position becomes a [node::Node]. While walking we
//! record dependencies in a [dependency_queue::DependencyQueue]:
//! - a cross-reference depends on its target
//! - a container depends on each of its children that is not resolved yet
//!
//! Nodes also get a class while walking: the [binder::ClassBinder] maps the key of a
//! container (`persons`) to the class of its children (`Person`).
//!
//! ### Resolving
//!
//! see [tree::Tree::resolve]
//!
//! - targets are checked: referencing an ancestor or a descendant is circular, a target that
//!   does not exist is an error unless the path passes through another cross-reference
//! - the dependencies are sorted topologically, a cycle is an error naming its members
//! - in that order every cross-reference is replaced by a deep copy of its (resolved) target
//!
//! ### Instantiation
//!
//! see [tree::Tree::instantiate]
//!
//! Once everything is resolved, nodes with a class are handed to the binder bottom up. A
//! constructed object replaces the plain value ([binder::Object]). Construction failures are
//! logged and the node keeps its plain value.
//!
//! ```
//! use ydl::binder::NoClasses;
//! use ydl::reference::Syntax;
//! use ydl::tree::Tree;
//! use ydl::ydl_documents;
//!
//! let documents = ydl_documents! {
//!     "addresses" => "office: { city: Topeka }",
//!     "lawyers" => "ded: { name: Ded Doherty, address: 'ydl:/addresses/office' }"
//! };
//!
//! let value = Tree::load(documents.merged(), &NoClasses, Syntax::default()).unwrap();
//! let city = value
//!     .get("lawyers")
//!     .and_then(|lawyers| lawyers.get("ded"))
//!     .and_then(|ded| ded.get("address"))
//!     .and_then(|address| address.get("city"));
//! assert_eq!(city.and_then(|city| city.as_str()), Some("Topeka"));
//! ```
pub mod binder;
pub mod config;
pub mod dependency_queue;
pub mod documents;
pub mod node;
pub mod reference;
pub mod tree;
pub mod value;
mod visit;

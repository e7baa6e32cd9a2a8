//! resolving and instantiating a merged raw tree
//!
//! [Tree::load] runs the whole pipeline:
//! 1. build: one [Node] per position, collecting dependencies in a [DependencyQueue]
//! 2. order: topological order of all dependencies, cycles are fatal
//! 3. resolve: substitute a deep copy of the target for every cross-reference
//! 4. instantiate: bottom up, construct objects where the [ClassBinder] knows a class
//! 5. externalize: render the tree as a plain [Value]
//!
//! Instantiation only starts once every cross-reference has been substituted, so
//! constructors never see a reference string where they expect the referenced data.
use crate::binder::{ClassBinder, ClassId};
use crate::dependency_queue::DependencyQueue;
use crate::node::{Builder, Node, State};
use crate::reference::{Path, Syntax};
use crate::value::Value;
use crate::visit::{VisitMut, VisitNodes, VisitNodesMut};
use std::collections::HashMap;

/// A tree being resolved
///
/// Owns its nodes and its dependencies; trees never share either.
pub struct Tree<'b> {
    root: Node,
    queue: DependencyQueue<Path>,
    syntax: Syntax,
    binder: &'b dyn ClassBinder,
    /// [ClassBinder::class_for] per container key
    classes: HashMap<String, Option<ClassId>>,
}

impl<'b> Tree<'b> {
    pub fn new(raw: Value, binder: &'b dyn ClassBinder, syntax: Syntax) -> Self {
        let mut queue = DependencyQueue::new();
        let mut classes = HashMap::new();

        let root = Node::build(
            Path::root(),
            String::new(),
            raw,
            None,
            &mut BuildContext {
                syntax: &syntax,
                binder,
                classes: &mut classes,
                queue: &mut queue,
            },
        );
        tracing::debug!(dependencies = queue.len(), "tree built");

        Self {
            root,
            queue,
            syntax,
            binder,
            classes,
        }
    }

    /// Build, resolve and instantiate `raw`
    pub fn load(
        raw: Value,
        binder: &'b dyn ClassBinder,
        syntax: Syntax,
    ) -> Result<Value, ResolveError> {
        let mut tree = Tree::new(raw, binder, syntax);
        tree.resolve()?.instantiate();
        Ok(tree.into_value())
    }

    /// Substitute every cross-reference
    ///
    /// Consumes the collected dependencies once resolution succeeds, calling this again is then
    /// a no-op. After an error the dependencies are kept and the next call fails again.
    pub fn resolve(&mut self) -> Result<&mut Self, ResolveError> {
        if self.queue.is_empty() {
            return Ok(self);
        }

        let mut queue = std::mem::take(&mut self.queue);
        if let Err(err) = self.resolve_queue(&mut queue) {
            self.queue = queue;
            return Err(err);
        }

        Ok(self)
    }

    fn resolve_queue(&mut self, queue: &mut DependencyQueue<Path>) -> Result<(), ResolveError> {
        self.link_references(queue)?;

        let order = queue.topological_order().map_err(|err| {
            ResolveError::CircularReference {
                cycle: err.cycle.iter().map(|path| self.syntax.format(path)).collect(),
            }
        })?;
        tracing::debug!(count = order.len(), "resolving in dependency order");

        for path in &order {
            self.resolve_at(path)?;
        }

        Ok(())
    }

    /// Check every pending cross-reference before ordering
    ///
    /// - a reference to itself, an ancestor or a descendant can never resolve
    /// - a target that does not exist yet must lie behind another cross-reference. It
    ///   depends on that reference and is looked up again after the substitution.
    fn link_references(&self, queue: &mut DependencyQueue<Path>) -> Result<(), ResolveError> {
        let mut references = Vec::new();
        self.root.visit_nodes(&mut |node: &Node| {
            if let Some(target) = node.reference() {
                references.push((node.path().clone(), target.clone()));
            }
        });

        for (dependent, target) in references {
            if dependent.starts_with(&target) || target.starts_with(&dependent) {
                let mut cycle = vec![self.syntax.format(&dependent)];
                if target != dependent {
                    cycle.push(self.syntax.format(&target));
                }
                return Err(ResolveError::CircularReference { cycle });
            }

            let (reached, depth) = self.root.deepest(target.segments());
            if depth == target.len() {
                continue;
            }

            if reached.reference().is_none() {
                return Err(self.bad_reference(&target, depth));
            }

            tracing::trace!(%target, through=%reached.path(), "target behind a cross-reference");
            queue.add_dependency(target, [reached.path().clone()]);
        }

        Ok(())
    }

    fn resolve_at(&mut self, path: &Path) -> Result<(), ResolveError> {
        // positions behind a cross-reference only exist once it is substituted
        let Some(node) = self.root.descend(path.segments()) else {
            return Ok(());
        };

        match node.state() {
            State::Reference { target, .. } => {
                let target = target.clone();
                let key = node.key().to_string();
                let class = node.class().cloned();
                let value = self.node_at_path(&target)?.to_params();

                let mut unused = DependencyQueue::new();
                let replacement = Node::build(
                    path.clone(),
                    key,
                    value,
                    class,
                    &mut BuildContext {
                        syntax: &self.syntax,
                        binder: self.binder,
                        classes: &mut self.classes,
                        queue: &mut unused,
                    },
                );

                if let Some(node) = self.root.descend_mut(path.segments()) {
                    *node = replacement;
                }
                tracing::trace!(%path, %target, "cross-reference substituted");
            }
            State::Composite(_) => {
                if let Some(node) = self.root.descend_mut(path.segments()) {
                    node.refresh_resolved();
                }
            }
            State::Scalar(_) | State::Instantiated(_) => {}
        }

        Ok(())
    }

    /// Construct objects bottom up
    ///
    /// Nodes whose construction fails keep their plain value.
    pub fn instantiate(&mut self) -> &mut Self {
        let mut instantiator = Instantiator::new(self.binder);
        self.root.visit_nodes_post_order_mut(&mut instantiator);
        tracing::debug!(
            constructed = instantiator.constructed,
            failed = instantiator.failed,
            "instantiation finished"
        );
        self
    }

    /// The node at `path`
    pub fn node_at_path(&self, path: &Path) -> Result<&Node, ResolveError> {
        let (node, depth) = self.root.deepest(path.segments());
        if depth < path.len() {
            return Err(self.bad_reference(path, depth));
        }
        Ok(node)
    }

    fn bad_reference(&self, path: &Path, depth: usize) -> ResolveError {
        ResolveError::BadReference {
            reference: self.syntax.format(path),
            reached: self.syntax.format(&path.prefix(depth)),
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Top-level entry
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.root.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.root.keys()
    }

    pub fn syntax(&self) -> &Syntax {
        &self.syntax
    }

    /// Whether a call to [Tree::resolve] is still outstanding
    pub fn is_resolved(&self) -> bool {
        self.root.is_resolved()
    }

    pub fn to_value(&self) -> Value {
        self.root.to_params()
    }

    pub fn into_value(self) -> Value {
        self.root.to_params()
    }
}

impl std::fmt::Debug for Tree<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("syntax", &self.syntax)
            .field("queue", &self.queue)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

struct BuildContext<'a> {
    syntax: &'a Syntax,
    binder: &'a dyn ClassBinder,
    classes: &'a mut HashMap<String, Option<ClassId>>,
    queue: &'a mut DependencyQueue<Path>,
}

impl Builder for BuildContext<'_> {
    fn child_class(&mut self, key: &str) -> Option<ClassId> {
        if let Some(class) = self.classes.get(key) {
            return class.clone();
        }

        let class = self.binder.class_for(key);
        if let Some(class) = &class {
            tracing::trace!(key, %class, "class for container");
        }
        self.classes.insert(key.to_string(), class.clone());
        class
    }

    fn reference(&self, text: &str) -> Option<Path> {
        self.syntax.parse(text)
    }

    fn depends(&mut self, dependent: &Path, depends_on: &Path) {
        self.queue
            .add_dependency(dependent.clone(), [depends_on.clone()]);
    }
}

#[derive(derive_new::new)]
struct Instantiator<'b> {
    binder: &'b dyn ClassBinder,
    #[new(default)]
    constructed: usize,
    #[new(default)]
    failed: usize,
}

impl VisitMut<Node> for Instantiator<'_> {
    fn visit_mut(&mut self, node: &mut Node) {
        if node.is_instantiated() || !node.is_resolved() {
            return;
        }
        let Some(class) = node.class().cloned() else {
            return;
        };

        let args = node.to_params();
        let constructor = self.binder.constructor_for(&class);
        match self.binder.construct(&class, &constructor, &args) {
            Ok(object) => {
                tracing::trace!(path=%node.path(), %class, "instantiated");
                node.set_object(object);
                self.constructed += 1;
            }
            Err(error) => {
                tracing::warn!(path=%node.path(), %class, %error, "construction failed, keeping plain value");
                self.failed += 1;
            }
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("can't resolve cross-reference '{reference}' beyond '{reached}'")]
    BadReference { reference: String, reached: String },
    #[error("circular reference: {}", .cycle.join(" -> "))]
    CircularReference { cycle: Vec<String> },
}

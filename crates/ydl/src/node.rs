//! nodes of the working tree
//!
//! A [Node] is one position of the merged raw tree while it is being resolved. Composite
//! values (mappings, sequences) are split into child nodes, strings are checked for the
//! reference syntax, and every other scalar is resolved from the start.
//!
//! | **raw value**                  | **state**                  | **resolved**            |
//! |--------------------------------|----------------------------|-------------------------|
//! | mapping / sequence             | [State::Composite]         | iff all children are    |
//! | string matching the syntax     | [State::Reference]         | no                      |
//! | other string, number, date ... | [State::Scalar]            | yes                     |
//! | constructed object             | [State::Instantiated]      | yes                     |
use crate::binder::{ClassId, Object};
use crate::reference::{Path, Segment};
use crate::value::Value;
use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Mapping,
    Sequence,
}

#[derive(Debug, Clone, PartialEq)]
pub enum State {
    /// A literal leaf value
    Scalar(Value),
    /// A cross-reference waiting for substitution
    Reference { text: String, target: Path },
    /// A container, its value is delegated to its children
    Composite(Shape),
    /// A constructed object
    Instantiated(Object),
}

/// What building a node needs from the tree it is part of
pub(crate) trait Builder {
    /// Class of the children of the container named `key`
    fn child_class(&mut self, key: &str) -> Option<ClassId>;

    /// Target of `text`, if it is a cross-reference
    fn reference(&self, text: &str) -> Option<Path>;

    fn depends(&mut self, dependent: &Path, depends_on: &Path);
}

#[derive(Debug, Clone)]
pub struct Node {
    path: Path,
    /// Key as written in the document (the index for sequence elements)
    key: String,
    state: State,
    children: IndexMap<Segment, Node>,
    class: Option<ClassId>,
    resolved: bool,
}

impl Node {
    /// Build the node for `value` at `path` and all nodes below it
    ///
    /// Every cross-reference found is recorded as a dependency of its node on the target path,
    /// and every container with an unresolved child depends on that child.
    pub(crate) fn build(
        path: Path,
        key: String,
        value: Value,
        class: Option<ClassId>,
        builder: &mut dyn Builder,
    ) -> Node {
        let mut node = Node {
            path,
            key,
            state: State::Composite(Shape::Mapping),
            children: IndexMap::new(),
            class,
            resolved: true,
        };

        match value {
            Value::Mapping(entries) => {
                let child_class = node.child_class(builder);
                for (key, value) in entries {
                    let segment = Segment::Key(key.clone());
                    node.adopt(segment, key, value, child_class.clone(), builder);
                }
            }
            Value::Sequence(items) => {
                node.state = State::Composite(Shape::Sequence);
                let child_class = node.child_class(builder);
                for (index, value) in items.into_iter().enumerate() {
                    node.adopt(
                        Segment::Index(index),
                        index.to_string(),
                        value,
                        child_class.clone(),
                        builder,
                    );
                }
            }
            Value::String(text) => match builder.reference(&text) {
                Some(target) => {
                    tracing::trace!(path=%node.path, %text, "cross-reference found");
                    builder.depends(&node.path, &target);
                    node.resolved = false;
                    node.state = State::Reference { text, target };
                }
                None => node.state = State::Scalar(Value::String(text)),
            },
            Value::Instance(object) => node.state = State::Instantiated(object),
            scalar @ (Value::Boolean(_)
            | Value::Integer(_)
            | Value::Decimal(_)
            | Value::Date(_)) => node.state = State::Scalar(scalar),
        }

        node
    }

    fn child_class(&self, builder: &mut dyn Builder) -> Option<ClassId> {
        if self.path.is_root() {
            return None;
        }
        builder.child_class(&self.key)
    }

    fn adopt(
        &mut self,
        segment: Segment,
        key: String,
        value: Value,
        class: Option<ClassId>,
        builder: &mut dyn Builder,
    ) {
        let child = Node::build(self.path.join(segment.clone()), key, value, class, builder);
        if !child.resolved {
            builder.depends(&self.path, &child.path);
            self.resolved = false;
        }
        self.children.insert(segment, child);
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn class(&self) -> Option<&ClassId> {
        self.class.as_ref()
    }

    /// No unresolved cross-reference in this node or below it
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn is_instantiated(&self) -> bool {
        matches!(self.state, State::Instantiated(_))
    }

    pub fn object(&self) -> Option<&Object> {
        match &self.state {
            State::Instantiated(object) => Some(object),
            _ => None,
        }
    }

    /// Target of a pending cross-reference
    pub fn reference(&self) -> Option<&Path> {
        match &self.state {
            State::Reference { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.children.values()
    }

    pub(crate) fn children_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.children.values_mut()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.children.values().map(|child| child.key.as_str())
    }

    pub fn child(&self, segment: &Segment) -> Option<&Node> {
        self.children.get(segment)
    }

    /// Child by key as written in the document, or by index
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.children.get(&Segment::Key(key.to_string()))
    }

    /// Follow `segments` as far as possible
    ///
    /// Returns the deepest node reached and the number of segments it took to get there.
    pub fn deepest(&self, segments: &[Segment]) -> (&Node, usize) {
        let mut node = self;
        for (depth, segment) in segments.iter().enumerate() {
            match node.children.get(segment) {
                Some(child) => node = child,
                None => return (node, depth),
            }
        }
        (node, segments.len())
    }

    pub fn descend(&self, segments: &[Segment]) -> Option<&Node> {
        match self.deepest(segments) {
            (node, depth) if depth == segments.len() => Some(node),
            _ => None,
        }
    }

    pub(crate) fn descend_mut(&mut self, segments: &[Segment]) -> Option<&mut Node> {
        let mut node = self;
        for segment in segments {
            node = node.children.get_mut(segment)?;
        }
        Some(node)
    }

    /// Recompute the resolved flag from the state and the children
    pub(crate) fn refresh_resolved(&mut self) {
        self.resolved = !matches!(self.state, State::Reference { .. })
            && self.children.values().all(|child| child.resolved);
    }

    pub(crate) fn set_object(&mut self, object: Object) {
        self.state = State::Instantiated(object);
    }

    /// Plain value of this node
    ///
    /// Instantiated nodes render as their object; containers render their children as a
    /// mapping or sequence. A pending cross-reference renders as its text.
    /// Containers keep the shape they were read with: mappings with numeric keys (or no keys
    /// at all) stay mappings.
    pub fn to_params(&self) -> Value {
        match &self.state {
            State::Instantiated(object) => Value::Instance(object.clone()),
            State::Scalar(value) => value.clone(),
            State::Reference { text, .. } => Value::String(text.clone()),
            State::Composite(Shape::Mapping) => Value::Mapping(
                self.children
                    .values()
                    .map(|child| (child.key.clone(), child.to_params()))
                    .collect(),
            ),
            State::Composite(Shape::Sequence) => {
                Value::Sequence(self.children.values().map(Node::to_params).collect())
            }
        }
    }
}

//! walking the node tree
use crate::node::Node;

/// Visitor over shared subjects
pub(crate) trait Visit<T> {
    fn visit(&mut self, value: &T);
}

/// Visitor that visits its subjects mutably
pub(crate) trait VisitMut<T> {
    fn visit_mut(&mut self, value: &mut T);
}

impl<T, F> Visit<T> for F
where
    F: FnMut(&T),
{
    fn visit(&mut self, value: &T) {
        self(value)
    }
}

impl<T, F> VisitMut<T> for F
where
    F: FnMut(&mut T),
{
    fn visit_mut(&mut self, value: &mut T) {
        self(value)
    }
}

/// Recursively visit all [Node]s
pub(crate) trait VisitNodes {
    /// Parents before their children
    fn visit_nodes(&self, visitor: &mut dyn Visit<Node>);
}

/// Recursively visit all [Node]s mutably
pub(crate) trait VisitNodesMut {
    /// Children before their parents
    fn visit_nodes_post_order_mut(&mut self, visitor: &mut dyn VisitMut<Node>);
}

impl VisitNodes for Node {
    fn visit_nodes(&self, visitor: &mut dyn Visit<Node>) {
        visitor.visit(self);
        for child in self.children() {
            child.visit_nodes(visitor);
        }
    }
}

impl VisitNodesMut for Node {
    fn visit_nodes_post_order_mut(&mut self, visitor: &mut dyn VisitMut<Node>) {
        for child in self.children_mut() {
            child.visit_nodes_post_order_mut(visitor);
        }
        visitor.visit_mut(self);
    }
}

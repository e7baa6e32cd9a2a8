//! dependencies between tree positions and their evaluation order
//!
//! [DependencyQueue] collects "X depends on Y" facts while a tree is built and hands out an
//! order in which every prerequisite comes before the positions depending on it.
use indexmap::{IndexMap, IndexSet};
use std::fmt;
use std::hash::Hash;

/// Dependents and their prerequisites, in insertion order
///
/// Every identifier that is named as a prerequisite is also a key (possibly without
/// prerequisites of its own), so [DependencyQueue::topological_order] visits it exactly once.
#[derive(Debug, Clone)]
pub struct DependencyQueue<T> {
    dependencies: IndexMap<T, IndexSet<T>>,
}

impl<T> Default for DependencyQueue<T> {
    fn default() -> Self {
        Self {
            dependencies: IndexMap::new(),
        }
    }
}

impl<T: Hash + Eq + Clone + fmt::Debug> DependencyQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `dependent` depends on each of `depends_on`
    ///
    /// Pass a single identifier as `[id]`.
    pub fn add_dependency<I>(&mut self, dependent: T, depends_on: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
    {
        let depends_on: Vec<T> = depends_on.into_iter().collect();

        self.dependencies
            .entry(dependent)
            .or_default()
            .extend(depends_on.iter().cloned());

        for prerequisite in depends_on {
            self.dependencies.entry(prerequisite).or_default();
        }

        self
    }

    /// Add an identifier without prerequisites
    pub fn insert(&mut self, id: T) -> &mut Self {
        self.dependencies.entry(id).or_default();
        self
    }

    pub fn contains(&self, id: &T) -> bool {
        self.dependencies.contains_key(id)
    }

    pub fn dependencies_of(&self, id: &T) -> Option<&IndexSet<T>> {
        self.dependencies.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&T, &IndexSet<T>)> {
        self.dependencies.iter()
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// All identifiers, each after everything it depends on
    ///
    /// Depth first over the identifiers in insertion order, so the result is stable for a given
    /// insertion order. Iterative, so deep chains do not exhaust the stack.
    pub fn topological_order(&self) -> Result<Vec<T>, CycleError<T>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Open,
            Done,
        }

        let ids: Vec<&T> = self.dependencies.keys().collect();
        let mut marks = vec![Mark::New; ids.len()];
        let mut order = Vec::with_capacity(ids.len());

        // (index of an open identifier, position of its next prerequisite)
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for start in 0..ids.len() {
            if marks[start] != Mark::New {
                continue;
            }

            marks[start] = Mark::Open;
            stack.push((start, 0));

            while let Some(&(current, next)) = stack.last() {
                let Some(prerequisite) = self.dependencies[current].get_index(next) else {
                    marks[current] = Mark::Done;
                    order.push(ids[current].clone());
                    stack.pop();
                    continue;
                };

                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }

                let Some(index) = self.dependencies.get_index_of(prerequisite) else {
                    continue;
                };

                match marks[index] {
                    Mark::New => {
                        marks[index] = Mark::Open;
                        stack.push((index, 0));
                    }
                    Mark::Open => {
                        let from = stack
                            .iter()
                            .position(|(open, _)| *open == index)
                            .unwrap_or(0);
                        let cycle = stack[from..]
                            .iter()
                            .map(|(open, _)| ids[*open].clone())
                            .collect();
                        tracing::debug!(?cycle, "dependency cycle");
                        return Err(CycleError { cycle });
                    }
                    Mark::Done => {}
                }
            }
        }

        Ok(order)
    }
}

/// The dependencies do not form a DAG
///
/// `cycle` lists the members in dependency order: each one depends on the next, the last one
/// depends on the first.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("dependency cycle between {cycle:?}")]
pub struct CycleError<T: fmt::Debug> {
    pub cycle: Vec<T>,
}

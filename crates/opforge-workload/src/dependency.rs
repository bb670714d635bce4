//! Dependency graph between the components of a collection
//!
//! Components name their dependencies; resolution turns those names into
//! indices into the collection's component list. Only direct edges are
//! stored. Cycles are not rejected at resolution time, they are reported by
//! [`DependencyGraph::detect_cycle`] and refused by
//! [`DependencyGraph::generation_order`].

use std::collections::HashMap;

use serde::Serialize;

use crate::component::ComponentWorkload;
use crate::error::{Result, WorkloadError};

/// Reference to a sibling component by position in the collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ComponentRef {
    pub index: usize,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Visited,
}

/// Direct dependency edges between named components, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    names: Vec<String>,
    edges: Vec<Vec<usize>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the declared dependencies of every component
    pub fn build(components: &[ComponentWorkload]) -> Result<Self> {
        Self::from_declarations(
            components
                .iter()
                .map(|c| (c.shared.name.as_str(), c.dependencies.as_slice())),
        )
    }

    /// Build from `(name, dependency names)` pairs
    pub fn from_declarations<'a, I, D>(declarations: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, D)>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        let declarations: Vec<(&str, Vec<String>)> = declarations
            .into_iter()
            .map(|(name, deps)| {
                (
                    name,
                    deps.into_iter().map(|d| d.as_ref().to_string()).collect(),
                )
            })
            .collect();

        let mut index: HashMap<&str, usize> = HashMap::new();
        for (position, (name, _)) in declarations.iter().enumerate() {
            if index.insert(name, position).is_some() {
                return Err(WorkloadError::DuplicateComponent {
                    name: name.to_string(),
                });
            }
        }

        let mut graph = Self::new();
        for (name, deps) in &declarations {
            let mut edges = Vec::with_capacity(deps.len());
            for dep in deps {
                let target = *index.get(dep.as_str()).ok_or_else(|| {
                    WorkloadError::UnresolvedDependency {
                        component: name.to_string(),
                        dependency: dep.clone(),
                    }
                })?;
                if !edges.contains(&target) {
                    edges.push(target);
                }
            }
            graph.names.push(name.to_string());
            graph.edges.push(edges);
        }

        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Direct dependencies of `name`, in declaration order
    pub fn dependencies_of(&self, name: &str) -> Option<Vec<&str>> {
        let index = self.index_of(name)?;
        Some(
            self.edges[index]
                .iter()
                .map(|&d| self.names[d].as_str())
                .collect(),
        )
    }

    /// Direct dependencies of the component at `index`
    pub fn refs_of(&self, index: usize) -> Vec<ComponentRef> {
        self.edges
            .get(index)
            .map(|edges| {
                edges
                    .iter()
                    .map(|&d| ComponentRef {
                        index: d,
                        name: self.names[d].clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every `(component, dependency)` edge
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.edges.iter().enumerate().flat_map(move |(from, to)| {
            to.iter()
                .map(move |&t| (self.names[from].as_str(), self.names[t].as_str()))
        })
    }

    /// First cycle found by a depth-first walk in insertion order
    pub fn detect_cycle(&self) -> Option<Vec<String>> {
        let mut marks = vec![Mark::Unvisited; self.names.len()];
        let mut stack = Vec::new();

        for node in 0..self.names.len() {
            if marks[node] == Mark::Unvisited
                && let Some(cycle) = self.visit(node, &mut marks, &mut stack)
            {
                return Some(cycle.into_iter().map(|i| self.names[i].clone()).collect());
            }
        }
        None
    }

    fn visit(&self, node: usize, marks: &mut [Mark], stack: &mut Vec<usize>) -> Option<Vec<usize>> {
        marks[node] = Mark::Visiting;
        stack.push(node);

        for &dep in &self.edges[node] {
            match marks[dep] {
                Mark::Visiting => {
                    let start = stack.iter().position(|&n| n == dep)?;
                    return Some(stack[start..].to_vec());
                }
                Mark::Unvisited => {
                    if let Some(cycle) = self.visit(dep, marks, stack) {
                        return Some(cycle);
                    }
                }
                Mark::Visited => {}
            }
        }

        stack.pop();
        marks[node] = Mark::Visited;
        None
    }

    /// Components ordered so every dependency precedes its dependents
    pub fn generation_order(&self) -> Result<Vec<&str>> {
        if let Some(cycle) = self.detect_cycle() {
            return Err(WorkloadError::CircularDependency { cycle });
        }

        let mut result = Vec::with_capacity(self.names.len());
        let mut visited = vec![false; self.names.len()];

        fn visit<'a>(
            node: usize,
            graph: &'a DependencyGraph,
            visited: &mut [bool],
            result: &mut Vec<&'a str>,
        ) {
            if visited[node] {
                return;
            }
            visited[node] = true;
            for &dep in &graph.edges[node] {
                visit(dep, graph, visited, result);
            }
            result.push(graph.names[node].as_str());
        }

        for node in 0..self.names.len() {
            visit(node, self, &mut visited, &mut result);
        }

        Ok(result)
    }

    /// Render each component with its direct dependencies
    pub fn render_tree(&self) -> String {
        let mut lines = Vec::new();

        for (node, name) in self.names.iter().enumerate() {
            lines.push(name.clone());
            let count = self.edges[node].len();
            for (i, &dep) in self.edges[node].iter().enumerate() {
                let connector = if i + 1 == count { "└── " } else { "├── " };
                lines.push(format!("{}{}", connector, self.names[dep]));
            }
        }

        lines.join("\n")
    }
}

//! Dependency resolution for component requests.
//!
//! Expands a set of requested component names into the full set of components
//! to install, ordered so that every dependency comes before its dependents.
//!
//! # Algorithm
//!
//! Depth-first search over the registry's internal dependencies with
//! white/gray/black marking:
//! - white: not visited yet
//! - gray: on the current DFS path (reaching one again is a cycle)
//! - black: finished, already placed in the install order
//!
//! A component is appended to the install order when it turns black (post-order),
//! which places its dependencies before it. Requested names are visited in request
//! order and dependencies in declaration order, so the result is deterministic and
//! resolving the same request twice yields the same order.
//!
//! External package requirements are aggregated by name along the way. The first
//! version seen in install order wins; other versions are kept as
//! [`PackageConflict`]s and surfaced as warnings.

pub mod dependency_graph;

use anyhow::Result;
use std::collections::{BTreeMap, HashMap};

use crate::core::GreaterError;
use crate::registry::{RegistryComponent, RegistryIndex};

pub use dependency_graph::DependencyGraph;

/// A package required with different versions by different components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageConflict {
    /// Package name
    pub name: String,
    /// Every distinct version requested, the chosen one first
    pub versions: Vec<String>,
    /// Components requiring the package, in install order
    pub required_by: Vec<String>,
}

/// Outcome of resolving a request.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The requested names, deduplicated, in request order
    pub requested: Vec<String>,
    /// Components to install, dependencies first
    pub components: Vec<RegistryComponent>,
    /// Names of [`components`](Self::components), same order
    pub order: Vec<String>,
    /// External packages to install, name to version
    pub packages: BTreeMap<String, String>,
    /// Packages requested with more than one version
    pub package_conflicts: Vec<PackageConflict>,
    /// Dependency edges between the resolved components
    pub graph: DependencyGraph,
}

impl Resolution {
    /// Whether `name` was pulled in only as a dependency.
    #[must_use]
    pub fn is_transitive(&self, name: &str) -> bool {
        !self.requested.iter().any(|r| r == name)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Gray,
    Black,
}

/// Expands component requests against a registry index.
pub struct DependencyResolver<'a> {
    index: &'a RegistryIndex,
}

impl<'a> DependencyResolver<'a> {
    /// Resolver over `index`.
    pub fn new(index: &'a RegistryIndex) -> Self {
        Self {
            index,
        }
    }

    /// Resolve `requested` into an install plan.
    ///
    /// Fails with [`GreaterError::ComponentNotFound`] for an unknown name (requested
    /// or declared as a dependency) and with [`GreaterError::CircularDependency`]
    /// when the dependencies loop.
    pub fn resolve(&self, requested: &[String]) -> Result<Resolution> {
        let mut unique_requested: Vec<String> = Vec::new();
        for name in requested {
            if !unique_requested.contains(name) {
                unique_requested.push(name.clone());
            }
        }

        let mut marks: HashMap<String, Mark> = HashMap::new();
        let mut path: Vec<String> = Vec::new();
        let mut order: Vec<&RegistryComponent> = Vec::new();
        let mut graph = DependencyGraph::new();

        for name in &unique_requested {
            if marks.get(name.as_str()) == Some(&Mark::Black) {
                continue;
            }
            self.visit(name, None, &mut marks, &mut path, &mut order, &mut graph)?;
        }

        let (packages, package_conflicts) = aggregate_packages(&order);
        for conflict in &package_conflicts {
            tracing::warn!(
                target: "resolver",
                "Package {} requested with versions {} (by {}); using {}",
                conflict.name,
                conflict.versions.join(", "),
                conflict.required_by.join(", "),
                conflict.versions[0]
            );
        }

        tracing::debug!(
            target: "resolver",
            "Resolved {:?} to {} component(s)",
            unique_requested,
            order.len()
        );

        Ok(Resolution {
            requested: unique_requested,
            order: order.iter().map(|c| c.name.clone()).collect(),
            components: order.into_iter().cloned().collect(),
            packages,
            package_conflicts,
            graph,
        })
    }

    fn visit(
        &self,
        name: &str,
        required_by: Option<&str>,
        marks: &mut HashMap<String, Mark>,
        path: &mut Vec<String>,
        order: &mut Vec<&'a RegistryComponent>,
        graph: &mut DependencyGraph,
    ) -> Result<()> {
        match marks.get(name) {
            Some(Mark::Black) => return Ok(()),
            Some(Mark::Gray) => {
                let start = path.iter().position(|n| n == name).unwrap_or(0);
                let mut chain: Vec<&str> = path[start..].iter().map(String::as_str).collect();
                chain.push(name);
                return Err(GreaterError::CircularDependency {
                    chain: chain.join(" → "),
                }
                .into());
            }
            None => {}
        }

        let component =
            self.index.find_component(name).ok_or_else(|| GreaterError::ComponentNotFound {
                name: name.to_string(),
                required_by: required_by.map(str::to_string),
                suggestions: self.index.similar_names(name),
            })?;

        marks.insert(name.to_string(), Mark::Gray);
        path.push(name.to_string());
        graph.add_component(name);

        for dependency in component.component_dependencies() {
            graph.add_dependency(name, dependency);
            self.visit(dependency, Some(name), marks, path, order, graph)?;
        }

        path.pop();
        marks.insert(name.to_string(), Mark::Black);
        order.push(component);
        Ok(())
    }
}

fn aggregate_packages(
    order: &[&RegistryComponent],
) -> (BTreeMap<String, String>, Vec<PackageConflict>) {
    let mut packages: BTreeMap<String, String> = BTreeMap::new();
    let mut seen: BTreeMap<String, PackageConflict> = BTreeMap::new();

    for component in order {
        for (name, version) in component.package_dependencies() {
            packages.entry(name.to_string()).or_insert_with(|| version.to_string());
            let entry = seen.entry(name.to_string()).or_insert_with(|| PackageConflict {
                name: name.to_string(),
                versions: Vec::new(),
                required_by: Vec::new(),
            });
            if !entry.versions.iter().any(|v| v == version) {
                entry.versions.push(version.to_string());
            }
            entry.required_by.push(component.name.clone());
        }
    }

    let conflicts = seen.into_values().filter(|c| c.versions.len() > 1).collect();
    (packages, conflicts)
}

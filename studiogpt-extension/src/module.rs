//! Module descriptors and the dependency graph between them.
//!
//! A module is a named unit with ordered public dependencies (visible to
//! downstream modules) and private dependencies (implementation detail, not
//! re-exported), plus a capability surface split into exported (public) and
//! internal (private) capabilities. All structural rules — acyclicity,
//! dependency visibility, and surface boundaries — are enforced when the
//! graph is validated, never at runtime.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A capability consumed from another module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityUse {
    /// Module that owns the capability.
    pub module: String,
    /// Capability name within that module's surface.
    pub capability: String,
}

/// A named module and its declared surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub name: String,
    /// Dependencies re-exported to downstream modules, in declaration order.
    pub public_deps: Vec<String>,
    /// Dependencies hidden from downstream modules.
    pub private_deps: Vec<String>,
    /// Public capability surface: the contract with dependents.
    pub exports: Vec<String>,
    /// Private surface, freely changeable.
    pub internal: Vec<String>,
    /// Capabilities this module consumes from others.
    pub uses: Vec<CapabilityUse>,
}

impl ModuleDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            public_deps: Vec::new(),
            private_deps: Vec::new(),
            exports: Vec::new(),
            internal: Vec::new(),
            uses: Vec::new(),
        }
    }

    pub fn with_public_dep(mut self, dep: &str) -> Self {
        self.public_deps.push(dep.into());
        self
    }

    pub fn with_private_dep(mut self, dep: &str) -> Self {
        self.private_deps.push(dep.into());
        self
    }

    pub fn with_export(mut self, capability: &str) -> Self {
        self.exports.push(capability.into());
        self
    }

    pub fn with_internal(mut self, capability: &str) -> Self {
        self.internal.push(capability.into());
        self
    }

    pub fn with_use(mut self, module: &str, capability: &str) -> Self {
        self.uses.push(CapabilityUse {
            module: module.into(),
            capability: capability.into(),
        });
        self
    }

    fn dependencies(&self) -> impl Iterator<Item = &String> {
        self.public_deps.iter().chain(self.private_deps.iter())
    }
}

/// Structural errors detected at graph validation time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("module '{0}' is already declared")]
    DuplicateModule(String),

    #[error("module '{module}' depends on unknown module '{dependency}'")]
    UnknownDependency { module: String, dependency: String },

    #[error("dependency cycle: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),

    #[error("module '{module}' uses '{target}' without a dependency path that exposes it")]
    HiddenModule { module: String, target: String },

    #[error("module '{module}' reaches into private capability '{capability}' of '{owner}'")]
    PrivateCapability {
        module: String,
        capability: String,
        owner: String,
    },

    #[error("module '{module}' uses unknown capability '{capability}' of '{owner}'")]
    UnknownCapability {
        module: String,
        capability: String,
        owner: String,
    },
}

/// The set of declared modules and the rules between them.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    modules: BTreeMap<String, ModuleDescriptor>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, descriptor: ModuleDescriptor) -> Result<(), GraphError> {
        if self.modules.contains_key(&descriptor.name) {
            return Err(GraphError::DuplicateModule(descriptor.name));
        }
        self.modules.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.modules.get(name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Check every structural rule: dependencies resolve, the graph is
    /// acyclic through public and private edges alike, and every capability
    /// use stays within the visible public surface of its target.
    pub fn validate(&self) -> Result<(), GraphError> {
        for module in self.modules.values() {
            for dep in module.dependencies() {
                if !self.modules.contains_key(dep) {
                    return Err(GraphError::UnknownDependency {
                        module: module.name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        if let Some(cycle) = self.find_cycle() {
            return Err(GraphError::DependencyCycle(cycle));
        }

        for module in self.modules.values() {
            let visible = self.visible_modules(module);
            for used in &module.uses {
                let Some(owner) = self.modules.get(&used.module) else {
                    return Err(GraphError::UnknownDependency {
                        module: module.name.clone(),
                        dependency: used.module.clone(),
                    });
                };
                if !visible.contains(owner.name.as_str()) {
                    return Err(GraphError::HiddenModule {
                        module: module.name.clone(),
                        target: owner.name.clone(),
                    });
                }
                if owner.exports.iter().any(|c| c == &used.capability) {
                    continue;
                }
                if owner.internal.iter().any(|c| c == &used.capability) {
                    return Err(GraphError::PrivateCapability {
                        module: module.name.clone(),
                        capability: used.capability.clone(),
                        owner: owner.name.clone(),
                    });
                }
                return Err(GraphError::UnknownCapability {
                    module: module.name.clone(),
                    capability: used.capability.clone(),
                    owner: owner.name.clone(),
                });
            }
        }

        Ok(())
    }

    /// Deterministic load order: every module after all of its dependencies,
    /// ties broken by name.
    pub fn load_order(&self) -> Result<Vec<String>, GraphError> {
        self.validate()?;

        let mut remaining: BTreeMap<&str, BTreeSet<&str>> = self
            .modules
            .values()
            .map(|m| {
                let deps: BTreeSet<&str> = m.dependencies().map(String::as_str).collect();
                (m.name.as_str(), deps)
            })
            .collect();

        let mut order = Vec::with_capacity(remaining.len());
        while !remaining.is_empty() {
            // BTreeMap iteration makes the pick lexicographically smallest.
            let Some(next) = remaining
                .iter()
                .find(|(_, deps)| deps.is_empty())
                .map(|(name, _)| *name)
            else {
                // validate() already rejected cycles, so every round has a
                // dependency-free module; report the stuck set rather than
                // panic if that invariant is ever broken.
                return Err(GraphError::DependencyCycle(
                    remaining.keys().map(|name| name.to_string()).collect(),
                ));
            };
            remaining.remove(next);
            for deps in remaining.values_mut() {
                deps.remove(next);
            }
            order.push(next.to_string());
        }
        Ok(order)
    }

    /// Unload order is the exact reverse of load order.
    pub fn unload_order(&self) -> Result<Vec<String>, GraphError> {
        let mut order = self.load_order()?;
        order.reverse();
        Ok(order)
    }

    /// Modules whose surface `module` may consume: its direct dependencies
    /// plus everything those re-export through public dependency chains.
    fn visible_modules(&self, module: &ModuleDescriptor) -> BTreeSet<&str> {
        let mut visible = BTreeSet::new();
        for dep in module.dependencies() {
            self.collect_public_closure(dep, &mut visible);
        }
        visible
    }

    fn collect_public_closure<'a>(&'a self, name: &str, out: &mut BTreeSet<&'a str>) {
        let Some(module) = self.modules.get(name) else {
            return;
        };
        if !out.insert(module.name.as_str()) {
            return;
        }
        for dep in &module.public_deps {
            self.collect_public_closure(dep, out);
        }
    }

    /// Depth-first cycle search over the union of public and private edges.
    /// Returns the cycle path (first node repeated at the end) if one exists.
    fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        let mut marks: BTreeMap<&str, Mark> = self
            .modules
            .keys()
            .map(|name| (name.as_str(), Mark::Unvisited))
            .collect();

        fn visit<'a>(
            graph: &'a ModuleGraph,
            name: &'a str,
            marks: &mut BTreeMap<&'a str, Mark>,
            path: &mut Vec<&'a str>,
        ) -> Option<Vec<String>> {
            match marks.get(name).copied() {
                Some(Mark::Done) => return None,
                Some(Mark::InProgress) => {
                    let start = path.iter().position(|n| *n == name).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        path[start..].iter().map(|n| n.to_string()).collect();
                    cycle.push(name.to_string());
                    return Some(cycle);
                }
                _ => {}
            }
            marks.insert(name, Mark::InProgress);
            path.push(name);
            if let Some(module) = graph.modules.get(name) {
                for dep in module.dependencies() {
                    if let Some(cycle) = visit(graph, dep, marks, path) {
                        return Some(cycle);
                    }
                }
            }
            path.pop();
            marks.insert(name, Mark::Done);
            None
        }

        let names: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        let mut path = Vec::new();
        for name in names {
            if let Some(cycle) = visit(self, name, &mut marks, &mut path) {
                return Some(cycle);
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// The three-module layout this whole workspace mirrors.
    fn standard_graph() -> ModuleGraph {
        let mut graph = ModuleGraph::new();
        graph
            .insert(
                ModuleDescriptor::new("capability")
                    .with_export("issue_request")
                    .with_export("json_codec")
                    .with_internal("connection_pool"),
            )
            .unwrap();
        graph
            .insert(
                ModuleDescriptor::new("extension")
                    .with_public_dep("capability")
                    .with_export("lifecycle")
                    .with_use("capability", "issue_request")
                    .with_use("capability", "json_codec"),
            )
            .unwrap();
        graph
            .insert(
                ModuleDescriptor::new("verification")
                    .with_private_dep("extension")
                    .with_use("extension", "lifecycle")
                    .with_use("capability", "json_codec"),
            )
            .unwrap();
        graph
    }

    #[test]
    fn standard_graph_validates() {
        standard_graph().validate().unwrap();
    }

    #[test]
    fn load_order_puts_dependencies_first() {
        let order = standard_graph().load_order().unwrap();
        assert_eq!(order, vec!["capability", "extension", "verification"]);
    }

    #[test]
    fn unload_order_is_exact_reverse() {
        let graph = standard_graph();
        let mut load = graph.load_order().unwrap();
        let unload = graph.unload_order().unwrap();
        load.reverse();
        assert_eq!(load, unload);
    }

    #[test]
    fn duplicate_module_is_rejected() {
        let mut graph = ModuleGraph::new();
        graph.insert(ModuleDescriptor::new("dup")).unwrap();
        let err = graph.insert(ModuleDescriptor::new("dup")).unwrap_err();
        assert_eq!(err, GraphError::DuplicateModule("dup".into()));
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let mut graph = ModuleGraph::new();
        graph
            .insert(ModuleDescriptor::new("a").with_public_dep("ghost"))
            .unwrap();
        let err = graph.validate().unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownDependency {
                module: "a".into(),
                dependency: "ghost".into(),
            }
        );
    }

    #[test]
    fn direct_cycle_is_rejected() {
        let mut graph = ModuleGraph::new();
        graph
            .insert(ModuleDescriptor::new("a").with_public_dep("b"))
            .unwrap();
        graph
            .insert(ModuleDescriptor::new("b").with_public_dep("a"))
            .unwrap();
        match graph.validate().unwrap_err() {
            GraphError::DependencyCycle(cycle) => {
                assert_eq!(cycle.first(), cycle.last());
                assert!(cycle.len() >= 3);
            }
            other => panic!("expected DependencyCycle, got {other:?}"),
        }
    }

    #[test]
    fn cycle_through_private_edge_is_rejected() {
        // A module cannot privately depend on a module that transitively
        // depends on it.
        let mut graph = ModuleGraph::new();
        graph
            .insert(ModuleDescriptor::new("a").with_public_dep("b"))
            .unwrap();
        graph
            .insert(ModuleDescriptor::new("b").with_public_dep("c"))
            .unwrap();
        graph
            .insert(ModuleDescriptor::new("c").with_private_dep("a"))
            .unwrap();
        assert!(matches!(
            graph.validate().unwrap_err(),
            GraphError::DependencyCycle(_)
        ));
    }

    #[test]
    fn public_deps_are_reexported_transitively() {
        let mut graph = ModuleGraph::new();
        graph
            .insert(ModuleDescriptor::new("base").with_export("cap"))
            .unwrap();
        graph
            .insert(ModuleDescriptor::new("mid").with_public_dep("base"))
            .unwrap();
        graph
            .insert(
                ModuleDescriptor::new("top")
                    .with_public_dep("mid")
                    .with_use("base", "cap"),
            )
            .unwrap();
        graph.validate().unwrap();
    }

    #[test]
    fn private_deps_are_not_reexported() {
        let mut graph = ModuleGraph::new();
        graph
            .insert(ModuleDescriptor::new("base").with_export("cap"))
            .unwrap();
        graph
            .insert(ModuleDescriptor::new("mid").with_private_dep("base"))
            .unwrap();
        graph
            .insert(
                ModuleDescriptor::new("top")
                    .with_public_dep("mid")
                    .with_use("base", "cap"),
            )
            .unwrap();
        assert_eq!(
            graph.validate().unwrap_err(),
            GraphError::HiddenModule {
                module: "top".into(),
                target: "base".into(),
            }
        );
    }

    #[test]
    fn reaching_into_private_surface_fails_validation() {
        let mut graph = ModuleGraph::new();
        graph
            .insert(
                ModuleDescriptor::new("capability")
                    .with_export("issue_request")
                    .with_internal("connection_pool"),
            )
            .unwrap();
        graph
            .insert(
                ModuleDescriptor::new("extension")
                    .with_public_dep("capability")
                    .with_use("capability", "connection_pool"),
            )
            .unwrap();
        assert_eq!(
            graph.validate().unwrap_err(),
            GraphError::PrivateCapability {
                module: "extension".into(),
                capability: "connection_pool".into(),
                owner: "capability".into(),
            }
        );
    }

    #[test]
    fn unknown_capability_fails_validation() {
        let mut graph = ModuleGraph::new();
        graph.insert(ModuleDescriptor::new("capability")).unwrap();
        graph
            .insert(
                ModuleDescriptor::new("extension")
                    .with_public_dep("capability")
                    .with_use("capability", "no_such_thing"),
            )
            .unwrap();
        assert!(matches!(
            graph.validate().unwrap_err(),
            GraphError::UnknownCapability { .. }
        ));
    }

    #[test]
    fn load_order_is_deterministic_for_independent_modules() {
        let mut graph = ModuleGraph::new();
        for name in ["zeta", "alpha", "mid"] {
            graph.insert(ModuleDescriptor::new(name)).unwrap();
        }
        assert_eq!(graph.load_order().unwrap(), vec!["alpha", "mid", "zeta"]);
    }
}

//! Module registration, dependency resolution and construction.

use rotalyze_types::RunContext;
use std::any::TypeId;
use std::collections::HashMap;

use crate::config::AnalysisConfig;
use crate::diagnostics::Diagnostics;
use crate::dispatcher::{Dispatcher, Subscription};
use crate::error::{EngineError, Result};
use crate::module::{
    Dependency, ErasedModule, InstanceMap, Module, ModuleContext, Shared, bind_subscriptions,
};
use crate::report::ModuleReport;

struct Registration {
    key: TypeId,
    name: &'static str,
    dependencies: fn() -> Vec<Dependency>,
    build: fn(&mut BuildState<'_>) -> Result<()>,
}

struct BuildState<'a> {
    run: &'a RunContext,
    config: &'a AnalysisConfig,
    diagnostics: &'a Diagnostics,
    instances: InstanceMap,
    modules: Vec<Box<dyn ErasedModule>>,
    subscriptions: Vec<Subscription>,
    disabled: HashMap<&'static str, String>,
}

fn build_module<M: Module>(state: &mut BuildState<'_>) -> Result<()> {
    let diagnostics = state.diagnostics.for_module(M::NAME);
    let mut ctx = ModuleContext::<M>::new(
        state.run,
        state.config,
        &state.instances,
        M::dependencies(),
        diagnostics,
    );
    let module = M::construct(&mut ctx).map_err(|source| EngineError::Construction {
        module: M::NAME,
        source,
    })?;
    let (disabled, subscriptions) = ctx.into_parts();

    let shared = Shared::new(module, disabled.is_none());
    match disabled {
        Some(reason) => {
            tracing::info!(module = M::NAME, %reason, "module disabled");
            state.disabled.insert(M::NAME, reason);
        }
        None => {
            tracing::debug!(
                module = M::NAME,
                subscriptions = subscriptions.len(),
                "module constructed"
            );
            state
                .subscriptions
                .extend(bind_subscriptions(&shared, subscriptions));
        }
    }

    state.instances.insert(TypeId::of::<M>(), shared.erase());
    state.modules.push(Box::new(shared));
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Catalogue of module types and the roots requested for a run.
#[derive(Default)]
pub struct Registry {
    registrations: Vec<Registration>,
    requested: Vec<TypeId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `M` available to satisfy dependencies. Registering twice is a no-op.
    pub fn register<M: Module>(&mut self) -> &mut Self {
        let key = TypeId::of::<M>();
        if !self.registrations.iter().any(|r| r.key == key) {
            self.registrations.push(Registration {
                key,
                name: M::NAME,
                dependencies: M::dependencies,
                build: build_module::<M>,
            });
        }
        self
    }

    /// Register `M` and construct it in every run.
    pub fn request<M: Module>(&mut self) -> &mut Self {
        self.register::<M>();
        let key = TypeId::of::<M>();
        if !self.requested.contains(&key) {
            self.requested.push(key);
        }
        self
    }

    fn lookup(&self, key: TypeId) -> Option<usize> {
        self.registrations.iter().position(|r| r.key == key)
    }

    /// Construction order: requested roots and their transitive dependencies,
    /// every module after all of its dependencies.
    pub fn resolve(&self) -> Result<Vec<&'static str>> {
        Ok(self
            .resolve_order()?
            .into_iter()
            .map(|i| self.registrations[i].name)
            .collect())
    }

    fn resolve_order(&self) -> Result<Vec<usize>> {
        let mut marks: HashMap<usize, Mark> = HashMap::new();
        let mut order = Vec::new();
        let mut path = Vec::new();

        for &root in &self.requested {
            if let Some(index) = self.lookup(root) {
                self.visit(index, &mut marks, &mut path, &mut order)?;
            }
        }
        Ok(order)
    }

    fn visit(
        &self,
        index: usize,
        marks: &mut HashMap<usize, Mark>,
        path: &mut Vec<usize>,
        order: &mut Vec<usize>,
    ) -> Result<()> {
        match marks.get(&index) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let from = path.iter().position(|&i| i == index).unwrap_or(0);
                let mut cycle: Vec<&'static str> = path[from..]
                    .iter()
                    .map(|&i| self.registrations[i].name)
                    .collect();
                cycle.push(self.registrations[index].name);
                return Err(EngineError::CyclicDependency { cycle });
            }
            None => {}
        }

        marks.insert(index, Mark::Visiting);
        path.push(index);

        let registration = &self.registrations[index];
        for dependency in (registration.dependencies)() {
            let Some(dep_index) = self.lookup(dependency.key) else {
                return Err(EngineError::UnresolvedDependency {
                    module: registration.name,
                    dependency: dependency.name,
                });
            };
            self.visit(dep_index, marks, path, order)?;
        }

        path.pop();
        marks.insert(index, Mark::Done);
        order.push(index);
        Ok(())
    }

    /// Resolve and construct every module for one run.
    ///
    /// Resolution errors are reported before any constructor runs.
    pub fn build(
        &self,
        run: &RunContext,
        config: &AnalysisConfig,
        diagnostics: &Diagnostics,
    ) -> Result<ModuleGraph> {
        let order = self.resolve_order()?;

        let mut state = BuildState {
            run,
            config,
            diagnostics,
            instances: InstanceMap::new(),
            modules: Vec::with_capacity(order.len()),
            subscriptions: Vec::new(),
            disabled: HashMap::new(),
        };
        for index in order {
            (self.registrations[index].build)(&mut state)?;
        }

        Ok(ModuleGraph {
            instances: state.instances,
            modules: state.modules,
            subscriptions: state.subscriptions,
            disabled: state.disabled,
        })
    }
}

/// Constructed modules of one run, in construction order.
pub struct ModuleGraph {
    instances: InstanceMap,
    modules: Vec<Box<dyn ErasedModule>>,
    subscriptions: Vec<Subscription>,
    disabled: HashMap<&'static str, String>,
}

impl ModuleGraph {
    pub fn get<M: Module>(&self) -> Option<Shared<M>> {
        self.instances
            .get(&TypeId::of::<M>())
            .and_then(Shared::<M>::restore)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    /// Why a module turned itself off, if it did.
    pub fn disabled_reason(&self, name: &str) -> Option<&str> {
        self.disabled.get(name).map(String::as_str)
    }

    pub fn active_count(&self) -> usize {
        self.modules.iter().filter(|m| m.is_active()).count()
    }

    /// Hand the subscriptions to a dispatcher; the graph keeps the instances.
    pub fn dispatcher(&mut self) -> Dispatcher {
        Dispatcher::new(std::mem::take(&mut self.subscriptions))
    }

    pub fn reports(&self, run: &RunContext) -> Vec<ModuleReport> {
        self.modules.iter().map(|m| m.report(run)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::EventFilter;
    use rotalyze_types::ActorId;
    use std::cell::Cell;

    thread_local! {
        static CONSTRUCTED: Cell<usize> = const { Cell::new(0) };
    }

    struct Base;
    impl Module for Base {
        const NAME: &'static str = "base";
        fn construct(_ctx: &mut ModuleContext<'_, Self>) -> anyhow::Result<Self> {
            CONSTRUCTED.with(|c| c.set(c.get() + 1));
            Ok(Base)
        }
    }

    struct Left(Shared<Base>);
    impl Module for Left {
        const NAME: &'static str = "left";
        fn dependencies() -> Vec<Dependency> {
            vec![Dependency::on::<Base>()]
        }
        fn construct(ctx: &mut ModuleContext<'_, Self>) -> anyhow::Result<Self> {
            Ok(Left(ctx.dependency::<Base>()?))
        }
    }

    struct Right(Shared<Base>);
    impl Module for Right {
        const NAME: &'static str = "right";
        fn dependencies() -> Vec<Dependency> {
            vec![Dependency::on::<Base>()]
        }
        fn construct(ctx: &mut ModuleContext<'_, Self>) -> anyhow::Result<Self> {
            Ok(Right(ctx.dependency::<Base>()?))
        }
    }

    struct Sneaky;
    impl Module for Sneaky {
        const NAME: &'static str = "sneaky";
        fn construct(ctx: &mut ModuleContext<'_, Self>) -> anyhow::Result<Self> {
            ctx.dependency::<Base>()?;
            Ok(Sneaky)
        }
    }

    struct Sleepy;
    impl Module for Sleepy {
        const NAME: &'static str = "sleepy";
        fn construct(ctx: &mut ModuleContext<'_, Self>) -> anyhow::Result<Self> {
            ctx.subscribe(EventFilter::cast(), |_, _| Ok(()));
            ctx.disable("nothing to do");
            Ok(Sleepy)
        }
    }

    fn build(registry: &Registry) -> Result<ModuleGraph> {
        let run = RunContext::new(ActorId(1), 0, 1_000);
        registry.build(&run, &AnalysisConfig::default(), &Diagnostics::detached())
    }

    #[test]
    fn test_dependencies_precede_dependents() {
        let mut registry = Registry::new();
        registry.request::<Left>().request::<Right>().register::<Base>();

        assert_eq!(registry.resolve().unwrap(), vec!["base", "left", "right"]);
    }

    #[test]
    fn test_single_shared_instance() {
        let mut registry = Registry::new();
        registry.register::<Base>().request::<Left>().request::<Right>();

        let before = CONSTRUCTED.with(Cell::get);
        let graph = build(&registry).unwrap();
        assert_eq!(CONSTRUCTED.with(Cell::get) - before, 1);

        let left = graph.get::<Left>().unwrap();
        let right = graph.get::<Right>().unwrap();
        assert!(left.borrow().0.ptr_eq(&right.borrow().0));
    }

    #[test]
    fn test_unregistered_dependency() {
        let mut registry = Registry::new();
        registry.request::<Left>();

        match build(&registry) {
            Err(EngineError::UnresolvedDependency { module, dependency }) => {
                assert_eq!((module, dependency), ("left", "base"));
            }
            other => panic!("unexpected: {:?}", other.err()),
        }
    }

    #[test]
    fn test_undeclared_dependency_fails_construction() {
        let mut registry = Registry::new();
        registry.register::<Base>().request::<Sneaky>().request::<Base>();

        let err = build(&registry).err().expect("construction must fail");
        assert!(matches!(err, EngineError::Construction { module: "sneaky", .. }));
        assert!(err.to_string().contains("without declaring"));
    }

    #[test]
    fn test_disabled_module_drops_subscriptions() {
        let mut registry = Registry::new();
        registry.request::<Sleepy>();

        let mut graph = build(&registry).unwrap();
        assert!(!graph.get::<Sleepy>().unwrap().is_active());
        assert_eq!(graph.active_count(), 0);
        assert!(graph.dispatcher().is_empty());

        let reports = graph.reports(&RunContext::new(ActorId(1), 0, 1_000));
        assert!(!reports[0].active);
    }
}

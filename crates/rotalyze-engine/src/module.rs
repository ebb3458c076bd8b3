//! The analysis module contract.
//!
//! A module declares its dependencies statically, is constructed exactly once
//! per run after all of them, and registers event handlers from its
//! constructor. Dependents hold a [`Shared`] handle to the single instance.

use rotalyze_types::RunContext;
use serde::de::DeserializeOwned;
use std::any::{Any, TypeId};
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;

use crate::config::{AnalysisConfig, Policy};
use crate::diagnostics::Diagnostics;
use crate::dispatcher::{EventFilter, HandlerContext, Subscription};
use crate::error::EngineError;
use crate::report::{ModuleReport, ReportBuilder};

pub trait Module: Sized + 'static {
    /// Stable name used in configuration, reports and errors
    const NAME: &'static str;

    fn dependencies() -> Vec<Dependency> {
        Vec::new()
    }

    fn construct(ctx: &mut ModuleContext<'_, Self>) -> anyhow::Result<Self>;

    fn report(&self, _report: &mut ReportBuilder<'_>) {}
}

/// Statically declared dependency on another module type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
    pub(crate) key: TypeId,
    pub name: &'static str,
}

impl Dependency {
    pub fn on<M: Module>() -> Self {
        Self {
            key: TypeId::of::<M>(),
            name: M::NAME,
        }
    }
}

pub type Handler<M> = fn(&mut M, &mut HandlerContext<'_>) -> anyhow::Result<()>;

pub(crate) struct ModuleCell<M> {
    active: Cell<bool>,
    inner: RefCell<M>,
}

/// Handle to the single instance of a module.
pub struct Shared<M> {
    cell: Rc<ModuleCell<M>>,
}

impl<M> Clone for Shared<M> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<M: Module> Shared<M> {
    pub(crate) fn new(module: M, active: bool) -> Self {
        Self {
            cell: Rc::new(ModuleCell {
                active: Cell::new(active),
                inner: RefCell::new(module),
            }),
        }
    }

    pub fn borrow(&self) -> Ref<'_, M> {
        self.cell.inner.borrow()
    }

    pub(crate) fn borrow_mut(&self) -> RefMut<'_, M> {
        self.cell.inner.borrow_mut()
    }

    /// Disabled modules stay queryable; they simply never saw an event.
    pub fn is_active(&self) -> bool {
        self.cell.active.get()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    pub(crate) fn erase(&self) -> Rc<dyn Any> {
        self.cell.clone()
    }

    pub(crate) fn restore(erased: &Rc<dyn Any>) -> Option<Self> {
        Rc::clone(erased)
            .downcast::<ModuleCell<M>>()
            .ok()
            .map(|cell| Self { cell })
    }
}

pub(crate) type InstanceMap = HashMap<TypeId, Rc<dyn Any>>;

/// Object-safe view of a constructed module.
pub(crate) trait ErasedModule {
    fn name(&self) -> &'static str;

    fn is_active(&self) -> bool;

    fn report(&self, run: &RunContext) -> ModuleReport;
}

impl<M: Module> ErasedModule for Shared<M> {
    fn name(&self) -> &'static str {
        M::NAME
    }

    fn is_active(&self) -> bool {
        Shared::is_active(self)
    }

    fn report(&self, run: &RunContext) -> ModuleReport {
        let active = Shared::is_active(self);
        let mut builder = ReportBuilder::new(run, M::NAME, active);
        if active {
            self.borrow().report(&mut builder);
        }
        builder.finish()
    }
}

/// Everything a module may use while it is being constructed.
pub struct ModuleContext<'a, M: Module> {
    run: &'a RunContext,
    config: &'a AnalysisConfig,
    instances: &'a InstanceMap,
    declared: Vec<Dependency>,
    diagnostics: Diagnostics,
    subscriptions: Vec<(EventFilter, Handler<M>)>,
    disabled: Option<String>,
}

impl<'a, M: Module> ModuleContext<'a, M> {
    pub(crate) fn new(
        run: &'a RunContext,
        config: &'a AnalysisConfig,
        instances: &'a InstanceMap,
        declared: Vec<Dependency>,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            run,
            config,
            instances,
            declared,
            diagnostics,
            subscriptions: Vec::new(),
            disabled: None,
        }
    }

    pub fn run(&self) -> &RunContext {
        self.run
    }

    pub fn config(&self) -> &AnalysisConfig {
        self.config
    }

    pub fn policy(&self) -> &Policy {
        &self.config.policy
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics.clone()
    }

    /// This module's `[modules.<name>]` table, if configured.
    pub fn settings<T: DeserializeOwned>(&self) -> anyhow::Result<Option<T>> {
        match self.config.module_settings(M::NAME) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone()).map_err(|e| {
                anyhow::anyhow!("invalid settings for module '{}': {e}", M::NAME)
            })?)),
            None => Ok(None),
        }
    }

    /// Shared handle to a declared dependency.
    pub fn dependency<D: Module>(&self) -> Result<Shared<D>, EngineError> {
        let undeclared = || EngineError::UndeclaredDependency {
            module: M::NAME,
            dependency: D::NAME,
        };
        if !self.declared.iter().any(|d| d.key == TypeId::of::<D>()) {
            return Err(undeclared());
        }
        self.instances
            .get(&TypeId::of::<D>())
            .and_then(Shared::<D>::restore)
            .ok_or_else(undeclared)
    }

    /// Handlers run in the order they are subscribed.
    pub fn subscribe(&mut self, filter: EventFilter, handler: Handler<M>) {
        self.subscriptions.push((filter, handler));
    }

    /// Switch the module off for this run; its subscriptions are dropped.
    pub fn disable(&mut self, reason: impl Into<String>) {
        self.disabled = Some(reason.into());
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.is_some()
    }

    /// Consume the context after construction.
    pub(crate) fn into_parts(self) -> (Option<String>, Vec<(EventFilter, Handler<M>)>) {
        (self.disabled, self.subscriptions)
    }
}

pub(crate) fn bind_subscriptions<M: Module>(
    shared: &Shared<M>,
    subscriptions: Vec<(EventFilter, Handler<M>)>,
) -> Vec<Subscription> {
    subscriptions
        .into_iter()
        .map(|(filter, handler)| {
            let instance = shared.clone();
            Subscription::new(
                M::NAME,
                filter,
                Box::new(move |ctx: &mut HandlerContext<'_>| {
                    handler(&mut instance.borrow_mut(), ctx)
                }),
            )
        })
        .collect()
}

//! Lifecycle hooks attached to router states
//!
//! Every hook is either synchronous or asynchronous. Guards (`can_enter`,
//! `can_exit`) yield a boolean; actions (`enter`, `exit`) yield nothing.
//! A guard that resolves to `false` declines the transition, a guard that
//! resolves to an error aborts the whole transition queue.

use crate::error::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Boxed future returned by asynchronous guards
pub type GuardFuture = BoxFuture<'static, Result<bool>>;

/// Boxed future returned by asynchronous actions
pub type ActionFuture = BoxFuture<'static, Result<()>>;

/// A boolean lifecycle hook (`can_enter` / `can_exit`)
#[derive(Clone)]
pub enum Guard {
    Sync(Arc<dyn Fn() -> Result<bool> + Send + Sync>),
    Async(Arc<dyn Fn() -> GuardFuture + Send + Sync>),
}

impl Guard {
    /// Create a synchronous guard
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> Result<bool> + Send + Sync + 'static,
    {
        Guard::Sync(Arc::new(f))
    }

    /// Create an asynchronous guard
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool>> + Send + 'static,
    {
        Guard::Async(Arc::new(move || Box::pin(f())))
    }

    /// Guard that always answers with the given value
    pub fn constant(allow: bool) -> Self {
        Guard::new(move || Ok(allow))
    }

    /// Evaluate the guard
    pub async fn check(&self) -> Result<bool> {
        match self {
            Guard::Sync(f) => f(),
            Guard::Async(f) => f().await,
        }
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Guard::Sync(_) => write!(f, "Guard::Sync(_)"),
            Guard::Async(_) => write!(f, "Guard::Async(_)"),
        }
    }
}

/// A side-effecting lifecycle hook (`enter` / `exit`)
#[derive(Clone)]
pub enum Action {
    Sync(Arc<dyn Fn() -> Result<()> + Send + Sync>),
    Async(Arc<dyn Fn() -> ActionFuture + Send + Sync>),
}

impl Action {
    /// Create a synchronous action
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        Action::Sync(Arc::new(f))
    }

    /// Create an asynchronous action
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Action::Async(Arc::new(move || Box::pin(f())))
    }

    /// Run the action
    pub async fn run(&self) -> Result<()> {
        match self {
            Action::Sync(f) => f(),
            Action::Async(f) => f().await,
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Sync(_) => write!(f, "Action::Sync(_)"),
            Action::Async(_) => write!(f, "Action::Async(_)"),
        }
    }
}

/// View-model bound to a router state by the view layer.
///
/// Guards defined here are consulted before the guards of the state
/// descriptor. Returning `None` means the view-model has no opinion.
#[async_trait]
pub trait ViewModel: Send + Sync {
    /// Whether the bound state may be entered
    async fn can_enter(&self) -> Option<Result<bool>> {
        None
    }

    /// Whether the bound state may be left
    async fn can_exit(&self) -> Option<Result<bool>> {
        None
    }
}

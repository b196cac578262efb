//! Computed configuration providers.
//!
//! A provider is a function that produces a configuration value on demand and
//! may read other keys from the resolver it is evaluated against. Wrapping a
//! function in [`Provider`] (or declaring it through [`ProvidesConf`]) is what
//! marks it as a provider; plain values never are.
//!
//! Task types declare their providers once, at definition time:
//!
//! ```
//! use deploy_conf::conf::Conf;
//! use deploy_conf::error::ConfResult;
//! use deploy_conf::provides_conf;
//! use serde_json::{Value, json};
//!
//! struct Ctl;
//!
//! impl Ctl {
//!     fn command(&self, conf: &Conf<'_>) -> ConfResult<Value> {
//!         Ok(conf.get_or("command", json!("status")))
//!     }
//! }
//!
//! provides_conf!(Ctl { command });
//! ```

use crate::conf::Conf;
use crate::error::ConfResult;
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

/// Signature of a free-standing provider.
pub type ProviderFn = dyn Fn(&Conf<'_>) -> ConfResult<Value>;

/// A provider bound to its owning object for the lifetime of one resolver.
pub type BoundProvider<'a> = Rc<dyn Fn(&Conf<'_>) -> ConfResult<Value> + 'a>;

/// A function tagged as a configuration provider.
///
/// Used for base-layer and override-layer entries whose value is computed.
#[derive(Clone)]
pub struct Provider(Rc<ProviderFn>);

impl Provider {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Conf<'_>) -> ConfResult<Value> + 'static,
    {
        Self(Rc::new(func))
    }

    /// Evaluate against a resolver.
    pub fn call(&self, conf: &Conf<'_>) -> ConfResult<Value> {
        (self.0)(conf)
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Provider(<fn>)")
    }
}

/// Mark a closure as a configuration provider.
pub fn provider<F>(func: F) -> Provider
where
    F: Fn(&Conf<'_>) -> ConfResult<Value> + 'static,
{
    Provider::new(func)
}

/// Provider method of a task type.
pub type TaskProviderFn<T> = fn(&T, &Conf<'_>) -> ConfResult<Value>;

/// One `(name, method)` pair in a type's provider table.
pub struct ProviderDecl<T> {
    pub name: &'static str,
    pub func: TaskProviderFn<T>,
}

impl<T> ProviderDecl<T> {
    pub const fn new(name: &'static str, func: TaskProviderFn<T>) -> Self {
        Self { name, func }
    }
}

impl<T> Clone for ProviderDecl<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ProviderDecl<T> {}

impl<T> fmt::Debug for ProviderDecl<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDecl").field("name", &self.name).finish()
    }
}

/// Capability of a type that contributes computed configuration.
///
/// The table is static per type, so discovery is a lookup rather than a scan
/// of the instance.
pub trait ProvidesConf: Sized + 'static {
    fn conf_providers() -> &'static [ProviderDecl<Self>] {
        &[]
    }
}

/// Bind a type's provider table to one instance.
pub fn bind_providers<'a, T: ProvidesConf>(owner: &'a T) -> Vec<(&'static str, BoundProvider<'a>)> {
    T::conf_providers()
        .iter()
        .map(|decl| (decl.name, bind(owner, decl.func)))
        .collect()
}

fn bind<'a, T: 'a>(owner: &'a T, func: TaskProviderFn<T>) -> BoundProvider<'a> {
    Rc::new(move |conf: &Conf<'_>| func(owner, conf))
}

/// Implement [`ProvidesConf`] for a type from a list of its provider methods.
///
/// Each listed method must have the signature
/// `fn(&self, &Conf<'_>) -> ConfResult<Value>`; the key it provides is the
/// method name.
#[macro_export]
macro_rules! provides_conf {
    ($ty:ty { $($name:ident),* $(,)? }) => {
        impl $crate::provider::ProvidesConf for $ty {
            fn conf_providers() -> &'static [$crate::provider::ProviderDecl<Self>] {
                const PROVIDERS: &[$crate::provider::ProviderDecl<$ty>] = &[
                    $($crate::provider::ProviderDecl::new(stringify!($name), <$ty>::$name),)*
                ];
                PROVIDERS
            }
        }
    };
}

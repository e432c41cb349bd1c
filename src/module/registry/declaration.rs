//! Module declarations
//!
//! A declaration is what a resource (or inline caller) hands the loader:
//! an optional identifier, ordered dependency identifiers and a factory.

use crate::module::traits::{Export, Factory, LoaderError};

/// One positional argument of a variadic declaration call
#[derive(Debug, Clone)]
pub enum DeclareArg {
    Text(String),
    List(Vec<String>),
    Factory(Factory),
}

impl From<&str> for DeclareArg {
    fn from(s: &str) -> Self {
        DeclareArg::Text(s.to_string())
    }
}

impl From<String> for DeclareArg {
    fn from(s: String) -> Self {
        DeclareArg::Text(s)
    }
}

impl From<Vec<String>> for DeclareArg {
    fn from(list: Vec<String>) -> Self {
        DeclareArg::List(list)
    }
}

impl From<Vec<&str>> for DeclareArg {
    fn from(list: Vec<&str>) -> Self {
        DeclareArg::List(list.into_iter().map(str::to_string).collect())
    }
}

impl From<Factory> for DeclareArg {
    fn from(factory: Factory) -> Self {
        DeclareArg::Factory(factory)
    }
}

/// A module declaration awaiting the loader pipeline
#[derive(Debug, Clone)]
pub struct Declaration {
    pub identifier: Option<String>,
    pub dependencies: Vec<String>,
    pub factory: Factory,
}

impl Declaration {
    /// Anonymous declaration with no dependencies
    pub fn new(factory: Factory) -> Self {
        Self {
            identifier: None,
            dependencies: Vec::new(),
            factory,
        }
    }

    /// Named declaration with no dependencies
    pub fn named(identifier: impl Into<String>, factory: Factory) -> Self {
        Self::new(factory).with_identifier(identifier)
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    /// Interpret a variadic `(identifier?, dependencies?, factory)` call
    ///
    /// The identifier is taken only when the first argument is text, the
    /// dependency list only when more than one argument remains after that,
    /// and the factory is the next remaining argument. A non-factory argument
    /// in factory position becomes a plain-value export; no argument at all
    /// yields an undefined export.
    pub fn from_args(args: Vec<DeclareArg>) -> Result<Self, LoaderError> {
        let mut args = args.into_iter().peekable();

        let identifier = match args.peek() {
            Some(DeclareArg::Text(_)) => match args.next() {
                Some(DeclareArg::Text(id)) => Some(id),
                _ => None,
            },
            _ => None,
        };

        let rest: Vec<DeclareArg> = args.collect();
        let mut rest = rest.into_iter();
        let dependencies = if rest.len() > 1 {
            match rest.next() {
                Some(DeclareArg::List(deps)) => deps,
                Some(other) => {
                    return Err(LoaderError::InvalidDeclaration(format!(
                        "expected a dependency list, got {:?}",
                        other
                    )))
                }
                None => Vec::new(),
            }
        } else {
            Vec::new()
        };

        let factory = match rest.next() {
            Some(DeclareArg::Factory(factory)) => factory,
            Some(DeclareArg::Text(text)) => Factory::value(text),
            Some(DeclareArg::List(list)) => Factory::value(list),
            None => Factory::Value(Export::undefined()),
        };

        Ok(Self {
            identifier,
            dependencies,
            factory,
        })
    }
}

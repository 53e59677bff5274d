//! Command registration and the environment handed to running commands.

use std::collections::BTreeMap;
use std::rc::Rc;

use incant_types::error::{IncantError, Result};
use incant_types::Value;

use crate::binder::BoundArgs;
use crate::builtins;
use crate::catalog::{Catalog, CommandSpec};
use crate::completion::CompletionContext;
use crate::source::{Input, LineSource};

/// Output produced by a command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutput {
    /// Text printed as is.
    Text(String),
    /// A returned value; strings print unquoted, everything else in
    /// literal form.
    Value(Value),
    /// Command produced no visible output.
    None,
}

/// Body of a command.
pub type Handler<S> = Box<dyn Fn(&BoundArgs, &mut Environment<'_, S>) -> Result<CommandOutput>>;

/// What a running command can reach: the user state, the catalog, and the
/// line source for nested prompts.
pub struct Environment<'a, S> {
    pub state: &'a mut S,
    catalog: &'a Catalog,
    completions: &'a mut CompletionContext,
    source: &'a mut dyn LineSource,
    columns: usize,
}

impl<'a, S> Environment<'a, S> {
    pub fn new(
        state: &'a mut S,
        catalog: &'a Catalog,
        completions: &'a mut CompletionContext,
        source: &'a mut dyn LineSource,
        columns: usize,
    ) -> Self {
        Self {
            state,
            catalog,
            completions,
            source,
            columns,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        self.catalog
    }

    /// Display width for columnised output.
    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn completions(&self) -> &CompletionContext {
        self.completions
    }

    /// Read one line of sub-prompt input.
    ///
    /// Interrupt and end of input come back as [`IncantError::Interrupted`]
    /// and [`IncantError::EndOfInput`].
    pub fn prompt(&mut self, message: &str) -> Result<String> {
        match self.source.read_line(message, self.completions)? {
            Input::Line(line) => Ok(line),
            Input::Interrupted => Err(IncantError::Interrupted),
            Input::EndOfInput => Err(IncantError::EndOfInput),
        }
    }

    /// Read one line with `options` as the only completions.
    ///
    /// The override stays in place until the current dispatch cycle ends.
    pub fn prompt_with<I, T>(&mut self, message: &str, options: I) -> Result<String>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.completions.set(options);
        self.prompt(message)
    }
}

/// Catalog of commands with their handlers.
///
/// Mutators and accessors are kept in separate tables so one name can hold
/// both. `help` is always registered.
pub struct CommandRegistry<S> {
    catalog: Rc<Catalog>,
    commands: BTreeMap<String, Handler<S>>,
    accessors: BTreeMap<String, Handler<S>>,
}

impl<S: 'static> CommandRegistry<S> {
    pub fn new() -> Self {
        let mut registry = Self {
            catalog: Rc::new(Catalog::new()),
            commands: BTreeMap::new(),
            accessors: BTreeMap::new(),
        };
        registry.insert(builtins::help_spec(), Box::new(builtins::help::<S>));
        registry
    }

    /// Register a command. Replaces any existing command with the same name.
    pub fn register<F>(&mut self, spec: CommandSpec, handler: F) -> Result<()>
    where
        F: Fn(&BoundArgs, &mut Environment<'_, S>) -> Result<CommandOutput> + 'static,
    {
        spec.validate()?;
        if spec.is_accessor() {
            return Err(IncantError::Config(format!(
                "{}: accessors are registered with register_accessor",
                spec.name()
            )));
        }
        self.insert(spec, Box::new(handler));
        Ok(())
    }

    /// Register a zero-argument accessor, run when `name` is typed alone.
    pub fn register_accessor<F>(
        &mut self,
        name: impl Into<String>,
        doc: impl Into<String>,
        handler: F,
    ) -> Result<()>
    where
        F: Fn(&mut Environment<'_, S>) -> Result<CommandOutput> + 'static,
    {
        let spec = CommandSpec::accessor(name, doc);
        spec.validate()?;
        self.insert(
            spec,
            Box::new(move |_: &BoundArgs, env: &mut Environment<'_, S>| handler(env)),
        );
        Ok(())
    }

    fn insert(&mut self, spec: CommandSpec, handler: Handler<S>) {
        let name = spec.name().to_string();
        let table = if spec.is_accessor() {
            &mut self.accessors
        } else {
            &mut self.commands
        };
        if table.insert(name.clone(), handler).is_some() {
            log::debug!("replacing command {name}");
        } else {
            log::debug!("registered command {name}");
        }
        Rc::make_mut(&mut self.catalog).insert(spec);
    }

    /// Shared snapshot of the catalog. Later registrations do not affect
    /// snapshots already handed out.
    pub fn catalog(&self) -> Rc<Catalog> {
        Rc::clone(&self.catalog)
    }

    pub fn catalog_ref(&self) -> &Catalog {
        &self.catalog
    }

    pub fn handler(&self, name: &str) -> Option<&Handler<S>> {
        self.commands.get(name)
    }

    pub fn accessor_handler(&self, name: &str) -> Option<&Handler<S>> {
        self.accessors.get(name)
    }
}

impl<S: 'static> Default for CommandRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ParameterSpec;
    use crate::source::ScriptedSource;
    use incant_types::TypeTag;

    #[test]
    fn help_always_registered() {
        let registry = CommandRegistry::<()>::new();
        assert!(registry.handler("help").is_some());
        assert_eq!(registry.catalog_ref().names(), vec!["help"]);
    }

    #[test]
    fn register_validates() {
        let mut registry = CommandRegistry::<()>::new();
        let bad = CommandSpec::new("x")
            .with_param(ParameterSpec::new("a", TypeTag::Int))
            .with_param(ParameterSpec::new("a", TypeTag::Int));
        assert!(matches!(
            registry.register(bad, |_, _| Ok(CommandOutput::None)),
            Err(IncantError::Config(_))
        ));
        assert!(registry.handler("x").is_none());
    }

    #[test]
    fn accessor_spec_needs_accessor_registration() {
        let mut registry = CommandRegistry::<()>::new();
        let spec = CommandSpec::accessor("speed", "");
        assert!(registry.register(spec, |_, _| Ok(CommandOutput::None)).is_err());
    }

    #[test]
    fn accessor_and_mutator_share_a_name() {
        let mut registry = CommandRegistry::<f64>::new();
        registry
            .register_accessor("speed", "current speed", |env| {
                Ok(CommandOutput::Value(Value::Float(*env.state)))
            })
            .unwrap();
        registry
            .register(
                CommandSpec::new("speed").with_param(ParameterSpec::new("speed", TypeTag::Float)),
                |args, env| {
                    *env.state = args.f64("speed")?;
                    Ok(CommandOutput::None)
                },
            )
            .unwrap();
        assert!(registry.handler("speed").is_some());
        assert!(registry.accessor_handler("speed").is_some());
        assert_eq!(registry.catalog_ref().names(), vec!["help", "speed"]);
    }

    #[test]
    fn snapshots_are_stable() {
        let mut registry = CommandRegistry::<()>::new();
        let before = registry.catalog();
        registry
            .register(CommandSpec::new("honk"), |_, _| Ok(CommandOutput::None))
            .unwrap();
        assert!(!before.contains("honk"));
        assert!(registry.catalog().contains("honk"));
    }

    #[test]
    fn prompt_with_sets_override() {
        let catalog = Catalog::new();
        let mut completions = CompletionContext::new();
        let mut source = ScriptedSource::new(["4"]);
        let mut state = ();
        let mut env = Environment::new(&mut state, &catalog, &mut completions, &mut source, 80);
        assert_eq!(env.prompt_with("doors? ", ["2", "4", "6"]).unwrap(), "4");
        assert_eq!(env.completions().get().map(<[String]>::len), Some(3));
        assert!(matches!(env.prompt("again? "), Err(IncantError::EndOfInput)));
        assert_eq!(
            source.overrides()[0],
            Some(vec!["2".to_string(), "4".to_string(), "6".to_string()])
        );
    }
}

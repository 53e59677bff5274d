//! The dispatch loop.
//!
//! One cycle: read a line, split off the command name, run an accessor
//! directly or bind the remaining blocks and invoke the command, report the
//! outcome, then clear the completion override. Syntax, coercion and
//! command failures are reported and the loop continues; only an interrupt
//! or end of input stops it.

use std::any::Any;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};

use incant_types::error::{IncantError, Result};
use incant_types::{ReplConfig, Value};

use crate::binder::{BoundArgs, bind};
use crate::completion::CompletionContext;
use crate::registry::{CommandOutput, CommandRegistry, Environment, Handler};
use crate::source::{Input, LineSource};
use crate::tokenizer::{BLOCK_SEPARATOR, tokenize};

/// Whether the loop keeps going after a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// A command registry bound to user state, a line source and an output.
pub struct Session<S, L, W> {
    registry: CommandRegistry<S>,
    state: S,
    source: L,
    out: W,
    config: ReplConfig,
    completions: CompletionContext,
}

impl<S: 'static, L: LineSource, W: Write> Session<S, L, W> {
    pub fn new(registry: CommandRegistry<S>, state: S, source: L, out: W) -> Self {
        Self {
            registry,
            state,
            source,
            out,
            config: ReplConfig::default(),
            completions: CompletionContext::new(),
        }
    }

    pub fn with_config(mut self, config: ReplConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ReplConfig {
        &self.config
    }

    pub fn registry(&self) -> &CommandRegistry<S> {
        &self.registry
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    pub fn into_state(self) -> S {
        self.state
    }

    pub fn source(&self) -> &L {
        &self.source
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn completion_context(&self) -> &CompletionContext {
        &self.completions
    }

    /// Loop until interrupted or out of input.
    pub fn run(&mut self) -> Result<()> {
        while self.cycle(true)? == Flow::Continue {}
        Ok(())
    }

    /// Run a single command. Blank lines re-prompt without counting.
    pub fn run_once(&mut self) -> Result<()> {
        self.cycle(false).map(|_| ())
    }

    fn cycle(&mut self, looping: bool) -> Result<Flow> {
        let prompt = self.config.rendered_prompt();
        loop {
            let input = match self.source.read_line(&prompt, &self.completions) {
                Ok(input) => input,
                Err(IncantError::Interrupted) => Input::Interrupted,
                Err(IncantError::EndOfInput) => Input::EndOfInput,
                Err(e) => return Err(e),
            };
            match input {
                Input::Line(line) if line.trim().is_empty() => continue,
                Input::Line(line) => return self.dispatch(&line),
                Input::Interrupted => {
                    writeln!(self.out)?;
                    return Ok(Flow::Stop);
                },
                Input::EndOfInput => {
                    writeln!(self.out, "EOF")?;
                    if looping && !self.config.exit_on_eof {
                        return Ok(Flow::Continue);
                    }
                    return Ok(Flow::Stop);
                },
            }
        }
    }

    fn dispatch(&mut self, line: &str) -> Result<Flow> {
        match self.execute_line(line) {
            Ok(output) => {
                self.report(output)?;
                Ok(Flow::Continue)
            },
            Err(e) if e.is_terminal() => {
                writeln!(self.out)?;
                Ok(Flow::Stop)
            },
            Err(e) => {
                match &e {
                    IncantError::Execution { .. } => log::error!("{e}"),
                    _ => log::warn!("{e}"),
                }
                writeln!(self.out, "error: {e}")?;
                Ok(Flow::Continue)
            },
        }
    }

    fn report(&mut self, output: CommandOutput) -> Result<()> {
        match output {
            CommandOutput::Text(text) if !text.is_empty() => writeln!(self.out, "{text}")?,
            CommandOutput::Value(Value::Str(text)) => writeln!(self.out, "{text}")?,
            CommandOutput::Value(value) => writeln!(self.out, "{value}")?,
            CommandOutput::Text(_) | CommandOutput::None => {},
        }
        Ok(())
    }

    /// Resolve, bind and invoke one line without reading or reporting.
    ///
    /// The completion override is cleared afterwards whatever the outcome.
    pub fn execute_line(&mut self, line: &str) -> Result<CommandOutput> {
        let result = self.resolve_and_invoke(line);
        self.completions.clear();
        result
    }

    fn resolve_and_invoke(&mut self, line: &str) -> Result<CommandOutput> {
        let tokens = tokenize(line.trim(), BLOCK_SEPARATOR);
        if !tokens.complete {
            return Err(IncantError::Syntax(
                "unterminated quote or bracket".to_string(),
            ));
        }
        let texts = tokens.into_texts();
        let Some((name, blocks)) = texts.split_first() else {
            return Ok(CommandOutput::None);
        };

        if blocks.is_empty()
            && let Some(handler) = self.registry.accessor_handler(name)
        {
            log::debug!("invoking accessor {name}");
            let mut env = Environment::new(
                &mut self.state,
                self.registry.catalog_ref(),
                &mut self.completions,
                &mut self.source,
                self.config.columns,
            );
            return invoke(name, handler, &BoundArgs::default(), &mut env);
        }

        let (Some(spec), Some(handler)) = (
            self.registry.catalog_ref().get(name),
            self.registry.handler(name),
        ) else {
            return Err(IncantError::Syntax(format!("unknown command: {name}")));
        };
        let args = bind(spec, blocks)?;
        log::debug!(
            "invoking {name} positional={:?} keyword={:?}",
            args.positional(),
            args.keyword()
        );
        let mut env = Environment::new(
            &mut self.state,
            self.registry.catalog_ref(),
            &mut self.completions,
            &mut self.source,
            self.config.columns,
        );
        invoke(name, handler, &args, &mut env)
    }
}

/// Run `handler`, turning its failures and panics into execution errors.
///
/// An interrupt raised from a nested prompt passes through unchanged.
fn invoke<S>(
    name: &str,
    handler: &Handler<S>,
    args: &BoundArgs,
    env: &mut Environment<'_, S>,
) -> Result<CommandOutput> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(args, env)));
    match outcome {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(IncantError::Interrupted)) => Err(IncantError::Interrupted),
        Ok(Err(e)) => Err(IncantError::Execution {
            command: name.to_string(),
            cause: e.to_string(),
        }),
        Err(payload) => Err(IncantError::Execution {
            command: name.to_string(),
            cause: panic_message(payload.as_ref()),
        }),
    }
}

/// Text of a caught panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CommandSpec, ParameterSpec};
    use crate::source::ScriptedSource;
    use incant_types::TypeTag;

    #[derive(Debug, Default)]
    struct Car {
        fuel: f64,
        speed: f64,
        doors: i64,
        calls: usize,
    }

    fn registry() -> CommandRegistry<Car> {
        let mut registry = CommandRegistry::<Car>::new();
        registry
            .register(
                CommandSpec::new("add_fuel")
                    .with_doc("Add some fuel.")
                    .with_param(ParameterSpec::receiver("self"))
                    .with_param(ParameterSpec::new("gallons", TypeTag::Float))
                    .with_param(
                        ParameterSpec::new("top_off", TypeTag::Bool)
                            .with_default(Value::Bool(false)),
                    ),
                |args, env| {
                    env.state.calls += 1;
                    if args.bool("top_off")? {
                        env.state.fuel = 15.0;
                    } else {
                        env.state.fuel += args.f64("gallons")?;
                    }
                    Ok(CommandOutput::Value(Value::Float(env.state.fuel)))
                },
            )
            .unwrap();
        registry
            .register_accessor("speed", "Return the speed.", |env| {
                Ok(CommandOutput::Value(Value::Float(env.state.speed)))
            })
            .unwrap();
        registry
            .register(
                CommandSpec::new("speed")
                    .with_doc("Set the speed.")
                    .with_param(ParameterSpec::new("speed", TypeTag::Float)),
                |args, env| {
                    env.state.speed = args.f64("speed")?;
                    Ok(CommandOutput::None)
                },
            )
            .unwrap();
        registry
            .register(CommandSpec::new("stall"), |_, _| {
                Err(IncantError::Command("engine stalled".into()))
            })
            .unwrap();
        registry
            .register(CommandSpec::new("explode"), |_, _| panic!("kaboom"))
            .unwrap();
        registry
            .register(CommandSpec::new("add_doors"), |_, env| {
                let answer = env.prompt_with("How many doors? ", ["2", "4", "6"])?;
                env.state.doors = answer.trim().parse().map_err(|_| {
                    IncantError::Command(format!("{answer} is not a door count"))
                })?;
                Ok(CommandOutput::None)
            })
            .unwrap();
        registry
    }

    fn session(source: ScriptedSource) -> Session<Car, ScriptedSource, Vec<u8>> {
        Session::new(registry(), Car::default(), source, Vec::new())
    }

    fn output(session: &Session<Car, ScriptedSource, Vec<u8>>) -> String {
        String::from_utf8_lossy(session.output()).into_owned()
    }

    #[test]
    fn runs_until_end_of_input() {
        let mut s = session(ScriptedSource::new(["add_fuel 12.5", "add_fuel gallons=2"]));
        s.run().unwrap();
        assert_eq!(s.state().fuel, 14.5);
        assert_eq!(output(&s), "12.5\n14.5\nEOF\n");
    }

    #[test]
    fn errors_do_not_stop_the_loop() {
        let mut s = session(ScriptedSource::new([
            "fly",
            "add_fuel 12.5 True oops",
            "add_fuel yes",
            "add_fuel 1 top_off=yes",
            "stall",
            "explode",
            "add_fuel 1",
        ]));
        s.run().unwrap();
        let out = output(&s);
        assert!(out.contains("error: syntax error: unknown command: fly"));
        assert!(out.contains("too many positional arguments"));
        assert!(out.contains("error: type error"));
        assert!(out.contains("stall raised an error: command error: engine stalled"));
        assert!(out.contains("explode raised an error: kaboom"));
        assert_eq!(s.state().fuel, 1.0);
        assert_eq!(s.state().calls, 1);
    }

    #[test]
    fn bind_failure_never_invokes() {
        let mut s = session(ScriptedSource::default());
        assert!(matches!(
            s.execute_line("add_fuel"),
            Err(IncantError::Syntax(_))
        ));
        assert_eq!(s.state().calls, 0);
    }

    #[test]
    fn accessor_runs_without_arguments() {
        let mut s = session(ScriptedSource::new(["speed 30", "speed"]));
        s.run().unwrap();
        assert_eq!(output(&s), "30.0\nEOF\n");
    }

    #[test]
    fn interrupt_stops_loop() {
        let mut s = session(
            ScriptedSource::new(["add_fuel 1"])
                .then(Input::Interrupted)
                .then(Input::Line("add_fuel 1".into())),
        );
        s.run().unwrap();
        assert_eq!(s.state().fuel, 1.0);
        assert_eq!(output(&s), "1.0\n\n");
    }

    #[test]
    fn end_of_input_can_reprompt() {
        let config = ReplConfig {
            exit_on_eof: false,
            ..ReplConfig::default()
        };
        let mut s = session(
            ScriptedSource::new(["add_fuel 1"])
                .then(Input::EndOfInput)
                .then(Input::Line("add_fuel 1".into()))
                .then(Input::Interrupted),
        )
        .with_config(config);
        s.run().unwrap();
        assert_eq!(s.state().fuel, 2.0);
        assert_eq!(output(&s), "1.0\nEOF\n2.0\n\n");
    }

    #[test]
    fn run_once_skips_blank_lines() {
        let mut s = session(ScriptedSource::new(["", "   ", "add_fuel 3", "add_fuel 3"]));
        s.run_once().unwrap();
        assert_eq!(s.state().fuel, 3.0);
        assert_eq!(s.source().remaining(), 1);
    }

    #[test]
    fn run_once_end_of_input() {
        let mut s = session(ScriptedSource::default());
        s.run_once().unwrap();
        assert_eq!(output(&s), "EOF\n");
    }

    #[test]
    fn sub_prompt_override_is_cleared() {
        let mut s = session(ScriptedSource::new(["add_doors", "4", "add_fuel 1"]));
        s.run().unwrap();
        assert_eq!(s.state().doors, 4);
        let overrides = s.source().overrides();
        assert_eq!(overrides[0], None);
        assert_eq!(
            overrides[1],
            Some(vec!["2".to_string(), "4".to_string(), "6".to_string()])
        );
        assert_eq!(overrides[2], None);
        assert!(!s.completion_context().is_set());
    }

    #[test]
    fn override_cleared_after_failure() {
        let mut s = session(ScriptedSource::new(["add_doors", "many", "add_fuel 1"]));
        s.run().unwrap();
        assert!(output(&s).contains("many is not a door count"));
        assert_eq!(s.source().overrides()[2], None);
    }

    #[test]
    fn interrupt_in_sub_prompt_stops_loop() {
        let mut s = session(
            ScriptedSource::new(["add_doors"])
                .then(Input::Interrupted)
                .then(Input::Line("add_fuel 1".into())),
        );
        s.run().unwrap();
        assert_eq!(s.state().fuel, 0.0);
        assert!(!s.completion_context().is_set());
    }

    #[test]
    fn end_of_input_in_sub_prompt_is_execution_error() {
        let mut s = session(ScriptedSource::default());
        assert!(matches!(
            s.execute_line("add_doors"),
            Err(IncantError::Execution { .. })
        ));
    }

    #[test]
    fn unbalanced_line_is_syntax_error() {
        let mut s = session(ScriptedSource::default());
        assert!(matches!(
            s.execute_line("add_fuel '12"),
            Err(IncantError::Syntax(_))
        ));
    }

    #[test]
    fn same_input_binds_the_same() {
        let mut s = session(ScriptedSource::default());
        s.execute_line("add_fuel 2 top_off=False").unwrap();
        s.execute_line("add_fuel 2 top_off=False").unwrap();
        assert_eq!(s.into_state().fuel, 4.0);
    }

    #[test]
    fn prompt_from_config() {
        let config = ReplConfig {
            prompt: "car>".to_string(),
            ..ReplConfig::default()
        };
        let mut s = session(ScriptedSource::default()).with_config(config);
        s.run().unwrap();
        assert_eq!(s.source().prompts(), &["car> "]);
    }

    #[test]
    fn help_is_available() {
        let mut s = session(ScriptedSource::new(["help add_fuel"]));
        s.run().unwrap();
        assert!(output(&s).starts_with("add_fuel gallons=<float> [top_off=<bool>]"));
    }
}

//! Line input abstraction.

use std::collections::VecDeque;

use incant_types::error::Result;

use crate::completion::CompletionContext;

/// Outcome of one blocking read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Line(String),
    Interrupted,
    EndOfInput,
}

/// A blocking source of input lines.
///
/// `context` carries any completion override active for this read; an
/// interactive source hands it to its completer.
pub trait LineSource {
    fn read_line(&mut self, prompt: &str, context: &CompletionContext) -> Result<Input>;
}

/// Replays queued inputs, then reports end of input.
///
/// Records every prompt it was shown and the completion override active at
/// that read.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    inputs: VecDeque<Input>,
    prompts: Vec<String>,
    overrides: Vec<Option<Vec<String>>>,
}

impl ScriptedSource {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: lines.into_iter().map(|l| Input::Line(l.into())).collect(),
            ..Self::default()
        }
    }

    /// Queue one more input.
    pub fn push(&mut self, input: Input) {
        self.inputs.push_back(input);
    }

    pub fn then(mut self, input: Input) -> Self {
        self.push(input);
        self
    }

    /// Inputs not yet read.
    pub fn remaining(&self) -> usize {
        self.inputs.len()
    }

    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// The completion override seen at each read, in read order.
    pub fn overrides(&self) -> &[Option<Vec<String>>] {
        &self.overrides
    }
}

impl LineSource for ScriptedSource {
    fn read_line(&mut self, prompt: &str, context: &CompletionContext) -> Result<Input> {
        self.prompts.push(prompt.to_string());
        self.overrides.push(context.get().map(<[String]>::to_vec));
        Ok(self.inputs.pop_front().unwrap_or(Input::EndOfInput))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_then_ends() {
        let mut source = ScriptedSource::new(["a", "b"]).then(Input::Interrupted);
        let ctx = CompletionContext::new();
        assert_eq!(source.read_line("> ", &ctx).unwrap(), Input::Line("a".into()));
        assert_eq!(source.read_line("> ", &ctx).unwrap(), Input::Line("b".into()));
        assert_eq!(source.read_line("> ", &ctx).unwrap(), Input::Interrupted);
        assert_eq!(source.read_line("> ", &ctx).unwrap(), Input::EndOfInput);
        assert_eq!(source.prompts().len(), 4);
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn records_overrides() {
        let mut source = ScriptedSource::new(["4"]);
        let mut ctx = CompletionContext::new();
        ctx.set(["2", "4"]);
        source.read_line("doors? ", &ctx).unwrap();
        assert_eq!(
            source.overrides(),
            &[Some(vec!["2".to_string(), "4".to_string()])]
        );
    }
}

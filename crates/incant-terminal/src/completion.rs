//! Completion of partially typed command lines.
//!
//! Every call re-derives its phase from the line itself:
//!
//! - **naming**: nothing typed yet, or the first block is still being typed;
//!   offers command names.
//! - **argument**: the command name is terminated. A trailing `name=<partial>`
//!   block offers that parameter's options (value sub-phase); otherwise the
//!   still-unfilled parameter names are offered as `name=` (name sub-phase).
//!
//! A [`CompletionContext`] override set by a running command replaces all of
//! the above.

use std::collections::BTreeSet;
use std::rc::Rc;

use crate::catalog::{Catalog, CommandSpec, ParamKind, ParameterSpec};
use crate::tokenizer::{BLOCK_SEPARATOR, Token, split_keyword, tokenize};

/// Explicit completion candidates for a nested prompt.
///
/// Owned by the session. A command sets it (through
/// [`Environment::prompt_with`](crate::registry::Environment::prompt_with))
/// before reading sub-prompt input; the session clears it after every
/// dispatch cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionContext {
    overrides: Option<Vec<String>>,
}

impl CompletionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<I, S>(&mut self, options: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.overrides = Some(options.into_iter().map(Into::into).collect());
    }

    pub fn clear(&mut self) {
        self.overrides = None;
    }

    pub fn get(&self) -> Option<&[String]> {
        self.overrides.as_deref()
    }

    pub fn is_set(&self) -> bool {
        self.overrides.is_some()
    }
}

/// Where a candidate set came from. Drives how it is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    Override,
    CommandName,
    ParameterName,
    ParameterValue,
}

/// A finite ordered candidate sequence.
///
/// Consumed either by index ([`get`](Self::get) until it returns `None`) or
/// as a whole through [`iter`](Self::iter) / `IntoIterator`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completions {
    start: usize,
    kind: CompletionKind,
    command: Option<String>,
    items: Vec<String>,
}

impl Completions {
    fn new(start: usize, kind: CompletionKind, items: Vec<String>) -> Self {
        Self {
            start,
            kind,
            command: None,
            items,
        }
    }

    fn empty(start: usize, kind: CompletionKind) -> Self {
        Self::new(start, kind, Vec::new())
    }

    fn for_command(mut self, command: &str) -> Self {
        self.command = Some(command.to_string());
        self
    }

    /// Byte offset in the line where a candidate replaces the typed text.
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn kind(&self) -> CompletionKind {
        self.kind
    }

    /// The command whose parameters are being completed.
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    /// The candidate at `state`, or `None` once the sequence is exhausted.
    pub fn get(&self, state: usize) -> Option<&str> {
        self.items.get(state).map(String::as_str)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.items.iter()
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl IntoIterator for Completions {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Completions {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Computes completions against a catalog snapshot.
#[derive(Debug, Clone)]
pub struct CompletionEngine {
    catalog: Rc<Catalog>,
}

impl CompletionEngine {
    pub fn new(catalog: Rc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Candidates for `partial`, the text being typed at the end of `line`.
    ///
    /// `line` is everything typed so far, up to the cursor.
    pub fn complete(&self, partial: &str, line: &str, context: &CompletionContext) -> Completions {
        let start = if line.ends_with(partial) {
            line.len() - partial.len()
        } else {
            line.len()
        };

        if let Some(overrides) = context.get() {
            let items = overrides
                .iter()
                .filter(|o| o.starts_with(partial))
                .cloned()
                .collect();
            return Completions::new(start, CompletionKind::Override, items);
        }

        let tokens = tokenize(line, BLOCK_SEPARATOR).tokens;
        match tokens.as_slice() {
            [] => self.command_names(partial, start),
            [only] if !only.terminated => self.command_names(partial, start),
            [command, blocks @ ..] => match self.catalog.get(&command.text) {
                Some(spec) => arguments(spec, blocks, partial, line),
                None => Completions::empty(start, CompletionKind::ParameterName),
            },
        }
    }

    /// Candidates at cursor `pos` in `line`, as a line editor asks for them.
    pub fn complete_at(&self, line: &str, pos: usize, context: &CompletionContext) -> Completions {
        let mut pos = pos.min(line.len());
        while !line.is_char_boundary(pos) {
            pos -= 1;
        }
        let head = &line[..pos];
        let tokens = tokenize(head, BLOCK_SEPARATOR);
        let partial = tokens
            .unterminated_tail()
            .map(|t| t.text.as_str())
            .unwrap_or("");
        self.complete(partial, head, context)
    }

    fn command_names(&self, partial: &str, start: usize) -> Completions {
        let items = self
            .catalog
            .names()
            .into_iter()
            .filter(|name| name.starts_with(partial) && *name != partial)
            .map(str::to_string)
            .collect();
        Completions::new(start, CompletionKind::CommandName, items)
    }
}

fn arguments(spec: &CommandSpec, blocks: &[Token], partial: &str, line: &str) -> Completions {
    let name_start = line.len() - partial.len().min(line.len());
    let (settled, typing) = match blocks.split_last() {
        Some((last, rest)) if !last.terminated => (rest, Some(last)),
        _ => (blocks, None),
    };

    if let Some(typing) = typing {
        let parts = split_keyword(&typing.text).into_texts();
        if let [name, value] = parts.as_slice() {
            let eligible = remaining(spec, settled)
                .into_iter()
                .find(|p| p.name() == name);
            let Some(param) = eligible else {
                return Completions::empty(name_start, CompletionKind::ParameterValue)
                    .for_command(spec.name());
            };
            let items = param
                .options()
                .into_iter()
                .filter(|o| o.starts_with(value.as_str()))
                .collect();
            return Completions::new(
                line.len() - value.len(),
                CompletionKind::ParameterValue,
                items,
            )
            .for_command(spec.name());
        }
    }

    let supplied = supplied_keywords(spec, blocks);
    let items = remaining(spec, settled)
        .into_iter()
        .filter(|p| !supplied.contains(p.name()))
        .map(|p| format!("{}=", p.name()))
        .filter(|candidate| candidate.starts_with(partial))
        .collect();
    Completions::new(name_start, CompletionKind::ParameterName, items).for_command(spec.name())
}

/// Parameters that can still be named: declared order, minus those consumed
/// by leading positional blocks, minus those already given as `name=`.
fn remaining<'s>(spec: &'s CommandSpec, blocks: &[Token]) -> Vec<&'s ParameterSpec> {
    let supplied = supplied_keywords(spec, blocks);
    let consumed = blocks
        .iter()
        .take_while(|b| keyword_name(spec, &b.text).is_none())
        .count();
    spec.arguments()
        .iter()
        .enumerate()
        .filter(|(i, p)| {
            matches!(p.kind(), ParamKind::PositionalOrKeyword | ParamKind::KeywordOnly)
                && !(p.kind().takes_positional() && *i < consumed)
                && !supplied.contains(p.name())
        })
        .map(|(_, p)| p)
        .collect()
}

fn supplied_keywords<'s>(spec: &'s CommandSpec, blocks: &[Token]) -> BTreeSet<&'s str> {
    blocks
        .iter()
        .filter_map(|b| keyword_name(spec, &b.text))
        .collect()
}

fn keyword_name<'s>(spec: &'s CommandSpec, block: &str) -> Option<&'s str> {
    spec.arguments()
        .iter()
        .map(ParameterSpec::name)
        .find(|name| {
            block
                .strip_prefix(name)
                .is_some_and(|rest| rest.starts_with('='))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use incant_types::{EnumType, TypeTag, Value};

    fn gear() -> EnumType {
        EnumType::new("Gear", ["crash_pads", "dance_shoes", "mysterious_fossil"])
    }

    fn engine() -> CompletionEngine {
        let mut catalog = Catalog::new();
        catalog.insert(
            CommandSpec::new("add_fuel")
                .with_param(ParameterSpec::receiver("self"))
                .with_param(ParameterSpec::new("gallons", TypeTag::Float))
                .with_param(
                    ParameterSpec::new("top_off", TypeTag::Bool).with_default(Value::Bool(false)),
                ),
        );
        catalog.insert(
            CommandSpec::new("add_gear")
                .with_param(ParameterSpec::new("gear", TypeTag::Enum(gear())))
                .with_param(
                    ParameterSpec::new("quantity", TypeTag::Int).with_default(Value::Int(1)),
                ),
        );
        catalog.insert(
            CommandSpec::new("help")
                .with_param(ParameterSpec::new("command", TypeTag::Str).with_default(Value::None)),
        );
        catalog.insert(CommandSpec::accessor("speed", "current speed"));
        CompletionEngine::new(Rc::new(catalog))
    }

    fn items(c: Completions) -> Vec<String> {
        c.into_iter().collect()
    }

    fn at_end(line: &str) -> Completions {
        engine().complete_at(line, line.len(), &CompletionContext::new())
    }

    #[test]
    fn naming_by_prefix() {
        let c = engine().complete("ad", "ad", &CompletionContext::new());
        assert_eq!(c.kind(), CompletionKind::CommandName);
        assert_eq!(c.start(), 0);
        assert_eq!(items(c), vec!["add_fuel", "add_gear"]);
    }

    #[test]
    fn naming_empty_line_lists_everything() {
        assert_eq!(
            items(at_end("")),
            vec!["add_fuel", "add_gear", "help", "speed"]
        );
    }

    #[test]
    fn exact_name_is_not_offered() {
        assert!(engine().complete("help", "help", &CompletionContext::new()).is_empty());
    }

    #[test]
    fn argument_phase_offers_names_in_declared_order() {
        let c = at_end("add_fuel ");
        assert_eq!(c.kind(), CompletionKind::ParameterName);
        assert_eq!(c.command(), Some("add_fuel"));
        assert_eq!(c.start(), 9);
        assert_eq!(items(c), vec!["gallons=", "top_off="]);
    }

    #[test]
    fn supplied_keyword_is_excluded() {
        assert_eq!(items(at_end("add_fuel gallons=9 ")), vec!["top_off="]);
    }

    #[test]
    fn positional_blocks_consume_in_order() {
        assert_eq!(items(at_end("add_fuel 12.5 ")), vec!["top_off="]);
        assert!(at_end("add_fuel 12.5 True ").is_empty());
    }

    #[test]
    fn keyword_supplied_anywhere_counts() {
        assert_eq!(items(at_end("add_fuel top_off=True ")), vec!["gallons="]);
    }

    #[test]
    fn name_prefix_filters() {
        assert_eq!(items(at_end("add_fuel to")), vec!["top_off="]);
    }

    #[test]
    fn partial_positional_value_gives_nothing() {
        assert!(at_end("add_fuel 12").is_empty());
    }

    #[test]
    fn value_phase_offers_options() {
        let c = at_end("add_gear gear=");
        assert_eq!(c.kind(), CompletionKind::ParameterValue);
        assert_eq!(c.start(), "add_gear gear=".len());
        assert_eq!(
            items(c),
            vec!["crash_pads", "dance_shoes", "mysterious_fossil"]
        );
    }

    #[test]
    fn value_phase_filters_by_prefix() {
        let c = at_end("add_gear gear=da");
        assert_eq!(c.start(), "add_gear gear=".len());
        assert_eq!(items(c), vec!["dance_shoes"]);
    }

    #[test]
    fn bool_values_implied() {
        assert_eq!(items(at_end("add_fuel 3 top_off=")), vec!["True", "False"]);
    }

    #[test]
    fn value_phase_without_options_is_empty() {
        assert!(at_end("add_fuel gallons=").is_empty());
    }

    #[test]
    fn value_phase_for_consumed_parameter_is_empty() {
        assert!(at_end("add_fuel 3 gallons=").is_empty());
    }

    #[test]
    fn unknown_or_accessor_command_gives_nothing() {
        assert!(at_end("fly ").is_empty());
        assert!(at_end("speed ").is_empty());
    }

    #[test]
    fn override_replaces_catalog_in_declared_order() {
        let mut context = CompletionContext::new();
        context.set(["6", "2", "4"]);
        let c = engine().complete("", "", &context);
        assert_eq!(c.kind(), CompletionKind::Override);
        assert_eq!(items(c), vec!["6", "2", "4"]);

        context.set(["20", "4", "2"]);
        assert_eq!(items(engine().complete_at("2", 1, &context)), vec!["20", "2"]);
    }

    #[test]
    fn cleared_override_restores_catalog() {
        let mut context = CompletionContext::new();
        context.set(["x"]);
        context.clear();
        assert!(!context.is_set());
        assert_eq!(items(engine().complete("he", "he", &context)), vec!["help"]);
    }

    #[test]
    fn index_pull_terminates() {
        let c = at_end("add_fuel ");
        assert_eq!(c.get(0), Some("gallons="));
        assert_eq!(c.get(1), Some("top_off="));
        assert_eq!(c.get(2), None);
        assert_eq!(c.iter().count(), c.len());
    }

    #[test]
    fn cursor_mid_line() {
        let line = "add_fuel gallons=9";
        let c = engine().complete_at(line, 5, &CompletionContext::new());
        assert_eq!(items(c), vec!["add_fuel"]);
    }

    #[test]
    fn repeated_calls_are_stable() {
        let e = engine();
        let ctx = CompletionContext::new();
        assert_eq!(
            e.complete_at("add_gear ", 9, &ctx),
            e.complete_at("add_gear ", 9, &ctx)
        );
    }
}

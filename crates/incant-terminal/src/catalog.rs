//! Command and parameter descriptors, and the immutable catalog of them.
//!
//! Every command is declared once at startup with an explicit
//! [`CommandSpec`]: its name, documentation, and ordered parameters with
//! declared type unions, defaults and completion options.

use std::collections::{BTreeMap, BTreeSet};

use incant_types::error::{IncantError, Result};
use incant_types::{TypeTag, Value};

/// How a parameter may be supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParamKind {
    PositionalOnly,
    PositionalOrKeyword,
    /// Absorbs every remaining positional block.
    VarPositional,
    KeywordOnly,
    /// Absorbs keyword blocks with unknown names.
    VarKeyword,
}

impl ParamKind {
    pub fn takes_positional(self) -> bool {
        matches!(self, Self::PositionalOnly | Self::PositionalOrKeyword)
    }

    pub fn takes_keyword(self) -> bool {
        matches!(self, Self::PositionalOrKeyword | Self::KeywordOnly)
    }

    pub fn is_variadic(self) -> bool {
        matches!(self, Self::VarPositional | Self::VarKeyword)
    }
}

/// One declared parameter of a command.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    name: String,
    kind: ParamKind,
    types: Vec<TypeTag>,
    default: Option<Value>,
    options: Option<Vec<String>>,
    receiver: bool,
}

impl ParameterSpec {
    /// A positional-or-keyword parameter of type `ty`.
    pub fn new(name: impl Into<String>, ty: TypeTag) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::PositionalOrKeyword,
            types: vec![ty],
            default: None,
            options: None,
            receiver: false,
        }
    }

    /// The implicit receiver slot. Binding and completion skip it when it
    /// leads the parameter list.
    pub fn receiver(name: impl Into<String>) -> Self {
        Self {
            kind: ParamKind::PositionalOnly,
            receiver: true,
            ..Self::new(name, TypeTag::Any)
        }
    }

    /// Append `ty` to the declared union. Types are tried in order.
    pub fn or(mut self, ty: TypeTag) -> Self {
        self.types.push(ty);
        self
    }

    pub fn with_kind(mut self, kind: ParamKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Explicit completion options; replaces those implied by bool and enum
    /// types.
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn types(&self) -> &[TypeTag] {
        &self.types
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_receiver(&self) -> bool {
        self.receiver
    }

    /// Must be supplied by the user.
    pub fn is_required(&self) -> bool {
        self.default.is_none() && !self.kind.is_variadic() && !self.receiver
    }

    /// Value completions: explicit options, else those implied by the types.
    pub fn options(&self) -> Vec<String> {
        match &self.options {
            Some(options) => options.clone(),
            None => {
                let mut seen = BTreeSet::new();
                self.types
                    .iter()
                    .flat_map(TypeTag::implied_options)
                    .filter(|o| seen.insert(o.clone()))
                    .collect()
            },
        }
    }

    /// Declared union rendered as `float|int`.
    pub fn type_label(&self) -> String {
        self.types
            .iter()
            .map(TypeTag::name)
            .collect::<Vec<_>>()
            .join("|")
    }

    fn usage(&self) -> String {
        let ty = self.type_label();
        let core = match self.kind {
            ParamKind::PositionalOnly => format!("<{}:{ty}>", self.name),
            ParamKind::PositionalOrKeyword | ParamKind::KeywordOnly => {
                format!("{}=<{ty}>", self.name)
            },
            ParamKind::VarPositional => return format!("[<{}:{ty}> ...]", self.name),
            ParamKind::VarKeyword => return format!("[<key>=<{ty}> ...]"),
        };
        if self.default.is_some() {
            format!("[{core}]")
        } else {
            core
        }
    }
}

/// A named command with its parameters and documentation.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    name: String,
    params: Vec<ParameterSpec>,
    doc: String,
    accessor: bool,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            doc: String::new(),
            accessor: false,
        }
    }

    /// A zero-argument accessor, invoked when its name is typed alone.
    pub fn accessor(name: impl Into<String>, doc: impl Into<String>) -> Self {
        Self {
            accessor: true,
            ..Self::new(name).with_doc(doc)
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    pub fn with_param(mut self, param: ParameterSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc(&self) -> &str {
        &self.doc
    }

    pub fn is_accessor(&self) -> bool {
        self.accessor
    }

    /// Every declared parameter, receiver included.
    pub fn params(&self) -> &[ParameterSpec] {
        &self.params
    }

    /// Parameters the user can supply: a leading receiver is dropped.
    pub fn arguments(&self) -> &[ParameterSpec] {
        match self.params.first() {
            Some(first) if first.is_receiver() => &self.params[1..],
            _ => &self.params,
        }
    }

    /// Look up a user-suppliable parameter by name.
    pub fn argument(&self, name: &str) -> Option<&ParameterSpec> {
        self.arguments().iter().find(|p| p.name() == name)
    }

    pub fn var_keyword(&self) -> Option<&ParameterSpec> {
        self.arguments()
            .iter()
            .find(|p| p.kind() == ParamKind::VarKeyword)
    }

    /// One-line usage, e.g. `add_fuel gallons=<float> [top_off=<bool>]`.
    pub fn usage(&self) -> String {
        let mut out = self.name.clone();
        for param in self.arguments() {
            out.push(' ');
            out.push_str(&param.usage());
        }
        out
    }

    /// Check the parameter list is well formed.
    ///
    /// Kinds must appear in declaration order (positional-only, then
    /// positional-or-keyword, variadic positional, keyword-only, variadic
    /// keyword), names must be unique, variadics may appear once each, a
    /// receiver may only lead, and a positional parameter without a
    /// default cannot follow one with a default.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(IncantError::Config(format!("{}: {msg}", self.name)));

        if self.name.is_empty() || self.name.chars().any(char::is_whitespace) {
            return fail("command names must be non-empty words".to_string());
        }
        if self.accessor && !self.arguments().is_empty() {
            return fail("accessors take no parameters".to_string());
        }

        let mut names = BTreeSet::new();
        let mut last_kind = ParamKind::PositionalOnly;
        let mut seen_default = false;
        for (i, param) in self.params.iter().enumerate() {
            if param.name().is_empty() || param.name().contains(['=', ' ']) {
                return fail(format!("invalid parameter name {:?}", param.name()));
            }
            if !names.insert(param.name()) {
                return fail(format!("duplicate parameter {}", param.name()));
            }
            if param.is_receiver() && i != 0 {
                return fail(format!("receiver {} must come first", param.name()));
            }
            if param.types().is_empty() {
                return fail(format!("parameter {} has no declared type", param.name()));
            }
            let kind = param.kind();
            if kind < last_kind || (kind == last_kind && kind.is_variadic() && i > 0) {
                return fail(format!("parameter {} is out of order", param.name()));
            }
            last_kind = kind;
            if kind.takes_positional() && !param.is_receiver() {
                if param.default().is_some() {
                    seen_default = true;
                } else if seen_default {
                    return fail(format!(
                        "required parameter {} follows a parameter with a default",
                        param.name()
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Immutable name-to-spec mapping.
///
/// Mutators and accessors are held apart so that an accessor and a mutator
/// may share a name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    commands: BTreeMap<String, CommandSpec>,
    accessors: BTreeMap<String, CommandSpec>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, spec: CommandSpec) {
        let map = if spec.is_accessor() {
            &mut self.accessors
        } else {
            &mut self.commands
        };
        map.insert(spec.name().to_string(), spec);
    }

    /// The command that takes arguments under `name`.
    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name)
    }

    /// The zero-argument accessor under `name`.
    pub fn accessor(&self, name: &str) -> Option<&CommandSpec> {
        self.accessors.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name) || self.accessors.contains_key(name)
    }

    /// Every callable name, sorted, each listed once.
    pub fn names(&self) -> Vec<&str> {
        let names: BTreeSet<&str> = self
            .commands
            .keys()
            .chain(self.accessors.keys())
            .map(String::as_str)
            .collect();
        names.into_iter().collect()
    }

    pub fn commands(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.values()
    }

    pub fn accessors(&self) -> impl Iterator<Item = &CommandSpec> {
        self.accessors.values()
    }

    pub fn len(&self) -> usize {
        self.names().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.accessors.is_empty()
    }
}

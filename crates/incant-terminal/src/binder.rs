//! Binding of argument blocks to a command's declared parameters.
//!
//! Blocks are positional or `name=value` keyword blocks. Positional blocks
//! come first and fill parameters in declaration order; keyword blocks may
//! follow in any order. Every raw value is coerced to the parameter's
//! declared type union, unfilled parameters take their defaults, and all
//! missing required parameters are reported together.

use std::collections::{BTreeMap, BTreeSet};

use incant_types::error::{IncantError, Result};
use incant_types::{TypeTag, Value};

use crate::catalog::{CommandSpec, ParamKind, ParameterSpec};
use crate::literal::read_literal;
use crate::tokenizer::split_keyword;

/// Typed arguments produced by [`bind`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArgs {
    positional: Vec<Value>,
    keyword: BTreeMap<String, Value>,
    /// Parameter name behind each positional value.
    slots: Vec<String>,
}

impl BoundArgs {
    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn keyword(&self) -> &BTreeMap<String, Value> {
        &self.keyword
    }

    /// The value bound to `name`, whether given by position, by keyword, or
    /// taken from its default. For a variadic positional parameter this is
    /// its first value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.keyword.get(name).or_else(|| {
            self.slots
                .iter()
                .position(|slot| slot == name)
                .map(|i| &self.positional[i])
        })
    }

    /// Every value absorbed by the variadic positional parameter `name`.
    pub fn variadic(&self, name: &str) -> &[Value] {
        match self.slots.iter().position(|slot| slot == name) {
            Some(start) => &self.positional[start..],
            None => &[],
        }
    }

    /// Keyword values whose names were not declared parameters.
    pub fn extra_keywords<'a>(
        &'a self,
        spec: &'a CommandSpec,
    ) -> impl Iterator<Item = (&'a str, &'a Value)> + 'a {
        self.keyword
            .iter()
            .filter(move |(name, _)| spec.argument(name).is_none())
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn value(&self, name: &str) -> Result<&Value> {
        self.get(name)
            .ok_or_else(|| IncantError::Command(format!("missing argument {name}")))
    }

    pub fn f64(&self, name: &str) -> Result<f64> {
        let value = self.value(name)?;
        value.as_f64().ok_or_else(|| mismatch(name, "float", value))
    }

    pub fn i64(&self, name: &str) -> Result<i64> {
        let value = self.value(name)?;
        value.as_i64().ok_or_else(|| mismatch(name, "int", value))
    }

    pub fn bool(&self, name: &str) -> Result<bool> {
        let value = self.value(name)?;
        value.as_bool().ok_or_else(|| mismatch(name, "bool", value))
    }

    pub fn str(&self, name: &str) -> Result<&str> {
        let value = self.value(name)?;
        value.as_str().ok_or_else(|| mismatch(name, "str", value))
    }

    pub fn enum_member(&self, name: &str) -> Result<&str> {
        let value = self.value(name)?;
        value.enum_member().ok_or_else(|| mismatch(name, "enum", value))
    }

    fn push_positional(&mut self, param: &ParameterSpec, value: Value) {
        self.positional.push(value);
        self.slots.push(param.name().to_string());
    }
}

fn mismatch(name: &str, expected: &str, value: &Value) -> IncantError {
    IncantError::Command(format!(
        "argument {name} is {} ({value}), expected {expected}",
        value.type_name()
    ))
}

// ---------------------------------------------------------------------------
// Binding
// ---------------------------------------------------------------------------

enum Block<'a> {
    Positional(&'a str),
    Keyword { name: String, raw: String },
}

/// Bind `blocks` against `spec`.
///
/// Fails with [`IncantError::Syntax`] for ordering, arity, unknown or
/// repeated names and missing parameters, and with
/// [`IncantError::TypeCoercion`] when a value fits none of its declared
/// types.
pub fn bind<B: AsRef<str>>(spec: &CommandSpec, blocks: &[B]) -> Result<BoundArgs> {
    let params = spec.arguments();
    let mut bound = BoundArgs::default();
    let mut filled: BTreeSet<&str> = BTreeSet::new();
    let mut next_positional = 0;
    let mut in_keywords = false;

    for block in blocks {
        let block = block.as_ref();
        match classify(spec, block, in_keywords)? {
            Block::Positional(raw) => {
                if in_keywords {
                    return Err(IncantError::Syntax(format!(
                        "positional argument {raw} follows keyword arguments"
                    )));
                }
                let Some(param) = params.get(next_positional) else {
                    return Err(too_many(spec));
                };
                match param.kind() {
                    kind if kind.takes_positional() => {
                        bound.push_positional(param, coerce(raw, param.types())?);
                        filled.insert(param.name());
                        next_positional += 1;
                    },
                    ParamKind::VarPositional => {
                        bound.push_positional(param, coerce(raw, param.types())?);
                    },
                    _ => return Err(too_many(spec)),
                }
            },
            Block::Keyword { name, raw } => {
                in_keywords = true;
                bind_keyword(spec, &mut bound, &mut filled, name, &raw)?;
            },
        }
    }

    let mut missing = Vec::new();
    for param in params {
        if filled.contains(param.name()) || param.kind().is_variadic() {
            continue;
        }
        match param.default() {
            Some(default) if param.kind() == ParamKind::PositionalOnly => {
                bound.push_positional(param, default.clone());
            },
            Some(default) => {
                bound
                    .keyword
                    .insert(param.name().to_string(), default.clone());
            },
            None => missing.push(param.name()),
        }
    }
    if !missing.is_empty() {
        return Err(IncantError::Syntax(format!(
            "{} is missing required parameters: {}",
            spec.name(),
            missing.join(", ")
        )));
    }

    Ok(bound)
}

fn bind_keyword<'s>(
    spec: &'s CommandSpec,
    bound: &mut BoundArgs,
    filled: &mut BTreeSet<&'s str>,
    name: String,
    raw: &str,
) -> Result<()> {
    match spec.argument(&name) {
        Some(param) if param.kind().takes_keyword() => {
            if filled.contains(param.name()) {
                return Err(IncantError::Syntax(format!(
                    "parameter {name} was given more than once"
                )));
            }
            let value = coerce(raw, param.types())?;
            filled.insert(param.name());
            bound.keyword.insert(name, value);
            Ok(())
        },
        Some(param) if param.kind() == ParamKind::PositionalOnly => Err(IncantError::Syntax(
            format!("parameter {name} is positional-only"),
        )),
        _ => match spec.var_keyword() {
            Some(catch_all) => {
                if bound.keyword.contains_key(&name) {
                    return Err(IncantError::Syntax(format!(
                        "parameter {name} was given more than once"
                    )));
                }
                let value = coerce(raw, catch_all.types())?;
                bound.keyword.insert(name, value);
                Ok(())
            },
            None => Err(IncantError::Syntax(format!(
                "{} has no parameter named {name}",
                spec.name()
            ))),
        },
    }
}

/// Decide whether `block` is a keyword block.
///
/// A block is keyword when it splits at a top-level `=` into a non-empty
/// name and a non-empty value and the name is a declared parameter. `name=`
/// with nothing after it is positional text. An undeclared but
/// identifier-like name is also keyword once keyword blocks have started or
/// when the command accepts arbitrary keywords; otherwise the whole block
/// is a positional value.
fn classify<'a>(spec: &CommandSpec, block: &'a str, in_keywords: bool) -> Result<Block<'a>> {
    let parts = split_keyword(block).into_texts();
    let [name, raw] = parts.as_slice() else {
        return Ok(Block::Positional(block));
    };
    if name.is_empty() || raw.is_empty() {
        return Ok(Block::Positional(block));
    }
    let declared = spec.argument(name).is_some();
    if declared || (is_identifier(name) && (in_keywords || spec.var_keyword().is_some())) {
        return Ok(Block::Keyword {
            name: name.clone(),
            raw: raw.clone(),
        });
    }
    Ok(Block::Positional(block))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn too_many(spec: &CommandSpec) -> IncantError {
    let capacity = spec
        .arguments()
        .iter()
        .filter(|p| p.kind().takes_positional())
        .count();
    IncantError::Syntax(format!(
        "too many positional arguments: {} takes at most {capacity}",
        spec.name()
    ))
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

/// Convert raw argument text to the first declared type that accepts it.
///
/// A literal (`12.5`, `'text'`, `[1, 2]`, `None`, ...) whose type is in the
/// union is taken as is. Otherwise each declared type is tried in order:
/// enums accept `TypeName.member` when `TypeName` matches, then each type's
/// constructor runs on the raw text. Booleans accept only `True` and
/// `False`.
pub fn coerce(raw: &str, types: &[TypeTag]) -> Result<Value> {
    let literal = read_literal(raw);
    if let Some(value) = &literal
        && types.iter().any(|ty| ty.accepts(value))
    {
        return Ok(value.clone());
    }

    for ty in types {
        if let TypeTag::Enum(enum_type) = ty
            && let Some((type_name, member)) = raw.split_once('.')
            && type_name == enum_type.name()
            && let Some(value) = enum_type.member(member)
        {
            return Ok(value);
        }
        if let Some(value) = construct(ty, raw, literal.as_ref()) {
            return Ok(value);
        }
    }

    Err(IncantError::TypeCoercion {
        value: raw.to_string(),
        types: types.iter().map(|ty| ty.name().to_string()).collect(),
    })
}

fn construct(ty: &TypeTag, raw: &str, literal: Option<&Value>) -> Option<Value> {
    match ty {
        TypeTag::Any => Some(
            literal
                .cloned()
                .unwrap_or_else(|| Value::Str(raw.to_string())),
        ),
        TypeTag::Bool => match raw {
            "True" => Some(Value::Bool(true)),
            "False" => Some(Value::Bool(false)),
            _ => None,
        },
        TypeTag::Int => raw.parse().ok().map(Value::Int),
        TypeTag::Float => raw.parse().ok().map(Value::Float),
        TypeTag::Str => Some(Value::Str(raw.to_string())),
        TypeTag::List => literal
            .and_then(Value::as_items)
            .map(|items| Value::List(items.to_vec())),
        TypeTag::Tuple => literal
            .and_then(Value::as_items)
            .map(|items| Value::Tuple(items.to_vec())),
        TypeTag::Dict => literal.filter(|v| matches!(v, Value::Dict(_))).cloned(),
        TypeTag::NoneType => literal.filter(|v| v.is_none()).cloned(),
        TypeTag::Enum(enum_type) => enum_type.member(raw),
    }
}

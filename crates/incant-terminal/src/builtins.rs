//! Commands every registry carries.

use incant_types::error::{IncantError, Result};
use incant_types::{TypeTag, Value};

use crate::binder::BoundArgs;
use crate::catalog::{Catalog, CommandSpec, ParameterSpec};
use crate::display::columnize;
use crate::registry::{CommandOutput, Environment};

const HELP_DOC: &str = "Print a command's documentation. Without a command, list every command.";

pub(crate) fn help_spec() -> CommandSpec {
    CommandSpec::new("help").with_doc(HELP_DOC).with_param(
        ParameterSpec::new("command", TypeTag::Str)
            .or(TypeTag::NoneType)
            .with_default(Value::None),
    )
}

/// `help [command]`
pub(crate) fn help<S>(args: &BoundArgs, env: &mut Environment<'_, S>) -> Result<CommandOutput> {
    match args.get("command") {
        Some(Value::Str(name)) => describe(env.catalog(), name).map(CommandOutput::Text),
        _ => {
            let names = env.catalog().names();
            Ok(CommandOutput::Text(format!(
                "{HELP_DOC}\n\n{}",
                columnize(&names, env.columns())
            )))
        },
    }
}

fn describe(catalog: &Catalog, name: &str) -> Result<String> {
    let section = |spec: &CommandSpec| {
        let mut out = format!("  {}", spec.usage());
        for line in spec.doc().lines() {
            out.push_str("\n    ");
            out.push_str(line.trim());
        }
        out
    };

    match (catalog.accessor(name), catalog.get(name)) {
        (Some(accessor), Some(mutator)) => Ok(format!(
            "Without parameters:\n{}\nWith parameters:\n{}",
            section(accessor),
            section(mutator)
        )),
        (Some(spec), None) | (None, Some(spec)) => Ok(section(spec).trim_start().to_string()),
        (None, None) => Err(IncantError::Command(format!(
            "{name} is not a callable command"
        ))),
    }
}

//! Demo catalog: a car to fuel, name, load up and drive.

use incant_terminal::{CommandOutput, CommandRegistry, CommandSpec, ParameterSpec, coerce};
use incant_types::error::{IncantError, Result};
use incant_types::{EnumType, TypeTag, Value};

/// Fuel level after `add_fuel top_off=True`.
const TANK_GALLONS: f64 = 15.0;

/// Car state driven by the demo commands.
#[derive(Debug, Clone, PartialEq)]
pub struct TestDrive {
    pub vehicle_speed: f64,
    pub gallons: f64,
    pub num_doors: i64,
    pub passengers: Vec<String>,
    pub gear: Vec<String>,
    pub car_name: String,
}

impl Default for TestDrive {
    fn default() -> Self {
        Self {
            vehicle_speed: 0.0,
            gallons: 0.0,
            num_doors: 0,
            passengers: Vec::new(),
            gear: Vec::new(),
            car_name: "first car".to_string(),
        }
    }
}

fn gear_type() -> EnumType {
    EnumType::new("Gear", ["crash_pads", "dance_shoes", "mysterious_fossil"])
}

pub fn registry() -> Result<CommandRegistry<TestDrive>> {
    let mut registry = CommandRegistry::<TestDrive>::new();

    registry.register_accessor("name", "Return the car's name.", |env| {
        Ok(CommandOutput::Value(Value::Str(env.state.car_name.clone())))
    })?;
    registry.register(
        CommandSpec::new("name")
            .with_doc("Name the car.")
            .with_param(ParameterSpec::receiver("self"))
            .with_param(ParameterSpec::new("name", TypeTag::Str)),
        |args, env| {
            env.state.car_name = args.str("name")?.to_string();
            Ok(CommandOutput::None)
        },
    )?;

    registry.register_accessor("speed", "Return the current speed.", |env| {
        Ok(CommandOutput::Value(Value::Float(env.state.vehicle_speed)))
    })?;
    registry.register(
        CommandSpec::new("speed")
            .with_doc("Set the current speed.")
            .with_param(ParameterSpec::receiver("self"))
            .with_param(
                ParameterSpec::new("speed", TypeTag::Float).with_default(Value::Float(0.0)),
            ),
        |args, env| {
            env.state.vehicle_speed = args.f64("speed")?;
            Ok(CommandOutput::None)
        },
    )?;

    registry.register(
        CommandSpec::new("add_fuel")
            .with_doc("Add some fuel.")
            .with_param(ParameterSpec::receiver("self"))
            .with_param(
                ParameterSpec::new("gallons", TypeTag::Float).with_default(Value::Float(0.0)),
            )
            .with_param(
                ParameterSpec::new("top_off", TypeTag::Bool).with_default(Value::Bool(false)),
            ),
        |args, env| {
            let gallons = args.f64("gallons")?;
            if gallons < 0.0 {
                return Err(IncantError::Command(format!(
                    "cannot add {gallons} gallons"
                )));
            }
            env.state.gallons += gallons;
            if args.bool("top_off")? {
                env.state.gallons = env.state.gallons.max(TANK_GALLONS);
            }
            Ok(CommandOutput::Value(Value::Float(env.state.gallons)))
        },
    )?;

    registry.register(
        CommandSpec::new("add_passengers")
            .with_doc("Seat a list of passengers.")
            .with_param(ParameterSpec::receiver("self"))
            .with_param(ParameterSpec::new("passenger_list", TypeTag::List))
            .with_param(
                ParameterSpec::new("buckle_them", TypeTag::Bool).with_default(Value::Bool(true)),
            ),
        |args, env| {
            let passengers = args
                .value("passenger_list")?
                .as_items()
                .unwrap_or_default()
                .iter()
                .map(|p| match p {
                    Value::Str(name) => name.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>();
            let buckled = if args.bool("buckle_them")? {
                " (buckled)"
            } else {
                ""
            };
            let lines = passengers
                .iter()
                .map(|p| format!("adding: {p}{buckled}"))
                .collect::<Vec<_>>()
                .join("\n");
            env.state.passengers = passengers;
            Ok(CommandOutput::Text(lines))
        },
    )?;

    registry.register(
        CommandSpec::new("add_gear")
            .with_doc("Pack a piece of gear.")
            .with_param(ParameterSpec::receiver("self"))
            .with_param(ParameterSpec::new("gear", TypeTag::Enum(gear_type()))),
        |args, env| {
            let gear = args.value("gear")?.to_string();
            env.state.gear.push(gear.clone());
            Ok(CommandOutput::Text(format!("adding {gear}")))
        },
    )?;

    registry.register(
        CommandSpec::new("add_specs_from_user_input")
            .with_doc("Add specs from the user.")
            .with_param(ParameterSpec::receiver("self")),
        |_, env| {
            let answer =
                env.prompt_with("How many doors does your vehicle have? ", ["2", "4", "6"])?;
            let doors = coerce(answer.trim(), &[TypeTag::Int])?;
            env.state.num_doors = doors.as_i64().unwrap_or_default();
            Ok(CommandOutput::None)
        },
    )?;

    registry.register_accessor("door_count", "The number of doors.", |env| {
        Ok(CommandOutput::Value(Value::Int(env.state.num_doors)))
    })?;

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use incant_terminal::{CompletionEngine, Input, ScriptedSource, Session};

    fn drive(lines: &[&str]) -> (TestDrive, String) {
        let mut session = Session::new(
            registry().unwrap(),
            TestDrive::default(),
            ScriptedSource::new(lines.iter().copied()),
            Vec::new(),
        );
        session.run().unwrap();
        let out = String::from_utf8_lossy(session.output()).into_owned();
        (session.into_state(), out)
    }

    #[test]
    fn fuel_and_speed() {
        let (car, out) = drive(&["add_fuel 12.5", "add_fuel gallons=2", "speed 30", "speed"]);
        assert_eq!(car.gallons, 14.5);
        assert_eq!(car.vehicle_speed, 30.0);
        assert_eq!(out, "12.5\n14.5\n30.0\nEOF\n");
    }

    #[test]
    fn top_off_fills_the_tank() {
        let (car, _) = drive(&["add_fuel top_off=True"]);
        assert_eq!(car.gallons, TANK_GALLONS);
    }

    #[test]
    fn negative_fuel_is_a_command_error() {
        let (car, out) = drive(&["add_fuel -3"]);
        assert_eq!(car.gallons, 0.0);
        assert!(out.contains("error: add_fuel raised an error"));
    }

    #[test]
    fn naming_the_car() {
        let (car, out) = drive(&["name", "name 'red rocket'", "name"]);
        assert_eq!(car.car_name, "red rocket");
        assert_eq!(out, "first car\nred rocket\nEOF\n");
    }

    #[test]
    fn passengers_keep_commas_inside_the_list() {
        let (car, out) = drive(&["add_passengers ['fred, jr', 'phyllis'] buckle_them=False"]);
        assert_eq!(car.passengers, vec!["fred, jr", "phyllis"]);
        assert!(out.starts_with("adding: fred, jr\nadding: phyllis\n"));
    }

    #[test]
    fn gear_by_member_or_dotted_name() {
        let (car, out) = drive(&[
            "add_gear Gear.dance_shoes",
            "add_gear crash_pads",
            "add_gear Tool.wrench",
        ]);
        assert_eq!(car.gear, vec!["Gear.dance_shoes", "Gear.crash_pads"]);
        assert!(out.contains("error: type error"));
    }

    #[test]
    fn door_sub_prompt() {
        let (car, out) = drive(&["add_specs_from_user_input", "4", "door_count"]);
        assert_eq!(car.num_doors, 4);
        assert_eq!(out, "4\nEOF\n");
    }

    #[test]
    fn door_sub_prompt_offers_only_door_counts() {
        let mut session = Session::new(
            registry().unwrap(),
            TestDrive::default(),
            ScriptedSource::new(["add_specs_from_user_input", "six"]).then(Input::Interrupted),
            Vec::new(),
        );
        session.run().unwrap();
        let seen = session.source().overrides();
        assert_eq!(
            seen[1].as_deref(),
            Some(&["2".to_string(), "4".to_string(), "6".to_string()][..])
        );
        assert_eq!(seen[2], None);
        let out = String::from_utf8_lossy(session.output()).into_owned();
        assert!(out.contains("add_specs_from_user_input raised an error: type error"));
    }

    #[test]
    fn help_for_property_pair() {
        let (_, out) = drive(&["help speed"]);
        assert!(out.starts_with("Without parameters:\n  speed\n    Return the current speed."));
        assert!(out.contains("With parameters:\n  speed [speed=<float>]"));
    }

    #[test]
    fn completions_over_demo_catalog() {
        let registry = registry().unwrap();
        let engine = CompletionEngine::new(registry.catalog());
        let ctx = Default::default();
        let names: Vec<String> = engine.complete_at("add_", 4, &ctx).into_iter().collect();
        assert_eq!(
            names,
            vec!["add_fuel", "add_gear", "add_passengers", "add_specs_from_user_input"]
        );
        let gear: Vec<String> = engine
            .complete_at("add_gear gear=m", 15, &ctx)
            .into_iter()
            .collect();
        assert_eq!(gear, vec!["mysterious_fossil"]);
    }
}

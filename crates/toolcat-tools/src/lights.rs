//! Room light controls.
//!
//! Both functions only echo what they were asked to do; there is no device
//! behind them.

use serde_json::{Value, json};
use toolcat_core::{ArgumentPolicy, Catalog, CatalogError, FunctionSpec, ParameterSchema, ParameterSpec};

pub const COLOR_TEMPERATURES: [&str; 3] = ["daylight", "cool", "warm"];

fn set_light_values_spec() -> FunctionSpec {
    FunctionSpec::new(
        "set_light_values",
        "Set the brightness and color temperature of a room light",
        ParameterSchema::new()
            .required(
                "brightness",
                ParameterSpec::integer(
                    "Light level from 0 to 100. Zero is off and 100 is full brightness",
                )
                .with_range(0, 100),
            )
            .required(
                "color_temp",
                ParameterSpec::string(
                    "Color temperature of the light fixture, which can be `daylight`, `cool` or `warm`.",
                )
                .with_enum(COLOR_TEMPERATURES),
            ),
    )
}

fn turn_on_light_spec() -> FunctionSpec {
    FunctionSpec::new(
        "turn_on_light",
        "Turn on or off the room light",
        ParameterSchema::new().required(
            "on",
            ParameterSpec::boolean("Whether to turn on or off the light"),
        ),
    )
}

/// `set_light_values` and `turn_on_light`, in that order.
pub fn lights_catalog(policy: ArgumentPolicy) -> Result<Catalog, CatalogError> {
    let mut catalog = Catalog::with_policy(policy);

    // Values are echoed as received; range and enum checks belong to the policy.
    catalog.register_fn(set_light_values_spec(), |args| async move {
        let brightness: Value = args.required("brightness")?;
        let color_temp: Value = args.required("color_temp")?;
        anyhow::Ok(json!({
            "brightness": brightness,
            "colorTemperature": color_temp,
        }))
    })?;

    catalog.register_fn(turn_on_light_spec(), |args| async move {
        let on: bool = args.required("on")?;
        anyhow::Ok(json!(if on { "Light turned on" } else { "Light turned off" }))
    })?;

    Ok(catalog)
}

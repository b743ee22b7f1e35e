//! Interactive prompts for the prediction form

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};

use super::{parse_ocean_proximity, PredictArgs};
use crate::data::OceanProximity;
use crate::inference::{FieldKind, FormInput, FIELDS};

/// Launcher theme shared by every prompt
pub(crate) fn theme() -> ColorfulTheme {
    ColorfulTheme {
        active_item_prefix: dialoguer::console::style("  ›".to_string()).for_stderr().cyan(),
        active_item_style: dialoguer::console::Style::new().for_stderr().white().bold(),
        inactive_item_prefix: dialoguer::console::style("   ".to_string()).for_stderr(),
        inactive_item_style: dialoguer::console::Style::new().for_stderr().color256(245),
        prompt_prefix: dialoguer::console::style("  ?".to_string()).for_stderr().color256(111),
        prompt_style: dialoguer::console::Style::new().for_stderr().white().bold(),
        ..ColorfulTheme::default()
    }
}

/// Complete a form from flags, prompting for every value not given
pub fn prompt_missing(args: &PredictArgs) -> anyhow::Result<FormInput> {
    let theme = theme();
    let mut values = [0.0; 8];

    for ((value, given), spec) in values.iter_mut().zip(args.values()).zip(FIELDS.iter()) {
        *value = match given {
            Some(v) => v,
            None => {
                let range = match spec.kind {
                    FieldKind::Integer => format!("{:.0}–{:.0}", spec.min, spec.max),
                    FieldKind::Decimal => format!("{}–{}", spec.min, spec.max),
                };
                Input::<f64>::with_theme(&theme)
                    .with_prompt(format!("{} ({})", spec.label, range))
                    .default(spec.default_value())
                    .validate_with(|v: &f64| -> Result<(), String> {
                        spec.check(*v).map_err(|e| e.to_string())
                    })
                    .interact_text()?
            }
        };
    }

    let ocean_proximity = match args.ocean_proximity.as_deref() {
        Some(s) => parse_ocean_proximity(s)?,
        None => {
            let labels: Vec<&str> = OceanProximity::ALL.iter().map(|p| p.as_str()).collect();
            let idx = Select::with_theme(&theme)
                .with_prompt("Ocean Proximity")
                .items(&labels)
                .default(0)
                .interact()?;
            OceanProximity::ALL[idx]
        }
    };

    Ok(FormInput::from_values(values, ocean_proximity))
}

use anyhow::Result;
use colored::Colorize;
use schema_sdk::{
    EnumOptions, PrimitiveOptions, PrimitiveOutput, PropertyView, SchemaSdk, TypeOptions,
};

use crate::cli::{EnumsArgs, OutputFormat, PrimitiveOutputArg, PrimitivesArgs, TypeArgs};
use crate::output::{print_json, print_table};

pub fn version(sdk: &SchemaSdk, format: OutputFormat) -> Result<()> {
    let version = sdk.version().unwrap_or_else(|| "(none)".to_string());
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "version": version,
            "state": format!("{:?}", sdk.state()),
            "updateMode": sdk.options().update_mode,
        })),
        OutputFormat::Table => {
            println!("{}: {}", "Version".cyan(), version);
            println!("{}: {:?}", "State".cyan(), sdk.state());
            println!("{}: {}", "Update mode".cyan(), sdk.options().update_mode);
            Ok(())
        }
    }
}

pub fn types(sdk: &SchemaSdk, format: OutputFormat) -> Result<()> {
    let types = sdk.get_types(TypeOptions::default())?;
    match format {
        OutputFormat::Json => print_json(&*types),
        OutputFormat::Table => {
            let rows = types
                .iter()
                .map(|t| {
                    [
                        t.name.clone(),
                        t.plural_name.clone(),
                        t.properties.len().to_string(),
                        t.description.clone().unwrap_or_default(),
                    ]
                })
                .collect();
            print_table(["Name", "Plural", "Properties", "Description"], rows);
            Ok(())
        }
    }
}

pub fn type_view(sdk: &SchemaSdk, args: &TypeArgs, format: OutputFormat) -> Result<()> {
    let options = TypeOptions {
        primitive_types: args.graphql_primitives.then_some(PrimitiveOutput::Graphql),
        group_properties: args.group,
        include_meta_fields: args.meta,
        use_minimum_viable_record: args.mvr,
    };
    let view = sdk.get_type(&args.name, options)?;

    if let OutputFormat::Json = format {
        return print_json(&*view);
    }

    println!("{} ({})", view.name.cyan().bold(), view.plural_name);
    if let Some(description) = &view.description {
        println!("{description}");
    }
    if view.fieldsets.is_empty() {
        print_table(
            ["Property", "Type", "Flags"],
            view.properties
                .iter()
                .map(|(name, p)| [name.clone(), p.property_type.clone(), flags(p)])
                .collect(),
        );
    } else {
        for fieldset in &view.fieldsets {
            println!("\n{}", fieldset.heading.bold());
            print_table(
                ["Property", "Type", "Flags"],
                fieldset
                    .properties
                    .iter()
                    .map(|(name, p)| [name.clone(), p.property_type.clone(), flags(p)])
                    .collect(),
            );
        }
    }
    Ok(())
}

fn flags(property: &PropertyView) -> String {
    let mut flags = Vec::new();
    if property.required {
        flags.push("required".to_string());
    }
    if property.unique {
        flags.push("unique".to_string());
    }
    if property.has_many {
        flags.push("many".to_string());
    }
    if let Some(relationship) = &property.relationship {
        let arrow = match property.direction {
            Some(schema_sdk::Direction::Incoming) => "<-",
            _ => "->",
        };
        flags.push(format!("{arrow}{relationship}"));
    }
    if property.deprecation_reason.is_some() {
        flags.push("deprecated".to_string());
    }
    flags.join(", ")
}

pub fn enums(sdk: &SchemaSdk, args: &EnumsArgs, format: OutputFormat) -> Result<()> {
    let enums = sdk.get_enums(EnumOptions {
        with_meta: args.meta,
    })?;
    match format {
        OutputFormat::Json => print_json(&*enums),
        OutputFormat::Table => {
            for (name, view) in enums.iter() {
                match &view.description {
                    Some(description) => println!("{} - {}", name.cyan(), description),
                    None => println!("{}", name.cyan()),
                }
                for option in &view.options {
                    match &option.description {
                        Some(description) => println!("  {}: {}", option.value, description),
                        None => println!("  {}", option.value),
                    }
                }
            }
            Ok(())
        }
    }
}

pub fn graphql(sdk: &SchemaSdk) -> Result<()> {
    let defs = sdk.get_graphql_defs()?;
    println!("{}", defs.join("\n\n"));
    Ok(())
}

pub fn primitives(sdk: &SchemaSdk, args: &PrimitivesArgs, format: OutputFormat) -> Result<()> {
    let output = match args.output {
        PrimitiveOutputArg::Graphql => PrimitiveOutput::Graphql,
        PrimitiveOutputArg::Component => PrimitiveOutput::Component,
    };
    let primitives = sdk.get_primitive_types(PrimitiveOptions { output })?;
    match format {
        OutputFormat::Json => print_json(&*primitives),
        OutputFormat::Table => {
            let rows = primitives
                .iter()
                .map(|(name, mapped)| [name.clone(), mapped.clone()])
                .collect();
            print_table(["Primitive", "Maps to"], rows);
            Ok(())
        }
    }
}

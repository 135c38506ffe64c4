use crate::catalog::{OperationSpec, Segment};
use crate::params::{ParamKind, ParamSpec, ParamValue, Parameters};
use dotrelay_core::{Argument, CommandLine, DotrelayError, Result};
use std::path::PathBuf;

/// Parameter every operation accepts; it selects the process working
/// directory and never reaches the argument vector.
pub const WORKING_DIRECTORY: &str = "workingDirectory";

/// An operation resolved against caller parameters, ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedCommand {
    pub operation: &'static OperationSpec,
    pub command_line: CommandLine,
    pub working_directory: Option<PathBuf>,
}

pub(crate) fn prepare(
    operation: &'static OperationSpec,
    params: &Parameters,
) -> Result<PreparedCommand> {
    let command_line = compose(operation, params)?;
    let working_directory = match params.get(WORKING_DIRECTORY) {
        None => None,
        Some(ParamValue::Text(dir)) if dir.trim().is_empty() => None,
        Some(ParamValue::Text(dir)) => Some(PathBuf::from(dir)),
        Some(_) => {
            return Err(invalid(operation, WORKING_DIRECTORY, "expected a path"));
        }
    };

    Ok(PreparedCommand {
        operation,
        command_line,
        working_directory,
    })
}

/// Build the argument vector for `operation` from `params`.
///
/// Omitted and blank values contribute nothing; switches contribute their
/// flag only when true. Unknown names, missing required values and values of
/// the wrong type are rejected before anything is spawned.
pub fn compose(operation: &OperationSpec, params: &Parameters) -> Result<CommandLine> {
    if let Some(unknown) = params.names().find(|name| !operation.accepts(name)) {
        return Err(DotrelayError::UnknownParameter {
            operation: operation.name.to_string(),
            parameter: unknown.to_string(),
        });
    }

    let mut line = CommandLine::new();
    for segment in operation.segments {
        match segment {
            Segment::Literal(words) => {
                for word in words.split_whitespace() {
                    line.push(Argument::new(word));
                }
            }
            Segment::Positional(spec) => {
                if let Some(value) = resolve_value(operation, spec, params)? {
                    line.push(spec.argument(value));
                }
            }
            Segment::Flag(flag, spec) => {
                if let Some(value) = resolve_value(operation, spec, params)? {
                    line.push(Argument::new(*flag));
                    line.push(spec.argument(value));
                }
            }
            Segment::Switch(flag, spec) => {
                if resolve_switch(operation, spec, params)? {
                    line.push(Argument::new(*flag));
                }
            }
            Segment::FirstOf(choices) => {
                let mut chosen = None;
                for (flag, spec) in choices.iter() {
                    // every choice is still validated
                    if resolve_switch(operation, spec, params)? && chosen.is_none() {
                        chosen = Some(*flag);
                    }
                }
                if let Some(flag) = chosen {
                    line.push(Argument::new(flag));
                }
            }
        }
    }

    Ok(line)
}

fn resolve_value(
    operation: &OperationSpec,
    spec: &ParamSpec,
    params: &Parameters,
) -> Result<Option<String>> {
    let value = match (params.get(spec.name), spec.kind) {
        (None, _) => None,
        (Some(ParamValue::Text(s)), _) if s.trim().is_empty() => None,
        (Some(ParamValue::Text(s)), ParamKind::Text) => Some(s.clone()),
        (Some(ParamValue::Integer(i)), _) => Some(i.to_string()),
        (Some(ParamValue::Text(s)), ParamKind::Integer) => match s.trim().parse::<i64>() {
            Ok(i) => Some(i.to_string()),
            Err(_) => return Err(invalid(operation, spec.name, "expected an integer")),
        },
        (Some(ParamValue::Bool(_)), _) => {
            return Err(invalid(operation, spec.name, "expected a value, not a switch"))
        }
        (Some(ParamValue::Text(_)), ParamKind::Switch) => {
            return Err(invalid(operation, spec.name, "expected a switch"))
        }
    };

    if value.is_none() && spec.required {
        return Err(DotrelayError::MissingParameter {
            operation: operation.name.to_string(),
            parameter: spec.name.to_string(),
        });
    }
    Ok(value)
}

fn resolve_switch(
    operation: &OperationSpec,
    spec: &ParamSpec,
    params: &Parameters,
) -> Result<bool> {
    match params.get(spec.name) {
        None => Ok(false),
        Some(ParamValue::Bool(b)) => Ok(*b),
        Some(ParamValue::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "" | "false" => Ok(false),
            "true" => Ok(true),
            _ => Err(invalid(operation, spec.name, "expected true or false")),
        },
        Some(ParamValue::Integer(_)) => {
            Err(invalid(operation, spec.name, "expected true or false"))
        }
    }
}

fn invalid(operation: &OperationSpec, parameter: &str, reason: &str) -> DotrelayError {
    DotrelayError::InvalidParameter {
        operation: operation.name.to_string(),
        parameter: parameter.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn compose_named(name: &str, params: Parameters) -> Result<String> {
        let op = Catalog::builtin().get(name).unwrap();
        compose(op, &params).map(|line| line.to_string())
    }

    #[test]
    fn test_add_migration() {
        let line = compose_named(
            "ef_migrations_add",
            Parameters::new().with("name", "InitialCreate"),
        )
        .unwrap();
        assert_eq!(line, "ef migrations add InitialCreate");
    }

    #[test]
    fn test_add_migration_with_options() {
        let line = compose_named(
            "ef_migrations_add",
            Parameters::new()
                .with("name", "AddUserTable")
                .with("outputDir", "Migrations")
                .with("context", "ApplicationDbContext"),
        )
        .unwrap();
        assert_eq!(
            line,
            "ef migrations add AddUserTable --output-dir Migrations --context ApplicationDbContext"
        );
    }

    #[test]
    fn test_update_database_full() {
        let line = compose_named(
            "ef_database_update",
            Parameters::new()
                .with("targetMigration", "InitialMigration")
                .with("connection", "Server=.;Database=Test;")
                .with("context", "ApplicationDbContext")
                .with("project", "MyProject.csproj"),
        )
        .unwrap();
        assert_eq!(
            line,
            "ef database update InitialMigration --connection \"Server=.;Database=Test;\" --context ApplicationDbContext --project MyProject.csproj"
        );
    }

    #[test]
    fn test_update_database_bare() {
        let line = compose_named("ef_database_update", Parameters::new()).unwrap();
        assert_eq!(line, "ef database update");
    }

    #[test]
    fn test_nuget_locals_clear() {
        let line = compose_named(
            "nuget_locals",
            Parameters::new().with("cacheLocation", "all").with("clear", true),
        )
        .unwrap();
        assert_eq!(line, "nuget locals all --clear");
    }

    #[test]
    fn test_nuget_locals_list() {
        let line = compose_named(
            "nuget_locals",
            Parameters::new().with("cacheLocation", "all").with("list", true),
        )
        .unwrap();
        assert_eq!(line, "nuget locals all --list");
    }

    #[test]
    fn test_nuget_locals_neither() {
        let line =
            compose_named("nuget_locals", Parameters::new().with("cacheLocation", "all")).unwrap();
        assert_eq!(line, "nuget locals all");
    }

    #[test]
    fn test_nuget_locals_list_wins_over_clear() {
        let line = compose_named(
            "nuget_locals",
            Parameters::new()
                .with("cacheLocation", "global-packages")
                .with("list", true)
                .with("clear", true),
        )
        .unwrap();
        assert_eq!(line, "nuget locals global-packages --list");
    }

    #[test]
    fn test_scaffold_quotes_connection_string() {
        let line = compose_named(
            "ef_dbcontext_scaffold",
            Parameters::new()
                .with("connectionString", "Server=.;Database=MyDb;")
                .with("provider", "Microsoft.EntityFrameworkCore.SqlServer")
                .with("force", true),
        )
        .unwrap();
        assert_eq!(
            line,
            "ef dbcontext scaffold \"Server=.;Database=MyDb;\" Microsoft.EntityFrameworkCore.SqlServer --force"
        );
    }

    #[test]
    fn test_script_migrations_switch_position() {
        let line = compose_named(
            "ef_migrations_script",
            Parameters::new()
                .with("idempotent", true)
                .with("output", "migration.sql"),
        )
        .unwrap();
        assert_eq!(line, "ef migrations script --output migration.sql --idempotent");
    }

    #[test]
    fn test_sln_positional_between_literals() {
        let line = compose_named(
            "dotnet_sln_add",
            Parameters::new()
                .with("projectPath", "MyProject.csproj")
                .with("solutionPath", "MySolution.sln")
                .with("solutionFolder", "src"),
        )
        .unwrap();
        assert_eq!(line, "sln MySolution.sln add MyProject.csproj --solution-folder src");

        let line = compose_named("dotnet_sln_list", Parameters::new()).unwrap();
        assert_eq!(line, "sln list");
    }

    #[test]
    fn test_add_package_layout() {
        let line = compose_named(
            "dotnet_add_package",
            Parameters::new()
                .with("packageName", "Serilog")
                .with("projectPath", "src/App/App.csproj")
                .with("version", "3.1.1"),
        )
        .unwrap();
        assert_eq!(line, "add src/App/App.csproj package Serilog --version 3.1.1");
    }

    #[test]
    fn test_run_uses_project_flag() {
        let line = compose_named(
            "dotnet_run",
            Parameters::new().with("projectPath", "App.csproj"),
        )
        .unwrap();
        assert_eq!(line, "run --project App.csproj");
    }

    #[test]
    fn test_nuget_push_integer_timeout() {
        let line = compose_named(
            "nuget_push",
            Parameters::new()
                .with("packagePath", "MyPackage.1.0.0.nupkg")
                .with("source", "https://api.nuget.org/v3/index.json")
                .with("apiKey", "my-api-key")
                .with("timeout", 300i64),
        )
        .unwrap();
        assert_eq!(
            line,
            "nuget push MyPackage.1.0.0.nupkg --source https://api.nuget.org/v3/index.json --api-key my-api-key --timeout 300"
        );
    }

    #[test]
    fn test_integer_coerced_from_text() {
        let line = compose_named(
            "nuget_push",
            Parameters::new().with("packagePath", "a.nupkg").with("timeout", " 60 "),
        )
        .unwrap();
        assert_eq!(line, "nuget push a.nupkg --timeout 60");

        let err = compose_named(
            "nuget_push",
            Parameters::new().with("packagePath", "a.nupkg").with("timeout", "soon"),
        )
        .unwrap_err();
        assert!(matches!(err, DotrelayError::InvalidParameter { .. }));
    }

    #[test]
    fn test_switch_from_text() {
        let line = compose_named(
            "dotnet_test",
            Parameters::new().with("noBuild", "TRUE").with("noRestore", "false"),
        )
        .unwrap();
        assert_eq!(line, "test --no-build");
    }

    #[test]
    fn test_switch_false_contributes_nothing() {
        let line = compose_named(
            "ef_migrations_bundle",
            Parameters::new()
                .with("force", false)
                .with("selfContained", true),
        )
        .unwrap();
        assert_eq!(line, "ef migrations bundle --self-contained");
    }

    #[test]
    fn test_blank_optional_is_omitted() {
        let line = compose_named(
            "dotnet_build",
            Parameters::new()
                .with("projectPath", "   ")
                .with("configuration", "")
                .with("framework", "net9.0"),
        )
        .unwrap();
        assert_eq!(line, "build --framework net9.0");
    }

    #[test]
    fn test_value_with_spaces_is_single_token() {
        let op = Catalog::builtin().get("dotnet_build").unwrap();
        let line = compose(
            op,
            &Parameters::new().with("projectPath", "My App/My App.csproj"),
        )
        .unwrap();
        assert_eq!(line.argv(), vec!["build", "My App/My App.csproj"]);
        assert_eq!(line.to_string(), "build \"My App/My App.csproj\"");
    }

    #[test]
    fn test_missing_required() {
        let err = compose_named("ef_migrations_add", Parameters::new()).unwrap_err();
        assert!(matches!(
            err,
            DotrelayError::MissingParameter { ref parameter, .. } if parameter == "name"
        ));
    }

    #[test]
    fn test_blank_required_is_missing() {
        let err = compose_named("nuget_enable_source", Parameters::new().with("name", "  "))
            .unwrap_err();
        assert!(matches!(err, DotrelayError::MissingParameter { .. }));
    }

    #[test]
    fn test_unknown_parameter() {
        let err = compose_named("dotnet_build", Parameters::new().with("verbosity", "q"))
            .unwrap_err();
        assert!(matches!(
            err,
            DotrelayError::UnknownParameter { ref parameter, .. } if parameter == "verbosity"
        ));
    }

    #[test]
    fn test_switch_given_for_value_is_rejected() {
        let err = compose_named("dotnet_build", Parameters::new().with("configuration", true))
            .unwrap_err();
        assert!(err.is_composition_error());
    }

    #[test]
    fn test_bare_composition_is_the_verb() {
        for op in Catalog::builtin().iter() {
            if op.params().any(|p| p.required) {
                continue;
            }
            let verb: Vec<&str> = op
                .segments
                .iter()
                .filter_map(|s| match s {
                    Segment::Literal(words) => Some(*words),
                    _ => None,
                })
                .collect();
            let line = compose(op, &Parameters::new()).unwrap();
            assert_eq!(line.to_string(), verb.join(" "), "{}", op.name);
        }
    }

    #[test]
    fn test_each_flag_appears_once() {
        for op in Catalog::builtin().iter() {
            let mut params = Parameters::new();
            for spec in op.params() {
                match spec.kind {
                    ParamKind::Text => params.insert(spec.name, format!("v-{}", spec.name)),
                    ParamKind::Integer => params.insert(spec.name, 7i64),
                    ParamKind::Switch => params.insert(spec.name, true),
                }
            }
            let line = compose(op, &params).unwrap();
            for segment in op.segments {
                if let Segment::Flag(flag, spec) = segment {
                    let argv = line.argv();
                    let hits: Vec<_> = argv
                        .iter()
                        .enumerate()
                        .filter(|(_, a)| *a == flag)
                        .collect();
                    assert_eq!(hits.len(), 1, "{} {}", op.name, flag);
                    let expected = match spec.kind {
                        ParamKind::Integer => "7".to_string(),
                        _ => format!("v-{}", spec.name),
                    };
                    assert_eq!(argv[hits[0].0 + 1], expected);
                }
            }
        }
    }

    #[test]
    fn test_composition_is_deterministic() {
        let params = Parameters::new()
            .with("projectPath", "App.csproj")
            .with("framework", "net8.0")
            .with("configuration", "Release")
            .with("noBuild", true)
            .with("filter", "Category=Unit");
        let first = compose_named("dotnet_test", params.clone()).unwrap();
        let second = compose_named("dotnet_test", params).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first,
            "test App.csproj --configuration Release --framework net8.0 --filter Category=Unit --no-build"
        );
    }

    #[test]
    fn test_prepare_extracts_working_directory() {
        let prepared = Catalog::builtin()
            .prepare(
                "dotnet_restore",
                &Parameters::new().with(WORKING_DIRECTORY, "/src/app"),
            )
            .unwrap();
        assert_eq!(prepared.operation.name, "dotnet_restore");
        assert_eq!(prepared.command_line.to_string(), "restore");
        assert_eq!(prepared.working_directory, Some(PathBuf::from("/src/app")));
    }

    #[test]
    fn test_prepare_blank_working_directory() {
        let prepared = Catalog::builtin()
            .prepare("dotnet_info", &Parameters::new().with(WORKING_DIRECTORY, " "))
            .unwrap();
        assert!(prepared.working_directory.is_none());
    }
}

//! The fixed table of tool-chain operations.
//!
//! Each operation is an ordered list of [`Segment`]s interpreted by
//! [`compose`](crate::compose). Segment order is the order the external tool
//! expects its tokens in, so literal sub-command words may follow an optional
//! positional (`add [project] package <name>`).

use crate::compose::{self, PreparedCommand, WORKING_DIRECTORY};
use crate::params::{ParamKind, ParamSpec, Parameters};
use dotrelay_core::{DotrelayError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// Fixed words, split on whitespace.
    Literal(&'static str),
    /// A bare value token.
    Positional(ParamSpec),
    /// `--flag value`.
    Flag(&'static str, ParamSpec),
    /// `--flag` when the switch is true.
    Switch(&'static str, ParamSpec),
    /// Only the first switch that is true is emitted.
    FirstOf(&'static [(&'static str, ParamSpec)]),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Core,
    EntityFramework,
    Solution,
    #[serde(rename = "nuget")]
    NuGet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub category: Category,
    pub segments: &'static [Segment],
}

impl OperationSpec {
    /// Every parameter this operation accepts, in segment order.
    pub fn params(&self) -> impl Iterator<Item = &'static ParamSpec> + '_ {
        self.segments.iter().flat_map(|segment| {
            let params: Vec<&'static ParamSpec> = match segment {
                Segment::Literal(_) => Vec::new(),
                Segment::Positional(spec)
                | Segment::Flag(_, spec)
                | Segment::Switch(_, spec) => vec![spec],
                Segment::FirstOf(choices) => choices.iter().map(|(_, spec)| spec).collect(),
            };
            params
        })
    }

    pub fn accepts(&self, name: &str) -> bool {
        name == WORKING_DIRECTORY || self.params().any(|p| p.name == name)
    }

    pub fn describe(&self) -> ToolDescriptor {
        let mut parameters: Vec<ParameterDescriptor> = self
            .params()
            .map(|p| ParameterDescriptor {
                name: p.name.to_string(),
                kind: p.kind,
                required: p.required,
                description: p.description.to_string(),
            })
            .collect();
        parameters.push(ParameterDescriptor {
            name: WORKING_DIRECTORY.to_string(),
            kind: ParamKind::Text,
            required: false,
            description: "Working directory".to_string(),
        });

        ToolDescriptor {
            name: self.name.to_string(),
            description: self.description.to_string(),
            category: self.category,
            parameters,
        }
    }
}

/// Discoverable description of one operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub category: Category,
    pub parameters: Vec<ParameterDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParameterDescriptor {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    pub description: String,
}

/// Lookup over a table of operations.
#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    operations: &'static [OperationSpec],
}

impl Catalog {
    pub fn new(operations: &'static [OperationSpec]) -> Self {
        Self { operations }
    }

    /// The full .NET CLI table.
    pub fn builtin() -> Self {
        Self::new(OPERATIONS)
    }

    pub fn get(&self, name: &str) -> Option<&'static OperationSpec> {
        self.operations.iter().find(|op| op.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static OperationSpec> {
        self.operations.iter()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.iter().map(OperationSpec::describe).collect()
    }

    /// Resolve an operation by name and compose its argument vector.
    pub fn prepare(&self, name: &str, params: &Parameters) -> Result<PreparedCommand> {
        let operation = self
            .get(name)
            .ok_or_else(|| DotrelayError::UnknownOperation(name.to_string()))?;
        compose::prepare(operation, params)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

const fn positional(name: &'static str, description: &'static str) -> Segment {
    Segment::Positional(ParamSpec::text(name, description))
}

const fn required(name: &'static str, description: &'static str) -> Segment {
    Segment::Positional(ParamSpec::text(name, description).required())
}

const fn flag(flag: &'static str, name: &'static str, description: &'static str) -> Segment {
    Segment::Flag(flag, ParamSpec::text(name, description))
}

const fn switch(flag: &'static str, name: &'static str, description: &'static str) -> Segment {
    Segment::Switch(flag, ParamSpec::switch(name, description))
}

const PROJECT_PATH: Segment = positional("projectPath", "Project path");
const CONFIGURATION: Segment = flag(
    "--configuration",
    "configuration",
    "Build configuration (Debug/Release)",
);
const FRAMEWORK: Segment = flag("--framework", "framework", "Target framework");
const OUTPUT: Segment = flag("--output", "output", "Output directory");

const EF_CONNECTION: Segment = Segment::Flag(
    "--connection",
    ParamSpec::text("connection", "Connection string").always_quoted(),
);
const EF_CONTEXT: Segment = flag("--context", "context", "DbContext class name");
const EF_PROJECT: Segment = flag("--project", "project", "Project path");
const EF_STARTUP_PROJECT: Segment =
    flag("--startup-project", "startupProject", "Startup project path");

const SOLUTION_PATH: Segment = positional("solutionPath", "Solution file path");
const NUGET_SOURCE: Segment = flag("--source", "source", "NuGet source URL");
const NUGET_API_KEY: Segment = flag("--api-key", "apiKey", "API key");
const NUGET_USERNAME: Segment = flag("--username", "username", "Username");
const NUGET_PASSWORD: Segment = flag("--password", "password", "Password");
const NUGET_CLEAR_TEXT: Segment = switch(
    "--store-password-in-clear-text",
    "storePasswordInClearText",
    "Store password in clear text",
);
const NUGET_AUTH_TYPES: Segment = flag(
    "--valid-authentication-types",
    "validAuthenticationTypes",
    "Valid authentication types",
);

pub static OPERATIONS: &[OperationSpec] = &[
    // Core
    OperationSpec {
        name: "dotnet_version",
        description: "Gets the installed .NET version",
        category: Category::Core,
        segments: &[Segment::Literal("--version")],
    },
    OperationSpec {
        name: "dotnet_info",
        description: "Displays .NET information",
        category: Category::Core,
        segments: &[Segment::Literal("--info")],
    },
    OperationSpec {
        name: "dotnet_list_sdks",
        description: "Lists installed .NET SDKs",
        category: Category::Core,
        segments: &[Segment::Literal("--list-sdks")],
    },
    OperationSpec {
        name: "dotnet_list_runtimes",
        description: "Lists installed .NET runtimes",
        category: Category::Core,
        segments: &[Segment::Literal("--list-runtimes")],
    },
    OperationSpec {
        name: "dotnet_new_list",
        description: "Lists available project templates",
        category: Category::Core,
        segments: &[Segment::Literal("new list")],
    },
    OperationSpec {
        name: "dotnet_new",
        description: "Creates a new project from template",
        category: Category::Core,
        segments: &[
            Segment::Literal("new"),
            required("template", "Template name (e.g., console, webapi, classlib)"),
            flag("--name", "name", "Project name"),
            OUTPUT,
            flag("--framework", "framework", "Target framework (e.g., net9.0)"),
        ],
    },
    OperationSpec {
        name: "dotnet_restore",
        description: "Restores project dependencies",
        category: Category::Core,
        segments: &[Segment::Literal("restore"), PROJECT_PATH],
    },
    OperationSpec {
        name: "dotnet_build",
        description: "Builds a project",
        category: Category::Core,
        segments: &[Segment::Literal("build"), PROJECT_PATH, CONFIGURATION, FRAMEWORK],
    },
    OperationSpec {
        name: "dotnet_run",
        description: "Runs a project",
        category: Category::Core,
        segments: &[
            Segment::Literal("run"),
            flag("--project", "projectPath", "Project path"),
            CONFIGURATION,
            FRAMEWORK,
        ],
    },
    OperationSpec {
        name: "dotnet_test",
        description: "Runs tests in a project",
        category: Category::Core,
        segments: &[
            Segment::Literal("test"),
            PROJECT_PATH,
            CONFIGURATION,
            FRAMEWORK,
            flag("--filter", "filter", "Test filter expression"),
            switch("--no-build", "noBuild", "Skip building the project"),
            switch("--no-restore", "noRestore", "Skip restoring packages"),
        ],
    },
    OperationSpec {
        name: "dotnet_publish",
        description: "Publishes a project for deployment",
        category: Category::Core,
        segments: &[
            Segment::Literal("publish"),
            PROJECT_PATH,
            CONFIGURATION,
            FRAMEWORK,
            flag("--runtime", "runtime", "Target runtime identifier"),
            OUTPUT,
        ],
    },
    OperationSpec {
        name: "dotnet_clean",
        description: "Cleans build outputs",
        category: Category::Core,
        segments: &[Segment::Literal("clean"), PROJECT_PATH, CONFIGURATION, FRAMEWORK],
    },
    OperationSpec {
        name: "dotnet_pack",
        description: "Creates NuGet packages",
        category: Category::Core,
        segments: &[Segment::Literal("pack"), PROJECT_PATH, CONFIGURATION, OUTPUT],
    },
    OperationSpec {
        name: "dotnet_add_package",
        description: "Adds a NuGet package reference to a project",
        category: Category::Core,
        segments: &[
            Segment::Literal("add"),
            PROJECT_PATH,
            Segment::Literal("package"),
            required("packageName", "Package name"),
            flag("--version", "version", "Package version"),
        ],
    },
    OperationSpec {
        name: "dotnet_remove_package",
        description: "Removes a NuGet package reference from a project",
        category: Category::Core,
        segments: &[
            Segment::Literal("remove"),
            PROJECT_PATH,
            Segment::Literal("package"),
            required("packageName", "Package name"),
        ],
    },
    OperationSpec {
        name: "dotnet_list_packages",
        description: "Lists package references in a project",
        category: Category::Core,
        segments: &[
            Segment::Literal("list"),
            PROJECT_PATH,
            Segment::Literal("package"),
            switch("--outdated", "outdated", "Include outdated packages"),
        ],
    },
    OperationSpec {
        name: "dotnet_add_reference",
        description: "Adds a project reference",
        category: Category::Core,
        segments: &[
            Segment::Literal("add"),
            PROJECT_PATH,
            Segment::Literal("reference"),
            required("referencePath", "Reference project path"),
        ],
    },
    OperationSpec {
        name: "dotnet_remove_reference",
        description: "Removes a project reference",
        category: Category::Core,
        segments: &[
            Segment::Literal("remove"),
            PROJECT_PATH,
            Segment::Literal("reference"),
            required("referencePath", "Reference project path"),
        ],
    },
    OperationSpec {
        name: "dotnet_list_references",
        description: "Lists project references",
        category: Category::Core,
        segments: &[Segment::Literal("list"), PROJECT_PATH, Segment::Literal("reference")],
    },
    // Entity Framework
    OperationSpec {
        name: "ef_database_update",
        description: "Updates the database to the latest migration",
        category: Category::EntityFramework,
        segments: &[
            Segment::Literal("ef database update"),
            positional("targetMigration", "Target migration"),
            EF_CONNECTION,
            EF_CONTEXT,
            EF_PROJECT,
            EF_STARTUP_PROJECT,
        ],
    },
    OperationSpec {
        name: "ef_database_drop",
        description: "Drops the database",
        category: Category::EntityFramework,
        segments: &[
            Segment::Literal("ef database drop"),
            switch("--force", "force", "Force drop without confirmation"),
            EF_CONNECTION,
            EF_CONTEXT,
            EF_PROJECT,
            EF_STARTUP_PROJECT,
        ],
    },
    OperationSpec {
        name: "ef_migrations_add",
        description: "Adds a new migration",
        category: Category::EntityFramework,
        segments: &[
            Segment::Literal("ef migrations add"),
            required("name", "Migration name"),
            flag("--output-dir", "outputDir", "Output directory for migration files"),
            EF_CONTEXT,
            EF_PROJECT,
            EF_STARTUP_PROJECT,
        ],
    },
    OperationSpec {
        name: "ef_migrations_remove",
        description: "Removes the last migration",
        category: Category::EntityFramework,
        segments: &[
            Segment::Literal("ef migrations remove"),
            switch(
                "--force",
                "force",
                "Force removal without checking for unapplied changes",
            ),
            EF_CONTEXT,
            EF_PROJECT,
            EF_STARTUP_PROJECT,
        ],
    },
    OperationSpec {
        name: "ef_migrations_list",
        description: "Lists available migrations",
        category: Category::EntityFramework,
        segments: &[
            Segment::Literal("ef migrations list"),
            EF_CONNECTION,
            EF_CONTEXT,
            EF_PROJECT,
            EF_STARTUP_PROJECT,
        ],
    },
    OperationSpec {
        name: "ef_migrations_script",
        description: "Generates SQL script for migrations",
        category: Category::EntityFramework,
        segments: &[
            Segment::Literal("ef migrations script"),
            positional("from", "From migration"),
            positional("to", "To migration"),
            flag("--output", "output", "Output file path"),
            switch("--idempotent", "idempotent", "Generate idempotent script"),
            EF_CONNECTION,
            EF_CONTEXT,
            EF_PROJECT,
            EF_STARTUP_PROJECT,
        ],
    },
    OperationSpec {
        name: "ef_dbcontext_info",
        description: "Gets information about a DbContext type",
        category: Category::EntityFramework,
        segments: &[
            Segment::Literal("ef dbcontext info"),
            EF_CONTEXT,
            EF_PROJECT,
            EF_STARTUP_PROJECT,
        ],
    },
    OperationSpec {
        name: "ef_dbcontext_list",
        description: "Lists available DbContext types",
        category: Category::EntityFramework,
        segments: &[
            Segment::Literal("ef dbcontext list"),
            EF_PROJECT,
            EF_STARTUP_PROJECT,
        ],
    },
    OperationSpec {
        name: "ef_dbcontext_scaffold",
        description: "Scaffolds a DbContext and entity types from a database",
        category: Category::EntityFramework,
        segments: &[
            Segment::Literal("ef dbcontext scaffold"),
            Segment::Positional(
                ParamSpec::text("connectionString", "Database connection string")
                    .required()
                    .always_quoted(),
            ),
            required(
                "provider",
                "Database provider (e.g., Microsoft.EntityFrameworkCore.SqlServer)",
            ),
            flag("--output-dir", "outputDir", "Output directory"),
            flag("--context", "contextName", "DbContext name"),
            flag("--context-dir", "contextDir", "DbContext directory"),
            switch("--force", "force", "Force overwrite existing files"),
            switch(
                "--data-annotations",
                "dataAnnotations",
                "Use data annotations instead of fluent API",
            ),
            EF_PROJECT,
            EF_STARTUP_PROJECT,
        ],
    },
    OperationSpec {
        name: "ef_dbcontext_optimize",
        description: "Generates a compiled version of the model used by the DbContext",
        category: Category::EntityFramework,
        segments: &[
            Segment::Literal("ef dbcontext optimize"),
            flag("--output-dir", "outputDir", "Output directory"),
            flag("--namespace", "namespace", "Namespace for generated class"),
            EF_CONTEXT,
            EF_PROJECT,
            EF_STARTUP_PROJECT,
        ],
    },
    OperationSpec {
        name: "ef_migrations_bundle",
        description: "Creates an executable bundle containing migrations",
        category: Category::EntityFramework,
        segments: &[
            Segment::Literal("ef migrations bundle"),
            flag("--output", "output", "Output file path"),
            switch("--force", "force", "Force overwrite existing bundle"),
            switch("--self-contained", "selfContained", "Self-contained bundle"),
            flag("--target-runtime", "targetRuntime", "Target runtime"),
            EF_CONTEXT,
            EF_PROJECT,
            EF_STARTUP_PROJECT,
        ],
    },
    // Solution
    OperationSpec {
        name: "dotnet_sln_list",
        description: "Lists projects in a solution",
        category: Category::Solution,
        segments: &[Segment::Literal("sln"), SOLUTION_PATH, Segment::Literal("list")],
    },
    OperationSpec {
        name: "dotnet_sln_add",
        description: "Adds projects to a solution",
        category: Category::Solution,
        segments: &[
            Segment::Literal("sln"),
            SOLUTION_PATH,
            Segment::Literal("add"),
            required("projectPath", "Project path to add"),
            flag("--solution-folder", "solutionFolder", "Solution folder"),
        ],
    },
    OperationSpec {
        name: "dotnet_sln_remove",
        description: "Removes projects from a solution",
        category: Category::Solution,
        segments: &[
            Segment::Literal("sln"),
            SOLUTION_PATH,
            Segment::Literal("remove"),
            required("projectPath", "Project path to remove"),
        ],
    },
    // NuGet
    OperationSpec {
        name: "nuget_push",
        description: "Pushes a package to a NuGet source",
        category: Category::NuGet,
        segments: &[
            Segment::Literal("nuget push"),
            required("packagePath", "Package file path"),
            NUGET_SOURCE,
            NUGET_API_KEY,
            flag("--symbol-source", "symbolSource", "Symbol source URL"),
            flag("--symbol-api-key", "symbolApiKey", "Symbol API key"),
            Segment::Flag("--timeout", ParamSpec::integer("timeout", "Timeout in seconds")),
        ],
    },
    OperationSpec {
        name: "nuget_delete",
        description: "Deletes a package from a NuGet source",
        category: Category::NuGet,
        segments: &[
            Segment::Literal("nuget delete"),
            required("packageName", "Package name"),
            required("version", "Package version"),
            NUGET_SOURCE,
            NUGET_API_KEY,
            switch("--non-interactive", "nonInteractive", "Non-interactive mode"),
        ],
    },
    OperationSpec {
        name: "nuget_locals",
        description: "Clears or lists local NuGet caches",
        category: Category::NuGet,
        segments: &[
            Segment::Literal("nuget locals"),
            required(
                "cacheLocation",
                "Cache location (all, http-cache, global-packages, temp, plugins-cache)",
            ),
            Segment::FirstOf(&[
                (
                    "--list",
                    ParamSpec::switch("list", "List cache contents instead of clearing"),
                ),
                ("--clear", ParamSpec::switch("clear", "Clear cache")),
            ]),
        ],
    },
    OperationSpec {
        name: "nuget_add_source",
        description: "Adds a NuGet source",
        category: Category::NuGet,
        segments: &[
            Segment::Literal("nuget add source"),
            required("source", "Source URL"),
            flag("--name", "name", "Source name"),
            NUGET_USERNAME,
            NUGET_PASSWORD,
            NUGET_CLEAR_TEXT,
            NUGET_AUTH_TYPES,
        ],
    },
    OperationSpec {
        name: "nuget_remove_source",
        description: "Removes a NuGet source",
        category: Category::NuGet,
        segments: &[
            Segment::Literal("nuget remove source"),
            required("source", "Source name or URL"),
        ],
    },
    OperationSpec {
        name: "nuget_list_source",
        description: "Lists NuGet sources",
        category: Category::NuGet,
        segments: &[
            Segment::Literal("nuget list source"),
            flag("--format", "format", "Format (Detailed, Short)"),
        ],
    },
    OperationSpec {
        name: "nuget_update_source",
        description: "Updates a NuGet source",
        category: Category::NuGet,
        segments: &[
            Segment::Literal("nuget update source"),
            required("name", "Source name"),
            flag("--source", "source", "Source URL"),
            NUGET_USERNAME,
            NUGET_PASSWORD,
            NUGET_CLEAR_TEXT,
            NUGET_AUTH_TYPES,
        ],
    },
    OperationSpec {
        name: "nuget_enable_source",
        description: "Enables a NuGet source",
        category: Category::NuGet,
        segments: &[
            Segment::Literal("nuget enable source"),
            required("name", "Source name"),
        ],
    },
    OperationSpec {
        name: "nuget_disable_source",
        description: "Disables a NuGet source",
        category: Category::NuGet,
        segments: &[
            Segment::Literal("nuget disable source"),
            required("name", "Source name"),
        ],
    },
];

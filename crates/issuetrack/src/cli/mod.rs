pub mod handlers;

use clap::{value_parser, Arg, ArgAction, Command};

pub fn build_cli() -> Command {
    Command::new("issuetrack")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Issue tracking with WIP limits, cycle time and stand-up deltas")
        .subcommand_required(true)
        .arg(
            Arg::new("database")
                .long("database")
                .global(true)
                .value_name("URL")
                .help("Database URL, overriding config and ISSUETRACK_DATABASE_URL"),
        )
        .subcommand(cmd_project())
        .subcommand(cmd_issue())
        .subcommand(cmd_metrics())
        .subcommand(cmd_standup())
        .subcommand(cmd_sprint())
        .subcommand(cmd_scope())
        .subcommand(cmd_user())
        .subcommand(cmd_assign())
}

fn project_arg() -> Arg {
    Arg::new("project")
        .required(true)
        .value_name("PROJECT_KEY")
        .help("Project key, e.g. PRJ")
}

fn issue_arg() -> Arg {
    Arg::new("issue")
        .required(true)
        .value_name("ISSUE")
        .help("Issue id or key, e.g. 7 or PRJ-007")
}

fn id_arg(name: &'static str, value_name: &'static str) -> Arg {
    Arg::new(name)
        .required(true)
        .value_name(value_name)
        .value_parser(value_parser!(i64))
}

fn text_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).value_name("TEXT").help(help)
}

fn payload_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .value_name("JSON")
        .help("Full payload as a JSON object; flags override its fields")
}

fn cmd_project() -> Command {
    Command::new("project")
        .about("Manage projects and their WIP limits")
        .subcommand_required(true)
        .subcommand(
            Command::new("create")
                .about("Create a project")
                .arg(text_arg("name", "Project name"))
                .arg(text_arg("description", "Project description"))
                .arg(text_arg("lead", "Project lead"))
                .arg(text_arg("key", "Project key used as issue key prefix"))
                .arg(
                    Arg::new("wip-limit")
                        .long("wip-limit")
                        .value_name("N")
                        .value_parser(value_parser!(u32))
                        .help("Maximum issues in progress (default from config)"),
                ),
        )
        .subcommand(
            Command::new("get")
                .about("Show a project by key, or by name with --by-name")
                .arg(project_arg().value_name("KEY_OR_NAME"))
                .arg(
                    Arg::new("by-name")
                        .long("by-name")
                        .action(ArgAction::SetTrue)
                        .help("Look the project up by name"),
                ),
        )
        .subcommand(Command::new("list").about("List projects"))
        .subcommand(
            Command::new("set-wip")
                .about("Change a project's WIP limit")
                .arg(project_arg())
                .arg(
                    Arg::new("limit")
                        .required(true)
                        .value_name("N")
                        .value_parser(value_parser!(u32)),
                ),
        )
        .subcommand(
            Command::new("wip")
                .about("Show WIP usage against the limit")
                .arg(project_arg()),
        )
}

fn cmd_issue() -> Command {
    let fields = |cmd: Command| {
        cmd.arg(payload_arg())
            .arg(text_arg("summary", "One-line summary"))
            .arg(text_arg("description", "Longer description"))
            .arg(text_arg("reporter", "Who reported the issue"))
            .arg(text_arg("assignee", "Who works on the issue"))
            .arg(
                Arg::new("status")
                    .long("status")
                    .value_name("STATUS")
                    .help("open, in_progress or resolved"),
            )
            .arg(
                Arg::new("type")
                    .long("type")
                    .value_name("TYPE")
                    .help("Issue type, e.g. bug or task"),
            )
    };

    Command::new("issue")
        .about("Create, inspect and move issues")
        .subcommand_required(true)
        .subcommand(fields(
            Command::new("create")
                .about("Create an issue")
                .arg(text_arg("project", "Key of the owning project")),
        ))
        .subcommand(
            Command::new("get")
                .about("Show an issue")
                .arg(issue_arg()),
        )
        .subcommand(
            Command::new("list")
                .about("List a project's issues")
                .arg(project_arg()),
        )
        .subcommand(fields(
            Command::new("update")
                .about("Change fields or status of an issue")
                .arg(issue_arg()),
        ))
}

fn cmd_metrics() -> Command {
    Command::new("metrics")
        .about("Flow metrics over resolved issues")
        .subcommand_required(true)
        .subcommand(
            Command::new("cycle-time")
                .about("Average time from start to resolution")
                .arg(project_arg()),
        )
        .subcommand(
            Command::new("throughput")
                .about("Resolved issues per ISO week")
                .arg(project_arg()),
        )
}

fn cmd_standup() -> Command {
    Command::new("standup")
        .about("Stand-up windows and the issues changed between them")
        .subcommand_required(true)
        .subcommand(
            Command::new("start")
                .about("Start a stand-up and list issues changed since the last one")
                .arg(project_arg()),
        )
        .subcommand(
            Command::new("end")
                .about("End the active stand-up")
                .arg(project_arg()),
        )
        .subcommand(
            Command::new("active")
                .about("Show the active stand-up, if any")
                .arg(project_arg()),
        )
        .subcommand(
            Command::new("last")
                .about("Show when the last stand-up ended")
                .arg(project_arg()),
        )
        .subcommand(
            Command::new("delta")
                .about("List issues updated after a point in time")
                .arg(project_arg())
                .arg(
                    Arg::new("since")
                        .long("since")
                        .value_name("RFC3339")
                        .help("Defaults to the end of the last stand-up"),
                ),
        )
}

fn cmd_sprint() -> Command {
    Command::new("sprint")
        .about("Sprints and their issues")
        .subcommand_required(true)
        .subcommand(
            Command::new("create")
                .about("Create a sprint")
                .arg(text_arg("name", "Sprint name"))
                .arg(text_arg("description", "Sprint goal"))
                .arg(
                    Arg::new("start")
                        .long("start")
                        .value_name("YYYY-MM-DD"),
                )
                .arg(Arg::new("end").long("end").value_name("YYYY-MM-DD"))
                .arg(text_arg("project", "Key of the owning project")),
        )
        .subcommand(
            Command::new("get")
                .about("Show a sprint")
                .arg(id_arg("sprint", "SPRINT_ID")),
        )
        .subcommand(
            Command::new("add-issue")
                .about("Put an issue into a sprint")
                .arg(id_arg("sprint", "SPRINT_ID"))
                .arg(issue_arg()),
        )
        .subcommand(
            Command::new("issues")
                .about("List the issues of a sprint")
                .arg(id_arg("sprint", "SPRINT_ID")),
        )
}

fn cmd_scope() -> Command {
    Command::new("scope")
        .about("Groups of projects")
        .subcommand_required(true)
        .subcommand(
            Command::new("create")
                .about("Create a scope")
                .arg(text_arg("name", "Scope name"))
                .arg(text_arg("description", "Scope description"))
                .arg(
                    Arg::new("project")
                        .long("project")
                        .value_name("PROJECT_KEY")
                        .action(ArgAction::Append)
                        .help("Member project; repeat for several"),
                ),
        )
        .subcommand(
            Command::new("get")
                .about("Show a scope")
                .arg(id_arg("scope", "SCOPE_ID")),
        )
        .subcommand(
            Command::new("add-project")
                .about("Add a project to a scope")
                .arg(id_arg("scope", "SCOPE_ID"))
                .arg(project_arg()),
        )
        .subcommand(
            Command::new("issues")
                .about("List issues across the scope's projects")
                .arg(id_arg("scope", "SCOPE_ID")),
        )
}

fn cmd_user() -> Command {
    Command::new("user")
        .about("Manage users")
        .subcommand_required(true)
        .subcommand(
            Command::new("create")
                .about("Create a user")
                .arg(text_arg("first-name", "Given name"))
                .arg(text_arg("last-name", "Family name"))
                .arg(text_arg("email", "Unique email address")),
        )
        .subcommand(
            Command::new("get")
                .about("Show a user by id or email")
                .arg(Arg::new("user").required(true).value_name("ID_OR_EMAIL")),
        )
        .subcommand(Command::new("list").about("List users"))
}

fn cmd_assign() -> Command {
    Command::new("assign")
        .about("Project membership")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Assign a user to a project")
                .arg(project_arg())
                .arg(id_arg("user", "USER_ID"))
                .arg(
                    Arg::new("role")
                        .long("role")
                        .value_name("ROLE")
                        .default_value("member"),
                ),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove a user from a project")
                .arg(project_arg())
                .arg(id_arg("user", "USER_ID")),
        )
        .subcommand(
            Command::new("list")
                .about("List a project's members")
                .arg(project_arg()),
        )
}

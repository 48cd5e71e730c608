mod run;

use prkit::{Command, Connection, GitHub, actions::StepOutputs, github::get_github_token, parse_args};

fn handle_clap_help_version(clap_err: &clap::Error) -> ! {
    use clap::error::ErrorKind;
    match clap_err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            print!("{clap_err}");
            std::process::exit(0);
        }
        _ => {
            eprint!("{clap_err}");
            std::process::exit(2);
        }
    }
}

fn connect(connection: &Connection) -> anyhow::Result<GitHub> {
    let token = match &connection.token {
        Some(token) => token.clone(),
        None => get_github_token()?,
    };
    GitHub::connect(token, connection.api_url.as_deref())
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let invocation = match parse_args(std::env::args_os()) {
        Ok(invocation) => invocation,
        Err(err) => {
            if let Some(clap_err) = err.downcast_ref::<clap::Error>() {
                handle_clap_help_version(clap_err);
            } else {
                return Err(err);
            }
        }
    };

    let outputs = StepOutputs::from_env();
    let connection = &invocation.connection;

    match invocation.command {
        Command::Cleanup(spec) => run::cleanup(&connect(connection)?, &spec, &outputs).await,
        Command::LintTitle(spec) => run::lint_title(&connect(connection)?, &spec).await,
        Command::Audit(spec) => {
            let github = spec.pr.as_ref().map(|_| connect(connection)).transpose()?;
            run::audit(github.as_ref(), &spec, &outputs).await
        }
        Command::Prompt(spec) => run::prompt(&spec, &outputs),
        Command::CheckExclusion(spec) => run::check_exclusion(&spec, &outputs),
    }
}

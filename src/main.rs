use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use rconctl::cancel::{self, CancelHandle};
use rconctl::config::Settings;
use rconctl::rcon::{self, RconConnector, RconSession};
use rconctl::resolve::{self, Flavor, Resolved, Target};
use rconctl::{Engine, EngineOptions, interactive, logging, parse_file, plan};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "rconctl",
    about = "Run RCON scripts and command groups against a Minecraft server",
    version
)]
struct Args {
    /// Settings file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More diagnostics on stderr (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(flatten)]
    mode: Mode,

    /// Run the script without asking for confirmation
    #[arg(short, long, requires = "script")]
    yes: bool,

    /// Server to connect to, as host[:port]
    #[arg(short, long, conflicts_with = "script")]
    target: Option<String>,

    /// Use Bedrock's default game port when the target has none
    #[arg(long, requires = "target")]
    bedrock: bool,

    /// RCON port (defaults to the settings file, then 25575)
    #[arg(long, requires = "target", value_parser = clap::value_parser!(u16).range(1..))]
    rcon_port: Option<u16>,

    /// RCON password
    #[arg(long, env = "RCON_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(clap::Args, Debug)]
#[group(required = true, multiple = false)]
struct Mode {
    /// Path to the script file
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Send a single command and print the response
    #[arg(short, long, requires = "target")]
    command: Option<String>,

    /// Build and run command groups interactively
    #[arg(short = 'g', long, requires = "target")]
    command_group: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let settings = Settings::load(args.config.as_deref())?;
    let options = EngineOptions {
        poll_interval: settings.poll_interval(),
        color: settings.color && !args.no_color,
    };
    let connector = RconConnector {
        connect_timeout: settings.connect_timeout(),
        command_timeout: settings.command_timeout(),
    };

    if let Some(path) = &args.mode.script {
        return run_script(path, args.yes, &settings, options, &connector).await;
    }

    let target: Target = args
        .target
        .as_deref()
        .context("--target is required for --command and --command-group")?
        .parse()?;
    let password = args
        .password
        .or_else(|| settings.password.clone())
        .context("No RCON password: pass --password, set RCON_PASSWORD or add `password` to the settings file")?;
    let flavor = if args.bedrock { Flavor::Bedrock } else { Flavor::Java };
    let rcon_port = args.rcon_port.unwrap_or(settings.rcon_port);

    let resolved = locate(&target, flavor, &settings).await?;
    let (handle, token) = cancel::channel();
    let mut engine = Engine::new(options).with_cancel(token.clone());
    engine
        .connect(&connector, resolved.with_port(rcon_port), &password)
        .await?;
    listen_for_interrupts(handle);

    if let Some(command) = &args.mode.command {
        let report = engine.execute_one(command).await?;
        engine.finish().await;
        if let Err(message) = report.outcome {
            bail!("Command `{command}` failed: {message}");
        }
        return Ok(());
    }

    let input = interactive::spawn_stdin_reader();
    interactive::run(&mut engine, input, token)
        .await
        .context("Command group mode ended abnormally")?;
    Ok(())
}

async fn run_script(
    path: &Path,
    assume_yes: bool,
    settings: &Settings,
    options: EngineOptions,
    connector: &RconConnector,
) -> Result<()> {
    let script = parse_file(path)?;
    print!("{}", plan::render_plan(&script, options.color));
    if !assume_yes && !confirm("Execute this script? (Y/N) ").await? {
        println!("Script execution cancelled");
        return Ok(());
    }

    let login = &script.login;
    let target = Target {
        host: login.host.clone(),
        port: Some(login.game_port),
    };
    let resolved = locate(&target, Flavor::Java, settings).await?;

    let (handle, token) = cancel::channel();
    let mut engine: Engine<RconSession> = Engine::new(options).with_cancel(token);
    engine
        .connect(connector, resolved.with_port(login.rcon_port), &login.password)
        .await?;
    listen_for_interrupts(handle);

    let summary = engine
        .run_script(&script)
        .await
        .context("Script did not complete")?;
    info!(
        sent = summary.commands_sent,
        failed = summary.commands_failed,
        waits = summary.waits,
        "done"
    );
    Ok(())
}

/// Resolve the target and check that the game port answers.
async fn locate(target: &Target, flavor: Flavor, settings: &Settings) -> Result<Resolved> {
    let resolved = resolve::resolve(target, flavor).await?;
    info!(%target, ip = %resolved.ip, "target resolved");
    rcon::probe(resolved.socket_addr(), settings.connect_timeout())
        .await
        .with_context(|| {
            format!(
                "Game port {} is not reachable, is the server online?",
                resolved.socket_addr()
            )
        })?;
    Ok(resolved)
}

fn listen_for_interrupts(handle: CancelHandle) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });
}

async fn confirm(question: &str) -> Result<bool> {
    print!("{question}");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await
        .context("Failed to read confirmation")?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

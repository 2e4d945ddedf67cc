mod replay;
pub use replay::run_script;

use std::io::Read;
use std::path::PathBuf;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io::{self, ConfigLocation};
use crate::model::PolicyTable;
use crate::parse::parse_script;

/// Where a command looks for its configuration (from -C / --config)
pub struct Context {
    pub start: PathBuf,
    pub location: ConfigLocation,
    /// --config was given
    pub explicit: bool,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Result<Context, Box<dyn std::error::Error>> {
        let start = match &cli.dir {
            Some(dir) => std::fs::canonicalize(dir)
                .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?,
            None => std::env::current_dir()?,
        };
        let explicit = cli.config.as_ref().map(|p| start.join(p));
        let location = config_io::locate_config(&start, explicit.as_deref());
        Ok(Context {
            start,
            location,
            explicit: explicit.is_some(),
        })
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let json = cli.json;
    let ctx = Context::from_cli(&cli)?;

    match cli.command {
        None => Err("no subcommand (run without one to open the panel)".into()),
        Some(cmd) => match cmd {
            Commands::Policy => cmd_policy(&ctx, json),
            Commands::Replay(args) => cmd_replay(&ctx, args, json),
            Commands::Config(args) => match args.action.unwrap_or(ConfigAction::Show) {
                ConfigAction::Show => cmd_config_show(&ctx, json),
                ConfigAction::Set(args) => cmd_config_set(&ctx, args),
                ConfigAction::Init(args) => cmd_config_init(&ctx, args),
            },
        },
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_policy(ctx: &Context, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = config_io::load_config(&ctx.location)?;
    let table = PolicyTable::from_config(&config.kinds);

    if json {
        let policies: Vec<PolicyJson> = table
            .iter()
            .map(|(kind, policy)| policy_to_json(kind, policy))
            .collect();
        println!("{}", serde_json::to_string_pretty(&policies)?);
    } else {
        for line in format_policy_table(&table) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_replay(ctx: &Context, args: ReplayArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let text = if args.file == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        let path = ctx.start.join(&args.file);
        std::fs::read_to_string(&path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?
    };
    let script = parse_script(&text)?;
    let config = config_io::load_config(&ctx.location)?;

    // Paused clock: `wait` advances virtual time so replays are instant
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()?;
    let lines = runtime.block_on(run_script(&config, &script, json));
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_config_show(ctx: &Context, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = config_io::load_config(&ctx.location)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }
    if ctx.location.exists() {
        println!("# {}", ctx.location.path.display());
    } else {
        println!("# {} (not found, showing defaults)", ctx.location.path.display());
    }
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_config_set(ctx: &Context, args: ConfigSetArgs) -> Result<(), Box<dyn std::error::Error>> {
    config_io::update_config(&ctx.location, &args.key, &args.value)?;
    println!(
        "{} = {} ({})",
        args.key,
        args.value,
        ctx.location.path.display()
    );
    Ok(())
}

fn cmd_config_init(ctx: &Context, args: ConfigInitArgs) -> Result<(), Box<dyn std::error::Error>> {
    // Never overwrite a config found further up the tree
    let path = if ctx.explicit {
        ctx.location.path.clone()
    } else {
        ctx.start.join(config_io::CONFIG_FILE)
    };
    config_io::init_config(&path, args.force)?;
    println!("wrote {}", path.display());
    Ok(())
}

use std::os::fd::RawFd;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args as ClapArgs, Parser, Subcommand};
use joyemu_core::events::format_mac;
use joyemu_core::protocol::MAC_LEN;
use joyemu_core::{EngineConfig, FdTransport, ProtocolEngine, ReaderExit};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Pro Controller HID protocol emulator", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer the host over already-connected HID channels
    Run(RunArgs),
    /// Print the engine configuration as TOML
    PrintConfig {
        /// Start from this file instead of the defaults
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ClapArgs, Debug)]
struct RunArgs {
    /// Inherited descriptor of the interrupt channel
    #[arg(long, conflicts_with = "itr_path", required_unless_present = "itr_path")]
    itr_fd: Option<RawFd>,

    /// Inherited descriptor of the control channel
    #[arg(long, conflicts_with = "ctrl_path", required_unless_present = "ctrl_path")]
    ctrl_fd: Option<RawFd>,

    /// Device node of the interrupt channel
    #[arg(long)]
    itr_path: Option<PathBuf>,

    /// Device node of the control channel
    #[arg(long)]
    ctrl_path: Option<PathBuf>,

    /// Controller MAC address (AA:BB:CC:DD:EE:FF)
    #[arg(long, value_parser = parse_mac)]
    mac: [u8; MAC_LEN],

    /// TOML engine configuration
    #[arg(long)]
    config: Option<PathBuf>,
}

fn parse_mac(s: &str) -> Result<[u8; MAC_LEN]> {
    let parts: Vec<&str> = s.split([':', '-']).collect();
    if parts.len() != MAC_LEN {
        bail!("expected {} octets, got {}", MAC_LEN, parts.len());
    }
    let mut mac = [0u8; MAC_LEN];
    for (byte, part) in mac.iter_mut().zip(&parts) {
        *byte = u8::from_str_radix(part, 16).with_context(|| format!("invalid octet '{}'", part))?;
    }
    Ok(mac)
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn open_channel(fd: Option<RawFd>, path: Option<&PathBuf>, name: &str) -> Result<FdTransport> {
    match (fd, path) {
        // SAFETY: the descriptor was handed to this process and nothing
        // else here owns it.
        (Some(fd), _) => Ok(unsafe { FdTransport::from_raw_fd(fd) }),
        (None, Some(path)) => {
            FdTransport::open(path).with_context(|| format!("opening {} channel", name))
        }
        (None, None) => bail!("no {} channel given", name),
    }
}

fn run(args: RunArgs) -> Result<()> {
    let config = load_config(args.config.as_ref())?;
    let interrupt = open_channel(args.itr_fd, args.itr_path.as_ref(), "interrupt")?;
    let control = open_channel(args.ctrl_fd, args.ctrl_path.as_ref(), "control")?;

    info!(mac = %format_mac(&args.mac), "Starting JoyEmu...");
    let mut engine = ProtocolEngine::setup(interrupt, control, args.mac, config)?;

    // Flush the queue before exiting so a reset report still reaches the host.
    match engine.drain() {
        Some(ReaderExit::Resync(e)) => {
            warn!(error = %e, "Host frames out of sync; re-run setup to reconnect");
            Ok(())
        }
        Some(ReaderExit::Fatal(e)) => Err(e).context("reading output reports"),
        None => bail!("reader thread exited abnormally"),
    }
}

fn print_config(config: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let config = load_config(config.as_ref())?;
    match output {
        Some(path) => {
            config.save_to_file(&path)?;
            info!(path = %path.display(), "Configuration written");
        }
        None => print!("{}", config.to_toml()?),
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if cli.verbose {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let result = match cli.command {
        Command::Run(args) => run(args),
        Command::PrintConfig { config, output } => print_config(config, output),
    };

    if let Err(e) = result {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mac() {
        assert_eq!(
            parse_mac("AA:BB:CC:DD:EE:FF").unwrap(),
            [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]
        );
        assert_eq!(parse_mac("98-b6-e9-00-11-22").unwrap()[0], 0x98);
        assert!(parse_mac("AA:BB:CC").is_err());
        assert!(parse_mac("AA:BB:CC:DD:EE:GG").is_err());
    }

    #[test]
    fn test_run_args() {
        let cli = Cli::try_parse_from([
            "joyemu", "run", "--itr-fd", "5", "--ctrl-fd", "4", "--mac", "AA:BB:CC:DD:EE:FF",
        ])
        .unwrap();
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.itr_fd, Some(5));
                assert_eq!(args.mac[5], 0xFF);
            }
            other => panic!("unexpected command {:?}", other),
        }

        // A channel is required one way or the other.
        assert!(Cli::try_parse_from(["joyemu", "run", "--mac", "AA:BB:CC:DD:EE:FF"]).is_err());
    }

    #[test]
    fn test_print_config_defaults() {
        let cli = Cli::try_parse_from(["joyemu", "print-config"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::PrintConfig {
                config: None,
                output: None
            }
        ));
        assert!(load_config(None).unwrap().to_toml().unwrap().contains("queue_capacity = 5"));
    }
}

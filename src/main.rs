use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use plm_rs::plm::transport::list_ports;
use plm_rs::util::hex::{decode_hex_args, hex_byte};
use plm_rs::{init_logger, log_info, PlmConfig, PlmSession};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "plm-cli")]
#[command(about = "CLI tool for the Insteon PowerLinc Modem")]
struct Cli {
    /// Directory holding cmds_send.json, cmds_receive.json, im_parms.json and devices.json
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Serial port to probe (repeatable); defaults to ports with the modem's USB signature
    #[arg(short, long, global = true)]
    port: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Direction {
    Send,
    Receive,
}

#[derive(Subcommand)]
enum Commands {
    /// List serial ports
    Ports {
        #[arg(short, long)]
        verbose: bool,
    },
    /// List the command catalog
    Commands {
        #[arg(value_enum, default_value = "send")]
        direction: Direction,
        #[arg(short, long)]
        verbose: bool,
    },
    /// List known devices, optionally of one type
    Devices {
        #[arg(default_value = "all")]
        kind: String,
        #[arg(short, long)]
        verbose: bool,
    },
    /// Find the modem and print its identity
    Connect,
    /// Send a command, with argument bytes as hex
    Send {
        name: String,
        #[arg(default_value = "")]
        args: String,
    },
    /// Print frames reported by the modem until Ctrl-C
    Monitor {
        /// Only report frames with this command byte, e.g. 50
        #[arg(short, long)]
        filter: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(dir) => PlmConfig::load_dir(dir)
            .with_context(|| format!("loading configuration from {}", dir.display()))?,
        None => PlmConfig::builtin()?,
    };

    match cli.command {
        Commands::Ports { verbose } => {
            for port in list_ports()? {
                match (verbose, port.usb_id) {
                    (true, Some((vid, pid))) => {
                        println!("{}  {vid:04x}:{pid:04x}  {}", port.name, port.description)
                    }
                    (true, None) => println!("{}  {}", port.name, port.description),
                    (false, _) => println!("{}", port.name),
                }
            }
        }
        Commands::Commands { direction, verbose } => match direction {
            Direction::Send => {
                for cmd in config.catalog.send_commands() {
                    println!("{:<32} {}", cmd.name, cmd.template_hex());
                    if verbose {
                        println!("    {} (args: {} {})", cmd.help, cmd.args, cmd.syntax);
                    }
                }
            }
            Direction::Receive => {
                for frame in config.catalog.receive_frames() {
                    println!("{:02X}  {}", frame.command, frame.description);
                    if verbose {
                        println!("    len {}: {}", frame.len, frame.pattern.source());
                    }
                }
            }
        },
        Commands::Devices { kind, verbose } => {
            for device in config.directory.filter_by_type(&kind) {
                println!("{}  {:<12} {}", device.address, device.device_type, device.name);
                if verbose {
                    println!(
                        "    {} / {} (category {}, subcategory {})",
                        device.room, device.location, device.category, device.subcategory
                    );
                }
            }
        }
        Commands::Connect => {
            let mut session = connect(config, &cli.port).await?;
            session.disconnect().await;
        }
        Commands::Send { name, args } => {
            let args = decode_hex_args(&args).with_context(|| format!("argument bytes \"{args}\""))?;
            let mut session = connect(config, &cli.port).await?;
            let reply = session.send_command(&name, &args).await;
            session.disconnect().await;

            let reply = reply?;
            if !reply.is_success() {
                bail!("{} failed", reply.command);
            }
            log_info(&format!("{} succeeded", reply.command));
            for (field, value) in reply.fields.iter() {
                println!("{field}: {value}");
            }
        }
        Commands::Monitor { filter } => {
            let filter = filter
                .as_deref()
                .map(hex_byte)
                .transpose()
                .context("filter must be one hex byte")?;
            let mut session = connect(config, &cli.port).await?;
            println!("Commencing monitoring... (Ctrl-C to terminate)");
            let cancel = async {
                let _ = tokio::signal::ctrl_c().await;
            };
            let result = plm_rs::monitor(&mut session, filter, cancel).await;
            session.disconnect().await;
            let summary = result?;
            log_info(&format!(
                "Reported {} frame(s), filtered {}, malformed {}",
                summary.reported, summary.filtered, summary.malformed
            ));
        }
    }

    Ok(())
}

async fn connect(config: PlmConfig, ports: &[String]) -> Result<PlmSession> {
    let mut session = PlmSession::new(config);
    let identity = if ports.is_empty() {
        session
            .connect_discovered()
            .await
            .context("no modem on the ports with its USB signature; pass --port")?
    } else {
        session.connect(ports).await?
    };
    println!("{identity}");
    Ok(session)
}

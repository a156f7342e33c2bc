use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use std::path::PathBuf;
use uacc::SysPaths;

pub mod commands;

#[derive(Parser)]
#[command(version, about = "Inspect udmabuf buffers and UIO devices", long_about = None)]
struct Cli {
    /// Root of the sysfs class tree
    #[arg(long, env = "UACC_SYSFS", default_value = "/sys/class")]
    sysfs: PathBuf,
    /// Directory holding the device nodes
    #[arg(long, env = "UACC_DEV", default_value = "/dev")]
    dev: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Width {
    #[value(name = "8")]
    W8,
    #[value(name = "16")]
    W16,
    #[value(name = "32")]
    W32,
    #[value(name = "64")]
    W64,
}

#[derive(Subcommand)]
enum Command {
    /// Physical address and size of a buffer
    Info { name: String },
    /// Read one word
    Peek {
        name: String,
        #[arg(value_parser = commands::parse_offset)]
        offset: usize,
        #[arg(long, value_enum, default_value = "32")]
        width: Width,
    },
    /// Write one word
    Poke {
        name: String,
        #[arg(value_parser = commands::parse_offset)]
        offset: usize,
        #[arg(value_parser = commands::parse_number)]
        value: u64,
        #[arg(long, value_enum, default_value = "32")]
        width: Width,
    },
    /// Hex dump part of a buffer
    Dump {
        name: String,
        #[arg(long, value_parser = commands::parse_offset, default_value = "0")]
        offset: usize,
        #[arg(long, value_parser = commands::parse_offset, default_value = "256")]
        len: usize,
    },
    /// Fill with a seeded random pattern and read it back
    Memtest {
        name: String,
        #[arg(long, default_value_t = 0x5eed)]
        seed: u64,
    },
    /// Time cache syncs plus a full read
    Bench {
        name: String,
        #[arg(long, default_value_t = 16)]
        rounds: usize,
    },
    /// List UIO devices
    Uio,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let paths = SysPaths::new(cli.sysfs, cli.dev);
    match cli.command {
        Command::Info { name } => commands::info(&paths, &name),
        Command::Peek {
            name,
            offset,
            width,
        } => commands::peek(&paths, &name, offset, width),
        Command::Poke {
            name,
            offset,
            value,
            width,
        } => commands::poke(&paths, &name, offset, value, width),
        Command::Dump { name, offset, len } => commands::dump(&paths, &name, offset, len),
        Command::Memtest { name, seed } => commands::memtest(&paths, &name, seed),
        Command::Bench { name, rounds } => commands::bench(&paths, &name, rounds),
        Command::Uio => commands::uio(&paths),
    }
}

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use livecode_engine::host::ChildProgram;
use livecode_engine::{Chain, Processor, RunSummary, StreamConfig};
use log::info;

#[derive(Parser)]
#[command(name = "livecode", version, about = "Livecode block processor")]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Rectify raw f32 blocks from stdin to stdout (the default)
    Run(StreamArgs),
    /// Stream stdin through a livecode program to stdout
    Host {
        #[command(flatten)]
        stream: StreamArgs,
        /// Restart the program when its file changes
        #[arg(long)]
        watch: bool,
        program: PathBuf,
        /// Arguments passed to the program
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[derive(Args, Clone, Copy)]
struct StreamArgs {
    /// Frames per block; must match the other end of the pipe
    #[arg(long, default_value_t = livecode_engine::DEFAULT_BLOCK_FRAMES)]
    block_frames: usize,
    /// Interleaved channels per frame
    #[arg(long, default_value_t = livecode_engine::DEFAULT_CHANNELS)]
    channels: usize,
    /// Stop after this many blocks
    #[arg(long)]
    blocks: Option<u64>,
}

impl Default for StreamArgs {
    fn default() -> Self {
        let cfg = StreamConfig::default();
        Self { block_frames: cfg.block_frames(), channels: cfg.channels(), blocks: None }
    }
}

impl StreamArgs {
    fn config(&self) -> Result<StreamConfig> {
        StreamConfig::new(self.block_frames, self.channels).context("Invalid stream shape")
    }
}

fn main() -> Result<()> {
    // stdout carries audio, so logs stay on stderr and quiet by default
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let summary = match cli.cmd.unwrap_or(Command::Run(StreamArgs::default())) {
        Command::Run(args) => {
            let cfg = args.config()?;
            let processor = Processor::rectifier(cfg)?.with_block_limit(args.blocks);
            stream(processor)?
        }
        Command::Host { stream: args, watch, program, args: program_args } => {
            let cfg = args.config()?;
            let child = ChildProgram::spawn(cfg, &program, program_args, watch)
                .with_context(|| format!("Failed to start {}", program.display()))?;
            let chain = Chain::new(cfg.channels()).with(Box::new(child));
            let processor = Processor::new(cfg, chain)?.with_block_limit(args.blocks);
            stream(processor)?
        }
    };
    info!("{} blocks ({} frames), {:?}", summary.blocks, summary.frames, summary.termination);
    Ok(())
}

fn stream(mut processor: Processor) -> Result<RunSummary> {
    let stdin = io::stdin().lock();
    let stdout = io::stdout().lock();
    processor.run(stdin, stdout).context("Stream aborted")
}

//! Drive an external livecode program as one effect in the chain.
//!
//! The program reads blocks on stdin and answers each with one block on
//! stdout, in the same layout. While no program is running, or after it
//! stops answering, audio passes through untouched.

use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use parking_lot::Mutex;

use crate::dsp::effect::Effect;
use crate::error::{HostError, StreamError};
use crate::processor::Breaker;
use crate::stream::{BlockReader, BlockWriter};
use crate::StreamConfig;

/// The program file has to stay quiet this long before it is reloaded,
/// so an editor or compiler is done writing it.
const SETTLE: Duration = Duration::from_millis(200);
const TICK: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
struct Launch {
    program: PathBuf,
    args: Vec<String>,
    cfg: StreamConfig,
}

/// The child itself. Dropping it kills the process.
struct Process {
    generation: u64,
    child: Child,
}

impl Drop for Process {
    fn drop(&mut self) {
        debug!("killing child pid {}", self.child.id());
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// The child's stdio. Locked for a whole exchange.
struct Pipes {
    generation: u64,
    stdin: BlockWriter<ChildStdin>,
    stdout: BlockReader<ChildStdout>,
}

impl Pipes {
    fn exchange(&mut self, block: &mut [f32]) -> Result<(), StreamError> {
        self.stdin.write_block(block)?;
        self.stdout.read_block(block)
    }
}

fn launch_child(launch: &Launch, generation: u64) -> Result<(Process, Pipes), HostError> {
    let mut child = Command::new(&launch.program)
        .args(&launch.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|source| HostError::Spawn {
            program: launch.program.clone(),
            source,
        })?;

    let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
        let _ = child.kill();
        let _ = child.wait();
        return Err(HostError::MissingPipe);
    };
    debug!("spawned {} (pid {})", launch.program.display(), child.id());
    Ok((
        Process { generation, child },
        Pipes {
            generation,
            stdin: BlockWriter::new(stdin, &launch.cfg),
            stdout: BlockReader::new(stdout, &launch.cfg),
        },
    ))
}

/// Process and pipes sit behind separate locks: a reload can kill a child
/// that hangs mid-exchange without waiting for the pipes lock.
#[derive(Default)]
struct Shared {
    process: Mutex<Option<Process>>,
    pipes: Mutex<Option<Pipes>>,
    generation: AtomicU64,
}

impl Shared {
    /// Start a fresh child and swap it in. On failure nothing changes.
    fn start(&self, launch: &Launch) -> Result<(), HostError> {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let (process, pipes) = launch_child(launch, generation)?;
        // killing the old child ends any exchange blocked on it, which frees the pipes lock
        let previous = self.process.lock().replace(process);
        drop(previous);
        let stale = self.pipes.lock().replace(pipes);
        drop(stale);
        Ok(())
    }

    /// Kill the child of `generation` unless a newer one already replaced it.
    fn retire(&self, generation: u64) {
        let mut process = self.process.lock();
        if process.as_ref().is_some_and(|p| p.generation == generation) {
            let dead = process.take();
            drop(process);
            drop(dead);
        }
    }

    fn shutdown(&self) {
        let process = self.process.lock().take();
        if process.is_some() {
            debug!("killing leftover child");
        }
        drop(process);
        self.pipes.lock().take();
    }
}

struct Watch {
    breaker: Breaker,
    handle: JoinHandle<()>,
}

/// A livecode program running as a child process.
pub struct ChildProgram {
    launch: Launch,
    shared: Arc<Shared>,
    watch: Option<Watch>,
}

impl ChildProgram {
    /// Start `program` with `args`. With `watch`, the program is restarted
    /// whenever its file changes on disk.
    pub fn spawn(
        cfg: StreamConfig,
        program: impl Into<PathBuf>,
        args: Vec<String>,
        watch: bool,
    ) -> Result<Self, HostError> {
        let launch = Launch { program: program.into(), args, cfg };
        let shared = Arc::new(Shared::default());
        shared.start(&launch)?;

        let watch = if watch {
            Some(spawn_watch(launch.clone(), shared.clone())?)
        } else {
            None
        };

        Ok(Self { launch, shared, watch })
    }

    pub fn is_running(&self) -> bool {
        self.shared.pipes.lock().is_some()
    }

    /// Start a fresh copy of the program and swap it in for the current one.
    /// On failure the current child, if any, keeps running.
    pub fn respawn(&self) -> Result<(), HostError> {
        self.shared.start(&self.launch)
    }
}

impl Effect for ChildProgram {
    fn name(&self) -> &str {
        "child"
    }

    fn process(&mut self, block: &mut [f32]) {
        let mut pipes = self.shared.pipes.lock();
        let Some(active) = pipes.as_mut() else {
            return;
        };
        if let Err(e) = active.exchange(block) {
            let generation = active.generation;
            warn!(
                "{} stopped answering ({e}); passing audio through",
                self.launch.program.display()
            );
            let dead = pipes.take();
            drop(pipes);
            drop(dead);
            self.shared.retire(generation);
        }
    }
}

impl Drop for ChildProgram {
    fn drop(&mut self) {
        if let Some(w) = self.watch.take() {
            w.breaker.brake();
            let _ = w.handle.join();
        }
        self.shared.shutdown();
    }
}

/// Directory holding the program. Watching it instead of the file keeps
/// working when the file is deleted and recreated.
fn watch_dir(program: &Path) -> &Path {
    match program.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

fn touches(event: &Event, program: &Path) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event
            .paths
            .iter()
            .any(|p| p.file_name().is_some() && p.file_name() == program.file_name())
}

fn spawn_watch(launch: Launch, shared: Arc<Shared>) -> Result<Watch, HostError> {
    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
    let mut watcher = notify::recommended_watcher(tx)?;
    watcher.watch(watch_dir(&launch.program), RecursiveMode::NonRecursive)?;

    let breaker = Breaker::new();
    let stop = breaker.clone();
    let handle = thread::Builder::new()
        .name("livecode-watch".into())
        .spawn(move || {
            // dropping the watcher ends the event stream
            let _watcher = watcher;
            let mut pending: Option<Instant> = None;
            while !stop.test() {
                match rx.recv_timeout(TICK) {
                    Ok(Ok(event)) if touches(&event, &launch.program) => {
                        pending = Some(Instant::now());
                    }
                    Ok(Ok(_)) | Err(RecvTimeoutError::Timeout) => {}
                    Ok(Err(e)) => warn!("watch error: {e}"),
                    Err(RecvTimeoutError::Disconnected) => break,
                }
                if pending.is_some_and(|t| t.elapsed() >= SETTLE) {
                    pending = None;
                    match shared.start(&launch) {
                        Ok(()) => info!("reloaded {}", launch.program.display()),
                        Err(e) => warn!("reload failed, keeping previous program: {e}"),
                    }
                }
            }
            debug!("watcher for {} done", launch.program.display());
        })
        .map_err(|e| HostError::Watch(notify::Error::io(e)))?;

    Ok(Watch { breaker, handle })
}

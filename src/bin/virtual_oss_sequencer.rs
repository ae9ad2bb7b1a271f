//! `virtual_oss_sequencer`: creates a virtual `/dev/sequencer`-equivalent
//! character device that multiplexes onto existing MIDI output devices whose
//! names start with one of the given prefixes. Grounded in
//! `virtual_oss_sequencer.c`'s `main()`/`cmd_opts_parse`.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::FileTypeExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use log::{error, info, warn};

use virtual_midi::cuse::{CharDeviceOps, CuseStatus, PollMask};
use virtual_midi::sequencer::SequencerHandle;
use virtual_midi::worker::WorkerPool;

const PREFIX_COUNT_MAX: usize = 32;

/// A downstream MIDI unit backed by a real character device opened from
/// `/dev`, grounded in `dev_oss_sequencer.c`'s `vm_backend_event_write`
/// writing straight through to the unit's already-open file descriptor.
struct FileDevicePort {
    file: fs::File,
}

impl CharDeviceOps for FileDevicePort {
    fn write(&mut self, data: &[u8]) -> Result<usize, CuseStatus> {
        self.file.write_all(data).map_err(|e| {
            warn!("sequencer: write to downstream device failed: {e}");
            CuseStatus::Invalid
        })?;
        Ok(data.len())
    }

    fn ioctl(&mut self, _cmd: u32, _data_in: &[u8], _data_out: &mut [u8]) -> Result<usize, CuseStatus> {
        Err(CuseStatus::Invalid)
    }

    fn poll(&self) -> PollMask {
        PollMask {
            readable: false,
            writable: true,
        }
    }
}

/// Scans `/dev` for character devices (or symlinks to them) whose name
/// starts with one of `prefixes`, opening each for read-write. Grounded in
/// `dev_oss_sequencer.c`'s `vm_open`, which builds its unit table the same
/// way: `scandir("/dev", ...)` filtered by `scandir_filter_cb` (skip
/// dotfiles and the literal `"midistat"`, keep only `DT_CHR`/`DT_LNK`
/// entries whose name starts with a configured prefix), sorted with
/// `alphasort`.
fn discover_devices(prefixes: &[String]) -> (Vec<Box<dyn CharDeviceOps>>, Vec<String>) {
    let mut entries: Vec<_> = match fs::read_dir("/dev") {
        Ok(rd) => rd.filter_map(|e| e.ok()).collect(),
        Err(e) => {
            warn!("sequencer: failed to scan /dev: {e}");
            return (Vec::new(), Vec::new());
        }
    };
    entries.sort_by_key(|e| e.file_name());

    let mut devs: Vec<Box<dyn CharDeviceOps>> = Vec::new();
    let mut names = Vec::new();

    for entry in entries {
        let name = entry.file_name();
        let name = match name.to_str() {
            Some(n) => n,
            None => continue,
        };
        if name == "midistat" || name.starts_with('.') {
            continue;
        }
        if !prefixes.iter().any(|p| name.starts_with(p.as_str())) {
            continue;
        }
        let file_type = match entry.file_type() {
            Ok(ft) => ft,
            Err(_) => continue,
        };
        if !(file_type.is_char_device() || file_type.is_symlink()) {
            continue;
        }

        let path = entry.path();
        match OpenOptions::new().read(true).write(true).open(&path) {
            Ok(file) => {
                devs.push(Box::new(FileDevicePort { file }));
                names.push(format!("H/W MIDI: {name}"));
            }
            Err(e) => warn!("sequencer: failed to open {}: {e}", path.display()),
        }
    }

    (devs, names)
}

/// Create virtual sequencer device
#[derive(Parser, Debug)]
#[command(name = "virtual_oss_sequencer", version)]
struct Cli {
    /// Run as daemon (best-effort: detaches logging, does not fork)
    #[arg(short = 'd', long = "daemon")]
    daemon: bool,

    /// PID file name
    #[arg(short = 'p', long = "pid")]
    pid: Option<String>,

    /// CUSE worker thread count. Default: CPU count x2
    #[arg(short = 't', long = "threads")]
    threads: Option<usize>,

    /// New virtual MIDI device base name
    #[arg(short = 'V', long = "vdev", default_value = "sequencer")]
    vdev: String,

    /// Output device name prefix. Repeatable, at most 32 entries.
    #[arg(short = 'P', long = "prefix", num_args = 1, action = clap::ArgAction::Append)]
    prefix: Vec<String>,
}

fn main() {
    env_logger::init();
    let mut cli = Cli::parse();

    if cli.prefix.is_empty() {
        cli.prefix = vec!["midi".to_string(), "umidi".to_string()];
    }
    if cli.prefix.len() > PREFIX_COUNT_MAX {
        // Rejected at exactly PREFIX_COUNT_MAX, fixing the reference's
        // off-by-one (`>=` instead of `>` in `cmd_opts_parse`).
        eprintln!("error: at most {PREFIX_COUNT_MAX} --prefix values are allowed");
        std::process::exit(2);
    }

    if let Err(e) = run(cli) {
        error!("{e:#}");
        std::process::exit(70); // EX_SOFTWARE
    }
}

fn run(cli: Cli) -> Result<()> {
    if cli.daemon {
        info!("daemon mode requested: staying attached to the controlling terminal (no fork)");
    }
    if let Some(pid_path) = &cli.pid {
        fs::write(pid_path, format!("{}\n", std::process::id()))?;
    }

    info!(
        "creating virtual sequencer device '{}' over prefixes {:?}",
        cli.vdev, cli.prefix
    );

    let (devs, names) = discover_devices(&cli.prefix);
    info!("sequencer bound to {} downstream unit(s): {:?}", devs.len(), names);
    let sequencer = SequencerHandle::new(devs, names);
    let sequencer = Arc::new(std::sync::Mutex::new(sequencer));

    let threads = cli
        .threads
        .unwrap_or_else(virtual_midi::worker::default_worker_count);
    let running = Arc::new(AtomicBool::new(true));

    {
        let running = Arc::clone(&running);
        ctrlc_handler(running);
    }

    let pool = WorkerPool::spawn(threads, Arc::clone(&running), move || {
        let _ = &sequencer;
        std::thread::sleep(std::time::Duration::from_millis(50));
    });

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(std::time::Duration::from_millis(200));
    }
    pool.stop_and_join();
    Ok(())
}

fn ctrlc_handler(running: Arc<AtomicBool>) {
    use std::sync::OnceLock;
    static RUNNING: OnceLock<Arc<AtomicBool>> = OnceLock::new();
    let _ = RUNNING.set(running);

    extern "C" fn handler(_sig: libc::c_int) {
        if let Some(flag) = RUNNING.get() {
            flag.store(false, Ordering::SeqCst);
        }
    }

    unsafe {
        libc::signal(libc::SIGINT, handler as usize);
        libc::signal(libc::SIGTERM, handler as usize);
    }
}

//! `virtual_midi`: creates a virtual software-synthesized MIDI output
//! character device. Grounded in `virtual_oss_sequencer.c`'s CLI/signal/
//! worker-pool shape (ADDED: no equivalent binary's `main()` exists in the
//! reference's MIDI-device half, only its `vm_dev_midi_create` library call).

use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use log::{error, info};

use virtual_midi::config::VirtualMidiConfig;
use virtual_midi::midi_device::MidiDeviceRecord;
#[cfg(feature = "fluidsynth")]
use virtual_midi::synth::fluid::FluidSynthBackend;
#[cfg(not(feature = "fluidsynth"))]
use virtual_midi::synth::null::NullSynth;
use virtual_midi::worker::{default_worker_count, WorkerPool};

/// Create a virtual software-synthesized MIDI device
#[derive(Parser, Debug)]
#[command(name = "virtual_midi", version)]
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

    /// Device base name
    #[arg(short = 'b', long = "base-name", default_value = "midi")]
    base_name: String,

    /// Audio driver name passed to the synth backend
    #[arg(short = 'D', long = "driver")]
    driver: Option<String>,

    /// Output audio device passed to the synth backend
    #[arg(short = 'O', long = "output-device")]
    output_device: Option<String>,

    /// Soundfont path, required to produce audible output with the
    /// `fluidsynth` feature enabled
    #[arg(short = 'F', long = "soundfont")]
    soundfont: Option<String>,

    /// Optional TOML config file; CLI flags override its values
    #[arg(short = 'c', long = "config")]
    config: Option<String>,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

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

    let mut config = match &cli.config {
        Some(path) => VirtualMidiConfig::load_from_file(path)?,
        None => VirtualMidiConfig::default(),
    };
    if cli.driver.is_some() {
        config.driver = cli.driver.clone();
    }
    if cli.output_device.is_some() {
        config.audio_device = cli.output_device.clone();
    }
    if cli.soundfont.is_some() {
        config.soundfont = cli.soundfont.clone();
    }

    let descr = format!("Soft MIDI: {}", cli.base_name);
    info!("creating virtual MIDI device '{descr}'");

    let options: virtual_midi::synth::BackendOptions = (&config).into();
    let _record = MidiDeviceRecord::new(descr, options, make_backend_factory());

    let threads = cli.threads.unwrap_or_else(default_worker_count);
    let running = Arc::new(AtomicBool::new(true));
    install_signal_handlers(Arc::clone(&running));

    let pool = WorkerPool::spawn(threads, Arc::clone(&running), || {
        std::thread::sleep(std::time::Duration::from_millis(50));
    });

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(std::time::Duration::from_millis(200));
    }
    pool.stop_and_join();
    Ok(())
}

#[cfg(feature = "fluidsynth")]
fn make_backend_factory() -> impl Fn(
    &virtual_midi::synth::BackendOptions,
) -> Result<Box<dyn virtual_midi::synth::SynthBackend>, virtual_midi::Error>
       + Send
       + Sync
       + 'static {
    |opts| Ok(Box::new(FluidSynthBackend::new(opts)?))
}

#[cfg(not(feature = "fluidsynth"))]
fn make_backend_factory() -> impl Fn(
    &virtual_midi::synth::BackendOptions,
) -> Result<Box<dyn virtual_midi::synth::SynthBackend>, virtual_midi::Error>
       + Send
       + Sync
       + 'static {
    |opts| Ok(Box::new(NullSynth::new(opts)))
}

fn install_signal_handlers(running: Arc<AtomicBool>) {
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

use std::{
    error::Error as _,
    fs,
    io::{self, BufWriter, Write},
    path::PathBuf,
    process::ExitCode,
};

use csim::{report, CacheConfig, CacheReport, Error, Layout, Result, Simulator, Trace};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
Usage:  csim [-v] -s <s> -E <E> -b <b> -t <trace> [--json <path>] [--heartbeat <n>]
        csim [-v] (--config <json> | -p <path>) -t <trace> [--json <path>]
        csim -h

    -h              Print this help message and exit
    -v              Verbose mode: report effects of each memory operation
    -s <s>          Number of set index bits (there are 2**s sets)
    -b <b>          Number of block bits (there are 2**b blocks)
    -E <E>          Number of lines per set (associativity)
    -t <trace>      File name of the memory trace to process (.xz accepted)
    --config <json> Inline JSON layout of several caches to simulate
    -p <path>       Path to a JSON layout file
    --json <path>   Write per-cache statistics as JSON
    --heartbeat <n> Log progress every n accesses

The -s, -b, -E, and -t options must be supplied unless a layout is given.
";

struct Options {
    caches: Vec<CacheConfig>,
    /// Caches came from a layout; prefix output with their names.
    layout: bool,
    trace_path: PathBuf,
    verbose: bool,
    json_path: Option<PathBuf>,
    heartbeat: u64,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let mut args = pico_args::Arguments::from_env();
    if args.contains(["-h", "--help"]) {
        print!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    match parse_args(args).and_then(run) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("csim: {err}");
            let mut source = err.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            if matches!(
                err,
                Error::Args(_) | Error::MissingArgument(_) | Error::UnusedArguments(_)
            ) {
                eprint!("\n{USAGE}");
            }
            ExitCode::FAILURE
        }
    }
}

fn parse_args(mut args: pico_args::Arguments) -> Result<Options> {
    let verbose = args.contains("-v");
    let heartbeat: u64 = args.opt_value_from_str("--heartbeat")?.unwrap_or(0);
    let json_path: Option<PathBuf> = args.opt_value_from_str("--json")?;

    let layout_str: Option<String> = match args.opt_value_from_str("--config")? {
        Some(json) => Some(json),
        None => {
            let path: Option<PathBuf> = args.opt_value_from_str("-p")?;
            path.map(|path| fs::read_to_string(&path).map_err(|err| Error::io(path, err)))
                .transpose()?
        }
    };

    let (caches, layout) = if let Some(json) = layout_str {
        (Layout::from_json(&json)?.caches, true)
    } else {
        let s: u32 = args
            .opt_value_from_str("-s")?
            .ok_or(Error::MissingArgument("-s"))?;
        let e: usize = args
            .opt_value_from_str("-E")?
            .ok_or(Error::MissingArgument("-E"))?;
        let b: u32 = args
            .opt_value_from_str("-b")?
            .ok_or(Error::MissingArgument("-b"))?;
        (vec![CacheConfig::new(s, e, b)?], false)
    };

    let trace_path: PathBuf = args
        .opt_value_from_str("-t")?
        .ok_or(Error::MissingArgument("-t"))?;

    let rest = args.finish();
    if !rest.is_empty() {
        return Err(Error::UnusedArguments(
            rest.into_iter()
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect(),
        ));
    }

    Ok(Options {
        caches,
        layout,
        trace_path,
        verbose,
        json_path,
        heartbeat,
    })
}

fn run(opts: Options) -> Result<()> {
    let trace = Trace::read(&opts.trace_path)?;
    info!(accesses = trace.len(), caches = opts.caches.len(), "trace loaded");

    // Every table is allocated before the first access is replayed.
    let mut sims = opts
        .caches
        .into_iter()
        .map(|config| Simulator::new(config).map(|sim| sim.with_heartbeat(opts.heartbeat)))
        .collect::<Result<Vec<_>>>()?;

    if opts.verbose {
        let stdout = io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        for sim in &mut sims {
            let prefix = opts.layout.then(|| sim.config().name.clone());
            let mut failed = None;
            sim.run_with(&trace, |access, result| {
                if failed.is_none() {
                    failed = report::write_verbose(&mut out, prefix.as_deref(), access, result).err();
                }
            });
            if let Some(err) = failed {
                return Err(Error::io("<stdout>", err));
            }
        }
        out.flush().map_err(|err| Error::io("<stdout>", err))?;
    } else if sims.len() == 1 {
        for sim in &mut sims {
            sim.run(&trace);
        }
    } else {
        debug!(threads = sims.len(), "running caches in parallel");
        let trace = &trace;
        crossbeam::scope(|scope| {
            for sim in &mut sims {
                scope.spawn(move |_| sim.run(trace));
            }
        })
        .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
    }

    for sim in &sims {
        let line = report::summary(&sim.stats());
        if opts.layout {
            println!("{}: {line}", sim.config().name);
        } else {
            println!("{line}");
        }
    }

    if let Some(path) = opts.json_path {
        let reports = sims
            .iter()
            .map(|sim| CacheReport::new(sim.config(), sim.stats()))
            .collect::<Vec<_>>();
        let file = fs::File::create(&path).map_err(|err| Error::io(&path, err))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &reports)?;
        writer.flush().map_err(|err| Error::io(&path, err))?;
    }
    Ok(())
}

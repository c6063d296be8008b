mod cli;

use std::{collections::HashMap, io, path::{Path, PathBuf}, time::Duration};

use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cli::{Parser, Cli, Commands};
use blocklaunch::{
    env, Credentials, Downloader, Events, LaunchDescriptor, LaunchEvent, LaunchProfile,
    Launcher, Phase, VersionResolver
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    match cli.command {
        Commands::Launch { profile, dry_run } => {
            let profile = LaunchProfile::load(&absolute_path(&profile)?)?;

            let (events, rx) = Events::channel();
            let reporter = tokio::spawn(report_events(rx));

            let launcher = Launcher::new(events);

            let result = if dry_run {
                launcher.prepare(&profile).await
                    .map(|cmd| println!("{}", cmd.get_args().join(" ")))
            } else {
                match launcher.launch(&profile).await {
                    Ok(process) => process.wait().await.map(|code| debug!("Exit code {code:?}")),
                    Err(e) => Err(e)
                }
            };

            // dropping the launcher closes the event stream
            drop(launcher);
            let _ = reporter.await;

            result
        },
        Commands::Resolve { version, root } => {
            let root = match root {
                Some(root) => absolute_path(&root)?,
                None => env::get_data_dir()
            };

            let profile = LaunchProfile::new(root, &version, Credentials::default());
            let downloader = Downloader::new(
                Duration::from_millis(profile.overrides.timeout),
                Events::none()
            )?;

            let resolver = VersionResolver::new(&profile, downloader);
            let manifest = resolver.resolve(&version).await?;
            let descriptor = LaunchDescriptor::new(&manifest, None);

            println!("{} ({:?})", manifest.id, descriptor.schema());
            println!("  main class: {}", manifest.main_class);
            println!("  asset index: {}", manifest.asset_index.id);
            println!("  libraries: {}", manifest.libraries.len());
            println!("  descriptor: {}", resolver.descriptor_path(&version).display());

            Ok(())
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("blocklaunch={level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn absolute_path(path: &Path) -> io::Result<PathBuf> {
    Ok(if !path.is_absolute() {
        std::env::current_dir()?.join(path)
    } else {
        path.to_owned()
    })
}

async fn report_events(mut rx: UnboundedReceiver<LaunchEvent>) {
    let mut progress = ProgressHandler::new();

    while let Some(event) = rx.recv().await {
        match event {
            LaunchEvent::Progress { phase, task, total } => {
                if task == 0 {
                    progress.begin(phase, total);
                } else {
                    progress.advance(phase, task);
                }
            },
            LaunchEvent::State(state) => debug!("Launch state {state:?}"),
            LaunchEvent::Debug(msg) => debug!("{msg}"),
            LaunchEvent::Data(line) => println!("{line}"),
            LaunchEvent::Download { .. } | LaunchEvent::Close(_) => { }
        }
    }

    progress.end();
}

/// One progress bar per phase, phases run concurrently
struct ProgressHandler {
    multi: MultiProgress,
    bars: HashMap<Phase, ProgressBar>
}

impl ProgressHandler {
    fn new() -> Self {
        ProgressHandler {
            multi: MultiProgress::with_draw_target(ProgressDrawTarget::stdout()),
            bars: HashMap::new()
        }
    }

    fn begin(&mut self, phase: Phase, total: usize) {
        let style = ProgressStyle::with_template("{bar:40.cyan/blue} {msg} {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());

        let bar = self.bars.entry(phase)
            .or_insert_with(|| self.multi.add(ProgressBar::new(0)));

        bar.set_style(style);
        bar.set_length(total as u64);
        bar.set_message(phase_message(phase));
        bar.reset();

        if total == 0 {
            bar.finish_and_clear();
        }
    }

    fn advance(&mut self, phase: Phase, current: usize) {
        if let Some(bar) = self.bars.get(&phase) {
            bar.set_position(current as u64);

            if Some(current as u64) == bar.length() {
                bar.finish_and_clear();
            }
        }
    }

    fn end(&mut self) {
        for bar in self.bars.values() {
            bar.finish_and_clear();
        }
    }
}

fn phase_message(phase: Phase) -> &'static str {
    match phase {
        Phase::Natives => "Extracting natives",
        Phase::Classes => "Downloading libraries",
        Phase::Assets => "Downloading assets",
        Phase::AssetsCopy => "Copy resources",
        Phase::Forge => "Downloading loader files"
    }
}

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use crate::core::archive::{ArchiveSink, PackArchive};
use crate::core::assembler::{AssemblyReport, PackAssembler, PackOutcome};
use crate::core::error::{BundlerError, BundlerResult};
use crate::core::resolver::SourceProber;
use crate::core::selection::SelectionState;
use crate::core::state::{AppState, BundlerSettings};
use crate::core::version::normalize;

#[derive(Debug, Parser)]
#[command(name = "tinkercraft", about = "Bundle selected Tinkercraft packs into one archive")]
pub struct Cli {
    /// Settings file (defaults to the per-user config directory).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve, fetch and zip every selected pack.
    Assemble(AssembleArgs),
    /// Only resolve variant folders and print them.
    Resolve(SelectionArgs),
}

#[derive(Debug, Args)]
pub struct SelectionArgs {
    /// Base URL or local directory that contains `packs/`.
    #[arg(long)]
    pub source: Option<String>,

    /// Pack key; repeat for several packs. Order decides path collisions.
    #[arg(long = "pack", value_name = "KEY", required = true)]
    pub packs: Vec<String>,

    /// Game version token (`21`, `1.21.x`, ...); repeatable.
    #[arg(long = "version", visible_alias = "mc-version", value_name = "TOKEN")]
    pub versions: Vec<String>,
}

#[derive(Debug, Args)]
pub struct AssembleArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Output archive path (defaults to `archive_name` in the current directory).
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Write the assembly report as JSON.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

pub async fn dispatch(cli: Cli) -> BundlerResult<()> {
    let mut settings = BundlerSettings::load(cli.config.as_deref())?;

    match cli.command {
        Command::Assemble(args) => {
            apply_overrides(&mut settings, &args.selection);
            assemble(settings, args).await
        }
        Command::Resolve(args) => {
            apply_overrides(&mut settings, &args);
            resolve(settings, args).await
        }
    }
}

fn apply_overrides(settings: &mut BundlerSettings, args: &SelectionArgs) {
    if let Some(source) = &args.source {
        settings.source = Some(source.clone());
    }
}

async fn assemble(settings: BundlerSettings, args: AssembleArgs) -> BundlerResult<()> {
    let selection = SelectionState::from_raw(args.selection.packs, args.selection.versions)?;
    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(&settings.archive_name));
    let deadline = settings.deadline();

    let state = AppState::new(settings)?;
    let assembler = state.assembler()?;
    let mut archive = PackArchive::new();

    let report = assemble_within(&assembler, &selection, &mut archive, deadline).await?;

    print_report(&report);
    if let Some(path) = &args.report {
        write_report(&report, path).await?;
    }

    if archive.is_empty() {
        return Err(BundlerError::EmptyArchive);
    }
    let summary = archive.write_to_path(&output).await?;
    println!(
        "Wrote {} ({} files, sha256 {})",
        summary.path.display(),
        summary.entries,
        summary.sha256
    );
    Ok(())
}

/// Run one assembly, abandoning in-flight work once `deadline` passes.
async fn assemble_within(
    assembler: &PackAssembler,
    selection: &SelectionState,
    archive: &mut PackArchive,
    deadline: Option<Duration>,
) -> BundlerResult<AssemblyReport> {
    match deadline {
        Some(limit) => tokio::time::timeout(limit, assembler.assemble(selection, archive))
            .await
            .map_err(|_| BundlerError::DeadlineExceeded(limit.as_secs())),
        None => Ok(assembler.assemble(selection, archive).await),
    }
}

async fn resolve(settings: BundlerSettings, args: SelectionArgs) -> BundlerResult<()> {
    let selection = SelectionState::from_raw(args.packs, args.versions)?;
    let state = AppState::new(settings)?;
    let source = state.open_source()?;
    let resolver = state.settings.resolver();

    let normalized = normalize(selection.versions());
    let prober = SourceProber::new(source.as_ref());

    for pack in selection.packs() {
        let resolution = resolver.resolve(&prober, pack, &normalized.versions).await;
        match resolution.folder {
            Some(folder) => println!("{} -> {} ({} probes)", pack, folder, resolution.stats.probed),
            None => println!("{} -> unresolved ({} probes)", pack, resolution.stats.probed),
        }
    }
    Ok(())
}

fn print_report(report: &AssemblyReport) {
    for pack in &report.packs {
        let folder = pack
            .folder
            .map(|f| f.to_string())
            .unwrap_or_else(|| "-".into());
        let status = match &pack.outcome {
            PackOutcome::Assembled => "assembled".to_string(),
            PackOutcome::Unresolved => "unresolved".to_string(),
            PackOutcome::ManifestFailed { error } => error.to_string(),
        };
        println!(
            "{:<24} {:<12} {:>4} added {:>4} skipped  {}",
            pack.pack.as_str(),
            folder,
            pack.files_added,
            pack.files_skipped,
            status
        );
    }
    if !report.rejected_versions.is_empty() {
        warn!("Ignored version tokens: {:?}", report.rejected_versions);
    }
}

async fn write_report(report: &AssemblyReport, path: &Path) -> BundlerResult<()> {
    let json = serde_json::to_string_pretty(report)?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| BundlerError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
    info!("Report written to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::sync::Arc;

    use super::*;
    use crate::core::source::{PackSource, ProbeResult};

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("site");
        write(&root, "packs/fresh_crops/20/manifest.json", "[]");
        write(
            &root,
            "packs/fresh_crops/20_21/manifest.json",
            r#"[
                {"name": "pack.mcmeta", "location": "main", "merge": true, "version": 1},
                {"name": "carrot.png", "location": "assets/minecraft/textures/item", "merge": false, "version": 1}
            ]"#,
        );
        write(&root, "packs/fresh_crops/20_21/pack.mcmeta", "{}");
        write(
            &root,
            "packs/fresh_crops/20_21/assets/minecraft/textures/item/carrot.png",
            "PNG",
        );
        write(dir.path(), "settings.json", r#"{"probe_concurrency": 2}"#);
        dir
    }

    fn assemble_cli(dir: &Path, packs: &[&str], versions: &[&str]) -> Cli {
        Cli {
            config: Some(dir.join("settings.json")),
            command: Command::Assemble(AssembleArgs {
                selection: SelectionArgs {
                    source: Some(dir.join("site").display().to_string()),
                    packs: packs.iter().map(|s| s.to_string()).collect(),
                    versions: versions.iter().map(|s| s.to_string()).collect(),
                },
                output: Some(dir.join("out.zip")),
                report: Some(dir.join("report.json")),
            }),
        }
    }

    #[tokio::test]
    async fn assemble_writes_zip_and_report() {
        let dir = site();
        dispatch(assemble_cli(dir.path(), &["fresh_crops"], &["1.20.x", "21"]))
            .await
            .unwrap();

        let bytes = std::fs::read(dir.path().join("out.zip")).unwrap();
        let mut zip = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let mut names: Vec<_> = zip.file_names().map(|s| s.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            vec!["assets/minecraft/textures/item/carrot.png", "pack.mcmeta"]
        );
        let mut png = String::new();
        zip.by_name("assets/minecraft/textures/item/carrot.png")
            .unwrap()
            .read_to_string(&mut png)
            .unwrap();
        assert_eq!(png, "PNG");

        let report: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.path().join("report.json")).unwrap())
                .unwrap();
        assert_eq!(report["packs"][0]["folder"], "20_21");
        assert_eq!(report["packs"][0]["outcome"]["status"], "assembled");
        assert_eq!(report["versions"], serde_json::json!([20, 21]));
    }

    #[tokio::test]
    async fn nothing_assembled_is_an_error() {
        let dir = site();
        let err = dispatch(assemble_cli(dir.path(), &["fresh_crops"], &["5"]))
            .await
            .unwrap_err();
        assert!(matches!(err, BundlerError::EmptyArchive));
        assert!(!dir.path().join("out.zip").exists());
        // The report is still written for diagnostics.
        assert!(dir.path().join("report.json").exists());
    }

    #[test]
    fn cli_parses_repeated_packs_and_versions() {
        let cli = Cli::try_parse_from([
            "tinkercraft",
            "assemble",
            "--source",
            "https://example.com",
            "--pack",
            "fresh_crops",
            "--pack",
            "grand_world",
            "--version",
            "1.21.x",
            "--mc-version",
            "20",
            "-o",
            "packs.zip",
        ])
        .unwrap();
        match cli.command {
            Command::Assemble(args) => {
                assert_eq!(args.selection.packs, vec!["fresh_crops", "grand_world"]);
                assert_eq!(args.selection.versions, vec!["1.21.x", "20"]);
                assert_eq!(args.output, Some(PathBuf::from("packs.zip")));
            }
            Command::Resolve(_) => panic!("expected assemble"),
        }
    }

    struct StalledSource;

    #[async_trait::async_trait]
    impl PackSource for StalledSource {
        async fn probe(&self, _path: &str) -> ProbeResult {
            tokio::time::sleep(Duration::from_secs(60)).await;
            ProbeResult::Absent
        }

        async fn fetch(&self, path: &str) -> BundlerResult<Vec<u8>> {
            Err(BundlerError::ResourceMissing {
                location: path.to_string(),
                status: None,
            })
        }

        fn describe(&self) -> String {
            "stalled".into()
        }
    }

    #[tokio::test]
    async fn deadline_abandons_a_stalled_assembly() {
        let settings = BundlerSettings {
            deadline_secs: Some(0),
            ..BundlerSettings::default()
        };
        let assembler = PackAssembler::new(Arc::new(StalledSource), settings.resolver());
        let selection = SelectionState::from_raw(["fresh_crops"], ["21"]).unwrap();
        let mut archive = PackArchive::new();

        let err = assemble_within(&assembler, &selection, &mut archive, settings.deadline())
            .await
            .unwrap_err();
        assert!(matches!(err, BundlerError::DeadlineExceeded(0)));
        assert!(archive.is_empty());
    }

    #[tokio::test]
    async fn no_deadline_runs_to_completion() {
        let dir = site();
        let source = Arc::new(crate::core::source::DirPackSource::new(dir.path().join("site")));
        let assembler = PackAssembler::new(source, BundlerSettings::default().resolver());
        let selection = SelectionState::from_raw(["fresh_crops"], ["20"]).unwrap();
        let mut archive = PackArchive::new();

        let report = assemble_within(&assembler, &selection, &mut archive, None)
            .await
            .unwrap();
        assert_eq!(report.assembled_packs(), 1);
    }

    #[test]
    fn cli_requires_a_pack() {
        assert!(Cli::try_parse_from(["tinkercraft", "resolve", "--source", "x"]).is_err());
    }
}

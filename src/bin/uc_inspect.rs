use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use uc_tools_lib::map::{building, objects, read_world_number, texture, MapLayout};
use uc_tools_lib::{lights, mission, AssetKind, BufferStore, EditorConfig};

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  uc-inspect [--config <editor.json>] [--tiles] <file.lgt|file.iam|file.ucm>");
    eprintln!();
    eprintln!("Prints the decoded records as JSON. Set RUST_LOG=debug for codec logs.");
    eprintln!("Without --config, {DEFAULT_CONFIG} is read when present.");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  uc-inspect levels/park.lgt");
    eprintln!("  uc-inspect --tiles data/park.iam");
    eprintln!("  RUST_LOG=uc_tools_lib=debug uc-inspect missions/park1.ucm");
    std::process::exit(1);
}

struct Args {
    file: PathBuf,
    config: Option<PathBuf>,
    tiles: bool,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut file = None;
    let mut config = None;
    let mut tiles = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                let Some(value) = args.get(i + 1) else {
                    eprintln!("--config requires a path");
                    usage();
                };
                config = Some(PathBuf::from(value));
                i += 2;
            }
            "--tiles" => {
                tiles = true;
                i += 1;
            }
            "-h" | "--help" => usage(),
            other if file.is_none() => {
                file = Some(PathBuf::from(other));
                i += 1;
            }
            other => {
                eprintln!("Unexpected argument '{}'", other);
                usage();
            }
        }
    }

    match file {
        Some(file) => Args { file, config, tiles },
        None => usage(),
    }
}

/// Config picked up from the working directory when `--config` is not given.
const DEFAULT_CONFIG: &str = "uc-editor.json";

fn inspect_map(
    bytes: &[u8],
    config: &EditorConfig,
    tiles: bool,
) -> anyhow::Result<serde_json::Value> {
    let layout = MapLayout::read(bytes).context("reading map layout")?;
    let location = building::locate(bytes, config.building_scan_window);
    let block = building::decode_buildings(bytes, &location).context("decoding buildings")?;
    let section = objects::read_all_prims_with_limit(bytes, config.max_objects)
        .context("reading object section")?;

    let mut report = json!({
        "layout": layout,
        "world_number": read_world_number(bytes)?,
        "building_region": location,
        "buildings": block,
        "prims": section.prims,
        "visible_prims": section.visible().count(),
    });
    if tiles {
        let tiles: Vec<_> = texture::read_all_tiles(bytes)?
            .into_iter()
            .map(|t| {
                json!({
                    "tx": t.tx,
                    "ty": t.ty,
                    "texture": t.key.to_string(),
                    "rotation": t.rotation_degrees,
                })
            })
            .collect();
        report["tiles"] = json!(tiles);
    }
    Ok(report)
}

fn inspect(
    path: &Path,
    kind: AssetKind,
    bytes: &[u8],
    config: &EditorConfig,
    tiles: bool,
) -> anyhow::Result<serde_json::Value> {
    let report = match kind {
        AssetKind::Lights => {
            let file = lights::decode(bytes).context("decoding lights")?;
            json!({
                "file": file,
                "used": file.used_lights().count(),
                "first_free": file.find_first_free_index(),
            })
        }
        AssetKind::Map => inspect_map(bytes, config, tiles)?,
        AssetKind::Mission => {
            let mission = mission::decode(bytes).context("decoding mission")?;
            let views: Vec<_> = mission
                .used()
                .map(|(i, ep)| json!({ "index": i, "data": ep.data_view() }))
                .collect();
            json!({ "mission": mission, "data_views": views })
        }
    };
    tracing::debug!(path = %path.display(), ?kind, "inspected");
    Ok(report)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args();
    let config = match &args.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::load_or_default(Path::new(DEFAULT_CONFIG))?,
    };

    let Some(kind) = AssetKind::from_path(&args.file) else {
        bail!("unknown file type: {}", args.file.display());
    };
    let store = BufferStore::new(kind);
    store
        .load(&args.file)
        .await
        .with_context(|| format!("loading {}", args.file.display()))?;

    let report = inspect(&args.file, kind, &store.snapshot(), &config, args.tiles)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

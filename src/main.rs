use alias_models::export::{frame_to_mesh, mesh_to_obj_bytes, PngSkinWriter};
use alias_models::registry::MAX_MODELS;
use alias_models::skins::MemoryImages;
use alias_models::{
    DirectoryImages, DirectorySource, ImageDecode, LoadedModel, LoaderLimits, ModelLoader, Registry,
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// JSON file overriding the loader limits
    #[arg(long, global = true)]
    limits: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Info {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    ToObj {
        file: PathBuf,
        out: PathBuf,
        #[arg(long, default_value_t = 0)]
        frame: usize,
    },
    ExtractSkins {
        file: PathBuf,
        dir: PathBuf,
        #[arg(long)]
        palette: Option<PathBuf>,
    },
    Resolve {
        names: Vec<String>,
        #[arg(long)]
        root: PathBuf,
        /// Write inline skins here as PNG instead of keeping them in memory
        #[arg(long)]
        skin_dir: Option<PathBuf>,
    },
}

fn load_file(loader: &ModelLoader, path: &Path) -> Result<LoadedModel, Box<dyn Error>> {
    let data = fs::read(path)?;
    let name = path.to_string_lossy().replace('\\', "/");
    Ok(loader.load(&name, &data)?)
}

fn print_info(model: &LoadedModel, json: bool) -> Result<(), Box<dyn Error>> {
    let summary = model.summary();
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    println!("[alias_models::info] {} ({} {:?})", summary.name, summary.format, summary.kind);
    println!("[alias_models::info] arena {} bytes", summary.arena_bytes);
    if let Some([w, h]) = summary.skin_size {
        println!("[alias_models::info] skin size {w}x{h}");
    }
    println!(
        "[alias_models::info] {} verts, {} tris, {} command words, {} mesh nodes",
        summary.vertices, summary.triangles, summary.commands, summary.meshes
    );
    println!("[alias_models::info] {} frames", summary.frames);
    for (i, name) in summary.frame_names.iter().enumerate() {
        println!("[alias_models::info]   frame {i}: {name}");
    }
    for (i, name) in summary.skins.iter().enumerate() {
        println!("[alias_models::info]   skin {i}: {name}");
    }
    Ok(())
}

fn export_obj(model: &LoadedModel, frame: usize, out: &Path) -> Result<(), Box<dyn Error>> {
    let mesh = frame_to_mesh(model, frame)?;
    let bytes = mesh_to_obj_bytes(&mesh)?;
    fs::write(out, bytes)?;
    println!(
        "[alias_models::export] wrote frame {frame} of {} ({} verts, {} faces) to {}",
        model.name(),
        mesh.vertices.len(),
        mesh.faces.len(),
        out.display()
    );
    Ok(())
}

fn extract_skins(
    mut model: LoadedModel,
    dir: &Path,
    palette: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let mut writer = PngSkinWriter::new(dir);
    if let Some(path) = palette {
        writer = writer.with_palette(&fs::read(path)?)?;
    }
    let has_inline = model.alias().is_some_and(|a| a.has_inline_skins());
    if !has_inline {
        println!(
            "[alias_models::export] {} references external skins, nothing to extract",
            model.name()
        );
    }
    let lookup = DirectoryImages::new(dir);
    model.bind_skins(&lookup, Some(&mut writer));
    for path in writer.written() {
        println!("[alias_models::export] wrote {}", path.display());
    }
    Ok(())
}

fn resolve(
    loader: ModelLoader,
    names: &[String],
    root: &Path,
    skin_dir: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let files = DirectorySource::new(root);
    let images = DirectoryImages::new(root);
    let mut registry = Registry::new(loader, MAX_MODELS);
    let mut decoder: Box<dyn ImageDecode> = match skin_dir {
        Some(dir) => Box::new(PngSkinWriter::new(dir)),
        None => Box::new(MemoryImages::default()),
    };

    registry.begin_registration();
    for name in names {
        match registry.register(name, &files, &images, Some(&mut *decoder)) {
            Ok(model) => {
                let bound = model.skins().iter().flatten().count();
                println!(
                    "[alias_models::resolve] {name}: {} model, {} frames, {bound} images bound",
                    model.format(),
                    model.num_frames()
                );
                let inline = model.alias().is_some_and(|a| a.has_inline_skins());
                for (i, handle) in model.skins().iter().enumerate() {
                    match handle {
                        Some(_) if inline => {
                            println!("[alias_models::resolve]   image {i}: decoded from atlas")
                        }
                        Some(h) => {
                            if let Some(path) = images.path_of(*h) {
                                println!("[alias_models::resolve]   image {i}: {}", path.display());
                            }
                        }
                        None => {}
                    }
                }
            }
            Err(e) => println!("[alias_models::resolve] {name}: {e}"),
        }
    }
    let evicted = registry.end_registration();
    if evicted > 0 {
        println!("[alias_models::resolve] evicted {evicted} models");
    }

    for entry in registry.entries() {
        println!(
            "[alias_models::resolve] {:>8} bytes  {}{}",
            entry.arena_bytes,
            entry.name,
            if entry.in_use { "" } else { " (unused)" }
        );
    }
    println!("[alias_models::resolve] {} bytes total", registry.total_bytes());
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let limits = match &cli.limits {
        Some(path) => LoaderLimits::load(path)?,
        None => LoaderLimits::default(),
    };
    let loader = ModelLoader::new(limits);

    let start = Utc::now();
    match cli.command {
        Commands::Info { file, json } => {
            let model = load_file(&loader, &file)?;
            print_info(&model, json)?;
        }
        Commands::ToObj { file, out, frame } => {
            let model = load_file(&loader, &file)?;
            export_obj(&model, frame, &out)?;
        }
        Commands::ExtractSkins { file, dir, palette } => {
            let model = load_file(&loader, &file)?;
            extract_skins(model, &dir, palette.as_deref())?;
        }
        Commands::Resolve { names, root, skin_dir } => {
            resolve(loader, &names, &root, skin_dir.as_deref())?;
        }
    }
    let end = Utc::now();
    let elapsed = end.signed_duration_since(start);
    // stderr keeps `info --json` output parseable
    eprintln!("done in {} ms", elapsed.num_milliseconds());
    Ok(())
}

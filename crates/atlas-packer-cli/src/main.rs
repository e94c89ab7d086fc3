use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::Context;
use atlas_packer_core::prelude::*;
use atlas_packer_core::FontdueRasterizer;
use clap::{ArgAction, Parser, Subcommand};
use globset::{Glob, GlobSetBuilder};
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, ImageReader};
use serde::Deserialize;
use tracing::{error, info, warn};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "atlas-packer",
    about = "Pack bitmaps, grid animations and font glyphs into texture atlases",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --progress false or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pack a directory tree into an atlas (subdirectories become folders)
    Pack(PackArgs),
    /// Load an atlas and print its statistics and folder tree
    Inspect(InspectArgs),
    /// Load an atlas and save it again, optionally through a texture array
    Convert(ConvertArgs),
}

#[derive(Parser, Debug, Clone)]
struct PackArgs {
    // Input/Output
    /// Input directory
    #[arg(help_heading = "Input/Output")]
    input: PathBuf,
    /// Output directory
    #[arg(short, long, default_value = "out", help_heading = "Input/Output")]
    out_dir: PathBuf,
    /// Atlas base name (files will be name.json and name_<page>.png/.exr)
    #[arg(short, long, default_value = "atlas", help_heading = "Input/Output")]
    name: String,
    /// YAML config file path (overrides layout and pixel format options)
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,
    /// Include patterns (glob). If set, only files matching any pattern are considered
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob). Files matching any pattern will be ignored
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,

    // Layout
    /// Page width
    #[arg(long, default_value_t = 1024, help_heading = "Layout")]
    width: u32,
    /// Page height
    #[arg(long, default_value_t = 1024, help_heading = "Layout")]
    height: u32,
    /// Margin kept around every entry and along page edges
    #[arg(long, default_value_t = 0, help_heading = "Layout")]
    padding: u32,

    // Pixel format
    /// Forced page format: gray|rgb|rgba|gray_float|rgb_float|rgba_float
    #[arg(long, help_heading = "Pixel Format")]
    pixel_format: Option<String>,
    /// Fail instead of relaxing a forced format that conflicts with the policy
    #[arg(long, default_value_t = false, help_heading = "Pixel Format")]
    no_upgrade: bool,
    /// Widen gray sources to RGB
    #[arg(long, default_value_t = false, help_heading = "Pixel Format")]
    no_luminance: bool,
    /// Narrow float sources to 8-bit
    #[arg(long, default_value_t = false, help_heading = "Pixel Format")]
    no_float: bool,

    // Fonts
    /// TrueType/OpenType font to rasterize into a character set
    #[arg(long, help_heading = "Fonts")]
    font: Option<PathBuf>,
    /// Characters to rasterize (defaults to printable ASCII)
    #[arg(long, help_heading = "Fonts")]
    chars: Option<String>,
    /// Glyph size in pixels
    #[arg(long, default_value_t = 32.0, help_heading = "Fonts")]
    font_size: f32,

    // Export
    /// Export packing stats (JSON) to this file
    #[arg(long, help_heading = "Export")]
    export_stats: Option<PathBuf>,
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
    /// Dry run: generate and report stats but do not write files
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,
}

#[derive(Parser, Debug, Clone)]
struct InspectArgs {
    /// Atlas index (.json)
    index: PathBuf,
    /// Also list every entry with its rectangle
    #[arg(long, default_value_t = false)]
    entries: bool,
}

#[derive(Parser, Debug, Clone)]
struct ConvertArgs {
    /// Source atlas index (.json)
    index: PathBuf,
    /// Destination index (.json); pages are written next to it
    out: PathBuf,
    /// Route pages through the texture-array storage
    #[arg(long, default_value_t = false)]
    texture_array: bool,
    /// Reload the written atlas and check it matches the source
    #[arg(long, default_value_t = false)]
    verify: bool,
}

/// Optional per-image settings read from `<stem>.json` next to the image.
/// For multi-frame GIFs only `tag` and `frame_duration` apply.
#[derive(Debug, Deserialize, Default)]
struct Sidecar {
    tag: Option<i32>,
    frame_count: Option<u32>,
    frames_per_line: Option<u32>,
    frame_duration: Option<f32>,
}

impl Sidecar {
    fn animation(&self) -> Option<AnimationGridInfo> {
        let frame_count = self.frame_count?;
        Some(AnimationGridInfo::new(
            frame_count,
            self.frames_per_line.unwrap_or(frame_count),
            self.frame_duration.unwrap_or(0.1),
        ))
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    match &cli.command {
        Commands::Pack(args) => run_pack(args, cli.progress && !cli.quiet),
        Commands::Inspect(args) => run_inspect(args),
        Commands::Convert(args) => run_convert(args),
    }
}

fn run_pack(cli: &PackArgs, show_progress: bool) -> anyhow::Result<()> {
    let mut params = AtlasGeneratorParams::builder()
        .with_dimensions(cli.width, cli.height)
        .padding(cli.padding)
        .forced_pixel_format(cli.pixel_format.as_deref().map(parse_pixel_format).transpose()?)
        .upgrade_pixel_format(!cli.no_upgrade)
        .accept_luminance(!cli.no_luminance)
        .accept_float(!cli.no_float)
        .build();

    // Config file sets layout and pixel format options en bloc
    if let Some(path) = &cli.config {
        let file =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let y: YamlConfig = serde_yaml::from_str(&file)?;
        params = y.into_params(params)?;
    }
    params.validate()?;

    if cli.print_config {
        match cli.print_config_format.as_str() {
            "yaml" => println!("{}", serde_yaml::to_string(&params)?),
            _ => println!("{}", serde_json::to_string_pretty(&params)?),
        }
        return Ok(());
    }

    let paths = gather_paths(&cli.input, &cli.include, &cli.exclude)?;
    let mut input = AtlasInput::new();
    let loaded = load_images_with_progress(&cli.input, &paths, &mut input, show_progress)?;
    info!(count = loaded, "loaded input images");

    if let Some(font_path) = &cli.font {
        let bytes =
            fs::read(font_path).with_context(|| format!("read font {}", font_path.display()))?;
        let font_name = file_stem(font_path);
        let rasterizer = FontdueRasterizer::from_bytes(font_name.clone(), &bytes)?;
        let chars = cli
            .chars
            .clone()
            .unwrap_or_else(|| (' '..='~').collect::<String>());
        input.root().add_character_set(
            Box::new(rasterizer),
            chars.chars().map(u32::from),
            cli.font_size,
        )?;
        info!(font = %font_name, size = cli.font_size, "added character set");
    }

    let mut ctx = GenerationContext::new();
    let atlas = AtlasGenerator::new(params).generate(input, &mut ctx)?;
    if !ctx.skipped().is_empty() {
        warn!(count = ctx.skipped().len(), "some entries were skipped");
    }

    let stats = atlas.stats();
    info!(
        pages = stats.num_pages,
        rects = stats.num_rects,
        format = %atlas.pixel_format(),
        occupancy = %format!("{:.2}%", stats.occupancy * 100.0),
        "stats"
    );

    if !cli.dry_run {
        fs::create_dir_all(&cli.out_dir)
            .with_context(|| format!("create out_dir {}", cli.out_dir.display()))?;
        let index_path = cli.out_dir.join(format!("{}.json", cli.name));
        atlas
            .save_atlas(&index_path)
            .with_context(|| format!("write atlas {}", index_path.display()))?;
        info!(?index_path, pages = atlas.page_count(), "atlas written");
    }

    if let Some(stats_path) = &cli.export_stats {
        fs::write(stats_path, serde_json::to_string_pretty(&stats)?)
            .with_context(|| format!("write {}", stats_path.display()))?;
    }
    Ok(())
}

fn run_inspect(args: &InspectArgs) -> anyhow::Result<()> {
    let atlas: Atlas = load_atlas(&args.index)
        .with_context(|| format!("load atlas {}", args.index.display()))?;
    println!(
        "{}x{} pages, padding {}, format {}",
        atlas.atlas_width(),
        atlas.atlas_height(),
        atlas.padding(),
        atlas.pixel_format()
    );
    println!("{}", atlas.stats().summary());
    print_folder(&atlas, FolderId::ROOT, 0, args.entries);
    Ok(())
}

fn print_folder(atlas: &Atlas, id: FolderId, depth: usize, entries: bool) {
    let Some(folder) = atlas.folder_by_id(id) else {
        return;
    };
    let indent = "  ".repeat(depth);
    let name = if folder.parent.is_none() { "/" } else { folder.name.as_str() };
    match folder.tag {
        Some(tag) => println!("{}{} [tag {}]", indent, name, tag),
        None => println!("{}{}", indent, name),
    }
    if entries {
        for b in &folder.bitmaps {
            let l = &b.layout;
            let anim = match b.animation_info() {
                Some(a) => format!(" ({} frames @ {}s)", a.frame_count, a.frame_duration),
                None => String::new(),
            };
            println!(
                "{}  - {} page {} at {},{} {}x{}{}",
                indent, b.name, l.page_index, l.x, l.y, l.width, l.height, anim
            );
        }
        for c in &folder.character_sets {
            println!(
                "{}  - font {} ({} glyphs, line height {})",
                indent,
                c.font_name,
                c.len(),
                c.line_height
            );
        }
    }
    for &child in &folder.children {
        print_folder(atlas, child, depth + 1, entries);
    }
}

fn run_convert(args: &ConvertArgs) -> anyhow::Result<()> {
    let atlas: Atlas = load_atlas(&args.index)
        .with_context(|| format!("load atlas {}", args.index.display()))?;
    if args.texture_array {
        let array: TextureArrayAtlas = atlas.clone().into_storage()?;
        info!(depth = array.storage().depth(), "pages packed into a texture array");
        array
            .save_atlas(&args.out)
            .with_context(|| format!("write atlas {}", args.out.display()))?;
    } else {
        atlas
            .save_atlas(&args.out)
            .with_context(|| format!("write atlas {}", args.out.display()))?;
    }
    info!(out = ?args.out, pages = atlas.page_count(), "atlas converted");

    if args.verify {
        let reloaded: Atlas = load_atlas(&args.out)
            .with_context(|| format!("reload atlas {}", args.out.display()))?;
        if reloaded != atlas {
            anyhow::bail!("{} does not match {}", args.out.display(), args.index.display());
        }
        info!("round-trip verified");
    }
    Ok(())
}

fn gather_paths(
    path: &Path,
    include: &[String],
    exclude: &[String],
) -> anyhow::Result<Vec<PathBuf>> {
    // Build glob matchers
    let mut inc_set = None;
    if !include.is_empty() {
        let mut b = GlobSetBuilder::new();
        for pat in include {
            b.add(Glob::new(pat)?);
        }
        inc_set = Some(b.build()?);
    }
    let mut exc_set = None;
    if !exclude.is_empty() {
        let mut b = GlobSetBuilder::new();
        for pat in exclude {
            b.add(Glob::new(pat)?);
        }
        exc_set = Some(b.build()?);
    }
    if !path.is_dir() {
        anyhow::bail!("input {} is not a directory", path.display());
    }
    let mut list: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let p = entry.path();
        if p.is_file() && !should_skip(p, inc_set.as_ref(), exc_set.as_ref()) && is_image(p) {
            list.push(p.to_path_buf());
        }
    }
    Ok(list)
}

fn should_skip(
    p: &Path,
    include: Option<&globset::GlobSet>,
    exclude: Option<&globset::GlobSet>,
) -> bool {
    let s = p.to_string_lossy().replace('\\', "/");
    if let Some(ex) = exclude {
        if ex.is_match(&s) {
            return true;
        }
    }
    if let Some(inc) = include {
        if !inc.is_match(&s) {
            return true;
        }
    }
    false
}

fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_ascii_lowercase()),
        Some(ext) if matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "bmp" | "tga" | "gif" | "exr")
    )
}

fn file_stem(p: &Path) -> String {
    p.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Decodes every image and adds it to `input` under the folder matching its directory.
/// Returns the number of bitmaps added.
fn load_images_with_progress(
    root: &Path,
    paths: &[PathBuf],
    input: &mut AtlasInput,
    progress: bool,
) -> anyhow::Result<usize> {
    use indicatif::{ProgressBar, ProgressStyle};
    let bar = if progress {
        let b = ProgressBar::new(paths.len() as u64);
        b.set_style(ProgressStyle::with_template(
            "{spinner:.green} loading {pos}/{len} [{elapsed_precise}] {wide_msg}",
        )?);
        Some(b)
    } else {
        None
    };
    let mut added = 0;
    for p in paths {
        let msg = p.file_name().and_then(|s| s.to_str()).unwrap_or("");
        if let Some(b) = &bar {
            b.set_message(msg.to_string());
        }
        match add_image(root, p, input) {
            Ok(()) => added += 1,
            Err(e) => {
                error!(?p, error = %e, "skip image");
            }
        }
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    Ok(added)
}

fn add_image(root: &Path, p: &Path, input: &mut AtlasInput) -> anyhow::Result<()> {
    let sidecar = read_sidecar(p)?;
    let folder = folder_for(root, p, input)?;
    let mut handle = input
        .folder(folder)
        .with_context(|| format!("missing folder for {}", p.display()))?;
    let name = file_stem(p);

    let pixels = if is_gif(p) {
        let (mut frames, delay) = load_gif_frames(p)?;
        if frames.len() > 1 {
            if sidecar.frame_count.is_some() {
                warn!(?p, "animated GIF: sidecar grid settings ignored");
            }
            let duration = sidecar.frame_duration.or(delay).unwrap_or(0.1);
            handle.add_frame_animation(frames, &name, sidecar.tag, duration)?;
            return Ok(());
        }
        frames
            .pop()
            .with_context(|| format!("{} has no frames", p.display()))?
    } else {
        PixelBuffer::from_image(&load_image(p)?)
    };
    match sidecar.animation() {
        Some(grid) => handle.add_animated_bitmap(pixels, &name, sidecar.tag, grid)?,
        None => handle.add_bitmap(pixels, &name, sidecar.tag)?,
    };
    Ok(())
}

fn is_gif(p: &Path) -> bool {
    p.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gif"))
}

/// Decodes every frame of a GIF. Also returns the first frame's delay in seconds, if set.
fn load_gif_frames(p: &Path) -> anyhow::Result<(Vec<PixelBuffer>, Option<f32>)> {
    let file = File::open(p).with_context(|| format!("open {}", p.display()))?;
    let decoder = GifDecoder::new(BufReader::new(file))?;
    let frames = decoder.into_frames().collect_frames()?;
    let delay = frames.first().and_then(|f| {
        let (numer, denom) = f.delay().numer_denom_ms();
        (numer > 0 && denom > 0).then(|| numer as f32 / denom as f32 / 1000.0)
    });
    let buffers = frames
        .into_iter()
        .map(|f| PixelBuffer::from_image(&DynamicImage::ImageRgba8(f.into_buffer())))
        .collect();
    Ok((buffers, delay))
}

/// Creates (or finds) the folder chain for the directories between `root` and `p`.
fn folder_for(root: &Path, p: &Path, input: &mut AtlasInput) -> anyhow::Result<FolderId> {
    let rel = p.strip_prefix(root).unwrap_or(p);
    let mut id = FolderId::ROOT;
    if let Some(dir) = rel.parent() {
        for comp in dir.components() {
            let name = comp.as_os_str().to_string_lossy();
            id = input
                .folder(id)
                .with_context(|| format!("missing folder for {}", p.display()))?
                .add_folder(&name, None)?
                .id();
        }
    }
    Ok(id)
}

fn read_sidecar(p: &Path) -> anyhow::Result<Sidecar> {
    let path = p.with_extension("json");
    if !path.is_file() {
        return Ok(Sidecar::default());
    }
    let text = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))
}

fn load_image(p: &Path) -> anyhow::Result<DynamicImage> {
    let img = ImageReader::open(p)?.with_guessed_format()?.decode()?;
    Ok(img)
}

fn parse_pixel_format(s: &str) -> anyhow::Result<PixelFormat> {
    Ok(match s.to_ascii_lowercase().as_str() {
        "gray" => PixelFormat::GRAY,
        "rgb" => PixelFormat::RGB,
        "rgba" => PixelFormat::RGBA,
        "gray_float" => PixelFormat::GRAY_FLOAT,
        "rgb_float" => PixelFormat::RGB_FLOAT,
        "rgba_float" => PixelFormat::RGBA_FLOAT,
        other => anyhow::bail!("unknown pixel format: {}", other),
    })
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}

#[derive(Debug, Deserialize, Default)]
struct YamlConfig {
    atlas_width: Option<u32>,
    atlas_height: Option<u32>,
    padding: Option<u32>,
    pixel_format: Option<String>,
    upgrade_pixel_format: Option<bool>,
    accept_luminance: Option<bool>,
    accept_float: Option<bool>,
}

impl YamlConfig {
    fn into_params(self, mut params: AtlasGeneratorParams) -> anyhow::Result<AtlasGeneratorParams> {
        if let Some(v) = self.atlas_width {
            params.atlas_width = v;
        }
        if let Some(v) = self.atlas_height {
            params.atlas_height = v;
        }
        if let Some(v) = self.padding {
            params.padding = v;
        }
        if let Some(v) = self.pixel_format {
            params.merge_params.forced_pixel_format = Some(parse_pixel_format(&v)?);
        }
        if let Some(v) = self.upgrade_pixel_format {
            params.merge_params.upgrade_pixel_format = v;
        }
        if let Some(v) = self.accept_luminance {
            params.merge_params.accept_luminance = v;
        }
        if let Some(v) = self.accept_float {
            params.merge_params.accept_float = v;
        }
        Ok(params)
    }
}

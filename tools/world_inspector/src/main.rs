use std::env;
use std::path::PathBuf;

use glam::{IVec3, Vec3};
use tracing::info;
use voxlands_shared::{BlockType, ChunkPos, DrawStats, VoxelConfig, World};

const USAGE: &str =
    "Usage: world_inspector [--config <path>] [--at <x> <z>] [--radius <n>] [--dump-config]";

struct Options {
    config_path: Option<PathBuf>,
    at: (f32, f32),
    radius: Option<i32>,
    dump_config: bool,
}

fn main() {
    let _ = tracing_subscriber::fmt().with_target(false).try_init();

    let options = match parse_args(env::args().skip(1)) {
        Ok(Some(options)) => options,
        Ok(None) => {
            println!("{USAGE}");
            return;
        }
        Err(err) => {
            eprintln!("{err}");
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    };

    if let Err(err) = run(options) {
        eprintln!("world_inspector error: {err}");
        std::process::exit(1);
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Option<Options>, String> {
    let mut options = Options {
        config_path: None,
        at: (0.0, 0.0),
        radius: None,
        dump_config: false,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let value = args.next().ok_or("--config expects a path argument")?;
                options.config_path = Some(PathBuf::from(value));
            }
            "--at" => {
                let x = parse_number::<f32>(args.next(), "--at")?;
                let z = parse_number::<f32>(args.next(), "--at")?;
                options.at = (x, z);
            }
            "--radius" => {
                options.radius = Some(parse_number::<i32>(args.next(), "--radius")?);
            }
            "--dump-config" => options.dump_config = true,
            "--help" | "-h" => return Ok(None),
            other => return Err(format!("unknown argument: {other}")),
        }
    }

    Ok(Some(options))
}

fn parse_number<T>(value: Option<String>, flag: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let value = value.ok_or_else(|| format!("{flag} expects a numeric argument"))?;
    value
        .parse::<T>()
        .map_err(|err| format!("invalid {flag} value '{value}': {err}"))
}

fn run(options: Options) -> Result<(), String> {
    let mut config = match &options.config_path {
        Some(path) => VoxelConfig::load(path).map_err(|err| err.to_string())?,
        None => VoxelConfig::default(),
    };
    if let Some(radius) = options.radius {
        config.world.chunks_around_player = radius;
    }
    let config = config.sanitize();

    if options.dump_config {
        print!("{}", config.to_toml_string().map_err(|err| err.to_string())?);
        return Ok(());
    }

    let mut world = World::new(&config);
    let (x, z) = options.at;
    let update = world.set_player_position(Vec3::new(x, 0.0, z));
    info!(
        "generated {} chunks, remeshed {} neighbours",
        update.generated, update.remeshed
    );

    let mut stats = DrawStats::default();
    world.draw(&mut stats);

    let dims = world.dims();
    let player_block = IVec3::new(x.floor() as i32, 0, z.floor() as i32);
    let (center, _) = dims.world_to_chunk(player_block);
    println!(
        "World: {} x {} chunks of {} x {} x {}",
        world.grid_size(),
        world.grid_size(),
        dims.width,
        dims.height,
        dims.width
    );
    println!("Player chunk: ({}, {})", center.x, center.z);
    println!("Generated chunks: {}", update.generated);
    println!(
        "Solid pass: {} chunks, {} triangles",
        stats.solid_chunks, stats.solid_triangles
    );
    println!(
        "Water pass: {} chunks, {} triangles",
        stats.water_chunks, stats.water_triangles
    );

    let center_chunk = ChunkPos::new(center.x, center.z);
    if !world.chunk(center_chunk).is_some_and(|chunk| chunk.is_generated()) {
        return Err(format!(
            "player chunk ({}, {}) is outside the {}x{} grid",
            center.x,
            center.z,
            world.grid_size(),
            world.grid_size()
        ));
    }

    println!();
    print_heightmap(&world, center_chunk);
    println!();
    edit_demo(&mut world, player_block);
    Ok(())
}

fn surface(world: &World, x: i32, z: i32) -> Option<(i32, BlockType)> {
    (0..world.dims().height as i32).rev().find_map(|y| {
        world
            .block_at(IVec3::new(x, y, z))
            .filter(|block| !block.is_air())
            .map(|block| (y, block))
    })
}

fn print_heightmap(world: &World, chunk_pos: ChunkPos) {
    let dims = world.dims();
    let origin = dims.chunk_origin(chunk_pos);
    let height = dims.height as i32;

    println!(
        "Surface of chunk ({}, {}): ~ water, T oak, * leaves, 0-9 ground height",
        chunk_pos.x, chunk_pos.z
    );
    for lz in 0..dims.width as i32 {
        let row: String = (0..dims.width as i32)
            .map(|lx| match surface(world, origin.x + lx, origin.z + lz) {
                Some((_, BlockType::Water)) => '~',
                Some((_, BlockType::Oak)) => 'T',
                Some((_, BlockType::OakLeaves)) => '*',
                Some((y, _)) => char::from_digit((y * 10 / height).clamp(0, 9) as u32, 10)
                    .unwrap_or('?'),
                None => ' ',
            })
            .collect();
        println!("  {row}");
    }
}

fn edit_demo(world: &mut World, column: IVec3) {
    let Some((ground, block)) = surface(world, column.x, column.z) else {
        println!("Edit demo: column ({}, {}) is empty", column.x, column.z);
        return;
    };

    let eye = Vec3::new(column.x as f32 + 0.5, ground as f32 + 3.5, column.z as f32 + 0.5);
    println!(
        "Edit demo at ({}, {}, {}) on {}",
        column.x,
        ground,
        column.z,
        block.name()
    );

    let removed = world.remove_block_along(eye, Vec3::NEG_Y);
    println!("  remove looking down: {removed}");
    let placed = world.place_block_along(eye, Vec3::NEG_Y);
    println!(
        "  place {} looking down: {placed}",
        world.settings().place_block.name()
    );
    if let Some((y, block)) = surface(world, column.x, column.z) {
        println!("  column top is now {} at y={y}", block.name());
    }
}

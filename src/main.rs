//! Graphics replay CLI - Inspect replay documents.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::path::PathBuf;
use std::time::Instant;

use gfx_replay::{
    replay::{Player, Recorder, ReplayError, encode_document, read_log_from_document},
    scene::{LayerId, SceneGraph},
    schema::{AssetInfo, PlayerConfig, Quat, RecorderConfig, ReplayConfig, Transform, Vec3},
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <replay.json> [index]", args[0]);
        eprintln!();
        eprintln!("Summarize a replay document and print the scene at one keyframe.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  replay.json  Path to replay document (JSON or LZ4-wrapped)");
        eprintln!("  index        Keyframe to reconstruct (default: last)");
        eprintln!();
        eprintln!("Example config and document are generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example();
        return;
    }

    let path = PathBuf::from(&args[1]);

    let start = Instant::now();
    let doc = read_log_from_document(&path).unwrap_or_else(|e| {
        eprintln!("Error reading replay: {}", e);
        std::process::exit(1);
    });
    let load_time = start.elapsed();

    let summary = doc.keyframes.summary();
    println!("Replay: {}", path.display());
    println!("==========");
    println!("Format version: {}", doc.version);
    if let Some(rate) = doc.metadata.frame_rate {
        println!("Frame rate: {} keyframes/s", rate);
    }
    if let Some(generator) = &doc.metadata.generator {
        println!("Generator: {}", generator);
    }
    println!("Keyframes: {} ({} empty)", summary.keyframes, summary.empty_keyframes);
    println!("Asset loads: {}", summary.loads);
    println!("Creations: {}", summary.creations);
    println!("Deletions: {}", summary.deletions);
    println!("State updates: {}", summary.state_updates);
    if !summary.user_transform_names.is_empty() {
        let names: Vec<_> = summary.user_transform_names.iter().map(String::as_str).collect();
        println!("User transforms: {}", names.join(", "));
    }
    println!("Loaded in {:.2}ms", load_time.as_secs_f64() * 1000.0);
    println!();

    if summary.keyframes == 0 {
        return;
    }

    let index: i64 = match args.get(2) {
        Some(s) => s.parse().unwrap_or_else(|e| {
            eprintln!("Error parsing index '{}': {}", s, e);
            std::process::exit(1);
        }),
        None => summary.keyframes as i64 - 1,
    };

    let mut player = Player::new(LayerId(0), PlayerConfig::default());
    if let Err(e) = player.load_document(doc).and_then(|()| player.seek(index)) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    println!("Scene at keyframe {}:", index);
    println!("  Instances: {}", player.num_instances());
    for (id, instance) in player.instances() {
        let asset = player
            .log()
            .creation(instance.origin)
            .map(|c| c.asset.as_str())
            .unwrap_or("?");
        let t = instance.transform.translation;
        print!("  {:>6}  {}  at ({:.3}, {:.3}, {:.3})", id.0, asset, t.x, t.y, t.z);
        if let Some(semantic_id) = instance.semantic_id {
            print!("  semantic {}", semantic_id);
        }
        println!();
    }
    for name in player.user_transform_names() {
        if let Some(t) = player.get_user_transform(name) {
            let p = t.translation;
            println!("  user '{}' at ({:.3}, {:.3}, {:.3})", name, p.x, p.y, p.z);
        }
    }
}

fn print_example() {
    let config = ReplayConfig {
        enable_save: true,
        recorder: RecorderConfig {
            frame_rate: Some(60.0),
            ..Default::default()
        },
        ..Default::default()
    };

    let document = example_document(&config.recorder).unwrap_or_else(|e| {
        eprintln!("Error building example replay: {}", e);
        std::process::exit(1);
    });
    let config_json = serde_json::to_string_pretty(&config).unwrap_or_else(|e| {
        eprintln!("Error serializing config: {}", e);
        std::process::exit(1);
    });

    println!("Example configuration (replay_config.json):");
    println!("{}", config_json);
    println!();
    println!("Example replay document (replay.json):");
    println!("{}", document);
}

/// Three ticks: a box appears, turns, and is removed.
fn example_document(config: &RecorderConfig) -> Result<String, ReplayError> {
    let mut scene = SceneGraph::new();
    let mut recorder = Recorder::new(config.clone());
    let agent = scene.add_node(Transform::from_translation(Vec3::new(0.0, 1.5, 0.0)));
    let node = scene.add_render_instance(
        AssetInfo::from_path("objects/transform_box.glb"),
        Transform::from_translation(Vec3::new(1.0, 0.0, 0.0)),
    );

    recorder.add_node_user_transform(&scene, "agent", agent)?;
    recorder.save_keyframe(&scene)?;

    let turned = Transform::new(
        Vec3::new(1.0, 0.0, 0.0),
        Quat::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), std::f32::consts::FRAC_PI_2),
    );
    scene.set_transform(node, turned)?;
    recorder.save_keyframe(&scene)?;

    scene.remove(node)?;
    recorder.save_keyframe(&scene)?;

    encode_document(recorder.log(), &recorder.metadata())
}

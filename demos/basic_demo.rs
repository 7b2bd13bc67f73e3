//! Basic demonstration of the Skirmish simulation.
//!
//! Loads the prefabs shipped in `prefabs/`, spawns an orc warband around a
//! knight, runs the real-time loop on its own thread for a few seconds and
//! prints the final state.
//!
//! Run with: cargo run --example basic_demo

use skirmish_sim::{
    logging, schedule_save, ComponentBlueprint, EntityBuilder, GameLoop, Identity, SimConfig,
    SimWorld,
};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    logging::init(std::env::args().any(|arg| arg == "--verbose"));

    let config = SimConfig {
        prefab_dir: Some(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("prefabs")),
        ..SimConfig::default()
    };
    let mut sim = SimWorld::with_config(config)?;

    EntityBuilder::from_template("knight").at(0.0, 0.0).spawn(&mut sim)?;
    for i in 0..4 {
        let angle = i as f32 * std::f32::consts::FRAC_PI_2;
        EntityBuilder::from_template("orc")
            .with(ComponentBlueprint::Identity(Identity::new(format!("orc-{i}"))))
            .at(8.0 * angle.cos(), 8.0 * angle.sin())
            .spawn(&mut sim)?;
    }

    println!("=== Skirmish - Simulation Demo ===\n");
    println!("Initial state:\n{}\n", sim.snapshot().to_json_pretty()?);

    let queue = sim.commands();
    let (handle, thread) = GameLoop::new(sim).spawn()?;

    thread::sleep(Duration::from_secs(3));
    let save_path = std::env::temp_dir().join("skirmish_demo_save.json");
    schedule_save(&queue, &save_path);
    thread::sleep(Duration::from_millis(100));
    handle.stop();

    let Ok(mut sim) = thread.join() else {
        anyhow::bail!("simulation thread panicked");
    };

    println!(
        "=== Final State after {} ticks ({:.2}s) ===\n",
        sim.current_tick(),
        sim.current_time()
    );
    println!("{}", sim.snapshot().to_json_pretty()?);
    println!("\nPersistent entities saved to {}", save_path.display());
    Ok(())
}

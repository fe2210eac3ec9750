//! Example walking through configuration, automation and response queries
//!
//! Run with: cargo run --package basic-eq-core --example eq_demo

use basic_eq_core::domain::{
    gain_to_db, ChainSettings, EqualizerConfig, EqualizerEngine, ParameterId, SharedParameters, Slope,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("basic_eq_core=debug,info")
        .init();

    println!("=== {} Demo ===\n", EqualizerEngine::NAME);

    // 1. Build a configuration
    println!("1. Creating configuration...");
    let config = EqualizerConfig {
        settings: ChainSettings {
            low_cut_frequency: 80.0,
            low_cut_slope: Slope::Db24,
            peak_frequency: 2500.0,
            peak_gain_db: 4.0,
            peak_quality: 1.4,
            ..ChainSettings::default()
        },
        ..EqualizerConfig::default()
    };
    println!(
        "   ✓ {} Hz, {} block, {:?}",
        config.engine.sample_rate, config.engine.max_block_size, config.engine.channels
    );

    // 2. Save and reload it
    println!("\n2. Saving and reloading configuration...");
    let config_path = "demo_eq.toml";
    config.save_to_file(config_path).await?;
    let loaded = EqualizerConfig::load_from_file(config_path).await?;
    println!("   ✓ Round trip intact: {}", loaded == config);

    // 3. Parameter layout
    println!("\n3. Parameter layout:");
    for param in ParameterId::ALL {
        let range = param.range();
        println!(
            "   - {:<14} [{} .. {}] default {}",
            param.id(),
            range.min,
            range.max,
            param.default_value()
        );
    }

    // 4. Prepare the engine and query the response
    println!("\n4. Magnitude response:");
    let mut engine = EqualizerEngine::with_settings(loaded.settings);
    engine.prepare_with_config(&loaded.engine)?;
    for frequency in [30.0, 80.0, 250.0, 1000.0, 2500.0, 8000.0, 16000.0] {
        if let Some(magnitude) = engine.magnitude_for_frequency(frequency) {
            println!("   {:>7} Hz: {:+6.2} dB", frequency, gain_to_db(magnitude));
        }
    }

    // 5. Automate from the control side, one update per block
    println!("\n5. Automating the peak gain...");
    let store = SharedParameters::from_settings(engine.settings());
    let mut controller = engine.controller();
    let block_size = loaded.engine.max_block_size;
    let mut left = vec![0.0f32; block_size];
    let mut right = vec![0.0f32; block_size];
    for step in 0..8 {
        store.set(ParameterId::PeakGain, -8.0 + 2.0 * step as f32);
        let changed = controller.update_if_changed(&store.chain_settings());
        engine.process(&mut [&mut left[..], &mut right[..]]);
        println!(
            "   block {}: gain {:+.1} dB, redesigned: {}",
            step,
            engine.settings().peak_gain_db,
            changed
        );
    }
    println!(
        "   ✓ {} designs on the control side, {} in the engine",
        controller.designs(),
        engine.coefficient_updates()
    );

    println!("\n=== Demo Complete ===");

    // Cleanup
    std::fs::remove_file(config_path)?;

    Ok(())
}

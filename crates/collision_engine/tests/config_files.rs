//! Loading collision settings from disk

use std::path::PathBuf;

use collision_engine::config::ConfigFormat;
use collision_engine::prelude::*;

fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("collision_engine_{}_{name}", std::process::id()))
}

#[test]
fn toml_overrides_keep_unlisted_defaults() {
    let path = scratch_path("collision.toml");
    std::fs::write(
        &path,
        "max_precise_per_model = 8\n\n[grid]\ncell_size = 4.0\n\n[prediction]\nlifetime_frames = 2\n",
    )
    .unwrap();

    let config = CollisionConfig::load_from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(config.max_precise_per_model, 8);
    assert_eq!(config.grid.cell_size, 4.0);
    assert_eq!(config.prediction.lifetime_frames, 2);
    assert_eq!(config.prediction.max_entries, 1000);

    let manager = CollisionManager::new(config).unwrap();
    assert_eq!(manager.spatial_grid().cell_size(), 4.0);
}

#[test]
fn model_table_round_trips_through_ron_file() {
    let path = scratch_path("models.ron");
    let table = ModelConfigTable::new()
        .with_model("grass", ModelCollisionConfig::disabled())
        .with_model("cliff", ModelCollisionConfig::with_precision(CollisionPrecision::Precise));

    table.save_to_file(&path).unwrap();
    let loaded = ModelConfigTable::load_from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert!(!loaded.get("grass").unwrap().has_collision);
    assert_eq!(loaded.needs_precise("cliff"), Some(true));
    assert_eq!(loaded.needs_precise("rock"), None);
}

#[test]
fn invalid_values_rejected_by_manager() {
    let config = CollisionConfig::from_str_with_format("[grid]\ncell_size = -1.0\n", ConfigFormat::Toml).unwrap();
    assert!(matches!(CollisionManager::new(config), Err(ConfigError::Invalid(_))));
}

#[test]
fn unknown_extension_is_reported() {
    let err = CollisionConfig::load_from_file(scratch_path("collision.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat(_)));

    let err = CollisionConfig::default().save_to_file(scratch_path("collision.json")).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
}

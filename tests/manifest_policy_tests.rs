#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Manifest policy tests.
//!
//! Keeps the panic-free lint set, the feature layout, and the demo targets in
//! Cargo.toml from drifting. All checks are synchronous filesystem reads.

use std::path::PathBuf;

use toml::Table;

fn project_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn manifest() -> Table {
    let path = project_root().join("Cargo.toml");
    let contents = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read '{}': {e}", path.display()));
    contents.parse::<Table>().expect("Cargo.toml must be valid TOML")
}

mod panic_policy {
    use super::*;

    const REQUIRED_DENY_LINTS: &[&str] = &[
        "unwrap_used",
        "expect_used",
        "panic",
        "todo",
        "unimplemented",
        "indexing_slicing",
    ];

    #[test]
    fn library_denies_panic_prone_lints() {
        let manifest = manifest();
        let clippy = manifest
            .get("lints")
            .and_then(|l| l.get("clippy"))
            .and_then(|c| c.as_table())
            .expect("Cargo.toml is missing [lints.clippy]");

        for lint in REQUIRED_DENY_LINTS {
            assert_eq!(
                clippy.get(*lint).and_then(|v| v.as_str()),
                Some("deny"),
                "[lints.clippy] must set `{lint} = \"deny\"` so library code stays panic-free"
            );
        }
    }
}

mod feature_policy {
    use super::*;

    #[test]
    fn websocket_bridge_is_default_and_optional() {
        let manifest = manifest();
        let features = manifest["features"].as_table().unwrap();

        let default: Vec<&str> = features["default"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(default, vec!["transport-websocket"]);

        let deps = manifest["dependencies"].as_table().unwrap();
        for name in ["tokio-tungstenite", "futures-util"] {
            assert_eq!(
                deps[name].get("optional").and_then(|v| v.as_bool()),
                Some(true),
                "`{name}` must stay optional behind transport-websocket"
            );
        }
    }

    #[test]
    fn core_tokio_features_cover_the_packet_loop() {
        let manifest = manifest();
        let tokio_features: Vec<&str> = manifest["dependencies"]["tokio"]["features"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        for needed in ["sync", "macros", "rt", "time"] {
            assert!(
                tokio_features.contains(&needed),
                "tokio feature `{needed}` is required by the packet loop"
            );
        }
    }
}

mod demo_policy {
    use super::*;

    #[test]
    fn every_declared_demo_exists() {
        let manifest = manifest();
        let demos = manifest["example"].as_array().unwrap();
        assert!(!demos.is_empty());
        for demo in demos {
            let path = demo["path"].as_str().unwrap();
            assert!(
                project_root().join(path).is_file(),
                "demo target '{path}' is declared in Cargo.toml but missing"
            );
        }
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Helpers shared by commands.

use anyhow::Context;
use std::path::Path;
use verdant_graph::SerializedGraph;

/// Read a persisted graph; the encoding follows the file extension
/// (`.json`, `.bin`, anything else is RON)
pub fn read_graph(path: &Path) -> anyhow::Result<SerializedGraph> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let graph = match extension.as_str() {
        "bin" => {
            let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
            SerializedGraph::from_bytes(&bytes)?
        }
        "json" => SerializedGraph::from_json(&read_text(path)?)?,
        _ => SerializedGraph::from_ron(&read_text(path)?)?,
    };
    tracing::debug!("Read {:?} graph '{}' with {} blocks", graph.kind, graph.name, graph.blocks.len());
    Ok(graph)
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// File stem used to name generated outputs
pub fn output_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "graph".to_string())
}

/// Format a byte count for display
pub fn format_bytes(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdant_graph::{GraphKind, NodeGeometry};

    #[test]
    fn test_read_graph_by_extension() {
        let graph = NodeGeometry::new("cube").to_serialized();
        let dir = std::env::temp_dir();
        let stem = format!("verdant-cli-{}", std::process::id());

        let ron_path = dir.join(format!("{stem}.ron"));
        std::fs::write(&ron_path, graph.to_ron().unwrap()).unwrap();
        let json_path = dir.join(format!("{stem}.json"));
        std::fs::write(&json_path, graph.to_json().unwrap()).unwrap();
        let bin_path = dir.join(format!("{stem}.bin"));
        std::fs::write(&bin_path, graph.to_bytes().unwrap()).unwrap();

        for path in [&ron_path, &json_path, &bin_path] {
            let read = read_graph(path).unwrap();
            std::fs::remove_file(path).unwrap();
            assert_eq!(read.kind, GraphKind::Geometry);
            assert_eq!(read, graph);
        }
    }

    #[test]
    fn test_output_stem_and_bytes() {
        assert_eq!(output_stem(Path::new("materials/brick.ron")), "brick");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
    }
}

//! Standalone concept-map document.
//!
//! Renders a [`SemanticMap`] into a single HTML file that loads the graph renderer from
//! the configured script/style locations and embeds the node and edge data as JSON.
//! The page offers fit-to-view and a physics toggle; physics switches itself off once
//! the layout has stabilized.

use std::path::{Path, PathBuf};

use minijinja::{Environment, context};
use tracing::info;

use crate::config::RepasoConfig;
use crate::error::StudyError;
use crate::models::SemanticMap;

/// File name used when no output path is given.
pub const DEFAULT_MAP_FILE: &str = "mapa_conceptual_interactivo.html";

const MAP_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="es">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{{ title|e }}</title>
  <script type="text/javascript" src="{{ script_url }}"></script>
  <link href="{{ style_url }}" rel="stylesheet" type="text/css">
  <style>
    html, body { margin: 0; height: 100%; font-family: sans-serif; background: #f8fafc; }
    #controls { position: absolute; top: 12px; left: 12px; z-index: 10; display: flex; gap: 8px; }
    #controls button { padding: 6px 12px; border: 1px solid #94a3b8; border-radius: 6px; background: #fff; cursor: pointer; }
    #map { width: 100%; height: 100%; }
  </style>
</head>
<body>
  <!-- {{ generated_at }} -->
  <div id="controls">
    <button id="fit">Ajustar a la vista</button>
    <button id="physics">Desactivar física</button>
  </div>
  <div id="map"></div>
  <script type="text/javascript">
    const nodes = new vis.DataSet({{ nodes|tojson }});
    const edges = new vis.DataSet({{ edges|tojson }});
    const container = document.getElementById("map");
    const options = {
      nodes: { shape: "box", margin: 10, font: { size: 16 } },
      edges: { arrows: { to: { enabled: true, scaleFactor: 0.6 } }, font: { align: "middle" }, smooth: true },
      physics: { enabled: true, stabilization: { iterations: 250 } },
      interaction: { hover: true, navigationButtons: true, keyboard: true }
    };
    const network = new vis.Network(container, { nodes, edges }, options);
    const physicsButton = document.getElementById("physics");
    let physicsEnabled = true;

    function setPhysics(enabled) {
      physicsEnabled = enabled;
      network.setOptions({ physics: { enabled } });
      physicsButton.textContent = enabled ? "Desactivar física" : "Activar física";
    }

    network.once("stabilizationIterationsDone", () => setPhysics(false));
    physicsButton.addEventListener("click", () => setPhysics(!physicsEnabled));
    document.getElementById("fit").addEventListener("click", () => network.fit({ animation: true }));
  </script>
</body>
</html>
"##;

/// Renders the HTML document for `map`.
pub fn render_map_html(
    map: &SemanticMap,
    config: &RepasoConfig,
    title: &str,
) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template("mapa", MAP_TEMPLATE)?;
    let template = env.get_template("mapa")?;
    template.render(context! {
        title => title,
        script_url => config.graph_script_url.as_str(),
        style_url => config.graph_style_url.as_str(),
        generated_at => chrono::Local::now().to_rfc3339(),
        nodes => &map.nodes,
        edges => &map.edges,
    })
}

/// Writes the document to `path` (or [`DEFAULT_MAP_FILE`]) and returns where it went.
pub async fn export_map_html(
    map: &SemanticMap,
    config: &RepasoConfig,
    title: &str,
    path: Option<&Path>,
) -> Result<PathBuf, StudyError> {
    let html = render_map_html(map, config, title)
        .map_err(|e| StudyError::InvalidData(e.to_string()))?;
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MAP_FILE));
    tokio::fs::write(&path, html).await?;
    info!("Concept map exported to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MapEdge, MapNode, NodeId};

    fn sample_map() -> SemanticMap {
        SemanticMap {
            nodes: vec![
                MapNode {
                    id: NodeId::Text("1".into()),
                    label: "Célula".into(),
                    title: Some("Unidad básica".into()),
                },
                MapNode {
                    id: NodeId::Text("2".into()),
                    label: "Núcleo".into(),
                    title: None,
                },
            ],
            edges: vec![MapEdge {
                from: NodeId::Text("1".into()),
                to: NodeId::Text("2".into()),
                label: Some("contiene".into()),
                arrows: Some("to".into()),
            }],
        }
    }

    #[test]
    fn test_html_embeds_data_and_controls() {
        let config = RepasoConfig::default();
        let html = render_map_html(&sample_map(), &config, "Mapa conceptual").unwrap();

        assert!(html.contains("<title>Mapa conceptual</title>"));
        assert!(html.contains(&config.graph_script_url));
        assert!(html.contains(&config.graph_style_url));
        assert!(html.contains("\"label\":\"Célula\""));
        assert!(html.contains("\"label\":\"contiene\""));
        assert!(html.contains("stabilizationIterationsDone"));
        assert!(html.contains("id=\"fit\""));
        assert!(html.contains("id=\"physics\""));
    }

    #[test]
    fn test_title_is_escaped() {
        let html =
            render_map_html(&sample_map(), &RepasoConfig::default(), "<b>Mapa</b>").unwrap();
        assert!(!html.contains("<title><b>"));
    }

    #[tokio::test]
    async fn test_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join(DEFAULT_MAP_FILE);
        let written = export_map_html(
            &sample_map(),
            &RepasoConfig::default(),
            "Mapa",
            Some(&target),
        )
        .await
        .unwrap();

        assert_eq!(written, target);
        let html = std::fs::read_to_string(&target).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Núcleo"));
    }
}

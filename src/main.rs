//! Road-Graph-Editor (Headless).
//!
//! Lädt eine GeoJSON-Karte, spielt optional eine Positions-Spur durch den
//! Way-Tracker ab und protokolliert Enter/Exit-Meldungen je Way-Gruppe.
//!
//! Aufruf: `road-graph-editor <karte.geojson> [--schema tags.toml]
//! [--options optionen.toml] [--track spur.json] [--out export.geojson]`

use anyhow::{Context, Result};
use clap::Parser;
use road_graph_editor::{EditorOptions, GraphEditor, LatLng, TagSchema};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Ein Punkt der Positions-Spur.
#[derive(Debug, Deserialize)]
struct TrackPoint {
    lat: f64,
    lng: f64,
    /// Zeitstempel relativ zum Start in Millisekunden
    t_ms: u64,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "road-graph-editor", version)]
struct CliArgs {
    /// GeoJSON-Karte (FeatureCollection)
    map: PathBuf,
    /// Tag-Schema als TOML
    #[arg(long)]
    schema: Option<PathBuf>,
    /// Editor-Optionen als TOML (Standard: neben der Programmdatei)
    #[arg(long)]
    options: Option<PathBuf>,
    /// Positions-Spur als JSON-Array aus `{lat, lng, t_ms}`
    #[arg(long)]
    track: Option<PathBuf>,
    /// Zielpfad für den GeoJSON-Export
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Logger initialisieren
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Road-Graph-Editor v{} startet...", env!("CARGO_PKG_VERSION"));

    let args = CliArgs::parse();

    let options_path = args.options.clone().unwrap_or_else(EditorOptions::config_path);
    let options = EditorOptions::load_from_file(&options_path);
    let schema = match &args.schema {
        Some(path) => TagSchema::load_from_file(path)?,
        None => TagSchema::new(),
    };

    let mut editor = GraphEditor::new(options, schema);
    editor.load_geojson_file(&args.map)?;
    register_presence_logging(&mut editor);

    if let Some(track) = &args.track {
        replay_track(&mut editor, track)?;
    }

    if let Some(out) = &args.out {
        editor.save_geojson_file(out)?;
    }

    editor.destroy();
    Ok(())
}

/// Registriert je Way-Gruppe einen protokollierenden Listener.
fn register_presence_logging(editor: &mut GraphEditor) {
    let group_key = editor.options().tracker_group_tag_key.clone();
    let groups: BTreeSet<String> = editor
        .store()
        .ways_iter()
        .filter_map(|way| way.tags.get(&group_key).map(|v| v.as_text()))
        .collect();

    for group in groups {
        editor.add_way_presence_listener(&group, |event| {
            if event.is_enter() {
                log::info!(
                    "[{}] Way {:?} betreten bei ({:.6}, {:.6})",
                    event.group,
                    event.way_id,
                    event.position.lat,
                    event.position.lng
                );
            } else {
                log::info!(
                    "[{}] Way {:?} verlassen bei ({:.6}, {:.6})",
                    event.group,
                    event.previous_way_id,
                    event.position.lat,
                    event.position.lng
                );
            }
        });
    }
}

fn replay_track(editor: &mut GraphEditor, path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Spur-Datei nicht lesbar: {}", path.display()))?;
    let points: Vec<TrackPoint> =
        serde_json::from_str(&text).context("Fehler beim Parsen der Spur-Datei")?;

    let start = Instant::now();
    let mut delivered = 0;
    for point in &points {
        let position = LatLng::try_new(point.lat, point.lng)
            .with_context(|| format!("Ungültiger Spur-Punkt bei t={} ms", point.t_ms))?;
        let now = start + Duration::from_millis(point.t_ms);
        delivered += editor.poll(now);
        editor.update_position(position, now);
    }
    delivered += editor.flush_way_presence();

    log::info!(
        "Spur abgespielt: {} Punkte, {} Way-Meldungen",
        points.len(),
        delivered
    );
    Ok(())
}

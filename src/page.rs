//! The page configuration returned by the fulfillment API: a tree of
//! categories, blocks, and columns whose leaves are tile definitions.
//! Field names follow the upstream proto-JSON (camelCase); everything is
//! defaulted so partially populated configs still deserialize.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TileType {
    Bar,
    Line,
    Map,
    Scatter,
    Ranking,
    DisasterEventMap,
    /// Anything this service does not draw (highlights, overviews, new
    /// upstream types). Tolerated in configs, skipped during the walk.
    #[default]
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SubjectPageConfig {
    pub metadata: PageMetadata,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PageMetadata {
    pub place_dcid: Vec<String>,
    /// Place type of the page's place mapped to the type of its children,
    /// e.g. `State` to `County`.
    pub contained_place_types: HashMap<String, String>,
    pub event_type_spec: HashMap<String, EventTypeSpec>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct EventTypeSpec {
    pub id: String,
    pub name: String,
    pub event_type_dcids: Vec<String>,
    pub color: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Category {
    pub title: String,
    pub stat_var_spec: HashMap<String, StatVarSpec>,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Block {
    pub title: String,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Column {
    pub tiles: Vec<TileConfig>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TileConfig {
    pub title: String,
    #[serde(rename = "type")]
    pub tile_type: TileType,
    pub stat_var_key: Vec<String>,
    pub comparison_places: Vec<String>,
    pub ranking_tile_spec: Option<RankingTileSpec>,
    pub disaster_event_map_tile_spec: Option<DisasterEventMapTileSpec>,
}

/// One statistical variable as charted: its dcid, display name, and the
/// optional denominator/unit/scaling triple that turns a raw count into a
/// per-capita or percentage reading.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct StatVarSpec {
    pub stat_var: String,
    pub name: String,
    pub denom: Option<String>,
    pub unit: Option<String>,
    pub scaling: Option<f64>,
}

impl StatVarSpec {
    /// Display name, falling back to the dcid when the config omits one.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.stat_var
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RankingTileSpec {
    pub show_highest: bool,
    pub show_lowest: bool,
    pub ranking_count: usize,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DisasterEventMapTileSpec {
    pub point_event_type_key: Vec<String>,
}

/// One renderable tile with its references resolved: stat var keys looked
/// up in the category map, event type keys in the page metadata.
#[derive(Debug, Clone)]
pub struct TileJob {
    pub tile: TileConfig,
    pub stat_vars: Vec<StatVarSpec>,
    pub event_specs: Vec<EventTypeSpec>,
}

/// Flattens the config tree into tile jobs in document order: categories,
/// then blocks, then columns, then tiles. Unsupported types and tiles
/// whose stat var keys all fail to resolve are dropped here, not later.
pub fn collect_tiles(config: &SubjectPageConfig) -> Vec<TileJob> {
    let mut jobs = Vec::new();
    for category in &config.categories {
        for block in &category.blocks {
            for column in &block.columns {
                for tile in &column.tiles {
                    if tile.tile_type == TileType::Unsupported {
                        tracing::debug!(title = %tile.title, "skipping unsupported tile type");
                        continue;
                    }
                    let stat_vars: Vec<StatVarSpec> = tile
                        .stat_var_key
                        .iter()
                        .filter_map(|key| category.stat_var_spec.get(key).cloned())
                        .collect();
                    if stat_vars.is_empty() && tile.tile_type != TileType::DisasterEventMap {
                        tracing::debug!(title = %tile.title, "skipping tile with no resolvable stat vars");
                        continue;
                    }
                    let event_specs: Vec<EventTypeSpec> = tile
                        .disaster_event_map_tile_spec
                        .as_ref()
                        .map(|spec| {
                            spec.point_event_type_key
                                .iter()
                                .filter_map(|key| config.metadata.event_type_spec.get(key).cloned())
                                .collect()
                        })
                        .unwrap_or_default();
                    jobs.push(TileJob {
                        tile: tile.clone(),
                        stat_vars,
                        event_specs,
                    });
                }
            }
        }
    }
    jobs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_json() -> serde_json::Value {
        serde_json::json!({
            "metadata": {
                "placeDcid": ["geoId/06"],
                "containedPlaceTypes": {"State": "County"}
            },
            "categories": [{
                "title": "Economy",
                "statVarSpec": {
                    "median_income": {"statVar": "Median_Income_Person", "name": "Median income"},
                    "unemployment_pc": {
                        "statVar": "Count_Person_Unemployed",
                        "name": "Unemployment rate",
                        "denom": "Count_Person",
                        "scaling": 100.0,
                        "unit": "%"
                    }
                },
                "blocks": [{
                    "title": "Income",
                    "columns": [
                        {"tiles": [
                            {"title": "Median income in ${placeName}", "type": "BAR",
                             "statVarKey": ["median_income"]},
                            {"title": "Overview", "type": "PLACE_OVERVIEW"}
                        ]},
                        {"tiles": [
                            {"title": "Unemployment", "type": "LINE",
                             "statVarKey": ["unemployment_pc"]},
                            {"title": "Dangling", "type": "MAP",
                             "statVarKey": ["no_such_key"]}
                        ]}
                    ]
                }]
            }]
        })
    }

    #[test]
    fn deserializes_proto_json_names() {
        let config: SubjectPageConfig = serde_json::from_value(config_json()).unwrap();
        assert_eq!(config.metadata.place_dcid, vec!["geoId/06"]);
        assert_eq!(
            config.metadata.contained_place_types.get("State").map(String::as_str),
            Some("County")
        );
        let category = &config.categories[0];
        let spec = &category.stat_var_spec["unemployment_pc"];
        assert_eq!(spec.denom.as_deref(), Some("Count_Person"));
        assert_eq!(spec.scaling, Some(100.0));
        assert_eq!(spec.label(), "Unemployment rate");
    }

    #[test]
    fn unknown_tile_types_deserialize_as_unsupported() {
        let tile: TileConfig =
            serde_json::from_value(serde_json::json!({"title": "x", "type": "HIGHLIGHT"})).unwrap();
        assert_eq!(tile.tile_type, TileType::Unsupported);
    }

    #[test]
    fn tile_type_serializes_screaming_snake() {
        let tag = serde_json::to_string(&TileType::DisasterEventMap).unwrap();
        assert_eq!(tag, "\"DISASTER_EVENT_MAP\"");
    }

    #[test]
    fn walk_preserves_document_order_and_skips_unresolvable() {
        let config: SubjectPageConfig = serde_json::from_value(config_json()).unwrap();
        let jobs = collect_tiles(&config);
        // Overview (unsupported) and the dangling map key are dropped.
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].tile.tile_type, TileType::Bar);
        assert_eq!(jobs[1].tile.tile_type, TileType::Line);
        assert_eq!(jobs[0].stat_vars[0].stat_var, "Median_Income_Person");
    }

    #[test]
    fn empty_config_yields_no_jobs() {
        let jobs = collect_tiles(&SubjectPageConfig::default());
        assert!(jobs.is_empty());
    }

    #[test]
    fn disaster_tiles_resolve_event_specs() {
        let config: SubjectPageConfig = serde_json::from_value(serde_json::json!({
            "metadata": {
                "eventTypeSpec": {
                    "fire": {"id": "fire", "name": "Fire", "color": "#f00",
                             "eventTypeDcids": ["WildlandFireEvent"]}
                }
            },
            "categories": [{
                "blocks": [{"columns": [{"tiles": [{
                    "title": "Disasters", "type": "DISASTER_EVENT_MAP",
                    "disasterEventMapTileSpec": {"pointEventTypeKey": ["fire", "missing"]}
                }]}]}]
            }]
        }))
        .unwrap();
        let jobs = collect_tiles(&config);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].event_specs.len(), 1);
        assert_eq!(jobs[0].event_specs[0].name, "Fire");
    }
}

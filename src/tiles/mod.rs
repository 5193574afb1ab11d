//! Per-chart-type tile pipelines. Each submodule splits into an async
//! fetch step that turns API responses into chart-ready data and a pure
//! draw step that turns that data into a standalone SVG. The dispatcher
//! here routes one tile job to its pipeline and absorbs failures: a tile
//! that cannot be rendered is logged and dropped, never fatal.

pub mod bar;
pub mod disaster;
pub mod line;
pub mod map;
pub mod ranking;
pub mod scatter;

use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

use crate::config::ChartConfig;
use crate::dc::types::{Facet, NlPlace, PointResponse, SeriesResponse};
use crate::dc::{DataCommonsClient, DcError};
use crate::page::{StatVarSpec, TileJob, TileType};
use crate::render::{text_element, SvgBuilder};
use crate::text::{truncate_label, wrap_text};
use crate::theme::Theme;

/// One rendered chart as returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct TileResult {
    pub svg: String,
    pub srcs: Vec<Source>,
    pub title: String,
    #[serde(rename = "type")]
    pub tile_type: TileType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_csv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub places: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vars: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub url: String,
}

#[derive(Error, Debug)]
pub enum TileError {
    #[error(transparent)]
    Fetch(#[from] DcError),

    #[error("no observations to draw")]
    NoData,

    #[error("no geometry for place")]
    NoGeometry,

    #[error("invalid tile spec: {0}")]
    Spec(&'static str),
}

/// Everything a tile pipeline needs besides its own job: the shared API
/// client, drawing settings, and the place the page is about.
pub struct TileContext<'a> {
    pub client: &'a DataCommonsClient,
    pub theme: &'a Theme,
    pub chart: &'a ChartConfig,
    pub place: &'a NlPlace,
    /// Child place type for contained-in charts, from the page metadata.
    pub child_type: Option<&'a str>,
}

impl TileContext<'_> {
    /// Contained-in tiles need a child place type; pages for unknown
    /// place types fall back to counties.
    pub(crate) fn child_type_or_default(&self) -> &str {
        self.child_type.unwrap_or("County")
    }
}

/// Runs one tile end to end. Failures become `None` after logging, so a
/// broken tile never takes its siblings down with it.
pub async fn render_tile(ctx: &TileContext<'_>, job: &TileJob) -> Option<TileResult> {
    let outcome = match job.tile.tile_type {
        TileType::Bar => bar::render(ctx, job).await,
        TileType::Line => line::render(ctx, job).await,
        TileType::Map => map::render(ctx, job).await,
        TileType::Scatter => scatter::render(ctx, job).await,
        TileType::Ranking => ranking::render(ctx, job).await,
        TileType::DisasterEventMap => disaster::render(ctx, job).await,
        TileType::Unsupported => return None,
    };
    match outcome {
        Ok(result) => Some(result),
        Err(err) => {
            tracing::error!(
                title = %job.tile.title,
                tile_type = ?job.tile.tile_type,
                error = %err,
                "tile rendering failed"
            );
            None
        }
    }
}

/// Replaces the `${placeName}` and `${date}` tokens a tile title may carry.
pub(crate) fn fill_title(template: &str, place_name: &str, date: &str) -> String {
    template
        .replace("${placeName}", place_name)
        .replace("${date}", date)
}

/// Applies a spec's denominator and scaling to a raw observation.
/// Returns `None` when a required denominator is missing or unusable.
pub(crate) fn apply_spec(value: f64, denom_value: Option<f64>, spec: &StatVarSpec) -> Option<f64> {
    let mut result = value;
    if spec.denom.is_some() {
        let denom = denom_value?;
        if denom <= 0.0 {
            return None;
        }
        result /= denom;
    }
    if let Some(scaling) = spec.scaling {
        result *= scaling;
    }
    Some(result)
}

/// Chart-ready values for one spec out of a point response: raw
/// observations joined with their denominator, keyed by entity, paired
/// with the observation date.
pub(crate) fn spec_point_values(
    response: &PointResponse,
    spec: &StatVarSpec,
) -> HashMap<String, (f64, String)> {
    let Some(by_entity) = response.data.get(&spec.stat_var) else {
        return HashMap::new();
    };
    let denom_map = spec
        .denom
        .as_deref()
        .and_then(|denom| response.data.get(denom));
    let mut out = HashMap::new();
    for (entity, obs) in by_entity {
        let Some(raw) = obs.value else { continue };
        let denom_value = denom_map
            .and_then(|map| map.get(entity))
            .and_then(|obs| obs.value);
        if let Some(value) = apply_spec(raw, denom_value, spec) {
            out.insert(entity.clone(), (value, obs.date.clone()));
        }
    }
    out
}

/// Deduplicated source attributions for the facets a point response used
/// for the given specs. Sorted by name so output is stable across runs.
pub(crate) fn point_sources(response: &PointResponse, specs: &[StatVarSpec]) -> Vec<Source> {
    let mut ids = Vec::new();
    for spec in specs {
        if let Some(by_entity) = response.data.get(&spec.stat_var) {
            for obs in by_entity.values() {
                if obs.value.is_some() && !obs.facet.is_empty() {
                    ids.push(obs.facet.as_str());
                }
            }
        }
    }
    facet_sources(&response.facets, ids)
}

pub(crate) fn series_sources(response: &SeriesResponse, specs: &[StatVarSpec]) -> Vec<Source> {
    let mut ids = Vec::new();
    for spec in specs {
        if let Some(by_entity) = response.data.get(&spec.stat_var) {
            for obs in by_entity.values() {
                if !obs.series.is_empty() && !obs.facet.is_empty() {
                    ids.push(obs.facet.as_str());
                }
            }
        }
    }
    facet_sources(&response.facets, ids)
}

fn facet_sources(facets: &HashMap<String, Facet>, ids: Vec<&str>) -> Vec<Source> {
    let mut sources: Vec<Source> = Vec::new();
    for id in ids {
        let Some(facet) = facets.get(id) else { continue };
        if facet.provenance_url.is_empty() {
            continue;
        }
        if sources.iter().any(|s| s.url == facet.provenance_url) {
            continue;
        }
        sources.push(Source {
            name: host_of(&facet.provenance_url).to_string(),
            url: facet.provenance_url.clone(),
        });
    }
    sources.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.url.cmp(&b.url)));
    sources
}

fn host_of(url: &str) -> &str {
    let trimmed = url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.");
    trimmed.split('/').next().unwrap_or(trimmed)
}

/// Facet id of the first entity in `order` holding a point observation
/// for `stat_var`. The caller passes its own entity order, so the pick
/// does not depend on map iteration order.
pub(crate) fn point_facet_id<'a, I>(response: &PointResponse, stat_var: &str, order: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let Some(by_entity) = response.data.get(stat_var) else {
        return String::new();
    };
    order
        .into_iter()
        .filter_map(|entity| by_entity.get(entity))
        .find(|obs| obs.value.is_some())
        .map(|obs| obs.facet.clone())
        .unwrap_or_default()
}

pub(crate) fn series_facet_id<'a, I>(response: &SeriesResponse, stat_var: &str, order: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let Some(by_entity) = response.data.get(stat_var) else {
        return String::new();
    };
    order
        .into_iter()
        .filter_map(|entity| by_entity.get(entity))
        .find(|obs| !obs.series.is_empty())
        .map(|obs| obs.facet.clone())
        .unwrap_or_default()
}

/// Unit for display: the stat var spec's own unit wins, then the facet's.
pub(crate) fn resolve_unit(
    spec: &StatVarSpec,
    facets: &HashMap<String, Facet>,
    facet_id: &str,
) -> Option<String> {
    if let Some(unit) = &spec.unit {
        if !unit.is_empty() {
            return Some(unit.clone());
        }
    }
    facets
        .get(facet_id)
        .map(|facet| facet.unit.clone())
        .filter(|unit| !unit.is_empty())
}

/// The date shown in titles: the most common observation date, ties
/// resolved toward the most recent.
pub(crate) fn most_common_date<'a, I>(dates: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for date in dates {
        if !date.is_empty() {
            *counts.entry(date).or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(b.0)))
        .map(|(date, _)| date.to_string())
        .unwrap_or_default()
}

/// CSV export of header plus rows, RFC 4180 quoting handled by the writer.
pub(crate) fn to_csv(header: &[&str], rows: &[Vec<String>]) -> Option<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header).ok()?;
    for row in rows {
        writer.write_record(row).ok()?;
    }
    String::from_utf8(writer.into_inner().ok()?).ok()
}

/// Draws the wrapped tile title and returns the y where content starts.
pub(crate) fn draw_title(
    svg: &mut SvgBuilder,
    title: &str,
    theme: &Theme,
    chart: &ChartConfig,
) -> f64 {
    if title.is_empty() {
        return chart.padding;
    }
    let max_width = chart.tile_width - chart.padding * 2.0;
    let lines = wrap_text(title, max_width, theme.title_font_size);
    let line_height = theme.title_font_size * chart.title_line_height;
    for (idx, line) in lines.iter().enumerate() {
        let y = chart.padding + idx as f64 * line_height + theme.title_font_size;
        svg.push(&text_element(
            chart.padding,
            y,
            "start",
            theme.title_font_size,
            &theme.text_color,
            line,
        ));
    }
    chart.padding + lines.len() as f64 * line_height + 8.0
}

/// Horizontal grid lines with tick labels down the left edge.
pub(crate) fn draw_value_axis(
    svg: &mut SvgBuilder,
    scale: &crate::scale::LinearScale,
    plot_x: f64,
    plot_right: f64,
    unit: Option<&str>,
    theme: &Theme,
) {
    for tick in scale.ticks() {
        let y = scale.scale(tick);
        svg.push(&format!(
            "<line x1=\"{plot_x:.2}\" y1=\"{y:.2}\" x2=\"{plot_right:.2}\" y2=\"{y:.2}\" stroke=\"{}\" stroke-width=\"1\"/>",
            theme.grid_color
        ));
        svg.push(&text_element(
            plot_x - 6.0,
            y + theme.axis_font_size * 0.35,
            "end",
            theme.axis_font_size,
            &theme.muted_text_color,
            &crate::format::format_value(tick, unit),
        ));
    }
}

/// Equirectangular fit of a lon/lat bounding box into a plot rectangle,
/// aspect preserved and centered. Good enough at tile size; no real
/// projection math is carried for it.
pub(crate) struct GeoFit {
    min_lon: f64,
    max_lat: f64,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

impl GeoFit {
    pub(crate) fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        (
            self.offset_x + (lon - self.min_lon) * self.scale,
            self.offset_y + (self.max_lat - lat) * self.scale,
        )
    }
}

/// Fits every point into the `(x, top, right, bottom)` plot rectangle.
/// `None` when there are no finite points to fit.
pub(crate) fn fit_points<I>(points: I, plot: (f64, f64, f64, f64)) -> Option<GeoFit>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let mut min_lon = f64::INFINITY;
    let mut max_lon = f64::NEG_INFINITY;
    let mut min_lat = f64::INFINITY;
    let mut max_lat = f64::NEG_INFINITY;
    for (lon, lat) in points {
        if lon.is_finite() && lat.is_finite() {
            min_lon = min_lon.min(lon);
            max_lon = max_lon.max(lon);
            min_lat = min_lat.min(lat);
            max_lat = max_lat.max(lat);
        }
    }
    if !min_lon.is_finite() || !min_lat.is_finite() {
        return None;
    }
    let (x, top, right, bottom) = plot;
    let lon_span = (max_lon - min_lon).max(1e-9);
    let lat_span = (max_lat - min_lat).max(1e-9);
    let scale = ((right - x) / lon_span).min((bottom - top) / lat_span);
    Some(GeoFit {
        min_lon,
        max_lat,
        scale,
        offset_x: x + ((right - x) - lon_span * scale) / 2.0,
        offset_y: top + ((bottom - top) - lat_span * scale) / 2.0,
    })
}

/// Swatch-and-label legend rows, labels truncated to the available width.
pub(crate) fn draw_legend(
    svg: &mut SvgBuilder,
    entries: &[(String, String)],
    x: f64,
    y: f64,
    max_width: f64,
    theme: &Theme,
    chart: &ChartConfig,
) {
    let swatch = chart.legend_swatch_size;
    for (idx, (label, color)) in entries.iter().enumerate() {
        let row_y = y + idx as f64 * chart.legend_item_height;
        svg.push(&format!(
            "<rect x=\"{x:.2}\" y=\"{row_y:.2}\" width=\"{swatch}\" height=\"{swatch}\" rx=\"2\" fill=\"{color}\"/>"
        ));
        let label = truncate_label(label, max_width - swatch - 6.0, theme.font_size);
        svg.push(&text_element(
            x + swatch + 6.0,
            row_y + swatch - 2.0,
            "start",
            theme.font_size,
            &theme.text_color,
            &label,
        ));
    }
}

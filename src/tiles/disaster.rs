//! Disaster event maps. Children of the answer place drawn as a neutral
//! outline with one colored dot per event, one layer per event type from
//! the page metadata. Events are pulled for the current calendar year.

use chrono::{DateTime, Datelike, Utc};

use crate::config::ChartConfig;
use crate::page::{TileJob, TileType};
use crate::render::{escape_xml, rings_to_path, SvgBuilder};
use crate::theme::Theme;

use super::{
    draw_legend, draw_title, fill_title, fit_points, Source, TileContext, TileError, TileResult,
};

pub struct EventMarker {
    pub name: String,
    pub lon: f64,
    pub lat: f64,
}

pub struct EventLayer {
    pub label: String,
    pub color: String,
    pub events: Vec<EventMarker>,
}

pub struct DisasterData {
    pub title: String,
    /// Outline rings per child place, lon/lat order.
    pub outline: Vec<Vec<Vec<(f64, f64)>>>,
    pub layers: Vec<EventLayer>,
    pub srcs: Vec<Source>,
    pub places: Vec<String>,
    pub vars: Vec<String>,
}

pub(crate) async fn render(ctx: &TileContext<'_>, job: &TileJob) -> Result<TileResult, TileError> {
    let data = fetch(ctx, job).await?;
    Ok(draw(&data, ctx.theme, ctx.chart))
}

async fn fetch(ctx: &TileContext<'_>, job: &TileJob) -> Result<DisasterData, TileError> {
    if job.event_specs.is_empty() {
        return Err(TileError::Spec("disaster map tile has no event type"));
    }

    let geojson = ctx
        .client
        .choropleth_geojson(&ctx.place.dcid, ctx.child_type_or_default())
        .await?;
    let outline: Vec<Vec<Vec<(f64, f64)>>> = geojson
        .features
        .iter()
        .map(|feature| feature.geometry.rings())
        .filter(|rings| !rings.is_empty())
        .collect();

    let year = event_year(Utc::now());
    let mut layers = Vec::new();
    let mut vars = Vec::new();
    for (idx, spec) in job.event_specs.iter().enumerate() {
        let mut events = Vec::new();
        for event_type in &spec.event_type_dcids {
            vars.push(event_type.clone());
            let response = ctx
                .client
                .event_data(event_type, &ctx.place.dcid, year)
                .await?;
            for event in response.event_collection.events {
                let Some(location) = event.geo_locations.first() else {
                    continue;
                };
                events.push(EventMarker {
                    name: if event.name.is_empty() {
                        event.dcid.clone()
                    } else {
                        event.name.clone()
                    },
                    lon: location.point.longitude,
                    lat: location.point.latitude,
                });
            }
        }
        layers.push(EventLayer {
            label: spec.name.clone(),
            color: if spec.color.is_empty() {
                ctx.theme.series_color(idx).to_string()
            } else {
                spec.color.clone()
            },
            events,
        });
    }

    if outline.is_empty() && layers.iter().all(|layer| layer.events.is_empty()) {
        return Err(TileError::NoGeometry);
    }

    Ok(DisasterData {
        title: fill_title(&job.tile.title, &ctx.place.name, &year.to_string()),
        outline,
        layers,
        srcs: Vec::new(),
        places: vec![ctx.place.dcid.clone()],
        vars,
    })
}

pub fn draw(data: &DisasterData, theme: &Theme, chart: &ChartConfig) -> TileResult {
    let mut svg = SvgBuilder::new(chart.tile_width, chart.tile_height);
    let top = draw_title(&mut svg, &data.title, theme, chart);

    let legend_entries: Vec<(String, String)> = data
        .layers
        .iter()
        .map(|layer| (layer.label.clone(), layer.color.clone()))
        .collect();
    let legend_height = legend_entries.len() as f64 * chart.legend_item_height;

    let plot_x = chart.padding;
    let plot_right = chart.tile_width - chart.padding;
    let plot_bottom = chart.tile_height - chart.padding - legend_height;

    let outline_points = data.outline.iter().flatten().flatten().copied();
    let event_points = data
        .layers
        .iter()
        .flat_map(|layer| layer.events.iter().map(|e| (e.lon, e.lat)));
    if let Some(fit) = fit_points(
        outline_points.chain(event_points),
        (plot_x, top, plot_right, plot_bottom),
    ) {
        for region in &data.outline {
            let projected: Vec<Vec<(f64, f64)>> = region
                .iter()
                .map(|ring| ring.iter().map(|&(lon, lat)| fit.project(lon, lat)).collect())
                .collect();
            svg.push(&format!(
                "<path d=\"{}\" fill=\"{}\" fill-rule=\"evenodd\" stroke=\"{}\" stroke-width=\"0.5\"/>",
                rings_to_path(&projected),
                theme.missing_data_fill,
                theme.region_border_color
            ));
        }
        for layer in &data.layers {
            for event in &layer.events {
                let (cx, cy) = fit.project(event.lon, event.lat);
                svg.push(&format!(
                    "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{}\" fill=\"{}\" fill-opacity=\"0.85\" stroke=\"{}\" stroke-width=\"0.5\"><title>{}</title></circle>",
                    chart.event_dot_radius,
                    layer.color,
                    theme.background,
                    escape_xml(&event.name)
                ));
            }
        }
    }

    if !legend_entries.is_empty() {
        draw_legend(
            &mut svg,
            &legend_entries,
            plot_x,
            plot_bottom + 4.0,
            plot_right - plot_x,
            theme,
            chart,
        );
    }

    TileResult {
        svg: svg.finish(theme),
        srcs: data.srcs.clone(),
        title: data.title.clone(),
        tile_type: TileType::DisasterEventMap,
        legend: Some(data.layers.iter().map(|l| l.label.clone()).collect()),
        data_csv: None,
        unit: None,
        places: Some(data.places.clone()),
        vars: Some(data.vars.clone()),
    }
}

/// Calendar year the event query is scoped to.
fn event_year(when: DateTime<Utc>) -> i32 {
    when.year()
}

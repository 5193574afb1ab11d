//! Grouped bar charts. One group of bars per place, one bar per variable,
//! places either listed in the tile config or ranked children of the
//! answer place.

use crate::config::ChartConfig;
use crate::page::{TileJob, TileType};
use crate::render::{rotated_text_element, SvgBuilder};
use crate::scale::{BandScale, LinearScale};
use crate::text::truncate_label;
use crate::theme::Theme;

use super::{
    draw_legend, draw_title, draw_value_axis, fill_title, most_common_date, point_facet_id,
    point_sources, resolve_unit, spec_point_values, to_csv, Source, TileContext, TileError,
    TileResult,
};

/// Chart-ready bar data, independent of any transport concern.
pub struct BarData {
    pub title: String,
    pub unit: Option<String>,
    pub var_labels: Vec<String>,
    /// Place display name plus one value slot per variable.
    pub groups: Vec<(String, Vec<Option<f64>>)>,
    pub srcs: Vec<Source>,
    pub places: Vec<String>,
    pub vars: Vec<String>,
}

pub(crate) async fn render(ctx: &TileContext<'_>, job: &TileJob) -> Result<TileResult, TileError> {
    let data = fetch(ctx, job).await?;
    Ok(draw(&data, ctx.theme, ctx.chart))
}

async fn fetch(ctx: &TileContext<'_>, job: &TileJob) -> Result<BarData, TileError> {
    let specs = &job.stat_vars;
    if specs.is_empty() {
        return Err(TileError::Spec("bar tile needs at least one stat var"));
    }
    let mut variables: Vec<String> = specs.iter().map(|s| s.stat_var.clone()).collect();
    for spec in specs {
        if let Some(denom) = &spec.denom {
            if !variables.contains(denom) {
                variables.push(denom.clone());
            }
        }
    }

    let (response, place_dcids) = if job.tile.comparison_places.is_empty() {
        // No explicit place list: chart the largest children of the
        // answer place, ranked by the first variable.
        let response = ctx
            .client
            .observations_point_within(&ctx.place.dcid, ctx.child_type_or_default(), &variables)
            .await?;
        let mut ranked: Vec<(String, f64)> = spec_point_values(&response, &specs[0])
            .into_iter()
            .map(|(entity, (value, _))| (entity, value))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked.truncate(ctx.chart.max_bar_places);
        let dcids = ranked.into_iter().map(|(entity, _)| entity).collect();
        (response, dcids)
    } else {
        let places = job.tile.comparison_places.clone();
        let response = ctx.client.observations_point(&places, &variables).await?;
        (response, places)
    };
    if place_dcids.is_empty() {
        return Err(TileError::NoData);
    }

    let names = ctx.client.place_names(&place_dcids).await?;

    let per_spec: Vec<_> = specs
        .iter()
        .map(|spec| spec_point_values(&response, spec))
        .collect();
    let date = most_common_date(
        per_spec
            .iter()
            .flat_map(|map| map.values().map(|(_, date)| date.as_str())),
    );

    let mut groups = Vec::new();
    for dcid in &place_dcids {
        let values: Vec<Option<f64>> = per_spec
            .iter()
            .map(|map| map.get(dcid).map(|(value, _)| *value))
            .collect();
        if values.iter().all(Option::is_none) {
            continue;
        }
        let name = names.get(dcid).cloned().unwrap_or_else(|| dcid.clone());
        groups.push((name, values));
    }
    if groups.is_empty() {
        return Err(TileError::NoData);
    }

    let facet_id =
        point_facet_id(&response, &specs[0].stat_var, place_dcids.iter().map(String::as_str));

    Ok(BarData {
        title: fill_title(&job.tile.title, &ctx.place.name, &date),
        unit: resolve_unit(&specs[0], &response.facets, &facet_id),
        var_labels: specs.iter().map(|s| s.label().to_string()).collect(),
        groups,
        srcs: point_sources(&response, specs),
        places: place_dcids,
        vars: specs.iter().map(|s| s.stat_var.clone()).collect(),
    })
}

pub fn draw(data: &BarData, theme: &Theme, chart: &ChartConfig) -> TileResult {
    let mut svg = SvgBuilder::new(chart.tile_width, chart.tile_height);
    let top = draw_title(&mut svg, &data.title, theme, chart);

    let multi_var = data.var_labels.len() > 1;
    let legend_entries: Vec<(String, String)> = if multi_var {
        data.var_labels
            .iter()
            .enumerate()
            .map(|(idx, label)| (label.clone(), theme.series_color(idx).to_string()))
            .collect()
    } else {
        Vec::new()
    };
    let legend_height = legend_entries.len() as f64 * chart.legend_item_height;

    let plot_x = chart.padding + chart.y_axis_width;
    let plot_right = chart.tile_width - chart.padding;
    let plot_bottom = chart.tile_height - chart.padding - chart.x_axis_height - legend_height;

    let values: Vec<f64> = data
        .groups
        .iter()
        .flat_map(|(_, vs)| vs.iter().flatten().copied())
        .collect();
    let y = LinearScale::nice(&values, (plot_bottom, top), chart.tick_count, true);
    draw_value_axis(&mut svg, &y, plot_x, plot_right, data.unit.as_deref(), theme);

    let band = BandScale::new(data.groups.len(), (plot_x, plot_right), chart.bar_padding_ratio);
    let zero_y = y.scale(0.0).clamp(top, plot_bottom);

    for (group_idx, (name, values)) in data.groups.iter().enumerate() {
        let group_x = band.position(group_idx);
        let bar_width = band.bandwidth() / values.len() as f64;
        for (var_idx, value) in values.iter().enumerate() {
            let Some(value) = *value else { continue };
            let value_y = y.scale(value).clamp(top, plot_bottom);
            let (bar_y, bar_height) = if value_y <= zero_y {
                (value_y, zero_y - value_y)
            } else {
                (zero_y, value_y - zero_y)
            };
            let x = group_x + var_idx as f64 * bar_width;
            svg.push(&format!(
                "<rect x=\"{x:.2}\" y=\"{bar_y:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\"/>",
                bar_width,
                bar_height.max(1.0),
                theme.series_color(var_idx)
            ));
        }
        let label = truncate_label(name, chart.x_axis_height * 1.5, theme.axis_font_size);
        svg.push(&rotated_text_element(
            band.center(group_idx),
            plot_bottom + 14.0,
            -40.0,
            "end",
            theme.axis_font_size,
            &theme.muted_text_color,
            &label,
        ));
    }

    svg.push(&format!(
        "<line x1=\"{plot_x:.2}\" y1=\"{zero_y:.2}\" x2=\"{plot_right:.2}\" y2=\"{zero_y:.2}\" stroke=\"{}\" stroke-width=\"1\"/>",
        theme.axis_color
    ));

    if !legend_entries.is_empty() {
        draw_legend(
            &mut svg,
            &legend_entries,
            plot_x,
            plot_bottom + chart.x_axis_height,
            plot_right - plot_x,
            theme,
            chart,
        );
    }

    let mut header = vec!["place"];
    for label in &data.var_labels {
        header.push(label.as_str());
    }
    let rows: Vec<Vec<String>> = data
        .groups
        .iter()
        .map(|(name, values)| {
            let mut row = vec![name.clone()];
            for value in values {
                row.push(value.map(|v| v.to_string()).unwrap_or_default());
            }
            row
        })
        .collect();

    TileResult {
        svg: svg.finish(theme),
        srcs: data.srcs.clone(),
        title: data.title.clone(),
        tile_type: TileType::Bar,
        legend: if multi_var {
            Some(data.var_labels.clone())
        } else {
            None
        },
        data_csv: to_csv(&header, &rows),
        unit: data.unit.clone(),
        places: Some(data.places.clone()),
        vars: Some(data.vars.clone()),
    }
}

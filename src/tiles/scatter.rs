//! Scatter plots relating two variables across the children of the
//! answer place. The first stat var is the y axis, the second the x axis;
//! places missing either side are left out.

use crate::config::ChartConfig;
use crate::format::format_value;
use crate::page::{TileJob, TileType};
use crate::render::{escape_xml, rotated_text_element, text_element, SvgBuilder};
use crate::scale::LinearScale;
use crate::theme::Theme;

use super::{
    draw_title, draw_value_axis, fill_title, most_common_date, point_facet_id, point_sources,
    resolve_unit, spec_point_values, to_csv, Source, TileContext, TileError, TileResult,
};

pub struct ScatterPoint {
    pub name: String,
    pub x: f64,
    pub y: f64,
}

pub struct ScatterData {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x_unit: Option<String>,
    pub y_unit: Option<String>,
    pub points: Vec<ScatterPoint>,
    pub srcs: Vec<Source>,
    pub places: Vec<String>,
    pub vars: Vec<String>,
}

pub(crate) async fn render(ctx: &TileContext<'_>, job: &TileJob) -> Result<TileResult, TileError> {
    let data = fetch(ctx, job).await?;
    Ok(draw(&data, ctx.theme, ctx.chart))
}

async fn fetch(ctx: &TileContext<'_>, job: &TileJob) -> Result<ScatterData, TileError> {
    let [y_spec, x_spec] = job.stat_vars.as_slice() else {
        return Err(TileError::Spec("scatter tile needs exactly two stat vars"));
    };
    let mut variables = vec![y_spec.stat_var.clone(), x_spec.stat_var.clone()];
    for spec in [y_spec, x_spec] {
        if let Some(denom) = &spec.denom {
            if !variables.contains(denom) {
                variables.push(denom.clone());
            }
        }
    }

    let response = ctx
        .client
        .observations_point_within(&ctx.place.dcid, ctx.child_type_or_default(), &variables)
        .await?;
    let y_values = spec_point_values(&response, y_spec);
    let x_values = spec_point_values(&response, x_spec);

    let mut joined: Vec<(String, f64, f64)> = y_values
        .iter()
        .filter_map(|(entity, (y, _))| {
            x_values
                .get(entity)
                .map(|(x, _)| (entity.clone(), *x, *y))
        })
        .collect();
    if joined.is_empty() {
        return Err(TileError::NoData);
    }
    joined.sort_by(|a, b| a.0.cmp(&b.0));

    let dcids: Vec<String> = joined.iter().map(|(entity, _, _)| entity.clone()).collect();
    let names = ctx.client.place_names(&dcids).await?;
    let points = joined
        .into_iter()
        .map(|(entity, x, y)| ScatterPoint {
            name: names.get(&entity).cloned().unwrap_or(entity),
            x,
            y,
        })
        .collect();

    let date = most_common_date(y_values.values().map(|(_, date)| date.as_str()));
    let y_facet = point_facet_id(&response, &y_spec.stat_var, dcids.iter().map(String::as_str));
    let x_facet = point_facet_id(&response, &x_spec.stat_var, dcids.iter().map(String::as_str));

    Ok(ScatterData {
        title: fill_title(&job.tile.title, &ctx.place.name, &date),
        x_label: x_spec.label().to_string(),
        y_label: y_spec.label().to_string(),
        x_unit: resolve_unit(x_spec, &response.facets, &x_facet),
        y_unit: resolve_unit(y_spec, &response.facets, &y_facet),
        points,
        srcs: point_sources(&response, &[y_spec.clone(), x_spec.clone()]),
        places: vec![ctx.place.dcid.clone()],
        vars: vec![y_spec.stat_var.clone(), x_spec.stat_var.clone()],
    })
}

pub fn draw(data: &ScatterData, theme: &Theme, chart: &ChartConfig) -> TileResult {
    let mut svg = SvgBuilder::new(chart.tile_width, chart.tile_height);
    let top = draw_title(&mut svg, &data.title, theme, chart);

    let plot_x = chart.padding + chart.y_axis_width;
    let plot_right = chart.tile_width - chart.padding;
    let plot_bottom = chart.tile_height - chart.padding - chart.x_axis_height;

    let xs: Vec<f64> = data.points.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = data.points.iter().map(|p| p.y).collect();
    let x = LinearScale::nice(&xs, (plot_x, plot_right), chart.tick_count, false);
    let y = LinearScale::nice(&ys, (plot_bottom, top), chart.tick_count, false);

    draw_value_axis(&mut svg, &y, plot_x, plot_right, data.y_unit.as_deref(), theme);
    for tick in x.ticks() {
        let tx = x.scale(tick);
        svg.push(&text_element(
            tx,
            plot_bottom + 16.0,
            "middle",
            theme.axis_font_size,
            &theme.muted_text_color,
            &format_value(tick, data.x_unit.as_deref()),
        ));
    }
    svg.push(&format!(
        "<line x1=\"{plot_x:.2}\" y1=\"{plot_bottom:.2}\" x2=\"{plot_right:.2}\" y2=\"{plot_bottom:.2}\" stroke=\"{}\" stroke-width=\"1\"/>",
        theme.axis_color
    ));

    for point in &data.points {
        svg.push(&format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{}\" fill=\"{}\" fill-opacity=\"0.7\"><title>{}</title></circle>",
            x.scale(point.x),
            y.scale(point.y),
            chart.dot_radius,
            theme.series_color(0),
            escape_xml(&point.name)
        ));
    }

    svg.push(&text_element(
        (plot_x + plot_right) / 2.0,
        plot_bottom + 36.0,
        "middle",
        theme.axis_font_size,
        &theme.text_color,
        &data.x_label,
    ));
    svg.push(&rotated_text_element(
        chart.padding,
        (top + plot_bottom) / 2.0,
        -90.0,
        "middle",
        theme.axis_font_size,
        &theme.text_color,
        &data.y_label,
    ));

    let rows: Vec<Vec<String>> = data
        .points
        .iter()
        .map(|point| {
            vec![
                point.name.clone(),
                point.x.to_string(),
                point.y.to_string(),
            ]
        })
        .collect();

    TileResult {
        svg: svg.finish(theme),
        srcs: data.srcs.clone(),
        title: data.title.clone(),
        tile_type: TileType::Scatter,
        legend: None,
        data_csv: to_csv(&["place", &data.x_label, &data.y_label], &rows),
        unit: None,
        places: Some(data.places.clone()),
        vars: Some(data.vars.clone()),
    }
}

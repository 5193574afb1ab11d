//! Time-series line charts. One line per variable and place pair, dates
//! placed on a decimal-year axis so yearly, monthly, and daily series all
//! land correctly.

use std::collections::HashMap;

use crate::config::ChartConfig;
use crate::format::{date_to_year, format_year_tick};
use crate::page::{TileJob, TileType};
use crate::render::{points_to_path, text_element, SvgBuilder};
use crate::scale::LinearScale;
use crate::theme::Theme;

use super::{
    apply_spec, draw_legend, draw_title, draw_value_axis, fill_title, resolve_unit,
    series_facet_id, series_sources, to_csv, Source, TileContext, TileError, TileResult,
};

pub struct LineSeries {
    pub label: String,
    /// ISO date and chart value, ascending by date.
    pub points: Vec<(String, f64)>,
}

pub struct LineData {
    pub title: String,
    pub unit: Option<String>,
    pub series: Vec<LineSeries>,
    pub srcs: Vec<Source>,
    pub places: Vec<String>,
    pub vars: Vec<String>,
}

pub(crate) async fn render(ctx: &TileContext<'_>, job: &TileJob) -> Result<TileResult, TileError> {
    let data = fetch(ctx, job).await?;
    Ok(draw(&data, ctx.theme, ctx.chart))
}

async fn fetch(ctx: &TileContext<'_>, job: &TileJob) -> Result<LineData, TileError> {
    let specs = &job.stat_vars;
    if specs.is_empty() {
        return Err(TileError::Spec("line tile needs at least one stat var"));
    }
    let entities: Vec<String> = if job.tile.comparison_places.is_empty() {
        vec![ctx.place.dcid.clone()]
    } else {
        job.tile.comparison_places.clone()
    };
    let mut variables: Vec<String> = specs.iter().map(|s| s.stat_var.clone()).collect();
    for spec in specs {
        if let Some(denom) = &spec.denom {
            if !variables.contains(denom) {
                variables.push(denom.clone());
            }
        }
    }

    let response = ctx.client.observation_series(&entities, &variables).await?;
    let names = if entities.len() > 1 {
        ctx.client.place_names(&entities).await?
    } else {
        HashMap::new()
    };

    let multi_place = entities.len() > 1;
    let multi_var = specs.len() > 1;

    let mut series = Vec::new();
    for spec in specs {
        let denom_by_entity = spec.denom.as_deref().and_then(|d| response.data.get(d));
        for entity in &entities {
            let Some(obs) = response
                .data
                .get(&spec.stat_var)
                .and_then(|map| map.get(entity))
            else {
                continue;
            };
            // Denominators join on the exact observation date.
            let denom_dates: HashMap<&str, f64> = denom_by_entity
                .and_then(|map| map.get(entity))
                .map(|o| o.series.iter().map(|dv| (dv.date.as_str(), dv.value)).collect())
                .unwrap_or_default();
            let mut points = Vec::new();
            for dv in &obs.series {
                let denom_value = denom_dates.get(dv.date.as_str()).copied();
                if let Some(value) = apply_spec(dv.value, denom_value, spec) {
                    points.push((dv.date.clone(), value));
                }
            }
            if points.is_empty() {
                continue;
            }
            points.sort_by(|a, b| a.0.cmp(&b.0));
            let place_name = names.get(entity).cloned().unwrap_or_else(|| {
                if entity == &ctx.place.dcid {
                    ctx.place.name.clone()
                } else {
                    entity.clone()
                }
            });
            let label = match (multi_var, multi_place) {
                (true, true) => format!("{} ({place_name})", spec.label()),
                (false, true) => place_name,
                _ => spec.label().to_string(),
            };
            series.push(LineSeries { label, points });
        }
    }
    if series.is_empty() {
        return Err(TileError::NoData);
    }

    let date = series
        .iter()
        .filter_map(|s| s.points.last())
        .map(|(date, _)| date.as_str())
        .max()
        .unwrap_or_default()
        .to_string();
    let facet_id =
        series_facet_id(&response, &specs[0].stat_var, entities.iter().map(String::as_str));

    Ok(LineData {
        title: fill_title(&job.tile.title, &ctx.place.name, &date),
        unit: resolve_unit(&specs[0], &response.facets, &facet_id),
        series,
        srcs: series_sources(&response, specs),
        places: entities,
        vars: specs.iter().map(|s| s.stat_var.clone()).collect(),
    })
}

pub fn draw(data: &LineData, theme: &Theme, chart: &ChartConfig) -> TileResult {
    let mut svg = SvgBuilder::new(chart.tile_width, chart.tile_height);
    let top = draw_title(&mut svg, &data.title, theme, chart);

    let show_legend = data.series.len() > 1;
    let legend_entries: Vec<(String, String)> = if show_legend {
        data.series
            .iter()
            .enumerate()
            .map(|(idx, s)| (s.label.clone(), theme.series_color(idx).to_string()))
            .collect()
    } else {
        Vec::new()
    };
    let legend_height = legend_entries.len() as f64 * chart.legend_item_height;

    let plot_x = chart.padding + chart.y_axis_width;
    let plot_right = chart.tile_width - chart.padding;
    let plot_bottom = chart.tile_height - chart.padding - chart.x_axis_height - legend_height;

    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for s in &data.series {
        for (date, value) in &s.points {
            if let Some(year) = date_to_year(date) {
                xs.push(year);
                ys.push(*value);
            }
        }
    }

    let x = LinearScale::nice(&xs, (plot_x, plot_right), chart.tick_count, false);
    let y = LinearScale::nice(&ys, (plot_bottom, top), chart.tick_count, false);
    draw_value_axis(&mut svg, &y, plot_x, plot_right, data.unit.as_deref(), theme);
    let x_span = x.domain().1 - x.domain().0;
    let mut last_tick_label = String::new();
    for tick in x.ticks() {
        let label = format_year_tick(tick, x_span);
        // Rounding can give neighbouring ticks the same label; keep one.
        if label == last_tick_label {
            continue;
        }
        let tx = x.scale(tick);
        svg.push(&text_element(
            tx,
            plot_bottom + 16.0,
            "middle",
            theme.axis_font_size,
            &theme.muted_text_color,
            &label,
        ));
        last_tick_label = label;
    }
    svg.push(&format!(
        "<line x1=\"{plot_x:.2}\" y1=\"{plot_bottom:.2}\" x2=\"{plot_right:.2}\" y2=\"{plot_bottom:.2}\" stroke=\"{}\" stroke-width=\"1\"/>",
        theme.axis_color
    ));

    for (idx, s) in data.series.iter().enumerate() {
        let points: Vec<(f64, f64)> = s
            .points
            .iter()
            .filter_map(|(date, value)| {
                date_to_year(date).map(|year| (x.scale(year), y.scale(*value)))
            })
            .collect();
        if points.len() == 1 {
            // A lone observation has no line to show.
            svg.push(&format!(
                "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{}\" fill=\"{}\"/>",
                points[0].0,
                points[0].1,
                chart.dot_radius,
                theme.series_color(idx)
            ));
        } else if !points.is_empty() {
            svg.push(&format!(
                "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"2\"/>",
                points_to_path(&points),
                theme.series_color(idx)
            ));
        }
    }

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

    let mut dates: Vec<&str> = data
        .series
        .iter()
        .flat_map(|s| s.points.iter().map(|(date, _)| date.as_str()))
        .collect();
    dates.sort_unstable();
    dates.dedup();
    let by_date: Vec<HashMap<&str, f64>> = data
        .series
        .iter()
        .map(|s| s.points.iter().map(|(d, v)| (d.as_str(), *v)).collect())
        .collect();
    let rows: Vec<Vec<String>> = dates
        .iter()
        .map(|date| {
            let mut row = vec![date.to_string()];
            for map in &by_date {
                row.push(map.get(date).map(|v| v.to_string()).unwrap_or_default());
            }
            row
        })
        .collect();
    let mut header = vec!["date"];
    for s in &data.series {
        header.push(s.label.as_str());
    }

    TileResult {
        svg: svg.finish(theme),
        srcs: data.srcs.clone(),
        title: data.title.clone(),
        tile_type: TileType::Line,
        legend: if show_legend {
            Some(data.series.iter().map(|s| s.label.clone()).collect())
        } else {
            None
        },
        data_csv: to_csv(&header, &rows),
        unit: data.unit.clone(),
        places: Some(data.places.clone()),
        vars: Some(data.vars.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(label: &str, points: &[(&str, f64)]) -> LineSeries {
        LineSeries {
            label: label.to_string(),
            points: points
                .iter()
                .map(|(date, value)| (date.to_string(), *value))
                .collect(),
        }
    }

    fn sample(series: Vec<LineSeries>) -> LineData {
        LineData {
            title: "Population over time".to_string(),
            unit: None,
            series,
            srcs: Vec::new(),
            places: vec!["geoId/06".to_string()],
            vars: vec!["Count_Person".to_string()],
        }
    }

    #[test]
    fn one_path_per_series() {
        let data = sample(vec![
            series("A", &[("2010", 1.0), ("2015", 3.0), ("2020", 2.0)]),
            series("B", &[("2010", 2.0), ("2020", 4.0)]),
        ]);
        let result = draw(&data, &Theme::base(), &ChartConfig::default());
        assert_eq!(result.svg.matches("<path ").count(), 2);
        assert_eq!(
            result.legend,
            Some(vec!["A".to_string(), "B".to_string()])
        );
    }

    #[test]
    fn lone_observation_becomes_a_dot() {
        let data = sample(vec![series("A", &[("2020", 5.0)])]);
        let result = draw(&data, &Theme::base(), &ChartConfig::default());
        assert_eq!(result.svg.matches("<path ").count(), 0);
        assert_eq!(result.svg.matches("<circle ").count(), 1);
        assert!(result.legend.is_none());
    }

    #[test]
    fn year_ticks_have_no_decimals() {
        let data = sample(vec![series(
            "A",
            &[("2010-03", 1.0), ("2015-06", 2.0), ("2020-09", 3.0)],
        )]);
        let result = draw(&data, &Theme::base(), &ChartConfig::default());
        assert!(result.svg.contains(">2010<"));
        assert!(!result.svg.contains(">2010.0<"));
    }

    #[test]
    fn sub_year_spans_use_month_ticks() {
        let data = sample(vec![series(
            "A",
            &[("2020-01", 1.0), ("2020-04", 2.0), ("2020-07", 1.5), ("2020-10", 3.0)],
        )]);
        let result = draw(&data, &Theme::base(), &ChartConfig::default());
        // Ten months of data; a plain year label would repeat five times.
        assert!(result.svg.contains(">2020-01<"));
        assert!(!result.svg.contains(">2020<"));
    }

    #[test]
    fn adjacent_ticks_never_repeat_a_label() {
        // A 2.5-year span keeps year labels but lands ticks on half years.
        let data = sample(vec![series(
            "A",
            &[("2019-01", 1.0), ("2020-04", 2.0), ("2021-07", 3.0)],
        )]);
        let result = draw(&data, &Theme::base(), &ChartConfig::default());
        for year in ["2019", "2020", "2021", "2022"] {
            let label = format!(">{year}<");
            assert!(
                result.svg.matches(&label).count() <= 1,
                "{year} labelled more than once"
            );
        }
    }

    #[test]
    fn csv_unions_dates_and_leaves_gaps_blank() {
        let data = sample(vec![
            series("A", &[("2010", 1.0), ("2020", 2.0)]),
            series("B", &[("2015", 3.0)]),
        ]);
        let result = draw(&data, &Theme::base(), &ChartConfig::default());
        let csv = result.data_csv.unwrap();
        assert!(csv.starts_with("date,A,B"));
        assert!(csv.contains("2010,1,\n"));
        assert!(csv.contains("2015,,3\n"));
        assert!(csv.contains("2020,2,\n"));
    }
}

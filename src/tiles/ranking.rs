//! Ranked place tables. Children of the answer place sorted by value,
//! sliced into highest and lowest sections per the tile spec, each row a
//! rank, a place name, a proportional bar, and the value.

use crate::config::ChartConfig;
use crate::format::format_value;
use crate::page::{TileJob, TileType};
use crate::render::{text_element, SvgBuilder};
use crate::text::truncate_label;
use crate::theme::Theme;

use super::{
    draw_title, fill_title, most_common_date, point_facet_id, point_sources, resolve_unit,
    spec_point_values, to_csv, Source, TileContext, TileError, TileResult,
};

pub struct RankingRow {
    pub rank: usize,
    pub name: String,
    pub value: f64,
}

pub struct RankingSection {
    pub heading: String,
    pub rows: Vec<RankingRow>,
}

pub struct RankingData {
    pub title: String,
    pub unit: Option<String>,
    pub sections: Vec<RankingSection>,
    pub srcs: Vec<Source>,
    pub places: Vec<String>,
    pub vars: Vec<String>,
}

pub(crate) async fn render(ctx: &TileContext<'_>, job: &TileJob) -> Result<TileResult, TileError> {
    let data = fetch(ctx, job).await?;
    Ok(draw(&data, ctx.theme, ctx.chart))
}

async fn fetch(ctx: &TileContext<'_>, job: &TileJob) -> Result<RankingData, TileError> {
    let spec = job
        .stat_vars
        .first()
        .ok_or(TileError::Spec("ranking tile has no stat var"))?;
    let mut variables = vec![spec.stat_var.clone()];
    if let Some(denom) = &spec.denom {
        if !variables.contains(denom) {
            variables.push(denom.clone());
        }
    }

    let response = ctx
        .client
        .observations_point_within(&ctx.place.dcid, ctx.child_type_or_default(), &variables)
        .await?;
    let values = spec_point_values(&response, spec);
    if values.is_empty() {
        return Err(TileError::NoData);
    }
    let date = most_common_date(values.values().map(|(_, date)| date.as_str()));

    // Descending by value, dcid as the tie breaker so output is stable.
    let mut ranked: Vec<(String, f64)> = values
        .into_iter()
        .map(|(entity, (value, _))| (entity, value))
        .collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    let ranking_spec = job.tile.ranking_tile_spec.clone().unwrap_or_default();
    let count = if ranking_spec.ranking_count > 0 {
        ranking_spec.ranking_count
    } else {
        ctx.chart.default_ranking_count
    };
    let show_highest = ranking_spec.show_highest || !ranking_spec.show_lowest;
    let show_lowest = ranking_spec.show_lowest;

    let mut wanted: Vec<&str> = Vec::new();
    if show_highest {
        wanted.extend(ranked.iter().take(count).map(|(e, _)| e.as_str()));
    }
    if show_lowest {
        wanted.extend(ranked.iter().rev().take(count).map(|(e, _)| e.as_str()));
    }
    let dcids: Vec<String> = wanted.iter().map(|e| e.to_string()).collect();
    let names = ctx.client.place_names(&dcids).await?;
    let display = |entity: &str| {
        names
            .get(entity)
            .cloned()
            .unwrap_or_else(|| entity.to_string())
    };

    let mut sections = Vec::new();
    if show_highest {
        let rows = ranked
            .iter()
            .take(count)
            .enumerate()
            .map(|(idx, (entity, value))| RankingRow {
                rank: idx + 1,
                name: display(entity),
                value: *value,
            })
            .collect();
        sections.push(RankingSection {
            heading: "Highest".to_string(),
            rows,
        });
    }
    if show_lowest {
        // Rank 1 is the lowest value.
        let rows = ranked
            .iter()
            .rev()
            .take(count)
            .enumerate()
            .map(|(idx, (entity, value))| RankingRow {
                rank: idx + 1,
                name: display(entity),
                value: *value,
            })
            .collect();
        sections.push(RankingSection {
            heading: "Lowest".to_string(),
            rows,
        });
    }

    let facet_id = point_facet_id(
        &response,
        &spec.stat_var,
        ranked.iter().map(|(entity, _)| entity.as_str()),
    );

    Ok(RankingData {
        title: fill_title(&job.tile.title, &ctx.place.name, &date),
        unit: resolve_unit(spec, &response.facets, &facet_id),
        sections,
        srcs: point_sources(&response, std::slice::from_ref(spec)),
        places: vec![ctx.place.dcid.clone()],
        vars: vec![spec.stat_var.clone()],
    })
}

pub fn draw(data: &RankingData, theme: &Theme, chart: &ChartConfig) -> TileResult {
    let row_height = chart.ranking_row_height;
    let row_count: usize = data.sections.iter().map(|s| s.rows.len() + 1).sum();
    // Tables grow with their rows instead of clipping them.
    let title_allowance = chart.padding + theme.title_font_size * chart.title_line_height * 2.0;
    let height = (title_allowance + row_count as f64 * row_height + chart.padding)
        .max(chart.tile_height);
    let mut svg = SvgBuilder::new(chart.tile_width, height);
    let top = draw_title(&mut svg, &data.title, theme, chart);

    let plot_right = chart.tile_width - chart.padding;
    let rank_x = chart.padding + 22.0;
    let name_x = chart.padding + 30.0;
    let name_width = (plot_right - name_x) * 0.4;
    let bar_x = name_x + name_width + 8.0;
    let value_width = 64.0;
    let bar_max = (plot_right - value_width - 8.0 - bar_x).max(0.0);

    let mut y = top;
    for section in &data.sections {
        svg.push(&text_element(
            chart.padding,
            y + theme.font_size,
            "start",
            theme.font_size,
            &theme.text_color,
            &section.heading,
        ));
        y += row_height;
        let max_value = section
            .rows
            .iter()
            .map(|row| row.value)
            .fold(0.0_f64, f64::max);
        for row in &section.rows {
            let baseline = y + theme.font_size;
            svg.push(&text_element(
                rank_x,
                baseline,
                "end",
                theme.font_size,
                &theme.muted_text_color,
                &format!("{}.", row.rank),
            ));
            svg.push(&text_element(
                name_x,
                baseline,
                "start",
                theme.font_size,
                &theme.text_color,
                &truncate_label(&row.name, name_width, theme.font_size),
            ));
            if max_value > 0.0 {
                let width = (row.value / max_value).clamp(0.0, 1.0) * bar_max;
                svg.push(&format!(
                    "<rect x=\"{bar_x:.2}\" y=\"{:.2}\" width=\"{width:.2}\" height=\"10\" rx=\"2\" fill=\"{}\"/>",
                    y + (row_height - 10.0) / 2.0,
                    theme.series_color(0)
                ));
            }
            svg.push(&text_element(
                plot_right,
                baseline,
                "end",
                theme.font_size,
                &theme.text_color,
                &format_value(row.value, data.unit.as_deref()),
            ));
            y += row_height;
        }
    }

    let rows: Vec<Vec<String>> = data
        .sections
        .iter()
        .flat_map(|section| {
            section.rows.iter().map(|row| {
                vec![
                    row.rank.to_string(),
                    row.name.clone(),
                    row.value.to_string(),
                ]
            })
        })
        .collect();

    TileResult {
        svg: svg.finish(theme),
        srcs: data.srcs.clone(),
        title: data.title.clone(),
        tile_type: TileType::Ranking,
        legend: None,
        data_csv: to_csv(&["rank", "place", "value"], &rows),
        unit: data.unit.clone(),
        places: Some(data.places.clone()),
        vars: Some(data.vars.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(values: &[(&str, f64)]) -> Vec<RankingRow> {
        values
            .iter()
            .enumerate()
            .map(|(idx, (name, value))| RankingRow {
                rank: idx + 1,
                name: name.to_string(),
                value: *value,
            })
            .collect()
    }

    fn sample() -> RankingData {
        RankingData {
            title: "Highest unemployment rate".to_string(),
            unit: Some("%".to_string()),
            sections: vec![
                RankingSection {
                    heading: "Highest".to_string(),
                    rows: rows(&[("Imperial County", 18.2), ("Tulare County", 11.0)]),
                },
                RankingSection {
                    heading: "Lowest".to_string(),
                    rows: rows(&[("Marin County", 2.1)]),
                },
            ],
            srcs: Vec::new(),
            places: vec!["geoId/06".to_string()],
            vars: vec!["UnemploymentRate_Person".to_string()],
        }
    }

    #[test]
    fn sections_render_headings_ranks_and_values() {
        let result = draw(&sample(), &Theme::base(), &ChartConfig::default());
        assert!(result.svg.contains(">Highest<"));
        assert!(result.svg.contains(">Lowest<"));
        assert!(result.svg.contains(">1.<"));
        assert!(result.svg.contains(">18.2%<"));
        assert!(result.svg.contains("Imperial County"));
    }

    #[test]
    fn csv_runs_sections_in_order() {
        let result = draw(&sample(), &Theme::base(), &ChartConfig::default());
        let csv = result.data_csv.unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "rank,place,value");
        assert_eq!(lines[1], "1,Imperial County,18.2");
        assert_eq!(lines[3], "1,Marin County,2.1");
    }

    #[test]
    fn long_tables_grow_the_canvas() {
        let long: Vec<(String, f64)> = (0..24)
            .map(|i| (format!("Place {i}"), 100.0 - i as f64))
            .collect();
        let data = RankingData {
            title: String::new(),
            unit: None,
            sections: vec![RankingSection {
                heading: "Highest".to_string(),
                rows: long
                    .iter()
                    .enumerate()
                    .map(|(idx, (name, value))| RankingRow {
                        rank: idx + 1,
                        name: name.clone(),
                        value: *value,
                    })
                    .collect(),
            }],
            srcs: Vec::new(),
            places: Vec::new(),
            vars: Vec::new(),
        };
        let chart = ChartConfig::default();
        let result = draw(&data, &Theme::base(), &chart);
        let expected = chart.padding
            + Theme::base().title_font_size * chart.title_line_height * 2.0
            + 25.0 * chart.ranking_row_height
            + chart.padding;
        assert!(result.svg.contains(&format!("height=\"{expected}\"")));
    }

    #[test]
    fn zero_max_suppresses_proportional_bars() {
        let data = RankingData {
            title: String::new(),
            unit: None,
            sections: vec![RankingSection {
                heading: "Highest".to_string(),
                rows: rows(&[("A", 0.0), ("B", 0.0)]),
            }],
            srcs: Vec::new(),
            places: Vec::new(),
            vars: Vec::new(),
        };
        let result = draw(&data, &Theme::base(), &ChartConfig::default());
        // Background only.
        assert_eq!(result.svg.matches("<rect ").count(), 1);
    }
}

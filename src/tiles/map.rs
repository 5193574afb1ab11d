//! Choropleth maps. Child-place polygons are projected with a plain
//! equirectangular fit and shaded on a three-stop color ramp; regions
//! without an observation keep a neutral fill.

use crate::config::ChartConfig;
use crate::format::format_value;
use crate::page::{TileJob, TileType};
use crate::render::{escape_xml, rings_to_path, text_element, SvgBuilder};
use crate::text::text_width;
use crate::theme::Theme;

use super::{
    draw_title, fill_title, fit_points, most_common_date, point_facet_id, point_sources,
    resolve_unit, spec_point_values, to_csv, Source, TileContext, TileError, TileResult,
};

pub struct MapRegion {
    pub name: String,
    pub dcid: String,
    pub value: Option<f64>,
    /// Polygon rings in lon/lat order, holes included.
    pub rings: Vec<Vec<(f64, f64)>>,
}

pub struct MapData {
    pub title: String,
    pub unit: Option<String>,
    pub regions: Vec<MapRegion>,
    pub srcs: Vec<Source>,
    pub places: Vec<String>,
    pub vars: Vec<String>,
}

pub(crate) async fn render(ctx: &TileContext<'_>, job: &TileJob) -> Result<TileResult, TileError> {
    let data = fetch(ctx, job).await?;
    Ok(draw(&data, ctx.theme, ctx.chart))
}

async fn fetch(ctx: &TileContext<'_>, job: &TileJob) -> Result<MapData, TileError> {
    let spec = job
        .stat_vars
        .first()
        .ok_or(TileError::Spec("map tile has no stat var"))?;
    let child_type = ctx.child_type_or_default();
    let mut variables = vec![spec.stat_var.clone()];
    if let Some(denom) = &spec.denom {
        if !variables.contains(denom) {
            variables.push(denom.clone());
        }
    }

    let geojson = ctx
        .client
        .choropleth_geojson(&ctx.place.dcid, child_type)
        .await?;
    if geojson.features.is_empty() {
        return Err(TileError::NoGeometry);
    }
    let response = ctx
        .client
        .observations_point_within(&ctx.place.dcid, child_type, &variables)
        .await?;
    let values = spec_point_values(&response, spec);

    let mut regions = Vec::new();
    let mut dates = Vec::new();
    for feature in &geojson.features {
        let rings = feature.geometry.rings();
        if rings.is_empty() {
            continue;
        }
        let dcid = &feature.properties.geo_dcid;
        let joined = values.get(dcid);
        if let Some((_, date)) = joined {
            dates.push(date.as_str());
        }
        regions.push(MapRegion {
            name: if feature.properties.name.is_empty() {
                dcid.clone()
            } else {
                feature.properties.name.clone()
            },
            dcid: dcid.clone(),
            value: joined.map(|(value, _)| *value),
            rings,
        });
    }
    if regions.is_empty() {
        return Err(TileError::NoGeometry);
    }
    if regions.iter().all(|r| r.value.is_none()) {
        return Err(TileError::NoData);
    }

    let facet_id = point_facet_id(
        &response,
        &spec.stat_var,
        regions.iter().map(|region| region.dcid.as_str()),
    );

    Ok(MapData {
        title: fill_title(&job.tile.title, &ctx.place.name, &most_common_date(dates)),
        unit: resolve_unit(spec, &response.facets, &facet_id),
        regions,
        srcs: point_sources(&response, std::slice::from_ref(spec)),
        places: vec![ctx.place.dcid.clone()],
        vars: vec![spec.stat_var.clone()],
    })
}

pub fn draw(data: &MapData, theme: &Theme, chart: &ChartConfig) -> TileResult {
    let mut svg = SvgBuilder::new(chart.tile_width, chart.tile_height);
    let top = draw_title(&mut svg, &data.title, theme, chart);

    let legend_height = chart.legend_item_height + 8.0;
    let plot_x = chart.padding;
    let plot_right = chart.tile_width - chart.padding;
    let plot_bottom = chart.tile_height - chart.padding - legend_height;

    let values: Vec<f64> = data.regions.iter().filter_map(|r| r.value).collect();
    let (vmin, vmax) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    let all_points = data
        .regions
        .iter()
        .flat_map(|region| region.rings.iter().flatten().copied());
    if let Some(fit) = fit_points(all_points, (plot_x, top, plot_right, plot_bottom)) {
        for region in &data.regions {
            let projected: Vec<Vec<(f64, f64)>> = region
                .rings
                .iter()
                .map(|ring| ring.iter().map(|&(lon, lat)| fit.project(lon, lat)).collect())
                .collect();
            let fill = match region.value {
                Some(value) => ramp_color(ramp_position(value, vmin, vmax), theme),
                None => theme.missing_data_fill.clone(),
            };
            let tooltip = match region.value {
                Some(value) => format!("{}: {}", region.name, format_value(value, data.unit.as_deref())),
                None => format!("{}: no data", region.name),
            };
            svg.push(&format!(
                "<path d=\"{}\" fill=\"{fill}\" fill-rule=\"evenodd\" stroke=\"{}\" stroke-width=\"0.5\"><title>{}</title></path>",
                rings_to_path(&projected),
                theme.region_border_color,
                escape_xml(&tooltip)
            ));
        }
    }

    // Min, mid, and max swatches double as the color scale legend.
    if vmin.is_finite() {
        let mid = (vmin + vmax) / 2.0;
        let swatch = chart.legend_swatch_size;
        let legend_y = chart.tile_height - chart.padding - swatch;
        let mut x = plot_x;
        for (value, t) in [(vmin, 0.0), (mid, 0.5), (vmax, 1.0)] {
            svg.push(&format!(
                "<rect x=\"{x:.2}\" y=\"{legend_y:.2}\" width=\"{swatch}\" height=\"{swatch}\" fill=\"{}\"/>",
                ramp_color(t, theme)
            ));
            let label = format_value(value, data.unit.as_deref());
            svg.push(&text_element(
                x + swatch + 4.0,
                legend_y + swatch - 2.0,
                "start",
                theme.font_size,
                &theme.text_color,
                &label,
            ));
            x += swatch + 4.0 + text_width(&label, theme.font_size) + 16.0;
        }
    }

    let mut sorted: Vec<&MapRegion> = data.regions.iter().filter(|r| r.value.is_some()).collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    let rows: Vec<Vec<String>> = sorted
        .iter()
        .map(|region| {
            vec![
                region.name.clone(),
                region.value.map(|v| v.to_string()).unwrap_or_default(),
            ]
        })
        .collect();

    TileResult {
        svg: svg.finish(theme),
        srcs: data.srcs.clone(),
        title: data.title.clone(),
        tile_type: TileType::Map,
        legend: None,
        data_csv: to_csv(&["place", "value"], &rows),
        unit: data.unit.clone(),
        places: Some(data.places.clone()),
        vars: Some(data.vars.clone()),
    }
}

fn ramp_position(value: f64, vmin: f64, vmax: f64) -> f64 {
    let span = vmax - vmin;
    if !span.is_normal() {
        return 0.5;
    }
    ((value - vmin) / span).clamp(0.0, 1.0)
}

/// Three-stop linear ramp between the theme's low, mid, and high colors.
pub(crate) fn ramp_color(t: f64, theme: &Theme) -> String {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        lerp_hex(&theme.ramp_low, &theme.ramp_mid, t * 2.0)
    } else {
        lerp_hex(&theme.ramp_mid, &theme.ramp_high, (t - 0.5) * 2.0)
    }
}

fn lerp_hex(from: &str, to: &str, t: f64) -> String {
    let (fr, fg, fb) = hex_rgb(from);
    let (tr, tg, tb) = hex_rgb(to);
    let mix = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8;
    format!("#{:02X}{:02X}{:02X}", mix(fr, tr), mix(fg, tg), mix(fb, tb))
}

fn hex_rgb(hex: &str) -> (u8, u8, u8) {
    let hex = hex.trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .unwrap_or(0)
    };
    (channel(0..2), channel(2..4), channel(4..6))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(lon: f64, lat: f64) -> Vec<Vec<(f64, f64)>> {
        vec![vec![
            (lon, lat),
            (lon + 1.0, lat),
            (lon + 1.0, lat + 1.0),
            (lon, lat + 1.0),
            (lon, lat),
        ]]
    }

    fn sample() -> MapData {
        MapData {
            title: "Population: states in the United States".to_string(),
            unit: None,
            regions: vec![
                MapRegion {
                    name: "Alpha".to_string(),
                    dcid: "geoId/01".to_string(),
                    value: Some(0.0),
                    rings: square(-120.0, 35.0),
                },
                MapRegion {
                    name: "Bravo".to_string(),
                    dcid: "geoId/02".to_string(),
                    value: Some(100.0),
                    rings: square(-118.0, 35.0),
                },
                MapRegion {
                    name: "Charlie".to_string(),
                    dcid: "geoId/03".to_string(),
                    value: None,
                    rings: square(-116.0, 35.0),
                },
            ],
            srcs: Vec::new(),
            places: vec!["country/USA".to_string()],
            vars: vec!["Count_Person".to_string()],
        }
    }

    #[test]
    fn extremes_get_ramp_end_colors_and_gaps_get_neutral() {
        let theme = Theme::base();
        let result = draw(&sample(), &theme, &ChartConfig::default());
        assert!(result.svg.contains(&theme.ramp_low));
        assert!(result.svg.contains(&theme.ramp_high));
        assert!(result.svg.contains(&theme.missing_data_fill));
    }

    #[test]
    fn regions_carry_tooltips() {
        let result = draw(&sample(), &Theme::base(), &ChartConfig::default());
        assert!(result.svg.contains("<title>Bravo: 100</title>"));
        assert!(result.svg.contains("<title>Charlie: no data</title>"));
    }

    #[test]
    fn ramp_midpoint_is_the_mid_color() {
        let theme = Theme::base();
        assert_eq!(ramp_color(0.5, &theme), theme.ramp_mid);
        assert_eq!(ramp_color(-1.0, &theme), theme.ramp_low);
        assert_eq!(ramp_color(2.0, &theme), theme.ramp_high);
    }

    #[test]
    fn malformed_hex_defaults_to_black_channels() {
        assert_eq!(hex_rgb("nope"), (0, 0, 0));
        assert_eq!(hex_rgb("#FF0080"), (255, 0, 128));
    }

    #[test]
    fn csv_skips_regions_without_data() {
        let result = draw(&sample(), &Theme::base(), &ChartConfig::default());
        let csv = result.data_csv.unwrap();
        assert!(csv.contains("Alpha,0"));
        assert!(csv.contains("Bravo,100"));
        assert!(!csv.contains("Charlie"));
    }

    #[test]
    fn constant_values_sit_mid_ramp() {
        assert_eq!(ramp_position(5.0, 5.0, 5.0), 0.5);
        assert_eq!(ramp_position(7.5, 5.0, 10.0), 0.5);
    }
}

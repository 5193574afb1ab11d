use charted::config::ChartConfig;
use charted::theme::Theme;
use charted::tiles::bar::{self, BarData};
use charted::tiles::line::{self, LineData, LineSeries};
use charted::tiles::map::{self, MapData, MapRegion};
use charted::tiles::ranking::{self, RankingData, RankingRow, RankingSection};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn bar_data(groups: usize, vars: usize) -> BarData {
    BarData {
        title: "Median household income across counties".to_string(),
        unit: Some("$".to_string()),
        var_labels: (0..vars).map(|v| format!("Variable {v}")).collect(),
        groups: (0..groups)
            .map(|g| {
                let values = (0..vars)
                    .map(|v| Some(40_000.0 + ((g * 7 + v * 13) as f64) % 90_000.0))
                    .collect();
                (format!("County {g}"), values)
            })
            .collect(),
        srcs: Vec::new(),
        places: Vec::new(),
        vars: Vec::new(),
    }
}

fn line_data(series: usize, points: usize) -> LineData {
    LineData {
        title: "Population trend".to_string(),
        unit: None,
        series: (0..series)
            .map(|s| LineSeries {
                label: format!("Series {s}"),
                points: (0..points)
                    .map(|p| {
                        let year = 1960 + p / 12;
                        let month = 1 + p % 12;
                        let value = 1000.0 + s as f64 * 50.0 + (p as f64).sin() * 40.0;
                        (format!("{year}-{month:02}"), value)
                    })
                    .collect(),
            })
            .collect(),
        srcs: Vec::new(),
        places: Vec::new(),
        vars: Vec::new(),
    }
}

fn map_data(regions: usize) -> MapData {
    let columns = (regions as f64).sqrt().ceil() as usize;
    MapData {
        title: "Population by county".to_string(),
        unit: None,
        regions: (0..regions)
            .map(|r| {
                let col = (r % columns.max(1)) as f64;
                let row = (r / columns.max(1)) as f64;
                let lon = -120.0 + col * 0.9;
                let lat = 34.0 + row * 0.8;
                let ring: Vec<(f64, f64)> = (0..=6)
                    .map(|k| {
                        let angle = k as f64 * std::f64::consts::FRAC_PI_3;
                        (lon + angle.cos() * 0.4, lat + angle.sin() * 0.4)
                    })
                    .collect();
                MapRegion {
                    name: format!("County {r}"),
                    dcid: format!("geoId/{r:05}"),
                    value: if r % 9 == 0 {
                        None
                    } else {
                        Some(((r * 37) % 1000) as f64)
                    },
                    rings: vec![ring],
                }
            })
            .collect(),
        srcs: Vec::new(),
        places: Vec::new(),
        vars: Vec::new(),
    }
}

fn ranking_data(rows: usize) -> RankingData {
    RankingData {
        title: "Highest unemployment rate".to_string(),
        unit: Some("%".to_string()),
        sections: vec![RankingSection {
            heading: "Highest".to_string(),
            rows: (0..rows)
                .map(|r| RankingRow {
                    rank: r + 1,
                    name: format!("County {r}"),
                    value: 20.0 - r as f64 * 0.1,
                })
                .collect(),
        }],
        srcs: Vec::new(),
        places: Vec::new(),
        vars: Vec::new(),
    }
}

fn bench_bar(c: &mut Criterion) {
    let mut group = c.benchmark_group("draw_bar");
    let theme = Theme::base();
    let chart = ChartConfig::default();
    for (groups, vars) in [(4usize, 1usize), (7, 2), (7, 4)] {
        let name = format!("{groups}x{vars}");
        let data = bar_data(groups, vars);
        group.bench_with_input(BenchmarkId::from_parameter(name), &data, |b, data| {
            b.iter(|| {
                let result = bar::draw(black_box(data), &theme, &chart);
                black_box(result.svg.len());
            });
        });
    }
    group.finish();
}

fn bench_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("draw_line");
    let theme = Theme::base();
    let chart = ChartConfig::default();
    for (series, points) in [(1usize, 30usize), (4, 120), (8, 480)] {
        let name = format!("{series}x{points}");
        let data = line_data(series, points);
        group.bench_with_input(BenchmarkId::from_parameter(name), &data, |b, data| {
            b.iter(|| {
                let result = line::draw(black_box(data), &theme, &chart);
                black_box(result.svg.len());
            });
        });
    }
    group.finish();
}

fn bench_map(c: &mut Criterion) {
    let mut group = c.benchmark_group("draw_map");
    let theme = Theme::base();
    let chart = ChartConfig::default();
    for regions in [12usize, 58, 254] {
        let data = map_data(regions);
        group.bench_with_input(BenchmarkId::from_parameter(regions), &data, |b, data| {
            b.iter(|| {
                let result = map::draw(black_box(data), &theme, &chart);
                black_box(result.svg.len());
            });
        });
    }
    group.finish();
}

fn bench_ranking(c: &mut Criterion) {
    let mut group = c.benchmark_group("draw_ranking");
    let theme = Theme::base();
    let chart = ChartConfig::default();
    for rows in [5usize, 25, 100] {
        let data = ranking_data(rows);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &data, |b, data| {
            b.iter(|| {
                let result = ranking::draw(black_box(data), &theme, &chart);
                black_box(result.svg.len());
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_bar, bench_line, bench_map, bench_ranking
);
criterion_main!(benches);

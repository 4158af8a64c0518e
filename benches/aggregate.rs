use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use era5land::{reshape_year, GridChunk, GridMessage, GridStack, GridVariable};
use std::path::PathBuf;

/// One month of hourly `t2m` on a 20 x 20 grid, in two files of half a month each.
fn synthetic_month() -> Vec<(PathBuf, Vec<GridMessage>)> {
    let (rows, cols) = (20usize, 20usize);
    let latitudes: Vec<f64> = (0..rows * cols).map(|i| 50.0 - (i / cols) as f64 * 0.1).collect();
    let longitudes: Vec<f64> = (0..rows * cols).map(|i| 5.0 + (i % cols) as f64 * 0.1).collect();
    let start = NaiveDate::from_ymd_opt(2015, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();

    (0..2)
        .map(|half| {
            let messages = (half * 15..(half + 1) * 15)
                .flat_map(|day| (1..=24).map(move |step| (day, step)))
                .map(|(day, step)| GridMessage {
                    variable: GridVariable::new("t2m", "2 metre temperature", "K"),
                    reference_time: start + Duration::days(day),
                    step_hours: step,
                    latitudes: latitudes.clone(),
                    longitudes: longitudes.clone(),
                    values: (0..rows * cols)
                        .map(|i| Some(270.0 + i as f64 * 0.01 + step as f64))
                        .collect(),
                })
                .collect();
            (PathBuf::from(format!("2015_months01_part{}.grib", half)), messages)
        })
        .collect()
}

fn stack(files: Vec<(PathBuf, Vec<GridMessage>)>) -> GridStack {
    let mut stack = GridStack::new();
    for (path, messages) in files {
        stack.push(GridChunk::new(path, messages).unwrap()).unwrap();
    }
    stack
}

fn bench_aggregate(c: &mut Criterion) {
    let files = synthetic_month();
    let variables = stack(files.clone()).variable_names();

    c.bench_function("stack", |b| b.iter(|| stack(black_box(files.clone()))));
    c.bench_function("stack_and_reshape", |b| {
        b.iter(|| {
            let stacked = stack(files.clone()).into_lazy().unwrap();
            reshape_year(stacked, black_box(&variables), 2015)
                .collect()
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_aggregate);
criterion_main!(benches);

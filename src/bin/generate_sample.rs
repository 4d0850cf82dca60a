//! Generate a row-aligned sample dataset pair for trying the app:
//! `sample_data.csv` (tabular) and `sample_regions.geojson` (spatial), one
//! grid cell per CSV row.

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use serde_json::json;

const GRID_WIDTH: usize = 8;
const GRID_HEIGHT: usize = 8;
const ORIGIN: (f64, f64) = (27.0, 41.0); // lon, lat of the grid corner
const CELL_SIZE: f64 = 0.05;

struct Cell {
    rainfall: f64,
    elevation: f64,
    slope: f64,
    drainage: f64,
    hazard: &'static str,
}

fn synthesize(rng: &mut StdRng) -> Vec<Cell> {
    let mut cells = Vec::with_capacity(GRID_WIDTH * GRID_HEIGHT);
    for row in 0..GRID_HEIGHT {
        for col in 0..GRID_WIDTH {
            // Rainfall rises to the north, elevation to the east, plus noise.
            let rainfall =
                60.0 + row as f64 * 15.0 + rng.random_range(-10.0..10.0);
            let elevation =
                5.0 + col as f64 * 12.0 + rng.random_range(-4.0..4.0);
            let slope = rng.random_range(0.5..12.0);
            let drainage = rng.random_range(0.1..1.0);

            let score = rainfall / 20.0 - elevation / 15.0 - drainage * 2.0;
            let hazard = if score > 6.0 {
                "Severe"
            } else if score > 3.5 {
                "High"
            } else if score > 1.0 {
                "Medium"
            } else {
                "Low"
            };

            cells.push(Cell {
                rainfall,
                elevation,
                slope,
                drainage,
                hazard,
            });
        }
    }
    cells
}

fn write_csv(cells: &[Cell]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path("sample_data.csv").context("creating sample_data.csv")?;
    writer.write_record(["rainfall", "elevation", "slope", "drainage", "hazard"])?;
    for cell in cells {
        writer.write_record([
            format!("{:.2}", cell.rainfall),
            format!("{:.2}", cell.elevation),
            format!("{:.2}", cell.slope),
            format!("{:.3}", cell.drainage),
            cell.hazard.to_string(),
        ])?;
    }
    writer.flush().context("flushing sample_data.csv")?;
    Ok(())
}

fn write_geojson(cells: &[Cell]) -> Result<()> {
    let features: Vec<serde_json::Value> = cells
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let row = i / GRID_WIDTH;
            let col = i % GRID_WIDTH;
            let x0 = ORIGIN.0 + col as f64 * CELL_SIZE;
            let y0 = ORIGIN.1 + row as f64 * CELL_SIZE;
            let x1 = x0 + CELL_SIZE;
            let y1 = y0 + CELL_SIZE;
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]]
                },
                "properties": {
                    "cell_id": i,
                    "observed_hazard": cell.hazard
                }
            })
        })
        .collect();

    let collection = json!({
        "type": "FeatureCollection",
        "features": features
    });
    let text = serde_json::to_string_pretty(&collection)?;
    std::fs::write("sample_regions.geojson", text).context("writing sample_regions.geojson")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let mut rng = StdRng::seed_from_u64(42);

    let cells = synthesize(&mut rng);
    write_csv(&cells)?;
    write_geojson(&cells)?;

    println!(
        "Wrote sample_data.csv and sample_regions.geojson ({} rows)",
        cells.len()
    );
    Ok(())
}

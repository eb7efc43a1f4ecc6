//! Shared test utilities and fixture generators
#![allow(dead_code)]

use freightopt::pipeline::ShipmentRecord;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn record(supplier: &str, week: u32, packages: f64, capacity: f64, cost: f64) -> ShipmentRecord {
    ShipmentRecord {
        supplier: supplier.to_string(),
        year: 2024,
        week,
        fuel_surcharge: 1.2,
        packages_ordered: packages,
        max_capacity: capacity,
        logistics_cost: cost,
    }
}

/// Convex per-week cost: a fixed supplier fee plus a rate that rises with volume
pub fn convex_cost(supplier_index: usize, packages: f64, fuel: f64) -> f64 {
    let fee = 200.0 + 50.0 * supplier_index as f64;
    fee + 3.0 * packages + 0.01 * packages * packages + 40.0 * fuel
}

/// Synthetic shipments: one record per supplier per week, uneven volumes
/// and headroom above every week's volume.
pub fn synthetic_records(n_suppliers: usize, n_weeks: u32, seed: u64) -> Vec<ShipmentRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut records = Vec::new();
    for s in 0..n_suppliers {
        let supplier = format!("S{}", s + 1);
        for week in 1..=n_weeks {
            let packages = rng.gen_range(20.0..180.0_f64).round();
            let fuel = rng.gen_range(0.8..1.6_f64);
            records.push(ShipmentRecord {
                supplier: supplier.clone(),
                year: 2024,
                week,
                fuel_surcharge: fuel,
                packages_ordered: packages,
                max_capacity: 250.0,
                logistics_cost: convex_cost(s, packages, fuel),
            });
        }
    }
    records
}

/// Shipment records as a DataFrame with the expected column names
pub fn records_frame(records: &[ShipmentRecord]) -> DataFrame {
    DataFrame::new(vec![
        Column::new(
            "supplier".into(),
            records.iter().map(|r| r.supplier.clone()).collect::<Vec<_>>(),
        ),
        Column::new("year".into(), records.iter().map(|r| r.year).collect::<Vec<_>>()),
        Column::new("week".into(), records.iter().map(|r| r.week).collect::<Vec<_>>()),
        Column::new(
            "fuel_surcharge".into(),
            records.iter().map(|r| r.fuel_surcharge).collect::<Vec<_>>(),
        ),
        Column::new(
            "packages_ordered".into(),
            records.iter().map(|r| r.packages_ordered).collect::<Vec<_>>(),
        ),
        Column::new(
            "max_capacity".into(),
            records.iter().map(|r| r.max_capacity).collect::<Vec<_>>(),
        ),
        Column::new(
            "logistics_cost".into(),
            records.iter().map(|r| r.logistics_cost).collect::<Vec<_>>(),
        ),
    ])
    .unwrap()
}

/// Write records as CSV inside `dir`
pub fn write_csv(dir: &Path, name: &str, records: &[ShipmentRecord]) -> PathBuf {
    let path = dir.join(name);
    let mut df = records_frame(records);
    let mut file = std::fs::File::create(&path).unwrap();
    CsvWriter::new(&mut file).finish(&mut df).unwrap();
    path
}

/// Write records as Parquet inside `dir`
pub fn write_parquet(dir: &Path, name: &str, records: &[ShipmentRecord]) -> PathBuf {
    let path = dir.join(name);
    let mut df = records_frame(records);
    let file = std::fs::File::create(&path).unwrap();
    ParquetWriter::new(file).finish(&mut df).unwrap();
    path
}

/// Create a temporary directory holding a synthetic shipments CSV
pub fn create_temp_shipments(n_suppliers: usize, n_weeks: u32) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let records = synthetic_records(n_suppliers, n_weeks, 7);
    let path = write_csv(temp_dir.path(), "shipments.csv", &records);
    (temp_dir, path)
}

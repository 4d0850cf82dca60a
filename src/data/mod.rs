/// Data layer: core types, ingestion, and prediction persistence.
///
/// Architecture:
/// ```text
///  .csv                .geojson / .zip(shapefile)
///    │                        │
///    ▼                        ▼
///  ┌──────────┐          ┌───────────────────┐
///  │  loader   │          │ loader + shapefile │
///  └──────────┘          └───────────────────┘
///    │                        │
///    ▼                        ▼
///  ┌──────────────┐      ┌───────────────┐
///  │ TabularDataset│      │ SpatialDataset │
///  └──────────────┘      └───────────────┘
///    │ (after training)       ▲
///    ▼                        │ joined by row order
///  predictions_{train,test}.csv
/// ```
pub mod loader;
pub mod model;
pub mod shapefile;

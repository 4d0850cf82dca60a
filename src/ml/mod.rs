/// Model layer: train/test splitting, forest training, and evaluation.
///
/// Architecture:
/// ```text
///   TabularDataset + (target, features, test %)
///        │
///        ▼
///   ┌──────────┐       ┌────────────────┐
///   │  split    │──────▶│ tree / forest   │  seeded CART ensemble
///   └──────────┘       └────────────────┘
///        │                      │
///        ▼                      ▼
///   train/test labels    predicted labels
///        └──────────┬───────────┘
///                   ▼
///             ┌──────────┐
///             │ metrics   │  accuracy, weighted P/R/F1, confusion
///             └──────────┘
/// ```
pub mod forest;
pub mod metrics;
pub mod model;
pub mod split;
pub mod tree;

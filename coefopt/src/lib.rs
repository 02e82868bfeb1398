#![forbid(unsafe_code)]

pub mod cache;
pub mod context;
pub mod cost;
pub mod error;
pub mod optimize;
pub mod oracle;
pub mod rdo;
pub mod scan;
pub mod trial;
pub mod txsize;
pub mod view;

pub use cache::TxbCache;
pub use cost::CoeffCostTables;
pub use error::TxbError;
pub use optimize::{OptimizeConfig, OptimizeOutcome, RunMode, optimize_txb};
pub use scan::ScanOrder;
pub use trial::SearchMode;
pub use txsize::TxSize;
pub use view::{QuantParams, TxbCtx, TxbParams, TxbView};

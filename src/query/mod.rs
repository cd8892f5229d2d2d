pub mod engine;

pub use engine::{
    ArgumentFilter, ArgumentRow, ArgumentStat, CatalogQuery, FunctionStat, Listing, Stats,
};

pub mod page;
pub mod pipeline;
pub mod request;

pub use page::{CatalogPage, PageInfo};
pub use pipeline::{CatalogPipeline, Filter, SortDirection, SortField, SortSpec, Stage};
pub use request::{CatalogRequest, Pagination};

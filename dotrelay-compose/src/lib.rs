pub mod catalog;
pub mod compose;
pub mod params;

pub use catalog::{Catalog, Category, OperationSpec, ParameterDescriptor, Segment, ToolDescriptor};
pub use compose::{compose, PreparedCommand, WORKING_DIRECTORY};
pub use params::{ParamKind, ParamSpec, ParamValue, Parameters};

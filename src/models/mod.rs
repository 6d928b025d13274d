pub mod enums;
pub mod filters;
pub mod finance;
pub mod person;
pub mod registry;
pub mod service_order;
pub mod staff;
pub mod stock;

pub use filters::*;
pub use finance::*;
pub use person::*;
pub use registry::*;
pub use service_order::*;
pub use staff::*;
pub use stock::*;

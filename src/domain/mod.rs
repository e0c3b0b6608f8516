pub mod inventory;
pub mod order;
pub mod order_line;
pub mod product;
pub mod record;

pub use inventory::*;
pub use order::*;
pub use order_line::*;
pub use product::*;
pub use record::Record;

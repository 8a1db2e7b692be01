mod book;
mod order;
mod side;

pub use book::{BookLevel, BookUpdate};
pub use order::{OrderId, OrderRequest, OrderState, OrderUpdate};
pub use side::Side;

mod memory;
mod unit_of_work;

pub use memory::MemoryStore;
pub use unit_of_work::{Committed, StoreError, UnitOfWork};

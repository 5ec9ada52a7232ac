mod order_store;

pub use order_store::{OrderStore, StoreError};

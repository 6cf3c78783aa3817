pub mod balances;
pub mod counters;
pub mod dashboard;
pub mod inventory;
pub mod payments;
pub mod realtime;
pub mod storage;
pub mod subdivision;
pub mod values;

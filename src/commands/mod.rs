pub mod check_key;
pub mod reconcile;
pub mod scan;
pub mod status;

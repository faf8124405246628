pub mod agents;
pub mod audit;
pub mod categories;
pub mod leads;
pub mod organizations;
pub mod tokens;
pub mod users;

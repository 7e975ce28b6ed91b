pub mod alias_resolver;
pub mod fact_builder;
pub mod game_deriver;
pub mod loader;
pub mod metrics;
pub mod pipeline;
pub mod quality;
pub mod team_activity;
pub mod team_dimension;
pub mod team_performance;
pub mod validation;

pub use alias_resolver::*;
pub use fact_builder::*;
pub use game_deriver::*;
pub use loader::*;
pub use metrics::*;
pub use pipeline::*;
pub use quality::*;
pub use team_activity::*;
pub use team_dimension::*;
pub use team_performance::*;
pub use validation::*;

pub mod audit;
pub mod config;
pub mod cross_merge;
pub mod dedup;
pub mod federation;
pub mod fixture;
pub mod html;
pub mod http_client;
pub mod league;
pub mod normalize;
pub mod pipeline;
pub mod project;
pub mod reconcile;
pub mod season;
pub mod store;
pub mod verification;

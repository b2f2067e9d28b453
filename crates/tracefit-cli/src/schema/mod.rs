pub mod goodness_of_fit;
pub mod regression_config;

pub mod cycle;
pub mod logging;

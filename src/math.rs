pub mod monte_carlo;

pub use monte_carlo::{
    CycleReport, ErrorSample, IntegrationSession, IntegrationState, Point, SessionConfig,
};

pub mod pipeline;

pub use pipeline::CareTeamPipeline;

mod cartpole;
mod errors;
mod render;
mod spaces;
mod time_limit;
mod traits;
mod types;

pub use cartpole::{CartPole, OBS_DIM, Observation};
pub use errors::EnvError;
pub use render::{HumanRenderer, RenderMode, TRACK_WIDTH, ascii_frame};
pub use spaces::{BoxSpace, Discrete, Space};
pub use time_limit::TimeLimit;
pub use traits::Env;
pub use types::{EpisodeSummary, Step};

use super::errors::EnvError;
use super::spaces::Space;
use super::types::Step;

pub trait Env: Send {
    type Obs: Send + Clone + 'static;
    type Act: Send + Clone + 'static;
    type Info: Send + Clone + 'static;
    type ActSpace: Space<Self::Act> + Send;

    fn reset(&mut self) -> Result<(Self::Obs, Self::Info), EnvError>;
    fn step(&mut self, act: Self::Act) -> Result<Step<Self::Obs, Self::Info>, EnvError>;

    fn action_space(&self) -> &Self::ActSpace;
    fn action_space_mut(&mut self) -> &mut Self::ActSpace;

    /// Draw a frame. Returns the frame as text in `Ansi` mode, `None` otherwise.
    fn render(&mut self) -> Result<Option<String>, EnvError>;

    /// Target frame rate for human rendering, if the environment renders to
    /// a display at all.
    fn render_fps(&self) -> Option<u32> {
        None
    }

    fn close(&mut self) -> Result<(), EnvError>;
}
